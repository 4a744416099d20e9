//! Persistence and deduplication layer.
//!
//! Implements `HistoryStoreTrait` — transactional batch writes for history
//! items, visit details, and category records, plus the indexed range
//! queries the analytics engine reads from. Backed by SQLite via `rusqlite`.
//!
//! Deduplication policy: before writing a batch of history items, the set of
//! (url, last_visit_time) keys already present is read in one query, and only
//! items whose key is absent are inserted. Repeated ingestion passes over
//! overlapping time windows are therefore idempotent.

use std::collections::HashSet;
use std::sync::Arc;

use rusqlite::params;

use crate::database::connection::Database;
use crate::types::category::{CategoryRecord, CategoryScore};
use crate::types::errors::StoreError;
use crate::types::history::{HistoryItem, TimeRange, VisitDetail};

/// Result of a deduplicated batch write: the items actually written (in
/// input order) and the count of key collisions that were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreBatch {
    pub stored: Vec<HistoryItem>,
    pub duplicates: usize,
}

/// Trait defining persistence operations for the pipeline.
pub trait HistoryStoreTrait {
    fn store_history_items(&self, items: &[HistoryItem]) -> Result<StoreBatch, StoreError>;
    fn store_visit_details(&self, url: &str, visits: &[VisitDetail]) -> Result<usize, StoreError>;
    fn store_category(
        &self,
        url: &str,
        categories: &[CategoryScore],
        last_visit_time: i64,
    ) -> Result<(), StoreError>;
    fn history_in_range(&self, range: TimeRange) -> Result<Vec<HistoryItem>, StoreError>;
    fn history_for_domain(
        &self,
        domain: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryItem>, StoreError>;
    fn history_for_url(&self, url: &str) -> Result<Vec<HistoryItem>, StoreError>;
    fn visits_for_url(&self, url: &str) -> Result<Vec<VisitDetail>, StoreError>;
    fn visits_in_range(&self, range: TimeRange) -> Result<Vec<VisitDetail>, StoreError>;
    fn category_for_url(&self, url: &str) -> Result<Option<CategoryRecord>, StoreError>;
    fn categories_in_range(&self, range: TimeRange) -> Result<Vec<CategoryRecord>, StoreError>;
    fn prune_older_than(&self, cutoff: i64) -> Result<usize, StoreError>;
}

/// Store backed by a SQLite database.
pub struct HistoryStore {
    db: Arc<Database>,
}

impl HistoryStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<HistoryItem> {
        Ok(HistoryItem {
            url: row.get(0)?,
            title: row.get(1)?,
            last_visit_time: row.get(2)?,
            visit_count: row.get(3)?,
            typed_count: row.get(4)?,
            domain: row.get(5)?,
        })
    }

    fn row_to_visit(row: &rusqlite::Row) -> rusqlite::Result<VisitDetail> {
        Ok(VisitDetail {
            visit_id: row.get(0)?,
            url: row.get(1)?,
            visit_time: row.get(2)?,
            referring_visit_id: row.get(3)?,
            transition: row.get(4)?,
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<CategoryRecord> {
        let url: String = row.get(0)?;
        let raw: String = row.get(1)?;
        let last_visit_time: i64 = row.get(2)?;
        let categories: Vec<CategoryScore> = serde_json::from_str(&raw).unwrap_or_default();
        Ok(CategoryRecord {
            url,
            categories,
            last_visit_time,
        })
    }

    fn collect_items(
        mut stmt: rusqlite::Statement,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<HistoryItem>, StoreError> {
        let rows = stmt
            .query_map(params, Self::row_to_item)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }

    /// Reads the (url, last_visit_time) keys already stored within the
    /// batch's time span. One query regardless of batch size.
    fn existing_keys(&self, items: &[HistoryItem]) -> Result<HashSet<(String, i64)>, StoreError> {
        let min = items.iter().map(|i| i.last_visit_time).min().unwrap_or(0);
        let max = items.iter().map(|i| i.last_visit_time).max().unwrap_or(0);

        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT url, last_visit_time FROM history_items \
                 WHERE last_visit_time >= ?1 AND last_visit_time <= ?2",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let rows = stmt
            .query_map(params![min, max], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut keys = HashSet::new();
        for row in rows {
            keys.insert(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(keys)
    }
}

impl HistoryStoreTrait for HistoryStore {
    /// Writes a batch of history items, skipping items whose
    /// (url, last_visit_time) key is already stored.
    ///
    /// All inserts run in one transaction; a failed insert rolls the whole
    /// batch back and surfaces a single `BatchAborted` error.
    fn store_history_items(&self, items: &[HistoryItem]) -> Result<StoreBatch, StoreError> {
        if items.is_empty() {
            return Ok(StoreBatch {
                stored: Vec::new(),
                duplicates: 0,
            });
        }

        let existing = self.existing_keys(items)?;

        let conn = self.db.connection();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut stored = Vec::new();
        let mut duplicates = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO history_items \
                     (url, title, last_visit_time, visit_count, typed_count, domain) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

            // Also dedupe within the batch itself, so a provider handing the
            // same event twice in one pass cannot violate the key.
            let mut seen = existing;
            for item in items {
                let key = (item.url.clone(), item.last_visit_time);
                if seen.contains(&key) {
                    duplicates += 1;
                    continue;
                }
                stmt.execute(params![
                    item.url,
                    item.title,
                    item.last_visit_time,
                    item.visit_count,
                    item.typed_count,
                    item.domain,
                ])
                .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
                seen.insert(key);
                stored.push(item.clone());
            }
        }

        tx.commit()
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
        Ok(StoreBatch { stored, duplicates })
    }

    /// Writes the visit sequence for a URL in one transaction.
    ///
    /// Visit details are immutable: a visit_id already stored is left
    /// untouched. Returns the number of newly written rows.
    fn store_visit_details(&self, url: &str, visits: &[VisitDetail]) -> Result<usize, StoreError> {
        if visits.is_empty() {
            return Ok(0);
        }

        let conn = self.db.connection();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut written = 0usize;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO visit_details \
                     (visit_id, url, visit_time, referring_visit_id, transition) \
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

            for visit in visits {
                let affected = stmt
                    .execute(params![
                        visit.visit_id,
                        url,
                        visit.visit_time,
                        visit.referring_visit_id,
                        visit.transition,
                    ])
                    .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
                written += affected;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
        Ok(written)
    }

    /// Upserts the category record for a URL, overwriting any previous
    /// classification. The top label is mirrored into its own column for
    /// indexed queries.
    fn store_category(
        &self,
        url: &str,
        categories: &[CategoryScore],
        last_visit_time: i64,
    ) -> Result<(), StoreError> {
        let top_label = categories
            .first()
            .map(|c| c.label.clone())
            .unwrap_or_default();
        let serialized = serde_json::to_string(categories)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        self.db
            .connection()
            .execute(
                "INSERT OR REPLACE INTO categories (url, categories, top_label, last_visit_time) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![url, serialized, top_label, last_visit_time],
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// History items within a time range, most recent first.
    fn history_in_range(&self, range: TimeRange) -> Result<Vec<HistoryItem>, StoreError> {
        let conn = self.db.connection();
        let stmt = conn
            .prepare(
                "SELECT url, title, last_visit_time, visit_count, typed_count, domain \
                 FROM history_items WHERE last_visit_time >= ?1 AND last_visit_time < ?2 \
                 ORDER BY last_visit_time DESC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Self::collect_items(stmt, &[&range.start, &range.end])
    }

    /// History items for one hostname within a time range.
    fn history_for_domain(
        &self,
        domain: &str,
        range: TimeRange,
    ) -> Result<Vec<HistoryItem>, StoreError> {
        let conn = self.db.connection();
        let stmt = conn
            .prepare(
                "SELECT url, title, last_visit_time, visit_count, typed_count, domain \
                 FROM history_items \
                 WHERE domain = ?1 AND last_visit_time >= ?2 AND last_visit_time < ?3 \
                 ORDER BY last_visit_time DESC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Self::collect_items(stmt, &[&domain, &range.start, &range.end])
    }

    /// All stored items for one URL (one row per distinct visit timestamp).
    fn history_for_url(&self, url: &str) -> Result<Vec<HistoryItem>, StoreError> {
        let conn = self.db.connection();
        let stmt = conn
            .prepare(
                "SELECT url, title, last_visit_time, visit_count, typed_count, domain \
                 FROM history_items WHERE url = ?1 ORDER BY last_visit_time DESC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Self::collect_items(stmt, &[&url])
    }

    /// Visit sequence for a URL, oldest first.
    fn visits_for_url(&self, url: &str) -> Result<Vec<VisitDetail>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT visit_id, url, visit_time, referring_visit_id, transition \
                 FROM visit_details WHERE url = ?1 ORDER BY visit_time ASC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let rows = stmt
            .query_map(params![url], Self::row_to_visit)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }

    /// All visits within a time range, oldest first.
    fn visits_in_range(&self, range: TimeRange) -> Result<Vec<VisitDetail>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT visit_id, url, visit_time, referring_visit_id, transition \
                 FROM visit_details WHERE visit_time >= ?1 AND visit_time < ?2 \
                 ORDER BY visit_time ASC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let rows = stmt
            .query_map(params![range.start, range.end], Self::row_to_visit)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }

    /// The category record for a URL, if one exists.
    fn category_for_url(&self, url: &str) -> Result<Option<CategoryRecord>, StoreError> {
        let conn = self.db.connection();
        let result = conn.query_row(
            "SELECT url, categories, last_visit_time FROM categories WHERE url = ?1",
            params![url],
            Self::row_to_record,
        );
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(e.to_string())),
        }
    }

    /// Category records whose triggering visit falls in the range.
    fn categories_in_range(&self, range: TimeRange) -> Result<Vec<CategoryRecord>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn
            .prepare(
                "SELECT url, categories, last_visit_time FROM categories \
                 WHERE last_visit_time >= ?1 AND last_visit_time < ?2 \
                 ORDER BY last_visit_time ASC",
            )
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let rows = stmt
            .query_map(params![range.start, range.end], Self::row_to_record)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row.map_err(|e| StoreError::DatabaseError(e.to_string()))?);
        }
        Ok(results)
    }

    /// Deletes items, visits, and categories older than `cutoff` (epoch ms).
    /// Returns the total number of deleted rows.
    fn prune_older_than(&self, cutoff: i64) -> Result<usize, StoreError> {
        let conn = self.db.connection();
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut deleted = 0usize;
        deleted += tx
            .execute(
                "DELETE FROM history_items WHERE last_visit_time < ?1",
                params![cutoff],
            )
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
        deleted += tx
            .execute(
                "DELETE FROM visit_details WHERE visit_time < ?1",
                params![cutoff],
            )
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
        deleted += tx
            .execute(
                "DELETE FROM categories WHERE last_visit_time < ?1",
                params![cutoff],
            )
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;

        tx.commit()
            .map_err(|e| StoreError::BatchAborted(e.to_string()))?;
        Ok(deleted)
    }
}

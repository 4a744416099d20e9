use serde::{Deserialize, Serialize};

/// Label used when no classification result clears the confidence threshold.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// One (label, confidence) pair from the classification service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    pub label: String,
    pub score: f64,
}

impl CategoryScore {
    pub fn uncategorized() -> Self {
        Self {
            label: UNCATEGORIZED_LABEL.to_string(),
            score: 0.0,
        }
    }
}

/// Persisted classification outcome for one URL.
///
/// At most one record per URL; re-classification overwrites. The
/// `categories` list is never empty — an all-below-threshold result is
/// stored as a single uncategorized entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRecord {
    pub url: String,
    /// Ordered highest confidence first, as returned by the service.
    pub categories: Vec<CategoryScore>,
    /// Epoch milliseconds of the visit that triggered classification.
    pub last_visit_time: i64,
}

use std::fmt;

// === StoreError ===

/// Errors related to the persistence and deduplication layer.
#[derive(Debug)]
pub enum StoreError {
    /// Database operation failed.
    DatabaseError(String),
    /// A batch transaction was rolled back; no writes from it are visible.
    BatchAborted(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::DatabaseError(msg) => write!(f, "Store database error: {}", msg),
            StoreError::BatchAborted(msg) => write!(f, "Store batch aborted: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === BlocklistError ===

/// Errors related to blocklist loading and parsing.
#[derive(Debug)]
pub enum BlocklistError {
    /// Fetching the rule list from its source failed.
    FetchError(String),
    /// The rule list text could not be parsed.
    ParseError(String),
}

impl fmt::Display for BlocklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlocklistError::FetchError(msg) => write!(f, "Blocklist fetch error: {}", msg),
            BlocklistError::ParseError(msg) => write!(f, "Blocklist parse error: {}", msg),
        }
    }
}

impl std::error::Error for BlocklistError {}

// === ClassifyError ===

/// Errors related to the classification gateway.
#[derive(Debug)]
pub enum ClassifyError {
    /// The classification service did not become ready within the poll window.
    EngineUnavailable(String),
    /// The user refused the classification capability grant.
    PermissionDenied,
    /// The service accepted the request but failed to produce a result.
    ServiceError(String),
    /// Persisting the category record failed.
    StoreError(String),
}

impl fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyError::EngineUnavailable(msg) => {
                write!(f, "Classification engine unavailable: {}", msg)
            }
            ClassifyError::PermissionDenied => {
                write!(f, "Classification capability denied")
            }
            ClassifyError::ServiceError(msg) => {
                write!(f, "Classification service error: {}", msg)
            }
            ClassifyError::StoreError(msg) => {
                write!(f, "Classification store error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ClassifyError {}

// === ProviderError ===

/// Errors surfaced by a history provider implementation.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider could not be reached.
    Unavailable(String),
    /// The provider rejected or failed the query.
    QueryFailed(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Unavailable(msg) => write!(f, "History provider unavailable: {}", msg),
            ProviderError::QueryFailed(msg) => write!(f, "History provider query failed: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

// === IngestError ===

/// Errors that abort an entire ingestion pass.
///
/// Per-item classification and visit-fetch failures are logged and skipped
/// inside the coordinator; only provider and batch-write failures abort.
#[derive(Debug)]
pub enum IngestError {
    /// Fetching the raw event batch failed.
    ProviderError(String),
    /// Writing the deduplicated batch failed.
    StoreError(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::ProviderError(msg) => write!(f, "Ingestion provider error: {}", msg),
            IngestError::StoreError(msg) => write!(f, "Ingestion store error: {}", msg),
        }
    }
}

impl std::error::Error for IngestError {}

// === ConfigError ===

/// Errors related to pipeline configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the configuration.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

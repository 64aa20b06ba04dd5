use thiserror::Error;

/// Main error type for the TzKT ledger extractor
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Explorer error: {0}")]
    Explorer(#[from] ExplorerError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Errors talking to the TzKT explorer API
#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Rate limit exceeded, retry after {seconds} seconds")]
    RateLimit { seconds: u64 },

    #[error("Block not found: {level}")]
    BlockNotFound { level: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Database-related errors
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Errors raised while flattening block payloads into the address ledger.
///
/// These indicate a broken contract with the upstream data source and are
/// never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid amount in operation {tx_hash}: {value}")]
    InvalidAmount { tx_hash: String, value: String },

    #[error("Negative amount in operation {tx_hash}: {value}")]
    NegativeAmount { tx_hash: String, value: i64 },

    #[error("Amount {amount} cannot be scaled by {decimals} decimal places")]
    Scale { amount: u64, decimals: u32 },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

/// Validation errors for user-supplied input
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid Tezos address: {0}")]
    InvalidAddress(String),

    #[error("Invalid block level: {0}")]
    InvalidLevel(String),

    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

/// System-level errors
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("Signal received: {0}")]
    Signal(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// High priority errors that affect functionality
    High,
    /// Medium priority errors that may affect performance
    Medium,
    /// Low priority errors that are mostly informational
    Low,
}

impl LedgerError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LedgerError::Database(DatabaseError::Connection(_)) => ErrorSeverity::Critical,
            LedgerError::Config(_) => ErrorSeverity::Critical,

            LedgerError::Extraction(_) => ErrorSeverity::High,
            LedgerError::Explorer(ExplorerError::Connection(_)) => ErrorSeverity::High,
            LedgerError::Database(DatabaseError::Integrity(_)) => ErrorSeverity::High,

            LedgerError::Explorer(ExplorerError::Timeout { .. }) => ErrorSeverity::Medium,
            LedgerError::Explorer(ExplorerError::RateLimit { .. }) => ErrorSeverity::Medium,
            LedgerError::Database(DatabaseError::Query(_)) => ErrorSeverity::Medium,

            LedgerError::Validation(_) => ErrorSeverity::Low,
            LedgerError::Explorer(ExplorerError::BlockNotFound { .. }) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            LedgerError::Explorer(ExplorerError::Timeout { .. }) => true,
            LedgerError::Explorer(ExplorerError::RateLimit { .. }) => true,
            LedgerError::Explorer(ExplorerError::Connection(_)) => true,
            LedgerError::Explorer(ExplorerError::Status { status, .. }) => *status >= 500,
            LedgerError::Database(DatabaseError::Lock(_)) => true,
            LedgerError::System(SystemError::ResourceExhausted(_)) => true,

            // Extraction runs over already-fetched data, retrying cannot help
            LedgerError::Extraction(_) => false,
            LedgerError::Config(_) => false,
            LedgerError::Validation(_) => false,

            _ => false,
        }
    }

    /// Get suggested retry delay in seconds for recoverable errors
    pub fn retry_delay(&self) -> Option<u64> {
        if !self.is_recoverable() {
            return None;
        }

        match self {
            LedgerError::Explorer(ExplorerError::RateLimit { seconds }) => Some(*seconds),
            LedgerError::Explorer(ExplorerError::Timeout { .. }) => Some(5),
            LedgerError::Explorer(ExplorerError::Connection(_)) => Some(10),
            LedgerError::Database(DatabaseError::Lock(_)) => Some(1),
            LedgerError::System(SystemError::ResourceExhausted(_)) => Some(30),
            _ => Some(5),
        }
    }
}

impl From<crate::database::DbError> for DatabaseError {
    fn from(err: crate::database::DbError) -> Self {
        match err {
            crate::database::DbError::Connection(rusqlite::Error::SqliteFailure(code, msg))
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DatabaseError::Integrity(msg.unwrap_or_else(|| code.to_string()))
            }
            crate::database::DbError::Connection(e) => DatabaseError::Connection(e),
            crate::database::DbError::Lock(msg) => DatabaseError::Lock(msg),
            crate::database::DbError::Operation(msg) => DatabaseError::Query(msg),
            crate::database::DbError::NotFound => DatabaseError::NotFound("Record not found".to_string()),
        }
    }
}

impl From<crate::database::DbError> for LedgerError {
    fn from(err: crate::database::DbError) -> Self {
        LedgerError::Database(DatabaseError::from(err))
    }
}

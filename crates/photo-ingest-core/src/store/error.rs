use thiserror::Error;

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Record store specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The collection name cannot be used as a table name
    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    /// Errors during store initialization
    #[error("Store initialization error: {0}")]
    Initialization(String),

    /// The store refused the operation
    #[error("Store rejected operation: {0}")]
    Rejected(String),
}

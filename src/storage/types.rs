use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised by a [`KeyValueStore`](super::KeyValueStore) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another anilog process holds the store file locked
    #[error("Another instance of anilog appears to be using the store. Please close it and try again.")]
    Locked,

    /// Schema setup failed
    #[error("Storage migration failed: {0}")]
    Migration(String),

    /// Generic SQLite error
    #[error("Storage error: {0}")]
    Database(#[from] sqlx::Error),

    /// A value could not be encoded for storage
    #[error("Failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StorageError {
    /// Map a sqlx error, recognising SQLite lock conditions.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return StorageError::Locked;
        }
        StorageError::Database(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// one of these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

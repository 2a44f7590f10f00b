//! Local key-value persistence.
//!
//! Everything the client remembers between runs (session tokens, the
//! discovery cache, ranking orders) goes through [`KeyValueStore`], so the
//! gateway and caches can be driven by [`MemoryStore`] in tests and by
//! [`SqliteStore`] in the CLI.

pub mod keys;
mod memory;
mod sqlite;
mod types;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::StorageError;

/// String-to-string storage port.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Insert or overwrite `key`.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Insert or overwrite every pair as a unit: on error none of them were
    /// written.
    async fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;

    /// Remove `key`; removing a missing key succeeds.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key in `keys` as a unit: either all are gone afterwards
    /// or, on error, none were touched.
    async fn remove_all(&self, keys: &[&str]) -> Result<(), StorageError>;
}

use super::types::DiscoverData;
use crate::storage::keys::{DISCOVER_DATA, DISCOVER_TIMESTAMP};
use crate::storage::KeyValueStore;
use crate::util::now_millis;

/// Default TTL for the discovery snapshot (12 hours)
pub const DEFAULT_TTL_MS: i64 = 12 * 60 * 60 * 1000;

/// Why a stored snapshot was not usable.
#[derive(Debug)]
enum CacheMiss {
    /// Nothing stored
    Absent,
    /// Payload or timestamp present without the other
    Incomplete,
    /// Older than the TTL
    Expired { age_ms: i64 },
    /// Timestamp or payload could not be parsed
    Malformed(String),
    /// Parsed fine but every bucket is empty
    Empty,
}

impl CacheMiss {
    /// Everything except an absent cache is cleared on read.
    fn should_clear(&self) -> bool {
        !matches!(self, CacheMiss::Absent)
    }
}

/// Time-boxed snapshot of the discovery feed in local storage.
///
/// A snapshot is trusted only while it is younger than the TTL and has at
/// least one item in one of its eight buckets; anything else is deleted the
/// moment it is read.
#[derive(Clone)]
pub struct DiscoveryCache<S> {
    store: S,
    ttl_ms: i64,
}

impl<S: KeyValueStore> DiscoveryCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, DEFAULT_TTL_MS)
    }

    pub fn with_ttl(store: S, ttl_ms: i64) -> Self {
        Self { store, ttl_ms }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the cached payload if it is fresh and non-empty.
    pub async fn read(&self) -> Option<DiscoverData> {
        self.read_at(now_millis()).await
    }

    /// [`read`](Self::read) against an explicit clock.
    ///
    /// Never fails: storage errors and corrupt entries both read as "no
    /// cache". Expired, corrupt or empty entries are deleted.
    pub async fn read_at(&self, now_ms: i64) -> Option<DiscoverData> {
        match self.evaluate(now_ms).await {
            Ok(data) => {
                tracing::debug!(items = data.total_items(), "Using cached discovery data");
                Some(data)
            }
            Err(miss) => {
                if miss.should_clear() {
                    tracing::debug!(reason = ?miss, "Discarding cached discovery data");
                    self.invalidate().await;
                }
                None
            }
        }
    }

    async fn evaluate(&self, now_ms: i64) -> Result<DiscoverData, CacheMiss> {
        let payload = self.load_entry(DISCOVER_DATA).await?;
        let timestamp = self.load_entry(DISCOVER_TIMESTAMP).await?;

        let (payload, timestamp) = match (payload, timestamp) {
            (Some(p), Some(t)) => (p, t),
            (None, None) => return Err(CacheMiss::Absent),
            _ => return Err(CacheMiss::Incomplete),
        };

        let stored_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| CacheMiss::Malformed(format!("timestamp {timestamp:?}")))?;

        // A timestamp from the future (clock moved back) counts as fresh.
        let age_ms = now_ms.saturating_sub(stored_at);
        if age_ms > self.ttl_ms {
            return Err(CacheMiss::Expired { age_ms });
        }

        let data: DiscoverData =
            serde_json::from_str(&payload).map_err(|e| CacheMiss::Malformed(e.to_string()))?;

        if data.is_empty() {
            return Err(CacheMiss::Empty);
        }

        Ok(data)
    }

    async fn load_entry(&self, key: &str) -> Result<Option<String>, CacheMiss> {
        match self.store.get(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read discovery cache");
                Err(CacheMiss::Absent)
            }
        }
    }

    /// Store `payload` stamped with the current time.
    pub async fn write(&self, payload: &DiscoverData) {
        self.write_at(payload, now_millis()).await
    }

    /// [`write`](Self::write) against an explicit clock.
    ///
    /// Best-effort: failures are logged, never returned. Payload and stamp
    /// are written together; after a failure any older snapshot is removed.
    pub async fn write_at(&self, payload: &DiscoverData, now_ms: i64) {
        let serialized = match serde_json::to_string(payload) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize discovery data for cache");
                return;
            }
        };

        let timestamp = now_ms.to_string();
        let result = self
            .store
            .set_all(&[(DISCOVER_DATA, &serialized), (DISCOVER_TIMESTAMP, &timestamp)])
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save discovery data to cache");
            self.invalidate().await;
        }
    }

    /// Delete the snapshot and its timestamp.
    pub async fn invalidate(&self) {
        if let Err(e) = self
            .store
            .remove_all(&[DISCOVER_DATA, DISCOVER_TIMESTAMP])
            .await
        {
            tracing::warn!(error = %e, "Failed to clear discovery cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::types::Category;
    use crate::media::{MediaItem, MediaKind};
    use crate::storage::{MemoryStore, StorageError};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    const T: i64 = 1_700_000_000_000;

    fn item(id: i64) -> MediaItem {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": {"romaji": format!("Title {id}")},
            "averageScore": 70
        }))
        .unwrap()
    }

    fn anime_payload() -> DiscoverData {
        let mut data = DiscoverData::default();
        data.buckets_mut(MediaKind::Anime)
            .get_mut(Category::Trending)
            .extend([item(1), item(2)]);
        data
    }

    fn cache() -> (DiscoveryCache<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (DiscoveryCache::new(store.clone()), store)
    }

    fn cache_cleared(store: &MemoryStore) -> bool {
        !store.contains(DISCOVER_DATA) && !store.contains(DISCOVER_TIMESTAMP)
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (cache, _) = cache();
        let payload = anime_payload();
        cache.write_at(&payload, T).await;
        assert_eq!(cache.read_at(T).await, Some(payload));
    }

    #[tokio::test]
    async fn test_read_at_exact_ttl_is_fresh() {
        let (cache, _) = cache();
        cache.write_at(&anime_payload(), T).await;
        assert!(cache.read_at(T + DEFAULT_TTL_MS).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_cache_is_cleared() {
        let (cache, store) = cache();
        cache.write_at(&anime_payload(), T).await;

        assert_eq!(cache.read_at(T + 43_200_001).await, None);
        assert!(cache_cleared(&store));
    }

    #[tokio::test]
    async fn test_empty_payload_is_cleared_immediately() {
        let (cache, store) = cache();
        cache.write_at(&DiscoverData::default(), T).await;

        assert_eq!(cache.read_at(T + 1).await, None);
        assert!(cache_cleared(&store));
    }

    #[tokio::test]
    async fn test_absent_cache() {
        let (cache, store) = cache();
        assert_eq!(cache.read_at(T).await, None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_payload_is_cleared() {
        let store = MemoryStore::with_entries([
            (DISCOVER_DATA, "{not json".to_string()),
            (DISCOVER_TIMESTAMP, T.to_string()),
        ]);
        let cache = DiscoveryCache::new(store.clone());

        assert_eq!(cache.read_at(T + 1).await, None);
        assert!(cache_cleared(&store));
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_is_cleared() {
        let payload = serde_json::to_string(&anime_payload()).unwrap();
        let store = MemoryStore::with_entries([
            (DISCOVER_DATA, payload),
            (DISCOVER_TIMESTAMP, "yesterday".to_string()),
        ]);
        let cache = DiscoveryCache::new(store.clone());

        assert_eq!(cache.read_at(T).await, None);
        assert!(cache_cleared(&store));
    }

    #[tokio::test]
    async fn test_payload_without_timestamp_is_cleared() {
        let payload = serde_json::to_string(&anime_payload()).unwrap();
        let store = MemoryStore::with_entries([(DISCOVER_DATA, payload)]);
        let cache = DiscoveryCache::new(store.clone());

        assert_eq!(cache.read_at(T).await, None);
        assert!(cache_cleared(&store));
    }

    #[tokio::test]
    async fn test_future_timestamp_is_fresh() {
        let (cache, _) = cache();
        cache.write_at(&anime_payload(), T).await;
        assert!(cache.read_at(T - 60_000).await.is_some());
    }

    #[tokio::test]
    async fn test_web_client_payload_shape_is_readable() {
        let raw = r#"{"anime":{"trending":[],"popular":[{"id":5,"title":{"english":"Frieren"}}],"new":[],"comingSoon":[]},"manga":{"trending":[],"popular":[],"new":[],"comingSoon":[]}}"#;
        let store = MemoryStore::with_entries([
            (DISCOVER_DATA, raw.to_string()),
            (DISCOVER_TIMESTAMP, T.to_string()),
        ]);
        let cache = DiscoveryCache::new(store);

        let data = cache.read_at(T + 1000).await.unwrap();
        assert_eq!(data.anime.popular[0].display_title(), "Frieren");
    }

    #[tokio::test]
    async fn test_custom_ttl() {
        let store = MemoryStore::new();
        let cache = DiscoveryCache::with_ttl(store, 1_000);
        cache.write_at(&anime_payload(), T).await;
        assert!(cache.read_at(T + 1_000).await.is_some());
        assert!(cache.read_at(T + 1_001).await.is_none());
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Migration("read-only".to_string()))
        }
        async fn set_all(&self, _entries: &[(&str, &str)]) -> Result<(), StorageError> {
            Err(StorageError::Migration("read-only".to_string()))
        }
        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
        async fn remove_all(&self, _keys: &[&str]) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let cache = DiscoveryCache::new(ReadOnlyStore);
        cache.write_at(&anime_payload(), T).await;
        assert_eq!(cache.read_at(T).await, None);
    }
}

use futures::stream::{self, StreamExt};
use thiserror::Error;

use super::cache::DiscoveryCache;
use super::types::{Category, DiscoverData};
use crate::media::{MediaItem, MediaKind};
use crate::storage::KeyValueStore;
use crate::util::{resolve_endpoint, EndpointError};

/// Items kept per bucket unless configured otherwise.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Bucket fetches in flight at once unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 2;

#[derive(Debug, Error)]
enum BucketError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

/// Where a loaded discovery payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Cached,
    Fetched,
}

/// Loads the discovery feed, going through [`DiscoveryCache`].
#[derive(Clone)]
pub struct DiscoverFeed<S> {
    client: reqwest::Client,
    base_url: String,
    cache: DiscoveryCache<S>,
    list_limit: usize,
    concurrency: usize,
}

impl<S: KeyValueStore> DiscoverFeed<S> {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, cache: DiscoveryCache<S>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            cache,
            list_limit: DEFAULT_LIST_LIMIT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn cache(&self) -> &DiscoveryCache<S> {
        &self.cache
    }

    /// Cached payload when one is usable, otherwise a fresh fetch that is
    /// then written to the cache. `force_refresh` skips the cache read.
    pub async fn load(&self, force_refresh: bool) -> (DiscoverData, Freshness) {
        if !force_refresh {
            if let Some(data) = self.cache.read().await {
                return (data, Freshness::Cached);
            }
        }

        let data = self.fetch().await;
        if data.is_empty() {
            // Would be discarded on the next read anyway.
            tracing::warn!("Discovery fetch returned no items, not caching");
        } else {
            self.cache.write(&data).await;
        }
        (data, Freshness::Fetched)
    }

    /// Fetch all eight buckets from the search API.
    ///
    /// A bucket that fails to load is left empty; the load as a whole never
    /// fails.
    pub async fn fetch(&self) -> DiscoverData {
        let jobs = MediaKind::ALL
            .into_iter()
            .flat_map(|kind| Category::ALL.into_iter().map(move |category| (kind, category)));

        let results: Vec<(MediaKind, Category, Vec<MediaItem>)> = stream::iter(jobs)
            .map(|(kind, category)| async move {
                let items = match self.fetch_bucket(kind, category).await {
                    Ok(items) => items,
                    Err(e) => {
                        tracing::warn!(
                            kind = %kind,
                            category = category.path_segment(),
                            error = %e,
                            "Failed to fetch discovery list"
                        );
                        Vec::new()
                    }
                };
                (kind, category, items)
            })
            .buffered(self.concurrency.max(1))
            .collect()
            .await;

        let mut data = DiscoverData::default();
        for (kind, category, items) in results {
            *data.buckets_mut(kind).get_mut(category) = items;
        }
        tracing::info!(items = data.total_items(), "Fetched discovery lists");
        data
    }

    async fn fetch_bucket(
        &self,
        kind: MediaKind,
        category: Category,
    ) -> Result<Vec<MediaItem>, BucketError> {
        let path = format!("/api/search/{}/{}", category.path_segment(), kind.as_api());
        let url = resolve_endpoint(&self.base_url, &path)?;

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(BucketError::HttpStatus(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let raw: Vec<serde_json::Value> = serde_json::from_slice(&body)?;
        Ok(parse_items(raw, self.list_limit))
    }
}

/// Keep the first `limit` entries that parse as media items.
fn parse_items(raw: Vec<serde_json::Value>, limit: usize) -> Vec<MediaItem> {
    raw.into_iter()
        .filter_map(|value| match serde_json::from_value::<MediaItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparseable media item");
                None
            }
        })
        .take(limit)
        .collect()
}

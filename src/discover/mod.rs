//! Discovery feed: trending, popular, new and coming-soon lists per media kind.
//!
//! - [`types`] - the eight-bucket payload
//! - [`DiscoveryCache`] - 12-hour local snapshot that heals itself when stale,
//!   empty or corrupt
//! - [`DiscoverFeed`] - fetches the lists from the search API through the cache
//!
//! # Example
//!
//! ```ignore
//! use anilog::discover::{DiscoverFeed, DiscoveryCache};
//!
//! let feed = DiscoverFeed::new(client, base_url, DiscoveryCache::new(store));
//! let (data, freshness) = feed.load(false).await;
//! ```

mod cache;
mod loader;
pub mod types;

pub use cache::{DiscoveryCache, DEFAULT_TTL_MS};
pub use loader::{DiscoverFeed, Freshness, DEFAULT_CONCURRENCY, DEFAULT_LIST_LIMIT};
pub use types::{Category, DiscoverData, MediaBuckets};

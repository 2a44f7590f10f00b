//! Utility functions shared by the API-facing modules.
//!
//! - **Endpoint resolution**: join `/api/...` paths onto the configured base URL
//! - **Clock**: epoch-millisecond timestamps for cache bookkeeping
//!
//! # Examples
//!
//! ```
//! use anilog::util::resolve_endpoint;
//!
//! let url = resolve_endpoint("http://localhost:8080", "/api/search/trending/ANIME").unwrap();
//! assert_eq!(url.path(), "/api/search/trending/ANIME");
//! ```

mod endpoint;

pub use endpoint::{resolve_endpoint, EndpointError};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

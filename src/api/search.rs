use serde::Serialize;
use thiserror::Error;

use crate::auth::ApiResponse;
use crate::media::{MediaItem, MediaKind};
use crate::util::{resolve_endpoint, EndpointError};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Search rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

/// Catalog search filters. Empty filters are sent as empty lists, which the
/// server treats as "any".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub format: Vec<String>,
    pub status: Vec<String>,
    pub is_adult: bool,
    /// Inclusive `[min, max]` on the 0-100 scale.
    pub average_score: Vec<u8>,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            query: query.into(),
            kind,
            format: Vec::new(),
            status: Vec::new(),
            is_adult: false,
            average_score: vec![0, 100],
            genres: Vec::new(),
            sort_by: None,
        }
    }
}

/// Run a catalog search. Search is public, so this goes out without a
/// session.
pub async fn search(
    client: &reqwest::Client,
    base_url: &str,
    query: &SearchQuery,
) -> Result<Vec<MediaItem>, SearchError> {
    let url = resolve_endpoint(base_url, "/api/search")?;
    let response = client.post(url).json(query).send().await?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?;
    if !status.is_success() {
        let response = ApiResponse::new(status, headers, body.to_vec());
        return Err(SearchError::Rejected {
            status: status.as_u16(),
            message: response.error_message(),
        });
    }

    let items: Vec<MediaItem> = serde_json::from_slice(&body)?;
    tracing::debug!(query = %query.query, kind = %query.kind, items = items.len(), "Search finished");
    Ok(items)
}

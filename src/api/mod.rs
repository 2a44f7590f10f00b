//! Typed calls for the rest of the AniLog API.
//!
//! Everything except [`search`] goes through [`AuthGateway::send`], so a
//! stale token is refreshed once before a call gives up with
//! [`ApiError::LoginRequired`].
//!
//! - [`profile`] - read and update the profile, push ranking orders
//! - [`lists`] - the watchlist and the watched/read list
//! - [`follow`] - follow, follow requests and their statuses
//! - [`search`] - catalog search (no session needed)

pub mod follow;
pub mod lists;
pub mod profile;
pub mod search;

use thiserror::Error;

use crate::auth::{ApiRequest, ApiResponse, AuthGateway, GatewayError, Outcome};
use crate::storage::KeyValueStore;

pub use follow::{
    accept_request, decline_request, follow, follow_statuses, request_follow, unfollow, Follow,
    FollowStatus,
};
pub use lists::{
    add_to_watchlist, add_watched, fetch_watchlist, remove_from_watchlist, remove_watched,
    update_progress, update_watched, ListItem, NewListItem, WatchStatus, WatchedItem,
};
pub use profile::{fetch_profile, push_ranking, update_profile, Profile, ProfileUpdate};
pub use search::{search, SearchError, SearchQuery};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The session is gone; the caller has to log in again.
    #[error("Login required")]
    LoginRequired,
    #[error("Request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Send `request` and hand back the response if the server accepted it.
async fn send_accepted<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    request: &ApiRequest,
) -> Result<ApiResponse, ApiError> {
    let response = match gateway.send(request).await? {
        Outcome::Completed(response) => response,
        Outcome::Unauthorized(_) | Outcome::SessionMissing => return Err(ApiError::LoginRequired),
    };

    if !response.is_success() {
        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status().as_u16(),
            "API request rejected"
        );
        return Err(ApiError::Rejected {
            status: response.status().as_u16(),
            message: response.error_message(),
        });
    }
    Ok(response)
}

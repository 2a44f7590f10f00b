//! The watchlist (titles saved for later) and the watched/read list.
//!
//! Watched entries come back as [`TrackedItem`], the same shape the ranking
//! reads.

use serde::{Deserialize, Serialize};

use super::{send_accepted, ApiError};
use crate::auth::{ApiRequest, AuthGateway, Session};
use crate::media::MediaKind;
use crate::ranking::TrackedItem;
use crate::storage::KeyValueStore;

/// Body fields plus the owning user, as every list write expects.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnedBy<'a, T> {
    user_id: i64,
    #[serde(flatten)]
    item: &'a T,
}

// ============================================================================
// Watchlist
// ============================================================================

/// One saved watchlist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: i64,
    #[serde(default)]
    pub anilist_id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<MediaKind>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub added_date: Option<String>,
}

/// A catalog title to put on the watchlist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListItem {
    pub anilist_id: i64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

pub async fn fetch_watchlist<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    kind: MediaKind,
) -> Result<Vec<ListItem>, ApiError> {
    let request = ApiRequest::get(format!(
        "/api/user/{}/list/{}",
        session.user_id(),
        kind.as_api()
    ));
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

pub async fn add_to_watchlist<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    item: &NewListItem,
) -> Result<ListItem, ApiError> {
    let body = OwnedBy {
        user_id: session.user_id(),
        item,
    };
    let request = ApiRequest::post("/api/user/list/add").json(&body)?;
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

pub async fn remove_from_watchlist<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    anilist_id: i64,
) -> Result<(), ApiError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Removal {
        user_id: i64,
        anilist_id: i64,
    }

    let request = ApiRequest::delete("/api/user/list/remove").json(&Removal {
        user_id: session.user_id(),
        anilist_id,
    })?;
    send_accepted(gateway, &request).await?;
    Ok(())
}

// ============================================================================
// Watched / read list
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Watching,
    Reading,
    Completed,
    OnHold,
    Dropped,
    PlanToWatch,
    PlanToRead,
}

impl WatchStatus {
    /// `Watching` for anime, `Reading` for manga.
    pub fn in_progress(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Anime => WatchStatus::Watching,
            MediaKind::Manga => WatchStatus::Reading,
        }
    }
}

/// Fields of a watched/read entry when creating or replacing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedItem {
    pub anilist_id: i64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub status: WatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_episodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_chapters: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes_watched: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters_read: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl WatchedItem {
    /// A freshly started entry: watching for anime, reading for manga.
    pub fn started(anilist_id: i64, kind: MediaKind, title: impl Into<String>) -> Self {
        Self {
            anilist_id,
            kind,
            title: title.into(),
            status: WatchStatus::in_progress(kind),
            cover_image_url: None,
            total_episodes: None,
            total_chapters: None,
            episodes_watched: None,
            chapters_read: None,
            rating: None,
            notes: None,
        }
    }
}

pub async fn add_watched<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    item: &WatchedItem,
) -> Result<TrackedItem, ApiError> {
    let body = OwnedBy {
        user_id: session.user_id(),
        item,
    };
    let request = ApiRequest::post("/api/user/watched/add").json(&body)?;
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

/// Replace the entry with server-side id `item_id`.
pub async fn update_watched<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    item_id: i64,
    item: &WatchedItem,
) -> Result<TrackedItem, ApiError> {
    let body = OwnedBy {
        user_id: session.user_id(),
        item,
    };
    let request = ApiRequest::put(format!("/api/user/watched/{item_id}")).json(&body)?;
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

/// Set episodes watched (anime) or chapters read (manga) for a title.
pub async fn update_progress<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    anilist_id: i64,
    progress: i64,
) -> Result<TrackedItem, ApiError> {
    let request = ApiRequest::patch(format!(
        "/api/user/{}/watched/{anilist_id}/progress",
        session.user_id()
    ))
    .json(&serde_json::json!({ "progress": progress }))?;
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

pub async fn remove_watched<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    anilist_id: i64,
) -> Result<(), ApiError> {
    let request = ApiRequest::delete(format!(
        "/api/user/{}/watched/{anilist_id}",
        session.user_id()
    ));
    send_accepted(gateway, &request).await?;
    Ok(())
}

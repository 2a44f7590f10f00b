use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{ApiRequest, AuthGateway, GatewayError, Outcome, Session};
use crate::media::{MediaKind, MediaTitle};
use crate::storage::KeyValueStore;

#[derive(Debug, Error)]
pub enum TrackedError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The session is gone; the caller has to log in again.
    #[error("Login required")]
    LoginRequired,
    #[error("Failed to fetch tracked items (status {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Malformed tracked item list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One entry of the user's watched or read list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub id: i64,
    #[serde(default)]
    pub anilist_id: Option<i64>,
    #[serde(default, deserialize_with = "title_or_object")]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub episodes_watched: Option<i64>,
    #[serde(default)]
    pub total_episodes: Option<i64>,
    #[serde(default)]
    pub chapters_read: Option<i64>,
    #[serde(default)]
    pub total_chapters: Option<i64>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl TrackedItem {
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => format!("#{}", self.id),
        }
    }

    /// `watched/total` (or `read/total`) when the server reports progress.
    pub fn progress(&self) -> Option<String> {
        let (done, total) = match (self.episodes_watched, self.chapters_read) {
            (Some(done), _) => (done, self.total_episodes),
            (None, Some(done)) => (done, self.total_chapters),
            (None, None) => return None,
        };
        Some(match total {
            Some(total) => format!("{done}/{total}"),
            None => done.to_string(),
        })
    }
}

/// Titles are stored as plain strings, but some rows carry the catalog's
/// title object instead.
fn title_or_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Title {
        Plain(String),
        Catalog(MediaTitle),
    }

    Ok(match Option::<Title>::deserialize(deserializer)? {
        Some(Title::Plain(title)) => Some(title),
        Some(Title::Catalog(title)) => title.preferred().map(str::to_string),
        None => None,
    })
}

/// Path of the tracked list for `user_id` and `kind`.
pub fn tracked_path(user_id: i64, kind: MediaKind) -> String {
    format!("/api/user/{user_id}/watched/type/{}", kind.as_api())
}

/// The user's tracked items of `kind`, in server order.
pub async fn fetch_tracked<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    kind: MediaKind,
) -> Result<Vec<TrackedItem>, TrackedError> {
    let request = ApiRequest::get(tracked_path(session.user_id(), kind));
    let response = match gateway.send(&request).await? {
        Outcome::Completed(response) => response,
        Outcome::Unauthorized(_) | Outcome::SessionMissing => {
            return Err(TrackedError::LoginRequired)
        }
    };

    if !response.is_success() {
        return Err(TrackedError::Rejected {
            status: response.status().as_u16(),
            message: response.error_message(),
        });
    }

    let items: Vec<TrackedItem> = response.json()?;
    tracing::debug!(kind = %kind, items = items.len(), "Fetched tracked items");
    Ok(items)
}

/// Ids of the user's tracked items of `kind`, in server order.
pub async fn fetch_tracked_ids<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    kind: MediaKind,
) -> Result<Vec<i64>, TrackedError> {
    let items = fetch_tracked(gateway, session, kind).await?;
    Ok(items.into_iter().map(|item| item.id).collect())
}

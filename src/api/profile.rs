use serde::{Deserialize, Serialize};

use super::{send_accepted, ApiError};
use crate::auth::{ApiRequest, AuthGateway, Session};
use crate::media::MediaKind;
use crate::storage::KeyValueStore;

/// A user's profile as the API returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_anime: Option<String>,
    #[serde(default)]
    pub favorite_manga: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub favorite_genres: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A partial profile update. Fields left as `None` are not sent, and the
/// server keeps their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_anime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_manga: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_genres: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anime_ranking_order: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manga_ranking_order: Option<Vec<i64>>,
}

impl ProfileUpdate {
    /// An update carrying only the ranking order for `kind`.
    pub fn ranking(kind: MediaKind, order: &[i64]) -> Self {
        let order = Some(order.to_vec());
        match kind {
            MediaKind::Anime => Self {
                anime_ranking_order: order,
                ..Self::default()
            },
            MediaKind::Manga => Self {
                manga_ranking_order: order,
                ..Self::default()
            },
        }
    }
}

fn profile_path(user_id: i64) -> String {
    format!("/api/profile/{user_id}")
}

pub async fn fetch_profile<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
) -> Result<Profile, ApiError> {
    let request = ApiRequest::get(profile_path(session.user_id()));
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

/// Apply `update` and return the profile as the server stored it.
pub async fn update_profile<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    update: &ProfileUpdate,
) -> Result<Profile, ApiError> {
    let request = ApiRequest::put(profile_path(session.user_id())).json(update)?;
    let response = send_accepted(gateway, &request).await?;
    Ok(response.json()?)
}

/// Send the ranking order for `kind` to the profile, so other clients of the
/// same account see it.
pub async fn push_ranking<S: KeyValueStore>(
    gateway: &AuthGateway<S>,
    session: &Session,
    kind: MediaKind,
    order: &[i64],
) -> Result<(), ApiError> {
    let request =
        ApiRequest::put(profile_path(session.user_id())).json(&ProfileUpdate::ranking(kind, order))?;
    send_accepted(gateway, &request).await?;
    tracing::debug!(kind = %kind, items = order.len(), "Pushed ranking order");
    Ok(())
}

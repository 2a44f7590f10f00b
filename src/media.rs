//! Media kinds and catalog entries shared by discovery and rankings.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two kinds of media the tracker follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaKind {
    Anime,
    Manga,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Anime, MediaKind::Manga];

    /// Upper-case form used in API paths (`ANIME`, `MANGA`).
    pub fn as_api(self) -> &'static str {
        match self {
            MediaKind::Anime => "ANIME",
            MediaKind::Manga => "MANGA",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Anime => "anime",
            MediaKind::Manga => "manga",
        })
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anime" => Ok(MediaKind::Anime),
            "manga" => Ok(MediaKind::Manga),
            other => Err(format!("unknown media kind '{other}' (expected anime or manga)")),
        }
    }
}

/// Localised titles as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaTitle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romaji: Option<String>,
    #[serde(default, alias = "nativeTitle", skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
}

impl MediaTitle {
    /// English, then romaji, then native; `None` if all are blank.
    pub fn preferred(&self) -> Option<&str> {
        [&self.english, &self.romaji, &self.native]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.trim().is_empty())
    }
}

/// One catalog entry.
///
/// Only the fields the client reads are modelled; everything else the API
/// sends is kept in `extra` so cached entries round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<MediaTitle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MediaItem {
    pub fn display_title(&self) -> &str {
        self.title
            .as_ref()
            .and_then(MediaTitle::preferred)
            .unwrap_or("Untitled")
    }

    /// Average score on a 0–10 scale (the API reports 0–100).
    pub fn score_out_of_ten(&self) -> Option<f64> {
        self.average_score.map(|s| s as f64 / 10.0)
    }
}

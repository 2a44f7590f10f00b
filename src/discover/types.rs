use serde::{Deserialize, Serialize};

use crate::media::{MediaItem, MediaKind};

/// The four discovery lists shown per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Trending,
    Popular,
    New,
    ComingSoon,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Trending,
        Category::Popular,
        Category::New,
        Category::ComingSoon,
    ];

    /// Segment used in `/api/search/{segment}/{KIND}`.
    pub fn path_segment(self) -> &'static str {
        match self {
            Category::Trending => "trending",
            Category::Popular => "popular",
            Category::New => "new",
            Category::ComingSoon => "comingsoon",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Trending => "Trending",
            Category::Popular => "Popular",
            Category::New => "New",
            Category::ComingSoon => "Coming Soon",
        }
    }
}

/// The four category lists for one media kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MediaBuckets {
    pub trending: Vec<MediaItem>,
    pub popular: Vec<MediaItem>,
    pub new: Vec<MediaItem>,
    pub coming_soon: Vec<MediaItem>,
}

impl MediaBuckets {
    pub fn get(&self, category: Category) -> &[MediaItem] {
        match category {
            Category::Trending => &self.trending,
            Category::Popular => &self.popular,
            Category::New => &self.new,
            Category::ComingSoon => &self.coming_soon,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Vec<MediaItem> {
        match category {
            Category::Trending => &mut self.trending,
            Category::Popular => &mut self.popular,
            Category::New => &mut self.new,
            Category::ComingSoon => &mut self.coming_soon,
        }
    }

    pub fn total_items(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }
}

/// Discovery feed payload: two media kinds × four categories.
///
/// Serialized in the same camelCase shape the web client caches
/// (`{"anime": {"trending": [...], "comingSoon": [...]}, "manga": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverData {
    pub anime: MediaBuckets,
    pub manga: MediaBuckets,
}

impl DiscoverData {
    pub fn buckets(&self, kind: MediaKind) -> &MediaBuckets {
        match kind {
            MediaKind::Anime => &self.anime,
            MediaKind::Manga => &self.manga,
        }
    }

    pub fn buckets_mut(&mut self, kind: MediaKind) -> &mut MediaBuckets {
        match kind {
            MediaKind::Anime => &mut self.anime,
            MediaKind::Manga => &mut self.manga,
        }
    }

    pub fn total_items(&self) -> usize {
        self.anime.total_items() + self.manga.total_items()
    }

    /// True when all eight buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}

//! Well-known key names shared with the web client's local storage layout.

pub const ACCESS_TOKEN: &str = "accessToken";
pub const REFRESH_TOKEN: &str = "refreshToken";
pub const USER_ID: &str = "userId";

/// The three session entries, removed together on teardown.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER_ID];

pub const DISCOVER_DATA: &str = "discoverData";
pub const DISCOVER_TIMESTAMP: &str = "discoverTimestamp";

pub const ANIME_RANKING_ORDER: &str = "animeRankingOrder";
pub const MANGA_RANKING_ORDER: &str = "mangaRankingOrder";

pub mod api;
pub mod auth;
pub mod config;
pub mod discover;
pub mod media;
pub mod ranking;
pub mod storage;
pub mod util;

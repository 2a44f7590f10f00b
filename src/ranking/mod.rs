//! User-controlled ranking of tracked items.
//!
//! The pure operations ([`reconcile_order`], [`move_item`]) never touch
//! storage. [`RankingBook`] persists one order per media kind and runs them
//! against what is stored, and [`fetch_tracked`] supplies the current set of
//! tracked items from the API.

mod book;
mod order;
mod tracked;

pub use book::{order_key, RankingBook};
pub use order::{move_item, reconcile_order};
pub use tracked::{fetch_tracked, fetch_tracked_ids, tracked_path, TrackedError, TrackedItem};

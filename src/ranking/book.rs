use super::order::{move_item, reconcile_order};
use crate::media::MediaKind;
use crate::storage::keys::{ANIME_RANKING_ORDER, MANGA_RANKING_ORDER};
use crate::storage::{KeyValueStore, StorageError};

/// Storage key holding the pending order for `kind`.
pub fn order_key(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Anime => ANIME_RANKING_ORDER,
        MediaKind::Manga => MANGA_RANKING_ORDER,
    }
}

/// Locally persisted ranking orders, one per media kind.
///
/// Each order is a JSON array of item ids, the same shape the web client
/// keeps, so either client can pick up where the other left off.
#[derive(Clone)]
pub struct RankingBook<S> {
    store: S,
}

impl<S: KeyValueStore> RankingBook<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The saved order for `kind`; empty when nothing (or garbage) is stored.
    ///
    /// Repeated ids in the stored array keep their first position only.
    pub async fn load(&self, kind: MediaKind) -> Result<Vec<i64>, StorageError> {
        let Some(raw) = self.store.get(order_key(kind)).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(order) => Ok(reconcile_order(&order, &order)),
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Ignoring unreadable ranking order");
                Ok(Vec::new())
            }
        }
    }

    pub async fn save(&self, kind: MediaKind, order: &[i64]) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(order)?;
        self.store.set(order_key(kind), &serialized).await
    }

    /// Reconcile the saved order against the ids currently tracked, persist
    /// the result and return it.
    pub async fn sync(&self, kind: MediaKind, current: &[i64]) -> Result<Vec<i64>, StorageError> {
        let saved = self.load(kind).await?;
        let order = reconcile_order(&saved, current);
        if order != saved {
            self.save(kind, &order).await?;
            tracing::debug!(
                kind = %kind,
                items = order.len(),
                dropped = saved.iter().filter(|id| !order.contains(id)).count(),
                "Ranking order reconciled"
            );
        }
        Ok(order)
    }

    /// Move one entry of the saved order and persist the result.
    ///
    /// Out-of-range or equal positions leave the stored order as it was.
    pub async fn move_item(
        &self,
        kind: MediaKind,
        from: usize,
        to: usize,
    ) -> Result<Vec<i64>, StorageError> {
        let saved = self.load(kind).await?;
        let order = move_item(&saved, Some(from), Some(to));
        if order != saved {
            self.save(kind, &order).await?;
        }
        Ok(order)
    }

    /// Forget the saved order for `kind`.
    pub async fn clear(&self, kind: MediaKind) -> Result<(), StorageError> {
        self.store.remove(order_key(kind)).await
    }
}

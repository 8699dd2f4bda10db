//! Storage updates still owed for removals made while storage was out of reach.

use indexmap::IndexSet;
use tokio::sync::Mutex;

use super::game::GameId;

/// One removal that has not reached storage yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PendingRemoval {
    /// Forgotten game whose record must be deleted.
    Forget(GameId),
    /// Finished game whose record must be flagged inactive.
    Retire(GameId),
    /// Cleared alias whose record must be deleted.
    Alias(String),
}

impl PendingRemoval {
    fn is_game(&self, id: &GameId) -> bool {
        matches!(self, PendingRemoval::Forget(pending) | PendingRemoval::Retire(pending) if pending == id)
    }

    fn is_alias(&self, player_id: &str) -> bool {
        matches!(self, PendingRemoval::Alias(pending) if pending == player_id)
    }
}

/// Removals waiting for storage, in the order they happened.
#[derive(Default)]
pub struct PendingRemovals {
    inner: Mutex<IndexSet<PendingRemoval>>,
}

impl PendingRemovals {
    pub async fn record(&self, removal: PendingRemoval) {
        self.inner.lock().await.insert(removal);
    }

    /// Drop `removal` once storage caught up with it.
    pub async fn settle(&self, removal: &PendingRemoval) -> bool {
        self.inner.lock().await.shift_remove(removal)
    }

    pub async fn snapshot(&self) -> Vec<PendingRemoval> {
        self.inner.lock().await.iter().cloned().collect()
    }

    /// Forget owed removals of game `id`, which is monitored again.
    pub async fn cancel_game(&self, id: &GameId) {
        self.inner.lock().await.retain(|removal| !removal.is_game(id));
    }

    /// Forget owed removals of the alias of `player_id`, which is registered again.
    pub async fn cancel_alias(&self, player_id: &str) {
        self.inner
            .lock()
            .await
            .retain(|removal| !removal.is_alias(player_id));
    }

    /// Whether a stored record of game `id` is stale and must not be restored.
    pub async fn blocks_game(&self, id: &GameId) -> bool {
        self.inner.lock().await.iter().any(|removal| removal.is_game(id))
    }

    /// Whether the stored alias of `player_id` is stale and must not be restored.
    pub async fn blocks_alias(&self, player_id: &str) -> bool {
        self.inner
            .lock()
            .await
            .iter()
            .any(|removal| removal.is_alias(player_id))
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn game_removals_block_until_cancelled() {
        let pending = PendingRemovals::default();
        let id = GameId::new("g1");
        pending.record(PendingRemoval::Forget(id.clone())).await;
        pending.record(PendingRemoval::Alias("100".into())).await;

        assert!(pending.blocks_game(&id).await);
        assert!(!pending.blocks_game(&GameId::new("g2")).await);
        assert!(pending.blocks_alias("100").await);

        pending.cancel_game(&id).await;
        assert!(!pending.blocks_game(&id).await);
        assert_eq!(pending.snapshot().await, [PendingRemoval::Alias("100".into())]);
    }

    #[tokio::test]
    async fn settling_removes_only_that_entry() {
        let pending = PendingRemovals::default();
        let retire = PendingRemoval::Retire(GameId::new("g1"));
        pending.record(retire.clone()).await;
        pending.record(retire.clone()).await;
        pending.record(PendingRemoval::Alias("100".into())).await;

        assert!(pending.settle(&retire).await);
        assert!(!pending.settle(&retire).await);
        assert!(!pending.is_empty().await);
    }
}

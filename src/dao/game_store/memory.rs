//! Process-local store used for local runs and tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::dao::{
    game_store::GameStore,
    models::{AliasEntity, GameRecordEntity},
    storage::{StorageError, StorageResult},
};

/// Failure reported while the store is switched offline.
#[derive(Debug, Error)]
#[error("in-memory store is offline")]
pub struct MemoryStoreOffline;

impl From<MemoryStoreOffline> for StorageError {
    fn from(err: MemoryStoreOffline) -> Self {
        StorageError::unavailable("memory", err)
    }
}

/// [`GameStore`] keeping everything in concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<String, GameRecordEntity>,
    aliases: DashMap<String, AliasEntity>,
    offline: AtomicBool,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again) to simulate an outage.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Copy of the record stored for `game_id`, active or not.
    pub fn game(&self, game_id: &str) -> Option<GameRecordEntity> {
        self.inner
            .games
            .get(game_id)
            .map(|entry| entry.value().clone())
    }

    fn ensure_online(&self) -> Result<(), MemoryStoreOffline> {
        if self.inner.offline.load(Ordering::SeqCst) {
            Err(MemoryStoreOffline)
        } else {
            Ok(())
        }
    }
}

impl GameStore for MemoryGameStore {
    fn save_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.inner.games.insert(game.game_id.clone(), game);
            Ok(())
        })
    }

    fn set_game_active(
        &self,
        game_id: String,
        active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let Some(mut record) = store.inner.games.get_mut(&game_id) else {
                return Ok(false);
            };
            record.is_active = active;
            record.updated_at = SystemTime::now();
            Ok(true)
        })
    }

    fn delete_game(&self, game_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store.inner.games.remove(&game_id).is_some())
        })
    }

    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            let mut games: Vec<_> = store
                .inner
                .games
                .iter()
                .filter(|entry| entry.is_active)
                .map(|entry| entry.value().clone())
                .collect();
            games.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(games)
        })
    }

    fn save_alias(&self, alias: AliasEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            store.inner.aliases.insert(alias.player_id.clone(), alias);
            Ok(())
        })
    }

    fn delete_alias(&self, player_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store.inner.aliases.remove(&player_id).is_some())
        })
    }

    fn list_aliases(&self) -> BoxFuture<'static, StorageResult<Vec<AliasEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_online()?;
            Ok(store
                .inner
                .aliases
                .iter()
                .map(|entry| entry.value().clone())
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_online().map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.health_check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::PlayerEntity;

    fn record(id: &str) -> GameRecordEntity {
        let now = SystemTime::now();
        GameRecordEntity {
            game_id: id.into(),
            guild_id: None,
            channel_id: "chan".into(),
            is_active: true,
            players: vec![PlayerEntity {
                id: "100".into(),
                display_name: "Alice".into(),
                nickname: None,
                username: "alice".into(),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn inactive_games_are_not_listed() {
        let store = MemoryGameStore::new();
        store.save_game(record("g1")).await.unwrap();
        store.save_game(record("g2")).await.unwrap();

        assert!(store.set_game_active("g1".into(), false).await.unwrap());
        assert!(!store.set_game_active("nope".into(), false).await.unwrap());

        let active = store.list_active_games().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].game_id, "g2");
        assert!(!store.game("g1").unwrap().is_active);
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryGameStore::new();
        store.set_offline(true);

        assert!(store.save_game(record("g1")).await.is_err());
        assert!(store.list_aliases().await.is_err());
        assert!(store.health_check().await.is_err());

        store.set_offline(false);
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn aliases_are_replaced_per_player() {
        let store = MemoryGameStore::new();
        for alias in ["first", "second"] {
            store
                .save_alias(AliasEntity {
                    player_id: "100".into(),
                    external_alias: alias.into(),
                })
                .await
                .unwrap();
        }

        let aliases = store.list_aliases().await.unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].external_alias, "second");
        assert!(store.delete_alias("100".into()).await.unwrap());
        assert!(!store.delete_alias("100".into()).await.unwrap());
    }
}

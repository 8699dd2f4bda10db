use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        storage::{STORAGE_CALL_TIMEOUT, StorageError, bounded},
    },
    services::{rehydration, removal_sync},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect to the storage backend, restore persisted state once, then keep
/// the shared state in degraded mode whenever the backend is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;
    let mut rehydrated = false;

    loop {
        match connect().await {
            Ok(store) => {
                if !rehydrated {
                    match rehydration::rehydrate(&state, store.as_ref()).await {
                        Ok(_) => rehydrated = true,
                        Err(err) => {
                            warn!(error = %err, "failed to restore state from storage; retrying");
                            sleep(delay).await;
                            delay = (delay * 2).min(MAX_DELAY);
                            continue;
                        }
                    }
                }

                state.install_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                supervise(&state, store.as_ref()).await;
                state.clear_game_store().await;

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Health-check `store` until reconnecting fails too many times in a row.
///
/// Removals deferred while storage was failing are replayed on every healthy check.
async fn supervise(state: &SharedState, store: &dyn GameStore) {
    loop {
        match bounded(STORAGE_CALL_TIMEOUT, "health_check", store.health_check()).await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("storage healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                if !state.pending_removals().is_empty().await {
                    removal_sync::replay(state, store, STORAGE_CALL_TIMEOUT).await;
                }
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                let mut attempt = 0;
                let mut reconnect_delay = INITIAL_DELAY;
                let mut reconnected = false;

                while attempt < MAX_RECONNECT_ATTEMPTS {
                    match bounded(STORAGE_CALL_TIMEOUT, "try_reconnect", store.try_reconnect()).await {
                        Ok(()) => {
                            info!("storage reconnection succeeded after health check failure");
                            reconnected = true;
                            break;
                        }
                        Err(reconnect_err) => {
                            if attempt == 0 {
                                warn!(
                                    attempt, error = %reconnect_err,
                                    "storage reconnect first attempt failed; entering degraded mode"
                                );
                                state.update_degraded(true);
                            } else {
                                warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                            }
                            attempt += 1;
                            sleep(reconnect_delay).await;
                            reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                        }
                    }
                }

                if !reconnected {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    return;
                }
                state.update_degraded(false);
                sleep(HEALTH_POLL_INTERVAL).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::{
            game_store::memory::MemoryGameStore,
            models::AliasEntity,
        },
        state::AppState,
    };

    #[tokio::test(start_paused = true)]
    async fn installs_store_after_rehydrating() {
        let store = MemoryGameStore::new();
        store
            .save_alias(AliasEntity {
                player_id: "100".into(),
                external_alias: "AliceWeb".into(),
            })
            .await
            .unwrap();

        let state = AppState::new();
        let mut degraded = state.degraded_watcher();
        let connect_store = store.clone();
        let task = tokio::spawn(run(state.clone(), move || {
            let store = connect_store.clone();
            async move { Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store)) }
        }));

        degraded.wait_for(|degraded| !*degraded).await.unwrap();
        assert!(state.game_store().await.is_some());
        assert_eq!(
            state.identities_snapshot().await.alias_for("100"),
            Some("AliceWeb")
        );

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn failing_health_check_enters_degraded_mode() {
        let store = MemoryGameStore::new();
        let state = AppState::new();
        let mut degraded = state.degraded_watcher();
        let connect_store = store.clone();
        let task = tokio::spawn(run(state.clone(), move || {
            let store = connect_store.clone();
            async move { Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store)) }
        }));

        degraded.wait_for(|degraded| !*degraded).await.unwrap();
        store.set_offline(true);
        degraded.wait_for(|degraded| *degraded).await.unwrap();

        store.set_offline(false);
        degraded.wait_for(|degraded| !*degraded).await.unwrap();

        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_removals_are_replayed_once_healthy() {
        let store = MemoryGameStore::new();
        store
            .save_alias(AliasEntity {
                player_id: "100".into(),
                external_alias: "AliceWeb".into(),
            })
            .await
            .unwrap();

        let state = AppState::new();
        let mut degraded = state.degraded_watcher();
        let connect_store = store.clone();
        let task = tokio::spawn(run(state.clone(), move || {
            let store = connect_store.clone();
            async move { Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store)) }
        }));
        degraded.wait_for(|degraded| !*degraded).await.unwrap();

        store.set_offline(true);
        crate::services::alias_service::clear_alias(&state, "100").await;
        assert!(!state.pending_removals().is_empty().await);
        store.set_offline(false);

        sleep(HEALTH_POLL_INTERVAL * 4).await;
        assert!(state.pending_removals().is_empty().await);
        assert!(store.list_aliases().await.unwrap().is_empty());

        task.abort();
    }
}

//! Propagation of game and alias removals to storage.
//!
//! A removal that cannot reach storage is remembered in the shared state and
//! replayed once the backend answers again; until then the stale record is
//! never restored.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        storage::{StorageResult, bounded},
    },
    state::{SharedState, removals::PendingRemoval},
};

/// Apply `removal` to the installed store, or remember it for later.
///
/// Returns whether storage is now up to date.
pub async fn persist(state: &SharedState, removal: PendingRemoval, limit: Duration) -> bool {
    let Some(store) = state.game_store().await else {
        warn!(?removal, "storage unavailable; removal deferred");
        state.pending_removals().record(removal).await;
        return false;
    };

    match apply(store.as_ref(), &removal, limit).await {
        Ok(existed) => {
            if !existed {
                debug!(?removal, "removal had no stored record");
            }
            true
        }
        Err(err) => {
            warn!(?removal, error = %err, "failed to persist removal; deferred");
            state.pending_removals().record(removal).await;
            false
        }
    }
}

/// Push every deferred removal to `store`; failures stay deferred.
///
/// Returns how many removals were settled.
pub async fn replay(state: &SharedState, store: &dyn GameStore, limit: Duration) -> usize {
    let mut settled = 0;
    for removal in state.pending_removals().snapshot().await {
        match apply(store, &removal, limit).await {
            Ok(_) => {
                state.pending_removals().settle(&removal).await;
                settled += 1;
            }
            Err(err) => warn!(?removal, error = %err, "deferred removal still failing"),
        }
    }
    if settled > 0 {
        info!(settled, "deferred removals written to storage");
    }
    settled
}

async fn apply(
    store: &dyn GameStore,
    removal: &PendingRemoval,
    limit: Duration,
) -> StorageResult<bool> {
    match removal {
        PendingRemoval::Forget(id) => {
            bounded(limit, "delete_game", store.delete_game(id.to_string())).await
        }
        PendingRemoval::Retire(id) => {
            bounded(
                limit,
                "set_game_active",
                store.set_game_active(id.to_string(), false),
            )
            .await
        }
        PendingRemoval::Alias(player_id) => {
            bounded(limit, "delete_alias", store.delete_alias(player_id.clone())).await
        }
    }
}

//! Maintenance of the operator alias overrides.

use tracing::{info, warn};

use crate::{
    dao::{
        models::AliasEntity,
        storage::{STORAGE_CALL_TIMEOUT, bounded},
    },
    dto::alias::{AliasSummary, ClearAliasResponse},
    services::removal_sync,
    state::{SharedState, removals::PendingRemoval},
};

/// Every registered alias, sorted by player id.
pub async fn list_aliases(state: &SharedState) -> Vec<AliasSummary> {
    let identities = state.identities().read().await;
    let mut aliases: Vec<_> = identities
        .iter()
        .map(|(player_id, alias)| AliasSummary {
            player_id: player_id.to_owned(),
            alias: alias.to_owned(),
        })
        .collect();
    aliases.sort_by(|a, b| a.player_id.cmp(&b.player_id));
    aliases
}

/// Register `alias` as the external name of `player_id`, replacing any previous one.
///
/// The next poll cycle picks the new alias up; current turn state is not touched.
pub async fn set_alias(state: &SharedState, player_id: &str, alias: &str) -> AliasSummary {
    let alias = alias.trim().to_owned();
    let previous = state
        .identities()
        .write()
        .await
        .set_alias(player_id, alias.clone());
    state.pending_removals().cancel_alias(player_id).await;
    info!(player_id, alias = %alias, previous = ?previous, "alias registered");

    match state.game_store().await {
        Some(store) => {
            let entity = AliasEntity {
                player_id: player_id.to_owned(),
                external_alias: alias.clone(),
            };
            if let Err(err) =
                bounded(STORAGE_CALL_TIMEOUT, "save_alias", store.save_alias(entity)).await
            {
                warn!(player_id, error = %err, "failed to persist alias");
            }
        }
        None => warn!(player_id, "storage unavailable; alias not persisted"),
    }

    AliasSummary {
        player_id: player_id.to_owned(),
        alias,
    }
}

/// Drop the alias of `player_id`, if any.
pub async fn clear_alias(state: &SharedState, player_id: &str) -> ClearAliasResponse {
    let removed = state
        .identities()
        .write()
        .await
        .remove_alias(player_id)
        .is_some();
    if !removed {
        return ClearAliasResponse { removed };
    }
    info!(player_id, "alias removed");

    removal_sync::persist(
        state,
        PendingRemoval::Alias(player_id.to_owned()),
        STORAGE_CALL_TIMEOUT,
    )
    .await;

    ClearAliasResponse { removed }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::game_store::{GameStore, memory::MemoryGameStore},
        state::AppState,
    };

    #[tokio::test]
    async fn alias_is_written_through_and_listed() {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;

        set_alias(&state, "200", " BobWeb ").await;
        set_alias(&state, "100", "AliceWeb").await;

        let listed = list_aliases(&state).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].player_id, "100");
        assert_eq!(listed[1].alias, "BobWeb");

        let stored = store.list_aliases().await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn replacing_an_alias_keeps_one_entry() {
        let state = AppState::new();
        set_alias(&state, "100", "AliceWeb").await;
        set_alias(&state, "100", "AliceTwo").await;

        let listed = list_aliases(&state).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].alias, "AliceTwo");
    }

    #[tokio::test]
    async fn clearing_reports_whether_alias_existed() {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;
        set_alias(&state, "100", "AliceWeb").await;

        assert!(clear_alias(&state, "100").await.removed);
        assert!(!clear_alias(&state, "100").await.removed);
        assert!(store.list_aliases().await.unwrap().is_empty());
    }
}

//! Startup reload of monitored games and aliases from storage.

use tracing::{info, warn};

use crate::{
    dao::{
        game_store::GameStore,
        storage::{STORAGE_CALL_TIMEOUT, StorageResult, bounded},
    },
    services::removal_sync,
    state::{SharedState, game::GameState},
};

/// What a rehydration pass restored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RehydrationReport {
    /// Active games put back under monitoring.
    pub games: usize,
    /// Games skipped because they were already monitored or removed meanwhile.
    pub skipped: usize,
    /// Alias overrides restored.
    pub aliases: usize,
}

/// Reload every active game and alias from `store` into `state`.
///
/// Removals made before storage was reachable are replayed first. Games
/// monitored since startup win over their stored copy, and games forgotten or
/// finished since startup are never restored. Aliases follow the same rules.
pub async fn rehydrate(
    state: &SharedState,
    store: &dyn GameStore,
) -> StorageResult<RehydrationReport> {
    removal_sync::replay(state, store, STORAGE_CALL_TIMEOUT).await;

    let records = bounded(
        STORAGE_CALL_TIMEOUT,
        "list_active_games",
        store.list_active_games(),
    )
    .await?;
    let aliases = bounded(STORAGE_CALL_TIMEOUT, "list_aliases", store.list_aliases()).await?;
    let mut report = RehydrationReport::default();

    for record in records {
        let game = GameState::from(record);
        let id = game.id().clone();
        if state.pending_removals().blocks_game(&id).await {
            report.skipped += 1;
            warn!(game_id = %id, "stored game was removed before storage came back; not restored");
            continue;
        }
        match state.registry().add(id.clone(), game).await {
            Ok(()) => report.games += 1,
            Err(err) => {
                report.skipped += 1;
                warn!(game_id = %id, error = %err, "stored game not restored");
            }
        }
    }

    let mut restorable = Vec::with_capacity(aliases.len());
    for alias in aliases {
        if !state.pending_removals().blocks_alias(&alias.player_id).await {
            restorable.push(alias);
        }
    }
    {
        let mut identities = state.identities().write().await;
        for alias in restorable {
            if identities.alias_for(&alias.player_id).is_none() {
                identities.set_alias(alias.player_id, alias.external_alias);
                report.aliases += 1;
            }
        }
    }

    info!(
        games = report.games,
        skipped = report.skipped,
        aliases = report.aliases,
        "state rehydrated from storage"
    );
    Ok(report)
}

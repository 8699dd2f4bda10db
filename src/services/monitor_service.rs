//! Commands starting, stopping and inspecting game monitoring.
//!
//! The registry is the source of truth; storage writes follow each change and
//! their failures are logged without rolling the registry back.

use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::GameRecordEntity,
        storage::{STORAGE_CALL_TIMEOUT, bounded},
    },
    dto::game::{ForgetResponse, GameSummary, MonitorGameRequest},
    error::ServiceError,
    services::removal_sync,
    state::{
        SharedState,
        game::{GameId, GameState},
        registry::RemoveOutcome,
        removals::PendingRemoval,
    },
};

/// Start monitoring the game described by `request`.
pub async fn monitor_game(
    state: &SharedState,
    request: MonitorGameRequest,
) -> Result<GameSummary, ServiceError> {
    let game = GameState::from(request);
    let id = game.id().clone();
    let summary = GameSummary::from(&game);
    let record = GameRecordEntity::from(&game);

    state.registry().add(id.clone(), game).await?;
    state.pending_removals().cancel_game(&id).await;
    info!(game_id = %id, players = summary.players.len(), "game monitored");

    match state.game_store().await {
        Some(store) => {
            if let Err(err) = bounded(STORAGE_CALL_TIMEOUT, "save_game", store.save_game(record)).await {
                warn!(game_id = %id, error = %err, "failed to persist monitored game");
            }
        }
        None => warn!(game_id = %id, "storage unavailable; monitored game not persisted"),
    }

    Ok(summary)
}

/// Stop monitoring `id`; forgetting an unknown game is not an error.
pub async fn forget_game(state: &SharedState, id: &GameId) -> ForgetResponse {
    let outcome = state.registry().remove(id).await;
    let RemoveOutcome::Removed(_) = outcome else {
        debug!(game_id = %id, "forget requested for a game that is not monitored");
        return ForgetResponse { removed: false };
    };
    info!(game_id = %id, "game forgotten");

    removal_sync::persist(
        state,
        PendingRemoval::Forget(id.clone()),
        STORAGE_CALL_TIMEOUT,
    )
    .await;

    ForgetResponse { removed: true }
}

/// Summaries of every monitored game in monitor order.
pub async fn list_games(state: &SharedState) -> Vec<GameSummary> {
    state
        .registry()
        .snapshot()
        .await
        .iter()
        .map(|(_, game)| GameSummary::from(game))
        .collect()
}

/// Summary of the game monitored under `id`.
pub async fn get_game(state: &SharedState, id: &GameId) -> Result<GameSummary, ServiceError> {
    let game = state.registry().get(id).await?;
    Ok(GameSummary::from(&game))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        dto::game::PlayerInput,
        state::AppState,
    };

    fn request(game_id: &str) -> MonitorGameRequest {
        MonitorGameRequest {
            game_id: game_id.into(),
            channel_id: "chan".into(),
            guild_id: Some("guild".into()),
            players: vec![
                PlayerInput {
                    id: "100".into(),
                    display_name: "Alice".into(),
                    nickname: None,
                    username: "alice".into(),
                },
                PlayerInput {
                    id: "200".into(),
                    display_name: "Bob".into(),
                    nickname: None,
                    username: "BobWeb".into(),
                },
            ],
        }
    }

    #[tokio::test]
    async fn monitor_writes_through_to_storage() {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;

        let summary = monitor_game(&state, request("g1")).await.unwrap();
        assert_eq!(summary.game_id, "g1");

        let record = store.game("g1").unwrap();
        assert!(record.is_active);
        assert_eq!(record.players.len(), 2);
        assert_eq!(record.guild_id.as_deref(), Some("guild"));
    }

    #[tokio::test]
    async fn second_monitor_conflicts_and_keeps_first() {
        let state = AppState::new();
        monitor_game(&state, request("g2")).await.unwrap();

        let mut again = request("g2");
        again.channel_id = "other".into();
        let err = monitor_game(&state, again).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyMonitored(_)));

        let game = get_game(&state, &GameId::new("g2")).await.unwrap();
        assert_eq!(game.channel_id, "chan");
    }

    #[tokio::test]
    async fn monitor_succeeds_without_storage() {
        let state = AppState::new();
        assert!(state.is_degraded());
        monitor_game(&state, request("g1")).await.unwrap();
        assert_eq!(list_games(&state).await.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_does_not_roll_back() {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        store.set_offline(true);
        state.install_game_store(Arc::new(store)).await;

        monitor_game(&state, request("g1")).await.unwrap();
        assert!(state.registry().contains(&GameId::new("g1")).await);
    }

    #[tokio::test]
    async fn forget_is_idempotent_and_deletes_record() {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;
        monitor_game(&state, request("g1")).await.unwrap();

        let id = GameId::new("g1");
        assert!(forget_game(&state, &id).await.removed);
        assert!(store.game("g1").is_none());
        assert!(!forget_game(&state, &id).await.removed);
        assert!(matches!(
            get_game(&state, &id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn remonitoring_cancels_a_deferred_forget() {
        let state = AppState::new();
        let id = GameId::new("g1");
        monitor_game(&state, request("g1")).await.unwrap();
        forget_game(&state, &id).await;
        assert!(state.pending_removals().blocks_game(&id).await);

        monitor_game(&state, request("g1")).await.unwrap();
        assert!(!state.pending_removals().blocks_game(&id).await);
    }

    #[tokio::test]
    async fn list_keeps_monitor_order() {
        let state = AppState::new();
        for id in ["g3", "g1", "g2"] {
            monitor_game(&state, request(id)).await.unwrap();
        }
        let ids: Vec<_> = list_games(&state)
            .await
            .into_iter()
            .map(|game| game.game_id)
            .collect();
        assert_eq!(ids, ["g3", "g1", "g2"]);
    }
}

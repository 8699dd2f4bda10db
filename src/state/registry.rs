//! Keyed collection of every monitored game, guarded by a single lock.

use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::Mutex;

use super::{
    game::{GameId, GameState, TurnUpdate},
    identity::IdentityMap,
};

/// Failures raised by [`GameRegistry`] operations that require an entry to exist (or not).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A game with this id is already monitored.
    #[error("game `{0}` is already monitored")]
    AlreadyMonitored(GameId),
    /// No game with this id is monitored.
    #[error("game `{0}` is not monitored")]
    NotFound(GameId),
}

/// Result of [`GameRegistry::remove`]; removing an unknown game is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    /// The game was monitored and has been dropped.
    Removed(GameState),
    /// Nothing was monitored under this id.
    Absent,
}

impl RemoveOutcome {
    /// Whether an entry was actually dropped.
    pub fn was_removed(&self) -> bool {
        matches!(self, RemoveOutcome::Removed(_))
    }
}

/// Owner of every [`GameState`].
///
/// Callers never keep references into the registry: reads hand out clones and
/// writes go through the entry points below, each holding the lock only for the
/// in-memory update.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: Mutex<IndexMap<GameId, GameState>>,
}

impl GameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start monitoring `state` under `id`.
    pub async fn add(&self, id: GameId, state: GameState) -> Result<(), RegistryError> {
        let mut games = self.games.lock().await;
        if games.contains_key(&id) {
            return Err(RegistryError::AlreadyMonitored(id));
        }
        games.insert(id, state);
        Ok(())
    }

    /// Stop monitoring `id`.
    pub async fn remove(&self, id: &GameId) -> RemoveOutcome {
        let mut games = self.games.lock().await;
        match games.shift_remove(id) {
            Some(state) => RemoveOutcome::Removed(state),
            None => RemoveOutcome::Absent,
        }
    }

    /// Copy of the state monitored under `id`.
    pub async fn get(&self, id: &GameId) -> Result<GameState, RegistryError> {
        let games = self.games.lock().await;
        games
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Point-in-time copy of every entry, in monitor order.
    pub async fn snapshot(&self) -> Vec<(GameId, GameState)> {
        let games = self.games.lock().await;
        games
            .iter()
            .map(|(id, state)| (id.clone(), state.clone()))
            .collect()
    }

    /// Feed an acting-player report into the game monitored under `id`.
    pub async fn advance_turn(
        &self,
        id: &GameId,
        external_name: &str,
        identities: &IdentityMap,
    ) -> Result<TurnUpdate, RegistryError> {
        let mut games = self.games.lock().await;
        let state = games
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        Ok(state.advance_turn(external_name, identities))
    }

    /// Clear the pending alert of `id` if `alerted_player_id` still holds the turn.
    ///
    /// Returns `Ok(false)` when the turn moved on while the alert was being
    /// delivered; the newer alert then stays pending.
    pub async fn clear_alert(
        &self,
        id: &GameId,
        alerted_player_id: &str,
    ) -> Result<bool, RegistryError> {
        let mut games = self.games.lock().await;
        let state = games
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;

        let still_current = state
            .current_player()
            .is_some_and(|player| player.id == alerted_player_id);
        if still_current {
            state.clear_alert();
        }
        Ok(still_current)
    }

    /// Whether `id` is monitored.
    pub async fn contains(&self, id: &GameId) -> bool {
        self.games.lock().await.contains_key(id)
    }

    /// Number of monitored games.
    pub async fn len(&self) -> usize {
        self.games.lock().await.len()
    }

    /// Whether no game is monitored.
    pub async fn is_empty(&self) -> bool {
        self.games.lock().await.is_empty()
    }

    /// Number of games with an undelivered turn alert.
    pub async fn pending_alerts(&self) -> usize {
        let games = self.games.lock().await;
        games.values().filter(|state| state.needs_alert()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::identity::PlayerIdentity;

    fn game(id: &str) -> GameState {
        GameState::new(
            GameId::new(id),
            vec![
                PlayerIdentity::new("100", "Alice", "alice"),
                PlayerIdentity::new("200", "Bob", "BobWeb"),
            ],
            "chan",
            None,
        )
    }

    #[tokio::test]
    async fn adding_twice_is_rejected_and_keeps_original() {
        let registry = GameRegistry::new();
        let id = GameId::new("g2");
        registry.add(id.clone(), game("g2")).await.unwrap();

        let replacement = GameState::new(id.clone(), Vec::new(), "other-chan", None);
        let err = registry.add(id.clone(), replacement).await.unwrap_err();
        assert_eq!(err, RegistryError::AlreadyMonitored(id.clone()));

        let stored = registry.get(&id).await.unwrap();
        assert_eq!(stored, game("g2"));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = GameRegistry::new();
        let id = GameId::new("g1");
        registry.add(id.clone(), game("g1")).await.unwrap();

        assert!(registry.remove(&id).await.was_removed());
        assert_eq!(registry.remove(&id).await, RemoveOutcome::Absent);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn get_unknown_is_not_found() {
        let registry = GameRegistry::new();
        let id = GameId::new("missing");
        assert_eq!(
            registry.get(&id).await.unwrap_err(),
            RegistryError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn snapshot_keeps_insertion_order_after_removal() {
        let registry = GameRegistry::new();
        for id in ["a", "b", "c"] {
            registry.add(GameId::new(id), game(id)).await.unwrap();
        }
        registry.remove(&GameId::new("b")).await;

        let ids: Vec<_> = registry
            .snapshot()
            .await
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn snapshot_is_detached_from_later_mutations() {
        let registry = GameRegistry::new();
        let id = GameId::new("g1");
        registry.add(id.clone(), game("g1")).await.unwrap();

        let snapshot = registry.snapshot().await;
        registry
            .advance_turn(&id, "BobWeb", &IdentityMap::new())
            .await
            .unwrap();

        assert!(!snapshot[0].1.needs_alert());
        assert_eq!(registry.pending_alerts().await, 1);
    }

    #[tokio::test]
    async fn clear_alert_skips_when_turn_moved_on() {
        let registry = GameRegistry::new();
        let id = GameId::new("g1");
        registry.add(id.clone(), game("g1")).await.unwrap();
        let identities = IdentityMap::new();

        registry.advance_turn(&id, "alice", &identities).await.unwrap();
        registry.advance_turn(&id, "BobWeb", &identities).await.unwrap();

        // The delivery that just went out named Alice; Bob's alert must survive.
        assert!(!registry.clear_alert(&id, "100").await.unwrap());
        assert!(registry.get(&id).await.unwrap().needs_alert());

        assert!(registry.clear_alert(&id, "200").await.unwrap());
        assert!(!registry.get(&id).await.unwrap().needs_alert());
    }

    #[tokio::test]
    async fn mutations_on_unknown_game_are_not_found() {
        let registry = GameRegistry::new();
        let id = GameId::new("gone");

        assert!(matches!(
            registry.advance_turn(&id, "x", &IdentityMap::new()).await,
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            registry.clear_alert(&id, "100").await,
            Err(RegistryError::NotFound(_))
        ));
    }
}

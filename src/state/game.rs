use std::{fmt, time::SystemTime};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dao::models::{GameRecordEntity, PlayerEntity};

use super::identity::{IdentityMap, PlayerIdentity, resolve};

/// Identifier of a game on the external host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GameId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Outcome of feeding one acting-player report into a [`GameState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnUpdate {
    /// The turn moved to another tracked player; an alert is now pending.
    Changed(PlayerIdentity),
    /// The reported player already holds the turn.
    Unchanged,
    /// The reported name matches none of the tracked players.
    Unresolved,
}

/// Runtime record of one monitored game.
///
/// Fields are only reachable through accessors; [`GameState::advance_turn`] and
/// [`GameState::clear_alert`] are the sole mutation entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    id: GameId,
    /// Keyed by player id, in monitor order.
    players: IndexMap<String, PlayerIdentity>,
    current_player: Option<String>,
    channel_id: String,
    guild_id: Option<String>,
    needs_alert: bool,
    turn_changed_at: Option<SystemTime>,
}

impl GameState {
    /// Start tracking `players` for `id`, announcing turns in `channel_id`.
    ///
    /// Duplicate player ids keep their first position.
    pub fn new(
        id: GameId,
        players: impl IntoIterator<Item = PlayerIdentity>,
        channel_id: impl Into<String>,
        guild_id: Option<String>,
    ) -> Self {
        let mut tracked = IndexMap::new();
        for player in players {
            tracked.entry(player.id.clone()).or_insert(player);
        }

        Self {
            id,
            players: tracked,
            current_player: None,
            channel_id: channel_id.into(),
            guild_id,
            needs_alert: false,
            turn_changed_at: None,
        }
    }

    /// Identifier of the game on the external host.
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Tracked players in monitor order.
    pub fn players(&self) -> impl ExactSizeIterator<Item = &PlayerIdentity> + Clone {
        self.players.values()
    }

    /// Player currently holding the turn, once resolved.
    pub fn current_player(&self) -> Option<&PlayerIdentity> {
        self.current_player
            .as_deref()
            .and_then(|id| self.players.get(id))
    }

    /// Chat channel receiving the turn alerts.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Chat server the channel belongs to.
    pub fn guild_id(&self) -> Option<&str> {
        self.guild_id.as_deref()
    }

    /// Whether a detected turn change still waits for delivery.
    pub fn needs_alert(&self) -> bool {
        self.needs_alert
    }

    /// When the last turn change was detected.
    pub fn turn_changed_at(&self) -> Option<SystemTime> {
        self.turn_changed_at
    }

    /// Record that `external_name` is now acting.
    pub fn advance_turn(&mut self, external_name: &str, identities: &IdentityMap) -> TurnUpdate {
        let Some(resolved) = resolve(self.players.values(), external_name, identities) else {
            warn!(
                game_id = %self.id,
                external_name,
                "acting player does not match any tracked player"
            );
            return TurnUpdate::Unresolved;
        };

        if self.current_player.as_deref() == Some(resolved.id.as_str()) {
            return TurnUpdate::Unchanged;
        }

        let resolved = resolved.clone();
        info!(
            game_id = %self.id,
            player_id = %resolved.id,
            player = %resolved.display_name,
            "turn changed"
        );
        self.current_player = Some(resolved.id.clone());
        self.needs_alert = true;
        self.turn_changed_at = Some(SystemTime::now());
        TurnUpdate::Changed(resolved)
    }

    /// Mark the pending alert as handled.
    pub fn clear_alert(&mut self) {
        self.needs_alert = false;
    }
}

impl From<PlayerEntity> for PlayerIdentity {
    fn from(value: PlayerEntity) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            nickname: value.nickname,
            username: value.username,
        }
    }
}

impl From<PlayerIdentity> for PlayerEntity {
    fn from(value: PlayerIdentity) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            nickname: value.nickname,
            username: value.username,
        }
    }
}

impl From<GameRecordEntity> for GameState {
    fn from(value: GameRecordEntity) -> Self {
        Self::new(
            GameId::new(value.game_id),
            value.players.into_iter().map(Into::into),
            value.channel_id,
            value.guild_id,
        )
    }
}

impl From<&GameState> for GameRecordEntity {
    fn from(value: &GameState) -> Self {
        let now = SystemTime::now();
        Self {
            game_id: value.id.as_str().to_owned(),
            guild_id: value.guild_id.clone(),
            channel_id: value.channel_id.clone(),
            is_active: true,
            players: value.players().cloned().map(Into::into).collect(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameState {
        GameState::new(
            GameId::new("g1"),
            vec![
                PlayerIdentity::new("100", "Alice", "alice"),
                PlayerIdentity::new("200", "Bob", "BobWeb"),
            ],
            "chan-1",
            Some("guild-1".into()),
        )
    }

    #[test]
    fn new_game_has_no_current_player() {
        let game = game();
        assert!(game.current_player().is_none());
        assert!(!game.needs_alert());
        assert!(game.turn_changed_at().is_none());
    }

    #[test]
    fn turn_change_raises_alert() {
        let mut game = game();
        let update = game.advance_turn("BobWeb", &IdentityMap::new());

        assert!(matches!(update, TurnUpdate::Changed(ref player) if player.id == "200"));
        assert_eq!(game.current_player().map(|p| p.id.as_str()), Some("200"));
        assert!(game.needs_alert());
        assert!(game.turn_changed_at().is_some());
    }

    #[test]
    fn repeated_report_does_not_raise_alert_again() {
        let mut game = game();
        game.advance_turn("BobWeb", &IdentityMap::new());
        game.clear_alert();

        for _ in 0..3 {
            assert_eq!(
                game.advance_turn("BobWeb", &IdentityMap::new()),
                TurnUpdate::Unchanged
            );
            assert!(!game.needs_alert());
        }
    }

    #[test]
    fn unresolved_name_leaves_state_untouched() {
        let mut game = game();
        game.advance_turn("alice", &IdentityMap::new());
        game.clear_alert();
        let before = game.clone();

        assert_eq!(
            game.advance_turn("Spectator", &IdentityMap::new()),
            TurnUpdate::Unresolved
        );
        assert_eq!(game, before);
    }

    #[test]
    fn switching_players_raises_alert_each_time() {
        let mut game = game();
        game.advance_turn("alice", &IdentityMap::new());
        game.clear_alert();

        let update = game.advance_turn("BobWeb", &IdentityMap::new());
        assert!(matches!(update, TurnUpdate::Changed(_)));
        assert!(game.needs_alert());
    }

    #[test]
    fn duplicate_players_keep_first_position() {
        let game = GameState::new(
            GameId::new("g3"),
            vec![
                PlayerIdentity::new("1", "One", "one"),
                PlayerIdentity::new("2", "Two", "two"),
                PlayerIdentity::new("1", "Uno", "uno"),
            ],
            "chan",
            None,
        );

        let names: Vec<_> = game.players().map(|p| p.display_name.as_str()).collect();
        assert_eq!(names, ["One", "Two"]);
    }

    #[test]
    fn record_round_trip_keeps_players_in_order() {
        let game = game();
        let record = GameRecordEntity::from(&game);
        assert!(record.is_active);

        let restored = GameState::from(record);
        assert_eq!(restored.id(), game.id());
        assert_eq!(
            restored.players().collect::<Vec<_>>(),
            game.players().collect::<Vec<_>>()
        );
        assert_eq!(restored.guild_id(), Some("guild-1"));
    }
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_game_id, validate_not_blank},
    },
    state::{
        game::{GameId, GameState},
        identity::PlayerIdentity,
    },
};

/// Payload used to start monitoring a game.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonitorGameRequest {
    /// Identifier of the game on the external host.
    pub game_id: String,
    /// Chat channel receiving the turn alerts.
    pub channel_id: String,
    /// Chat server the channel belongs to.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Players to track, in turn order.
    pub players: Vec<PlayerInput>,
}

/// Chat profile of one player taking part in the game.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub username: String,
}

impl Validate for PlayerInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_not_blank(&self.id) {
            errors.add("id", e);
        }
        if let Err(e) = validate_not_blank(&self.username) {
            errors.add("username", e);
        }
        // An empty nickname would never match anything; reject it instead of ignoring it.
        if let Some(ref nickname) = self.nickname {
            if let Err(e) = validate_not_blank(nickname) {
                errors.add("nickname", e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for MonitorGameRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_game_id(&self.game_id) {
            errors.add("gameId", e);
        }
        if let Err(e) = validate_not_blank(&self.channel_id) {
            errors.add("channelId", e);
        }
        if self.players.is_empty() {
            let mut err = ValidationError::new("players_empty");
            err.message = Some("At least one player must be tracked".into());
            errors.add("players", err);
        }

        for player in &self.players {
            if let Err(player_errors) = player.validate() {
                errors.merge_self("players", Err(player_errors));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<PlayerInput> for PlayerIdentity {
    fn from(input: PlayerInput) -> Self {
        let identity = PlayerIdentity::new(input.id, input.display_name, input.username);
        match input.nickname {
            Some(nickname) => identity.with_nickname(nickname),
            None => identity,
        }
    }
}

impl From<MonitorGameRequest> for GameState {
    fn from(request: MonitorGameRequest) -> Self {
        GameState::new(
            GameId::new(request.game_id),
            request.players.into_iter().map(PlayerIdentity::from),
            request.channel_id,
            request.guild_id,
        )
    }
}

/// Summary of a monitored game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub game_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub players: Vec<PlayerSummary>,
    /// Player whose turn it is, once a turn has been observed.
    pub current_player: Option<PlayerSummary>,
    pub needs_alert: bool,
    /// RFC 3339 timestamp of the last detected turn change.
    pub turn_changed_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Public projection of a tracked player.
pub struct PlayerSummary {
    pub id: String,
    pub display_name: String,
    pub nickname: Option<String>,
    pub username: String,
}

/// Outcome of a forget request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ForgetResponse {
    /// Whether the game was monitored before the request.
    pub removed: bool,
}

impl From<&PlayerIdentity> for PlayerSummary {
    fn from(player: &PlayerIdentity) -> Self {
        Self {
            id: player.id.clone(),
            display_name: player.display_name.clone(),
            nickname: player.nickname.clone(),
            username: player.username.clone(),
        }
    }
}

impl From<&GameState> for GameSummary {
    fn from(game: &GameState) -> Self {
        Self {
            game_id: game.id().to_string(),
            channel_id: game.channel_id().to_owned(),
            guild_id: game.guild_id().map(str::to_owned),
            players: game.players().map(PlayerSummary::from).collect(),
            current_player: game.current_player().map(PlayerSummary::from),
            needs_alert: game.needs_alert(),
            turn_changed_at: game.turn_changed_at().map(format_system_time),
        }
    }
}

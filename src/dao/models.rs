use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Persisted record of a monitored game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecordEntity {
    /// Identifier of the game on the external host.
    pub game_id: String,
    /// Chat server the alerts are posted in.
    pub guild_id: Option<String>,
    /// Chat channel the alerts are posted in.
    pub channel_id: String,
    /// Inactive records are kept for history but never rehydrated.
    pub is_active: bool,
    /// Tracked players in monitor order.
    pub players: Vec<PlayerEntity>,
    /// When monitoring started.
    pub created_at: SystemTime,
    /// Last time the record was written.
    pub updated_at: SystemTime,
}

/// Chat profile of a tracked player, captured when the game was monitored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Chat user identifier.
    pub id: String,
    /// Name shown in summaries.
    pub display_name: String,
    /// Server nickname at monitor time.
    pub nickname: Option<String>,
    /// Account username.
    pub username: String,
}

/// Operator override mapping a player to the name the game host reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AliasEntity {
    /// Chat user identifier.
    pub player_id: String,
    /// Name reported by the external host for this player.
    pub external_alias: String,
}

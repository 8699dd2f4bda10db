use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{AliasEntity, GameRecordEntity, PlayerEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    guild_id: Option<String>,
    channel_id: String,
    #[serde(default = "default_active")]
    is_active: bool,
    players: Vec<PlayerEntity>,
    created_at: DateTime,
    updated_at: DateTime,
}

fn default_active() -> bool {
    true
}

impl From<GameRecordEntity> for MongoGameDocument {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            id: value.game_id,
            guild_id: value.guild_id,
            channel_id: value.channel_id,
            is_active: value.is_active,
            players: value.players,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoGameDocument> for GameRecordEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            game_id: value.id,
            guild_id: value.guild_id,
            channel_id: value.channel_id,
            is_active: value.is_active,
            players: value.players,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAliasDocument {
    #[serde(rename = "_id")]
    player_id: String,
    external_alias: String,
}

impl From<AliasEntity> for MongoAliasDocument {
    fn from(value: AliasEntity) -> Self {
        Self {
            player_id: value.player_id,
            external_alias: value.external_alias,
        }
    }
}

impl From<MongoAliasDocument> for AliasEntity {
    fn from(value: MongoAliasDocument) -> Self {
        Self {
            player_id: value.player_id,
            external_alias: value.external_alias,
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

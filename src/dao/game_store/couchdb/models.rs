use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::{AliasEntity, GameRecordEntity, PlayerEntity};

pub const GAME_PREFIX: &str = "game::";
pub const ALIAS_PREFIX: &str = "alias::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBody {
    pub game_id: String,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub is_active: bool,
    pub players: Vec<PlayerEntity>, // Kept in monitor order
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<(GameRecordEntity, Option<String>)> for CouchGameDocument {
    fn from((game, rev): (GameRecordEntity, Option<String>)) -> Self {
        Self {
            id: game_doc_id(&game.game_id),
            rev,
            game: GameBody {
                game_id: game.game_id,
                guild_id: game.guild_id,
                channel_id: game.channel_id,
                is_active: game.is_active,
                players: game.players,
                created_at: game.created_at,
                updated_at: game.updated_at,
            },
        }
    }
}

impl From<CouchGameDocument> for GameRecordEntity {
    fn from(doc: CouchGameDocument) -> Self {
        Self {
            game_id: doc.game.game_id,
            guild_id: doc.game.guild_id,
            channel_id: doc.game.channel_id,
            is_active: doc.game.is_active,
            players: doc.game.players,
            created_at: doc.game.created_at,
            updated_at: doc.game.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchAliasDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub player_id: String,
    pub external_alias: String,
}

impl From<(AliasEntity, Option<String>)> for CouchAliasDocument {
    fn from((alias, rev): (AliasEntity, Option<String>)) -> Self {
        Self {
            id: alias_doc_id(&alias.player_id),
            rev,
            player_id: alias.player_id,
            external_alias: alias.external_alias,
        }
    }
}

impl From<CouchAliasDocument> for AliasEntity {
    fn from(doc: CouchAliasDocument) -> Self {
        Self {
            player_id: doc.player_id,
            external_alias: doc.external_alias,
        }
    }
}

/// Minimal projection used to read the revision of any document.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

pub fn game_doc_id(game_id: &str) -> String {
    format!("{}{}", GAME_PREFIX, game_id)
}

pub fn alias_doc_id(player_id: &str) -> String {
    format!("{}{}", ALIAS_PREFIX, player_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_document_flattens_body_next_to_couch_keys() {
        let now = SystemTime::UNIX_EPOCH;
        let entity = GameRecordEntity {
            game_id: "g1".into(),
            guild_id: Some("guild".into()),
            channel_id: "chan".into(),
            is_active: true,
            players: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let doc = CouchGameDocument::from((entity.clone(), None));
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], "game::g1");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["channel_id"], "chan");

        let back: CouchGameDocument = serde_json::from_value(value).unwrap();
        assert_eq!(GameRecordEntity::from(back), entity);
    }

    #[test]
    fn alias_ids_are_prefixed() {
        assert_eq!(alias_doc_id("100"), "alias::100");
    }
}

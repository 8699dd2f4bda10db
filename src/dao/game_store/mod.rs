#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{AliasEntity, GameRecordEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

/// Abstraction over the persistence layer for game records and identity aliases.
pub trait GameStore: Send + Sync {
    /// Insert or replace the record of `game.game_id`.
    fn save_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Flip the active flag of a record, returning whether the record exists.
    fn set_game_active(
        &self,
        game_id: String,
        active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Delete a record, returning whether it existed.
    fn delete_game(&self, game_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every record still flagged active, used to rehydrate at startup.
    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>>;
    /// Insert or replace the alias of `alias.player_id`.
    fn save_alias(&self, alias: AliasEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete the alias of `player_id`, returning whether it existed.
    fn delete_alias(&self, player_id: String) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every registered alias.
    fn list_aliases(&self) -> BoxFuture<'static, StorageResult<Vec<AliasEntity>>>;
    /// Cheap connectivity check.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

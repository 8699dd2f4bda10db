use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::{establish_connection, ping},
    error::{MongoDaoError, MongoResult},
    models::{MongoAliasDocument, MongoGameDocument, doc_id},
};
use crate::dao::{
    game_store::GameStore,
    models::{AliasEntity, GameRecordEntity},
    storage::StorageResult,
};

const GAME_COLLECTION_NAME: &str = "games";
const ALIAS_COLLECTION_NAME: &str = "aliases";

/// [`GameStore`] backed by MongoDB collections.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        ping(&database)
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            database: RwLock::new(database),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"is_active": 1, "created_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_active_idx".to_owned()))
                    .build(),
            )
            .build();

        self.games()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "is_active,created_at",
                source,
            })?;

        Ok(())
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<MongoGameDocument>(GAME_COLLECTION_NAME)
    }

    async fn aliases(&self) -> Collection<MongoAliasDocument> {
        let guard = self.inner.database.read().await;
        guard.collection::<MongoAliasDocument>(ALIAS_COLLECTION_NAME)
    }

    async fn save_game(&self, mut game: GameRecordEntity) -> MongoResult<()> {
        let id = game.game_id.clone();
        let existing = self
            .games()
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::SaveGame {
                id: id.clone(),
                source,
            })?;

        // Re-monitoring a finished game keeps the first monitor time.
        if let Some(existing) = existing {
            game.created_at = GameRecordEntity::from(existing).created_at;
        }

        self.replace_game(&id, game.into()).await
    }

    async fn replace_game(&self, id: &str, document: MongoGameDocument) -> MongoResult<()> {
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame {
                id: id.to_owned(),
                source,
            })?;
        Ok(())
    }

    async fn set_game_active(&self, id: String, active: bool) -> MongoResult<bool> {
        let now = DateTime::from_system_time(SystemTime::now());
        let result = self
            .games()
            .await
            .update_one(
                doc_id(&id),
                doc! { "$set": { "is_active": active, "updated_at": now } },
            )
            .await
            .map_err(|source| MongoDaoError::UpdateGame {
                id: id.clone(),
                source,
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete_game(&self, id: String) -> MongoResult<bool> {
        let result = self
            .games()
            .await
            .delete_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteGame {
                id: id.clone(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_active_games(&self) -> MongoResult<Vec<GameRecordEntity>> {
        let documents: Vec<MongoGameDocument> = self
            .games()
            .await
            .find(doc! { "is_active": true })
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_alias(&self, alias: AliasEntity) -> MongoResult<()> {
        let player_id = alias.player_id.clone();
        let document: MongoAliasDocument = alias.into();
        self.aliases()
            .await
            .replace_one(doc_id(&player_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveAlias {
                player_id: player_id.clone(),
                source,
            })?;
        Ok(())
    }

    async fn delete_alias(&self, player_id: String) -> MongoResult<bool> {
        let result = self
            .aliases()
            .await
            .delete_one(doc_id(&player_id))
            .await
            .map_err(|source| MongoDaoError::DeleteAlias {
                player_id: player_id.clone(),
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_aliases(&self) -> MongoResult<Vec<AliasEntity>> {
        let documents: Vec<MongoAliasDocument> = self
            .aliases()
            .await
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListAliases { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListAliases { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }
}

impl GameStore for MongoGameStore {
    fn save_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn set_game_active(
        &self,
        game_id: String,
        active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_game_active(game_id, active)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_game(&self, game_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(game_id).await.map_err(Into::into) })
    }

    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_active_games().await.map_err(Into::into) })
    }

    fn save_alias(&self, alias: AliasEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_alias(alias).await.map_err(Into::into) })
    }

    fn delete_alias(&self, player_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_alias(player_id).await.map_err(Into::into) })
    }

    fn list_aliases(&self) -> BoxFuture<'static, StorageResult<Vec<AliasEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_aliases().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

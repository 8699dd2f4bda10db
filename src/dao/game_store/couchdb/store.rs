use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{from_slice, from_value};

use crate::{
    clients::join_segments,
    dao::{
        game_store::GameStore,
        models::{AliasEntity, GameRecordEntity},
        storage::StorageResult,
    },
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        ALIAS_PREFIX, AllDocsResponse, CouchAliasDocument, CouchGameDocument, END_SUFFIX,
        GAME_PREFIX, RevisionOnly, alias_doc_id, game_doc_id,
    },
};

/// [`GameStore`] backed by a CouchDB database reached over HTTP.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url);
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = join_segments(&self.base_url, [self.database.as_ref(), path]);
        self.authorize(self.client.request(method, url))
    }

    fn database_url(&self) -> String {
        join_segments(&self.base_url, [self.database.as_ref()])
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseUnreachable {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseUnreachable {
                        database: database.clone(),
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| request_error(doc_id, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|source| request_error(doc_id, source))?;
                from_slice(&body)
                    .map(Some)
                    .map_err(|source| CouchDaoError::Decode {
                        doc_id: doc_id.to_owned(),
                        source,
                    })
            }
            other => Err(CouchDaoError::Status {
                doc_id: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| request_error(doc_id, source))?;

        match response.status() {
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                doc_id: doc_id.to_owned(),
            }),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::Status {
                doc_id: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    /// Delete `doc_id` if present, returning whether a document was removed.
    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(existing) = self.get_document::<RevisionOnly>(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", existing.rev)])
            .send()
            .await
            .map_err(|source| request_error(doc_id, source))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                doc_id: doc_id.to_owned(),
            }),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::Status {
                doc_id: doc_id.to_owned(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| request_error(ALL_DOCS, source))?;

        if !response.status().is_success() {
            return Err(CouchDaoError::Status {
                doc_id: ALL_DOCS.to_owned(),
                status: response.status(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| request_error(ALL_DOCS, source))?;
        let payload: AllDocsResponse =
            from_slice(&body).map_err(|source| CouchDaoError::Decode {
                doc_id: ALL_DOCS.to_owned(),
                source,
            })?;

        let mut documents = Vec::with_capacity(payload.rows.len());
        for row in payload.rows {
            let Some(doc) = row.doc else { continue };
            let parsed = from_value(doc).map_err(|source| CouchDaoError::Decode {
                doc_id: row.id,
                source,
            })?;
            documents.push(parsed);
        }

        Ok(documents)
    }
}

impl GameStore for CouchGameStore {
    fn save_game(&self, game: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&game.game_id);
            let existing = store.get_document::<CouchGameDocument>(&doc_id).await?;
            let mut game = game;
            // Keep the original monitor time when a record is re-saved.
            let rev = existing.map(|existing| {
                game.created_at = existing.game.created_at;
                existing.rev
            });
            let doc = CouchGameDocument::from((game, rev.flatten()));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn set_game_active(
        &self,
        game_id: String,
        active: bool,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(&game_id);
            let Some(mut doc) = store.get_document::<CouchGameDocument>(&doc_id).await? else {
                return Ok(false);
            };
            doc.game.is_active = active;
            doc.game.updated_at = SystemTime::now();
            store.put_document(&doc_id, &doc).await?;
            Ok(true)
        })
    }

    fn delete_game(&self, game_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&game_doc_id(&game_id))
                .await
                .map_err(Into::into)
        })
    }

    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameRecordEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchGameDocument>(GAME_PREFIX)
                .await?;
            let mut games: Vec<GameRecordEntity> = docs
                .into_iter()
                .filter(|doc| doc.game.is_active)
                .map(Into::into)
                .collect();
            games.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(games)
        })
    }

    fn save_alias(&self, alias: AliasEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = alias_doc_id(&alias.player_id);
            let rev = store
                .get_document::<RevisionOnly>(&doc_id)
                .await?
                .map(|existing| existing.rev);
            let doc = CouchAliasDocument::from((alias, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_alias(&self, player_id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&alias_doc_id(&player_id))
                .await
                .map_err(Into::into)
        })
    }

    fn list_aliases(&self) -> BoxFuture<'static, StorageResult<Vec<AliasEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchAliasDocument>(ALIAS_PREFIX)
                .await?;
            Ok(docs.into_iter().map(Into::into).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();

            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::DatabaseUnreachable {
                    database: store.database.to_string(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::DatabaseStatus {
                    database: store.database.to_string(),
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

fn request_error(doc_id: &str, source: reqwest::Error) -> CouchDaoError {
    CouchDaoError::Request {
        doc_id: doc_id.to_owned(),
        source,
    }
}

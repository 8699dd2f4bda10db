use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DB: &str = "turn_herald";

/// Parsed client options plus the database holding games and aliases.
#[derive(Clone, Debug)]
pub struct MongoConfig {
    /// Driver options parsed from the connection URI.
    pub options: ClientOptions,
    /// Database name.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, defaulting the database name when `db_name` is absent.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Read `MONGO_URI` (required) and `MONGO_DB` (optional).
    pub async fn from_env() -> MongoResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok()).await
    }

    async fn from_lookup<F>(lookup: F) -> MongoResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let uri = present("MONGO_URI").ok_or(MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let db = present("MONGO_DB");
        Self::from_uri(&uri, db.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uri_is_required() {
        let err = MongoConfig::from_lookup(|_| None).await.unwrap_err();
        assert!(matches!(err, MongoDaoError::MissingEnvVar { var: "MONGO_URI" }));
    }

    #[tokio::test]
    async fn database_falls_back_when_blank() {
        let config = MongoConfig::from_lookup(|key| match key {
            "MONGO_URI" => Some("mongodb://localhost:27017".into()),
            "MONGO_DB" => Some(" ".into()),
            _ => None,
        })
        .await
        .unwrap();
        assert_eq!(config.database_name, "turn_herald");
    }
}

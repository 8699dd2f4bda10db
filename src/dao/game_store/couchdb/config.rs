use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "turn_herald";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where and as whom the CouchDB store connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`.
    pub base_url: String,
    pub database: String,
    /// Basic-auth credentials, set only when both halves are provided.
    pub credentials: Option<(String, String)>,
    /// Bound on every HTTP request to CouchDB.
    pub request_timeout: Duration,
}

impl CouchConfig {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Read `COUCH_BASE_URL`, `COUCH_DB`, the `COUCH_USERNAME`/`COUCH_PASSWORD`
    /// pair and `COUCH_TIMEOUT_SECS`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> CouchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = present("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = present("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.into());
        let mut config = Self::new(base_url, database);
        if let Some(raw) = present("COUCH_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(CouchDaoError::InvalidEnvVar {
                    var: "COUCH_TIMEOUT_SECS",
                })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(match (present("COUCH_USERNAME"), present("COUCH_PASSWORD")) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        })
    }
}

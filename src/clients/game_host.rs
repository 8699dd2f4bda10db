//! Client for the external host that owns the authoritative game state.

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use serde_with::{NoneAsEmptyString, serde_as};
use thiserror::Error;

use crate::{clients::join_segments, state::game::GameId};

/// Status value the host uses for a game that is over.
pub const FINISHED_STATUS: &str = "finished";

/// Lifecycle of a game as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameStatus {
    /// Terminal state; the game will never change again.
    Finished,
    /// Anything else the host reports, kept verbatim for logging.
    InProgress(String),
}

impl<'de> Deserialize<'de> for GameStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == FINISHED_STATUS {
            GameStatus::Finished
        } else {
            GameStatus::InProgress(raw)
        })
    }
}

/// Player entry of an external game report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalPlayer {
    /// Numeric player id on the host.
    pub id: u64,
    /// Name the host displays for the player.
    pub name: String,
}

/// Payload of `GET {base}/{game_id}`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExternalGame {
    /// Current lifecycle state.
    pub status: GameStatus,
    /// Host id of the acting player; the host encodes it as a string and
    /// leaves it empty or out once nobody is acting.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub acting: Option<u64>,
    /// Every seat of the game.
    #[serde(default)]
    pub players: Vec<ExternalPlayer>,
}

impl ExternalGame {
    /// Player entry whose id equals the acting id.
    pub fn acting_player(&self) -> Option<&ExternalPlayer> {
        let acting = self.acting?;
        self.players.iter().find(|player| player.id == acting)
    }

    /// Whether the host reports the game as over.
    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }
}

/// Failures while fetching a game report.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to `{url}` failed")]
    Request {
        /// Target URL.
        url: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The host answered with a non-success status.
    #[error("`{url}` answered with status {status}")]
    Status {
        /// Target URL.
        url: String,
        /// Returned status.
        status: StatusCode,
    },
    /// The body is not a valid game report.
    #[error("could not parse game report from `{url}`")]
    Parse {
        /// Target URL.
        url: String,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// No answer within the allotted time.
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Source of authoritative game reports.
pub trait GameHost: Send + Sync {
    /// Fetch the current report of `game_id`.
    fn fetch_game(&self, game_id: &GameId) -> BoxFuture<'static, Result<ExternalGame, FetchError>>;
}

/// [`GameHost`] reading reports over HTTP.
#[derive(Clone)]
pub struct HttpGameHost {
    client: Client,
    base_url: String,
}

impl HttpGameHost {
    /// Build a client for `base_url`, bounding every request by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// URL of the report of `game_id`, with the id percent-encoded.
    pub fn game_url(&self, game_id: &GameId) -> String {
        join_segments(&self.base_url, [game_id.as_str()])
    }
}

impl GameHost for HttpGameHost {
    fn fetch_game(&self, game_id: &GameId) -> BoxFuture<'static, Result<ExternalGame, FetchError>> {
        let client = self.client.clone();
        let url = self.game_url(game_id);
        Box::pin(async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|source| FetchError::Request {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status { url, status });
            }

            let body = response
                .bytes()
                .await
                .map_err(|source| FetchError::Request {
                    url: url.clone(),
                    source,
                })?;
            parse_game(&body).map_err(|source| FetchError::Parse { url, source })
        })
    }
}

/// Decode a raw game report.
pub fn parse_game(body: &[u8]) -> Result<ExternalGame, serde_json::Error> {
    serde_json::from_slice(body)
}

//! Application-level configuration: JSON file first, environment variables on top.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::clients::join_segments;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TURN_HERALD_CONFIG_PATH";

const DEFAULT_EXTERNAL_POLL_SECS: u64 = 179;
const DEFAULT_ALERT_SCAN_SECS: u64 = 29;
const DEFAULT_FETCH_CONCURRENCY: usize = 4;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CHAT_API_BASE_URL: &str = "https://discord.com/api/v10";

/// What the alert dispatcher does with the pending flag when a delivery fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// Clear the flag whatever the outcome; a failed alert is not retried.
    #[default]
    AtMostOnce,
    /// Keep the flag after a failure so the next scan retries.
    AtLeastOnce,
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "at-most-once" => Ok(DeliveryPolicy::AtMostOnce),
            "at-least-once" => Ok(DeliveryPolicy::AtLeastOnce),
            other => Err(format!("unknown delivery policy `{other}`")),
        }
    }
}

/// Configuration problems that prevent startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is set neither in the file nor in the environment.
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    /// A setting holds a value that cannot be used.
    #[error("invalid value for `{key}`: {reason}")]
    Invalid {
        /// Environment variable or file key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Interval between two polls of the external host.
    pub external_poll_interval: Duration,
    /// Interval between two scans for pending alerts.
    pub alert_scan_interval: Duration,
    /// Base URL of the external game API (`GET {base}/{game_id}`).
    pub api_base_url: String,
    /// Base URL of the human-facing game pages linked in alerts.
    pub game_page_base_url: String,
    /// Text appended to every alert.
    pub alert_suffix: Option<String>,
    /// Maximum number of simultaneous fetches per poll cycle.
    pub fetch_concurrency: usize,
    /// Upper bound for any single outbound request.
    pub request_timeout: Duration,
    /// Flag handling after a failed delivery.
    pub delivery_policy: DeliveryPolicy,
    /// Base URL of the chat platform REST API.
    pub chat_api_base_url: String,
    /// Bot token; alerts are only logged when absent.
    pub chat_bot_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let raw = read_raw_config();
        Self::from_raw(raw, |key| env::var(key).ok())
    }

    /// Build the configuration from file values and an environment lookup.
    fn from_raw<F>(raw: RawConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let external_poll_secs = parse_env(&lookup, "TURN_HERALD_EXTERNAL_POLL_SECS")?
            .or(raw.external_poll_secs)
            .unwrap_or(DEFAULT_EXTERNAL_POLL_SECS);
        let alert_scan_secs = parse_env(&lookup, "TURN_HERALD_ALERT_SCAN_SECS")?
            .or(raw.alert_scan_secs)
            .unwrap_or(DEFAULT_ALERT_SCAN_SECS);
        let fetch_concurrency = parse_env(&lookup, "TURN_HERALD_FETCH_CONCURRENCY")?
            .or(raw.fetch_concurrency)
            .unwrap_or(DEFAULT_FETCH_CONCURRENCY);
        let request_timeout_secs = parse_env(&lookup, "TURN_HERALD_REQUEST_TIMEOUT_SECS")?
            .or(raw.request_timeout_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let delivery_policy = parse_env(&lookup, "TURN_HERALD_DELIVERY_POLICY")?
            .or(raw.delivery_policy)
            .unwrap_or_default();

        ensure_positive("TURN_HERALD_EXTERNAL_POLL_SECS", external_poll_secs)?;
        ensure_positive("TURN_HERALD_ALERT_SCAN_SECS", alert_scan_secs)?;
        ensure_positive("TURN_HERALD_FETCH_CONCURRENCY", fetch_concurrency as u64)?;
        ensure_positive("TURN_HERALD_REQUEST_TIMEOUT_SECS", request_timeout_secs)?;

        let api_base_url = lookup("TURN_HERALD_API_BASE_URL")
            .or(raw.api_base_url)
            .ok_or(ConfigError::Missing("TURN_HERALD_API_BASE_URL"))?;
        let game_page_base_url = lookup("TURN_HERALD_GAME_PAGE_BASE_URL")
            .or(raw.game_page_base_url)
            .unwrap_or_else(|| api_base_url.clone());

        Ok(Self {
            external_poll_interval: Duration::from_secs(external_poll_secs),
            alert_scan_interval: Duration::from_secs(alert_scan_secs),
            api_base_url: base_url("TURN_HERALD_API_BASE_URL", api_base_url)?,
            game_page_base_url: base_url("TURN_HERALD_GAME_PAGE_BASE_URL", game_page_base_url)?,
            alert_suffix: lookup("TURN_HERALD_ALERT_SUFFIX").or(raw.alert_suffix),
            fetch_concurrency,
            request_timeout: Duration::from_secs(request_timeout_secs),
            delivery_policy,
            chat_api_base_url: base_url(
                "CHAT_API_BASE_URL",
                lookup("CHAT_API_BASE_URL")
                    .or(raw.chat_api_base_url)
                    .unwrap_or_else(|| DEFAULT_CHAT_API_BASE_URL.into()),
            )?,
            chat_bot_token: lookup("CHAT_BOT_TOKEN"),
        })
    }

    /// Link to the human-facing page of `game_id`, with the id percent-encoded.
    pub fn game_page_url(&self, game_id: &str) -> String {
        join_segments(&self.game_page_base_url, [game_id])
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    external_poll_secs: Option<u64>,
    alert_scan_secs: Option<u64>,
    api_base_url: Option<String>,
    game_page_base_url: Option<String>,
    alert_suffix: Option<String>,
    fetch_concurrency: Option<usize>,
    request_timeout_secs: Option<u64>,
    delivery_policy: Option<DeliveryPolicy>,
    chat_api_base_url: Option<String>,
}

/// Read the configuration file, falling back to empty values when it is absent or broken.
fn read_raw_config() -> RawConfig {
    let path = resolve_config_path();
    match fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                raw
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse config; falling back to defaults"
                );
                RawConfig::default()
            }
        },
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!(
                path = %path.display(),
                "config file not found; using environment and built-in defaults"
            );
            RawConfig::default()
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read config; falling back to defaults"
            );
            RawConfig::default()
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn parse_env<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
                key,
                reason: err.to_string(),
            })
        })
        .transpose()
}

fn ensure_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(())
}

/// Accept `url` as the base of request paths: absolute, hierarchical, no trailing slash.
fn base_url(key: &'static str, url: String) -> Result<String, ConfigError> {
    let url = url.trim().trim_end_matches('/');
    match Url::parse(url) {
        Ok(parsed) if !parsed.cannot_be_a_base() => Ok(url.to_owned()),
        Ok(_) => Err(ConfigError::Invalid {
            key,
            reason: format!("`{url}` cannot carry a path"),
        }),
        Err(err) => Err(ConfigError::Invalid {
            key,
            reason: format!("`{url}` is not an absolute URL: {err}"),
        }),
    }
}

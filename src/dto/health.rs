use std::time::SystemTime;

use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::format_system_time;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// When the process started, RFC 3339.
    pub started_at: String,
    /// Seconds since the process started.
    pub uptime_secs: u64,
    /// Number of games currently monitored.
    pub monitored_games: usize,
    /// Number of turn alerts waiting for delivery.
    pub pending_alerts: usize,
}

impl HealthResponse {
    /// Build the response for a process started at `started_at`.
    pub fn new(
        degraded: bool,
        started_at: SystemTime,
        monitored_games: usize,
        pending_alerts: usize,
    ) -> Self {
        let uptime_secs = SystemTime::now()
            .duration_since(started_at)
            .unwrap_or_default()
            .as_secs();
        Self {
            status: if degraded { "degraded" } else { "ok" }.to_string(),
            started_at: format_system_time(started_at),
            uptime_secs,
            monitored_games,
            pending_alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn reports_start_time_and_uptime() {
        let started_at = SystemTime::now() - Duration::from_secs(90);
        let health = HealthResponse::new(false, started_at, 1, 0);
        assert_eq!(health.status, "ok");
        assert!(health.uptime_secs >= 90);

        let value = serde_json::to_value(&health).unwrap();
        assert_eq!(value["startedAt"], format_system_time(started_at));
        assert_eq!(value["monitoredGames"], 1);
    }
}

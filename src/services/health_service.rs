use tracing::warn;

use crate::{
    dao::storage::{STORAGE_CALL_TIMEOUT, bounded},
    dto::health::HealthResponse,
    state::SharedState,
};

/// Report monitoring counters and storage status, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_game_store().await {
        Ok(store) => {
            if let Err(err) =
                bounded(STORAGE_CALL_TIMEOUT, "health_check", store.health_check()).await
            {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let monitored = state.registry().len().await;
    let pending = state.registry().pending_alerts().await;
    HealthResponse::new(state.is_degraded(), state.started_at(), monitored, pending)
}

//! Periodic refresh of every monitored game from the external host.

use std::{sync::Arc, time::Duration};

use futures::{StreamExt, future::BoxFuture, stream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    clients::game_host::{ExternalGame, FetchError, GameHost},
    services::{removal_sync, scheduler::PeriodicTask},
    state::{
        SharedState,
        game::{GameId, TurnUpdate},
        identity::IdentityMap,
        registry::RegistryError,
        removals::PendingRemoval,
    },
};

/// Counters describing one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Games fetched this cycle.
    pub checked: usize,
    /// Games whose turn moved to another tracked player.
    pub changed: usize,
    /// Games whose acting player did not change.
    pub unchanged: usize,
    /// Games whose acting player could not be matched to a tracked player.
    pub unresolved: usize,
    /// Games reported finished and dropped from monitoring.
    pub finished: usize,
    /// Games whose report could not be fetched or parsed.
    pub failed: usize,
}

/// Pulls the authoritative state of every monitored game and feeds it into the registry.
pub struct ExternalPoller {
    state: SharedState,
    host: Arc<dyn GameHost>,
    concurrency: usize,
    request_timeout: Duration,
}

impl ExternalPoller {
    /// Poll through `host`, running at most `concurrency` fetches at once.
    pub fn new(
        state: SharedState,
        host: Arc<dyn GameHost>,
        concurrency: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            state,
            host,
            concurrency: concurrency.max(1),
            request_timeout,
        }
    }

    /// Run one poll cycle over a snapshot of the registry.
    ///
    /// Every fetch completes or times out before any result is committed.
    /// Finished games are then flagged inactive in storage, each call bounded
    /// by the request timeout.
    pub async fn run_cycle(&self) -> PollReport {
        let snapshot = self.state.registry().snapshot().await;
        let mut report = PollReport::default();
        if snapshot.is_empty() {
            return report;
        }
        let identities = self.state.identities_snapshot().await;

        let results: Vec<_> = stream::iter(snapshot.into_iter().map(|(id, _)| {
            let host = self.host.clone();
            let limit = self.request_timeout;
            async move {
                let result = match timeout(limit, host.fetch_game(&id)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(limit)),
                };
                (id, result)
            }
        }))
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut retired = Vec::new();
        for (id, result) in results {
            report.checked += 1;
            match result {
                Ok(game) if game.is_finished() => {
                    if self.retire(&id, &mut report).await {
                        retired.push(id);
                    }
                }
                Ok(game) => self.apply(&id, game, &identities, &mut report).await,
                Err(err) => {
                    report.failed += 1;
                    warn!(game_id = %id, error = %err, "failed to refresh game; retrying next cycle");
                }
            }
        }

        let state = &self.state;
        let limit = self.request_timeout;
        stream::iter(retired)
            .for_each_concurrent(self.concurrency, |id| async move {
                removal_sync::persist(state, PendingRemoval::Retire(id), limit).await;
            })
            .await;

        debug!(?report, "poll cycle complete");
        report
    }

    async fn apply(
        &self,
        id: &GameId,
        game: ExternalGame,
        identities: &IdentityMap,
        report: &mut PollReport,
    ) {
        let Some(acting) = game.acting_player() else {
            report.unresolved += 1;
            warn!(
                game_id = %id,
                acting = ?game.acting,
                "acting id missing from the reported player list"
            );
            return;
        };

        match self
            .state
            .registry()
            .advance_turn(id, &acting.name, identities)
            .await
        {
            Ok(TurnUpdate::Changed(_)) => report.changed += 1,
            Ok(TurnUpdate::Unchanged) => report.unchanged += 1,
            Ok(TurnUpdate::Unresolved) => report.unresolved += 1,
            Err(RegistryError::NotFound(_)) => {
                debug!(game_id = %id, "game forgotten while its report was in flight");
            }
            Err(err) => warn!(game_id = %id, error = %err, "failed to record turn"),
        }
    }

    /// Stop monitoring a finished game. Returns whether this cycle removed it.
    async fn retire(&self, id: &GameId, report: &mut PollReport) -> bool {
        if !self.state.registry().remove(id).await.was_removed() {
            debug!(game_id = %id, "finished game was already forgotten");
            return false;
        }
        report.finished += 1;
        info!(game_id = %id, "game finished; monitoring stopped");
        true
    }
}

impl PeriodicTask for ExternalPoller {
    fn name(&self) -> &'static str {
        "external-poller"
    }

    fn tick(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.run_cycle().await;
        })
    }
}

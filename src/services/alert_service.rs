//! Delivery of pending turn alerts to the chat platform.

use std::sync::Arc;

use futures::{StreamExt, future::BoxFuture, stream};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    clients::chat::{ChatGateway, ChatMessage, DeliveryError, mention},
    config::{AppConfig, DeliveryPolicy},
    services::scheduler::PeriodicTask,
    state::{SharedState, game::GameId, registry::RegistryError},
};

/// Counters describing one dispatch cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Alerts accepted by the chat platform.
    pub sent: usize,
    /// Alerts that could not be delivered.
    pub failed: usize,
}

/// Build the alert text for `player_id` whose turn it is in `game_id`.
pub fn alert_message(player_id: &str, game_id: &GameId, page_url: &str, suffix: Option<&str>) -> String {
    let mut content = format!(
        "{}, it's your turn in game {}: {}",
        mention(player_id),
        game_id,
        page_url
    );
    if let Some(suffix) = suffix.map(str::trim).filter(|suffix| !suffix.is_empty()) {
        content.push(' ');
        content.push_str(suffix);
    }
    content
}

/// Alert waiting to be delivered, copied out of the registry.
struct PendingAlert {
    game_id: GameId,
    player_id: String,
    message: ChatMessage,
}

/// Scans the registry for pending alerts and posts them.
pub struct AlertDispatcher {
    state: SharedState,
    chat: Arc<dyn ChatGateway>,
    config: AppConfig,
}

impl AlertDispatcher {
    /// Dispatcher posting through `chat` with the settings of `config`.
    pub fn new(state: SharedState, chat: Arc<dyn ChatGateway>, config: &AppConfig) -> Self {
        Self {
            state,
            chat,
            config: config.clone(),
        }
    }

    /// Deliver every alert pending at the start of the cycle.
    ///
    /// A flag is cleared only if the alerted player still holds the turn once
    /// delivery finishes, so a turn change observed meanwhile keeps its alert.
    pub async fn run_cycle(&self) -> DispatchReport {
        let pending: Vec<PendingAlert> = self
            .state
            .registry()
            .snapshot()
            .await
            .into_iter()
            .filter(|(_, game)| game.needs_alert())
            .filter_map(|(id, game)| {
                let player = game.current_player()?;
                let content = alert_message(
                    &player.id,
                    &id,
                    &self.config.game_page_url(id.as_str()),
                    self.config.alert_suffix.as_deref(),
                );
                Some(PendingAlert {
                    player_id: player.id.clone(),
                    message: ChatMessage {
                        channel_id: game.channel_id().to_owned(),
                        content,
                        mentions: vec![player.id.clone()],
                    },
                    game_id: id,
                })
            })
            .collect();

        let mut report = DispatchReport::default();
        if pending.is_empty() {
            return report;
        }

        let mut deliveries = stream::iter(pending.into_iter().map(|alert| {
            let chat = self.chat.clone();
            let limit = self.config.request_timeout;
            async move {
                let channel_id = alert.message.channel_id.clone();
                let result = match timeout(limit, chat.send(alert.message)).await {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::Timeout {
                        channel_id,
                        timeout: limit,
                    }),
                };
                (alert.game_id, alert.player_id, result)
            }
        }))
        .buffer_unordered(self.config.fetch_concurrency.max(1));

        while let Some((game_id, player_id, result)) = deliveries.next().await {
            let clear = match result {
                Ok(()) => {
                    report.sent += 1;
                    info!(game_id = %game_id, player_id = %player_id, "turn alert delivered");
                    true
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        game_id = %game_id,
                        player_id = %player_id,
                        error = %err,
                        policy = ?self.config.delivery_policy,
                        "turn alert delivery failed"
                    );
                    self.config.delivery_policy == DeliveryPolicy::AtMostOnce
                }
            };
            if clear {
                self.clear(&game_id, &player_id).await;
            }
        }

        debug!(?report, "dispatch cycle complete");
        report
    }

    async fn clear(&self, game_id: &GameId, player_id: &str) {
        match self.state.registry().clear_alert(game_id, player_id).await {
            Ok(true) => {}
            Ok(false) => debug!(
                game_id = %game_id,
                "turn moved on during delivery; newer alert stays pending"
            ),
            Err(RegistryError::NotFound(_)) => {
                debug!(game_id = %game_id, "game forgotten during delivery")
            }
            Err(err) => warn!(game_id = %game_id, error = %err, "failed to clear alert"),
        }
    }
}

impl PeriodicTask for AlertDispatcher {
    fn name(&self) -> &'static str {
        "alert-dispatcher"
    }

    fn tick(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.run_cycle().await;
        })
    }
}

//! End-to-end turn tracking: monitor, poll, alert, finish, restart.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::BoxFuture;

use turn_herald::{
    clients::{
        chat::{ChatGateway, ChatMessage, DeliveryError},
        game_host::{ExternalGame, ExternalPlayer, FetchError, GameHost, GameStatus},
    },
    config::{AppConfig, DeliveryPolicy},
    dao::game_store::{GameStore, memory::MemoryGameStore},
    dto::game::{MonitorGameRequest, PlayerInput},
    services::{
        alert_service::AlertDispatcher, alias_service, monitor_service,
        poller_service::ExternalPoller, rehydration,
    },
    state::{AppState, SharedState, game::GameId},
};

#[derive(Clone, Default)]
struct FakeHost {
    games: Arc<Mutex<HashMap<String, ExternalGame>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FakeHost {
    fn report(&self, id: &str, status: GameStatus, acting: u64) {
        let game = ExternalGame {
            status,
            acting: Some(acting),
            players: vec![
                ExternalPlayer {
                    id: 7,
                    name: "AliceWeb".into(),
                },
                ExternalPlayer {
                    id: 42,
                    name: "BobWeb".into(),
                },
            ],
        };
        self.games.lock().unwrap().insert(id.into(), game);
    }

    fn acting(&self, id: &str, acting: u64) {
        self.report(id, GameStatus::InProgress("playing".into()), acting);
    }

    fn fetch_count(&self, id: &str) -> usize {
        self.fetched
            .lock()
            .unwrap()
            .iter()
            .filter(|fetched| fetched.as_str() == id)
            .count()
    }
}

impl GameHost for FakeHost {
    fn fetch_game(&self, game_id: &GameId) -> BoxFuture<'static, Result<ExternalGame, FetchError>> {
        let host = self.clone();
        let id = game_id.to_string();
        Box::pin(async move {
            host.fetched.lock().unwrap().push(id.clone());
            host.games
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(FetchError::Timeout(Duration::from_secs(1)))
        })
    }
}

#[derive(Clone, Default)]
struct FakeChat {
    sent: Arc<Mutex<Vec<ChatMessage>>>,
    down: Arc<Mutex<bool>>,
}

impl FakeChat {
    fn messages(&self) -> Vec<ChatMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl ChatGateway for FakeChat {
    fn send(&self, message: ChatMessage) -> BoxFuture<'static, Result<(), DeliveryError>> {
        let chat = self.clone();
        Box::pin(async move {
            if *chat.down.lock().unwrap() {
                return Err(DeliveryError::Timeout {
                    channel_id: message.channel_id,
                    timeout: Duration::from_secs(1),
                });
            }
            chat.sent.lock().unwrap().push(message);
            Ok(())
        })
    }
}

fn config(policy: DeliveryPolicy) -> AppConfig {
    AppConfig {
        external_poll_interval: Duration::from_secs(179),
        alert_scan_interval: Duration::from_secs(29),
        api_base_url: "https://host.test/api/game".into(),
        game_page_base_url: "https://host.test/game".into(),
        alert_suffix: None,
        fetch_concurrency: 4,
        request_timeout: Duration::from_secs(5),
        delivery_policy: policy,
        chat_api_base_url: "https://chat.test".into(),
        chat_bot_token: None,
    }
}

struct Harness {
    state: SharedState,
    store: MemoryGameStore,
    host: FakeHost,
    chat: FakeChat,
    poller: ExternalPoller,
    dispatcher: AlertDispatcher,
}

impl Harness {
    async fn new(policy: DeliveryPolicy) -> Self {
        let state = AppState::new();
        let store = MemoryGameStore::new();
        state.install_game_store(Arc::new(store.clone())).await;
        Self::with_state(state, store, policy)
    }

    fn with_state(state: SharedState, store: MemoryGameStore, policy: DeliveryPolicy) -> Self {
        let host = FakeHost::default();
        let chat = FakeChat::default();
        let config = config(policy);
        let poller = ExternalPoller::new(
            state.clone(),
            Arc::new(host.clone()),
            config.fetch_concurrency,
            config.request_timeout,
        );
        let dispatcher = AlertDispatcher::new(state.clone(), Arc::new(chat.clone()), &config);
        Self {
            state,
            store,
            host,
            chat,
            poller,
            dispatcher,
        }
    }

    async fn monitor(&self, id: &str) {
        let request = MonitorGameRequest {
            game_id: id.into(),
            channel_id: "table-talk".into(),
            guild_id: Some("guild".into()),
            players: vec![
                PlayerInput {
                    id: "100".into(),
                    display_name: "Alice".into(),
                    nickname: None,
                    username: "alice".into(),
                },
                PlayerInput {
                    id: "200".into(),
                    display_name: "Bob".into(),
                    nickname: None,
                    username: "BobWeb".into(),
                },
            ],
        };
        monitor_service::monitor_game(&self.state, request)
            .await
            .unwrap();
    }

    async fn needs_alert(&self, id: &str) -> bool {
        self.state
            .registry()
            .get(&GameId::new(id))
            .await
            .unwrap()
            .needs_alert()
    }
}

#[tokio::test]
async fn turn_changes_are_announced_once_per_change() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    alias_service::set_alias(&h.state, "100", "AliceWeb").await;
    h.monitor("g1").await;

    h.host.acting("g1", 42);
    assert_eq!(h.poller.run_cycle().await.changed, 1);
    assert!(h.needs_alert("g1").await);

    assert_eq!(h.dispatcher.run_cycle().await.sent, 1);
    assert!(!h.needs_alert("g1").await);
    let messages = h.chat.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].channel_id, "table-talk");
    assert_eq!(
        messages[0].content,
        "<@200>, it's your turn in game g1: https://host.test/game/g1"
    );

    // Same acting player again: nothing new to announce.
    assert_eq!(h.poller.run_cycle().await.unchanged, 1);
    assert_eq!(h.dispatcher.run_cycle().await.sent, 0);

    // Alice is reported under her alias.
    h.host.acting("g1", 7);
    assert_eq!(h.poller.run_cycle().await.changed, 1);
    h.dispatcher.run_cycle().await;

    let messages = h.chat.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[1].content.starts_with("<@100>"));
}

#[tokio::test]
async fn finished_games_stop_being_polled() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    h.monitor("g1").await;
    h.host.report("g1", GameStatus::Finished, 42);

    assert_eq!(h.poller.run_cycle().await.finished, 1);
    assert!(h.state.registry().is_empty().await);
    assert!(!h.store.game("g1").unwrap().is_active);

    h.poller.run_cycle().await;
    h.poller.run_cycle().await;
    assert_eq!(h.host.fetch_count("g1"), 1);

    // A finished game is not resurrected by a restart.
    let restarted = AppState::new();
    rehydration::rehydrate(&restarted, &h.store).await.unwrap();
    assert!(restarted.registry().is_empty().await);
}

#[tokio::test]
async fn restart_restores_games_and_aliases() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    alias_service::set_alias(&h.state, "100", "AliceWeb").await;
    h.monitor("g1").await;
    h.monitor("g2").await;

    let restarted = AppState::new();
    let report = rehydration::rehydrate(&restarted, &h.store).await.unwrap();
    assert_eq!(report.games, 2);
    assert_eq!(report.aliases, 1);

    let h2 = Harness::with_state(restarted, h.store.clone(), DeliveryPolicy::AtMostOnce);
    h2.host.acting("g1", 7);
    h2.host.acting("g2", 42);
    assert_eq!(h2.poller.run_cycle().await.changed, 2);

    let game = h2.state.registry().get(&GameId::new("g1")).await.unwrap();
    assert_eq!(game.current_player().map(|p| p.id.as_str()), Some("100"));
    let players: Vec<_> = game.players().map(|p| p.id.as_str()).collect();
    assert_eq!(players, ["100", "200"]);
}

#[tokio::test]
async fn failed_alerts_are_retried_under_at_least_once() {
    let h = Harness::new(DeliveryPolicy::AtLeastOnce).await;
    h.monitor("g1").await;
    h.host.acting("g1", 42);
    h.poller.run_cycle().await;

    *h.chat.down.lock().unwrap() = true;
    assert_eq!(h.dispatcher.run_cycle().await.failed, 1);
    assert!(h.needs_alert("g1").await);

    *h.chat.down.lock().unwrap() = false;
    assert_eq!(h.dispatcher.run_cycle().await.sent, 1);
    assert!(!h.needs_alert("g1").await);
}

#[tokio::test]
async fn failed_alerts_are_dropped_under_at_most_once() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    h.monitor("g1").await;
    h.host.acting("g1", 42);
    h.poller.run_cycle().await;

    *h.chat.down.lock().unwrap() = true;
    h.dispatcher.run_cycle().await;
    *h.chat.down.lock().unwrap() = false;

    assert_eq!(h.dispatcher.run_cycle().await.sent, 0);
    assert!(h.chat.messages().is_empty());
}

#[tokio::test]
async fn host_outage_leaves_state_untouched() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    h.monitor("g1").await;

    let report = h.poller.run_cycle().await;
    assert_eq!(report.failed, 1);
    let game = h.state.registry().get(&GameId::new("g1")).await.unwrap();
    assert!(game.current_player().is_none());
    assert!(!game.needs_alert());
}

#[tokio::test]
async fn storage_outage_does_not_block_monitoring() {
    let h = Harness::new(DeliveryPolicy::AtMostOnce).await;
    h.store.set_offline(true);
    h.monitor("g1").await;

    h.host.acting("g1", 42);
    assert_eq!(h.poller.run_cycle().await.changed, 1);
    assert_eq!(h.dispatcher.run_cycle().await.sent, 1);

    h.host.report("g1", GameStatus::Finished, 42);
    h.poller.run_cycle().await;
    assert!(h.state.registry().is_empty().await);
    assert!(h.store.list_aliases().await.is_err());
}

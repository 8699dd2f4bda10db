pub mod game;
pub mod identity;
pub mod registry;
pub mod removals;

use std::{sync::Arc, time::SystemTime};

use tokio::sync::{RwLock, watch};

use crate::{dao::game_store::GameStore, error::ServiceError};

use self::{identity::IdentityMap, registry::GameRegistry, removals::PendingRemovals};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: monitored games, identity overrides, and the storage handle.
pub struct AppState {
    registry: GameRegistry,
    identities: RwLock<IdentityMap>,
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    pending_removals: PendingRemovals,
    degraded: watch::Sender<bool>,
    started_at: SystemTime,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new() -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            registry: GameRegistry::new(),
            identities: RwLock::new(IdentityMap::new()),
            game_store: RwLock::new(None),
            pending_removals: PendingRemovals::default(),
            degraded: degraded_tx,
            started_at: SystemTime::now(),
        })
    }

    /// Every monitored game.
    pub fn registry(&self) -> &GameRegistry {
        &self.registry
    }

    /// Operator-maintained alias overrides.
    pub fn identities(&self) -> &RwLock<IdentityMap> {
        &self.identities
    }

    /// Detached copy of the alias overrides, so callers never hold this lock
    /// while taking the registry lock.
    pub async fn identities_snapshot(&self) -> IdentityMap {
        self.identities.read().await.clone()
    }

    /// When this state, and so the process, was created.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Removals storage has not caught up with yet.
    pub fn pending_removals(&self) -> &PendingRemovals {
        &self.pending_removals
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}

//! Fixed-interval driver for the background sync loops.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info, warn};

/// Work executed once per tick.
pub trait PeriodicTask: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Run one cycle. Failures are handled inside the cycle; nothing propagates.
    fn tick(&self) -> BoxFuture<'_, ()>;
}

/// Handle to a spawned task, used to inject extra ticks.
#[derive(Clone)]
pub struct TaskHandle {
    name: &'static str,
    trigger: mpsc::Sender<()>,
}

impl TaskHandle {
    /// Name of the task behind this handle.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask for a cycle as soon as the current one (if any) completes.
    ///
    /// Requests coalesce: at most one extra cycle is queued. Returns `false`
    /// once the scheduler has shut down.
    pub fn tick_now(&self) -> bool {
        match self.trigger.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

/// Owner of every periodic loop.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a scheduler with no task.
    pub fn new() -> Self {
        let (shutdown, _rx) = watch::channel(false);
        Self {
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Run `task` every `period`, starting immediately.
    ///
    /// Ticks missed while a slow cycle runs are not replayed in a burst; the
    /// next cycle simply starts one `period` after the slow one ends.
    pub fn spawn<T: PeriodicTask>(&mut self, task: Arc<T>, period: Duration) -> TaskHandle {
        let name = task.name();
        let (trigger, mut manual) = mpsc::channel::<()>(1);
        let mut shutdown = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(task = name, ?period, "periodic task started");

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        debug!(task = name, "scheduled tick");
                        task.tick().await;
                    }
                    Some(()) = manual.recv() => {
                        debug!(task = name, "manual tick");
                        task.tick().await;
                    }
                }
            }

            info!(task = name, "periodic task stopped");
        });

        self.tasks.push((name, handle));
        TaskHandle { name, trigger }
    }

    /// Stop every loop and wait for them; a cycle already running completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (name, handle) in self.tasks {
            if let Err(err) = handle.await {
                warn!(task = name, error = %err, "periodic task ended abnormally");
            }
        }
    }
}

//! Sync trigger loop.
//!
//! [`SyncService`] owns a [`SyncEngine`] and runs it when one of three
//! triggers fires:
//!
//! - connectivity restored, after a settle delay, if still online
//! - a manual request through a [`SyncHandle`]
//! - a periodic tick, only while a relevant UI surface is visible and the
//!   device is online
//!
//! Runs never overlap: the loop awaits each run before polling triggers
//! again. The loop ends when every handle has been dropped.

use std::{sync::Arc, time::Duration};

use s4_core::{BackoffPolicy, Environment, SyncReport};
use s4_store::Storage;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{engine::SyncEngine, error::ClientError, http::Transport};

/// Wait after connectivity returns before the first attempt.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Period of the visible-surface check.
pub const DEFAULT_PERIODIC_INTERVAL: Duration = Duration::from_secs(30);

const COMMAND_CAPACITY: usize = 8;

/// Trigger timing and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Retry schedule for each run
    pub backoff: BackoffPolicy,
    /// Delay between connectivity restored and the first attempt
    pub settle_delay: Duration,
    /// Period of the visible-surface check
    pub periodic_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            periodic_interval: DEFAULT_PERIODIC_INTERVAL,
        }
    }
}

type Reply = oneshot::Sender<Result<SyncReport, ClientError>>;

/// Requests from handles to the loop.
#[derive(Debug)]
enum Command {
    SyncNow(Reply),
}

/// Cloneable control handle for a running [`SyncService`].
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<Command>,
    visible: Arc<watch::Sender<bool>>,
}

impl SyncHandle {
    /// Run a sync now and wait for its report.
    ///
    /// # Errors
    ///
    /// - `ClientError::ServiceStopped` if the loop is gone
    /// - Whatever the run itself returned
    pub async fn sync_now(&self) -> Result<SyncReport, ClientError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::SyncNow(reply))
            .await
            .map_err(|_| ClientError::ServiceStopped)?;
        response.await.map_err(|_| ClientError::ServiceStopped)?
    }

    /// Enable or disable the periodic check.
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    /// Whether the periodic check is enabled.
    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }
}

/// Trigger loop around a [`SyncEngine`].
pub struct SyncService<T: Transport, S: Storage, E: Environment> {
    engine: SyncEngine<T, S, E>,
    config: SyncConfig,
    commands: mpsc::Receiver<Command>,
    visible: watch::Receiver<bool>,
    connectivity: watch::Receiver<bool>,
}

impl<T: Transport, S: Storage, E: Environment> SyncService<T, S, E> {
    /// Wrap `engine`, applying `config.backoff` to it.
    ///
    /// Connectivity transitions are observed from this call on, even before
    /// [`Self::run`] is polled. The periodic check starts disabled.
    pub fn new(engine: SyncEngine<T, S, E>, config: SyncConfig) -> (Self, SyncHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (visible_tx, visible) = watch::channel(false);

        let connectivity = engine.connectivity().subscribe();

        let service = Self {
            engine: engine.with_policy(config.backoff),
            config,
            commands,
            visible,
            connectivity,
        };
        let handle = SyncHandle { commands: command_tx, visible: Arc::new(visible_tx) };
        (service, handle)
    }

    /// The engine, for subscribing to notices before `run`.
    pub fn engine(&self) -> &SyncEngine<T, S, E> {
        &self.engine
    }

    /// Serve triggers until every [`SyncHandle`] is dropped.
    pub async fn run(mut self) {
        let env = self.engine.queue().env().clone();
        let mut connectivity_open = true;

        let tick = env.sleep(self.config.periodic_interval);
        tokio::pin!(tick);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::SyncNow(reply)) => {
                        let result = self.engine.sync_with_backoff().await;
                        // Caller may have stopped waiting.
                        let _ = reply.send(result);
                    },
                    None => break,
                },
                changed = self.connectivity.changed(), if connectivity_open => {
                    if changed.is_err() {
                        connectivity_open = false;
                        continue;
                    }
                    let online = *self.connectivity.borrow_and_update();
                    if online {
                        self.on_reconnect(&env).await;
                    }
                },
                () = &mut tick => {
                    tick.set(env.sleep(self.config.periodic_interval));
                    if *self.visible.borrow() && self.engine.connectivity().is_online() {
                        tracing::debug!("periodic sync check");
                        self.run_triggered("periodic").await;
                    }
                },
            }
        }

        tracing::debug!("sync service stopped");
    }

    async fn on_reconnect(&mut self, env: &E) {
        tracing::debug!(settle_ms = self.config.settle_delay.as_millis() as u64, "connectivity restored");
        env.sleep(self.config.settle_delay).await;

        if self.engine.connectivity().is_online() {
            self.run_triggered("reconnect").await;
        } else {
            tracing::debug!("went offline again during settle delay");
        }
    }

    async fn run_triggered(&mut self, trigger: &'static str) {
        if let Err(e) = self.engine.sync_with_backoff().await {
            tracing::warn!(trigger, error = %e, "sync run failed");
        }
    }
}

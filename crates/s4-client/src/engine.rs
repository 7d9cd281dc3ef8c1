//! Sync engine driver.
//!
//! Executes the actions of [`SyncMachine`]: loads the queue, POSTs the
//! pending batch, sleeps out backoff delays, and persists the result. The
//! machine owns every retry decision; this driver only performs I/O.
//!
//! Retries are strictly sequential: the next attempt is scheduled only after
//! the previous one fully resolved, and one `sync_with_backoff` call runs the
//! whole chain to a terminal [`SyncReport`].

use std::sync::Arc;

use s4_core::{
    BackoffPolicy, Environment, OfflineRoutes, QueueItem, StatusLevel, SyncAction, SyncMachine,
    SyncReport, pending_items,
};
use s4_store::{QueueStore, Storage};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;

use crate::{
    connectivity::Connectivity,
    error::ClientError,
    http::{HttpRequest, Transport, TransportError},
};

/// Capacity of the status notice channel. Slow receivers lose the oldest.
const NOTICE_CAPACITY: usize = 32;

/// User-visible status line emitted while syncing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotice {
    /// Severity
    pub level: StatusLevel,
    /// Human-readable text
    pub message: String,
}

/// Body of a successful sync response. Only used for logging.
#[derive(Debug, Deserialize)]
struct SyncResponse {
    synced: Option<u64>,
}

/// Drains the page-side queue to the batch sync endpoint.
pub struct SyncEngine<T: Transport, S: Storage, E: Environment> {
    transport: T,
    queue: Arc<QueueStore<S, E>>,
    connectivity: Connectivity,
    routes: OfflineRoutes,
    machine: SyncMachine,
    notices: broadcast::Sender<StatusNotice>,
}

impl<T: Transport, S: Storage, E: Environment> SyncEngine<T, S, E> {
    /// Engine sending through `transport` with the default backoff policy.
    pub fn new(transport: T, queue: Arc<QueueStore<S, E>>, connectivity: Connectivity) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            transport,
            queue,
            connectivity,
            routes: OfflineRoutes::default(),
            machine: SyncMachine::default(),
            notices,
        }
    }

    /// Use `policy` for retries.
    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.machine = SyncMachine::new(policy);
        self
    }

    /// Use custom route paths.
    #[must_use]
    pub fn with_routes(mut self, routes: OfflineRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Receive status notices from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusNotice> {
        self.notices.subscribe()
    }

    /// Connectivity flag the engine consults.
    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    /// The queue being drained.
    pub fn queue(&self) -> &Arc<QueueStore<S, E>> {
        &self.queue
    }

    /// The state machine, for inspection.
    pub fn machine(&self) -> &SyncMachine {
        &self.machine
    }

    /// Drain pending items, retrying with exponential backoff.
    ///
    /// Every run starts at attempt 0. Going offline mid-backoff ends the run
    /// with [`SyncReport::Offline`] and gives the next run the full budget.
    ///
    /// # Errors
    ///
    /// - `ClientError::Storage` if the queue could not be saved after the
    ///   server accepted the batch (items stay pending and go again later)
    /// - `ClientError::Sync` if called while another run is in flight
    pub async fn sync_with_backoff(&mut self) -> Result<SyncReport, ClientError> {
        let mut batch = self.pending();
        let mut action = self.machine.check(batch.len(), self.connectivity.is_online())?;

        loop {
            action = match action {
                SyncAction::SendBatch { attempt, count } => {
                    tracing::debug!(attempt, count, "sending sync batch");
                    match self.send_batch(&batch).await {
                        Ok(()) => {
                            let synced = self.commit(&batch).inspect_err(|_| self.machine.reset())?;
                            self.machine.handle_success(synced)?
                        },
                        Err(e) => {
                            tracing::warn!(attempt, error = %e, transient = e.is_transient(), "batch sync failed");
                            let random = self.queue.env().random_u64();
                            self.machine.handle_failure(random)?
                        },
                    }
                },
                SyncAction::ScheduleRetry { attempt, delay } => {
                    let max = self.machine.policy().max_retries;
                    tracing::warn!(attempt, max, delay_ms = delay.as_millis() as u64, "retrying sync");
                    self.notify(
                        StatusLevel::Warn,
                        format!("Sync failed, retrying in {:.1}s (attempt {attempt}/{max})", delay.as_secs_f64()),
                    );

                    self.queue.env().sleep(delay).await;

                    batch = self.pending();
                    self.machine.check(batch.len(), self.connectivity.is_online())?
                },
                SyncAction::Finish(report) => {
                    self.finish(&report);
                    return Ok(report);
                },
            };
        }
    }

    fn pending(&self) -> Vec<QueueItem> {
        pending_items(&self.queue.load_queue())
    }

    async fn send_batch(&self, batch: &[QueueItem]) -> Result<(), TransportError> {
        let request = HttpRequest::post_json(&self.routes.sync, &json!({ "hashes": batch }));
        let response = self.transport.send(request).await?.error_for_status()?;

        if let Ok(SyncResponse { synced: Some(server_count) }) = response.decode() {
            tracing::debug!(server_count, sent = batch.len(), "server acknowledged batch");
        }
        Ok(())
    }

    /// Mark the delivered batch synced and record the sync time.
    fn commit(&self, batch: &[QueueItem]) -> Result<usize, ClientError> {
        let at = self.queue.env().timestamp();
        let synced = self.queue.mark_synced(batch, &at)?;
        self.queue.record_last_sync(&at)?;
        Ok(synced)
    }

    fn finish(&self, report: &SyncReport) {
        match report {
            SyncReport::NothingPending => tracing::debug!("nothing to sync"),
            SyncReport::Offline { pending } => tracing::warn!(pending, "offline; sync deferred"),
            SyncReport::Synced { count } => tracing::info!(count, "sync complete"),
            SyncReport::Exhausted { attempts, pending } => {
                tracing::warn!(attempts, pending, "sync retries exhausted");
            },
        }
        self.notify(report.level(), report.message());
    }

    fn notify(&self, level: StatusLevel, message: String) {
        // No receivers is fine.
        let _ = self.notices.send(StatusNotice { level, message });
    }
}

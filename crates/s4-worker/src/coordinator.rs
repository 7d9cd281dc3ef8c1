//! Background sync coordinator.
//!
//! Runs in its own execution context with its own durable [`Outbox`]. On
//! each wake it delivers queued anchors one at a time, deleting each as soon
//! as the server accepts it, so partial progress always sticks. There is no
//! backoff here: the host decides when to wake it again.
//!
//! The outbox is never reconciled with the page-side queue. An anchor queued
//! in both places can be submitted twice.

use s4_client::{HttpRequest, Transport, TransportError};
use s4_core::{ContextMessage, QueueItem, offline::ANCHOR_ROUTE};
use s4_store::{Outbox, OutboxEntry};
use tokio::sync::{broadcast, mpsc};

use crate::{error::WorkerError, notify::Notifier};

/// Tag the host fires for one-shot background sync.
pub const DEFAULT_SYNC_TAG: &str = "s4-anchor-sync";

/// Tag the host fires for periodic background sync.
pub const DEFAULT_PERIODIC_TAG: &str = "s4-periodic-sync";

/// Title of the completion notification.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "S4 Ledger";

const MESSAGE_CAPACITY: usize = 16;

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// One-shot wake tag
    pub sync_tag: String,
    /// Periodic wake tag
    pub periodic_tag: String,
    /// Completion notification title
    pub notification_title: String,
    /// Per-item delivery endpoint
    pub anchor_route: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            sync_tag: DEFAULT_SYNC_TAG.to_string(),
            periodic_tag: DEFAULT_PERIODIC_TAG.to_string(),
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
            anchor_route: ANCHOR_ROUTE.to_string(),
        }
    }
}

/// Outcome of one wake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeReport {
    /// Entries the outbox held at wake
    pub attempted: usize,
    /// Entries delivered
    pub synced: usize,
    /// Entries left for the next wake
    pub failed: usize,
}

/// Drains the durable outbox on host wake-ups.
pub struct Coordinator<O: Outbox, T: Transport, N: Notifier> {
    outbox: O,
    transport: T,
    notifier: N,
    config: CoordinatorConfig,
    messages: broadcast::Sender<ContextMessage>,
}

impl<O: Outbox, T: Transport, N: Notifier> Coordinator<O, T, N> {
    /// Coordinator over `outbox`, delivering through `transport`.
    pub fn new(outbox: O, transport: T, notifier: N, config: CoordinatorConfig) -> Self {
        let (messages, _) = broadcast::channel(MESSAGE_CAPACITY);
        Self { outbox, transport, notifier, config, messages }
    }

    /// Receive messages meant for open UI contexts.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextMessage> {
        self.messages.subscribe()
    }

    /// The durable outbox.
    pub fn outbox(&self) -> &O {
        &self.outbox
    }

    /// Settings in use.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Accept an item handed over from a UI context.
    ///
    /// # Errors
    ///
    /// - `WorkerError::Storage` if the outbox write failed
    pub fn enqueue(&self, item: &QueueItem) -> Result<u64, WorkerError> {
        let id = self.outbox.push(item)?;
        tracing::debug!(id, hash = %item.hash, "anchor handed to background sync");
        Ok(id)
    }

    /// Handle a host wake for `tag`. Unknown tags do nothing.
    ///
    /// # Errors
    ///
    /// - `WorkerError::Storage` if the outbox could not be read
    pub async fn on_wake(&self, tag: &str) -> Result<WakeReport, WorkerError> {
        if tag != self.config.sync_tag && tag != self.config.periodic_tag {
            tracing::debug!(tag, "ignoring unknown wake tag");
            return Ok(WakeReport::default());
        }
        self.drain().await
    }

    /// Deliver every outbox entry individually.
    ///
    /// # Errors
    ///
    /// - `WorkerError::Storage` if the outbox could not be read
    pub async fn drain(&self) -> Result<WakeReport, WorkerError> {
        let entries = self.outbox.entries()?;
        let mut report = WakeReport { attempted: entries.len(), ..WakeReport::default() };

        for entry in &entries {
            match self.deliver(entry).await {
                Ok(()) => {
                    report.synced += 1;
                    if let Err(e) = self.outbox.delete(entry.id) {
                        // Delivered but still stored; it goes again next wake.
                        tracing::warn!(id = entry.id, error = %e, "failed to delete delivered anchor");
                    }
                },
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(id = entry.id, hash = %entry.item.hash, error = %e, "background anchor delivery failed");
                },
            }
        }

        if report.synced > 0 {
            self.announce(report.synced);
        }
        tracing::debug!(attempted = report.attempted, synced = report.synced, failed = report.failed, "wake complete");
        Ok(report)
    }

    /// Serve wake tags from `wakes` until the channel closes.
    pub async fn serve(&self, mut wakes: mpsc::Receiver<String>) {
        while let Some(tag) = wakes.recv().await {
            if let Err(e) = self.on_wake(&tag).await {
                tracing::warn!(tag = %tag, error = %e, "background sync wake failed");
            }
        }
    }

    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), TransportError> {
        let body = serde_json::to_value(entry).map_err(|e| TransportError::Decode(e.to_string()))?;
        let request = HttpRequest::post_json(&self.config.anchor_route, &body);
        self.transport.send(request).await?.error_for_status()?;
        Ok(())
    }

    fn announce(&self, synced: usize) {
        tracing::info!(synced, "background sync delivered anchors");
        self.notifier.notify(
            &self.config.notification_title,
            &format!("{synced} offline anchor(s) synced to the ledger"),
        );
        // No open UI contexts is fine.
        let _ = self.messages.send(ContextMessage::SyncComplete { synced });
    }
}

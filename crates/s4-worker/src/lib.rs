//! S4 Ledger background sync
//!
//! The [`Coordinator`] is the installable-worker side of offline anchoring.
//! It owns a durable [`Outbox`](s4_store::Outbox) separate from the page's
//! encrypted queue, wakes on host-scheduled tags, delivers each queued
//! anchor individually, and tells open UI contexts and the user when it made
//! progress.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod coordinator;
mod error;
mod notify;

pub use coordinator::{
    Coordinator, CoordinatorConfig, DEFAULT_NOTIFICATION_TITLE, DEFAULT_PERIODIC_TAG, DEFAULT_SYNC_TAG,
    WakeReport,
};
pub use error::WorkerError;
pub use notify::{LogNotifier, Notifier};

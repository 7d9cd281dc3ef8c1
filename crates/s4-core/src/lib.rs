//! S4 Ledger offline anchor queue - core
//!
//! Sans-IO building blocks shared by the page-side client and the background
//! coordinator. Nothing in this crate touches the network, storage, or the
//! system clock directly.
//!
//! # Components
//!
//! - [`QueueItem`]: one pending anchor submission
//! - [`SyncMachine`]: decides send / retry / stop for batch sync
//! - [`BackoffPolicy`]: exponential delay with jitter
//! - [`OfflineRoutes`]: which requests get synthetic offline behavior
//! - [`Environment`]: time, randomness, and sleeping behind a trait

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod env;
pub mod error;
pub mod item;
pub mod message;
pub mod offline;
pub mod sync;

pub use backoff::BackoffPolicy;
pub use env::Environment;
pub use error::SyncError;
pub use item::{DEFAULT_BRANCH, QueueCounts, QueueItem, UNKNOWN_HASH, pending_items};
pub use message::ContextMessage;
pub use offline::{AnchorCapture, OfflineRoutes, RouteKind};
pub use sync::{StatusLevel, SyncAction, SyncMachine, SyncPhase, SyncReport};

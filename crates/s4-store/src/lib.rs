//! S4 Ledger offline persistence
//!
//! Two independent stores, one per execution context:
//!
//! - [`QueueStore`]: the page-side queue, a whole-value read-modify-write
//!   over a string [`Storage`] namespace, encrypted at rest
//! - [`Outbox`]: the background coordinator's transactional store of pending
//!   anchors keyed by auto-incrementing id
//!
//! Both have an in-memory backend for tests and a Redb backend for
//! durability, and both implement [`AnchorQueue`], the shared interface for
//! handing anchors over and counting what is still pending.
//! [`ChaoticStorage`] wraps any [`Storage`] with random or targeted faults
//! so the queue's two-phase save can be interrupted between any two phases.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod anchors;
mod error;
pub mod outbox;
mod queue;
pub mod storage;

pub use anchors::AnchorQueue;
pub use error::StorageError;
pub use outbox::{MemoryOutbox, Outbox, OutboxEntry, RedbOutbox};
pub use queue::{QueueStore, SaveOutcome};
pub use storage::{
    ChaoticStorage, Fault, FaultOp, LAST_SYNC_KEY, MemoryStorage, QUEUE_ENCRYPTED_KEY, QUEUE_PLAIN_KEY,
    RedbStorage, SELECTED_TIER_KEY, Storage,
};

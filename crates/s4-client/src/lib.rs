//! S4 Ledger page-side offline client
//!
//! Keeps anchor submissions flowing through connectivity loss:
//!
//! ```text
//! UI request ──> OfflineFetch ──online──> Transport ──> server
//!                     │
//!                  offline, anchor route
//!                     ▼
//!               QueueStore (encrypted) <── OfflineQueue (queue hash, summary, prune)
//!                     │
//!                     ▼  connectivity restored / manual / periodic
//!               SyncService ──> SyncEngine ──batch POST──> /api/offline/sync
//! ```
//!
//! All I/O goes through the [`Transport`] trait and the
//! [`Environment`](s4_core::Environment) trait, so every component runs
//! against the harness's simulated server and clock in tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connectivity;
mod engine;
mod error;
mod http;
mod intercept;
mod queue;
mod reqwest_transport;
mod service;
mod system_env;

pub use connectivity::Connectivity;
pub use engine::{StatusNotice, SyncEngine};
pub use error::ClientError;
pub use http::{HttpRequest, HttpResponse, Method, Transport, TransportError};
pub use intercept::OfflineFetch;
pub use queue::{OfflineQueue, QueueOutcome, QueueSummary, RemoteQueueStatus};
pub use reqwest_transport::{HttpConfig, ReqwestTransport};
pub use service::{DEFAULT_PERIODIC_INTERVAL, DEFAULT_SETTLE_DELAY, SyncConfig, SyncHandle, SyncService};
pub use system_env::SystemEnv;

//! Deterministic simulation harness for the S4 Ledger offline anchor queue.
//!
//! - [`SimEnv`]: seeded RNG, tokio virtual time, recorded sleeps
//! - [`SimServer`]: scripted in-process server implementing the client
//!   `Transport`
//! - [`fixtures`]: key providers, stores and a wired [`PageStack`] for
//!   integration tests
//!
//! Use with `#[tokio::test(start_paused = true)]` so backoff delays elapse in
//! virtual time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod sim_env;
pub mod sim_server;

pub use fixtures::PageStack;
pub use sim_env::SimEnv;
pub use sim_server::{Reply, SimServer};

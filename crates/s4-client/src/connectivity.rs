//! Device connectivity as an observable value.
//!
//! Platform code reports online/offline transitions with
//! [`Connectivity::set_online`]; the interceptor reads the current value and
//! the sync service subscribes to transitions.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared online/offline flag. Clones observe the same value.
#[derive(Debug, Clone)]
pub struct Connectivity {
    state: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Flag starting at `online`.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self { state: Arc::new(state) }
    }

    /// Whether the device currently reports itself online.
    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Report a connectivity change. Subscribers wake only on actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.state.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            tracing::info!(online, "connectivity changed");
        }
    }

    /// Receiver that wakes on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

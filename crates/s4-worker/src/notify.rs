//! System-level notifications.

/// Raises a user-visible notification outside any UI context.
pub trait Notifier: Clone + Send + Sync + 'static {
    /// Show a notification with `title` and `body`.
    fn notify(&self, title: &str, body: &str);
}

/// Notifier that only logs. For hosts without a notification surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        tracing::info!(title, body, "notification");
    }
}

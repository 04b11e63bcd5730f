//! Outcome notifications.

use tracing::{info, warn};

/// Receives one message per finished mutation.
///
/// Implementations render the message (toast, terminal line, log entry) and
/// must not block.
pub trait NotificationSink: Send + Sync {
    /// A mutation succeeded.
    fn notify_success(&self, title: &str, message: &str);

    /// A mutation, or the refresh after it, failed.
    fn notify_failure(&self, title: &str, message: &str);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_success(&self, title: &str, message: &str) {
        info!(target: "customer_console::notify", title, "{message}");
    }

    fn notify_failure(&self, title: &str, message: &str) {
        warn!(target: "customer_console::notify", title, "{message}");
    }
}

//! Desktop notifications
//!
//! Toasts are fire-and-forget: failures are logged at debug and never
//! block or break a transfer. The whole surface disappears when the
//! `notifications` feature is off.

use super::{NotificationPort, NotificationStyle};

/// `notify-rust`-backed notifications
pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationPort for DesktopNotifier {
    fn show(&self, title: &str, body: &str, style: NotificationStyle) {
        #[cfg(feature = "notifications")]
        {
            let prefix = match style {
                NotificationStyle::Inbound => "\u{2913}",
                NotificationStyle::Outbound => "\u{2912}",
            };
            let result = notify_rust::Notification::new()
                .summary(&format!("{} {}", prefix, title))
                .body(body)
                .timeout(5000)
                .show();
            if let Err(e) = result {
                tracing::debug!("notification failed: {}", e);
            }
        }

        #[cfg(not(feature = "notifications"))]
        {
            let _ = (title, body, style);
        }
    }
}

/// Silent sink for headless runs and tests
pub struct NullNotifier;

impl NotificationPort for NullNotifier {
    fn show(&self, _title: &str, _body: &str, _style: NotificationStyle) {}
}

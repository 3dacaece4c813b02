//! Desktop notification integration.
//!
//! This module provides the notifications raised on each phase
//! transition ("Focus started", "Break time", "Back to focus"):
//!
//! - A [`Notifier`] trait the scheduler calls fire-and-forget
//! - [`DesktopNotifier`] backed by `notify-rust`
//! - [`MockNotifier`] for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use eyebreak::notification::{create_break_time_content, DesktopNotifier, Notifier};
//!
//! let notifier = DesktopNotifier::new();
//! if let Err(e) = notifier.notify(&create_break_time_content()) {
//!     eprintln!("notification failed: {}", e);
//! }
//! ```

mod content;
pub mod error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use notify_rust::Notification;
use tracing::debug;

pub use self::content::{
    create_back_to_focus_content, create_break_time_content, create_focus_started_content,
    format_minutes, sanitize_text, NotificationContent, NotificationContentBuilder,
};
pub use self::error::NotificationError;

/// Application name reported to the notification server.
const APP_NAME: &str = "Eye Break";

/// Trait for notification implementations.
pub trait Notifier {
    /// Shows a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification could not be delivered.
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError>;
}

// ============================================================================
// DesktopNotifier
// ============================================================================

/// Notifier that shows native desktop notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        if content.title.is_empty() {
            return Err(NotificationError::InvalidInput(
                "タイトルが空です".to_string(),
            ));
        }

        Notification::new()
            .appname(APP_NAME)
            .summary(&content.title)
            .body(&content.body)
            .show()
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        debug!(title = %content.title, "通知を送信しました");
        Ok(())
    }
}

// ============================================================================
// MockNotifier
// ============================================================================

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockNotifier {
    notifications: Mutex<Vec<NotificationContent>>,
    should_fail: AtomicBool,
}

impl MockNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn get_notifications(&self) -> Vec<NotificationContent> {
        self.notifications.lock().unwrap().clone()
    }

    /// Titles of every notification sent, in order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.get_notifications()
            .into_iter()
            .map(|content| content.title)
            .collect()
    }

    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn clear_recorded(&self) {
        self.notifications.lock().unwrap().clear();
    }
}

impl Notifier for MockNotifier {
    fn notify(&self, content: &NotificationContent) -> Result<(), NotificationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(NotificationError::SendFailed("Mock failure".to_string()));
        }
        self.notifications.lock().unwrap().push(content.clone());
        Ok(())
    }
}

//! Notification system error types.

use thiserror::Error;

/// Errors that can occur in the notification system.
///
/// Notifications are fire-and-forget: the scheduler logs these and never
/// lets them interrupt a phase transition.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Failed to send a notification.
    #[error("通知の送信に失敗しました: {0}")]
    SendFailed(String),

    /// Invalid input provided to the notification system.
    #[error("無効な入力: {0}")]
    InvalidInput(String),

    /// The notification service is not available.
    #[error("通知サービスが利用できません")]
    NotAvailable,
}

impl NotificationError {
    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "通知デーモンが起動しているか確認してください",
            Self::InvalidInput(_) => "入力値を確認してください",
            Self::NotAvailable => "デスクトップ通知を有効にしてください",
        }
    }
}

//! Break window error types.

use thiserror::Error;

/// Errors that can occur while driving the break window.
#[derive(Debug, Error)]
pub enum WindowError {
    /// The window could not be shown.
    #[error("休憩ウィンドウを表示できません: {0}")]
    OpenFailed(String),

    /// Writing to the window failed.
    #[error("休憩ウィンドウの更新に失敗しました: {0}")]
    Io(#[from] std::io::Error),
}

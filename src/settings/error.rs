//! Settings persistence error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving settings.
///
/// None of these are fatal: callers log them and continue with defaults
/// (load) or with the in-memory record (save).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("設定ファイルを読み込めません: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file could not be written.
    #[error("設定ファイルを書き込めません: {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("設定ファイルの形式が不正です: {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The settings record could not be serialized.
    #[error("設定のシリアライズに失敗しました: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No configuration directory could be determined.
    #[error("設定ディレクトリが見つかりません")]
    NoConfigDir,
}

impl SettingsError {
    /// Returns true if the stored record is unusable and defaults apply.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

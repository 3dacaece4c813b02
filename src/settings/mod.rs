//! Settings persistence for Eye Break.
//!
//! Settings are a single JSON record merged over the built-in defaults on
//! every load. Persistence is best-effort: a missing file means "use the
//! defaults", and an unreadable or corrupt file is reported as an error
//! the caller logs before falling back to defaults (see
//! [`load_or_default`]).

mod error;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, warn};

pub use error::SettingsError;

use crate::types::Settings;

/// Directory under the user config dir that holds the settings file.
const APP_DIR_NAME: &str = "eyebreak";

/// Settings file name.
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Trait for settings persistence implementations.
pub trait SettingsStore {
    /// Loads the stored record merged over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored record exists but cannot be read or
    /// parsed.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Persists the whole record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// Loads settings, logging any failure and returning the defaults instead.
pub fn load_or_default(store: &dyn SettingsStore) -> Settings {
    match store.load() {
        Ok(settings) => settings,
        Err(e) if e.is_corrupt() => {
            warn!(
                "設定ファイルが壊れています。既定値を使用します (次回の保存で上書きされます): {}",
                e
            );
            Settings::default()
        }
        Err(e) => {
            warn!("設定の読み込みに失敗しました。既定値を使用します: {}", e);
            Settings::default()
        }
    }
}

// ============================================================================
// JsonSettingsStore
// ============================================================================

/// File-backed settings store.
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Creates a store backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the platform default location.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::NoConfigDir` if no config directory exists.
    pub fn with_default_path() -> Result<Self, SettingsError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// Returns `<config_dir>/eyebreak/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::NoConfigDir` if no config directory exists.
    pub fn default_path() -> Result<PathBuf, SettingsError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Returns the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "設定ファイルがありません。既定値を使用します");
                return Ok(Settings::default());
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let value: Value =
            serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(Settings::from_value(&value))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(&settings.normalized())?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, json).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), "設定を保存しました");
        Ok(())
    }
}

// ============================================================================
// MockSettingsStore
// ============================================================================

/// In-memory settings store for testing.
#[derive(Debug)]
pub struct MockSettingsStore {
    record: Mutex<Value>,
    saved: Mutex<Vec<Settings>>,
    should_fail_load: AtomicBool,
    should_fail_save: AtomicBool,
}

impl Default for MockSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSettingsStore {
    /// Creates an empty store (loads yield the defaults).
    #[must_use]
    pub fn new() -> Self {
        Self {
            record: Mutex::new(Value::Object(serde_json::Map::new())),
            saved: Mutex::new(Vec::new()),
            should_fail_load: AtomicBool::new(false),
            should_fail_save: AtomicBool::new(false),
        }
    }

    /// Creates a store holding the given settings.
    #[must_use]
    pub fn with_settings(settings: &Settings) -> Self {
        let store = Self::new();
        store.set_record(Value::Object(settings.to_map()));
        store
    }

    /// Replaces the raw stored record.
    pub fn set_record(&self, record: Value) {
        *self.record.lock().unwrap() = record;
    }

    pub fn set_should_fail_load(&self, should_fail: bool) {
        self.should_fail_load.store(should_fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_save(&self, should_fail: bool) {
        self.should_fail_save.store(should_fail, Ordering::SeqCst);
    }

    /// Returns every record passed to `save`, in order.
    #[must_use]
    pub fn saved(&self) -> Vec<Settings> {
        self.saved.lock().unwrap().clone()
    }
}

impl SettingsStore for MockSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        if self.should_fail_load.load(Ordering::SeqCst) {
            return Err(SettingsError::Read {
                path: PathBuf::from("<mock>"),
                source: std::io::Error::other("Mock failure"),
            });
        }
        Ok(Settings::from_value(&self.record.lock().unwrap()))
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if self.should_fail_save.load(Ordering::SeqCst) {
            return Err(SettingsError::Write {
                path: PathBuf::from("<mock>"),
                source: std::io::Error::other("Mock failure"),
            });
        }
        self.saved.lock().unwrap().push(settings.clone());
        self.set_record(Value::Object(settings.to_map()));
        Ok(())
    }
}

//! Eye Break Library
//!
//! This library provides the core functionality for the Eye Break
//! focus/break reminder. It includes:
//! - Phase scheduler, beep sequencer and break countdown
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities
//! - Type definitions for settings and status
//! - Settings persistence
//! - Desktop notifications
//! - Tone synthesis and playback for break beeps
//! - Break window surface

pub mod cli;
pub mod daemon;
pub mod notification;
pub mod settings;
pub mod sound;
pub mod status;
pub mod types;
pub mod window;

// Re-export commonly used types for convenience
pub use types::{
    IpcRequest, IpcResponse, Phase, ResponseData, SchedulerStatus, Settings, Waveform,
};

// Re-export scheduler types
pub use daemon::{
    Clock, DaemonService, ManualClock, PhaseScheduler, SchedulerEvent, SchedulerState, Services,
    TokioClock,
};

// Re-export service traits and their implementations
pub use notification::{DesktopNotifier, MockNotifier, NotificationError, Notifier};
pub use settings::{JsonSettingsStore, MockSettingsStore, SettingsError, SettingsStore};
pub use sound::{MockTonePlayer, RodioTonePlayer, SilentTonePlayer, SoundError, Tone, TonePlayer};
pub use status::StatusReporter;
pub use window::{BreakWindow, MockBreakWindow, TerminalBreakWindow, WindowError};

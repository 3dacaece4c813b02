//! Core data types for Eye Break.
//!
//! This module defines the data structures used for:
//! - Scheduler phase and status
//! - User-tunable timing/audio settings with normalization
//! - IPC request/response serialization

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::status::StatusReporter;

// ============================================================================
// Phase
// ============================================================================

/// Represents the current phase of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing is scheduled
    Idle,
    /// Currently in a focus (work) interval
    Work,
    /// Currently in a break interval
    Break,
}

impl Phase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Work => "work",
            Phase::Break => "break",
        }
    }

    /// Returns the uppercase label shown in status displays.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "IDLE",
            Phase::Work => "WORK",
            Phase::Break => "BREAK",
        }
    }

    /// Returns true if a deadline is armed in this phase.
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Work | Phase::Break)
    }
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Idle
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Waveform
// ============================================================================

/// Oscillator shape used for break beeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// All supported waveforms.
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Sawtooth,
    ];

    /// Returns the string representation of the waveform.
    pub fn as_str(&self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        }
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Square
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Waveform::ALL
            .into_iter()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "波形は sine, square, triangle, sawtooth のいずれかを指定してください: {}",
                    s
                )
            })
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Default work interval in minutes
pub const DEFAULT_WORK_MINUTES: f64 = 20.0;
/// Default break interval in seconds
pub const DEFAULT_BREAK_SECONDS: f64 = 20.0;
/// Default master volume
pub const DEFAULT_VOLUME: f64 = 0.9;
/// Default number of pulses per beep cycle
pub const DEFAULT_BREAK_BEEP_COUNT: u32 = 10;
/// Default silence between pulses
pub const DEFAULT_BEEP_GAP_MS: u64 = 160;
/// Default pulse length
pub const DEFAULT_BEEP_DURATION_MS: u64 = 320;
/// Default pulse pitch
pub const DEFAULT_BEEP_FREQUENCY_HZ: f64 = 1500.0;

/// Longest accepted focus interval (one day).
pub const MAX_WORK_MINUTES: f64 = 1_440.0;
/// Longest accepted break interval (one hour).
pub const MAX_BREAK_SECONDS: f64 = 3_600.0;
/// Highest accepted pulse pitch.
pub const MAX_BEEP_FREQUENCY_HZ: f64 = 20_000.0;
/// Longest accepted silence between pulses (one minute).
pub const MAX_BEEP_GAP_MS: u64 = 60_000;
/// Longest accepted pulse.
pub const MAX_BEEP_DURATION_MS: u64 = 5_000;

// Stored keys, followed by the names older settings files used.
const WORK_MINUTES_KEYS: &[&str] = &["workMinutes", "workMin"];
const BREAK_SECONDS_KEYS: &[&str] = &["breakSeconds", "breakSec"];
const VOLUME_KEYS: &[&str] = &["volume"];
const BREAK_BEEP_COUNT_KEYS: &[&str] = &["breakBeepCount", "breakBeeps"];
const BEEP_GAP_KEYS: &[&str] = &["beepGapMs"];
const BEEP_DURATION_KEYS: &[&str] = &["beepDurationMs", "beepDurMs"];
const BEEP_FREQUENCY_KEYS: &[&str] = &["beepFrequencyHz", "beepFreq"];
const WAVEFORM_KEYS: &[&str] = &["waveform"];
const LOOP_BREAK_BEEPS_KEYS: &[&str] = &["loopBreakBeeps", "loopBreakBeep"];

/// User-tunable timing and audio settings.
///
/// This is the only persisted record. Values are replaced as a whole on
/// save; partial updates are applied as a shallow merge over the prior
/// record (see [`Settings::merged_with`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Focus interval in minutes (> 0)
    pub work_minutes: f64,
    /// Break interval in seconds (> 0)
    pub break_seconds: f64,
    /// Master volume (0.0-1.0)
    pub volume: f64,
    /// Pulses per beep cycle
    pub break_beep_count: u32,
    /// Silence between pulses in milliseconds
    pub beep_gap_ms: u64,
    /// Pulse length in milliseconds
    pub beep_duration_ms: u64,
    /// Pulse pitch in hertz (> 0)
    pub beep_frequency_hz: f64,
    /// Oscillator shape
    pub waveform: Waveform,
    /// Whether beep cycles repeat until the break ends
    pub loop_break_beeps: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            break_seconds: DEFAULT_BREAK_SECONDS,
            volume: DEFAULT_VOLUME,
            break_beep_count: DEFAULT_BREAK_BEEP_COUNT,
            beep_gap_ms: DEFAULT_BEEP_GAP_MS,
            beep_duration_ms: DEFAULT_BEEP_DURATION_MS,
            beep_frequency_hz: DEFAULT_BEEP_FREQUENCY_HZ,
            waveform: Waveform::Square,
            loop_break_beeps: true,
        }
    }
}

impl Settings {
    /// Builds settings from a stored JSON record merged over the defaults.
    ///
    /// Anything that is not a JSON object yields the defaults unchanged.
    pub fn from_value(value: &Value) -> Self {
        Self::default().merged_with_value(value)
    }

    /// Shallow-merges a JSON value over these settings.
    pub fn merged_with_value(&self, value: &Value) -> Self {
        match value.as_object() {
            Some(overrides) => self.merged_with(overrides),
            None => self.clone(),
        }
    }

    /// Shallow-merges an override record over these settings.
    ///
    /// Each field present in `overrides` with a valid value replaces the
    /// current one; missing, mistyped, or out-of-range values keep the
    /// current value.
    pub fn merged_with(&self, overrides: &Map<String, Value>) -> Self {
        let base = self.normalized();
        Self {
            work_minutes: positive_number(overrides, WORK_MINUTES_KEYS, MAX_WORK_MINUTES)
                .unwrap_or(base.work_minutes),
            break_seconds: positive_number(overrides, BREAK_SECONDS_KEYS, MAX_BREAK_SECONDS)
                .unwrap_or(base.break_seconds),
            volume: unit_interval(overrides, VOLUME_KEYS).unwrap_or(base.volume),
            break_beep_count: whole_number(overrides, BREAK_BEEP_COUNT_KEYS, u64::from(u32::MAX))
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(base.break_beep_count),
            beep_gap_ms: whole_number(overrides, BEEP_GAP_KEYS, MAX_BEEP_GAP_MS)
                .unwrap_or(base.beep_gap_ms),
            beep_duration_ms: whole_number(overrides, BEEP_DURATION_KEYS, MAX_BEEP_DURATION_MS)
                .unwrap_or(base.beep_duration_ms),
            beep_frequency_hz: positive_number(overrides, BEEP_FREQUENCY_KEYS, MAX_BEEP_FREQUENCY_HZ)
                .unwrap_or(base.beep_frequency_hz),
            waveform: lookup(overrides, WAVEFORM_KEYS)
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(base.waveform),
            loop_break_beeps: lookup(overrides, LOOP_BREAK_BEEPS_KEYS)
                .and_then(Value::as_bool)
                .unwrap_or(base.loop_break_beeps),
        }
    }

    /// Replaces every invalid field with its default.
    pub fn normalized(&self) -> Self {
        let defaults = Self::default();
        let positive = |v: f64, max: f64, d: f64| {
            if v.is_finite() && v > 0.0 && v <= max {
                v
            } else {
                d
            }
        };
        Self {
            work_minutes: positive(self.work_minutes, MAX_WORK_MINUTES, defaults.work_minutes),
            break_seconds: positive(self.break_seconds, MAX_BREAK_SECONDS, defaults.break_seconds),
            volume: if self.volume.is_finite() && (0.0..=1.0).contains(&self.volume) {
                self.volume
            } else {
                defaults.volume
            },
            break_beep_count: self.break_beep_count,
            beep_gap_ms: if self.beep_gap_ms <= MAX_BEEP_GAP_MS {
                self.beep_gap_ms
            } else {
                defaults.beep_gap_ms
            },
            beep_duration_ms: if self.beep_duration_ms <= MAX_BEEP_DURATION_MS {
                self.beep_duration_ms
            } else {
                defaults.beep_duration_ms
            },
            beep_frequency_hz: positive(
                self.beep_frequency_hz,
                MAX_BEEP_FREQUENCY_HZ,
                defaults.beep_frequency_hz,
            ),
            waveform: self.waveform,
            loop_break_beeps: self.loop_break_beeps,
        }
    }

    /// Returns the settings as a JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Length of the focus interval in milliseconds.
    pub fn work_duration_ms(&self) -> u64 {
        ((self.work_minutes * 60_000.0).round() as u64).max(1)
    }

    /// Length of the break interval in milliseconds.
    pub fn break_duration_ms(&self) -> u64 {
        ((self.break_seconds * 1_000.0).round() as u64).max(1)
    }

    /// Number of whole seconds the break countdown displays.
    pub fn break_countdown_seconds(&self) -> u32 {
        self.break_seconds.ceil().max(1.0) as u32
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| map.get(*key))
}

fn positive_number(map: &Map<String, Value>, keys: &[&str], max: f64) -> Option<f64> {
    lookup(map, keys)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0 && *v <= max)
}

fn unit_interval(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    lookup(map, keys)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
}

fn whole_number(map: &Map<String, Value>, keys: &[&str], max: u64) -> Option<u64> {
    let value = lookup(map, keys)?;
    if let Some(n) = value.as_u64() {
        return (n <= max).then_some(n);
    }
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0 && *v <= max as f64)
        .map(|v| v as u64)
}

// ============================================================================
// SchedulerStatus
// ============================================================================

/// Point-in-time view of the scheduler, safe to poll at any frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    /// Current phase
    pub phase: Phase,
    /// Milliseconds until the current deadline (0 when idle)
    pub remaining_ms: u64,
}

impl SchedulerStatus {
    /// Remaining time rounded up to whole seconds.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum IpcRequest {
    /// Start (or restart) the focus cycle
    Start,
    /// Stop the cycle and return to idle
    Pause,
    /// Stop the beeps of the current break without ending it
    Silence,
    /// Query the current status
    Status,
    /// Load the current settings
    Settings,
    /// Shallow-merge a settings patch and persist it
    SaveSettings {
        /// Fields to replace
        settings: Map<String, Value>,
    },
    /// Stop the cycle and shut the daemon down
    Quit,
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseData {
    /// Current phase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// Remaining milliseconds
    #[serde(rename = "remainingMs", skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
    /// Remaining whole seconds (rounded up)
    #[serde(rename = "remainingSeconds", skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    /// Formatted status line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    /// Current settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl ResponseData {
    /// Creates response data from a scheduler status.
    pub fn from_status(status: &SchedulerStatus) -> Self {
        Self {
            phase: Some(status.phase.as_str().to_string()),
            remaining_ms: Some(status.remaining_ms),
            remaining_seconds: Some(status.remaining_seconds()),
            display: Some(StatusReporter::tooltip(status)),
            settings: None,
        }
    }

    /// Creates response data carrying a settings record.
    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true if this is an error response.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// ============================================================================
// Tests
// ============================================================================

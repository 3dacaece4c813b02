//! Status display for the tray tooltip and the CLI.
//!
//! This module handles:
//! - Deriving remaining time from a deadline
//! - Formatting remaining time as `MM:SS`
//! - Generating the one-line status text (e.g., "Eye Break: WORK • 19:59")
//!
//! Everything here is a pure function of a [`SchedulerStatus`]; nothing is
//! cached between polls.

use crate::types::{Phase, SchedulerStatus};

// ============================================================================
// Constants
// ============================================================================

/// Application name shown in the status line
const APP_NAME: &str = "Eye Break";

/// Placeholder shown when nothing remains
const EMPTY_TIME: &str = "--:--";

/// Recommended poll interval for status displays
pub const STATUS_POLL_INTERVAL_MS: u64 = 1000;

// ============================================================================
// StatusReporter
// ============================================================================

/// Derives display text from scheduler status.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusReporter;

impl StatusReporter {
    /// Milliseconds left until `deadline_ms`, clamped at zero.
    pub fn remaining_ms(deadline_ms: u64, now_ms: u64) -> u64 {
        deadline_ms.saturating_sub(now_ms)
    }

    /// Formats milliseconds as `MM:SS`, rounding up to whole seconds.
    ///
    /// Minutes are not wrapped at an hour, so 90 minutes reads "90:00".
    pub fn format_remaining(remaining_ms: u64) -> String {
        Self::format_seconds(remaining_ms.div_ceil(1000))
    }

    /// Formats whole seconds as `MM:SS`.
    pub fn format_seconds(total_seconds: u64) -> String {
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }

    /// Returns the uppercase label for the phase.
    pub fn phase_label(phase: Phase) -> &'static str {
        phase.label()
    }

    /// Generates the tooltip line.
    ///
    /// Format: "Eye Break: WORK • 19:59", with "--:--" when no time remains.
    pub fn tooltip(status: &SchedulerStatus) -> String {
        let time = if status.remaining_ms == 0 {
            EMPTY_TIME.to_string()
        } else {
            Self::format_remaining(status.remaining_ms)
        };
        format!("{}: {} • {}", APP_NAME, Self::phase_label(status.phase), time)
    }
}

// ============================================================================
// Tests
// ============================================================================

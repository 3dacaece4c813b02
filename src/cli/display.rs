//! Display utilities for the Eye Break CLI.
//!
//! This module provides formatted output for:
//! - Start / pause confirmations
//! - The status line
//! - The settings listing
//! - Error messages

use crate::status::StatusReporter;
use crate::types::{IpcResponse, ResponseData, Settings};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows a success message for start.
    pub fn show_start_success(response: &IpcResponse) {
        println!("* 集中を開始しました");
        if let Some(line) = response.data.as_ref().and_then(Self::remaining_line) {
            println!("  次の休憩まで: {}", line);
        }
    }

    /// Shows a success message for pause.
    pub fn show_pause_success(_response: &IpcResponse) {
        println!("|| 一時停止しました");
    }

    /// Shows the result of a silence request.
    pub fn show_silence_success(response: &IpcResponse) {
        println!("-- {}", response.message);
    }

    /// Shows a success message for quit.
    pub fn show_quit_success() {
        println!("[] デーモンを終了しました");
    }

    /// Shows the current status line.
    pub fn show_status(response: &IpcResponse) {
        println!("{}", Self::format_status(response));
    }

    /// Shows the settings listing.
    pub fn show_settings(settings: &Settings) {
        println!("{}", Self::format_settings(settings));
    }

    /// Shows a success message for a settings change.
    pub fn show_settings_saved(settings: &Settings) {
        println!("* 設定を保存しました");
        println!("{}", Self::format_settings(settings));
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Returns the status line carried by a status response.
    pub fn format_status(response: &IpcResponse) -> String {
        response
            .data
            .as_ref()
            .and_then(|data| data.display.clone())
            .unwrap_or_else(|| "Eye Break: 状態を取得できませんでした".to_string())
    }

    /// Formats every setting on its own line.
    pub fn format_settings(settings: &Settings) -> String {
        let rows = [
            ("作業時間", format!("{} 分", settings.work_minutes)),
            ("休憩時間", format!("{} 秒", settings.break_seconds)),
            ("音量", format!("{}", settings.volume)),
            ("ビープ回数", format!("{}", settings.break_beep_count)),
            ("ビープ間隔", format!("{} ms", settings.beep_gap_ms)),
            ("ビープ長", format!("{} ms", settings.beep_duration_ms)),
            ("周波数", format!("{} Hz", settings.beep_frequency_hz)),
            ("波形", settings.waveform.to_string()),
            (
                "ビープを繰り返す",
                if settings.loop_break_beeps { "はい" } else { "いいえ" }.to_string(),
            ),
        ];

        let mut out = String::from("Eye Break 設定\n─────────────────────────────");
        for (label, value) in rows {
            out.push_str(&format!("\n{}: {}", label, value));
        }
        out
    }

    fn remaining_line(data: &ResponseData) -> Option<String> {
        data.remaining_ms
            .filter(|ms| *ms > 0)
            .map(StatusReporter::format_remaining)
    }
}

// ============================================================================
// Tests
// ============================================================================

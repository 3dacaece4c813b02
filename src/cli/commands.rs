//! Command definitions for the Eye Break CLI.
//!
//! Uses clap derive macro for argument parsing.

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

use crate::types::{
    Waveform, MAX_BEEP_DURATION_MS, MAX_BEEP_FREQUENCY_HZ, MAX_BEEP_GAP_MS, MAX_BREAK_SECONDS,
    MAX_WORK_MINUTES,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Eye Break CLI - periodic focus/break reminder
#[derive(Parser, Debug)]
#[command(
    name = "eyebreak",
    version,
    about = "目を休めるための休憩リマインダー",
    long_about = "一定時間の集中のあとに短い休憩を促します。\n\
                  休憩中はカウントダウンとビープ音で20フィート先を見るよう知らせます。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the scheduler daemon in the foreground
    Daemon(DaemonArgs),

    /// Start (or restart) the focus cycle
    Start,

    /// Pause the cycle
    Pause,

    /// Stop the beeps without ending the break
    Silence,

    /// Show the current phase and remaining time
    Status {
        /// Keep polling every second
        #[arg(short, long)]
        watch: bool,
    },

    /// Show or change settings
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },

    /// Stop the daemon
    Quit,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Disable beep audio
    #[arg(long)]
    pub mute: bool,

    /// Start the focus cycle immediately
    #[arg(long)]
    pub start: bool,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Change one or more settings
    Set(SettingsPatchArgs),
}

// ============================================================================
// Settings Arguments
// ============================================================================

/// Fields that can be changed with `settings set`
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsPatchArgs {
    /// Work duration in minutes (up to 1440)
    #[arg(long, value_parser = work_minutes)]
    pub work_minutes: Option<f64>,

    /// Break duration in seconds (up to 3600)
    #[arg(long, value_parser = break_seconds)]
    pub break_seconds: Option<f64>,

    /// Beep volume (0.0-1.0)
    #[arg(long, value_parser = unit_interval)]
    pub volume: Option<f64>,

    /// Beeps per cycle
    #[arg(long)]
    pub break_beep_count: Option<u32>,

    /// Silence between beeps in milliseconds (up to 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_BEEP_GAP_MS))]
    pub beep_gap_ms: Option<u64>,

    /// Beep length in milliseconds (up to 5000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(..=MAX_BEEP_DURATION_MS))]
    pub beep_duration_ms: Option<u64>,

    /// Beep pitch in Hz (up to 20000)
    #[arg(long, value_parser = beep_frequency_hz)]
    pub beep_frequency_hz: Option<f64>,

    /// Beep waveform (sine, square, triangle, sawtooth)
    #[arg(long)]
    pub waveform: Option<Waveform>,

    /// Repeat beep cycles until the break ends
    #[arg(long)]
    pub loop_break_beeps: Option<bool>,
}

impl SettingsPatchArgs {
    /// Converts the given flags into a settings patch (camelCase keys).
    pub fn to_patch(&self) -> Map<String, Value> {
        let mut patch = Map::new();
        let mut put = |key: &str, value: Option<Value>| {
            if let Some(value) = value {
                patch.insert(key.to_string(), value);
            }
        };

        put("workMinutes", self.work_minutes.map(Value::from));
        put("breakSeconds", self.break_seconds.map(Value::from));
        put("volume", self.volume.map(Value::from));
        put("breakBeepCount", self.break_beep_count.map(Value::from));
        put("beepGapMs", self.beep_gap_ms.map(Value::from));
        put("beepDurationMs", self.beep_duration_ms.map(Value::from));
        put("beepFrequencyHz", self.beep_frequency_hz.map(Value::from));
        put("waveform", self.waveform.map(|w| Value::from(w.as_str())));
        put("loopBreakBeeps", self.loop_break_beeps.map(Value::from));
        patch
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

fn work_minutes(s: &str) -> Result<f64, String> {
    positive_number(s, MAX_WORK_MINUTES)
}

fn break_seconds(s: &str) -> Result<f64, String> {
    positive_number(s, MAX_BREAK_SECONDS)
}

fn beep_frequency_hz(s: &str) -> Result<f64, String> {
    positive_number(s, MAX_BEEP_FREQUENCY_HZ)
}

/// Validates a finite number in `(0, max]`.
fn positive_number(s: &str, max: f64) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("数値を指定してください: {}", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("0より大きい値を指定してください".to_string());
    }
    if value > max {
        return Err(format!("{}以下の値を指定してください", max));
    }
    Ok(value)
}

/// Validates a number in 0.0..=1.0.
fn unit_interval(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("数値を指定してください: {}", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err("0.0から1.0の範囲で指定してください".to_string());
    }
    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["eyebreak"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["eyebreak", "-v", "status"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_simple_commands() {
            assert!(matches!(
                Cli::parse_from(["eyebreak", "start"]).command,
                Some(Commands::Start)
            ));
            assert!(matches!(
                Cli::parse_from(["eyebreak", "pause"]).command,
                Some(Commands::Pause)
            ));
            assert!(matches!(
                Cli::parse_from(["eyebreak", "silence"]).command,
                Some(Commands::Silence)
            ));
            assert!(matches!(
                Cli::parse_from(["eyebreak", "quit"]).command,
                Some(Commands::Quit)
            ));
        }

        #[test]
        fn test_parse_status_watch() {
            let cli = Cli::parse_from(["eyebreak", "status", "--watch"]);
            assert!(matches!(cli.command, Some(Commands::Status { watch: true })));

            let cli = Cli::parse_from(["eyebreak", "status"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Status { watch: false })
            ));
        }

        #[test]
        fn test_parse_daemon_flags() {
            let cli = Cli::parse_from(["eyebreak", "daemon", "--mute", "--start"]);
            match cli.command {
                Some(Commands::Daemon(args)) => {
                    assert!(args.mute);
                    assert!(args.start);
                }
                _ => panic!("Expected Daemon command"),
            }
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["eyebreak", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }

        #[test]
        fn test_unknown_command_fails() {
            assert!(Cli::try_parse_from(["eyebreak", "resume"]).is_err());
        }
    }

    // ------------------------------------------------------------------------
    // Settings Tests
    // ------------------------------------------------------------------------

    mod settings_tests {
        use super::*;

        fn parse_patch(args: &[&str]) -> SettingsPatchArgs {
            let mut argv = vec!["eyebreak", "settings", "set"];
            argv.extend_from_slice(args);
            match Cli::parse_from(argv).command {
                Some(Commands::Settings {
                    action: Some(SettingsAction::Set(patch)),
                }) => patch,
                other => panic!("Expected settings set, got {:?}", other),
            }
        }

        #[test]
        fn test_settings_show() {
            let cli = Cli::parse_from(["eyebreak", "settings"]);
            assert!(matches!(
                cli.command,
                Some(Commands::Settings { action: None })
            ));
        }

        #[test]
        fn test_settings_set_builds_patch() {
            let patch = parse_patch(&[
                "--work-minutes",
                "25",
                "--waveform",
                "Sine",
                "--loop-break-beeps",
                "true",
            ])
            .to_patch();

            assert_eq!(patch.len(), 3);
            assert_eq!(patch["workMinutes"], Value::from(25.0));
            assert_eq!(patch["waveform"], Value::from("sine"));
            assert_eq!(patch["loopBreakBeeps"], Value::from(true));
        }

        #[test]
        fn test_settings_set_empty_patch() {
            assert!(parse_patch(&[]).to_patch().is_empty());
        }

        #[test]
        fn test_settings_set_rejects_invalid_values() {
            for args in [
                ["--work-minutes", "0"],
                ["--break-seconds", "-5"],
                ["--volume", "1.5"],
                ["--waveform", "noise"],
                ["--break-beep-count", "-1"],
                ["--work-minutes", "1e15"],
                ["--break-seconds", "3601"],
                ["--beep-duration-ms", "3600000"],
                ["--beep-gap-ms", "60001"],
                ["--beep-frequency-hz", "1e9"],
            ] {
                let mut argv = vec!["eyebreak", "settings", "set"];
                argv.extend_from_slice(&args);
                assert!(Cli::try_parse_from(argv).is_err(), "{:?}", args);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Validation Tests
    // ------------------------------------------------------------------------

    mod validation_tests {
        use super::*;

        #[test]
        fn test_positive_number() {
            assert_eq!(positive_number("0.5", 10.0), Ok(0.5));
            assert_eq!(positive_number("10", 10.0), Ok(10.0));
            assert!(positive_number("0", 10.0).is_err());
            assert!(positive_number("10.5", 10.0).is_err());
            assert!(positive_number("abc", 10.0).is_err());
            assert!(positive_number("inf", 10.0).is_err());
        }

        #[test]
        fn test_interval_limits() {
            assert_eq!(work_minutes("1440"), Ok(1440.0));
            assert!(work_minutes("1e15").is_err());
            assert_eq!(break_seconds("3600"), Ok(3600.0));
            assert!(break_seconds("3600.5").is_err());
            assert!(beep_frequency_hz("20001").is_err());
        }

        #[test]
        fn test_unit_interval() {
            assert_eq!(unit_interval("0"), Ok(0.0));
            assert_eq!(unit_interval("1"), Ok(1.0));
            assert!(unit_interval("-0.1").is_err());
            assert!(unit_interval("NaN").is_err());
        }
    }
}

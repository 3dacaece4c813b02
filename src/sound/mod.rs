//! Tone playback for Eye Break break beeps.
//!
//! This module provides audio pulse capabilities, including:
//!
//! - Tone synthesis with four waveforms and a click-free envelope
//! - Non-blocking playback through rodio
//! - Immediate silencing of pulses still sounding
//! - Graceful degradation when audio is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │   TonePlayer     │ ← Main interface (used by the beep sequencer)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐     ┌──────────────────┐
//! │ RodioTonePlayer  │────▶│ ToneCache        │
//! │                  │     │ (Tone::render,   │
//! │                  │     │  once per tone)  │
//! └──────────────────┘     └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use eyebreak::sound::{RodioTonePlayer, Tone, TonePlayer};
//! use eyebreak::types::Settings;
//!
//! let player = RodioTonePlayer::new().expect("audio init");
//! let tone = Tone::from_settings(&Settings::default());
//! player.play(&tone).expect("playback failed");
//! ```

mod error;
mod player;
mod tone;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub use error::SoundError;
pub use player::{try_create_player, RodioTonePlayer};
pub use tone::{
    oscillator, Tone, ToneCache, ATTACK_MS, RELEASE_MS, SAMPLE_RATE, STOP_AFTER_MS,
};

/// Trait for tone playback implementations.
///
/// This trait abstracts pulse playback, allowing for different
/// implementations (e.g., rodio-based, silent, mock for testing).
pub trait TonePlayer {
    /// Starts a single pulse.
    ///
    /// This method should be non-blocking; the pulse plays in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play(&self, tone: &Tone) -> Result<(), SoundError>;

    /// Stops every pulse still sounding.
    fn silence(&self);
}

impl TonePlayer for RodioTonePlayer {
    fn play(&self, tone: &Tone) -> Result<(), SoundError> {
        RodioTonePlayer::play(self, tone)
    }

    fn silence(&self) {
        RodioTonePlayer::silence(self)
    }
}

/// Player used when audio is muted or unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentTonePlayer;

impl TonePlayer for SilentTonePlayer {
    fn play(&self, _tone: &Tone) -> Result<(), SoundError> {
        Ok(())
    }

    fn silence(&self) {}
}

/// Mock tone player for testing.
#[derive(Debug, Default)]
pub struct MockTonePlayer {
    play_calls: Mutex<Vec<Tone>>,
    attempts: AtomicUsize,
    silence_calls: AtomicUsize,
    should_fail: AtomicBool,
}

impl MockTonePlayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of pulses played successfully.
    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().unwrap().len()
    }

    /// Number of `play` calls, including failed ones.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn silence_count(&self) -> usize {
        self.silence_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<Tone> {
        self.play_calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.play_calls.lock().unwrap().clear();
        self.attempts.store(0, Ordering::SeqCst);
        self.silence_calls.store(0, Ordering::SeqCst);
    }
}

impl TonePlayer for MockTonePlayer {
    fn play(&self, tone: &Tone) -> Result<(), SoundError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        self.play_calls.lock().unwrap().push(*tone);
        Ok(())
    }

    fn silence(&self) {
        self.silence_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Waveform;

    fn tone() -> Tone {
        Tone {
            frequency_hz: 880.0,
            duration_ms: 100,
            waveform: Waveform::Triangle,
            volume: 0.5,
        }
    }

    #[test]
    fn test_mock_records_plays() {
        let mock = MockTonePlayer::new();
        mock.play(&tone()).unwrap();
        mock.play(&tone()).unwrap();

        assert_eq!(mock.play_count(), 2);
        assert_eq!(mock.attempt_count(), 2);
        assert_eq!(mock.get_play_calls()[0], tone());
    }

    #[test]
    fn test_mock_failure_counts_attempts() {
        let mock = MockTonePlayer::new();
        mock.set_should_fail(true);

        assert!(mock.play(&tone()).is_err());
        assert_eq!(mock.play_count(), 0);
        assert_eq!(mock.attempt_count(), 1);
    }

    #[test]
    fn test_mock_silence_and_clear() {
        let mock = MockTonePlayer::new();
        mock.play(&tone()).unwrap();
        mock.silence();
        assert_eq!(mock.silence_count(), 1);

        mock.clear_calls();
        assert_eq!(mock.play_count(), 0);
        assert_eq!(mock.silence_count(), 0);
    }

    #[test]
    fn test_silent_player() {
        let player = SilentTonePlayer;
        assert!(player.play(&tone()).is_ok());
        player.silence();
    }
}

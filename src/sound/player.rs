//! Tone player implementation using rodio.
//!
//! This module provides the `RodioTonePlayer` which renders pulses through a
//! [`ToneCache`] and plays them through a rodio v0.20 output stream.

use std::sync::{Mutex, MutexGuard};

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::{debug, warn};

use super::error::SoundError;
use super::tone::{Tone, ToneCache, SAMPLE_RATE};

/// A tone player that uses rodio for audio playback.
///
/// Playback is non-blocking; each pulse gets its own sink so that
/// [`RodioTonePlayer::silence`] can stop everything still sounding.
pub struct RodioTonePlayer {
    /// The audio output stream (must be kept alive for playback).
    _stream: OutputStream,
    /// Handle to the output stream for creating sinks.
    stream_handle: OutputStreamHandle,
    /// Sinks that may still be playing.
    sinks: Mutex<Vec<Sink>>,
    /// Samples of the last pulse played.
    cache: Mutex<ToneCache>,
}

impl RodioTonePlayer {
    /// Creates a new tone player on the default output device.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new() -> Result<Self, SoundError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SoundError::DeviceNotAvailable(e.to_string()))?;

        debug!("Audio output stream initialized");

        Ok(Self {
            _stream: stream,
            stream_handle,
            sinks: Mutex::new(Vec::new()),
            cache: Mutex::new(ToneCache::new()),
        })
    }

    /// Plays a single pulse.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::StreamError` if no sink can be created.
    pub fn play(&self, tone: &Tone) -> Result<(), SoundError> {
        let samples = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .samples(tone);
        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| SoundError::StreamError(e.to_string()))?;

        sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec()));

        let mut sinks = self.lock_sinks();
        sinks.retain(|s| !s.empty());
        sinks.push(sink);

        debug!(
            frequency_hz = tone.frequency_hz,
            duration_ms = tone.duration_ms,
            "Tone playback started"
        );
        Ok(())
    }

    /// Stops every pulse that is still sounding.
    pub fn silence(&self) {
        let mut sinks = self.lock_sinks();
        for sink in sinks.drain(..) {
            sink.stop();
        }
    }

    fn lock_sinks(&self) -> MutexGuard<'_, Vec<Sink>> {
        self.sinks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for RodioTonePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioTonePlayer")
            .field("active_sinks", &self.lock_sinks().len())
            .finish_non_exhaustive()
    }
}

/// Creates a tone player, returning None if audio is unavailable.
///
/// If audio initialization fails, a warning is logged and None is returned.
#[must_use]
pub fn try_create_player() -> Option<RodioTonePlayer> {
    match RodioTonePlayer::new() {
        Ok(player) => Some(player),
        Err(e) => {
            warn!(
                "オーディオが利用できないためビープを無効にします: {} ({})",
                e,
                e.suggestion()
            );
            None
        }
    }
}

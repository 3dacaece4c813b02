//! Tone synthesis for break beeps.
//!
//! A pulse is a single oscillator note shaped by an exponential
//! attack/release envelope so it starts and ends without audible clicks:
//!
//! ```text
//! gain
//!  1 ┤    ┌───────────────┐
//!    │   ╱                 ╲
//!  0 ┼──┘                   └───────
//!    0  20ms            duration  +50ms  +80ms (stop)
//! ```

use std::f64::consts::TAU;
use std::sync::Arc;

use crate::types::{Settings, Waveform};

/// Time for the gain to rise from the floor to the target volume.
pub const ATTACK_MS: u64 = 20;

/// Time for the gain to fall back to the floor after the pulse body.
pub const RELEASE_MS: u64 = 50;

/// The oscillator stops this long after the pulse body ends.
pub const STOP_AFTER_MS: u64 = 80;

/// Output sample rate for rendered pulses.
pub const SAMPLE_RATE: u32 = 44_100;

/// Relative gain treated as silence by the exponential ramps.
const GAIN_FLOOR: f64 = 0.0001;

/// A single audible pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Pitch in hertz
    pub frequency_hz: f64,
    /// Length of the pulse body in milliseconds
    pub duration_ms: u64,
    /// Oscillator shape
    pub waveform: Waveform,
    /// Peak gain (0.0-1.0)
    pub volume: f64,
}

impl Tone {
    /// Builds the pulse described by the beep settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            frequency_hz: settings.beep_frequency_hz,
            duration_ms: settings.beep_duration_ms,
            waveform: settings.waveform,
            volume: settings.volume,
        }
    }

    /// Total time the oscillator runs, including the release tail.
    pub fn total_ms(&self) -> u64 {
        self.duration_ms + STOP_AFTER_MS
    }

    /// Envelope gain at `t_ms` after the pulse starts, relative to `volume`.
    pub fn envelope(&self, t_ms: f64) -> f64 {
        let duration = self.duration_ms as f64;
        if t_ms < 0.0 || t_ms >= self.total_ms() as f64 {
            return 0.0;
        }
        if t_ms <= duration {
            return attack_level(t_ms);
        }

        let released = (t_ms - duration) / RELEASE_MS as f64;
        if released >= 1.0 {
            return 0.0;
        }
        let start = attack_level(duration);
        start * (GAIN_FLOOR / start).powf(released)
    }

    /// Renders the pulse as mono `f32` samples at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = f64::from(sample_rate);
        let len = (self.total_ms() as f64 * rate / 1000.0).round() as usize;
        let volume = self.volume.clamp(0.0, 1.0);

        (0..len)
            .map(|i| {
                let t = i as f64 / rate;
                let phase = (t * self.frequency_hz).fract();
                let gain = self.envelope(t * 1000.0) * volume;
                (oscillator(self.waveform, phase) * gain) as f32
            })
            .collect()
    }
}

/// Samples of the most recently rendered pulse.
///
/// Every pulse of a beep run is the same tone, so it is rendered once and
/// reused until the tone changes.
#[derive(Debug, Default)]
pub struct ToneCache {
    entry: Option<(Tone, Arc<[f32]>)>,
    renders: usize,
}

impl ToneCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the samples for `tone`, rendering them only on a miss.
    pub fn samples(&mut self, tone: &Tone) -> Arc<[f32]> {
        if let Some((cached, samples)) = &self.entry {
            if cached == tone {
                return Arc::clone(samples);
            }
        }

        let samples: Arc<[f32]> = tone.render(SAMPLE_RATE).into();
        self.renders += 1;
        self.entry = Some((*tone, Arc::clone(&samples)));
        samples
    }

    /// Number of renders performed so far.
    pub fn render_count(&self) -> usize {
        self.renders
    }
}

/// Exponential ramp from the floor to full gain over the attack.
fn attack_level(t_ms: f64) -> f64 {
    let progress = (t_ms / ATTACK_MS as f64).clamp(0.0, 1.0);
    GAIN_FLOOR * (1.0 / GAIN_FLOOR).powf(progress)
}

/// Evaluates one cycle of the waveform at `phase` in `[0, 1)`.
pub fn oscillator(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

//! Beep sequencer for break alerts.
//!
//! A beep run plays `count` pulses spaced `duration + gap` apart. Looping
//! runs start the next cycle once the last pulse has finished sounding,
//! and keep going until cancelled. Pulse timing parameters are copied when
//! the run starts, so a settings change never alters a run in flight.
//!
//! The sequencer never sleeps; it schedules the next pulse on the
//! [`Clock`] and waits for the owner to hand the wakeup back.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::daemon::clock::{Clock, TimerToken, Wakeup};
use crate::sound::{Tone, TonePlayer};
use crate::types::Settings;

/// Minimum silence between the last pulse of a cycle and the next cycle.
pub const LOOP_RESTART_MIN_GAP_MS: u64 = 200;

// ============================================================================
// BeepRunId / BeepParams / BeepStep
// ============================================================================

/// Opaque token identifying one beep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BeepRunId(Uuid);

impl BeepRunId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BeepRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timing and sound parameters for a run, fixed at run start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeepParams {
    /// Pulses per cycle
    pub count: u32,
    /// Silence between pulses in milliseconds
    pub gap_ms: u64,
    /// The pulse itself
    pub tone: Tone,
    /// Whether cycles repeat until cancelled
    pub looping: bool,
}

impl BeepParams {
    /// Copies the beep-related fields out of the settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            count: settings.break_beep_count,
            gap_ms: settings.beep_gap_ms,
            tone: Tone::from_settings(settings),
            looping: settings.loop_break_beeps,
        }
    }

    /// Time from one pulse start to the next within a cycle.
    pub fn pulse_interval_ms(&self) -> u64 {
        self.tone.duration_ms + self.gap_ms
    }

    /// Time from the last pulse of a cycle to the first pulse of the next.
    ///
    /// The gap is measured from the end of the last pulse and is never
    /// shorter than [`LOOP_RESTART_MIN_GAP_MS`], so cycles do not overlap.
    pub fn loop_restart_ms(&self) -> u64 {
        self.tone.duration_ms + self.gap_ms.max(LOOP_RESTART_MIN_GAP_MS)
    }
}

/// Outcome of starting a run or handling one of its wakeups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeepStep {
    /// A pulse played (1-based index within the cycle); more follow
    Pulsed { index: u32 },
    /// A looping cycle finished; the next one is scheduled
    CycleCompleted { cycles: u32 },
    /// The run is over
    Finished { cycles: u32 },
    /// The wakeup belonged to a cancelled or superseded run
    Ignored,
}

struct BeepRun {
    id: BeepRunId,
    params: BeepParams,
    emitted_in_cycle: u32,
    cycles_completed: u32,
    pending: Option<TimerToken>,
}

// ============================================================================
// BeepSequencer
// ============================================================================

/// Plays at most one beep run at a time.
#[derive(Default)]
pub struct BeepSequencer {
    active: Option<BeepRun>,
}

impl BeepSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run, cancelling any run already in progress.
    ///
    /// The first pulse plays immediately. A run with `count == 0` plays
    /// nothing and finishes at once.
    pub fn run(
        &mut self,
        params: BeepParams,
        clock: &mut dyn Clock,
        player: &dyn TonePlayer,
    ) -> (BeepRunId, BeepStep) {
        self.cancel_active(clock, player);

        let id = BeepRunId::new();
        if params.count == 0 {
            debug!(run = %id, "ビープ回数が0のため再生しません");
            return (id, BeepStep::Finished { cycles: 0 });
        }

        debug!(
            run = %id,
            count = params.count,
            looping = params.looping,
            "ビープを開始します"
        );
        self.active = Some(BeepRun {
            id,
            params,
            emitted_in_cycle: 0,
            cycles_completed: 0,
            pending: None,
        });

        (id, self.pulse(clock, player))
    }

    /// Handles a [`Wakeup::BeepPulse`] for `run`.
    ///
    /// Wakeups for anything other than the current run's pending timer are
    /// ignored.
    pub fn handle_wakeup(
        &mut self,
        run: BeepRunId,
        token: TimerToken,
        clock: &mut dyn Clock,
        player: &dyn TonePlayer,
    ) -> BeepStep {
        match self.active.as_mut() {
            Some(active) if active.id == run && active.pending == Some(token) => {
                active.pending = None;
            }
            _ => {
                debug!(run = %run, token = %token, "古いビープ通知を無視します");
                return BeepStep::Ignored;
            }
        }
        self.pulse(clock, player)
    }

    /// Cancels `run`: silences it and drops its pending pulse.
    ///
    /// Returns false (and does nothing) if `run` is not the active run,
    /// including when it already finished or was cancelled.
    pub fn cancel(&mut self, run: BeepRunId, clock: &mut dyn Clock, player: &dyn TonePlayer) -> bool {
        if self.active_run() != Some(run) {
            return false;
        }
        self.cancel_active(clock, player)
    }

    /// Cancels whatever run is active.
    pub fn cancel_active(&mut self, clock: &mut dyn Clock, player: &dyn TonePlayer) -> bool {
        let Some(run) = self.active.take() else {
            return false;
        };
        if let Some(token) = run.pending {
            clock.cancel(token);
        }
        player.silence();
        debug!(run = %run.id, cycles = run.cycles_completed, "ビープを停止しました");
        true
    }

    /// Returns the active run, if any.
    pub fn active_run(&self) -> Option<BeepRunId> {
        self.active.as_ref().map(|run| run.id)
    }

    /// Plays the next pulse of the active run and schedules the one after.
    fn pulse(&mut self, clock: &mut dyn Clock, player: &dyn TonePlayer) -> BeepStep {
        let Some(run) = self.active.as_mut() else {
            return BeepStep::Ignored;
        };

        if run.emitted_in_cycle >= run.params.count {
            run.emitted_in_cycle = 0;
        }

        // A missed pulse still counts; the sequence keeps its timing.
        if let Err(e) = player.play(&run.params.tone) {
            warn!(
                run = %run.id,
                suggestion = e.suggestion(),
                "ビープの再生に失敗しました: {}",
                e
            );
        }
        run.emitted_in_cycle += 1;

        let index = run.emitted_in_cycle;
        let wakeup = Wakeup::BeepPulse { run: run.id };
        if index < run.params.count {
            run.pending = Some(clock.schedule(run.params.pulse_interval_ms(), wakeup));
            return BeepStep::Pulsed { index };
        }

        run.cycles_completed += 1;
        let cycles = run.cycles_completed;
        if run.params.looping {
            run.pending = Some(clock.schedule(run.params.loop_restart_ms(), wakeup));
            BeepStep::CycleCompleted { cycles }
        } else {
            debug!(run = %run.id, "ビープが完了しました");
            self.active = None;
            BeepStep::Finished { cycles }
        }
    }
}

impl fmt::Debug for BeepSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeepSequencer")
            .field("active_run", &self.active_run())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

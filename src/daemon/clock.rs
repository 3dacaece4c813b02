//! Relative-delay scheduling for the daemon.
//!
//! Every timer in the daemon (phase deadlines, beep pulses, countdown
//! ticks) goes through a [`Clock`]. Scheduling returns a [`TimerToken`];
//! when the delay elapses the clock hands back a [`FiredWakeup`] that the
//! owner dispatches to the right component. Components never run inside
//! the clock, so all state mutation stays on the single loop that owns
//! the scheduler.
//!
//! - [`TokioClock`]: real clock, delivers wakeups over an mpsc channel
//! - [`ManualClock`]: deterministic clock advanced by hand in tests

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};

use crate::daemon::beeper::BeepRunId;
use crate::daemon::countdown::SurfaceId;
use crate::types::Phase;

// ============================================================================
// TimerToken / Wakeup
// ============================================================================

/// Handle to a scheduled wakeup, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// What a scheduled timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wakeup {
    /// The deadline armed while in `phase` has elapsed
    PhaseDeadline { phase: Phase },
    /// The next pulse of a beep run is due
    BeepPulse { run: BeepRunId },
    /// One second of a break countdown has elapsed
    CountdownTick { surface: SurfaceId },
}

/// A wakeup whose delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredWakeup {
    pub token: TimerToken,
    pub wakeup: Wakeup,
}

// ============================================================================
// Clock
// ============================================================================

/// Minimal scheduling capability: current time plus one-shot timers.
pub trait Clock {
    /// Current wall-clock time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Arms a one-shot timer that fires after `delay_ms`.
    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerToken;

    /// Cancels a pending timer. Unknown or already-fired tokens are ignored.
    fn cancel(&mut self, token: TimerToken);
}

// ============================================================================
// TokioClock
// ============================================================================

/// Clock backed by tokio timers.
///
/// Each scheduled timer is a spawned sleep that sends a [`FiredWakeup`]
/// on the channel returned by [`TokioClock::new`]. Cancelling aborts the
/// sleep; a wakeup already queued on the channel may still arrive, so
/// receivers must compare tokens before acting.
#[derive(Debug)]
pub struct TokioClock {
    origin: Instant,
    origin_epoch_ms: u64,
    next_token: u64,
    tasks: HashMap<TimerToken, JoinHandle<()>>,
    wakeup_tx: mpsc::UnboundedSender<FiredWakeup>,
}

impl TokioClock {
    /// Creates a clock and the receiver its wakeups arrive on.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FiredWakeup>) {
        let (wakeup_tx, wakeup_rx) = mpsc::unbounded_channel();
        let origin_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let clock = Self {
            origin: Instant::now(),
            origin_epoch_ms,
            next_token: 0,
            tasks: HashMap::new(),
            wakeup_tx,
        };
        (clock, wakeup_rx)
    }

    /// Number of timers that have not fired or been cancelled.
    pub fn pending_count(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.origin_epoch_ms
            .saturating_add(self.origin.elapsed().as_millis() as u64)
    }

    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerToken {
        self.tasks.retain(|_, handle| !handle.is_finished());

        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let tx = self.wakeup_tx.clone();

        let handle = tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            // The receiver only goes away when the daemon is shutting down.
            let _ = tx.send(FiredWakeup { token, wakeup });
        });

        self.tasks.insert(token, handle);
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.tasks.remove(&token) {
            handle.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

// ============================================================================
// ManualClock
// ============================================================================

/// Deterministic clock for tests.
///
/// Time only moves when the test says so. Timers are released in due-time
/// order, ties broken by scheduling order, through [`ManualClock::pop_due`].
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: u64,
    next_token: u64,
    queue: BTreeMap<(u64, TimerToken), Wakeup>,
    due_at: HashMap<TimerToken, u64>,
}

impl ManualClock {
    /// Creates a clock starting at `start_ms`.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: start_ms,
            ..Self::default()
        }
    }

    /// Releases the earliest timer due at or before `until_ms`.
    ///
    /// The clock's current time moves forward to that timer's due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<FiredWakeup> {
        let (&(due, token), _) = self.queue.iter().next()?;
        if due > until_ms {
            return None;
        }
        let wakeup = self.queue.remove(&(due, token))?;
        self.due_at.remove(&token);
        self.now_ms = self.now_ms.max(due);
        Some(FiredWakeup { token, wakeup })
    }

    /// Moves time forward without firing anything.
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    /// Number of pending timers.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Pending wakeups in firing order.
    pub fn pending(&self) -> Vec<Wakeup> {
        self.queue.values().copied().collect()
    }

    /// Number of pending phase deadlines.
    pub fn pending_deadlines(&self) -> usize {
        self.queue
            .values()
            .filter(|w| matches!(w, Wakeup::PhaseDeadline { .. }))
            .count()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule(&mut self, delay_ms: u64, wakeup: Wakeup) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        let due = self.now_ms.saturating_add(delay_ms);
        self.queue.insert((due, token), wakeup);
        self.due_at.insert(token, due);
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(due) = self.due_at.remove(&token) {
            self.queue.remove(&(due, token));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

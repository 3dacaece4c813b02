//! Per-second break countdown.
//!
//! The countdown starts at the break length in whole seconds and ticks
//! down once per second on the [`Clock`]. Reaching zero yields
//! [`CountdownStep::Finished`] exactly once. Closing it early cancels the
//! pending tick, and a stale tick that still arrives is ignored because
//! every open gets a fresh [`SurfaceId`].

use std::fmt;

use tracing::debug;

use crate::daemon::clock::{Clock, TimerToken, Wakeup};

/// Milliseconds between countdown ticks.
pub const TICK_INTERVAL_MS: u64 = 1_000;

/// Identifies one opening of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Result of a countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// One second elapsed; `remaining` seconds left
    Tick { remaining: u32 },
    /// The countdown reached zero
    Finished,
}

#[derive(Debug)]
struct OpenCountdown {
    id: SurfaceId,
    remaining: u32,
    pending: Option<TimerToken>,
}

/// The visible break countdown.
#[derive(Debug, Default)]
pub struct CountdownSurface {
    next_id: u64,
    open: Option<OpenCountdown>,
}

impl CountdownSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the countdown at `total_seconds`, closing any previous one.
    pub fn open(&mut self, total_seconds: u32, clock: &mut dyn Clock) -> SurfaceId {
        self.close(clock);

        self.next_id += 1;
        let id = SurfaceId(self.next_id);
        let pending = (total_seconds > 0)
            .then(|| clock.schedule(TICK_INTERVAL_MS, Wakeup::CountdownTick { surface: id }));

        debug!(surface = %id, total_seconds, "カウントダウンを開始します");
        self.open = Some(OpenCountdown {
            id,
            remaining: total_seconds,
            pending,
        });
        id
    }

    /// Handles a [`Wakeup::CountdownTick`].
    ///
    /// Returns `None` for ticks that belong to a closed or replaced
    /// countdown.
    pub fn tick(
        &mut self,
        surface: SurfaceId,
        token: TimerToken,
        clock: &mut dyn Clock,
    ) -> Option<CountdownStep> {
        let countdown = match self.open.as_mut() {
            Some(c) if c.id == surface && c.pending == Some(token) => c,
            _ => {
                debug!(surface = %surface, token = %token, "古いカウントダウン通知を無視します");
                return None;
            }
        };

        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining == 0 {
            // Stays open at 0 until closed; no further ticks.
            countdown.pending = None;
            return Some(CountdownStep::Finished);
        }

        countdown.pending = Some(clock.schedule(TICK_INTERVAL_MS, Wakeup::CountdownTick { surface }));
        Some(CountdownStep::Tick {
            remaining: countdown.remaining,
        })
    }

    /// Closes the countdown. Returns false if nothing was open.
    pub fn close(&mut self, clock: &mut dyn Clock) -> bool {
        let Some(countdown) = self.open.take() else {
            return false;
        };
        if let Some(token) = countdown.pending {
            clock.cancel(token);
        }
        debug!(surface = %countdown.id, remaining = countdown.remaining, "カウントダウンを閉じました");
        true
    }

    /// Seconds shown on the open countdown.
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.open.as_ref().map(|c| c.remaining)
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daemon::clock::ManualClock;

    fn run_to_end(surface: &mut CountdownSurface, clock: &mut ManualClock) -> Vec<CountdownStep> {
        let mut steps = Vec::new();
        while let Some(fired) = clock.pop_due(u64::MAX) {
            if let Wakeup::CountdownTick { surface: id } = fired.wakeup {
                if let Some(step) = surface.tick(id, fired.token, clock) {
                    steps.push(step);
                }
            }
        }
        steps
    }

    #[test]
    fn test_counts_down_and_finishes_once() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        surface.open(3, &mut clock);
        assert_eq!(surface.remaining_seconds(), Some(3));

        let steps = run_to_end(&mut surface, &mut clock);

        assert_eq!(
            steps,
            vec![
                CountdownStep::Tick { remaining: 2 },
                CountdownStep::Tick { remaining: 1 },
                CountdownStep::Finished,
            ]
        );
        assert_eq!(clock.now_ms(), 3_000);
        assert_eq!(surface.remaining_seconds(), Some(0));
        assert_eq!(clock.pending_count(), 0);
    }

    #[test]
    fn test_close_before_zero_stops_ticks() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        let id = surface.open(5, &mut clock);

        let fired = clock.pop_due(u64::MAX).unwrap();
        surface.tick(id, fired.token, &mut clock);
        assert!(surface.close(&mut clock));

        assert_eq!(clock.pending_count(), 0);
        assert!(run_to_end(&mut surface, &mut clock).is_empty());
        assert!(!surface.is_open());
    }

    #[test]
    fn test_stale_tick_after_close_is_ignored() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        let id = surface.open(2, &mut clock);
        let fired = clock.pop_due(u64::MAX).unwrap();
        surface.close(&mut clock);

        assert_eq!(surface.tick(id, fired.token, &mut clock), None);
    }

    #[test]
    fn test_reopen_replaces_previous() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        let first = surface.open(10, &mut clock);
        let second = surface.open(2, &mut clock);

        assert_ne!(first, second);
        assert_eq!(clock.pending_count(), 1);
        assert_eq!(run_to_end(&mut surface, &mut clock).len(), 2);
    }

    #[test]
    fn test_zero_seconds_never_ticks() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        surface.open(0, &mut clock);

        assert_eq!(clock.pending_count(), 0);
        assert_eq!(surface.remaining_seconds(), Some(0));
    }

    #[test]
    fn test_close_when_not_open() {
        let mut clock = ManualClock::new(0);
        let mut surface = CountdownSurface::new();
        assert!(!surface.close(&mut clock));
    }
}

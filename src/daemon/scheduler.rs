//! Phase scheduler for Eye Break.
//!
//! This module provides the work/break state machine:
//! - State transitions (Idle → Work → Break → Work ...)
//! - Absolute deadlines armed as one-shot [`Clock`] timers
//! - Break side effects: countdown, break window and beep run
//! - Event firing for the status line and logging
//!
//! The scheduler is the only owner of [`SchedulerState`]. Timers never
//! call back into it; they come back as [`FiredWakeup`]s that the owning
//! loop passes to [`PhaseScheduler::handle_wakeup`], which drops anything
//! armed for a phase that has since ended.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::daemon::beeper::{BeepParams, BeepRunId, BeepSequencer, BeepStep};
use crate::daemon::clock::{Clock, FiredWakeup, ManualClock, TimerToken, Wakeup};
use crate::daemon::countdown::{CountdownStep, CountdownSurface};
use crate::notification::{
    create_back_to_focus_content, create_break_time_content, create_focus_started_content,
    NotificationContent, Notifier,
};
use crate::settings::{load_or_default, SettingsStore};
use crate::sound::TonePlayer;
use crate::status::StatusReporter;
use crate::types::{Phase, SchedulerStatus, Settings};
use crate::window::BreakWindow;

// ============================================================================
// Services
// ============================================================================

/// External collaborators the scheduler calls fire-and-forget.
#[derive(Clone)]
pub struct Services {
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
    pub window: Arc<dyn BreakWindow>,
    pub tones: Arc<dyn TonePlayer>,
}

// ============================================================================
// SchedulerState / SchedulerEvent
// ============================================================================

/// State owned by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// Current phase
    pub phase: Phase,
    /// Absolute deadline of the current phase (0 when idle)
    pub deadline_epoch_ms: u64,
    /// Beep run started for the current break, if still playing
    pub active_beep_run: Option<BeepRunId>,
}

/// Scheduler events for logging and external integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// `start()` entered Work
    FocusStarted {
        /// Length of the work phase
        work_ms: u64,
    },
    /// Work ended and a break began
    BreakStarted {
        /// Length of the break phase
        break_ms: u64,
    },
    /// A break ended and Work resumed
    BackToFocus {
        /// Length of the work phase
        work_ms: u64,
    },
    /// The cycle stopped
    Paused,
    /// The break countdown moved
    CountdownTick {
        /// Seconds left on the countdown
        remaining_seconds: u32,
    },
    /// A looping beep run finished a cycle
    BeepCycleCompleted {
        /// Cycles completed so far
        cycles: u32,
    },
}

// ============================================================================
// PhaseScheduler
// ============================================================================

/// Work/break state machine.
pub struct PhaseScheduler<C: Clock> {
    clock: C,
    services: Services,
    state: SchedulerState,
    /// Settings read at the last transition
    settings: Settings,
    deadline_token: Option<TimerToken>,
    beeper: BeepSequencer,
    countdown: CountdownSurface,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl<C: Clock> PhaseScheduler<C> {
    /// Creates an idle scheduler.
    pub fn new(
        clock: C,
        services: Services,
        event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Self {
        let settings = load_or_default(services.settings.as_ref());
        Self {
            clock,
            services,
            state: SchedulerState::default(),
            settings,
            deadline_token: None,
            beeper: BeepSequencer::new(),
            countdown: CountdownSurface::new(),
            event_tx,
        }
    }

    /// Starts (or restarts) the focus cycle from now.
    pub fn start(&mut self) {
        self.settings = self.load_settings();
        self.teardown_break();

        let work_ms = self.settings.work_duration_ms();
        self.state.phase = Phase::Work;
        self.arm_deadline(work_ms);

        info!(work_ms, deadline = self.state.deadline_epoch_ms, "集中を開始しました");
        self.notify(&create_focus_started_content(self.settings.work_minutes));
        self.emit(SchedulerEvent::FocusStarted { work_ms });
    }

    /// Stops the cycle and returns to Idle.
    ///
    /// Does nothing when already idle.
    pub fn pause(&mut self) {
        if self.state.phase == Phase::Idle {
            debug!("既に停止しています");
            return;
        }

        self.teardown_break();
        self.cancel_deadline();
        self.state.phase = Phase::Idle;
        self.state.deadline_epoch_ms = 0;

        info!("一時停止しました");
        self.emit(SchedulerEvent::Paused);
    }

    /// Stops the active beep run while the break itself carries on.
    ///
    /// Returns false if no run was active.
    pub fn silence_beeps(&mut self) -> bool {
        match self.state.active_beep_run.take() {
            Some(run) => {
                self.beeper
                    .cancel(run, &mut self.clock, self.services.tones.as_ref());
                info!(run = %run, "ビープを停止しました");
                true
            }
            None => {
                debug!("停止するビープがありません");
                false
            }
        }
    }

    /// Performs the transition due at the current phase's deadline.
    pub fn on_deadline(&mut self) {
        match self.state.phase {
            Phase::Work => self.enter_break(),
            Phase::Break => self.finish_break(),
            Phase::Idle => debug!("停止中のため期限を無視します"),
        }
    }

    /// Ends the break early because the countdown reached zero.
    ///
    /// Returns false (and does nothing) outside of Break.
    pub fn on_break_surface_done(&mut self) -> bool {
        if self.state.phase != Phase::Break {
            debug!(phase = %self.state.phase, "休憩中ではないため完了通知を無視します");
            return false;
        }
        self.finish_break();
        true
    }

    /// Dispatches a fired timer to the component that armed it.
    pub fn handle_wakeup(&mut self, fired: FiredWakeup) {
        match fired.wakeup {
            Wakeup::PhaseDeadline { phase } => {
                if self.deadline_token != Some(fired.token) || phase != self.state.phase {
                    debug!(token = %fired.token, %phase, "古い期限を無視します");
                    return;
                }
                self.deadline_token = None;
                self.on_deadline();
            }
            Wakeup::BeepPulse { run } => {
                let step = self.beeper.handle_wakeup(
                    run,
                    fired.token,
                    &mut self.clock,
                    self.services.tones.as_ref(),
                );
                self.record_beep_step(run, step);
            }
            Wakeup::CountdownTick { surface } => {
                match self.countdown.tick(surface, fired.token, &mut self.clock) {
                    Some(CountdownStep::Tick { remaining }) => self.show_remaining(remaining),
                    Some(CountdownStep::Finished) => {
                        self.show_remaining(0);
                        self.on_break_surface_done();
                    }
                    None => {}
                }
            }
        }
    }

    /// Returns the current phase and time left, without side effects.
    pub fn status(&self) -> SchedulerStatus {
        let remaining_ms = match self.state.phase {
            Phase::Idle => 0,
            _ => StatusReporter::remaining_ms(self.state.deadline_epoch_ms, self.clock.now_ms()),
        };
        SchedulerStatus {
            phase: self.state.phase,
            remaining_ms,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Reads the stored settings, falling back to the defaults on failure.
    pub fn load_settings(&self) -> Settings {
        load_or_default(self.services.settings.as_ref())
    }

    /// Shallow-merges `patch` over the stored settings and persists them.
    ///
    /// Returns the merged record even if saving fails. A running phase
    /// keeps its deadline; the new values apply from the next transition.
    pub fn save_settings(&mut self, patch: &Map<String, Value>) -> Settings {
        let merged = self.load_settings().merged_with(patch);
        match self.services.settings.save(&merged) {
            Ok(()) => info!("設定を保存しました"),
            Err(e) => warn!("設定の保存に失敗しました: {}", e),
        }
        self.settings = merged.clone();
        merged
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn enter_break(&mut self) {
        self.settings = self.load_settings();
        self.teardown_break();

        let break_ms = self.settings.break_duration_ms();
        let seconds = self.settings.break_countdown_seconds();
        self.state.phase = Phase::Break;
        self.arm_deadline(break_ms);

        self.countdown.open(seconds, &mut self.clock);
        if let Err(e) = self.services.window.open(seconds) {
            warn!("休憩ウィンドウを開けませんでした: {}", e);
        }

        let params = BeepParams::from_settings(&self.settings);
        let (run, step) = self
            .beeper
            .run(params, &mut self.clock, self.services.tones.as_ref());
        self.state.active_beep_run = Some(run);
        self.record_beep_step(run, step);

        info!(break_ms, countdown_seconds = seconds, "休憩を開始しました");
        self.notify(&create_break_time_content());
        self.emit(SchedulerEvent::BreakStarted { break_ms });
    }

    fn finish_break(&mut self) {
        self.settings = self.load_settings();
        self.teardown_break();

        let work_ms = self.settings.work_duration_ms();
        self.state.phase = Phase::Work;
        self.arm_deadline(work_ms);

        info!(work_ms, "集中に戻りました");
        self.notify(&create_back_to_focus_content(self.settings.work_minutes));
        self.emit(SchedulerEvent::BackToFocus { work_ms });
    }

    /// Closes the countdown and window and stops the beep run.
    fn teardown_break(&mut self) {
        if self.countdown.close(&mut self.clock) {
            if let Err(e) = self.services.window.close() {
                warn!("休憩ウィンドウを閉じられませんでした: {}", e);
            }
        }
        if let Some(run) = self.state.active_beep_run.take() {
            self.beeper
                .cancel(run, &mut self.clock, self.services.tones.as_ref());
        }
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Replaces the armed deadline with one `delay_ms` from now.
    fn arm_deadline(&mut self, delay_ms: u64) {
        self.cancel_deadline();
        self.state.deadline_epoch_ms = self.clock.now_ms().saturating_add(delay_ms);
        let wakeup = Wakeup::PhaseDeadline {
            phase: self.state.phase,
        };
        self.deadline_token = Some(self.clock.schedule(delay_ms, wakeup));
    }

    fn cancel_deadline(&mut self) {
        if let Some(token) = self.deadline_token.take() {
            self.clock.cancel(token);
        }
    }

    fn record_beep_step(&mut self, run: BeepRunId, step: BeepStep) {
        match step {
            BeepStep::CycleCompleted { cycles } => {
                self.emit(SchedulerEvent::BeepCycleCompleted { cycles });
            }
            BeepStep::Finished { cycles } => {
                debug!(run = %run, cycles, "ビープが終了しました");
                if self.state.active_beep_run == Some(run) {
                    self.state.active_beep_run = None;
                }
            }
            BeepStep::Pulsed { .. } | BeepStep::Ignored => {}
        }
    }

    fn show_remaining(&mut self, remaining_seconds: u32) {
        if let Err(e) = self.services.window.show_remaining(remaining_seconds) {
            warn!("休憩ウィンドウを更新できませんでした: {}", e);
        }
        self.emit(SchedulerEvent::CountdownTick { remaining_seconds });
    }

    fn notify(&self, content: &NotificationContent) {
        if let Err(e) = self.services.notifier.notify(content) {
            warn!(
                title = %content.title,
                suggestion = e.suggestion(),
                "通知の送信に失敗しました: {}",
                e
            );
        }
    }

    fn emit(&self, event: SchedulerEvent) {
        // Nobody listening is fine.
        let _ = self.event_tx.send(event);
    }
}

impl PhaseScheduler<ManualClock> {
    /// Moves the manual clock forward, firing every timer that falls due.
    pub fn advance_by(&mut self, ms: u64) {
        let until = self.clock.now_ms().saturating_add(ms);
        while let Some(fired) = self.clock.pop_due(until) {
            self.handle_wakeup(fired);
        }
        self.clock.set_now(until);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::MockNotifier;
    use crate::settings::MockSettingsStore;
    use crate::sound::MockTonePlayer;
    use crate::window::{MockBreakWindow, WindowEvent};
    use serde_json::json;

    const START_MS: u64 = 1_700_000_000_000;

    struct Fixture {
        scheduler: PhaseScheduler<ManualClock>,
        settings: Arc<MockSettingsStore>,
        notifier: Arc<MockNotifier>,
        window: Arc<MockBreakWindow>,
        tones: Arc<MockTonePlayer>,
        events: mpsc::UnboundedReceiver<SchedulerEvent>,
    }

    impl Fixture {
        fn new(record: Value) -> Self {
            let settings = Arc::new(MockSettingsStore::new());
            settings.set_record(record);
            let notifier = Arc::new(MockNotifier::new());
            let window = Arc::new(MockBreakWindow::new());
            let tones = Arc::new(MockTonePlayer::new());
            let services = Services {
                settings: settings.clone(),
                notifier: notifier.clone(),
                window: window.clone(),
                tones: tones.clone(),
            };
            let (tx, events) = mpsc::unbounded_channel();
            Self {
                scheduler: PhaseScheduler::new(ManualClock::new(START_MS), services, tx),
                settings,
                notifier,
                window,
                tones,
                events,
            }
        }

        fn drain_events(&mut self) -> Vec<SchedulerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn fixture() -> Fixture {
        Fixture::new(json!({}))
    }

    // ------------------------------------------------------------------------
    // start / pause Tests
    // ------------------------------------------------------------------------

    mod start_pause_tests {
        use super::*;

        #[test]
        fn test_new_scheduler_is_idle() {
            let f = fixture();
            assert_eq!(f.scheduler.state(), SchedulerState::default());
            assert_eq!(
                f.scheduler.status(),
                SchedulerStatus {
                    phase: Phase::Idle,
                    remaining_ms: 0
                }
            );
        }

        #[test]
        fn test_start_enters_work() {
            let mut f = fixture();
            f.scheduler.start();

            let status = f.scheduler.status();
            assert_eq!(status.phase, Phase::Work);
            assert_eq!(status.remaining_ms, 1_200_000);
            assert_eq!(f.scheduler.state().deadline_epoch_ms, START_MS + 1_200_000);
            assert_eq!(f.notifier.titles(), vec!["Focus started"]);
            assert_eq!(
                f.drain_events(),
                vec![SchedulerEvent::FocusStarted { work_ms: 1_200_000 }]
            );
        }

        #[test]
        fn test_start_twice_leaves_one_deadline() {
            let mut f = fixture();
            f.scheduler.start();
            f.scheduler.advance_by(5_000);
            f.scheduler.start();

            assert_eq!(f.scheduler.clock().pending_deadlines(), 1);
            assert_eq!(f.scheduler.status().remaining_ms, 1_200_000);
        }

        #[test]
        fn test_pause_returns_to_idle() {
            let mut f = fixture();
            f.scheduler.start();
            f.scheduler.pause();

            assert_eq!(f.scheduler.state(), SchedulerState::default());
            assert_eq!(f.scheduler.clock().pending_count(), 0);

            f.scheduler.advance_by(10 * 60 * 60 * 1000);
            assert_eq!(f.scheduler.status().phase, Phase::Idle);
        }

        #[test]
        fn test_pause_when_idle_has_no_side_effects() {
            let mut f = fixture();
            f.scheduler.pause();

            assert!(f.drain_events().is_empty());
            assert!(f.window.events().is_empty());
            assert_eq!(f.tones.silence_count(), 0);
        }

        #[test]
        fn test_start_uses_stored_work_minutes() {
            let mut f = Fixture::new(json!({ "workMinutes": 0.5 }));
            f.scheduler.start();
            assert_eq!(f.scheduler.status().remaining_ms, 30_000);
        }

        #[test]
        fn test_start_with_huge_work_minutes_uses_default() {
            let mut f = Fixture::new(json!({ "workMinutes": 1e15 }));
            f.scheduler.start();

            let status = f.scheduler.status();
            assert_eq!(status.phase, Phase::Work);
            assert_eq!(status.remaining_ms, 1_200_000);
            assert_eq!(f.scheduler.state().deadline_epoch_ms, START_MS + 1_200_000);
        }

        #[test]
        fn test_saving_huge_break_seconds_keeps_prior_value() {
            let mut f = fixture();
            let patch = json!({ "breakSeconds": 1e300 });
            let merged = f.scheduler.save_settings(patch.as_object().unwrap());
            assert_eq!(merged.break_seconds, 20.0);

            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            assert_eq!(f.scheduler.status().phase, Phase::Break);
            assert_eq!(f.scheduler.status().remaining_ms, 20_000);
        }
    }

    // ------------------------------------------------------------------------
    // Transition Tests
    // ------------------------------------------------------------------------

    mod transition_tests {
        use super::*;

        #[test]
        fn test_deadline_enters_break() {
            let mut f = fixture();
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);

            let state = f.scheduler.state();
            assert_eq!(state.phase, Phase::Break);
            assert!(state.active_beep_run.is_some());
            assert_eq!(f.scheduler.status().remaining_ms, 20_000);
            assert_eq!(f.window.events()[0], WindowEvent::Opened(20));
            assert_eq!(f.tones.play_count(), 1);
            assert_eq!(f.notifier.titles(), vec!["Focus started", "Break time"]);
        }

        #[test]
        fn test_break_ends_once() {
            let mut f = fixture();
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            f.drain_events();
            f.scheduler.advance_by(20_000);

            assert_eq!(f.scheduler.status().phase, Phase::Work);
            assert_eq!(f.scheduler.status().remaining_ms, 1_200_000);
            assert!(!f.window.is_open());
            assert_eq!(f.scheduler.clock().pending_deadlines(), 1);

            let back = f
                .drain_events()
                .into_iter()
                .filter(|e| matches!(e, SchedulerEvent::BackToFocus { .. }))
                .count();
            assert_eq!(back, 1);
            assert_eq!(
                f.notifier.titles(),
                vec!["Focus started", "Break time", "Back to focus"]
            );
        }

        #[test]
        fn test_surface_done_ignored_during_work() {
            let mut f = fixture();
            f.scheduler.start();
            let before = f.scheduler.state();

            assert!(!f.scheduler.on_break_surface_done());
            assert_eq!(f.scheduler.state(), before);
        }

        #[test]
        fn test_surface_done_ends_break_early() {
            let mut f = fixture();
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            f.scheduler.advance_by(3_000);

            assert!(f.scheduler.on_break_surface_done());
            assert_eq!(f.scheduler.status().phase, Phase::Work);

            // The safety-bound deadline for the break must not fire again.
            f.scheduler.advance_by(17_000);
            assert_eq!(f.scheduler.status().phase, Phase::Work);
            assert_eq!(f.notifier.notification_count(), 3);
        }

        #[test]
        fn test_countdown_ticks_reach_window() {
            let mut f = Fixture::new(json!({ "breakSeconds": 3 }));
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            f.scheduler.advance_by(3_000);

            let events = f.window.events();
            assert!(events.contains(&WindowEvent::Remaining(2)));
            assert!(events.contains(&WindowEvent::Remaining(1)));
            assert_eq!(events.last(), Some(&WindowEvent::Closed));
        }

        #[test]
        fn test_fractional_break_rounds_countdown_up() {
            let mut f = Fixture::new(json!({ "breakSeconds": 2.5 }));
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);

            assert_eq!(f.window.events()[0], WindowEvent::Opened(3));
            assert_eq!(f.scheduler.status().remaining_ms, 2_500);

            f.scheduler.advance_by(2_500);
            assert_eq!(f.scheduler.status().phase, Phase::Work);
            assert_eq!(f.scheduler.clock().pending_count(), 1);
        }

        #[test]
        fn test_pause_during_break_stops_beeps() {
            let mut f = Fixture::new(json!({ "loopBreakBeeps": true }));
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            f.scheduler.advance_by(1_000);
            f.scheduler.pause();
            let played = f.tones.play_count();

            assert_eq!(f.tones.silence_count(), 1);
            assert!(!f.window.is_open());
            assert_eq!(f.scheduler.clock().pending_count(), 0);

            f.scheduler.advance_by(60_000);
            assert_eq!(f.tones.play_count(), played);
        }

        #[test]
        fn test_silence_stops_beeps_but_not_break() {
            let mut f = Fixture::new(json!({ "loopBreakBeeps": true }));
            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            f.scheduler.advance_by(1_000);

            assert!(f.scheduler.silence_beeps());
            assert!(!f.scheduler.silence_beeps());
            let played = f.tones.play_count();
            assert_eq!(f.tones.silence_count(), 1);
            assert_eq!(f.scheduler.status().phase, Phase::Break);
            assert!(f.window.is_open());

            f.scheduler.advance_by(5_000);
            assert_eq!(f.tones.play_count(), played);
            assert_eq!(f.window.events().last(), Some(&WindowEvent::Remaining(14)));

            // The break still ends on time and the next one beeps again.
            f.scheduler.advance_by(14_000);
            assert_eq!(f.scheduler.status().phase, Phase::Work);
            f.scheduler.advance_by(1_200_000);
            assert_eq!(f.scheduler.status().phase, Phase::Break);
            assert!(f.tones.play_count() > played);
        }

        #[test]
        fn test_silence_when_idle_is_noop() {
            let mut f = fixture();
            assert!(!f.scheduler.silence_beeps());
            assert_eq!(f.tones.silence_count(), 0);
            assert_eq!(f.scheduler.status().phase, Phase::Idle);
        }

        #[test]
        fn test_settings_reloaded_on_transition() {
            let mut f = fixture();
            f.scheduler.start();
            f.settings.set_record(json!({ "breakSeconds": 7 }));
            f.scheduler.advance_by(1_200_000);

            assert_eq!(f.scheduler.status().remaining_ms, 7_000);
        }
    }

    // ------------------------------------------------------------------------
    // Failure Tests
    // ------------------------------------------------------------------------

    mod failure_tests {
        use super::*;

        #[test]
        fn test_service_failures_do_not_block_transitions() {
            let mut f = fixture();
            f.notifier.set_should_fail(true);
            f.window.set_should_fail(true);
            f.tones.set_should_fail(true);

            f.scheduler.start();
            f.scheduler.advance_by(1_200_000);
            assert_eq!(f.scheduler.status().phase, Phase::Break);

            f.scheduler.advance_by(20_000);
            assert_eq!(f.scheduler.status().phase, Phase::Work);
        }

        #[test]
        fn test_settings_load_failure_uses_defaults() {
            let mut f = fixture();
            f.settings.set_should_fail_load(true);
            f.scheduler.start();
            assert_eq!(f.scheduler.status().remaining_ms, 1_200_000);
        }

        #[test]
        fn test_save_settings_merges_patch() {
            let mut f = Fixture::new(json!({ "volume": 0.3 }));
            let patch = json!({ "workMinutes": 25 });
            let merged = f
                .scheduler
                .save_settings(patch.as_object().unwrap());

            assert_eq!(merged.work_minutes, 25.0);
            assert_eq!(merged.volume, 0.3);
            assert_eq!(f.settings.saved(), vec![merged]);
        }

        #[test]
        fn test_save_failure_still_returns_merged() {
            let mut f = fixture();
            f.settings.set_should_fail_save(true);
            let patch = json!({ "breakSeconds": 30 });
            let merged = f
                .scheduler
                .save_settings(patch.as_object().unwrap());

            assert_eq!(merged.break_seconds, 30.0);
            assert!(f.settings.saved().is_empty());
        }
    }
}

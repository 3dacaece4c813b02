//! Daemon service loop.
//!
//! The service loop is the single owner of the [`PhaseScheduler`]. It
//! multiplexes three inputs on one task:
//! - Fired clock wakeups (deadlines, beep pulses, countdown ticks)
//! - Control commands forwarded by the IPC server
//! - Ctrl-C
//!
//! Because everything runs here, scheduler state is never touched
//! concurrently.

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::daemon::clock::{Clock, FiredWakeup, TokioClock};
use crate::daemon::ipc::ControlCommand;
use crate::daemon::scheduler::{PhaseScheduler, SchedulerEvent, Services};
use crate::types::{IpcRequest, IpcResponse, ResponseData};

/// Capacity of the control command queue.
pub const COMMAND_QUEUE_SIZE: usize = 32;

/// Applies one control request to the scheduler.
pub fn handle_request<C: Clock>(
    scheduler: &mut PhaseScheduler<C>,
    request: IpcRequest,
) -> IpcResponse {
    match request {
        IpcRequest::Start => {
            scheduler.start();
            IpcResponse::success(
                "集中を開始しました",
                Some(ResponseData::from_status(&scheduler.status())),
            )
        }
        IpcRequest::Pause => {
            scheduler.pause();
            IpcResponse::success(
                "一時停止しました",
                Some(ResponseData::from_status(&scheduler.status())),
            )
        }
        IpcRequest::Silence => {
            let message = if scheduler.silence_beeps() {
                "ビープを停止しました"
            } else {
                "鳴っているビープはありません"
            };
            IpcResponse::success(
                message,
                Some(ResponseData::from_status(&scheduler.status())),
            )
        }
        IpcRequest::Status => {
            IpcResponse::success("", Some(ResponseData::from_status(&scheduler.status())))
        }
        IpcRequest::Settings => IpcResponse::success(
            "",
            Some(ResponseData::from_settings(scheduler.load_settings())),
        ),
        IpcRequest::SaveSettings { settings } => {
            let merged = scheduler.save_settings(&settings);
            IpcResponse::success("設定を保存しました", Some(ResponseData::from_settings(merged)))
        }
        IpcRequest::Quit => {
            scheduler.pause();
            IpcResponse::success("デーモンを終了します", None)
        }
    }
}

/// Event loop that owns the scheduler.
pub struct DaemonService {
    scheduler: PhaseScheduler<TokioClock>,
    wakeups: mpsc::UnboundedReceiver<FiredWakeup>,
    events: mpsc::UnboundedReceiver<SchedulerEvent>,
    commands: mpsc::Receiver<ControlCommand>,
}

impl DaemonService {
    /// Creates the service and the sender used to reach it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(services: Services) -> (Self, mpsc::Sender<ControlCommand>) {
        let (clock, wakeups) = TokioClock::new();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::channel(COMMAND_QUEUE_SIZE);

        let service = Self {
            scheduler: PhaseScheduler::new(clock, services, event_tx),
            wakeups,
            events,
            commands,
        };
        (service, command_tx)
    }

    /// Starts the focus cycle right away.
    pub fn start(&mut self) {
        self.scheduler.start();
    }

    /// Runs until a quit command, Ctrl-C, or every command sender is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ctrl-C handler cannot be installed.
    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                Some(fired) = self.wakeups.recv() => {
                    self.scheduler.handle_wakeup(fired);
                }
                Some(event) = self.events.recv() => {
                    log_event(event);
                }
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("制御チャネルが閉じられました");
                        break;
                    };
                    let quit = matches!(command.request, IpcRequest::Quit);
                    let response = handle_request(&mut self.scheduler, command.request);
                    // The client may have disconnected already.
                    let _ = command.reply.send(response);
                    if quit {
                        info!("終了要求を受け付けました");
                        break;
                    }
                }
                result = signal::ctrl_c() => {
                    result?;
                    info!("シグナルを受信しました");
                    self.scheduler.pause();
                    break;
                }
            }
        }
        Ok(())
    }
}

fn log_event(event: SchedulerEvent) {
    match event {
        SchedulerEvent::CountdownTick { remaining_seconds } => {
            debug!(remaining_seconds, "休憩の残り時間");
        }
        SchedulerEvent::BeepCycleCompleted { cycles } => {
            debug!(cycles, "ビープのサイクルが完了しました");
        }
        other => debug!(event = ?other, "スケジューライベント"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::daemon::clock::ManualClock;
    use crate::daemon::ipc::RequestHandler;
    use crate::notification::MockNotifier;
    use crate::settings::MockSettingsStore;
    use crate::sound::MockTonePlayer;
    use crate::types::Phase;
    use crate::window::MockBreakWindow;

    fn services() -> Services {
        Services {
            settings: Arc::new(MockSettingsStore::new()),
            notifier: Arc::new(MockNotifier::new()),
            window: Arc::new(MockBreakWindow::new()),
            tones: Arc::new(MockTonePlayer::new()),
        }
    }

    fn manual_scheduler() -> PhaseScheduler<ManualClock> {
        let (tx, _rx) = mpsc::unbounded_channel();
        PhaseScheduler::new(ManualClock::new(0), services(), tx)
    }

    // ------------------------------------------------------------------------
    // handle_request Tests
    // ------------------------------------------------------------------------

    mod handle_request_tests {
        use super::*;

        #[test]
        fn test_start_and_status() {
            let mut scheduler = manual_scheduler();

            let response = handle_request(&mut scheduler, IpcRequest::Start);
            assert_eq!(response.message, "集中を開始しました");

            scheduler.advance_by(1_000);
            let data = handle_request(&mut scheduler, IpcRequest::Status)
                .data
                .unwrap();
            assert_eq!(data.phase, Some("work".to_string()));
            assert_eq!(data.remaining_ms, Some(1_199_000));
            assert_eq!(data.remaining_seconds, Some(1_199));
            assert_eq!(data.display, Some("Eye Break: WORK • 19:59".to_string()));
        }

        #[test]
        fn test_pause_and_quit_return_to_idle() {
            let mut scheduler = manual_scheduler();
            handle_request(&mut scheduler, IpcRequest::Start);

            let data = handle_request(&mut scheduler, IpcRequest::Pause)
                .data
                .unwrap();
            assert_eq!(data.phase, Some("idle".to_string()));

            handle_request(&mut scheduler, IpcRequest::Start);
            let response = handle_request(&mut scheduler, IpcRequest::Quit);
            assert!(!response.is_error());
            assert_eq!(scheduler.status().phase, Phase::Idle);
        }

        #[test]
        fn test_silence_keeps_break_running() {
            let mut scheduler = manual_scheduler();
            let response = handle_request(&mut scheduler, IpcRequest::Silence);
            assert_eq!(response.message, "鳴っているビープはありません");

            handle_request(&mut scheduler, IpcRequest::Start);
            scheduler.advance_by(1_200_000);
            assert!(scheduler.state().active_beep_run.is_some());

            let response = handle_request(&mut scheduler, IpcRequest::Silence);
            assert!(!response.is_error());
            assert_eq!(response.message, "ビープを停止しました");
            let data = response.data.unwrap();
            assert_eq!(data.phase, Some("break".to_string()));
            assert_eq!(data.remaining_ms, Some(20_000));
            assert!(scheduler.state().active_beep_run.is_none());
        }

        #[test]
        fn test_settings_roundtrip() {
            let mut scheduler = manual_scheduler();
            let patch = json!({ "waveform": "sine", "volume": 2 });

            let response = handle_request(
                &mut scheduler,
                IpcRequest::SaveSettings {
                    settings: patch.as_object().unwrap().clone(),
                },
            );
            let saved = response.data.unwrap().settings.unwrap();
            assert_eq!(saved.waveform, crate::types::Waveform::Sine);
            assert_eq!(saved.volume, crate::types::DEFAULT_VOLUME);

            let loaded = handle_request(&mut scheduler, IpcRequest::Settings)
                .data
                .unwrap()
                .settings
                .unwrap();
            assert_eq!(loaded, saved);
        }
    }

    // ------------------------------------------------------------------------
    // DaemonService Tests
    // ------------------------------------------------------------------------

    mod service_tests {
        use super::*;
        use tokio::time::Duration;

        #[tokio::test(start_paused = true)]
        async fn test_service_runs_cycle_and_quits() {
            let (mut service, tx) = DaemonService::new(services());
            let handler = RequestHandler::new(tx);
            service.start();

            let client = async move {
                tokio::time::sleep(Duration::from_millis(20 * 60 * 1000 + 500)).await;
                let status = handler.handle(IpcRequest::Status).await;
                let quit = handler.handle(IpcRequest::Quit).await;
                (status, quit)
            };
            let (result, (status, quit)) = tokio::join!(service.run(), client);

            result.unwrap();
            assert_eq!(status.data.unwrap().phase, Some("break".to_string()));
            assert!(!quit.is_error());
        }

        #[tokio::test]
        async fn test_service_stops_when_senders_dropped() {
            let (service, tx) = DaemonService::new(services());
            drop(tx);
            service.run().await.unwrap();
        }
    }
}

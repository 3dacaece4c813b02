//! Daemon module for Eye Break.
//!
//! This module contains the core daemon functionality:
//! - `clock`: relative-delay timers (tokio-backed and manual)
//! - `beeper`: break beep sequencer
//! - `countdown`: per-second break countdown
//! - `scheduler`: work/break state machine
//! - `service`: single-owner event loop
//! - `ipc`: Unix socket control surface

pub mod beeper;
pub mod clock;
pub mod countdown;
pub mod ipc;
pub mod scheduler;
pub mod service;

pub use beeper::{BeepParams, BeepRunId, BeepSequencer, BeepStep};
pub use clock::{Clock, FiredWakeup, ManualClock, TimerToken, TokioClock, Wakeup};
pub use countdown::{CountdownStep, CountdownSurface, SurfaceId};
pub use ipc::{ControlCommand, IpcError, IpcServer, RequestHandler};
pub use scheduler::{PhaseScheduler, SchedulerEvent, SchedulerState, Services};
pub use service::{handle_request, DaemonService};

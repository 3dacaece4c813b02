//! Break window surface.
//!
//! The break window is the visible side of a break: it shows the
//! per-second countdown driven by the scheduler. The scheduler owns the
//! countdown itself and only pushes display updates here, so a window
//! that fails to render never affects phase transitions.

mod error;

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub use error::WindowError;

use crate::status::StatusReporter;

/// Trait for break window implementations.
pub trait BreakWindow {
    /// Shows the window with a countdown starting at `total_seconds`.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be shown.
    fn open(&self, total_seconds: u32) -> Result<(), WindowError>;

    /// Updates the visible countdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be updated.
    fn show_remaining(&self, seconds: u32) -> Result<(), WindowError>;

    /// Hides the window. Closing a window that is not open is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be hidden.
    fn close(&self) -> Result<(), WindowError>;
}

// ============================================================================
// TerminalBreakWindow
// ============================================================================

/// Break window rendered as status lines on stderr.
#[derive(Debug, Default)]
pub struct TerminalBreakWindow {
    open: AtomicBool,
}

impl TerminalBreakWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write_line(&self, line: &str) -> Result<(), WindowError> {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{}", line)?;
        stderr.flush()?;
        Ok(())
    }
}

impl BreakWindow for TerminalBreakWindow {
    fn open(&self, total_seconds: u32) -> Result<(), WindowError> {
        self.open.store(true, Ordering::SeqCst);
        self.write_line(&format!(
            "Break time: look ~6 m (20 ft) away & blink slowly. {}",
            StatusReporter::format_seconds(u64::from(total_seconds))
        ))
    }

    fn show_remaining(&self, seconds: u32) -> Result<(), WindowError> {
        if !self.open.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.write_line(&StatusReporter::format_seconds(u64::from(seconds)))
    }

    fn close(&self) -> Result<(), WindowError> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.write_line("Back to focus.")?;
        }
        Ok(())
    }
}

// ============================================================================
// MockBreakWindow
// ============================================================================

/// Calls observed by [`MockBreakWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Opened(u32),
    Remaining(u32),
    Closed,
}

/// Mock break window for testing.
#[derive(Debug, Default)]
pub struct MockBreakWindow {
    events: Mutex<Vec<WindowEvent>>,
    open: AtomicBool,
    should_fail: AtomicBool,
}

impl MockBreakWindow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn events(&self) -> Vec<WindowEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Number of times the window was opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, WindowEvent::Opened(_)))
            .count()
    }

    fn record(&self, event: WindowEvent) -> Result<(), WindowError> {
        self.events.lock().unwrap().push(event);
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(WindowError::OpenFailed("Mock failure".to_string()));
        }
        Ok(())
    }
}

impl BreakWindow for MockBreakWindow {
    fn open(&self, total_seconds: u32) -> Result<(), WindowError> {
        self.open.store(true, Ordering::SeqCst);
        self.record(WindowEvent::Opened(total_seconds))
    }

    fn show_remaining(&self, seconds: u32) -> Result<(), WindowError> {
        self.record(WindowEvent::Remaining(seconds))
    }

    fn close(&self) -> Result<(), WindowError> {
        self.open.store(false, Ordering::SeqCst);
        self.record(WindowEvent::Closed)
    }
}

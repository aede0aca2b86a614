//! User-facing progress and error messages.
//!
//! The orchestrator never prints directly; it is handed a [`Reporter`].

use std::cell::RefCell;

use tracing::{error, info, warn};

/// Tracing target for reporter events, so the console layer can skip them
pub const REPORT_TARGET: &str = "report";

/// Receiver for messages the user should see
pub trait Reporter {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Prints messages to stderr and mirrors them as tracing events
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        info!(target: REPORT_TARGET, "{message}");
        eprintln!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: REPORT_TARGET, "{message}");
        eprintln!("Warning: {message}");
    }

    fn error(&self, message: &str) {
        error!(target: REPORT_TARGET, "{message}");
        eprintln!("Error: {message}");
    }
}

/// Severity of a recorded message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// Keeps every message in memory, for callers that render them later
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: RefCell<Vec<(Level, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.borrow().clone()
    }

    /// Messages recorded at `level`, in order
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn info(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages
            .borrow_mut()
            .push((Level::Error, message.to_string()));
    }
}

//! Test logging for structured test output and debugging.
#![allow(dead_code)]
//!
//! ```rust,ignore
//! let log = TestLogger::new("retry_bound");
//! log.phase("setup");
//! // ...
//! log.phase("verify");
//! log.finish_ok();
//! ```
//!
//! Set `TEST_LOG_LEVEL=debug` to see `debug` lines; `NO_COLOR` disables color.

use std::cell::RefCell;
use std::fmt::Display;
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    fn from_env() -> Self {
        match std::env::var("TEST_LOG_LEVEL")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "trace" | "debug" => Self::Debug,
            "warn" | "warning" | "error" => Self::Warn,
            _ => Self::Info,
        }
    }

    const fn color_code(self) -> &'static str {
        match self {
            Self::Debug => "\x1b[36m",
            Self::Info => "\x1b[32m",
            Self::Warn => "\x1b[33m",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        };
        write!(f, "{s}")
    }
}

// =============================================================================
// Test Logger
// =============================================================================

/// Per-test logger with phase and duration tracking.
pub struct TestLogger {
    name: String,
    start: Instant,
    phase: RefCell<String>,
    min_level: LogLevel,
    color: bool,
}

impl TestLogger {
    #[must_use]
    pub fn new(name: &str) -> Self {
        let log = Self {
            name: name.to_string(),
            start: Instant::now(),
            phase: RefCell::new("init".to_string()),
            min_level: LogLevel::from_env(),
            color: std::env::var_os("NO_COLOR").is_none(),
        };
        log.emit(LogLevel::Info, "test started");
        log
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        let elapsed = self.start.elapsed().as_millis();
        let phase = self.phase.borrow();
        if self.color {
            eprintln!(
                "{}[{level}]\x1b[0m {} [{phase}] +{elapsed}ms {message}",
                level.color_code(),
                self.name
            );
        } else {
            eprintln!("[{level}] {} [{phase}] +{elapsed}ms {message}", self.name);
        }
    }

    /// Enter a named phase (setup, execute, verify, ...).
    pub fn phase(&self, name: &str) {
        *self.phase.borrow_mut() = name.to_string();
        self.emit(LogLevel::Debug, &format!("phase: {name}"));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Info, message.as_ref());
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Debug, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.emit(LogLevel::Warn, message.as_ref());
    }

    /// Log an outgoing request.
    pub fn http_request(&self, method: &str, url: &str) {
        self.emit(LogLevel::Debug, &format!("{method} {url}"));
    }

    /// Mark the test as passed.
    pub fn finish_ok(&self) {
        self.phase("done");
        self.emit(
            LogLevel::Info,
            &format!("passed in {}ms", self.start.elapsed().as_millis()),
        );
    }
}

//! Build logger
//!
//! Buffers severity-tagged messages for one run and forwards them to the
//! build host on `flush`. Messages below the configured verbosity are dropped
//! at log time; warnings and errors are always kept.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Origin tag for messages produced by weavr itself
pub const ORIGIN: &str = "weavr";

/// Message severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Trace,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trace => "trace",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// A single message bound for the build host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub severity: Severity,
    pub text: String,
    /// Who produced the message (`weavr` or a plugin name)
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_origin() -> String {
    ORIGIN.to_string()
}

impl LogMessage {
    pub fn new(severity: Severity, text: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            origin: origin.into(),
        }
    }

    /// Text as shown to the host, prefixed with the origin for plugin messages
    pub fn display_text(&self) -> String {
        if self.origin == ORIGIN || self.origin.is_empty() {
            self.text.clone()
        } else {
            format!("{}: {}", self.origin, self.text)
        }
    }
}

/// How chatty the host output is
///
/// `Low` importance means even low-importance messages get through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Trace and above
    Low,
    /// Info and above
    #[default]
    Normal,
    /// Warnings and errors only
    High,
}

impl Verbosity {
    /// Lowest severity forwarded at this verbosity
    pub fn min_severity(&self) -> Severity {
        match self {
            Self::Low => Severity::Trace,
            Self::Normal => Severity::Info,
            Self::High => Severity::Warning,
        }
    }
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "detailed" | "diagnostic" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" | "minimal" | "quiet" => Ok(Self::High),
            other => Err(format!("unknown verbosity '{}'", other)),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// Capability supplied by whoever drives the build
pub trait BuildHost: Send + Sync {
    /// Deliver one message to the build output
    fn emit(&self, severity: Severity, text: &str);
}

/// Per-run message buffer
pub struct BuildLogger {
    verbosity: Verbosity,
    debug_logging: bool,
    buffer: Mutex<Vec<LogMessage>>,
    error_occurred: AtomicBool,
}

impl BuildLogger {
    pub fn new(verbosity: Verbosity, debug_logging: bool) -> Self {
        Self {
            verbosity,
            debug_logging,
            buffer: Mutex::new(Vec::new()),
            error_occurred: AtomicBool::new(false),
        }
    }

    fn accepts(&self, severity: Severity) -> bool {
        if severity == Severity::Trace && self.debug_logging {
            return true;
        }
        severity >= self.verbosity.min_severity()
    }

    /// Append a message, dropping it if it falls below the verbosity
    pub fn log(&self, message: LogMessage) {
        if message.severity == Severity::Error {
            self.error_occurred.store(true, Ordering::SeqCst);
        }
        if !self.accepts(message.severity) {
            return;
        }
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    pub fn extend(&self, messages: impl IntoIterator<Item = LogMessage>) {
        for message in messages {
            self.log(message);
        }
    }

    pub fn trace(&self, text: impl Into<String>) {
        self.log(LogMessage::new(Severity::Trace, text, ORIGIN));
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(LogMessage::new(Severity::Info, text, ORIGIN));
    }

    pub fn warning(&self, text: impl Into<String>) {
        self.log(LogMessage::new(Severity::Warning, text, ORIGIN));
    }

    pub fn error(&self, text: impl Into<String>) {
        self.log(LogMessage::new(Severity::Error, text, ORIGIN));
    }

    /// Whether any error-severity message was logged
    pub fn error_occurred(&self) -> bool {
        self.error_occurred.load(Ordering::SeqCst)
    }

    /// Number of messages waiting for the next flush
    pub fn pending(&self) -> usize {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forward buffered messages to the host in arrival order
    pub fn flush(&self, host: &dyn BuildHost) {
        let drained: Vec<LogMessage> = {
            let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *buffer)
        };
        for message in drained {
            host.emit(message.severity, &message.display_text());
        }
    }
}

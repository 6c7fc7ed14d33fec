//! Build host that writes to the terminal

use crate::logger::{BuildHost, Severity};
use console::style;
use std::io::Write;

/// Prints build messages to stderr, compiler style
///
/// `weavr: warning: ...` / `weavr: error: ...`; info and trace lines are
/// printed as-is, trace dimmed.
#[derive(Debug, Default)]
pub struct ConsoleHost;

impl ConsoleHost {
    fn format(severity: Severity, text: &str) -> String {
        match severity {
            Severity::Error => format!("weavr: {} {}", style("error:").red().bold(), text),
            Severity::Warning => format!("weavr: {} {}", style("warning:").yellow().bold(), text),
            Severity::Info => text.to_string(),
            Severity::Trace => style(text).dim().to_string(),
        }
    }
}

impl BuildHost for ConsoleHost {
    fn emit(&self, severity: Severity, text: &str) {
        let mut stderr = std::io::stderr().lock();
        // nowhere left to report a broken stderr
        let _ = writeln!(stderr, "{}", Self::format(severity, text));
    }
}

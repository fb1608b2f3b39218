//! Logging utilities
//!
//! This module initializes the logger and provides [`Trace`], the
//! operator-facing record of the decisions taken while checking an
//! interface. Every trace line is mirrored into the `log` facade with its
//! indentation.

use std::fmt;
use std::ops::{Deref, DerefMut};

use log::Level;

const INDENT: &str = "    ";

/// Initialize the logging system
///
/// `RUST_LOG` takes precedence over `level` when it is set.
///
/// # Arguments
///
/// * `level` - Log level
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    // A second initialization (tests, embedding) is not an error
    let _ = env_logger::Builder::from_env(env)
        .format_target(false)
        .try_init();
}

/// One recorded trace line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Nesting depth at the time the line was recorded
    pub depth: usize,
    /// Severity of the line
    pub level: Level,
    /// Message text without indentation
    pub message: String,
}

/// Human-readable, indented trace of reconciliation decisions
///
/// Nesting is explicit: [`Trace::indent`] returns a guard that adds one
/// level while it is alive and restores the previous depth when dropped.
#[derive(Debug, Default)]
pub struct Trace {
    depth: usize,
    entries: Vec<TraceEntry>,
}

impl Trace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an informational line
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message.into());
    }

    /// Record a warning line
    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warn, message.into());
    }

    /// Record an error line
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message.into());
    }

    /// Enter a nested scope
    pub fn indent(&mut self) -> TraceScope<'_> {
        self.depth += 1;
        TraceScope { trace: self }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// All recorded lines in order
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Whether any line at error level was recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.level == Level::Error)
    }

    fn push(&mut self, level: Level, message: String) {
        log::log!(level, "{}{}", INDENT.repeat(self.depth), message);
        self.entries.push(TraceEntry {
            depth: self.depth,
            level,
            message,
        });
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}{}", INDENT.repeat(entry.depth), entry.message)?;
        }
        Ok(())
    }
}

/// Scope guard returned by [`Trace::indent`]
pub struct TraceScope<'a> {
    trace: &'a mut Trace,
}

impl Deref for TraceScope<'_> {
    type Target = Trace;

    fn deref(&self) -> &Trace {
        self.trace
    }
}

impl DerefMut for TraceScope<'_> {
    fn deref_mut(&mut self) -> &mut Trace {
        self.trace
    }
}

impl Drop for TraceScope<'_> {
    fn drop(&mut self) {
        self.trace.depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger() {
        // Only checks that repeated initialization does not panic
        init_logger("debug");
        init_logger("info");
    }

    #[test]
    fn test_trace_indent_is_scoped() {
        let mut trace = Trace::new();
        trace.info("Checking interface wg0:");
        {
            let mut peer = trace.indent();
            peer.info("Peer: abc");
            {
                let mut inner = peer.indent();
                inner.error("Endpoint is never connected");
                assert_eq!(inner.depth(), 2);
            }
            peer.info("done");
        }
        trace.info("finished");

        let depths: Vec<usize> = trace.entries().iter().map(|e| e.depth).collect();
        assert_eq!(depths, vec![0, 1, 2, 1, 0]);
        assert!(trace.has_errors());
        assert_eq!(
            trace.to_string(),
            "Checking interface wg0:\n    Peer: abc\n        Endpoint is never connected\n    done\nfinished\n"
        );
    }
}

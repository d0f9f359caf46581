//! Advisory diagnostics for grammar construction
//!
//! Structural defects found while loading or sweeping a grammar (dangling
//! successor links, nodes lacking required edges) are reported here as
//! line-oriented text messages. Reporting never aborts grammar construction.

/// Receiver for line-oriented diagnostic messages
pub trait DiagnosticSink {
    /// Report one diagnostic line
    fn report(&mut self, message: &str);
}

/// Collects messages in memory
impl DiagnosticSink for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Forwards messages to the `log` crate at warn level
///
/// Without the `logging` feature the messages are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, message: &str) {
        log_warn!("{}", message);
        #[cfg(not(feature = "logging"))]
        let _ = message;
    }
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _message: &str) {}
}

//! Mode-switchable message sink.
//!
//! Every component reports progress through an injected [`Logger`] rather
//! than an ambient global. Normal mode forwards to `tracing`, `off` drops
//! everything, and `buffer` captures lines in memory so tests can assert on
//! output without polluting stdout.

use std::sync::{Arc, Mutex};

/// How log lines are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// Emit through `tracing` at the matching level.
    #[default]
    Normal,
    /// Discard all lines.
    Off,
    /// Capture lines in memory for later inspection.
    Buffer,
}

impl LogMode {
    /// Reads the mode from the `LOG_MODE` environment variable
    /// (`buffer` | `off` | anything else is normal).
    pub fn from_env() -> Self {
        match std::env::var("LOG_MODE").as_deref() {
            Ok("buffer") => Self::Buffer,
            Ok("off") => Self::Off,
            _ => Self::Normal,
        }
    }
}

/// Shared, cloneable message sink.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    mode: LogMode,
    buffer: Arc<Mutex<Vec<String>>>,
}

impl Logger {
    /// Creates a logger with an explicit mode.
    #[must_use]
    pub fn new(mode: LogMode) -> Self {
        Self {
            mode,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Creates a logger whose mode comes from `LOG_MODE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(LogMode::from_env())
    }

    /// Returns the configured mode.
    #[must_use]
    pub fn mode(&self) -> LogMode {
        self.mode
    }

    /// Reports a progress line.
    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        match self.mode {
            LogMode::Normal => tracing::info!("{message}"),
            LogMode::Off => {}
            LogMode::Buffer => self.push(message.to_string()),
        }
    }

    /// Reports a warning line. Buffer mode prefixes it with `warning:` so
    /// tests can distinguish the two levels.
    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        match self.mode {
            LogMode::Normal => tracing::warn!("{message}"),
            LogMode::Off => {}
            LogMode::Buffer => self.push(format!("warning: {message}")),
        }
    }

    /// Returns a copy of every captured line (buffer mode only; empty
    /// otherwise).
    #[must_use]
    pub fn buffered(&self) -> Vec<String> {
        self.buffer.lock().expect("log buffer poisoned").clone()
    }

    /// Discards all captured lines.
    pub fn clear(&self) {
        self.buffer.lock().expect("log buffer poisoned").clear();
    }

    fn push(&self, line: String) {
        self.buffer.lock().expect("log buffer poisoned").push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_mode_captures_lines() {
        let logger = Logger::new(LogMode::Buffer);
        logger.info("applying migration");
        logger.warn("snapshot skipped");

        let lines = logger.buffered();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "applying migration");
        assert_eq!(lines[1], "warning: snapshot skipped");
    }

    #[test]
    fn off_mode_drops_everything() {
        let logger = Logger::new(LogMode::Off);
        logger.info("invisible");
        logger.warn("also invisible");
        assert!(logger.buffered().is_empty());
    }

    #[test]
    fn clones_share_the_buffer() {
        let logger = Logger::new(LogMode::Buffer);
        let clone = logger.clone();
        clone.info("from the clone");
        assert_eq!(logger.buffered(), vec!["from the clone".to_string()]);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let logger = Logger::new(LogMode::Buffer);
        logger.info("one");
        logger.clear();
        assert!(logger.buffered().is_empty());
    }
}

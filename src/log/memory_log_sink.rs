use std::sync::Mutex;

use crate::log::{log_level::LogLevel, log_sink::LogSink};

/// Keeps every line in memory. Used by tests that assert on what was logged.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        match self.lines.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl LogSink for MemoryLogSink {
    fn log(&self, level: LogLevel, msg: &str, _target: &'static str) {
        if let Ok(mut g) = self.lines.lock() {
            g.push((level, msg.to_owned()));
        }
    }
}

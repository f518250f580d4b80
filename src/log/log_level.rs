/// Defines the severity levels for log messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-packet and per-frame detail.
    Trace,
    /// Negotiation steps and chain wiring.
    Debug,
    /// Lifecycle milestones (push started, transport created).
    Info,
    /// Dropped frames, rejected packets and other recoverable trouble.
    Warn,
    /// Failures reported to the engine observer.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

use crate::log::log_level::LogLevel;

/// Destination for the engine's leveled log lines.
///
/// Components receive an `Arc<dyn LogSink>` at construction and log through the
/// `sink_*!` macros, so the backend can be swapped (tracing, capture in tests, nothing).
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}

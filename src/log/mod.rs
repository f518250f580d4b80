pub mod log_level;
pub mod log_macros;
pub mod log_sink;
pub mod memory_log_sink;
pub mod noop_log_sink;
pub mod tracing_log_sink;
pub use log_level::LogLevel;
pub use log_sink::LogSink;
pub use memory_log_sink::MemoryLogSink;
pub use noop_log_sink::NoopLogSink;
pub use tracing_log_sink::{TracingLogSink, init_tracing};

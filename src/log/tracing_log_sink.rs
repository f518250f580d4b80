use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    config::{ConfigError, LoggingConfig},
    log::{log_level::LogLevel, log_sink::LogSink},
};

/// Forwards sink lines to the global `tracing` dispatcher.
///
/// The originating module path travels as the `origin` field since tracing
/// targets must be static at the callsite.
#[derive(Debug, Clone, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        match level {
            LogLevel::Trace => tracing::trace!(origin = target, "{msg}"),
            LogLevel::Debug => tracing::debug!(origin = target, "{msg}"),
            LogLevel::Info => tracing::info!(origin = target, "{msg}"),
            LogLevel::Warn => tracing::warn!(origin = target, "{msg}"),
            LogLevel::Error => tracing::error!(origin = target, "{msg}"),
        }
    }
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to the
/// configured directive when the variable is unset.
///
/// # Errors
/// Returns [`ConfigError::InvalidLogFilter`] for a malformed directive and
/// [`ConfigError::LoggerInit`] if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directive) if !directive.is_empty() => EnvFilter::try_new(directive),
        _ => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| ConfigError::InvalidLogFilter(e.to_string()))?;

    fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_file(config.file_info)
        .with_line_number(config.file_info)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| ConfigError::LoggerInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_directive_is_rejected_before_install() {
        if std::env::var(EnvFilter::DEFAULT_ENV).is_ok() {
            return;
        }
        let cfg = LoggingConfig {
            level: "pushrtc=notalevel".into(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_tracing(&cfg),
            Err(ConfigError::InvalidLogFilter(_))
        ));
    }

    #[test]
    fn sink_logs_without_subscriber() {
        TracingLogSink.log(LogLevel::Info, "no subscriber installed", module_path!());
    }
}

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::rtp_format::payload_limits::PayloadLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {0}")]
    Invalid(&'static str),
    #[error("invalid log filter: {0}")]
    InvalidLogFilter(String),
    #[error("could not install log subscriber: {0}")]
    LoggerInit(String),
}

/// Engine configuration, read from a TOML file. Every field has a default so a
/// partial (or empty) file is valid.
///
/// ```toml
/// [logging]
/// level = "pushrtc=debug"
///
/// [packetizer]
/// max_payload_len = 1100
///
/// [signaling]
/// scheme = "http"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub packetizer: PacketizerConfig,
    pub rtp: RtpConfig,
    pub signaling: SignalingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub ansi: bool,
    pub file_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            ansi: true,
            file_info: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PacketizerConfig {
    pub max_payload_len: usize,
    pub single_packet_reduction_len: usize,
    pub first_packet_reduction_len: usize,
    pub last_packet_reduction_len: usize,
}

impl Default for PacketizerConfig {
    fn default() -> Self {
        let limits = PayloadLimits::default();
        Self {
            max_payload_len: limits.max_payload_len,
            single_packet_reduction_len: limits.single_packet_reduction_len,
            first_packet_reduction_len: limits.first_packet_reduction_len,
            last_packet_reduction_len: limits.last_packet_reduction_len,
        }
    }
}

impl PacketizerConfig {
    pub fn limits(&self) -> PayloadLimits {
        PayloadLimits {
            max_payload_len: self.max_payload_len,
            single_packet_reduction_len: self.single_packet_reduction_len,
            first_packet_reduction_len: self.first_packet_reduction_len,
            last_packet_reduction_len: self.last_packet_reduction_len,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RtpConfig {
    /// Logical capacity of every outgoing packet buffer, header included.
    pub packet_capacity: usize,
    /// Used when the remote offer lists no H264 codec.
    pub h264_payload_type: u8,
    pub video_clock_rate: u32,
}

impl Default for RtpConfig {
    fn default() -> Self {
        Self {
            packet_capacity: crate::rtp::rtp_packet::DEFAULT_CAPACITY,
            h264_payload_type: 107,
            video_clock_rate: 90_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SignalingConfig {
    /// Scheme used for the HTTP signaling endpoints derived from a push url.
    pub scheme: String,
    /// Upper bound a caller waits on a negotiation handle.
    pub negotiation_timeout_ms: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            scheme: "https".into(),
            negotiation_timeout_ms: 5_000,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Config = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.packetizer.max_payload_len == 0 {
            return Err(ConfigError::Invalid("packetizer.max_payload_len"));
        }
        // A full-size payload plus the fixed header must fit one packet buffer.
        let needed = crate::rtp::rtp_packet::FIXED_HEADER_SIZE + self.packetizer.max_payload_len;
        if self.rtp.packet_capacity < needed {
            return Err(ConfigError::Invalid("rtp.packet_capacity"));
        }
        if self.rtp.h264_payload_type > 127 {
            return Err(ConfigError::Invalid("rtp.h264_payload_type"));
        }
        if self.signaling.scheme != "http" && self.signaling.scheme != "https" {
            return Err(ConfigError::Invalid("signaling.scheme"));
        }
        Ok(())
    }
}

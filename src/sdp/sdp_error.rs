use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SdpError {
    #[error("empty session description")]
    Empty,
    #[error("no media sections")]
    NoMediaSections,
    #[error("malformed m= line: {0}")]
    InvalidMediaLine(String),
    #[error("malformed candidate: {0}")]
    InvalidCandidate(String),
    #[error("empty ice-ufrag")]
    EmptyIceUfrag,
    #[error("empty ice-pwd")]
    EmptyIcePwd,
    #[error("malformed rtpmap: {0}")]
    InvalidRtpMap(String),
    #[error("malformed {attribute} attribute: {line}")]
    InvalidAttribute { attribute: &'static str, line: String },
    #[error("no remote description applied")]
    NoRemoteDescription,
}

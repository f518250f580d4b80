use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RtpError {
    #[error("buffer too short")]
    TooShort,
    #[error("bad RTP version: {0}")]
    BadVersion(u8),
    #[error("CSRC count mismatch: expected {expected}x4 bytes, but only {buf_left} bytes remain")]
    CsrcCountMismatch { expected: usize, buf_left: usize },
    #[error("RTP header extension too short")]
    HeaderExtensionTooShort,
    #[error("padding bit set but payload shorter than padding count")]
    PaddingTooShort,
    #[error("packet of {needed} bytes exceeds buffer capacity {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },
}

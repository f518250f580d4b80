use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalingError {
    #[error("invalid push url {url}: {reason}")]
    InvalidUrl { url: String, reason: &'static str },
    #[error("http transport failed: {0}")]
    Transport(String),
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("malformed reply: {0}")]
    InvalidReply(String),
    #[error("server rejected request (errNo {err_no}): {msg}")]
    Rejected { err_no: i64, msg: String },
    #[error("reply carries no offer sdp")]
    MissingOffer,
}

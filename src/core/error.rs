use thiserror::Error;

use crate::{media::MediaError, sdp::SdpError, signaling_client::SignalingError};

/// Every failure the engine reports to callers and to the [`EngineObserver`].
///
/// [`EngineObserver`]: crate::core::observer::EngineObserver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no video device at index {0}")]
    NoVideoDevice(usize),
    #[error("could not create video capture: {0}")]
    VideoCreateCapture(String),
    #[error("video device reports no capabilities")]
    VideoNoCapabilities,
    #[error("chain connect failed: {0}")]
    ChainConnect(#[source] MediaError),
    #[error("chain start failed: {0}")]
    ChainStart(#[source] MediaError),
    #[error("push has no video source")]
    PushNoVideoSource,
    #[error("invalid push url: {0}")]
    PushInvalidUrl(#[source] SignalingError),
    #[error("push offer request failed: {0}")]
    PushRequestOffer(#[source] SignalingError),
    #[error("remote offer rejected: {0}")]
    PushInvalidRemoteSdp(#[source] SdpError),
    #[error("sending the answer failed: {0}")]
    PushSendAnswer(#[source] SignalingError),
    #[error("ICE connection failed on transport {0}")]
    PushIceConnection(String),
    #[error("a negotiation is already in flight")]
    NegotiationInProgress,
    #[error("negotiation cancelled")]
    NegotiationCancelled,
    #[error("engine is shut down")]
    EngineShutdown,
    #[error("task queue {name}: {reason}")]
    TaskQueue { name: String, reason: String },
}

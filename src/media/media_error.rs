use thiserror::Error;

use super::pin::{NodeId, PinRef};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("unknown pin {0:?}")]
    UnknownPin(PinRef),
    #[error("incompatible formats between {from:?} and {to:?}")]
    IncompatibleFormat { from: PinRef, to: PinRef },
    #[error("no compatible pin pair between {from} and {to}")]
    NoCompatiblePins { from: String, to: String },
    #[error("input pin {0:?} already has an upstream")]
    InPinTaken(PinRef),
    #[error("connection would create a cycle")]
    Cycle,
    #[error("chain is running; connections are fixed")]
    ChainRunning,
    #[error("a frame holds at most 4 planes, got {0}")]
    TooManyPlanes(usize),
    #[error("{node} failed to start: {reason}")]
    StartFailed { node: String, reason: String },
    #[error("device error: {0}")]
    Device(String),
    #[error("encoder error: {0}")]
    Encoder(String),
    #[error("negotiation: {0}")]
    Negotiation(String),
}

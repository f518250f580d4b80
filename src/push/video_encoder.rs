use bytes::Bytes;
use thiserror::Error;

use crate::media::{MediaFrame, VideoFormat};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("encoder not started")]
    NotStarted,
    #[error("unsupported input frame: {0}")]
    InvalidFrame(String),
    #[error("encoder backend: {0}")]
    Backend(String),
}

/// One encoded access unit in Annex-B form (start codes included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub data: Bytes,
    pub idr: bool,
}

/// H.264 encoder behind the encoder filter.
pub trait VideoEncoder: Send {
    fn start(&mut self, format: &VideoFormat) -> Result<(), EncodeError>;
    /// `Ok(None)` when the encoder skipped the frame (rate control).
    fn encode(&mut self, frame: &MediaFrame) -> Result<Option<EncodedFrame>, EncodeError>;
    fn request_keyframe(&mut self);
    fn stop(&mut self);
}

/// Creates a fresh encoder for every push stream.
pub trait VideoEncoderFactory: Send + Sync {
    fn create_encoder(&self) -> Result<Box<dyn VideoEncoder>, EncodeError>;
}

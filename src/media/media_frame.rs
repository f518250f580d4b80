use bytes::Bytes;

use super::{media_error::MediaError, media_format::MediaFormat};

pub const MAX_PLANES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub data: Bytes,
    /// Bytes per row; equals `data.len()` for unstructured payloads.
    pub stride: usize,
}

/// One media sample. Shared down the chain as `Arc<MediaFrame>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFrame {
    pub format: MediaFormat,
    planes: Vec<Plane>,
    pub capture_time_ms: i64,
    pub rtp_timestamp: u32,
}

impl MediaFrame {
    pub fn new(format: MediaFormat, planes: Vec<Plane>) -> Result<Self, MediaError> {
        if planes.len() > MAX_PLANES {
            return Err(MediaError::TooManyPlanes(planes.len()));
        }
        Ok(Self {
            format,
            planes,
            capture_time_ms: 0,
            rtp_timestamp: 0,
        })
    }

    /// Single-plane frame, e.g. an encoded bitstream.
    pub fn packed(format: MediaFormat, data: Bytes) -> Self {
        let stride = data.len();
        Self {
            format,
            planes: vec![Plane { data, stride }],
            capture_time_ms: 0,
            rtp_timestamp: 0,
        }
    }

    pub fn with_capture_time(mut self, capture_time_ms: i64) -> Self {
        self.capture_time_ms = capture_time_ms;
        self
    }

    pub fn with_rtp_timestamp(mut self, rtp_timestamp: u32) -> Self {
        self.rtp_timestamp = rtp_timestamp;
        self
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    pub fn data_len(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }
}

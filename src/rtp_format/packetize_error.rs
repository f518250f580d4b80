use thiserror::Error;

use super::rtp_packetizer::VideoCodecType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketizeError {
    #[error("access unit contains no NAL units")]
    NoNalUnits,
    #[error("NAL unit {index} ({size} bytes) cannot be fragmented under the payload limits")]
    LimitsTooSmall { index: usize, size: usize },
    #[error("packet buffer of {capacity} bytes cannot hold the next payload")]
    BufferTooSmall { capacity: usize },
    #[error("no packetizer for codec {0:?}")]
    UnsupportedCodec(VideoCodecType),
}

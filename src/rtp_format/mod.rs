pub mod h264_packetizer;
pub mod nalu;
pub mod packetize_error;
pub mod payload_limits;
pub mod rtp_packetizer;
pub use h264_packetizer::RtpPacketizerH264;
pub use packetize_error::PacketizeError;
pub use payload_limits::{PayloadLimits, split_about_equal};
pub use rtp_packetizer::{RtpPacketizer, VideoCodecType, VideoPacketizer, create_packetizer};

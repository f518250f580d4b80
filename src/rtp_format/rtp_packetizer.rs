use super::{
    h264_packetizer::RtpPacketizerH264, packetize_error::PacketizeError,
    payload_limits::PayloadLimits,
};
use crate::rtp::rtp_packet::RtpPacket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecType {
    H264,
    Vp8,
}

impl VideoCodecType {
    /// Maps an `a=rtpmap` encoding name (case-insensitive).
    pub fn from_encoding_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("H264") {
            Some(VideoCodecType::H264)
        } else if name.eq_ignore_ascii_case("VP8") {
            Some(VideoCodecType::Vp8)
        } else {
            None
        }
    }
}

pub trait RtpPacketizer {
    /// Packets still to be produced for the current frame.
    fn num_packets(&self) -> usize;
    /// Fills `packet` with the next payload and sets the marker on the last one.
    fn next_packet(&mut self, packet: &mut RtpPacket) -> bool;
}

impl RtpPacketizer for RtpPacketizerH264<'_> {
    fn num_packets(&self) -> usize {
        RtpPacketizerH264::num_packets(self)
    }

    fn next_packet(&mut self, packet: &mut RtpPacket) -> bool {
        RtpPacketizerH264::next_packet(self, packet)
    }
}

/// A packetizer for one encoded frame, tagged by codec.
#[derive(Debug)]
pub enum VideoPacketizer<'a> {
    H264(RtpPacketizerH264<'a>),
}

impl RtpPacketizer for VideoPacketizer<'_> {
    fn num_packets(&self) -> usize {
        match self {
            VideoPacketizer::H264(p) => p.num_packets(),
        }
    }

    fn next_packet(&mut self, packet: &mut RtpPacket) -> bool {
        match self {
            VideoPacketizer::H264(p) => p.next_packet(packet),
        }
    }
}

pub fn create_packetizer(
    codec: VideoCodecType,
    payload: &[u8],
    limits: PayloadLimits,
) -> Result<VideoPacketizer<'_>, PacketizeError> {
    match codec {
        VideoCodecType::H264 => Ok(VideoPacketizer::H264(RtpPacketizerH264::new(payload, limits)?)),
        other => Err(PacketizeError::UnsupportedCodec(other)),
    }
}

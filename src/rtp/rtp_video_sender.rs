use rand::{RngCore, rngs::OsRng};

use super::rtp_packet::RtpPacket;
use crate::rtp_format::{
    PacketizeError, PayloadLimits, RtpPacketizer, VideoCodecType, create_packetizer,
};

/// Per-stream send state for one outgoing video track.
///
/// Turns encoded access units into stamped RTP packets: payload type, SSRC,
/// a wrapping sequence number and the frame's RTP timestamp. A frame either
/// yields its complete packet sequence or nothing; the sequence number only
/// advances for frames that made it out whole.
#[derive(Debug, Clone)]
pub struct RtpVideoSender {
    codec: VideoCodecType,
    payload_type: u8,
    ssrc: u32,
    next_sequence: u16,
    packet_capacity: usize,
    limits: PayloadLimits,
}

impl RtpVideoSender {
    pub fn new(
        codec: VideoCodecType,
        payload_type: u8,
        ssrc: u32,
        initial_sequence: u16,
        packet_capacity: usize,
        limits: PayloadLimits,
    ) -> Self {
        Self {
            codec,
            payload_type,
            ssrc,
            next_sequence: initial_sequence,
            packet_capacity,
            limits,
        }
    }

    /// Same as [`new`](Self::new) with a random starting sequence number (RFC 3550 §5.1).
    pub fn with_random_sequence(
        codec: VideoCodecType,
        payload_type: u8,
        ssrc: u32,
        packet_capacity: usize,
        limits: PayloadLimits,
    ) -> Self {
        let initial = (OsRng.next_u32() & 0xFFFF) as u16;
        Self::new(codec, payload_type, ssrc, initial, packet_capacity, limits)
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn next_sequence(&self) -> u16 {
        self.next_sequence
    }

    pub fn packetize_frame(
        &mut self,
        access_unit: &[u8],
        rtp_timestamp: u32,
    ) -> Result<Vec<RtpPacket>, PacketizeError> {
        let mut packetizer = create_packetizer(self.codec, access_unit, self.limits)?;
        let mut packets = Vec::with_capacity(packetizer.num_packets());
        let mut seq = self.next_sequence;
        while packetizer.num_packets() > 0 {
            let mut packet = RtpPacket::with_capacity(self.packet_capacity);
            if !packetizer.next_packet(&mut packet) {
                return Err(PacketizeError::BufferTooSmall {
                    capacity: self.packet_capacity,
                });
            }
            packet.set_payload_type(self.payload_type);
            packet.set_ssrc(self.ssrc);
            packet.set_timestamp(rtp_timestamp);
            packet.set_sequence_number(seq);
            seq = seq.wrapping_add(1);
            packets.push(packet);
        }
        self.next_sequence = seq;
        Ok(packets)
    }
}

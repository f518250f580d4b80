use std::io;

use crate::rtp::RtpPacket;

/// Network egress for finished RTP packets, implemented outside this crate
/// (typically on top of the ICE transport selected for `transport_mid`).
///
/// Called on the network queue.
pub trait PacketSender: Send + Sync {
    fn send_rtp(&self, transport_mid: &str, packet: &RtpPacket) -> io::Result<()>;
}

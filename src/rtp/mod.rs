pub mod rtp_error;
pub mod rtp_packet;
pub mod rtp_video_sender;
pub use rtp_error::RtpError;
pub use rtp_packet::RtpPacket;
pub use rtp_video_sender::RtpVideoSender;

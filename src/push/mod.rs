//! The push pipeline: capture source, encoder filter and network sink wired
//! into a [`MediaChain`](crate::media::MediaChain) by [`PushStream`].
pub mod h264_encoder_filter;
pub mod media_sink;
pub mod negotiation;
#[cfg(feature = "openh264")]
pub mod openh264_encoder;
pub mod packet_sender;
pub mod push_stream;
pub mod video_encoder;
pub mod video_source;
pub use h264_encoder_filter::H264EncoderFilter;
pub use media_sink::{MediaSink, SinkHandle};
pub use negotiation::{CancellationToken, NegotiationHandle};
#[cfg(feature = "openh264")]
pub use openh264_encoder::{OpenH264Encoder, OpenH264EncoderFactory};
pub use packet_sender::PacketSender;
pub use push_stream::{PushDeps, PushStream};
pub use video_encoder::{EncodeError, EncodedFrame, VideoEncoder, VideoEncoderFactory};
pub use video_source::{VideoCapture, VideoSource};

pub mod candidate;
pub mod codec_info;
pub mod sdp_error;
pub mod sdp_parser;
pub mod sdp_writer;
pub mod session_description;
pub use candidate::{Candidate, CandidateType};
pub use codec_info::{CodecInfo, RtpMap};
pub use sdp_error::SdpError;
pub use sdp_parser::parse_session_description;
pub use sdp_writer::write_session_description;
pub use session_description::{
    ContentGroup, MediaContentDescription, MediaKind, RtpDirection, SdpType, SessionDescription,
    SsrcGroup, StreamParams, TransportDescription,
};

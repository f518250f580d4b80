pub mod media_chain;
pub mod media_error;
pub mod media_format;
pub mod media_frame;
pub mod media_object;
pub mod pin;
pub use media_chain::{ChainInput, FrameConsumer, MediaChain};
pub use media_error::MediaError;
pub use media_format::{AudioFormat, MediaFormat, VideoFormat, VideoSubtype};
pub use media_frame::{MediaFrame, Plane};
pub use media_object::{FrameEmitter, FrameOrigin, MediaObject, ObjectState};
pub use pin::{InPin, NodeId, OutPin, PinRef};

//! HTTP signaling with the push server: request an offer, deliver the answer,
//! stop the stream.
pub mod http;
pub mod push_url;
pub mod signaling_client;
pub mod signaling_error;
pub use http::{HttpClient, HttpReply, HttpRequest, ReplyCallback};
pub use push_url::PushUrl;
pub use signaling_client::{RemoteOffer, SignalingClient};
pub use signaling_error::SignalingError;

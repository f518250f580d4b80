//! Offer/answer handling and the hand-off of negotiated transport
//! parameters to the external ICE agent.
pub mod ice_agent;
pub mod ice_credentials;
pub mod peer_connection;
pub mod transport_controller;
pub use ice_agent::{
    IceAgent, IceAgentFactory, IceComponent, IceParameters, IceStateListener, IceTransportState,
};
pub use ice_credentials::{gen_token, random_ssrc};
pub use peer_connection::{PeerConnection, RtcOfferAnswerOptions};
pub use transport_controller::TransportController;

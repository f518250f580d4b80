use std::fmt;
use std::sync::{Arc, Weak};

use crate::sdp::Candidate;

/// ICE component of a transport. With rtcp-mux only `Rtp` is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IceComponent {
    Rtp = 1,
    Rtcp = 2,
}

impl IceComponent {
    pub fn id(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IceParameters {
    pub ufrag: String,
    pub pwd: String,
}

impl IceParameters {
    pub fn new(ufrag: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            ufrag: ufrag.into(),
            pwd: pwd.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceTransportState {
    New,
    Checking,
    Connected,
    Completed,
    Failed,
    Closed,
}

impl fmt::Display for IceTransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IceTransportState::New => "new",
            IceTransportState::Checking => "checking",
            IceTransportState::Connected => "connected",
            IceTransportState::Completed => "completed",
            IceTransportState::Failed => "failed",
            IceTransportState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Receives transport state changes from an [`IceAgent`].
pub trait IceStateListener: Send + Sync {
    fn on_ice_state(&self, mid: &str, state: IceTransportState);
}

/// Connectivity establishment, implemented outside this crate.
///
/// Calls arrive on the network queue. The agent reports state changes to the
/// registered listener from whatever thread it runs its checks on.
pub trait IceAgent: Send + Sync {
    fn create_transport(&self, mid: &str, component: IceComponent);
    fn set_remote_ice_params(&self, mid: &str, component: IceComponent, params: &IceParameters);
    fn set_local_ice_params(&self, mid: &str, component: IceComponent, params: &IceParameters);
    fn add_remote_candidate(&self, mid: &str, component: IceComponent, candidate: &Candidate);
    fn set_state_listener(&self, listener: Weak<dyn IceStateListener>);
}

/// Creates one agent per push stream.
pub trait IceAgentFactory: Send + Sync {
    fn create_agent(&self) -> Arc<dyn IceAgent>;
}

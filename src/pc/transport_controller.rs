use std::sync::Arc;

use super::ice_agent::{IceAgent, IceComponent, IceParameters};
use crate::{
    log::log_sink::LogSink,
    sdp::{MediaContentDescription, SessionDescription},
    sink_debug, sink_warn,
};

/// Turns negotiated SDP state into calls on the ICE agent.
///
/// A bundled section other than the bundle's first mid shares that first
/// transport, so no transport is created for it. Only the RTP component is
/// created; RTCP is always muxed.
pub struct TransportController {
    ice: Arc<dyn IceAgent>,
    logger: Arc<dyn LogSink>,
}

impl TransportController {
    pub fn new(ice: Arc<dyn IceAgent>, logger: Arc<dyn LogSink>) -> Self {
        Self { ice, logger }
    }

    pub fn ice_agent(&self) -> &Arc<dyn IceAgent> {
        &self.ice
    }

    /// Mids of `desc` that own a transport.
    pub fn transport_mids(desc: &SessionDescription) -> Vec<&str> {
        Self::owning_contents(desc).map(|c| c.mid.as_str()).collect()
    }

    fn owning_contents(desc: &SessionDescription) -> impl Iterator<Item = &MediaContentDescription> {
        let bundle = desc.bundle_group();
        desc.contents.iter().filter(move |content| match bundle {
            Some(group) if group.has_content_name(&content.mid) => {
                group.first_name() == Some(content.mid.as_str())
            }
            _ => true,
        })
    }

    pub fn set_remote_description(&self, desc: &SessionDescription) {
        for content in Self::owning_contents(desc) {
            let mid = content.mid.as_str();
            sink_debug!(self.logger, "[TransportController] transport for mid={}", mid);
            self.ice.create_transport(mid, IceComponent::Rtp);

            match desc.transport_info(mid) {
                Some(td) => self.ice.set_remote_ice_params(
                    mid,
                    IceComponent::Rtp,
                    &IceParameters::new(td.ice_ufrag.as_str(), td.ice_pwd.as_str()),
                ),
                None => sink_warn!(self.logger, "[TransportController] no transport info for mid={}", mid),
            }

            for candidate in &content.candidates {
                self.ice.add_remote_candidate(mid, IceComponent::Rtp, candidate);
            }
        }
    }

    /// Applies our own credentials to the transports created for the remote side.
    pub fn set_local_description(&self, desc: &SessionDescription) {
        for content in Self::owning_contents(desc) {
            let mid = content.mid.as_str();
            if let Some(td) = desc.transport_info(mid) {
                self.ice.set_local_ice_params(
                    mid,
                    IceComponent::Rtp,
                    &IceParameters::new(td.ice_ufrag.as_str(), td.ice_pwd.as_str()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::pc::ice_agent::IceStateListener;
    use crate::sdp::{Candidate, ContentGroup, MediaKind, SdpType, TransportDescription};
    use std::sync::{Mutex, Weak};

    #[derive(Default)]
    struct RecordingAgent {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingAgent {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
        fn record(&self, s: String) {
            self.calls.lock().unwrap().push(s);
        }
    }

    impl IceAgent for RecordingAgent {
        fn create_transport(&self, mid: &str, c: IceComponent) {
            self.record(format!("create {mid} {}", c.id()));
        }
        fn set_remote_ice_params(&self, mid: &str, _c: IceComponent, p: &IceParameters) {
            self.record(format!("remote {mid} {}", p.ufrag));
        }
        fn set_local_ice_params(&self, mid: &str, _c: IceComponent, p: &IceParameters) {
            self.record(format!("local {mid} {}", p.ufrag));
        }
        fn add_remote_candidate(&self, mid: &str, _c: IceComponent, cand: &Candidate) {
            self.record(format!("candidate {mid} {}:{}", cand.address, cand.port));
        }
        fn set_state_listener(&self, _l: Weak<dyn IceStateListener>) {}
    }

    fn description(bundle: Option<&[&str]>) -> SessionDescription {
        let mut sd = SessionDescription::new(SdpType::Offer);
        if let Some(mids) = bundle {
            let mut g = ContentGroup::new("BUNDLE");
            mids.iter().for_each(|m| g.add_content_name(m));
            sd.add_group(g);
        }
        for (kind, port) in [(MediaKind::Audio, 5000), (MediaKind::Video, 6000)] {
            let mut c = MediaContentDescription::new(kind);
            c.candidates.push(
                format!("1 1 udp 2130706431 10.0.0.1 {port} typ host")
                    .parse()
                    .unwrap(),
            );
            sd.transport_infos.push(TransportDescription {
                mid: c.mid.clone(),
                ice_ufrag: format!("{kind}-uf"),
                ice_pwd: "p".repeat(22),
            });
            sd.contents.push(c);
        }
        sd
    }

    #[test]
    fn bundle_creates_only_the_first_transport() {
        let agent = Arc::new(RecordingAgent::default());
        let tc = TransportController::new(agent.clone(), Arc::new(NoopLogSink));
        tc.set_remote_description(&description(Some(&["audio", "video"][..])));
        assert_eq!(
            agent.calls(),
            vec![
                "create audio 1",
                "remote audio audio-uf",
                "candidate audio 10.0.0.1:5000",
            ]
        );
    }

    #[test]
    fn without_bundle_every_section_gets_a_transport() {
        let agent = Arc::new(RecordingAgent::default());
        let tc = TransportController::new(agent.clone(), Arc::new(NoopLogSink));
        let sd = description(None);
        tc.set_remote_description(&sd);
        let creates: Vec<_> = agent
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("create"))
            .collect();
        assert_eq!(creates, vec!["create audio 1", "create video 1"]);
        assert_eq!(TransportController::transport_mids(&sd), vec!["audio", "video"]);
    }

    #[test]
    fn sections_outside_the_bundle_keep_their_own_transport() {
        let sd = description(Some(&["video"][..]));
        assert_eq!(TransportController::transport_mids(&sd), vec!["audio", "video"]);
        let sd = description(Some(&["video", "audio"][..]));
        assert_eq!(TransportController::transport_mids(&sd), vec!["video"]);
    }

    #[test]
    fn local_description_sets_local_credentials() {
        let agent = Arc::new(RecordingAgent::default());
        let tc = TransportController::new(agent.clone(), Arc::new(NoopLogSink));
        tc.set_local_description(&description(Some(&["audio", "video"][..])));
        assert_eq!(agent.calls(), vec!["local audio audio-uf"]);
    }
}

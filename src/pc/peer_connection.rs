use std::sync::Arc;

use rand::{RngCore, rngs::OsRng};

use super::{
    ice_agent::IceAgent,
    ice_credentials::{CNAME_LEN, ICE_PWD_LEN, ICE_UFRAG_LEN, gen_token, random_ssrc},
    transport_controller::TransportController,
};
use crate::{
    config::RtpConfig,
    log::log_sink::LogSink,
    sdp::{
        CodecInfo, ContentGroup, MediaContentDescription, MediaKind, RtpDirection, SdpError,
        SdpType, SessionDescription, StreamParams, TransportDescription,
        parse_session_description, session_description::GROUP_BUNDLE, write_session_description,
    },
    sink_debug, sink_info, sink_warn,
};

const RTX_PAYLOAD_TYPE: u8 = 99;

/// What the local side sends and receives, per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtcOfferAnswerOptions {
    pub send_audio: bool,
    pub recv_audio: bool,
    pub send_video: bool,
    pub recv_video: bool,
    /// Put every section in one BUNDLE group.
    pub use_rtp_mux: bool,
    pub use_rtcp_mux: bool,
}

impl Default for RtcOfferAnswerOptions {
    fn default() -> Self {
        Self {
            send_audio: true,
            recv_audio: true,
            send_video: true,
            recv_video: true,
            use_rtp_mux: true,
            use_rtcp_mux: true,
        }
    }
}

impl RtcOfferAnswerOptions {
    /// Video out only; audio is answered inactive.
    pub fn push_video() -> Self {
        Self {
            send_audio: false,
            recv_audio: false,
            send_video: true,
            recv_video: false,
            ..Self::default()
        }
    }

    fn send_recv(&self, kind: MediaKind) -> (bool, bool) {
        match kind {
            MediaKind::Audio => (self.send_audio, self.recv_audio),
            MediaKind::Video => (self.send_video, self.recv_video),
        }
    }
}

/// Everything the RTP sender needs once negotiation has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSendParams {
    /// Mid of the transport the packets travel on (the bundle's first mid when bundled).
    pub transport_mid: String,
    pub payload_type: u8,
    pub ssrc: u32,
    pub rtx_ssrc: Option<u32>,
}

/// Answering side of one offer/answer exchange.
pub struct PeerConnection {
    transport: TransportController,
    rtp: RtpConfig,
    remote: Option<SessionDescription>,
    local: Option<SessionDescription>,
    logger: Arc<dyn LogSink>,
}

impl PeerConnection {
    pub fn new(ice: Arc<dyn IceAgent>, rtp: RtpConfig, logger: Arc<dyn LogSink>) -> Self {
        Self {
            transport: TransportController::new(ice, logger.clone()),
            rtp,
            remote: None,
            local: None,
            logger,
        }
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote.as_ref()
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local.as_ref()
    }

    pub fn transport_controller(&self) -> &TransportController {
        &self.transport
    }

    /// Parses `sdp` as the remote offer and hands it to the transport controller.
    /// On failure nothing is stored and the agent is left untouched.
    pub fn set_remote_sdp(&mut self, sdp: &str) -> Result<(), SdpError> {
        let desc = match parse_session_description(sdp, SdpType::Offer) {
            Ok(desc) => desc,
            Err(e) => {
                sink_warn!(self.logger, "[PeerConnection] remote sdp rejected: {}", e);
                return Err(e);
            }
        };
        sink_debug!(
            self.logger,
            "[PeerConnection] remote offer with {} sections",
            desc.contents.len()
        );
        self.transport.set_remote_description(&desc);
        self.remote = Some(desc);
        Ok(())
    }

    /// Builds the answer to the stored remote offer and returns it as SDP text.
    pub fn create_answer(&mut self, options: &RtcOfferAnswerOptions) -> Result<String, SdpError> {
        let remote = self.remote.as_ref().ok_or(SdpError::NoRemoteDescription)?;

        let mut answer = SessionDescription::new(SdpType::Answer);
        answer.session_id = OsRng.next_u64() >> 1;

        let ice_ufrag = gen_token(ICE_UFRAG_LEN);
        let ice_pwd = gen_token(ICE_PWD_LEN);
        let cname = gen_token(CNAME_LEN);
        let mut taken_ssrcs = Vec::new();

        for offered in &remote.contents {
            let (send, recv) = options.send_recv(offered.kind);
            let mut content = MediaContentDescription::new(offered.kind);
            content.mid = offered.mid.clone();
            content.protocol = offered.protocol.clone();
            content.direction = RtpDirection::from_send_recv(send, recv);
            content.rtcp_mux = options.use_rtcp_mux;
            content.codecs = if offered.codecs.is_empty() {
                self.default_codecs(offered.kind)
            } else {
                offered.codecs.clone()
            };

            if send {
                let ssrc = random_ssrc(&taken_ssrcs);
                taken_ssrcs.push(ssrc);
                let mut stream = StreamParams {
                    id: gen_token(CNAME_LEN),
                    cname: cname.clone(),
                    ssrcs: vec![ssrc],
                    ssrc_groups: Vec::new(),
                };
                if offered.kind == MediaKind::Video {
                    let rtx = random_ssrc(&taken_ssrcs);
                    taken_ssrcs.push(rtx);
                    stream.add_fid_ssrc(ssrc, rtx);
                }
                content.streams.push(stream);
            }

            answer.transport_infos.push(TransportDescription {
                mid: content.mid.clone(),
                ice_ufrag: ice_ufrag.clone(),
                ice_pwd: ice_pwd.clone(),
            });
            answer.contents.push(content);
        }

        if options.use_rtp_mux {
            let mut bundle = ContentGroup::new(GROUP_BUNDLE);
            for content in &answer.contents {
                bundle.add_content_name(&content.mid);
            }
            answer.add_group(bundle);
        }

        let text = write_session_description(&answer);
        self.transport.set_local_description(&answer);
        sink_info!(
            self.logger,
            "[PeerConnection] answer built with {} sections",
            answer.contents.len()
        );
        self.local = Some(answer);
        Ok(text)
    }

    /// Payload type, SSRC and transport of the video we send, once answered.
    pub fn video_send_params(&self) -> Option<VideoSendParams> {
        let local = self.local.as_ref()?;
        let video = local.first_content_of(MediaKind::Video)?;
        let stream = video.streams.first()?;
        let ssrc = stream.first_ssrc()?;
        let payload_type = video
            .codec_by_name("H264")
            .or_else(|| video.codecs.iter().find(|c| !c.is_rtx()))?
            .payload_type;
        let transport_mid = match local.bundle_group() {
            Some(group) if group.has_content_name(&video.mid) => group.first_name()?.to_owned(),
            _ => video.mid.clone(),
        };
        Some(VideoSendParams {
            transport_mid,
            payload_type,
            ssrc,
            rtx_ssrc: stream.fid_ssrc(ssrc),
        })
    }

    fn default_codecs(&self, kind: MediaKind) -> Vec<CodecInfo> {
        match kind {
            MediaKind::Audio => vec![CodecInfo::opus()],
            MediaKind::Video => {
                let pt = self.rtp.h264_payload_type;
                vec![CodecInfo::h264(pt), CodecInfo::rtx(RTX_PAYLOAD_TYPE, pt)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::log::NoopLogSink;
    use crate::pc::ice_agent::{IceComponent, IceParameters, IceStateListener};
    use crate::sdp::{Candidate, SsrcGroup};
    use std::sync::{Mutex, Weak};

    #[derive(Default)]
    struct CountingAgent {
        transports: Mutex<Vec<String>>,
        local: Mutex<Vec<(String, IceParameters)>>,
    }

    impl IceAgent for CountingAgent {
        fn create_transport(&self, mid: &str, _c: IceComponent) {
            self.transports.lock().unwrap().push(mid.to_owned());
        }
        fn set_remote_ice_params(&self, _m: &str, _c: IceComponent, _p: &IceParameters) {}
        fn set_local_ice_params(&self, mid: &str, _c: IceComponent, p: &IceParameters) {
            self.local.lock().unwrap().push((mid.to_owned(), p.clone()));
        }
        fn add_remote_candidate(&self, _m: &str, _c: IceComponent, _cand: &Candidate) {}
        fn set_state_listener(&self, _l: Weak<dyn IceStateListener>) {}
    }

    const OFFER: &str = "v=0\r\n\
a=group:BUNDLE 0 1\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
a=ice-ufrag:rA\r\n\
a=ice-pwd:remotepasswordremotepass\r\n\
a=mid:0\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96\r\n\
a=ice-ufrag:rV\r\n\
a=ice-pwd:remotepasswordremotepass\r\n\
a=candidate:1 1 udp 2130706431 10.0.0.1 9000 typ host\r\n\
a=mid:1\r\n\
a=rtpmap:96 H264/90000\r\n";

    fn pc() -> (PeerConnection, Arc<CountingAgent>) {
        let agent = Arc::new(CountingAgent::default());
        let pc = PeerConnection::new(agent.clone(), RtpConfig::default(), Arc::new(NoopLogSink));
        (pc, agent)
    }

    #[test]
    fn answer_requires_a_remote_offer() {
        let (mut pc, _) = pc();
        assert_eq!(
            pc.create_answer(&RtcOfferAnswerOptions::default()),
            Err(SdpError::NoRemoteDescription)
        );
    }

    #[test]
    fn failed_parse_keeps_no_remote_description() {
        let (mut pc, agent) = pc();
        assert!(pc.set_remote_sdp("m=video 9\r\n").is_err());
        assert!(pc.remote_description().is_none());
        assert!(agent.transports.lock().unwrap().is_empty());
    }

    #[test]
    fn push_answer_shape() {
        let (mut pc, agent) = pc();
        pc.set_remote_sdp(OFFER).unwrap();
        assert_eq!(*agent.transports.lock().unwrap(), vec!["0"]);

        let text = pc.create_answer(&RtcOfferAnswerOptions::push_video()).unwrap();
        assert!(text.contains("a=group:BUNDLE 0 1\r\n"));

        let local = pc.local_description().unwrap();
        let audio = local.content("0").unwrap();
        let video = local.content("1").unwrap();
        assert_eq!(audio.direction, RtpDirection::Inactive);
        assert!(audio.streams.is_empty());
        assert_eq!(video.direction, RtpDirection::SendOnly);
        assert_eq!(video.codecs[0].payload_type, 96);

        let stream = &video.streams[0];
        assert_eq!(stream.ssrcs.len(), 2);
        assert_eq!(
            stream.ssrc_groups,
            vec![SsrcGroup {
                semantics: "FID".into(),
                ssrcs: stream.ssrcs.clone(),
            }]
        );
        assert_eq!(stream.cname.len(), CNAME_LEN);

        // One set of credentials for the whole answer.
        assert!(local.transport_infos.iter().all(|t| t.ice_ufrag == local.transport_infos[0].ice_ufrag));
        let applied = agent.local.lock().unwrap().clone();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].0, "0");
        assert_eq!(applied[0].1.ufrag.len(), ICE_UFRAG_LEN);

        let params = pc.video_send_params().unwrap();
        assert_eq!(params.transport_mid, "0");
        assert_eq!(params.payload_type, 96);
        assert_eq!(params.ssrc, stream.ssrcs[0]);
        assert_eq!(params.rtx_ssrc, Some(stream.ssrcs[1]));
    }

    #[test]
    fn sending_both_kinds_shares_one_cname() {
        let (mut pc, _) = pc();
        pc.set_remote_sdp(OFFER).unwrap();
        pc.create_answer(&RtcOfferAnswerOptions::default()).unwrap();
        let local = pc.local_description().unwrap();
        let audio = &local.contents[0].streams[0];
        let video = &local.contents[1].streams[0];
        assert_eq!(audio.cname, video.cname);
        assert_eq!(audio.ssrcs.len(), 1);
        assert!(!video.ssrcs.contains(&audio.ssrcs[0]));
    }

    #[test]
    fn defaults_fill_in_when_the_offer_lists_no_codecs() {
        let (mut pc, _) = pc();
        pc.set_remote_sdp("m=video 9 UDP/TLS/RTP/SAVPF 107\r\na=ice-ufrag:abcd\r\na=ice-pwd:abcdefghijklmnopqrstuvwx\r\n")
            .unwrap();
        let opts = RtcOfferAnswerOptions {
            use_rtp_mux: false,
            ..RtcOfferAnswerOptions::push_video()
        };
        let text = pc.create_answer(&opts).unwrap();
        assert!(!text.contains("a=group:BUNDLE"));
        assert!(text.contains("a=rtpmap:107 H264/90000\r\n"));
        assert!(text.contains("a=fmtp:99 apt=107\r\n"));
        assert_eq!(pc.video_send_params().unwrap().transport_mid, "video");
    }
}

//! Network end of the push chain.
//!
//! Starting the sink opens one offer/answer round with the push server:
//!
//! 1. `push` request on the network queue, reply re-posted to the network queue;
//! 2. remote offer applied, answer built (video send-only, audio inactive);
//! 3. `sendanswer`, after which the round completes.
//!
//! Every reply callback holds the sink weakly and checks the round's
//! cancellation token first, so a reply that arrives after `stop` is dropped.
//! Encoded frames are packetized and sent once the round completed and ICE
//! reports the transport connected.

use std::sync::{
    Arc, Mutex, Weak,
    atomic::{AtomicBool, Ordering},
};

use super::{
    negotiation::{CancellationToken, NegotiationCompleter, NegotiationHandle, negotiation_channel},
    packet_sender::PacketSender,
};
use crate::{
    core::{EngineContext, EngineError, PusherId, sync::lock},
    log::log_sink::LogSink,
    media::{
        FrameEmitter, FrameOrigin, InPin, MediaError, MediaFormat, MediaFrame, MediaObject,
        OutPin, VideoFormat, VideoSubtype,
    },
    pc::{IceAgent, IceStateListener, IceTransportState, PeerConnection, RtcOfferAnswerOptions},
    rtp::RtpVideoSender,
    rtp_format::VideoCodecType,
    signaling_client::{PushUrl, RemoteOffer, SignalingClient, SignalingError},
    sink_debug, sink_error, sink_info, sink_warn,
};

#[derive(Default)]
struct SinkState {
    token: Option<CancellationToken>,
    completer: Option<NegotiationCompleter>,
    /// Handle of the round opened by the last `start`, until the owner takes it.
    pending: Option<NegotiationHandle>,
    negotiated: bool,
    rtp: Option<RtpVideoSender>,
    transport_mid: Option<String>,
}

struct SinkShared {
    pusher: PusherId,
    ctx: EngineContext,
    url: PushUrl,
    signaling: SignalingClient,
    pc: Mutex<PeerConnection>,
    sender: Arc<dyn PacketSender>,
    state: Mutex<SinkState>,
    negotiating: AtomicBool,
    connected: AtomicBool,
    logger: Arc<dyn LogSink>,
}

/// Chain node that sends H.264 frames to the push server.
pub struct MediaSink {
    shared: Arc<SinkShared>,
    in_pins: Vec<InPin>,
}

/// Owner-side handle to a sink that lives inside a chain.
#[derive(Clone)]
pub struct SinkHandle {
    shared: Arc<SinkShared>,
}

impl MediaSink {
    pub fn new(
        pusher: PusherId,
        ctx: EngineContext,
        url: PushUrl,
        signaling: SignalingClient,
        ice: Arc<dyn IceAgent>,
        sender: Arc<dyn PacketSender>,
    ) -> (Self, SinkHandle) {
        let logger = ctx.logger().clone();
        let pc = PeerConnection::new(ice.clone(), ctx.config().rtp, logger.clone());
        let shared = Arc::new(SinkShared {
            pusher,
            ctx,
            url,
            signaling,
            pc: Mutex::new(pc),
            sender,
            state: Mutex::new(SinkState::default()),
            negotiating: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            logger,
        });
        let weak: Weak<SinkShared> = Arc::downgrade(&shared);
        let listener: Weak<dyn IceStateListener> = weak;
        ice.set_state_listener(listener);

        let sink = Self {
            shared: shared.clone(),
            in_pins: vec![InPin::new(MediaFormat::Video(VideoFormat::h264(0, 0)))],
        };
        (sink, SinkHandle { shared })
    }
}

impl SinkHandle {
    /// Opens a new offer/answer round. Rejected while another one is in flight.
    pub fn negotiate(&self) -> Result<NegotiationHandle, EngineError> {
        SinkShared::negotiate(&self.shared)
    }

    /// Takes the handle of the round opened when the chain started the sink.
    pub fn take_negotiation(&self) -> Option<NegotiationHandle> {
        lock(&self.shared.state).pending.take()
    }

    pub fn is_negotiating(&self) -> bool {
        self.shared.negotiating.load(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    pub fn url(&self) -> &PushUrl {
        &self.shared.url
    }
}

impl SinkShared {
    fn negotiate(this: &Arc<Self>) -> Result<NegotiationHandle, EngineError> {
        if this
            .negotiating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::NegotiationInProgress);
        }

        let token = CancellationToken::new();
        let (completer, handle) = negotiation_channel(token.clone());
        {
            let mut st = lock(&this.state);
            if let Some(old) = st.token.replace(token.clone()) {
                old.cancel();
            }
            st.completer = Some(completer);
            st.negotiated = false;
            st.rtp = None;
            st.transport_mid = None;
        }

        let weak = Arc::downgrade(this);
        let posted = this.ctx.network().post(move || {
            let Some(sink) = weak.upgrade() else {
                return;
            };
            if token.is_cancelled() {
                return;
            }
            sink_info!(sink.logger, "[MediaSink] {} requesting offer for {}", sink.pusher, sink.url);
            let ctx = sink.ctx.clone();
            let weak = weak.clone();
            sink.signaling.request_push(&sink.url, move |result| {
                Self::on_network(&ctx, weak, token, move |sink| sink.on_offer(result));
            });
        });
        if !posted {
            this.negotiating.store(false, Ordering::Release);
            lock(&this.state).completer = None;
            return Err(EngineError::EngineShutdown);
        }
        Ok(handle)
    }

    /// Re-posts a signaling reply to the network queue and runs `f` there if
    /// the sink is still alive and the round was not cancelled.
    fn on_network<F>(ctx: &EngineContext, weak: Weak<Self>, token: CancellationToken, f: F)
    where
        F: FnOnce(&Arc<Self>) + Send + 'static,
    {
        ctx.network().post(move || {
            let Some(sink) = weak.upgrade() else {
                return;
            };
            if token.is_cancelled() {
                sink_debug!(sink.logger, "[MediaSink] late signaling reply dropped");
                return;
            }
            f(&sink);
        });
    }

    fn on_offer(self: &Arc<Self>, result: Result<RemoteOffer, SignalingError>) {
        let offer = match result {
            Ok(offer) => offer,
            Err(e) => return self.fail(EngineError::PushRequestOffer(e)),
        };
        sink_debug!(self.logger, "[MediaSink] {} got {} sdp", self.pusher, offer.sdp_type);

        let answered = {
            let mut pc = lock(&self.pc);
            pc.set_remote_sdp(&offer.sdp)
                .and_then(|_| pc.create_answer(&RtcOfferAnswerOptions::push_video()))
                .map(|answer| (answer, pc.video_send_params()))
        };
        let (answer, params) = match answered {
            Ok(a) => a,
            Err(e) => return self.fail(EngineError::PushInvalidRemoteSdp(e)),
        };

        let token = {
            let mut st = lock(&self.state);
            if let Some(params) = params {
                let config = self.ctx.config();
                st.rtp = Some(RtpVideoSender::with_random_sequence(
                    VideoCodecType::H264,
                    params.payload_type,
                    params.ssrc,
                    config.rtp.packet_capacity,
                    config.packetizer.limits(),
                ));
                st.transport_mid = Some(params.transport_mid);
            }
            match st.token.clone() {
                Some(token) => token,
                None => return,
            }
        };

        let ctx = self.ctx.clone();
        let weak = Arc::downgrade(self);
        self.signaling.send_answer(&self.url, &answer, move |result| {
            Self::on_network(&ctx, weak, token, move |sink| sink.on_answer_sent(result));
        });
    }

    fn on_answer_sent(&self, result: Result<(), SignalingError>) {
        if let Err(e) = result {
            return self.fail(EngineError::PushSendAnswer(e));
        }
        let completer = {
            let mut st = lock(&self.state);
            st.negotiated = true;
            st.completer.take()
        };
        self.negotiating.store(false, Ordering::Release);
        sink_info!(self.logger, "[MediaSink] {} negotiated", self.pusher);
        if let Some(c) = completer {
            c.complete(Ok(()));
        }
    }

    fn fail(&self, err: EngineError) {
        sink_error!(self.logger, "[MediaSink] {}: {}", self.pusher, err);
        let completer = lock(&self.state).completer.take();
        self.negotiating.store(false, Ordering::Release);
        if let Some(c) = completer {
            c.complete(Err(err.clone()));
        }
        let pusher = self.pusher;
        self.ctx.notify(move |o| o.on_push_failed(pusher, &err));
    }

    fn send_frame(&self, frame: &MediaFrame) {
        let Some(plane) = frame.plane(0) else {
            return;
        };
        let mut st = lock(&self.state);
        let SinkState {
            rtp: Some(rtp),
            transport_mid: Some(mid),
            ..
        } = &mut *st
        else {
            return;
        };
        let packets = match rtp.packetize_frame(&plane.data, frame.rtp_timestamp) {
            Ok(p) => p,
            Err(e) => {
                sink_warn!(self.logger, "[MediaSink] frame dropped: {}", e);
                return;
            }
        };
        for packet in &packets {
            if let Err(e) = self.sender.send_rtp(mid, packet) {
                sink_warn!(self.logger, "[MediaSink] send failed on {}: {}", mid, e);
                break;
            }
        }
    }

    fn ready(&self) -> bool {
        self.connected.load(Ordering::Acquire) && lock(&self.state).negotiated
    }

    /// Cancels any round in flight and resets the send state. Tells the server
    /// to stop when a round had completed.
    fn shutdown(&self) {
        let (completer, was_negotiated) = {
            let mut st = lock(&self.state);
            if let Some(token) = st.token.take() {
                token.cancel();
            }
            st.rtp = None;
            st.transport_mid = None;
            st.pending = None;
            (st.completer.take(), std::mem::take(&mut st.negotiated))
        };
        self.negotiating.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        if let Some(c) = completer {
            c.complete(Err(EngineError::NegotiationCancelled));
        }

        if was_negotiated {
            let logger = self.logger.clone();
            self.signaling.stop_push(&self.url, move |result| {
                if let Err(e) = result {
                    sink_warn!(logger, "[MediaSink] stoppush failed: {}", e);
                }
            });
        }
        sink_info!(self.logger, "[MediaSink] {} stopped", self.pusher);
    }
}

impl IceStateListener for SinkShared {
    fn on_ice_state(&self, mid: &str, state: IceTransportState) {
        sink_debug!(self.logger, "[MediaSink] ice {} on {}", state, mid);
        let pusher = self.pusher;
        match state {
            IceTransportState::Connected | IceTransportState::Completed => {
                if !self.connected.swap(true, Ordering::AcqRel) {
                    self.ctx.notify(move |o| o.on_push_success(pusher));
                }
            }
            IceTransportState::Failed => {
                self.connected.store(false, Ordering::Release);
                let err = EngineError::PushIceConnection(mid.to_owned());
                sink_error!(self.logger, "[MediaSink] {}: {}", pusher, err);
                self.ctx.notify(move |o| o.on_push_failed(pusher, &err));
            }
            IceTransportState::Closed => self.connected.store(false, Ordering::Release),
            IceTransportState::New | IceTransportState::Checking => {}
        }
    }
}

impl MediaObject for MediaSink {
    fn name(&self) -> &str {
        "media_sink"
    }

    fn in_pins(&self) -> &[InPin] {
        &self.in_pins
    }

    fn out_pins(&self) -> &[OutPin] {
        &[]
    }

    fn start(&mut self) -> Result<(), MediaError> {
        let handle = SinkShared::negotiate(&self.shared)
            .map_err(|e| MediaError::Negotiation(e.to_string()))?;
        lock(&self.shared.state).pending = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.shutdown();
    }

    fn on_frame(&mut self, _origin: FrameOrigin, frame: Arc<MediaFrame>, _out: &mut FrameEmitter) {
        match frame.format.as_video() {
            Some(v) if v.subtype == VideoSubtype::H264 => {}
            _ => return,
        }
        if !self.shared.ready() {
            return;
        }
        let weak = Arc::downgrade(&self.shared);
        self.shared.ctx.network().post(move || {
            if let Some(sink) = weak.upgrade() {
                sink.send_frame(&frame);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{
        config::Config,
        log::NoopLogSink,
        pc::{IceComponent, IceParameters},
        rtp::RtpPacket,
        sdp::Candidate,
        signaling_client::{HttpClient, HttpRequest, ReplyCallback},
    };

    struct Silent;

    impl HttpClient for Silent {
        fn post(&self, _request: HttpRequest, _done: ReplyCallback) {}
    }

    impl PacketSender for Silent {
        fn send_rtp(&self, _mid: &str, _packet: &RtpPacket) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct ListenerSlot(Mutex<Option<Weak<dyn IceStateListener>>>);

    impl IceAgent for ListenerSlot {
        fn create_transport(&self, _mid: &str, _component: IceComponent) {}
        fn set_remote_ice_params(&self, _mid: &str, _c: IceComponent, _p: &IceParameters) {}
        fn set_local_ice_params(&self, _mid: &str, _c: IceComponent, _p: &IceParameters) {}
        fn add_remote_candidate(&self, _mid: &str, _c: IceComponent, _cand: &Candidate) {}
        fn set_state_listener(&self, listener: Weak<dyn IceStateListener>) {
            *self.0.lock().unwrap() = Some(listener);
        }
    }

    fn sink(ctx: &EngineContext, ice: Arc<ListenerSlot>) -> (MediaSink, SinkHandle) {
        let url: PushUrl = "xrtc://media.example.com/push?uid=7&streamName=cam".parse().unwrap();
        let signaling = SignalingClient::new(Arc::new(Silent), "https", ctx.logger().clone());
        MediaSink::new(PusherId(1), ctx.clone(), url, signaling, ice, Arc::new(Silent))
    }

    #[test]
    fn sink_registers_itself_as_ice_listener() {
        let ctx = EngineContext::init(Config::default(), Arc::new(NoopLogSink), None).unwrap();
        let ice = Arc::new(ListenerSlot::default());
        let (sink, handle) = sink(&ctx, ice.clone());

        let listener = ice.0.lock().unwrap().clone().unwrap();
        listener.upgrade().unwrap().on_ice_state("0", IceTransportState::Connected);
        assert!(handle.is_connected());
        listener.upgrade().unwrap().on_ice_state("0", IceTransportState::Closed);
        assert!(!handle.is_connected());

        drop((sink, handle));
        assert!(listener.upgrade().is_none());
        ctx.shutdown();
    }

    #[test]
    fn second_negotiation_is_rejected_while_one_is_in_flight() {
        let ctx = EngineContext::init(Config::default(), Arc::new(NoopLogSink), None).unwrap();
        let (_sink, handle) = sink(&ctx, Arc::new(ListenerSlot::default()));

        let first = handle.negotiate().unwrap();
        assert!(handle.is_negotiating());
        assert_eq!(handle.negotiate().err(), Some(EngineError::NegotiationInProgress));
        assert_eq!(first.try_result(), None);
        ctx.shutdown();
    }
}

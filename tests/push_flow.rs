#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak, mpsc};
use std::time::Duration;

use bytes::Bytes;
use pushrtc::{
    DeviceInfo, Engine, EngineDeps, VideoDeviceInfo,
    config::Config,
    core::{EngineError, EngineObserver, PusherId},
    log::{LogLevel, MemoryLogSink},
    media::{FrameConsumer, MediaFormat, MediaFrame, VideoFormat},
    pc::{IceAgent, IceAgentFactory, IceComponent, IceParameters, IceStateListener, IceTransportState},
    push::{EncodeError, EncodedFrame, PacketSender, VideoCapture, VideoEncoder, VideoEncoderFactory},
    rtp::RtpPacket,
    sdp::Candidate,
    signaling_client::{HttpClient, HttpReply, HttpRequest, ReplyCallback},
};

const URL: &str = "xrtc://media.example.com:8081/push?uid=2001&streamName=lobby";
const WAIT: Duration = Duration::from_secs(3);

fn offer() -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "sdp_test_files", "push_offer.sdp"]
        .iter()
        .collect();
    std::fs::read_to_string(path).unwrap()
}

/// Replies synchronously; `push` replies can be held back instead.
struct FakeHttp {
    offer: String,
    hold_push: bool,
    held: Mutex<Vec<ReplyCallback>>,
    seen: Mutex<mpsc::Sender<HttpRequest>>,
}

impl HttpClient for FakeHttp {
    fn post(&self, request: HttpRequest, done: ReplyCallback) {
        let is_push = request.url.ends_with("/signaling/push");
        self.seen.lock().unwrap().send(request).unwrap();
        if is_push {
            if self.hold_push {
                self.held.lock().unwrap().push(done);
                return;
            }
            let body = serde_json::json!({
                "errNo": 0,
                "errMsg": "",
                "data": { "type": "offer", "sdp": self.offer },
            });
            done(HttpReply::ok(body.to_string()));
        } else {
            done(HttpReply::ok(r#"{"errNo":0,"errMsg":""}"#));
        }
    }
}

#[derive(Default)]
struct FakeIce {
    listener: Mutex<Option<Weak<dyn IceStateListener>>>,
}

impl FakeIce {
    fn report(&self, state: IceTransportState) {
        let listener = self.listener.lock().unwrap().clone().unwrap();
        listener.upgrade().unwrap().on_ice_state("0", state);
    }
}

struct SharedIce(Arc<FakeIce>);

impl IceAgent for SharedIce {
    fn create_transport(&self, _mid: &str, _component: IceComponent) {}
    fn set_remote_ice_params(&self, _mid: &str, _c: IceComponent, _p: &IceParameters) {}
    fn set_local_ice_params(&self, _mid: &str, _c: IceComponent, _p: &IceParameters) {}
    fn add_remote_candidate(&self, _mid: &str, _c: IceComponent, _cand: &Candidate) {}
    fn set_state_listener(&self, listener: Weak<dyn IceStateListener>) {
        *self.0.listener.lock().unwrap() = Some(listener);
    }
}

impl IceAgentFactory for SharedIce {
    fn create_agent(&self) -> Arc<dyn IceAgent> {
        Arc::new(SharedIce(self.0.clone()))
    }
}

struct FakeSender(Mutex<mpsc::Sender<(String, u8, bool)>>);

impl PacketSender for FakeSender {
    fn send_rtp(&self, transport_mid: &str, packet: &RtpPacket) -> std::io::Result<()> {
        let _ = self.0.lock().unwrap().send((
            transport_mid.to_owned(),
            packet.payload_type(),
            packet.marker(),
        ));
        Ok(())
    }
}

/// Emits SPS, PPS and an IDR slice large enough to be fragmented.
struct FakeEncoder;

impl VideoEncoder for FakeEncoder {
    fn start(&mut self, _format: &VideoFormat) -> Result<(), EncodeError> {
        Ok(())
    }
    fn encode(&mut self, _frame: &MediaFrame) -> Result<Option<EncodedFrame>, EncodeError> {
        let mut data = vec![0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1f, 0, 0, 0, 1, 0x68, 0xce, 0x3c, 0x80];
        data.extend_from_slice(&[0, 0, 0, 1, 0x65]);
        data.extend(std::iter::repeat_n(0x88, 2000));
        Ok(Some(EncodedFrame {
            data: Bytes::from(data),
            idr: true,
        }))
    }
    fn request_keyframe(&mut self) {}
    fn stop(&mut self) {}
}

struct FakeEncoders;

impl VideoEncoderFactory for FakeEncoders {
    fn create_encoder(&self) -> Result<Box<dyn VideoEncoder>, EncodeError> {
        Ok(Box::new(FakeEncoder))
    }
}

struct FakeCamera {
    fail_start: bool,
    consumer: Mutex<Option<Arc<dyn FrameConsumer>>>,
    threads: Mutex<Vec<String>>,
}

impl FakeCamera {
    fn new(fail_start: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_start,
            consumer: Mutex::new(None),
            threads: Mutex::new(Vec::new()),
        })
    }

    fn deliver(&self) {
        let consumer = self.consumer.lock().unwrap().clone();
        let frame = MediaFrame::packed(
            MediaFormat::Video(VideoFormat::i420(4, 4)),
            Bytes::from(vec![16u8; 24]),
        );
        consumer.unwrap().on_frame(Arc::new(frame));
    }

    fn has_consumer(&self) -> bool {
        self.consumer.lock().unwrap().is_some()
    }

    fn record_thread(&self, call: &str) {
        let name = std::thread::current().name().unwrap_or("?").to_owned();
        self.threads.lock().unwrap().push(format!("{call}@{name}"));
    }

    fn threads(&self) -> Vec<String> {
        self.threads.lock().unwrap().clone()
    }
}

impl VideoCapture for FakeCamera {
    fn device_id(&self) -> &str {
        "fake-cam"
    }
    fn format(&self) -> VideoFormat {
        VideoFormat::i420(4, 4)
    }
    fn start(&self) -> Result<(), String> {
        self.record_thread("start");
        if self.fail_start {
            Err("sensor offline".into())
        } else {
            Ok(())
        }
    }
    fn stop(&self) {
        self.record_thread("stop");
    }
    fn register_consumer(&self, consumer: Option<Arc<dyn FrameConsumer>>) {
        *self.consumer.lock().unwrap() = consumer;
    }
}

struct NoDevices;

impl VideoDeviceInfo for NoDevices {
    fn number_of_devices(&self) -> usize {
        0
    }
    fn device(&self, _index: usize) -> Option<DeviceInfo> {
        None
    }
    fn create_capture(&self, _unique_id: &str) -> Result<Arc<dyn VideoCapture>, String> {
        Err("no devices".into())
    }
}

#[derive(Debug, PartialEq)]
enum Event {
    Success(PusherId),
    Failed(PusherId, EngineError),
}

struct Events(Mutex<mpsc::Sender<Event>>);

impl EngineObserver for Events {
    fn on_push_success(&self, pusher: PusherId) {
        let _ = self.0.lock().unwrap().send(Event::Success(pusher));
    }
    fn on_push_failed(&self, pusher: PusherId, err: &EngineError) {
        let _ = self.0.lock().unwrap().send(Event::Failed(pusher, err.clone()));
    }
}

struct Harness {
    engine: Engine,
    http: Arc<FakeHttp>,
    ice: Arc<FakeIce>,
    requests: mpsc::Receiver<HttpRequest>,
    packets: mpsc::Receiver<(String, u8, bool)>,
    events: mpsc::Receiver<Event>,
    logger: Arc<MemoryLogSink>,
}

impl Harness {
    fn new(hold_push: bool) -> Self {
        let (req_tx, requests) = mpsc::channel();
        let (pkt_tx, packets) = mpsc::channel();
        let (ev_tx, events) = mpsc::channel();
        let http = Arc::new(FakeHttp {
            offer: offer(),
            hold_push,
            held: Mutex::new(Vec::new()),
            seen: Mutex::new(req_tx),
        });
        let ice = Arc::new(FakeIce::default());
        let deps = EngineDeps {
            device_info: Arc::new(NoDevices),
            http: http.clone(),
            ice: Arc::new(SharedIce(ice.clone())),
            sender: Arc::new(FakeSender(Mutex::new(pkt_tx))),
            encoders: Arc::new(FakeEncoders),
        };
        let logger = Arc::new(MemoryLogSink::new());
        let engine = Engine::init(
            Config::default(),
            deps,
            logger.clone(),
            Some(Arc::new(Events(Mutex::new(ev_tx)))),
        )
        .unwrap();
        Self {
            engine,
            http,
            ice,
            requests,
            packets,
            events,
            logger,
        }
    }

    fn flush_network(&self) {
        self.engine.context().network().invoke(|| ()).unwrap();
    }
}

#[test]
fn missing_source_fails_before_anything_starts() {
    let h = Harness::new(false);
    let pusher = h.engine.create_pusher(None);

    assert_eq!(pusher.start(URL).err(), Some(EngineError::PushNoVideoSource));
    assert!(!pusher.is_running());
    assert_eq!(
        h.events.recv_timeout(WAIT).unwrap(),
        Event::Failed(pusher.id(), EngineError::PushNoVideoSource)
    );
    assert!(h.requests.try_recv().is_err());
    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn malformed_url_is_rejected() {
    let h = Harness::new(false);
    let camera = FakeCamera::new(false);
    let pusher = h.engine.create_pusher(Some(camera.clone()));

    let err = pusher.start("rtmp://media.example.com/live?uid=1").unwrap_err();
    assert!(matches!(err, EngineError::PushInvalidUrl(_)));
    assert!(!camera.has_consumer());
    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn failed_capture_start_rolls_the_chain_back() {
    let h = Harness::new(false);
    let camera = FakeCamera::new(true);
    let pusher = h.engine.create_pusher(Some(camera.clone()));

    let err = pusher.start(URL).unwrap_err();
    assert!(matches!(err, EngineError::ChainStart(_)));
    assert!(!pusher.is_running());
    assert!(!camera.has_consumer());
    h.flush_network();
    assert!(h.requests.try_recv().is_err());
    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn negotiated_push_sends_rtp_and_stops_cleanly() {
    let h = Harness::new(false);
    let camera = FakeCamera::new(false);
    let pusher = h.engine.create_pusher(Some(camera.clone()));

    let negotiation = pusher.start(URL).unwrap();
    assert_eq!(negotiation.wait_timeout(WAIT), Some(Ok(())));

    let push = h.requests.recv_timeout(WAIT).unwrap();
    assert_eq!(push.url, "https://media.example.com:8081/signaling/push");
    assert_eq!(push.body, "uid=2001&streamName=lobby&audio=1&video=1&isDtls=0");
    let answer = h.requests.recv_timeout(WAIT).unwrap();
    assert_eq!(answer.url, "https://media.example.com:8081/signaling/sendanswer");
    assert!(answer.body.starts_with("uid=2001&streamName=lobby&type=push&answer=v%3D0"));

    // Frames before ICE connects are dropped.
    camera.deliver();
    h.flush_network();
    assert!(h.packets.try_recv().is_err());

    h.ice.report(IceTransportState::Connected);
    assert_eq!(h.events.recv_timeout(WAIT).unwrap(), Event::Success(pusher.id()));

    camera.deliver();
    h.flush_network();
    let sent: Vec<(String, u8, bool)> = h.packets.try_iter().collect();
    assert!(sent.len() >= 3, "STAP-A plus at least two FU-A fragments");
    assert!(sent.iter().all(|(mid, pt, _)| mid == "0" && *pt == 102));
    let markers: Vec<bool> = sent.iter().map(|(_, _, m)| *m).collect();
    assert_eq!(markers.iter().filter(|m| **m).count(), 1);
    assert_eq!(markers.last(), Some(&true));

    pusher.stop();
    assert!(!pusher.is_running());
    assert!(!camera.has_consumer());
    let stop = h.requests.recv_timeout(WAIT).unwrap();
    assert_eq!(stop.url, "https://media.example.com:8081/signaling/stoppush");
    assert_eq!(stop.body, "uid=2001&streamName=lobby");
    assert!(h.logger.contains(LogLevel::Info, "negotiated"));

    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn second_start_while_running_is_rejected() {
    let h = Harness::new(true);
    let pusher = h.engine.create_pusher(Some(FakeCamera::new(false)));

    let _first = pusher.start(URL).unwrap();
    assert_eq!(pusher.start(URL).err(), Some(EngineError::NegotiationInProgress));
    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn stop_cancels_negotiation_and_drops_late_reply() {
    let h = Harness::new(true);
    let pusher = h.engine.create_pusher(Some(FakeCamera::new(false)));

    let negotiation = pusher.start(URL).unwrap();
    let push = h.requests.recv_timeout(WAIT).unwrap();
    assert!(push.url.ends_with("/signaling/push"));
    assert_eq!(negotiation.try_result(), None);

    pusher.stop();
    assert_eq!(
        negotiation.wait_timeout(WAIT),
        Some(Err(EngineError::NegotiationCancelled))
    );

    // The server answers after the push was stopped.
    let late = h.http.held.lock().unwrap().pop().unwrap();
    late(HttpReply::ok(
        serde_json::json!({ "errNo": 0, "data": { "type": "offer", "sdp": offer() } }).to_string(),
    ));
    h.flush_network();
    assert!(h.requests.try_recv().is_err(), "no sendanswer or stoppush after cancel");
    assert!(h.events.try_recv().is_err());

    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn rejected_push_is_reported() {
    struct Rejecting(Mutex<mpsc::Sender<()>>);
    impl HttpClient for Rejecting {
        fn post(&self, _request: HttpRequest, done: ReplyCallback) {
            let _ = self.0.lock().unwrap().send(());
            done(HttpReply::ok(r#"{"errNo":-1,"errMsg":"stream exists"}"#));
        }
    }

    let (tx, _rx) = mpsc::channel();
    let (ev_tx, events) = mpsc::channel();
    let deps = EngineDeps {
        device_info: Arc::new(NoDevices),
        http: Arc::new(Rejecting(Mutex::new(tx))),
        ice: Arc::new(SharedIce(Arc::new(FakeIce::default()))),
        sender: Arc::new(FakeSender(Mutex::new(mpsc::channel().0))),
        encoders: Arc::new(FakeEncoders),
    };
    let engine = Engine::init(
        Config::default(),
        deps,
        Arc::new(MemoryLogSink::new()),
        Some(Arc::new(Events(Mutex::new(ev_tx)))),
    )
    .unwrap();
    let pusher = engine.create_pusher(Some(FakeCamera::new(false)));

    let negotiation = pusher.start(URL).unwrap();
    let result = negotiation.wait_timeout(WAIT).unwrap();
    assert!(matches!(result, Err(EngineError::PushRequestOffer(_))));
    assert!(matches!(
        events.recv_timeout(WAIT).unwrap(),
        Event::Failed(_, EngineError::PushRequestOffer(_))
    ));

    drop(pusher);
    engine.shutdown();
}

#[test]
fn capture_is_started_and_stopped_on_the_worker_queue() {
    let h = Harness::new(true);
    let camera = FakeCamera::new(false);
    let pusher = h.engine.create_pusher(Some(camera.clone()));

    let _negotiation = pusher.start(URL).unwrap();
    pusher.stop();
    assert_eq!(camera.threads(), ["start@pushrtc-worker", "stop@pushrtc-worker"]);
    drop(pusher);
    h.engine.shutdown();
}

#[test]
fn stop_after_engine_shutdown_still_releases_the_camera() {
    let h = Harness::new(true);
    let camera = FakeCamera::new(false);
    let pusher = h.engine.create_pusher(Some(camera.clone()));

    let _negotiation = pusher.start(URL).unwrap();
    h.engine.shutdown();
    pusher.stop();
    assert!(!camera.has_consumer());
    let here = std::thread::current().name().unwrap_or("?").to_owned();
    assert_eq!(camera.threads().last(), Some(&format!("stop@{here}")));
}

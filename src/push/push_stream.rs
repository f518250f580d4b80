use std::sync::{Arc, Mutex};

use super::{
    h264_encoder_filter::H264EncoderFilter,
    media_sink::{MediaSink, SinkHandle},
    negotiation::NegotiationHandle,
    packet_sender::PacketSender,
    video_encoder::VideoEncoderFactory,
    video_source::{VideoCapture, VideoSource},
};
use crate::{
    core::{EngineContext, EngineError, PusherId, sync::lock},
    media::{ChainInput, MediaChain, MediaError},
    pc::IceAgentFactory,
    signaling_client::{HttpClient, PushUrl, SignalingClient},
    sink_error, sink_info,
};

/// Collaborators a push stream is built from.
#[derive(Clone)]
pub struct PushDeps {
    pub http: Arc<dyn HttpClient>,
    pub ice: Arc<dyn IceAgentFactory>,
    pub sender: Arc<dyn PacketSender>,
    pub encoders: Arc<dyn VideoEncoderFactory>,
}

struct RunningPush {
    chain: Arc<MediaChain>,
    capture: Arc<dyn VideoCapture>,
    sink: SinkHandle,
}

/// Camera → H.264 encoder → network sink, started and stopped as one unit.
pub struct PushStream {
    id: PusherId,
    ctx: EngineContext,
    deps: PushDeps,
    source: Option<Arc<dyn VideoCapture>>,
    running: Mutex<Option<RunningPush>>,
}

impl PushStream {
    pub fn new(
        id: PusherId,
        ctx: EngineContext,
        deps: PushDeps,
        source: Option<Arc<dyn VideoCapture>>,
    ) -> Self {
        Self {
            id,
            ctx,
            deps,
            source,
            running: Mutex::new(None),
        }
    }

    pub fn id(&self) -> PusherId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        lock(&self.running).is_some()
    }

    /// Builds and starts the chain for `url` and opens the offer/answer round.
    ///
    /// Failures are returned and also reported to the observer. Nothing is
    /// left running after a failure.
    pub fn start(&self, url: &str) -> Result<NegotiationHandle, EngineError> {
        let mut running = lock(&self.running);
        if running.is_some() {
            return Err(EngineError::NegotiationInProgress);
        }
        let Some(capture) = self.source.clone() else {
            return Err(self.report(EngineError::PushNoVideoSource));
        };
        let url: PushUrl = url
            .parse()
            .map_err(|e| self.report(EngineError::PushInvalidUrl(e)))?;
        let encoder = self
            .deps
            .encoders
            .create_encoder()
            .map_err(|e| self.report(EngineError::ChainStart(MediaError::Encoder(e.to_string()))))?;

        let logger = self.ctx.logger().clone();
        let config = self.ctx.config().clone();
        let signaling = SignalingClient::new(
            self.deps.http.clone(),
            &config.signaling.scheme,
            logger.clone(),
        );
        let (sink, sink_handle) = MediaSink::new(
            self.id,
            self.ctx.clone(),
            url.clone(),
            signaling,
            self.deps.ice.create_agent(),
            self.deps.sender.clone(),
        );

        let mut chain = MediaChain::new(logger.clone());
        let source_node = chain.add_media_object(Box::new(VideoSource::new(capture.clone())));
        let encoder_node = chain.add_media_object(Box::new(H264EncoderFilter::new(
            encoder,
            capture.format(),
            config.rtp.video_clock_rate,
            logger.clone(),
        )));
        let sink_node = chain.add_media_object(Box::new(sink));
        chain
            .connect_media_object(source_node, encoder_node)
            .and_then(|_| chain.connect_media_object(encoder_node, sink_node))
            .map_err(|e| self.report(EngineError::ChainConnect(e)))?;

        let chain = Arc::new(chain);
        capture.register_consumer(Some(Arc::new(ChainInput::new(&chain, source_node))));
        // Capture devices are opened on the worker queue.
        let starting = chain.clone();
        let started = self
            .ctx
            .worker()
            .invoke(move || starting.start_chain())
            .and_then(|r| r.map_err(EngineError::ChainStart));
        if let Err(e) = started {
            capture.register_consumer(None);
            return Err(self.report(e));
        }
        let Some(negotiation) = sink_handle.take_negotiation() else {
            chain.stop_chain();
            capture.register_consumer(None);
            return Err(self.report(EngineError::NegotiationCancelled));
        };

        sink_info!(logger, "[PushStream] {} pushing to {}", self.id, url);
        *running = Some(RunningPush {
            chain,
            capture,
            sink: sink_handle,
        });
        Ok(negotiation)
    }

    /// Stops the chain and cancels an unfinished negotiation. The server is
    /// told to stop when a negotiation had completed. No-op when idle.
    pub fn stop(&self) {
        let Some(push) = lock(&self.running).take() else {
            return;
        };
        let stopping = push.chain.clone();
        if self.ctx.worker().invoke(move || stopping.stop_chain()).is_err() {
            // Worker already joined by engine shutdown.
            push.chain.stop_chain();
        }
        push.capture.register_consumer(None);
        sink_info!(
            self.ctx.logger(),
            "[PushStream] {} stopped ({})",
            self.id,
            push.sink.url()
        );
    }

    fn report(&self, err: EngineError) -> EngineError {
        sink_error!(self.ctx.logger(), "[PushStream] {}: {}", self.id, err);
        let id = self.id;
        let reported = err.clone();
        self.ctx.notify(move |o| o.on_push_failed(id, &reported));
        err
    }
}

impl Drop for PushStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PushStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushStream")
            .field("id", &self.id)
            .field("has_source", &self.source.is_some())
            .field("running", &self.is_running())
            .finish()
    }
}

//! Application entry point: owns the [`EngineContext`] and hands out camera
//! sources and push streams.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use crate::{
    config::Config,
    core::{EngineContext, EngineError, EngineObserver, PusherId},
    log::log_sink::LogSink,
    pc::IceAgentFactory,
    push::{PacketSender, PushDeps, PushStream, VideoCapture, VideoEncoderFactory},
    signaling_client::HttpClient,
    sink_info, sink_warn,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub unique_id: String,
}

/// Camera enumeration, implemented outside this crate. Called on the api queue.
pub trait VideoDeviceInfo: Send + Sync {
    fn number_of_devices(&self) -> usize;
    fn device(&self, index: usize) -> Option<DeviceInfo>;
    fn create_capture(&self, unique_id: &str) -> Result<Arc<dyn VideoCapture>, String>;
}

/// Every collaborator the engine needs from the host application.
#[derive(Clone)]
pub struct EngineDeps {
    pub device_info: Arc<dyn VideoDeviceInfo>,
    pub http: Arc<dyn HttpClient>,
    pub ice: Arc<dyn IceAgentFactory>,
    pub sender: Arc<dyn PacketSender>,
    pub encoders: Arc<dyn VideoEncoderFactory>,
}

pub struct Engine {
    ctx: EngineContext,
    deps: EngineDeps,
    next_pusher: AtomicU64,
}

impl Engine {
    pub fn init(
        config: Config,
        deps: EngineDeps,
        logger: Arc<dyn LogSink>,
        observer: Option<Arc<dyn EngineObserver>>,
    ) -> Result<Self, EngineError> {
        let ctx = EngineContext::init(config, logger, observer)?;
        sink_info!(ctx.logger(), "[Engine] initialized");
        Ok(Self {
            ctx,
            deps,
            next_pusher: AtomicU64::new(1),
        })
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn camera_count(&self) -> Result<usize, EngineError> {
        let devices = self.deps.device_info.clone();
        self.ctx.api().invoke(move || devices.number_of_devices())
    }

    pub fn camera_info(&self, index: usize) -> Result<DeviceInfo, EngineError> {
        let devices = self.deps.device_info.clone();
        self.ctx
            .api()
            .invoke(move || devices.device(index))?
            .ok_or(EngineError::NoVideoDevice(index))
    }

    /// Opens the camera at `index`. The observer hears about success and
    /// failure as well.
    pub fn create_cam_source(&self, index: usize) -> Result<Arc<dyn VideoCapture>, EngineError> {
        let result = self.open_capture(index);
        match &result {
            Ok(capture) => {
                let id = capture.device_id().to_owned();
                sink_info!(self.ctx.logger(), "[Engine] camera {} opened", id);
                self.ctx.notify(move |o| o.on_video_source_success(&id));
            }
            Err(e) => {
                sink_warn!(self.ctx.logger(), "[Engine] camera {} unavailable: {}", index, e);
                let err = e.clone();
                self.ctx.notify(move |o| o.on_video_source_failed(&err));
            }
        }
        result
    }

    fn open_capture(&self, index: usize) -> Result<Arc<dyn VideoCapture>, EngineError> {
        let info = self.camera_info(index)?;
        let devices = self.deps.device_info.clone();
        let capture = self
            .ctx
            .api()
            .invoke(move || devices.create_capture(&info.unique_id))?
            .map_err(EngineError::VideoCreateCapture)?;
        let format = capture.format();
        if format.width == 0 || format.height == 0 {
            return Err(EngineError::VideoNoCapabilities);
        }
        Ok(capture)
    }

    /// A push stream fed by `source`. A missing source is only reported when
    /// the stream is started.
    pub fn create_pusher(&self, source: Option<Arc<dyn VideoCapture>>) -> PushStream {
        let id = PusherId(self.next_pusher.fetch_add(1, Ordering::Relaxed));
        let deps = PushDeps {
            http: self.deps.http.clone(),
            ice: self.deps.ice.clone(),
            sender: self.deps.sender.clone(),
            encoders: self.deps.encoders.clone(),
        };
        PushStream::new(id, self.ctx.clone(), deps, source)
    }

    /// Joins the engine queues. Push streams should be stopped first.
    pub fn shutdown(&self) {
        self.ctx.shutdown();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ctx", &self.ctx)
            .field("next_pusher", &self.next_pusher)
            .finish()
    }
}

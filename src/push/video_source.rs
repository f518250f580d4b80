use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::media::{
    FrameConsumer, FrameEmitter, FrameOrigin, InPin, MediaError, MediaFormat, MediaFrame,
    MediaObject, OutPin, VideoFormat,
};

/// A camera, implemented outside this crate.
///
/// Once started it pushes I420 frames into the registered consumer from its
/// own capture thread. `stop` may join that thread.
pub trait VideoCapture: Send + Sync {
    fn device_id(&self) -> &str;
    /// Negotiated capture format; zero dimensions mean the device reported no capabilities.
    fn format(&self) -> VideoFormat;
    fn start(&self) -> Result<(), String>;
    fn stop(&self);
    fn register_consumer(&self, consumer: Option<Arc<dyn FrameConsumer>>);
}

/// Source node: frames injected by the capture leave through output pin 0.
pub struct VideoSource {
    name: String,
    capture: Arc<dyn VideoCapture>,
    out_pins: Vec<OutPin>,
}

impl VideoSource {
    pub fn new(capture: Arc<dyn VideoCapture>) -> Self {
        let format = capture.format();
        Self {
            name: format!("video_source[{}]", capture.device_id()),
            out_pins: vec![OutPin::new(MediaFormat::Video(VideoFormat::i420(
                format.width,
                format.height,
            )))],
            capture,
        }
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl MediaObject for VideoSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn in_pins(&self) -> &[InPin] {
        &[]
    }

    fn out_pins(&self) -> &[OutPin] {
        &self.out_pins
    }

    fn start(&mut self) -> Result<(), MediaError> {
        self.capture.start().map_err(MediaError::Device)
    }

    fn stop(&mut self) {
        self.capture.stop();
    }

    fn on_frame(&mut self, origin: FrameOrigin, frame: Arc<MediaFrame>, out: &mut FrameEmitter) {
        if origin != FrameOrigin::Injected {
            return;
        }
        // Devices that do not timestamp get the arrival time.
        let frame = if frame.capture_time_ms == 0 {
            Arc::new((*frame).clone().with_capture_time(now_ms()))
        } else {
            frame
        };
        out.emit(0, frame);
    }
}

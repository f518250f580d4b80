use std::fmt;

use super::error::EngineError;

/// Identifies one pusher created by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PusherId(pub u64);

impl fmt::Display for PusherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pusher-{}", self.0)
    }
}

/// Application callbacks. Delivered on the engine's api queue, never on the
/// thread that detected the event.
pub trait EngineObserver: Send + Sync {
    fn on_video_source_success(&self, _device_id: &str) {}
    fn on_video_source_failed(&self, _err: &EngineError) {}
    fn on_push_success(&self, _pusher: PusherId) {}
    fn on_push_failed(&self, _pusher: PusherId, _err: &EngineError) {}
}

use std::sync::Arc;

use super::{
    media_error::MediaError,
    media_frame::MediaFrame,
    pin::{InPin, OutPin},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Created,
    Started,
    Stopped,
}

/// Where a frame handed to [`MediaObject::on_frame`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOrigin {
    /// Pushed into the chain from outside, e.g. by a capture device.
    Injected,
    /// Delivered to the node's input pin with this index.
    Pin(usize),
}

/// Collects the frames a node produces while handling one input frame.
/// The chain delivers them downstream as soon as the node returns.
#[derive(Debug, Default)]
pub struct FrameEmitter {
    emitted: Vec<(usize, Arc<MediaFrame>)>,
}

impl FrameEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends `frame` out of output pin `out_pin`.
    pub fn emit(&mut self, out_pin: usize, frame: Arc<MediaFrame>) {
        self.emitted.push((out_pin, frame));
    }

    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<(usize, Arc<MediaFrame>)> {
        std::mem::take(&mut self.emitted)
    }
}

/// A node of the media chain: a source, a filter or a sink.
pub trait MediaObject: Send {
    fn name(&self) -> &str;
    fn in_pins(&self) -> &[InPin];
    fn out_pins(&self) -> &[OutPin];
    fn start(&mut self) -> Result<(), MediaError>;
    fn stop(&mut self);
    fn on_frame(&mut self, origin: FrameOrigin, frame: Arc<MediaFrame>, out: &mut FrameEmitter);
}

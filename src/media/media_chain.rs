//! Arena-owned graph of media objects.
//!
//! Build phase (`&mut self`): add nodes, connect pins. Run phase (`&self`,
//! usually behind an `Arc`): start, push frames, stop. Connections cannot
//! change once the chain is shared, so they are read without locking.
//!
//! Frame delivery is synchronous: the thread that pushes a frame runs every
//! downstream node's `on_frame` before `push_frame` returns. Each node sits
//! behind its own mutex, so two producers feeding the same node serialize on it.

use std::sync::{
    Arc, Mutex, TryLockError, Weak,
    atomic::{AtomicBool, Ordering},
};

use super::{
    media_error::MediaError,
    media_frame::MediaFrame,
    media_object::{FrameEmitter, FrameOrigin, MediaObject, ObjectState},
    pin::{InPin, NodeId, OutPin, PinRef},
};
use crate::{core::sync::lock, log::log_sink::LogSink, sink_debug, sink_error, sink_info, sink_trace};

/// Receives frames from outside the chain (capture devices and the like).
pub trait FrameConsumer: Send + Sync {
    fn on_frame(&self, frame: Arc<MediaFrame>);
}

struct NodeInner {
    object: Box<dyn MediaObject>,
    state: ObjectState,
}

struct NodeSlot {
    name: String,
    in_pins: Vec<InPin>,
    out_pins: Vec<OutPin>,
    inner: Mutex<NodeInner>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Connection {
    from: PinRef,
    to: PinRef,
}

pub struct MediaChain {
    nodes: Vec<NodeSlot>,
    connections: Vec<Connection>,
    running: AtomicBool,
    logger: Arc<dyn LogSink>,
}

impl MediaChain {
    pub fn new(logger: Arc<dyn LogSink>) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            running: AtomicBool::new(false),
            logger,
        }
    }

    pub fn add_media_object(&mut self, object: Box<dyn MediaObject>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeSlot {
            name: object.name().to_owned(),
            in_pins: object.in_pins().to_vec(),
            out_pins: object.out_pins().to_vec(),
            inner: Mutex::new(NodeInner {
                object,
                state: ObjectState::Created,
            }),
        });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|s| s.name.as_str())
    }

    pub fn state(&self, node: NodeId) -> Option<ObjectState> {
        self.nodes.get(node.0).map(|s| lock(&s.inner).state)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Connects output pin `from` to input pin `to`. An output may feed several
    /// inputs; an input has exactly one upstream.
    pub fn connect(&mut self, from: PinRef, to: PinRef) -> Result<(), MediaError> {
        if self.is_running() {
            return Err(MediaError::ChainRunning);
        }
        let out_pin = self
            .nodes
            .get(from.node.0)
            .and_then(|n| n.out_pins.get(from.index))
            .ok_or(MediaError::UnknownPin(from))?;
        let in_pin = self
            .nodes
            .get(to.node.0)
            .and_then(|n| n.in_pins.get(to.index))
            .ok_or(MediaError::UnknownPin(to))?;

        if !out_pin.can_feed(in_pin) {
            return Err(MediaError::IncompatibleFormat { from, to });
        }
        if self.connections.iter().any(|c| c.to == to) {
            return Err(MediaError::InPinTaken(to));
        }
        if from.node == to.node || self.reaches(to.node, from.node) {
            return Err(MediaError::Cycle);
        }

        self.connections.push(Connection { from, to });
        sink_debug!(
            self.logger,
            "[MediaChain] {}:{} -> {}:{}",
            self.nodes[from.node.0].name,
            from.index,
            self.nodes[to.node.0].name,
            to.index
        );
        Ok(())
    }

    /// Connects the first compatible (output of `from`, free input of `to`) pair.
    pub fn connect_media_object(&mut self, from: NodeId, to: NodeId) -> Result<(), MediaError> {
        let src = self.nodes.get(from.0).ok_or(MediaError::UnknownNode(from))?;
        let dst = self.nodes.get(to.0).ok_or(MediaError::UnknownNode(to))?;

        let mut pair = None;
        'search: for (oi, out_pin) in src.out_pins.iter().enumerate() {
            for (ii, in_pin) in dst.in_pins.iter().enumerate() {
                let to_ref = PinRef::new(to, ii);
                if out_pin.can_feed(in_pin) && !self.connections.iter().any(|c| c.to == to_ref) {
                    pair = Some((PinRef::new(from, oi), to_ref));
                    break 'search;
                }
            }
        }

        match pair {
            Some((out_ref, in_ref)) => self.connect(out_ref, in_ref),
            None => Err(MediaError::NoCompatiblePins {
                from: src.name.clone(),
                to: dst.name.clone(),
            }),
        }
    }

    fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut stack = vec![start];
        let mut seen = vec![false; self.nodes.len()];
        while let Some(n) = stack.pop() {
            if n == target {
                return true;
            }
            if std::mem::replace(&mut seen[n.0], true) {
                continue;
            }
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| c.from.node == n)
                    .map(|c| c.to.node),
            );
        }
        false
    }

    /// Starts every node in insertion order. If one fails, the nodes already
    /// started are stopped again, newest first, and the chain stays idle.
    pub fn start_chain(&self) -> Result<(), MediaError> {
        if self.is_running() {
            return Ok(());
        }

        let mut started: Vec<usize> = Vec::with_capacity(self.nodes.len());
        for (i, slot) in self.nodes.iter().enumerate() {
            let mut inner = lock(&slot.inner);
            if inner.state == ObjectState::Started {
                continue;
            }
            if let Err(e) = inner.object.start() {
                drop(inner);
                sink_error!(self.logger, "[MediaChain] {} failed to start: {}", slot.name, e);
                for &j in started.iter().rev() {
                    let mut other = lock(&self.nodes[j].inner);
                    other.object.stop();
                    other.state = ObjectState::Stopped;
                }
                return Err(MediaError::StartFailed {
                    node: slot.name.clone(),
                    reason: e.to_string(),
                });
            }
            inner.state = ObjectState::Started;
            started.push(i);
        }

        self.running.store(true, Ordering::Release);
        sink_info!(self.logger, "[MediaChain] started {} nodes", self.nodes.len());
        Ok(())
    }

    /// Stops every started node, newest first. Idempotent.
    pub fn stop_chain(&self) {
        self.running.store(false, Ordering::Release);
        for slot in self.nodes.iter().rev() {
            let mut inner = lock(&slot.inner);
            if inner.state == ObjectState::Started {
                inner.object.stop();
                inner.state = ObjectState::Stopped;
            }
        }
        sink_info!(self.logger, "[MediaChain] stopped");
    }

    /// Injects `frame` at `node` and runs it through the graph on this thread.
    ///
    /// Returns `false` when the frame was dropped: the chain is not running,
    /// the node is unknown, or the node is busy being started or stopped.
    pub fn push_frame(&self, node: NodeId, frame: Arc<MediaFrame>) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(slot) = self.nodes.get(node.0) else {
            return false;
        };

        // try_lock: a capture thread must never wait on a node that is being
        // stopped, since stopping the capture may join that very thread.
        let emitted = match slot.inner.try_lock() {
            Ok(mut inner) => Self::run_node(&mut inner, FrameOrigin::Injected, frame),
            Err(TryLockError::WouldBlock) => {
                sink_trace!(self.logger, "[MediaChain] {} busy, frame dropped", slot.name);
                return false;
            }
            Err(TryLockError::Poisoned(p)) => {
                Self::run_node(&mut p.into_inner(), FrameOrigin::Injected, frame)
            }
        };
        self.forward(node, emitted);
        true
    }

    fn run_node(
        inner: &mut NodeInner,
        origin: FrameOrigin,
        frame: Arc<MediaFrame>,
    ) -> Vec<(usize, Arc<MediaFrame>)> {
        if inner.state != ObjectState::Started {
            return Vec::new();
        }
        let mut emitter = FrameEmitter::new();
        inner.object.on_frame(origin, frame, &mut emitter);
        emitter.take()
    }

    fn forward(&self, node: NodeId, emitted: Vec<(usize, Arc<MediaFrame>)>) {
        for (out_index, frame) in emitted {
            let from = PinRef::new(node, out_index);
            for c in self.connections.iter().filter(|c| c.from == from) {
                let Some(slot) = self.nodes.get(c.to.node.0) else {
                    continue;
                };
                let next = {
                    let mut inner = lock(&slot.inner);
                    Self::run_node(&mut inner, FrameOrigin::Pin(c.to.index), frame.clone())
                };
                self.forward(c.to.node, next);
            }
        }
    }
}

impl std::fmt::Debug for MediaChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaChain")
            .field("nodes", &self.nodes.iter().map(|n| &n.name).collect::<Vec<_>>())
            .field("connections", &self.connections)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Entry point for frames produced outside the chain. Holds the chain weakly
/// so a capture device that outlives the push cannot keep it alive.
#[derive(Clone)]
pub struct ChainInput {
    chain: Weak<MediaChain>,
    node: NodeId,
}

impl ChainInput {
    pub fn new(chain: &Arc<MediaChain>, node: NodeId) -> Self {
        Self {
            chain: Arc::downgrade(chain),
            node,
        }
    }
}

impl FrameConsumer for ChainInput {
    fn on_frame(&self, frame: Arc<MediaFrame>) {
        if let Some(chain) = self.chain.upgrade() {
            chain.push_frame(self.node, frame);
        }
    }
}

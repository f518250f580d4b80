use super::media_format::MediaFormat;

/// Stable handle to a node owned by a [`MediaChain`](super::MediaChain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Addresses pin `index` of `node`. Whether it names an input or an output pin
/// depends on the side of the connection it is used on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub node: NodeId,
    pub index: usize,
}

impl PinRef {
    pub fn new(node: NodeId, index: usize) -> Self {
        Self { node, index }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InPin {
    pub format: MediaFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutPin {
    pub format: MediaFormat,
}

impl InPin {
    pub fn new(format: MediaFormat) -> Self {
        Self { format }
    }
}

impl OutPin {
    pub fn new(format: MediaFormat) -> Self {
        Self { format }
    }

    pub fn can_feed(&self, input: &InPin) -> bool {
        self.format.is_compatible(&input.format)
    }
}

//! Buffer-backed RTP packet (RFC 3550 fixed header).
//!
//! The packet owns one contiguous buffer holding header, payload and padding.
//! Header fields are cached and every setter patches the buffer in network
//! byte order, so `data()` is always ready to hand to a socket.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! |V=2|P|X|  CC   |M|     PT      |       sequence number         |
//! |                           timestamp                           |
//! |           synchronization source (SSRC) identifier            |
//! ```

use byteorder::{BigEndian, ByteOrder};

use super::rtp_error::RtpError;

pub const RTP_VERSION: u8 = 2;
pub const FIXED_HEADER_SIZE: usize = 12;
pub const DEFAULT_CAPACITY: usize = 1500;

const MARKER_BIT: u8 = 0x80;
const PAYLOAD_TYPE_MASK: u8 = 0x7F;
const PADDING_BIT: u8 = 0x20;
const EXTENSION_BIT: u8 = 0x10;
const CSRC_COUNT_MASK: u8 = 0x0F;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    marker: bool,
    payload_type: u8,
    sequence_number: u16,
    timestamp: u32,
    ssrc: u32,
    header_size: usize,
    payload_size: usize,
    padding_size: usize,
    capacity: usize,
    buffer: Vec<u8>,
}

impl Default for RtpPacket {
    fn default() -> Self {
        Self::new()
    }
}

impl RtpPacket {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Packet whose total size (header included) may never exceed `capacity`.
    /// A capacity below the fixed header is raised to it.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(FIXED_HEADER_SIZE);
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize(FIXED_HEADER_SIZE, 0);
        buffer[0] = RTP_VERSION << 6;
        Self {
            marker: false,
            payload_type: 0,
            sequence_number: 0,
            timestamp: 0,
            ssrc: 0,
            header_size: FIXED_HEADER_SIZE,
            payload_size: 0,
            padding_size: 0,
            capacity,
            buffer,
        }
    }

    /// Decodes a packet received from the wire, skipping CSRCs and a header
    /// extension if present.
    pub fn parse(bytes: &[u8]) -> Result<Self, RtpError> {
        if bytes.len() < FIXED_HEADER_SIZE {
            return Err(RtpError::TooShort);
        }
        let version = bytes[0] >> 6;
        if version != RTP_VERSION {
            return Err(RtpError::BadVersion(version));
        }

        let csrc_count = usize::from(bytes[0] & CSRC_COUNT_MASK);
        let mut header_size = FIXED_HEADER_SIZE + csrc_count * 4;
        if bytes.len() < header_size {
            return Err(RtpError::CsrcCountMismatch {
                expected: csrc_count,
                buf_left: bytes.len() - FIXED_HEADER_SIZE,
            });
        }

        if bytes[0] & EXTENSION_BIT != 0 {
            if bytes.len() < header_size + 4 {
                return Err(RtpError::HeaderExtensionTooShort);
            }
            let words = usize::from(BigEndian::read_u16(&bytes[header_size + 2..header_size + 4]));
            header_size += 4 + words * 4;
            if bytes.len() < header_size {
                return Err(RtpError::HeaderExtensionTooShort);
            }
        }

        let mut padding_size = 0;
        if bytes[0] & PADDING_BIT != 0 {
            padding_size = usize::from(bytes[bytes.len() - 1]);
            if padding_size == 0 || header_size + padding_size > bytes.len() {
                return Err(RtpError::PaddingTooShort);
            }
        }

        Ok(Self {
            marker: bytes[1] & MARKER_BIT != 0,
            payload_type: bytes[1] & PAYLOAD_TYPE_MASK,
            sequence_number: BigEndian::read_u16(&bytes[2..4]),
            timestamp: BigEndian::read_u32(&bytes[4..8]),
            ssrc: BigEndian::read_u32(&bytes[8..12]),
            header_size,
            payload_size: bytes.len() - header_size - padding_size,
            padding_size,
            capacity: bytes.len().max(DEFAULT_CAPACITY),
            buffer: bytes.to_vec(),
        })
    }

    pub fn marker(&self) -> bool {
        self.marker
    }
    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }
    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }
    pub fn header_size(&self) -> usize {
        self.header_size
    }
    pub fn payload_size(&self) -> usize {
        self.payload_size
    }
    pub fn padding_size(&self) -> usize {
        self.padding_size
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    /// Total bytes on the wire.
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }
    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.header_size..self.header_size + self.payload_size]
    }

    pub fn set_marker(&mut self, marker: bool) {
        self.marker = marker;
        if marker {
            self.buffer[1] |= MARKER_BIT;
        } else {
            self.buffer[1] &= !MARKER_BIT;
        }
    }

    /// Only the low 7 bits are used; the marker bit is left untouched.
    pub fn set_payload_type(&mut self, payload_type: u8) {
        self.payload_type = payload_type & PAYLOAD_TYPE_MASK;
        self.buffer[1] = (self.buffer[1] & MARKER_BIT) | self.payload_type;
    }

    pub fn set_sequence_number(&mut self, seq: u16) {
        self.sequence_number = seq;
        BigEndian::write_u16(&mut self.buffer[2..4], seq);
    }

    pub fn set_timestamp(&mut self, ts: u32) {
        self.timestamp = ts;
        BigEndian::write_u32(&mut self.buffer[4..8], ts);
    }

    pub fn set_ssrc(&mut self, ssrc: u32) {
        self.ssrc = ssrc;
        BigEndian::write_u32(&mut self.buffer[8..12], ssrc);
    }

    /// Resizes the payload region, keeping any bytes already written.
    /// Fails without touching the packet when header plus payload would not fit.
    pub fn set_payload_size(&mut self, size: usize) -> Result<(), RtpError> {
        let needed = self.header_size + size;
        if needed > self.capacity {
            return Err(RtpError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        self.payload_size = size;
        self.padding_size = 0;
        self.buffer.resize(needed, 0);
        Ok(())
    }

    /// Resets the payload to empty, then grows it to `size` zeroed bytes and
    /// returns the writable region. `None` if it does not fit the capacity.
    pub fn allocate_payload(&mut self, size: usize) -> Option<&mut [u8]> {
        self.set_payload_size(0).ok()?;
        self.set_payload_size(size).ok()?;
        let start = self.header_size;
        Some(&mut self.buffer[start..start + size])
    }

    /// Back to a header-only packet with every field zeroed, ready for reuse.
    pub fn clear(&mut self) {
        self.marker = false;
        self.payload_type = 0;
        self.sequence_number = 0;
        self.timestamp = 0;
        self.ssrc = 0;
        self.header_size = FIXED_HEADER_SIZE;
        self.payload_size = 0;
        self.padding_size = 0;
        self.buffer.clear();
        self.buffer.resize(FIXED_HEADER_SIZE, 0);
        self.buffer[0] = RTP_VERSION << 6;
    }
}

//! Annex-B NAL unit discovery and H.264 NAL header constants.

pub const NAL_HEADER_SIZE: usize = 1;
pub const FU_A_HEADER_SIZE: usize = 2;
pub const LENGTH_FIELD_SIZE: usize = 2;

pub const F_BIT: u8 = 0x80;
pub const NRI_MASK: u8 = 0x60;
pub const TYPE_MASK: u8 = 0x1F;
pub const FU_START_BIT: u8 = 0x80;
pub const FU_END_BIT: u8 = 0x40;

const SHORT_START_CODE_SIZE: usize = 3;

/// NAL unit types the engine cares about (RFC 6184 §5.2, H.264 Table 7-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    Slice,
    Idr,
    Sei,
    Sps,
    Pps,
    Aud,
    StapA,
    FuA,
    Other(u8),
}

impl NaluType {
    pub fn from_header(header: u8) -> Self {
        match header & TYPE_MASK {
            1 => NaluType::Slice,
            5 => NaluType::Idr,
            6 => NaluType::Sei,
            7 => NaluType::Sps,
            8 => NaluType::Pps,
            9 => NaluType::Aud,
            24 => NaluType::StapA,
            28 => NaluType::FuA,
            other => NaluType::Other(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            NaluType::Slice => 1,
            NaluType::Idr => 5,
            NaluType::Sei => 6,
            NaluType::Sps => 7,
            NaluType::Pps => 8,
            NaluType::Aud => 9,
            NaluType::StapA => 24,
            NaluType::FuA => 28,
            NaluType::Other(t) => t & TYPE_MASK,
        }
    }
}

/// Location of one NAL unit inside an Annex-B buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaluIndex {
    /// First byte of the start code (3 or 4 bytes long).
    pub start_offset: usize,
    /// First byte after the start code, i.e. the NAL header.
    pub payload_start_offset: usize,
    pub payload_size: usize,
}

impl NaluIndex {
    pub fn payload<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.payload_start_offset..self.payload_start_offset + self.payload_size]
    }
}

/// Scans for `00 00 01` start codes, widening to `00 00 00 01` when the byte
/// before is zero. Each NAL unit runs up to the next start code, the last one
/// to the end of the buffer.
pub fn find_nalu_indices(buffer: &[u8]) -> Vec<NaluIndex> {
    let mut sequence: Vec<NaluIndex> = Vec::new();
    if buffer.len() < SHORT_START_CODE_SIZE {
        return sequence;
    }

    let end = buffer.len() - SHORT_START_CODE_SIZE;
    let mut i = 0;
    while i < end {
        if buffer[i + 2] > 1 {
            i += 3;
        } else if buffer[i + 2] == 1 {
            if buffer[i + 1] == 0 && buffer[i] == 0 {
                let mut index = NaluIndex {
                    start_offset: i,
                    payload_start_offset: i + SHORT_START_CODE_SIZE,
                    payload_size: 0,
                };
                if index.start_offset > 0 && buffer[index.start_offset - 1] == 0 {
                    index.start_offset -= 1;
                }
                if let Some(prev) = sequence.last_mut() {
                    prev.payload_size = index.start_offset - prev.payload_start_offset;
                }
                sequence.push(index);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    if let Some(last) = sequence.last_mut() {
        last.payload_size = buffer.len() - last.payload_start_offset;
    }
    sequence
}

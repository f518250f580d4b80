/// Payload budget for one packetization pass.
///
/// The reduction lengths reserve room for per-packet overhead that depends on
/// where the packet sits in the frame's output sequence: the only packet, the
/// first one, or the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadLimits {
    pub max_payload_len: usize,
    pub single_packet_reduction_len: usize,
    pub first_packet_reduction_len: usize,
    pub last_packet_reduction_len: usize,
}

impl Default for PayloadLimits {
    fn default() -> Self {
        Self {
            max_payload_len: 1200,
            single_packet_reduction_len: 0,
            first_packet_reduction_len: 0,
            last_packet_reduction_len: 0,
        }
    }
}

impl PayloadLimits {
    pub fn with_max_payload_len(max_payload_len: usize) -> Self {
        Self {
            max_payload_len,
            ..Self::default()
        }
    }
}

/// Splits `payload_len` bytes into pieces of nearly equal size that each fit
/// `limits`, in order. Concatenating the pieces covers the payload exactly.
///
/// Returns a single piece when everything fits in one packet, and an empty
/// vector when the limits leave no room for even one byte in the first or
/// last packet.
pub fn split_about_equal(payload_len: usize, limits: &PayloadLimits) -> Vec<usize> {
    let max = limits.max_payload_len;
    let first_reduction = limits.first_packet_reduction_len;
    let last_reduction = limits.last_packet_reduction_len;

    if max >= limits.single_packet_reduction_len.saturating_add(payload_len) {
        return vec![payload_len];
    }
    if max <= first_reduction || max <= last_reduction {
        return Vec::new();
    }

    // Reductions are spread over the packets as if they were payload.
    let total = payload_len + first_reduction + last_reduction;
    let mut packets_left = total.div_ceil(max).max(2);
    // Every packet needs at least one payload byte.
    if payload_len < packets_left {
        return Vec::new();
    }
    let mut bytes_per_packet = total / packets_left;
    let larger_packets = total % packets_left;

    let mut pieces = Vec::with_capacity(packets_left);
    let mut remaining = payload_len;
    let mut first_packet = true;
    while remaining > 0 {
        // The last `larger_packets` packets carry one extra byte.
        if packets_left == larger_packets {
            bytes_per_packet += 1;
        }
        let mut current = bytes_per_packet;
        if first_packet {
            current = if current > first_reduction + 1 {
                current - first_reduction
            } else {
                1
            };
        }
        current = current.min(remaining);
        // Keep at least one byte for the last packet.
        if packets_left == 2 && current == remaining && current > 1 {
            current -= 1;
        }
        pieces.push(current);
        remaining -= current;
        packets_left = packets_left.saturating_sub(1);
        first_packet = false;
    }
    pieces
}

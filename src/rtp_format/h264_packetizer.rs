//! RFC 6184 H.264 -> RTP packetizer (non-interleaved mode).
//!
//! Input  : one Annex-B access unit plus a [`PayloadLimits`] budget.
//! Output : RTP payloads written into caller-provided [`RtpPacket`]s, one per
//!          [`next_packet`](RtpPacketizerH264::next_packet) call.
//!
//! Packet kinds:
//!   - Single NAL unit: a NAL unit that fits alone is sent unmodified.
//!   - STAP-A: several small NAL units share one packet, each behind a
//!     2-byte big-endian length, after a 1-byte STAP-A header.
//!   - FU-A: a large NAL unit is split into near-equal fragments, each
//!     preceded by a (FU indicator, FU header) pair.
//!
//! Marker : set only on the last packet of the access unit.
//!
//! All planning happens in [`RtpPacketizerH264::new`]. If any NAL unit cannot
//! be fragmented the whole access unit is rejected and no packet is produced.

use std::collections::VecDeque;

use byteorder::{BigEndian, ByteOrder};

use super::{
    nalu::{
        F_BIT, FU_A_HEADER_SIZE, FU_END_BIT, FU_START_BIT, LENGTH_FIELD_SIZE, NAL_HEADER_SIZE,
        NRI_MASK, NaluType, TYPE_MASK, find_nalu_indices,
    },
    packetize_error::PacketizeError,
    payload_limits::{PayloadLimits, split_about_equal},
};
use crate::rtp::rtp_packet::RtpPacket;

/// One RTP packet's worth of a NAL unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketUnit<'a> {
    /// Whole NAL unit when aggregated, otherwise a fragment of the bytes after the NAL header.
    pub source_fragment: &'a [u8],
    pub first_fragment: bool,
    pub last_fragment: bool,
    pub aggregated: bool,
    /// Original NAL header byte.
    pub header: u8,
}

#[derive(Debug)]
pub struct RtpPacketizerH264<'a> {
    limits: PayloadLimits,
    packets: VecDeque<PacketUnit<'a>>,
    num_packets_left: usize,
}

impl<'a> RtpPacketizerH264<'a> {
    pub fn new(payload: &'a [u8], limits: PayloadLimits) -> Result<Self, PacketizeError> {
        let fragments: Vec<&'a [u8]> = find_nalu_indices(payload)
            .iter()
            .map(|idx| idx.payload(payload))
            .filter(|nalu| !nalu.is_empty())
            .collect();
        if fragments.is_empty() {
            return Err(PacketizeError::NoNalUnits);
        }

        let mut packetizer = Self {
            limits,
            packets: VecDeque::new(),
            num_packets_left: 0,
        };
        packetizer.generate_packets(&fragments)?;
        Ok(packetizer)
    }

    pub fn num_packets(&self) -> usize {
        self.num_packets_left
    }

    /// Planned packets not yet written, front first.
    pub fn pending_units(&self) -> impl Iterator<Item = &PacketUnit<'a>> {
        self.packets.iter()
    }

    fn generate_packets(&mut self, fragments: &[&'a [u8]]) -> Result<(), PacketizeError> {
        let count = fragments.len();
        let mut i = 0;
        while i < count {
            let mut capacity = self.limits.max_payload_len;
            if count == 1 {
                capacity = capacity.saturating_sub(self.limits.single_packet_reduction_len);
            } else if i == 0 {
                capacity = capacity.saturating_sub(self.limits.first_packet_reduction_len);
            } else if i + 1 == count {
                capacity = capacity.saturating_sub(self.limits.last_packet_reduction_len);
            }

            if fragments[i].len() > capacity {
                self.packetize_fu_a(fragments, i)?;
                i += 1;
            } else {
                i = self.packetize_stap_a(fragments, i)?;
            }
        }
        Ok(())
    }

    fn packetize_fu_a(&mut self, fragments: &[&'a [u8]], index: usize) -> Result<(), PacketizeError> {
        let fragment = fragments[index];
        let count = fragments.len();
        let is_first = index == 0;
        let is_last = index + 1 == count;

        let mut limits = self.limits;
        limits.max_payload_len = limits.max_payload_len.saturating_sub(FU_A_HEADER_SIZE);
        if count != 1 {
            limits.single_packet_reduction_len = if is_last {
                self.limits.last_packet_reduction_len
            } else if is_first {
                self.limits.first_packet_reduction_len
            } else {
                0
            };
        }
        if !is_first {
            limits.first_packet_reduction_len = 0;
        }
        if !is_last {
            limits.last_packet_reduction_len = 0;
        }

        let sizes = split_about_equal(fragment.len() - NAL_HEADER_SIZE, &limits);
        if sizes.is_empty() {
            return Err(PacketizeError::LimitsTooSmall {
                index,
                size: fragment.len(),
            });
        }

        let mut offset = NAL_HEADER_SIZE;
        let pieces = sizes.len();
        for (i, len) in sizes.into_iter().enumerate() {
            self.packets.push_back(PacketUnit {
                source_fragment: &fragment[offset..offset + len],
                first_fragment: i == 0,
                last_fragment: i + 1 == pieces,
                aggregated: false,
                header: fragment[0],
            });
            offset += len;
        }
        self.num_packets_left += pieces;
        Ok(())
    }

    /// Aggregates NAL units starting at `index` into one packet and returns the
    /// index of the first NAL unit left out.
    fn packetize_stap_a(
        &mut self,
        fragments: &[&'a [u8]],
        mut index: usize,
    ) -> Result<usize, PacketizeError> {
        let count = fragments.len();
        let mut payload_left = self.limits.max_payload_len;
        if count == 1 {
            payload_left = payload_left.saturating_sub(self.limits.single_packet_reduction_len);
        } else if index == 0 {
            payload_left = payload_left.saturating_sub(self.limits.first_packet_reduction_len);
        }

        let start = index;
        let mut aggregated = 0usize;
        let mut headers_len = 0usize;
        loop {
            let fragment = fragments[index];
            let mut needed = fragment.len() + headers_len;
            if count > 1 && index + 1 == count {
                needed += self.limits.last_packet_reduction_len;
            }
            if payload_left < needed {
                break;
            }

            self.packets.push_back(PacketUnit {
                source_fragment: fragment,
                first_fragment: aggregated == 0,
                last_fragment: false,
                aggregated: true,
                header: fragment[0],
            });
            payload_left -= fragment.len() + headers_len;

            // A second unit turns this into a STAP-A: it pays for its own length
            // field plus the STAP-A header and the first unit's length field.
            headers_len = LENGTH_FIELD_SIZE;
            if aggregated == 0 {
                headers_len += NAL_HEADER_SIZE + LENGTH_FIELD_SIZE;
            }
            aggregated += 1;
            index += 1;
            if index == count {
                break;
            }
        }

        match self.packets.back_mut() {
            Some(unit) if aggregated > 0 => unit.last_fragment = true,
            _ => {
                return Err(PacketizeError::LimitsTooSmall {
                    index: start,
                    size: fragments[start].len(),
                });
            }
        }
        self.num_packets_left += 1;
        Ok(index)
    }

    /// Writes the next planned packet into `packet`. Returns `false` when the
    /// queue is empty or the packet buffer is too small for the payload.
    pub fn next_packet(&mut self, packet: &mut RtpPacket) -> bool {
        let Some(unit) = self.packets.front().copied() else {
            return false;
        };

        let written = if unit.first_fragment && unit.last_fragment {
            self.next_single_packet(unit, packet)
        } else if unit.aggregated {
            self.next_aggregate_packet(unit, packet)
        } else {
            self.next_fragment_packet(unit, packet)
        };
        if !written {
            return false;
        }

        packet.set_marker(self.packets.is_empty());
        self.num_packets_left = self.num_packets_left.saturating_sub(1);
        true
    }

    fn next_single_packet(&mut self, unit: PacketUnit<'a>, packet: &mut RtpPacket) -> bool {
        let Some(buf) = packet.allocate_payload(unit.source_fragment.len()) else {
            return false;
        };
        buf.copy_from_slice(unit.source_fragment);
        self.packets.pop_front();
        true
    }

    fn next_aggregate_packet(&mut self, first: PacketUnit<'a>, packet: &mut RtpPacket) -> bool {
        let group_len = self
            .packets
            .iter()
            .position(|u| u.last_fragment)
            .map_or(self.packets.len(), |p| p + 1);
        let size = NAL_HEADER_SIZE
            + self
                .packets
                .iter()
                .take(group_len)
                .map(|u| LENGTH_FIELD_SIZE + u.source_fragment.len())
                .sum::<usize>();

        let Some(buf) = packet.allocate_payload(size) else {
            return false;
        };
        buf[0] = (first.header & (F_BIT | NRI_MASK)) | NaluType::StapA.as_u8();
        let mut at = NAL_HEADER_SIZE;
        for unit in self.packets.drain(..group_len) {
            let len = unit.source_fragment.len();
            // Single NAL units never exceed a u16 length; the payload budget is far smaller.
            BigEndian::write_u16(&mut buf[at..at + LENGTH_FIELD_SIZE], len as u16);
            at += LENGTH_FIELD_SIZE;
            buf[at..at + len].copy_from_slice(unit.source_fragment);
            at += len;
        }
        true
    }

    fn next_fragment_packet(&mut self, unit: PacketUnit<'a>, packet: &mut RtpPacket) -> bool {
        let fu_indicator = (unit.header & (F_BIT | NRI_MASK)) | NaluType::FuA.as_u8();
        let mut fu_header = unit.header & TYPE_MASK;
        if unit.first_fragment {
            fu_header |= FU_START_BIT;
        }
        if unit.last_fragment {
            fu_header |= FU_END_BIT;
        }

        let len = unit.source_fragment.len();
        let Some(buf) = packet.allocate_payload(FU_A_HEADER_SIZE + len) else {
            return false;
        };
        buf[0] = fu_indicator;
        buf[1] = fu_header;
        buf[FU_A_HEADER_SIZE..].copy_from_slice(unit.source_fragment);
        self.packets.pop_front();
        true
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn drain(mut p: RtpPacketizerH264<'_>) -> Vec<RtpPacket> {
        let mut out = Vec::new();
        loop {
            let mut pkt = RtpPacket::new();
            if !p.next_packet(&mut pkt) {
                break;
            }
            out.push(pkt);
        }
        out
    }

    fn annexb(nalus: &[&[u8]]) -> Vec<u8> {
        let mut buf = Vec::new();
        for n in nalus {
            buf.extend_from_slice(&[0, 0, 0, 1]);
            buf.extend_from_slice(n);
        }
        buf
    }

    #[test]
    fn small_nalu_is_sent_unmodified() {
        let nalu = [0x65, 1, 2, 3, 4, 5];
        let frame = annexb(&[&nalu]);
        let p = RtpPacketizerH264::new(&frame, PayloadLimits::default()).unwrap();
        assert_eq!(p.num_packets(), 1);
        let pkts = drain(p);
        assert_eq!(pkts.len(), 1);
        assert_eq!(pkts[0].payload(), &nalu);
        assert!(pkts[0].marker());
    }

    #[test]
    fn sps_pps_idr_are_aggregated() {
        let sps = [0x67, 0x42, 0x00, 0x1F];
        let pps = [0x68, 0xCE, 0x3C];
        let idr = [0x65, 0x88, 0x84];
        let frame = annexb(&[&sps, &pps, &idr]);
        let pkts = drain(RtpPacketizerH264::new(&frame, PayloadLimits::default()).unwrap());
        assert_eq!(pkts.len(), 1);

        let payload = pkts[0].payload();
        assert_eq!(payload[0], (0x67 & 0x60) | 24);
        assert_eq!(&payload[1..3], &[0, 4]);
        assert_eq!(&payload[3..7], &sps);
        assert_eq!(&payload[7..9], &[0, 3]);
        assert_eq!(&payload[9..12], &pps);
        assert_eq!(&payload[12..14], &[0, 3]);
        assert_eq!(&payload[14..], &idr);
        assert!(pkts[0].marker());
    }

    #[test]
    fn large_nalu_is_fragmented_with_start_and_end_bits() {
        let mut nalu = vec![0x65];
        nalu.extend((0..2500u32).map(|i| (i % 251) as u8 + 1));
        let frame = annexb(&[&nalu]);
        let pkts = drain(RtpPacketizerH264::new(&frame, PayloadLimits::default()).unwrap());
        assert_eq!(pkts.len(), 3);

        let mut rebuilt = vec![(pkts[0].payload()[0] & 0xE0) | (pkts[0].payload()[1] & 0x1F)];
        for (i, pkt) in pkts.iter().enumerate() {
            let p = pkt.payload();
            assert!(p.len() <= 1200);
            assert_eq!(p[0] & 0x1F, 28);
            assert_eq!(p[1] & 0x80 != 0, i == 0);
            assert_eq!(p[1] & 0x40 != 0, i == pkts.len() - 1);
            assert_eq!(pkt.marker(), i == pkts.len() - 1);
            rebuilt.extend_from_slice(&p[2..]);
        }
        assert_eq!(rebuilt, nalu);
    }

    #[test]
    fn mixed_small_and_large() {
        let sps = [0x67, 0x42];
        let mut idr = vec![0x65];
        idr.extend(std::iter::repeat_n(0xAB, 300));
        let frame = annexb(&[&sps, &idr]);
        let p = RtpPacketizerH264::new(&frame, PayloadLimits::with_max_payload_len(100)).unwrap();
        let units: Vec<_> = p.pending_units().copied().collect();
        assert!(units[0].aggregated && units[0].first_fragment && units[0].last_fragment);
        assert!(units[1..].iter().all(|u| !u.aggregated));
        let pkts = drain(p);
        assert_eq!(pkts[0].payload(), &sps);
        assert!(pkts.iter().all(|p| p.payload().len() <= 100));
        assert_eq!(pkts.iter().filter(|p| p.marker()).count(), 1);
    }

    #[test]
    fn limits_too_small_rejects_the_whole_frame() {
        let sps = [0x67, 0x42];
        let idr = [0x65, 1, 2, 3, 4, 5, 6, 7];
        let frame = annexb(&[&sps, &idr]);
        let limits = PayloadLimits {
            max_payload_len: 4,
            last_packet_reduction_len: 4,
            ..PayloadLimits::default()
        };
        assert_eq!(
            RtpPacketizerH264::new(&frame, limits).unwrap_err(),
            PacketizeError::LimitsTooSmall { index: 1, size: 8 }
        );
    }

    #[test]
    fn nalu_too_short_to_fragment_is_rejected() {
        // Forced into FU-A, but one payload byte cannot fill two fragments.
        let frame = annexb(&[&[0x65, 0xAA]]);
        let limits = PayloadLimits {
            max_payload_len: 10,
            single_packet_reduction_len: 10,
            first_packet_reduction_len: 5,
            last_packet_reduction_len: 5,
        };
        assert_eq!(
            RtpPacketizerH264::new(&frame, limits).unwrap_err(),
            PacketizeError::LimitsTooSmall { index: 0, size: 2 }
        );
    }

    #[test]
    fn empty_access_unit_is_an_error() {
        assert_eq!(
            RtpPacketizerH264::new(&[1, 2, 3, 4], PayloadLimits::default()).unwrap_err(),
            PacketizeError::NoNalUnits
        );
        assert_eq!(
            RtpPacketizerH264::new(&[0, 0, 1], PayloadLimits::default()).unwrap_err(),
            PacketizeError::NoNalUnits
        );
    }

    #[test]
    fn undersized_packet_buffer_is_reported() {
        let nalu = [0x65; 40];
        let frame = annexb(&[&nalu]);
        let mut p = RtpPacketizerH264::new(&frame, PayloadLimits::default()).unwrap();
        let mut tiny = RtpPacket::with_capacity(20);
        assert!(!p.next_packet(&mut tiny));
        assert_eq!(p.num_packets(), 1);
        let mut ok = RtpPacket::new();
        assert!(p.next_packet(&mut ok));
    }
}

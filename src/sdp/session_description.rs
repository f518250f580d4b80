use std::fmt;

use super::{candidate::Candidate, codec_info::CodecInfo};

pub const GROUP_BUNDLE: &str = "BUNDLE";
pub const SSRC_GROUP_FID: &str = "FID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    Offer,
    Answer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    pub fn from_sdp(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtpDirection {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl RtpDirection {
    pub fn from_send_recv(send: bool, recv: bool) -> Self {
        match (send, recv) {
            (true, true) => RtpDirection::SendRecv,
            (true, false) => RtpDirection::SendOnly,
            (false, true) => RtpDirection::RecvOnly,
            (false, false) => RtpDirection::Inactive,
        }
    }

    pub fn as_attribute(self) -> &'static str {
        match self {
            RtpDirection::SendRecv => "sendrecv",
            RtpDirection::SendOnly => "sendonly",
            RtpDirection::RecvOnly => "recvonly",
            RtpDirection::Inactive => "inactive",
        }
    }

    pub fn from_attribute(s: &str) -> Option<Self> {
        match s {
            "sendrecv" => Some(RtpDirection::SendRecv),
            "sendonly" => Some(RtpDirection::SendOnly),
            "recvonly" => Some(RtpDirection::RecvOnly),
            "inactive" => Some(RtpDirection::Inactive),
            _ => None,
        }
    }
}

/// `a=group:<semantics> <mid> ...`, mids unique and in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGroup {
    pub semantics: String,
    content_names: Vec<String>,
}

impl ContentGroup {
    pub fn new(semantics: &str) -> Self {
        Self {
            semantics: semantics.to_owned(),
            content_names: Vec::new(),
        }
    }

    pub fn content_names(&self) -> &[String] {
        &self.content_names
    }

    pub fn first_name(&self) -> Option<&str> {
        self.content_names.first().map(String::as_str)
    }

    pub fn has_content_name(&self, name: &str) -> bool {
        self.content_names.iter().any(|n| n == name)
    }

    /// Ignores names already present.
    pub fn add_content_name(&mut self, name: &str) {
        if !self.has_content_name(name) {
            self.content_names.push(name.to_owned());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportDescription {
    pub mid: String,
    pub ice_ufrag: String,
    pub ice_pwd: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsrcGroup {
    pub semantics: String,
    pub ssrcs: Vec<u32>,
}

/// One outgoing media stream: its SSRCs, their grouping and the CNAME.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamParams {
    pub id: String,
    pub cname: String,
    pub ssrcs: Vec<u32>,
    pub ssrc_groups: Vec<SsrcGroup>,
}

impl StreamParams {
    pub fn first_ssrc(&self) -> Option<u32> {
        self.ssrcs.first().copied()
    }

    /// Adds `rtx_ssrc` and links it to `primary` under FID semantics.
    pub fn add_fid_ssrc(&mut self, primary: u32, rtx_ssrc: u32) {
        if !self.ssrcs.contains(&primary) {
            self.ssrcs.push(primary);
        }
        self.ssrcs.push(rtx_ssrc);
        self.ssrc_groups.push(SsrcGroup {
            semantics: SSRC_GROUP_FID.into(),
            ssrcs: vec![primary, rtx_ssrc],
        });
    }

    /// Retransmission SSRC paired with `primary`, if any.
    pub fn fid_ssrc(&self, primary: u32) -> Option<u32> {
        self.ssrc_groups
            .iter()
            .find(|g| g.semantics == SSRC_GROUP_FID && g.ssrcs.first() == Some(&primary))
            .and_then(|g| g.ssrcs.get(1).copied())
    }
}

/// One m= section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaContentDescription {
    pub kind: MediaKind,
    pub mid: String,
    pub protocol: String,
    pub direction: RtpDirection,
    pub rtcp_mux: bool,
    pub codecs: Vec<CodecInfo>,
    pub candidates: Vec<Candidate>,
    pub streams: Vec<StreamParams>,
}

impl MediaContentDescription {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            mid: kind.as_str().to_owned(),
            protocol: "UDP/TLS/RTP/SAVPF".into(),
            direction: RtpDirection::SendRecv,
            rtcp_mux: false,
            codecs: Vec::new(),
            candidates: Vec::new(),
            streams: Vec::new(),
        }
    }

    pub fn codec_by_name(&self, name: &str) -> Option<&CodecInfo> {
        self.codecs.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub sdp_type: SdpType,
    pub session_id: u64,
    pub session_version: u64,
    pub contents: Vec<MediaContentDescription>,
    pub content_groups: Vec<ContentGroup>,
    pub transport_infos: Vec<TransportDescription>,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType) -> Self {
        Self {
            sdp_type,
            session_id: 0,
            session_version: 2,
            contents: Vec::new(),
            content_groups: Vec::new(),
            transport_infos: Vec::new(),
        }
    }

    pub fn group(&self, semantics: &str) -> Option<&ContentGroup> {
        self.content_groups.iter().find(|g| g.semantics == semantics)
    }

    pub fn bundle_group(&self) -> Option<&ContentGroup> {
        self.group(GROUP_BUNDLE)
    }

    /// Adds `group`, merging its names into an existing group of the same semantics.
    pub fn add_group(&mut self, group: ContentGroup) {
        match self
            .content_groups
            .iter_mut()
            .find(|g| g.semantics == group.semantics)
        {
            Some(existing) => {
                for name in group.content_names() {
                    existing.add_content_name(name);
                }
            }
            None => self.content_groups.push(group),
        }
    }

    pub fn content(&self, mid: &str) -> Option<&MediaContentDescription> {
        self.contents.iter().find(|c| c.mid == mid)
    }

    pub fn first_content_of(&self, kind: MediaKind) -> Option<&MediaContentDescription> {
        self.contents.iter().find(|c| c.kind == kind)
    }

    pub fn transport_info(&self, mid: &str) -> Option<&TransportDescription> {
        self.transport_infos.iter().find(|t| t.mid == mid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_table() {
        assert_eq!(RtpDirection::from_send_recv(true, true), RtpDirection::SendRecv);
        assert_eq!(RtpDirection::from_send_recv(true, false), RtpDirection::SendOnly);
        assert_eq!(RtpDirection::from_send_recv(false, true), RtpDirection::RecvOnly);
        assert_eq!(RtpDirection::from_send_recv(false, false), RtpDirection::Inactive);
    }

    #[test]
    fn groups_merge_without_duplicates() {
        let mut sd = SessionDescription::new(SdpType::Offer);
        let mut g = ContentGroup::new(GROUP_BUNDLE);
        g.add_content_name("audio");
        g.add_content_name("audio");
        sd.add_group(g);
        let mut again = ContentGroup::new(GROUP_BUNDLE);
        again.add_content_name("audio");
        again.add_content_name("video");
        sd.add_group(again);

        assert_eq!(sd.content_groups.len(), 1);
        let bundle = sd.bundle_group().map(|g| g.content_names().to_vec());
        assert_eq!(bundle, Some(vec!["audio".to_string(), "video".to_string()]));
    }

    #[test]
    fn fid_lookup() {
        let mut sp = StreamParams::default();
        sp.ssrcs.push(1111);
        sp.add_fid_ssrc(1111, 2222);
        assert_eq!(sp.ssrcs, vec![1111, 2222]);
        assert_eq!(sp.fid_ssrc(1111), Some(2222));
        assert_eq!(sp.fid_ssrc(2222), None);
    }
}

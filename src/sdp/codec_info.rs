use std::str::FromStr;

use super::sdp_error::SdpError;

/// Value of an `a=rtpmap:` attribute: `<pt> <encoding>/<clock>[/<params>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpMap {
    pub payload_type: u8,
    pub encoding_name: String, // case-insensitive in SDP
    pub clock_rate: u32,
    pub encoding_params: Option<u16>, // channels for audio
}

impl FromStr for RtpMap {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |what: &str| SdpError::InvalidRtpMap(format!("{what}: '{s}'"));

        let mut it = s.split_whitespace();
        let pt_str = it.next().ok_or_else(|| invalid("missing payload type"))?;
        let rhs = it.next().ok_or_else(|| invalid("missing encoding"))?;
        if it.next().is_some() {
            return Err(invalid("trailing tokens"));
        }

        let payload_type: u8 = pt_str.parse().map_err(|_| invalid("invalid payload type"))?;
        if payload_type > 127 {
            return Err(invalid("payload type out of [0,127]"));
        }

        let mut parts = rhs.splitn(3, '/');
        let encoding_name = parts
            .next()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid("missing encoding name"))?
            .to_string();
        let clock_rate: u32 = parts
            .next()
            .ok_or_else(|| invalid("missing clock rate"))?
            .trim()
            .parse()
            .map_err(|_| invalid("invalid clock rate"))?;

        let encoding_params = match parts.next().map(str::trim) {
            None | Some("") => None,
            Some(p) => {
                let v: u16 = p.parse().map_err(|_| invalid("invalid encoding params"))?;
                if v == 0 { None } else { Some(v) }
            }
        };

        Ok(RtpMap {
            payload_type,
            encoding_name,
            clock_rate,
            encoding_params,
        })
    }
}

/// One negotiated codec of a media section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecInfo {
    pub payload_type: u8,
    pub name: String,
    pub clock_rate: u32,
    pub channels: Option<u16>,
    /// Raw `a=fmtp` parameter string.
    pub fmtp: Option<String>,
    /// `a=rtcp-fb` values, e.g. "nack pli".
    pub feedback: Vec<String>,
}

impl CodecInfo {
    pub fn from_rtpmap(map: RtpMap) -> Self {
        Self {
            payload_type: map.payload_type,
            name: map.encoding_name,
            clock_rate: map.clock_rate,
            channels: map.encoding_params,
            fmtp: None,
            feedback: Vec::new(),
        }
    }

    pub fn rtpmap_value(&self) -> String {
        match self.channels {
            Some(ch) => format!("{} {}/{}/{}", self.payload_type, self.name, self.clock_rate, ch),
            None => format!("{} {}/{}", self.payload_type, self.name, self.clock_rate),
        }
    }

    pub fn is_rtx(&self) -> bool {
        self.name.eq_ignore_ascii_case("rtx")
    }

    pub fn opus() -> Self {
        Self {
            payload_type: 111,
            name: "opus".into(),
            clock_rate: 48_000,
            channels: Some(2),
            fmtp: Some("minptime=10;useinbandfec=1".into()),
            feedback: vec!["transport-cc".into()],
        }
    }

    pub fn h264(payload_type: u8) -> Self {
        Self {
            payload_type,
            name: "H264".into(),
            clock_rate: 90_000,
            channels: None,
            fmtp: Some(
                "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f".into(),
            ),
            feedback: vec![
                "goog-remb".into(),
                "transport-cc".into(),
                "ccm fir".into(),
                "nack".into(),
                "nack pli".into(),
            ],
        }
    }

    pub fn rtx(payload_type: u8, associated: u8) -> Self {
        Self {
            payload_type,
            name: "rtx".into(),
            clock_rate: 90_000,
            channels: None,
            fmtp: Some(format!("apt={associated}")),
            feedback: Vec::new(),
        }
    }
}

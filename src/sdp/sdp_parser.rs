//! Parser for the SDP subset a push server sends in its offer.
//!
//! Recognized, per media section: `a=candidate`, `a=ice-ufrag`, `a=ice-pwd`,
//! `a=mid`, `a=rtpmap`, `a=fmtp`, `a=rtcp-fb`, `a=rtcp-mux`, direction
//! attributes, `a=ssrc` and `a=ssrc-group`. At session level: `o=`,
//! `a=group` and ICE credentials inherited by sections lacking their own.
//! Anything else is skipped. A malformed recognized line fails the whole parse.

use super::{
    candidate::Candidate,
    codec_info::{CodecInfo, RtpMap},
    sdp_error::SdpError,
    session_description::{
        ContentGroup, MediaContentDescription, MediaKind, RtpDirection, SdpType,
        SessionDescription, SsrcGroup, StreamParams, TransportDescription,
    },
};

#[derive(Debug)]
struct Section {
    content: MediaContentDescription,
    ice_ufrag: Option<String>,
    ice_pwd: Option<String>,
}

#[derive(Debug, Default)]
struct SessionIce {
    ufrag: Option<String>,
    pwd: Option<String>,
}

pub fn parse_session_description(
    text: &str,
    sdp_type: SdpType,
) -> Result<SessionDescription, SdpError> {
    if text.trim().is_empty() {
        return Err(SdpError::Empty);
    }
    // Line ending is decided once for the whole document.
    let delimiter = if text.contains("\r\n") { "\r\n" } else { "\n" };

    let mut desc = SessionDescription::new(sdp_type);
    let mut session_ice = SessionIce::default();
    let mut sections: Vec<Section> = Vec::new();
    // Inside an m= section of a kind we do not handle (e.g. application).
    let mut skipping = false;

    for line in text.split(delimiter) {
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("o=") {
            if let Some(id) = rest.split_whitespace().nth(1).and_then(|v| v.parse().ok()) {
                desc.session_id = id;
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("m=") {
            let fields: Vec<&str> = rest.split_whitespace().collect();
            if fields.len() < 3 {
                return Err(SdpError::InvalidMediaLine(line.to_owned()));
            }
            match MediaKind::from_sdp(fields[0]) {
                Some(kind) => {
                    let mut content = MediaContentDescription::new(kind);
                    content.protocol = fields[2].to_owned();
                    sections.push(Section {
                        content,
                        ice_ufrag: None,
                        ice_pwd: None,
                    });
                    skipping = false;
                }
                None => skipping = true,
            }
            continue;
        }

        let Some(attr) = line.strip_prefix("a=") else {
            continue;
        };

        if let Some(rest) = attr.strip_prefix("group:") {
            let mut tokens = rest.split_whitespace();
            let semantics = tokens.next().ok_or_else(|| SdpError::InvalidAttribute {
                attribute: "group",
                line: line.to_owned(),
            })?;
            let mut group = ContentGroup::new(semantics);
            for mid in tokens {
                group.add_content_name(mid);
            }
            desc.add_group(group);
            continue;
        }

        if skipping {
            continue;
        }
        match sections.last_mut() {
            Some(section) => parse_media_attribute(section, attr, line)?,
            None => parse_session_attribute(&mut session_ice, attr)?,
        }
    }

    if sections.is_empty() {
        return Err(SdpError::NoMediaSections);
    }

    for section in sections {
        desc.transport_infos.push(TransportDescription {
            mid: section.content.mid.clone(),
            ice_ufrag: section
                .ice_ufrag
                .or_else(|| session_ice.ufrag.clone())
                .unwrap_or_default(),
            ice_pwd: section
                .ice_pwd
                .or_else(|| session_ice.pwd.clone())
                .unwrap_or_default(),
        });
        desc.contents.push(section.content);
    }
    Ok(desc)
}

fn ice_value(rest: &str, empty: SdpError) -> Result<String, SdpError> {
    let value = rest.trim();
    if value.is_empty() {
        return Err(empty);
    }
    Ok(value.to_owned())
}

fn parse_session_attribute(ice: &mut SessionIce, attr: &str) -> Result<(), SdpError> {
    if let Some(rest) = attr.strip_prefix("ice-ufrag:") {
        ice.ufrag = Some(ice_value(rest, SdpError::EmptyIceUfrag)?);
    } else if let Some(rest) = attr.strip_prefix("ice-pwd:") {
        ice.pwd = Some(ice_value(rest, SdpError::EmptyIcePwd)?);
    }
    Ok(())
}

fn parse_media_attribute(section: &mut Section, attr: &str, line: &str) -> Result<(), SdpError> {
    let invalid = |attribute: &'static str| SdpError::InvalidAttribute {
        attribute,
        line: line.to_owned(),
    };
    let content = &mut section.content;

    if let Some(rest) = attr.strip_prefix("candidate:") {
        content.candidates.push(rest.parse::<Candidate>()?);
    } else if let Some(rest) = attr.strip_prefix("ice-ufrag:") {
        section.ice_ufrag = Some(ice_value(rest, SdpError::EmptyIceUfrag)?);
    } else if let Some(rest) = attr.strip_prefix("ice-pwd:") {
        section.ice_pwd = Some(ice_value(rest, SdpError::EmptyIcePwd)?);
    } else if let Some(rest) = attr.strip_prefix("mid:") {
        let mid = rest.trim();
        if mid.is_empty() {
            return Err(invalid("mid"));
        }
        content.mid = mid.to_owned();
    } else if let Some(rest) = attr.strip_prefix("rtpmap:") {
        content.codecs.push(CodecInfo::from_rtpmap(rest.parse::<RtpMap>()?));
    } else if let Some(rest) = attr.strip_prefix("fmtp:") {
        let (pt, params) = rest.split_once(' ').ok_or_else(|| invalid("fmtp"))?;
        let pt: u8 = pt.parse().map_err(|_| invalid("fmtp"))?;
        if let Some(codec) = content.codecs.iter_mut().find(|c| c.payload_type == pt) {
            codec.fmtp = Some(params.trim().to_owned());
        }
    } else if let Some(rest) = attr.strip_prefix("rtcp-fb:") {
        let (pt, value) = rest.split_once(' ').ok_or_else(|| invalid("rtcp-fb"))?;
        let value = value.trim().to_owned();
        if pt == "*" {
            content.codecs.iter_mut().for_each(|c| c.feedback.push(value.clone()));
        } else {
            let pt: u8 = pt.parse().map_err(|_| invalid("rtcp-fb"))?;
            if let Some(codec) = content.codecs.iter_mut().find(|c| c.payload_type == pt) {
                codec.feedback.push(value);
            }
        }
    } else if attr == "rtcp-mux" {
        content.rtcp_mux = true;
    } else if let Some(direction) = RtpDirection::from_attribute(attr) {
        content.direction = direction;
    } else if let Some(rest) = attr.strip_prefix("ssrc-group:") {
        let mut tokens = rest.split_whitespace();
        let semantics = tokens.next().ok_or_else(|| invalid("ssrc-group"))?;
        let ssrcs = tokens
            .map(|t| t.parse::<u32>().map_err(|_| invalid("ssrc-group")))
            .collect::<Result<Vec<_>, _>>()?;
        let Some(&primary) = ssrcs.first() else {
            return Err(invalid("ssrc-group"));
        };
        stream_for(&mut content.streams, primary).ssrc_groups.push(SsrcGroup {
            semantics: semantics.to_owned(),
            ssrcs,
        });
    } else if let Some(rest) = attr.strip_prefix("ssrc:") {
        let (ssrc, value) = rest.split_once(' ').unwrap_or((rest, ""));
        let ssrc: u32 = ssrc.parse().map_err(|_| invalid("ssrc"))?;
        let stream = stream_for(&mut content.streams, ssrc);
        if !stream.ssrcs.contains(&ssrc) {
            stream.ssrcs.push(ssrc);
        }
        if let Some(cname) = value.strip_prefix("cname:") {
            stream.cname = cname.trim().to_owned();
        }
    }
    Ok(())
}

/// The stream already owning `ssrc` (directly or through a group), else a new one.
fn stream_for(streams: &mut Vec<StreamParams>, ssrc: u32) -> &mut StreamParams {
    let pos = streams.iter().position(|s| {
        s.ssrcs.contains(&ssrc) || s.ssrc_groups.iter().any(|g| g.ssrcs.contains(&ssrc))
    });
    match pos {
        Some(i) => &mut streams[i],
        None => {
            streams.push(StreamParams::default());
            let last = streams.len() - 1;
            &mut streams[last]
        }
    }
}

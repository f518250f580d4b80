use std::fmt::Write as _;

use super::session_description::{MediaContentDescription, SessionDescription};

const CRLF: &str = "\r\n";

/// Serializes `desc` with CRLF line endings.
pub fn write_session_description(desc: &SessionDescription) -> String {
    let mut out = String::with_capacity(2048);
    push_line(&mut out, "v=0");
    push_line(
        &mut out,
        &format!(
            "o=- {} {} IN IP4 127.0.0.1",
            desc.session_id, desc.session_version
        ),
    );
    push_line(&mut out, "s=-");
    push_line(&mut out, "t=0 0");

    for group in &desc.content_groups {
        let mut line = format!("a=group:{}", group.semantics);
        for name in group.content_names() {
            line.push(' ');
            line.push_str(name);
        }
        push_line(&mut out, &line);
    }

    for content in &desc.contents {
        write_media_section(&mut out, desc, content);
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push_str(CRLF);
}

fn write_media_section(out: &mut String, desc: &SessionDescription, content: &MediaContentDescription) {
    let mut m_line = format!("m={} 9 {}", content.kind, content.protocol);
    for codec in &content.codecs {
        let _ = write!(m_line, " {}", codec.payload_type);
    }
    push_line(out, &m_line);
    push_line(out, "c=IN IP4 0.0.0.0");
    push_line(out, "a=rtcp:9 IN IP4 0.0.0.0");

    if let Some(transport) = desc.transport_info(&content.mid) {
        push_line(out, &format!("a=ice-ufrag:{}", transport.ice_ufrag));
        push_line(out, &format!("a=ice-pwd:{}", transport.ice_pwd));
    }
    push_line(out, &format!("a=mid:{}", content.mid));
    push_line(out, &format!("a={}", content.direction.as_attribute()));
    if content.rtcp_mux {
        push_line(out, "a=rtcp-mux");
    }

    for codec in &content.codecs {
        push_line(out, &format!("a=rtpmap:{}", codec.rtpmap_value()));
        for fb in &codec.feedback {
            push_line(out, &format!("a=rtcp-fb:{} {}", codec.payload_type, fb));
        }
        if let Some(fmtp) = &codec.fmtp {
            push_line(out, &format!("a=fmtp:{} {}", codec.payload_type, fmtp));
        }
    }

    for candidate in &content.candidates {
        push_line(out, &format!("a=candidate:{candidate}"));
    }

    for stream in &content.streams {
        for group in &stream.ssrc_groups {
            let mut line = format!("a=ssrc-group:{}", group.semantics);
            for ssrc in &group.ssrcs {
                let _ = write!(line, " {ssrc}");
            }
            push_line(out, &line);
        }
        for ssrc in &stream.ssrcs {
            push_line(out, &format!("a=ssrc:{} cname:{}", ssrc, stream.cname));
        }
    }
}

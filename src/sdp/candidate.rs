use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use super::sdp_error::SdpError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateType {
    Host,
    ServerReflexive,
    PeerReflexive,
    Relayed,
    /// Any type token this side does not know; passed through to ICE as is.
    Other(String),
}

impl CandidateType {
    pub fn as_sdp_str(&self) -> &str {
        match self {
            CandidateType::Host => "host",
            CandidateType::ServerReflexive => "srflx",
            CandidateType::PeerReflexive => "prflx",
            CandidateType::Relayed => "relay",
            CandidateType::Other(s) => s,
        }
    }
}

impl From<&str> for CandidateType {
    fn from(s: &str) -> Self {
        match s {
            "host" => CandidateType::Host,
            "srflx" => CandidateType::ServerReflexive,
            "prflx" => CandidateType::PeerReflexive,
            "relay" => CandidateType::Relayed,
            other => CandidateType::Other(other.to_owned()),
        }
    }
}

/// A remote transport address from an `a=candidate:` line.
///
/// The connection address is kept as written, so mDNS names such as
/// `1f4c2a.local` survive until the ICE agent resolves them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Groups candidates sharing a base and server.
    pub foundation: String,
    /// 1 = RTP, 2 = RTCP.
    pub component: u8,
    /// Lowercased transport, usually "udp".
    pub protocol: String,
    pub priority: u32,
    /// IP literal or hostname.
    pub address: String,
    pub port: u16,
    pub cand_type: CandidateType,
    /// Base address for reflexive and relayed candidates.
    pub related_address: Option<String>,
    pub related_port: Option<u16>,
}

impl Candidate {
    /// The address as a socket address, when it is an IP literal.
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let ip: IpAddr = self.address.parse().ok()?;
        Some(SocketAddr::new(ip, self.port))
    }

    pub fn is_mdns(&self) -> bool {
        self.address.ends_with(".local")
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} typ {}",
            self.foundation,
            self.component,
            self.protocol,
            self.priority,
            self.address,
            self.port,
            self.cand_type.as_sdp_str(),
        )?;
        if let Some(rel) = &self.related_address {
            write!(f, " raddr {} rport {}", rel, self.related_port.unwrap_or(0))?;
        }
        Ok(())
    }
}

/// Parses the value of an `a=candidate:` attribute, with or without the
/// `candidate:` prefix:
///
/// `<foundation> <component> <protocol> <priority> <address> <port> typ <type> [raddr <addr> rport <port>] ...`
///
/// Only a short line or a non-numeric component, priority or port is an error.
impl FromStr for Candidate {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("candidate:").unwrap_or(s);
        let invalid = |what: &str| SdpError::InvalidCandidate(format!("{what} in '{s}'"));

        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() < 8 {
            return Err(invalid("fewer than 8 fields"));
        }

        let component: u8 = parts[1].parse().map_err(|_| invalid("invalid component"))?;
        let priority: u32 = parts[3].parse().map_err(|_| invalid("invalid priority"))?;
        let port: u16 = parts[5].parse().map_err(|_| invalid("invalid port"))?;

        let mut related_address = None;
        let mut related_port = None;
        let mut i = 8;
        while i + 1 < parts.len() {
            match parts[i] {
                "raddr" => related_address = Some(parts[i + 1].to_owned()),
                "rport" => related_port = parts[i + 1].parse::<u16>().ok(),
                // generation, network-id, tcptype and friends
                _ => {}
            }
            i += 2;
        }

        Ok(Candidate {
            foundation: parts[0].to_owned(),
            component,
            protocol: parts[2].to_ascii_lowercase(),
            priority,
            address: parts[4].to_owned(),
            port,
            cand_type: CandidateType::from(parts[7]),
            related_address,
            related_port,
        })
    }
}

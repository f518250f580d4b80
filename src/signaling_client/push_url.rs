use std::fmt;
use std::str::FromStr;

use url::Url;

use super::signaling_error::SignalingError;

pub const PUSH_SCHEME: &str = "xrtc";
pub const PUSH_ACTION: &str = "push";

/// A validated `xrtc://<host>/push?uid=<id>&streamName=<name>` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushUrl {
    /// Host with optional `:port`.
    pub host: String,
    pub uid: String,
    pub stream_name: String,
}

impl FromStr for PushUrl {
    type Err = SignalingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &'static str| SignalingError::InvalidUrl {
            url: s.to_owned(),
            reason,
        };

        let url = Url::parse(s.trim()).map_err(|_| invalid("not a url"))?;
        if url.scheme() != PUSH_SCHEME {
            return Err(invalid("scheme must be xrtc"));
        }
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(port)) if !h.is_empty() => format!("{h}:{port}"),
            (Some(h), None) if !h.is_empty() => h.to_owned(),
            _ => return Err(invalid("missing host")),
        };
        if url.path().trim_matches('/') != PUSH_ACTION {
            return Err(invalid("action must be push"));
        }

        let mut uid = String::new();
        let mut stream_name = String::new();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "uid" => uid = value.into_owned(),
                "streamName" => stream_name = value.into_owned(),
                _ => {}
            }
        }
        if uid.is_empty() {
            return Err(invalid("missing uid"));
        }
        if stream_name.is_empty() {
            return Err(invalid("missing streamName"));
        }

        Ok(PushUrl {
            host,
            uid,
            stream_name,
        })
    }
}

impl fmt::Display for PushUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PUSH_SCHEME}://{}/{PUSH_ACTION}?uid={}&streamName={}",
            self.host, self.uid, self.stream_name
        )
    }
}

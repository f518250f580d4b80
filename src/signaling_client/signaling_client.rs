use std::sync::Arc;

use serde::Deserialize;
use url::form_urlencoded;

use super::{
    http::{HttpClient, HttpReply, HttpRequest},
    push_url::PushUrl,
    signaling_error::SignalingError,
};
use crate::{log::log_sink::LogSink, sink_debug, sink_warn};

/// `{ "errNo": 0, "errMsg": "", "data": { "type": "offer", "sdp": "..." } }`
#[derive(Debug, Deserialize)]
struct SignalingReply {
    #[serde(rename = "errNo")]
    err_no: i64,
    #[serde(rename = "errMsg", default)]
    err_msg: String,
    #[serde(default)]
    data: Option<ReplyData>,
}

#[derive(Debug, Default, Deserialize)]
struct ReplyData {
    #[serde(rename = "type", default)]
    sdp_type: String,
    #[serde(default)]
    sdp: String,
}

/// The offer returned by the `push` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteOffer {
    pub sdp_type: String,
    pub sdp: String,
}

/// Issues the three push endpoints over an [`HttpClient`].
///
/// Completion callbacks run on whatever thread the HTTP client calls back on.
#[derive(Clone)]
pub struct SignalingClient {
    http: Arc<dyn HttpClient>,
    scheme: String,
    logger: Arc<dyn LogSink>,
}

impl SignalingClient {
    pub fn new(http: Arc<dyn HttpClient>, scheme: &str, logger: Arc<dyn LogSink>) -> Self {
        Self {
            http,
            scheme: scheme.to_owned(),
            logger,
        }
    }

    pub fn endpoint(&self, url: &PushUrl, action: &str) -> String {
        format!("{}://{}/signaling/{}", self.scheme, url.host, action)
    }

    pub fn push_body(url: &PushUrl) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("uid", &url.uid)
            .append_pair("streamName", &url.stream_name)
            .append_pair("audio", "1")
            .append_pair("video", "1")
            .append_pair("isDtls", "0")
            .finish()
    }

    pub fn answer_body(url: &PushUrl, answer: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("uid", &url.uid)
            .append_pair("streamName", &url.stream_name)
            .append_pair("type", "push")
            .append_pair("answer", answer)
            .finish()
    }

    pub fn stop_body(url: &PushUrl) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("uid", &url.uid)
            .append_pair("streamName", &url.stream_name)
            .finish()
    }

    /// Asks the server for an offer for `url`.
    pub fn request_push<F>(&self, url: &PushUrl, done: F)
    where
        F: FnOnce(Result<RemoteOffer, SignalingError>) + Send + 'static,
    {
        let request = HttpRequest::form(self.endpoint(url, "push"), Self::push_body(url));
        let logger = self.logger.clone();
        sink_debug!(logger, "[SignalingClient] POST {}", request.url);
        self.http.post(
            request,
            Box::new(move |reply| {
                let result = Self::parse_offer_reply(&reply);
                if let Err(e) = &result {
                    sink_warn!(logger, "[SignalingClient] push request failed: {}", e);
                }
                done(result);
            }),
        );
    }

    pub fn send_answer<F>(&self, url: &PushUrl, answer: &str, done: F)
    where
        F: FnOnce(Result<(), SignalingError>) + Send + 'static,
    {
        self.post_checked(
            HttpRequest::form(self.endpoint(url, "sendanswer"), Self::answer_body(url, answer)),
            done,
        );
    }

    pub fn stop_push<F>(&self, url: &PushUrl, done: F)
    where
        F: FnOnce(Result<(), SignalingError>) + Send + 'static,
    {
        self.post_checked(
            HttpRequest::form(self.endpoint(url, "stoppush"), Self::stop_body(url)),
            done,
        );
    }

    fn post_checked<F>(&self, request: HttpRequest, done: F)
    where
        F: FnOnce(Result<(), SignalingError>) + Send + 'static,
    {
        let logger = self.logger.clone();
        let url = request.url.clone();
        sink_debug!(logger, "[SignalingClient] POST {}", url);
        self.http.post(
            request,
            Box::new(move |reply| {
                let result = Self::check_reply(&reply).map(|_| ());
                if let Err(e) = &result {
                    sink_warn!(logger, "[SignalingClient] {} failed: {}", url, e);
                }
                done(result);
            }),
        );
    }

    /// Extracts the offer from a `push` reply.
    pub fn parse_offer_reply(reply: &HttpReply) -> Result<RemoteOffer, SignalingError> {
        let data = Self::check_reply(reply)?.data.unwrap_or_default();
        if data.sdp.is_empty() {
            return Err(SignalingError::MissingOffer);
        }
        Ok(RemoteOffer {
            sdp_type: data.sdp_type,
            sdp: data.sdp,
        })
    }

    fn check_reply(reply: &HttpReply) -> Result<SignalingReply, SignalingError> {
        if let Some(e) = &reply.error {
            return Err(SignalingError::Transport(e.clone()));
        }
        if reply.status != 200 {
            return Err(SignalingError::HttpStatus(reply.status));
        }
        let parsed: SignalingReply = serde_json::from_str(&reply.body)
            .map_err(|e| SignalingError::InvalidReply(e.to_string()))?;
        if parsed.err_no != 0 {
            return Err(SignalingError::Rejected {
                err_no: parsed.err_no,
                msg: parsed.err_msg,
            });
        }
        Ok(parsed)
    }
}

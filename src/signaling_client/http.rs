pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub body: String,
    pub content_type: &'static str,
}

impl HttpRequest {
    pub fn form(url: String, body: String) -> Self {
        Self {
            url,
            body,
            content_type: FORM_CONTENT_TYPE,
        }
    }
}

/// Outcome of one POST. `error` is set when no HTTP exchange completed
/// (DNS, connect, TLS); `status` and `body` are meaningless then.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    pub error: Option<String>,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: 0,
            body: String::new(),
            error: Some(error.into()),
        }
    }
}

pub type ReplyCallback = Box<dyn FnOnce(HttpReply) + Send + 'static>;

/// Transport for signaling requests, implemented outside this crate.
///
/// `post` must not block the caller; `done` is invoked exactly once, on any thread.
pub trait HttpClient: Send + Sync {
    fn post(&self, request: HttpRequest, done: ReplyCallback);
}

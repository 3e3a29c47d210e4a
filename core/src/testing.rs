//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::time::Instant;

use crate::http::{HttpRequest, HttpResponse};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Status(u16, String),
    NoResponse,
    Local,
    /// Status line received, body stream failed.
    BrokenBody(u16),
}

impl Reply {
    pub(crate) fn ok(body: serde_json::Value) -> Self {
        Reply::Status(200, body.to_string())
    }

    pub(crate) fn status(status: u16) -> Self {
        Reply::Status(status, String::new())
    }
}

/// Replays canned replies in order; the last reply repeats forever.
#[derive(Debug)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<(HttpRequest, Instant)>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty(), "script needs at least one reply");
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Time elapsed between consecutive attempts.
    pub(crate) fn gaps(&self) -> Vec<std::time::Duration> {
        let seen = self.seen.lock().unwrap();
        seen.windows(2).map(|w| w[1].1 - w[0].1).collect()
    }

    fn next_reply(&self) -> Reply {
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push((request.clone(), Instant::now()));
        match self.next_reply() {
            Reply::Status(status, body) => Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body,
            }),
            Reply::NoResponse => Err(TransportError::NoResponse("connection refused".to_string())),
            Reply::Local => Err(TransportError::Local("builder error".to_string())),
            Reply::BrokenBody(status) => Err(TransportError::Body {
                status,
                cause: "connection reset".to_string(),
            }),
        }
    }
}

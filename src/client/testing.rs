//! Scripted transport for unit tests.

use crate::client::transport::{Transport, TransportRequest, TransportResponse};
use crate::error::{AffinityError, Result};
use async_trait::async_trait;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::time::Instant;

/// A canned reply
pub(crate) struct Reply {
    status: StatusCode,
    content_type: Option<&'static str>,
    body: String,
}

impl Reply {
    pub(crate) fn json(status: u16, body: serde_json::Value) -> Self {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some("application/json"),
            body: body.to_string(),
        }
    }

    pub(crate) fn text(status: u16, content_type: Option<&'static str>, body: &str) -> Self {
        Reply {
            status: StatusCode::from_u16(status).unwrap(),
            content_type,
            body: body.to_string(),
        }
    }
}

/// What the transport saw
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub request: TransportRequest,
    pub at: Instant,
}

/// Replays queued replies in order; fails with a transport error once empty.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        ScriptedTransport {
            replies: Mutex::new(replies.into_iter().collect()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = request.url.clone();
        self.sent.lock().push(Sent {
            request,
            at: Instant::now(),
        });

        let reply = self.replies.lock().pop_front().ok_or_else(|| {
            AffinityError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "no scripted reply left",
            ))
        })?;

        let mut headers = HeaderMap::new();
        if let Some(content_type) = reply.content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Ok(TransportResponse::from_bytes(reply.status, headers, url, reply.body))
    }
}

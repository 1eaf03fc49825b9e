//! Response wrapper with observable body consumption.
//!
//! A [`Response`] behaves like an ordinary HTTP response, except that reading
//! the body as JSON ([`Response::json`], [`Response::json_value`]) or as text
//! ([`Response::text`]) also notifies every listener registered through
//! [`Response::on_body_consumed`].
//!
//! # Ordering
//!
//! The notification fires after the body has been fully read and decoded and
//! before the read call returns. Listeners therefore finish their work before
//! the caller sees the value. A failed read notifies nobody.
//!
//! # Examples
//!
//! ```ignore
//! let res = session.get("/v2/viewingSessions/abc").await?;
//! res.on_body_consumed(|event| println!("body read: {:?}", event));
//! let body: serde_json::Value = res.json().await?;
//! ```

use crate::client::observer::{Observers, Subscription};
use crate::client::transport::{BodyStream, TransportResponse};
use crate::error::Result;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

/// Body payload delivered to [`Response::on_body_consumed`] listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyConsumed {
    /// The body was read and parsed as JSON
    Json(Value),
    /// The body was read as text
    Text(String),
}

/// An HTTP response whose body reads can be observed.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    body: BodyStream,
    consumed: Observers<BodyConsumed>,
}

impl Response {
    /// Wrap a raw transport response
    pub fn new(raw: TransportResponse) -> Self {
        Response {
            status: raw.status,
            headers: raw.headers,
            url: raw.url,
            body: raw.body,
            consumed: Observers::new(),
        }
    }

    /// HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical reason phrase for the status code (empty if unknown).
    ///
    /// This is looked up from the code, not the reason phrase the server sent.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    /// Whether the status is in the 2xx range
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of a response header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Declared `Content-Type`
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Final URL of the response
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Register a listener for body reads on this response.
    pub fn on_body_consumed<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&BodyConsumed) + Send + Sync + 'static,
    {
        self.consumed.subscribe(listener)
    }

    /// Read the body and deserialize it into `T`.
    ///
    /// Listeners see the parsed JSON value before it is converted to `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.json_value().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Read the body and parse it as JSON.
    pub async fn json_value(self) -> Result<Value> {
        let consumed = self.consumed;
        let bytes = collect(self.body).await?;
        let value: Value = serde_json::from_slice(&bytes)?;

        consumed.notify(&BodyConsumed::Json(value.clone()));
        Ok(value)
    }

    /// Read the body as UTF-8 text (invalid sequences are replaced).
    pub async fn text(self) -> Result<String> {
        let consumed = self.consumed;
        let bytes = collect(self.body).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        consumed.notify(&BodyConsumed::Text(text.clone()));
        Ok(text)
    }

    /// Read the raw body bytes. Listeners are not notified.
    pub async fn bytes(self) -> Result<Bytes> {
        collect(self.body).await
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

async fn collect(body: BodyStream) -> Result<Bytes> {
    let buf = body
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await?;
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AffinityError;
    use futures::stream::{self, StreamExt};
    use http::HeaderValue;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::Arc;

    fn response(content_type: &str, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        Response::new(TransportResponse::from_bytes(
            StatusCode::OK,
            headers,
            Url::parse("http://acme.com/wat").unwrap(),
            body,
        ))
    }

    fn recorder(res: &Response) -> Arc<Mutex<Vec<BodyConsumed>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _ = res.on_body_consumed(move |event| sink.lock().push(event.clone()));
        seen
    }

    #[test]
    fn test_text_notifies_with_text() {
        let res = response("text/plain", "The response body");
        let seen = recorder(&res);

        let text = tokio_test::block_on(res.text()).unwrap();
        assert_eq!(text, "The response body");
        assert_eq!(
            *seen.lock(),
            vec![BodyConsumed::Text("The response body".to_string())]
        );
    }

    #[tokio::test]
    async fn test_json_notifies_with_parsed_value() {
        let res = response("application/json", r#"{"wat": true}"#);
        let seen = recorder(&res);

        let value = res.json_value().await.unwrap();
        assert_eq!(value, json!({"wat": true}));
        assert_eq!(*seen.lock(), vec![BodyConsumed::Json(json!({"wat": true}))]);
    }

    #[tokio::test]
    async fn test_every_listener_sees_the_returned_body() {
        let body = r#"{"affinityToken": "abc123", "pages": [1, 2, 3]}"#;

        let res = response("application/json", body);
        let (first, second) = (recorder(&res), recorder(&res));
        let value = res.json_value().await.unwrap();
        assert_eq!(*first.lock(), vec![BodyConsumed::Json(value.clone())]);
        assert_eq!(*second.lock(), vec![BodyConsumed::Json(value)]);

        let res = response("application/json", body);
        let (first, second) = (recorder(&res), recorder(&res));
        let text = res.text().await.unwrap();
        assert_eq!(text, body);
        assert_eq!(*first.lock(), vec![BodyConsumed::Text(text.clone())]);
        assert_eq!(*second.lock(), vec![BodyConsumed::Text(text)]);
    }

    #[tokio::test]
    async fn test_typed_json() {
        #[derive(Deserialize)]
        struct Wat {
            wat: bool,
        }

        let res = response("application/json", r#"{"wat": true}"#);
        let seen = recorder(&res);
        let wat: Wat = res.json().await.unwrap();
        assert!(wat.wat);
        assert_eq!(seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_json_does_not_notify() {
        let res = response("application/json", "This is not JSON");
        let seen = recorder(&res);

        let err = res.json_value().await.unwrap_err();
        assert!(matches!(err, AffinityError::Json(_)));
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_stream_error_does_not_notify() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"partial\"")),
            Err(AffinityError::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset",
            ))),
        ])
        .boxed();
        let res = Response::new(TransportResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            url: Url::parse("http://acme.com/wat").unwrap(),
            body,
        });
        let seen = recorder(&res);

        assert!(res.text().await.unwrap_err().is_transport());
        assert!(seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_bytes_is_silent() {
        let res = response("application/octet-stream", "raw");
        let seen = recorder(&res);
        assert_eq!(res.bytes().await.unwrap(), Bytes::from_static(b"raw"));
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_status_accessors() {
        let res = Response::new(TransportResponse::from_bytes(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            Url::parse("http://acme.com/missing").unwrap(),
            "",
        ));
        assert!(!res.ok());
        assert_eq!(res.status_text(), "Not Found");
        assert_eq!(res.content_type(), None);
    }
}

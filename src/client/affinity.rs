//! Affinity token discovery.
//!
//! The backend issues an `affinityToken` in some JSON response bodies. Every
//! later request of the same workflow must carry it in the
//! `Accusoft-Affinity-Token` header so it lands on the same backend node.
//!
//! # State Machine
//!
//! ```text
//!            ok response + body read with a string affinityToken
//!  SEEKING ─────────────────────────────────────────────────────▶ LOCKED
//! ```
//!
//! - **SEEKING**: no affinity header in the session defaults. Each ok response
//!   gets a one-shot listener on its body reads.
//! - **LOCKED**: the header is set. Responses are no longer inspected.
//!
//! The coordinator never reads a body itself. A token in a body the caller
//! never reads is never seen.
//!
//! # Races
//!
//! Two responses armed while SEEKING may both carry a token. The transition
//! uses [`DefaultsStore::set_header_if_absent`], so the first token to be
//! consumed wins and later ones are ignored.

use crate::client::defaults::DefaultsStore;
use crate::client::observer::Subscription;
use crate::client::response::{BodyConsumed, Response};
use crate::protocol::headers::{is_json_media_type, AFFINITY_TOKEN_FIELD, AFFINITY_TOKEN_HEADER};
use http::HeaderValue;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Affinity state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AffinityState {
    /// No affinity token known yet
    Seeking,
    /// Requests carry this affinity token
    Locked(String),
}

/// Watches a session's responses and locks the session onto the first affinity token found.
#[derive(Debug, Clone)]
pub struct AffinityCoordinator {
    defaults: DefaultsStore,
}

impl AffinityCoordinator {
    /// Create a coordinator that records tokens into `defaults`
    pub fn new(defaults: DefaultsStore) -> Self {
        AffinityCoordinator { defaults }
    }

    /// Current state, derived from the session defaults.
    pub fn state(&self) -> AffinityState {
        match self.token() {
            Some(token) => AffinityState::Locked(token),
            None => AffinityState::Seeking,
        }
    }

    /// The affinity token in use, if any
    pub fn token(&self) -> Option<String> {
        self.defaults.header(AFFINITY_TOKEN_HEADER)
    }

    /// Handle a freshly received response.
    ///
    /// While SEEKING, an ok response is armed: its first body read that yields a
    /// token locks the session. Returns whether the response was armed.
    pub fn observe(&self, response: &Response) -> bool {
        if !response.ok() || self.token().is_some() {
            return false;
        }

        let armed = Arc::new(ArmedResponse {
            coordinator: self.clone(),
            declares_json: is_json_media_type(response.content_type()),
            fired: AtomicBool::new(false),
            subscription: Mutex::new(None),
        });

        let listener = Arc::clone(&armed);
        let subscription = response.on_body_consumed(move |event| listener.fire(event));
        *armed.subscription.lock() = Some(subscription);

        tracing::trace!(url = %response.url(), "armed response for affinity token discovery");
        true
    }

    /// Inspect a consumed body.
    ///
    /// `declares_json` is whether the response's media type is `application/json`;
    /// text bodies are only parsed when it is. Returns whether a token was found
    /// in the payload.
    pub fn handle_body(&self, event: &BodyConsumed, declares_json: bool) -> bool {
        let token = match event {
            BodyConsumed::Json(value) => token_from_json(value).map(str::to_owned),
            BodyConsumed::Text(text) if declares_json => serde_json::from_str::<Value>(text)
                .ok()
                .and_then(|value| token_from_json(&value).map(str::to_owned)),
            BodyConsumed::Text(_) => None,
        };

        match token {
            Some(token) if HeaderValue::from_str(&token).is_ok() => {
                self.lock(&token);
                true
            }
            Some(_) => {
                tracing::debug!("ignoring affinity token that is not a valid header value");
                false
            }
            None => false,
        }
    }

    fn lock(&self, token: &str) {
        if self.defaults.set_header_if_absent(AFFINITY_TOKEN_HEADER, token) {
            tracing::debug!("affinity token discovered; subsequent requests will carry it");
        } else {
            tracing::debug!("affinity token already set; ignoring later token");
        }
    }
}

/// One-shot listener state for a single armed response.
struct ArmedResponse {
    coordinator: AffinityCoordinator,
    declares_json: bool,
    fired: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
}

impl ArmedResponse {
    fn fire(&self, event: &BodyConsumed) {
        if self.fired.load(Ordering::Acquire) {
            return;
        }
        if !self.coordinator.handle_body(event, self.declares_json) {
            return;
        }
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }
}

fn token_from_json(value: &Value) -> Option<&str> {
    value.get(AFFINITY_TOKEN_FIELD).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::TransportResponse;
    use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
    use serde_json::json;
    use url::Url;

    fn response(status: StatusCode, content_type: Option<&str>, body: &'static str) -> Response {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        }
        Response::new(TransportResponse::from_bytes(
            status,
            headers,
            Url::parse("http://acme.com/wat").unwrap(),
            body,
        ))
    }

    fn coordinator() -> (DefaultsStore, AffinityCoordinator) {
        let store = DefaultsStore::default();
        let coordinator = AffinityCoordinator::new(store.clone());
        (store, coordinator)
    }

    #[tokio::test]
    async fn test_json_read_locks_session() {
        let (store, coordinator) = coordinator();
        let res = response(StatusCode::OK, None, r#"{"affinityToken": "abc123"}"#);

        assert!(coordinator.observe(&res));
        assert_eq!(coordinator.state(), AffinityState::Seeking);

        res.json_value().await.unwrap();
        assert_eq!(coordinator.state(), AffinityState::Locked("abc123".to_string()));
        assert_eq!(
            store.header("accusoft-affinity-token").as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn test_unread_body_never_locks() {
        let (_store, coordinator) = coordinator();
        let res = response(StatusCode::OK, None, r#"{"affinityToken": "abc123"}"#);
        coordinator.observe(&res);
        drop(res);
        assert_eq!(coordinator.state(), AffinityState::Seeking);
    }

    #[tokio::test]
    async fn test_text_read_requires_json_media_type() {
        let (_store, coordinator) = coordinator();
        let res = response(
            StatusCode::OK,
            Some("text/plain"),
            r#"{"affinityToken": "abc123"}"#,
        );
        coordinator.observe(&res);
        res.text().await.unwrap();
        assert_eq!(coordinator.state(), AffinityState::Seeking);

        let res = response(
            StatusCode::OK,
            Some("application/json; charset=utf-8"),
            r#"{ "affinityToken": "abc123" }"#,
        );
        coordinator.observe(&res);
        res.text().await.unwrap();
        assert_eq!(coordinator.token().as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_invalid_json_text_is_ignored() {
        let (_store, coordinator) = coordinator();
        let res = response(StatusCode::OK, Some("application/json"), "This is not JSON");
        coordinator.observe(&res);

        assert_eq!(res.text().await.unwrap(), "This is not JSON");
        assert_eq!(coordinator.state(), AffinityState::Seeking);
    }

    #[tokio::test]
    async fn test_non_ok_responses_are_not_armed() {
        let (_store, coordinator) = coordinator();
        let res = response(
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
            r#"{"affinityToken": "abc123"}"#,
        );
        assert!(!coordinator.observe(&res));
        res.json_value().await.unwrap();
        assert_eq!(coordinator.state(), AffinityState::Seeking);
    }

    #[test]
    fn test_locked_session_arms_nothing() {
        let (store, coordinator) = coordinator();
        store.merge(crate::SessionDefaults::new().with_header(AFFINITY_TOKEN_HEADER, "set"));

        let res = response(StatusCode::OK, None, r#"{"affinityToken": "other"}"#);
        assert!(!coordinator.observe(&res));
        assert_eq!(coordinator.token().as_deref(), Some("set"));
    }

    #[tokio::test]
    async fn test_first_consumed_token_wins() {
        let (_store, coordinator) = coordinator();
        let first = response(StatusCode::OK, None, r#"{"affinityToken": "first"}"#);
        let second = response(StatusCode::OK, None, r#"{"affinityToken": "second"}"#);
        assert!(coordinator.observe(&first));
        assert!(coordinator.observe(&second));

        first.json_value().await.unwrap();
        second.json_value().await.unwrap();
        assert_eq!(coordinator.token().as_deref(), Some("first"));
    }

    #[test]
    fn test_token_must_be_a_string() {
        let (_store, coordinator) = coordinator();
        for body in [json!({"affinityToken": 42}), json!("abc"), json!([{"affinityToken": "x"}])] {
            assert!(!coordinator.handle_body(&BodyConsumed::Json(body), true));
        }
        assert_eq!(coordinator.state(), AffinityState::Seeking);
    }

    #[tokio::test]
    async fn test_token_unusable_as_header_keeps_seeking() {
        let (store, coordinator) = coordinator();
        let res = response(StatusCode::OK, None, r#"{"affinityToken": "abc\ndef"}"#);
        assert!(coordinator.observe(&res));

        res.json_value().await.unwrap();
        assert_eq!(coordinator.state(), AffinityState::Seeking);
        assert_eq!(store.header(AFFINITY_TOKEN_HEADER), None);

        let res = response(StatusCode::OK, None, r#"{"affinityToken": "abc123"}"#);
        assert!(coordinator.observe(&res));
        res.json_value().await.unwrap();
        assert_eq!(coordinator.token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_armed_response_fires_once() {
        let (store, coordinator) = coordinator();
        let armed = ArmedResponse {
            coordinator,
            declares_json: true,
            fired: AtomicBool::new(false),
            subscription: Mutex::new(None),
        };

        armed.fire(&BodyConsumed::Text(r#"{"affinityToken": "t1"}"#.to_string()));
        store.merge(crate::SessionDefaults::new().with_header(AFFINITY_TOKEN_HEADER, "reset"));
        armed.fire(&BodyConsumed::Json(json!({"affinityToken": "t2"})));

        assert!(armed.fired.load(Ordering::Acquire));
        assert_eq!(store.header(AFFINITY_TOKEN_HEADER).as_deref(), Some("reset"));
    }
}

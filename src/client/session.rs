//! Affinity sessions and the client that creates them.
//!
//! An [`AffinitySession`] is a [`RequestDispatcher`] with an
//! [`AffinityCoordinator`] attached: once the caller reads a response body
//! carrying an `affinityToken`, every later request of the session sends it in
//! the `Accusoft-Affinity-Token` header. Sessions also know how to poll process
//! status resources.
//!
//! # Examples
//!
//! ```ignore
//! use affinity_http::{AffinityClient, RequestOptions, SessionDefaults};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AffinityClient::new(
//!         SessionDefaults::new().with_base_url("https://api.accusoft.com"),
//!     );
//!     let session = client.create_affinity_session();
//!
//!     // Reading the body lets the session pick up the affinity token.
//!     let res = session
//!         .post_with("/PCCIS/V1/WorkFile", RequestOptions::new().with_body(std::fs::read("in.docx")?))
//!         .await?;
//!     let work_file: serde_json::Value = res.json().await?;
//!
//!     let res = session
//!         .post_with(
//!             "/v2/contentConverters",
//!             RequestOptions::new().with_json(&json!({
//!                 "input": { "sources": [{ "fileId": work_file["fileId"] }], "dest": { "format": "pdf" } }
//!             }))?,
//!         )
//!         .await?;
//!     let process: serde_json::Value = res.json().await?;
//!
//!     let done = session
//!         .poll_until_done(&format!("/v2/contentConverters/{}", process["processId"].as_str().unwrap_or_default()))
//!         .await?;
//!     println!("final state: {}", done.state());
//!     Ok(())
//! }
//! ```

use crate::client::affinity::{AffinityCoordinator, AffinityState};
use crate::client::config::ClientConfig;
use crate::client::dispatcher::RequestDispatcher;
use crate::client::observer::Subscription;
use crate::client::poll;
use crate::client::response::Response;
use crate::client::transport::{ReqwestTransport, Transport};
use crate::error::Result;
use crate::types::{ProcessStatus, RequestOptions, SessionDefaults};
use http::Method;
use std::sync::Arc;

/// A group of requests belonging to one workflow, all routed to the same backend node.
#[derive(Debug)]
pub struct AffinitySession {
    dispatcher: RequestDispatcher,
    coordinator: AffinityCoordinator,
    config: Arc<ClientConfig>,
}

impl AffinitySession {
    /// Create a session over the default reqwest transport
    pub fn new(defaults: SessionDefaults) -> Self {
        let config = ClientConfig::default();
        let transport = Arc::new(ReqwestTransport::with_config(&config));
        Self::with_transport(defaults, transport, Arc::new(config))
    }

    /// Create a session over a custom transport
    pub fn with_transport(
        defaults: SessionDefaults,
        transport: Arc<dyn Transport>,
        config: Arc<ClientConfig>,
    ) -> Self {
        let dispatcher = RequestDispatcher::with_transport(defaults, transport);
        let coordinator = AffinityCoordinator::new(dispatcher.defaults_store().clone());

        let observer = coordinator.clone();
        // The registry lives as long as the dispatcher, so the handle is not kept.
        let _ = dispatcher.on_response(move |res| {
            observer.observe(res);
        });

        AffinitySession {
            dispatcher,
            coordinator,
            config,
        }
    }

    /// Affinity state of the session
    pub fn affinity_state(&self) -> AffinityState {
        self.coordinator.state()
    }

    /// Affinity token in use, if one has been discovered
    pub fn affinity_token(&self) -> Option<String> {
        self.coordinator.token()
    }

    /// Copy of the current defaults
    pub fn defaults(&self) -> SessionDefaults {
        self.dispatcher.defaults()
    }

    /// Merge additional defaults into this session for all future requests.
    pub fn add_to_defaults(&self, partial: SessionDefaults) {
        self.dispatcher.add_to_defaults(partial);
    }

    /// Register a listener called with every response of this session.
    pub fn on_response<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.dispatcher.on_response(listener)
    }

    /// Plain dispatcher with these defaults (affinity header included, if set) plus `partial`.
    ///
    /// The returned dispatcher does no token discovery of its own.
    pub fn with_additional_defaults(&self, partial: SessionDefaults) -> RequestDispatcher {
        self.dispatcher.with_additional_defaults(partial)
    }

    /// The underlying dispatcher
    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// HTTP GET a resource
    pub async fn get(&self, resource: &str) -> Result<Response> {
        self.dispatcher.get(resource).await
    }

    /// HTTP GET a resource with per-call options
    pub async fn get_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.dispatcher.get_with(resource, options).await
    }

    /// HTTP PUT a resource
    pub async fn put(&self, resource: &str) -> Result<Response> {
        self.dispatcher.put(resource).await
    }

    /// HTTP PUT a resource with per-call options
    pub async fn put_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.dispatcher.put_with(resource, options).await
    }

    /// HTTP POST a resource
    pub async fn post(&self, resource: &str) -> Result<Response> {
        self.dispatcher.post(resource).await
    }

    /// HTTP POST a resource with per-call options
    pub async fn post_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.dispatcher.post_with(resource, options).await
    }

    /// HTTP DELETE a resource
    pub async fn delete(&self, resource: &str) -> Result<Response> {
        self.dispatcher.delete(resource).await
    }

    /// HTTP DELETE a resource with per-call options
    pub async fn delete_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.dispatcher.delete_with(resource, options).await
    }

    /// Issue a request with an explicit method
    pub async fn request(
        &self,
        method: Method,
        resource: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        self.dispatcher.request(method, resource, options).await
    }

    /// Current status of a process resource.
    ///
    /// Fails if the GET returns a non-2xx status or the body has no `state`.
    pub async fn current_process_status(&self, resource: &str) -> Result<ProcessStatus> {
        poll::current_process_status(&self.dispatcher, resource, RequestOptions::default()).await
    }

    /// Current status of a process resource, with per-call options
    pub async fn current_process_status_with(
        &self,
        resource: &str,
        options: RequestOptions,
    ) -> Result<ProcessStatus> {
        poll::current_process_status(&self.dispatcher, resource, options).await
    }

    /// Poll a process resource until its `state` is something other than `"processing"`.
    pub async fn poll_until_done(&self, resource: &str) -> Result<ProcessStatus> {
        self.poll_until_done_with(resource, RequestOptions::default())
            .await
    }

    /// Poll a process resource until done, with per-call options
    pub async fn poll_until_done_with(
        &self,
        resource: &str,
        options: RequestOptions,
    ) -> Result<ProcessStatus> {
        poll::poll_until_done(&self.dispatcher, resource, options, &self.config).await
    }
}

/// Factory for [`AffinitySession`]s sharing a transport, defaults and configuration.
///
/// Each session starts from its own copy of the client defaults, so a token
/// discovered by one session never leaks into another.
///
/// # Examples
///
/// ```
/// use affinity_http::{AffinityClient, AffinityState, SessionDefaults};
///
/// let client = AffinityClient::new(
///     SessionDefaults::new()
///         .with_base_url("https://api.accusoft.com")
///         .with_header("Acs-Api-Key", "my-key"),
/// );
/// let session = client.create_affinity_session();
/// assert_eq!(session.affinity_state(), AffinityState::Seeking);
/// assert_eq!(session.defaults().headers.get("acs-api-key"), Some("my-key"));
/// ```
#[derive(Clone)]
pub struct AffinityClient {
    defaults: SessionDefaults,
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl AffinityClient {
    /// Create a client with default configuration
    pub fn new(defaults: SessionDefaults) -> Self {
        Self::with_config(defaults, ClientConfig::default())
    }

    /// Create a client with custom configuration
    pub fn with_config(defaults: SessionDefaults, config: ClientConfig) -> Self {
        let transport = Arc::new(ReqwestTransport::with_config(&config));
        AffinityClient {
            defaults,
            transport,
            config: Arc::new(config),
        }
    }

    /// Create a client over a custom transport
    pub fn with_transport(
        defaults: SessionDefaults,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        AffinityClient {
            defaults,
            transport,
            config: Arc::new(config),
        }
    }

    /// Start a new session from the client defaults
    pub fn create_affinity_session(&self) -> AffinitySession {
        AffinitySession::with_transport(
            self.defaults.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.config),
        )
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for AffinityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityClient")
            .field("defaults", &self.defaults)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{Reply, ScriptedTransport};
    use crate::protocol::AFFINITY_TOKEN_HEADER;
    use serde_json::json;

    fn client(replies: Vec<Reply>) -> (AffinityClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(replies));
        let client = AffinityClient::with_transport(
            SessionDefaults::new().with_base_url("http://acme.com"),
            ClientConfig::default(),
            transport.clone(),
        );
        (client, transport)
    }

    fn token_on(transport: &ScriptedTransport, index: usize) -> Option<String> {
        transport.sent()[index]
            .request
            .headers
            .get(AFFINITY_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    }

    #[tokio::test]
    async fn test_token_sent_on_every_later_request() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"affinityToken": "abc123"})),
            Reply::text(200, None, ""),
            Reply::text(200, None, ""),
            Reply::text(200, None, ""),
        ]);
        let session = client.create_affinity_session();

        let res = session.post("/wat").await.unwrap();
        res.json_value().await.unwrap();
        session.post("/foo").await.unwrap();
        session.put("/blah").await.unwrap();
        session.get("http://elsewhere.example/etc").await.unwrap();

        assert_eq!(token_on(&transport, 0), None);
        for index in 1..4 {
            assert_eq!(token_on(&transport, index).as_deref(), Some("abc123"));
        }
        assert_eq!(
            session.affinity_state(),
            AffinityState::Locked("abc123".to_string())
        );
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_tokens() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"affinityToken": "abc123"})),
            Reply::text(200, None, ""),
        ]);
        let first = client.create_affinity_session();
        let second = client.create_affinity_session();

        first.post("/wat").await.unwrap().json_value().await.unwrap();
        second.get("/etc").await.unwrap();

        assert_eq!(token_on(&transport, 1), None);
        assert_eq!(second.affinity_state(), AffinityState::Seeking);
    }

    #[tokio::test]
    async fn test_later_tokens_are_ignored_once_locked() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"affinityToken": "first"})),
            Reply::json(200, json!({"affinityToken": "second"})),
            Reply::text(200, None, ""),
        ]);
        let session = client.create_affinity_session();

        session.post("/a").await.unwrap().json_value().await.unwrap();
        session.post("/b").await.unwrap().json_value().await.unwrap();
        session.get("/c").await.unwrap();

        assert_eq!(token_on(&transport, 2).as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_token_unusable_as_header_does_not_break_session() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"affinityToken": "abc\ndef"})),
            Reply::text(200, None, ""),
            Reply::json(200, json!({"affinityToken": "abc123"})),
            Reply::text(200, None, ""),
        ]);
        let session = client.create_affinity_session();

        session.post("/wat").await.unwrap().json_value().await.unwrap();
        session.get("/next").await.unwrap();
        assert_eq!(transport.sent().len(), 2);
        assert_eq!(token_on(&transport, 1), None);
        assert_eq!(session.affinity_state(), AffinityState::Seeking);

        session.post("/again").await.unwrap().json_value().await.unwrap();
        session.get("/last").await.unwrap();
        assert_eq!(token_on(&transport, 3).as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_polling_discovers_token() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"state": "complete", "affinityToken": "xyz"})),
            Reply::text(200, None, ""),
        ]);
        let session = client.create_affinity_session();

        let status = session.poll_until_done("/process/123").await.unwrap();
        assert_eq!(status.state(), "complete");

        session.get("/next").await.unwrap();
        assert_eq!(token_on(&transport, 1).as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_derived_dispatcher_carries_token_but_not_coordinator() {
        let (client, transport) = client(vec![
            Reply::json(200, json!({"affinityToken": "abc123"})),
            Reply::json(200, json!({"affinityToken": "ignored"})),
            Reply::text(200, None, ""),
        ]);
        let session = client.create_affinity_session();
        session.post("/wat").await.unwrap().json_value().await.unwrap();

        let keyed = session.with_additional_defaults(
            SessionDefaults::new().with_header("Acs-Api-Key", "secret"),
        );
        keyed.get("/a").await.unwrap().json_value().await.unwrap();
        session.get("/b").await.unwrap();

        assert_eq!(token_on(&transport, 1).as_deref(), Some("abc123"));
        assert_eq!(token_on(&transport, 2).as_deref(), Some("abc123"));
        assert!(transport.sent()[2].request.headers.get("acs-api-key").is_none());
    }
}

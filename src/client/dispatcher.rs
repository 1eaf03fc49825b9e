//! Request dispatcher: HTTP verbs over session defaults.
//!
//! Provides [`RequestDispatcher`], which turns `(verb, resource, options)` into
//! one transport call.
//!
//! # Request Resolution
//!
//! 1. Snapshot the session defaults
//! 2. Resolve `resource` against the base URL (see [`resolve_url`])
//! 3. Layer per-call headers and timeout over the defaults
//! 4. Force the method to the verb being invoked
//!
//! Once the transport answers, the response is wrapped and every
//! [`on_response`](RequestDispatcher::on_response) listener runs before the
//! call returns. Non-2xx statuses are returned as ordinary responses.
//!
//! # Examples
//!
//! ## Simple GET request
//!
//! ```ignore
//! use affinity_http::{RequestDispatcher, SessionDefaults};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = RequestDispatcher::new(
//!         SessionDefaults::new().with_base_url("http://localhost:18681"),
//!     );
//!     let response = dispatcher.get("/PCCIS/V1/Service/Current/Health").await?;
//!     println!("Status: {}", response.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Scoped API key
//!
//! ```ignore
//! let keyed = dispatcher.with_additional_defaults(
//!     SessionDefaults::new().with_header("Acs-Api-Key", "secret"),
//! );
//! // `keyed` sends the key; `dispatcher` still does not.
//! ```

use crate::client::defaults::DefaultsStore;
use crate::client::observer::{Observers, Subscription};
use crate::client::response::Response;
use crate::client::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::client::utils::resolve_url;
use crate::error::Result;
use crate::types::{Headers, RequestOptions, SessionDefaults};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::sync::Arc;

/// Issues HTTP requests with per-session defaults and response notifications.
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    defaults: DefaultsStore,
    responses: Observers<Response>,
}

impl RequestDispatcher {
    /// Create a dispatcher over the default reqwest transport
    pub fn new(defaults: SessionDefaults) -> Self {
        Self::with_transport(defaults, Arc::new(ReqwestTransport::new()))
    }

    /// Create a dispatcher over a custom transport
    pub fn with_transport(defaults: SessionDefaults, transport: Arc<dyn Transport>) -> Self {
        RequestDispatcher {
            transport,
            defaults: DefaultsStore::new(defaults),
            responses: Observers::new(),
        }
    }

    /// Copy of the current defaults
    pub fn defaults(&self) -> SessionDefaults {
        self.defaults.get()
    }

    /// Merge additional defaults into this dispatcher for all future requests.
    pub fn add_to_defaults(&self, partial: SessionDefaults) {
        self.defaults.merge(partial);
    }

    /// Handle to the underlying defaults store
    pub(crate) fn defaults_store(&self) -> &DefaultsStore {
        &self.defaults
    }

    /// Register a listener called with every response, before the request call returns.
    pub fn on_response<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.responses.subscribe(listener)
    }

    /// New dispatcher with `partial` merged over a copy of these defaults.
    ///
    /// The new dispatcher shares the transport only: later changes to either
    /// dispatcher's defaults are not seen by the other, and listeners are not carried over.
    pub fn with_additional_defaults(&self, partial: SessionDefaults) -> RequestDispatcher {
        RequestDispatcher {
            transport: Arc::clone(&self.transport),
            defaults: DefaultsStore::new(self.defaults.get().merged(partial)),
            responses: Observers::new(),
        }
    }

    /// HTTP GET a resource
    pub async fn get(&self, resource: &str) -> Result<Response> {
        self.request(Method::GET, resource, RequestOptions::default()).await
    }

    /// HTTP GET a resource with per-call options
    pub async fn get_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::GET, resource, options).await
    }

    /// HTTP PUT a resource
    pub async fn put(&self, resource: &str) -> Result<Response> {
        self.request(Method::PUT, resource, RequestOptions::default()).await
    }

    /// HTTP PUT a resource with per-call options
    pub async fn put_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::PUT, resource, options).await
    }

    /// HTTP POST a resource
    pub async fn post(&self, resource: &str) -> Result<Response> {
        self.request(Method::POST, resource, RequestOptions::default()).await
    }

    /// HTTP POST a resource with per-call options
    pub async fn post_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::POST, resource, options).await
    }

    /// HTTP DELETE a resource
    pub async fn delete(&self, resource: &str) -> Result<Response> {
        self.request(Method::DELETE, resource, RequestOptions::default()).await
    }

    /// HTTP DELETE a resource with per-call options
    pub async fn delete_with(&self, resource: &str, options: RequestOptions) -> Result<Response> {
        self.request(Method::DELETE, resource, options).await
    }

    /// Issue a request with an explicit method.
    ///
    /// `options.method` is ignored; `method` always wins.
    pub async fn request(
        &self,
        method: Method,
        resource: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let defaults = self.defaults.get();

        let mut url = resolve_url(defaults.base_url.as_deref(), resource)?;
        if !options.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&options.query);
        }

        let mut headers = defaults.headers;
        headers.merge(options.headers);
        let headers = to_header_map(&headers)?;

        tracing::trace!(method = %method, url = %url, "dispatching request");

        let raw = self
            .transport
            .send(TransportRequest {
                method,
                url,
                headers,
                body: options.body,
                timeout: options.timeout.or(defaults.timeout),
            })
            .await?;

        let response = Response::new(raw);
        self.responses.notify(&response);
        Ok(response)
    }
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("defaults", &self.defaults)
            .field("responses", &self.responses)
            .finish_non_exhaustive()
    }
}

fn to_header_map(headers: &Headers) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        map.insert(
            HeaderName::from_bytes(name.as_bytes())?,
            HeaderValue::from_str(value)?,
        );
    }
    Ok(map)
}

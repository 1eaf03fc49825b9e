//! Affinity-aware HTTP client implementation.
//!
//! This module provides a layered request pipeline that:
//!
//! - **Applies per-session defaults** (base URL, headers, timeout) to every request
//! - **Observes body reads** without ever reading a body on the caller's behalf
//! - **Discovers and propagates** the backend's affinity token
//! - **Polls process status** resources with capped exponential backoff
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config     - Client configuration (transport, poll backoff, logging)
//! ├── defaults   - Shared, mergeable session defaults
//! ├── observer   - Listener registry and subscription handles
//! ├── transport  - Transport trait and the reqwest implementation
//! ├── response   - Response wrapper with body-consumed notifications
//! ├── dispatcher - HTTP verbs over session defaults
//! ├── affinity   - Affinity token discovery state machine
//! ├── poll       - Process status polling
//! ├── session    - AffinitySession and AffinityClient
//! └── utils      - URL resolution and backoff helpers
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AffinityClient`] | Factory for sessions sharing a transport |
//! | [`AffinitySession`] | Dispatcher with affinity token discovery and polling |
//! | [`RequestDispatcher`] | HTTP verbs over per-session defaults |
//! | [`Response`] | Response whose body reads can be observed |
//! | [`AffinityCoordinator`] | SEEKING/LOCKED token discovery |
//! | [`Transport`] | The HTTP primitive underneath |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ## Creating a Client
//!
//! ```
//! use affinity_http::client::{AffinityClient, ClientConfig};
//! use affinity_http::SessionDefaults;
//!
//! // Default configuration
//! let client = AffinityClient::new(SessionDefaults::new().with_base_url("http://localhost:3000"));
//!
//! // Custom configuration
//! let config = ClientConfig {
//!     initial_poll_delay_ms: 100,
//!     max_poll_delay_ms: 2_000,
//!     ..Default::default()
//! };
//! let client = AffinityClient::with_config(SessionDefaults::new(), config);
//! ```
//!
//! ## Backoff Between Polls
//!
//! ```
//! use affinity_http::client::BackoffSchedule;
//! use std::time::Duration;
//!
//! let mut schedule = BackoffSchedule::new(Duration::from_millis(500), 2, Duration::from_secs(8));
//! schedule.next_delay();
//! schedule.next_delay();
//! assert_eq!(schedule.next_delay(), Duration::from_millis(2000));
//! ```

mod affinity;
mod config;
mod defaults;
mod dispatcher;
mod observer;
mod poll;
mod response;
mod session;
mod transport;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use affinity::{AffinityCoordinator, AffinityState};
pub use config::{
    ClientConfig, DEFAULT_INITIAL_POLL_DELAY_MS, DEFAULT_MAX_POLL_DELAY_MS,
    DEFAULT_POLL_BACKOFF_MULTIPLIER,
};
pub use defaults::DefaultsStore;
pub use dispatcher::RequestDispatcher;
pub use observer::{Observers, Subscription};
pub use poll::{current_process_status, poll_until_done};
pub use response::{BodyConsumed, Response};
pub use session::{AffinityClient, AffinitySession};
pub use transport::{BodyStream, ReqwestTransport, Transport, TransportRequest, TransportResponse};
pub use utils::*;

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Affinity HTTP: sticky sessions for stateful backends
//!
//! Some processing backends keep per-workflow state on a single node. The first
//! response of a workflow hands out an *affinity token*; every later request must
//! carry it so the load balancer routes it back to that node.
//!
//! ## Overview
//!
//! This crate layers four pieces over a plain HTTP transport:
//!
//! 1. **Session defaults** - base URL, headers and timeout applied to every request
//! 2. **Observable responses** - reading a body as JSON or text notifies listeners
//! 3. **Affinity coordination** - the first `affinityToken` read from a body becomes
//!    the `Accusoft-Affinity-Token` header of every later request in the session
//! 4. **Process polling** - GET a status resource until `state` is no longer
//!    `"processing"`, backing off exponentially between attempts
//!
//! ## Client Usage
//!
//! ```ignore
//! use affinity_http::{AffinityClient, SessionDefaults};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AffinityClient::new(
//!         SessionDefaults::new().with_base_url("http://localhost:18681"),
//!     );
//!     let session = client.create_affinity_session();
//!
//!     let res = session.post("/v2/viewingSessions").await?;
//!     let created: serde_json::Value = res.json().await?;   // token picked up here
//!
//!     let status = session
//!         .poll_until_done(&format!("/v2/viewingSessions/{}", created["viewingSessionId"].as_str().unwrap_or_default()))
//!         .await?;
//!     println!("state: {}", status.state());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Headers, session defaults, request options, process status
//! - **[error]** - Error types and result handling
//! - **[client]** - Dispatcher, response wrapper, affinity coordinator, poller
//! - **[protocol]** - Header names, field names and media-type parsing

pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use client::{
    AffinityClient, AffinityCoordinator, AffinitySession, AffinityState, BodyConsumed,
    ClientConfig, RequestDispatcher, Response, Transport,
};
pub use error::{AffinityError, Result};
pub use types::{Headers, ProcessStatus, RequestOptions, SessionDefaults};

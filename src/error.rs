//! Error types for affinity sessions.
//!
//! Every fallible operation in this crate returns [`Result<T>`], an alias over
//! [`AffinityError`].
//!
//! # Error Categories
//!
//! | Category | Variants | Raised by |
//! |----------|----------|-----------|
//! | Transport | [`Transport`](AffinityError::Transport) | any dispatched request, body reads |
//! | Request construction | [`UrlParse`](AffinityError::UrlParse), [`InvalidUrl`](AffinityError::InvalidUrl), [`InvalidHeaderName`](AffinityError::InvalidHeaderName), [`InvalidHeaderValue`](AffinityError::InvalidHeaderValue) | the dispatcher, before anything is sent |
//! | Body decoding | [`Json`](AffinityError::Json) | [`Response::json`](crate::client::Response::json) |
//! | Process protocol | [`ProcessStatusRequestFailed`](AffinityError::ProcessStatusRequestFailed), [`MissingProcessState`](AffinityError::MissingProcessState) | the process poller |
//!
//! Non-2xx responses to ordinary requests are *not* errors; they come back as a
//! normal [`Response`](crate::client::Response) for the caller to inspect.

use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::client::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for affinity session operations.
pub type Result<T> = std::result::Result<T, AffinityError>;

/// Errors produced while dispatching requests, reading bodies or polling processes.
#[derive(Error, Debug)]
pub enum AffinityError {
    /// The transport failed to deliver the request or stream the body
    /// (connection refused, DNS, timeout, ...). The original error is kept as the source.
    #[error("HTTP transport failed: {0}")]
    Transport(#[source] BoxError),

    /// The resource or base URL could not be parsed.
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The resource cannot be turned into a request URL.
    #[error("Invalid URL: {message}")]
    InvalidUrl {
        /// What was wrong with the URL
        message: String,
    },

    /// A configured header name is not a valid HTTP header name.
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// A configured header value is not a valid HTTP header value.
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// The body could not be decoded as JSON, or the JSON did not match the requested type.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A GET against a process status resource returned a non-2xx status.
    ///
    /// `status_text` is the canonical reason phrase for `status` (for example
    /// `"Service Unavailable"` for 503), not the phrase the server put on its
    /// status line. It is empty for codes without a registered phrase.
    #[error("An HTTP request to GET process status failed: {status} {status_text}")]
    ProcessStatusRequestFailed {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase for `status`, empty if it has none
        status_text: String,
    },

    /// A process status response body had no `state` field.
    #[error(
        "the process status response did not describe a process: expected a JSON object with a \"state\" property (is the URL correct?)"
    )]
    MissingProcessState,
}

impl AffinityError {
    /// Wrap a transport-level failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        AffinityError::Transport(error.into())
    }

    /// Whether this error came from the transport rather than from the crate itself.
    pub fn is_transport(&self) -> bool {
        matches!(self, AffinityError::Transport(_))
    }

    /// Whether this error is a violation of the process status contract.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            AffinityError::ProcessStatusRequestFailed { .. } | AffinityError::MissingProcessState
        )
    }

    /// HTTP status code carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AffinityError::ProcessStatusRequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

//! Core data types shared by the dispatcher, the affinity coordinator and the poller.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Headers`] | Case-insensitive header map with key-wise merge |
//! | [`SessionDefaults`] | Base URL, headers and transport options applied to every request of a session |
//! | [`RequestOptions`] | Per-call options layered over the session defaults |
//! | [`ProcessStatus`] | Body of a process status resource |
//!
//! # Merge Semantics
//!
//! Merging is explicit and non-recursive over the known fields:
//!
//! | Field | Rule |
//! |-------|------|
//! | `base_url` | last writer wins (when set) |
//! | `headers` | key-wise union, new value wins on conflict |
//! | `timeout` | last writer wins (when set) |

use crate::error::{AffinityError, Result};
use crate::protocol::headers::{PROCESSING_STATE, STATE_FIELD};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Case-insensitive HTTP header map.
///
/// Names are normalized to lowercase on insertion, so `Accusoft-Affinity-Token` and
/// `accusoft-affinity-token` address the same entry. Names and values are not
/// validated here; invalid ones are rejected when a request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any existing value for the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether a header with this name is present (case-insensitive).
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Remove a header by name (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    /// Iterate over `(lowercase name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self` key by key; values from `other` win.
    pub fn merge(&mut self, other: Headers) {
        self.entries.extend(other.entries);
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Configuration applied to every request issued through a session.
///
/// A `SessionDefaults` value is also used as a *partial* when merging into an
/// existing session: unset fields (`None`, empty headers) leave the target untouched.
///
/// # Examples
///
/// ```
/// use affinity_http::SessionDefaults;
///
/// let mut defaults = SessionDefaults::new().with_base_url("http://host.example");
/// defaults.merge(SessionDefaults::new().with_header("A", "1"));
/// defaults.merge(SessionDefaults::new().with_header("B", "2"));
///
/// assert_eq!(defaults.base_url.as_deref(), Some("http://host.example"));
/// assert_eq!(defaults.headers.get("a"), Some("1"));
/// assert_eq!(defaults.headers.get("b"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDefaults {
    /// Base URL that relative resources are resolved against
    pub base_url: Option<String>,

    /// Headers sent with every request (always present, possibly empty)
    pub headers: Headers,

    /// Transport timeout for each request
    pub timeout: Option<Duration>,
}

impl SessionDefaults {
    /// Create empty defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a default header
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the per-request transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Merge a partial configuration into this one.
    ///
    /// `base_url` and `timeout` are overwritten when the partial sets them; headers
    /// are merged key by key with the partial's values winning.
    pub fn merge(&mut self, partial: SessionDefaults) {
        if partial.base_url.is_some() {
            self.base_url = partial.base_url;
        }
        self.headers.merge(partial.headers);
        if partial.timeout.is_some() {
            self.timeout = partial.timeout;
        }
    }

    /// Return a copy of `self` with `partial` merged in.
    pub fn merged(&self, partial: SessionDefaults) -> SessionDefaults {
        let mut merged = self.clone();
        merged.merge(partial);
        merged
    }
}

/// Options for a single request, layered over the session defaults.
///
/// `method` is accepted for symmetry with the transport's options but is always
/// overridden by the verb method that issues the request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers for this request only (win over session defaults)
    pub headers: Headers,

    /// Ignored: the dispatcher forces the method of the verb being invoked
    pub method: Option<http::Method>,

    /// Request body
    pub body: Option<Bytes>,

    /// Timeout for this request only (wins over the session default)
    pub timeout: Option<Duration>,

    /// Query parameters appended to the resolved URL
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    /// Create empty request options
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header for this request
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set a raw request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON request body and set `Content-Type: application/json`.
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        self.body = Some(Bytes::from(serde_json::to_vec(value)?));
        self.headers.insert("Content-Type", "application/json");
        Ok(self)
    }

    /// Set a timeout for this request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Status of an asynchronous process, as reported by a process status resource.
///
/// Only `state` is interpreted; every other field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessStatus {
    state: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl ProcessStatus {
    /// Build a status from a parsed JSON body.
    ///
    /// Fails with [`AffinityError::MissingProcessState`] unless the body is an object
    /// with a non-empty string `state`.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(AffinityError::MissingProcessState);
        };
        match fields.remove(STATE_FIELD) {
            Some(Value::String(state)) if !state.is_empty() => Ok(ProcessStatus { state, fields }),
            _ => Err(AffinityError::MissingProcessState),
        }
    }

    /// The `state` field
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Whether the process is still running (`state == "processing"`)
    pub fn is_processing(&self) -> bool {
        self.state == PROCESSING_STATE
    }

    /// Look up any other field of the status body
    pub fn get(&self, key: &str) -> Option<&Value> {
        if key == STATE_FIELD {
            return None;
        }
        self.fields.get(key)
    }

    /// All fields other than `state`
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Reassemble the full JSON body, `state` included.
    pub fn into_value(self) -> Value {
        let mut fields = self.fields;
        fields.insert(STATE_FIELD.to_string(), Value::String(self.state));
        Value::Object(fields)
    }
}

impl<'de> Deserialize<'de> for ProcessStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ProcessStatus::from_value(value).map_err(serde::de::Error::custom)
    }
}

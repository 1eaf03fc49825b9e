//! Header names, body field names and media-type parsing.
//!
//! # Wire Contract
//!
//! | Item | Value | Notes |
//! |------|-------|-------|
//! | Affinity header | `Accusoft-Affinity-Token` | sent on every request once discovered |
//! | Token field | `affinityToken` | must be a JSON string |
//! | State field | `state` | required on process status resources |
//! | Continuation state | `processing` | any other state is terminal |
//!
//! # Examples
//!
//! ```
//! use affinity_http::protocol::{parse_media_type, is_json_media_type};
//!
//! assert_eq!(parse_media_type("application/json; charset=utf-8"), "application/json");
//! assert!(is_json_media_type(Some(" application/json ;charset=utf-8")));
//! assert!(!is_json_media_type(Some("Application/JSON")));
//! assert!(!is_json_media_type(None));
//! ```

/// Request header carrying the affinity token.
pub const AFFINITY_TOKEN_HEADER: &str = "Accusoft-Affinity-Token";

/// Response body field holding the affinity token.
pub const AFFINITY_TOKEN_FIELD: &str = "affinityToken";

/// Process status field holding the process state.
pub const STATE_FIELD: &str = "state";

/// The only state that means "not done yet".
pub const PROCESSING_STATE: &str = "processing";

/// Media type a text body must declare before it is inspected for a token.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Extract the media type from a `Content-Type` value.
///
/// Takes everything before the first `;` and trims surrounding whitespace.
/// Case is preserved.
pub fn parse_media_type(content_type: &str) -> &str {
    match content_type.split_once(';') {
        Some((media_type, _params)) => media_type.trim(),
        None => content_type.trim(),
    }
}

/// Whether a `Content-Type` value declares exactly `application/json` (case-sensitive).
pub fn is_json_media_type(content_type: Option<&str>) -> bool {
    content_type.map(parse_media_type) == Some(JSON_MEDIA_TYPE)
}

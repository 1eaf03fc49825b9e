//! Wire-level constants and header parsing for affinity sessions.
//!
//! - **[headers]** - Affinity header name, JSON field names and media-type parsing

pub mod headers;

pub use headers::{
    is_json_media_type, parse_media_type, AFFINITY_TOKEN_FIELD, AFFINITY_TOKEN_HEADER,
    JSON_MEDIA_TYPE, PROCESSING_STATE, STATE_FIELD,
};

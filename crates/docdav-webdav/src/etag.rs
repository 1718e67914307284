//! Entity tags and content types for documents.
//!
//! A document's ETag is derived from its `updated_on` timestamp alone, so a
//! conditional GET can be answered from the record without touching the blob
//! store. The tag is the SHA-1 based strong tag of the timestamp rendered as
//! an HTTP date: `"{len:x}-{base64(sha1)[..27]}"`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Fallback for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The ETag value without surrounding quotes.
pub fn etag_value(updated_on: &DateTime<Utc>) -> String {
    let entity = updated_on.format(HTTP_DATE).to_string();
    let digest = Sha1::digest(entity.as_bytes());
    let hash = STANDARD.encode(digest);
    format!("{:x}-{}", entity.len(), &hash[..27])
}

/// The ETag header value, quoted.
pub fn etag(updated_on: &DateTime<Utc>) -> String {
    format!("\"{}\"", etag_value(updated_on))
}

/// Does an `If-None-Match` header value match `etag` (quoted)?
///
/// Accepts a comma-separated list, weak validators and `*`.
pub fn if_none_match(header: &str, etag: &str) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

/// MIME type for a file extension.
pub fn mime_type(extension: &str) -> String {
    mime_guess::from_ext(extension)
        .first_raw()
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

//! Identifier extraction and generation.
//!
//! Inbound documents identify objects with either a JSON-LD `@id` or a
//! plain `id` field; `@id` takes precedence. Minted identifiers come in
//! two schemes: UUIDv4 for events, and a short lowercase-alphanumeric code
//! for uploaded attachments.

use rand::Rng;
use serde_json::Value;

use crate::error::{TypeError, TypeResult};

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ATTACHMENT_ID_LEN: usize = 8;

/// Extract the identifier of a JSON object: `@id` first, then `id`.
pub fn extract_id(value: &Value) -> TypeResult<&str> {
    value
        .get("@id")
        .or_else(|| value.get("id"))
        .and_then(Value::as_str)
        .ok_or(TypeError::UnidentifiableObject)
}

/// Mint a fresh globally-unique event identifier.
pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Mint a fresh short identifier for an uploaded attachment.
pub fn new_attachment_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ATTACHMENT_ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

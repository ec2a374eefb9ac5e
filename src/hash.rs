//! Content fingerprints used to tell which source version a translation
//! was produced from.

use crate::models::{Content, Translation};
use sha2::{Digest, Sha256};

/// Separator between hashed fields.
pub const FIELD_DELIMITER: &str = "|";

/// Prefix on key-value bodies so they never hash like the same JSON as prose.
const KEY_VALUE_TAG: &str = "key_value:";

/// SHA-256 of an already serialized field string, hex encoded.
pub fn compute_content_hash(serialized_fields: &str) -> String {
    hex::encode(Sha256::digest(serialized_fields.as_bytes()))
}

/// Join title, description and body with the field delimiter.
///
/// Missing optional fields hash as empty strings.
pub fn serialize_fields(title: &str, description: Option<&str>, content: Option<&Content>) -> String {
    let content = match content {
        Some(body @ Content::KeyValueMap(_)) => format!("{}{}", KEY_VALUE_TAG, body.canonical_text()),
        Some(body) => body.canonical_text(),
        None => String::new(),
    };
    [title, description.unwrap_or(""), content.as_str()].join(FIELD_DELIMITER)
}

pub fn hash_fields(title: &str, description: Option<&str>, content: Option<&Content>) -> String {
    compute_content_hash(&serialize_fields(title, description, content))
}

pub fn hash_translation(row: &Translation) -> String {
    hash_fields(&row.title, row.description.as_deref(), row.content.as_ref())
}

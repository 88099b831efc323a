// src/pipeline/fingerprint.rs

//! Content fingerprinting.
//!
//! Text is normalized before hashing so that markup, entity encoding,
//! whitespace and letter case never register as content changes.

use sha2::{Digest, Sha256};

use crate::models::Fingerprint;
use crate::utils::strip_markup;

/// Separates fields inside a multi-field fingerprint.
const FIELD_SEPARATOR: char = '\u{1f}';

/// Strip tags, decode entities, collapse whitespace and lowercase.
pub fn normalize(text: &str) -> String {
    strip_markup(text).to_lowercase()
}

/// SHA-256 hex digest of the normalized text.
pub fn fingerprint(text: &str) -> Fingerprint {
    digest(normalize(text).as_bytes())
}

/// Digest over several normalized fields.
///
/// Field boundaries are part of the digest, so moving text from one field
/// into its neighbour changes the fingerprint.
pub fn fingerprint_fields(fields: &[&str]) -> Fingerprint {
    let mut joined = String::new();
    for (idx, field) in fields.iter().enumerate() {
        if idx > 0 {
            joined.push(FIELD_SEPARATOR);
        }
        joined.push_str(&normalize(field));
    }
    digest(joined.as_bytes())
}

fn digest(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_hex(hex::encode(hasher.finalize()))
}

//! Id utilities

use uuid::Uuid;

/// Generate a new row id (UUIDv4, hyphenated)
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// First `len` characters of an id, for display
pub fn short(id: &str, len: usize) -> &str {
    match id.char_indices().nth(len) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

//! Unique object naming
//!
//! Object names have the form `{prefix}/{file_name}-{id}{extension}` where
//! `id` is 32 lowercase hex characters from a random v4 UUID.

/// Generate a fresh 32-character lowercase hex identifier
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Build an object name with a freshly generated identifier
pub fn generate(prefix: &str, file_name: &str, extension: &str) -> String {
    with_id(prefix, file_name, &unique_id(), extension)
}

/// Build an object name from an explicit identifier
pub fn with_id(prefix: &str, file_name: &str, id: &str, extension: &str) -> String {
    format!("{}/{}-{}{}", prefix, file_name, id, extension)
}

//! The opaque provisioning state document
//!
//! This crate never interprets the state beyond requiring that it parse as
//! JSON. Imports are the one exception: they append to `resources`.

/// Written when a stage has no state yet
pub const EMPTY_STATE: &str = "{\n  \"resources\": []\n}\n";

/// A state blob must be non-blank, well-formed JSON
pub fn validate_state_blob(bytes: &[u8]) -> Result<(), String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err("state is empty".to_string());
    }
    serde_json::from_slice::<serde_json::Value>(bytes)
        .map(|_| ())
        .map_err(|e| format!("state is not valid JSON: {}", e))
}

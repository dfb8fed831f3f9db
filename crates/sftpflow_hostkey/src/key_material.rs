use base64::{engine::general_purpose::STANDARD, Engine};

use crate::rotator::RotatorError;

/// The secret holds the private key as base64 text. Line breaks and other
/// whitespace inside it are ignored.
pub fn decode_host_key(secret: &str) -> Result<String, RotatorError> {
    let compact: String = secret
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(RotatorError::KeyMaterial("secret is empty".to_string()));
    }

    let raw = STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| RotatorError::KeyMaterial(format!("invalid base64: {err}")))?;
    String::from_utf8(raw)
        .map_err(|_| RotatorError::KeyMaterial("decoded key is not text".to_string()))
}

//! Base64 transport encoding for judge payloads

use base64::{Engine, engine::general_purpose::STANDARD};

use super::JudgeError;

/// Encode text for transport
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode an optional transported field back to text.
///
/// The judge wraps long base64 payloads across lines, so whitespace is
/// stripped before decoding. Output that is not valid UTF-8 is decoded lossily.
pub fn decode(field: &str, value: Option<&str>) -> Result<Option<String>, JudgeError> {
    let Some(value) = value else {
        return Ok(None);
    };

    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| JudgeError::Protocol(format!("invalid base64 in {}: {}", field, e)))?;

    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

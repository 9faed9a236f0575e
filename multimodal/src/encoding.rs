//! Base64 and `data:` URL helpers.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};

use crate::error::MultiModalResult;

const DEFAULT_MIME: &str = "image/jpeg";

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Decode a base64 image, stripping a `data:<mime>;base64,` prefix if present.
pub fn decode_base64_image(input: &str) -> MultiModalResult<Vec<u8>> {
    let payload = match input.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => input,
    };
    // Clients commonly wrap long base64 strings.
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(BASE64_STANDARD.decode(cleaned.as_bytes())?)
}

/// MIME type declared by a `data:` URL, `image/jpeg` otherwise.
pub fn mime_type_from_data_url(input: &str) -> &str {
    input
        .strip_prefix("data:")
        .and_then(|rest| rest.split(',').next())
        .and_then(|header| header.split(';').next())
        .filter(|mime| mime.starts_with("image/"))
        .unwrap_or(DEFAULT_MIME)
}

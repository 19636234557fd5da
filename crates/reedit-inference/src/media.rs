//! Image payload helpers for multimodal requests.

use base64::Engine;
use reedit_core::defaults::FALLBACK_IMAGE_MIME;

/// Sniff an image MIME type from magic bytes.
///
/// Falls back to `image/jpeg` when the bytes are not a recognized image.
pub fn detect_mime(data: &[u8]) -> &'static str {
    match infer::get(data) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => kind.mime_type(),
        _ => FALLBACK_IMAGE_MIME,
    }
}

/// Encode an image as a `data:` URL for an `image_url` content part.
pub fn data_url(data: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        detect_mime(data),
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

//! Parsing of `data:[mediatype];base64,[data]` strings into decoded images.

use std::borrow::Cow;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use tracing::debug;
use vitrine_model::ContentType;

use super::DecodedImage;
use crate::error::{MediaError, Result};

const BASE64_SEPARATOR: &str = ";base64,";

/// Raw image bytes together with the encoding announced by the data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    content_type: ContentType,
    raw_bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Decode the bytes with the codec matching the announced content type.
    pub fn decode(&self) -> Result<DecodedImage> {
        let format = match self.content_type {
            ContentType::Jpeg => ImageFormat::Jpeg,
            ContentType::Png => ImageFormat::Png,
        };

        let image = image::load_from_memory_with_format(&self.raw_bytes, format)
            .map_err(|e| {
                MediaError::Decode(format!(
                    "{} payload is not a valid image: {e}",
                    self.content_type
                ))
            })?;

        Ok(DecodedImage::new(image))
    }
}

/// Split a data URI into its media type and base64-decoded payload.
///
/// The separator `;base64,` must occur exactly once. Line breaks inside the
/// payload are skipped; any other byte outside the standard alphabet fails.
pub fn parse_data_uri(raw: &str) -> Result<EncodedImage> {
    let mut parts = raw.split(BASE64_SEPARATOR);
    let (tag, payload) = match (parts.next(), parts.next(), parts.next()) {
        (Some(tag), Some(payload), None) => (tag, payload),
        _ => {
            return Err(MediaError::Format(
                "expected 'data:[mediatype];base64,[data]'".to_string(),
            ));
        }
    };

    let content_type = ContentType::from_data_uri_tag(tag)
        .ok_or_else(|| MediaError::UnsupportedMediaType(tag.to_string()))?;

    let payload: Cow<'_, str> = if payload.contains(['\r', '\n']) {
        Cow::Owned(payload.replace(['\r', '\n'], ""))
    } else {
        Cow::Borrowed(payload)
    };

    let raw_bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| MediaError::Decode(format!("malformed base64: {e}")))?;

    debug!(
        content_type = %content_type,
        decoded_size = raw_bytes.len(),
        "parsed data URI"
    );

    Ok(EncodedImage {
        content_type,
        raw_bytes,
    })
}

/// Parse and decode a data URI in one step.
pub fn image_from_data_uri(raw: &str) -> Result<DecodedImage> {
    parse_data_uri(raw)?.decode()
}

//! Inbound document normalization.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::ExtractionError;

/// Media types the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    Pdf,
}

impl MediaType {
    /// Accepts full MIME strings and common aliases, case-insensitive.
    pub fn parse(raw: &str) -> Result<Self, ExtractionError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" | "jpeg" | "jpg" => Ok(MediaType::Jpeg),
            "image/png" | "png" => Ok(MediaType::Png),
            "image/webp" | "webp" => Ok(MediaType::Webp),
            "application/pdf" | "pdf" => Ok(MediaType::Pdf),
            other => Err(ExtractionError::UnsupportedMediaType(other.to_string())),
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, MediaType::Pdf)
    }

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Webp => "image/webp",
            MediaType::Pdf => "application/pdf",
        }
    }
}

/// A decoded document ready for the extraction engine.
pub struct NormalizedDocument {
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

impl NormalizedDocument {
    pub fn from_base64(media_type_raw: &str, payload: &str) -> Result<Self, ExtractionError> {
        let media_type = MediaType::parse(media_type_raw)?;
        // Tolerate data-URL prefixes the way browsers send them.
        let encoded = payload
            .rsplit_once("base64,")
            .map(|(_, rest)| rest)
            .unwrap_or(payload);
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| ExtractionError::InvalidPayload(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        Ok(Self { media_type, bytes })
    }

    /// Data URL form, used for the multimodal image path.
    pub fn as_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type.mime(),
            BASE64.encode(&self.bytes)
        )
    }
}

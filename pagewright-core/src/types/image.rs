//! Owned image data embedded in a book

use crate::error::ImageError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// A self-contained image: MIME type plus the raw bytes.
///
/// Serializes as a `data:` URI so books and document models stay
/// self-contained when written out as JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    mime_type: String,
    data: Vec<u8>,
}

impl ImageBlob {
    /// Create a blob from a MIME type and bytes
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// MIME type (e.g. "image/png")
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Raw image bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 of the bytes, hex encoded
    pub fn content_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }

    /// Conventional file extension for the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpeg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }

    /// Encode as an embeddable `data:<mime>;base64,<payload>` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    /// Parse a base64 `data:` URI
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImageError::InvalidDataUri("missing 'data:' prefix".to_string()))?;
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageError::InvalidDataUri("missing ',' separator".to_string()))?;
        let mime_type = meta
            .strip_suffix(";base64")
            .ok_or_else(|| ImageError::InvalidDataUri("only base64 payloads are supported".to_string()))?;
        if mime_type.is_empty() || mime_type.contains(';') {
            return Err(ImageError::InvalidDataUri(format!(
                "bad media type '{}'",
                mime_type
            )));
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|e| ImageError::InvalidDataUri(e.to_string()))?;
        if data.is_empty() {
            return Err(ImageError::Empty);
        }

        Ok(Self::new(mime_type, data))
    }
}

impl Serialize for ImageBlob {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_data_uri())
    }
}

impl<'de> Deserialize<'de> for ImageBlob {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ImageBlob::from_data_uri(&s).map_err(serde::de::Error::custom)
    }
}

//! Image ingestion
//!
//! Turns raw bytes from a file or an upload into a self-contained
//! [`ImageBlob`]. The format is detected from the content; the file name
//! is only consulted for SVG, which has no reliable signature.

use crate::error::ImageError;
use crate::types::ImageBlob;
use std::io::Read;
use std::path::Path;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = b"\xFF\xD8\xFF";

/// How far into a text file to look for an `<svg` element
const SVG_SNIFF_LEN: usize = 1024;

/// Detect the MIME type of image bytes
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if looks_like_svg(bytes) {
        Some("image/svg+xml")
    } else {
        None
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SVG_SNIFF_LEN)];
    let Ok(text) = std::str::from_utf8(head) else {
        // a multi-byte char may be cut at the sniff boundary
        return String::from_utf8_lossy(head).contains("<svg");
    };
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with("<svg") || text.starts_with("<?xml") || text.starts_with("<!DOCTYPE svg"))
        && text.contains("<svg")
}

/// Build a blob from bytes already in memory
pub fn ingest_bytes(bytes: Vec<u8>, name_hint: Option<&str>) -> Result<ImageBlob, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    let mime = sniff_mime(&bytes).or_else(|| {
        name_hint
            .filter(|name| name.to_lowercase().ends_with(".svg"))
            .map(|_| "image/svg+xml")
    });

    match mime {
        Some(mime) => {
            tracing::debug!(mime, bytes = bytes.len(), "ingested image");
            Ok(ImageBlob::new(mime, bytes))
        }
        None => Err(ImageError::UnrecognizedFormat),
    }
}

/// Read `reader` to the end and build a blob
pub fn ingest(reader: &mut dyn Read, name_hint: Option<&str>) -> Result<ImageBlob, ImageError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    ingest_bytes(bytes, name_hint)
}

/// Load an image file from disk
pub fn ingest_path(path: &Path) -> Result<ImageBlob, ImageError> {
    let mut file = std::fs::File::open(path)?;
    ingest(&mut file, path.file_name().and_then(|n| n.to_str()))
}

//! Export adapters: render a [`DocumentModel`] into a document format
//!
//! Every adapter consumes the same fully paginated model, so page breaks,
//! headers and footers match the live preview exactly.

mod docx;
mod html;
mod pdf;
mod txt;

pub use docx::DocxEncoder;
pub use html::{render_html, HtmlEncoder};
pub use pdf::PdfEncoder;
pub use txt::TxtEncoder;

use crate::error::ExportError;
use crate::types::DocumentModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Trait for encoding documents to output formats
pub trait Encoder: Send + Sync {
    /// Encode a document to a writer
    fn encode(&self, doc: &DocumentModel, writer: &mut dyn Write) -> Result<(), ExportError>;

    /// Format name (e.g., "PDF", "DOCX")
    fn format_name(&self) -> &str;

    /// File extension for this format
    fn file_extension(&self) -> &str;

    /// MIME type for this format
    fn mime_type(&self) -> &str;
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Docx,
    Txt,
    Html,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Pdf,
        ExportFormat::Docx,
        ExportFormat::Txt,
        ExportFormat::Html,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Docx => "docx",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
        }
    }

    /// The adapter for this format
    pub fn encoder(&self) -> Box<dyn Encoder> {
        match self {
            ExportFormat::Pdf => Box::new(PdfEncoder::new()),
            ExportFormat::Docx => Box::new(DocxEncoder::new()),
            ExportFormat::Txt => Box::new(TxtEncoder::new()),
            ExportFormat::Html => Box::new(HtmlEncoder::new()),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "docx" => Ok(ExportFormat::Docx),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Get an encoder by format name
pub fn encoder_for_format(format: &str) -> Option<Box<dyn Encoder>> {
    format.parse::<ExportFormat>().ok().map(|f| f.encoder())
}

/// Export `doc` as `format`, returning the encoded bytes.
///
/// Preconditions are checked before any encoding starts: the document
/// must have a non-blank title.
pub fn export(doc: &DocumentModel, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    if doc.title().trim().is_empty() {
        return Err(ExportError::MissingField("title".to_string()));
    }

    let encoder = format.encoder();
    let mut buffer = Vec::new();
    encoder.encode(doc, &mut buffer)?;

    tracing::debug!(
        format = encoder.format_name(),
        pages = doc.page_count(),
        bytes = buffer.len(),
        "exported document"
    );
    Ok(buffer)
}

pub(crate) fn write_bytes(writer: &mut dyn Write, bytes: &[u8]) -> Result<(), ExportError> {
    writer
        .write_all(bytes)
        .map_err(|e| ExportError::EncodingFailed(e.to_string()))
}

/// Escape text for HTML and XML content and attributes. Control
/// characters XML 1.0 forbids become spaces.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '\t' | '\n' | '\r' => escaped.push(ch),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

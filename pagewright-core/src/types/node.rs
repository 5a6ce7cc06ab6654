//! Resolved content nodes produced from chapter markup

use super::ImageBlob;
use serde::{Deserialize, Serialize};

/// Inline styling of a text run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    pub const PLAIN: TextStyle = TextStyle {
        bold: false,
        italic: false,
    };

    pub fn with_bold(self) -> Self {
        Self { bold: true, ..self }
    }

    pub fn with_italic(self) -> Self {
        Self {
            italic: true,
            ..self
        }
    }
}

/// A run of text sharing one style. May contain `\n` line breaks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::PLAIN)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::PLAIN.with_bold())
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(text, TextStyle::PLAIN.with_italic())
    }
}

/// Where an image's bytes come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageSource {
    /// Decoded from a data URI; no further loading needed
    Embedded(ImageBlob),

    /// External URL, passed through to renderers as-is
    Remote(String),
}

impl ImageSource {
    /// Value usable as an `src` attribute
    pub fn to_src(&self) -> String {
        match self {
            ImageSource::Embedded(blob) => blob.to_data_uri(),
            ImageSource::Remote(url) => url.clone(),
        }
    }
}

/// An already-interpreted piece of chapter content ready for layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResolvedNode {
    Text(TextRun),

    /// Forces the following content onto a new page
    PageBreak,

    Image { source: ImageSource, alt: String },
}

impl ResolvedNode {
    /// Create a plain text node
    pub fn text(s: impl Into<String>) -> Self {
        ResolvedNode::Text(TextRun::plain(s))
    }

    /// The text run, if this is a text node
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            ResolvedNode::Text(run) => Some(run),
            _ => None,
        }
    }
}

//! Chapter type representing a single chapter of a book

use serde::{Deserialize, Serialize};

/// A single chapter: a title and markup-bearing raw content
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chapter {
    /// Chapter title
    pub title: String,

    /// Raw content, including markup directives
    #[serde(default)]
    pub content: String,
}

impl Chapter {
    /// Create a new chapter with a title and no content
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: String::new(),
        }
    }

    /// Set the raw content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Title used in headings and the table of contents.
    /// Blank titles fall back to "Chapter N" (1-based).
    pub fn display_title(&self, index: usize) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            format!("Chapter {}", index + 1)
        } else {
            title.to_string()
        }
    }
}

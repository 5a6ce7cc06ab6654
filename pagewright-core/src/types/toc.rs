//! Table of contents types

use serde::{Deserialize, Serialize};

/// A chapter title paired with the page its content starts on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TocEntry {
    /// Display title
    pub title: String,

    /// First page number of the chapter
    pub page: u32,
}

impl TocEntry {
    /// Create a new TOC entry
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
        }
    }
}

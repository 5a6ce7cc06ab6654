//! Laid-out pages

use super::ResolvedNode;
use serde::{Deserialize, Serialize};

/// What a page holds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Synthesized cover page
    Cover,
    /// Synthesized table of contents page
    Contents,
    /// Chapter content
    #[default]
    Body,
}

/// A single numbered page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number
    pub number: u32,

    pub kind: PageKind,

    /// Index of the chapter this page belongs to (body pages only)
    pub chapter: Option<usize>,

    /// Content assigned to this page, in order
    pub nodes: Vec<ResolvedNode>,

    /// Running header text
    pub header: Option<String>,

    /// Footer text (the page number), aligned per configuration
    pub footer: Option<String>,
}

impl Page {
    /// Create an empty body page
    pub fn new(number: u32) -> Self {
        Self {
            number,
            kind: PageKind::Body,
            chapter: None,
            nodes: Vec::new(),
            header: None,
            footer: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Concatenated text of all runs on the page
    pub fn plain_text(&self) -> String {
        self.nodes
            .iter()
            .filter_map(|node| node.as_text())
            .map(|run| run.text.as_str())
            .collect()
    }
}

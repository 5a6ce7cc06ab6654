//! Plain text encoder
//!
//! One block per page separated by form feeds. Styling is dropped; the
//! header is centered and the page number aligned within a fixed width.

use super::write_bytes;
use crate::error::ExportError;
use crate::types::{DocumentModel, Page, PageNumberAlignment, ResolvedNode};
use std::io::Write;

/// Width of the field headers and footers are aligned in
pub const TEXT_WIDTH: usize = 72;

const PAGE_SEPARATOR: char = '\u{000C}';

/// Encoder for plain UTF-8 text
pub struct TxtEncoder {
    width: usize,
}

impl TxtEncoder {
    pub fn new() -> Self {
        Self { width: TEXT_WIDTH }
    }

    /// Set the alignment width
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    /// Render the whole document
    pub fn render(&self, doc: &DocumentModel) -> String {
        let alignment = doc.config().page_number_alignment;
        doc.pages()
            .iter()
            .map(|page| self.render_page(page, alignment))
            .collect::<Vec<_>>()
            .join(&PAGE_SEPARATOR.to_string())
    }

    fn render_page(&self, page: &Page, alignment: PageNumberAlignment) -> String {
        let mut out = String::new();

        if let Some(header) = &page.header {
            out.push_str(&self.align(header, PageNumberAlignment::Center));
            out.push_str("\n\n");
        }

        let mut body = String::new();
        for node in &page.nodes {
            match node {
                ResolvedNode::Text(run) => body.push_str(&run.text),
                ResolvedNode::Image { alt, .. } => {
                    if !body.is_empty() && !body.ends_with('\n') {
                        body.push('\n');
                    }
                    body.push_str(&format!("[Image: {}]\n", alt));
                }
                ResolvedNode::PageBreak => {}
            }
        }
        out.push_str(body.trim_end_matches('\n'));
        out.push('\n');

        if let Some(footer) = &page.footer {
            out.push('\n');
            out.push_str(&self.align(footer, alignment));
            out.push('\n');
        }
        out
    }

    fn align(&self, text: &str, alignment: PageNumberAlignment) -> String {
        let len = text.chars().count();
        let pad = self.width.saturating_sub(len);
        let lead = match alignment {
            PageNumberAlignment::Center => pad / 2,
            PageNumberAlignment::Right => pad,
            PageNumberAlignment::Left | PageNumberAlignment::None => 0,
        };
        format!("{}{}", " ".repeat(lead), text).trim_end().to_string()
    }
}

impl Default for TxtEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Encoder for TxtEncoder {
    fn encode(&self, doc: &DocumentModel, writer: &mut dyn Write) -> Result<(), ExportError> {
        write_bytes(writer, self.render(doc).as_bytes())
    }

    fn format_name(&self) -> &str {
        "Text"
    }

    fn file_extension(&self) -> &str {
        "txt"
    }

    fn mime_type(&self) -> &str {
        "text/plain; charset=utf-8"
    }
}

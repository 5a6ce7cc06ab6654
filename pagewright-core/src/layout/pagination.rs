//! Pagination engine
//!
//! Splits a linear node sequence into numbered pages using a content-fit
//! heuristic rather than real glyph metrics:
//!
//! - every glyph is `font_size * 0.5` wide (bold: `* 1.1`)
//! - a line takes `font_size * line_height`
//! - an image closes the current line and takes 40% of the content height
//!
//! Runs are never split. A run that does not fit the remaining space moves
//! whole to the next page; a run larger than an empty page overflows it.

use crate::types::{Configuration, Page, PageNumberAlignment, ResolvedNode, TextRun, TextStyle};

/// Share of the content height claimed by an image
pub const IMAGE_HEIGHT_RATIO: f32 = 0.4;

/// Average glyph width as a fraction of the font size
pub const AVERAGE_GLYPH_WIDTH: f32 = 0.5;

/// Extra width of bold glyphs
pub const BOLD_WIDTH_FACTOR: f32 = 1.1;

const OVERFLOW_TOLERANCE: f32 = 0.01;

/// Vertical position within the current page
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Cursor {
    /// Height consumed so far
    pub used: f32,
    column: f32,
    line_open: bool,
}

/// Page geometry derived from a configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageMetrics {
    pub line_band: f32,
    pub content_width: f32,
    pub content_height: f32,
    font_size: f32,
}

impl PageMetrics {
    pub fn new(config: &Configuration, has_header: bool) -> Self {
        Self {
            line_band: config.line_band(),
            content_width: config.content_width(),
            content_height: config.content_height(has_header),
            font_size: config.font_size,
        }
    }

    pub fn glyph_width(&self, style: TextStyle) -> f32 {
        let width = self.font_size * AVERAGE_GLYPH_WIDTH;
        if style.bold {
            width * BOLD_WIDTH_FACTOR
        } else {
            width
        }
    }

    /// How many glyphs of `style` fit on one line
    pub fn chars_per_line(&self, style: TextStyle) -> usize {
        ((self.content_width / self.glyph_width(style)).floor() as usize).max(1)
    }

    /// How many full lines fit in the content box
    pub fn lines_per_page(&self) -> usize {
        ((self.content_height / self.line_band).floor() as usize).max(1)
    }

    pub fn image_height(&self) -> f32 {
        self.content_height * IMAGE_HEIGHT_RATIO
    }

    /// Cursor after laying out `run` starting at `cursor`
    pub fn advance_text(&self, mut cursor: Cursor, run: &TextRun) -> Cursor {
        let glyph = self.glyph_width(run.style);
        for ch in run.text.chars() {
            if ch == '\n' {
                if !cursor.line_open {
                    // blank line
                    cursor.used += self.line_band;
                }
                cursor.line_open = false;
                cursor.column = 0.0;
                continue;
            }

            if !cursor.line_open {
                cursor.used += self.line_band;
                cursor.line_open = true;
                cursor.column = 0.0;
            } else if cursor.column + glyph > self.content_width {
                // wrap
                cursor.used += self.line_band;
                cursor.column = 0.0;
            }
            cursor.column += glyph;
        }
        cursor
    }

    /// Cursor after placing an image block
    pub fn advance_image(&self, mut cursor: Cursor) -> Cursor {
        cursor.used += self.image_height();
        cursor.line_open = false;
        cursor.column = 0.0;
        cursor
    }

    pub fn overflows(&self, cursor: Cursor) -> bool {
        cursor.used > self.content_height + OVERFLOW_TOLERANCE
    }

    fn advance(&self, cursor: Cursor, node: &ResolvedNode) -> Cursor {
        match node {
            ResolvedNode::Text(run) => self.advance_text(cursor, run),
            ResolvedNode::Image { .. } => self.advance_image(cursor),
            ResolvedNode::PageBreak => cursor,
        }
    }
}

/// Footer text for page `number`, if page numbers are shown
pub(crate) fn footer_for(config: &Configuration, number: u32) -> Option<String> {
    match config.page_number_alignment {
        PageNumberAlignment::None => None,
        _ => Some(number.to_string()),
    }
}

/// Running header text configured for every page
pub(crate) fn header_for(config: &Configuration) -> Option<String> {
    config
        .header_text
        .as_ref()
        .filter(|text| !text.trim().is_empty())
        .cloned()
}

/// Lay `nodes` out into pages numbered from `start_page`.
///
/// Always returns at least one page. A `PageBreak` closes the current page
/// (even an empty one) and is not stored; an empty page left at the very
/// end by a trailing break is dropped.
pub fn paginate(nodes: &[ResolvedNode], config: &Configuration, start_page: u32) -> Vec<Page> {
    let header = header_for(config);
    let metrics = PageMetrics::new(config, header.is_some());

    let mut filled: Vec<Vec<ResolvedNode>> = Vec::new();
    let mut current: Vec<ResolvedNode> = Vec::new();
    let mut cursor = Cursor::default();

    for node in nodes {
        if let ResolvedNode::PageBreak = node {
            filled.push(std::mem::take(&mut current));
            cursor = Cursor::default();
            continue;
        }

        let next = metrics.advance(cursor, node);
        if metrics.overflows(next) && !current.is_empty() {
            filled.push(std::mem::take(&mut current));
            cursor = metrics.advance(Cursor::default(), node);
        } else {
            cursor = next;
        }
        current.push(node.clone());
    }

    if !current.is_empty() || filled.is_empty() {
        filled.push(current);
    }

    filled
        .into_iter()
        .enumerate()
        .map(|(index, nodes)| {
            let number = start_page + index as u32;
            Page {
                nodes,
                header: header.clone(),
                footer: footer_for(config, number),
                ..Page::new(number)
            }
        })
        .collect()
}

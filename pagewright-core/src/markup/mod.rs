//! Markup resolver: turns raw chapter text into resolved nodes
//!
//! Supported directives:
//! - `**bold**` and `*italic*` (each may contain the other)
//! - a line holding only `[[PAGEBREAK]]`
//! - `![alt](source)` where source is a base64 `data:` URI or a URL
//!
//! Anything else, including malformed directives, is kept as literal text.
//! Malformed directives are reported as diagnostics, never as errors.

use crate::types::{ImageBlob, ImageSource, ResolvedNode, TextRun, TextStyle};
use serde::Serialize;

/// Line content that forces a page break
pub const PAGE_BREAK_MARKER: &str = "[[PAGEBREAK]]";

/// Which directive a diagnostic refers to
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    Bold,
    Italic,
    Image,
}

/// A directive that could not be interpreted and was kept as literal text
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MalformedDirective {
    pub kind: DirectiveKind,
    /// 1-based line number
    pub line: usize,
    /// 1-based column, in characters
    pub column: usize,
}

/// Nodes plus the diagnostics gathered while resolving them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub nodes: Vec<ResolvedNode>,
    pub malformed: Vec<MalformedDirective>,
}

/// Resolve raw chapter text into nodes
pub fn resolve(raw: &str) -> Vec<ResolvedNode> {
    resolve_with_diagnostics(raw).nodes
}

/// Resolve raw chapter text, also reporting recovered malformed directives
pub fn resolve_with_diagnostics(raw: &str) -> Resolution {
    let mut out = NodeBuilder::default();
    let mut malformed = Vec::new();
    let mut after_text_line = false;

    for (index, line) in raw.split('\n').enumerate() {
        if line.trim() == PAGE_BREAK_MARKER {
            out.push(ResolvedNode::PageBreak);
            after_text_line = false;
            continue;
        }

        if after_text_line {
            out.end_line();
        }

        let mut scanner = LineScanner {
            line,
            line_no: index + 1,
            malformed: &mut malformed,
        };
        scanner.scan(0, line.len(), TextStyle::PLAIN, &mut out);
        after_text_line = true;
    }

    if !malformed.is_empty() {
        tracing::debug!(
            count = malformed.len(),
            "kept malformed directives as literal text"
        );
    }

    Resolution {
        nodes: out.nodes,
        malformed,
    }
}

/// Accumulates nodes, merging adjacent runs of the same style within a
/// line. Runs never span lines, which keeps them small enough for the
/// paginator to move as units.
#[derive(Default)]
struct NodeBuilder {
    nodes: Vec<ResolvedNode>,
    line_boundary: bool,
}

impl NodeBuilder {
    fn push_text(&mut self, text: &str, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        if !self.line_boundary {
            if let Some(ResolvedNode::Text(run)) = self.nodes.last_mut() {
                if run.style == style {
                    run.text.push_str(text);
                    return;
                }
            }
        }
        self.line_boundary = false;
        self.nodes.push(ResolvedNode::Text(TextRun::new(text, style)));
    }

    fn push(&mut self, node: ResolvedNode) {
        self.line_boundary = false;
        self.nodes.push(node);
    }

    /// Terminate the current line with a newline
    fn end_line(&mut self) {
        self.push_text("\n", TextStyle::PLAIN);
        self.line_boundary = true;
    }
}

/// Scans one line. All delimiters are ASCII, so every index it slices at
/// is a char boundary.
struct LineScanner<'a, 'd> {
    line: &'a str,
    line_no: usize,
    malformed: &'d mut Vec<MalformedDirective>,
}

impl LineScanner<'_, '_> {
    fn scan(&mut self, start: usize, end: usize, style: TextStyle, out: &mut NodeBuilder) {
        let bytes = self.line.as_bytes();
        let mut i = start;
        let mut literal_start = start;
        // Once a closer search fails, no later opener in this range can succeed
        let mut no_double_closer = false;
        let mut no_single_closer = false;

        while i < end {
            match bytes[i] {
                b'*' if i + 1 < end && bytes[i + 1] == b'*' => {
                    let close = if no_double_closer {
                        None
                    } else {
                        self.find_double(i + 2, end)
                    };
                    match close {
                        Some(close) if close > i + 2 => {
                            out.push_text(&self.line[literal_start..i], style);
                            self.scan(i + 2, close, style.with_bold(), out);
                            i = close + 2;
                            literal_start = i;
                        }
                        Some(close) => {
                            self.report(DirectiveKind::Bold, i);
                            i = close + 2;
                        }
                        None => {
                            no_double_closer = true;
                            self.report(DirectiveKind::Bold, i);
                            i += 2;
                        }
                    }
                }
                b'*' => {
                    let close = if no_single_closer {
                        None
                    } else {
                        self.find_single(i + 1, end)
                    };
                    match close {
                        Some(close) => {
                            out.push_text(&self.line[literal_start..i], style);
                            self.scan(i + 1, close, style.with_italic(), out);
                            i = close + 1;
                            literal_start = i;
                        }
                        None => {
                            no_single_closer = true;
                            self.report(DirectiveKind::Italic, i);
                            i += 1;
                        }
                    }
                }
                b'!' if i + 1 < end && bytes[i + 1] == b'[' => match self.parse_image(i, end) {
                    Some((node, next)) => {
                        out.push_text(&self.line[literal_start..i], style);
                        out.push(node);
                        i = next;
                        literal_start = i;
                    }
                    None => {
                        self.report(DirectiveKind::Image, i);
                        i += 2;
                    }
                },
                _ => i += 1,
            }
        }

        out.push_text(&self.line[literal_start..end], style);
    }

    /// Next `**` in `[from, end)`. In a run of three stars the closer
    /// moves one to the right when an italic inside is still open, so
    /// `***x***` is bold italic.
    fn find_double(&self, from: usize, end: usize) -> Option<usize> {
        if from >= end {
            return None;
        }
        let close = from + self.line[from..end].find("**")?;
        let open_italic = self.line[from..close].bytes().filter(|&b| b == b'*').count() % 2 == 1;
        if open_italic && close + 2 < end && self.line.as_bytes()[close + 2] == b'*' {
            Some(close + 1)
        } else {
            Some(close)
        }
    }

    /// Next lone `*` in `[from, end)` with at least one character before it
    fn find_single(&self, from: usize, end: usize) -> Option<usize> {
        let bytes = self.line.as_bytes();
        (from + 1..end).find(|&j| {
            bytes[j] == b'*'
                && bytes[j - 1] != b'*'
                && (j + 1 >= end || bytes[j + 1] != b'*')
        })
    }

    /// Parse `![alt](source)` starting at `start`; returns the node and the
    /// index just past the closing parenthesis
    fn parse_image(&self, start: usize, end: usize) -> Option<(ResolvedNode, usize)> {
        let rest = &self.line[start + 2..end];
        let alt_end = start + 2 + rest.find(']')?;
        if self.line.as_bytes().get(alt_end + 1) != Some(&b'(') || alt_end + 1 >= end {
            return None;
        }
        let src_start = alt_end + 2;
        let src_end = src_start + self.line[src_start..end].find(')')?;

        let alt = self.line[start + 2..alt_end].trim();
        let src = self.line[src_start..src_end].trim();
        if alt.is_empty() || src.is_empty() || src.chars().any(char::is_whitespace) {
            return None;
        }

        let source = if src.starts_with("data:") {
            ImageSource::Embedded(ImageBlob::from_data_uri(src).ok()?)
        } else {
            ImageSource::Remote(src.to_string())
        };

        Some((
            ResolvedNode::Image {
                source,
                alt: alt.to_string(),
            },
            src_end + 1,
        ))
    }

    fn report(&mut self, kind: DirectiveKind, at: usize) {
        self.malformed.push(MalformedDirective {
            kind,
            line: self.line_no,
            column: self.line[..at].chars().count() + 1,
        });
    }
}

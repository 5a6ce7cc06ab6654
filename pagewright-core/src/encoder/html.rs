//! HTML encoder
//!
//! Produces a standalone document with one `<section class="page">` per
//! page, sized and styled from the layout configuration. This is also the
//! rendering used for the live preview.

use super::{escape_xml, write_bytes};
use crate::error::ExportError;
use crate::layout::PageMetrics;
use crate::types::{
    parse_hex_color, Configuration, CoverBlock, DocumentModel, ImageBlob, Page, PageKind,
    PageNumberAlignment, ResolvedNode, TextRun,
};
use std::io::Write;

/// Edge length of the author image on the cover
const AUTHOR_IMAGE_SIZE: u32 = 96;

/// Encoder for standalone HTML
pub struct HtmlEncoder {
    /// Include page sheet shadows and gaps meant for on-screen preview
    screen: bool,
}

impl HtmlEncoder {
    pub fn new() -> Self {
        Self { screen: true }
    }

    /// Toggle on-screen decoration around pages
    pub fn with_screen_styles(mut self, screen: bool) -> Self {
        self.screen = screen;
        self
    }

    /// Render the whole document
    pub fn render(&self, doc: &DocumentModel) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n");
        html.push_str(&format!("<title>{}</title>\n", escape_xml(doc.title())));
        html.push_str("<style>\n");
        html.push_str(&self.stylesheet(doc.config()));
        html.push_str("</style>\n</head>\n<body>\n");

        for page in doc.pages() {
            html.push_str(&self.page_to_html(page, doc.cover()));
        }

        html.push_str("</body>\n</html>\n");
        html
    }

    fn stylesheet(&self, config: &Configuration) -> String {
        let defaults = Configuration::default();
        let text_color = css_color(&config.text_color, &defaults.text_color);
        let background = css_color(&config.background_color, &defaults.background_color);
        let footer_align = match config.page_number_alignment {
            PageNumberAlignment::Left => "left",
            PageNumberAlignment::Right => "right",
            PageNumberAlignment::Center | PageNumberAlignment::None => "center",
        };
        let image_height = PageMetrics::new(config, config.header_text.is_some()).image_height();
        let band = config.line_band();

        let mut css = format!(
            "body {{ margin: 0; {} }}\n\
             .page {{ box-sizing: border-box; position: relative; overflow: hidden; \
             width: {}px; height: {}px; padding: {}px; background: {}; color: {}; \
             font-family: \"{}\", serif; font-size: {}px; line-height: {}; {} }}\n\
             .page-header {{ height: {}px; text-align: center; font-size: 0.85em; }}\n\
             .page-body {{ white-space: pre-wrap; overflow-wrap: break-word; }}\n\
             .page-footer {{ position: absolute; left: {}px; right: {}px; bottom: {}px; \
             height: {}px; text-align: {}; font-size: 0.85em; }}\n\
             .page img {{ display: block; max-width: 100%; height: {}px; object-fit: contain; margin: 0 auto; }}\n\
             .cover .page-body {{ text-align: center; }}\n\
             .author-image {{ position: absolute; width: {}px; height: {}px; object-fit: cover; }}\n",
            if self.screen { "background: #e5e5e5;" } else { "" },
            config.page_width,
            config.page_height,
            config.page_padding,
            background,
            text_color,
            css_string(&config.font_family),
            config.font_size,
            config.line_height,
            if self.screen {
                "margin: 16px auto; box-shadow: 0 1px 4px rgba(0,0,0,0.3);"
            } else {
                "page-break-after: always;"
            },
            band,
            config.page_padding,
            config.page_padding,
            config.page_padding,
            band,
            footer_align,
            image_height,
            AUTHOR_IMAGE_SIZE,
            AUTHOR_IMAGE_SIZE,
        );
        css.push_str("@media print { body { background: none; } .page { margin: 0; box-shadow: none; } }\n");
        css
    }

    fn page_to_html(&self, page: &Page, cover: &CoverBlock) -> String {
        let class = match page.kind {
            PageKind::Cover => "page cover",
            PageKind::Contents => "page contents",
            PageKind::Body => "page",
        };
        let mut html = format!(
            "<section class=\"{}\" id=\"page-{}\" data-page=\"{}\">\n",
            class, page.number, page.number
        );

        if let Some(header) = &page.header {
            html.push_str(&format!(
                "<header class=\"page-header\">{}</header>\n",
                escape_xml(header)
            ));
        }

        html.push_str("<div class=\"page-body\">");
        for node in &page.nodes {
            html.push_str(&node_to_html(node));
        }
        html.push_str("</div>\n");

        if page.kind == PageKind::Cover {
            if let Some(image) = &cover.author_image {
                html.push_str(&author_image_html(image, cover));
            }
        }

        if let Some(footer) = &page.footer {
            html.push_str(&format!(
                "<footer class=\"page-footer\">{}</footer>\n",
                escape_xml(footer)
            ));
        }

        html.push_str("</section>\n");
        html
    }
}

impl Default for HtmlEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Encoder for HtmlEncoder {
    fn encode(&self, doc: &DocumentModel, writer: &mut dyn Write) -> Result<(), ExportError> {
        write_bytes(writer, self.render(doc).as_bytes())
    }

    fn format_name(&self) -> &str {
        "HTML"
    }

    fn file_extension(&self) -> &str {
        "html"
    }

    fn mime_type(&self) -> &str {
        "text/html; charset=utf-8"
    }
}

/// Render `doc` for on-screen preview
pub fn render_html(doc: &DocumentModel) -> String {
    HtmlEncoder::new().render(doc)
}

fn node_to_html(node: &ResolvedNode) -> String {
    match node {
        ResolvedNode::Text(run) => run_to_html(run),
        ResolvedNode::Image { source, alt } => format!(
            "<img src=\"{}\" alt=\"{}\"/>",
            escape_xml(&source.to_src()),
            escape_xml(alt)
        ),
        ResolvedNode::PageBreak => String::new(),
    }
}

fn run_to_html(run: &TextRun) -> String {
    let mut html = escape_xml(&run.text);
    if run.style.italic {
        html = format!("<em>{}</em>", html);
    }
    if run.style.bold {
        html = format!("<strong>{}</strong>", html);
    }
    html
}

fn author_image_html(image: &ImageBlob, cover: &CoverBlock) -> String {
    let position = cover.author_image_position;
    let vertical = if position.is_top() { "top" } else { "bottom" };
    let horizontal = if position.is_left() { "left" } else { "right" };
    format!(
        "<img class=\"author-image\" style=\"{}: 8px; {}: 8px;\" src=\"{}\" alt=\"{}\"/>\n",
        vertical,
        horizontal,
        escape_xml(&image.to_data_uri()),
        escape_xml(&cover.author)
    )
}

/// A validated hex color, or the fallback
fn css_color<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if parse_hex_color(value).is_some() {
        value.trim()
    } else {
        fallback
    }
}

/// Strip characters that could close a CSS string or the style element
fn css_string(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '\\' | '<' | '>' | '{' | '}' | ';'))
        .collect()
}

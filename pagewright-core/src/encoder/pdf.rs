//! PDF encoder
//!
//! Built on `pdf-writer` with the fourteen standard Type1 fonts, so no
//! font files are needed. Lines are broken with the same width estimate the
//! paginator uses, which keeps every page's content on the same page.
//!
//! Text must be representable in WinAnsi. Embedded raster images become
//! image XObjects (JPEG passed through, everything else deflated RGB with
//! an alpha mask); images that cannot be decoded, and remote ones, are
//! drawn as framed placeholders carrying their alt text.

use super::write_bytes;
use crate::error::ExportError;
use crate::layout::PageMetrics;
use crate::types::{
    parse_hex_color, Configuration, CoverBlock, DocumentModel, ImageBlob, ImageSource, Page,
    PageKind, PageNumberAlignment, ResolvedNode, TextStyle,
};
use miniz_oxide::deflate::compress_to_vec_zlib;
use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::HashMap;
use std::io::Write;

/// CSS pixel to PDF point
const PX_TO_PT: f32 = 0.75;

/// Header and footer text relative to body text
const MARGIN_TEXT_SCALE: f32 = 0.85;

const AUTHOR_IMAGE_SIZE: f32 = 96.0;

/// Font resource names: regular, bold, italic, bold italic
const FONT_NAMES: [&[u8]; 4] = [b"F1", b"F2", b"F3", b"F4"];

const DEFLATE_LEVEL: u8 = 6;

/// Standard font family a CSS family maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Times,
    Courier,
    Helvetica,
}

impl StandardFont {
    /// Pick the closest standard family for a CSS font family name
    pub fn from_family(family: &str) -> Self {
        let family = family.to_lowercase();
        let any = |names: &[&str]| names.iter().any(|n| family.contains(n));

        if any(&["sans", "arial", "helvetica", "verdana"]) {
            StandardFont::Helvetica
        } else if any(&["mono", "courier", "consolas", "menlo"]) {
            StandardFont::Courier
        } else if any(&["serif", "georgia", "times", "garamond", "palatino", "cambria", "book"]) {
            StandardFont::Times
        } else {
            StandardFont::Helvetica
        }
    }

    /// Base font names in `FONT_NAMES` order
    fn faces(&self) -> [&'static str; 4] {
        match self {
            StandardFont::Times => ["Times-Roman", "Times-Bold", "Times-Italic", "Times-BoldItalic"],
            StandardFont::Courier => [
                "Courier",
                "Courier-Bold",
                "Courier-Oblique",
                "Courier-BoldOblique",
            ],
            StandardFont::Helvetica => [
                "Helvetica",
                "Helvetica-Bold",
                "Helvetica-Oblique",
                "Helvetica-BoldOblique",
            ],
        }
    }
}

/// Sequential object ids
#[derive(Default)]
struct RefAlloc(i32);

impl RefAlloc {
    fn bump(&mut self) -> Ref {
        self.0 += 1;
        Ref::new(self.0)
    }
}

/// An image written once as an XObject
#[derive(Debug, Clone)]
struct PlacedImage {
    name: String,
    id: Ref,
    width: u32,
    height: u32,
}

/// XObjects by image content key. `None` marks an image that could not be
/// decoded and is drawn as a placeholder.
#[derive(Default)]
struct ImageTable {
    by_key: HashMap<String, Option<PlacedImage>>,
}

impl ImageTable {
    /// Write every embedded image the document uses
    fn collect(doc: &DocumentModel, pdf: &mut Pdf, refs: &mut RefAlloc) -> Self {
        let mut table = Self::default();
        let inline = doc.pages().iter().flat_map(|page| &page.nodes).filter_map(|node| match node {
            ResolvedNode::Image {
                source: ImageSource::Embedded(blob),
                ..
            } => Some(blob),
            _ => None,
        });

        for blob in inline.chain(doc.cover().author_image.as_ref()) {
            let key = blob.content_key();
            if table.by_key.contains_key(&key) {
                continue;
            }
            let name = format!("Im{}", table.by_key.len() + 1);
            let placed = embed_image(pdf, refs, blob, name);
            table.by_key.insert(key, placed);
        }
        table
    }

    fn get(&self, blob: &ImageBlob) -> Option<&PlacedImage> {
        self.by_key.get(&blob.content_key()).and_then(Option::as_ref)
    }

    fn placed(&self) -> impl Iterator<Item = &PlacedImage> {
        self.by_key.values().flatten()
    }
}

/// Decode `blob` and write it as an image XObject
fn embed_image(pdf: &mut Pdf, refs: &mut RefAlloc, blob: &ImageBlob, name: String) -> Option<PlacedImage> {
    let decoded = match ::image::load_from_memory(blob.data()) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Drawing placeholder for {} image: {}", blob.mime_type(), e);
            return None;
        }
    };
    let (width, height) = (decoded.width(), decoded.height());
    let id = refs.bump();

    if blob.mime_type() == "image/jpeg" && decoded.color() == ::image::ColorType::Rgb8 {
        let mut xobject = pdf.image_xobject(id, blob.data());
        xobject.filter(Filter::DctDecode);
        xobject.width(width as i32);
        xobject.height(height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
    } else {
        let rgba = decoded.to_rgba8();
        let rgb: Vec<u8> = rgba.pixels().flat_map(|p| [p.0[0], p.0[1], p.0[2]]).collect();
        let samples = compress_to_vec_zlib(&rgb, DEFLATE_LEVEL);

        let mask = if rgba.pixels().any(|p| p.0[3] < u8::MAX) {
            let alpha: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
            let alpha = compress_to_vec_zlib(&alpha, DEFLATE_LEVEL);
            let mask_id = refs.bump();
            let mut mask = pdf.image_xobject(mask_id, &alpha);
            mask.filter(Filter::FlateDecode);
            mask.width(width as i32);
            mask.height(height as i32);
            mask.color_space().device_gray();
            mask.bits_per_component(8);
            Some(mask_id)
        } else {
            None
        };

        let mut xobject = pdf.image_xobject(id, &samples);
        xobject.filter(Filter::FlateDecode);
        xobject.width(width as i32);
        xobject.height(height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        if let Some(mask_id) = mask {
            xobject.s_mask(mask_id);
        }
    }

    Some(PlacedImage {
        name,
        id,
        width,
        height,
    })
}

/// Encoder for PDF
pub struct PdfEncoder;

impl PdfEncoder {
    pub fn new() -> Self {
        Self
    }

    fn document(&self, doc: &DocumentModel) -> Result<Vec<u8>, ExportError> {
        let config = doc.config();
        let font = StandardFont::from_family(&config.font_family);
        let pages = doc.pages();

        let mut pdf = Pdf::new();
        let mut refs = RefAlloc::default();
        let catalog_id = refs.bump();
        let pages_id = refs.bump();
        let info_id = refs.bump();
        let font_ids: Vec<Ref> = FONT_NAMES.iter().map(|_| refs.bump()).collect();
        let images = ImageTable::collect(doc, &mut pdf, &mut refs);
        let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (refs.bump(), refs.bump())).collect();

        pdf.catalog(catalog_id).pages(pages_id);
        pdf.pages(pages_id)
            .kids(page_ids.iter().map(|&(page_id, _)| page_id))
            .count(pages.len() as i32);
        {
            let mut info = pdf.document_info(info_id);
            info.title(TextStr(doc.title()));
            if !doc.cover().author.is_empty() {
                info.author(TextStr(&doc.cover().author));
            }
            info.producer(TextStr("pagewright"));
        }
        for (face, &font_id) in font.faces().iter().zip(&font_ids) {
            pdf.type1_font(font_id)
                .base_font(Name(face.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }

        let media_box = Rect::new(0.0, 0.0, pt(config.page_width), pt(config.page_height));
        for (page, &(page_id, content_id)) in pages.iter().zip(&page_ids) {
            let content = PageCanvas::new(config, &images, page.header.is_some()).draw(page, doc.cover())?;
            pdf.stream(content_id, &content);

            let mut writer = pdf.page(page_id);
            writer.media_box(media_box).parent(pages_id).contents(content_id);
            let mut resources = writer.resources();
            {
                let mut fonts = resources.fonts();
                for (name, &font_id) in FONT_NAMES.iter().zip(&font_ids) {
                    fonts.pair(Name(*name), font_id);
                }
            }
            let mut xobjects = resources.x_objects();
            for image in images.placed() {
                xobjects.pair(Name(image.name.as_bytes()), image.id);
            }
        }

        Ok(pdf.finish())
    }
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Encoder for PdfEncoder {
    fn encode(&self, doc: &DocumentModel, writer: &mut dyn Write) -> Result<(), ExportError> {
        let bytes = self.document(doc)?;
        write_bytes(writer, &bytes)
    }

    fn format_name(&self) -> &str {
        "PDF"
    }

    fn file_extension(&self) -> &str {
        "pdf"
    }

    fn mime_type(&self) -> &str {
        "application/pdf"
    }
}

/// A page's content laid out into drawable blocks
#[derive(Debug, PartialEq)]
enum Block<'a> {
    Line(Vec<(TextStyle, String)>),
    Image(&'a ImageSource, &'a str),
}

/// Break a page's nodes into lines, wrapping where the paginator would
fn layout_blocks<'a>(page: &'a Page, metrics: &PageMetrics) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut line: Vec<(TextStyle, String)> = Vec::new();
    let mut open = false;
    let mut column = 0.0;

    for node in &page.nodes {
        match node {
            ResolvedNode::Text(run) => {
                let glyph = metrics.glyph_width(run.style);
                for ch in run.text.chars() {
                    if ch == '\n' {
                        blocks.push(Block::Line(std::mem::take(&mut line)));
                        open = false;
                        column = 0.0;
                        continue;
                    }
                    if !open {
                        open = true;
                        column = 0.0;
                    } else if column + glyph > metrics.content_width {
                        blocks.push(Block::Line(std::mem::take(&mut line)));
                        column = 0.0;
                    }
                    match line.last_mut() {
                        Some((style, text)) if *style == run.style => text.push(ch),
                        _ => line.push((run.style, ch.to_string())),
                    }
                    column += glyph;
                }
            }
            ResolvedNode::Image { source, alt } => {
                if open {
                    blocks.push(Block::Line(std::mem::take(&mut line)));
                    open = false;
                    column = 0.0;
                }
                blocks.push(Block::Image(source, alt));
            }
            ResolvedNode::PageBreak => {}
        }
    }
    if open {
        blocks.push(Block::Line(line));
    }
    blocks
}

/// Builds one page's content stream. Positions are tracked in CSS pixels
/// from the top-left corner and converted when emitted.
struct PageCanvas<'a> {
    config: &'a Configuration,
    images: &'a ImageTable,
    metrics: PageMetrics,
    content: Content,
}

impl<'a> PageCanvas<'a> {
    fn new(config: &'a Configuration, images: &'a ImageTable, has_header: bool) -> Self {
        Self {
            config,
            images,
            metrics: PageMetrics::new(config, has_header),
            content: Content::new(),
        }
    }

    fn draw(mut self, page: &Page, cover: &CoverBlock) -> Result<Vec<u8>, ExportError> {
        let config = self.config;
        let defaults = Configuration::default();
        let background = parse_hex_color(&config.background_color)
            .or_else(|| parse_hex_color(&defaults.background_color))
            .unwrap_or((255, 255, 255));
        let text_color = parse_hex_color(&config.text_color)
            .or_else(|| parse_hex_color(&defaults.text_color))
            .unwrap_or((0, 0, 0));

        let (r, g, b) = unit_rgb(background);
        self.content.set_fill_rgb(r, g, b);
        self.content
            .rect(0.0, 0.0, pt(config.page_width), pt(config.page_height));
        self.content.fill_nonzero();
        let (r, g, b) = unit_rgb(text_color);
        self.content.set_fill_rgb(r, g, b);

        let band = self.metrics.line_band;
        let padding = config.page_padding;
        let mut y = padding;

        if let Some(header) = &page.header {
            self.margin_text(header, PageNumberAlignment::Center, y + band * 0.7)?;
            y += band;
        }

        for block in layout_blocks(page, &self.metrics) {
            match block {
                Block::Line(fragments) => {
                    self.line(&fragments, padding, y + band * 0.5 + config.font_size * 0.35)?;
                    y += band;
                }
                Block::Image(source, alt) => {
                    let height = self.metrics.image_height();
                    let width = self.metrics.content_width;
                    self.image(source, alt, padding, y, width, height)?;
                    y += height;
                }
            }
        }

        if let (PageKind::Cover, Some(blob)) = (page.kind, &cover.author_image) {
            let position = cover.author_image_position;
            let x = if position.is_left() {
                padding
            } else {
                config.page_width - padding - AUTHOR_IMAGE_SIZE
            };
            let top = if position.is_top() {
                padding
            } else {
                config.page_height - padding - AUTHOR_IMAGE_SIZE
            };
            let source = ImageSource::Embedded(blob.clone());
            self.image(&source, &cover.author, x, top, AUTHOR_IMAGE_SIZE, AUTHOR_IMAGE_SIZE)?;
        }

        if let Some(footer) = &page.footer {
            let baseline = config.page_height - padding - band * 0.3;
            self.margin_text(footer, config.page_number_alignment, baseline)?;
        }

        Ok(self.content.finish())
    }

    fn line(&mut self, fragments: &[(TextStyle, String)], x: f32, baseline: f32) -> Result<(), ExportError> {
        if fragments.is_empty() {
            return Ok(());
        }
        let encoded = fragments
            .iter()
            .map(|(style, text)| Ok((font_slot(*style), winansi(text)?)))
            .collect::<Result<Vec<_>, ExportError>>()?;

        let size = pt(self.config.font_size);
        self.content.begin_text();
        self.content
            .next_line(pt(x), pt(self.config.page_height - baseline));
        for (slot, bytes) in &encoded {
            self.content.set_font(Name(FONT_NAMES[*slot]), size);
            self.content.show(Str(bytes));
        }
        self.content.end_text();
        Ok(())
    }

    fn margin_text(&mut self, text: &str, alignment: PageNumberAlignment, baseline: f32) -> Result<(), ExportError> {
        let bytes = winansi(text)?;
        let size = self.config.font_size * MARGIN_TEXT_SCALE;
        let width = text.chars().count() as f32 * self.metrics.glyph_width(TextStyle::PLAIN) * MARGIN_TEXT_SCALE;
        let padding = self.config.page_padding;
        let x = match alignment {
            PageNumberAlignment::Left => padding,
            PageNumberAlignment::Right => self.config.page_width - padding - width,
            PageNumberAlignment::Center | PageNumberAlignment::None => {
                (self.config.page_width - width) / 2.0
            }
        };

        self.content.begin_text();
        self.content.set_font(Name(FONT_NAMES[0]), pt(size));
        self.content
            .next_line(pt(x.max(0.0)), pt(self.config.page_height - baseline));
        self.content.show(Str(&bytes));
        self.content.end_text();
        Ok(())
    }

    /// Draw an image centered in the box, or a placeholder when it has no
    /// XObject
    fn image(
        &mut self,
        source: &ImageSource,
        alt: &str,
        x: f32,
        top: f32,
        width: f32,
        height: f32,
    ) -> Result<(), ExportError> {
        let placed = match source {
            ImageSource::Embedded(blob) => self.images.get(blob).cloned(),
            ImageSource::Remote(_) => None,
        };
        let Some(placed) = placed else {
            return self.placeholder(x, top, width, height, alt);
        };

        let scale = (width / placed.width.max(1) as f32).min(height / placed.height.max(1) as f32);
        let drawn_width = placed.width as f32 * scale;
        let drawn_height = placed.height as f32 * scale;
        let left = x + (width - drawn_width) / 2.0;
        let bottom = self.config.page_height - top - (height + drawn_height) / 2.0;

        self.content.save_state();
        self.content.transform([
            pt(drawn_width),
            0.0,
            0.0,
            pt(drawn_height),
            pt(left),
            pt(bottom),
        ]);
        self.content.x_object(Name(placed.name.as_bytes()));
        self.content.restore_state();
        Ok(())
    }

    /// Framed box with a caption
    fn placeholder(&mut self, x: f32, top: f32, width: f32, height: f32, caption: &str) -> Result<(), ExportError> {
        let label = format!("[Image: {}]", caption);
        let bytes = winansi(&label)?;

        self.content.save_state();
        self.content.set_stroke_rgb(0.6, 0.6, 0.6);
        self.content.set_line_width(0.75);
        self.content.rect(
            pt(x),
            pt(self.config.page_height - top - height),
            pt(width),
            pt(height),
        );
        self.content.stroke();
        self.content.restore_state();

        let label_width = label.chars().count() as f32 * self.metrics.glyph_width(TextStyle::PLAIN.with_italic());
        let label_x = x + ((width - label_width) / 2.0).max(0.0);
        let baseline = top + height / 2.0 + self.config.font_size * 0.35;
        self.content.begin_text();
        self.content
            .set_font(Name(FONT_NAMES[font_slot(TextStyle::PLAIN.with_italic())]), pt(self.config.font_size));
        self.content
            .next_line(pt(label_x), pt(self.config.page_height - baseline));
        self.content.show(Str(&bytes));
        self.content.end_text();
        Ok(())
    }
}

/// Index into `FONT_NAMES` for a style
fn font_slot(style: TextStyle) -> usize {
    usize::from(style.bold) + 2 * usize::from(style.italic)
}

fn pt(px: f32) -> f32 {
    px * PX_TO_PT
}

fn unit_rgb((r, g, b): (u8, u8, u8)) -> (f32, f32, f32) {
    let c = |v: u8| v as f32 / 255.0;
    (c(r), c(g), c(b))
}

/// Byte for `ch` in the WinAnsi encoding
fn winansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\t' => b' ',
        ' '..='~' => ch as u8,
        '\u{A0}'..='\u{FF}' => ch as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Encode `text` for the standard fonts. Carriage returns are dropped.
fn winansi(text: &str) -> Result<Vec<u8>, ExportError> {
    text.chars()
        .filter(|&ch| ch != '\r')
        .map(|ch| {
            winansi_byte(ch).ok_or_else(|| {
                ExportError::UnsupportedFeature(format!(
                    "character {:?} (U+{:04X}) cannot be encoded with the standard PDF fonts",
                    ch, ch as u32
                ))
            })
        })
        .collect()
}

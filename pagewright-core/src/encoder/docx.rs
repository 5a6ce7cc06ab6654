//! DOCX encoder
//!
//! Writes a minimal WordprocessingML package. Each page becomes a run of
//! paragraphs closed by an explicit page break, so Word keeps the same
//! pagination as the preview.

use super::escape_xml;
use crate::error::ExportError;
use crate::layout::PageMetrics;
use crate::types::{
    parse_hex_color, Configuration, CoverBlock, DocumentModel, ImageBlob, ImageSource, Page,
    PageKind, PageNumberAlignment, ResolvedNode, TextRun,
};
use std::collections::HashMap;
use std::io::{Cursor, Write};

/// CSS pixel to twentieths of a point
const TWIPS_PER_PX: f32 = 15.0;

/// CSS pixel to English Metric Units
const EMU_PER_PX: f32 = 9525.0;

/// Edge length of the author image on the cover, in pixels
const AUTHOR_IMAGE_SIZE: f32 = 96.0;

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Default Extension="jpeg" ContentType="image/jpeg"/>
<Default Extension="gif" ContentType="image/gif"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#;

const PAGE_BREAK_XML: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

/// Encoder for Office Open XML documents
pub struct DocxEncoder;

impl DocxEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Build the package in memory
    fn package(&self, doc: &DocumentModel) -> Result<Vec<u8>, ExportError> {
        let mut builder = DocumentBuilder::new(doc.config());
        let pages = doc.pages();
        for (index, page) in pages.iter().enumerate() {
            builder.page(page, doc.cover());
            if index + 1 < pages.len() {
                builder.body.push_str(PAGE_BREAK_XML);
            }
        }
        let document_xml = builder.document_xml();
        let rels_xml = builder.rels_xml();
        let core_xml = core_xml(doc.cover());

        let zip_err = |e: zip::result::ZipError| {
            ExportError::EncodingFailed(format!("Failed to create zip: {}", e))
        };
        let io_err = |e: std::io::Error| ExportError::EncodingFailed(e.to_string());

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);

        let parts: [(&str, &[u8]); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
            ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
            ("docProps/core.xml", core_xml.as_bytes()),
            ("word/document.xml", document_xml.as_bytes()),
            ("word/_rels/document.xml.rels", rels_xml.as_bytes()),
        ];
        for (name, bytes) in parts {
            zip.start_file(name, options).map_err(zip_err)?;
            zip.write_all(bytes).map_err(io_err)?;
        }
        for media in &builder.media {
            zip.start_file(format!("word/{}", media.target), options)
                .map_err(zip_err)?;
            zip.write_all(media.blob.data()).map_err(io_err)?;
        }

        let cursor = zip.finish().map_err(zip_err)?;
        Ok(cursor.into_inner())
    }
}

impl Default for DocxEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Encoder for DocxEncoder {
    fn encode(&self, doc: &DocumentModel, writer: &mut dyn Write) -> Result<(), ExportError> {
        let bytes = self.package(doc)?;
        super::write_bytes(writer, &bytes)
    }

    fn format_name(&self) -> &str {
        "DOCX"
    }

    fn file_extension(&self) -> &str {
        "docx"
    }

    fn mime_type(&self) -> &str {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    }
}

/// An image stored once under `word/media/`
struct MediaPart<'a> {
    rel_id: String,
    target: String,
    blob: &'a ImageBlob,
}

struct DocumentBuilder<'a> {
    config: &'a Configuration,
    metrics: PageMetrics,
    body: String,
    paragraph: String,
    media: Vec<MediaPart<'a>>,
    media_by_key: HashMap<String, usize>,
    drawings: u32,
}

impl<'a> DocumentBuilder<'a> {
    fn new(config: &'a Configuration) -> Self {
        Self {
            config,
            metrics: PageMetrics::new(config, config.header_text.is_some()),
            body: String::new(),
            paragraph: String::new(),
            media: Vec::new(),
            media_by_key: HashMap::new(),
            drawings: 0,
        }
    }

    fn page(&mut self, page: &'a Page, cover: &'a CoverBlock) {
        if let Some(header) = &page.header {
            self.aligned_paragraph(header, "center");
        }

        let author_image = match page.kind {
            PageKind::Cover => cover.author_image.as_ref(),
            _ => None,
        };
        let position = cover.author_image_position;
        let author_align = if position.is_left() { "left" } else { "right" };

        if let Some(image) = author_image.filter(|_| position.is_top()) {
            self.image_paragraph(image, &cover.author, AUTHOR_IMAGE_SIZE, author_align);
        }

        for node in &page.nodes {
            match node {
                ResolvedNode::Text(run) => self.text(run),
                ResolvedNode::Image { source, alt } => self.image(source, alt),
                ResolvedNode::PageBreak => {}
            }
        }
        if !self.paragraph.is_empty() {
            self.close_paragraph();
        }

        if let Some(image) = author_image.filter(|_| !position.is_top()) {
            self.image_paragraph(image, &cover.author, AUTHOR_IMAGE_SIZE, author_align);
        }

        if let Some(footer) = &page.footer {
            let justify = match self.config.page_number_alignment {
                PageNumberAlignment::Left => "left",
                PageNumberAlignment::Right => "right",
                _ => "center",
            };
            self.aligned_paragraph(footer, justify);
        }
    }

    fn text(&mut self, run: &TextRun) {
        for (index, segment) in run.text.split('\n').enumerate() {
            if index > 0 {
                self.close_paragraph();
            }
            if !segment.is_empty() {
                let props = self.run_properties(run.style.bold, run.style.italic);
                self.paragraph.push_str(&format!(
                    "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
                    props,
                    escape_xml(segment)
                ));
            }
        }
    }

    fn image(&mut self, source: &'a ImageSource, alt: &str) {
        if !self.paragraph.is_empty() {
            self.close_paragraph();
        }
        match source {
            ImageSource::Embedded(blob) if is_embeddable(blob) => {
                let size = self.metrics.image_height().min(self.metrics.content_width);
                self.image_paragraph(blob, alt, size, "center");
            }
            _ => {
                self.text(&TextRun::italic(format!("[Image: {}]", alt)));
                self.close_paragraph();
            }
        }
    }

    fn image_paragraph(&mut self, blob: &'a ImageBlob, alt: &str, size_px: f32, justify: &str) {
        if !is_embeddable(blob) {
            return;
        }
        let rel_id = self.register(blob);
        self.drawings += 1;
        let id = self.drawings;
        let extent = (size_px * EMU_PER_PX).round() as u64;

        let drawing = format!(
            "<w:r><w:drawing><wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
             <wp:extent cx=\"{extent}\" cy=\"{extent}\"/>\
             <wp:docPr id=\"{id}\" name=\"Picture {id}\" descr=\"{alt}\"/>\
             <a:graphic><a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <pic:pic><pic:nvPicPr><pic:cNvPr id=\"{id}\" name=\"Picture {id}\"/><pic:cNvPicPr/></pic:nvPicPr>\
             <pic:blipFill><a:blip r:embed=\"{rel_id}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
             <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{extent}\" cy=\"{extent}\"/></a:xfrm>\
             <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>\
             </a:graphicData></a:graphic></wp:inline></w:drawing></w:r>",
            alt = escape_xml(alt),
        );
        self.body.push_str(&format!(
            "<w:p>{}{}</w:p>",
            self.paragraph_properties(Some(justify)),
            drawing
        ));
    }

    /// Relationship id for `blob`, storing it on first use
    fn register(&mut self, blob: &'a ImageBlob) -> String {
        let key = blob.content_key();
        if let Some(&index) = self.media_by_key.get(&key) {
            return self.media[index].rel_id.clone();
        }
        let rel_id = format!("rIdImg{}", self.media.len() + 1);
        self.media_by_key.insert(key.clone(), self.media.len());
        self.media.push(MediaPart {
            rel_id: rel_id.clone(),
            target: format!("media/{}.{}", key, blob.extension()),
            blob,
        });
        rel_id
    }

    fn aligned_paragraph(&mut self, text: &str, justify: &str) {
        let props = self.run_properties(false, false);
        self.body.push_str(&format!(
            "<w:p>{}<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
            self.paragraph_properties(Some(justify)),
            props,
            escape_xml(text)
        ));
    }

    fn close_paragraph(&mut self) {
        let paragraph = std::mem::take(&mut self.paragraph);
        self.body.push_str(&format!(
            "<w:p>{}{}</w:p>",
            self.paragraph_properties(None),
            paragraph
        ));
    }

    fn paragraph_properties(&self, justify: Option<&str>) -> String {
        let line = (240.0 * self.config.line_height).round() as u32;
        let jc = justify
            .map(|j| format!("<w:jc w:val=\"{}\"/>", j))
            .unwrap_or_default();
        format!(
            "<w:pPr><w:spacing w:before=\"0\" w:after=\"0\" w:line=\"{}\" w:lineRule=\"auto\"/>{}</w:pPr>",
            line, jc
        )
    }

    fn run_properties(&self, bold: bool, italic: bool) -> String {
        let font = escape_xml(&self.config.font_family);
        let half_points = (self.config.font_size * 1.5).round() as u32;
        let (r, g, b) = parse_hex_color(&self.config.text_color).unwrap_or((0x22, 0x22, 0x22));
        format!(
            "<w:rPr><w:rFonts w:ascii=\"{font}\" w:hAnsi=\"{font}\" w:cs=\"{font}\"/>{}{}\
             <w:color w:val=\"{:02X}{:02X}{:02X}\"/><w:sz w:val=\"{half_points}\"/></w:rPr>",
            if bold { "<w:b/>" } else { "" },
            if italic { "<w:i/>" } else { "" },
            r,
            g,
            b,
        )
    }

    fn document_xml(&self) -> String {
        let twips = |px: f32| (px * TWIPS_PER_PX).round() as u32;
        let margin = twips(self.config.page_padding);
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
             xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
             xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
             xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
             <w:body>{}<w:sectPr><w:pgSz w:w=\"{}\" w:h=\"{}\"/>\
             <w:pgMar w:top=\"{m}\" w:right=\"{m}\" w:bottom=\"{m}\" w:left=\"{m}\" \
             w:header=\"0\" w:footer=\"0\" w:gutter=\"0\"/></w:sectPr></w:body></w:document>",
            self.body,
            twips(self.config.page_width),
            twips(self.config.page_height),
            m = margin,
        )
    }

    fn rels_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for media in &self.media {
            xml.push_str(&format!(
                "<Relationship Id=\"{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"{}\"/>",
                media.rel_id, media.target
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Raster formats Word renders without extensions
fn is_embeddable(blob: &ImageBlob) -> bool {
    matches!(blob.mime_type(), "image/png" | "image/jpeg" | "image/gif")
}

fn core_xml(cover: &CoverBlock) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
         <dc:title>{}</dc:title><dc:creator>{}</dc:creator></cp:coreProperties>",
        escape_xml(&cover.title),
        escape_xml(&cover.author)
    )
}

//! Core types: the editable book and the laid-out document

mod book;
mod chapter;
mod config;
mod document;
mod image;
mod node;
mod page;
mod toc;

pub use book::{AuthorImagePosition, Book, BookContent};
pub use chapter::Chapter;
pub use config::{
    parse_hex_color, Configuration, PageNumberAlignment, FONT_SIZE_RANGE, LINE_HEIGHT_RANGE,
    PADDING_RANGE, PAGE_DIMENSION_RANGE,
};
pub use document::{CoverBlock, DocumentModel};
pub use image::ImageBlob;
pub use node::{ImageSource, ResolvedNode, TextRun, TextStyle};
pub use page::{Page, PageKind};
pub use toc::TocEntry;

//! The immutable document snapshot consumed by the preview and exporters

use super::{AuthorImagePosition, Configuration, ImageBlob, Page, TocEntry};
use serde::Serialize;

/// Cover metadata carried alongside the synthesized cover page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CoverBlock {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub publisher: String,
    pub cover_text: String,
    pub cover_image: Option<ImageBlob>,
    pub author_image: Option<ImageBlob>,
    pub author_image_position: AuthorImagePosition,
}

/// A fully resolved, paginated document.
///
/// Built fresh by [`crate::layout::assemble`] for every render and never
/// mutated afterwards; share it behind an `Arc`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentModel {
    cover: CoverBlock,
    toc: Vec<TocEntry>,
    pages: Vec<Page>,
    config: Configuration,
}

impl DocumentModel {
    pub(crate) fn new(
        cover: CoverBlock,
        toc: Vec<TocEntry>,
        pages: Vec<Page>,
        config: Configuration,
    ) -> Self {
        Self {
            cover,
            toc,
            pages,
            config,
        }
    }

    pub fn cover(&self) -> &CoverBlock {
        &self.cover
    }

    pub fn toc(&self) -> &[TocEntry] {
        &self.toc
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Configuration the document was laid out with
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.cover.title
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

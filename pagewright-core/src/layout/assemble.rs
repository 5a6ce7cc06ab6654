//! Document assembly: cover, contents and chapter pages in one model

use super::toc::{contents_page_count, contents_pages, paginate_chapters, toc_from_layouts};
use crate::types::{
    Book, Configuration, CoverBlock, DocumentModel, ImageSource, Page, PageKind, ResolvedNode,
    TextRun,
};

/// Configuration a book is actually laid out with: the book's own settings
/// with the running header resolved against its title.
pub fn effective_config(book: &Book) -> Configuration {
    let mut config = book.config.clone();
    config.header_text = config.running_header(&book.title);
    config
}

/// Build the immutable document for `book`.
///
/// Page 1 is the cover, followed by the contents pages, followed by every
/// chapter starting on a fresh page. The table of contents is derived from
/// the same layout as the pages, so its numbers always match.
pub fn assemble(book: &Book) -> DocumentModel {
    let config = effective_config(book);

    let contents_count = contents_page_count(book.chapters.len(), &config);
    let first_body_page = 2 + contents_count;

    let layouts = paginate_chapters(&book.chapters, &config, first_body_page);
    let toc = toc_from_layouts(&layouts);

    let mut pages = Vec::with_capacity(
        1 + contents_count as usize + layouts.iter().map(|l| l.pages.len()).sum::<usize>(),
    );
    pages.push(cover_page(book));
    pages.extend(contents_pages(&toc, &config, 2));
    pages.extend(layouts.into_iter().flat_map(|layout| layout.pages));

    tracing::debug!(
        book = %book.id(),
        chapters = book.chapters.len(),
        pages = pages.len(),
        "assembled document"
    );

    DocumentModel::new(cover_block(book), toc, pages, config)
}

fn cover_block(book: &Book) -> CoverBlock {
    CoverBlock {
        title: book.title.clone(),
        subtitle: book.subtitle.clone(),
        author: book.author.clone(),
        publisher: book.publisher.clone(),
        cover_text: book.cover_text.clone(),
        cover_image: book.cover_image.clone(),
        author_image: book.author_image.clone(),
        author_image_position: book.author_image_position,
    }
}

/// The cover page carries no header and no page number. The author image
/// is positioned by each renderer from the cover block.
fn cover_page(book: &Book) -> Page {
    let mut nodes = Vec::new();

    if let Some(image) = &book.cover_image {
        nodes.push(ResolvedNode::Image {
            source: ImageSource::Embedded(image.clone()),
            alt: book.title.clone(),
        });
    }
    if !book.title.trim().is_empty() {
        nodes.push(ResolvedNode::Text(TextRun::bold(format!("{}\n", book.title))));
    }
    if !book.subtitle.trim().is_empty() {
        nodes.push(ResolvedNode::Text(TextRun::italic(format!("{}\n", book.subtitle))));
    }
    for line in [&book.author, &book.publisher, &book.cover_text] {
        if !line.trim().is_empty() {
            nodes.push(ResolvedNode::text(format!("\n{}\n", line)));
        }
    }

    Page {
        kind: PageKind::Cover,
        nodes,
        ..Page::new(1)
    }
}

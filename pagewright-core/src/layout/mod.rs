//! Layout: pagination, table of contents and document assembly

mod assemble;
mod pagination;
mod toc;

pub use assemble::{assemble, effective_config};
pub use pagination::{paginate, AVERAGE_GLYPH_WIDTH, BOLD_WIDTH_FACTOR, IMAGE_HEIGHT_RATIO};
pub use toc::{
    build_toc, chapter_nodes, contents_page_count, contents_pages, entries_per_contents_page,
    front_matter_pages, paginate_chapters, toc_from_layouts, ChapterLayout, CONTENTS_HEADING,
};

pub(crate) use pagination::PageMetrics;

//! Table of contents generation
//!
//! Chapters are laid out one after another, each starting on a fresh page.
//! The contents pages sit in front of them, so their count has to be known
//! before the first chapter can be numbered. That count depends only on the
//! number of chapters and the page geometry.

use super::pagination::{footer_for, header_for, paginate, PageMetrics};
use crate::markup::resolve;
use crate::types::{Chapter, Configuration, Page, PageKind, ResolvedNode, TextRun, TextStyle, TocEntry};

/// Heading printed at the top of each contents page
pub const CONTENTS_HEADING: &str = "Contents";

/// Lines taken by the contents heading (the heading and a blank line)
const CONTENTS_HEADING_LINES: usize = 2;

/// One chapter laid out on its own run of pages
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterLayout {
    /// Index of the chapter in the book
    pub index: usize,
    /// Display title
    pub title: String,
    /// Pages, numbered consecutively; never empty
    pub pages: Vec<Page>,
}

impl ChapterLayout {
    pub fn first_page(&self) -> u32 {
        self.pages.first().map(|p| p.number).unwrap_or_default()
    }

    pub fn next_page(&self) -> u32 {
        self.first_page() + self.pages.len() as u32
    }
}

/// Nodes for a chapter: a bold heading followed by its resolved content
pub fn chapter_nodes(index: usize, chapter: &Chapter) -> Vec<ResolvedNode> {
    let mut nodes = vec![ResolvedNode::Text(TextRun::bold(format!(
        "{}\n\n",
        chapter.display_title(index)
    )))];
    nodes.extend(resolve(&chapter.content));
    nodes
}

/// Lay out every chapter, the first one starting at `first_page`
pub fn paginate_chapters(
    chapters: &[Chapter],
    config: &Configuration,
    first_page: u32,
) -> Vec<ChapterLayout> {
    let mut next = first_page;
    chapters
        .iter()
        .enumerate()
        .map(|(index, chapter)| {
            let mut pages = paginate(&chapter_nodes(index, chapter), config, next);
            for page in &mut pages {
                page.chapter = Some(index);
            }
            let layout = ChapterLayout {
                index,
                title: chapter.display_title(index),
                pages,
            };
            next = layout.next_page();
            layout
        })
        .collect()
}

/// Table of contents entries for laid-out chapters
pub fn toc_from_layouts(layouts: &[ChapterLayout]) -> Vec<TocEntry> {
    layouts
        .iter()
        .map(|layout| TocEntry::new(layout.title.clone(), layout.first_page()))
        .collect()
}

/// How many entries fit on one contents page
pub fn entries_per_contents_page(config: &Configuration) -> usize {
    let metrics = PageMetrics::new(config, header_for(config).is_some());
    metrics
        .lines_per_page()
        .saturating_sub(CONTENTS_HEADING_LINES)
        .max(1)
}

/// Number of contents pages needed for `entries` chapters (at least one)
pub fn contents_page_count(entries: usize, config: &Configuration) -> u32 {
    let per_page = entries_per_contents_page(config);
    entries.div_ceil(per_page).max(1) as u32
}

/// Pages in front of the first chapter: the cover and the contents pages
pub fn front_matter_pages(chapter_count: usize, config: &Configuration) -> u32 {
    1 + contents_page_count(chapter_count, config)
}

/// Compute the table of contents for `chapters`.
///
/// Page numbers account for the cover and the contents pages themselves,
/// so they match the pages [`super::assemble`] produces when given the
/// same configuration.
pub fn build_toc(chapters: &[Chapter], config: &Configuration) -> Vec<TocEntry> {
    let first_page = front_matter_pages(chapters.len(), config) + 1;
    toc_from_layouts(&paginate_chapters(chapters, config, first_page))
}

/// Render `toc` as contents pages numbered from `start_page`
pub fn contents_pages(toc: &[TocEntry], config: &Configuration, start_page: u32) -> Vec<Page> {
    let header = header_for(config);
    let metrics = PageMetrics::new(config, header.is_some());
    let width = metrics.chars_per_line(TextStyle::PLAIN);
    let per_page = entries_per_contents_page(config);

    let chunks: Vec<&[TocEntry]> = if toc.is_empty() {
        vec![toc]
    } else {
        toc.chunks(per_page).collect()
    };

    chunks
        .into_iter()
        .enumerate()
        .map(|(index, entries)| {
            let number = start_page + index as u32;
            let mut nodes = vec![ResolvedNode::Text(TextRun::bold(format!(
                "{}\n\n",
                CONTENTS_HEADING
            )))];
            nodes.extend(
                entries
                    .iter()
                    .map(|entry| ResolvedNode::text(format!("{}\n", entry_line(entry, width)))),
            );
            Page {
                kind: PageKind::Contents,
                nodes,
                header: header.clone(),
                footer: footer_for(config, number),
                ..Page::new(number)
            }
        })
        .collect()
}

/// `Title ... 12`, shortening the title so the line never wraps
fn entry_line(entry: &TocEntry, width: usize) -> String {
    let suffix = format!(" ... {}", entry.page);
    let room = width.saturating_sub(suffix.chars().count());
    let title_len = entry.title.chars().count();

    let title = if title_len <= room {
        entry.title.clone()
    } else {
        let keep = room.saturating_sub(3);
        let mut short: String = entry.title.chars().take(keep).collect();
        short.push_str("...");
        short
    };
    format!("{}{}", title, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapters(n: usize) -> Vec<Chapter> {
        (0..n)
            .map(|i| Chapter::new(format!("Part {}", i + 1)).with_content("Some text."))
            .collect()
    }

    #[test]
    fn test_build_toc_numbers_after_front_matter() {
        let config = Configuration::default();
        let long = "A line of prose.\n".repeat(200);
        let chapters = vec![
            Chapter::new("One").with_content(long),
            Chapter::new("Two").with_content("short"),
        ];

        let toc = build_toc(&chapters, &config);
        assert_eq!(toc.len(), 2);
        // cover, one contents page, then chapter one
        assert_eq!(toc[0], TocEntry::new("One", 3));
        assert!(toc[1].page > 4);
    }

    #[test]
    fn test_empty_chapter_still_claims_a_page() {
        let config = Configuration::default();
        let chapters = vec![Chapter::new("Empty"), Chapter::new("Next")];
        let toc = build_toc(&chapters, &config);
        assert_eq!(toc[1].page, toc[0].page + 1);
    }

    #[test]
    fn test_blank_titles_fall_back() {
        let toc = build_toc(&[Chapter::new("")], &Configuration::default());
        assert_eq!(toc[0].title, "Chapter 1");
    }

    #[test]
    fn test_contents_page_count_grows_with_entries() {
        let config = Configuration::default();
        let per_page = entries_per_contents_page(&config);
        assert_eq!(contents_page_count(0, &config), 1);
        assert_eq!(contents_page_count(per_page, &config), 1);
        assert_eq!(contents_page_count(per_page + 1, &config), 2);

        let toc = build_toc(&chapters(per_page + 1), &config);
        // cover + two contents pages
        assert_eq!(toc[0].page, 4);
    }

    #[test]
    fn test_contents_pages_list_every_entry() {
        let config = Configuration::default();
        let toc = vec![TocEntry::new("Alpha", 3), TocEntry::new("Beta", 5)];
        let pages = contents_pages(&toc, &config, 2);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].kind, PageKind::Contents);
        assert_eq!(pages[0].number, 2);
        let text = pages[0].plain_text();
        assert!(text.starts_with("Contents"));
        assert!(text.contains("Alpha ... 3"));
        assert!(text.contains("Beta ... 5"));
    }

    #[test]
    fn test_long_entry_titles_are_shortened() {
        let entry = TocEntry::new("x".repeat(500), 12);
        let line = entry_line(&entry, 40);
        assert_eq!(line.chars().count(), 40);
        assert!(line.ends_with("... ... 12"));
    }
}

//! Preview command implementation

use super::{load_configuration, read_book};
use anyhow::Result;
use pagewright_core::{assemble, DocumentModel, PageKind};
use std::path::Path;

/// Characters of page text shown per page in the summary
const SNIPPET_LEN: usize = 60;

/// Print the paginated layout of a book
pub fn preview(input: &Path, json: bool, settings: Option<&Path>) -> Result<()> {
    let config = load_configuration(settings)?;
    let book = read_book(input)?.with_config(config);
    let doc = assemble(&book);

    tracing::info!(
        "Assembled '{}' into {} pages",
        doc.title(),
        doc.page_count()
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_summary(&doc);
    }

    Ok(())
}

fn print_summary(doc: &DocumentModel) {
    let cover = doc.cover();
    println!("Title:       {}", cover.title);
    if !cover.subtitle.is_empty() {
        println!("Subtitle:    {}", cover.subtitle);
    }
    if !cover.author.is_empty() {
        println!("Author:      {}", cover.author);
    }
    if !cover.publisher.is_empty() {
        println!("Publisher:   {}", cover.publisher);
    }
    println!("Pages:       {}", doc.page_count());

    println!("\nContents:");
    if doc.toc().is_empty() {
        println!("  (no chapters)");
    }
    for entry in doc.toc() {
        println!("  {:<50} {:>4}", entry.title, entry.page);
    }

    println!("\nPages:");
    for page in doc.pages() {
        let kind = match page.kind {
            PageKind::Cover => "cover",
            PageKind::Contents => "contents",
            PageKind::Body => "body",
        };
        let text = page.plain_text().replace('\n', " ");
        let mut snippet: String = text.trim().chars().take(SNIPPET_LEN).collect();
        if text.trim().chars().count() > SNIPPET_LEN {
            snippet.push_str("...");
        }
        println!("  {:>4}  {:<8}  {}", page.number, kind, snippet);
    }
}

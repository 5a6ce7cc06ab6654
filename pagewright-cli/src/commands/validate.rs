//! Validate command implementation

use super::read_book;
use anyhow::{bail, Result};
use pagewright_core::markup::DirectiveKind;
use pagewright_core::resolve_with_diagnostics;
use std::path::Path;

/// Validate a book file: it must load, and in strict mode its chapters
/// must contain no malformed directives
pub fn validate(input: &Path, strict: bool) -> Result<()> {
    let book = match read_book(input) {
        Ok(book) => book,
        Err(e) => {
            eprintln!("Invalid book file: {:#}", e);
            bail!("Validation failed for {}", input.display());
        }
    };

    println!("Valid book file");
    println!("  Title: {}", book.title);
    println!("  Chapters: {}", book.chapters.len());

    let mut malformed = 0;
    for (index, chapter) in book.chapters.iter().enumerate() {
        let resolution = resolve_with_diagnostics(&chapter.content);
        for directive in &resolution.malformed {
            malformed += 1;
            println!(
                "  warning: chapter {} ({}), line {}, column {}: malformed {} directive",
                index + 1,
                chapter.display_title(index),
                directive.line,
                directive.column,
                directive_name(directive.kind)
            );
        }
    }

    if malformed > 0 {
        println!("  {} malformed directive(s) kept as literal text", malformed);
        if strict {
            bail!("Validation failed for {}: {} malformed directives", input.display(), malformed);
        }
    }

    Ok(())
}

fn directive_name(kind: DirectiveKind) -> &'static str {
    match kind {
        DirectiveKind::Bold => "bold",
        DirectiveKind::Italic => "italic",
        DirectiveKind::Image => "image",
    }
}

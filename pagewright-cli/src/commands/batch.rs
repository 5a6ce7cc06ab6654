//! Batch export command implementation

use super::{load_configuration, read_book};
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pagewright_core::bookfile;
use pagewright_core::{assemble, Configuration, ExportFormat};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Export every book file in a directory
pub fn batch(
    input_dir: &Path,
    output_dir: &Path,
    format: &str,
    jobs: usize,
    settings: Option<&Path>,
) -> Result<()> {
    let format: ExportFormat = format
        .parse()
        .with_context(|| format!("No encoder available for {} format", format))?;
    let config = load_configuration(settings)?;

    let books = find_books(input_dir)?;
    if books.is_empty() {
        println!("No book files found in {}", input_dir.display());
        return Ok(());
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    println!("Found {} books to export", books.len());

    let progress = ProgressBar::new(books.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")?
            .progress_chars("##-"),
    );

    // Only the first call in a process can size the global pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build_global()
        .ok();

    let results: Vec<(&PathBuf, Result<PathBuf>)> = books
        .par_iter()
        .map(|book| {
            let result = export_one(book, output_dir, format, &config);
            if let Some(name) = book.file_name() {
                progress.set_message(name.to_string_lossy().into_owned());
            }
            progress.inc(1);
            (book, result)
        })
        .collect();
    progress.finish_and_clear();

    let mut exported = 0;
    let mut failures = Vec::new();
    for (book, result) in results {
        match result {
            Ok(output) => {
                exported += 1;
                tracing::info!("Exported {} -> {}", book.display(), output.display());
            }
            Err(e) => {
                tracing::error!("Failed to export {}: {:#}", book.display(), e);
                failures.push((book, e));
            }
        }
    }

    println!("\nBatch export complete:");
    println!("  Success: {}", exported);
    println!("  Errors:  {}", failures.len());
    for (book, e) in &failures {
        println!("    {}: {:#}", book.display(), e);
    }

    if !failures.is_empty() {
        bail!("Batch export completed with {} errors", failures.len());
    }
    Ok(())
}

/// `.book` files directly inside `dir`, sorted
fn find_books(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut books: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(bookfile::EXTENSION))
        })
        .collect();
    books.sort();
    Ok(books)
}

/// Export one book next to its siblings in `output_dir`, returning the
/// written path
fn export_one(
    input: &Path,
    output_dir: &Path,
    format: ExportFormat,
    config: &Configuration,
) -> Result<PathBuf> {
    let book = read_book(input)?.with_config(config.clone());
    let doc = assemble(&book);
    let bytes = pagewright_core::export(&doc, format)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Could not determine output filename from input")?;
    let output = output_dir.join(format!("{}.{}", stem, format.encoder().file_extension()));
    fs::write(&output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(output)
}

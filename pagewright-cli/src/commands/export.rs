//! Export command implementation

use super::{load_configuration, read_book};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use pagewright_core::{assemble, ExportFormat};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Export a book file to another format
pub fn export(input: &Path, output: &Path, format: &str, settings: Option<&Path>) -> Result<()> {
    let format: ExportFormat = format
        .parse()
        .with_context(|| format!("No encoder available for {} format", format))?;

    // Set up progress bar with animation
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Reading book file...");
    let config = load_configuration(settings)?;
    let book = read_book(input)?.with_config(config);

    pb.set_message("Paginating...");
    let doc = assemble(&book);

    tracing::info!(
        "Paginated '{}' into {} pages",
        doc.title(),
        doc.page_count()
    );

    // Encode fully before touching the output so a failure leaves no partial file
    pb.set_message(format!("Encoding to {}...", format));
    let bytes = pagewright_core::export(&doc, format)
        .with_context(|| format!("Failed to encode to {}", format))?;

    fs::write(output, bytes)
        .with_context(|| format!("Failed to create output file: {}", output.display()))?;

    pb.finish_with_message(format!(
        "Exported '{}' to {} -> {}",
        doc.title(),
        format.encoder().format_name(),
        output.display()
    ));

    Ok(())
}

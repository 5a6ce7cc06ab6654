//! CLI command implementations

mod batch;
mod config;
mod export;
mod preview;
mod validate;

pub use batch::batch;
pub use config::{config_reset, config_set, config_show};
pub use export::export;
pub use preview::preview;
pub use validate::validate;

use anyhow::{Context, Result};
use pagewright_core::bookfile;
use pagewright_core::settings::JsonFileSettings;
use pagewright_core::{Book, Configuration};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Settings file used when `--settings` is not given
fn default_settings_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "pagewright", "Pagewright")
        .context("Could not determine a configuration directory")?;
    Ok(dirs.config_dir().join("settings.json"))
}

/// Open the settings store at `path`, or at the platform default
pub(crate) fn open_settings(path: Option<&Path>) -> Result<JsonFileSettings> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_settings_path()?,
    };
    JsonFileSettings::open(&path)
        .with_context(|| format!("Failed to open settings file: {}", path.display()))
}

/// Persisted configuration, defaults where nothing is stored
pub(crate) fn load_configuration(settings: Option<&Path>) -> Result<Configuration> {
    let store = open_settings(settings)?;
    Ok(Configuration::load(&store))
}

/// Read a saved book file
pub(crate) fn read_book(path: &Path) -> Result<Book> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open book file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    bookfile::load_from(&mut reader)
        .with_context(|| format!("Failed to load {}", path.display()))
}

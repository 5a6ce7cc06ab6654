//! Config command implementation

use super::open_settings;
use anyhow::{Context, Result};
use pagewright_core::Configuration;
use std::path::Path;

/// Print every setting with its effective value
pub fn config_show(settings: Option<&Path>) -> Result<()> {
    let store = open_settings(settings)?;
    let config = Configuration::load(&store);

    println!("Settings file: {}", store.path().display());
    for key in Configuration::FIELDS {
        let value = config.get_field(key).unwrap_or_default();
        println!("  {:<24} {}", key, value);
    }

    Ok(())
}

/// Change one setting; the result must still be a valid configuration
pub fn config_set(key: &str, value: &str, settings: Option<&Path>) -> Result<()> {
    let mut store = open_settings(settings)?;
    let mut config = Configuration::load(&store);

    config
        .set_field(key, value)
        .with_context(|| format!("Cannot set {}", key))?;
    config
        .persist(&mut store)
        .with_context(|| format!("Cannot set {} to '{}'", key, value))?;

    tracing::info!("Set {} = {}", key, value);
    println!("{} = {}", key, config.get_field(key).unwrap_or_default());

    Ok(())
}

/// Remove every stored setting
pub fn config_reset(settings: Option<&Path>) -> Result<()> {
    let mut store = open_settings(settings)?;
    Configuration::reset(&mut store).context("Failed to reset settings")?;

    println!("Settings reset to defaults");

    Ok(())
}

//! Validate instance data against a compiled widget

use anyhow::{Context, Result};
use tooldrawer_core::{Config, Node, apply_normalization, validate_widget_data};

use super::{load_compiled, print_json, read_json};

/// Run the validate command; returns whether the data is valid.
pub fn run(config_path: &str, widget: &str, data_path: &str) -> Result<bool> {
    tracing::info!("Validating {} against '{}'", data_path, widget);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let compiled = load_compiled(&config, widget)?;

    let stored: Node = read_json(data_path)?;
    let data = apply_normalization(&stored, compiled.normalization.as_ref());
    let violations = validate_widget_data(&data, &compiled.controls);

    if violations.is_empty() {
        tracing::info!("✓ Data is valid");
    } else {
        tracing::warn!("✗ {} violations", violations.len());
    }

    print_json(&violations)?;
    Ok(violations.is_empty())
}

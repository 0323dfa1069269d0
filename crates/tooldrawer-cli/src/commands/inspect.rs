//! Show compiled controls

use anyhow::{Context, Result};
use tooldrawer_core::{Config, ControlMatcher};

use super::{load_compiled, print_json};

/// Run the inspect command
pub fn run(config_path: &str, widget: &str, path: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let compiled = load_compiled(&config, widget)?;

    let Some(path) = path else {
        tracing::info!("{} controls in '{}'", compiled.controls.len(), widget);
        return print_json(&compiled.controls);
    };

    let control = ControlMatcher::new(&compiled.controls)
        .find(path)
        .with_context(|| format!("No control governs path '{path}' in '{widget}'"))?;
    print_json(control)
}

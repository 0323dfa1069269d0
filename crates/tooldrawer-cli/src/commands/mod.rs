//! CLI command implementations

pub mod apply;
pub mod compile;
pub mod init;
pub mod inspect;
pub mod overlay;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tooldrawer_core::{CompiledWidget, Config, Node};

/// Read and parse a JSON file
pub(crate) fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Read an ops file holding a JSON array
pub(crate) fn read_ops(path: &str) -> Result<Vec<Node>> {
    read_json::<Node>(path)?
        .as_array()
        .map(<[Node]>::to_vec)
        .with_context(|| format!("Ops file {path} must hold a JSON array"))
}

/// Load the compiled output of `widget`
pub(crate) fn load_compiled(config: &Config, widget: &str) -> Result<CompiledWidget> {
    let path = config.compiled_path(widget);
    if !path.exists() {
        anyhow::bail!(
            "Widget '{}' is not compiled (expected {}); run `tooldrawer compile` first",
            widget,
            path.display()
        );
    }
    read_json(&path)
}

/// Print pretty JSON to stdout
pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

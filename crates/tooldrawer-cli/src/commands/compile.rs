//! Compile widget definitions

use anyhow::{Context, Result};
use tooldrawer_compiler::{CompileOptions, Compiler};
use tooldrawer_core::{CompiledWidget, Config};

use super::read_json;

/// Run the compile command
pub fn run(
    config_path: &str,
    widget: Option<&str>,
    force: bool,
    asset_base_url: Option<&str>,
) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    let options = CompileOptions {
        asset_base_url: asset_base_url
            .unwrap_or(&config.project.assets.base_url)
            .to_string(),
        ..Default::default()
    };
    let compiler = Compiler::with_stencil_dir(options, config.stencils_dir());

    let names = match widget {
        Some(name) => {
            if !config.widget_spec_path(name).is_file() {
                anyhow::bail!("Widget not found: {}", name);
            }
            vec![name.to_string()]
        }
        None => config.widget_names().context("Failed to list widgets")?,
    };

    if names.is_empty() {
        tracing::warn!("No widgets found in {}", config.widgets_dir().display());
        return Ok(());
    }

    let output_dir = config.output_dir();
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut written = 0;
    for name in &names {
        if compile_widget(&compiler, &config, name, force)? {
            written += 1;
        }
    }

    tracing::info!(
        "Compilation complete: {} widgets, {} written",
        names.len(),
        written
    );
    Ok(())
}

/// Compile one widget; returns whether its output file was (re)written.
fn compile_widget(compiler: &Compiler, config: &Config, name: &str, force: bool) -> Result<bool> {
    let compiled = compiler
        .compile_file(config.widget_spec_path(name))
        .with_context(|| format!("Failed to compile widget '{name}'"))?;
    let hash = compiled.content_hash();
    let output = config.compiled_path(name);

    if !force && output.exists() {
        let previous = read_json::<CompiledWidget>(&output).ok();
        if previous.is_some_and(|p| p.content_hash() == hash) {
            tracing::info!("  = {} (unchanged, hash: {}...)", name, &hash[..8]);
            return Ok(false);
        }
    }

    let json = serde_json::to_string_pretty(&compiled).context("Failed to serialize output")?;
    std::fs::write(&output, json)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::info!(
        "  ✓ {} ({} controls, hash: {}...)",
        name,
        compiled.controls.len(),
        &hash[..8]
    );
    Ok(true)
}

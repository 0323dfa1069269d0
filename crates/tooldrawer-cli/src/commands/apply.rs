//! Apply an op batch to instance data

use anyhow::{Context, Result};
use tooldrawer_core::{CoercionMode, Config, Node, OpsEngine, ValidationPolicy, apply_normalization};

use super::{load_compiled, print_json, read_json, read_ops};

/// Run the apply command; returns whether the batch was accepted.
pub fn run(
    config_path: &str,
    widget: &str,
    data_path: &str,
    ops_path: &str,
    permissive: bool,
    defer_validation: bool,
) -> Result<bool> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let compiled = load_compiled(&config, widget)?;

    let stored: Node = read_json(data_path)?;
    let data = apply_normalization(&stored, compiled.normalization.as_ref());
    let ops = read_ops(ops_path)?;

    let mode = if permissive {
        CoercionMode::Permissive
    } else {
        CoercionMode::Strict
    };
    let policy = if defer_validation {
        ValidationPolicy::EndOfBatch
    } else {
        ValidationPolicy::EachOp
    };

    let result = OpsEngine::new(&compiled.controls)
        .with_mode(mode)
        .with_validation(policy)
        .apply(&data, &ops);

    if result.is_ok() {
        tracing::info!("✓ Applied {} ops to '{}'", ops.len(), widget);
    } else {
        for error in result.errors() {
            tracing::warn!(
                "✗ op {}{}: {}",
                error.op_index,
                error.path.as_deref().map(|p| format!(" at {p}")).unwrap_or_default(),
                error.message
            );
        }
    }

    print_json(&result)?;
    Ok(result.is_ok())
}

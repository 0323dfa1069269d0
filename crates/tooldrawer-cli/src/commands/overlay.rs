//! Apply localization overlay ops

use anyhow::Result;
use tooldrawer_core::{AllowlistEntry, Node, apply_overlay_ops};

use super::{print_json, read_json, read_ops};

/// Run the overlay command; returns whether the overlay was accepted.
pub fn run(data_path: &str, ops_path: &str, allowlist_path: &str) -> Result<bool> {
    let base: Node = read_json(data_path)?;
    let ops = read_ops(ops_path)?;
    let allowlist: Vec<AllowlistEntry> = read_json(allowlist_path)?;

    tracing::debug!(
        ops = ops.len(),
        allowlist = allowlist.len(),
        "applying overlay"
    );
    let result = apply_overlay_ops(&base, &ops, &allowlist);
    if let Some(error) = result.errors().first() {
        tracing::warn!("✗ overlay rejected at op {}: {}", error.op_index, error.message);
    }

    print_json(&result)?;
    Ok(result.is_ok())
}

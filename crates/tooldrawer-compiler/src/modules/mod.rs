//! Generated panel sections
//!
//! Widgets that declare typography roles or stage/pod defaults get the
//! shared editor sections instead of hand-written ones. Generation works
//! on the authored markup lines, before panels are parsed.

pub mod stage_pod;
pub mod typography;

use serde_json::Value;
use tooldrawer_core::Node;
use tooldrawer_core::paths::get_at;

pub use stage_pod::split_mixed_stage_pod_clusters;
pub use typography::typography_panel;

/// Closing panel tag
pub const PANEL_CLOSE: &str = "</bob-panel>";

/// Opening tag of the panel with `id`, as generated sections write it
pub fn panel_open(id: &str) -> String {
    format!("<bob-panel id='{id}'>")
}

/// JSON for a single-quoted `options` attribute
pub(crate) fn encode_options(options: &Value) -> String {
    options.to_string().replace('"', "&quot;")
}

fn is_present(node: Option<&Node>) -> bool {
    node.is_some_and(|n| !n.is_null())
}

/// Swap authored typography and stage/pod sections for generated ones.
///
/// With `defaults.typography.roles` present, an authored `typography`
/// panel is dropped and the generated one goes before the `layout` panel.
/// With `defaults.stage` or `defaults.pod` present, authored stage/pod
/// layout lines are dropped and the shared clusters close the `layout`
/// panel, which is created when missing. Mixed stage/pod clusters in the
/// layout panel are split last.
pub fn apply_generated_panels(lines: &[String], defaults: &Node) -> Vec<String> {
    let roles = get_at(defaults, "typography.roles").filter(|r| !r.is_null());
    let stage_pod = is_present(defaults.get("stage")) || is_present(defaults.get("pod"));

    let typography_open = panel_open("typography");
    let mut filtered = Vec::with_capacity(lines.len());
    let mut skipping = false;
    for line in lines {
        if skipping {
            skipping = !line.contains(PANEL_CLOSE);
            continue;
        }
        if roles.is_some() && line.contains(&typography_open) {
            skipping = !line.contains(PANEL_CLOSE);
            continue;
        }
        if stage_pod && stage_pod::is_authored_layout_line(line) {
            continue;
        }
        filtered.push(line.clone());
    }

    let layout_open = panel_open("layout");
    if stage_pod {
        let fields = stage_pod::layout_fields();
        match filtered.iter().position(|line| line.contains(&layout_open)) {
            Some(start) => {
                let end = filtered
                    .iter()
                    .skip(start + 1)
                    .position(|line| line.contains(PANEL_CLOSE))
                    .map(|offset| start + 1 + offset);
                match end {
                    Some(end) => {
                        filtered.splice(end..end, fields);
                    }
                    None => filtered.extend(fields),
                }
            }
            None => {
                filtered.push(layout_open.clone());
                filtered.extend(fields);
                filtered.push(PANEL_CLOSE.to_string());
            }
        }
    }

    if let Some(roles) = roles {
        let generated = typography_panel(roles);
        tracing::debug!(lines = generated.len(), "generated typography panel");
        match filtered.iter().position(|line| line.contains(&layout_open)) {
            Some(at) => {
                filtered.splice(at..at, generated);
            }
            None => filtered.extend(generated),
        }
    }

    split_mixed_stage_pod_clusters(&filtered)
}

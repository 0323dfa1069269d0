//! Generated typography panel
//!
//! One cluster per declared role, each with family, size preset, custom
//! size, style, weight and colour controls bound under
//! `typography.roles.<role>`.

use serde_json::{Value, json};
use tooldrawer_core::Node;
use tooldrawer_core::typography::{FONT_SPECS, all_weight_options, allowed_styles, allowed_weights};

use super::{PANEL_CLOSE, encode_options, panel_open};

/// Known roles and their cluster labels, in panel order
pub const ROLES: [(&str, &str); 8] = [
    ("title", "Title"),
    ("section", "Section"),
    ("question", "Questions"),
    ("answer", "Answers"),
    ("heading", "Heading"),
    ("timer", "Timer"),
    ("label", "Labels"),
    ("button", "CTA"),
];

const SIZE_OPTIONS: [(&str, &str); 6] = [
    ("X-Small", "xs"),
    ("Small", "s"),
    ("Medium", "m"),
    ("Large", "l"),
    ("X-Large", "xl"),
    ("Custom", "custom"),
];

const STYLE_OPTIONS: [(&str, &str); 2] = [("Normal", "normal"), ("Italic", "italic")];

const FIELD: &str = "<tooldrawer-field-typofields group-label=''";

fn pairs(options: &[(&str, &str)]) -> Value {
    Value::Array(
        options
            .iter()
            .map(|(label, value)| json!({"label": label, "value": value}))
            .collect(),
    )
}

fn font_options() -> Value {
    Value::Array(
        FONT_SPECS
            .iter()
            .map(|(family, _)| {
                json!({
                    "label": family,
                    "value": family,
                    "weights": allowed_weights(family).join(","),
                    "styles": allowed_styles(family).join(","),
                })
            })
            .collect(),
    )
}

/// Markup lines of the typography panel for the roles present in `roles`.
/// Empty when none of the known roles is declared.
pub fn typography_panel(roles: &Node) -> Vec<String> {
    let declared: Vec<&(&str, &str)> = ROLES
        .iter()
        .filter(|(key, _)| roles.get(key).is_some())
        .collect();
    if declared.is_empty() {
        return Vec::new();
    }

    let fonts = encode_options(&font_options());
    let sizes = encode_options(&pairs(&SIZE_OPTIONS));
    let styles = encode_options(&pairs(&STYLE_OPTIONS));
    let weights = encode_options(&serde_json::to_value(all_weight_options()).unwrap_or_default());

    let mut lines = vec![
        panel_open("typography"),
        format!(
            "  {FIELD} type='textfield' size='md' path='typography.globalFamily' label='Global font family' show-if=\"false\" />"
        ),
    ];
    for (key, label) in declared {
        let base = format!("typography.roles.{key}");
        lines.push(format!("  <tooldrawer-cluster label='{label}'>"));
        lines.push(format!(
            "    {FIELD} type='dropdown-actions' size='md' path='{base}.family' label='Font family' placeholder='Choose font' options='{fonts}' />"
        ));
        lines.push(format!(
            "    {FIELD} type='dropdown-actions' size='md' path='{base}.sizePreset' label='Size' placeholder='Choose size' options='{sizes}' />"
        ));
        lines.push(format!(
            "    {FIELD} type='valuefield' size='md' path='{base}.sizeCustom' label='Custom size (px)' min='0' max='200' step='1' show-if=\"{base}.sizePreset == 'custom'\" />"
        ));
        lines.push(format!(
            "    {FIELD} type='dropdown-actions' size='md' path='{base}.fontStyle' label='Style' placeholder='Choose style' options='{styles}' />"
        ));
        lines.push(format!(
            "    {FIELD} type='dropdown-actions' size='md' path='{base}.weight' label='Weight' placeholder='Choose weight' options='{weights}' />"
        ));
        lines.push(format!(
            "    {FIELD} type='dropdown-fill' size='md' allow-image='false' path='{base}.color' label='Color' />"
        ));
        lines.push("  </tooldrawer-cluster>".to_string());
    }
    lines.push(PANEL_CLOSE.to_string());
    lines
}

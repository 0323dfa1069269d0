//! Widget definition model
//!
//! A [`WidgetSpec`] is the authored input (markup lines plus default data).
//! Compiling it yields a [`CompiledWidget`]: editor panels and the typed
//! [`CompiledControl`]s that decide which paths of an instance may change
//! and what values they accept.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalization::NormalizationSpec;
use crate::tree::Node;

/// The enforced value type of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    /// `true` / `false`
    Boolean,
    /// Finite number
    Number,
    /// Free text
    String,
    /// One of the control's declared option values
    Enum,
    /// CSS colour (or background, when images are allowed)
    Color,
    /// Any JSON value
    Json,
    /// JSON array
    Array,
    /// JSON object
    Object,
}

impl ControlKind {
    /// Lower-case name as it appears in compiled output
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlKind::Boolean => "boolean",
            ControlKind::Number => "number",
            ControlKind::String => "string",
            ControlKind::Enum => "enum",
            ControlKind::Color => "color",
            ControlKind::Json => "json",
            ControlKind::Array => "array",
            ControlKind::Object => "object",
        }
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `{label, value}` choice declared inline on a control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOption {
    /// Text shown to the editor
    pub label: String,
    /// Stored value
    pub value: String,
}

/// Component type of controls derived from bare paths in markup
pub const GENERIC_FIELD_TYPE: &str = "field";

/// One editable binding between a path pattern and a value kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledControl {
    /// Panel that declares the control
    pub panel_id: String,

    /// Group key from a `tooldrawer-field-<group>` tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Display label for `group_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,

    /// UI component name (`toggle`, `textfield`, …) or `field`
    #[serde(rename = "type")]
    pub control_type: String,

    /// Dot-path pattern; `__name__` segments match any array index
    pub path: String,

    /// Enforced value kind
    pub kind: ControlKind,

    /// Label from markup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Opaque visibility predicate, passed through to the renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<String>,

    /// Inline options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ControlOption>>,

    /// Inclusive lower bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Inclusive upper bound for numbers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Whether a fill control accepts images/gradients as well as colours
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_image: Option<bool>,

    /// Distinct non-empty option values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,

    /// Per-item identity field of an array of objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id_path: Option<String>,
}

impl CompiledControl {
    /// A control with only the required fields set
    pub fn new(
        panel_id: impl Into<String>,
        control_type: impl Into<String>,
        path: impl Into<String>,
        kind: ControlKind,
    ) -> Self {
        Self {
            panel_id: panel_id.into(),
            group_id: None,
            group_label: None,
            control_type: control_type.into(),
            path: path.into(),
            kind,
            label: None,
            show_if: None,
            options: None,
            min: None,
            max: None,
            allow_image: None,
            enum_values: None,
            item_id_path: None,
        }
    }

    /// Ranking shared by compile-time dedup and runtime path matching:
    /// explicit options (100) outrank a typed component (10), which
    /// outranks having a label (1).
    pub fn score(&self) -> u32 {
        score_parts(
            self.options.as_ref().is_some_and(|o| !o.is_empty()),
            &self.control_type,
            self.label.as_deref(),
        )
    }

    /// Values an enum control accepts: `enum_values`, else option values.
    pub fn allowed_values(&self) -> Option<Vec<&str>> {
        if let Some(values) = self.enum_values.as_ref().filter(|v| !v.is_empty()) {
            return Some(values.iter().map(String::as_str).collect());
        }
        let from_options: Vec<&str> = self
            .options
            .iter()
            .flatten()
            .map(|o| o.value.as_str())
            .filter(|v| !v.is_empty())
            .collect();
        (!from_options.is_empty()).then_some(from_options)
    }
}

/// Score from its inputs, for callers that have not built a control yet.
pub fn score_parts(has_options: bool, control_type: &str, label: Option<&str>) -> u32 {
    let mut score = 0;
    if has_options {
        score += 100;
    }
    if control_type != GENERIC_FIELD_TYPE {
        score += 10;
    }
    if label.is_some_and(|l| !l.is_empty()) {
        score += 1;
    }
    score
}

/// One editor panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPanel {
    /// Panel id from `<bob-panel id='…'>`
    pub id: String,
    /// Display label
    pub label: String,
    /// Rendered markup
    pub html: String,
}

/// Component stylesheets and scripts needed by the editor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieterAssets {
    /// Stylesheet URLs, design tokens first
    pub styles: Vec<String>,
    /// Script URLs
    pub scripts: Vec<String>,
}

/// Asset manifest of a compiled widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetAssets {
    /// Widget markup URL
    pub html_url: String,
    /// Widget stylesheet URL
    pub css_url: String,
    /// Widget client script URL
    pub js_url: String,
    /// Component assets
    pub dieter: DieterAssets,
}

/// Authored widget definition, after required-field checks
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    /// Machine name
    pub widgetname: String,
    /// Human name; falls back to `widgetname`
    pub display_name: String,
    /// Default instance data (always an object)
    pub defaults: Node,
    /// Markup lines
    pub html: Vec<String>,
    /// Opaque presets, passed through
    pub presets: Option<Node>,
    /// Raw normalization rules, validated at compile time
    pub normalization: Option<Node>,
}

/// The compiled schema of one widget definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledWidget {
    /// Machine name
    pub widgetname: String,
    /// Human name
    pub display_name: String,
    /// Default instance data
    pub defaults: Node,
    /// Editor panels, in markup order
    pub panels: Vec<CompiledPanel>,
    /// Typed controls
    pub controls: Vec<CompiledControl>,
    /// Opaque presets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets: Option<Node>,
    /// Validated normalization rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationSpec>,
    /// Asset manifest
    pub assets: WidgetAssets,
}

impl CompiledWidget {
    /// SHA-256 (hex) of the canonical JSON form of this widget
    pub fn content_hash(&self) -> String {
        let canonical = serde_json::to_value(self)
            .map(|value| Node::from(value).to_canonical_json())
            .unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Look up a panel by id
    pub fn panel(&self, id: &str) -> Option<&CompiledPanel> {
        self.panels.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn control(path: &str, control_type: &str, kind: ControlKind) -> CompiledControl {
        CompiledControl::new("content", control_type, path, kind)
    }

    #[test]
    fn test_score_weights() {
        let mut c = control("a", GENERIC_FIELD_TYPE, ControlKind::String);
        assert_eq!(c.score(), 0);
        c.label = Some("A".into());
        assert_eq!(c.score(), 1);
        c.control_type = "textfield".into();
        assert_eq!(c.score(), 11);
        c.options = Some(vec![ControlOption {
            label: "X".into(),
            value: "x".into(),
        }]);
        assert_eq!(c.score(), 111);
    }

    #[test]
    fn test_empty_label_does_not_score() {
        let mut c = control("a", GENERIC_FIELD_TYPE, ControlKind::String);
        c.label = Some(String::new());
        assert_eq!(c.score(), 0);
    }

    #[test]
    fn test_allowed_values_prefers_enum_values() {
        let mut c = control("theme", "dropdown-actions", ControlKind::Enum);
        c.options = Some(vec![
            ControlOption {
                label: "Light".into(),
                value: "light".into(),
            },
            ControlOption {
                label: "None".into(),
                value: String::new(),
            },
        ]);
        assert_eq!(c.allowed_values(), Some(vec!["light"]));
        c.enum_values = Some(vec!["dark".into()]);
        assert_eq!(c.allowed_values(), Some(vec!["dark"]));
    }

    #[test]
    fn test_control_serializes_camel_case() {
        let mut c = control("faqs", "repeater", ControlKind::Array);
        c.item_id_path = Some("id".into());
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(
            value,
            json!({
                "panelId": "content",
                "type": "repeater",
                "path": "faqs",
                "kind": "array",
                "itemIdPath": "id"
            })
        );
    }

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        let widget = CompiledWidget {
            widgetname: "faq".into(),
            display_name: "FAQ".into(),
            defaults: Node::from(json!({"title": "Hi"})),
            panels: vec![],
            controls: vec![control("title", "textfield", ControlKind::String)],
            presets: None,
            normalization: None,
            assets: WidgetAssets::default(),
        };
        let hash = widget.content_hash();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, widget.clone().content_hash());

        let mut changed = widget.clone();
        changed.display_name = "Questions".into();
        assert_ne!(hash, changed.content_hash());
    }
}

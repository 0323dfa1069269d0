//! Intermediate representation of widget markup
//!
//! The parser turns the authored widget JSON and its markup into these
//! types; inference and rendering consume them.

use std::collections::BTreeMap;

use serde::Deserialize;
use tooldrawer_core::Node;
use tooldrawer_core::widget::{ControlOption, score_parts};

/// Widget definition as it appears on disk, before shape checks
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWidget {
    /// Machine name
    pub widgetname: Option<Node>,
    /// Human name
    pub display_name: Option<Node>,
    /// Default instance data
    pub defaults: Option<Node>,
    /// Markup lines
    pub html: Option<Node>,
    /// Opaque presets
    pub presets: Option<Node>,
    /// Normalization rules
    pub normalization: Option<Node>,
}

/// Attributes of one markup tag. Later duplicates win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<String, String>);

impl Attributes {
    /// Raw value, empty strings included
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Non-empty value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.raw(name).filter(|v| !v.is_empty())
    }

    /// First non-empty value among several spellings (`reorderMode`,
    /// `reorder-mode`)
    pub fn first(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }

    /// Whether no attributes were parsed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }
}

/// A `<tooldrawer-field…>` tag located in markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTag<'a> {
    /// Byte offset of `<`
    pub start: usize,
    /// Byte offset just past the tag (or its closing tag)
    pub end: usize,
    /// `<groupKey>` of `tooldrawer-field-<groupKey>`
    pub group: Option<&'a str>,
    /// Raw attribute text between the tag name and `>`/`/>`
    pub attrs_raw: &'a str,
    /// Content between the opening and closing tag
    pub inner: Option<&'a str>,
}

/// One `<bob-panel>` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSource {
    /// Panel id
    pub id: String,
    /// Unrendered markup
    pub markup: String,
}

/// Component names a widget uses, in first-seen order
///
/// `required` holds field types, `optional` holds `diet-<name>` class
/// hints that may not correspond to a shipped component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentUsages {
    /// Field component types
    pub required: Vec<String>,
    /// Class-derived hints
    pub optional: Vec<String>,
}

impl ComponentUsages {
    /// Record a field component type
    pub fn require(&mut self, component: &str) {
        if !self.required.iter().any(|c| c == component) {
            self.required.push(component.to_string());
        }
    }

    /// Record a class hint
    pub fn hint(&mut self, component: &str) {
        if !self.optional.iter().any(|c| c == component) {
            self.optional.push(component.to_string());
        }
    }

    /// Every component, required first, without duplicates
    pub fn all(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.required.iter().map(String::as_str).collect();
        for hint in &self.optional {
            if !out.contains(&hint.as_str()) {
                out.push(hint.as_str());
            }
        }
        out
    }
}

/// A control as declared in markup, before kind inference
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDecl {
    /// Declaring panel
    pub panel_id: String,
    /// Field tag group key
    pub group_id: Option<String>,
    /// Component type, or `field`
    pub control_type: String,
    /// Path pattern
    pub path: String,
    /// Label attribute
    pub label: Option<String>,
    /// Opaque `show-if` predicate
    pub show_if: Option<String>,
    /// Parsed inline options
    pub options: Option<Vec<ControlOption>>,
    /// Lower bound
    pub min: Option<f64>,
    /// Upper bound
    pub max: Option<f64>,
    /// Effective image allowance of a fill control
    pub allow_image: Option<bool>,
    /// `allow-image` as written, if it parsed
    pub allow_image_override: Option<bool>,
}

impl ControlDecl {
    /// A generic `field` control derived from a bare path
    pub fn generic(panel_id: &str, path: &str) -> Self {
        Self {
            panel_id: panel_id.to_string(),
            group_id: None,
            control_type: tooldrawer_core::widget::GENERIC_FIELD_TYPE.to_string(),
            path: path.to_string(),
            label: None,
            show_if: None,
            options: None,
            min: None,
            max: None,
            allow_image: None,
            allow_image_override: None,
        }
    }

    /// Dedup score, shared with the runtime matcher
    pub fn score(&self) -> u32 {
        score_parts(
            self.options.as_ref().is_some_and(|o| !o.is_empty()),
            &self.control_type,
            self.label.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_skips_empty_values() {
        let mut attrs = Attributes::default();
        attrs.insert("reorder-mode".into(), "".into());
        attrs.insert("reorderMode".into(), "drawer".into());
        assert_eq!(attrs.raw("reorder-mode"), Some(""));
        assert_eq!(attrs.get("reorder-mode"), None);
        assert_eq!(attrs.first(&["reorder-mode", "reorderMode"]), Some("drawer"));
    }

    #[test]
    fn test_usages_keep_first_seen_order() {
        let mut usages = ComponentUsages::default();
        usages.require("toggle");
        usages.hint("textfield");
        usages.require("textfield");
        usages.require("toggle");
        assert_eq!(usages.all(), vec!["toggle", "textfield"]);
    }

    #[test]
    fn test_decl_score() {
        let mut decl = ControlDecl::generic("content", "title");
        assert_eq!(decl.score(), 0);
        decl.control_type = "textfield".into();
        decl.label = Some("Title".into());
        assert_eq!(decl.score(), 11);
    }
}

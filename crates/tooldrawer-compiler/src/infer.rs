//! Control discovery and kind inference
//!
//! Controls are collected from panel markup, deduplicated per
//! `(panel, path)` by score, and then typed. Inference order:
//!
//! 1. inline options ⇒ `enum`
//! 2. component hard-maps (`toggle`, `slider`, `dropdown-fill`,
//!    `repeater`, `object-manager`)
//! 3. the type of the defaults sampled at the path, wildcards read as `0`
//!
//! A control whose kind stays unknown fails the compile.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tooldrawer_core::paths::{get_at, is_wildcard_segment};
use tooldrawer_core::widget::ControlOption;
use tooldrawer_core::{CompiledControl, ControlKind, Node};

use crate::error::{Error, Result};
use crate::ir::{Attributes, ControlDecl, PanelSource};
use crate::parser::{decode_entities, parse_attributes, scan_field_tags};

static BOB_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)data-bob-path=(?:"([^"]+)"|'([^']+)')"#).expect("valid data-bob-path regex")
});

static WILDCARD_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__[^.]+__").expect("valid wildcard token regex"));

/// Display label of a field tag group key
pub fn group_label(key: &str) -> String {
    match key {
        "wgtappearance" => "Widget appearance".to_string(),
        "wgtlayout" => "Widget layout".to_string(),
        "podstageappearance" => "Stage/Pod appearance".to_string(),
        "podstagelayout" => "Stage/Pod layout".to_string(),
        other => other.replace('-', " "),
    }
}

/// `true/1/yes/on` or `false/0/no/off`, case-insensitive
pub fn parse_bool_attr(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A finite number, or nothing
pub fn parse_number_attr(value: Option<&str>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn parse_fill_modes(value: Option<&str>) -> Option<Vec<String>> {
    let modes: Vec<String> = value?
        .split(',')
        .map(|mode| mode.trim().to_ascii_lowercase())
        .filter(|mode| !mode.is_empty())
        .collect();
    (!modes.is_empty()).then_some(modes)
}

fn option_text(entry: &Node, key: &str) -> String {
    entry.get(key).map(Node::to_display_string).unwrap_or_default()
}

/// Parse an inline `options` attribute into `{label, value}` pairs.
///
/// Entries that are not objects, or have neither label nor value, are
/// dropped; `Ok(None)` means nothing usable was declared.
pub fn parse_options(path: &str, raw: &str) -> Result<Option<Vec<ControlOption>>> {
    let invalid = |message: &str| Error::InvalidOptions {
        path: path.to_string(),
        message: message.to_string(),
    };
    let parsed: Node =
        serde_json::from_str(&decode_entities(raw)).map_err(|_| invalid("options are not valid JSON"))?;
    let entries = parsed
        .as_array()
        .ok_or_else(|| invalid("options must be a JSON array"))?;

    let options: Vec<ControlOption> = entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| ControlOption {
            label: option_text(entry, "label"),
            value: option_text(entry, "value"),
        })
        .filter(|option| !option.label.is_empty() || !option.value.is_empty())
        .collect();
    Ok((!options.is_empty()).then_some(options))
}

/// Whether a fill control accepts images: explicit attribute, else the
/// declared fill modes, else a "background" path or label.
pub fn fill_allows_image(attrs: &Attributes, path: &str, label: &str) -> bool {
    if let Some(explicit) = parse_bool_attr(attrs.first(&["allowImage", "allow-image"])) {
        return explicit;
    }
    if let Some(modes) = parse_fill_modes(attrs.first(&["fillModes", "fill-modes"])) {
        return modes.iter().any(|mode| mode == "image" || mode == "video");
    }
    path.to_lowercase().contains("background") || label.to_lowercase().contains("background")
}

fn looks_like_path(candidate: &str) -> bool {
    candidate.contains('.') || WILDCARD_TOKEN.is_match(candidate)
}

/// Collect control declarations from one panel's markup, recursing into
/// field bodies and `template` attributes.
pub fn collect_controls(markup: &str, panel_id: &str, out: &mut Vec<ControlDecl>) -> Result<()> {
    for tag in scan_field_tags(markup) {
        let attrs = parse_attributes(tag.attrs_raw);

        if let (Some(control_type), Some(path)) = (attrs.get("type"), attrs.get("path")) {
            let label = attrs.get("label");
            let allow_image_override = parse_bool_attr(attrs.first(&["allowImage", "allow-image"]));
            let allow_image = (control_type == "dropdown-fill")
                .then(|| fill_allows_image(&attrs, path, label.unwrap_or_default()));
            let options = attrs
                .get("options")
                .map(|raw| parse_options(path, raw))
                .transpose()?
                .flatten();

            out.push(ControlDecl {
                panel_id: panel_id.to_string(),
                group_id: tag.group.map(str::to_string),
                control_type: control_type.to_string(),
                path: path.to_string(),
                label: label.map(str::to_string),
                show_if: attrs.get("show-if").map(str::to_string),
                options,
                min: parse_number_attr(attrs.get("min")),
                max: parse_number_attr(attrs.get("max")),
                allow_image,
                allow_image_override: allow_image_override.filter(|_| control_type == "dropdown-fill"),
            });

            let derived = [
                attrs.get("labelPath"),
                attrs.first(&["reorderLabelPath", "reorder-label-path"]),
            ];
            for candidate in derived.into_iter().flatten().map(str::trim) {
                if !candidate.is_empty() && looks_like_path(candidate) {
                    out.push(ControlDecl::generic(panel_id, candidate));
                }
            }
        }

        if let Some(template) = attrs.get("template") {
            collect_controls(&decode_entities(template), panel_id, out)?;
        }
        if let Some(inner) = tag.inner {
            collect_controls(inner, panel_id, out)?;
        }
    }

    for caps in BOB_PATH.captures_iter(markup) {
        if let Some(path) = caps.get(1).or_else(|| caps.get(2)) {
            out.push(ControlDecl::generic(panel_id, path.as_str()));
        }
    }
    Ok(())
}

/// Keep one declaration per `(panel, path)`: the first with the highest
/// score, at the position the pair was first seen.
pub fn dedupe(decls: Vec<ControlDecl>) -> Vec<ControlDecl> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut kept: Vec<ControlDecl> = Vec::new();
    for decl in decls {
        let key = (decl.panel_id.clone(), decl.path.clone());
        match index.get(&key) {
            Some(&slot) => {
                if decl.score() > kept[slot].score() {
                    kept[slot] = decl;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(decl);
            }
        }
    }
    kept
}

/// Path used to sample defaults: wildcard segments become `0`.
pub fn sample_path(pattern: &str) -> String {
    pattern
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|segment| if is_wildcard_segment(segment) { "0" } else { segment })
        .collect::<Vec<_>>()
        .join(".")
}

fn has_object_items(sample: Option<&Node>) -> bool {
    sample
        .and_then(Node::as_array)
        .is_some_and(|items| items.iter().any(Node::is_object))
}

/// Kind, enum values and item id path of one declaration
pub fn infer_kind(
    decl: &ControlDecl,
    defaults: &Node,
) -> Option<(ControlKind, Option<Vec<String>>, Option<String>)> {
    if let Some(options) = decl.options.as_ref().filter(|o| !o.is_empty()) {
        let mut values: Vec<String> = Vec::new();
        for option in options {
            if !option.value.is_empty() && !values.contains(&option.value) {
                values.push(option.value.clone());
            }
        }
        return Some((ControlKind::Enum, (!values.is_empty()).then_some(values), None));
    }

    match decl.control_type.as_str() {
        "toggle" => return Some((ControlKind::Boolean, None, None)),
        "slider" => return Some((ControlKind::Number, None, None)),
        "dropdown-fill" if decl.allow_image_override == Some(false) => {
            return Some((ControlKind::Color, None, None));
        }
        "dropdown-fill" => return Some((ControlKind::Json, None, None)),
        _ => {}
    }

    let sample = get_at(defaults, &sample_path(&decl.path));
    let object_items = || has_object_items(sample).then(|| "id".to_string());
    match decl.control_type.as_str() {
        "object-manager" => return Some((ControlKind::Array, None, Some("id".to_string()))),
        "repeater" => return Some((ControlKind::Array, None, object_items())),
        _ => {}
    }

    let kind = match sample? {
        Node::Bool(_) => ControlKind::Boolean,
        Node::Number(_) => ControlKind::Number,
        Node::String(_) => ControlKind::String,
        Node::Array(_) => return Some((ControlKind::Array, None, object_items())),
        Node::Object(_) => ControlKind::Object,
        Node::Null => return None,
    };
    Some((kind, None, None))
}

/// Collect, dedupe and type the controls of every panel.
pub fn compile_controls(panels: &[PanelSource], defaults: &Node) -> Result<Vec<CompiledControl>> {
    let mut decls = Vec::new();
    for panel in panels {
        collect_controls(&panel.markup, &panel.id, &mut decls)?;
    }
    let decls = dedupe(decls);
    tracing::debug!(controls = decls.len(), "collected control declarations");

    decls
        .into_iter()
        .map(|decl| {
            let (kind, enum_values, item_id_path) =
                infer_kind(&decl, defaults).ok_or_else(|| Error::UnresolvedKind {
                    path: decl.path.clone(),
                })?;
            let mut control =
                CompiledControl::new(decl.panel_id, decl.control_type, decl.path, kind);
            control.group_label = decl.group_id.as_deref().map(group_label);
            control.group_id = decl.group_id;
            control.label = decl.label;
            control.show_if = decl.show_if;
            control.options = decl.options;
            control.min = decl.min;
            control.max = decl.max;
            control.allow_image = decl.allow_image;
            control.enum_values = enum_values;
            control.item_id_path = item_id_path;
            Ok(control)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn decls(markup: &str) -> Vec<ControlDecl> {
        let mut out = Vec::new();
        collect_controls(markup, "content", &mut out).unwrap();
        out
    }

    #[rstest]
    #[case("wgtappearance", "Widget appearance")]
    #[case("podstagelayout", "Stage/Pod layout")]
    #[case("my-group", "my group")]
    fn test_group_label(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(group_label(key), expected);
    }

    #[rstest]
    #[case(Some(" YES "), Some(true))]
    #[case(Some("off"), Some(false))]
    #[case(Some("maybe"), None)]
    #[case(None, None)]
    fn test_parse_bool_attr(#[case] value: Option<&str>, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool_attr(value), expected);
    }

    #[rstest]
    #[case(Some("12.5"), Some(12.5))]
    #[case(Some(" 0 "), Some(0.0))]
    #[case(Some("inf"), None)]
    #[case(Some("ten"), None)]
    fn test_parse_number_attr(#[case] value: Option<&str>, #[case] expected: Option<f64>) {
        assert_eq!(parse_number_attr(value), expected);
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options(
            "theme",
            "[{&quot;label&quot;:&quot;Light&quot;,&quot;value&quot;:&quot;light&quot;},{&quot;value&quot;:2},3,{}]",
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            options,
            vec![
                ControlOption { label: "Light".into(), value: "light".into() },
                ControlOption { label: "".into(), value: "2".into() },
            ]
        );
        assert_eq!(parse_options("theme", "[]").unwrap(), None);
    }

    #[rstest]
    #[case("[oops", "invalid options for control \"theme\": options are not valid JSON")]
    #[case("{}", "invalid options for control \"theme\": options must be a JSON array")]
    fn test_parse_options_rejects(#[case] raw: &str, #[case] message: &str) {
        assert_eq!(parse_options("theme", raw).unwrap_err().to_string(), message);
    }

    #[test]
    fn test_collects_derived_and_nested_paths() {
        let found = decls(concat!(
            "<tooldrawer-field-wgtlayout type='object-manager' path='faqs' label='FAQs' ",
            "labelPath='faqs.__idx__.question' reorder-label-path='title' ",
            "template='&lt;input data-bob-path=&quot;faqs.__idx__.answer&quot;/&gt;'/>",
            "<span data-bob-path='footer.text'></span>",
        ));
        let paths: Vec<&str> = found.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["faqs", "faqs.__idx__.question", "faqs.__idx__.answer", "footer.text"]
        );
        assert_eq!(found[0].group_id.as_deref(), Some("wgtlayout"));
        assert_eq!(found[1].control_type, "field");
    }

    #[test]
    fn test_tags_without_path_declare_nothing() {
        assert!(decls("<tooldrawer-field type='textfield' label='x'/>").is_empty());
    }

    #[rstest]
    #[case("type='dropdown-fill' path='fill'", Some(false))]
    #[case("type='dropdown-fill' path='stage.background'", Some(true))]
    #[case("type='dropdown-fill' path='fill' fill-modes='color, Image'", Some(true))]
    #[case("type='dropdown-fill' path='background' allow-image='no'", Some(false))]
    #[case("type='textfield' path='background'", None)]
    fn test_allow_image(#[case] attrs: &str, #[case] expected: Option<bool>) {
        let found = decls(&format!("<tooldrawer-field {attrs}/>"));
        assert_eq!(found[0].allow_image, expected);
    }

    #[test]
    fn test_dedupe_keeps_first_position_and_best_score() {
        let found = dedupe(decls(concat!(
            "<span data-bob-path='title'></span>",
            "<tooldrawer-field type='textfield' path='title'/>",
            "<tooldrawer-field type='textfield' path='title' label='Title'/>",
            "<tooldrawer-field type='dropdown' path='title' label='Again'/>",
            "<tooldrawer-field type='toggle' path='show'/>",
        )));
        // data-bob-path controls are collected after the tags of the same markup
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, "title");
        assert_eq!(found[0].label.as_deref(), Some("Title"));
        assert_eq!(found[1].path, "show");
    }

    #[test]
    fn test_sample_path() {
        assert_eq!(sample_path("faqs.__idx__.items.__j__.t"), "faqs.0.items.0.t");
    }

    fn kind_of(control_type: &str, path: &str, defaults: serde_json::Value) -> Option<ControlKind> {
        let mut decl = ControlDecl::generic("content", path);
        decl.control_type = control_type.to_string();
        infer_kind(&decl, &Node::from(defaults)).map(|(kind, _, _)| kind)
    }

    #[rstest]
    #[case("toggle", "missing", ControlKind::Boolean)]
    #[case("slider", "missing", ControlKind::Number)]
    #[case("dropdown-fill", "missing", ControlKind::Json)]
    #[case("field", "flag", ControlKind::Boolean)]
    #[case("field", "count", ControlKind::Number)]
    #[case("field", "faqs.__idx__.question", ControlKind::String)]
    #[case("field", "faqs", ControlKind::Array)]
    #[case("field", "style", ControlKind::Object)]
    fn test_infer_kind(#[case] control_type: &str, #[case] path: &str, #[case] expected: ControlKind) {
        let defaults = json!({
            "flag": false,
            "count": 3,
            "faqs": [{"question": "Q"}],
            "style": {}
        });
        assert_eq!(kind_of(control_type, path, defaults), Some(expected));
    }

    #[test]
    fn test_infer_unknown_kind() {
        assert_eq!(kind_of("textfield", "nothing.here", json!({})), None);
        assert_eq!(kind_of("textfield", "empty", json!({"empty": null})), None);
    }

    #[test]
    fn test_item_id_path() {
        let defaults = Node::from(json!({"faqs": [{"id": "a"}], "tags": ["x"], "empty": []}));
        let infer = |control_type: &str, path: &str| {
            let mut decl = ControlDecl::generic("content", path);
            decl.control_type = control_type.to_string();
            infer_kind(&decl, &defaults).unwrap().2
        };
        assert_eq!(infer("repeater", "faqs"), Some("id".to_string()));
        assert_eq!(infer("repeater", "tags"), None);
        assert_eq!(infer("object-manager", "empty"), Some("id".to_string()));
        assert_eq!(infer("field", "faqs"), Some("id".to_string()));
    }

    #[test]
    fn test_enum_values_are_distinct_and_non_empty() {
        let mut decl = ControlDecl::generic("content", "theme");
        decl.options = Some(vec![
            ControlOption { label: "A".into(), value: "a".into() },
            ControlOption { label: "A again".into(), value: "a".into() },
            ControlOption { label: "None".into(), value: "".into() },
        ]);
        let (kind, values, _) = infer_kind(&decl, &Node::empty_object()).unwrap();
        assert_eq!(kind, ControlKind::Enum);
        assert_eq!(values, Some(vec!["a".to_string()]));
    }

    #[test]
    fn test_compile_controls_reports_unresolved_kind() {
        let panels = vec![PanelSource {
            id: "content".into(),
            markup: "<tooldrawer-field type='textfield' path='title'/>".into(),
        }];
        let err = compile_controls(&panels, &Node::empty_object()).unwrap_err();
        assert_eq!(err.to_string(), "control \"title\" is missing kind metadata");

        let controls = compile_controls(&panels, &Node::from(json!({"title": "x"}))).unwrap();
        assert_eq!(controls[0].kind, ControlKind::String);
        assert_eq!(controls[0].control_type, "textfield");
    }
}

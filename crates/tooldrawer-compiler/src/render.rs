//! Panel markup rendering
//!
//! Authored panel markup is turned into the editor fragment in four
//! passes:
//!
//! 1. `<tooldrawer-cluster>` blocks become cluster wrappers
//! 2. `<tooldrawer-divider/>` becomes a neutral separator
//! 3. `<tooldrawer-eyebrow text='…'/>` becomes overline text
//! 4. every field tag with a `type` is replaced by its component stencil,
//!    rendered against a context built from the component spec and the
//!    tag attributes, then bound to its data path

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tooldrawer_core::Node;
use tooldrawer_core::stencil::interpolate_context;
use tooldrawer_core::tree::NodeMap;

use crate::error::{Error, Result};
use crate::infer::{fill_allows_image, group_label};
use crate::ir::{Attributes, ComponentUsages, FieldTag, PanelSource};
use crate::parser::{
    collect_class_hints, decode_entities, find_from, find_tag_end, parse_attributes,
    replace_field_tags,
};
use crate::stencils::{ComponentStencil, StencilCache};

const CLUSTER_OPEN: &str = "<tooldrawer-cluster";
const CLUSTER_CLOSE: &str = "</tooldrawer-cluster>";

/// Cluster attributes the editor's fixed spacing does not allow
pub const DISALLOWED_CLUSTER_ATTRIBUTES: [&str; 3] = ["gap", "space-after", "spaceAfter"];

/// Group keys rendered without a group wrapper
const UNWRAPPED_GROUPS: [&str; 2] = ["podstagelayout", "podstageappearance"];

static DIVIDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<tooldrawer-divider\s*/>").expect("valid divider regex"));

static EYEBROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<tooldrawer-eyebrow([^>]*)/>").expect("valid eyebrow regex"));

static FIRST_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<input([^>]*?)(/?)>").expect("valid input regex"));

static TEMPLATE_SLOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*template\s*\}\}").expect("valid template slot regex"));

/// Lowercase, with runs of anything but `[a-z0-9-]` collapsed to one dash
pub fn sanitize_id(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.to_lowercase().chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            ch
        } else {
            '-'
        };
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out
}

fn matching_cluster_close(html: &str, lower: &str, from: usize) -> Option<usize> {
    let mut depth = 1;
    let mut cursor = from;
    loop {
        let close = find_from(lower, CLUSTER_CLOSE, cursor)?;
        if let Some(open) = find_from(lower, CLUSTER_OPEN, cursor).filter(|&open| open < close) {
            depth += 1;
            cursor = find_tag_end(html, open + CLUSTER_OPEN.len())? + 1;
            continue;
        }
        depth -= 1;
        if depth == 0 {
            return Some(close);
        }
        cursor = close + CLUSTER_CLOSE.len();
    }
}

/// Replace cluster blocks, nested ones included, with
/// `<div class="tdmenucontent__cluster" data-bob-showif="…">`.
///
/// An unterminated cluster is left as written.
pub fn expand_clusters(html: &str) -> Result<String> {
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    let mut search = 0;

    while let Some(start) = find_from(&lower, CLUSTER_OPEN, search) {
        let after = start + CLUSTER_OPEN.len();
        let boundary = bytes
            .get(after)
            .is_some_and(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/');
        let Some(open_end) = find_tag_end(html, after).filter(|_| boundary) else {
            search = after;
            continue;
        };
        let Some(close) = matching_cluster_close(html, &lower, open_end + 1) else {
            tracing::warn!(offset = start, "unterminated <tooldrawer-cluster> left unexpanded");
            search = open_end + 1;
            continue;
        };

        let attrs = parse_attributes(&html[after..open_end]);
        if let Some(attribute) = DISALLOWED_CLUSTER_ATTRIBUTES
            .iter()
            .find(|name| attrs.get(name).is_some())
        {
            return Err(Error::DisallowedLayout {
                attribute: attribute.to_string(),
            });
        }

        out.push_str(&html[cursor..start]);
        out.push_str("<div class=\"tdmenucontent__cluster\"");
        if let Some(show_if) = attrs.get("show-if") {
            out.push_str(&format!(" data-bob-showif=\"{show_if}\""));
        }
        out.push('>');
        out.push_str(&expand_clusters(&html[open_end + 1..close])?);
        out.push_str("</div>");

        cursor = close + CLUSTER_CLOSE.len();
        search = cursor;
    }
    out.push_str(&html[cursor..]);
    Ok(out)
}

/// Expand dividers and eyebrows
pub fn expand_simple_tags(html: &str) -> String {
    let html = DIVIDER.replace_all(html, r#"<div aria-hidden="true"></div>"#);
    EYEBROW
        .replace_all(&html, |caps: &Captures<'_>| {
            let attrs = parse_attributes(&caps[1]);
            format!(
                r#"<div class="overline" style="padding-inline: var(--control-padding-inline);">{}</div>"#,
                attrs.get("text").unwrap_or_default()
            )
        })
        .into_owned()
}

/// Bind rendered component markup to `path`: stencils marking their input
/// with `data-path` are rewritten, otherwise the first `<input>` gets
/// `data-bob-path`.
pub fn bind_path(rendered: &str, path: &str) -> String {
    let rewritten = rendered.replace("data-path=\"", "data-bob-path=\"");
    if rewritten.contains("data-bob-path=\"") {
        return rewritten;
    }
    FIRST_INPUT
        .replace(&rewritten, |caps: &Captures<'_>| {
            format!("<input{} data-bob-path=\"{path}\"{}>", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Renders panels against a shared stencil cache
#[derive(Debug, Clone, Copy)]
pub struct PanelRenderer<'a> {
    stencils: &'a StencilCache,
}

impl<'a> PanelRenderer<'a> {
    /// Renderer over `stencils`
    pub fn new(stencils: &'a StencilCache) -> Self {
        Self { stencils }
    }

    /// Render one panel, recording every component the output uses.
    pub fn render_panel(&self, panel: &PanelSource, usages: &mut ComponentUsages) -> Result<String> {
        let html = expand_clusters(&panel.markup)?;
        let html = expand_simple_tags(&html);
        let html = replace_field_tags(&html, |tag| self.render_field(tag, usages))?;
        collect_class_hints(&html, usages);
        tracing::debug!(panel = %panel.id, bytes = html.len(), "rendered panel");
        Ok(html)
    }

    fn render_field(&self, tag: &FieldTag<'_>, usages: &mut ComponentUsages) -> Result<Option<String>> {
        let attrs = parse_attributes(tag.attrs_raw);
        let Some(component) = attrs.get("type") else {
            return Ok(None);
        };
        let stencil = self.stencils.get(component)?;
        let context = self.build_context(component, &attrs, &stencil)?;
        let mut rendered = stencil.stencil.render(&context);

        let path = context.get("path").and_then(Node::as_str).unwrap_or_default();
        if !path.is_empty() {
            rendered = bind_path(&rendered, path);
        }
        usages.require(component);

        let mut wrappers = Vec::new();
        if let Some(group) = tag.group.filter(|g| !UNWRAPPED_GROUPS.contains(g)) {
            wrappers.push(format!("data-bob-group=\"{group}\""));
            wrappers.push(format!("data-bob-group-label=\"{}\"", group_label(group)));
        }
        if let Some(show_if) = attrs.get("show-if") {
            wrappers.push(format!("data-bob-showif=\"{show_if}\""));
        }
        if wrappers.is_empty() {
            return Ok(Some(rendered));
        }
        Ok(Some(format!("<div {}>{rendered}</div>", wrappers.join(" "))))
    }

    /// Render the field tags nested in a `template` attribute. Nested
    /// `{{template}}` slots take the nested tag's own decoded template.
    fn render_template_fields(&self, template: &str) -> Result<String> {
        replace_field_tags(template, |tag| {
            let attrs = parse_attributes(tag.attrs_raw);
            let Some(component) = attrs.get("type") else {
                return Ok(None);
            };
            let stencil = self.stencils.get(component)?;
            let context = self.build_context(component, &attrs, &stencil)?;
            let mut rendered = stencil.stencil.render(&context);
            if let Some(nested) = attrs.get("template") {
                let decoded = decode_entities(nested);
                rendered = TEMPLATE_SLOT
                    .replace_all(&rendered, regex::NoExpand(&decoded))
                    .into_owned();
            }
            Ok(Some(rendered))
        })
    }

    /// Stencil context for one field tag.
    ///
    /// Layering: component spec context, then its size context, then the
    /// attribute-derived keys. String values are finally interpolated
    /// against the context itself, except `template` and `optionsRaw`.
    pub fn build_context(
        &self,
        component: &str,
        attrs: &Attributes,
        stencil: &ComponentStencil,
    ) -> Result<Node> {
        let spec_context = stencil.defaults.context.as_ref();
        let size = attrs
            .get("size")
            .or_else(|| spec_context.and_then(|c| c.get("size")).and_then(Node::as_str))
            .filter(|s| !s.is_empty())
            .unwrap_or("md")
            .to_string();

        let mut merged: NodeMap = spec_context
            .and_then(Node::as_object)
            .cloned()
            .unwrap_or_default();
        if let Some(sized) = stencil
            .defaults
            .size_context
            .get(&size)
            .and_then(Node::as_object)
        {
            merged.extend(sized.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        merged.insert("size".into(), Node::from(size.as_str()));

        let inherited = |merged: &NodeMap, key: &str| -> Option<String> {
            merged
                .get(key)
                .and_then(Node::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let pick = |merged: &NodeMap, names: &[&str], key: &str, fallback: &str| -> String {
            attrs
                .first(names)
                .map(str::to_string)
                .or_else(|| inherited(merged, key))
                .unwrap_or_else(|| fallback.to_string())
        };

        let label = pick(&merged, &["label"], "label", "Label");
        let placeholder = pick(&merged, &["placeholder"], "placeholder", "Select a fill");
        let path = attrs.get("path").unwrap_or_default().to_string();
        let value = if path.is_empty() {
            attrs.get("value").unwrap_or_default()
        } else {
            ""
        };
        let header_label = attrs
            .get("headerLabel")
            .or((component == "dropdown-fill").then_some("Color fill"))
            .unwrap_or_default();
        let id_base = if path.is_empty() { label.as_str() } else { path.as_str() };

        let options_raw = attrs.get("options").map(decode_entities);
        let mut options = spec_context.and_then(|c| c.get("options")).cloned();
        if let Some(raw) = &options_raw {
            let parsed: Node = serde_json::from_str(raw).map_err(|_| Error::InvalidOptions {
                path: if path.is_empty() { component.to_string() } else { path.clone() },
                message: "options are not valid JSON".to_string(),
            })?;
            if parsed.is_array() {
                options = Some(parsed);
            }
        }
        let body_class = merged.get("bodyClass").cloned();
        let options = options.map(|options| match options.as_array() {
            Some(items) => Node::array(
                items
                    .iter()
                    .map(|item| match item.as_object() {
                        Some(entry) => {
                            let mut decorated = NodeMap::new();
                            if let Some(body_class) = &body_class {
                                decorated.insert("bodyClass".into(), body_class.clone());
                            }
                            decorated.insert("size".into(), Node::from(size.as_str()));
                            decorated.extend(entry.iter().map(|(k, v)| (k.clone(), v.clone())));
                            Node::Object(decorated.into())
                        }
                        None => item.clone(),
                    })
                    .collect(),
            ),
            None => options,
        });

        let template = match attrs.get("template") {
            Some(raw) => decode_entities(raw),
            None => inherited(&merged, "template").unwrap_or_default(),
        };
        let template = if template.is_empty() {
            template
        } else {
            self.render_template_fields(&template)?
        };

        let derived: Vec<(&str, String)> = vec![
            ("addLabel", pick(&merged, &["addLabel", "add-label"], "addLabel", "Add item")),
            ("labelPath", pick(&merged, &["labelPath"], "labelPath", "")),
            ("labelInputLabel", pick(&merged, &["labelInputLabel"], "labelInputLabel", &label)),
            ("labelPlaceholder", pick(&merged, &["labelPlaceholder"], "labelPlaceholder", "")),
            ("labelSize", pick(&merged, &["labelSize"], "labelSize", &size)),
            ("toggleLabel", pick(&merged, &["toggleLabel"], "toggleLabel", "")),
            ("togglePath", pick(&merged, &["togglePath"], "togglePath", "")),
            (
                "reorderLabel",
                pick(&merged, &["reorderLabel", "reorder-label"], "reorderLabel", "Reorder items"),
            ),
            (
                "reorderTitle",
                pick(&merged, &["reorderTitle", "reorder-title"], "reorderTitle", "Reorder items"),
            ),
            (
                "reorderLabelPath",
                pick(&merged, &["reorderLabelPath", "reorder-label-path"], "reorderLabelPath", ""),
            ),
            (
                "reorderMode",
                pick(&merged, &["reorderMode", "reorder-mode"], "reorderMode", "inline"),
            ),
            (
                "reorderThreshold",
                pick(&merged, &["reorderThreshold", "reorder-threshold"], "reorderThreshold", ""),
            ),
            ("defaultItem", pick(&merged, &["defaultItem", "default-item"], "defaultItem", "")),
        ];
        let popover_label = placeholder.clone();

        let mut set = |key: &str, value: Node| {
            merged.insert(key.to_string(), value);
        };
        for (key, derived_value) in derived {
            set(key, Node::from(derived_value));
        }

        set("id", Node::from(sanitize_id(&format!("{component}-{id_base}"))));
        set(
            "indexToken",
            Node::from(
                attrs
                    .first(&["indexToken", "index-token", "data-index-token"])
                    .unwrap_or("__INDEX__"),
            ),
        );
        set("value", Node::from(value));
        set("path", Node::from(path.as_str()));
        set("headerLabel", Node::from(header_label));
        set("headerIcon", Node::from(attrs.get("headerIcon").unwrap_or_default()));
        set("optionsRaw", Node::from(options_raw.unwrap_or_default()));
        set(
            "objectType",
            Node::from(attrs.first(&["objectType", "object-type"]).unwrap_or_default()),
        );
        set("template", Node::from(template));
        if let Some(options) = options {
            set("options", options);
        }
        if component == "dropdown-fill" {
            set("allowImage", Node::Bool(fill_allows_image(attrs, &path, &label)));
        }
        set("label", Node::from(label));
        set("placeholder", Node::from(placeholder));

        for (key, fallback) in [
            ("labelClass", "label-s"),
            ("bodyClass", "body-s"),
            ("popoverLabel", popover_label.as_str()),
        ] {
            if merged.get(key).is_none_or(Node::is_null) {
                merged.insert(key.to_string(), Node::from(fallback));
            }
        }

        Ok(interpolate_context(
            &Node::Object(merged.into()),
            &["template", "optionsRaw"],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencils::MemoryStencilSource;
    use rstest::rstest;

    fn cache() -> StencilCache {
        StencilCache::new(
            MemoryStencilSource::new()
                .with_stencil(
                    "toggle",
                    r#"<label class="{{labelClass}}">{{label}}<input type="checkbox" id="{{id}}"/></label>"#,
                )
                .with_stencil(
                    "textfield",
                    r#"<input class="diet-textfield" data-path="{{path}}" placeholder="{{placeholder}}"/>"#,
                )
                .with_stencil(
                    "repeater",
                    r#"<div class="diet-repeater" data-path="{{path}}" data-token="{{indexToken}}">{{#each options}}<i>{{label}}/{{size}}</i>{{/each}}<template>{{template}}</template></div>"#,
                )
                .with_spec(
                    "textfield",
                    r#"{"defaults": [{"context": {"size": "lg", "placeholder": "Type {{label}}"}, "sizeContext": {"lg": {"labelClass": "label-l"}}}]}"#,
                ),
        )
    }

    fn panel(markup: &str) -> PanelSource {
        PanelSource {
            id: "content".into(),
            markup: markup.into(),
        }
    }

    fn render(markup: &str) -> Result<String> {
        let stencils = cache();
        let mut usages = ComponentUsages::default();
        PanelRenderer::new(&stencils).render_panel(&panel(markup), &mut usages)
    }

    #[rstest]
    #[case("toggle-showTitle", "toggle-showtitle")]
    #[case("toggle-items.__i__.title", "toggle-items-i-title")]
    #[case("a  b--c", "a-b-c")]
    fn test_sanitize_id(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_id(input), expected);
    }

    #[test]
    fn test_clusters_expand_recursively() {
        let out = expand_clusters(concat!(
            "<tooldrawer-cluster label='Outer' show-if=\"a == true\">",
            "x<tooldrawer-cluster>y</tooldrawer-cluster>",
            "</tooldrawer-cluster>z",
        ))
        .unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<div class="tdmenucontent__cluster" data-bob-showif="a == true">"#,
                r#"x<div class="tdmenucontent__cluster">y</div></div>z"#,
            )
        );
    }

    #[test]
    fn test_unterminated_cluster_is_kept() {
        let markup = "<tooldrawer-cluster>open";
        assert_eq!(expand_clusters(markup).unwrap(), markup);
    }

    #[rstest]
    #[case("gap")]
    #[case("space-after")]
    #[case("spaceAfter")]
    fn test_disallowed_cluster_layout(#[case] attribute: &str) {
        let markup = format!("<tooldrawer-cluster {attribute}='8'></tooldrawer-cluster>");
        let err = expand_clusters(&markup).unwrap_err();
        assert!(matches!(err, Error::DisallowedLayout { attribute: a } if a == attribute));
    }

    #[test]
    fn test_simple_tags() {
        assert_eq!(
            expand_simple_tags("<tooldrawer-divider /><tooldrawer-eyebrow text='Items' />"),
            concat!(
                r#"<div aria-hidden="true"></div>"#,
                r#"<div class="overline" style="padding-inline: var(--control-padding-inline);">Items</div>"#,
            )
        );
    }

    #[rstest]
    #[case(r#"<span data-path="x"></span>"#, r#"<span data-bob-path="x"></span>"#)]
    #[case(r#"<input type="text"/><input/>"#, r#"<input type="text" data-bob-path="title"/><input/>"#)]
    #[case("<div></div>", "<div></div>")]
    fn test_bind_path(#[case] rendered: &str, #[case] expected: &str) {
        assert_eq!(bind_path(rendered, "title"), expected);
    }

    #[test]
    fn test_field_rendering_with_wrappers() {
        let out = render(
            "<tooldrawer-field-wgtlayout type='toggle' path='showTitle' label='Show title' show-if=\"mode == 'a'\" />",
        )
        .unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<div data-bob-group="wgtlayout" data-bob-group-label="Widget layout" data-bob-showif="mode == 'a'">"#,
                r#"<label class="label-s">Show title<input type="checkbox" id="toggle-showtitle" data-bob-path="showTitle"/></label>"#,
                "</div>",
            )
        );
    }

    #[test]
    fn test_stage_pod_groups_are_not_wrapped() {
        let out = render("<tooldrawer-field-podstagelayout type='toggle' path='pod.linked' />").unwrap();
        assert!(out.starts_with("<label"));
    }

    #[test]
    fn test_spec_defaults_and_interpolation() {
        let out = render("<tooldrawer-field type='textfield' path='title' label='Title' />").unwrap();
        assert_eq!(
            out,
            r#"<input class="diet-textfield" data-bob-path="title" placeholder="Type Title"/>"#
        );
    }

    #[test]
    fn test_options_are_decorated_and_templates_nested() {
        let out = render(concat!(
            "<tooldrawer-field type='repeater' path='items' index-token='__i__' ",
            "options='[{&quot;label&quot;:&quot;A&quot;}]' ",
            "template='&lt;tooldrawer-field type=&quot;toggle&quot; path=&quot;items.__i__.open&quot; label=&quot;Open&quot;/&gt;' />",
        ))
        .unwrap();
        assert!(out.contains(r#"data-token="__i__""#));
        assert!(out.contains("<i>A/md</i>"));
        assert!(out.contains(
            r#"<template><label class="label-s">Open<input type="checkbox" id="toggle-items-i-open"/></label></template>"#
        ));
    }

    #[test]
    fn test_usages_include_rendered_hints() {
        let stencils = cache();
        let mut usages = ComponentUsages::default();
        PanelRenderer::new(&stencils)
            .render_panel(
                &panel("<tooldrawer-field type='textfield' path='title' />"),
                &mut usages,
            )
            .unwrap();
        assert_eq!(usages.required, vec!["textfield"]);
        assert_eq!(usages.optional, vec!["textfield"]);
    }

    #[test]
    fn test_unknown_component_is_fatal() {
        let err = render("<tooldrawer-field type='slider' path='size' />").unwrap_err();
        assert!(matches!(err, Error::MissingStencil { component, .. } if component == "slider"));
    }

    #[test]
    fn test_typeless_tags_are_kept() {
        let markup = "<tooldrawer-field path='x' />";
        assert_eq!(render(markup).unwrap(), markup);
    }
}

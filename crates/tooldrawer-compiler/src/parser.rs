//! Widget JSON and markup parser
//!
//! Field tags are located with a small quote-aware scanner rather than a
//! regex: attribute values routinely carry inline JSON or whole template
//! snippets, so a literal `>` inside quotes must not end the tag.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tooldrawer_core::{Node, WidgetSpec};

use crate::error::{Error, Result};
use crate::ir::{Attributes, ComponentUsages, FieldTag, PanelSource, RawWidget};

/// Opening of every field tag, grouped or not
pub const FIELD_OPEN: &str = "<tooldrawer-field";
/// Closing field tag
pub const FIELD_CLOSE: &str = "</tooldrawer-field>";

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});

static PANEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<bob-panel\s+id='([^']+)'[^>]*>(.*?)</bob-panel>").expect("valid panel regex")
});

static CLASS_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bdiet-([a-z0-9_-]+)\b").expect("valid class hint regex"));

/// Read a widget definition file
pub fn parse_file(path: impl AsRef<Path>) -> Result<WidgetSpec> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_json(&content)
}

/// Parse widget definition JSON
pub fn parse_json(json: &str) -> Result<WidgetSpec> {
    let raw: RawWidget = serde_json::from_str(json).map_err(|e| Error::InvalidWidgetJson {
        message: e.to_string(),
    })?;
    convert_to_spec(raw)
}

/// Check required fields and build a [`WidgetSpec`]
pub fn convert_to_spec(raw: RawWidget) -> Result<WidgetSpec> {
    let missing = |field: &str| Error::MissingField {
        field: field.to_string(),
    };

    let defaults = raw
        .defaults
        .filter(Node::is_object)
        .ok_or_else(|| missing("defaults object"))?;

    let widgetname = raw
        .widgetname
        .as_ref()
        .and_then(Node::as_str)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| missing("widgetname"))?
        .to_string();

    let display_name = raw
        .display_name
        .as_ref()
        .and_then(Node::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| widgetname.clone(), str::to_string);

    let html = raw
        .html
        .as_ref()
        .and_then(Node::as_array)
        .ok_or_else(|| missing("html array"))?
        .iter()
        .map(|line| line.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| missing("html array of strings"))?;

    Ok(WidgetSpec {
        widgetname,
        display_name,
        defaults,
        html,
        presets: raw.presets.filter(|p| !p.is_null()),
        normalization: raw.normalization.filter(|n| !n.is_null()),
    })
}

/// Decode the five entities authors use inside attribute values.
pub fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Parse `name="value"` / `name='value'` pairs out of raw tag text.
pub fn parse_attributes(raw: &str) -> Attributes {
    let mut attrs = Attributes::default();
    for caps in ATTRIBUTE.captures_iter(raw) {
        let value = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
        attrs.insert(caps[1].to_string(), value.to_string());
    }
    attrs
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Unquoted,
    Double,
    Single,
}

/// Offset of the `>` closing the tag that starts before `from`, ignoring
/// any `>` inside a quoted attribute value.
pub fn find_tag_end(source: &str, from: usize) -> Option<usize> {
    let mut state = QuoteState::Unquoted;
    for (offset, byte) in source.as_bytes().get(from..)?.iter().enumerate() {
        state = match (state, *byte) {
            (QuoteState::Unquoted, b'>') => return Some(from + offset),
            (QuoteState::Unquoted, b'"') => QuoteState::Double,
            (QuoteState::Unquoted, b'\'') => QuoteState::Single,
            (QuoteState::Double, b'"') | (QuoteState::Single, b'\'') => QuoteState::Unquoted,
            (state, _) => state,
        };
    }
    None
}

pub(crate) fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| from + i)
}

/// Every top-level field tag in `markup`, in document order.
///
/// Tags nested inside another tag's body are not returned separately;
/// callers recurse into [`FieldTag::inner`]. An open tag without a closing
/// tag is skipped.
pub fn scan_field_tags(markup: &str) -> Vec<FieldTag<'_>> {
    // ASCII lowering keeps byte offsets aligned with `markup`
    let lower = markup.to_ascii_lowercase();
    let mut tags = Vec::new();
    let mut cursor = 0;
    while let Some(start) = find_from(&lower, FIELD_OPEN, cursor) {
        match read_field_tag(markup, &lower, start) {
            Some(tag) => {
                cursor = tag.end;
                tags.push(tag);
            }
            None => cursor = start + FIELD_OPEN.len(),
        }
    }
    tags
}

fn read_field_tag<'a>(markup: &'a str, lower: &str, start: usize) -> Option<FieldTag<'a>> {
    let bytes = lower.as_bytes();
    let mut pos = start + FIELD_OPEN.len();

    let mut group = None;
    if bytes.get(pos) == Some(&b'-') {
        let name_start = pos + 1;
        let name_len = bytes
            .get(name_start..)?
            .iter()
            .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || **b == b'-')
            .count();
        if name_len == 0 {
            return None;
        }
        pos = name_start + name_len;
        group = Some(&markup[name_start..pos]);
    }
    match bytes.get(pos) {
        Some(b) if b.is_ascii_whitespace() || *b == b'/' || *b == b'>' => {}
        _ => return None,
    }

    let gt = find_tag_end(markup, pos)?;
    if gt > pos && bytes[gt - 1] == b'/' {
        return Some(FieldTag {
            start,
            end: gt + 1,
            group,
            attrs_raw: &markup[pos..gt - 1],
            inner: None,
        });
    }

    let body_start = gt + 1;
    let mut cursor = body_start;
    loop {
        let close = find_from(lower, FIELD_CLOSE, cursor)?;
        match find_from(lower, FIELD_OPEN, cursor).filter(|&open| open < close) {
            Some(open) => {
                cursor = read_field_tag(markup, lower, open)
                    .map_or(open + FIELD_OPEN.len(), |nested| nested.end);
            }
            None => {
                return Some(FieldTag {
                    start,
                    end: close + FIELD_CLOSE.len(),
                    group,
                    attrs_raw: &markup[pos..gt],
                    inner: Some(&markup[body_start..close]),
                });
            }
        }
    }
}

/// Replace every top-level field tag with the output of `render`.
///
/// `render` returns `None` to keep a tag as written.
pub fn replace_field_tags<F>(markup: &str, mut render: F) -> Result<String>
where
    F: FnMut(&FieldTag<'_>) -> Result<Option<String>>,
{
    let mut out = String::with_capacity(markup.len());
    let mut last = 0;
    for tag in scan_field_tags(markup) {
        out.push_str(&markup[last..tag.start]);
        match render(&tag)? {
            Some(rendered) => out.push_str(&rendered),
            None => out.push_str(&markup[tag.start..tag.end]),
        }
        last = tag.end;
    }
    out.push_str(&markup[last..]);
    Ok(out)
}

/// Split the joined markup into panels. At least one panel is required.
pub fn parse_panels(html: &str) -> Result<Vec<PanelSource>> {
    let panels: Vec<PanelSource> = PANEL
        .captures_iter(html)
        .map(|caps| PanelSource {
            id: caps[1].to_string(),
            markup: caps[2].to_string(),
        })
        .collect();
    if panels.is_empty() {
        return Err(Error::NoPanels);
    }
    Ok(panels)
}

/// Display label of a panel id
pub fn panel_label(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Panel".to_string(),
    }
}

/// Record `diet-<name>` class hints, with `--modifier`/`__element`
/// suffixes dropped.
pub fn collect_class_hints(markup: &str, usages: &mut ComponentUsages) {
    for caps in CLASS_HINT.captures_iter(markup) {
        let raw = &caps[1];
        let end = [raw.find("--"), raw.find("__")]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(raw.len());
        if end > 0 {
            usages.hint(&raw[..end]);
        }
    }
}

/// Record every field type in `markup`, descending into bodies and
/// `template` attributes.
pub fn collect_field_types(markup: &str, usages: &mut ComponentUsages) {
    for tag in scan_field_tags(markup) {
        let attrs = parse_attributes(tag.attrs_raw);
        if let Some(component) = attrs.get("type") {
            usages.require(component);
        }
        if let Some(template) = attrs.get("template") {
            let decoded = decode_entities(template);
            collect_field_types(&decoded, usages);
            collect_class_hints(&decoded, usages);
        }
        if let Some(inner) = tag.inner {
            collect_field_types(inner, usages);
        }
    }
}

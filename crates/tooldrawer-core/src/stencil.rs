//! Stencil template language
//!
//! Stencils are the markup fragments behind every editor component. The
//! language is deliberately tiny:
//!
//! ```text
//! {{key}}                         interpolation (`../` walks up #each scopes)
//! {{#if key}}…{{else}}…{{/if}}    conditional
//! {{#unless key}}…{{/unless}}     negated conditional
//! {{#each key}}…{{/each}}         iteration; primitives are exposed as `this`
//! ```
//!
//! Rendering never fails. A block whose closing tag is missing is emitted
//! as literal text (the opening tag followed by its unparsed body), and
//! stray `#…`/`/…` tags are kept verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::paths::parse_index;
use crate::tree::Node;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-zA-Z0-9_]+)\s*\}\}").expect("valid placeholder regex"));

/// One parsed template element
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Var(String),
    If {
        key: String,
        truthy: Vec<Segment>,
        falsy: Vec<Segment>,
    },
    Unless {
        key: String,
        body: Vec<Segment>,
    },
    Each {
        key: String,
        body: Vec<Segment>,
    },
}

/// A parsed stencil, reusable across renders
#[derive(Debug, Clone, PartialEq)]
pub struct Stencil {
    segments: Vec<Segment>,
}

impl Stencil {
    /// Parse a stencil source. Parsing is total: malformed blocks degrade to text.
    pub fn parse(source: &str) -> Self {
        let mut parser = BlockParser { input: source, pos: 0 };
        let (segments, _) = parser.parse_until(&[]);
        Self { segments }
    }

    /// Render against a root context
    pub fn render(&self, context: &Node) -> String {
        let mut out = String::new();
        let mut stack = vec![context.clone()];
        render_segments(&self.segments, &mut stack, &mut out);
        out
    }
}

/// Parse and render in one step.
pub fn render_stencil(source: &str, context: &Node) -> String {
    Stencil::parse(source).render(context)
}

/// Truthiness used by `#if` / `#unless`.
///
/// Only a missing value, `null`, `false`, and the strings `"false"` and
/// `"0"` are falsy. Attribute values arrive from markup as strings, which
/// is why the two string spellings count.
pub fn is_truthy(value: Option<&Node>) -> bool {
    match value {
        None | Some(Node::Null) | Some(Node::Bool(false)) => false,
        Some(Node::String(s)) => s != "false" && s != "0",
        Some(_) => true,
    }
}

/// Substitute `{{token}}` placeholders inside the string values of a
/// context, resolving each token against the context's top level.
///
/// Tokens that do not name a top-level string resolve to the empty
/// string. Members whose key is listed in `skip` (at any depth) are kept
/// verbatim.
pub fn interpolate_context(context: &Node, skip: &[&str]) -> Node {
    walk_interpolate(context, context, skip)
}

fn walk_interpolate(value: &Node, root: &Node, skip: &[&str]) -> Node {
    match value {
        Node::String(s) => Node::String(
            PLACEHOLDER
                .replace_all(s, |caps: &Captures<'_>| {
                    root.get(&caps[1])
                        .and_then(Node::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .into_owned(),
        ),
        Node::Array(items) => Node::array(
            items
                .iter()
                .map(|item| walk_interpolate(item, root, skip))
                .collect(),
        ),
        Node::Object(map) => Node::object(map.iter().map(|(key, child)| {
            let next = if skip.contains(&key.as_str()) {
                child.clone()
            } else {
                walk_interpolate(child, root, skip)
            };
            (key.clone(), next)
        })),
        other => other.clone(),
    }
}

struct BlockParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> BlockParser<'a> {
    /// Parse until one of `stops` is found (returned) or input ends (`None`).
    fn parse_until(&mut self, stops: &[&str]) -> (Vec<Segment>, Option<&'a str>) {
        let input = self.input;
        let mut segments = Vec::new();

        while self.pos < input.len() {
            let rest = &input[self.pos..];
            let Some(open) = rest.find(OPEN) else {
                segments.push(Segment::Text(rest.to_string()));
                self.pos = input.len();
                return (segments, None);
            };
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }

            let token_start = self.pos + open + OPEN.len();
            let Some(close) = input[token_start..].find(CLOSE) else {
                segments.push(Segment::Text(input[self.pos + open..].to_string()));
                self.pos = input.len();
                return (segments, None);
            };
            let raw = &input[token_start..token_start + close];
            let token = raw.trim();
            self.pos = token_start + close + CLOSE.len();

            if stops.contains(&token) {
                return (segments, Some(token));
            }

            let literal = || Segment::Text(format!("{OPEN}{raw}{CLOSE}"));

            if let Some(key) = token.strip_prefix("#if ") {
                let (truthy, stop) = self.parse_until(&["else", "/if"]);
                match stop {
                    Some("/if") => segments.push(Segment::If {
                        key: key.trim().to_string(),
                        truthy,
                        falsy: Vec::new(),
                    }),
                    Some(_) => {
                        let (falsy, stop) = self.parse_until(&["/if"]);
                        if stop.is_some() {
                            segments.push(Segment::If {
                                key: key.trim().to_string(),
                                truthy,
                                falsy,
                            });
                        } else {
                            segments.push(literal());
                            segments.extend(truthy);
                            segments.push(Segment::Text(format!("{OPEN}else{CLOSE}")));
                            segments.extend(falsy);
                        }
                    }
                    None => {
                        segments.push(literal());
                        segments.extend(truthy);
                    }
                }
                continue;
            }

            if let Some(key) = token.strip_prefix("#unless ") {
                let (body, stop) = self.parse_until(&["/unless"]);
                if stop.is_some() {
                    segments.push(Segment::Unless {
                        key: key.trim().to_string(),
                        body,
                    });
                } else {
                    segments.push(literal());
                    segments.extend(body);
                }
                continue;
            }

            if let Some(key) = token.strip_prefix("#each ") {
                let (body, stop) = self.parse_until(&["/each"]);
                if stop.is_some() {
                    segments.push(Segment::Each {
                        key: key.trim().to_string(),
                        body,
                    });
                } else {
                    segments.push(literal());
                    segments.extend(body);
                }
                continue;
            }

            if token.starts_with('#') || token.starts_with('/') {
                segments.push(literal());
                continue;
            }

            if !token.is_empty() {
                segments.push(Segment::Var(token.to_string()));
            }
        }

        (segments, None)
    }
}

fn render_segments(segments: &[Segment], stack: &mut Vec<Node>, out: &mut String) {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Var(key) => {
                if let Some(value) = resolve_key(key, stack) {
                    out.push_str(&value.to_display_string());
                }
            }
            Segment::If { key, truthy, falsy } => {
                let branch = if is_truthy(resolve_key(key, stack)) {
                    truthy
                } else {
                    falsy
                };
                render_segments(branch, stack, out);
            }
            Segment::Unless { key, body } => {
                if !is_truthy(resolve_key(key, stack)) {
                    render_segments(body, stack, out);
                }
            }
            Segment::Each { key, body } => {
                let Some(Node::Array(items)) = resolve_key(key, stack).cloned() else {
                    continue;
                };
                for item in items.iter() {
                    let scope = if item.is_object() || item.is_array() {
                        item.clone()
                    } else {
                        Node::object([("this", item.clone())])
                    };
                    stack.push(scope);
                    render_segments(body, stack, out);
                    stack.pop();
                }
            }
        }
    }
}

/// Resolve `../../a.b` against the scope stack (innermost scope last).
fn resolve_key<'s>(key: &str, stack: &'s [Node]) -> Option<&'s Node> {
    let mut remaining = key;
    let mut up = 0;
    while let Some(rest) = remaining.strip_prefix("../") {
        up += 1;
        remaining = rest;
    }
    let index = stack.len().checked_sub(1 + up)?;

    remaining
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(&stack[index], |value, segment| match value {
            Node::Object(map) => map.get(segment),
            Node::Array(items) => items.get(parse_index(segment)?),
            _ => None,
        })
}

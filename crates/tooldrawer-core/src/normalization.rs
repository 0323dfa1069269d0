//! Instance data normalization rules
//!
//! A widget definition may declare rules that repair instance data before
//! it is edited: `idRules` give every element of an array a unique id, and
//! `coerceRules` replace wrongly-typed leaves with a default. Rule paths use
//! dot segments where `key[]` fans out over the elements of an array.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::paths::{PROHIBITED_SEGMENTS, get_at, set_at};
use crate::tree::Node;

const MAX_SLUG_LEN: usize = 48;

/// Validated normalization rules of one widget
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationSpec {
    /// Array id repair rules, applied first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub id_rules: Vec<IdRule>,

    /// Scalar type repair rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coerce_rules: Vec<CoerceRule>,
}

/// Ensure each object in the arrays at `array_path` has a unique id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdRule {
    /// Path of the array(s); may contain `key[]` segments
    pub array_path: String,

    /// Id field on each element
    pub id_key: String,

    /// Field whose slug seeds a missing id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_key: Option<String>,

    /// Prefix for generated ids (`<prefix>-<n>`); defaults to `id_key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_prefix: Option<String>,
}

/// Scalar type named by a coerce rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// JSON string
    String,
    /// Finite JSON number
    Number,
    /// JSON boolean
    Boolean,
}

impl ScalarType {
    fn accepts(self, value: &Node) -> bool {
        match self {
            ScalarType::String => matches!(value, Node::String(_)),
            ScalarType::Number => value.as_f64().is_some_and(f64::is_finite),
            ScalarType::Boolean => matches!(value, Node::Bool(_)),
        }
    }
}

/// Replace a leaf of the wrong type with `default`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoerceRule {
    /// Leaf path; may contain `key[]` segments but not end with one
    pub path: String,

    /// Expected type
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,

    /// Replacement value, of `scalar_type`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Node>,
}

fn invalid(message: impl Into<String>) -> Error {
    Error::InvalidNormalization {
        message: message.into(),
    }
}

fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        && !PROHIBITED_SEGMENTS.contains(&key)
}

/// Split and check a rule path, returning its trimmed segments.
fn split_rule_path(path: &str, allow_trailing_array: bool) -> Result<Vec<String>> {
    let raw = path.trim();
    if raw.is_empty() {
        return Err(invalid("path must be a non-empty string"));
    }
    let segments: Vec<&str> = raw.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid(format!("path \"{raw}\" contains empty segments")));
    }

    let last = segments.len() - 1;
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let (key, fans_out) = match segment.strip_suffix("[]") {
                Some(key) => (key, true),
                None => (*segment, false),
            };
            if !is_safe_key(key) {
                return Err(invalid(format!("path segment \"{segment}\" is invalid")));
            }
            if fans_out && index == last && !allow_trailing_array {
                return Err(invalid(format!("path \"{raw}\" cannot end with []")));
            }
            Ok(segment.to_string())
        })
        .collect()
}

fn non_empty_string<'a>(rule: &'a Node, key: &str) -> Option<&'a str> {
    rule.get(key)
        .and_then(Node::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

impl NormalizationSpec {
    /// Validate raw normalization rules.
    ///
    /// `null` or a spec with no rules yields `Ok(None)`.
    pub fn parse(raw: &Node) -> Result<Option<Self>> {
        if raw.is_null() {
            return Ok(None);
        }
        if !raw.is_object() {
            return Err(invalid("normalization must be an object"));
        }

        let id_rules = rule_list(raw, "idRules")?
            .iter()
            .enumerate()
            .map(|(index, rule)| parse_id_rule(rule, index))
            .collect::<Result<Vec<_>>>()?;
        let coerce_rules = rule_list(raw, "coerceRules")?
            .iter()
            .enumerate()
            .map(|(index, rule)| parse_coerce_rule(rule, index))
            .collect::<Result<Vec<_>>>()?;

        if id_rules.is_empty() && coerce_rules.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            id_rules,
            coerce_rules,
        }))
    }
}

fn rule_list<'a>(raw: &'a Node, key: &str) -> Result<&'a [Node]> {
    match raw.get(key) {
        None | Some(Node::Null) => Ok(&[]),
        Some(Node::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(invalid(format!("normalization.{key} must be an array"))),
    }
}

fn parse_id_rule(rule: &Node, index: usize) -> Result<IdRule> {
    let at = format!("normalization.idRules[{index}]");
    if !rule.is_object() {
        return Err(invalid(format!("{at} must be an object")));
    }

    let array_path = non_empty_string(rule, "arrayPath")
        .ok_or_else(|| invalid(format!("{at}.arrayPath must be a non-empty string")))?;
    let array_path = split_rule_path(array_path, true)?.join(".");

    let id_key = rule
        .get("idKey")
        .and_then(Node::as_str)
        .map(str::trim)
        .filter(|key| is_safe_key(key))
        .ok_or_else(|| invalid(format!("{at}.idKey must be a safe key")))?;

    let seed_key = match non_empty_string(rule, "seedKey") {
        Some(key) if is_safe_key(key) => Some(key.to_string()),
        Some(_) => return Err(invalid(format!("{at}.seedKey must be a safe key"))),
        None => None,
    };

    Ok(IdRule {
        array_path,
        id_key: id_key.to_string(),
        seed_key,
        fallback_prefix: non_empty_string(rule, "fallbackPrefix").map(str::to_string),
    })
}

fn parse_coerce_rule(rule: &Node, index: usize) -> Result<CoerceRule> {
    let at = format!("normalization.coerceRules[{index}]");
    if !rule.is_object() {
        return Err(invalid(format!("{at} must be an object")));
    }

    let path = non_empty_string(rule, "path")
        .ok_or_else(|| invalid(format!("{at}.path must be a non-empty string")))?;
    let path = split_rule_path(path, false)?.join(".");

    let scalar_type = match rule.get("type").and_then(Node::as_str) {
        Some("string") => ScalarType::String,
        Some("number") => ScalarType::Number,
        Some("boolean") => ScalarType::Boolean,
        _ => {
            return Err(invalid(format!(
                "{at}.type must be string|number|boolean"
            )));
        }
    };

    let default = rule.get("default").cloned();
    if let Some(value) = &default
        && !scalar_type.accepts(value)
    {
        let expected = match scalar_type {
            ScalarType::String => "a string",
            ScalarType::Number => "a finite number",
            ScalarType::Boolean => "a boolean",
        };
        return Err(invalid(format!("{at}.default must be {expected}")));
    }

    Ok(CoerceRule {
        path,
        scalar_type,
        default,
    })
}

/// Slug used to seed ids: lower-case, `&` spelled out, runs of other
/// characters collapsed to `-`, at most 48 characters.
pub fn slugify_id_part(input: &str) -> String {
    let lowered = input.trim().to_lowercase().replace('&', " and ");
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug.chars().take(MAX_SLUG_LEN).collect()
}

fn unique_id(base: &str, used: &mut HashSet<String>) -> String {
    let seed = if base.is_empty() { "item" } else { base };
    let mut next = seed.to_string();
    let mut suffix = 2;
    while used.contains(&next) {
        next = format!("{seed}-{suffix}");
        suffix += 1;
    }
    used.insert(next.clone());
    next
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Resolve rule segments to concrete `(path, value)` pairs.
fn resolve<'a>(root: &'a Node, segments: &[&str]) -> Vec<(String, &'a Node)> {
    segments
        .iter()
        .fold(vec![(String::new(), root)], |candidates, segment| {
            let (key, fans_out) = match segment.strip_suffix("[]") {
                Some(key) => (key, true),
                None => (*segment, false),
            };
            let mut next = Vec::new();
            for (path, node) in candidates {
                let Some(value) = node.get(key) else {
                    continue;
                };
                let path = join_path(&path, key);
                if fans_out {
                    for (index, item) in value.as_array().unwrap_or_default().iter().enumerate() {
                        next.push((join_path(&path, &index.to_string()), item));
                    }
                } else {
                    next.push((path, value));
                }
            }
            next
        })
}

fn apply_id_rule(tree: Node, rule: &IdRule) -> Node {
    let segments: Vec<&str> = rule.array_path.split('.').collect();
    let arrays: Vec<(String, usize)> = resolve(&tree, &segments)
        .into_iter()
        .filter_map(|(path, node)| node.as_array().map(|items| (path, items.len())))
        .collect();

    let prefix = slugify_id_part(rule.fallback_prefix.as_deref().unwrap_or(&rule.id_key));
    let prefix = if prefix.is_empty() { "item".to_string() } else { prefix };
    let mut used = HashSet::new();

    let mut tree = tree;
    for (array_path, len) in arrays {
        for index in 0..len {
            let item_path = join_path(&array_path, &index.to_string());
            let Some(item) = get_at(&tree, &item_path).filter(|n| n.is_object()) else {
                continue;
            };
            let raw_id = item
                .get(&rule.id_key)
                .and_then(Node::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string();
            let seed = if !raw_id.is_empty() {
                raw_id.clone()
            } else {
                let slug = rule
                    .seed_key
                    .as_deref()
                    .and_then(|key| item.get(key))
                    .and_then(Node::as_str)
                    .map(slugify_id_part)
                    .unwrap_or_default();
                if slug.is_empty() {
                    format!("{prefix}-{}", index + 1)
                } else {
                    slug
                }
            };
            let next_id = unique_id(&seed, &mut used);
            if next_id == raw_id {
                continue;
            }
            tracing::debug!(path = %item_path, id = %next_id, "assigned item id");
            tree = set_at(&tree, &join_path(&item_path, &rule.id_key), Node::from(next_id));
        }
    }
    tree
}

fn apply_coerce_rule(tree: Node, rule: &CoerceRule) -> Node {
    let segments: Vec<&str> = rule.path.split('.').collect();
    let Some((leaf, parents)) = segments.split_last() else {
        return tree;
    };
    let parents: Vec<String> = resolve(&tree, parents)
        .into_iter()
        .filter(|(_, node)| node.is_object())
        .map(|(path, _)| path)
        .collect();

    let mut tree = tree;
    for parent in parents {
        let leaf_path = join_path(&parent, leaf);
        let current = get_at(&tree, &leaf_path);
        if current.is_some_and(|value| rule.scalar_type.accepts(value)) {
            continue;
        }
        if let Some(fallback) = &rule.default {
            tree = set_at(&tree, &leaf_path, fallback.clone());
        }
    }
    tree
}

/// Apply normalization rules, returning a repaired copy of `tree`.
pub fn apply_normalization(tree: &Node, spec: Option<&NormalizationSpec>) -> Node {
    let Some(spec) = spec else {
        return tree.clone();
    };
    let tree = spec
        .id_rules
        .iter()
        .fold(tree.clone(), |tree, rule| apply_id_rule(tree, rule));
    spec.coerce_rules
        .iter()
        .fold(tree, |tree, rule| apply_coerce_rule(tree, rule))
}

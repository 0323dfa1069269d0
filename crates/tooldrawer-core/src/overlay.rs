//! Localization overlay engine
//!
//! Overlays are batches of string `set` ops applied on top of a base
//! instance. Instead of compiled controls they are constrained by an
//! allowlist of path patterns, where a `*` segment stands for exactly one
//! array index (`faqs.*.question`).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ops::{OpError, OpsResult};
use crate::paths::{
    PROHIBITED_SEGMENTS, has_prohibited_segment, index_out_of_range, parse_index, set_at,
};
use crate::tree::Node;

/// A string `set` op of an overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizationOp {
    /// Always `"set"` for ops that apply
    pub op: String,
    /// Target path; `a[0].b` is accepted and normalized
    pub path: String,
    /// Replacement text
    pub value: String,
}

impl LocalizationOp {
    /// `set` op
    pub fn set(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: "set".to_string(),
            path: path.into(),
            value: value.into(),
        }
    }
}

/// How an allowlisted value is edited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowlistType {
    /// Plain text
    #[default]
    String,
    /// Markup-bearing text
    Richtext,
}

/// One allowlist pattern: a bare path or `{path, type}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowlistEntry {
    /// Bare pattern, typed as plain text
    Path(String),
    /// Pattern with an explicit type
    Typed {
        /// Pattern
        path: String,
        /// Value type
        #[serde(default, rename = "type")]
        kind: AllowlistType,
    },
}

impl AllowlistEntry {
    /// Trimmed pattern
    pub fn path(&self) -> &str {
        match self {
            AllowlistEntry::Path(path) | AllowlistEntry::Typed { path, .. } => path.trim(),
        }
    }

    /// Value type
    pub fn kind(&self) -> AllowlistType {
        match self {
            AllowlistEntry::Path(_) => AllowlistType::String,
            AllowlistEntry::Typed { kind, .. } => *kind,
        }
    }
}

impl From<&str> for AllowlistEntry {
    fn from(path: &str) -> Self {
        AllowlistEntry::Path(path.to_string())
    }
}

/// A string found at an allowlisted path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistValue {
    /// Concrete path
    pub path: String,
    /// Type from the matching allowlist entry
    #[serde(rename = "type")]
    pub kind: AllowlistType,
    /// Current text
    pub value: String,
}

/// Ops split by [`filter_allowlisted_ops`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredOps {
    /// Allowed ops, with normalized paths
    pub filtered: Vec<LocalizationOp>,
    /// Ops left as given
    pub rejected: Vec<LocalizationOp>,
}

/// Normalize an op path: `a[0].b` becomes `a.0.b`, runs of dots collapse,
/// and leading or trailing dots are dropped.
pub fn normalize_op_path(raw: &str) -> String {
    let mut dotted = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find('[') {
        let (before, after) = rest.split_at(open);
        dotted.push_str(before);
        let bracketed = after[1..].find(']').map(|close| &after[1..1 + close]);
        match bracketed {
            Some(digits) if parse_index(digits).is_some() => {
                dotted.push('.');
                dotted.push_str(digits);
                rest = &after[digits.len() + 2..];
            }
            _ => {
                dotted.push('[');
                rest = &after[1..];
            }
        }
    }
    dotted.push_str(rest);

    dotted
        .split('.')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether `path` matches the allow pattern `allow`: equal segment counts,
/// `*` matching one numeric segment, other segments literally.
pub fn path_matches_allowlist(path: &str, allow: &str) -> bool {
    let actual = split_segments(path);
    let pattern = split_segments(allow);
    actual.len() == pattern.len()
        && pattern.iter().zip(&actual).all(|(allow, actual)| match *allow {
            "*" => parse_index(actual).is_some(),
            literal => literal == *actual,
        })
}

fn allowlisted(path: &str, allowlist: &[AllowlistEntry]) -> bool {
    allowlist
        .iter()
        .map(AllowlistEntry::path)
        .filter(|allow| !allow.is_empty())
        .any(|allow| path_matches_allowlist(path, allow))
}

/// Split ops into those the allowlist permits and those it does not.
pub fn filter_allowlisted_ops(ops: &[LocalizationOp], allowlist: &[AllowlistEntry]) -> FilteredOps {
    let mut result = FilteredOps::default();
    for op in ops {
        let path = normalize_op_path(&op.path);
        if path.is_empty() || has_prohibited_segment(&path) || !allowlisted(&path, allowlist) {
            result.rejected.push(op.clone());
            continue;
        }
        result.filtered.push(LocalizationOp {
            path,
            ..op.clone()
        });
    }
    result
}

/// Merge two op lists; the last op per path wins and keeps the position
/// where that path first appeared.
pub fn merge_overlay_ops(existing: &[LocalizationOp], incoming: &[LocalizationOp]) -> Vec<LocalizationOp> {
    let mut merged: Vec<LocalizationOp> = Vec::new();
    for op in existing.iter().chain(incoming) {
        match merged.iter_mut().find(|m| m.path == op.path) {
            Some(slot) => *slot = op.clone(),
            None => merged.push(op.clone()),
        }
    }
    merged
}

/// Apply raw overlay ops, rejecting the batch on the first bad op.
pub fn apply_overlay_ops(base: &Node, ops: &[Node], allowlist: &[AllowlistEntry]) -> OpsResult {
    let mut working = base.clone();
    for (index, op) in ops.iter().enumerate() {
        if !op.is_object() {
            return OpsResult::reject(OpError::new(index, "Op must be an object"));
        }
        if op.get("op").and_then(Node::as_str) != Some("set") {
            return OpsResult::reject(OpError::new(index, "Only \"set\" ops are allowed"));
        }
        let path = op
            .get("path")
            .and_then(Node::as_str)
            .map(normalize_op_path)
            .unwrap_or_default();
        if path.is_empty() {
            return OpsResult::reject(OpError::new(index, "Missing path"));
        }
        if has_prohibited_segment(&path) {
            return OpsResult::reject(OpError::at(index, path, "Path contains a prohibited segment"));
        }
        if !allowlisted(&path, allowlist) {
            return OpsResult::reject(OpError::at(index, path, "Path is not allowlisted"));
        }
        let Some(value) = op.get("value").filter(|v| v.as_str().is_some()) else {
            return OpsResult::reject(OpError::at(index, path, "Value must be a string"));
        };
        if let Some((_, len)) = index_out_of_range(&working, &path) {
            let message = format!("index out of range (0..{len})");
            return OpsResult::reject(OpError::at(index, path, message));
        }
        working = set_at(&working, &path, value.clone());
    }
    tracing::debug!(ops = ops.len(), "applied overlay ops");
    OpsResult::Ok { data: working }
}

/// Replay stored overlay ops, silently skipping any that do not apply.
pub fn apply_localization_ops(base: &Node, ops: &[LocalizationOp]) -> Node {
    ops.iter()
        .filter(|op| op.op == "set")
        .filter(|op| !op.path.trim().is_empty() && !has_prohibited_segment(&op.path))
        .fold(base.clone(), |working, op| {
            if index_out_of_range(&working, &op.path).is_some() {
                return working;
            }
            set_at(&working, &op.path, Node::from(op.value.as_str()))
        })
}

fn collect(
    value: Option<&Node>,
    segments: &[&str],
    current: String,
    kind: AllowlistType,
    include_empty: bool,
    out: &mut Vec<AllowlistValue>,
) {
    let Some((head, tail)) = segments.split_first() else {
        if let Some(text) = value.and_then(Node::as_str)
            && (include_empty || !text.trim().is_empty())
        {
            out.push(AllowlistValue {
                path: current,
                kind,
                value: text.to_string(),
            });
        }
        return;
    };
    if PROHIBITED_SEGMENTS.contains(head) {
        return;
    }

    let join = |segment: &str| {
        if current.is_empty() {
            segment.to_string()
        } else {
            format!("{current}.{segment}")
        }
    };

    match (value, *head) {
        (Some(Node::Array(items)), "*") => {
            for (index, item) in items.iter().enumerate() {
                collect(Some(item), tail, join(&index.to_string()), kind, include_empty, out);
            }
        }
        (_, "*") => {}
        (Some(Node::Array(items)), segment) if parse_index(segment).is_some() => {
            let item = parse_index(segment).and_then(|i| items.get(i));
            collect(item, tail, join(segment), kind, include_empty, out);
        }
        (Some(node @ Node::Object(_)), segment) => {
            collect(node.get(segment), tail, join(segment), kind, include_empty, out);
        }
        _ => {}
    }
}

/// Collect the string values at every allowlisted path, deduplicated by
/// path in allowlist order.
pub fn collect_allowlisted_entries(
    tree: &Node,
    allowlist: &[AllowlistEntry],
    include_empty: bool,
) -> Vec<AllowlistValue> {
    let mut out = Vec::new();
    for entry in allowlist {
        let path = entry.path();
        if path.is_empty() || has_prohibited_segment(path) {
            continue;
        }
        let segments = split_segments(path);
        if segments.is_empty() {
            continue;
        }
        collect(Some(tree), &segments, String::new(), entry.kind(), include_empty, &mut out);
    }

    let mut seen = HashSet::new();
    out.retain(|item| !item.path.is_empty() && seen.insert(item.path.clone()));
    out
}

/// Map of allowlisted path to current text, empty strings included
pub fn build_snapshot(tree: &Node, allowlist: &[AllowlistEntry]) -> BTreeMap<String, String> {
    collect_allowlisted_entries(tree, allowlist, true)
        .into_iter()
        .map(|entry| (entry.path, entry.value))
        .collect()
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint of the whole base instance
pub fn base_fingerprint(tree: &Node) -> String {
    sha256_hex(&tree.to_canonical_json())
}

/// Fingerprint of the allowlisted text only; unchanged by edits elsewhere
pub fn overlay_fingerprint(tree: &Node, allowlist: &[AllowlistEntry]) -> String {
    let snapshot = Node::object(
        build_snapshot(tree, allowlist)
            .into_iter()
            .map(|(path, value)| (path, Node::from(value))),
    );
    sha256_hex(&snapshot.to_canonical_json())
}

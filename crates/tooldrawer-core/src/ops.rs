//! Ops application engine
//!
//! Applies a batch of `set` / `insert` / `remove` / `move` ops to instance
//! data. Every op must target a path governed by a compiled control, and
//! its payload must coerce to that control's kind. The batch is atomic: the
//! first failing op rejects the whole batch and the caller gets the errors
//! instead of a partially edited tree.
//!
//! # Example
//!
//! ```rust,ignore
//! use tooldrawer_core::ops::{OpsEngine, WidgetOp};
//!
//! let engine = OpsEngine::new(&widget.controls);
//! let result = engine.apply_ops(&data, &[WidgetOp::set("title", "Hello")]);
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::coerce::{CoercionMode, ControlValue, coerce_value};
use crate::matcher::ControlMatcher;
use crate::paths::{get_at, has_prohibited_segment, index_out_of_range, set_at};
use crate::tree::Node;
use crate::typography::{normalize_size_custom, role_scale_kind};
use crate::validate::{
    DataViolation, validate_array_item_ids, validate_number_constraints, validate_widget_data,
};
use crate::widget::{CompiledControl, ControlKind};

static SIZE_CUSTOM_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^typography\.roles\.([^.]+)\.sizeCustom$").expect("valid sizeCustom regex")
});

/// A typed op, for Rust callers. Serializes to the raw JSON op shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum WidgetOp {
    /// Replace the value at `path`
    Set {
        /// Target path
        path: String,
        /// New value
        value: Node,
    },
    /// Insert `value` into the array at `path`
    Insert {
        /// Array path
        path: String,
        /// Position, `0..=len`
        index: usize,
        /// Item to insert
        value: Node,
    },
    /// Remove the item at `index` from the array at `path`
    Remove {
        /// Array path
        path: String,
        /// Position, `0..len`
        index: usize,
    },
    /// Move an item within the array at `path`
    Move {
        /// Array path
        path: String,
        /// Current position
        from: usize,
        /// New position
        to: usize,
    },
}

impl WidgetOp {
    /// `set` op
    pub fn set(path: impl Into<String>, value: impl Into<Node>) -> Self {
        WidgetOp::Set {
            path: path.into(),
            value: value.into(),
        }
    }

    /// `insert` op
    pub fn insert(path: impl Into<String>, index: usize, value: impl Into<Node>) -> Self {
        WidgetOp::Insert {
            path: path.into(),
            index,
            value: value.into(),
        }
    }

    /// `remove` op
    pub fn remove(path: impl Into<String>, index: usize) -> Self {
        WidgetOp::Remove {
            path: path.into(),
            index,
        }
    }

    /// `move` op
    pub fn move_item(path: impl Into<String>, from: usize, to: usize) -> Self {
        WidgetOp::Move {
            path: path.into(),
            from,
            to,
        }
    }

    /// Target path
    pub fn path(&self) -> &str {
        match self {
            WidgetOp::Set { path, .. }
            | WidgetOp::Insert { path, .. }
            | WidgetOp::Remove { path, .. }
            | WidgetOp::Move { path, .. } => path,
        }
    }

    /// Raw JSON form
    pub fn to_node(&self) -> Node {
        let index = |i: &usize| Node::from(*i as i64);
        match self {
            WidgetOp::Set { path, value } => Node::object([
                ("op", Node::from("set")),
                ("path", Node::from(path.as_str())),
                ("value", value.clone()),
            ]),
            WidgetOp::Insert { path, index: i, value } => Node::object([
                ("op", Node::from("insert")),
                ("path", Node::from(path.as_str())),
                ("index", index(i)),
                ("value", value.clone()),
            ]),
            WidgetOp::Remove { path, index: i } => Node::object([
                ("op", Node::from("remove")),
                ("path", Node::from(path.as_str())),
                ("index", index(i)),
            ]),
            WidgetOp::Move { path, from, to } => Node::object([
                ("op", Node::from("move")),
                ("path", Node::from(path.as_str())),
                ("from", index(from)),
                ("to", index(to)),
            ]),
        }
    }
}

impl From<&WidgetOp> for Node {
    fn from(op: &WidgetOp) -> Self {
        op.to_node()
    }
}

/// One rejection reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpError {
    /// Index of the op responsible
    pub op_index: usize,
    /// Offending path, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// User-facing message
    pub message: String,
}

impl OpError {
    /// Error without a path
    pub fn new(op_index: usize, message: impl Into<String>) -> Self {
        Self {
            op_index,
            path: None,
            message: message.into(),
        }
    }

    /// Error at `path`
    pub fn at(op_index: usize, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            op_index,
            path: Some(path.into()),
            message: message.into(),
        }
    }
}

/// Outcome of an op batch
///
/// Serializes as `{"ok": true, "data": …}` or `{"ok": false, "errors": […]}`.
#[derive(Debug, Clone, PartialEq)]
pub enum OpsResult {
    /// Every op applied; `data` is the new tree
    Ok {
        /// Updated tree
        data: Node,
    },
    /// The batch was rejected; the input tree is unchanged
    Rejected {
        /// Rejection reasons
        errors: Vec<OpError>,
    },
}

impl OpsResult {
    /// Rejection with a single error
    pub fn reject(error: OpError) -> Self {
        OpsResult::Rejected {
            errors: vec![error],
        }
    }

    /// Whether the batch applied
    pub fn is_ok(&self) -> bool {
        matches!(self, OpsResult::Ok { .. })
    }

    /// Updated tree, if the batch applied
    pub fn data(&self) -> Option<&Node> {
        match self {
            OpsResult::Ok { data } => Some(data),
            OpsResult::Rejected { .. } => None,
        }
    }

    /// Rejection reasons; empty when the batch applied
    pub fn errors(&self) -> &[OpError] {
        match self {
            OpsResult::Ok { .. } => &[],
            OpsResult::Rejected { errors } => errors,
        }
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> Result<Node, Vec<OpError>> {
        match self {
            OpsResult::Ok { data } => Ok(data),
            OpsResult::Rejected { errors } => Err(errors),
        }
    }
}

impl Serialize for OpsResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("OpsResult", 2)?;
        match self {
            OpsResult::Ok { data } => {
                state.serialize_field("ok", &true)?;
                state.serialize_field("data", data)?;
            }
            OpsResult::Rejected { errors } => {
                state.serialize_field("ok", &false)?;
                state.serialize_field("errors", errors)?;
            }
        }
        state.end()
    }
}

/// When whole-tree validation runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// After every op; violations are charged to the op that produced them
    #[default]
    EachOp,
    /// Once, after the last op; each violation is charged to the op whose
    /// path shares the longest prefix with it
    EndOfBatch,
}

/// Applies op batches against one widget's controls
pub struct OpsEngine<'a> {
    controls: &'a [CompiledControl],
    matcher: ControlMatcher<'a>,
    mode: CoercionMode,
    policy: ValidationPolicy,
}

impl<'a> OpsEngine<'a> {
    /// Engine with strict coercion and per-op validation
    pub fn new(controls: &'a [CompiledControl]) -> Self {
        Self {
            controls,
            matcher: ControlMatcher::new(controls),
            mode: CoercionMode::default(),
            policy: ValidationPolicy::default(),
        }
    }

    /// Set the boolean coercion mode
    pub fn with_mode(mut self, mode: CoercionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set when whole-tree validation runs
    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply typed ops
    pub fn apply_ops(&self, data: &Node, ops: &[WidgetOp]) -> OpsResult {
        let raw: Vec<Node> = ops.iter().map(WidgetOp::to_node).collect();
        self.apply(data, &raw)
    }

    /// Apply raw JSON ops in order. `data` itself is never modified.
    pub fn apply(&self, data: &Node, ops: &[Node]) -> OpsResult {
        if ops.is_empty() {
            return OpsResult::reject(OpError::new(0, "Ops must be a non-empty array"));
        }

        let mut working = data.clone();
        for (index, op) in ops.iter().enumerate() {
            working = match self.apply_one(&working, index, op) {
                Ok(next) => next,
                Err(error) => {
                    tracing::debug!(op_index = index, message = %error.message, "op rejected");
                    return OpsResult::reject(error);
                }
            };

            if self.policy == ValidationPolicy::EachOp {
                let violations = validate_widget_data(&working, self.controls);
                if !violations.is_empty() {
                    tracing::debug!(op_index = index, count = violations.len(), "op left tree invalid");
                    return OpsResult::Rejected {
                        errors: violations
                            .into_iter()
                            .map(|v| OpError::at(index, v.path, v.message))
                            .collect(),
                    };
                }
            }
        }

        if self.policy == ValidationPolicy::EndOfBatch {
            let violations = validate_widget_data(&working, self.controls);
            if !violations.is_empty() {
                return OpsResult::Rejected {
                    errors: charge_violations(violations, ops),
                };
            }
        }

        tracing::info!(ops = ops.len(), "applied op batch");
        OpsResult::Ok { data: working }
    }

    fn apply_one(&self, working: &Node, index: usize, op: &Node) -> Result<Node, OpError> {
        if !op.is_object() {
            return Err(OpError::new(index, "Op must be an object"));
        }
        let Some(op_type) = op.get("op").and_then(Node::as_str) else {
            return Err(OpError::new(
                index,
                "Missing op (expected 'set'|'insert'|'remove'|'move')",
            ));
        };
        let Some(path) = op
            .get("path")
            .and_then(Node::as_str)
            .filter(|p| !p.trim().is_empty())
        else {
            return Err(OpError::new(index, "Missing path"));
        };
        let fail = |message: String| OpError::at(index, path, message);

        if has_prohibited_segment(path) {
            return Err(fail("Path contains a prohibited segment".into()));
        }
        let Some(control) = self.matcher.find(path) else {
            return Err(fail("Path is not editable".into()));
        };

        match op_type {
            "set" => self.apply_set(working, path, control, op.get("value")).map_err(fail),
            "insert" => self.apply_insert(working, path, control, op).map_err(fail),
            "remove" => apply_remove(working, path, control, op).map_err(fail),
            "move" => apply_move(working, path, control, op).map_err(fail),
            other => Err(fail(format!("Unknown op \"{other}\""))),
        }
    }

    fn apply_set(
        &self,
        working: &Node,
        path: &str,
        control: &CompiledControl,
        value: Option<&Node>,
    ) -> Result<Node, String> {
        let raw = value.ok_or("Value cannot be undefined")?;
        if let Some((_, len)) = index_out_of_range(working, path) {
            return Err(format!("index out of range (0..{len})"));
        }
        let coerced = coerce_value(control, raw, self.mode)?;

        if let ControlValue::Number(n) = &coerced
            && let Some(message) = validate_number_constraints(control, *n)
        {
            return Err(message);
        }

        let size_role = SIZE_CUSTOM_PATH
            .captures(path)
            .map(|caps| caps[1].to_string());
        let next = match (size_role, coerced) {
            (
                Some(role),
                ControlValue::Str(text) | ControlValue::Enum(text) | ControlValue::Color(text),
            ) => Node::from(normalize_size_custom(&text, role_scale_kind(working, &role))),
            (_, coerced) => coerced.into_node(),
        };
        if let Some(message) = validate_array_item_ids(control, &next) {
            return Err(message);
        }
        Ok(set_at(working, path, next))
    }

    fn apply_insert(
        &self,
        working: &Node,
        path: &str,
        control: &CompiledControl,
        op: &Node,
    ) -> Result<Node, String> {
        require_array_control(control)?;
        let index = op_index_field(op, "index")?;
        let items = current_array(working, path)?;
        if index > items.len() {
            return Err(format!("index out of range (0..{})", items.len()));
        }

        let raw = op.get("value").ok_or("Value cannot be undefined")?;
        let item = match self.matcher.find(&format!("{path}.{index}")) {
            Some(item_control) => coerce_value(item_control, raw, self.mode)?.into_node(),
            None => raw.clone(),
        };

        if let Some(id_key) = control.item_id_path.as_deref() {
            if !item.is_object() {
                return Err(format!("Inserted item must be an object with \"{id_key}\""));
            }
            let has_id = item
                .get(id_key)
                .and_then(Node::as_str)
                .is_some_and(|id| !id.trim().is_empty());
            if !has_id {
                return Err(format!("Inserted item must include a non-empty \"{id_key}\""));
            }
        }

        let mut next = items.to_vec();
        next.insert(index, item);
        Ok(set_at(working, path, Node::array(next)))
    }
}

fn require_array_control(control: &CompiledControl) -> Result<(), String> {
    if control.kind == ControlKind::Array {
        Ok(())
    } else {
        Err("Target must be an array control".to_string())
    }
}

/// Read a non-negative integer field; integral floats count.
fn op_index_field(op: &Node, field: &str) -> Result<usize, String> {
    let value = op.get(field).and_then(|node| match node {
        Node::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        _ => None,
    });
    value
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| format!("{field} must be an integer >= 0"))
}

fn current_array<'t>(working: &'t Node, path: &str) -> Result<&'t [Node], String> {
    get_at(working, path)
        .and_then(Node::as_array)
        .ok_or_else(|| "Target must be an array".to_string())
}

fn apply_remove(working: &Node, path: &str, control: &CompiledControl, op: &Node) -> Result<Node, String> {
    require_array_control(control)?;
    let index = op_index_field(op, "index")?;
    let items = current_array(working, path)?;
    if index >= items.len() {
        return Err(format!(
            "index out of range (0..{})",
            items.len().saturating_sub(1)
        ));
    }
    let mut next = items.to_vec();
    next.remove(index);
    Ok(set_at(working, path, Node::array(next)))
}

fn apply_move(working: &Node, path: &str, control: &CompiledControl, op: &Node) -> Result<Node, String> {
    require_array_control(control)?;
    let from = op_index_field(op, "from")?;
    let to = op_index_field(op, "to")?;
    let items = current_array(working, path)?;
    let Some(max) = items.len().checked_sub(1) else {
        return Err("Cannot move items in an empty array".to_string());
    };
    if from > max || to > max {
        return Err(format!("Indices out of range (0..{max})"));
    }
    let mut next = items.to_vec();
    let item = next.remove(from);
    next.insert(to, item);
    Ok(set_at(working, path, Node::array(next)))
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Charge each violation to the op whose path shares the longest segment
/// prefix with it; later ops win ties.
fn charge_violations(violations: Vec<DataViolation>, ops: &[Node]) -> Vec<OpError> {
    let op_paths: Vec<Option<Vec<&str>>> = ops
        .iter()
        .map(|op| op.get("path").and_then(Node::as_str).map(split_path))
        .collect();

    violations
        .into_iter()
        .map(|violation| {
            let target = split_path(&violation.path);
            let mut best_index = 0;
            let mut best_score = None;
            for (index, path) in op_paths.iter().enumerate() {
                let Some(path) = path else { continue };
                let score = target
                    .iter()
                    .zip(path.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                if best_score.is_none_or(|best| score >= best) {
                    best_score = Some(score);
                    best_index = index;
                }
            }
            OpError::at(best_index, violation.path, violation.message)
        })
        .collect()
}

/// Apply raw ops with strict coercion and per-op validation.
pub fn apply_widget_ops(data: &Node, ops: &[Node], controls: &[CompiledControl]) -> OpsResult {
    OpsEngine::new(controls).apply(data, ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::ControlOption;
    use rstest::rstest;
    use serde_json::json;

    fn control(path: &str, control_type: &str, kind: ControlKind) -> CompiledControl {
        CompiledControl::new("content", control_type, path, kind)
    }

    fn controls() -> Vec<CompiledControl> {
        let mut theme = control("appearance.theme", "dropdown-actions", ControlKind::Enum);
        theme.options = Some(vec![
            ControlOption { label: "Light".into(), value: "light".into() },
            ControlOption { label: "Dark".into(), value: "dark".into() },
        ]);
        let mut faqs = control("faqs", "object-manager", ControlKind::Array);
        faqs.item_id_path = Some("id".into());
        let mut columns = control("layout.columns", "slider", ControlKind::Number);
        columns.min = Some(1.0);
        columns.max = Some(4.0);
        vec![
            control("title", "textfield", ControlKind::String),
            control("showTitle", "toggle", ControlKind::Boolean),
            control("faqs.__idx__.question", "textfield", ControlKind::String),
            control("faqs.__idx__.id", "field", ControlKind::String),
            theme,
            faqs,
            columns,
        ]
    }

    fn data() -> Node {
        Node::from(json!({
            "title": "FAQ",
            "showTitle": true,
            "appearance": {"theme": "light"},
            "layout": {"columns": 2},
            "faqs": [
                {"id": "a", "question": "Why?"},
                {"id": "b", "question": "How?"}
            ]
        }))
    }

    fn apply(ops: serde_json::Value) -> OpsResult {
        let ops: Vec<Node> = ops.as_array().unwrap().iter().map(Node::from).collect();
        let controls = controls();
        OpsEngine::new(&controls).apply(&data(), &ops)
    }

    fn first_error(result: &OpsResult) -> (usize, String) {
        let error = &result.errors()[0];
        (error.op_index, error.message.clone())
    }

    #[test]
    fn test_set_applies_and_preserves_input() {
        let input = data();
        let controls = controls();
        let result = OpsEngine::new(&controls).apply_ops(
            &input,
            &[WidgetOp::set("title", "Questions"), WidgetOp::set("layout.columns", "3")],
        );
        let out = result.data().unwrap().to_value();
        assert_eq!(out["title"], json!("Questions"));
        assert_eq!(out["layout"]["columns"], json!(3));
        assert_eq!(input.to_value()["title"], json!("FAQ"));
        // Untouched subtree shared
        assert!(result.data().unwrap().get("faqs").unwrap().ptr_eq(input.get("faqs").unwrap()));
    }

    #[test]
    fn test_atomic_rejection_names_failing_op() {
        let result = apply(json!([
            {"op": "set", "path": "title", "value": "A"},
            {"op": "set", "path": "showTitle", "value": false},
            {"op": "set", "path": "layout.columns", "value": "many"}
        ]));
        assert!(!result.is_ok());
        assert_eq!(first_error(&result), (2, "Value must be a number".to_string()));
        assert_eq!(result.errors()[0].path.as_deref(), Some("layout.columns"));
    }

    #[test]
    fn test_enum_rejection_and_acceptance() {
        let rejected = apply(json!([{"op": "set", "path": "appearance.theme", "value": "not-a-real-theme"}]));
        assert_eq!(first_error(&rejected).1, "Value must be one of: light, dark");

        let accepted = apply(json!([{"op": "set", "path": "appearance.theme", "value": "dark"}]));
        assert_eq!(accepted.data().unwrap().to_value()["appearance"]["theme"], json!("dark"));
    }

    #[test]
    fn test_insert_duplicate_id_is_rejected_by_revalidation() {
        let result = apply(json!([
            {"op": "insert", "path": "faqs", "index": 2, "value": {"id": "a", "question": "Again?"}}
        ]));
        assert_eq!(first_error(&result), (0, "Duplicate \"id\" value \"a\"".to_string()));
        assert_eq!(result.errors()[0].path.as_deref(), Some("faqs"));
    }

    #[test]
    fn test_insert_remove_move() {
        let result = apply(json!([
            {"op": "insert", "path": "faqs", "index": 0, "value": {"id": "c", "question": "What?"}},
            {"op": "move", "path": "faqs", "from": 0, "to": 2},
            {"op": "remove", "path": "faqs", "index": 0}
        ]));
        let faqs = result.data().unwrap().to_value()["faqs"].clone();
        let ids: Vec<&str> = faqs.as_array().unwrap().iter().map(|f| f["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[rstest]
    #[case(json!([]), 0, "Ops must be a non-empty array")]
    #[case(json!([5]), 0, "Op must be an object")]
    #[case(json!([{"path": "title"}]), 0, "Missing op (expected 'set'|'insert'|'remove'|'move')")]
    #[case(json!([{"op": "set", "path": " "}]), 0, "Missing path")]
    #[case(json!([{"op": "set", "path": "__proto__.x", "value": 1}]), 0, "Path contains a prohibited segment")]
    #[case(json!([{"op": "set", "path": "secret", "value": 1}]), 0, "Path is not editable")]
    #[case(json!([{"op": "set", "path": "title"}]), 0, "Value cannot be undefined")]
    #[case(json!([{"op": "patch", "path": "title"}]), 0, "Unknown op \"patch\"")]
    #[case(json!([{"op": "insert", "path": "title", "index": 0, "value": "x"}]), 0, "Target must be an array control")]
    #[case(json!([{"op": "insert", "path": "faqs", "index": -1, "value": {}}]), 0, "index must be an integer >= 0")]
    #[case(json!([{"op": "insert", "path": "faqs", "index": 1.5, "value": {}}]), 0, "index must be an integer >= 0")]
    #[case(json!([{"op": "insert", "path": "faqs", "index": 3, "value": {"id": "z"}}]), 0, "index out of range (0..2)")]
    #[case(json!([{"op": "insert", "path": "faqs", "index": 0, "value": "x"}]), 0, "Inserted item must be an object with \"id\"")]
    #[case(json!([{"op": "insert", "path": "faqs", "index": 0, "value": {"id": ""}}]), 0, "Inserted item must include a non-empty \"id\"")]
    #[case(json!([{"op": "remove", "path": "faqs", "index": 2}]), 0, "index out of range (0..1)")]
    #[case(json!([{"op": "move", "path": "faqs", "from": 0, "to": 5}]), 0, "Indices out of range (0..1)")]
    #[case(json!([{"op": "move", "path": "faqs", "from": "0", "to": 1}]), 0, "from must be an integer >= 0")]
    #[case(json!([{"op": "set", "path": "faqs.3.question", "value": "x"}]), 0, "index out of range (0..2)")]
    #[case(json!([{"op": "set", "path": "faqs.100000000000000.question", "value": "x"}]), 0, "index out of range (0..2)")]
    #[case(json!([{"op": "set", "path": "layout.columns", "value": 9}]), 0, "Value must be <= 4")]
    #[case(json!([{"op": "set", "path": "faqs", "value": [{"id": "x"}, {"id": "x"}]}]), 0, "Duplicate \"id\" value \"x\"")]
    #[case(json!([{"op": "set", "path": "title", "value": "ok"}, {"op": "set", "path": "showTitle", "value": "yes"}]), 1, "Value must be a boolean")]
    fn test_rejections(#[case] ops: serde_json::Value, #[case] op_index: usize, #[case] message: &str) {
        let result = apply(ops);
        assert_eq!(first_error(&result), (op_index, message.to_string()));
    }

    #[rstest]
    #[case("tags.1.label", Some(json!([{"label": "a"}, {"label": "b"}])))]
    #[case("tags.2.label", None)]
    #[case("tags.100000000000000.label", None)]
    fn test_set_index_bound(#[case] path: &str, #[case] expected: Option<serde_json::Value>) {
        let controls = vec![control("tags.__idx__.label", "textfield", ControlKind::String)];
        let data = Node::from(json!({"tags": [{"label": "a"}]}));
        let result = OpsEngine::new(&controls).apply_ops(&data, &[WidgetOp::set(path, "b")]);
        match expected {
            Some(tags) => assert_eq!(result.data().unwrap().to_value()["tags"], tags),
            None => assert_eq!(first_error(&result), (0, "index out of range (0..1)".to_string())),
        }
    }

    #[test]
    fn test_move_on_empty_array() {
        let mut faqs = control("faqs", "repeater", ControlKind::Array);
        faqs.item_id_path = Some("id".into());
        let controls = vec![faqs];
        let data = Node::from(json!({"faqs": []}));
        let result = OpsEngine::new(&controls).apply_ops(&data, &[WidgetOp::move_item("faqs", 0, 0)]);
        assert_eq!(result.errors()[0].message, "Cannot move items in an empty array");
    }

    #[test]
    fn test_permissive_mode_accepts_boolean_tokens() {
        let controls = controls();
        let result = OpsEngine::new(&controls)
            .with_mode(CoercionMode::Permissive)
            .apply_ops(&data(), &[WidgetOp::set("showTitle", "off")]);
        assert_eq!(result.data().unwrap().to_value()["showTitle"], json!(false));
    }

    #[test]
    fn test_end_of_batch_allows_transient_invalid_state() {
        let controls = controls();
        let ops = [
            WidgetOp::insert("faqs", 2, Node::from(json!({"id": "a", "question": "Dup"}))),
            WidgetOp::set("faqs.2.id", "c"),
        ];
        let each_op = OpsEngine::new(&controls).apply_ops(&data(), &ops);
        assert!(!each_op.is_ok());

        let end_of_batch = OpsEngine::new(&controls)
            .with_validation(ValidationPolicy::EndOfBatch)
            .apply_ops(&data(), &ops);
        assert!(end_of_batch.is_ok());
    }

    #[test]
    fn test_end_of_batch_charges_closest_op() {
        let controls = controls();
        let ops = [
            WidgetOp::set("title", "x"),
            WidgetOp::insert("faqs", 0, Node::from(json!({"id": "b", "question": "Dup"}))),
        ];
        let result = OpsEngine::new(&controls)
            .with_validation(ValidationPolicy::EndOfBatch)
            .apply_ops(&data(), &ops);
        assert_eq!(first_error(&result), (1, "Duplicate \"id\" value \"b\"".to_string()));
    }

    #[test]
    fn test_size_custom_is_normalized_against_scale() {
        let controls = vec![control(
            "typography.roles.title.sizeCustom",
            "valuefield",
            ControlKind::String,
        )];
        let data = Node::from(json!({"typography": {
            "globalFamily": "Inter",
            "roles": {"title": {"family": "Inter", "weight": "700", "fontStyle": "normal", "sizeCustom": "24px"}},
            "roleScales": {"title": {"xs": "12px", "s": "14px", "m": "16px", "l": "20px", "xl": "28px"}}
        }}));
        let result = OpsEngine::new(&controls)
            .apply_ops(&data, &[WidgetOp::set("typography.roles.title.sizeCustom", " 30 ")]);
        assert_eq!(
            result.data().unwrap().to_value()["typography"]["roles"]["title"]["sizeCustom"],
            json!("30px")
        );
    }

    #[test]
    fn test_result_serialization() {
        let ok = OpsResult::Ok { data: Node::from(json!({"a": 1})) };
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!({"ok": true, "data": {"a": 1}}));

        let rejected = OpsResult::reject(OpError::new(0, "Ops must be a non-empty array"));
        assert_eq!(
            serde_json::to_value(&rejected).unwrap(),
            json!({"ok": false, "errors": [{"opIndex": 0, "message": "Ops must be a non-empty array"}]})
        );
    }

    #[test]
    fn test_widget_op_serde_shape() {
        let op: WidgetOp = serde_json::from_value(json!({"op": "move", "path": "faqs", "from": 1, "to": 0})).unwrap();
        assert_eq!(op, WidgetOp::move_item("faqs", 1, 0));
        assert_eq!(
            op.to_node().to_value(),
            json!({"op": "move", "path": "faqs", "from": 1, "to": 0})
        );
    }
}

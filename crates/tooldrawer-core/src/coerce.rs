//! Kind-driven value coercion
//!
//! Op payloads arrive as loose JSON. Before anything is written to the tree
//! the payload is coerced into a [`ControlValue`] whose variant matches the
//! governing control's [`ControlKind`], or rejected with a message naming the
//! expected shape.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::tree::{Node, NodeMap};
use crate::widget::{CompiledControl, ControlKind};

/// How loosely boolean payloads are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionMode {
    /// Booleans must already be booleans
    #[default]
    Strict,
    /// Booleans may also be `1`/`0` or `true/1/yes/on`, `false/0/no/off`
    Permissive,
}

/// A payload that has been checked against a control kind
#[derive(Debug, Clone, PartialEq)]
pub enum ControlValue {
    /// `boolean` kind
    Bool(bool),
    /// `number` kind; always finite
    Number(f64),
    /// `string` kind
    Str(String),
    /// `enum` kind; one of the allowed values
    Enum(String),
    /// `color` kind; trimmed and non-empty
    Color(String),
    /// `json` kind
    Json(Node),
    /// `array` kind
    Array(Arc<Vec<Node>>),
    /// `object` kind
    Object(Arc<NodeMap>),
}

impl ControlValue {
    /// Kind this value satisfies
    pub fn kind(&self) -> ControlKind {
        match self {
            ControlValue::Bool(_) => ControlKind::Boolean,
            ControlValue::Number(_) => ControlKind::Number,
            ControlValue::Str(_) => ControlKind::String,
            ControlValue::Enum(_) => ControlKind::Enum,
            ControlValue::Color(_) => ControlKind::Color,
            ControlValue::Json(_) => ControlKind::Json,
            ControlValue::Array(_) => ControlKind::Array,
            ControlValue::Object(_) => ControlKind::Object,
        }
    }

    /// String payload of string-like variants
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ControlValue::Str(s) | ControlValue::Enum(s) | ControlValue::Color(s) => Some(s),
            _ => None,
        }
    }

    /// Convert back into a tree node
    pub fn into_node(self) -> Node {
        match self {
            ControlValue::Bool(b) => Node::Bool(b),
            ControlValue::Number(n) => Node::from_f64(n),
            ControlValue::Str(s) | ControlValue::Enum(s) | ControlValue::Color(s) => Node::String(s),
            ControlValue::Json(node) => node,
            ControlValue::Array(items) => Node::Array(items),
            ControlValue::Object(map) => Node::Object(map),
        }
    }
}

fn parse_boolean(value: &Node) -> Option<bool> {
    match value {
        Node::Bool(b) => Some(*b),
        Node::Number(_) => match value.as_f64() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        Node::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_number(value: &Node) -> Option<f64> {
    let n = match value {
        Node::Number(_) => value.as_f64()?,
        Node::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn parse_json_text(text: &str) -> Option<Node> {
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .map(Node::from)
}

/// Coerce `raw` to the kind of `control`.
///
/// The error string is the user-facing rejection message.
pub fn coerce_value(
    control: &CompiledControl,
    raw: &Node,
    mode: CoercionMode,
) -> Result<ControlValue, String> {
    match control.kind {
        ControlKind::Boolean => {
            let parsed = match mode {
                CoercionMode::Strict => raw.as_bool(),
                CoercionMode::Permissive => parse_boolean(raw),
            };
            parsed
                .map(ControlValue::Bool)
                .ok_or_else(|| "Value must be a boolean".to_string())
        }

        ControlKind::Number => parse_number(raw)
            .map(ControlValue::Number)
            .ok_or_else(|| "Value must be a number".to_string()),

        ControlKind::Enum => {
            let Node::String(s) = raw else {
                return Err("Value must be a string".to_string());
            };
            let value = s.trim();
            if value.is_empty() {
                return Err("Value cannot be empty".to_string());
            }
            let Some(allowed) = control.allowed_values() else {
                return Err("Control is missing enum values".to_string());
            };
            if !allowed.contains(&value) {
                return Err(format!("Value must be one of: {}", allowed.join(", ")));
            }
            Ok(ControlValue::Enum(value.to_string()))
        }

        ControlKind::Json => match raw {
            Node::Null => Err("Value is required".to_string()),
            Node::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err("Value cannot be empty JSON".to_string());
                }
                parse_json_text(trimmed)
                    .map(ControlValue::Json)
                    .ok_or_else(|| "Invalid JSON".to_string())
            }
            other => Ok(ControlValue::Json(other.clone())),
        },

        ControlKind::Array => match raw {
            Node::Null => Err("Value is required".to_string()),
            Node::Array(items) => Ok(ControlValue::Array(Arc::clone(items))),
            Node::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err("Value cannot be empty JSON array".to_string());
                }
                match parse_json_text(trimmed) {
                    Some(Node::Array(items)) => Ok(ControlValue::Array(items)),
                    Some(_) => Err("Expected a JSON array".to_string()),
                    None => Err("Invalid JSON array".to_string()),
                }
            }
            _ => Err("Value must be an array".to_string()),
        },

        ControlKind::Object => match raw {
            Node::Null => Err("Value is required".to_string()),
            Node::Object(map) => Ok(ControlValue::Object(Arc::clone(map))),
            Node::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err("Value cannot be empty JSON object".to_string());
                }
                match parse_json_text(trimmed) {
                    Some(Node::Object(map)) => Ok(ControlValue::Object(map)),
                    Some(_) => Err("Expected a JSON object".to_string()),
                    None => Err("Invalid JSON object".to_string()),
                }
            }
            _ => Err("Value must be an object".to_string()),
        },

        ControlKind::Color => match raw {
            Node::Null => Err("Value is required".to_string()),
            Node::String(s) if s.trim().is_empty() => Err("Value cannot be empty".to_string()),
            Node::String(s) => Ok(ControlValue::Color(s.trim().to_string())),
            _ => Err("Value must be a string".to_string()),
        },

        ControlKind::String => match raw {
            Node::Null => Err("Value is required".to_string()),
            Node::String(s) => Ok(ControlValue::Str(s.clone())),
            _ => Err("Value must be a string".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::ControlOption;
    use rstest::rstest;
    use serde_json::json;

    fn control(kind: ControlKind) -> CompiledControl {
        CompiledControl::new("content", "textfield", "value", kind)
    }

    fn coerce(kind: ControlKind, raw: serde_json::Value, mode: CoercionMode) -> Result<serde_json::Value, String> {
        coerce_value(&control(kind), &Node::from(raw), mode).map(|v| v.into_node().to_value())
    }

    #[rstest]
    #[case(json!(true), CoercionMode::Strict, Ok(json!(true)))]
    #[case(json!("true"), CoercionMode::Strict, Err("Value must be a boolean"))]
    #[case(json!("yes"), CoercionMode::Permissive, Ok(json!(true)))]
    #[case(json!(" OFF "), CoercionMode::Permissive, Ok(json!(false)))]
    #[case(json!(1), CoercionMode::Permissive, Ok(json!(true)))]
    #[case(json!(2), CoercionMode::Permissive, Err("Value must be a boolean"))]
    #[case(json!(""), CoercionMode::Permissive, Err("Value must be a boolean"))]
    fn test_boolean(
        #[case] raw: serde_json::Value,
        #[case] mode: CoercionMode,
        #[case] expected: Result<serde_json::Value, &str>,
    ) {
        assert_eq!(coerce(ControlKind::Boolean, raw, mode), expected.map_err(str::to_string));
    }

    #[rstest]
    #[case(json!(3), Ok(json!(3)))]
    #[case(json!(" 2.5 "), Ok(json!(2.5)))]
    #[case(json!("12"), Ok(json!(12)))]
    #[case(json!("abc"), Err("Value must be a number"))]
    #[case(json!(""), Err("Value must be a number"))]
    #[case(json!(null), Err("Value must be a number"))]
    #[case(json!("inf"), Err("Value must be a number"))]
    fn test_number(#[case] raw: serde_json::Value, #[case] expected: Result<serde_json::Value, &str>) {
        assert_eq!(
            coerce(ControlKind::Number, raw, CoercionMode::Strict),
            expected.map_err(str::to_string)
        );
    }

    #[test]
    fn test_enum() {
        let mut theme = control(ControlKind::Enum);
        theme.options = Some(vec![
            ControlOption { label: "Light".into(), value: "light".into() },
            ControlOption { label: "Dark".into(), value: "dark".into() },
        ]);
        let strict = CoercionMode::Strict;
        assert_eq!(
            coerce_value(&theme, &Node::from(" dark "), strict),
            Ok(ControlValue::Enum("dark".into()))
        );
        assert_eq!(
            coerce_value(&theme, &Node::from("not-a-real-theme"), strict),
            Err("Value must be one of: light, dark".to_string())
        );
        assert_eq!(
            coerce_value(&theme, &Node::from("  "), strict),
            Err("Value cannot be empty".to_string())
        );
        assert_eq!(
            coerce_value(&theme, &Node::from(1_i64), strict),
            Err("Value must be a string".to_string())
        );
        assert_eq!(
            coerce_value(&control(ControlKind::Enum), &Node::from("x"), strict),
            Err("Control is missing enum values".to_string())
        );
    }

    #[rstest]
    #[case(ControlKind::Json, json!("{\"a\":1}"), Ok(json!({"a": 1})))]
    #[case(ControlKind::Json, json!(5), Ok(json!(5)))]
    #[case(ControlKind::Json, json!("{oops"), Err("Invalid JSON"))]
    #[case(ControlKind::Json, json!(" "), Err("Value cannot be empty JSON"))]
    #[case(ControlKind::Json, json!(null), Err("Value is required"))]
    #[case(ControlKind::Array, json!("[1,2]"), Ok(json!([1, 2])))]
    #[case(ControlKind::Array, json!("{}"), Err("Expected a JSON array"))]
    #[case(ControlKind::Array, json!("[1,"), Err("Invalid JSON array"))]
    #[case(ControlKind::Array, json!({}), Err("Value must be an array"))]
    #[case(ControlKind::Object, json!("{\"k\":true}"), Ok(json!({"k": true})))]
    #[case(ControlKind::Object, json!("[]"), Err("Expected a JSON object"))]
    #[case(ControlKind::Object, json!(""), Err("Value cannot be empty JSON object"))]
    #[case(ControlKind::Object, json!([1]), Err("Value must be an object"))]
    #[case(ControlKind::Color, json!("  #fff "), Ok(json!("#fff")))]
    #[case(ControlKind::Color, json!(""), Err("Value cannot be empty"))]
    #[case(ControlKind::Color, json!(3), Err("Value must be a string"))]
    #[case(ControlKind::String, json!(" keep "), Ok(json!(" keep ")))]
    #[case(ControlKind::String, json!(null), Err("Value is required"))]
    #[case(ControlKind::String, json!(false), Err("Value must be a string"))]
    fn test_structured_kinds(
        #[case] kind: ControlKind,
        #[case] raw: serde_json::Value,
        #[case] expected: Result<serde_json::Value, &str>,
    ) {
        assert_eq!(coerce(kind, raw, CoercionMode::Strict), expected.map_err(str::to_string));
    }

    #[test]
    fn test_array_payload_is_shared_not_copied() {
        let raw = Node::from(json!([{"id": "a"}]));
        let value = coerce_value(&control(ControlKind::Array), &raw, CoercionMode::Strict).unwrap();
        assert_eq!(value.kind(), ControlKind::Array);
        assert!(value.into_node().ptr_eq(&raw));
    }
}

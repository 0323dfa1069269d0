//! Whole-tree validation
//!
//! Every compiled control is checked against the instance data: the path
//! must resolve (wildcard segments fan out over array elements) and the
//! value found must satisfy the control's kind, bounds and item-id rules.
//! Typography cross-field rules run afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::css::{is_css_background, is_css_color};
use crate::paths::is_wildcard_segment;
use crate::tree::{Node, format_number};
use crate::typography::validate_typography;
use crate::widget::{CompiledControl, ControlKind};

/// One validation failure, at a concrete path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataViolation {
    /// Concrete dot-path (wildcards resolved to indices)
    pub path: String,
    /// User-facing message
    pub message: String,
}

/// Check `value` against the control's `min`/`max`.
pub fn validate_number_constraints(control: &CompiledControl, value: f64) -> Option<String> {
    if let Some(min) = control.min
        && value < min
    {
        return Some(format!("Value must be >= {}", format_number(min)));
    }
    if let Some(max) = control.max
        && value > max
    {
        return Some(format!("Value must be <= {}", format_number(max)));
    }
    None
}

/// Check the per-item ids of an `item_id_path` array.
///
/// Controls without `item_id_path` accept anything.
pub fn validate_array_item_ids(control: &CompiledControl, value: &Node) -> Option<String> {
    let id_key = control.item_id_path.as_deref()?;
    let Some(items) = value.as_array() else {
        return Some("Value must be an array".to_string());
    };

    let mut seen = HashSet::new();
    for item in items {
        if !item.is_object() {
            return Some(format!("Array items must be objects with \"{id_key}\""));
        }
        let Some(id) = item
            .get(id_key)
            .and_then(Node::as_str)
            .filter(|id| !id.trim().is_empty())
        else {
            return Some(format!("Array items must include a non-empty \"{id_key}\""));
        };
        if !seen.insert(id) {
            return Some(format!("Duplicate \"{id_key}\" value \"{id}\""));
        }
    }
    None
}

/// Check one resolved value against its control. `None` means the path
/// held no value.
pub fn validate_control_value(control: &CompiledControl, value: Option<&Node>) -> Option<String> {
    let Some(value) = value else {
        return Some("Missing required value".to_string());
    };

    match control.kind {
        ControlKind::Boolean => (!matches!(value, Node::Bool(_)))
            .then(|| "Value must be a boolean".to_string()),

        ControlKind::Number => match value.as_f64().filter(|n| n.is_finite()) {
            Some(n) => validate_number_constraints(control, n),
            None => Some("Value must be a finite number".to_string()),
        },

        ControlKind::String => value
            .as_str()
            .is_none()
            .then(|| "Value must be a string".to_string()),

        ControlKind::Enum => {
            let Some(s) = value.as_str() else {
                return Some("Value must be a string".to_string());
            };
            let Some(allowed) = control.allowed_values() else {
                return Some("Control is missing enum values".to_string());
            };
            (!allowed.contains(&s)).then(|| format!("Value must be one of: {}", allowed.join(", ")))
        }

        ControlKind::Color => {
            let Some(s) = value.as_str() else {
                return Some("Value must be a string".to_string());
            };
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Some("Missing required value".to_string());
            }
            if control.allow_image == Some(true) {
                (!is_css_background(trimmed))
                    .then(|| "Value must be a valid CSS background".to_string())
            } else {
                (!is_css_color(trimmed)).then(|| "Value must be a valid CSS color".to_string())
            }
        }

        ControlKind::Array => {
            if !value.is_array() {
                return Some("Value must be an array".to_string());
            }
            validate_array_item_ids(control, value)
        }

        ControlKind::Object => (!value.is_object()).then(|| "Value must be an object".to_string()),

        ControlKind::Json => None,
    }
}

/// Walk `control.path` through `data`, fanning out at wildcards.
fn validate_control_in_data(control: &CompiledControl, data: &Node, errors: &mut Vec<DataViolation>) {
    let segments: Vec<&str> = control.path.split('.').filter(|s| !s.is_empty()).collect();
    let mut trail = Vec::new();
    walk(control, &segments, Some(data), &mut trail, errors);
}

fn walk(
    control: &CompiledControl,
    segments: &[&str],
    current: Option<&Node>,
    trail: &mut Vec<String>,
    errors: &mut Vec<DataViolation>,
) {
    let Some((segment, rest)) = segments.split_first() else {
        if let Some(message) = validate_control_value(control, current) {
            errors.push(DataViolation {
                path: trail.join("."),
                message,
            });
        }
        return;
    };

    if is_wildcard_segment(segment) {
        let Some(items) = current.and_then(Node::as_array) else {
            errors.push(DataViolation {
                path: trail.join("."),
                message: "Expected an array".to_string(),
            });
            return;
        };
        for (index, item) in items.iter().enumerate() {
            trail.push(index.to_string());
            walk(control, rest, Some(item), trail, errors);
            trail.pop();
        }
        return;
    }

    let Some(object) = current.filter(|node| node.is_object()) else {
        errors.push(DataViolation {
            path: trail.join("."),
            message: format!("Expected an object to resolve \"{segment}\""),
        });
        return;
    };
    trail.push(segment.to_string());
    walk(control, rest, object.get(segment), trail, errors);
    trail.pop();
}

/// Validate the whole tree against every control plus the typography
/// cross-field rules. An empty result means the tree is valid.
pub fn validate_widget_data(data: &Node, controls: &[CompiledControl]) -> Vec<DataViolation> {
    let mut errors = Vec::new();
    for control in controls {
        validate_control_in_data(control, data, &mut errors);
    }
    validate_typography(data, &mut errors);
    errors
}

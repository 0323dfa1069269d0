//! Typography catalogue and cross-field checks
//!
//! Widgets with a `typography` block pick fonts from a curated Google Fonts
//! catalogue. Allowed weights and styles come from each family's axis spec,
//! and each role's size scale must be uniformly numeric or uniformly CSS
//! lengths.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::css::{is_css_length, is_numeric_string};
use crate::paths::get_at;
use crate::tree::Node;
use crate::validate::DataViolation;
use crate::widget::ControlOption;

/// Family name to Google Fonts axis spec
pub const FONT_SPECS: [(&str, &str); 18] = [
    ("Cookie", "Cookie"),
    ("Cormorant Garamond", "Cormorant+Garamond:ital,wght@0,300..700;1,300..700"),
    ("Crimson Text", "Crimson+Text:ital,wght@0,400;0,600;0,700;1,400;1,600;1,700"),
    ("Gabriela", "Gabriela"),
    ("Homemade Apple", "Homemade+Apple"),
    ("Inter", "Inter:ital,opsz,wght@0,14..32,100..900;1,14..32,100..900"),
    (
        "Lato",
        "Lato:ital,wght@0,100;0,300;0,400;0,700;0,900;1,100;1,300;1,400;1,700;1,900",
    ),
    ("Libre Baskerville", "Libre+Baskerville:ital,wght@0,400..700;1,400..700"),
    ("Lora", "Lora:ital,wght@0,400..700;1,400..700"),
    ("Manrope", "Manrope:wght@200..800"),
    ("Michroma", "Michroma"),
    ("Montserrat", "Montserrat:ital,wght@0,100..900;1,100..900"),
    ("Open Sans", "Open+Sans:ital,wght@0,300..800;1,300..800"),
    ("Permanent Marker", "Permanent+Marker"),
    ("Playfair Display", "Playfair+Display:ital,wght@0,400..900;1,400..900"),
    ("Raleway", "Raleway:ital,wght@0,100..900;1,100..900"),
    ("Roboto", "Roboto:ital,wght@0,100..900;1,100..900"),
    ("Shadows Into Light", "Shadows+Into+Light"),
];

/// Size buckets every role scale defines
pub const SCALE_KEYS: [&str; 5] = ["xs", "s", "m", "l", "xl"];

const WEIGHT_LABELS: [(&str, &str); 9] = [
    ("100", "Thin"),
    ("200", "Extra light"),
    ("300", "Light"),
    ("400", "Regular"),
    ("500", "Medium"),
    ("600", "Semi-bold"),
    ("700", "Bold"),
    ("800", "Extra bold"),
    ("900", "Black"),
];

static WEIGHT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\.\.(\d+)").expect("valid weight range regex"));

static CSS_CUSTOM_PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^--[a-z0-9-]+$").expect("valid custom property regex"));

fn font_spec(family: &str) -> Option<&'static str> {
    FONT_SPECS
        .iter()
        .find(|(name, _)| *name == family)
        .map(|(_, spec)| *spec)
}

/// Whether `family` is in the catalogue
pub fn is_known_family(family: &str) -> bool {
    font_spec(family).is_some()
}

/// Parse the weights a Google Fonts spec serves, sorted ascending.
///
/// Ranges expand in steps of 100; a spec without a `wght` axis serves 400.
pub fn parse_font_weights(spec: &str) -> Vec<String> {
    let Some(idx) = spec.find("wght@") else {
        return vec!["400".to_string()];
    };
    let mut weights = BTreeSet::new();
    for token in spec[idx + "wght@".len()..]
        .split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let last = token.rsplit(',').next().unwrap_or_default();
        if let Some(caps) = WEIGHT_RANGE.captures(last) {
            let bounds = (caps[1].parse::<u32>(), caps[2].parse::<u32>());
            if let (Ok(a), Ok(b)) = bounds {
                let start = a.min(b).div_ceil(100) * 100;
                let end = a.max(b) / 100 * 100;
                weights.extend((start..=end).step_by(100));
            }
            continue;
        }
        if let Ok(weight) = last.trim().parse::<u32>() {
            weights.insert(weight);
        }
    }
    if weights.is_empty() {
        return vec!["400".to_string()];
    }
    weights.into_iter().map(|w| w.to_string()).collect()
}

/// Weights allowed for `family`; empty for unknown families.
pub fn allowed_weights(family: &str) -> Vec<String> {
    font_spec(family).map(parse_font_weights).unwrap_or_default()
}

/// Font styles allowed for `family`; empty for unknown families.
pub fn allowed_styles(family: &str) -> Vec<&'static str> {
    match font_spec(family) {
        Some(spec) if spec.contains("ital,") || spec.contains("ital@") => vec!["normal", "italic"],
        Some(_) => vec!["normal"],
        None => vec![],
    }
}

/// `{label, value}` options for a list of weights (`"Bold (700)"`).
pub fn weight_options(weights: &[String]) -> Vec<ControlOption> {
    weights
        .iter()
        .map(|w| {
            let label = WEIGHT_LABELS
                .iter()
                .find(|(value, _)| value == w)
                .map_or_else(|| w.clone(), |(_, name)| format!("{name} ({w})"));
            ControlOption {
                label,
                value: w.clone(),
            }
        })
        .collect()
}

/// Options covering every weight any catalogue family serves
pub fn all_weight_options() -> Vec<ControlOption> {
    let weights: BTreeSet<u32> = FONT_SPECS
        .iter()
        .flat_map(|(_, spec)| parse_font_weights(spec))
        .filter_map(|w| w.parse().ok())
        .collect();
    let weights: Vec<String> = weights.into_iter().map(|w| w.to_string()).collect();
    weight_options(&weights)
}

/// Value kind of a role's size scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleScaleKind {
    /// Unitless numbers (`"110"`)
    Number,
    /// CSS lengths (`"24px"`, `"var(--fs-24)"`)
    CssLength,
}

fn infer_scale_kind(scale: &Node) -> Option<RoleScaleKind> {
    let mut numeric = 0;
    let mut lengths = 0;
    for key in SCALE_KEYS {
        let value = scale.get(key)?.as_str()?.trim();
        if is_numeric_string(value) {
            numeric += 1;
        } else if is_css_length(value) {
            lengths += 1;
        } else {
            return None;
        }
    }
    if numeric == SCALE_KEYS.len() {
        Some(RoleScaleKind::Number)
    } else if lengths == SCALE_KEYS.len() {
        Some(RoleScaleKind::CssLength)
    } else {
        None
    }
}

/// Scale kind of `typography.roleScales.<role>`, if uniform.
pub fn role_scale_kind(data: &Node, role: &str) -> Option<RoleScaleKind> {
    get_at(data, &format!("typography.roleScales.{role}"))
        .filter(|scale| scale.is_object())
        .and_then(infer_scale_kind)
}

/// Normalize a custom size string against the role's scale kind:
/// CSS-length scales get `px` on bare numbers and `var()` around custom
/// properties; numeric scales lose a trailing `%`.
pub fn normalize_size_custom(value: &str, kind: Option<RoleScaleKind>) -> String {
    let trimmed = value.trim();
    match kind {
        Some(RoleScaleKind::CssLength) if is_numeric_string(trimmed) => format!("{trimmed}px"),
        Some(RoleScaleKind::CssLength) if CSS_CUSTOM_PROPERTY.is_match(trimmed) => {
            format!("var({trimmed})")
        }
        Some(RoleScaleKind::Number) => match trimmed.strip_suffix('%').map(str::trim) {
            Some(number) if is_numeric_string(number) => number.to_string(),
            _ => trimmed.to_string(),
        },
        _ => trimmed.to_string(),
    }
}

fn non_blank(node: Option<&Node>) -> Option<&str> {
    node.and_then(Node::as_str).filter(|s| !s.trim().is_empty())
}

fn violation(errors: &mut Vec<DataViolation>, path: impl Into<String>, message: impl Into<String>) {
    errors.push(DataViolation {
        path: path.into(),
        message: message.into(),
    });
}

fn check_role_scales(typography: &Node, errors: &mut Vec<DataViolation>) {
    let Some(roles) = typography.get("roles").and_then(Node::as_object) else {
        return;
    };
    let Some(role_scales) = typography.get("roleScales").filter(|n| n.is_object()) else {
        violation(errors, "typography.roleScales", "Expected an object");
        return;
    };

    for (role_key, role) in roles.iter().filter(|(_, role)| role.is_object()) {
        let Some(scale) = role_scales.get(role_key).filter(|n| n.is_object()) else {
            violation(errors, format!("typography.roleScales.{role_key}"), "Expected an object");
            continue;
        };

        for key in SCALE_KEYS {
            if non_blank(scale.get(key)).is_none() {
                violation(
                    errors,
                    format!("typography.roleScales.{role_key}.{key}"),
                    "Missing required value",
                );
            }
        }

        let kind = infer_scale_kind(scale);
        if kind.is_none() {
            violation(
                errors,
                format!("typography.roleScales.{role_key}"),
                "Role scale must be all numbers or all CSS lengths",
            );
        }

        let size_path = format!("typography.roles.{role_key}.sizeCustom");
        match (non_blank(role.get("sizeCustom")), kind) {
            (None, _) => violation(errors, size_path, "Missing required value"),
            (Some(size), Some(RoleScaleKind::Number)) if !is_numeric_string(size) => violation(
                errors,
                size_path,
                "Custom size must be a number (no units), e.g. \"110\"",
            ),
            (Some(size), Some(RoleScaleKind::CssLength)) if !is_css_length(size) => violation(
                errors,
                size_path,
                "Custom size must be a CSS length, e.g. \"24px\" or \"var(--fs-24)\"",
            ),
            _ => {}
        }
    }
}

fn check_fonts(typography: &Node, errors: &mut Vec<DataViolation>) {
    match non_blank(typography.get("globalFamily")) {
        None => violation(errors, "typography.globalFamily", "Missing required value"),
        Some(family) if !is_known_family(family) => violation(
            errors,
            "typography.globalFamily",
            format!("Unknown font family \"{family}\""),
        ),
        Some(_) => {}
    }

    let Some(roles) = typography.get("roles").and_then(Node::as_object) else {
        return;
    };
    for (role_key, role) in roles.iter().filter(|(_, role)| role.is_object()) {
        let at = |field: &str| format!("typography.roles.{role_key}.{field}");

        let Some(family) = non_blank(role.get("family")) else {
            violation(errors, at("family"), "Missing required value");
            continue;
        };
        if !is_known_family(family) {
            violation(errors, at("family"), format!("Unknown font family \"{family}\""));
            continue;
        }

        let Some(weight) = non_blank(role.get("weight")) else {
            violation(errors, at("weight"), "Missing required value");
            continue;
        };
        let weights = allowed_weights(family);
        if !weights.iter().any(|w| w == weight) {
            violation(
                errors,
                at("weight"),
                format!("Value must be one of: {}", weights.join(", ")),
            );
        }

        let Some(style) = non_blank(role.get("fontStyle")) else {
            violation(errors, at("fontStyle"), "Missing required value");
            continue;
        };
        let styles = allowed_styles(family);
        if !styles.iter().any(|s| *s == style) {
            violation(
                errors,
                at("fontStyle"),
                format!("Value must be one of: {}", styles.join(", ")),
            );
        }
    }
}

/// Append typography violations for `data`. A tree without a `typography`
/// object has none.
pub fn validate_typography(data: &Node, errors: &mut Vec<DataViolation>) {
    let Some(typography) = data.get("typography").filter(|n| n.is_object()) else {
        return;
    };
    check_role_scales(typography, errors);
    check_fonts(typography, errors);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("Cookie", vec!["400"])]
    #[case("Manrope", vec!["200", "300", "400", "500", "600", "700", "800"])]
    #[case("Crimson Text", vec!["400", "600", "700"])]
    #[case("Lato", vec!["100", "300", "400", "700", "900"])]
    #[case("Unknown", vec![])]
    fn test_allowed_weights(#[case] family: &str, #[case] expected: Vec<&str>) {
        assert_eq!(allowed_weights(family), expected);
    }

    #[test]
    fn test_inter_range_ignores_optical_size_axis() {
        assert_eq!(allowed_weights("Inter").len(), 9);
        assert_eq!(allowed_weights("Inter")[0], "100");
    }

    #[rstest]
    #[case("Roboto", vec!["normal", "italic"])]
    #[case("Manrope", vec!["normal"])]
    #[case("Cookie", vec!["normal"])]
    fn test_allowed_styles(#[case] family: &str, #[case] expected: Vec<&str>) {
        assert_eq!(allowed_styles(family), expected);
    }

    #[test]
    fn test_weight_options_labels() {
        let options = weight_options(&["700".to_string(), "450".to_string()]);
        assert_eq!(options[0].label, "Bold (700)");
        assert_eq!(options[1].label, "450");
        assert_eq!(all_weight_options().len(), 9);
    }

    #[rstest]
    #[case("24", Some(RoleScaleKind::CssLength), "24px")]
    #[case(" --fs-24 ", Some(RoleScaleKind::CssLength), "var(--fs-24)")]
    #[case("1.5rem", Some(RoleScaleKind::CssLength), "1.5rem")]
    #[case("110%", Some(RoleScaleKind::Number), "110")]
    #[case("abc%", Some(RoleScaleKind::Number), "abc%")]
    #[case(" 24 ", None, "24")]
    fn test_normalize_size_custom(
        #[case] value: &str,
        #[case] kind: Option<RoleScaleKind>,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_size_custom(value, kind), expected);
    }

    fn typography(role: serde_json::Value, scale: serde_json::Value) -> Node {
        Node::from(json!({
            "typography": {
                "globalFamily": "Inter",
                "roles": {"title": role},
                "roleScales": {"title": scale}
            }
        }))
    }

    fn messages(data: &Node) -> Vec<(String, String)> {
        let mut errors = Vec::new();
        validate_typography(data, &mut errors);
        errors.into_iter().map(|e| (e.path, e.message)).collect()
    }

    #[test]
    fn test_valid_typography_has_no_violations() {
        let data = typography(
            json!({"family": "Roboto", "weight": "700", "fontStyle": "italic", "sizeCustom": "24px"}),
            json!({"xs": "12px", "s": "14px", "m": "16px", "l": "20px", "xl": "var(--fs-32)"}),
        );
        assert!(role_scale_kind(&data, "title") == Some(RoleScaleKind::CssLength));
        assert!(messages(&data).is_empty());
    }

    #[test]
    fn test_mixed_scale_is_rejected() {
        let data = typography(
            json!({"family": "Roboto", "weight": "700", "fontStyle": "normal", "sizeCustom": "24"}),
            json!({"xs": "80", "s": "90", "m": "100", "l": "20px", "xl": "140"}),
        );
        assert_eq!(
            messages(&data),
            vec![(
                "typography.roleScales.title".to_string(),
                "Role scale must be all numbers or all CSS lengths".to_string()
            )]
        );
    }

    #[test]
    fn test_size_custom_must_match_scale_kind() {
        let data = typography(
            json!({"family": "Roboto", "weight": "700", "fontStyle": "normal", "sizeCustom": "24px"}),
            json!({"xs": "80", "s": "90", "m": "100", "l": "120", "xl": "140"}),
        );
        assert_eq!(
            messages(&data)[0].1,
            "Custom size must be a number (no units), e.g. \"110\""
        );
    }

    #[test]
    fn test_weight_and_style_must_suit_family() {
        let data = typography(
            json!({"family": "Manrope", "weight": "900", "fontStyle": "italic", "sizeCustom": "100"}),
            json!({"xs": "80", "s": "90", "m": "100", "l": "120", "xl": "140"}),
        );
        let errors = messages(&data);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].0, "typography.roles.title.weight");
        assert_eq!(errors[0].1, "Value must be one of: 200, 300, 400, 500, 600, 700, 800");
        assert_eq!(errors[1].0, "typography.roles.title.fontStyle");
        assert_eq!(errors[1].1, "Value must be one of: normal");
    }

    #[test]
    fn test_unknown_global_family() {
        let data = Node::from(json!({"typography": {"globalFamily": "Comic Sans"}}));
        assert_eq!(
            messages(&data),
            vec![(
                "typography.globalFamily".to_string(),
                "Unknown font family \"Comic Sans\"".to_string()
            )]
        );
    }

    #[test]
    fn test_missing_role_scales_object() {
        let data = Node::from(json!({"typography": {
            "globalFamily": "Inter",
            "roles": {"title": {"family": "Inter", "weight": "400", "fontStyle": "normal"}}
        }}));
        assert_eq!(messages(&data)[0], ("typography.roleScales".to_string(), "Expected an object".to_string()));
    }
}

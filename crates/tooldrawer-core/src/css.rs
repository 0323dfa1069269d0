//! Lightweight CSS value checks
//!
//! These are syntactic checks, not a CSS parser: they accept the value
//! shapes the editor produces (hex, functional colours, named colours,
//! custom properties, gradients, image URLs and background shorthands) and
//! reject obvious garbage.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("valid numeric regex"));

static CSS_LENGTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d+(?:\.\d+)?(px|rem|em|%|vh|vw|vmin|vmax|ch|ex|cm|mm|in|pt|pc)$")
        .expect("valid length regex")
});

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#(?:[0-9a-f]{3,4}|[0-9a-f]{6}|[0-9a-f]{8})$").expect("valid hex regex")
});

static COLOR_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:rgba?|hsla?|hwb|lab|lch|oklab|oklch|color|color-mix|light-dark)\(.+\)$")
        .expect("valid color function regex")
});

static VAR_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^var\(\s*--[A-Za-z0-9_-]+\s*(?:,.*)?\)$").expect("valid var regex")
});

static IMAGE_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:repeating-)?(?:linear|radial|conic)-gradient|url|image-set|-webkit-image-set|image|cross-fade|element)\(.*\)$",
    )
    .expect("valid image function regex")
});

const GLOBAL_KEYWORDS: [&str; 5] = ["inherit", "initial", "unset", "revert", "revert-layer"];

const BACKGROUND_KEYWORDS: [&str; 23] = [
    "none", "repeat", "no-repeat", "repeat-x", "repeat-y", "space", "round", "center", "top",
    "bottom", "left", "right", "cover", "contain", "auto", "fixed", "scroll", "local",
    "border-box", "padding-box", "content-box", "text", "/",
];

const NAMED_COLORS: [&str; 148] = [
    "aliceblue", "antiquewhite", "aqua", "aquamarine", "azure", "beige", "bisque", "black",
    "blanchedalmond", "blue", "blueviolet", "brown", "burlywood", "cadetblue", "chartreuse",
    "chocolate", "coral", "cornflowerblue", "cornsilk", "crimson", "cyan", "darkblue", "darkcyan",
    "darkgoldenrod", "darkgray", "darkgreen", "darkgrey", "darkkhaki", "darkmagenta",
    "darkolivegreen", "darkorange", "darkorchid", "darkred", "darksalmon", "darkseagreen",
    "darkslateblue", "darkslategray", "darkslategrey", "darkturquoise", "darkviolet", "deeppink",
    "deepskyblue", "dimgray", "dimgrey", "dodgerblue", "firebrick", "floralwhite", "forestgreen",
    "fuchsia", "gainsboro", "ghostwhite", "gold", "goldenrod", "gray", "green", "greenyellow",
    "grey", "honeydew", "hotpink", "indianred", "indigo", "ivory", "khaki", "lavender",
    "lavenderblush", "lawngreen", "lemonchiffon", "lightblue", "lightcoral", "lightcyan",
    "lightgoldenrodyellow", "lightgray", "lightgreen", "lightgrey", "lightpink", "lightsalmon",
    "lightseagreen", "lightskyblue", "lightslategray", "lightslategrey", "lightsteelblue",
    "lightyellow", "lime", "limegreen", "linen", "magenta", "maroon", "mediumaquamarine",
    "mediumblue", "mediumorchid", "mediumpurple", "mediumseagreen", "mediumslateblue",
    "mediumspringgreen", "mediumturquoise", "mediumvioletred", "midnightblue", "mintcream",
    "mistyrose", "moccasin", "navajowhite", "navy", "oldlace", "olive", "olivedrab", "orange",
    "orangered", "orchid", "palegoldenrod", "palegreen", "paleturquoise", "palevioletred",
    "papayawhip", "peachpuff", "peru", "pink", "plum", "powderblue", "purple", "rebeccapurple",
    "red", "rosybrown", "royalblue", "saddlebrown", "salmon", "sandybrown", "seagreen",
    "seashell", "sienna", "silver", "skyblue", "slateblue", "slategray", "slategrey", "snow",
    "springgreen", "steelblue", "tan", "teal", "thistle", "tomato", "turquoise", "violet",
    "wheat", "white", "whitesmoke", "yellow", "yellowgreen",
];

/// `-12`, `3.5`; no exponent, no units.
pub fn is_numeric_string(value: &str) -> bool {
    NUMERIC_STRING.is_match(value.trim())
}

/// A CSS length: `0`, a number with a unit, `var(...)` or a math function.
pub fn is_css_length(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    if matches!(trimmed, "0" | "0.0" | "0.00") {
        return true;
    }
    let is_call = |name: &str| {
        trimmed
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('('))
            .is_some_and(|rest| rest.len() > 1 && rest.ends_with(')'))
    };
    if ["var", "calc", "clamp", "min", "max"].into_iter().any(is_call) {
        return true;
    }
    CSS_LENGTH.is_match(trimmed)
}

fn has_balanced_parens(value: &str) -> bool {
    let mut depth: i32 = 0;
    for c in value.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Whether `value` is a CSS `<color>`.
pub fn is_css_color(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || !has_balanced_parens(trimmed) {
        return false;
    }
    let lower = trimmed.to_ascii_lowercase();
    HEX_COLOR.is_match(trimmed)
        || COLOR_FUNCTION.is_match(trimmed)
        || VAR_REFERENCE.is_match(trimmed)
        || lower == "transparent"
        || lower == "currentcolor"
        || GLOBAL_KEYWORDS.contains(&lower.as_str())
        || NAMED_COLORS.contains(&lower.as_str())
}

/// Split on top-level whitespace and commas, keeping `(...)` groups whole.
fn background_tokens(value: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start: Option<usize> = None;
    for (i, c) in value.char_indices() {
        match c {
            '(' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && (c.is_whitespace() || c == ',') => {
                if let Some(s) = start.take() {
                    tokens.push(&value[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&value[s..]);
    }
    tokens
}

fn is_background_token(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    is_css_color(token)
        || IMAGE_FUNCTION.is_match(token)
        || BACKGROUND_KEYWORDS.contains(&lower.as_str())
        || is_css_length(token)
}

/// Whether `value` is a plausible CSS `background` shorthand.
pub fn is_css_background(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || !has_balanced_parens(trimmed) {
        return false;
    }
    if is_css_color(trimmed) {
        return true;
    }
    let tokens = background_tokens(trimmed);
    !tokens.is_empty() && tokens.into_iter().all(is_background_token)
}

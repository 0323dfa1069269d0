//! Control path matching
//!
//! Each control's path pattern is compiled once into an anchored regex in
//! which wildcard segments (`__idx__`) accept any array index. A concrete
//! runtime path is then resolved to the best-ranked control whose pattern
//! matches it. A path no pattern matches is not editable.

use regex::Regex;

use crate::paths::is_wildcard_segment;
use crate::widget::CompiledControl;

/// Compile a control path pattern into an anchored regex.
pub fn compile_control_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('.')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if is_wildcard_segment(segment) {
                r"\d+".to_string()
            } else {
                regex::escape(segment)
            }
        })
        .collect::<Vec<_>>()
        .join(r"\.");
    Regex::new(&format!("^{body}$"))
}

struct PatternEntry<'a> {
    control: &'a CompiledControl,
    pattern: Regex,
    score: u32,
    literal_segments: usize,
}

/// Compiled matchers for a widget's controls
pub struct ControlMatcher<'a> {
    entries: Vec<PatternEntry<'a>>,
}

impl<'a> ControlMatcher<'a> {
    /// Compile every control that declares a non-blank path
    pub fn new(controls: &'a [CompiledControl]) -> Self {
        let entries = controls
            .iter()
            .filter(|control| !control.path.trim().is_empty())
            .filter_map(|control| match compile_control_pattern(&control.path) {
                Ok(pattern) => Some(PatternEntry {
                    control,
                    pattern,
                    score: control.score(),
                    literal_segments: control
                        .path
                        .split('.')
                        .filter(|s| !s.is_empty() && !is_wildcard_segment(s))
                        .count(),
                }),
                Err(e) => {
                    tracing::warn!(path = %control.path, error = %e, "skipping unmatchable control path");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    /// Number of compiled patterns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no control could be compiled
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the control governing `path`.
    ///
    /// Among matching patterns the highest score wins; ties go to the
    /// pattern with more literal segments, then to the earlier declaration.
    pub fn find(&self, path: &str) -> Option<&'a CompiledControl> {
        let mut best: Option<&PatternEntry<'a>> = None;
        for entry in &self.entries {
            if !entry.pattern.is_match(path) {
                continue;
            }
            let better = best.is_none_or(|current| {
                (entry.score, entry.literal_segments) > (current.score, current.literal_segments)
            });
            if better {
                best = Some(entry);
            }
        }
        if let Some(entry) = best {
            tracing::debug!(path, pattern = %entry.control.path, "matched control");
        }
        best.map(|entry| entry.control)
    }
}

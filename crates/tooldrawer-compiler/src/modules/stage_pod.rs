//! Shared Stage/Pod layout section
//!
//! The pod is the widget's content box, the stage the canvas around it.
//! Every widget declaring either gets the same layout clusters at the end
//! of its `layout` panel.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};

use super::{PANEL_CLOSE, encode_options, panel_open};
use crate::parser::FIELD_OPEN;

const GROUP_TAG: &str = "tooldrawer-field-podstagelayout";
const GROUP_LABEL: &str = "Stage/Pod layout";
const CLUSTER_OPEN: &str = "<tooldrawer-cluster";
const CLUSTER_CLOSE: &str = "</tooldrawer-cluster>";

static FIELD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|\s)path\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid field path regex")
});

fn choices(options: &[(&str, &str)]) -> String {
    let list: Vec<Value> = options
        .iter()
        .map(|(label, value)| json!({"label": label, "value": value}))
        .collect();
    encode_options(&Value::Array(list))
}

/// Whether an authored line belongs to a stage/pod layout section
pub fn is_authored_layout_line(line: &str) -> bool {
    line.contains(GROUP_TAG) || line.contains(GROUP_LABEL)
}

fn field(path: &str, control_type: &str, label: &str, extra: &str) -> String {
    format!("    <{GROUP_TAG} type='{control_type}' size='md' path='{path}' label='{label}'{extra} />")
}

fn padding_fields(owner: &str, title: &str, out: &mut Vec<String>) {
    for device in ["desktop", "mobile"] {
        let base = format!("{owner}.padding.{device}");
        out.push(field(
            &format!("{base}.linked"),
            "toggle",
            &format!("Link {owner} padding ({device})"),
            "",
        ));
        out.push(field(
            &format!("{base}.all"),
            "valuefield",
            &format!("{title} padding ({device} px)"),
            &format!(" show-if=\"{base}.linked == true\""),
        ));
        for side in ["top", "right", "bottom", "left"] {
            out.push(field(
                &format!("{base}.{side}"),
                "valuefield",
                &format!("{title} {side} padding ({device} px)"),
                &format!(" show-if=\"{base}.linked == false\""),
            ));
        }
    }
}

/// Pod cluster followed by stage cluster
pub fn layout_fields() -> Vec<String> {
    let width = choices(&[
        ("Wrap pod to widget", "wrap"),
        ("Full width", "full"),
        ("Fixed width", "fixed"),
    ]);
    let alignment = choices(&[
        ("Center", "center"),
        ("Align left", "left"),
        ("Align right", "right"),
        ("Align top", "top"),
        ("Align bottom", "bottom"),
    ]);
    let canvas = choices(&[
        ("Full", "viewport"),
        ("Wrap to pod", "wrap"),
        ("Fixed size", "fixed"),
    ]);

    let mut lines = vec![
        format!("  {CLUSTER_OPEN}>"),
        "    <tooldrawer-eyebrow text='Pod layout' />".to_string(),
        field(
            "pod.widthMode",
            "dropdown-actions",
            "Pod width",
            &format!(" placeholder='Choose width' options='{width}'"),
        ),
        field(
            "pod.contentWidth",
            "valuefield",
            "Width in pixels",
            " show-if=\"pod.widthMode == 'fixed'\"",
        ),
        field(
            "stage.alignment",
            "dropdown-actions",
            "Pod alignment",
            &format!(" placeholder='Choose alignment' options='{alignment}'"),
        ),
    ];
    padding_fields("pod", "Pod", &mut lines);
    lines.push(format!("  {CLUSTER_CLOSE}"));

    lines.push(format!("  {CLUSTER_OPEN}>"));
    lines.push("    <tooldrawer-eyebrow text='Stage layout' />".to_string());
    lines.push(field(
        "stage.canvas.mode",
        "dropdown-actions",
        "Stage sizing",
        &format!(" placeholder='Choose sizing' options='{canvas}'"),
    ));
    for (dimension, label) in [("width", "Stage width (px)"), ("height", "Stage height (px)")] {
        lines.push(field(
            &format!("stage.canvas.{dimension}"),
            "valuefield",
            label,
            " show-if=\"stage.canvas.mode == 'fixed'\"",
        ));
    }
    padding_fields("stage", "Stage", &mut lines);
    lines.push(format!("  {CLUSTER_CLOSE}"));
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Stage,
    Pod,
}

fn binding(line: &str) -> Option<Binding> {
    if !line.to_ascii_lowercase().contains(FIELD_OPEN) {
        return None;
    }
    let caps = FIELD_PATH.captures(line)?;
    let path = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    if path.starts_with("stage.") {
        Some(Binding::Stage)
    } else if path.starts_with("pod.") {
        Some(Binding::Pod)
    } else {
        None
    }
}

fn is_cluster_open(line: &str) -> bool {
    line.to_ascii_lowercase().contains(CLUSTER_OPEN)
}

fn is_cluster_close(line: &str) -> bool {
    line.to_ascii_lowercase().contains(CLUSTER_CLOSE)
}

/// Index of the line closing the cluster opened at `open`. Nested
/// clusters and clusters running past the panel are not handled.
fn cluster_close(lines: &[String], open: usize) -> Option<usize> {
    for (index, line) in lines.iter().enumerate().skip(open + 1) {
        if is_cluster_open(line) || line.contains(PANEL_CLOSE) {
            return None;
        }
        if is_cluster_close(line) {
            return Some(index);
        }
    }
    None
}

/// Split layout-panel clusters whose fields bind both `stage.*` and
/// `pod.*` paths into a pod cluster followed by a stage cluster.
///
/// The pod cluster keeps every line that is not a stage field; the stage
/// cluster holds the stage fields. Both reuse the mixed cluster's opening and
/// closing lines, so label and `show-if` carry over.
pub fn split_mixed_stage_pod_clusters(lines: &[String]) -> Vec<String> {
    let layout_open = panel_open("layout");
    let mut out = Vec::with_capacity(lines.len());
    let mut in_layout = false;
    let mut index = 0;

    while index < lines.len() {
        let line = &lines[index];
        if line.contains(&layout_open) {
            in_layout = true;
        } else if line.contains(PANEL_CLOSE) {
            in_layout = false;
        }

        if in_layout && is_cluster_open(line) && !is_cluster_close(line) {
            if let Some(close) = cluster_close(lines, index) {
                let body = &lines[index + 1..close];
                let has_stage = body.iter().any(|l| binding(l) == Some(Binding::Stage));
                let has_pod = body.iter().any(|l| binding(l) == Some(Binding::Pod));
                if has_stage && has_pod {
                    let (stage, pod): (Vec<&String>, Vec<&String>) = body
                        .iter()
                        .partition(|l| binding(l) == Some(Binding::Stage));
                    tracing::debug!(
                        stage = stage.len(),
                        pod = pod.len(),
                        "split mixed stage/pod cluster"
                    );
                    out.push(line.clone());
                    out.extend(pod.into_iter().cloned());
                    out.push(lines[close].clone());
                    out.push(line.clone());
                    out.extend(stage.into_iter().cloned());
                    out.push(lines[close].clone());
                    index = close + 1;
                    continue;
                }
            }
        }

        out.push(line.clone());
        index += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[rstest]
    #[case("<tooldrawer-field type='toggle' path='stage.a' />", Some(Binding::Stage))]
    #[case("<tooldrawer-field type='toggle' path=\"pod.a\" />", Some(Binding::Pod))]
    #[case("<tooldrawer-field type='toggle' labelPath='pod.a' path='title' />", None)]
    #[case("<div data-bob-path='stage.a'></div>", None)]
    fn test_binding(#[case] line: &str, #[case] expected: Option<Binding>) {
        assert_eq!(binding(line), expected);
    }

    #[test]
    fn test_mixed_cluster_is_split() {
        let html = lines(&[
            "<bob-panel id='layout'>",
            "<tooldrawer-cluster label='Box' show-if=\"compact == true\">",
            "<tooldrawer-eyebrow text='Box' />",
            "<tooldrawer-field type='toggle' path='stage.a' />",
            "<tooldrawer-field type='toggle' path='pod.b' />",
            "</tooldrawer-cluster>",
            "</bob-panel>",
        ]);
        let out = split_mixed_stage_pod_clusters(&html);
        assert_eq!(
            out,
            lines(&[
                "<bob-panel id='layout'>",
                "<tooldrawer-cluster label='Box' show-if=\"compact == true\">",
                "<tooldrawer-eyebrow text='Box' />",
                "<tooldrawer-field type='toggle' path='pod.b' />",
                "</tooldrawer-cluster>",
                "<tooldrawer-cluster label='Box' show-if=\"compact == true\">",
                "<tooldrawer-field type='toggle' path='stage.a' />",
                "</tooldrawer-cluster>",
                "</bob-panel>",
            ])
        );
    }

    #[test]
    fn test_clusters_outside_layout_are_kept() {
        let html = lines(&[
            "<bob-panel id='content'>",
            "<tooldrawer-cluster>",
            "<tooldrawer-field type='toggle' path='stage.a' />",
            "<tooldrawer-field type='toggle' path='pod.b' />",
            "</tooldrawer-cluster>",
            "</bob-panel>",
        ]);
        assert_eq!(split_mixed_stage_pod_clusters(&html), html);
    }

    #[test]
    fn test_generated_fields() {
        let fields = layout_fields();
        let opens = fields.iter().filter(|l| is_cluster_open(l)).count();
        assert_eq!(opens, 2);
        assert!(fields.iter().all(|l| !l.contains(FIELD_OPEN) || is_authored_layout_line(l)));
        assert!(fields.iter().any(|l| l.contains("path='pod.padding.mobile.left'")));
        assert!(fields.iter().any(|l| l.contains("path='stage.canvas.height'")));
    }
}

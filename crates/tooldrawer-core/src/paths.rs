//! Dot-path addressing over [`Node`] trees
//!
//! Paths look like `faqs.0.question`. Segments made only of ASCII digits
//! index arrays; every other segment names an object key. Updates never
//! touch their input: they return a new tree in which only the containers
//! between the root and the modified slot are fresh copies.

use std::sync::Arc;

use crate::tree::Node;

/// Path segments that can never be read or written through an op.
pub const PROHIBITED_SEGMENTS: [&str; 3] = ["__proto__", "prototype", "constructor"];

/// Parse an array-index segment (`^\d+$`).
pub fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// A wildcard segment such as `__idx__` or `__INDEX__`.
pub fn is_wildcard_segment(segment: &str) -> bool {
    segment.len() > 4
        && segment.starts_with("__")
        && segment.ends_with("__")
        && !segment.contains('.')
}

/// Whether any segment of `path` is prohibited.
pub fn has_prohibited_segment(path: &str) -> bool {
    path.split('.')
        .any(|segment| PROHIBITED_SEGMENTS.contains(&segment))
}

/// Read the value at `path`. An empty path addresses the root.
///
/// Returns `None` as soon as an intermediate value is missing or cannot be
/// indexed by the next segment.
pub fn get_at<'a>(tree: &'a Node, path: &str) -> Option<&'a Node> {
    if path.is_empty() {
        return Some(tree);
    }
    path.split('.').try_fold(tree, |current, segment| child(current, segment))
}

fn child<'a>(node: &'a Node, segment: &str) -> Option<&'a Node> {
    match node {
        Node::Array(items) => items.get(parse_index(segment)?),
        Node::Object(map) => map.get(segment),
        _ => None,
    }
}

/// Return a copy of `tree` with `value` stored at `path`.
///
/// Missing intermediates are created as objects, index segments past the
/// end of an array pad it with `null`, and an intermediate scalar is
/// replaced by an object. An empty path replaces the whole tree.
pub fn set_at(tree: &Node, path: &str, value: Node) -> Node {
    if path.is_empty() {
        return value;
    }
    let mut root = tree.clone();
    let segments: Vec<&str> = path.split('.').collect();
    *slot_mut(&mut root, &segments) = value;
    root
}

/// Find the first index segment of `path` that lands past the end of an
/// existing array, returned as `(index, len)`.
///
/// An index equal to the length appends and is in range. Segments below a
/// missing or scalar value are never out of range since [`set_at`] creates
/// objects there.
pub fn index_out_of_range(tree: &Node, path: &str) -> Option<(usize, usize)> {
    let mut current = tree;
    for segment in path.split('.') {
        current = match current {
            Node::Array(items) => {
                let index = parse_index(segment)?;
                if index > items.len() {
                    return Some((index, items.len()));
                }
                items.get(index)?
            }
            Node::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    None
}

/// Return a copy of `tree` with the value at `path` replaced by `f(old)`.
pub fn update_at<F>(tree: &Node, path: &str, f: F) -> Node
where
    F: FnOnce(Option<&Node>) -> Node,
{
    let next = f(get_at(tree, path));
    set_at(tree, path, next)
}

/// Return a copy of `tree` without the value at `path`.
///
/// Array members are spliced out; object members are removed. A path that
/// does not resolve leaves the tree unchanged (and shared).
pub fn delete_at(tree: &Node, path: &str) -> Node {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return tree.clone();
    };
    if path.is_empty() || get_at(tree, path).is_none() {
        return tree.clone();
    }

    let mut root = tree.clone();
    match slot_mut(&mut root, parents) {
        Node::Array(items) => {
            if let Some(index) = parse_index(last) {
                Arc::make_mut(items).remove(index);
            }
        }
        Node::Object(map) => {
            Arc::make_mut(map).remove(*last);
        }
        _ => {}
    }
    root
}

/// Walk to the slot for `segments`, cloning shared containers on the way.
fn slot_mut<'a>(node: &'a mut Node, segments: &[&str]) -> &'a mut Node {
    segments
        .iter()
        .fold(node, |current, segment| child_slot(current, segment))
}

fn child_slot<'a>(node: &'a mut Node, segment: &str) -> &'a mut Node {
    match (parse_index(segment), node) {
        (Some(index), Node::Array(items)) => {
            let items = Arc::make_mut(items);
            if index >= items.len() {
                items.resize(index + 1, Node::Null);
            }
            &mut items[index]
        }
        (_, node) => node
            .make_object_mut()
            .entry(segment.to_string())
            .or_insert(Node::Null),
    }
}

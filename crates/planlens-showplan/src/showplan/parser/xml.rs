//! Attribute and element helpers over `roxmltree` nodes
//!
//! Elements are matched by local name so documents with or without the
//! showplan namespace prefix behave the same. Numeric attributes that fail to
//! parse are treated as absent.

use roxmltree::Node;

pub(super) fn is_element_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// First element child with the given local name
pub(super) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_element_named(*c, name))
}

/// All element children with the given local name, in document order
pub(super) fn children_named<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |c| is_element_named(*c, name))
}

/// All element children, in document order
pub(super) fn elements<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

pub(super) fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attribute(name)
}

pub(super) fn attr_string(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

pub(super) fn attr_f64(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parses an unsigned integer, accepting values written in float notation
pub(super) fn attr_u64(node: Node<'_, '_>, name: &str) -> Option<u64> {
    let raw = node.attribute(name)?.trim();
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

pub(super) fn attr_u32(node: Node<'_, '_>, name: &str) -> Option<u32> {
    attr_u64(node, name).and_then(|v| u32::try_from(v).ok())
}

pub(super) fn attr_i32(node: Node<'_, '_>, name: &str) -> Option<i32> {
    node.attribute(name).and_then(|v| v.trim().parse::<i32>().ok())
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "True" | "TRUE" => Some(true),
        "0" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub(super) fn attr_bool(node: Node<'_, '_>, name: &str) -> Option<bool> {
    node.attribute(name).and_then(parse_bool)
}

/// Boolean attribute that defaults to false when absent or unparseable
pub(super) fn attr_flag(node: Node<'_, '_>, name: &str) -> bool {
    attr_bool(node, name).unwrap_or(false)
}

/// Formats a `ColumnReference` as `[db].[schema].[table].Column`, or
/// `[alias].Column` when the reference is aliased
pub(super) fn column_name(column_ref: Node<'_, '_>) -> String {
    let column = attr(column_ref, "Column").unwrap_or_default();
    let qualifier = match attr(column_ref, "Alias") {
        Some(alias) => alias.to_string(),
        None => ["Database", "Schema", "Table"]
            .into_iter()
            .filter_map(|a| attr(column_ref, a))
            .collect::<Vec<_>>()
            .join("."),
    };
    if qualifier.is_empty() {
        column.to_string()
    } else {
        format!("{qualifier}.{column}")
    }
}

/// Column names of every `ColumnReference` child of `node`
pub(super) fn column_list(node: Node<'_, '_>) -> Vec<String> {
    children_named(node, "ColumnReference")
        .map(column_name)
        .collect()
}

/// The `ScalarString` of the `ScalarOperator` under `node`.
///
/// Falls back to the first descendant carrying one, since some operators
/// wrap the scalar in extra elements.
pub(super) fn scalar_string(node: Node<'_, '_>) -> Option<String> {
    child(node, "ScalarOperator")
        .and_then(|s| attr_string(s, "ScalarString"))
        .or_else(|| {
            node.descendants()
                .filter(|d| is_element_named(*d, "ScalarOperator"))
                .find_map(|d| attr_string(d, "ScalarString"))
        })
}

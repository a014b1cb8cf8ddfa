//! Canonical tree serialization
//!
//! JSX-like, one property per line, properties in key order, children in
//! pre-order with two-space indentation. Text nodes are quoted and escaped
//! like string props, so each one is exactly one line:
//!
//! ```text
//! <button
//!   onClick={[Function]}
//! >
//!   "SUBSCRIBE TO BASIC"
//! </button>
//! ```
//!
//! Identical trees always produce byte-identical output, different trees
//! never do, and a changed property shows up as exactly one changed line.

use std::fmt::Write;

use super::{Node, Value};
use crate::constants::tree::FUNCTION_REPR;

const INDENT: &str = "  ";

/// Serialize `node` and its descendants
pub fn to_canonical(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    let indent = INDENT.repeat(depth);

    if let Some(text) = node.as_text() {
        let _ = writeln!(out, "{indent}{text:?}");
        return;
    }

    let props = node.props();
    let _ = write!(out, "{indent}<{}", node.tag());
    if !props.is_empty() {
        out.push('\n');
        for (key, value) in props.iter() {
            let _ = writeln!(out, "{indent}{INDENT}{key}={}", attr(value));
        }
        out.push_str(&indent);
    }

    if node.children().is_empty() {
        out.push_str(if props.is_empty() { " />\n" } else { "/>\n" });
        return;
    }

    out.push_str(">\n");
    for child in node.children() {
        write_node(out, child, depth + 1);
    }
    let _ = writeln!(out, "{indent}</{}>", node.tag());
}

/// Attribute position: strings are quoted, everything else is braced
fn attr(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{s:?}"),
        other => format!("{{{}}}", inline(other)),
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(n) => n.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Str(s) => format!("{s:?}"),
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(inline).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k:?}: {}", inline(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Handler(_) => FUNCTION_REPR.to_string(),
    }
}

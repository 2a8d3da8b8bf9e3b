//! Expression-dialect functions.
//!
//! Node-set: position(), last(), count(), local-name(), namespace-uri(), name()
//! String:   string(), string-length(), contains(), starts-with()
//! Boolean:  boolean(), not(), true(), false()
//! Number:   number()
//!
//! Anything else is an evaluation error.

use super::axes::{node_local_name, node_namespace_uri, DOC_NODE};
use super::value::Value;
use crate::dom::namespace::local_name;
use crate::dom::{Document, NodeId};

/// Evaluate a function call
pub fn call(
    name: &str,
    args: Vec<Value>,
    doc: &Document,
    context: NodeId,
    position: usize,
    size: usize,
    top: NodeId,
) -> Result<Value, String> {
    match name {
        "position" => Ok(Value::Number(position as f64)),
        "last" => Ok(Value::Number(size as f64)),
        "count" => fn_count(args),
        "local-name" => {
            let node = optional_node_arg(args, context, "local-name")?;
            Ok(Value::String(
                node.map(|n| node_local_name(doc, n)).unwrap_or_default(),
            ))
        }
        "namespace-uri" => {
            let node = optional_node_arg(args, context, "namespace-uri")?;
            Ok(Value::String(
                node.map(|n| node_namespace_uri(doc, n)).unwrap_or_default(),
            ))
        }
        "name" => {
            let node = optional_node_arg(args, context, "name")?;
            Ok(Value::String(
                node.map(|n| qualified_name(doc, n)).unwrap_or_default(),
            ))
        }

        "string" => {
            let value = args
                .into_iter()
                .next()
                .unwrap_or_else(|| Value::single_node(context));
            Ok(Value::String(value_string(doc, &value, top)))
        }
        "string-length" => {
            let value = args
                .into_iter()
                .next()
                .unwrap_or_else(|| Value::single_node(context));
            Ok(Value::Number(
                value_string(doc, &value, top).chars().count() as f64,
            ))
        }
        "contains" => {
            let (haystack, needle) = two_string_args(args, doc, top, "contains")?;
            Ok(Value::Boolean(haystack.contains(&needle)))
        }
        "starts-with" => {
            let (haystack, needle) = two_string_args(args, doc, top, "starts-with")?;
            Ok(Value::Boolean(haystack.starts_with(&needle)))
        }

        "boolean" => one_arg(args, "boolean").map(|v| Value::Boolean(v.to_boolean())),
        "not" => one_arg(args, "not").map(|v| Value::Boolean(!v.to_boolean())),
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),

        "number" => {
            let value = args
                .into_iter()
                .next()
                .unwrap_or_else(|| Value::single_node(context));
            let n = match value {
                Value::NodeSet(_) => value_string(doc, &value, top)
                    .trim()
                    .parse()
                    .unwrap_or(f64::NAN),
                other => other.to_number(),
            };
            Ok(Value::Number(n))
        }

        _ => Err(format!("unknown function: {}()", name)),
    }
}

/// String-value of an element: its text plus, per child, the child's
/// string-value and tail. The document node delegates to the tree top.
pub fn string_value(doc: &Document, node: NodeId, top: NodeId) -> String {
    let node = if node == DOC_NODE { top } else { node };
    let mut out = String::new();
    collect_text(doc, node, &mut out);
    out
}

fn collect_text(doc: &Document, node: NodeId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(text);
    }
    for child in doc.children(node) {
        collect_text(doc, child, out);
        if let Some(tail) = doc.tail(child) {
            out.push_str(tail);
        }
    }
}

/// String conversion that can see the document (node-sets convert via
/// the first node's string-value)
pub fn value_string(doc: &Document, value: &Value, top: NodeId) -> String {
    match value {
        Value::NodeSet(nodes) => nodes
            .first()
            .map(|&n| string_value(doc, n, top))
            .unwrap_or_default(),
        other => other.to_string_value(),
    }
}

fn qualified_name(doc: &Document, node: NodeId) -> String {
    if node == DOC_NODE {
        return String::new();
    }
    let Some(tag) = doc.tag(node) else {
        return String::new();
    };
    match doc.prefix(node) {
        Some(prefix) => format!("{}:{}", prefix, local_name(tag)),
        None => local_name(tag).to_string(),
    }
}

fn fn_count(args: Vec<Value>) -> Result<Value, String> {
    match args.into_iter().next() {
        Some(Value::NodeSet(nodes)) => Ok(Value::Number(nodes.len() as f64)),
        Some(Value::StringList(list)) => Ok(Value::Number(list.len() as f64)),
        Some(_) => Err("count() argument must be a node-set".to_string()),
        None => Err("count() requires exactly 1 argument".to_string()),
    }
}

fn one_arg(args: Vec<Value>, name: &str) -> Result<Value, String> {
    args.into_iter()
        .next()
        .ok_or_else(|| format!("{}() requires exactly 1 argument", name))
}

fn two_string_args(
    args: Vec<Value>,
    doc: &Document,
    top: NodeId,
    name: &str,
) -> Result<(String, String), String> {
    let mut iter = args.into_iter();
    match (iter.next(), iter.next()) {
        (Some(a), Some(b)) => Ok((value_string(doc, &a, top), value_string(doc, &b, top))),
        _ => Err(format!("{}() requires exactly 2 arguments", name)),
    }
}

/// First node of a node-set argument, or the context node with no
/// argument; `None` for an empty node-set
fn optional_node_arg(
    args: Vec<Value>,
    context: NodeId,
    name: &str,
) -> Result<Option<NodeId>, String> {
    match args.into_iter().next() {
        None => Ok(Some(context)),
        Some(Value::NodeSet(nodes)) => Ok(nodes.first().copied()),
        Some(_) => Err(format!("{}() argument must be a node-set", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (Document, NodeId) {
        let doc = Document::parse_str(
            "<r>one<a>two</a>three<ex:b xmlns:ex=\"urn:x\">four</ex:b></r>",
        )
        .unwrap();
        let root = doc.root().unwrap();
        (doc, root)
    }

    #[test]
    fn test_string_value_includes_tails() {
        let (doc, root) = doc();
        assert_eq!(string_value(&doc, root, root), "onetwothreefour");
    }

    #[test]
    fn test_local_name_and_namespace_uri() {
        let (doc, root) = doc();
        let b = doc.children(root).nth(1).unwrap();
        let result = call("local-name", vec![], &doc, b, 1, 1, root).unwrap();
        assert_eq!(result, Value::String("b".to_string()));
        let result = call("namespace-uri", vec![], &doc, b, 1, 1, root).unwrap();
        assert_eq!(result, Value::String("urn:x".to_string()));
        let result = call("name", vec![], &doc, b, 1, 1, root).unwrap();
        assert_eq!(result, Value::String("ex:b".to_string()));
    }

    #[test]
    fn test_count_and_not() {
        let (doc, root) = doc();
        let result = call("count", vec![Value::NodeSet(vec![root])], &doc, root, 1, 1, root);
        assert_eq!(result.unwrap(), Value::Number(1.0));
        let result = call("not", vec![Value::Boolean(false)], &doc, root, 1, 1, root);
        assert_eq!(result.unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_unknown_function() {
        let (doc, root) = doc();
        assert!(call("translate", vec![], &doc, root, 1, 1, root).is_err());
    }

    #[test]
    fn test_contains() {
        let (doc, root) = doc();
        let args = vec![Value::single_node(root), Value::String("two".into())];
        let result = call("contains", args, &doc, root, 1, 1, root).unwrap();
        assert_eq!(result, Value::Boolean(true));
    }
}

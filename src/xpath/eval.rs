//! Expression evaluation engine.
//!
//! Runs compiled programs against a document. Prefix name tests
//! resolve here, per call, against the supplied [`NamespaceMap`]; an
//! unbound prefix (and the unsupported `*:name` wildcard) surface as
//! [`ExpressionEvalError`], matching the dialect's error class.

use super::axes::{self, matches_node_test, navigate, ResolvedTest, DOC_NODE};
use super::compiler::{Compiled, Op};
use super::functions;
use super::parser::{Axis, BinaryOp, NodeTest};
use super::value::Value;
use crate::dom::{Document, NamespaceMap, NodeId};
use crate::error::ExpressionEvalError;
use std::collections::{HashMap, HashSet};

/// Evaluate an expression from a context node.
///
/// Absolute paths are rooted at the virtual document node above the
/// context node's tree top, so `//tag` can match the tree root itself.
pub fn evaluate(
    doc: &Document,
    from: NodeId,
    expr: &str,
    ns: &NamespaceMap,
) -> Result<Value, ExpressionEvalError> {
    let compiled = super::cache::compile_cached(expr).map_err(ExpressionEvalError::new)?;
    let top = doc.top(from);
    let order = axes::document_order(doc, top);
    let ctx = EvalContext {
        doc,
        ns,
        order: &order,
        top,
        node: from,
        position: 1,
        size: 1,
    };
    let value = run(&compiled, &ctx).map_err(ExpressionEvalError::new)?;
    // The virtual document node is an implementation detail; never
    // hand its sentinel to callers (e.g. for the bare "/" path).
    Ok(match value {
        Value::NodeSet(nodes) => {
            Value::NodeSet(nodes.into_iter().filter(|&n| n != DOC_NODE).collect())
        }
        other => other,
    })
}

/// Evaluation context; one per predicate scope
pub(crate) struct EvalContext<'a> {
    pub doc: &'a Document,
    pub ns: &'a NamespaceMap,
    /// Pre-order ranks for restoring document order after merges
    pub order: &'a HashMap<NodeId, u32>,
    pub top: NodeId,
    pub node: NodeId,
    pub position: usize,
    pub size: usize,
}

fn run(compiled: &Compiled, ctx: &EvalContext<'_>) -> Result<Value, String> {
    let mut stack: Vec<Value> = Vec::new();

    for op in &compiled.ops {
        match op {
            Op::Root => stack.push(Value::single_node(DOC_NODE)),

            Op::Context => stack.push(Value::single_node(ctx.node)),

            Op::Navigate(axis, test) => {
                let current = stack.pop().unwrap_or_else(|| Value::single_node(ctx.node));
                let Value::NodeSet(nodes) = current else {
                    stack.push(Value::empty_nodeset());
                    continue;
                };
                stack.push(navigate_step(ctx, nodes, *axis, test)?);
            }

            Op::Predicate(inner) => {
                let current = stack.pop().unwrap_or_else(Value::empty_nodeset);
                let Value::NodeSet(nodes) = current else {
                    stack.push(Value::empty_nodeset());
                    continue;
                };
                let size = nodes.len();
                let mut kept = Vec::new();
                for (at, &node) in nodes.iter().enumerate() {
                    let pred_ctx = EvalContext {
                        doc: ctx.doc,
                        ns: ctx.ns,
                        order: ctx.order,
                        top: ctx.top,
                        node,
                        position: at + 1,
                        size,
                    };
                    let result = run(inner, &pred_ctx)?;
                    let include = match result {
                        // A bare number selects by position.
                        Value::Number(n) => (at + 1) as f64 == n,
                        other => other.to_boolean(),
                    };
                    if include {
                        kept.push(node);
                    }
                }
                stack.push(Value::NodeSet(kept));
            }

            Op::Union => {
                let right = stack.pop().unwrap_or_else(Value::empty_nodeset);
                let left = stack.pop().unwrap_or_else(Value::empty_nodeset);
                match (left, right) {
                    (Value::NodeSet(l), Value::NodeSet(r)) => {
                        let mut seen: HashSet<NodeId> = l.iter().copied().collect();
                        let mut merged = l;
                        for node in r {
                            if seen.insert(node) {
                                merged.push(node);
                            }
                        }
                        sort_document_order(&mut merged, ctx);
                        stack.push(Value::NodeSet(merged));
                    }
                    _ => return Err("union requires two node-sets".to_string()),
                }
            }

            Op::Number(n) => stack.push(Value::Number(*n)),

            Op::Literal(s) => stack.push(Value::String(s.clone())),

            Op::Binary(op) => {
                let right = stack.pop().unwrap_or_else(Value::empty_nodeset);
                let left = stack.pop().unwrap_or_else(Value::empty_nodeset);
                let result = match op {
                    BinaryOp::Or => Value::Boolean(left.to_boolean() || right.to_boolean()),
                    BinaryOp::And => Value::Boolean(left.to_boolean() && right.to_boolean()),
                    BinaryOp::Eq => compare_values(ctx, &left, &right, |a, b| a == b),
                    BinaryOp::NotEq => compare_values(ctx, &left, &right, |a, b| a != b),
                    BinaryOp::Lt => compare_numbers(ctx, &left, &right, |a, b| a < b),
                    BinaryOp::LtEq => compare_numbers(ctx, &left, &right, |a, b| a <= b),
                    BinaryOp::Gt => compare_numbers(ctx, &left, &right, |a, b| a > b),
                    BinaryOp::GtEq => compare_numbers(ctx, &left, &right, |a, b| a >= b),
                };
                stack.push(result);
            }

            Op::Call(name, arg_count) => {
                let mut args = Vec::with_capacity(*arg_count);
                for _ in 0..*arg_count {
                    args.push(stack.pop().unwrap_or_else(Value::empty_nodeset));
                }
                args.reverse();
                let result = functions::call(
                    name,
                    args,
                    ctx.doc,
                    ctx.node,
                    ctx.position,
                    ctx.size,
                    ctx.top,
                )?;
                stack.push(result);
            }
        }
    }

    Ok(stack.pop().unwrap_or_else(Value::empty_nodeset))
}

/// One Navigate op: axis candidates filtered by the node test, with
/// traversal dedup and a final document-order sort
fn navigate_step(
    ctx: &EvalContext<'_>,
    nodes: Vec<NodeId>,
    axis: Axis,
    test: &NodeTest,
) -> Result<Value, String> {
    if axis == Axis::Attribute {
        return Ok(attribute_step(ctx, &nodes, test));
    }
    if axis == Axis::Child && *test == NodeTest::Text {
        return Ok(text_step(ctx, &nodes));
    }

    let resolved = ResolvedTest::resolve(test, ctx.ns)?;
    let mut seen = HashSet::with_capacity(nodes.len());
    let mut result = Vec::new();
    for node in nodes {
        for candidate in navigate(ctx.doc, node, axis, ctx.top) {
            if matches_node_test(ctx.doc, candidate, &resolved) && seen.insert(candidate) {
                result.push(candidate);
            }
        }
    }
    sort_document_order(&mut result, ctx);
    Ok(Value::NodeSet(result))
}

/// Attribute axis: string results rather than elements. Names match
/// the source form; namespace declarations are not attributes.
fn attribute_step(ctx: &EvalContext<'_>, nodes: &[NodeId], test: &NodeTest) -> Value {
    let mut values: Vec<String> = Vec::new();
    for &node in nodes {
        if node == DOC_NODE {
            continue;
        }
        match test {
            NodeTest::Any => {
                for attr in ctx.doc.attributes(node) {
                    if attr.name != "xmlns" && !attr.name.starts_with("xmlns:") {
                        values.push(attr.value.clone());
                    }
                }
            }
            NodeTest::Name(name) => {
                if let Some(value) = ctx.doc.attribute(node, name) {
                    values.push(value.to_string());
                }
            }
            NodeTest::Prefixed { prefix, local } => {
                // Attribute names are stored as written.
                let qname = format!("{}:{}", prefix, local);
                if let Some(value) = ctx.doc.attribute(node, &qname) {
                    values.push(value.to_string());
                }
            }
            _ => {}
        }
    }
    match values.len() {
        0 => Value::empty_nodeset(),
        1 => Value::String(values.pop().unwrap_or_default()),
        _ => Value::StringList(values),
    }
}

/// `text()` on the child axis: the text pieces directly inside each
/// element, in content order (text, then each child's tail)
fn text_step(ctx: &EvalContext<'_>, nodes: &[NodeId]) -> Value {
    let mut pieces: Vec<String> = Vec::new();
    for &node in nodes {
        if node == DOC_NODE {
            continue;
        }
        if let Some(text) = ctx.doc.text(node) {
            pieces.push(text.to_string());
        }
        for child in ctx.doc.children(node) {
            if let Some(tail) = ctx.doc.tail(child) {
                pieces.push(tail.to_string());
            }
        }
    }
    match pieces.len() {
        0 => Value::empty_nodeset(),
        1 => Value::String(pieces.pop().unwrap_or_default()),
        _ => Value::StringList(pieces),
    }
}

fn sort_document_order(nodes: &mut [NodeId], ctx: &EvalContext<'_>) {
    nodes.sort_by_key(|n| ctx.order.get(n).copied().unwrap_or(u32::MAX));
}

/// Equality comparison with node-set string-value semantics
fn compare_values<F>(ctx: &EvalContext<'_>, left: &Value, right: &Value, cmp: F) -> Value
where
    F: Fn(&str, &str) -> bool,
{
    let string_of = |node: NodeId| functions::string_value(ctx.doc, node, ctx.top);

    match (left, right) {
        (Value::NodeSet(ln), Value::NodeSet(rn)) => {
            for &l in ln {
                let ls = string_of(l);
                for &r in rn {
                    if cmp(&ls, &string_of(r)) {
                        return Value::Boolean(true);
                    }
                }
            }
            Value::Boolean(false)
        }
        (Value::NodeSet(nodes), other) | (other, Value::NodeSet(nodes)) => {
            let other_str = other.to_string_value();
            Value::Boolean(nodes.iter().any(|&n| cmp(&string_of(n), &other_str)))
        }
        (Value::StringList(list), other) | (other, Value::StringList(list)) => {
            let other_str = other.to_string_value();
            Value::Boolean(list.iter().any(|s| cmp(s, &other_str)))
        }
        (Value::Boolean(_), _) | (_, Value::Boolean(_)) => Value::Boolean(cmp(
            &left.to_boolean().to_string(),
            &right.to_boolean().to_string(),
        )),
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            let l = super::value::format_number(left.to_number());
            let r = super::value::format_number(right.to_number());
            Value::Boolean(cmp(&l, &r))
        }
        (Value::String(l), Value::String(r)) => Value::Boolean(cmp(l, r)),
    }
}

fn compare_numbers<F>(ctx: &EvalContext<'_>, left: &Value, right: &Value, cmp: F) -> Value
where
    F: Fn(f64, f64) -> bool,
{
    let number_of = |value: &Value| match value {
        Value::NodeSet(_) => functions::value_string(ctx.doc, value, ctx.top)
            .trim()
            .parse()
            .unwrap_or(f64::NAN),
        other => other.to_number(),
    };
    Value::Boolean(cmp(number_of(left), number_of(right)))
}

//! Axis navigation and node tests over the arena.
//!
//! Absolute paths are rooted at a virtual document node represented by
//! the [`DOC_NODE`] sentinel: its only child is the top element of the
//! context node's tree. That gives `//tag` its correct
//! descendant-or-self-from-the-document meaning (the tree root itself
//! is a candidate) without modelling a document node in the arena.

use super::parser::{Axis, NodeTest};
use crate::dom::namespace::{clark, local_name, namespace_uri};
use crate::dom::{Document, NodeId};

/// Sentinel for the virtual document node. The arena can never hand
/// out this id: it would need 2^32 - 1 elements first.
pub const DOC_NODE: NodeId = NodeId::MAX;

/// Nodes one axis step reaches from `node`. `top` is the root of the
/// context tree (the document node's only child).
pub fn navigate(doc: &Document, node: NodeId, axis: Axis, top: NodeId) -> Vec<NodeId> {
    match axis {
        Axis::Child => {
            if node == DOC_NODE {
                vec![top]
            } else {
                doc.children(node).collect()
            }
        }
        Axis::Descendant => {
            if node == DOC_NODE {
                std::iter::once(top).chain(doc.descendants(top)).collect()
            } else {
                doc.descendants(node).collect()
            }
        }
        Axis::DescendantOrSelf => {
            let mut nodes = vec![node];
            if node == DOC_NODE {
                nodes.push(top);
                nodes.extend(doc.descendants(top));
            } else {
                nodes.extend(doc.descendants(node));
            }
            nodes
        }
        Axis::Parent => {
            if node == DOC_NODE {
                Vec::new()
            } else {
                match doc.parent(node) {
                    Some(parent) => vec![parent],
                    // The top of the tree reports the document node as
                    // its parent, mirroring the descent.
                    None if node == top => vec![DOC_NODE],
                    None => Vec::new(),
                }
            }
        }
        Axis::SelfAxis => vec![node],
        // The attribute axis produces strings, not elements; eval
        // handles it before calling here.
        Axis::Attribute => Vec::new(),
    }
}

/// Apply a node test. Prefix resolution happens in the caller (eval),
/// which rewrites `Prefixed` tests into Clark names first.
pub fn matches_node_test(doc: &Document, node: NodeId, test: &ResolvedTest) -> bool {
    if node == DOC_NODE {
        return matches!(test, ResolvedTest::Node);
    }
    let Some(tag) = doc.tag(node) else {
        return false;
    };
    match test {
        ResolvedTest::Any => true,
        ResolvedTest::Node => true,
        // Elements only in this model; text() never matches an element
        // and is special-cased by eval for the child axis.
        ResolvedTest::Text => false,
        ResolvedTest::Exact(name) => tag == name,
        ResolvedTest::InNamespace(uri) => namespace_uri(tag) == Some(uri.as_str()),
    }
}

/// Node test after per-call prefix resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedTest {
    Any,
    Node,
    Text,
    /// Full tag comparison: bare `name` or Clark `{uri}local`
    Exact(String),
    /// `prefix:*` resolved to its URI
    InNamespace(String),
}

impl ResolvedTest {
    /// Resolve a parsed node test against the caller's namespace map.
    ///
    /// `Prefixed` tests fail on an unbound prefix; `*:name` always
    /// fails; the dialect has no namespace wildcard.
    pub fn resolve(
        test: &NodeTest,
        ns: &crate::dom::NamespaceMap,
    ) -> Result<ResolvedTest, String> {
        match test {
            NodeTest::Any => Ok(ResolvedTest::Any),
            NodeTest::Node => Ok(ResolvedTest::Node),
            NodeTest::Text => Ok(ResolvedTest::Text),
            NodeTest::Name(name) => Ok(ResolvedTest::Exact(name.clone())),
            NodeTest::Prefixed { prefix, local } => {
                let uri = ns
                    .get(prefix)
                    .ok_or_else(|| format!("undefined namespace prefix: {}", prefix))?;
                Ok(ResolvedTest::Exact(clark(uri, local)))
            }
            NodeTest::PrefixWildcard(prefix) => {
                let uri = ns
                    .get(prefix)
                    .ok_or_else(|| format!("undefined namespace prefix: {}", prefix))?;
                Ok(ResolvedTest::InNamespace(uri.to_string()))
            }
            NodeTest::NamespaceWildcard(local) => Err(format!(
                "namespace wildcard *:{} is not supported by this dialect",
                local
            )),
        }
    }
}

/// Pre-order rank of every node in the context tree, for restoring
/// document order after set operations. The document node sorts first.
pub fn document_order(doc: &Document, top: NodeId) -> std::collections::HashMap<NodeId, u32> {
    let mut order = std::collections::HashMap::new();
    order.insert(DOC_NODE, 0);
    order.insert(top, 1);
    let mut rank = 2u32;
    for node in doc.descendants(top) {
        order.insert(node, rank);
        rank += 1;
    }
    order
}

/// The element's local name, empty for the document node
pub fn node_local_name(doc: &Document, node: NodeId) -> String {
    if node == DOC_NODE {
        return String::new();
    }
    doc.tag(node).map(local_name).unwrap_or_default().to_string()
}

/// The element's namespace URI, empty when non-namespaced
pub fn node_namespace_uri(doc: &Document, node: NodeId) -> String {
    if node == DOC_NODE {
        return String::new();
    }
    doc.tag(node)
        .and_then(namespace_uri)
        .unwrap_or_default()
        .to_string()
}

//! Path-selector dialect: simple `/`-separated tag paths with
//! namespace-prefix resolution.
//!
//! Steps are tag tests (`tag`, `{uri}tag`, `{*}tag`, `{uri}*`,
//! `prefix:tag`, `*`), `.` for the context node, and `//` for a
//! descendant step (`.//tag` from the start). Prefixes resolve through
//! the caller-supplied [`NamespaceMap`] *before* any traversal; an
//! unknown prefix is a [`SelectorSyntaxError`], not an empty result.
//!
//! A bare tag never matches a namespaced element: parsed tags live in
//! Clark notation, so `foo` and `{uri}foo` are simply different
//! strings.

use crate::dom::namespace::{clark, local_name, namespace_uri, NamespaceMap};
use crate::dom::{Descendants, Document, NodeId};
use crate::error::{Result, SelectorSyntaxError};
use std::collections::HashSet;

/// Name test within one path step
#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    /// `*`: any element
    Any,
    /// Exact tag string: plain `tag` or resolved `{uri}tag`
    Exact(String),
    /// `{*}tag`: local name in any namespace, or none
    AnyNamespace(String),
    /// `{uri}*`: any local name in one namespace
    InNamespace(String),
}

impl NameTest {
    fn matches(&self, tag: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::Exact(name) => tag == name,
            NameTest::AnyNamespace(local) => local_name(tag) == local,
            NameTest::InNamespace(uri) => namespace_uri(tag) == Some(uri.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// `.`: the context node itself
    SelfNode,
    Child,
    /// `//`: any depth below the previous step
    Descendant,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NameTest,
}

/// First match of `path` under `from`, in document order
pub fn find(
    doc: &Document,
    from: NodeId,
    path: &str,
    ns: &NamespaceMap,
) -> Result<Option<NodeId>> {
    Ok(iter_find(doc, from, path, ns)?.next())
}

/// All matches of `path` under `from`, in document order
pub fn find_all(
    doc: &Document,
    from: NodeId,
    path: &str,
    ns: &NamespaceMap,
) -> Result<Vec<NodeId>> {
    Ok(iter_find(doc, from, path, ns)?.collect())
}

/// Lazily iterate matches of `path` under `from`.
///
/// The selector is compiled (and its prefixes resolved) up front, so
/// all syntax errors surface here rather than mid-iteration.
pub fn iter_find<'d>(
    doc: &'d Document,
    from: NodeId,
    path: &str,
    ns: &NamespaceMap,
) -> Result<IterFind<'d>> {
    let steps = compile(path, ns)?;
    doc.element(from)?;
    let first = Frame {
        candidates: Candidates::for_axis(doc, from, steps[0].axis),
        step: 0,
    };
    Ok(IterFind {
        doc,
        steps,
        frames: vec![first],
        seen: HashSet::new(),
    })
}

/// Compile a path into steps, resolving prefixes against `ns`
fn compile(path: &str, ns: &NamespaceMap) -> std::result::Result<Vec<Step>, SelectorSyntaxError> {
    let err = |message: &str| SelectorSyntaxError::new(path, message);

    if path.is_empty() {
        return Err(err("empty path"));
    }

    // Split on '/' outside Clark braces; URIs may contain slashes.
    let mut segments: Vec<&str> = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (at, c) in path.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                segments.push(&path[start..at]);
                start = at + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);

    if segments[0].is_empty() {
        return Err(err("absolute paths are not supported, start with './/'"));
    }

    let mut steps = Vec::new();
    let mut descendant_pending = false;
    for segment in segments {
        if segment.is_empty() {
            if descendant_pending {
                return Err(err("empty step"));
            }
            descendant_pending = true;
            continue;
        }
        let axis = if descendant_pending {
            Axis::Descendant
        } else {
            Axis::Child
        };
        descendant_pending = false;

        let step = match segment {
            "." => Step {
                axis: Axis::SelfNode,
                test: NameTest::Any,
            },
            ".." => return Err(err("parent steps are not supported")),
            _ => Step {
                axis,
                test: parse_name_test(segment, path, ns)?,
            },
        };
        steps.push(step);
    }
    if descendant_pending {
        // Trailing '/' or '//'
        return Err(err("path may not end with '/'"));
    }
    if steps.is_empty() {
        return Err(err("empty path"));
    }
    Ok(steps)
}

fn parse_name_test(
    segment: &str,
    path: &str,
    ns: &NamespaceMap,
) -> std::result::Result<NameTest, SelectorSyntaxError> {
    let err = |message: String| SelectorSyntaxError::new(path, message);

    if segment == "*" {
        return Ok(NameTest::Any);
    }

    if let Some(rest) = segment.strip_prefix('{') {
        let close = rest
            .find('}')
            .ok_or_else(|| err("unterminated '{' in step".to_string()))?;
        let uri = &rest[..close];
        let local = &rest[close + 1..];
        if local.is_empty() {
            return Err(err("missing local name after '}'".to_string()));
        }
        return Ok(match (uri, local) {
            ("*", "*") => NameTest::Any,
            ("*", _) => NameTest::AnyNamespace(local.to_string()),
            (_, "*") => NameTest::InNamespace(uri.to_string()),
            _ => NameTest::Exact(clark(uri, local)),
        });
    }
    if segment.contains('{') || segment.contains('}') {
        return Err(err("'{' only allowed at the start of a step".to_string()));
    }

    if let Some(colon) = segment.find(':') {
        let prefix = &segment[..colon];
        let local = &segment[colon + 1..];
        if prefix.is_empty() || local.is_empty() {
            return Err(err(format!("malformed step {:?}", segment)));
        }
        let uri = ns
            .get(prefix)
            .ok_or_else(|| err(format!("undefined namespace prefix {:?}", prefix)))?;
        return Ok(if local == "*" {
            NameTest::InNamespace(uri.to_string())
        } else {
            NameTest::Exact(clark(uri, local))
        });
    }

    Ok(NameTest::Exact(segment.to_string()))
}

/// Candidate nodes one axis produces from one matched node
enum Candidates<'d> {
    SelfNode(Option<NodeId>),
    Children(std::slice::Iter<'d, NodeId>),
    Descendants(Descendants<'d>),
}

impl<'d> Candidates<'d> {
    fn for_axis(doc: &'d Document, node: NodeId, axis: Axis) -> Self {
        match axis {
            Axis::SelfNode => Candidates::SelfNode(Some(node)),
            Axis::Child => Candidates::Children(doc.child_slice(node).iter()),
            Axis::Descendant => Candidates::Descendants(doc.descendants(node)),
        }
    }
}

impl Iterator for Candidates<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Candidates::SelfNode(slot) => slot.take(),
            Candidates::Children(iter) => iter.next().copied(),
            Candidates::Descendants(iter) => iter.next(),
        }
    }
}

/// One in-flight step of the match: candidates still to test
struct Frame<'d> {
    candidates: Candidates<'d>,
    step: usize,
}

/// Lazy iterator over path-selector matches, in document order
pub struct IterFind<'d> {
    doc: &'d Document,
    steps: Vec<Step>,
    frames: Vec<Frame<'d>>,
    /// Yield dedup; descendant steps can reach a node twice
    seen: HashSet<NodeId>,
}

impl Iterator for IterFind<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.frames.last_mut()?;
            let step = frame.step;
            let Some(node) = frame.candidates.next() else {
                self.frames.pop();
                continue;
            };
            let Some(tag) = self.doc.tag(node) else {
                continue;
            };
            if !self.steps[step].test.matches(tag) {
                continue;
            }
            if step + 1 == self.steps.len() {
                if self.seen.insert(node) {
                    return Some(node);
                }
                continue;
            }
            self.frames.push(Frame {
                candidates: Candidates::for_axis(self.doc, node, self.steps[step + 1].axis),
                step: step + 1,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn doc() -> Document {
        Document::parse_str(
            "<record xmlns:ex=\"http://example.com\">\
             <foo>plain</foo>\
             <ex:foo>spaced</ex:foo>\
             <bar><foo>nested</foo></bar>\
             </record>",
        )
        .unwrap()
    }

    #[test]
    fn test_bare_tag_skips_namespaced() {
        let doc = doc();
        let root = doc.root().unwrap();
        let hits = find_all(&doc, root, "foo", &NamespaceMap::new()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.text(hits[0]), Some("plain"));
    }

    #[test]
    fn test_clark_and_wildcard_namespace() {
        let doc = doc();
        let root = doc.root().unwrap();
        let ns = NamespaceMap::new();
        assert_eq!(
            find_all(&doc, root, "{http://example.com}foo", &ns)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(find_all(&doc, root, "{*}foo", &ns).unwrap().len(), 2);
        assert_eq!(
            find_all(&doc, root, "{http://example.com}*", &ns)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_prefix_requires_mapping() {
        let doc = doc();
        let root = doc.root().unwrap();
        let err = find_all(&doc, root, "ex:foo", &NamespaceMap::new()).unwrap_err();
        assert!(matches!(err, Error::Selector(_)));

        let ns: NamespaceMap = [("ex", "http://example.com")].into_iter().collect();
        let hits = find_all(&doc, root, "ex:foo", &ns).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(doc.text(hits[0]), Some("spaced"));
    }

    #[test]
    fn test_descendant_step() {
        let doc = doc();
        let root = doc.root().unwrap();
        let ns = NamespaceMap::new();
        let hits = find_all(&doc, root, ".//foo", &ns).unwrap();
        assert_eq!(hits.len(), 2);
        let nested = find_all(&doc, root, "bar/foo", &ns).unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(doc.text(nested[0]), Some("nested"));
    }

    #[test]
    fn test_descendant_dedup_in_document_order() {
        let doc = Document::parse_str("<r><a><a><b/></a><b/></a></r>").unwrap();
        let root = doc.root().unwrap();
        let hits = find_all(&doc, root, ".//a//b", &NamespaceMap::new()).unwrap();
        assert_eq!(hits.len(), 2);
        // Document order despite overlapping descendant sets.
        let all: Vec<_> = doc.descendants(root).collect();
        let expect: Vec<_> = all
            .into_iter()
            .filter(|&n| doc.tag(n) == Some("b"))
            .collect();
        assert_eq!(hits, expect);
    }

    #[test]
    fn test_find_returns_first() {
        let doc = doc();
        let root = doc.root().unwrap();
        let first = find(&doc, root, "{*}foo", &NamespaceMap::new()).unwrap();
        assert_eq!(first.map(|n| doc.text(n)), Some(Some("plain")));
        assert_eq!(find(&doc, root, "missing", &NamespaceMap::new()).unwrap(), None);
    }

    #[test]
    fn test_syntax_errors() {
        let doc = doc();
        let root = doc.root().unwrap();
        let ns = NamespaceMap::new();
        for bad in ["", "/abs", "a//", "a/", "{unclosed", "{u}", "a///b", "..", "a{b}"] {
            let err = find_all(&doc, root, bad, &ns).unwrap_err();
            assert!(matches!(err, Error::Selector(_)), "path {:?}", bad);
        }
    }

    #[test]
    fn test_self_step_and_star() {
        let doc = doc();
        let root = doc.root().unwrap();
        let ns = NamespaceMap::new();
        assert_eq!(find_all(&doc, root, ".", &ns).unwrap(), vec![root]);
        assert_eq!(find_all(&doc, root, "*", &ns).unwrap().len(), 3);
        assert_eq!(find_all(&doc, root, "./foo", &ns).unwrap().len(), 1);
    }
}

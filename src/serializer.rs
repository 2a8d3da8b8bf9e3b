//! Deterministic serialization of elements and documents.
//!
//! Rendering rules:
//! - attributes in insertion order as `name="value"`, values escaped
//! - the element's text right after the open tag, then each child in
//!   order, each followed by its own tail
//! - the serialized node's own tail is *not* emitted; tail text
//!   belongs to the parent's content stream and only appears when an
//!   ancestor is serialized
//! - an element with no text and no children collapses to `<tag/>`
//!
//! Namespaced tags are rendered back through the in-scope `xmlns`
//! declarations; when a tag's URI has no binding in scope a fresh
//! `xmlns:nsN` declaration is synthesized on that element.

use crate::core::entities::{escape_attr, escape_text};
use crate::dom::namespace::split_clark;
use crate::dom::{Document, NodeId};
use crate::error::{Result, TreeError};

/// Serialize the subtree rooted at `node` as UTF-8 bytes
pub fn serialize(doc: &Document, node: NodeId) -> Result<Vec<u8>> {
    serialize_to_string(doc, node).map(String::into_bytes)
}

/// Serialize the subtree rooted at `node` as a string
pub fn serialize_to_string(doc: &Document, node: NodeId) -> Result<String> {
    doc.tag(node).ok_or(TreeError::InvalidNode)?;
    let mut writer = Writer::new(doc);
    let mut out = String::new();
    writer.render(node, &mut out);
    Ok(out)
}

/// Serialize the whole document: XML declaration plus the root subtree.
///
/// Fails with [`TreeError::NoRoot`] when no root element is set; a
/// detached element cannot be the subject of document-level output.
pub fn serialize_document(doc: &Document) -> Result<Vec<u8>> {
    let root = doc.root().ok_or(TreeError::NoRoot)?;
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let mut writer = Writer::new(doc);
    writer.render(root, &mut out);
    Ok(out.into_bytes())
}

/// Prefix binding visible at the current render position; `prefix` is
/// `None` for the default namespace
struct Binding {
    prefix: Option<String>,
    uri: String,
}

struct Writer<'d> {
    doc: &'d Document,
    /// One frame of bindings per open element
    scopes: Vec<Vec<Binding>>,
    /// Counter for synthesized `nsN` prefixes
    synthesized: u32,
}

impl<'d> Writer<'d> {
    fn new(doc: &'d Document) -> Self {
        Writer {
            doc,
            scopes: Vec::new(),
            synthesized: 0,
        }
    }

    fn render(&mut self, node: NodeId, out: &mut String) {
        // Borrow the element data for the document's lifetime, not the
        // writer's, so scope bookkeeping below can take &mut self.
        let doc = self.doc;
        let Ok(data) = doc.element(node) else {
            return;
        };

        let mut frame: Vec<Binding> = Vec::new();
        for attr in &data.attributes {
            if attr.name == "xmlns" {
                frame.push(Binding {
                    prefix: None,
                    uri: attr.value.clone(),
                });
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                frame.push(Binding {
                    prefix: Some(prefix.to_string()),
                    uri: attr.value.clone(),
                });
            }
        }
        self.scopes.push(frame);

        let (name, synthesized) = self.rendered_name(&data.tag, data.prefix.as_deref());

        out.push('<');
        out.push_str(&name);
        for attr in &data.attributes {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&escape_attr(&attr.value));
            out.push('"');
        }
        if let Some((decl_name, uri)) = synthesized {
            out.push(' ');
            out.push_str(&decl_name);
            out.push_str("=\"");
            out.push_str(&escape_attr(&uri));
            out.push('"');
        }

        if data.text.is_none() && data.children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            if let Some(ref text) = data.text {
                out.push_str(&escape_text(text));
            }
            for &child in &data.children {
                self.render(child, out);
                if let Some(tail) = doc.tail(child) {
                    out.push_str(&escape_text(tail));
                }
            }
            out.push_str("</");
            out.push_str(&name);
            out.push('>');
        }

        self.scopes.pop();
    }

    /// Work out the on-the-wire name for a tag, synthesizing an
    /// `xmlns:nsN` declaration when nothing in scope covers its URI
    fn rendered_name(
        &mut self,
        tag: &str,
        source_prefix: Option<&str>,
    ) -> (String, Option<(String, String)>) {
        let Some((uri, local)) = split_clark(tag) else {
            return (tag.to_string(), None);
        };

        if let Some(prefix) = source_prefix {
            if self.lookup_prefix(prefix) == Some(uri) {
                return (format!("{}:{}", prefix, local), None);
            }
        }
        if self.lookup_default() == Some(uri) {
            return (local.to_string(), None);
        }
        if let Some(prefix) = self.prefix_for_uri(uri) {
            return (format!("{}:{}", prefix, local), None);
        }

        let prefix = format!("ns{}", self.synthesized);
        self.synthesized += 1;
        let name = format!("{}:{}", prefix, local);
        let decl = (format!("xmlns:{}", prefix), uri.to_string());
        if let Some(frame) = self.scopes.last_mut() {
            frame.push(Binding {
                prefix: Some(prefix),
                uri: uri.to_string(),
            });
        }
        (name, Some(decl))
    }

    fn lookup_prefix(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|b| b.prefix.as_deref() == Some(prefix))
            .map(|b| b.uri.as_str())
    }

    fn lookup_default(&self) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|b| b.prefix.is_none())
            .map(|b| b.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    /// Innermost prefix currently bound to `uri`, skipping shadowed ones
    fn prefix_for_uri(&self, uri: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .filter_map(|b| b.prefix.as_deref().map(|p| (p, b.uri.as_str())))
            .find(|&(p, u)| u == uri && self.lookup_prefix(p) == Some(uri))
            .map(|(p, _)| p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn text_of(doc: &Document, node: NodeId) -> String {
        serialize_to_string(doc, node).unwrap()
    }

    #[test]
    fn test_attributes_in_insertion_order() {
        let mut doc = Document::new();
        let el = doc.create_element_with("foo", [("name", "bar"), ("id", "1")]);
        doc.set_text(el, "Hello").unwrap();
        assert_eq!(text_of(&doc, el), "<foo name=\"bar\" id=\"1\">Hello</foo>");
    }

    #[test]
    fn test_empty_element_collapses() {
        let mut doc = Document::new();
        let el = doc.create_element("foo");
        assert_eq!(text_of(&doc, el), "<foo/>");
        // Empty text forces the long form.
        doc.set_text(el, "").unwrap();
        assert_eq!(text_of(&doc, el), "<foo></foo>");
    }

    #[test]
    fn test_tail_excluded_standalone_included_in_parent() {
        let mut doc = Document::new();
        let parent = doc.create_element("foo");
        let child = doc.create_sub_element(parent, "baz").unwrap();
        doc.set_text(child, "Hello").unwrap();
        doc.set_tail(child, "World").unwrap();
        assert_eq!(text_of(&doc, child), "<baz>Hello</baz>");
        assert_eq!(text_of(&doc, parent), "<foo><baz>Hello</baz>World</foo>");
    }

    #[test]
    fn test_escaping() {
        let mut doc = Document::new();
        let el = doc.create_element_with("a", [("q", "say \"hi\" & go")]);
        doc.set_text(el, "1 < 2 & 3 > 2").unwrap();
        assert_eq!(
            text_of(&doc, el),
            "<a q=\"say &quot;hi&quot; &amp; go\">1 &lt; 2 &amp; 3 &gt; 2</a>"
        );
    }

    #[test]
    fn test_parsed_prefix_round_trips() {
        let doc =
            Document::parse_str("<ex:foo xmlns:ex=\"http://example.com\"><ex:bar/></ex:foo>")
                .unwrap();
        let root = doc.root().unwrap();
        assert_eq!(
            text_of(&doc, root),
            "<ex:foo xmlns:ex=\"http://example.com\"><ex:bar/></ex:foo>"
        );
    }

    #[test]
    fn test_default_namespace_round_trips() {
        let doc = Document::parse_str("<doc xmlns=\"urn:d\"><child/></doc>").unwrap();
        let root = doc.root().unwrap();
        assert_eq!(text_of(&doc, root), "<doc xmlns=\"urn:d\"><child/></doc>");
    }

    #[test]
    fn test_synthesized_prefix_for_programmatic_namespace() {
        let mut doc = Document::new();
        let el = doc.create_element("{urn:x}item");
        assert_eq!(text_of(&doc, el), "<ns0:item xmlns:ns0=\"urn:x\"/>");
    }

    #[test]
    fn test_synthesized_prefix_reused_by_children() {
        let mut doc = Document::new();
        let parent = doc.create_element("{urn:x}list");
        doc.create_sub_element(parent, "{urn:x}item").unwrap();
        assert_eq!(
            text_of(&doc, parent),
            "<ns0:list xmlns:ns0=\"urn:x\"><ns0:item/></ns0:list>"
        );
    }

    #[test]
    fn test_document_serialization_needs_root() {
        let mut doc = Document::new();
        let detached = doc.create_element("a");
        assert!(serialize_document(&doc).is_err());
        doc.set_root(detached).unwrap();
        let bytes = serialize_document(&doc).unwrap();
        assert_eq!(
            bytes,
            b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a/>"
        );
    }
}

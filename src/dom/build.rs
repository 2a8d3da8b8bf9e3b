//! DOM construction from the pull-event stream.
//!
//! Resolves namespace prefixes to Clark-notation tags, attributes
//! character data to `text`/`tail`, and enforces the document-level
//! well-formedness rules the reader cannot see (tag matching, single
//! root, duplicate attributes).

use super::namespace::{clark, NamespaceResolver};
use super::{Attribute, DocInfo, Document, NodeId};
use crate::error::{ParseError, Result};
use crate::reader::events::{split_qname, StartElement, XmlEvent};
use crate::reader::slice::SliceReader;

/// Build a document from decoded input.
///
/// Returns the document plus the XML-declaration metadata when the
/// input carried one; the caller decides whether to keep it.
pub(crate) fn build(input: &str) -> Result<(Document, Option<DocInfo>)> {
    let mut doc = Document::new();
    let mut reader = SliceReader::new(input);
    let mut resolver = NamespaceResolver::new();
    // Parallel stacks: arena ids for linking, source names for
    // end-tag matching.
    let mut stack: Vec<NodeId> = Vec::new();
    let mut open_names: Vec<&str> = Vec::new();
    let mut info: Option<DocInfo> = None;

    while let Some(event) = reader.next_event()? {
        match event {
            XmlEvent::XmlDeclaration {
                version,
                encoding,
                standalone,
            } => {
                info = Some(DocInfo {
                    version,
                    encoding,
                    standalone,
                });
            }

            XmlEvent::StartElement(elem) => {
                let name = elem.name;
                let id = open_element(&mut doc, &mut resolver, &stack, elem)?;
                stack.push(id);
                open_names.push(name);
            }

            XmlEvent::EmptyElement(elem) => {
                open_element(&mut doc, &mut resolver, &stack, elem)?;
                resolver.pop_scope();
            }

            XmlEvent::EndElement(end) => match open_names.pop() {
                Some(open) if open == end.name => {
                    stack.pop();
                    resolver.pop_scope();
                }
                Some(open) => {
                    return Err(ParseError::new(
                        format!("mismatched tag: <{}> closed by </{}>", open, end.name),
                        end.offset,
                    )
                    .into());
                }
                None => {
                    return Err(ParseError::new(
                        format!("end tag </{}> without open element", end.name),
                        end.offset,
                    )
                    .into());
                }
            },

            XmlEvent::Text(content) => {
                attach_text(&mut doc, &stack, &content, reader.position())?;
            }

            XmlEvent::CData(content) => {
                attach_text(&mut doc, &stack, content, reader.position())?;
            }

            XmlEvent::Comment(_) | XmlEvent::ProcessingInstruction { .. } => {
                // Not represented in the element tree.
            }

            XmlEvent::DocType(_) => {
                if doc.root.is_some() || !stack.is_empty() {
                    return Err(ParseError::new(
                        "DOCTYPE only allowed before the root element",
                        reader.position(),
                    )
                    .into());
                }
            }
        }
    }

    if let Some(open) = open_names.first() {
        return Err(ParseError::new(format!("unclosed tag <{}>", open), input.len()).into());
    }
    if doc.root.is_none() {
        return Err(ParseError::new("no element found", input.len()).into());
    }

    Ok((doc, info))
}

/// Create the element for a start tag and link it into the tree
fn open_element(
    doc: &mut Document,
    resolver: &mut NamespaceResolver,
    stack: &[NodeId],
    elem: StartElement<'_>,
) -> Result<NodeId> {
    let parent = stack.last().copied();
    if parent.is_none() && doc.root.is_some() {
        return Err(ParseError::new(
            "extra content after document root",
            elem.offset,
        )
        .into());
    }

    if let Some(dup) = find_duplicate_attribute(&elem) {
        return Err(ParseError::new(format!("duplicate attribute {}", dup), elem.offset).into());
    }

    resolver.push_scope();
    for attr in &elem.attributes {
        if attr.name == "xmlns" {
            resolver.declare(None, &attr.value);
        } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
            resolver.declare(Some(prefix), &attr.value);
        }
    }

    let (prefix, local) = split_qname(elem.name);
    let tag = match prefix {
        Some(prefix) => {
            let uri = resolver.resolve(prefix).ok_or_else(|| {
                ParseError::new(format!("undefined namespace prefix {:?}", prefix), elem.offset)
            })?;
            clark(uri, local)
        }
        None => match resolver.resolve_default() {
            Some(uri) => clark(uri, local),
            None => local.to_string(),
        },
    };

    let id = doc.create_element(tag);
    {
        let data = &mut doc.nodes[id as usize];
        data.prefix = prefix.map(str::to_string);
        data.parent = parent;
        data.attributes = elem
            .attributes
            .into_iter()
            .map(|attr| Attribute {
                name: attr.name.to_string(),
                value: attr.value.into_owned(),
            })
            .collect();
    }

    match parent {
        Some(parent) => doc.nodes[parent as usize].children.push(id),
        None => doc.root = Some(id),
    }
    Ok(id)
}

/// Attach character data to the enclosing element: before any child it
/// is the element's `text`, after a child it is that child's `tail`.
fn attach_text(doc: &mut Document, stack: &[NodeId], content: &str, offset: usize) -> Result<()> {
    let Some(&current) = stack.last() else {
        // Whitespace around the root is insignificant; anything else
        // is stray content.
        if content.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\r')) {
            return Ok(());
        }
        return Err(ParseError::new("text outside the root element", offset).into());
    };

    let target = match doc.nodes[current as usize].children.last().copied() {
        Some(last_child) => &mut doc.nodes[last_child as usize].tail,
        None => &mut doc.nodes[current as usize].text,
    };
    match target {
        Some(existing) => existing.push_str(content),
        None => *target = Some(content.to_string()),
    }
    Ok(())
}

fn find_duplicate_attribute<'a>(elem: &'a StartElement<'_>) -> Option<&'a str> {
    let attrs = &elem.attributes;
    for i in 0..attrs.len() {
        for j in (i + 1)..attrs.len() {
            if attrs[i].name == attrs[j].name {
                return Some(attrs[i].name);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn parse(input: &str) -> Document {
        build(input).unwrap().0
    }

    fn parse_err(input: &str) -> Error {
        build(input).unwrap_err()
    }

    #[test]
    fn test_basic_tree() {
        let doc = parse("<record><foo>bar</foo></record>");
        let root = doc.root().unwrap();
        assert_eq!(doc.tag(root), Some("record"));
        let foo = doc.children(root).next().unwrap();
        assert_eq!(doc.tag(foo), Some("foo"));
        assert_eq!(doc.text(foo), Some("bar"));
    }

    #[test]
    fn test_text_and_tail_attribution() {
        let doc = parse("<a>one<b>two</b>three<c/>four</a>");
        let root = doc.root().unwrap();
        let kids: Vec<_> = doc.children(root).collect();
        assert_eq!(doc.text(root), Some("one"));
        assert_eq!(doc.text(kids[0]), Some("two"));
        assert_eq!(doc.tail(kids[0]), Some("three"));
        assert_eq!(doc.text(kids[1]), None);
        assert_eq!(doc.tail(kids[1]), Some("four"));
    }

    #[test]
    fn test_cdata_merges_into_text() {
        let doc = parse("<a>x<![CDATA[<raw>]]>y</a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.text(root), Some("x<raw>y"));
    }

    #[test]
    fn test_prefixed_tag_resolves_to_clark() {
        let doc = parse("<ex:foo xmlns:ex=\"http://example.com\"/>");
        let root = doc.root().unwrap();
        assert_eq!(doc.tag(root), Some("{http://example.com}foo"));
        // The declaration stays in the attribute list.
        assert_eq!(doc.attribute(root, "xmlns:ex"), Some("http://example.com"));
    }

    #[test]
    fn test_default_namespace_applies_to_bare_tags() {
        let doc = parse("<doc xmlns=\"urn:d\"><child/></doc>");
        let root = doc.root().unwrap();
        assert_eq!(doc.tag(root), Some("{urn:d}doc"));
        let child = doc.children(root).next().unwrap();
        assert_eq!(doc.tag(child), Some("{urn:d}child"));
    }

    #[test]
    fn test_undefined_prefix_fails() {
        assert!(matches!(parse_err("<x:foo/>"), Error::Parse(_)));
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(matches!(parse_err("<a><b></a></b>"), Error::Parse(_)));
    }

    #[test]
    fn test_unclosed_tag_fails() {
        assert!(matches!(parse_err("<a><b></b>"), Error::Parse(_)));
    }

    #[test]
    fn test_multiple_roots_fail() {
        assert!(matches!(parse_err("<a/><b/>"), Error::Parse(_)));
    }

    #[test]
    fn test_text_after_root_fails() {
        assert!(matches!(parse_err("<a/>junk"), Error::Parse(_)));
    }

    #[test]
    fn test_duplicate_attribute_fails() {
        assert!(matches!(parse_err("<a x=\"1\" x=\"2\"/>"), Error::Parse(_)));
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(parse_err(""), Error::Parse(_)));
        assert!(matches!(parse_err("   \n"), Error::Parse(_)));
    }

    #[test]
    fn test_declaration_captured() {
        let (_, info) = build("<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>").unwrap();
        let info = info.unwrap();
        assert_eq!(info.version.as_deref(), Some("1.0"));
        assert_eq!(info.encoding.as_deref(), Some("UTF-8"));
    }

    #[test]
    fn test_comments_and_pis_skipped() {
        let doc = parse("<!-- head --><a><?pi data?><b/><!-- tail --></a>");
        let root = doc.root().unwrap();
        assert_eq!(doc.child_count(root), 1);
    }
}

//! Event types for pull-parser style processing.
//!
//! Input is decoded to `str` before tokenizing, so events borrow
//! string slices; attribute values own their text only when entity
//! decoding rewrote them.

use std::borrow::Cow;

/// Parsing event produced by [`super::slice::SliceReader`]
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// Start of an element: `<name attrs...>`
    StartElement(StartElement<'a>),
    /// End of an element: `</name>`
    EndElement(EndElement<'a>),
    /// Empty element: `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    /// Character data between tags, entities decoded
    Text(Cow<'a, str>),
    /// CDATA section content, verbatim
    CData(&'a str),
    /// Comment body
    Comment(&'a str),
    /// Processing instruction: `<?target data?>`
    ProcessingInstruction {
        target: &'a str,
        data: Option<&'a str>,
    },
    /// XML declaration: `<?xml version="1.0" ...?>`
    XmlDeclaration {
        version: Option<String>,
        encoding: Option<String>,
        standalone: Option<bool>,
    },
    /// DOCTYPE declaration body, not interpreted
    DocType(&'a str),
}

/// Start/empty element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Element name as written (may include a prefix)
    pub name: &'a str,
    /// Attributes in source order, values entity-decoded
    pub attributes: Vec<RawAttribute<'a>>,
    /// Byte offset of the `<` that opened the tag
    pub offset: usize,
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    /// Element name as written
    pub name: &'a str,
    /// Byte offset of the `<` that opened the tag
    pub offset: usize,
}

/// One attribute as read from a start tag
#[derive(Debug, Clone)]
pub struct RawAttribute<'a> {
    pub name: &'a str,
    pub value: Cow<'a, str>,
}

impl<'a> StartElement<'a> {
    /// Get an attribute value by exact name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

/// Split a qualified name into prefix and local name at the colon
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

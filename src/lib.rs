//! # elemtree
//!
//! An ElementTree-style XML document model: parse files or strings
//! into a mutable element tree, edit it in place, serialize it back
//! deterministically, and query it with two namespace-aware selector
//! dialects.
//!
//! ## Quick start
//!
//! ```
//! use elemtree::{Document, NamespaceMap};
//!
//! let doc = Document::parse_str("<record><foo>bar</foo></record>")?;
//! let root = doc.root().unwrap();
//! let foo = doc.find(root, "foo", &NamespaceMap::new())?.unwrap();
//! assert_eq!(doc.text(foo), Some("bar"));
//! # Ok::<(), elemtree::Error>(())
//! ```
//!
//! ## Building trees
//!
//! Elements live in the document's arena and are addressed by `Copy`
//! [`NodeId`] handles; attaching an element that already has a parent
//! moves it, so a node can never end up under two parents.
//!
//! ```
//! use elemtree::Document;
//!
//! let mut doc = Document::new();
//! let foo = doc.create_element_with("foo", [("name", "bar")]);
//! doc.set_text(foo, "Hello")?;
//! assert_eq!(doc.serialize(foo)?, b"<foo name=\"bar\">Hello</foo>");
//! # Ok::<(), elemtree::Error>(())
//! ```
//!
//! ## Querying
//!
//! The path dialect ([`Document::find`], [`Document::find_all`],
//! [`Document::iter_find`]) resolves `prefix:tag` steps through a
//! per-call [`NamespaceMap`] and understands Clark notation
//! (`{uri}tag`, `{*}tag`). The expression dialect ([`Document::query`])
//! is a restricted XPath subset with `//`, predicates, and
//! `local-name()`/`namespace-uri()` filters. The two dialects report
//! misuse through deliberately unrelated error types; see [`error`].

pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod select;
pub mod serializer;
pub mod xpath;

pub use dom::{Attribute, DocInfo, Document, NamespaceMap, NodeId, ParseOptions};
pub use error::{
    Error, ExpressionEvalError, ParseError, Result, SelectorSyntaxError, TreeError,
};
pub use serializer::{serialize, serialize_document, serialize_to_string};
pub use xpath::Value;

/// Parse a file into a [`Document`]; see [`Document::parse_file`]
pub fn parse_file<P: AsRef<std::path::Path>>(path: P) -> Result<Document> {
    Document::parse_file(path)
}

/// Parse in-memory content into a [`Document`]; see
/// [`Document::parse_str`]
pub fn parse_str(input: &str) -> Result<Document> {
    Document::parse_str(input)
}

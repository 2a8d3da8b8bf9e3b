//! Arena-based element tree
//!
//! A [`Document`] owns every element it ever created in a flat arena;
//! [`NodeId`] handles (u32 indices) are `Copy` and stay valid for the
//! document's lifetime. Tree edges are a parent link plus an indexed
//! child list, which is what positional insert needs.
//!
//! A parsed file yields a document whose [`Document::root`] is set and
//! whose [`DocInfo`] carries the XML-declaration metadata; a document
//! built from a string or by hand has no `DocInfo`, and its elements
//! behave as detached subtrees until a root is nominated.

pub mod build;
pub mod namespace;

pub use namespace::NamespaceMap;

use crate::core::encoding;
use crate::error::{Error, Result, TreeError};
use crate::select;
use crate::xpath;
use std::path::Path;

/// Compact element identifier (index into the document arena)
pub type NodeId = u32;

/// One attribute: name as written in the source, decoded value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element storage inside the arena
#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    /// Tag in Clark notation (`{uri}local`) when namespaced
    pub(crate) tag: String,
    /// Namespace prefix as written in the source, kept for serialization
    pub(crate) prefix: Option<String>,
    /// Attributes in insertion order, `xmlns` declarations included
    pub(crate) attributes: Vec<Attribute>,
    /// Character data between the open tag and the first child
    pub(crate) text: Option<String>,
    /// Character data after this element's end tag, owned by the
    /// parent's content stream
    pub(crate) tail: Option<String>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl ElementData {
    fn new(tag: String) -> Self {
        ElementData {
            tag,
            prefix: None,
            attributes: Vec::new(),
            text: None,
            tail: None,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Document-level metadata from the XML declaration of a parsed file
#[derive(Debug, Clone, Default)]
pub struct DocInfo {
    pub version: Option<String>,
    /// Encoding label as declared (or detected) in the source
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

/// Options for file parsing
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub(crate) encoding: Option<String>,
}

impl ParseOptions {
    pub fn new() -> Self {
        ParseOptions::default()
    }

    /// Force this encoding, overriding both BOM and declaration
    pub fn encoding<S: Into<String>>(mut self, label: S) -> Self {
        self.encoding = Some(label.into());
        self
    }
}

/// An element tree plus the arena that owns its elements
#[derive(Debug, Default)]
pub struct Document {
    pub(crate) nodes: Vec<ElementData>,
    pub(crate) root: Option<NodeId>,
    pub(crate) info: Option<DocInfo>,
}

impl Document {
    /// Create an empty document for programmatic tree building
    pub fn new() -> Self {
        Document::default()
    }

    /// Parse a file into a document.
    ///
    /// The byte encoding follows the BOM or the declaration's
    /// `encoding=` label; see [`Document::parse_file_with`] for
    /// overriding a declaration that lies.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse_file_with(path, &ParseOptions::new())
    }

    /// Parse a file with explicit options
    pub fn parse_file_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Self> {
        let path = path.as_ref();
        // fs::read opens and closes the handle internally, so the file
        // is released on every path, parse errors included.
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let resolved = encoding::resolve(&bytes, options.encoding.as_deref())?;
        let text = encoding::decode(&bytes, resolved.encoding);

        let (mut doc, declared) = build::build(&text)?;
        let declared = declared.unwrap_or_default();
        doc.info = Some(DocInfo {
            version: declared.version,
            encoding: declared.encoding.or(resolved.declared),
            standalone: declared.standalone,
        });
        Ok(doc)
    }

    /// Parse in-memory content into a document.
    ///
    /// Unlike [`Document::parse_file`] the result carries no
    /// document-level metadata: the root element is a plain detached
    /// tree as far as document-level operations are concerned.
    pub fn parse_str(input: &str) -> Result<Self> {
        let (doc, _info) = build::build(input)?;
        Ok(doc)
    }

    /// Root element, if one has been parsed or nominated
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Nominate a detached element as the document root
    pub fn set_root(&mut self, node: NodeId) -> Result<()> {
        let data = self.element(node)?;
        if data.parent.is_some() {
            return Err(TreeError::AlreadyAttached.into());
        }
        self.root = Some(node);
        Ok(())
    }

    /// Document-level metadata (file parses only)
    pub fn info(&self) -> Option<&DocInfo> {
        self.info.as_ref()
    }

    /// Number of elements in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn element(&self, id: NodeId) -> std::result::Result<&ElementData, TreeError> {
        self.nodes.get(id as usize).ok_or(TreeError::InvalidNode)
    }

    pub(crate) fn element_mut(
        &mut self,
        id: NodeId,
    ) -> std::result::Result<&mut ElementData, TreeError> {
        self.nodes.get_mut(id as usize).ok_or(TreeError::InvalidNode)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a detached element.
    ///
    /// The tag may use Clark notation (`{uri}local`) for a namespaced
    /// element.
    pub fn create_element<S: Into<String>>(&mut self, tag: S) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(ElementData::new(tag.into()));
        id
    }

    /// Create a detached element with attributes
    pub fn create_element_with<S, I, N, V>(&mut self, tag: S, attributes: I) -> NodeId
    where
        S: Into<String>,
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let id = self.create_element(tag);
        let data = &mut self.nodes[id as usize];
        data.attributes.extend(
            attributes
                .into_iter()
                .map(|(name, value)| Attribute {
                    name: name.into(),
                    value: value.into(),
                }),
        );
        id
    }

    /// Create an element and append it as the last child of `parent`
    pub fn create_sub_element<S: Into<String>>(&mut self, parent: NodeId, tag: S) -> Result<NodeId> {
        self.element(parent)?;
        let child = self.create_element(tag);
        self.nodes[child as usize].parent = Some(parent);
        self.nodes[parent as usize].children.push(child);
        Ok(child)
    }

    // ------------------------------------------------------------------
    // Structure mutation
    // ------------------------------------------------------------------

    /// Insert `child` at `index` among `parent`'s children.
    ///
    /// A child that already has a parent is **moved**: it is detached
    /// from its previous parent first, so no element ever has two
    /// parents. Attaching an element inside its own subtree is
    /// rejected.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        let len = self.element(parent)?.children.len();
        if index > len {
            return Err(TreeError::IndexOutOfRange { index, len }.into());
        }
        self.detach(child)?;
        // Detaching from this same parent shifts later children left;
        // clamp so "insert at the end" stays valid.
        let len = self.nodes[parent as usize].children.len();
        let index = index.min(len);
        self.nodes[parent as usize].children.insert(index, child);
        self.nodes[child as usize].parent = Some(parent);
        Ok(())
    }

    /// Append `child` as the last child of `parent` (moving semantics,
    /// see [`Document::insert`])
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attachable(parent, child)?;
        self.detach(child)?;
        self.nodes[parent as usize].children.push(child);
        self.nodes[child as usize].parent = Some(parent);
        Ok(())
    }

    /// Remove `child` from `parent`, leaving it detached.
    ///
    /// The child keeps its subtree, attributes, text, and tail; the
    /// tail simply stops being rendered since no parent emits it.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.element(child)?.parent != Some(parent) {
            return Err(TreeError::NotAChild.into());
        }
        self.detach(child)
    }

    /// Detach an element from its parent, if it has one
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        let parent = self.element(node)?.parent;
        if let Some(parent) = parent {
            let children = &mut self.nodes[parent as usize].children;
            if let Some(at) = children.iter().position(|&c| c == node) {
                children.remove(at);
            }
            self.nodes[node as usize].parent = None;
        }
        Ok(())
    }

    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.element(child)?;
        self.element(parent)?;
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::WouldCycle.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    /// Tag name, in Clark notation when namespaced
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id as usize).map(|e| e.tag.as_str())
    }

    pub fn set_tag<S: Into<String>>(&mut self, id: NodeId, tag: S) -> Result<()> {
        self.element_mut(id)?.tag = tag.into();
        Ok(())
    }

    /// Namespace prefix the element carried in the source, if any
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id as usize).and_then(|e| e.prefix.as_deref())
    }

    /// Attribute value by name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id as usize).and_then(|e| {
            e.attributes
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str())
        })
    }

    /// All attributes in insertion order
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        self.nodes
            .get(id as usize)
            .map(|e| e.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Set an attribute. A new name lands at the end of the list; an
    /// existing one keeps its position and gets the new value.
    pub fn set_attribute<N, V>(&mut self, id: NodeId, name: N, value: V) -> Result<()>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        let value = value.into();
        let data = self.element_mut(id)?;
        match data.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => data.attributes.push(Attribute { name, value }),
        }
        Ok(())
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<Option<String>> {
        let data = self.element_mut(id)?;
        match data.attributes.iter().position(|a| a.name == name) {
            Some(at) => Ok(Some(data.attributes.remove(at).value)),
            None => Ok(None),
        }
    }

    /// Text inside the element, before its first child
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id as usize).and_then(|e| e.text.as_deref())
    }

    pub fn set_text<S: Into<String>>(&mut self, id: NodeId, text: S) -> Result<()> {
        self.element_mut(id)?.text = Some(text.into());
        Ok(())
    }

    /// Unset the text (distinct from setting it to an empty string)
    pub fn clear_text(&mut self, id: NodeId) -> Result<()> {
        self.element_mut(id)?.text = None;
        Ok(())
    }

    /// Text after the element's end tag, owned by the parent's stream
    pub fn tail(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id as usize).and_then(|e| e.tail.as_deref())
    }

    pub fn set_tail<S: Into<String>>(&mut self, id: NodeId, tail: S) -> Result<()> {
        self.element_mut(id)?.tail = Some(tail.into());
        Ok(())
    }

    pub fn clear_tail(&mut self, id: NodeId) -> Result<()> {
        self.element_mut(id)?.tail = None;
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id as usize).and_then(|e| e.parent)
    }

    /// Number of child elements
    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes.get(id as usize).map_or(0, |e| e.children.len())
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    pub(crate) fn child_slice(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id as usize)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
    }

    /// Iterate over direct children in order
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(id as usize)
            .map(|e| e.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .copied()
    }

    /// Iterate over all descendants in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        if let Some(data) = self.nodes.get(id as usize) {
            stack.extend(data.children.iter().rev().copied());
        }
        Descendants { doc: self, stack }
    }

    /// Iterate over ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Topmost ancestor of `id` (itself when detached)
    pub fn top(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize the subtree rooted at `node` as UTF-8 bytes
    pub fn serialize(&self, node: NodeId) -> Result<Vec<u8>> {
        crate::serializer::serialize(self, node)
    }

    /// Serialize the subtree rooted at `node` as a string
    pub fn serialize_to_string(&self, node: NodeId) -> Result<String> {
        crate::serializer::serialize_to_string(self, node)
    }

    /// Serialize the whole document with an XML declaration header;
    /// requires a root element
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        crate::serializer::serialize_document(self)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// First match of a path selector under `from`
    pub fn find(&self, from: NodeId, path: &str, ns: &NamespaceMap) -> Result<Option<NodeId>> {
        select::find(self, from, path, ns)
    }

    /// All matches of a path selector under `from`, in document order
    pub fn find_all(&self, from: NodeId, path: &str, ns: &NamespaceMap) -> Result<Vec<NodeId>> {
        select::find_all(self, from, path, ns)
    }

    /// Lazy iterator over path-selector matches
    pub fn iter_find<'d>(
        &'d self,
        from: NodeId,
        path: &str,
        ns: &NamespaceMap,
    ) -> Result<select::IterFind<'d>> {
        select::iter_find(self, from, path, ns)
    }

    /// Evaluate an expression query from `from`
    pub fn query(&self, from: NodeId, expr: &str, ns: &NamespaceMap) -> Result<xpath::Value> {
        self.element(from)?;
        xpath::evaluate(self, from, expr, ns).map_err(Error::from)
    }

    /// Evaluate an expression query and keep only element results
    pub fn query_nodes(&self, from: NodeId, expr: &str, ns: &NamespaceMap) -> Result<Vec<NodeId>> {
        match self.query(from, expr, ns)? {
            xpath::Value::NodeSet(nodes) => Ok(nodes),
            _ => Ok(Vec::new()),
        }
    }
}

/// Iterator over descendants in document order
pub struct Descendants<'d> {
    doc: &'d Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(data) = self.doc.nodes.get(current as usize) {
            self.stack.extend(data.children.iter().rev().copied());
        }
        Some(current)
    }
}

/// Iterator over ancestors, nearest first
pub struct Ancestors<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

//! Namespace handling: Clark notation, the parse-time scope resolver,
//! and the per-call prefix map used by the selector dialects.
//!
//! Element tags are stored in Clark notation (`{uri}local`) once the
//! parser has resolved their prefix. Query-time prefix resolution is
//! always against a caller-supplied [`NamespaceMap`]; nothing about
//! prefixes is remembered on the document.

use std::collections::HashMap;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

/// Build a Clark-notation name from a URI and local name
pub fn clark(uri: &str, local: &str) -> String {
    format!("{{{}}}{}", uri, local)
}

/// Split a Clark-notation name into `(uri, local)`.
///
/// Returns `None` for plain (non-namespaced) names.
pub fn split_clark(tag: &str) -> Option<(&str, &str)> {
    let rest = tag.strip_prefix('{')?;
    let close = rest.find('}')?;
    Some((&rest[..close], &rest[close + 1..]))
}

/// Local part of a possibly Clark-qualified name
pub fn local_name(tag: &str) -> &str {
    split_clark(tag).map_or(tag, |(_, local)| local)
}

/// Namespace URI of a Clark-qualified name, if any
pub fn namespace_uri(tag: &str) -> Option<&str> {
    split_clark(tag).map(|(uri, _)| uri)
}

/// Caller-supplied prefix → URI map, passed per selector call
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    bindings: HashMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        NamespaceMap::default()
    }

    /// Bind `prefix` to `uri`, replacing any previous binding
    pub fn insert<P: Into<String>, U: Into<String>>(&mut self, prefix: P, uri: U) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Look up a prefix
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<P: Into<String>, U: Into<String>> FromIterator<(P, U)> for NamespaceMap {
    fn from_iter<T: IntoIterator<Item = (P, U)>>(iter: T) -> Self {
        let mut map = NamespaceMap::new();
        for (prefix, uri) in iter {
            map.insert(prefix, uri);
        }
        map
    }
}

/// Binding declared by an `xmlns` attribute; `prefix` is `None` for
/// the default namespace
#[derive(Debug, Clone)]
struct ScopedBinding {
    prefix: Option<String>,
    uri: String,
    depth: u16,
}

/// Stack-based namespace resolver used while building the tree.
///
/// An `xmlns=""` declaration un-declares the default namespace; that
/// is represented as an empty URI and reported as `None` by
/// [`NamespaceResolver::resolve_default`].
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<ScopedBinding>,
    depth: u16,
}

impl NamespaceResolver {
    pub fn new() -> Self {
        // The xml prefix is bound implicitly in every document.
        NamespaceResolver {
            bindings: vec![ScopedBinding {
                prefix: Some("xml".to_string()),
                uri: ns::XML.to_string(),
                depth: 0,
            }],
            depth: 0,
        }
    }

    /// Enter an element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping its declarations
    pub fn pop_scope(&mut self) {
        while let Some(binding) = self.bindings.last() {
            if binding.depth < self.depth {
                break;
            }
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Declare a binding in the current scope
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) {
        if prefix == Some("xml") || prefix == Some("xmlns") {
            return;
        }
        self.bindings.push(ScopedBinding {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
            depth: self.depth,
        });
    }

    /// Resolve a prefix against the innermost declaration
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix.as_deref() == Some(prefix))
            .map(|b| b.uri.as_str())
    }

    /// Resolve the default namespace, `None` when absent or un-declared
    pub fn resolve_default(&self) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix.is_none())
            .map(|b| b.uri.as_str())
            .filter(|uri| !uri.is_empty())
    }
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        NamespaceResolver::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clark_roundtrip() {
        let name = clark("http://example.com", "foo");
        assert_eq!(name, "{http://example.com}foo");
        assert_eq!(split_clark(&name), Some(("http://example.com", "foo")));
        assert_eq!(split_clark("foo"), None);
        assert_eq!(local_name(&name), "foo");
        assert_eq!(namespace_uri("foo"), None);
    }

    #[test]
    fn test_xml_prefix_predeclared() {
        let resolver = NamespaceResolver::new();
        assert_eq!(resolver.resolve("xml"), Some(ns::XML));
    }

    #[test]
    fn test_scope_pop_drops_bindings() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare(Some("svg"), "http://www.w3.org/2000/svg");
        assert_eq!(resolver.resolve("svg"), Some("http://www.w3.org/2000/svg"));
        resolver.pop_scope();
        assert_eq!(resolver.resolve("svg"), None);
    }

    #[test]
    fn test_shadowed_binding() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare(Some("p"), "urn:one");
        resolver.push_scope();
        resolver.declare(Some("p"), "urn:two");
        assert_eq!(resolver.resolve("p"), Some("urn:two"));
        resolver.pop_scope();
        assert_eq!(resolver.resolve("p"), Some("urn:one"));
    }

    #[test]
    fn test_default_namespace_undeclare() {
        let mut resolver = NamespaceResolver::new();
        resolver.push_scope();
        resolver.declare(None, "urn:doc");
        assert_eq!(resolver.resolve_default(), Some("urn:doc"));
        resolver.push_scope();
        resolver.declare(None, "");
        assert_eq!(resolver.resolve_default(), None);
    }

    #[test]
    fn test_namespace_map() {
        let map: NamespaceMap = [("ex", "http://example.com")].into_iter().collect();
        assert_eq!(map.get("ex"), Some("http://example.com"));
        assert_eq!(map.get("other"), None);
    }
}

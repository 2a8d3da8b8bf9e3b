//! Namespace-aware selection across both query dialects, including
//! the error-class split between them.

use elemtree::{Document, Error, NamespaceMap, Value};

const SAMPLE: &str = "<record xmlns:ex=\"http://example.com\">\
                      <foo>plain</foo>\
                      <ex:foo>spaced</ex:foo>\
                      </record>";

fn sample() -> Document {
    Document::parse_str(SAMPLE).unwrap()
}

#[test]
fn bare_selector_matches_only_non_namespaced() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    assert_eq!(doc.find_all(root, "foo", &ns).unwrap().len(), 1);
    assert_eq!(doc.query_nodes(root, "//foo", &ns).unwrap().len(), 1);
}

#[test]
fn clark_notation_in_path_selectors() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    assert_eq!(
        doc.find_all(root, "{http://example.com}foo", &ns).unwrap().len(),
        1
    );
    assert_eq!(doc.find_all(root, "{*}foo", &ns).unwrap().len(), 2);
}

#[test]
fn wildcard_namespace_is_union_of_all() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    let bare: Vec<_> = doc.find_all(root, "foo", &ns).unwrap();
    let clark: Vec<_> = doc.find_all(root, "{http://example.com}foo", &ns).unwrap();
    let wild: Vec<_> = doc.find_all(root, "{*}foo", &ns).unwrap();
    assert_eq!(wild.len(), bare.len() + clark.len());
    for n in bare.iter().chain(clark.iter()) {
        assert!(wild.contains(n));
    }
}

#[test]
fn unknown_prefix_in_path_selector_is_selector_syntax_error() {
    let doc = sample();
    let root = doc.root().unwrap();
    let err = doc.find_all(root, "ex:foo", &NamespaceMap::new()).unwrap_err();
    assert!(matches!(err, Error::Selector(_)));
}

#[test]
fn unknown_prefix_in_expression_is_evaluation_error() {
    let doc = sample();
    let root = doc.root().unwrap();
    let err = doc.query(root, "//ex:foo", &NamespaceMap::new()).unwrap_err();
    assert!(matches!(err, Error::Eval(_)));
}

#[test]
fn error_classes_are_siblings_not_subtypes() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    // Same misuse, two dialects, two unrelated error categories.
    let path_err = doc.find_all(root, "ex:foo", &ns).unwrap_err();
    let expr_err = doc.query(root, "//ex:foo", &ns).unwrap_err();
    assert!(matches!(path_err, Error::Selector(_)));
    assert!(!matches!(path_err, Error::Eval(_)));
    assert!(matches!(expr_err, Error::Eval(_)));
    assert!(!matches!(expr_err, Error::Selector(_)));
}

#[test]
fn supplied_namespace_map_resolves_both_dialects() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns: NamespaceMap = [("xmlfoo", "http://example.com")].into_iter().collect();

    let found = doc.find_all(root, "xmlfoo:foo", &ns).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(doc.text(found[0]), Some("spaced"));
    // Exactly the Clark-notation equivalent.
    assert_eq!(
        found,
        doc.find_all(root, "{http://example.com}foo", &NamespaceMap::new())
            .unwrap()
    );

    assert_eq!(doc.query_nodes(root, "//xmlfoo:foo", &ns).unwrap().len(), 1);
}

#[test]
fn local_name_predicates_scan_every_namespace() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    assert_eq!(
        doc.query_nodes(root, "//*[local-name(.) = \"foo\"]", &ns)
            .unwrap()
            .len(),
        2
    );
    assert_eq!(
        doc.query_nodes(
            root,
            "//*[local-name(.) = \"foo\" and namespace-uri() = \"http://example.com\"]",
            &ns,
        )
        .unwrap()
        .len(),
        1
    );
}

#[test]
fn namespace_wildcard_token_always_fails_evaluation() {
    let doc = sample();
    let root = doc.root().unwrap();
    let err = doc.query(root, "//*:foo", &NamespaceMap::new()).unwrap_err();
    assert!(matches!(err, Error::Eval(_)));

    // Still fails with a map supplied; it is a dialect limitation,
    // not a resolution problem.
    let ns: NamespaceMap = [("ex", "http://example.com")].into_iter().collect();
    let err = doc.query(root, "//*:foo", &ns).unwrap_err();
    assert!(matches!(err, Error::Eval(_)));
}

#[test]
fn iter_find_agrees_with_find_all() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    let eager = doc.find_all(root, "{*}foo", &ns).unwrap();
    let lazy: Vec<_> = doc.iter_find(root, "{*}foo", &ns).unwrap().collect();
    assert_eq!(eager, lazy);

    let mut iter = doc.iter_find(root, "{*}foo", &ns).unwrap();
    assert_eq!(iter.next(), doc.find(root, "{*}foo", &ns).unwrap());
}

#[test]
fn per_call_maps_do_not_leak_between_queries() {
    let doc = sample();
    let root = doc.root().unwrap();
    let with_map: NamespaceMap = [("p", "http://example.com")].into_iter().collect();

    // Same expression text, alternating maps: the compiled program is
    // cached but prefix resolution stays per call.
    assert_eq!(doc.query_nodes(root, "//p:foo", &with_map).unwrap().len(), 1);
    assert!(doc.query(root, "//p:foo", &NamespaceMap::new()).is_err());
    assert_eq!(doc.query_nodes(root, "//p:foo", &with_map).unwrap().len(), 1);

    let other: NamespaceMap = [("p", "urn:elsewhere")].into_iter().collect();
    assert!(doc.query_nodes(root, "//p:foo", &other).unwrap().is_empty());
}

#[test]
fn query_value_kinds() {
    let doc = sample();
    let root = doc.root().unwrap();
    let ns = NamespaceMap::new();

    match doc.query(root, "count(//*)", &ns).unwrap() {
        Value::Number(n) => assert_eq!(n, 3.0),
        other => panic!("expected number, got {:?}", other),
    }
    match doc.query(root, "local-name(.)", &ns).unwrap() {
        Value::String(s) => assert_eq!(s, "record"),
        other => panic!("expected string, got {:?}", other),
    }
}

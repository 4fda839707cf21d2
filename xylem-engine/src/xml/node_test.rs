use xot::{Value, ValueType, Xot};

use xylem_ast::ast;
use xylem_name::Name;
use xylem_xpath_type::{KindTest, NameTest, NodeKind};

/// Resolve an engine name to the xot name id, if the document pool has
/// ever seen it.
pub(crate) fn to_name_id(name: &Name, xot: &Xot) -> Option<xot::NameId> {
    if let Some(namespace) = name.namespace() {
        let namespace_id = xot.namespace(namespace)?;
        xot.name_ns(name.local_name(), namespace_id)
    } else {
        xot.name(name.local_name())
    }
}

pub(crate) fn node_kind(xot: &Xot, node: xot::Node) -> NodeKind {
    match xot.value_type(node) {
        ValueType::Document => NodeKind::Document,
        ValueType::Element => NodeKind::Element,
        ValueType::Attribute => NodeKind::Attribute,
        ValueType::Text => NodeKind::Text,
        ValueType::Comment => NodeKind::Comment,
        ValueType::ProcessingInstruction => NodeKind::ProcessingInstruction,
        ValueType::Namespace => NodeKind::Namespace,
    }
}

/// The expanded name of a node, for kinds that have one.
pub(crate) fn node_name(xot: &Xot, node: xot::Node) -> Option<Name> {
    let name_id = match xot.value(node) {
        Value::Element(element) => element.name(),
        Value::Attribute(attribute) => attribute.name(),
        Value::ProcessingInstruction(pi) => pi.target(),
        _ => return None,
    };
    let (local, namespace) = xot.name_ns_str(name_id);
    if namespace.is_empty() {
        Some(Name::unprefixed(local))
    } else {
        Some(Name::uri_qualified(namespace, local))
    }
}

/// Whether a node passes a step's node test along the given axis.
pub(crate) fn matches_node_test(
    test: &ast::NodeTest,
    axis: ast::Axis,
    xot: &Xot,
    node: xot::Node,
) -> bool {
    match test {
        ast::NodeTest::Kind(kind_test) => matches_kind_test(kind_test, xot, node),
        ast::NodeTest::Name(name_test) => {
            if xot.value_type(node) != principal_node_type(axis) {
                return false;
            }
            matches_name_test(name_test, xot, node)
        }
    }
}

/// Whether a node matches a kind test.
pub(crate) fn matches_kind_test(test: &KindTest, xot: &Xot, node: xot::Node) -> bool {
    match test {
        KindTest::Any => true,
        KindTest::Kind(kind, name_test) => {
            if node_kind(xot, node) != *kind {
                return false;
            }
            match kind {
                NodeKind::Document => {
                    // an inner name test constrains the document element
                    match name_test {
                        NameTest::Wildcard => true,
                        _ => match xot.document_element(node) {
                            Ok(element) => matches_name_test(name_test, xot, element),
                            Err(_) => false,
                        },
                    }
                }
                NodeKind::Text | NodeKind::Comment | NodeKind::Namespace => true,
                _ => matches_name_test(name_test, xot, node),
            }
        }
    }
}

fn matches_name_test(test: &NameTest, xot: &Xot, node: xot::Node) -> bool {
    match test {
        NameTest::Wildcard => true,
        NameTest::Name(name) => match to_name_id(name, xot) {
            // a name no document ever used cannot match
            None => false,
            Some(name_id) => match xot.value(node) {
                Value::Element(element) => element.name() == name_id,
                Value::Attribute(attribute) => attribute.name() == name_id,
                Value::ProcessingInstruction(pi) => pi.target() == name_id,
                _ => false,
            },
        },
        NameTest::LocalName(local) => match node_name(xot, node) {
            Some(name) => name.local_name() == local,
            None => false,
        },
        NameTest::Namespace(uri) => match node_name(xot, node) {
            Some(name) => name.namespace() == Some(uri.as_str()),
            None => false,
        },
    }
}

fn principal_node_type(axis: ast::Axis) -> ValueType {
    match axis {
        ast::Axis::Attribute => ValueType::Attribute,
        ast::Axis::Namespace => ValueType::Namespace,
        _ => ValueType::Element,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_test_on_elements() {
        let mut xot = Xot::new();
        let doc = xot.parse("<root><a/><b/></root>").unwrap();
        let root = xot.document_element(doc).unwrap();
        let a = xot.first_child(root).unwrap();
        let test = ast::NodeTest::Name(NameTest::Name(Name::unprefixed("a")));
        assert!(matches_node_test(&test, ast::Axis::Child, &xot, a));
        let b = xot.next_sibling(a).unwrap();
        assert!(!matches_node_test(&test, ast::Axis::Child, &xot, b));
    }

    #[test]
    fn test_kind_tests() {
        let mut xot = Xot::new();
        let doc = xot.parse("<root>text<!--c--></root>").unwrap();
        let root = xot.document_element(doc).unwrap();
        let text = xot.first_child(root).unwrap();
        let comment = xot.next_sibling(text).unwrap();
        assert!(matches_kind_test(&KindTest::Any, &xot, doc));
        assert!(matches_kind_test(
            &KindTest::Kind(NodeKind::Text, NameTest::Wildcard),
            &xot,
            text
        ));
        assert!(matches_kind_test(
            &KindTest::Kind(NodeKind::Comment, NameTest::Wildcard),
            &xot,
            comment
        ));
        assert!(!matches_kind_test(
            &KindTest::Kind(NodeKind::Element, NameTest::Wildcard),
            &xot,
            text
        ));
    }

    #[test]
    fn test_document_test_with_element_name() {
        let mut xot = Xot::new();
        let doc = xot.parse("<root/>").unwrap();
        let matching = KindTest::Kind(
            NodeKind::Document,
            NameTest::Name(Name::unprefixed("root")),
        );
        let other = KindTest::Kind(
            NodeKind::Document,
            NameTest::Name(Name::unprefixed("other")),
        );
        assert!(matches_kind_test(&matching, &xot, doc));
        assert!(!matches_kind_test(&other, &xot, doc));
    }

    #[test]
    fn test_namespace_wildcard() {
        let mut xot = Xot::new();
        let doc = xot
            .parse(r#"<root xmlns:p="http://ns"><p:a/><b/></root>"#)
            .unwrap();
        let root = xot.document_element(doc).unwrap();
        let a = xot.first_child(root).unwrap();
        let b = xot.next_sibling(a).unwrap();
        let test = ast::NodeTest::Kind(KindTest::Kind(
            NodeKind::Element,
            NameTest::Namespace("http://ns".to_string()),
        ));
        assert!(matches_node_test(&test, ast::Axis::Child, &xot, a));
        assert!(!matches_node_test(&test, ast::Axis::Child, &xot, b));
    }
}

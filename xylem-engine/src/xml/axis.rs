use xot::Xot;

use xylem_ast::ast;

use crate::sequence::Item;

use super::node_test::matches_node_test;

fn convert_axis(axis: ast::Axis) -> xot::Axis {
    match axis {
        ast::Axis::Child => xot::Axis::Child,
        ast::Axis::Descendant => xot::Axis::Descendant,
        ast::Axis::Parent => xot::Axis::Parent,
        ast::Axis::Ancestor => xot::Axis::Ancestor,
        ast::Axis::FollowingSibling => xot::Axis::FollowingSibling,
        ast::Axis::PrecedingSibling => xot::Axis::PrecedingSibling,
        ast::Axis::Following => xot::Axis::Following,
        ast::Axis::Preceding => xot::Axis::Preceding,
        ast::Axis::DescendantOrSelf => xot::Axis::DescendantOrSelf,
        ast::Axis::AncestorOrSelf => xot::Axis::AncestorOrSelf,
        ast::Axis::SelfAxis => xot::Axis::Self_,
        ast::Axis::Attribute => xot::Axis::Attribute,
        ast::Axis::Namespace => {
            unreachable!("the namespace axis is rejected at compile time")
        }
    }
}

/// Walk an axis from a context node, filtering by the node test.
///
/// Forward axes deliver document order; reverse axes deliver reverse
/// document order, which is the order their positional predicates count
/// in.
pub(crate) fn resolve_step(
    axis: ast::Axis,
    node_test: &ast::NodeTest,
    xot: &Xot,
    node: xot::Node,
) -> Vec<Item> {
    xot.axis(convert_axis(axis), node)
        .filter(|candidate| matches_node_test(node_test, axis, xot, *candidate))
        .map(Item::Node)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xylem_name::Name;
    use xylem_xpath_type::NameTest;

    fn names(xot: &Xot, items: &[Item]) -> Vec<String> {
        items
            .iter()
            .map(|item| match item {
                Item::Node(node) => super::super::node_test::node_name(xot, *node)
                    .map(|name| name.local_name().to_string())
                    .unwrap_or_default(),
                _ => String::new(),
            })
            .collect()
    }

    #[test]
    fn test_child_axis_in_document_order() {
        let mut xot = Xot::new();
        let doc = xot.parse("<root><a/><b/><a/></root>").unwrap();
        let root = xot.document_element(doc).unwrap();
        let test = ast::NodeTest::Name(NameTest::Name(Name::unprefixed("a")));
        let result = resolve_step(ast::Axis::Child, &test, &xot, root);
        assert_eq!(names(&xot, &result), vec!["a", "a"]);
    }

    #[test]
    fn test_ancestor_axis_is_reverse() {
        let mut xot = Xot::new();
        let doc = xot.parse("<a><b><c/></b></a>").unwrap();
        let a = xot.document_element(doc).unwrap();
        let b = xot.first_child(a).unwrap();
        let c = xot.first_child(b).unwrap();
        let test = ast::NodeTest::Name(NameTest::Wildcard);
        let result = resolve_step(ast::Axis::Ancestor, &test, &xot, c);
        // nearest ancestor first
        assert_eq!(names(&xot, &result), vec!["b", "a"]);
    }

    #[test]
    fn test_attribute_axis() {
        let mut xot = Xot::new();
        let doc = xot.parse(r#"<root x="1" y="2"/>"#).unwrap();
        let root = xot.document_element(doc).unwrap();
        let test = ast::NodeTest::Name(NameTest::Wildcard);
        let result = resolve_step(ast::Axis::Attribute, &test, &xot, root);
        assert_eq!(result.len(), 2);
        let named = ast::NodeTest::Name(NameTest::Name(Name::unprefixed("x")));
        let result = resolve_step(ast::Axis::Attribute, &named, &xot, root);
        assert_eq!(result.len(), 1);
    }
}

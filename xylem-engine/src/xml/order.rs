// Document order for nodes. Each registered tree gets a process-unique
// document number; within a tree nodes are numbered in preorder. Nodes of
// trees built during evaluation are annotated on demand by walking up to
// their root and numbering the whole tree.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use ahash::{HashMap, HashMapExt};
use xot::Xot;

use crate::error;
use crate::sequence::Item;

static DOCUMENT_NUMBERS: AtomicUsize = AtomicUsize::new(1);

fn next_document_number() -> usize {
    DOCUMENT_NUMBERS.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A position in the global node order: document number, then preorder
/// index within the tree.
#[derive(Debug, Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub struct DocumentOrder(pub usize, pub usize);

impl DocumentOrder {
    /// The document number component.
    pub fn document_number(&self) -> usize {
        self.0
    }

    /// A stable alphanumeric id for generate-id-style use.
    pub fn generate_id(&self) -> String {
        format!("d{}s{}", self.0, self.1)
    }
}

/// Per-node document order annotations.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    map: HashMap<xot::Node, DocumentOrder>,
}

impl Annotations {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Annotate a whole tree, handing it the next document number. Already
    /// known trees keep their numbers.
    pub fn add(&mut self, xot: &Xot, root: xot::Node) -> usize {
        if let Some(order) = self.map.get(&root) {
            return order.0;
        }
        let number = next_document_number();
        self.map.extend(
            xot.all_descendants(root)
                .enumerate()
                .map(|(i, node)| (node, DocumentOrder(number, i))),
        );
        // attribute nodes sit between their element and its children
        let attributes: Vec<_> = xot
            .all_descendants(root)
            .filter(|node| xot.is_element(*node))
            .flat_map(|element| xot.axis(xot::Axis::Attribute, element))
            .collect();
        for attribute in attributes {
            let parent_order = self
                .map
                .get(&xot.parent(attribute).expect("attribute has parent"))
                .copied();
            if let Some(DocumentOrder(_, parent_pre)) = parent_order {
                // order attributes directly after their parent, keeping
                // their relative order via the node id
                self.map
                    .insert(attribute, DocumentOrder(number, parent_pre));
            }
        }
        number
    }

    /// The order of a node, annotating its tree first if needed.
    pub fn get(&mut self, xot: &Xot, node: xot::Node) -> DocumentOrder {
        if let Some(order) = self.map.get(&node) {
            return *order;
        }
        let mut root = node;
        while let Some(parent) = xot.parent(root) {
            root = parent;
        }
        self.add(xot, root);
        match self.map.get(&node) {
            Some(order) => *order,
            None => {
                // attribute of a tree annotated before attribute handling;
                // fall back to the parent's slot
                let parent = xot.parent(node).expect("unannotated node has parent");
                let parent_order = self.get(xot, parent);
                self.map.insert(node, parent_order);
                parent_order
            }
        }
    }
}

/// How two nodes are ordered.
///
/// The local comparer assumes both nodes live in one tree and compares
/// preorder alone; the global comparer ranks by document number first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOrderComparer {
    Local,
    Global,
}

impl NodeOrderComparer {
    pub fn compare(
        &self,
        annotations: &mut Annotations,
        xot: &Xot,
        a: xot::Node,
        b: xot::Node,
    ) -> Ordering {
        let order_a = annotations.get(xot, a);
        let order_b = annotations.get(xot, b);
        match self {
            NodeOrderComparer::Local => order_a.1.cmp(&order_b.1),
            NodeOrderComparer::Global => order_a.cmp(&order_b),
        }
    }
}

/// Sort nodes into document order and remove duplicates.
///
/// Every item must be a node; a non-node raises
/// [`error::Error::XPTY0018`].
pub fn sort_into_document_order(
    items: Vec<Item>,
    comparer: NodeOrderComparer,
    annotations: &mut Annotations,
    xot: &Xot,
) -> error::Result<Vec<Item>> {
    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Node(node) => nodes.push(node),
            _ => return Err(error::Error::XPTY0018),
        }
    }
    nodes.sort_by(|a, b| comparer.compare(annotations, xot, *a, *b));
    nodes.dedup();
    Ok(nodes.into_iter().map(Item::Node).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preorder_within_document() {
        let mut xot = Xot::new();
        let doc = xot.parse("<root><a/><b><c/></b></root>").unwrap();
        let mut annotations = Annotations::new();
        annotations.add(&xot, doc);
        let root = xot.document_element(doc).unwrap();
        let a = xot.first_child(root).unwrap();
        let b = xot.next_sibling(a).unwrap();
        let c = xot.first_child(b).unwrap();
        let ann = &mut annotations;
        assert!(ann.get(&xot, root) < ann.get(&xot, a));
        assert!(ann.get(&xot, a) < ann.get(&xot, b));
        assert!(ann.get(&xot, b) < ann.get(&xot, c));
    }

    #[test]
    fn test_document_numbers_are_distinct() {
        let mut xot = Xot::new();
        let d1 = xot.parse("<a/>").unwrap();
        let d2 = xot.parse("<b/>").unwrap();
        let mut annotations = Annotations::new();
        let n1 = annotations.add(&xot, d1);
        let n2 = annotations.add(&xot, d2);
        assert_ne!(n1, n2);
        // registering again does not renumber
        assert_eq!(annotations.add(&xot, d1), n1);
    }

    #[test]
    fn test_sort_dedups_across_documents() {
        let mut xot = Xot::new();
        let d1 = xot.parse("<a/>").unwrap();
        let d2 = xot.parse("<b/>").unwrap();
        let mut annotations = Annotations::new();
        annotations.add(&xot, d1);
        annotations.add(&xot, d2);
        let e1 = xot.document_element(d1).unwrap();
        let e2 = xot.document_element(d2).unwrap();
        let sorted = sort_into_document_order(
            vec![Item::Node(e2), Item::Node(e1), Item::Node(e1)],
            NodeOrderComparer::Global,
            &mut annotations,
            &xot,
        )
        .unwrap();
        assert_eq!(sorted, vec![Item::Node(e1), Item::Node(e2)]);
    }

    #[test]
    fn test_non_node_rejected() {
        let xot = Xot::new();
        let mut annotations = Annotations::new();
        let result = sort_into_document_order(
            vec![Item::from(1i64)],
            NodeOrderComparer::Global,
            &mut annotations,
            &xot,
        );
        assert_eq!(result, Err(error::Error::XPTY0018));
    }
}

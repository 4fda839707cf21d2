//! The push contract the evaluator drives output through.
//!
//! A destination receives a stream of events; name codes refer to the
//! process name pool. The tree builder materializes the stream as a
//! document in the document pool; the sequence collector gathers appended
//! items for callers that want a value instead of a tree.

use std::cell::RefCell;
use std::rc::Rc;

use xylem_name::{NameCode, NamePool};

use crate::error::{self, Location};
use crate::sequence::Item;
use crate::xml::{Documents, Uri};

/// Receives a push stream of document events.
pub trait Destination {
    fn start_document(&mut self) -> error::Result<()>;
    fn end_document(&mut self) -> error::Result<()>;
    fn start_element(
        &mut self,
        name: NameCode,
        type_code: i32,
        location: &Location,
        properties: u32,
    ) -> error::Result<()>;
    fn end_element(&mut self) -> error::Result<()>;
    fn attribute(&mut self, name: NameCode, value: &str) -> error::Result<()>;
    fn text(&mut self, value: &str) -> error::Result<()>;
    fn comment(&mut self, value: &str) -> error::Result<()>;
    fn processing_instruction(&mut self, target: &str, data: &str) -> error::Result<()>;
    fn namespace(&mut self, prefix: &str, uri: &str) -> error::Result<()>;
    /// Append a finished item: atomic values become text, nodes are
    /// copied into the output.
    fn append(
        &mut self,
        item: &Item,
        location: &Location,
        copy_namespaces: bool,
    ) -> error::Result<()>;
}

/// Builds a tree in the document pool from the event stream.
pub struct TreeBuilder {
    documents: Rc<RefCell<Documents>>,
    pool: &'static NamePool,
    // the chain of open nodes; the bottom is the document node
    stack: Vec<xot::Node>,
    root: Option<xot::Node>,
    uri: Uri,
}

impl TreeBuilder {
    pub fn new(documents: Rc<RefCell<Documents>>, uri: Uri) -> Self {
        TreeBuilder {
            documents,
            pool: NamePool::global(),
            stack: Vec::new(),
            root: None,
            uri,
        }
    }

    /// The built document root, once the stream has ended.
    pub fn root(&self) -> Option<xot::Node> {
        self.root
    }

    fn name_id(&self, name: NameCode, xot: &mut xot::Xot) -> xot::NameId {
        let namespace = self.pool.namespace(name);
        let local = self.pool.local_name(name);
        if namespace.is_empty() {
            xot.add_name(&local)
        } else {
            let namespace_id = xot.add_namespace(&namespace);
            xot.add_name_ns(&local, namespace_id)
        }
    }

    fn parent(&self) -> error::Result<xot::Node> {
        self.stack.last().copied().ok_or(error::Error::Internal)
    }

    fn attach(&mut self, node: xot::Node) -> error::Result<()> {
        let parent = self.parent()?;
        let mut documents = self.documents.borrow_mut();
        documents
            .xot_mut()
            .append(parent, node)
            .map_err(|_| error::Error::Internal)
    }
}

impl Destination for TreeBuilder {
    fn start_document(&mut self) -> error::Result<()> {
        let mut documents = self.documents.borrow_mut();
        let document = documents.xot_mut().new_document();
        self.stack.push(document);
        Ok(())
    }

    fn end_document(&mut self) -> error::Result<()> {
        let document = self.stack.pop().ok_or(error::Error::Internal)?;
        self.root = Some(document);
        self.documents.borrow_mut().add_root(&self.uri, document);
        Ok(())
    }

    fn start_element(
        &mut self,
        name: NameCode,
        _type_code: i32,
        _location: &Location,
        _properties: u32,
    ) -> error::Result<()> {
        let element = {
            let mut documents = self.documents.borrow_mut();
            let name_id = self.name_id(name, documents.xot_mut());
            documents.xot_mut().new_element(name_id)
        };
        self.attach(element)?;
        self.stack.push(element);
        Ok(())
    }

    fn end_element(&mut self) -> error::Result<()> {
        self.stack.pop().ok_or(error::Error::Internal)?;
        Ok(())
    }

    fn attribute(&mut self, name: NameCode, value: &str) -> error::Result<()> {
        let element = self.parent()?;
        let mut documents = self.documents.borrow_mut();
        let name_id = self.name_id(name, documents.xot_mut());
        let attribute = documents.xot_mut().new_attribute_node(name_id, value.to_string());
        documents
            .xot_mut()
            .append(element, attribute)
            .map_err(|_| error::Error::Internal)
    }

    fn text(&mut self, value: &str) -> error::Result<()> {
        let node = self.documents.borrow_mut().xot_mut().new_text(value);
        self.attach(node)
    }

    fn comment(&mut self, value: &str) -> error::Result<()> {
        let node = self.documents.borrow_mut().xot_mut().new_comment(value);
        self.attach(node)
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> error::Result<()> {
        let node = {
            let mut documents = self.documents.borrow_mut();
            let target_id = documents.xot_mut().add_name(target);
            let data = if data.is_empty() { None } else { Some(data) };
            documents.xot_mut().new_processing_instruction(target_id, data)
        };
        self.attach(node)
    }

    fn namespace(&mut self, prefix: &str, uri: &str) -> error::Result<()> {
        let node = {
            let mut documents = self.documents.borrow_mut();
            let prefix_id = documents.xot_mut().add_prefix(prefix);
            let namespace_id = documents.xot_mut().add_namespace(uri);
            documents.xot_mut().new_namespace_node(prefix_id, namespace_id)
        };
        self.attach(node)
    }

    fn append(
        &mut self,
        item: &Item,
        _location: &Location,
        _copy_namespaces: bool,
    ) -> error::Result<()> {
        match item {
            Item::Atomic(atomic) => self.text(&atomic.string_value()),
            Item::Node(node) => {
                let copied = self.documents.borrow_mut().xot_mut().clone_node(*node);
                self.attach(copied)
            }
        }
    }
}

/// Collects appended items; other events are reduced to their string
/// content.
#[derive(Default)]
pub struct SequenceCollector {
    items: Vec<Item>,
}

impl SequenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_items(self) -> Vec<Item> {
        self.items
    }
}

impl Destination for SequenceCollector {
    fn start_document(&mut self) -> error::Result<()> {
        Ok(())
    }

    fn end_document(&mut self) -> error::Result<()> {
        Ok(())
    }

    fn start_element(
        &mut self,
        _name: NameCode,
        _type_code: i32,
        _location: &Location,
        _properties: u32,
    ) -> error::Result<()> {
        Err(error::Error::Unsupported)
    }

    fn end_element(&mut self) -> error::Result<()> {
        Err(error::Error::Unsupported)
    }

    fn attribute(&mut self, _name: NameCode, _value: &str) -> error::Result<()> {
        Err(error::Error::Unsupported)
    }

    fn text(&mut self, value: &str) -> error::Result<()> {
        self.items.push(Item::from(value));
        Ok(())
    }

    fn comment(&mut self, _value: &str) -> error::Result<()> {
        Ok(())
    }

    fn processing_instruction(&mut self, _target: &str, _data: &str) -> error::Result<()> {
        Ok(())
    }

    fn namespace(&mut self, _prefix: &str, _uri: &str) -> error::Result<()> {
        Ok(())
    }

    fn append(
        &mut self,
        item: &Item,
        _location: &Location,
        _copy_namespaces: bool,
    ) -> error::Result<()> {
        self.items.push(item.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builder_builds_document() {
        let documents = Rc::new(RefCell::new(Documents::new()));
        let pool = NamePool::global();
        let mut builder = TreeBuilder::new(documents.clone(), Uri::new("u:out"));
        let doc_name = pool.allocate("", "", "doc");
        let item_name = pool.allocate("", "", "item");
        let location = Location::default();

        builder.start_document().unwrap();
        builder
            .start_element(doc_name, -1, &location, 0)
            .unwrap();
        builder.attribute(item_name, "x").unwrap();
        builder.text("hello").unwrap();
        builder.comment("note").unwrap();
        builder.end_element().unwrap();
        builder.end_document().unwrap();

        let root = builder.root().unwrap();
        let documents = documents.borrow();
        let element = documents.xot().document_element(root).unwrap();
        assert_eq!(documents.xot().string_value(element), "hello");
        assert!(documents.get(&Uri::new("u:out")).is_some());
    }

    #[test]
    fn test_sequence_collector_appends() {
        let mut collector = SequenceCollector::new();
        let location = Location::default();
        collector
            .append(&Item::from(1i64), &location, false)
            .unwrap();
        collector.text("x").unwrap();
        let items = collector.into_items();
        assert_eq!(items.len(), 2);
    }
}

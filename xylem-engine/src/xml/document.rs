use ahash::{HashMap, HashMapExt};
use std::fmt::Debug;
use xot::Xot;

use super::order::Annotations;

/// A document URI.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Uri(pub(crate) String);

impl Uri {
    pub fn new(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One registered document tree.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) uri: Uri,
    root: xot::Node,
    number: usize,
}

impl Document {
    pub fn root(&self) -> xot::Node {
        self.root
    }

    /// The process-unique document number assigned at registration.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

/// The documents of one evaluation: the node arena, the URI registry, and
/// the document-order annotations.
#[derive(Debug)]
pub struct Documents {
    xot: Xot,
    annotations: Annotations,
    documents: HashMap<Uri, Document>,
}

impl Documents {
    pub fn new() -> Self {
        Self {
            xot: Xot::new(),
            annotations: Annotations::new(),
            documents: HashMap::new(),
        }
    }

    pub fn xot(&self) -> &Xot {
        &self.xot
    }

    pub fn xot_mut(&mut self) -> &mut Xot {
        &mut self.xot
    }

    /// Parse and register a document.
    pub fn add(&mut self, uri: &Uri, xml: &str) -> Result<xot::Node, xot::Error> {
        let root = self.xot.parse(xml)?;
        self.add_root(uri, root);
        Ok(root)
    }

    /// Register an already built tree under a URI.
    pub fn add_root(&mut self, uri: &Uri, root: xot::Node) {
        let number = self.annotations.add(&self.xot, root);
        let document = Document {
            uri: uri.clone(),
            root,
            number,
        };
        self.documents.insert(uri.clone(), document);
    }

    pub fn get(&self, uri: &Uri) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// The document order of a node, annotating new trees on demand.
    pub fn document_order(&mut self, node: xot::Node) -> super::order::DocumentOrder {
        let Documents {
            xot, annotations, ..
        } = self;
        annotations.get(xot, node)
    }

    pub(crate) fn order_parts(&mut self) -> (&Xot, &mut Annotations) {
        let Documents {
            xot, annotations, ..
        } = self;
        (xot, annotations)
    }

    /// Drop all documents and annotations.
    pub fn cleanup(&mut self) {
        let roots: Vec<_> = self.documents.values().map(|d| d.root).collect();
        for root in roots {
            // removal can only fail for the absent root
            let _ = self.xot.remove(root);
        }
        self.annotations.clear();
        self.documents.clear();
    }
}

impl Default for Documents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut documents = Documents::new();
        let uri = Uri::new("http://example.com/a.xml");
        let root = documents.add(&uri, "<doc><a/></doc>").unwrap();
        let document = documents.get(&uri).unwrap();
        assert_eq!(document.root(), root);
        assert!(document.number() > 0);
    }

    #[test]
    fn test_document_numbers_increase_per_registration() {
        let mut documents = Documents::new();
        let n1 = documents
            .add(&Uri::new("u:1"), "<a/>")
            .map(|root| documents.document_order(root).document_number())
            .unwrap();
        let n2 = documents
            .add(&Uri::new("u:2"), "<b/>")
            .map(|root| documents.document_order(root).document_number())
            .unwrap();
        assert!(n2 > n1);
    }
}

use xot::Xot;

use crate::atomic;
use crate::error;

/// An XPath item: an atomic value or a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// An atomic value.
    ///
    /// One of the value types defined by XPath, indicated by an `xs:*` type
    /// such as `xs:integer` or `xs:string`.
    Atomic(atomic::Atomic),
    /// A node in an XML document, stored in a [`xot`] arena.
    Node(xot::Node),
}

impl Item {
    /// Try to get the atomic value of the item.
    pub fn to_atomic(&self) -> error::Result<atomic::Atomic> {
        match self {
            Item::Atomic(a) => Ok(a.clone()),
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// Try to get the node value of the item.
    pub fn to_node(&self) -> error::Result<xot::Node> {
        match self {
            Item::Node(n) => Ok(*n),
            _ => Err(error::Error::XPTY0004),
        }
    }

    /// Whether the item is a node.
    pub fn is_node(&self) -> bool {
        matches!(self, Item::Node(_))
    }

    /// Obtain the effective boolean value of the item.
    ///
    /// A node is always true; atomic values follow the XPath rules.
    pub fn effective_boolean_value(&self) -> error::Result<bool> {
        match self {
            Item::Atomic(a) => a.effective_boolean_value(),
            Item::Node(_) => Ok(true),
        }
    }

    /// The string value of the item.
    ///
    /// An atomic value casts to a string using its canonical lexical form;
    /// a node yields its string value as defined by the data model.
    pub fn string_value(&self, xot: &Xot) -> String {
        match self {
            Item::Atomic(atomic) => atomic.string_value(),
            Item::Node(node) => xot.string_value(*node),
        }
    }

    /// Atomize the item: an atomic value stays itself, a node yields its
    /// typed value, which without schema knowledge is untyped atomic.
    pub fn atomized(&self, xot: &Xot) -> atomic::Atomic {
        match self {
            Item::Atomic(a) => a.clone(),
            Item::Node(node) => {
                atomic::Atomic::Untyped(xot.string_value(*node).into())
            }
        }
    }
}

impl<T> From<T> for Item
where
    T: Into<atomic::Atomic>,
{
    fn from(a: T) -> Self {
        Self::Atomic(a.into())
    }
}

impl From<xot::Node> for Item {
    fn from(node: xot::Node) -> Self {
        Self::Node(node)
    }
}

impl TryFrom<Item> for atomic::Atomic {
    type Error = error::Error;

    fn try_from(item: Item) -> error::Result<atomic::Atomic> {
        match item {
            Item::Atomic(a) => Ok(a),
            _ => Err(error::Error::XPTY0004),
        }
    }
}

impl TryFrom<Item> for xot::Node {
    type Error = error::Error;

    fn try_from(item: Item) -> error::Result<Self> {
        match item {
            Item::Node(node) => Ok(node),
            _ => Err(error::Error::XPTY0004),
        }
    }
}

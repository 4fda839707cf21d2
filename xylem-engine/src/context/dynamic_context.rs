use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use xylem_name::Name;

use crate::atomic;
use crate::error::{self, ErrorListener, TraceListener};
use crate::sequence::{Item, Sequence};
use crate::xml;

use super::static_context::StaticContext;

/// Variable bindings visible to an evaluation.
pub type Variables = AHashMap<Name, Sequence>;

/// The focus: context item, 1-based position, and context size.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub item: Item,
    pub position: usize,
    pub size: usize,
}

/// The current group of an active grouping instruction.
#[derive(Debug, Clone)]
pub struct GroupContext {
    /// The members of the current group, in population order.
    pub members: Rc<Vec<Item>>,
    /// The current grouping key; empty for the pattern-based variants.
    pub key: Sequence,
}

/// Resolves URIs to XML source text for document loading.
pub trait UriResolver {
    fn resolve(&self, uri: &str) -> error::Result<String>;
}

/// The dynamic context of one evaluation.
///
/// Cloning is cheap; a clone that overrides only the focus or the current
/// group acts as the "minor" child scope, delegating every other slot.
#[derive(Clone)]
pub struct DynamicContext {
    pub(crate) static_context: Rc<StaticContext>,
    documents: Rc<RefCell<xml::Documents>>,
    variables: Rc<Variables>,
    focus: Option<Rc<Focus>>,
    current_group: Option<Rc<GroupContext>>,
    current_datetime: chrono::DateTime<chrono::FixedOffset>,
    uri_resolver: Option<Rc<dyn UriResolver>>,
    error_listener: Rc<RefCell<dyn ErrorListener>>,
    trace_listener: Option<Rc<RefCell<dyn TraceListener>>>,
}

impl std::fmt::Debug for DynamicContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicContext")
            .field("focus", &self.focus)
            .field("variables", &self.variables.len())
            .finish_non_exhaustive()
    }
}

impl DynamicContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        static_context: Rc<StaticContext>,
        documents: Rc<RefCell<xml::Documents>>,
        variables: Rc<Variables>,
        focus: Option<Rc<Focus>>,
        current_datetime: chrono::DateTime<chrono::FixedOffset>,
        uri_resolver: Option<Rc<dyn UriResolver>>,
        error_listener: Rc<RefCell<dyn ErrorListener>>,
        trace_listener: Option<Rc<RefCell<dyn TraceListener>>>,
    ) -> Self {
        Self {
            static_context,
            documents,
            variables,
            focus,
            current_group: None,
            current_datetime,
            uri_resolver,
            error_listener,
            trace_listener,
        }
    }

    pub fn static_context(&self) -> &StaticContext {
        &self.static_context
    }

    pub fn documents(&self) -> &Rc<RefCell<xml::Documents>> {
        &self.documents
    }

    /// The focus, or `XPDY0002` when there is none.
    pub fn focus(&self) -> error::Result<&Focus> {
        self.focus
            .as_deref()
            .ok_or(error::Error::XPDY0002)
    }

    /// The context item, or `XPDY0002` when absent.
    pub fn context_item(&self) -> error::Result<Item> {
        self.focus().map(|focus| focus.item.clone())
    }

    /// A minor scope with a new focus.
    pub fn with_focus(&self, item: Item, position: usize, size: usize) -> Self {
        let mut clone = self.clone();
        clone.focus = Some(Rc::new(Focus {
            item,
            position,
            size,
        }));
        clone
    }

    /// A minor scope without a focus.
    pub fn without_focus(&self) -> Self {
        let mut clone = self.clone();
        clone.focus = None;
        clone
    }

    /// A minor scope with one extra variable binding.
    pub fn with_variable(&self, name: Name, value: Sequence) -> Self {
        let mut variables = self.variables.as_ref().clone();
        variables.insert(name, value);
        let mut clone = self.clone();
        clone.variables = Rc::new(variables);
        clone
    }

    pub fn variable(&self, name: &Name) -> Option<&Sequence> {
        self.variables.get(name)
    }

    /// A minor scope with an active group.
    pub fn with_group(&self, group: GroupContext) -> Self {
        let mut clone = self.clone();
        clone.current_group = Some(Rc::new(group));
        clone
    }

    /// The active group, or `XTDE1061` outside grouping.
    pub fn current_group(&self) -> error::Result<&GroupContext> {
        self.current_group
            .as_deref()
            .ok_or(error::Error::XTDE1061)
    }

    pub fn current_datetime(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.current_datetime
    }

    /// The implicit timezone, taken from the current date and time.
    pub fn implicit_timezone(&self) -> chrono::FixedOffset {
        self.current_datetime.timezone()
    }

    /// Compare two strings under the default collation.
    pub fn default_string_compare(&self, a: &str, b: &str) -> error::Result<std::cmp::Ordering> {
        Ok(self.static_context.default_collation()?.compare(a, b))
    }

    /// Resolve and load a document through the URI resolver.
    pub fn resolve_document(&self, uri: &str) -> error::Result<xot::Node> {
        if let Some(document) = self.documents.borrow().get(&xml::Uri::new(uri)) {
            return Ok(document.root());
        }
        let resolver = self
            .uri_resolver
            .as_ref()
            .ok_or(error::Error::FODC0002)?;
        let xml = resolver.resolve(uri)?;
        self.documents
            .borrow_mut()
            .add(&xml::Uri::new(uri), &xml)
            .map_err(|_| error::Error::FODC0002)
    }

    /// Report a warning through the error listener.
    pub fn warning(&self, message: &str) {
        self.error_listener.borrow_mut().warning(message, None);
    }

    /// Report a fatal error through the error listener, returning it for
    /// propagation.
    pub fn fatal(&self, error: error::Error) -> error::Error {
        self.error_listener
            .borrow_mut()
            .fatal(&error.clone().into());
        error
    }

    /// Notify the trace listener of entry into a labeled expression.
    pub fn trace_enter(&self, label: &str) {
        if let Some(listener) = &self.trace_listener {
            listener.borrow_mut().enter(label);
        }
    }

    /// Notify the trace listener of exit from a labeled expression.
    pub fn trace_leave(&self, label: &str) {
        if let Some(listener) = &self.trace_listener {
            listener.borrow_mut().leave(label);
        }
    }

    /// Atomize an item using the document pool.
    pub fn atomize(&self, item: &Item) -> atomic::Atomic {
        match item {
            Item::Atomic(a) => a.clone(),
            Item::Node(_) => {
                let documents = self.documents.borrow();
                item.atomized(documents.xot())
            }
        }
    }

    /// The string value of an item using the document pool.
    pub fn string_value(&self, item: &Item) -> String {
        let documents = self.documents.borrow();
        item.string_value(documents.xot())
    }
}

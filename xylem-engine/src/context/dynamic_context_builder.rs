use std::cell::RefCell;
use std::rc::Rc;

use xylem_name::Name;

use crate::error::{ErrorListener, TraceListener, TracingErrorListener};
use crate::sequence::{Item, Sequence};
use crate::xml;

use super::dynamic_context::{DynamicContext, Focus, UriResolver, Variables};
use super::static_context::StaticContext;

/// Builder for a [`DynamicContext`].
pub struct DynamicContextBuilder {
    static_context: Rc<StaticContext>,
    documents: Rc<RefCell<xml::Documents>>,
    variables: Variables,
    context_item: Option<Item>,
    current_datetime: Option<chrono::DateTime<chrono::FixedOffset>>,
    uri_resolver: Option<Rc<dyn UriResolver>>,
    error_listener: Option<Rc<RefCell<dyn ErrorListener>>>,
    trace_listener: Option<Rc<RefCell<dyn TraceListener>>>,
}

impl DynamicContextBuilder {
    pub fn new(
        static_context: Rc<StaticContext>,
        documents: Rc<RefCell<xml::Documents>>,
    ) -> Self {
        Self {
            static_context,
            documents,
            variables: Variables::default(),
            context_item: None,
            current_datetime: None,
            uri_resolver: None,
            error_listener: None,
            trace_listener: None,
        }
    }

    /// The initial context item; it becomes a singleton focus.
    pub fn context_item(mut self, item: Item) -> Self {
        self.context_item = Some(item);
        self
    }

    /// Bind an external variable.
    pub fn variable(mut self, name: Name, value: Sequence) -> Self {
        self.variables.insert(name, value);
        self
    }

    /// Fix the current date and time; the default samples the clock once
    /// per context, so one evaluation sees one instant.
    pub fn current_datetime(mut self, datetime: chrono::DateTime<chrono::FixedOffset>) -> Self {
        self.current_datetime = Some(datetime);
        self
    }

    pub fn uri_resolver(mut self, resolver: Rc<dyn UriResolver>) -> Self {
        self.uri_resolver = Some(resolver);
        self
    }

    pub fn error_listener(mut self, listener: Rc<RefCell<dyn ErrorListener>>) -> Self {
        self.error_listener = Some(listener);
        self
    }

    pub fn trace_listener(mut self, listener: Rc<RefCell<dyn TraceListener>>) -> Self {
        self.trace_listener = Some(listener);
        self
    }

    pub fn build(self) -> DynamicContext {
        let focus = self.context_item.map(|item| {
            Rc::new(Focus {
                item,
                position: 1,
                size: 1,
            })
        });
        let current_datetime = self
            .current_datetime
            .unwrap_or_else(|| chrono::offset::Local::now().into());
        let error_listener = self
            .error_listener
            .unwrap_or_else(|| Rc::new(RefCell::new(TracingErrorListener)));
        DynamicContext::new(
            self.static_context,
            self.documents,
            Rc::new(self.variables),
            focus,
            current_datetime,
            self.uri_resolver,
            error_listener,
            self.trace_listener,
        )
    }
}

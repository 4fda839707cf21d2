use std::cell::RefCell;
use std::rc::Rc;

use xylem_engine::context::{DynamicContext, DynamicContextBuilder, UriResolver};
use xylem_engine::error::{Error, ErrorListener, LocatedResult, TraceListener};
use xylem_engine::expr::{self, ExprRef};
use xylem_engine::sequence::{Item, Sequence, SequenceIter};
use xylem_engine::xml::{Documents, Uri};
use xylem_engine::{Destination, LocatedError, Location, StaticContext};
use xylem_name::Name;

/// The dynamic side of one evaluation: context item, external variables,
/// resolvers and listeners, plus the document pool the evaluation works
/// against.
pub struct Selector {
    expr: ExprRef,
    static_context: Rc<StaticContext>,
    documents: Rc<RefCell<Documents>>,
    context_item: Option<Item>,
    variables: Vec<(Name, Sequence)>,
    uri_resolver: Option<Rc<dyn UriResolver>>,
    error_listener: Option<Rc<RefCell<dyn ErrorListener>>>,
    trace_listener: Option<Rc<RefCell<dyn TraceListener>>>,
    current_datetime: Option<chrono::DateTime<chrono::FixedOffset>>,
}

impl Selector {
    pub(crate) fn new(expr: ExprRef, static_context: Rc<StaticContext>) -> Self {
        Selector {
            expr,
            static_context,
            documents: Rc::new(RefCell::new(Documents::new())),
            context_item: None,
            variables: Vec::new(),
            uri_resolver: None,
            error_listener: None,
            trace_listener: None,
            current_datetime: None,
        }
    }

    /// The document pool of this evaluation.
    pub fn documents(&self) -> &Rc<RefCell<Documents>> {
        &self.documents
    }

    /// Parse a document into the pool and make its root the context item.
    pub fn context_document(&mut self, uri: &str, xml: &str) -> LocatedResult<xot::Node> {
        let root = self
            .documents
            .borrow_mut()
            .add(&Uri::new(uri), xml)
            .map_err(|_| LocatedError {
                error: Error::FODC0002,
                location: Some(Location::with_system_id(uri)),
            })?;
        self.context_item = Some(Item::Node(root));
        Ok(root)
    }

    /// Set the initial context item.
    pub fn context_item(&mut self, item: Item) -> &mut Self {
        self.context_item = Some(item);
        self
    }

    /// Bind an external variable.
    pub fn external_variable(&mut self, name: Name, value: Sequence) -> &mut Self {
        self.variables.push((name, value));
        self
    }

    pub fn uri_resolver(&mut self, resolver: Rc<dyn UriResolver>) -> &mut Self {
        self.uri_resolver = Some(resolver);
        self
    }

    pub fn error_listener(&mut self, listener: Rc<RefCell<dyn ErrorListener>>) -> &mut Self {
        self.error_listener = Some(listener);
        self
    }

    pub fn trace_listener(&mut self, listener: Rc<RefCell<dyn TraceListener>>) -> &mut Self {
        self.trace_listener = Some(listener);
        self
    }

    /// Fix the evaluation's current date and time.
    pub fn current_datetime(
        &mut self,
        datetime: chrono::DateTime<chrono::FixedOffset>,
    ) -> &mut Self {
        self.current_datetime = Some(datetime);
        self
    }

    fn dynamic_context(&self) -> LocatedResult<DynamicContext> {
        let mut builder =
            DynamicContextBuilder::new(self.static_context.clone(), self.documents.clone());
        if let Some(item) = &self.context_item {
            builder = builder.context_item(item.clone());
        }
        for (name, value) in &self.variables {
            builder = builder.variable(name.clone(), value.clone());
        }
        if let Some(resolver) = &self.uri_resolver {
            builder = builder.uri_resolver(resolver.clone());
        }
        if let Some(listener) = &self.error_listener {
            builder = builder.error_listener(listener.clone());
        }
        if let Some(listener) = &self.trace_listener {
            builder = builder.trace_listener(listener.clone());
        }
        if let Some(datetime) = self.current_datetime {
            builder = builder.current_datetime(datetime);
        }
        let context = builder.build();
        self.check_external_variables(&context)?;
        Ok(context)
    }

    // bound external values must match their declared types
    fn check_external_variables(&self, context: &DynamicContext) -> LocatedResult<()> {
        for (name, value) in &self.variables {
            if let Some(required) = self.static_context.variable_declaration(name) {
                if !xylem_engine::expr::sequence_matches(value, required, context) {
                    return Err(Error::XPTY0004.into());
                }
            }
        }
        Ok(())
    }

    /// Iterate the result lazily.
    pub fn iterate(&self) -> LocatedResult<SequenceIter> {
        let context = self.dynamic_context()?;
        expr::iterate(&self.expr, &context).map_err(LocatedError::from)
    }

    /// Evaluate to a grounded sequence.
    pub fn evaluate(&self) -> LocatedResult<Sequence> {
        let context = self.dynamic_context()?;
        expr::evaluate(&self.expr, &context).map_err(LocatedError::from)
    }

    /// The effective boolean value of the result.
    pub fn effective_boolean_value(&self) -> LocatedResult<bool> {
        let context = self.dynamic_context()?;
        expr::effective_boolean_value(&self.expr, &context).map_err(LocatedError::from)
    }

    /// Run the evaluation, pushing the result into a destination as one
    /// document.
    pub fn run(&self, destination: &mut dyn Destination) -> LocatedResult<()> {
        let context = self.dynamic_context()?;
        let location = Location::default();
        let mut run = || -> xylem_engine::Result<()> {
            destination.start_document()?;
            let mut iter = expr::iterate(&self.expr, &context)?;
            while let Some(item) = iter.next() {
                destination.append(&item?, &location, true)?;
            }
            destination.end_document()?;
            Ok(())
        };
        run().map_err(LocatedError::from)
    }
}

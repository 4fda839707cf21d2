use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use iri_string::types::IriAbsoluteString;
use xylem_name::{Name, Namespaces};
use xylem_xpath_type::SequenceType;

use crate::error;
use crate::string::{Collation, Collations, CODEPOINT_URI};

/// Everything known at compile time: namespaces, declared variables, the
/// base URI, the default collation, and the compilation flags.
///
/// A static context is immutable once built; use
/// [`super::StaticContextBuilder`] to construct one.
#[derive(Debug)]
pub struct StaticContext {
    pub(crate) namespaces: Namespaces,
    pub(crate) variable_declarations: AHashMap<Name, SequenceType>,
    pub(crate) static_base_uri: Option<IriAbsoluteString>,
    pub(crate) default_collation_uri: String,
    pub(crate) xpath10_compatibility: bool,
    pub(crate) trace_enabled: bool,
    collations: RefCell<Collations>,
}

impl StaticContext {
    pub(crate) fn new(
        namespaces: Namespaces,
        variable_declarations: AHashMap<Name, SequenceType>,
        static_base_uri: Option<IriAbsoluteString>,
        default_collation_uri: Option<String>,
        xpath10_compatibility: bool,
        trace_enabled: bool,
    ) -> Self {
        Self {
            namespaces,
            variable_declarations,
            static_base_uri,
            default_collation_uri: default_collation_uri
                .unwrap_or_else(|| CODEPOINT_URI.to_string()),
            xpath10_compatibility,
            trace_enabled,
            collations: RefCell::new(Collations::new()),
        }
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// The required type of a declared external variable.
    pub fn variable_declaration(&self, name: &Name) -> Option<&SequenceType> {
        self.variable_declarations.get(name)
    }

    pub fn static_base_uri(&self) -> Option<&str> {
        self.static_base_uri.as_ref().map(|uri| uri.as_str())
    }

    pub fn default_collation_uri(&self) -> &str {
        &self.default_collation_uri
    }

    /// Whether XPath 1.0 compatibility mode is on.
    pub fn xpath10_compatibility(&self) -> bool {
        self.xpath10_compatibility
    }

    /// Whether compiled expressions carry trace instrumentation.
    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// The default collation.
    pub fn default_collation(&self) -> error::Result<Rc<Collation>> {
        self.collation(None)
    }

    /// Resolve a collation URI, the default when `None`.
    ///
    /// Resolution failure surfaces as `XTDE1035` here, at the point a
    /// collation is actually required.
    pub fn collation(&self, uri: Option<&str>) -> error::Result<Rc<Collation>> {
        let uri = uri.unwrap_or(&self.default_collation_uri);
        self.collations.borrow_mut().load(uri)
    }
}

impl Default for StaticContext {
    fn default() -> Self {
        Self::new(
            Namespaces::default(),
            AHashMap::default(),
            None,
            None,
            false,
            false,
        )
    }
}

use ahash::AHashMap;
use iri_string::types::IriAbsoluteString;
use xylem_name::{Name, Namespaces};
use xylem_xpath_type::SequenceType;

use crate::error;

use super::static_context::StaticContext;

/// Builder for a [`StaticContext`].
#[derive(Debug, Default)]
pub struct StaticContextBuilder {
    namespaces: Namespaces,
    variable_declarations: AHashMap<Name, SequenceType>,
    static_base_uri: Option<IriAbsoluteString>,
    default_collation_uri: Option<String>,
    xpath10_compatibility: bool,
    trace_enabled: bool,
}

impl StaticContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare namespace bindings; an empty prefix sets the default
    /// element namespace.
    pub fn namespaces(mut self, namespace_pairs: &[(&str, &str)]) -> Self {
        self.namespaces.add(namespace_pairs);
        self
    }

    /// Declare an external variable with its required type.
    pub fn variable(mut self, name: Name, required_type: SequenceType) -> Self {
        self.variable_declarations.insert(name, required_type);
        self
    }

    /// The static base URI; must be absolute.
    pub fn static_base_uri(mut self, uri: &str) -> error::Result<Self> {
        let uri: IriAbsoluteString = uri.try_into().map_err(|_| error::Error::XPST0003)?;
        self.static_base_uri = Some(uri);
        Ok(self)
    }

    /// The default collation URI.
    pub fn default_collation(mut self, uri: &str) -> Self {
        self.default_collation_uri = Some(uri.to_string());
        self
    }

    /// Turn on XPath 1.0 compatibility mode.
    pub fn xpath10_compatibility(mut self, on: bool) -> Self {
        self.xpath10_compatibility = on;
        self
    }

    /// Compile trace instrumentation into expressions.
    pub fn trace_enabled(mut self, on: bool) -> Self {
        self.trace_enabled = on;
        self
    }

    pub fn build(self) -> StaticContext {
        StaticContext::new(
            self.namespaces,
            self.variable_declarations,
            self.static_base_uri,
            self.default_collation_uri,
            self.xpath10_compatibility,
            self.trace_enabled,
        )
    }
}

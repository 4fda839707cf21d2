use strum::EnumMessage;
use strum_macros::{Display, EnumMessage};

use xylem_ast::ParserError;

/// A source position, as reported to error listeners.
///
/// Line numbers are 1-based; `None` means unknown, matching the convention
/// of reporting -1 in host APIs that have no option type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    /// The system identifier (URI) of the containing module or document.
    pub system_id: Option<String>,
    /// 1-based line number.
    pub line: Option<u32>,
    /// 1-based column number.
    pub column: Option<u32>,
}

impl Location {
    /// A location with only a system id.
    pub fn with_system_id(system_id: &str) -> Self {
        Location {
            system_id: Some(system_id.to_string()),
            line: None,
            column: None,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let system_id = self.system_id.as_deref().unwrap_or("?");
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, "{}:{}:{}", system_id, line, column),
            (Some(line), None) => write!(f, "{}:{}", system_id, line),
            _ => write!(f, "{}", system_id),
        }
    }
}

/// An error code with an optional location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedError {
    /// The error code.
    pub error: Error,
    /// Where the error occurred, when known.
    pub location: Option<Location>,
}

impl std::fmt::Display for LocatedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "{} at {}", self.error, location)
        } else {
            write!(f, "{}", self.error)
        }
    }
}

impl std::error::Error for LocatedError {}

impl From<Error> for LocatedError {
    fn from(error: Error) -> Self {
        LocatedError {
            error,
            location: None,
        }
    }
}

/// XPath/XSLT error codes.
///
/// These are specified by the XPath and XSLT specifications; the doc
/// comment of each variant doubles as its message.
#[derive(Debug, Clone, PartialEq, Display, EnumMessage)]
pub enum Error {
    /// Internal assertion failure.
    ///
    /// An internal invariant was violated; this is a bug in the processor,
    /// not in the supplied expression.
    Internal,

    /// Unsupported feature.
    ///
    /// The construct is valid but not supported by this processor.
    Unsupported,

    /// Component absent in dynamic context.
    ///
    /// It is a dynamic error if evaluation of an expression relies on some
    /// part of the dynamic context that is absent, such as the context
    /// item.
    XPDY0002,
    /// Parse error.
    ///
    /// The expression is not a valid instance of the grammar.
    XPST0003,
    /// Type error.
    ///
    /// The static or dynamic type of a value does not match a required
    /// type.
    XPTY0004,
    /// Name not defined.
    ///
    /// An expression refers to a variable name that is not defined in the
    /// static context.
    XPST0008,
    /// Unknown function.
    ///
    /// The expanded QName and number of arguments in a function call do not
    /// match any function signature in the static context.
    XPST0017,
    /// Inconsistent path result.
    ///
    /// The result of the last step in a path contains both nodes and
    /// non-nodes.
    XPTY0018,
    /// Path applied to non-node.
    ///
    /// A step in a path expression was evaluated against a sequence
    /// containing an item that is not a node.
    XPTY0019,
    /// Context item is not a node.
    ///
    /// In an axis step, the context item is not a node.
    XPTY0020,
    /// Treat failed.
    ///
    /// The dynamic type of the operand of a treat expression does not match
    /// the sequence type specified by the treat expression.
    XPDY0050,
    /// Undefined type reference.
    ///
    /// The type named in a sequence type is not defined in the in-scope
    /// schema types.
    XPST0051,
    /// Invalid cast target.
    ///
    /// The target type of a cast or castable expression is xs:NOTATION or
    /// an abstract type.
    XPST0080,
    /// Unknown namespace prefix.
    ///
    /// A QName in the expression contains a namespace prefix that is not in
    /// the statically known namespaces.
    XPST0081,

    /// Division by zero.
    ///
    /// An attempt was made to divide by zero.
    FOAR0001,
    /// Numeric overflow/underflow.
    ///
    /// A numeric operation resulted in an overflow or underflow.
    FOAR0002,
    /// Input too large for decimal.
    ///
    /// Casting to xs:decimal exceeded the implementation-defined limits of
    /// the datatype.
    FOCA0001,
    /// Invalid lexical value.
    ///
    /// A value does not have the lexical form of the required type, or NaN
    /// or Infinity was cast to xs:decimal.
    FOCA0002,
    /// Input too large for integer.
    ///
    /// Casting to xs:integer exceeded the implementation-defined limits of
    /// the datatype.
    FOCA0003,
    /// NaN supplied as float/double value.
    ///
    /// A duration was multiplied or divided by NaN.
    FOCA0005,
    /// Unsupported collation.
    ///
    /// The requested collation is not recognized by this processor.
    FOCH0002,
    /// Overflow/underflow in date/time operation.
    ///
    /// Arithmetic with date/time values overflowed the supported range.
    FODT0001,
    /// Overflow/underflow in duration operation.
    ///
    /// Arithmetic with duration values overflowed the supported range.
    FODT0002,
    /// Invalid timezone value.
    ///
    /// The supplied timezone is outside the range -PT14H to PT14H or is not
    /// a whole number of minutes.
    FODT0003,
    /// Invalid value for cast/constructor.
    ///
    /// A cast between two datatypes is allowed in principle, but the
    /// supplied value cannot be converted.
    FORG0001,
    /// Invalid argument type.
    ///
    /// A function such as fn:max or the effective boolean value was applied
    /// to a sequence of inappropriate values.
    FORG0006,
    /// Inconsistent timezones.
    ///
    /// Two date/time arguments carry different explicit timezones where the
    /// same timezone is required.
    FORG0008,

    /// No context document.
    ///
    /// The tree to be searched is not rooted at a document node.
    FODC0001,
    /// Error retrieving resource.
    ///
    /// The supplied URI cannot be dereferenced, or the resource it names is
    /// not parseable as XML.
    FODC0002,

    /// Invalid sort data type.
    ///
    /// The data-type attribute of a sort key must be "text" or "number".
    XTDE0030,
    /// Current group used outside grouping.
    ///
    /// current-group() or current-grouping-key() was evaluated while no
    /// for-each-group instruction is active.
    XTDE1061,
    /// Invalid collation URI.
    ///
    /// A collation URI used in a sort key or comparison could not be
    /// resolved to a supported collation.
    XTDE1035,
    /// Stylesheet compile error.
    ///
    /// The stylesheet does not conform to the subset of XSLT understood by
    /// this processor.
    XTSE0010,
}

impl Error {
    /// Attach a location to the error.
    pub fn at(self, location: Location) -> LocatedError {
        LocatedError {
            error: self,
            location: Some(location),
        }
    }

    /// The error code as a string, e.g. `"XPTY0004"`.
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// Whether the error is a type error in the sense of the specification.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Error::XPTY0004
                | Error::XPTY0018
                | Error::XPTY0019
                | Error::XPTY0020
                | Error::FORG0006
        )
    }

    /// The one-line message derived from the variant documentation.
    pub fn message(&self) -> &str {
        self.documentation_pieces().0
    }

    /// The longer explanation derived from the variant documentation.
    pub fn note(&self) -> &str {
        self.documentation_pieces().1
    }

    fn documentation_pieces(&self) -> (&str, &str) {
        if let Some(documentation) = self.get_documentation() {
            let mut pieces = documentation.splitn(2, "\n\n");
            let first = pieces.next().unwrap_or("");
            let second = pieces.next().unwrap_or("");
            (first, second)
        } else {
            ("", "")
        }
    }
}

impl std::error::Error for Error {}

impl From<ParserError> for Error {
    fn from(e: ParserError) -> Self {
        match e {
            ParserError::UnknownPrefix { .. } => Error::XPST0081,
            ParserError::UnknownType { .. } => Error::XPST0051,
            ParserError::Unsupported { .. } => Error::Unsupported,
            _ => Error::XPST0003,
        }
    }
}

/// The result type used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
/// The result type for errors that carry locations.
pub type LocatedResult<T> = std::result::Result<T, LocatedError>;

/// Receives warnings and fatal errors during compilation and evaluation.
///
/// Warnings do not interrupt processing; a fatal notification is always
/// followed by error propagation.
pub trait ErrorListener {
    /// A non-fatal condition worth reporting.
    fn warning(&mut self, message: &str, location: Option<&Location>);
    /// A fatal error, reported just before it propagates.
    fn fatal(&mut self, error: &LocatedError);
}

/// The default listener forwards to `tracing`.
#[derive(Debug, Default)]
pub struct TracingErrorListener;

impl ErrorListener for TracingErrorListener {
    fn warning(&mut self, message: &str, location: Option<&Location>) {
        match location {
            Some(location) => tracing::warn!("{} ({})", message, location),
            None => tracing::warn!("{}", message),
        }
    }

    fn fatal(&mut self, error: &LocatedError) {
        tracing::error!("{}", error);
    }
}

/// Receives trace events when tracing is enabled on the static context.
pub trait TraceListener {
    /// Evaluation entered an instrumented expression.
    fn enter(&mut self, label: &str);
    /// Evaluation left an instrumented expression.
    fn leave(&mut self, label: &str);
}

/// The default trace listener forwards to `tracing` at debug level.
#[derive(Debug, Default)]
pub struct TracingTraceListener;

impl TraceListener for TracingTraceListener {
    fn enter(&mut self, label: &str) {
        tracing::debug!("enter {}", label);
    }

    fn leave(&mut self, label: &str) {
        tracing::debug!("leave {}", label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_display_form() {
        assert_eq!(Error::XPTY0004.code(), "XPTY0004");
        assert_eq!(Error::FODT0003.code(), "FODT0003");
    }

    #[test]
    fn test_message_from_documentation() {
        assert_eq!(Error::FOAR0001.message(), "Division by zero.");
        assert!(Error::FOAR0001.note().contains("divide by zero"));
    }

    #[test]
    fn test_type_error_classification() {
        assert!(Error::XPTY0004.is_type_error());
        assert!(!Error::FOAR0001.is_type_error());
    }
}

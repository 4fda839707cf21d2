//! The parsed form of an XPath 2.0 expression.
//!
//! Every node carries its source span; the compiler turns this tree into
//! the engine's expression algebra.

use xylem_name::Name;
use xylem_schema_type::Xs;
use xylem_xpath_type::{KindTest, SequenceType};

use crate::span::Span;

/// A literal as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// An integer literal such as `42`.
    Integer(String),
    /// A decimal literal such as `4.2`.
    Decimal(String),
    /// A double literal such as `4.2e1`.
    Double(f64),
    /// A string literal.
    String(String),
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
}

/// The six comparison operators, shared between value and general
/// comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompOp {
    /// The operator with its arguments swapped, e.g. `<` becomes `>`.
    pub fn flipped(&self) -> CompOp {
        match self {
            CompOp::Eq => CompOp::Eq,
            CompOp::Ne => CompOp::Ne,
            CompOp::Lt => CompOp::Gt,
            CompOp::Le => CompOp::Ge,
            CompOp::Gt => CompOp::Lt,
            CompOp::Ge => CompOp::Le,
        }
    }
}

/// Node comparison operators: `is`, `<<`, `>>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCompOp {
    Is,
    Precedes,
    Follows,
}

/// `union`/`|`, `intersect`, `except`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

/// The thirteen axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    Descendant,
    Attribute,
    SelfAxis,
    DescendantOrSelf,
    FollowingSibling,
    Following,
    Namespace,
    Parent,
    Ancestor,
    PrecedingSibling,
    Preceding,
    AncestorOrSelf,
}

impl Axis {
    /// Whether the axis walks against document order.
    pub fn is_reverse(&self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::PrecedingSibling | Axis::Preceding | Axis::AncestorOrSelf
        )
    }
}

/// The node test of an axis step.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// A name test; wildcards included.
    Name(xylem_xpath_type::NameTest),
    /// A kind test such as `text()` or `element(foo)`.
    Kind(KindTest),
}

/// A single `$var in expr` binding of a `for` or quantified expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: Name,
    pub expr: ExprS,
}

/// `some` or `every`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    Some,
    Every,
}

/// Sort direction of an `order by` spec or `xsl:sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Where empty sort keys go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyOrder {
    /// Empty keys sort before everything.
    #[default]
    Least,
    /// Empty keys sort after everything.
    Greatest,
}

/// One `order by` spec.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSpec {
    pub key: ExprS,
    pub order: SortOrder,
    pub empty_order: Option<EmptyOrder>,
    pub collation: Option<String>,
}

/// `xs:type?` as used by `cast as` and `castable as`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingleType {
    pub atomic: Xs,
    pub optional: bool,
}

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprS {
    pub expr: Expr,
    pub span: Span,
}

impl ExprS {
    /// Attach a span to an expression.
    pub fn new(expr: Expr, span: Span) -> Self {
        ExprS { expr, span }
    }
}

/// The expression variants of the XPath 2.0 grammar, plus the `order by`
/// carrying `for` form used in XQuery mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// `()` or `(a, b, c)`: general sequence construction.
    Sequence(Vec<ExprS>),
    ContextItem,
    VarRef(Name),
    FunctionCall {
        name: Name,
        args: Vec<ExprS>,
    },
    Arith {
        op: ArithOp,
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    /// Unary minus; unary plus disappears at parse time.
    Negate(Box<ExprS>),
    Or(Box<ExprS>, Box<ExprS>),
    And(Box<ExprS>, Box<ExprS>),
    ValueComp {
        op: CompOp,
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    GeneralComp {
        op: CompOp,
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    NodeComp {
        op: NodeCompOp,
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    SetOp {
        op: SetOp,
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    Range {
        start: Box<ExprS>,
        end: Box<ExprS>,
    },
    /// A leading `/`: the root of the tree containing the context node.
    Root,
    /// One axis step, evaluated against the context item.
    AxisStep {
        axis: Axis,
        node_test: NodeTest,
    },
    /// `left/right`: evaluate `right` once per item of `left`, combine in
    /// document order.
    PathStep {
        left: Box<ExprS>,
        right: Box<ExprS>,
    },
    /// An expression followed by one or more predicates.
    Filter {
        base: Box<ExprS>,
        predicates: Vec<ExprS>,
    },
    For {
        bindings: Vec<Binding>,
        /// XQuery mode only.
        order_by: Vec<OrderSpec>,
        /// XQuery mode only: the `where` clause.
        where_clause: Option<Box<ExprS>>,
        return_expr: Box<ExprS>,
    },
    Let {
        bindings: Vec<Binding>,
        return_expr: Box<ExprS>,
    },
    Quantified {
        quantifier: Quantifier,
        bindings: Vec<Binding>,
        satisfies: Box<ExprS>,
    },
    If {
        condition: Box<ExprS>,
        then_branch: Box<ExprS>,
        else_branch: Box<ExprS>,
    },
    InstanceOf {
        expr: Box<ExprS>,
        sequence_type: SequenceType,
    },
    TreatAs {
        expr: Box<ExprS>,
        sequence_type: SequenceType,
    },
    CastableAs {
        expr: Box<ExprS>,
        single_type: SingleType,
    },
    CastAs {
        expr: Box<ExprS>,
        single_type: SingleType,
    },
}

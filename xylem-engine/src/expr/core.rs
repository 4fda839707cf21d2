use std::rc::Rc;

use xylem_ast::ast::{
    ArithOp, Axis, CompOp, EmptyOrder, NodeCompOp, NodeTest, Quantifier, SetOp, SortOrder,
};
use xylem_name::Name;
use xylem_schema_type::Xs;
use xylem_xpath_type::{ItemType, KindTest, NodeKind, Occurrence, SequenceType};

use crate::error;
use crate::sequence::Sequence;
use crate::sort::DataTypeForce;

use super::functions::BuiltinFunction;
use super::props::SpecialProperties;

/// A shared handle to a compiled expression node.
///
/// The compiled tree is immutable; passes build new nodes and share the
/// unchanged subtrees.
pub type ExprRef = Rc<Expr>;

/// One sort key of a sort expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyDef {
    pub key: ExprRef,
    pub order: SortOrder,
    pub empty_order: Option<EmptyOrder>,
    pub data_type: DataTypeForce,
    pub collation_uri: Option<String>,
}

/// The four grouping variants of `xsl:for-each-group`.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupVariant {
    /// `group-by`: a multi-valued grouping key per item.
    By(ExprRef),
    /// `group-adjacent`: a single-valued grouping key per item.
    Adjacent(ExprRef),
    /// `group-starting-with`: a match test opening a new group.
    StartingWith(ExprRef),
    /// `group-ending-with`: a match test closing the running group.
    EndingWith(ExprRef),
}

impl GroupVariant {
    pub(crate) fn inner(&self) -> &ExprRef {
        match self {
            GroupVariant::By(e)
            | GroupVariant::Adjacent(e)
            | GroupVariant::StartingWith(e)
            | GroupVariant::EndingWith(e) => e,
        }
    }

    pub(crate) fn with_inner(&self, inner: ExprRef) -> GroupVariant {
        match self {
            GroupVariant::By(_) => GroupVariant::By(inner),
            GroupVariant::Adjacent(_) => GroupVariant::Adjacent(inner),
            GroupVariant::StartingWith(_) => GroupVariant::StartingWith(inner),
            GroupVariant::EndingWith(_) => GroupVariant::EndingWith(inner),
        }
    }
}

/// A compiled expression.
///
/// The deep class hierarchy of a classic implementation is flattened to a
/// tagged variant; the shared behavior lives in the methods on this type
/// and in the evaluation module.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant, including the empty sequence.
    Literal(Sequence),
    ContextItem,
    /// The root of the tree containing the context node.
    Root,
    AxisStep {
        axis: Axis,
        node_test: NodeTest,
    },
    /// `left/right`: the right side evaluated once per left item.
    Path {
        left: ExprRef,
        right: ExprRef,
    },
    Filter {
        base: ExprRef,
        predicates: Vec<ExprRef>,
    },
    VarRef(Name),
    FunctionCall {
        function: BuiltinFunction,
        args: Vec<ExprRef>,
    },
    Arith {
        op: ArithOp,
        left: ExprRef,
        right: ExprRef,
    },
    Negate(ExprRef),
    And(ExprRef, ExprRef),
    Or(ExprRef, ExprRef),
    ValueComp {
        op: CompOp,
        left: ExprRef,
        right: ExprRef,
    },
    GeneralComp {
        op: CompOp,
        left: ExprRef,
        right: ExprRef,
    },
    NodeComp {
        op: NodeCompOp,
        left: ExprRef,
        right: ExprRef,
    },
    SetOp {
        op: SetOp,
        left: ExprRef,
        right: ExprRef,
    },
    Range {
        start: ExprRef,
        end: ExprRef,
    },
    /// Sequence concatenation.
    Append(Vec<ExprRef>),
    For {
        var: Name,
        in_expr: ExprRef,
        return_expr: ExprRef,
    },
    Let {
        var: Name,
        value: ExprRef,
        return_expr: ExprRef,
    },
    Quantified {
        quantifier: Quantifier,
        var: Name,
        in_expr: ExprRef,
        satisfies: ExprRef,
    },
    If {
        condition: ExprRef,
        then_branch: ExprRef,
        else_branch: ExprRef,
    },
    InstanceOf {
        expr: ExprRef,
        sequence_type: SequenceType,
    },
    Castable {
        expr: ExprRef,
        target: Xs,
        allows_empty: bool,
    },
    Cast {
        expr: ExprRef,
        target: Xs,
        allows_empty: bool,
    },
    /// A sort over a population, with one or more keys.
    ///
    /// Keys are evaluated with the population item as the context item;
    /// with `bind_var` set the item is additionally bound to that
    /// variable, the shape FLWOR `order by` lowers to.
    Sort {
        select: ExprRef,
        bind_var: Option<Name>,
        keys: Vec<SortKeyDef>,
    },
    /// `xsl:for-each`: the body runs once per selected item with the
    /// focus moved to it; results concatenate in population order.
    ForEach {
        select: ExprRef,
        body: ExprRef,
    },
    /// `xsl:for-each-group`: the body runs once per group.
    Group {
        population: ExprRef,
        variant: GroupVariant,
        body: ExprRef,
    },
    /// The document-order wrapper: sorts its operand into document order
    /// and removes duplicates.
    DocumentOrder(ExprRef),
    /// Atomizes the operand sequence.
    Atomizer(ExprRef),
    /// Checks the operand's cardinality at runtime.
    CardinalityChecker {
        base: ExprRef,
        cardinality: Occurrence,
        error: error::Error,
    },
    /// Checks every operand item against an item type at runtime.
    ItemTypeChecker {
        base: ExprRef,
        item_type: ItemType,
        error: error::Error,
    },
    /// Converts untyped atomics in the operand to a target type.
    UntypedConverter {
        base: ExprRef,
        target: Xs,
    },
    /// Trace instrumentation around an operand.
    Trace {
        base: ExprRef,
        label: String,
    },
}

impl Expr {
    /// The statically inferred cardinality of the result.
    pub fn cardinality(&self) -> Occurrence {
        match self {
            Expr::Literal(sequence) => match sequence.len() {
                0 => Occurrence::Empty,
                1 => Occurrence::One,
                _ => Occurrence::NonEmpty,
            },
            Expr::ContextItem | Expr::Root => Occurrence::One,
            Expr::And(_, _) | Expr::Or(_, _) | Expr::Quantified { .. } => Occurrence::One,
            Expr::InstanceOf { .. } | Expr::Castable { .. } => Occurrence::One,
            Expr::ValueComp { .. } | Expr::NodeComp { .. } => Occurrence::Option,
            Expr::GeneralComp { .. } => Occurrence::One,
            Expr::Arith { .. } | Expr::Negate(_) => Occurrence::Option,
            Expr::Cast { allows_empty, .. } => {
                if *allows_empty {
                    Occurrence::Option
                } else {
                    Occurrence::One
                }
            }
            Expr::Range { .. } => Occurrence::Many,
            Expr::AxisStep { .. } | Expr::Path { .. } | Expr::SetOp { .. } => Occurrence::Many,
            Expr::Filter { base, .. } => match base.cardinality() {
                Occurrence::Empty => Occurrence::Empty,
                Occurrence::One | Occurrence::Option => Occurrence::Option,
                _ => Occurrence::Many,
            },
            Expr::Append(items) => {
                if items.is_empty() {
                    Occurrence::Empty
                } else {
                    Occurrence::Many
                }
            }
            Expr::For { .. } | Expr::ForEach { .. } | Expr::Group { .. } => Occurrence::Many,
            Expr::Let { return_expr, .. } => return_expr.cardinality(),
            Expr::If {
                then_branch,
                else_branch,
                ..
            } => {
                if then_branch.cardinality() == else_branch.cardinality() {
                    then_branch.cardinality()
                } else {
                    Occurrence::Many
                }
            }
            Expr::VarRef(_) | Expr::FunctionCall { .. } => Occurrence::Many,
            Expr::Sort { select, .. } => select.cardinality(),
            Expr::DocumentOrder(base) => base.cardinality(),
            Expr::Atomizer(base) => base.cardinality(),
            Expr::CardinalityChecker { cardinality, .. } => *cardinality,
            Expr::ItemTypeChecker { base, .. } => base.cardinality(),
            Expr::UntypedConverter { base, .. } => base.cardinality(),
            Expr::Trace { base, .. } => base.cardinality(),
        }
    }

    /// The statically inferred item type of the result.
    pub fn item_type(&self) -> ItemType {
        match self {
            Expr::Literal(sequence) => {
                let mut result: Option<ItemType> = None;
                for item in sequence.iter() {
                    let item_type = match item {
                        crate::sequence::Item::Atomic(a) => ItemType::Atomic(a.xs_type()),
                        crate::sequence::Item::Node(_) => ItemType::Node(KindTest::Any),
                    };
                    result = Some(match result {
                        None => item_type,
                        Some(sofar) => sofar.union(&item_type),
                    });
                }
                result.unwrap_or(ItemType::Item)
            }
            Expr::ContextItem => ItemType::Item,
            Expr::Root => ItemType::Node(KindTest::Kind(
                NodeKind::Document,
                xylem_xpath_type::NameTest::Wildcard,
            )),
            Expr::AxisStep { node_test, .. } => match node_test {
                NodeTest::Kind(kind_test) => ItemType::Node(kind_test.clone()),
                NodeTest::Name(_) => ItemType::Node(KindTest::Any),
            },
            Expr::Path { right, .. } => right.item_type(),
            Expr::Filter { base, .. } => base.item_type(),
            Expr::VarRef(_) => ItemType::Item,
            Expr::FunctionCall { function, .. } => function.result_item_type(),
            Expr::Arith { left, right, .. } => arithmetic_item_type(left, right),
            Expr::Negate(base) => base.item_type(),
            Expr::And(_, _)
            | Expr::Or(_, _)
            | Expr::Quantified { .. }
            | Expr::InstanceOf { .. }
            | Expr::Castable { .. }
            | Expr::ValueComp { .. }
            | Expr::GeneralComp { .. }
            | Expr::NodeComp { .. } => ItemType::Atomic(Xs::Boolean),
            Expr::SetOp { .. } => ItemType::Node(KindTest::Any),
            Expr::Range { .. } => ItemType::Atomic(Xs::Integer),
            Expr::Append(items) => {
                let mut result: Option<ItemType> = None;
                for item in items {
                    let item_type = item.item_type();
                    result = Some(match result {
                        None => item_type,
                        Some(sofar) => sofar.union(&item_type),
                    });
                }
                result.unwrap_or(ItemType::Item)
            }
            Expr::For { return_expr, .. } => return_expr.item_type(),
            Expr::ForEach { body, .. } => body.item_type(),
            Expr::Let { return_expr, .. } => return_expr.item_type(),
            Expr::If {
                then_branch,
                else_branch,
                ..
            } => then_branch.item_type().union(&else_branch.item_type()),
            Expr::Cast { target, .. } => ItemType::Atomic(*target),
            Expr::Sort { select, .. } => select.item_type(),
            Expr::Group { body, .. } => body.item_type(),
            Expr::DocumentOrder(_) => ItemType::Node(KindTest::Any),
            Expr::Atomizer(_) => ItemType::Atomic(Xs::AnyAtomicType),
            Expr::CardinalityChecker { base, .. } => base.item_type(),
            Expr::ItemTypeChecker { item_type, .. } => item_type.clone(),
            Expr::UntypedConverter { base, target } => match base.item_type() {
                ItemType::Atomic(_) => ItemType::Atomic(*target),
                other => other,
            },
            Expr::Trace { base, .. } => base.item_type(),
        }
    }

    /// The statically inferred special properties of the result.
    pub fn special_properties(&self) -> SpecialProperties {
        use SpecialProperties as P;
        let non_creative = P::NON_CREATIVE;
        match self {
            Expr::Literal(_) => {
                non_creative | P::CONTEXT_INDEPENDENT | P::ORDERED_NODESET
            }
            Expr::ContextItem => non_creative | P::ORDERED_NODESET | P::SINGLE_DOCUMENT_NODESET,
            Expr::Root => {
                non_creative
                    | P::ORDERED_NODESET
                    | P::SINGLE_DOCUMENT_NODESET
                    | P::CONTEXT_DOCUMENT_NODESET
            }
            Expr::AxisStep { axis, .. } => {
                let mut props = non_creative
                    | P::SINGLE_DOCUMENT_NODESET
                    | P::CONTEXT_DOCUMENT_NODESET
                    | P::SUBTREE_NODESET;
                if axis.is_reverse() {
                    props |= P::REVERSE_DOCUMENT_ORDER;
                } else {
                    props |= P::ORDERED_NODESET;
                }
                if matches!(
                    axis,
                    Axis::Child | Axis::Attribute | Axis::SelfAxis | Axis::FollowingSibling
                ) {
                    props |= P::PEER_NODESET;
                }
                props
            }
            Expr::Path { left, right } => {
                let left_props = left.special_properties();
                let mut props = non_creative & right.special_properties();
                props |= left_props
                    & (P::SINGLE_DOCUMENT_NODESET | P::CONTEXT_DOCUMENT_NODESET);
                // a path over a singleton keeps the step's order
                if !left.cardinality().allows_many() {
                    props |= right.special_properties()
                        & (P::ORDERED_NODESET | P::REVERSE_DOCUMENT_ORDER | P::PEER_NODESET);
                }
                props | non_creative
            }
            Expr::Filter { base, .. } => {
                // predicates only remove items
                base.special_properties()
                    & (P::ORDERED_NODESET
                        | P::REVERSE_DOCUMENT_ORDER
                        | P::SINGLE_DOCUMENT_NODESET
                        | P::CONTEXT_DOCUMENT_NODESET
                        | P::PEER_NODESET
                        | P::SUBTREE_NODESET
                        | P::NON_CREATIVE)
            }
            Expr::DocumentOrder(base) => {
                (base.special_properties() & !P::REVERSE_DOCUMENT_ORDER) | P::ORDERED_NODESET
            }
            Expr::SetOp { left, right, .. } => {
                // set operations merge in document order
                (left.special_properties()
                    & right.special_properties()
                    & (P::SINGLE_DOCUMENT_NODESET
                        | P::CONTEXT_DOCUMENT_NODESET
                        | P::NON_CREATIVE))
                    | P::ORDERED_NODESET
            }
            Expr::VarRef(_) => non_creative | P::CONTEXT_INDEPENDENT,
            Expr::Sort { .. } | Expr::Group { .. } => non_creative,
            other => {
                let mut props = non_creative | P::CONTEXT_INDEPENDENT;
                for child in other.sub_expressions() {
                    if !child
                        .special_properties()
                        .contains(P::CONTEXT_INDEPENDENT)
                    {
                        props &= !P::CONTEXT_INDEPENDENT;
                    }
                    if !child.special_properties().contains(P::NON_CREATIVE) {
                        props &= !P::NON_CREATIVE;
                    }
                }
                props
            }
        }
    }

    /// The direct sub-expressions, in evaluation order.
    pub fn sub_expressions(&self) -> Vec<&ExprRef> {
        match self {
            Expr::Literal(_)
            | Expr::ContextItem
            | Expr::Root
            | Expr::AxisStep { .. }
            | Expr::VarRef(_) => Vec::new(),
            Expr::Path { left, right } => vec![left, right],
            Expr::Filter { base, predicates } => {
                let mut result = vec![base];
                result.extend(predicates.iter());
                result
            }
            Expr::FunctionCall { args, .. } => args.iter().collect(),
            Expr::Arith { left, right, .. } => vec![left, right],
            Expr::Negate(base) => vec![base],
            Expr::And(left, right) | Expr::Or(left, right) => vec![left, right],
            Expr::ValueComp { left, right, .. }
            | Expr::GeneralComp { left, right, .. }
            | Expr::NodeComp { left, right, .. }
            | Expr::SetOp { left, right, .. } => vec![left, right],
            Expr::Range { start, end } => vec![start, end],
            Expr::Append(items) => items.iter().collect(),
            Expr::For {
                in_expr,
                return_expr,
                ..
            } => vec![in_expr, return_expr],
            Expr::Let {
                value, return_expr, ..
            } => vec![value, return_expr],
            Expr::Quantified {
                in_expr, satisfies, ..
            } => vec![in_expr, satisfies],
            Expr::If {
                condition,
                then_branch,
                else_branch,
            } => vec![condition, then_branch, else_branch],
            Expr::InstanceOf { expr, .. }
            | Expr::Castable { expr, .. }
            | Expr::Cast { expr, .. } => {
                vec![expr]
            }
            Expr::Sort { select, keys, .. } => {
                let mut result = vec![select];
                result.extend(keys.iter().map(|key| &key.key));
                result
            }
            Expr::ForEach { select, body } => vec![select, body],
            Expr::Group {
                population,
                variant,
                body,
            } => vec![population, variant.inner(), body],
            Expr::DocumentOrder(base) | Expr::Atomizer(base) => vec![base],
            Expr::CardinalityChecker { base, .. }
            | Expr::ItemTypeChecker { base, .. }
            | Expr::UntypedConverter { base, .. }
            | Expr::Trace { base, .. } => vec![base],
        }
    }

    /// Whether evaluation reads the focus directly.
    fn uses_focus_directly(&self) -> bool {
        match self {
            Expr::ContextItem | Expr::Root | Expr::AxisStep { .. } => true,
            Expr::FunctionCall { function, .. } => function.depends_on_focus(),
            _ => false,
        }
    }

    /// Whether the result can change with the focus.
    ///
    /// Expressions that set their own focus shield their inner
    /// sub-expressions.
    pub fn depends_on_focus(&self) -> bool {
        if self.uses_focus_directly() {
            return true;
        }
        match self {
            // the base sees the outer focus; predicates see a new one
            Expr::Filter { base, .. } => base.depends_on_focus(),
            Expr::Path { left, .. } => left.depends_on_focus(),
            Expr::Sort { select, .. } => select.depends_on_focus(),
            Expr::ForEach { select, .. } => select.depends_on_focus(),
            Expr::Group { population, .. } => population.depends_on_focus(),
            other => other
                .sub_expressions()
                .iter()
                .any(|child| child.depends_on_focus()),
        }
    }

    /// The free variables of the expression.
    pub fn free_variables(&self) -> Vec<Name> {
        let mut result = Vec::new();
        self.collect_free_variables(&mut Vec::new(), &mut result);
        result
    }

    /// Whether the expression references the given variable freely.
    pub fn references_variable(&self, name: &Name) -> bool {
        self.free_variables().contains(name)
    }

    fn collect_free_variables(&self, bound: &mut Vec<Name>, result: &mut Vec<Name>) {
        match self {
            Expr::VarRef(name) => {
                if !bound.contains(name) && !result.contains(name) {
                    result.push(name.clone());
                }
            }
            Expr::For {
                var,
                in_expr,
                return_expr,
            }
            | Expr::Quantified {
                var,
                in_expr,
                satisfies: return_expr,
                ..
            } => {
                in_expr.collect_free_variables(bound, result);
                bound.push(var.clone());
                return_expr.collect_free_variables(bound, result);
                bound.pop();
            }
            Expr::Let {
                var,
                value,
                return_expr,
            } => {
                value.collect_free_variables(bound, result);
                bound.push(var.clone());
                return_expr.collect_free_variables(bound, result);
                bound.pop();
            }
            Expr::Sort {
                select,
                bind_var,
                keys,
            } => {
                select.collect_free_variables(bound, result);
                if let Some(var) = bind_var {
                    bound.push(var.clone());
                }
                for key in keys {
                    key.key.collect_free_variables(bound, result);
                }
                if bind_var.is_some() {
                    bound.pop();
                }
            }
            other => {
                for child in other.sub_expressions() {
                    child.collect_free_variables(bound, result);
                }
            }
        }
    }

    /// A multi-line structural dump for diagnostics.
    pub fn display(&self, indent: usize) -> String {
        let pad = "  ".repeat(indent);
        let label = match self {
            Expr::Literal(sequence) => format!("literal[{}]", sequence.len()),
            Expr::ContextItem => "context-item".to_string(),
            Expr::Root => "root".to_string(),
            Expr::AxisStep { axis, .. } => format!("step[{:?}]", axis),
            Expr::Path { .. } => "path".to_string(),
            Expr::Filter { predicates, .. } => format!("filter[{}]", predicates.len()),
            Expr::VarRef(name) => format!("var[${}]", name),
            Expr::FunctionCall { function, .. } => format!("call[{}]", function.display_name()),
            Expr::Arith { op, .. } => format!("arith[{:?}]", op),
            Expr::Negate(_) => "negate".to_string(),
            Expr::And(_, _) => "and".to_string(),
            Expr::Or(_, _) => "or".to_string(),
            Expr::ValueComp { op, .. } => format!("value-comp[{:?}]", op),
            Expr::GeneralComp { op, .. } => format!("general-comp[{:?}]", op),
            Expr::NodeComp { op, .. } => format!("node-comp[{:?}]", op),
            Expr::SetOp { op, .. } => format!("set-op[{:?}]", op),
            Expr::Range { .. } => "range".to_string(),
            Expr::Append(_) => "append".to_string(),
            Expr::For { var, .. } => format!("for[${}]", var),
            Expr::ForEach { .. } => "for-each".to_string(),
            Expr::Let { var, .. } => format!("let[${}]", var),
            Expr::Quantified {
                quantifier, var, ..
            } => format!("quantified[{:?} ${}]", quantifier, var),
            Expr::If { .. } => "if".to_string(),
            Expr::InstanceOf { sequence_type, .. } => {
                format!("instance-of[{}]", sequence_type.display())
            }
            Expr::Castable { target, .. } => format!("castable[{}]", target),
            Expr::Cast { target, .. } => format!("cast[{}]", target),
            Expr::Sort { keys, .. } => format!("sort[{} keys]", keys.len()),
            Expr::Group { variant, .. } => match variant {
                GroupVariant::By(_) => "group[by]".to_string(),
                GroupVariant::Adjacent(_) => "group[adjacent]".to_string(),
                GroupVariant::StartingWith(_) => "group[starting-with]".to_string(),
                GroupVariant::EndingWith(_) => "group[ending-with]".to_string(),
            },
            Expr::DocumentOrder(_) => "document-order".to_string(),
            Expr::Atomizer(_) => "atomize".to_string(),
            Expr::CardinalityChecker { cardinality, .. } => {
                format!("check-cardinality[{:?}]", cardinality)
            }
            Expr::ItemTypeChecker { item_type, .. } => {
                format!("check-item-type[{}]", item_type.display())
            }
            Expr::UntypedConverter { target, .. } => format!("convert-untyped[{}]", target),
            Expr::Trace { label, .. } => format!("trace[{}]", label),
        };
        let mut result = format!("{}{}\n", pad, label);
        for child in self.sub_expressions() {
            result.push_str(&child.display(indent + 1));
        }
        result
    }
}

fn arithmetic_item_type(left: &Expr, right: &Expr) -> ItemType {
    let (a, b) = (left.item_type(), right.item_type());
    match (a, b) {
        (ItemType::Atomic(a), ItemType::Atomic(b)) => {
            let (a, b) = (
                a.primitive().unwrap_or(Xs::AnyAtomicType),
                b.primitive().unwrap_or(Xs::AnyAtomicType),
            );
            if a == Xs::Double || b == Xs::Double || a == Xs::UntypedAtomic || b == Xs::UntypedAtomic
            {
                ItemType::Atomic(Xs::Double)
            } else if a == Xs::Float || b == Xs::Float {
                ItemType::Atomic(Xs::Float)
            } else if a == Xs::Decimal && b == Xs::Decimal {
                if left.item_type() == ItemType::Atomic(Xs::Integer)
                    && right.item_type() == ItemType::Atomic(Xs::Integer)
                {
                    ItemType::Atomic(Xs::Integer)
                } else {
                    ItemType::Atomic(Xs::Decimal)
                }
            } else {
                ItemType::Atomic(Xs::AnyAtomicType)
            }
        }
        _ => ItemType::Atomic(Xs::AnyAtomicType),
    }
}

/// Rebuild an expression with its children rewritten by `rewrite`.
///
/// The shared traversal of the compile passes: each pass handles the
/// variants it cares about and leaves the rest to this.
pub(crate) fn rewrite_children(
    expr: &ExprRef,
    rewrite: &mut dyn FnMut(&ExprRef) -> error::Result<ExprRef>,
) -> error::Result<ExprRef> {
    let rebuilt = match expr.as_ref() {
        Expr::Literal(_)
        | Expr::ContextItem
        | Expr::Root
        | Expr::AxisStep { .. }
        | Expr::VarRef(_) => return Ok(expr.clone()),
        Expr::Path { left, right } => Expr::Path {
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::Filter { base, predicates } => Expr::Filter {
            base: rewrite(base)?,
            predicates: predicates
                .iter()
                .map(rewrite)
                .collect::<error::Result<_>>()?,
        },
        Expr::FunctionCall { function, args } => Expr::FunctionCall {
            function: function.clone(),
            args: args.iter().map(rewrite).collect::<error::Result<_>>()?,
        },
        Expr::Arith { op, left, right } => Expr::Arith {
            op: *op,
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::Negate(base) => Expr::Negate(rewrite(base)?),
        Expr::And(left, right) => Expr::And(rewrite(left)?, rewrite(right)?),
        Expr::Or(left, right) => Expr::Or(rewrite(left)?, rewrite(right)?),
        Expr::ValueComp { op, left, right } => Expr::ValueComp {
            op: *op,
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::GeneralComp { op, left, right } => Expr::GeneralComp {
            op: *op,
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::NodeComp { op, left, right } => Expr::NodeComp {
            op: *op,
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::SetOp { op, left, right } => Expr::SetOp {
            op: *op,
            left: rewrite(left)?,
            right: rewrite(right)?,
        },
        Expr::Range { start, end } => Expr::Range {
            start: rewrite(start)?,
            end: rewrite(end)?,
        },
        Expr::Append(items) => {
            Expr::Append(items.iter().map(rewrite).collect::<error::Result<_>>()?)
        }
        Expr::For {
            var,
            in_expr,
            return_expr,
        } => Expr::For {
            var: var.clone(),
            in_expr: rewrite(in_expr)?,
            return_expr: rewrite(return_expr)?,
        },
        Expr::Let {
            var,
            value,
            return_expr,
        } => Expr::Let {
            var: var.clone(),
            value: rewrite(value)?,
            return_expr: rewrite(return_expr)?,
        },
        Expr::Quantified {
            quantifier,
            var,
            in_expr,
            satisfies,
        } => Expr::Quantified {
            quantifier: *quantifier,
            var: var.clone(),
            in_expr: rewrite(in_expr)?,
            satisfies: rewrite(satisfies)?,
        },
        Expr::If {
            condition,
            then_branch,
            else_branch,
        } => Expr::If {
            condition: rewrite(condition)?,
            then_branch: rewrite(then_branch)?,
            else_branch: rewrite(else_branch)?,
        },
        Expr::InstanceOf {
            expr: inner,
            sequence_type,
        } => Expr::InstanceOf {
            expr: rewrite(inner)?,
            sequence_type: sequence_type.clone(),
        },
        Expr::Castable {
            expr: inner,
            target,
            allows_empty,
        } => Expr::Castable {
            expr: rewrite(inner)?,
            target: *target,
            allows_empty: *allows_empty,
        },
        Expr::Cast {
            expr: inner,
            target,
            allows_empty,
        } => Expr::Cast {
            expr: rewrite(inner)?,
            target: *target,
            allows_empty: *allows_empty,
        },
        Expr::Sort {
            select,
            bind_var,
            keys,
        } => Expr::Sort {
            select: rewrite(select)?,
            bind_var: bind_var.clone(),
            keys: keys
                .iter()
                .map(|key| {
                    Ok(SortKeyDef {
                        key: rewrite(&key.key)?,
                        order: key.order,
                        empty_order: key.empty_order,
                        data_type: key.data_type,
                        collation_uri: key.collation_uri.clone(),
                    })
                })
                .collect::<error::Result<_>>()?,
        },
        Expr::ForEach { select, body } => Expr::ForEach {
            select: rewrite(select)?,
            body: rewrite(body)?,
        },
        Expr::Group {
            population,
            variant,
            body,
        } => Expr::Group {
            population: rewrite(population)?,
            variant: variant.with_inner(rewrite(variant.inner())?),
            body: rewrite(body)?,
        },
        Expr::DocumentOrder(base) => Expr::DocumentOrder(rewrite(base)?),
        Expr::Atomizer(base) => Expr::Atomizer(rewrite(base)?),
        Expr::CardinalityChecker {
            base,
            cardinality,
            error,
        } => Expr::CardinalityChecker {
            base: rewrite(base)?,
            cardinality: *cardinality,
            error: error.clone(),
        },
        Expr::ItemTypeChecker {
            base,
            item_type,
            error,
        } => Expr::ItemTypeChecker {
            base: rewrite(base)?,
            item_type: item_type.clone(),
            error: error.clone(),
        },
        Expr::UntypedConverter { base, target } => Expr::UntypedConverter {
            base: rewrite(base)?,
            target: *target,
        },
        Expr::Trace { base, label } => Expr::Trace {
            base: rewrite(base)?,
            label: label.clone(),
        },
    };
    Ok(Rc::new(rebuilt))
}

use thiserror::Error;

use xylem_name::{Name, Namespaces};
use xylem_schema_type::Xs;
use xylem_xpath_type::{ItemType, KindTest, NameTest, NodeKind, Occurrence, SequenceType};

use crate::ast::{
    ArithOp, Axis, Binding, CompOp, EmptyOrder, Expr, ExprS, Literal, NodeCompOp, NodeTest,
    OrderSpec, Quantifier, SetOp, SingleType, SortOrder,
};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::Span;

/// Errors raised while turning source text into an AST.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    #[error("unexpected character {character:?}")]
    UnexpectedCharacter { character: char, span: Span },
    #[error("unclosed comment")]
    UnclosedComment { span: Span },
    #[error("unclosed string literal")]
    UnclosedString { span: Span },
    #[error("invalid numeric literal {text:?}")]
    InvalidNumber { text: String, span: Span },
    #[error("expected {expected}")]
    Expected { expected: String, span: Span },
    #[error("unknown namespace prefix {prefix:?}")]
    UnknownPrefix { prefix: String, span: Span },
    #[error("unknown type {name:?}")]
    UnknownType { name: String, span: Span },
    #[error("{name:?} is a reserved function name")]
    ReservedFunctionName { name: String, span: Span },
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: String, span: Span },
}

impl ParserError {
    /// Where in the source the error sits.
    pub fn span(&self) -> Span {
        match self {
            ParserError::UnexpectedCharacter { span, .. } => *span,
            ParserError::UnclosedComment { span } => *span,
            ParserError::UnclosedString { span } => *span,
            ParserError::InvalidNumber { span, .. } => *span,
            ParserError::Expected { span, .. } => *span,
            ParserError::UnknownPrefix { span, .. } => *span,
            ParserError::UnknownType { span, .. } => *span,
            ParserError::ReservedFunctionName { span, .. } => *span,
            ParserError::Unsupported { span, .. } => *span,
        }
    }
}

/// Which grammar to accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// XPath 2.0.
    #[default]
    XPath,
    /// XPath 2.0 plus the FLWOR `where`/`order by` clauses.
    XQuery,
}

/// Statically known information the parser needs: in-scope namespaces.
#[derive(Debug, Clone, Default)]
pub struct ParserContext {
    pub namespaces: Namespaces,
}

// per XPath 2.0 A.3: these may not be used as function names
const RESERVED_FUNCTION_NAMES: &[&str] = &[
    "attribute",
    "comment",
    "document-node",
    "element",
    "empty-sequence",
    "if",
    "item",
    "node",
    "processing-instruction",
    "schema-attribute",
    "schema-element",
    "text",
    "typeswitch",
];

/// The recursive-descent XPath parser.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    context: &'a ParserContext,
    mode: ParseMode,
    end: usize,
}

impl<'a> Parser<'a> {
    /// Parse a complete expression; trailing input is an error.
    pub fn parse(
        source: &str,
        context: &'a ParserContext,
        mode: ParseMode,
    ) -> Result<ExprS, ParserError> {
        let tokens = Lexer::tokenize(source)?;
        let mut parser = Parser {
            tokens,
            position: 0,
            context,
            mode,
            end: source.len(),
        };
        let expr = parser.expr()?;
        if parser.position < parser.tokens.len() {
            return Err(parser.expected("end of expression"));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.position).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + ahead).map(|t| &t.kind)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|t| t.span)
            .unwrap_or(Span::new(self.end, self.end))
    }

    fn previous_span(&self) -> Span {
        if self.position == 0 {
            Span::new(0, 0)
        } else {
            self.tokens[self.position - 1].span
        }
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expected(&self, what: &str) -> ParserError {
        ParserError::Expected {
            expected: what.to_string(),
            span: self.current_span(),
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Span, ParserError> {
        if self.peek() == Some(&kind) {
            Ok(self.bump().unwrap().span)
        } else {
            Err(self.expected(what))
        }
    }

    // an unprefixed name equal to the given keyword
    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(TokenKind::Name { prefix: None, local }) if local == keyword)
    }

    fn at_keyword_at(&self, ahead: usize, keyword: &str) -> bool {
        matches!(self.peek_at(ahead), Some(TokenKind::Name { prefix: None, local }) if local == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParserError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.expected(keyword))
        }
    }

    // ---- name resolution ----

    fn resolve_prefix(&self, prefix: &str, span: Span) -> Result<String, ParserError> {
        self.context
            .namespaces
            .by_prefix(prefix)
            .map(|uri| uri.to_string())
            .ok_or_else(|| ParserError::UnknownPrefix {
                prefix: prefix.to_string(),
                span,
            })
    }

    fn element_name(
        &self,
        prefix: Option<&str>,
        local: &str,
        span: Span,
    ) -> Result<Name, ParserError> {
        match prefix {
            Some(prefix) => {
                let uri = self.resolve_prefix(prefix, span)?;
                Ok(Name::new(
                    local.to_string(),
                    Some(uri),
                    Some(prefix.to_string()),
                ))
            }
            None => {
                let default = self.context.namespaces.default_element_namespace();
                Ok(Name::unprefixed(local).with_default_namespace(if default.is_empty() {
                    None
                } else {
                    Some(default)
                }))
            }
        }
    }

    fn function_name(
        &self,
        prefix: Option<&str>,
        local: &str,
        span: Span,
    ) -> Result<Name, ParserError> {
        match prefix {
            Some(prefix) => {
                let uri = self.resolve_prefix(prefix, span)?;
                Ok(Name::new(
                    local.to_string(),
                    Some(uri),
                    Some(prefix.to_string()),
                ))
            }
            None => {
                let default = self.context.namespaces.default_function_namespace();
                Ok(Name::uri_qualified(default, local))
            }
        }
    }

    fn variable_name(&mut self) -> Result<Name, ParserError> {
        self.expect(TokenKind::Dollar, "$")?;
        match self.bump() {
            Some(Token {
                kind: TokenKind::Name { prefix, local },
                span,
            }) => match prefix {
                Some(prefix) => {
                    let uri = self.resolve_prefix(&prefix, span)?;
                    Ok(Name::new(local, Some(uri), Some(prefix)))
                }
                None => Ok(Name::unprefixed(&local)),
            },
            _ => Err(self.expected("variable name")),
        }
    }

    fn type_name(&self, prefix: Option<&str>, local: &str, span: Span) -> Result<Xs, ParserError> {
        let namespace = match prefix {
            Some(prefix) => self.resolve_prefix(prefix, span)?,
            // unprefixed type names resolve in the schema namespace
            None => Xs::namespace().to_string(),
        };
        Xs::by_name(Some(&namespace), local).ok_or_else(|| ParserError::UnknownType {
            name: local.to_string(),
            span,
        })
    }

    // ---- expressions ----

    fn expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        let first = self.expr_single()?;
        if self.peek() != Some(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            items.push(self.expr_single()?);
        }
        let span = start.covering(self.previous_span());
        Ok(ExprS::new(Expr::Sequence(items), span))
    }

    fn expr_single(&mut self) -> Result<ExprS, ParserError> {
        if self.at_keyword("for") && matches!(self.peek_at(1), Some(TokenKind::Dollar)) {
            return self.for_expr();
        }
        if self.at_keyword("let") && matches!(self.peek_at(1), Some(TokenKind::Dollar)) {
            return self.let_expr();
        }
        if (self.at_keyword("some") || self.at_keyword("every"))
            && matches!(self.peek_at(1), Some(TokenKind::Dollar))
        {
            return self.quantified_expr();
        }
        if self.at_keyword("if") && matches!(self.peek_at(1), Some(TokenKind::LeftParen)) {
            return self.if_expr();
        }
        self.or_expr()
    }

    fn for_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        self.expect_keyword("for")?;
        let mut bindings = vec![self.binding()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            bindings.push(self.binding()?);
        }
        let mut where_clause = None;
        let mut order_by = Vec::new();
        if self.mode == ParseMode::XQuery {
            if self.eat_keyword("where") {
                where_clause = Some(Box::new(self.expr_single()?));
            }
            if self.at_keyword("stable") && self.at_keyword_at(1, "order") {
                self.bump();
            }
            if self.at_keyword("order") && self.at_keyword_at(1, "by") {
                self.bump();
                self.bump();
                order_by.push(self.order_spec()?);
                while self.peek() == Some(&TokenKind::Comma) {
                    self.bump();
                    order_by.push(self.order_spec()?);
                }
            }
        }
        self.expect_keyword("return")?;
        let return_expr = Box::new(self.expr_single()?);
        let span = start.covering(return_expr.span);
        Ok(ExprS::new(
            Expr::For {
                bindings,
                order_by,
                where_clause,
                return_expr,
            },
            span,
        ))
    }

    fn order_spec(&mut self) -> Result<OrderSpec, ParserError> {
        let key = self.expr_single()?;
        let order = if self.eat_keyword("descending") {
            SortOrder::Descending
        } else {
            self.eat_keyword("ascending");
            SortOrder::Ascending
        };
        let empty_order = if self.eat_keyword("empty") {
            if self.eat_keyword("greatest") {
                Some(EmptyOrder::Greatest)
            } else {
                self.expect_keyword("least")?;
                Some(EmptyOrder::Least)
            }
        } else {
            None
        };
        let collation = if self.eat_keyword("collation") {
            match self.bump() {
                Some(Token {
                    kind: TokenKind::StringLit(uri),
                    ..
                }) => Some(uri),
                _ => return Err(self.expected("collation URI literal")),
            }
        } else {
            None
        };
        Ok(OrderSpec {
            key,
            order,
            empty_order,
            collation,
        })
    }

    fn let_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        self.expect_keyword("let")?;
        let mut bindings = vec![self.let_binding()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            bindings.push(self.let_binding()?);
        }
        self.expect_keyword("return")?;
        let return_expr = Box::new(self.expr_single()?);
        let span = start.covering(return_expr.span);
        Ok(ExprS::new(
            Expr::Let {
                bindings,
                return_expr,
            },
            span,
        ))
    }

    fn binding(&mut self) -> Result<Binding, ParserError> {
        let name = self.variable_name()?;
        self.expect_keyword("in")?;
        let expr = self.expr_single()?;
        Ok(Binding { name, expr })
    }

    fn let_binding(&mut self) -> Result<Binding, ParserError> {
        let name = self.variable_name()?;
        self.expect(TokenKind::Assign, ":=")?;
        let expr = self.expr_single()?;
        Ok(Binding { name, expr })
    }

    fn quantified_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        let quantifier = if self.eat_keyword("some") {
            Quantifier::Some
        } else {
            self.expect_keyword("every")?;
            Quantifier::Every
        };
        let mut bindings = vec![self.binding()?];
        while self.peek() == Some(&TokenKind::Comma) {
            self.bump();
            bindings.push(self.binding()?);
        }
        self.expect_keyword("satisfies")?;
        let satisfies = Box::new(self.expr_single()?);
        let span = start.covering(satisfies.span);
        Ok(ExprS::new(
            Expr::Quantified {
                quantifier,
                bindings,
                satisfies,
            },
            span,
        ))
    }

    fn if_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        self.expect_keyword("if")?;
        self.expect(TokenKind::LeftParen, "(")?;
        let condition = Box::new(self.expr()?);
        self.expect(TokenKind::RightParen, ")")?;
        self.expect_keyword("then")?;
        let then_branch = Box::new(self.expr_single()?);
        self.expect_keyword("else")?;
        let else_branch = Box::new(self.expr_single()?);
        let span = start.covering(else_branch.span);
        Ok(ExprS::new(
            Expr::If {
                condition,
                then_branch,
                else_branch,
            },
            span,
        ))
    }

    fn or_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.and_expr()?;
        while self.at_keyword("or") {
            self.bump();
            let right = self.and_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(Expr::Or(Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.comparison_expr()?;
        while self.at_keyword("and") {
            self.bump();
            let right = self.comparison_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(Expr::And(Box::new(left), Box::new(right)), span);
        }
        Ok(left)
    }

    fn comparison_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.range_expr()?;
        enum Comp {
            General(CompOp),
            Value(CompOp),
            Node(NodeCompOp),
        }
        let comp = match self.peek() {
            Some(TokenKind::Equal) => Comp::General(CompOp::Eq),
            Some(TokenKind::NotEqual) => Comp::General(CompOp::Ne),
            Some(TokenKind::LessThan) => Comp::General(CompOp::Lt),
            Some(TokenKind::LessEqual) => Comp::General(CompOp::Le),
            Some(TokenKind::GreaterThan) => Comp::General(CompOp::Gt),
            Some(TokenKind::GreaterEqual) => Comp::General(CompOp::Ge),
            Some(TokenKind::Precedes) => Comp::Node(NodeCompOp::Precedes),
            Some(TokenKind::Follows) => Comp::Node(NodeCompOp::Follows),
            Some(TokenKind::Name { prefix: None, local }) => match local.as_str() {
                "eq" => Comp::Value(CompOp::Eq),
                "ne" => Comp::Value(CompOp::Ne),
                "lt" => Comp::Value(CompOp::Lt),
                "le" => Comp::Value(CompOp::Le),
                "gt" => Comp::Value(CompOp::Gt),
                "ge" => Comp::Value(CompOp::Ge),
                "is" => Comp::Node(NodeCompOp::Is),
                _ => return Ok(left),
            },
            _ => return Ok(left),
        };
        self.bump();
        let right = self.range_expr()?;
        let span = left.span.covering(right.span);
        let expr = match comp {
            Comp::General(op) => Expr::GeneralComp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Comp::Value(op) => Expr::ValueComp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            Comp::Node(op) => Expr::NodeComp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        };
        Ok(ExprS::new(expr, span))
    }

    fn range_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.additive_expr()?;
        if self.at_keyword("to") {
            self.bump();
            let right = self.additive_expr()?;
            let span = left.span.covering(right.span);
            return Ok(ExprS::new(
                Expr::Range {
                    start: Box::new(left),
                    end: Box::new(right),
                },
                span,
            ));
        }
        Ok(left)
    }

    fn additive_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => ArithOp::Add,
                Some(TokenKind::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.multiplicative_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(
                Expr::Arith {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn multiplicative_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.union_expr()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => ArithOp::Mul,
                Some(TokenKind::Name { prefix: None, local }) => match local.as_str() {
                    "div" => ArithOp::Div,
                    "idiv" => ArithOp::IntDiv,
                    "mod" => ArithOp::Mod,
                    _ => break,
                },
                _ => break,
            };
            self.bump();
            let right = self.union_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(
                Expr::Arith {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn union_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.intersect_except_expr()?;
        loop {
            let is_union = matches!(self.peek(), Some(TokenKind::Pipe)) || self.at_keyword("union");
            if !is_union {
                break;
            }
            self.bump();
            let right = self.intersect_except_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(
                Expr::SetOp {
                    op: SetOp::Union,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn intersect_except_expr(&mut self) -> Result<ExprS, ParserError> {
        let mut left = self.instance_of_expr()?;
        loop {
            let op = if self.at_keyword("intersect") {
                SetOp::Intersect
            } else if self.at_keyword("except") {
                SetOp::Except
            } else {
                break;
            };
            self.bump();
            let right = self.instance_of_expr()?;
            let span = left.span.covering(right.span);
            left = ExprS::new(
                Expr::SetOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn instance_of_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.treat_expr()?;
        if self.at_keyword("instance") && self.at_keyword_at(1, "of") {
            self.bump();
            self.bump();
            let sequence_type = self.sequence_type()?;
            let span = left.span.covering(self.previous_span());
            return Ok(ExprS::new(
                Expr::InstanceOf {
                    expr: Box::new(left),
                    sequence_type,
                },
                span,
            ));
        }
        Ok(left)
    }

    fn treat_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.castable_expr()?;
        if self.at_keyword("treat") && self.at_keyword_at(1, "as") {
            self.bump();
            self.bump();
            let sequence_type = self.sequence_type()?;
            let span = left.span.covering(self.previous_span());
            return Ok(ExprS::new(
                Expr::TreatAs {
                    expr: Box::new(left),
                    sequence_type,
                },
                span,
            ));
        }
        Ok(left)
    }

    fn castable_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.cast_expr()?;
        if self.at_keyword("castable") && self.at_keyword_at(1, "as") {
            self.bump();
            self.bump();
            let single_type = self.single_type()?;
            let span = left.span.covering(self.previous_span());
            return Ok(ExprS::new(
                Expr::CastableAs {
                    expr: Box::new(left),
                    single_type,
                },
                span,
            ));
        }
        Ok(left)
    }

    fn cast_expr(&mut self) -> Result<ExprS, ParserError> {
        let left = self.unary_expr()?;
        if self.at_keyword("cast") && self.at_keyword_at(1, "as") {
            self.bump();
            self.bump();
            let single_type = self.single_type()?;
            let span = left.span.covering(self.previous_span());
            return Ok(ExprS::new(
                Expr::CastAs {
                    expr: Box::new(left),
                    single_type,
                },
                span,
            ));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        let mut negate = false;
        loop {
            match self.peek() {
                Some(TokenKind::Minus) => {
                    negate = !negate;
                    self.bump();
                }
                Some(TokenKind::Plus) => {
                    self.bump();
                }
                _ => break,
            }
        }
        let operand = self.path_expr()?;
        if negate {
            let span = start.covering(operand.span);
            Ok(ExprS::new(Expr::Negate(Box::new(operand)), span))
        } else {
            Ok(operand)
        }
    }

    fn path_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        match self.peek() {
            Some(TokenKind::Slash) => {
                self.bump();
                let root = ExprS::new(Expr::Root, start);
                if self.can_start_step() {
                    self.relative_path(root, start)
                } else {
                    Ok(root)
                }
            }
            Some(TokenKind::DoubleSlash) => {
                self.bump();
                let root = ExprS::new(Expr::Root, start);
                let descend = ExprS::new(
                    Expr::AxisStep {
                        axis: Axis::DescendantOrSelf,
                        node_test: NodeTest::Kind(KindTest::Any),
                    },
                    start,
                );
                let base = ExprS::new(
                    Expr::PathStep {
                        left: Box::new(root),
                        right: Box::new(descend),
                    },
                    start,
                );
                self.relative_path(base, start)
            }
            _ => {
                let first = self.step_expr()?;
                if matches!(
                    self.peek(),
                    Some(TokenKind::Slash) | Some(TokenKind::DoubleSlash)
                ) {
                    self.relative_path(first, start)
                } else {
                    Ok(first)
                }
            }
        }
    }

    // continue a path after `base`; the next token is a step or a slash
    fn relative_path(&mut self, base: ExprS, start: Span) -> Result<ExprS, ParserError> {
        let mut left = base;
        loop {
            match self.peek() {
                Some(TokenKind::Slash) => {
                    self.bump();
                }
                Some(TokenKind::DoubleSlash) => {
                    self.bump();
                    let descend = ExprS::new(
                        Expr::AxisStep {
                            axis: Axis::DescendantOrSelf,
                            node_test: NodeTest::Kind(KindTest::Any),
                        },
                        self.previous_span(),
                    );
                    let span = start.covering(self.previous_span());
                    left = ExprS::new(
                        Expr::PathStep {
                            left: Box::new(left),
                            right: Box::new(descend),
                        },
                        span,
                    );
                }
                _ => {
                    // first call arrives positioned at the step itself
                    if !self.can_start_step() {
                        break;
                    }
                }
            }
            let step = self.step_expr()?;
            let span = start.covering(step.span);
            left = ExprS::new(
                Expr::PathStep {
                    left: Box::new(left),
                    right: Box::new(step),
                },
                span,
            );
            if !matches!(
                self.peek(),
                Some(TokenKind::Slash) | Some(TokenKind::DoubleSlash)
            ) {
                break;
            }
        }
        Ok(left)
    }

    fn can_start_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                TokenKind::Name { .. }
                    | TokenKind::Star
                    | TokenKind::LocalWildcard(_)
                    | TokenKind::PrefixWildcard(_)
                    | TokenKind::At
                    | TokenKind::Dot
                    | TokenKind::DotDot
                    | TokenKind::Dollar
                    | TokenKind::LeftParen
            )
        )
    }

    fn step_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        let base = self.step_base()?;
        // predicates apply to whatever step or primary came first
        if self.peek() == Some(&TokenKind::LeftBracket) {
            let mut predicates = Vec::new();
            while self.peek() == Some(&TokenKind::LeftBracket) {
                self.bump();
                predicates.push(self.expr()?);
                self.expect(TokenKind::RightBracket, "]")?;
            }
            let span = start.covering(self.previous_span());
            return Ok(ExprS::new(
                Expr::Filter {
                    base: Box::new(base),
                    predicates,
                },
                span,
            ));
        }
        Ok(base)
    }

    fn step_base(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        match self.peek() {
            Some(TokenKind::DotDot) => {
                self.bump();
                Ok(ExprS::new(
                    Expr::AxisStep {
                        axis: Axis::Parent,
                        node_test: NodeTest::Kind(KindTest::Any),
                    },
                    start,
                ))
            }
            Some(TokenKind::At) => {
                self.bump();
                let node_test = self.node_test(Axis::Attribute)?;
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(
                    Expr::AxisStep {
                        axis: Axis::Attribute,
                        node_test,
                    },
                    span,
                ))
            }
            Some(TokenKind::Name { prefix: None, local })
                if axis_by_name(local).is_some()
                    && self.peek_at(1) == Some(&TokenKind::DoubleColon) =>
            {
                let axis = axis_by_name(local).unwrap();
                self.bump();
                self.bump();
                let node_test = self.node_test(axis)?;
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(Expr::AxisStep { axis, node_test }, span))
            }
            Some(TokenKind::Star)
            | Some(TokenKind::LocalWildcard(_))
            | Some(TokenKind::PrefixWildcard(_)) => {
                let node_test = self.node_test(Axis::Child)?;
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(
                    Expr::AxisStep {
                        axis: Axis::Child,
                        node_test,
                    },
                    span,
                ))
            }
            Some(TokenKind::Name { prefix: None, local })
                if is_kind_test_name(local) && self.peek_at(1) == Some(&TokenKind::LeftParen) =>
            {
                let node_test = self.node_test(Axis::Child)?;
                // an attribute kind test steps along the attribute axis
                let axis = match &node_test {
                    NodeTest::Kind(KindTest::Kind(NodeKind::Attribute, _)) => Axis::Attribute,
                    _ => Axis::Child,
                };
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(Expr::AxisStep { axis, node_test }, span))
            }
            Some(TokenKind::Name { .. }) if self.peek_at(1) == Some(&TokenKind::LeftParen) => {
                self.function_call()
            }
            Some(TokenKind::Name { .. }) => {
                let node_test = self.node_test(Axis::Child)?;
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(
                    Expr::AxisStep {
                        axis: Axis::Child,
                        node_test,
                    },
                    span,
                ))
            }
            _ => self.primary_expr(),
        }
    }

    fn node_test(&mut self, axis: Axis) -> Result<NodeTest, ParserError> {
        let principal = if axis == Axis::Attribute {
            NodeKind::Attribute
        } else {
            NodeKind::Element
        };
        match self.peek().cloned() {
            Some(TokenKind::Star) => {
                self.bump();
                Ok(NodeTest::Name(NameTest::Wildcard))
            }
            Some(TokenKind::LocalWildcard(local)) => {
                self.bump();
                Ok(NodeTest::Name(NameTest::LocalName(local)))
            }
            Some(TokenKind::PrefixWildcard(prefix)) => {
                let span = self.current_span();
                self.bump();
                let uri = self.resolve_prefix(&prefix, span)?;
                Ok(NodeTest::Name(NameTest::Namespace(uri)))
            }
            Some(TokenKind::Name { prefix, local }) => {
                let span = self.current_span();
                if prefix.is_none()
                    && is_kind_test_name(&local)
                    && self.peek_at(1) == Some(&TokenKind::LeftParen)
                {
                    return self.kind_test().map(NodeTest::Kind);
                }
                self.bump();
                let name = if principal == NodeKind::Attribute {
                    // unprefixed attribute names are in no namespace
                    match prefix {
                        Some(prefix) => {
                            let uri = self.resolve_prefix(&prefix, span)?;
                            Name::new(local, Some(uri), Some(prefix))
                        }
                        None => Name::unprefixed(&local),
                    }
                } else {
                    self.element_name(prefix.as_deref(), &local, span)?
                };
                Ok(NodeTest::Name(NameTest::Name(name)))
            }
            _ => Err(self.expected("node test")),
        }
    }

    fn kind_test(&mut self) -> Result<KindTest, ParserError> {
        let (local, span) = match self.bump() {
            Some(Token {
                kind: TokenKind::Name { prefix: None, local },
                span,
            }) => (local, span),
            _ => return Err(self.expected("kind test")),
        };
        self.expect(TokenKind::LeftParen, "(")?;
        let test = match local.as_str() {
            "node" => {
                self.expect(TokenKind::RightParen, ")")?;
                return Ok(KindTest::Any);
            }
            "text" => KindTest::Kind(NodeKind::Text, NameTest::Wildcard),
            "comment" => KindTest::Kind(NodeKind::Comment, NameTest::Wildcard),
            "processing-instruction" => {
                let name_test = match self.peek().cloned() {
                    Some(TokenKind::Name { prefix: None, local }) => {
                        self.bump();
                        NameTest::Name(Name::unprefixed(&local))
                    }
                    Some(TokenKind::StringLit(target)) => {
                        self.bump();
                        NameTest::Name(Name::unprefixed(target.trim()))
                    }
                    _ => NameTest::Wildcard,
                };
                KindTest::Kind(NodeKind::ProcessingInstruction, name_test)
            }
            "document-node" => {
                // an optional inner element test constrains the document
                // element; the constraint is kept as the document's name test
                let name_test = if self.at_keyword("element") {
                    match self.kind_test()? {
                        KindTest::Kind(NodeKind::Element, name_test) => name_test,
                        _ => NameTest::Wildcard,
                    }
                } else {
                    NameTest::Wildcard
                };
                KindTest::Kind(NodeKind::Document, name_test)
            }
            "element" => {
                let name_test = self.kind_test_name_argument(NodeKind::Element)?;
                KindTest::Kind(NodeKind::Element, name_test)
            }
            "attribute" => {
                let name_test = self.kind_test_name_argument(NodeKind::Attribute)?;
                KindTest::Kind(NodeKind::Attribute, name_test)
            }
            "schema-element" | "schema-attribute" => {
                return Err(ParserError::Unsupported {
                    construct: format!("{}()", local),
                    span,
                })
            }
            other => {
                return Err(ParserError::Expected {
                    expected: format!("kind test, not {:?}", other),
                    span,
                })
            }
        };
        self.expect(TokenKind::RightParen, ")")?;
        Ok(test)
    }

    fn kind_test_name_argument(&mut self, kind: NodeKind) -> Result<NameTest, ParserError> {
        let name_test = match self.peek().cloned() {
            Some(TokenKind::Star) => {
                self.bump();
                NameTest::Wildcard
            }
            Some(TokenKind::Name { prefix, local }) => {
                let span = self.current_span();
                self.bump();
                let name = if kind == NodeKind::Attribute && prefix.is_none() {
                    Name::unprefixed(&local)
                } else {
                    self.element_name(prefix.as_deref(), &local, span)?
                };
                NameTest::Name(name)
            }
            _ => NameTest::Wildcard,
        };
        // a type annotation argument would be schema-aware; skip support
        if self.peek() == Some(&TokenKind::Comma) {
            return Err(ParserError::Unsupported {
                construct: "type annotation in kind test".to_string(),
                span: self.current_span(),
            });
        }
        Ok(name_test)
    }

    fn function_call(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        let (prefix, local, name_span) = match self.bump() {
            Some(Token {
                kind: TokenKind::Name { prefix, local },
                span,
            }) => (prefix, local, span),
            _ => return Err(self.expected("function name")),
        };
        if prefix.is_none() && RESERVED_FUNCTION_NAMES.contains(&local.as_str()) {
            return Err(ParserError::ReservedFunctionName {
                name: local,
                span: name_span,
            });
        }
        let name = self.function_name(prefix.as_deref(), &local, name_span)?;
        self.expect(TokenKind::LeftParen, "(")?;
        let mut args = Vec::new();
        if self.peek() != Some(&TokenKind::RightParen) {
            args.push(self.expr_single()?);
            while self.peek() == Some(&TokenKind::Comma) {
                self.bump();
                args.push(self.expr_single()?);
            }
        }
        self.expect(TokenKind::RightParen, ")")?;
        let span = start.covering(self.previous_span());
        Ok(ExprS::new(Expr::FunctionCall { name, args }, span))
    }

    fn primary_expr(&mut self) -> Result<ExprS, ParserError> {
        let start = self.current_span();
        match self.peek().cloned() {
            Some(TokenKind::Integer(text)) => {
                self.bump();
                Ok(ExprS::new(Expr::Literal(Literal::Integer(text)), start))
            }
            Some(TokenKind::Decimal(text)) => {
                self.bump();
                Ok(ExprS::new(Expr::Literal(Literal::Decimal(text)), start))
            }
            Some(TokenKind::Double(value)) => {
                self.bump();
                Ok(ExprS::new(Expr::Literal(Literal::Double(value)), start))
            }
            Some(TokenKind::StringLit(value)) => {
                self.bump();
                Ok(ExprS::new(Expr::Literal(Literal::String(value)), start))
            }
            Some(TokenKind::Dollar) => {
                let name = self.variable_name()?;
                let span = start.covering(self.previous_span());
                Ok(ExprS::new(Expr::VarRef(name), span))
            }
            Some(TokenKind::Dot) => {
                self.bump();
                Ok(ExprS::new(Expr::ContextItem, start))
            }
            Some(TokenKind::LeftParen) => {
                self.bump();
                if self.peek() == Some(&TokenKind::RightParen) {
                    self.bump();
                    let span = start.covering(self.previous_span());
                    return Ok(ExprS::new(Expr::Sequence(Vec::new()), span));
                }
                let inner = self.expr()?;
                self.expect(TokenKind::RightParen, ")")?;
                Ok(inner)
            }
            _ => Err(self.expected("expression")),
        }
    }

    // ---- types ----

    fn sequence_type(&mut self) -> Result<SequenceType, ParserError> {
        if self.at_keyword("empty-sequence") && self.peek_at(1) == Some(&TokenKind::LeftParen) {
            self.bump();
            self.bump();
            self.expect(TokenKind::RightParen, ")")?;
            return Ok(SequenceType::Empty);
        }
        let item_type = self.item_type()?;
        let occurrence = match self.peek() {
            Some(TokenKind::Question) => {
                self.bump();
                Occurrence::Option
            }
            Some(TokenKind::Star) => {
                self.bump();
                Occurrence::Many
            }
            Some(TokenKind::Plus) => {
                self.bump();
                Occurrence::NonEmpty
            }
            _ => Occurrence::One,
        };
        Ok(SequenceType::Item(item_type, occurrence))
    }

    fn item_type(&mut self) -> Result<ItemType, ParserError> {
        if self.at_keyword("item") && self.peek_at(1) == Some(&TokenKind::LeftParen) {
            self.bump();
            self.bump();
            self.expect(TokenKind::RightParen, ")")?;
            return Ok(ItemType::Item);
        }
        match self.peek().cloned() {
            Some(TokenKind::Name { prefix: None, local })
                if is_kind_test_name(&local) && self.peek_at(1) == Some(&TokenKind::LeftParen) =>
            {
                Ok(ItemType::Node(self.kind_test()?))
            }
            Some(TokenKind::Name { prefix, local }) => {
                let span = self.current_span();
                self.bump();
                let xs = self.type_name(prefix.as_deref(), &local, span)?;
                Ok(ItemType::Atomic(xs))
            }
            _ => Err(self.expected("item type")),
        }
    }

    fn single_type(&mut self) -> Result<SingleType, ParserError> {
        let (prefix, local, span) = match self.bump() {
            Some(Token {
                kind: TokenKind::Name { prefix, local },
                span,
            }) => (prefix, local, span),
            _ => return Err(self.expected("atomic type name")),
        };
        let atomic = self.type_name(prefix.as_deref(), &local, span)?;
        let optional = if self.peek() == Some(&TokenKind::Question) {
            self.bump();
            true
        } else {
            false
        };
        Ok(SingleType { atomic, optional })
    }
}

fn axis_by_name(name: &str) -> Option<Axis> {
    let axis = match name {
        "child" => Axis::Child,
        "descendant" => Axis::Descendant,
        "attribute" => Axis::Attribute,
        "self" => Axis::SelfAxis,
        "descendant-or-self" => Axis::DescendantOrSelf,
        "following-sibling" => Axis::FollowingSibling,
        "following" => Axis::Following,
        "namespace" => Axis::Namespace,
        "parent" => Axis::Parent,
        "ancestor" => Axis::Ancestor,
        "preceding-sibling" => Axis::PrecedingSibling,
        "preceding" => Axis::Preceding,
        "ancestor-or-self" => Axis::AncestorOrSelf,
        _ => return None,
    };
    Some(axis)
}

fn is_kind_test_name(name: &str) -> bool {
    matches!(
        name,
        "node"
            | "text"
            | "comment"
            | "processing-instruction"
            | "document-node"
            | "element"
            | "attribute"
            | "schema-element"
            | "schema-attribute"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ExprS {
        let context = ParserContext::default();
        Parser::parse(source, &context, ParseMode::XPath).unwrap()
    }

    fn parse_xquery(source: &str) -> ExprS {
        let context = ParserContext::default();
        Parser::parse(source, &context, ParseMode::XQuery).unwrap()
    }

    #[test]
    fn test_arithmetic_precedence() {
        let expr = parse("1 + 2 * 3");
        match expr.expr {
            Expr::Arith {
                op: ArithOp::Add,
                right,
                ..
            } => {
                assert!(matches!(
                    right.expr,
                    Expr::Arith {
                        op: ArithOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_path_with_predicate() {
        let expr = parse("/doc/item[1]");
        match expr.expr {
            Expr::PathStep { right, .. } => {
                assert!(matches!(right.expr, Expr::Filter { .. }));
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_double_slash_inserts_descendant_step() {
        let expr = parse("//item");
        // Root / descendant-or-self::node() / child::item
        match expr.expr {
            Expr::PathStep { left, right } => {
                assert!(matches!(
                    right.expr,
                    Expr::AxisStep {
                        axis: Axis::Child,
                        ..
                    }
                ));
                assert!(matches!(
                    left.expr,
                    Expr::PathStep { .. }
                ));
            }
            other => panic!("expected path, got {:?}", other),
        }
    }

    #[test]
    fn test_for_return() {
        let expr = parse("for $x in 1 to 3 return $x * 2");
        match expr.expr {
            Expr::For {
                bindings,
                order_by,
                ..
            } => {
                assert_eq!(bindings.len(), 1);
                assert_eq!(bindings[0].name.local_name(), "x");
                assert!(order_by.is_empty());
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_order_by_requires_xquery_mode() {
        let context = ParserContext::default();
        assert!(
            Parser::parse(
                "for $x in (3, 1) order by $x return $x",
                &context,
                ParseMode::XPath
            )
            .is_err()
        );
        let expr = parse_xquery("for $x in (3, 1) order by $x descending empty greatest return $x");
        match expr.expr {
            Expr::For { order_by, .. } => {
                assert_eq!(order_by.len(), 1);
                assert_eq!(order_by[0].order, SortOrder::Descending);
                assert_eq!(order_by[0].empty_order, Some(EmptyOrder::Greatest));
            }
            other => panic!("expected for, got {:?}", other),
        }
    }

    #[test]
    fn test_instance_of() {
        let expr = parse("5 instance of xs:integer+");
        match expr.expr {
            Expr::InstanceOf { sequence_type, .. } => {
                assert_eq!(
                    sequence_type,
                    SequenceType::Item(ItemType::Atomic(Xs::Integer), Occurrence::NonEmpty)
                );
            }
            other => panic!("expected instance of, got {:?}", other),
        }
    }

    #[test]
    fn test_cast_with_question() {
        let expr = parse("$x cast as xs:double?");
        match expr.expr {
            Expr::CastAs { single_type, .. } => {
                assert_eq!(
                    single_type,
                    SingleType {
                        atomic: Xs::Double,
                        optional: true
                    }
                );
            }
            other => panic!("expected cast, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_function_name_rejected() {
        let context = ParserContext::default();
        assert!(matches!(
            Parser::parse("if(1)", &context, ParseMode::XPath),
            Err(ParserError::Expected { .. })
        ));
    }

    #[test]
    fn test_unknown_prefix() {
        let context = ParserContext::default();
        assert!(matches!(
            Parser::parse("unknown:f()", &context, ParseMode::XPath),
            Err(ParserError::UnknownPrefix { .. })
        ));
    }

    #[test]
    fn test_quantified() {
        let expr = parse("some $x in (1, 2, 3) satisfies $x > 2");
        assert!(matches!(
            expr.expr,
            Expr::Quantified {
                quantifier: Quantifier::Some,
                ..
            }
        ));
    }

    #[test]
    fn test_axis_step() {
        let expr = parse("ancestor-or-self::*");
        assert!(matches!(
            expr.expr,
            Expr::AxisStep {
                axis: Axis::AncestorOrSelf,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_sequence_literal() {
        let expr = parse("()");
        assert!(matches!(expr.expr, Expr::Sequence(items) if items.is_empty()));
    }

    #[test]
    fn test_general_vs_value_comparison() {
        assert!(matches!(
            parse("1 = 2").expr,
            Expr::GeneralComp { op: CompOp::Eq, .. }
        ));
        assert!(matches!(
            parse("1 eq 2").expr,
            Expr::ValueComp { op: CompOp::Eq, .. }
        ));
        assert!(matches!(
            parse("$a is $b").expr,
            Expr::NodeComp {
                op: NodeCompOp::Is,
                ..
            }
        ));
    }
}

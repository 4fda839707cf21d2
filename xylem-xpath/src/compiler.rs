use std::rc::Rc;

use xylem_ast::{ParseMode, Parser, ParserContext};
use xylem_engine::error::{Error, LocatedResult};
use xylem_engine::expr::{self, ExprRef};
use xylem_engine::StaticContext;

use crate::selector::Selector;

/// Compiles source text against a static context.
pub struct Compiler {
    static_context: Rc<StaticContext>,
}

impl Compiler {
    pub fn new(static_context: StaticContext) -> Self {
        Compiler {
            static_context: Rc::new(static_context),
        }
    }

    /// The static context this compiler compiles against.
    pub fn static_context(&self) -> &StaticContext {
        &self.static_context
    }

    /// Compile an XPath 2.0 expression.
    pub fn compile_xpath(&self, source: &str) -> LocatedResult<Executable> {
        self.compile_expression(source, ParseMode::XPath)
    }

    /// Compile an XQuery expression: XPath 2.0 plus the FLWOR
    /// `where`/`order by` clauses.
    pub fn compile_xquery(&self, source: &str) -> LocatedResult<Executable> {
        self.compile_expression(source, ParseMode::XQuery)
    }

    /// Compile a compact stylesheet.
    pub fn compile_xslt(&self, source: &str) -> LocatedResult<Executable> {
        let expr = xylem_engine::xslt::compile_stylesheet(source, &self.static_context)
            .map_err(xylem_engine::LocatedError::from)?;
        Ok(Executable {
            expr,
            static_context: self.static_context.clone(),
        })
    }

    fn compile_expression(
        &self,
        source: &str,
        mode: ParseMode,
    ) -> LocatedResult<Executable> {
        let parser_context = ParserContext {
            namespaces: self.static_context.namespaces().clone(),
        };
        let parsed = Parser::parse(source, &parser_context, mode)
            .map_err(|e| xylem_engine::LocatedError::from(Error::from(e)))?;
        let expr = expr::compile(&parsed, &self.static_context)
            .map_err(xylem_engine::LocatedError::from)?;
        Ok(Executable {
            expr,
            static_context: self.static_context.clone(),
        })
    }
}

/// A compiled, immutable expression, shareable across evaluations.
#[derive(Debug)]
pub struct Executable {
    pub(crate) expr: ExprRef,
    pub(crate) static_context: Rc<StaticContext>,
}

impl Executable {
    /// Load the executable, producing a selector holding the dynamic
    /// state of one evaluation.
    pub fn load(&self) -> Selector {
        Selector::new(self.expr.clone(), self.static_context.clone())
    }

    /// A structural dump of the compiled tree.
    pub fn display(&self) -> String {
        self.expr.display(0)
    }
}

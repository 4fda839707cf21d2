//! Translation of a compact stylesheet subset into the expression
//! algebra.
//!
//! The subset covers the instructions that exercise the runtime: a single
//! `xsl:template match="/"`, `xsl:for-each` with `xsl:sort`,
//! `xsl:for-each-group` with the four `group-*` attributes,
//! `xsl:value-of`, `xsl:sequence`, and `xsl:if`. Literal result elements
//! and the full template rule machinery belong to layers above this
//! crate.

use std::rc::Rc;

use xot::Xot;

use xylem_ast::{ast, ParseMode, Parser, ParserContext};
use xylem_name::XSLT_NAMESPACE;

use crate::context::StaticContext;
use crate::error;
use crate::expr::{BuiltinFunction, Expr, ExprRef, GroupVariant, SortKeyDef};
use crate::sequence::Sequence;
use crate::sort::DataTypeForce;

/// Compile a stylesheet into an expression over the initial context node.
pub fn compile_stylesheet(
    source: &str,
    static_context: &StaticContext,
) -> error::Result<ExprRef> {
    let mut xot = Xot::new();
    let document = xot.parse(source).map_err(|_| error::Error::XTSE0010)?;
    let translator = Translator {
        xot: &xot,
        static_context,
    };
    let body = translator.stylesheet(document)?;
    crate::expr::run_passes(&body, static_context)
}

struct Translator<'a> {
    xot: &'a Xot,
    static_context: &'a StaticContext,
}

impl<'a> Translator<'a> {
    fn stylesheet(&self, document: xot::Node) -> error::Result<ExprRef> {
        let root = self
            .xot
            .document_element(document)
            .map_err(|_| error::Error::XTSE0010)?;
        let root_name = self.xsl_local(root);
        if !matches!(root_name.as_deref(), Some("stylesheet" | "transform")) {
            return Err(error::Error::XTSE0010);
        }
        // the subset: one template matching the document root
        for child in self.xot.children(root) {
            if self.xsl_local(child).as_deref() == Some("template") {
                let matches_root = self
                    .attribute(child, "match")
                    .map(|value| value.trim() == "/")
                    .unwrap_or(false);
                if matches_root {
                    return self.sequence_constructor(child);
                }
            }
        }
        Err(error::Error::XTSE0010)
    }

    // the local name of an element in the XSLT namespace
    fn xsl_local(&self, node: xot::Node) -> Option<String> {
        if !self.xot.is_element(node) {
            return None;
        }
        let name = crate::xml::node_name(self.xot, node)?;
        if name.namespace() == Some(XSLT_NAMESPACE) {
            Some(name.local_name().to_string())
        } else {
            None
        }
    }

    fn attribute(&self, node: xot::Node, name: &str) -> Option<String> {
        let name_id = self.xot.name(name)?;
        self.xot
            .attributes(node)
            .get(name_id)
            .map(|value| value.to_string())
    }

    fn required_attribute(&self, node: xot::Node, name: &str) -> error::Result<String> {
        self.attribute(node, name).ok_or(error::Error::XTSE0010)
    }

    fn parse_expression(&self, source: &str) -> error::Result<ExprRef> {
        let context = ParserContext {
            namespaces: self.static_context.namespaces().clone(),
        };
        let parsed = Parser::parse(source, &context, ParseMode::XPath)
            .map_err(error::Error::from)?;
        crate::expr::lower_ast(&parsed)
    }

    // the children of an instruction, as a sequence constructor
    fn sequence_constructor(&self, node: xot::Node) -> error::Result<ExprRef> {
        let mut parts = Vec::new();
        for child in self.xot.children(node) {
            if let Some(part) = self.construct(child)? {
                parts.push(part);
            }
        }
        Ok(match parts.len() {
            0 => Rc::new(Expr::Literal(Sequence::Empty)),
            1 => parts.remove(0),
            _ => Rc::new(Expr::Append(parts)),
        })
    }

    fn construct(&self, node: xot::Node) -> error::Result<Option<ExprRef>> {
        if self.xot.is_text(node) {
            let text = self.xot.string_value(node);
            if text.trim().is_empty() {
                return Ok(None);
            }
            return Ok(Some(Rc::new(Expr::Literal(Sequence::from(
                crate::atomic::Atomic::from(text),
            )))));
        }
        if self.xot.is_comment(node) {
            return Ok(None);
        }
        let local = match self.xsl_local(node) {
            Some(local) => local,
            // literal result elements are outside the subset
            None => return Err(error::Error::Unsupported),
        };
        let expr = match local.as_str() {
            "value-of" => {
                let select = self.parse_expression(&self.required_attribute(node, "select")?)?;
                let separator = self
                    .attribute(node, "separator")
                    .unwrap_or_else(|| " ".to_string());
                Rc::new(Expr::FunctionCall {
                    function: BuiltinFunction::StringJoin,
                    args: vec![
                        select,
                        Rc::new(Expr::Literal(Sequence::from(
                            crate::atomic::Atomic::from(separator),
                        ))),
                    ],
                })
            }
            "sequence" => self.parse_expression(&self.required_attribute(node, "select")?)?,
            "if" => {
                let condition = self.parse_expression(&self.required_attribute(node, "test")?)?;
                Rc::new(Expr::If {
                    condition,
                    then_branch: self.sequence_constructor(node)?,
                    else_branch: Rc::new(Expr::Literal(Sequence::Empty)),
                })
            }
            "for-each" => {
                let select = self.parse_expression(&self.required_attribute(node, "select")?)?;
                let select = self.apply_sorts(node, select)?;
                Rc::new(Expr::ForEach {
                    select,
                    body: self.sequence_constructor(node)?,
                })
            }
            "for-each-group" => {
                let population =
                    self.parse_expression(&self.required_attribute(node, "select")?)?;
                let variant = self.group_variant(node)?;
                Rc::new(Expr::Group {
                    population,
                    variant,
                    body: self.sequence_constructor(node)?,
                })
            }
            "sort" => {
                // handled by the enclosing instruction
                return Ok(None);
            }
            _ => return Err(error::Error::XTSE0010),
        };
        Ok(Some(expr))
    }

    fn group_variant(&self, node: xot::Node) -> error::Result<GroupVariant> {
        if let Some(key) = self.attribute(node, "group-by") {
            return Ok(GroupVariant::By(self.parse_expression(&key)?));
        }
        if let Some(key) = self.attribute(node, "group-adjacent") {
            return Ok(GroupVariant::Adjacent(self.parse_expression(&key)?));
        }
        if let Some(pattern) = self.attribute(node, "group-starting-with") {
            return Ok(GroupVariant::StartingWith(self.parse_pattern(&pattern)?));
        }
        if let Some(pattern) = self.attribute(node, "group-ending-with") {
            return Ok(GroupVariant::EndingWith(self.parse_pattern(&pattern)?));
        }
        Err(error::Error::XTSE0010)
    }

    // a match pattern, reduced to a self-axis test of the candidate item
    fn parse_pattern(&self, pattern: &str) -> error::Result<ExprRef> {
        self.parse_expression(&format!("self::{}", pattern.trim()))
    }

    fn apply_sorts(&self, node: xot::Node, select: ExprRef) -> error::Result<ExprRef> {
        let mut keys = Vec::new();
        for child in self.xot.children(node) {
            if self.xsl_local(child).as_deref() != Some("sort") {
                continue;
            }
            let key = match self.attribute(child, "select") {
                Some(select) => self.parse_expression(&select)?,
                None => Rc::new(Expr::ContextItem),
            };
            let order = match self.attribute(child, "order").as_deref() {
                None | Some("ascending") => ast::SortOrder::Ascending,
                Some("descending") => ast::SortOrder::Descending,
                Some(_) => return Err(error::Error::XTSE0010),
            };
            let data_type = match self.attribute(child, "data-type") {
                None => DataTypeForce::Default,
                Some(value) => DataTypeForce::parse(&value)?,
            };
            let collation_uri = self.sort_collation(child)?;
            keys.push(SortKeyDef {
                key,
                order,
                empty_order: None,
                data_type,
                collation_uri,
            });
        }
        if keys.is_empty() {
            return Ok(select);
        }
        Ok(Rc::new(Expr::Sort {
            select,
            bind_var: None,
            keys,
        }))
    }

    // an explicit collation wins; otherwise lang and case-order compose a
    // collation URI
    fn sort_collation(&self, node: xot::Node) -> error::Result<Option<String>> {
        if let Some(uri) = self.attribute(node, "collation") {
            return Ok(Some(uri));
        }
        let mut query = Vec::new();
        if let Some(lang) = self.attribute(node, "lang") {
            query.push(format!("lang={}", lang));
        }
        if let Some(case_order) = self.attribute(node, "case-order") {
            if !matches!(case_order.as_str(), "upper-first" | "lower-first") {
                return Err(error::Error::XTSE0010);
            }
            query.push(format!("case-order={}", case_order));
        }
        if query.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!(
            "http://xylem-xml.org/collation?{}",
            query.join(";")
        )))
    }
}

/**
 * Binding Expression Code Generator
 *
 * Turns a parsed binding into its compiled text form, applying the configured
 * filter and variable rewriting rules
 */
use super::ast::*;
use super::parser::{Parser, PropertyPath};
use crate::chars;
use crate::config::{ParserConfig, VariableProviderConfig};
use crate::error::{ConfigError, ParseResult};
use crate::expression::value::format_number;
use crate::expression::{Expression, FilterApplication};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FILTER_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%(value|filter|args)").expect("valid placeholder pattern"));

/// Expression parser: source text in, compiled text or [`Expression`] out
#[derive(Debug, Clone)]
pub struct ExpressionParser {
    parser: Parser,
    config: ParserConfig,
    exclude: Option<Regex>,
}

impl ExpressionParser {
    pub fn new(config: ParserConfig) -> Result<Self, ConfigError> {
        let exclude = match config
            .variable_provider
            .as_ref()
            .and_then(|v| v.exclude.as_deref())
        {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?),
            None => None,
        };

        Ok(ExpressionParser {
            parser: Parser::new(),
            config,
            exclude,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `source` and return its compiled text
    pub fn parse(&self, source: &str) -> ParseResult<String> {
        let ast = self.parser.parse_binding(source)?;
        Ok(self.generate(&ast))
    }

    /// Parse `source` into an evaluable expression
    pub fn compile(&self, source: &str) -> ParseResult<Expression> {
        let ast = self.parser.parse_binding(source)?;
        Ok(self.build(source, ast))
    }

    /// Compile text containing `{{ }}` interpolations; `None` for plain text
    pub fn compile_interpolation(&self, text: &str) -> ParseResult<Option<Expression>> {
        Ok(self
            .parser
            .parse_interpolation(text)?
            .map(|interpolation| self.build(text, Ast::Interpolation(interpolation))))
    }

    pub fn parse_property_path(&self, path: &str) -> ParseResult<PropertyPath> {
        self.parser.parse_property_path(path)
    }

    /// Compiled text of an already parsed binding
    pub fn generate(&self, ast: &Ast) -> String {
        let mut generator = CodeGenerator {
            filter_provider: self.config.filter_provider.as_deref(),
            variables: self.config.variable_provider.as_ref(),
            exclude: self.exclude.as_ref(),
            hoisted: IndexMap::new(),
        };
        let body = ast.visit(&mut generator);
        let prelude = generator.prelude();

        if self.config.auto_wrap {
            format!("{}return {};", prelude, body)
        } else {
            format!("{}{}", prelude, body)
        }
    }

    fn build(&self, source: &str, ast: Ast) -> Expression {
        let mut filters = Vec::new();
        walk_ast_post_order(&ast, &mut |node| {
            if let Ast::BindingPipe(pipe) = node {
                filters.push(FilterApplication {
                    name: pipe.name.clone(),
                    args: pipe.args.iter().map(normalize).collect(),
                });
            }
        });
        let normalized = self.generate(&ast);
        Expression::new(source, normalized, filters, ast)
    }
}

/// Normalized text of a node with no rewriting rules applied
pub fn normalize(ast: &Ast) -> String {
    let mut generator = CodeGenerator {
        filter_provider: None,
        variables: None,
        exclude: None,
        hoisted: IndexMap::new(),
    };
    ast.visit(&mut generator)
}

struct CodeGenerator<'a> {
    filter_provider: Option<&'a str>,
    variables: Option<&'a VariableProviderConfig>,
    exclude: Option<&'a Regex>,
    /// root identifier -> alias, in first-occurrence order
    hoisted: IndexMap<String, String>,
}

impl CodeGenerator<'_> {
    fn prelude(&self) -> String {
        let Some(variables) = self.variables else {
            return String::new();
        };
        if self.hoisted.is_empty() {
            return String::new();
        }
        let declarations: Vec<String> = self
            .hoisted
            .iter()
            .map(|(name, alias)| format!("{}={}", alias, variables.template.replace("%name", name)))
            .collect();
        format!("var {};", declarations.join(","))
    }

    fn list(&mut self, items: &[Ast]) -> String {
        items
            .iter()
            .map(|item| item.visit(self))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Appends an operand to an operator, keeping `- -a` from becoming `--a`
fn join_operand(operator: &str, operand: &str) -> String {
    let clash = matches!(
        (operator.chars().last(), operand.chars().next()),
        (Some(chars::MINUS), Some(chars::MINUS)) | (Some(chars::PLUS), Some(chars::PLUS))
    );
    if clash {
        format!("{} {}", operator, operand)
    } else {
        format!("{}{}", operator, operand)
    }
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

impl AstVisitor for CodeGenerator<'_> {
    type Result = String;

    fn visit_literal_primitive(&mut self, ast: &LiteralPrimitive) -> String {
        match &ast.value {
            LiteralValue::Null => "null".to_string(),
            LiteralValue::Undefined => "undefined".to_string(),
            LiteralValue::Boolean(value) => value.to_string(),
            LiteralValue::Number(value) => format_number(*value),
            LiteralValue::String(value) => quote(value),
        }
    }

    fn visit_variable_read(&mut self, ast: &VariableRead) -> String {
        let Some(variables) = self.variables else {
            return ast.name.clone();
        };
        if self.exclude.map_or(false, |re| re.is_match(&ast.name)) {
            return ast.name.clone();
        }
        if !variables.hoist {
            return variables.template.replace("%name", &ast.name);
        }
        let next = format!("__{}", self.hoisted.len());
        self.hoisted.entry(ast.name.clone()).or_insert(next).clone()
    }

    fn visit_property_read(&mut self, ast: &PropertyRead) -> String {
        format!("{}.{}", ast.receiver.visit(self), ast.name)
    }

    fn visit_keyed_read(&mut self, ast: &KeyedRead) -> String {
        let receiver = ast.receiver.visit(self);
        format!("{}[{}]", receiver, ast.key.visit(self))
    }

    fn visit_call(&mut self, ast: &Call) -> String {
        let receiver = ast.receiver.visit(self);
        format!("{}({})", receiver, self.list(&ast.args))
    }

    fn visit_prefix_not(&mut self, ast: &PrefixNot) -> String {
        format!("!{}", ast.expression.visit(self))
    }

    fn visit_unary(&mut self, ast: &Unary) -> String {
        join_operand(ast.operator.as_str(), &ast.expr.visit(self))
    }

    fn visit_binary(&mut self, ast: &Binary) -> String {
        let left = ast.left.visit(self);
        let right = ast.right.visit(self);
        format!("{}{}", left, join_operand(ast.operation.as_str(), &right))
    }

    fn visit_conditional(&mut self, ast: &Conditional) -> String {
        let condition = ast.condition.visit(self);
        let true_exp = ast.true_exp.visit(self);
        format!("{}?{}:{}", condition, true_exp, ast.false_exp.visit(self))
    }

    fn visit_literal_array(&mut self, ast: &LiteralArray) -> String {
        format!("[{}]", self.list(&ast.expressions))
    }

    fn visit_literal_map(&mut self, ast: &LiteralMap) -> String {
        let pairs: Vec<String> = ast
            .keys
            .iter()
            .zip(ast.values.iter())
            .map(|(key, value)| {
                let key = if chars::is_identifier(&key.key) {
                    key.key.clone()
                } else {
                    quote(&key.key)
                };
                format!("{}:{}", key, value.visit(self))
            })
            .collect();
        format!("{{{}}}", pairs.join(","))
    }

    fn visit_pipe(&mut self, ast: &BindingPipe) -> String {
        let value = ast.exp.visit(self);
        let args = self.list(&ast.args);

        match self.filter_provider {
            Some(template) => FILTER_PLACEHOLDER
                .replace_all(template, |caps: &Captures| match &caps[1] {
                    "value" => value.clone(),
                    "filter" => ast.name.clone(),
                    _ => args.clone(),
                })
                .into_owned(),
            None if args.is_empty() => format!("{}({})", ast.name, value),
            None => format!("{}({},{})", ast.name, value, args),
        }
    }

    fn visit_parenthesized(&mut self, ast: &ParenthesizedExpression) -> String {
        format!("({})", ast.expression.visit(self))
    }

    fn visit_interpolation(&mut self, ast: &Interpolation) -> String {
        let mut parts = Vec::new();
        for (i, text) in ast.strings.iter().enumerate() {
            if !text.is_empty() {
                parts.push(quote(text));
            }
            if let Some(expression) = ast.expressions.get(i) {
                parts.push(format!("({})", expression.visit(self)));
            }
        }
        if parts.is_empty() {
            return quote("");
        }
        parts.join("+")
    }
}

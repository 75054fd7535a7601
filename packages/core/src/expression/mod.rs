//! Compiled binding expressions and the contexts they evaluate against

pub mod eval;
pub mod value;

pub use eval::Evaluator;
pub use value::{Callable, Value};

use crate::error::{EvalError, EvalResult};
use crate::expression_parser::Ast;
use indexmap::IndexMap;

/// Environment an expression is evaluated in
pub trait EvalContext {
    /// Resolve a free variable; `None` evaluates as `undefined`
    fn lookup(&self, name: &str) -> Option<Value>;

    /// Apply the filter registered under `name`
    fn apply_filter(&self, name: &str, input: Value, args: &[Value]) -> EvalResult<Value>;
}

/// One `| name : arg ...` step of an expression
#[derive(Debug, Clone, PartialEq)]
pub struct FilterApplication {
    pub name: String,
    /// Arguments in normalized form
    pub args: Vec<String>,
}

/// Immutable compiled binding
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub source: String,
    pub normalized: String,
    /// Filter applications, innermost first
    pub filters: Vec<FilterApplication>,
    pub ast: Ast,
}

impl Expression {
    pub fn new(
        source: impl Into<String>,
        normalized: impl Into<String>,
        filters: Vec<FilterApplication>,
        ast: Ast,
    ) -> Self {
        Expression {
            source: source.into(),
            normalized: normalized.into(),
            filters,
            ast,
        }
    }

    pub fn evaluate(&self, context: &dyn EvalContext) -> EvalResult<Value> {
        Evaluator::new(context).evaluate(&self.ast)
    }
}

/// Call-time locals (such as `$event`) layered over another context
pub struct Locals<'a> {
    values: IndexMap<String, Value>,
    parent: &'a dyn EvalContext,
}

impl<'a> Locals<'a> {
    pub fn new(parent: &'a dyn EvalContext) -> Self {
        Locals {
            values: IndexMap::new(),
            parent,
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }
}

impl EvalContext for Locals<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        match self.values.get(name) {
            Some(value) => Some(value.clone()),
            None => self.parent.lookup(name),
        }
    }

    fn apply_filter(&self, name: &str, input: Value, args: &[Value]) -> EvalResult<Value> {
        self.parent.apply_filter(name, input, args)
    }
}

/// A context with nothing in it, handy for constant expressions
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContext;

impl EvalContext for EmptyContext {
    fn lookup(&self, _name: &str) -> Option<Value> {
        None
    }

    fn apply_filter(&self, name: &str, _input: Value, _args: &[Value]) -> EvalResult<Value> {
        Err(EvalError::UnknownFilter {
            name: name.to_string(),
        })
    }
}

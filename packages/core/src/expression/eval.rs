//! Tree-walking evaluator over the restricted binding AST

use super::value::Value;
use super::EvalContext;
use crate::error::{EvalError, EvalResult};
use crate::expression_parser::ast::*;
use crate::expression_parser::normalize;
use indexmap::IndexMap;
use std::cmp::Ordering;

/// Evaluates one AST against a context. Free variables only resolve through
/// [`EvalContext::lookup`]; the only callables are `Value::Function`s.
pub struct Evaluator<'a> {
    context: &'a dyn EvalContext,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a dyn EvalContext) -> Self {
        Evaluator { context }
    }

    pub fn evaluate(&mut self, ast: &Ast) -> EvalResult<Value> {
        ast.visit(self)
    }

    fn list(&mut self, items: &[Ast]) -> EvalResult<Vec<Value>> {
        items.iter().map(|item| item.visit(self)).collect()
    }
}

fn invalid_operand(operation: BinaryOperator, left: &Value, right: &Value) -> EvalError {
    EvalError::InvalidOperand {
        operator: operation.as_str().to_string(),
        details: format!("{} and {}", left.type_name(), right.type_name()),
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

fn apply_binary(operation: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    let arithmetic = matches!(
        operation,
        BinaryOperator::Add
            | BinaryOperator::Subtract
            | BinaryOperator::Multiply
            | BinaryOperator::Divide
            | BinaryOperator::Modulo
    );
    if arithmetic && (matches!(left, Value::Function(_)) || matches!(right, Value::Function(_))) {
        return Err(invalid_operand(operation, &left, &right));
    }

    let number = |f: fn(f64, f64) -> f64| Value::Number(f(left.to_number(), right.to_number()));
    let ordering = compare(&left, &right);

    Ok(match operation {
        BinaryOperator::Add => {
            let concatenates =
                |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
            if concatenates(&left) || concatenates(&right) {
                let mut text = left.to_display_string();
                text.push_str(&right.to_display_string());
                Value::from(text)
            } else {
                number(|a, b| a + b)
            }
        }
        BinaryOperator::Subtract => number(|a, b| a - b),
        BinaryOperator::Multiply => number(|a, b| a * b),
        BinaryOperator::Divide => number(|a, b| a / b),
        BinaryOperator::Modulo => number(|a, b| a % b),
        BinaryOperator::Equal => Value::Bool(left.loose_equals(&right)),
        BinaryOperator::NotEqual => Value::Bool(!left.loose_equals(&right)),
        BinaryOperator::StrictEqual => Value::Bool(left.strict_equals(&right)),
        BinaryOperator::StrictNotEqual => Value::Bool(!left.strict_equals(&right)),
        BinaryOperator::Less => Value::Bool(ordering == Some(Ordering::Less)),
        BinaryOperator::Greater => Value::Bool(ordering == Some(Ordering::Greater)),
        BinaryOperator::LessEqual => Value::Bool(matches!(
            ordering,
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOperator::GreaterEqual => Value::Bool(matches!(
            ordering,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        // Short-circuited in `visit_binary`
        BinaryOperator::And | BinaryOperator::Or => {
            unreachable!("logical operators never reach apply_binary")
        }
    })
}

impl AstVisitor for Evaluator<'_> {
    type Result = EvalResult<Value>;

    fn visit_literal_primitive(&mut self, ast: &LiteralPrimitive) -> EvalResult<Value> {
        Ok(match &ast.value {
            LiteralValue::Null => Value::Null,
            LiteralValue::Undefined => Value::Undefined,
            LiteralValue::Boolean(b) => Value::Bool(*b),
            LiteralValue::Number(n) => Value::Number(*n),
            LiteralValue::String(s) => Value::string(s),
        })
    }

    fn visit_variable_read(&mut self, ast: &VariableRead) -> EvalResult<Value> {
        Ok(self.context.lookup(&ast.name).unwrap_or_default())
    }

    fn visit_property_read(&mut self, ast: &PropertyRead) -> EvalResult<Value> {
        ast.receiver.visit(self)?.get_member(&ast.name)
    }

    fn visit_keyed_read(&mut self, ast: &KeyedRead) -> EvalResult<Value> {
        let receiver = ast.receiver.visit(self)?;
        let key = ast.key.visit(self)?;
        receiver.get_keyed(&key)
    }

    fn visit_call(&mut self, ast: &Call) -> EvalResult<Value> {
        let callee = ast.receiver.visit(self)?;
        let args = self.list(&ast.args)?;
        match callee {
            Value::Function(function) => function.call(&args),
            _ => Err(EvalError::NotCallable {
                callee: normalize(&ast.receiver),
            }),
        }
    }

    fn visit_prefix_not(&mut self, ast: &PrefixNot) -> EvalResult<Value> {
        Ok(Value::Bool(!ast.expression.visit(self)?.is_truthy()))
    }

    fn visit_unary(&mut self, ast: &Unary) -> EvalResult<Value> {
        let value = ast.expr.visit(self)?.to_number();
        Ok(Value::Number(match ast.operator {
            UnaryOperator::Minus => -value,
            UnaryOperator::Plus => value,
        }))
    }

    fn visit_binary(&mut self, ast: &Binary) -> EvalResult<Value> {
        let left = ast.left.visit(self)?;

        // Short-circuit operators return one of their operands
        match ast.operation {
            BinaryOperator::And => {
                return if left.is_truthy() {
                    ast.right.visit(self)
                } else {
                    Ok(left)
                };
            }
            BinaryOperator::Or => {
                return if left.is_truthy() {
                    Ok(left)
                } else {
                    ast.right.visit(self)
                };
            }
            _ => {}
        }

        let right = ast.right.visit(self)?;
        apply_binary(ast.operation, left, right)
    }

    fn visit_conditional(&mut self, ast: &Conditional) -> EvalResult<Value> {
        if ast.condition.visit(self)?.is_truthy() {
            ast.true_exp.visit(self)
        } else {
            ast.false_exp.visit(self)
        }
    }

    fn visit_literal_array(&mut self, ast: &LiteralArray) -> EvalResult<Value> {
        Ok(Value::array(self.list(&ast.expressions)?))
    }

    fn visit_literal_map(&mut self, ast: &LiteralMap) -> EvalResult<Value> {
        let mut entries = IndexMap::with_capacity(ast.keys.len());
        for (key, value) in ast.keys.iter().zip(ast.values.iter()) {
            entries.insert(key.key.clone(), value.visit(self)?);
        }
        Ok(Value::object(entries))
    }

    fn visit_pipe(&mut self, ast: &BindingPipe) -> EvalResult<Value> {
        let input = ast.exp.visit(self)?;
        let args = self.list(&ast.args)?;
        self.context.apply_filter(&ast.name, input, &args)
    }

    fn visit_parenthesized(&mut self, ast: &ParenthesizedExpression) -> EvalResult<Value> {
        ast.expression.visit(self)
    }

    fn visit_interpolation(&mut self, ast: &Interpolation) -> EvalResult<Value> {
        let mut text = String::new();
        for (i, part) in ast.strings.iter().enumerate() {
            text.push_str(part);
            if let Some(expression) = ast.expressions.get(i) {
                text.push_str(&expression.visit(self)?.render_text());
            }
        }
        Ok(Value::from(text))
    }
}

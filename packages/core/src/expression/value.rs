//! Runtime values seen by binding expressions

use crate::error::{EvalError, EvalResult};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type NativeFn = dyn Fn(&[Value]) -> EvalResult<Value>;

/// A host function exposed to expressions through a scope
#[derive(Clone)]
pub struct Callable {
    name: Rc<str>,
    func: Rc<NativeFn>,
}

impl Callable {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult<Value> + 'static,
    {
        Callable {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> EvalResult<Value> {
        (self.func)(args)
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<IndexMap<String, Value>>>),
    Function(Callable),
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(Rc::from(text))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub fn empty_object() -> Self {
        Value::object(IndexMap::new())
    }

    pub fn function<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> EvalResult<Value> + 'static,
    {
        Value::Function(Callable::new(name, func))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Identity used by change detection: primitives by value (NaN equals NaN),
    /// arrays, objects and functions by reference.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(_) | Value::Object(_) | Value::Function(_) => f64::NAN,
        }
    }

    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(Value::render_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!("function {}", f.name()),
        }
    }

    /// Text written into the DOM; nullish values render as nothing
    pub fn render_text(&self) -> String {
        if self.is_nullish() {
            String::new()
        } else {
            self.to_display_string()
        }
    }

    /// Member access (`value.name`)
    pub fn get_member(&self, name: &str) -> EvalResult<Value> {
        match self {
            Value::Undefined | Value::Null => Err(EvalError::PropertyOfNullish {
                property: name.to_string(),
                receiver: self.type_name().to_string(),
            }),
            Value::Object(entries) => Ok(entries.borrow().get(name).cloned().unwrap_or_default()),
            Value::Array(items) => {
                let items = items.borrow();
                if name == "length" {
                    return Ok(Value::Number(items.len() as f64));
                }
                Ok(index_of(name)
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default())
            }
            Value::String(s) => {
                if name == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                Ok(index_of(name)
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::string(&c.to_string()))
                    .unwrap_or_default())
            }
            _ => Ok(Value::Undefined),
        }
    }

    /// Keyed access (`value[key]`)
    pub fn get_keyed(&self, key: &Value) -> EvalResult<Value> {
        self.get_member(&key.to_display_string())
    }

    /// `==` with the usual coercions between numbers, strings and booleans
    pub fn loose_equals(&self, other: &Value) -> bool {
        if self.is_nullish() || other.is_nullish() {
            return self.is_nullish() && other.is_nullish();
        }
        match (self, other) {
            (Value::Bool(_), Value::Bool(_)) | (Value::String(_), Value::String(_)) => {
                self.strict_equals(other)
            }
            (
                Value::Number(_) | Value::String(_) | Value::Bool(_),
                Value::Number(_) | Value::String(_) | Value::Bool(_),
            ) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    /// `===`: same type and value, reference identity for containers
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_value(other),
        }
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// JSON form; functions and `undefined` become `null`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Structural equality, used by tests and literal comparisons. Change
/// detection uses [`Value::same_value`] instead.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => *a.borrow() == *b.borrow(),
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.same_value(other),
        }
    }
}

fn index_of(name: &str) -> Option<usize> {
    name.parse::<usize>().ok()
}

pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        // Exponent form always carries a sign: 1e+21, 1e-7
        let formatted = format!("{:e}", value);
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => formatted,
        }
    } else {
        value.to_string()
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(value as f64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Rc::from(value))
    }
}

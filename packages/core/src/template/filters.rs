//! Named filters applied with the `|` operator

use super::Template;
use crate::error::{EvalError, EvalResult};
use crate::expression::Value;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

type PlainFilter = dyn Fn(&Value, &[Value]) -> EvalResult<Value>;
type TemplateFilter = dyn Fn(&Template, &Value, &[Value]) -> EvalResult<Value>;

#[derive(Clone)]
enum FilterFn {
    Plain(Rc<PlainFilter>),
    /// Receives the template evaluating the expression
    WithTemplate(Rc<TemplateFilter>),
}

/// Filter body stored in a template's filter table
#[derive(Clone)]
pub struct FilterEntry {
    func: FilterFn,
}

impl FilterEntry {
    pub fn receives_template(&self) -> bool {
        matches!(self.func, FilterFn::WithTemplate(_))
    }

    pub fn apply(&self, template: &Template, input: &Value, args: &[Value]) -> EvalResult<Value> {
        match &self.func {
            FilterFn::Plain(f) => f(input, args),
            FilterFn::WithTemplate(f) => f(template, input, args),
        }
    }
}

impl fmt::Debug for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEntry")
            .field("receives_template", &self.receives_template())
            .finish()
    }
}

/// A filter declared by a component, extension or application
#[derive(Debug, Clone)]
pub struct FilterRegistration {
    pub name: String,
    pub entry: FilterEntry,
}

impl FilterRegistration {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        FilterRegistration {
            name: name.to_string(),
            entry: FilterEntry {
                func: FilterFn::Plain(Rc::new(func)),
            },
        }
    }

    pub fn with_template<F>(name: &str, func: F) -> Self
    where
        F: Fn(&Template, &Value, &[Value]) -> EvalResult<Value> + 'static,
    {
        FilterRegistration {
            name: name.to_string(),
            entry: FilterEntry {
                func: FilterFn::WithTemplate(Rc::new(func)),
            },
        }
    }
}

/// Filters every application starts with
pub fn builtin_filters() -> Vec<FilterRegistration> {
    vec![
        FilterRegistration::new("uppercase", |input, _| {
            Ok(Value::from(input.render_text().to_uppercase()))
        }),
        FilterRegistration::new("lowercase", |input, _| {
            Ok(Value::from(input.render_text().to_lowercase()))
        }),
        FilterRegistration::new("json", json_filter),
        FilterRegistration::with_template("translate", translate_filter),
    ]
}

fn json_filter(input: &Value, args: &[Value]) -> EvalResult<Value> {
    let json = input.to_json();
    let pretty = args.first().map_or(false, Value::is_truthy);
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    };
    text.map(Value::from).map_err(|e| EvalError::Filter {
        name: "json".to_string(),
        message: e.to_string(),
    })
}

/// `message | translate [: count [: params]]`
fn translate_filter(template: &Template, input: &Value, args: &[Value]) -> EvalResult<Value> {
    let count = match args.first() {
        None | Some(Value::Undefined) | Some(Value::Null) => None,
        Some(value) => {
            let n = value.to_number();
            if n.is_nan() {
                return Err(EvalError::Filter {
                    name: "translate".to_string(),
                    message: format!("count must be a number, got {}", value.type_name()),
                });
            }
            Some(n as i64)
        }
    };

    let mut params = IndexMap::new();
    if let Some(Value::Object(map)) = args.get(1) {
        for (key, value) in map.borrow().iter() {
            params.insert(key.clone(), value.render_text());
        }
    }

    Ok(Value::from(template.translate(
        &input.render_text(),
        count,
        &params,
    )))
}

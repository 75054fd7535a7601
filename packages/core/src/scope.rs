//! Hierarchical parameter store used as the evaluation environment

use crate::error::{EvalError, EvalResult};
use crate::expression::{EvalContext, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Key/value scope; lookups fall through to the parent on a miss.
///
/// A child holds only a weak reference to its parent, so the parent's lifetime
/// is decided by whoever owns it.
#[derive(Debug, Default)]
pub struct Scope {
    params: RefCell<IndexMap<String, Value>>,
    parent: Option<Weak<Scope>>,
}

impl Scope {
    pub fn new() -> Rc<Scope> {
        Rc::new(Scope::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Scope> {
        Rc::new(Scope {
            params: RefCell::new(IndexMap::new()),
            parent: Some(Rc::downgrade(parent)),
        })
    }

    pub fn parent(&self) -> Option<Rc<Scope>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.params.borrow_mut().insert(name.into(), value);
    }

    /// Lookup walking the parent chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.get_own(name) {
            return Some(value);
        }
        self.parent().and_then(|parent| parent.get(name))
    }

    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.params.borrow().get(name).cloned()
    }

    /// Whether `name` resolves anywhere on the chain
    pub fn has(&self, name: &str) -> bool {
        self.params.borrow().contains_key(name)
            || self.parent().map_or(false, |parent| parent.has(name))
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.params.borrow_mut().shift_remove(name)
    }

    pub fn keys(&self) -> Vec<String> {
        self.params.borrow().keys().cloned().collect()
    }

    pub fn clear(&self) {
        self.params.borrow_mut().clear();
    }
}

impl EvalContext for Scope {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn apply_filter(&self, name: &str, _input: Value, _args: &[Value]) -> EvalResult<Value> {
        Err(EvalError::UnknownFilter {
            name: name.to_string(),
        })
    }
}

//! Runtime side of directives: the behavior trait and what instances see

use super::Template;
use crate::dom::{Dom, DomEvent, NodeId};
use crate::error::EvalResult;
use crate::expression::Value;
use crate::metadata::DirectiveDefinition;
use crate::scope::Scope;
use indexmap::IndexMap;
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Behavior of a directive or component instance.
///
/// All hooks have empty defaults. Instances are created through
/// [`crate::di::Injector`] and live until their template is destroyed.
pub trait Directive: Any {
    /// An input changed; also called once with the initial value
    fn on_input(&mut self, _name: &str, _value: &Value, _ctx: &DirectiveContext) -> EvalResult<()> {
        Ok(())
    }

    /// A declared host listener fired; `method` names the handler
    fn on_event(
        &mut self,
        _method: &str,
        _event: &DomEvent,
        _ctx: &DirectiveContext,
    ) -> EvalResult<()> {
        Ok(())
    }

    /// Inputs are bound and host wiring is done
    fn on_init(&mut self, _ctx: &DirectiveContext) -> EvalResult<()> {
        Ok(())
    }

    fn on_destroy(&mut self, _ctx: &DirectiveContext) {}
}

/// DI service carrying the element a directive is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostElement(pub NodeId);

pub type OutputHandler = Rc<dyn Fn(&Value) -> EvalResult<()>>;

/// Subscribers of the outputs of one directive instance
#[derive(Default)]
pub struct OutputTable {
    handlers: RefCell<IndexMap<String, Vec<OutputHandler>>>,
}

impl OutputTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, output: &str, handler: OutputHandler) {
        self.handlers
            .borrow_mut()
            .entry(output.to_string())
            .or_default()
            .push(handler);
    }

    /// Returns the number of handlers that ran
    pub fn emit(&self, output: &str, value: &Value) -> EvalResult<usize> {
        let handlers = match self.handlers.borrow().get(output) {
            Some(handlers) => handlers.clone(),
            None => return Ok(0),
        };
        for handler in &handlers {
            handler(value)?;
        }
        Ok(handlers.len())
    }

    pub fn subscriber_count(&self, output: &str) -> usize {
        self.handlers.borrow().get(output).map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }
}

impl fmt::Debug for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.borrow();
        f.debug_map()
            .entries(handlers.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}

pub type DirectiveInstance = Rc<RefCell<Box<dyn Directive>>>;

/// A directive instance bound to an element
pub struct AttachedDirective {
    pub definition: Rc<DirectiveDefinition>,
    pub instance: DirectiveInstance,
    pub element: NodeId,
    pub outputs: Rc<OutputTable>,
}

impl fmt::Debug for AttachedDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedDirective")
            .field("class", &self.definition.class_name)
            .field("element", &self.element)
            .finish()
    }
}

/// What a directive sees when one of its hooks runs.
///
/// For a component, `template` is the component's own template; for a plain
/// directive it is the template the host element belongs to.
#[derive(Clone)]
pub struct DirectiveContext {
    template: Rc<Template>,
    element: NodeId,
    outputs: Rc<OutputTable>,
}

impl DirectiveContext {
    pub(crate) fn new(template: Rc<Template>, element: NodeId, outputs: Rc<OutputTable>) -> Self {
        DirectiveContext {
            template,
            element,
            outputs,
        }
    }

    pub fn template(&self) -> &Rc<Template> {
        &self.template
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn scope(&self) -> &Rc<Scope> {
        self.template.scope()
    }

    pub fn dom(&self) -> Rc<dyn Dom> {
        self.template.dom()
    }

    /// Notify subscribers of `output`. Does not run a sweep.
    pub fn emit(&self, output: &str, value: Value) -> EvalResult<usize> {
        self.outputs.emit(output, &value)
    }
}

impl fmt::Debug for DirectiveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveContext")
            .field("template", &self.template.name())
            .field("element", &self.element)
            .finish()
    }
}

//! Template tree: scopes, detectors, directives and filters of live views

mod application;
mod compiler;
mod context;
mod directive;
mod filters;

pub use application::{Application, ApplicationBuilder};
pub use compiler::TemplateCompiler;
pub use context::AppContext;
pub use directive::{
    AttachedDirective, Directive, DirectiveContext, DirectiveInstance, HostElement, OutputHandler,
    OutputTable,
};
pub use filters::{builtin_filters, FilterEntry, FilterRegistration};

use crate::change_detection::{ChangeDetectionStrategy, ChangeDetector, WatchId};
use crate::dom::{Dom, ListenerId, NodeId};
use crate::error::{EvalError, EvalResult};
use crate::expression::{EvalContext, Value};
use crate::i18n::{find_in_tree, TranslationSource};
use crate::metadata::DirectiveType;
use crate::scope::Scope;
use indexmap::IndexMap;
use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Markup compiled under a parent without a component of its own
    Abstract,
    Component,
    /// Root of an application
    Application,
}

/// One node of the template tree.
///
/// Owns its scope, change detector, child templates and directive instances.
/// Parents are held weakly. A template stays alive until [`Template::destroy`]
/// is called on it or an ancestor.
pub struct Template {
    kind: TemplateKind,
    name: String,
    app: Rc<AppContext>,
    scope: Rc<Scope>,
    detector: Rc<ChangeDetector>,
    parent: Weak<Template>,
    element: Option<NodeId>,
    directive_types: Vec<DirectiveType>,
    controller_as: Option<String>,
    children: RefCell<Vec<Rc<Template>>>,
    directives: RefCell<Vec<AttachedDirective>>,
    component: RefCell<Option<AttachedDirective>>,
    filters: RefCell<IndexMap<String, FilterEntry>>,
    translations: RefCell<IndexMap<String, serde_json::Value>>,
    outputs: Rc<OutputTable>,
    listeners: RefCell<Vec<ListenerId>>,
    /// Watches on the parent detector feeding this template's inputs
    parent_watches: RefCell<Vec<WatchId>>,
    destroyed: Cell<bool>,
}

pub(crate) struct TemplateOptions {
    pub kind: TemplateKind,
    pub name: String,
    pub element: Option<NodeId>,
    pub strategy: ChangeDetectionStrategy,
    pub directive_types: Vec<DirectiveType>,
    pub controller_as: Option<String>,
}

impl Template {
    pub(crate) fn new(
        app: Rc<AppContext>,
        parent: Option<&Rc<Template>>,
        options: TemplateOptions,
    ) -> Rc<Template> {
        let scope = match parent {
            Some(parent) => Scope::child(&parent.scope),
            None => Scope::new(),
        };
        if let Some(alias) = &options.controller_as {
            scope.set(alias.clone(), Value::empty_object());
        }

        let template = Rc::new_cyclic(|weak: &Weak<Template>| {
            let context: Weak<dyn EvalContext> = weak.clone();
            Template {
                kind: options.kind,
                name: options.name,
                detector: ChangeDetector::new(context, options.strategy),
                app,
                scope,
                parent: parent.map(Rc::downgrade).unwrap_or_default(),
                element: options.element,
                directive_types: options.directive_types,
                controller_as: options.controller_as,
                children: RefCell::new(Vec::new()),
                directives: RefCell::new(Vec::new()),
                component: RefCell::new(None),
                filters: RefCell::new(IndexMap::new()),
                translations: RefCell::new(IndexMap::new()),
                outputs: Rc::new(OutputTable::new()),
                listeners: RefCell::new(Vec::new()),
                parent_watches: RefCell::new(Vec::new()),
                destroyed: Cell::new(false),
            }
        });

        if let Some(parent) = parent {
            parent.children.borrow_mut().push(Rc::clone(&template));
            parent.detector.add_child(&template.detector);
        }
        template
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn app(&self) -> &Rc<AppContext> {
        &self.app
    }

    pub fn dom(&self) -> Rc<dyn Dom> {
        Rc::clone(self.app.dom())
    }

    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    pub fn detector(&self) -> &Rc<ChangeDetector> {
        &self.detector
    }

    pub fn parent(&self) -> Option<Rc<Template>> {
        self.parent.upgrade()
    }

    /// Host element, `None` for the application root
    pub fn element(&self) -> Option<NodeId> {
        self.element
    }

    pub fn children(&self) -> Vec<Rc<Template>> {
        self.children.borrow().clone()
    }

    pub fn directives(&self) -> std::cell::Ref<'_, Vec<AttachedDirective>> {
        self.directives.borrow()
    }

    pub fn component(&self) -> Option<DirectiveInstance> {
        self.component
            .borrow()
            .as_ref()
            .map(|attached| Rc::clone(&attached.instance))
    }

    pub fn outputs(&self) -> &Rc<OutputTable> {
        &self.outputs
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Directives usable in this template: its own, then its ancestors',
    /// then those contributed by extensions. First declaration wins.
    pub fn available_directives(&self) -> Vec<DirectiveType> {
        let mut out: Vec<DirectiveType> = Vec::new();
        let mut seen: Vec<TypeId> = Vec::new();
        let mut push = |ty: DirectiveType| {
            if !seen.contains(&ty.type_id()) {
                seen.push(ty.type_id());
                out.push(ty);
            }
        };

        self.directive_types.iter().copied().for_each(&mut push);
        let mut current = self.parent();
        while let Some(template) = current {
            template.directive_types.iter().copied().for_each(&mut push);
            current = template.parent();
        }
        self.app.extensions().directives().into_iter().for_each(&mut push);
        out
    }

    pub fn register_filter(&self, registration: FilterRegistration) {
        self.filters
            .borrow_mut()
            .insert(registration.name, registration.entry);
    }

    /// Filter named `name`, looked up here then in ancestors
    pub fn find_filter(&self, name: &str) -> Option<FilterEntry> {
        if let Some(entry) = self.filters.borrow().get(name) {
            return Some(entry.clone());
        }
        self.parent().and_then(|parent| parent.find_filter(name))
    }

    pub fn register_translations(&self, locale: &str, tree: serde_json::Value) {
        self.translations
            .borrow_mut()
            .insert(locale.to_string(), tree);
    }

    /// Translate `message` in the current application locale
    pub fn translate(
        &self,
        message: &str,
        count: Option<i64>,
        params: &IndexMap<String, String>,
    ) -> String {
        let locale = self.app.locale();
        self.app
            .translator()
            .translate(self, &locale, message, count, params)
    }

    /// Store an input value in the scope (or under the controller alias)
    /// and forward it to the component instance once there is one.
    pub fn set_input(self: &Rc<Self>, name: &str, value: Value) -> EvalResult<()> {
        match self.controller_as.as_deref().and_then(|a| self.scope.get_own(a)) {
            Some(Value::Object(alias)) => {
                alias.borrow_mut().insert(name.to_string(), value.clone());
            }
            _ => self.scope.set(name, value.clone()),
        }

        let attached = self
            .component
            .borrow()
            .as_ref()
            .map(|a| (Rc::clone(&a.instance), a.element));
        if let Some((instance, element)) = attached {
            let ctx = DirectiveContext::new(Rc::clone(self), element, Rc::clone(&self.outputs));
            instance.borrow_mut().on_input(name, &value, &ctx)?;
        }
        Ok(())
    }

    /// Notify subscribers of a component output. Does not run a sweep.
    pub fn emit(&self, output: &str, value: Value) -> EvalResult<usize> {
        self.outputs.emit(output, &value)
    }

    /// Check this template's detector explicitly, including when its
    /// strategy is manual.
    pub fn detect_changes(&self) -> EvalResult<usize> {
        self.detector.check()
    }

    pub(crate) fn attach_directive(&self, attached: AttachedDirective) {
        self.directives.borrow_mut().push(attached);
    }

    pub(crate) fn attach_component(&self, attached: AttachedDirective) {
        *self.component.borrow_mut() = Some(attached);
    }

    pub(crate) fn track_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().push(id);
    }

    pub(crate) fn track_parent_watch(&self, id: WatchId) {
        self.parent_watches.borrow_mut().push(id);
    }

    /// Tear down this template and its subtree.
    ///
    /// Children are destroyed first, in order, then destroy hooks run, DOM
    /// listeners are detached and the detector is disabled. Calling it again
    /// is a no-op.
    pub fn destroy(self: &Rc<Self>) {
        if self.destroyed.replace(true) {
            return;
        }

        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in &children {
            child.destroy();
        }

        let directives = std::mem::take(&mut *self.directives.borrow_mut());
        let component = self.component.borrow_mut().take();
        for attached in directives.iter().chain(component.iter()) {
            let ctx = DirectiveContext::new(
                Rc::clone(self),
                attached.element,
                Rc::clone(&attached.outputs),
            );
            attached.instance.borrow_mut().on_destroy(&ctx);
            attached.outputs.clear();
        }

        let dom = self.app.dom();
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for id in listeners {
            dom.remove_event_listener(id);
        }

        let parent = self.parent();
        let watches = std::mem::take(&mut *self.parent_watches.borrow_mut());
        if let Some(parent) = &parent {
            for id in watches {
                parent.detector.unwatch(id);
            }
            parent
                .children
                .borrow_mut()
                .retain(|c| !Rc::ptr_eq(c, self));
        }

        self.detector.disable();
        self.outputs.clear();
        self.scope.clear();
        self.filters.borrow_mut().clear();
        self.translations.borrow_mut().clear();

        debug!(
            template = %self.name,
            children = children.len(),
            directives = directives.len(),
            "template destroyed"
        );
    }
}

impl EvalContext for Template {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.scope.get(name)
    }

    fn apply_filter(&self, name: &str, input: Value, args: &[Value]) -> EvalResult<Value> {
        match self.find_filter(name) {
            Some(entry) => entry.apply(self, &input, args),
            None => Err(EvalError::UnknownFilter {
                name: name.to_string(),
            }),
        }
    }
}

impl TranslationSource for Template {
    fn find_translation(&self, locale: &str, key: &str) -> Option<serde_json::Value> {
        let own = self
            .translations
            .borrow()
            .get(locale)
            .and_then(|tree| find_in_tree(tree, key))
            .cloned();
        own.or_else(|| {
            self.parent()
                .and_then(|parent| parent.find_translation(locale, key))
        })
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("element", &self.element)
            .field("children", &self.children.borrow().len())
            .field("directives", &self.directives.borrow().len())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

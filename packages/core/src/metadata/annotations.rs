//! Static annotation tables attached to directive classes

use crate::change_detection::ChangeDetectionStrategy;
use crate::di::{DiError, Injectable, Resolver};
use crate::template::{Directive, FilterRegistration};
use indexmap::IndexMap;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKind {
    Directive,
    Component,
    Input,
    Required,
    Output,
    HostListener,
    HostAttribute,
}

/// Settings of a component: a directive with its own template and scope
#[derive(Debug, Clone, Default)]
pub struct ComponentAnnotation {
    pub selector: Option<String>,
    pub template: Option<String>,
    /// Name under which inputs are published in the component scope
    pub controller_as: Option<String>,
    pub strategy: ChangeDetectionStrategy,
    /// Directives usable inside the component template
    pub directives: Vec<DirectiveType>,
    pub filters: Vec<FilterRegistration>,
    /// locale -> translation tree
    pub translations: IndexMap<String, serde_json::Value>,
}

impl ComponentAnnotation {
    pub fn new(selector: &str, template: &str) -> Self {
        ComponentAnnotation {
            selector: Some(selector.to_string()),
            template: Some(template.to_string()),
            ..Default::default()
        }
    }

    pub fn controller_as(mut self, alias: &str) -> Self {
        self.controller_as = Some(alias.to_string());
        self
    }

    pub fn strategy(mut self, strategy: ChangeDetectionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn directive(mut self, directive: DirectiveType) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn filter(mut self, filter: FilterRegistration) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn translations(mut self, locale: &str, tree: serde_json::Value) -> Self {
        self.translations.insert(locale.to_string(), tree);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Annotation {
    Directive { selector: Option<String> },
    Component(ComponentAnnotation),
    /// `name` for an attribute input, `[name]` for a property input
    Input { name: String },
    Required { name: String },
    Output { name: String },
    /// Host element event routed to `Directive::on_event` with `method`
    HostListener { event: String, method: String },
    HostAttribute { name: String, value: String },
}

impl Annotation {
    pub fn directive(selector: &str) -> Self {
        Annotation::Directive {
            selector: Some(selector.to_string()),
        }
    }

    pub fn input(name: &str) -> Self {
        Annotation::Input {
            name: name.to_string(),
        }
    }

    pub fn required(name: &str) -> Self {
        Annotation::Required {
            name: name.to_string(),
        }
    }

    pub fn output(name: &str) -> Self {
        Annotation::Output {
            name: name.to_string(),
        }
    }

    pub fn host_listener(event: &str, method: &str) -> Self {
        Annotation::HostListener {
            event: event.to_string(),
            method: method.to_string(),
        }
    }

    pub fn host_attribute(name: &str, value: &str) -> Self {
        Annotation::HostAttribute {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn kind(&self) -> AnnotationKind {
        match self {
            Annotation::Directive { .. } => AnnotationKind::Directive,
            Annotation::Component(_) => AnnotationKind::Component,
            Annotation::Input { .. } => AnnotationKind::Input,
            Annotation::Required { .. } => AnnotationKind::Required,
            Annotation::Output { .. } => AnnotationKind::Output,
            Annotation::HostListener { .. } => AnnotationKind::HostListener,
            Annotation::HostAttribute { .. } => AnnotationKind::HostAttribute,
        }
    }
}

/// A directive or component class: declares its annotations once and is
/// constructed through dependency injection.
pub trait DirectiveClass: Directive + Injectable {
    fn annotations() -> Vec<Annotation>;
}

pub type DirectiveFactory = fn(&Resolver<'_>) -> Result<Box<dyn Directive>, DiError>;

/// Type-erased handle to a [`DirectiveClass`]
#[derive(Clone, Copy)]
pub struct DirectiveType {
    type_id: TypeId,
    name: &'static str,
    annotations: fn() -> Vec<Annotation>,
    factory: DirectiveFactory,
}

impl DirectiveType {
    pub fn of<T: DirectiveClass>() -> Self {
        let full_name = std::any::type_name::<T>();
        DirectiveType {
            type_id: TypeId::of::<T>(),
            name: full_name.rsplit("::").next().unwrap_or(full_name),
            annotations: T::annotations,
            factory: |resolver| {
                let directive: Box<dyn Directive> = Box::new(T::create(resolver)?);
                Ok(directive)
            },
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        (self.annotations)()
    }

    pub fn factory(&self) -> DirectiveFactory {
        self.factory
    }
}

impl PartialEq for DirectiveType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl fmt::Debug for DirectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectiveType({})", self.name)
    }
}

/// Annotation reader. Each class's table is read once and cached.
#[derive(Debug, Default)]
pub struct AnnotationRegistry {
    tables: RefCell<HashMap<TypeId, Rc<[Annotation]>>>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, ty: &DirectiveType) -> Rc<[Annotation]> {
        if let Some(table) = self.tables.borrow().get(&ty.type_id()) {
            return Rc::clone(table);
        }
        let table: Rc<[Annotation]> = ty.annotations().into();
        self.tables
            .borrow_mut()
            .insert(ty.type_id(), Rc::clone(&table));
        table
    }

    /// First annotation of `kind` declared on the class
    pub fn get_annotation(&self, ty: &DirectiveType, kind: AnnotationKind) -> Option<Annotation> {
        self.table(ty).iter().find(|a| a.kind() == kind).cloned()
    }

    /// Every annotation of `kind`, in declaration order
    pub fn get_annotations(&self, ty: &DirectiveType, kind: AnnotationKind) -> Vec<Annotation> {
        self.table(ty)
            .iter()
            .filter(|a| a.kind() == kind)
            .cloned()
            .collect()
    }
}

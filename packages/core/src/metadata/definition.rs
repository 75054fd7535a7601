use super::annotations::{DirectiveFactory, DirectiveType};
use crate::change_detection::ChangeDetectionStrategy;
use crate::di::{DiError, Resolver};
use crate::directive_matching::{matches_any, CssSelector};
use crate::dom::{Dom, NodeId};
use crate::template::{Directive, FilterRegistration};
use bitflags::bitflags;
use indexmap::IndexMap;
use std::any::TypeId;
use std::fmt;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputFlags: u8 {
        /// Bound as an expression rather than as attribute text
        const PROPERTY = 1 << 0;
        const REQUIRED = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDefinition {
    pub name: String,
    pub flags: InputFlags,
}

impl InputDefinition {
    pub fn is_property(&self) -> bool {
        self.flags.contains(InputFlags::PROPERTY)
    }

    pub fn is_required(&self) -> bool {
        self.flags.contains(InputFlags::REQUIRED)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Directive,
    Component,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostListenerDefinition {
    pub event: String,
    pub method: String,
}

/// Component-only part of a definition
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub template: String,
    pub controller_as: Option<String>,
    pub strategy: ChangeDetectionStrategy,
    pub directives: Vec<DirectiveType>,
    pub filters: Vec<FilterRegistration>,
    pub translations: IndexMap<String, serde_json::Value>,
}

/// Resolved, immutable metadata of one directive class
pub struct DirectiveDefinition {
    pub type_id: TypeId,
    pub class_name: &'static str,
    pub kind: DirectiveKind,
    pub selector: String,
    pub selectors: Vec<CssSelector>,
    pub inputs: Vec<InputDefinition>,
    pub outputs: Vec<String>,
    pub host_listeners: Vec<HostListenerDefinition>,
    pub host_attributes: Vec<(String, String)>,
    pub component: Option<ComponentDefinition>,
    pub(crate) factory: DirectiveFactory,
}

impl DirectiveDefinition {
    pub fn is_component(&self) -> bool {
        self.kind == DirectiveKind::Component
    }

    pub fn input(&self, name: &str) -> Option<&InputDefinition> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|o| o == name)
    }

    pub fn matches(&self, dom: &dyn Dom, node: NodeId) -> bool {
        matches_any(&self.selectors, dom, node)
    }

    pub fn instantiate(&self, resolver: &Resolver<'_>) -> Result<Box<dyn Directive>, DiError> {
        (self.factory)(resolver)
    }
}

impl fmt::Debug for DirectiveDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveDefinition")
            .field("class_name", &self.class_name)
            .field("kind", &self.kind)
            .field("selector", &self.selector)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("host_listeners", &self.host_listeners)
            .field("host_attributes", &self.host_attributes)
            .field("component", &self.component)
            .finish()
    }
}

//! Application extensions: extra filters and directives, and a hook on
//! component instantiation.

use crate::di::{DiError, ServiceOverrides};
use crate::dom::NodeId;
use crate::metadata::DirectiveType;
use crate::template::{FilterRegistration, Template};
use std::fmt;
use std::rc::Rc;
use tracing::trace;

pub trait Extension {
    fn name(&self) -> &str;

    fn filters(&self) -> Vec<FilterRegistration> {
        Vec::new()
    }

    fn directives(&self) -> Vec<DirectiveType> {
        Vec::new()
    }

    /// Called once per component instantiation, before the component is
    /// constructed. May push extra service overrides.
    fn do_update_component_services(
        &self,
        _template: &Rc<Template>,
        _element: NodeId,
        _services: &mut ServiceOverrides,
    ) -> Result<(), DiError> {
        Ok(())
    }
}

/// Extensions of one application, in registration order
#[derive(Default, Clone)]
pub struct ExtensionManager {
    extensions: Vec<Rc<dyn Extension>>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, extension: Rc<dyn Extension>) {
        self.extensions.push(extension);
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn filters(&self) -> Vec<FilterRegistration> {
        self.extensions.iter().flat_map(|e| e.filters()).collect()
    }

    pub fn directives(&self) -> Vec<DirectiveType> {
        self.extensions.iter().flat_map(|e| e.directives()).collect()
    }

    pub fn do_update_component_services(
        &self,
        template: &Rc<Template>,
        element: NodeId,
        services: &mut ServiceOverrides,
    ) -> Result<(), DiError> {
        for extension in &self.extensions {
            trace!(extension = extension.name(), "updating component services");
            extension.do_update_component_services(template, element, services)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.extensions.iter().map(|e| e.name().to_string()))
            .finish()
    }
}

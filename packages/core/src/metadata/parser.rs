use super::annotations::{Annotation, AnnotationKind, AnnotationRegistry, DirectiveType};
use super::definition::*;
use crate::directive_matching::CssSelector;
use crate::error::DefinitionError;
use std::any::TypeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Turns annotation tables into [`DirectiveDefinition`]s, once per class
#[derive(Debug, Default)]
pub struct DirectiveParser {
    registry: AnnotationRegistry,
    cache: RefCell<HashMap<TypeId, Rc<DirectiveDefinition>>>,
}

impl DirectiveParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &AnnotationRegistry {
        &self.registry
    }

    pub fn parse(&self, ty: &DirectiveType) -> Result<Rc<DirectiveDefinition>, DefinitionError> {
        if let Some(definition) = self.cache.borrow().get(&ty.type_id()) {
            return Ok(Rc::clone(definition));
        }

        let definition = Rc::new(self.parse_uncached(ty)?);
        debug!(
            directive = ty.name(),
            selector = %definition.selector,
            component = definition.is_component(),
            "parsed directive definition"
        );
        self.cache
            .borrow_mut()
            .insert(ty.type_id(), Rc::clone(&definition));
        Ok(definition)
    }

    fn parse_uncached(&self, ty: &DirectiveType) -> Result<DirectiveDefinition, DefinitionError> {
        let class = ty.name().to_string();

        let (kind, selector, component) =
            match self.registry.get_annotation(ty, AnnotationKind::Component) {
                Some(Annotation::Component(c)) => {
                    let template = c
                        .template
                        .clone()
                        .ok_or_else(|| DefinitionError::MissingTemplate {
                            class: class.clone(),
                        })?;
                    let component = ComponentDefinition {
                        template,
                        controller_as: c.controller_as.clone(),
                        strategy: c.strategy,
                        directives: c.directives.clone(),
                        filters: c.filters.clone(),
                        translations: c.translations.clone(),
                    };
                    (DirectiveKind::Component, c.selector, Some(component))
                }
                _ => match self.registry.get_annotation(ty, AnnotationKind::Directive) {
                    Some(Annotation::Directive { selector }) => {
                        (DirectiveKind::Directive, selector, None)
                    }
                    _ => return Err(DefinitionError::MissingAnnotation { class }),
                },
            };

        let selector = match selector {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Err(DefinitionError::MissingSelector { class }),
        };
        let selectors =
            CssSelector::parse(&selector).map_err(|message| DefinitionError::InvalidSelector {
                class: class.clone(),
                selector: selector.clone(),
                message,
            })?;

        let mut inputs: Vec<InputDefinition> = Vec::new();
        for annotation in self.registry.get_annotations(ty, AnnotationKind::Input) {
            if let Annotation::Input { name } = annotation {
                let (name, flags) = match strip_brackets(&name) {
                    Some(inner) => (inner.to_string(), InputFlags::PROPERTY),
                    None => (name, InputFlags::empty()),
                };
                if !inputs.iter().any(|i| i.name == name) {
                    inputs.push(InputDefinition { name, flags });
                }
            }
        }

        for annotation in self.registry.get_annotations(ty, AnnotationKind::Required) {
            if let Annotation::Required { name } = annotation {
                let bare = strip_brackets(&name).unwrap_or(&name);
                match inputs.iter_mut().find(|i| i.name == bare) {
                    Some(input) => input.flags |= InputFlags::REQUIRED,
                    None => {
                        return Err(DefinitionError::RequiredInputNotDeclared {
                            class,
                            input: bare.to_string(),
                        })
                    }
                }
            }
        }

        let outputs = self
            .registry
            .get_annotations(ty, AnnotationKind::Output)
            .into_iter()
            .filter_map(|a| match a {
                Annotation::Output { name } => Some(name),
                _ => None,
            })
            .collect();

        let host_listeners = self
            .registry
            .get_annotations(ty, AnnotationKind::HostListener)
            .into_iter()
            .filter_map(|a| match a {
                Annotation::HostListener { event, method } => {
                    Some(HostListenerDefinition { event, method })
                }
                _ => None,
            })
            .collect();

        let host_attributes = self
            .registry
            .get_annotations(ty, AnnotationKind::HostAttribute)
            .into_iter()
            .filter_map(|a| match a {
                Annotation::HostAttribute { name, value } => Some((name, value)),
                _ => None,
            })
            .collect();

        Ok(DirectiveDefinition {
            type_id: ty.type_id(),
            class_name: ty.name(),
            kind,
            selector,
            selectors,
            inputs,
            outputs,
            host_listeners,
            host_attributes,
            component,
            factory: ty.factory(),
        })
    }
}

fn strip_brackets(name: &str) -> Option<&str> {
    name.strip_prefix('[').and_then(|n| n.strip_suffix(']'))
}

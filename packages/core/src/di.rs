//! Dependency injection
//!
//! A small service locator: services are registered as ready instances or as
//! factories (lazily created singletons), and types implementing
//! [`Injectable`] are constructed with their dependencies resolved from the
//! container, with per-call overrides taking precedence.

pub use crate::error::DiError;

use indexmap::IndexMap;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A type the injector knows how to construct
pub trait Injectable: Any + Sized {
    fn create(resolver: &Resolver<'_>) -> Result<Self, DiError>;
}

type ServiceFactory = Rc<dyn Fn(&Resolver<'_>) -> Result<Rc<dyn Any>, DiError>>;

#[derive(Clone)]
enum Provider {
    Instance(Rc<dyn Any>),
    Factory(ServiceFactory),
}

/// Registration of one service type
#[derive(Clone)]
pub struct ServiceDescriptor {
    type_id: TypeId,
    name: &'static str,
    provider: Provider,
}

impl ServiceDescriptor {
    pub fn instance<T: Any>(value: T) -> Self {
        Self::shared(Rc::new(value))
    }

    pub fn shared<T: Any>(value: Rc<T>) -> Self {
        ServiceDescriptor {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            provider: Provider::Instance(value),
        }
    }

    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any,
        F: Fn(&Resolver<'_>) -> Result<T, DiError> + 'static,
    {
        ServiceDescriptor {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            provider: Provider::Factory(Rc::new(move |resolver| {
                let service: Rc<dyn Any> = Rc::new(factory(resolver)?);
                Ok(service)
            })),
        }
    }

    pub fn injectable<T: Injectable>() -> Self {
        Self::factory(T::create)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.provider {
            Provider::Instance(_) => "instance",
            Provider::Factory(_) => "factory",
        };
        write!(f, "ServiceDescriptor({}, {})", self.name, kind)
    }
}

/// Services that shadow the container for one construction
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    entries: Vec<ServiceDescriptor>,
}

impl ServiceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries for the same type win
    pub fn push(&mut self, descriptor: ServiceDescriptor) {
        self.entries.push(descriptor);
    }

    pub fn with(mut self, descriptor: ServiceDescriptor) -> Self {
        self.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, type_id: TypeId) -> Option<&ServiceDescriptor> {
        self.entries.iter().rev().find(|d| d.type_id == type_id)
    }
}

struct ServiceSlot {
    name: &'static str,
    provider: Provider,
    instance: Option<Rc<dyn Any>>,
}

/// Service container with an optional parent
#[derive(Default)]
pub struct Injector {
    services: RefCell<IndexMap<TypeId, ServiceSlot>>,
    parent: Option<Rc<Injector>>,
}

impl Injector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(parent: Rc<Injector>) -> Self {
        Injector {
            services: RefCell::new(IndexMap::new()),
            parent: Some(parent),
        }
    }

    /// Register (or replace) a service
    pub fn provide(&self, descriptor: ServiceDescriptor) {
        debug!(service = descriptor.name, "service registered");
        let instance = match &descriptor.provider {
            Provider::Instance(value) => Some(Rc::clone(value)),
            Provider::Factory(_) => None,
        };
        self.services.borrow_mut().insert(
            descriptor.type_id,
            ServiceSlot {
                name: descriptor.name,
                provider: descriptor.provider,
                instance,
            },
        );
    }

    pub fn has<T: Any>(&self) -> bool {
        self.services.borrow().contains_key(&TypeId::of::<T>())
            || self.parent.as_ref().map_or(false, |p| p.has::<T>())
    }

    /// Registered service, creating it on first use
    pub fn get<T: Any>(&self) -> Result<Rc<T>, DiError> {
        let overrides = ServiceOverrides::default();
        self.resolver(&overrides).get::<T>()
    }

    /// Construct `T`, resolving its dependencies with `overrides` first
    pub fn create<T: Injectable>(&self, overrides: &ServiceOverrides) -> Result<T, DiError> {
        T::create(&self.resolver(overrides))
    }

    pub fn resolver<'a>(&'a self, overrides: &'a ServiceOverrides) -> Resolver<'a> {
        Resolver {
            injector: self,
            overrides,
            resolving: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn lookup(
        &self,
        type_id: TypeId,
        name: &'static str,
        resolving: &Rc<RefCell<Vec<TypeId>>>,
    ) -> Result<Option<Rc<dyn Any>>, DiError> {
        let factory = {
            let services = self.services.borrow();
            match services.get(&type_id) {
                Some(ServiceSlot {
                    instance: Some(instance),
                    ..
                }) => return Ok(Some(Rc::clone(instance))),
                Some(ServiceSlot {
                    provider: Provider::Factory(factory),
                    ..
                }) => Rc::clone(factory),
                Some(ServiceSlot {
                    provider: Provider::Instance(instance),
                    ..
                }) => return Ok(Some(Rc::clone(instance))),
                None => {
                    return match &self.parent {
                        Some(parent) => parent.lookup(type_id, name, resolving),
                        None => Ok(None),
                    }
                }
            }
        };

        if resolving.borrow().contains(&type_id) {
            return Err(DiError::CircularDependency {
                service: name.to_string(),
            });
        }

        debug!(service = name, "creating service");
        resolving.borrow_mut().push(type_id);
        let empty = ServiceOverrides::default();
        let resolver = Resolver {
            injector: self,
            overrides: &empty,
            resolving: Rc::clone(resolving),
        };
        let created = factory(&resolver);
        resolving.borrow_mut().retain(|t| *t != type_id);
        let instance = created?;

        if let Some(slot) = self.services.borrow_mut().get_mut(&type_id) {
            slot.instance = Some(Rc::clone(&instance));
        }
        Ok(Some(instance))
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let services = self.services.borrow();
        f.debug_struct("Injector")
            .field("services", &services.values().map(|s| s.name).collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Lookup view used while constructing one object
pub struct Resolver<'a> {
    injector: &'a Injector,
    overrides: &'a ServiceOverrides,
    resolving: Rc<RefCell<Vec<TypeId>>>,
}

impl Resolver<'_> {
    pub fn get<T: Any>(&self) -> Result<Rc<T>, DiError> {
        let type_id = TypeId::of::<T>();
        let name = std::any::type_name::<T>();

        let service = match self.overrides.find(type_id) {
            Some(descriptor) => match &descriptor.provider {
                Provider::Instance(instance) => Rc::clone(instance),
                Provider::Factory(factory) => factory(self)?,
            },
            None => self
                .injector
                .lookup(type_id, name, &self.resolving)?
                .ok_or_else(|| DiError::ServiceNotFound {
                    service: name.to_string(),
                })?,
        };

        service
            .downcast::<T>()
            .map_err(|_| DiError::Construction {
                service: name.to_string(),
                message: "registered service has a different type".to_string(),
            })
    }

    /// Like [`Resolver::get`], `None` when nothing is registered
    pub fn try_get<T: Any>(&self) -> Result<Option<Rc<T>>, DiError> {
        match self.get::<T>() {
            Ok(service) => Ok(Some(service)),
            Err(DiError::ServiceNotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }
}

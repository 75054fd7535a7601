/**
 * Injector Tests
 *
 * Service registration, lazy singletons, parent chains, overrides and
 * cycle detection
 */

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use trellis_core::di::{
        DiError, Injectable, Injector, Resolver, ServiceDescriptor, ServiceOverrides,
    };

    #[derive(Debug, PartialEq)]
    struct ApiUrl(&'static str);

    struct Http {
        url: Rc<ApiUrl>,
    }

    impl Injectable for Http {
        fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
            Ok(Http {
                url: resolver.get::<ApiUrl>()?,
            })
        }
    }

    struct UserService {
        http: Rc<Http>,
        cache: Option<Rc<Cache>>,
    }

    struct Cache;

    impl Injectable for UserService {
        fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
            Ok(UserService {
                http: resolver.get::<Http>()?,
                cache: resolver.try_get::<Cache>()?,
            })
        }
    }

    struct Chicken {
        _egg: Rc<Egg>,
    }

    struct Egg {
        _chicken: Rc<Chicken>,
    }

    impl Injectable for Chicken {
        fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
            Ok(Chicken {
                _egg: resolver.get::<Egg>()?,
            })
        }
    }

    impl Injectable for Egg {
        fn create(resolver: &Resolver<'_>) -> Result<Self, DiError> {
            Ok(Egg {
                _chicken: resolver.get::<Chicken>()?,
            })
        }
    }

    fn app_injector() -> Injector {
        let injector = Injector::new();
        injector.provide(ServiceDescriptor::instance(ApiUrl("https://api")));
        injector.provide(ServiceDescriptor::injectable::<Http>());
        injector
    }

    mod registration {
        use super::*;

        #[test]
        fn should_return_registered_instances() {
            let injector = app_injector();
            assert!(injector.has::<ApiUrl>());
            assert!(!injector.has::<Cache>());
            assert_eq!(*injector.get::<ApiUrl>().unwrap(), ApiUrl("https://api"));
        }

        #[test]
        fn should_replace_registrations() {
            let injector = app_injector();
            injector.provide(ServiceDescriptor::instance(ApiUrl("https://other")));
            assert_eq!(*injector.get::<ApiUrl>().unwrap(), ApiUrl("https://other"));
        }

        #[test]
        fn should_report_missing_services() {
            let injector = Injector::new();
            match injector.get::<ApiUrl>() {
                Err(DiError::ServiceNotFound { service }) => assert!(service.ends_with("ApiUrl")),
                other => panic!("unexpected {:?}", other.map(|_| ())),
            }
        }
    }

    mod singletons {
        use super::*;

        #[test]
        fn should_create_factories_once() {
            let injector = Injector::new();
            let calls = Rc::new(Cell::new(0));
            let counter = calls.clone();
            injector.provide(ServiceDescriptor::factory(move |_resolver| {
                counter.set(counter.get() + 1);
                Ok(ApiUrl("lazy"))
            }));
            assert_eq!(calls.get(), 0);

            let first = injector.get::<ApiUrl>().unwrap();
            let second = injector.get::<ApiUrl>().unwrap();
            assert!(Rc::ptr_eq(&first, &second));
            assert_eq!(calls.get(), 1);
        }

        #[test]
        fn should_share_dependencies_between_consumers() {
            let injector = app_injector();
            let a: UserService = injector.create(&ServiceOverrides::new()).unwrap();
            let b: UserService = injector.create(&ServiceOverrides::new()).unwrap();
            assert!(Rc::ptr_eq(&a.http, &b.http));
            assert_eq!(*a.http.url, ApiUrl("https://api"));
            assert!(a.cache.is_none());
        }

        #[test]
        fn should_not_cache_failed_constructions() {
            let injector = Injector::new();
            injector.provide(ServiceDescriptor::injectable::<Http>());
            assert!(injector.get::<Http>().is_err());

            injector.provide(ServiceDescriptor::instance(ApiUrl("late")));
            assert_eq!(*injector.get::<Http>().unwrap().url, ApiUrl("late"));
        }
    }

    mod hierarchy {
        use super::*;

        #[test]
        fn should_fall_back_to_the_parent() {
            let parent = Rc::new(app_injector());
            let child = Injector::with_parent(Rc::clone(&parent));
            child.provide(ServiceDescriptor::instance(Cache));

            assert!(child.has::<ApiUrl>());
            let service: UserService = child.create(&ServiceOverrides::new()).unwrap();
            assert!(service.cache.is_some());
            assert!(Rc::ptr_eq(&service.http, &parent.get::<Http>().unwrap()));
            assert!(!parent.has::<Cache>());
        }

        #[test]
        fn should_shadow_parent_services() {
            let parent = Rc::new(app_injector());
            let child = Injector::with_parent(parent);
            child.provide(ServiceDescriptor::instance(ApiUrl("https://child")));
            assert_eq!(*child.get::<ApiUrl>().unwrap(), ApiUrl("https://child"));
        }
    }

    mod overrides {
        use super::*;

        #[test]
        fn should_prefer_overrides_for_one_construction() {
            let injector = app_injector();
            let overrides = ServiceOverrides::new()
                .with(ServiceDescriptor::instance(ApiUrl("first")))
                .with(ServiceDescriptor::instance(ApiUrl("second")));
            assert_eq!(overrides.len(), 2);

            let http: Http = injector.create(&overrides).unwrap();
            assert_eq!(*http.url, ApiUrl("second"));
            assert_eq!(*injector.get::<ApiUrl>().unwrap(), ApiUrl("https://api"));
        }

        #[test]
        fn should_run_override_factories_per_resolution() {
            let injector = app_injector();
            let overrides = ServiceOverrides::new().with(ServiceDescriptor::factory(|resolver| {
                Ok(Http {
                    url: resolver.get::<ApiUrl>()?,
                })
            }));
            let service: UserService = injector.create(&overrides).unwrap();
            assert!(!Rc::ptr_eq(&service.http, &injector.get::<Http>().unwrap()));
        }
    }

    mod cycles {
        use super::*;

        #[test]
        fn should_detect_circular_dependencies() {
            let injector = Injector::new();
            injector.provide(ServiceDescriptor::injectable::<Chicken>());
            injector.provide(ServiceDescriptor::injectable::<Egg>());

            match injector.get::<Chicken>() {
                Err(DiError::CircularDependency { service }) => {
                    assert!(service.ends_with("Chicken"))
                }
                other => panic!("unexpected {:?}", other.map(|_| ())),
            }

            // A failed cycle leaves the injector usable
            assert!(matches!(
                injector.get::<Egg>(),
                Err(DiError::CircularDependency { .. })
            ));
        }
    }
}

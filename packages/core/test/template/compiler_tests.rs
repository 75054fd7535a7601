/**
 * Template Compiler Tests
 *
 * End-to-end compilation of markup against a MemoryDom: interpolations,
 * property/class/style bindings, event handlers, directives, components,
 * inputs and outputs, filter resolution and definition errors
 */
#[path = "util/mod.rs"]
#[allow(dead_code)]
mod util;

#[cfg(test)]
mod tests {
    use super::util::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use trellis_core::config::FrameworkConfig;
    use trellis_core::dom::Dom;
    use trellis_core::metadata::DirectiveType;
    use trellis_core::template::{FilterRegistration, TemplateKind};
    use trellis_core::{DefinitionError, EvalError, FrameworkError, Value};

    mod interpolation {
        use super::*;

        #[test]
        fn should_render_filter_chains_with_arguments() {
            let fx = fixture_with(text_filters);
            let (host, _) = fx.render("<p>{{ \"hello\" | upper | substr : 0 : 4 }}</p>");
            assert_eq!(fx.html(host), "<p>HELL</p>");
        }

        #[test]
        fn should_update_text_on_tick() {
            let fx = fixture();
            fx.set("name", Value::from("Ada"));
            let (host, _) = fx.render("<p>Hello {{ name }}!</p>");
            assert_eq!(fx.html(host), "<p>Hello Ada!</p>");

            fx.set("name", Value::from("Grace"));
            assert_eq!(fx.tick(), 1);
            assert_eq!(fx.html(host), "<p>Hello Grace!</p>");
            assert_eq!(fx.tick(), 0);
        }

        #[test]
        fn should_render_nullish_as_empty() {
            let fx = fixture();
            let (host, _) = fx.render("<p>[{{ missing }}]</p>");
            assert_eq!(fx.html(host), "<p>[]</p>");
        }

        #[test]
        fn should_interpolate_attributes() {
            let fx = fixture();
            fx.set("id", Value::from(7));
            let (host, _) = fx.render("<a href=\"/users/{{ id }}\">x</a>");
            let a = fx.find(host, "a");
            assert_eq!(fx.dom.attribute(a, "href").as_deref(), Some("/users/7"));

            fx.set("id", Value::from(8));
            fx.tick();
            assert_eq!(fx.dom.attribute(a, "href").as_deref(), Some("/users/8"));
        }

        #[test]
        fn should_use_builtin_filters() {
            let fx = fixture();
            fx.set("name", Value::from("Ada"));
            let (host, _) = fx.render("<p>{{ name | uppercase }} {{ name | lowercase }}</p>");
            assert_eq!(fx.html(host), "<p>ADA ada</p>");
        }

        #[test]
        fn should_fail_on_unknown_filter() {
            let fx = fixture();
            let host = fx.dom.create_element("main");
            let err = fx.app.compile_fragment(host, "{{ a | nope }}").unwrap_err();
            assert!(matches!(
                err,
                FrameworkError::Eval(EvalError::UnknownFilter { ref name }) if name == "nope"
            ));
        }

        #[test]
        fn should_report_parse_errors() {
            let fx = fixture();
            let host = fx.dom.create_element("main");
            let err = fx.app.compile_fragment(host, "{{ a + }}").unwrap_err();
            assert!(matches!(err, FrameworkError::Parse(_)));
        }

        #[test]
        fn should_not_render_unterminated_strings_as_text() {
            let fx = fixture();
            let host = fx.dom.create_element("main");
            let err = fx
                .app
                .compile_fragment(host, "<p>Hello {{ 'abc }}</p>")
                .unwrap_err();
            match err {
                FrameworkError::Parse(e) => assert!(e.message.contains("Unterminated quote")),
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    mod properties {
        use super::*;

        #[test]
        fn should_bind_dom_properties() {
            let fx = fixture();
            fx.set("name", Value::from("ada"));
            let (host, _) = fx.render("<input [value]=\"name\">");
            let input = fx.find(host, "input");
            assert_eq!(fx.dom.property(input, "value"), Some(Value::from("ada")));
            assert_eq!(fx.dom.attribute(input, "[value]"), None);
        }

        #[test]
        fn should_toggle_single_classes() {
            let fx = fixture();
            fx.set("on", Value::Bool(true));
            let (host, _) = fx.render("<li class=\"item\" [class.active]=\"on\">x</li>");
            let li = fx.find(host, "li");
            assert!(fx.dom.has_class(li, "active"));
            assert!(fx.dom.has_class(li, "item"));

            fx.set("on", Value::Bool(false));
            fx.tick();
            assert!(!fx.dom.has_class(li, "active"));
            assert!(fx.dom.has_class(li, "item"));
        }

        #[test]
        fn should_replace_the_class_list() {
            let fx = fixture();
            fx.set(
                "classes",
                Value::array(vec![Value::from("a"), Value::from("b")]),
            );
            let (host, _) = fx.render("<div [class]=\"classes\"></div>");
            assert_eq!(fx.html(host), "<div class=\"a b\"></div>");
        }

        #[test]
        fn should_set_and_remove_styles() {
            let fx = fixture();
            fx.set("w", Value::from("10px"));
            let (host, _) = fx.render("<div [style.width]=\"w\"></div>");
            let div = fx.find(host, "div");
            assert_eq!(fx.dom.style(div, "width").as_deref(), Some("10px"));

            fx.set("w", Value::Null);
            fx.tick();
            assert_eq!(fx.dom.style(div, "width"), None);
        }

        #[test]
        fn should_set_and_remove_attributes() {
            let fx = fixture();
            fx.set("label", Value::from("Close"));
            let (host, _) = fx.render("<button [attr.aria-label]=\"label\"></button>");
            let button = fx.find(host, "button");
            assert_eq!(
                fx.dom.attribute(button, "aria-label").as_deref(),
                Some("Close")
            );

            fx.set("label", Value::Bool(false));
            fx.tick();
            assert_eq!(fx.dom.attribute(button, "aria-label"), None);
        }

        #[test]
        fn should_bind_text_content() {
            let fx = fixture();
            fx.set("msg", Value::from("<b>"));
            let (host, _) = fx.render("<p [textContent]=\"msg\">old</p>");
            assert_eq!(fx.html(host), "<p>&lt;b&gt;</p>");
        }

        #[test]
        fn should_reject_invalid_property_paths() {
            let fx = fixture();
            let host = fx.dom.create_element("main");
            let err = fx
                .app
                .compile_fragment(host, "<p [attr]=\"x\"></p>")
                .unwrap_err();
            assert!(matches!(
                err,
                FrameworkError::Definition(DefinitionError::InvalidPropertyPath { ref path, .. })
                    if path == "attr"
            ));

            let err = fx
                .app
                .compile_fragment(host, "<p [title.x]=\"x\"></p>")
                .unwrap_err();
            assert!(matches!(
                err,
                FrameworkError::Definition(DefinitionError::InvalidPropertyPath { .. })
            ));
        }
    }

    mod events {
        use super::*;

        #[test]
        fn should_pass_the_event_detail_and_tick() {
            let fx = fixture();
            let sink = Rc::new(RefCell::new(Vec::new()));
            fx.set("record", recorder(&sink));
            fx.set("clicks", Value::from(0));

            let scope = Rc::downgrade(fx.app.scope());
            fx.set(
                "hit",
                Value::function("hit", move |_| {
                    if let Some(scope) = scope.upgrade() {
                        let next = scope.get("clicks").map_or(0.0, |v| v.to_number()) + 1.0;
                        scope.set("clicks", Value::from(next));
                    }
                    Ok(Value::Undefined)
                }),
            );

            let (host, _) = fx.render(
                "<button (click)=\"hit()\" (ping)=\"record($event)\">{{ clicks }}</button>",
            );
            let button = fx.find(host, "button");
            assert_eq!(fx.html(host), "<button>0</button>");

            assert_eq!(fx.click(button), 1);
            assert_eq!(fx.html(host), "<button>1</button>");

            fx.dom
                .dispatch_event(button, "ping", Value::from("payload"))
                .unwrap();
            assert_eq!(*sink.borrow(), vec![Value::from("payload")]);
        }

        #[test]
        fn should_honor_a_configured_event_local() {
            let fx = fixture_with(|builder| {
                builder.config(FrameworkConfig {
                    event_local: "evt".to_string(),
                    ..FrameworkConfig::default()
                })
            });
            let sink = Rc::new(RefCell::new(Vec::new()));
            fx.set("record", recorder(&sink));
            let (host, _) = fx.render("<input (change)=\"record(evt)\">");

            fx.dom
                .dispatch_event(fx.find(host, "input"), "change", Value::from(3))
                .unwrap();
            assert_eq!(*sink.borrow(), vec![Value::from(3)]);
        }

        #[test]
        fn should_propagate_handler_errors() {
            let fx = fixture();
            let (host, _) = fx.render("<button (click)=\"missing()\"></button>");
            let err = fx
                .dom
                .dispatch_event(fx.find(host, "button"), "click", Value::Null)
                .unwrap_err();
            assert!(matches!(err, EvalError::NotCallable { .. }));
        }
    }

    mod directives {
        use super::*;

        fn highlight_fixture() -> Fixture {
            fixture_with(|builder| builder.directive(DirectiveType::of::<Highlight>()))
        }

        #[test]
        fn should_attach_and_initialize() {
            let fx = highlight_fixture();
            fx.set("color", Value::from("yellow"));
            let (host, fragment) = fx.render("<p highlight=\"{{ color }}\">Hi</p>");
            let p = fx.find(host, "p");

            assert_eq!(fx.dom.style(p, "background").as_deref(), Some("yellow"));
            assert_eq!(
                fx.dom.attribute(p, "data-highlighted").as_deref(),
                Some("yes")
            );
            assert_eq!(fx.log.entries(), vec!["highlight:highlight=yellow", "highlight:init"]);
            assert_eq!(fragment.directives().len(), 1);
            assert!(fragment.children().is_empty());
        }

        #[test]
        fn should_forward_input_changes() {
            let fx = highlight_fixture();
            fx.set("color", Value::from("yellow"));
            let (host, _) = fx.render("<p highlight=\"{{ color }}\">Hi</p>");
            fx.log.clear();

            fx.set("color", Value::from("red"));
            fx.tick();
            assert_eq!(fx.log.entries(), vec!["highlight:highlight=red"]);
            assert_eq!(
                fx.dom.style(fx.find(host, "p"), "background").as_deref(),
                Some("red")
            );
        }

        #[test]
        fn should_call_host_listeners() {
            let fx = highlight_fixture();
            let (host, fragment) = fx.render("<p highlight=\"blue\">Hi</p>");
            fx.log.clear();

            let p = fx.find(host, "p");
            assert_eq!(fx.dom.dispatch_event(p, "mouseenter", Value::Null).unwrap(), 1);
            assert_eq!(fx.log.entries(), vec!["highlight:enter"]);
            assert_eq!(fragment.listener_count(), 1);
        }

        #[test]
        fn should_not_match_other_elements() {
            let fx = highlight_fixture();
            let (host, _) = fx.render("<p>plain</p>");
            assert_eq!(fx.html(host), "<p>plain</p>");
            assert!(fx.log.entries().is_empty());
        }

        #[test]
        fn should_attach_every_matching_directive_in_order() {
            let fx = fixture_with(|builder| {
                builder
                    .directive(DirectiveType::of::<Highlight>())
                    .directive(DirectiveType::of::<Tracker>())
            });
            let (_, fragment) = fx.render("<p tracked=\"x\" highlight=\"gold\">Hi</p>");

            assert_eq!(
                fx.log.entries(),
                vec![
                    "highlight:highlight=gold",
                    "highlight:init",
                    "tracker:tracked=x",
                    "tracker:init",
                ]
            );
            let classes: Vec<String> = fragment
                .directives()
                .iter()
                .map(|d| d.definition.class_name.to_string())
                .collect();
            assert_eq!(classes, vec!["Highlight", "Tracker"]);
        }

        #[test]
        fn should_follow_registration_order_not_attribute_order() {
            let fx = fixture_with(|builder| {
                builder
                    .directive(DirectiveType::of::<Tracker>())
                    .directive(DirectiveType::of::<Highlight>())
            });
            let (_, fragment) = fx.render("<p highlight=\"gold\" tracked=\"x\">Hi</p>");

            assert_eq!(fx.log.entries()[0], "tracker:tracked=x");
            assert_eq!(fx.log.entries()[3], "highlight:init");
            assert_eq!(fragment.directives().len(), 2);
            assert_eq!(fragment.directives()[0].definition.class_name, "Tracker");
        }

        #[test]
        fn should_require_declared_inputs() {
            let fx = fixture_with(|builder| builder.directive(DirectiveType::of::<NeedsValue>()));
            let host = fx.dom.create_element("main");
            let err = fx
                .app
                .compile_fragment(host, "<div needs-value></div>")
                .unwrap_err();
            match err {
                FrameworkError::Definition(DefinitionError::MissingRequiredInput {
                    class,
                    input,
                    element,
                }) => {
                    assert_eq!(class, "NeedsValue");
                    assert_eq!(input, "value");
                    assert_eq!(element, "div");
                }
                other => panic!("unexpected error: {}", other),
            }

            assert!(fx
                .app
                .compile_fragment(host, "<div needs-value value=\"1\"></div>")
                .is_ok());
        }
    }

    mod components {
        use super::*;

        fn counter_fixture() -> Fixture {
            fixture_with(|builder| builder.directive(DirectiveType::of::<Counter>()))
        }

        #[test]
        fn should_render_into_the_host() {
            let fx = counter_fixture();
            fx.set("initial", Value::from(5));
            let (host, fragment) =
                fx.render("<x-counter label=\"Clicks\" [start]=\"initial\"></x-counter>");

            assert_eq!(
                fx.html(host),
                "<x-counter label=\"Clicks\"><span>Clicks: 5</span><button>+</button></x-counter>"
            );
            let children = fragment.children();
            assert_eq!(children.len(), 1);
            assert_eq!(children[0].kind(), TemplateKind::Component);
            assert_eq!(children[0].name(), "Counter");
            assert!(children[0].component().is_some());
            assert_eq!(
                fx.log.entries(),
                vec!["counter:label=Clicks", "counter:start=5", "counter:init:5"]
            );
        }

        #[test]
        fn should_replace_existing_host_content() {
            let fx = counter_fixture();
            let (host, _) = fx.render("<x-counter label=\"n\"><i>stale</i></x-counter>");
            assert_eq!(
                fx.html(host),
                "<x-counter label=\"n\"><span>n: 0</span><button>+</button></x-counter>"
            );
        }

        #[test]
        fn should_emit_outputs_to_the_parent() {
            let fx = counter_fixture();
            let sink = Rc::new(RefCell::new(Vec::new()));
            fx.set("record", recorder(&sink));
            fx.set("initial", Value::from(5));
            let (host, _) = fx.render(
                "<x-counter label=\"Clicks\" [start]=\"initial\" (changed)=\"record($event)\"></x-counter>",
            );

            fx.click(fx.find(host, "button"));
            assert_eq!(*sink.borrow(), vec![Value::from(6)]);
            assert_eq!(fx.dom.text(fx.find(host, "span")), "Clicks: 6");
        }

        #[test]
        fn should_push_parent_changes_into_inputs() {
            let fx = counter_fixture();
            fx.set("initial", Value::from(1));
            let (_, fragment) = fx.render("<x-counter label=\"c\" [start]=\"initial\"></x-counter>");
            fx.log.clear();

            fx.set("initial", Value::from(10));
            fx.tick();
            assert_eq!(fx.log.entries(), vec!["counter:start=10"]);
            assert_eq!(
                fragment.children()[0].scope().get_own("start"),
                Some(Value::from(10))
            );
        }

        #[test]
        fn should_keep_inputs_under_the_controller_alias() {
            let fx = fixture_with(|builder| builder.directive(DirectiveType::of::<Panel>()));
            fx.set("t", Value::from("One"));
            let (host, fragment) = fx.render("<x-panel [title]=\"t\"></x-panel>");
            assert_eq!(fx.html(host), "<x-panel><h3>One</h3></x-panel>");

            let panel = &fragment.children()[0];
            assert_eq!(panel.scope().get_own("title"), None);

            fx.set("t", Value::from("Two"));
            fx.tick();
            assert_eq!(fx.html(host), "<x-panel><h3>Two</h3></x-panel>");
        }

        #[test]
        fn should_skip_manual_components_until_asked() {
            let fx = fixture_with(|builder| builder.directive(DirectiveType::of::<Badge>()));
            fx.set("v", Value::from(1));
            let (host, fragment) = fx.render("<x-badge [value]=\"v\"></x-badge>");
            assert_eq!(fx.html(host), "<x-badge><b>1</b></x-badge>");

            fx.set("v", Value::from(2));
            fx.tick();
            assert_eq!(fx.html(host), "<x-badge><b>1</b></x-badge>");

            let badge = &fragment.children()[0];
            assert_eq!(badge.detect_changes().unwrap(), 1);
            assert_eq!(fx.html(host), "<x-badge><b>2</b></x-badge>");
        }

        #[test]
        fn should_resolve_component_filters_first() {
            let fx = fixture_with(|builder| {
                text_filters(builder).directive(DirectiveType::of::<Shouter>())
            });
            let (host, _) = fx.render("<b>{{ 'x' | upper }}</b><x-shout></x-shout>");
            assert_eq!(fx.html(host), "<b>X</b><x-shout><i>X!</i></x-shout>");
        }

        #[test]
        fn should_reject_two_components_on_one_element() {
            let fx = fixture_with(|builder| {
                builder
                    .directive(DirectiveType::of::<Counter>())
                    .directive(DirectiveType::of::<Rival>())
            });
            let host = fx.dom.create_element("main");
            let err = fx
                .app
                .compile_fragment(host, "<x-counter label=\"a\"></x-counter>")
                .unwrap_err();
            match err {
                FrameworkError::Definition(DefinitionError::MultipleComponents {
                    element,
                    first,
                    second,
                }) => {
                    assert_eq!(element, "x-counter");
                    assert_eq!(first, "Counter");
                    assert_eq!(second, "Rival");
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        #[test]
        fn should_bootstrap_a_root_component() {
            let fx = fixture();
            let host = fx.dom.create_element("x-counter");
            fx.dom.set_attribute(host, "label", "Boot");
            let component = fx.app.bootstrap::<Counter>(host).unwrap();

            assert_eq!(component.name(), "Counter");
            assert!(Rc::ptr_eq(&fx.app.component_template().unwrap(), &component));
            assert_eq!(fx.dom.text(fx.find(host, "span")), "Boot: 0");
        }

        #[test]
        fn should_not_bootstrap_plain_directives() {
            let fx = fixture();
            let host = fx.dom.create_element("p");
            let err = fx.app.bootstrap::<Highlight>(host).unwrap_err();
            assert!(matches!(
                err,
                FrameworkError::Definition(DefinitionError::MissingTemplate { .. })
            ));
        }
    }

    mod extensions {
        use super::*;

        #[test]
        fn should_contribute_filters_directives_and_services() {
            let fx = fixture_with(|builder| builder.extension(Rc::new(LabelExtension)));
            let (host, _) = fx.render("<x-labelled></x-labelled>");
            assert_eq!(fx.html(host), "<x-labelled><em>Labelled!</em></x-labelled>");
        }

        #[test]
        fn should_let_application_filters_shadow_extension_filters() {
            let fx = fixture_with(|builder| {
                builder
                    .extension(Rc::new(LabelExtension))
                    .filter(FilterRegistration::new("exclaim", |input, _| {
                        Ok(Value::from(format!("{}?", input.render_text())))
                    }))
            });
            let (host, _) = fx.render("<x-labelled></x-labelled>");
            assert_eq!(fx.html(host), "<x-labelled><em>Labelled?</em></x-labelled>");
        }
    }
}

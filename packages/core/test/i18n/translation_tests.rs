/**
 * Translation Tests
 *
 * Plural rule selection, dotted key lookup, placeholder substitution and
 * the translate filter resolving through the template tree
 */

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use serde_json::{json, Value as Json};
    use std::rc::Rc;
    use trellis_core::di::{DiError, Injectable, Resolver};
    use trellis_core::dom::{Dom, MemoryDom, NodeId};
    use trellis_core::i18n::{find_in_tree, PluralRules, Translation, TranslationSource, Translator};
    use trellis_core::metadata::{Annotation, ComponentAnnotation, DirectiveClass, DirectiveType};
    use trellis_core::template::{Application, Directive};
    use trellis_core::{EvalError, FrameworkError, Value};

    fn polish(n: i64) -> usize {
        if n == 1 {
            0
        } else if (2..=4).contains(&(n % 10)) && !(12..=14).contains(&(n % 100)) {
            1
        } else {
            2
        }
    }

    struct Trees(IndexMap<String, Json>);

    impl Trees {
        fn new(entries: &[(&str, Json)]) -> Self {
            Trees(
                entries
                    .iter()
                    .map(|(locale, tree)| (locale.to_string(), tree.clone()))
                    .collect(),
            )
        }
    }

    impl TranslationSource for Trees {
        fn find_translation(&self, locale: &str, key: &str) -> Option<Json> {
            self.0
                .get(locale)
                .and_then(|tree| find_in_tree(tree, key))
                .cloned()
        }
    }

    fn params(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    mod plural_rules {
        use super::*;

        #[test]
        fn should_fall_back_to_two_forms() {
            let rules = PluralRules::new();
            assert_eq!(rules.select("en", 1), 0);
            assert_eq!(rules.select("en", 0), 1);
            assert_eq!(rules.select("en", 7), 1);
            assert!(!rules.has("en"));
        }

        #[test]
        fn should_use_registered_rules() {
            let rules = PluralRules::new().with("pl", polish);
            assert!(rules.has("pl"));
            assert_eq!(rules.select("pl", 1), 0);
            assert_eq!(rules.select("pl", 3), 1);
            assert_eq!(rules.select("pl", 13), 2);
            assert_eq!(rules.select("pl", 25), 2);
        }

        #[test]
        fn should_match_by_language() {
            let mut rules = PluralRules::new();
            rules.register("PT", |n| if n <= 1 { 0 } else { 1 });
            assert!(rules.has("pt-BR"));
            assert!(rules.has("pt_pt"));
            assert_eq!(rules.select("pt-BR", 0), 0);
            assert!(!rules.has("es-ES"));
        }
    }

    mod lookup {
        use super::*;

        #[test]
        fn should_descend_dotted_keys() {
            let tree = json!({"menu": {"file": {"open": "Open"}}});
            assert_eq!(find_in_tree(&tree, "menu.file.open"), Some(&json!("Open")));
            assert_eq!(find_in_tree(&tree, "menu.file.close"), None);
            assert_eq!(find_in_tree(&tree, "menu.file"), Some(&json!({"open": "Open"})));
        }

        #[test]
        fn should_prefer_verbatim_keys() {
            let tree = json!({"a.b": "flat", "a": {"b": "nested"}});
            assert_eq!(find_in_tree(&tree, "a.b"), Some(&json!("flat")));

            let tree = json!({"errors": {"not.found": "Missing"}});
            assert_eq!(find_in_tree(&tree, "errors.not.found"), Some(&json!("Missing")));
        }

        #[test]
        fn should_classify_leaves() {
            assert_eq!(
                Translation::from_json(&json!("x")),
                Some(Translation::Text("x".to_string()))
            );
            assert_eq!(
                Translation::from_json(&json!(["one", "many"])),
                Some(Translation::Plural(vec!["one".to_string(), "many".to_string()]))
            );
            assert_eq!(Translation::from_json(&json!({"a": "b"})), None);
            assert_eq!(Translation::from_json(&Json::Null), None);
        }
    }

    mod translator {
        use super::*;

        fn source() -> Trees {
            Trees::new(&[
                (
                    "en",
                    json!({
                        "greeting": "Hello %name%",
                        "files": ["one file", "%count% files"],
                        "empty": [],
                    }),
                ),
                ("pl", json!({"files": ["%count% plik", "%count% pliki", "%count% plików"]})),
            ])
        }

        #[test]
        fn should_substitute_params() {
            let translator = Translator::default();
            assert_eq!(
                translator.translate(&source(), "en", "greeting", None, &params(&[("name", "Ada")])),
                "Hello Ada"
            );
            assert_eq!(
                translator.translate(&source(), "en", "greeting", None, &IndexMap::new()),
                "Hello %name%"
            );
        }

        #[test]
        fn should_pick_plural_forms() {
            let translator = Translator::default();
            let none = IndexMap::new();
            assert_eq!(translator.translate(&source(), "en", "files", Some(1), &none), "one file");
            assert_eq!(translator.translate(&source(), "en", "files", Some(4), &none), "4 files");
            assert_eq!(translator.translate(&source(), "en", "files", None, &none), "one file");
        }

        #[test]
        fn should_clamp_the_plural_index() {
            let translator = Translator::new(PluralRules::new().with("en", |_| 9));
            assert_eq!(
                translator.translate(&source(), "en", "files", Some(2), &IndexMap::new()),
                "2 files"
            );
        }

        #[test]
        fn should_use_the_locale_rule() {
            let translator = Translator::new(PluralRules::new().with("pl", polish));
            let none = IndexMap::new();
            assert_eq!(translator.translate(&source(), "pl", "files", Some(1), &none), "1 plik");
            assert_eq!(translator.translate(&source(), "pl", "files", Some(3), &none), "3 pliki");
            assert_eq!(translator.translate(&source(), "pl", "files", Some(5), &none), "5 plików");
        }

        #[test]
        fn should_return_the_message_when_missing() {
            let translator = Translator::default();
            let none = IndexMap::new();
            assert_eq!(translator.translate(&source(), "en", "nope", None, &none), "nope");
            assert_eq!(translator.translate(&source(), "fr", "greeting", None, &none), "greeting");
            assert_eq!(translator.translate(&source(), "en", "empty", Some(2), &none), "empty");
            assert_eq!(
                translator.translate(&source(), "de", "Hi %name%", None, &params(&[("name", "Bo")])),
                "Hi Bo"
            );
        }
    }

    mod templates {
        use super::*;

        /// `<x-welcome>` with its own English greeting
        struct Welcome;

        impl Injectable for Welcome {
            fn create(_resolver: &Resolver<'_>) -> Result<Self, DiError> {
                Ok(Welcome)
            }
        }

        impl Directive for Welcome {}

        impl DirectiveClass for Welcome {
            fn annotations() -> Vec<Annotation> {
                vec![Annotation::Component(
                    ComponentAnnotation::new(
                        "x-welcome",
                        "<h1>{{ 'greeting' | translate : null : {name: who} }}</h1>\
                         <p>{{ 'menu.open' | translate }}</p>",
                    )
                    .translations("en", json!({"greeting": "Welcome, %name%"})),
                )]
            }
        }

        fn app() -> (Rc<MemoryDom>, Application) {
            let dom = Rc::new(MemoryDom::new());
            let app = Application::builder(dom.clone())
                .translations(
                    "en",
                    json!({
                        "greeting": "Hello %name%",
                        "items": ["one item", "%count% items"],
                        "menu": {"open": "Open"},
                    }),
                )
                .translations("fr", json!({"greeting": "Bonjour %name%"}))
                .directive(DirectiveType::of::<Welcome>())
                .build()
                .unwrap();
            app.scope().set("who", Value::from("Ada"));
            (dom, app)
        }

        fn render(dom: &MemoryDom, app: &Application, markup: &str) -> NodeId {
            let host = dom.create_element("main");
            app.compile_fragment(host, markup).unwrap();
            host
        }

        #[test]
        fn should_translate_with_params() {
            let (dom, app) = app();
            let host = render(&dom, &app, "<p>{{ 'greeting' | translate : null : {name: who} }}</p>");
            assert_eq!(dom.inner_html(host), "<p>Hello Ada</p>");
        }

        #[test]
        fn should_translate_plurals() {
            let (dom, app) = app();
            app.scope().set("n", Value::from(1));
            let host = render(&dom, &app, "<p>{{ 'items' | translate : n }}</p>");
            assert_eq!(dom.inner_html(host), "<p>one item</p>");

            app.scope().set("n", Value::from(3));
            app.tick().unwrap();
            assert_eq!(dom.inner_html(host), "<p>3 items</p>");
        }

        #[test]
        fn should_rerender_on_locale_change() {
            let (dom, app) = app();
            assert_eq!(app.locale(), "en");
            let host = render(&dom, &app, "<p>{{ 'greeting' | translate : null : {name: who} }}</p>");

            app.set_locale("fr").unwrap();
            assert_eq!(app.locale(), "fr");
            assert_eq!(dom.inner_html(host), "<p>Bonjour Ada</p>");
        }

        #[test]
        fn should_shadow_root_translations_in_components() {
            let (dom, app) = app();
            let host = render(&dom, &app, "<x-welcome></x-welcome>");
            assert_eq!(
                dom.inner_html(host),
                "<x-welcome><h1>Welcome, Ada</h1><p>Open</p></x-welcome>"
            );

            app.set_locale("fr").unwrap();
            assert_eq!(
                dom.inner_html(host),
                "<x-welcome><h1>Bonjour Ada</h1><p>menu.open</p></x-welcome>"
            );
        }

        #[test]
        fn should_reject_non_numeric_counts() {
            let (dom, app) = app();
            let host = dom.create_element("main");
            let err = app
                .compile_fragment(host, "{{ 'items' | translate : 'abc' }}")
                .unwrap_err();
            assert!(matches!(
                err,
                FrameworkError::Eval(EvalError::Filter { ref name, .. }) if name == "translate"
            ));
        }

        #[test]
        fn should_translate_from_templates_directly() {
            let (_, app) = app();
            let none = IndexMap::new();
            assert_eq!(app.root().translate("menu.open", None, &none), "Open");
            assert_eq!(app.root().translate("items", Some(2), &none), "2 items");
        }
    }
}

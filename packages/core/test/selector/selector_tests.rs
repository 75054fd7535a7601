/**
 * Selector Tests
 *
 * Directive selector parsing and matching against DOM elements
 */

#[cfg(test)]
mod tests {
    use trellis_core::directive_matching::{matches_any, query_selector_all, CssSelector};
    use trellis_core::dom::{Dom, MemoryDom, NodeId};

    fn parse_one(selector: &str) -> CssSelector {
        let mut selectors = CssSelector::parse(selector)
            .unwrap_or_else(|e| panic!("failed to parse [{}]: {}", selector, e));
        assert_eq!(selectors.len(), 1, "expected a single selector in [{}]", selector);
        selectors.remove(0)
    }

    fn element(dom: &MemoryDom, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let node = dom.create_element(tag);
        for (name, value) in attributes {
            dom.set_attribute(node, name, value);
        }
        node
    }

    fn matches(selector: &str, dom: &MemoryDom, node: NodeId) -> bool {
        let selectors = CssSelector::parse(selector).unwrap();
        matches_any(&selectors, dom, node)
    }

    mod parsing {
        use super::*;

        #[test]
        fn should_parse_compound_selectors() {
            let selector = parse_one("div.a[b=c]:not(.d)");
            assert_eq!(selector.element.as_deref(), Some("div"));
            assert_eq!(selector.class_names, vec!["a"]);
            assert_eq!(selector.attrs, vec![("b".to_string(), "c".to_string())]);
            assert_eq!(selector.not_selectors.len(), 1);
            assert_eq!(selector.not_selectors[0].class_names, vec!["d"]);
            assert_eq!(selector.to_string(), "div.a[b=c]:not(.d)");
        }

        #[test]
        fn should_parse_ids_as_attributes() {
            let selector = parse_one("#main");
            assert_eq!(selector.attrs, vec![("id".to_string(), "main".to_string())]);
        }

        #[test]
        fn should_accept_quoted_attribute_values() {
            assert_eq!(parse_one("[type=\"text\"]").attrs[0].1, "text");
            assert_eq!(parse_one("[type='text']").attrs[0].1, "text");
            assert_eq!(parse_one("[type]").attrs[0].1, "");
        }

        #[test]
        fn should_split_selector_lists() {
            let selectors = CssSelector::parse("my-button, [my-button], .btn").unwrap();
            assert_eq!(selectors.len(), 3);
            assert_eq!(selectors[0].element.as_deref(), Some("my-button"));
            assert_eq!(selectors[1].attrs[0].0, "my-button");
            assert_eq!(selectors[2].class_names, vec!["btn"]);
        }

        #[test]
        fn should_default_bare_not_to_any_element() {
            assert_eq!(parse_one(":not(.hidden)").element.as_deref(), Some("*"));
        }

        #[test]
        fn should_lowercase_tags_and_classes() {
            let selector = parse_one("DIV.Big");
            assert_eq!(selector.element.as_deref(), Some("div"));
            assert_eq!(selector.class_names, vec!["big"]);
        }

        #[test]
        fn should_reject_malformed_selectors() {
            assert!(CssSelector::parse("").is_err());
            assert!(CssSelector::parse("   ").is_err());
            assert!(CssSelector::parse(":not(:not(a))").is_err());
            assert!(CssSelector::parse("a)").is_err());
            assert!(CssSelector::parse(":not(a").is_err());
            assert!(CssSelector::parse(":not(a, b)").is_err());
            assert!(CssSelector::parse("div > p").is_err());
        }
    }

    mod matching {
        use super::*;

        #[test]
        fn should_match_tags_classes_and_attributes() {
            let dom = MemoryDom::new();
            let node = element(&dom, "button", &[("class", "btn primary"), ("type", "submit")]);

            assert!(matches("button", &dom, node));
            assert!(matches(".btn.primary", &dom, node));
            assert!(matches("[type]", &dom, node));
            assert!(matches("[type=submit]", &dom, node));
            assert!(matches("button.btn[type=submit]", &dom, node));

            assert!(!matches("a", &dom, node));
            assert!(!matches(".secondary", &dom, node));
            assert!(!matches("[type=reset]", &dom, node));
            assert!(!matches("[disabled]", &dom, node));
        }

        #[test]
        fn should_compare_attribute_values_case_insensitively() {
            let dom = MemoryDom::new();
            let node = element(&dom, "input", &[("type", "TEXT")]);
            assert!(matches("[type=text]", &dom, node));
            assert!(matches("[type=Text]", &dom, node));
        }

        #[test]
        fn should_apply_negation() {
            let dom = MemoryDom::new();
            let plain = element(&dom, "div", &[]);
            let hidden = element(&dom, "div", &[("class", "hidden")]);
            assert!(matches("div:not(.hidden)", &dom, plain));
            assert!(!matches("div:not(.hidden)", &dom, hidden));
            assert!(matches(":not(span)", &dom, plain));
        }

        #[test]
        fn should_match_any_selector_of_a_list() {
            let dom = MemoryDom::new();
            let node = element(&dom, "span", &[("tooltip", "")]);
            assert!(matches("div, [tooltip]", &dom, node));
        }

        #[test]
        fn should_see_bracketed_binding_names() {
            let dom = MemoryDom::new();
            let node = element(&dom, "div", &[("[tooltip]", "message"), ("(click)", "go()")]);
            assert!(matches("[tooltip]", &dom, node));
            assert!(!matches("[tooltip=message]", &dom, node));
            assert!(!matches("[click]", &dom, node));
        }

        #[test]
        fn should_never_match_text_nodes() {
            let dom = MemoryDom::new();
            let text = dom.create_text("div");
            assert!(!matches("*", &dom, text));
        }

        #[test]
        fn should_query_descendants_in_document_order() {
            let dom = MemoryDom::new();
            let root = dom.create_fragment();
            let outer = element(&dom, "section", &[("class", "x")]);
            let inner = element(&dom, "p", &[("class", "x")]);
            let other = element(&dom, "p", &[]);
            let last = element(&dom, "div", &[("class", "x")]);
            dom.append_child(root, outer);
            dom.append_child(outer, inner);
            dom.append_child(outer, other);
            dom.append_child(root, last);

            let selectors = CssSelector::parse(".x").unwrap();
            assert_eq!(query_selector_all(&dom, root, &selectors), vec![outer, inner, last]);
        }
    }
}

//! Directive Matching - CSS Selector Matching
//!
//! Parses directive selectors and matches them against DOM elements

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{Dom, NodeId, NodeKind};

/// Regex for parsing CSS selectors
static SELECTOR_REGEXP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\:not\()|(([\.\#]?)[-\w]+)|(?:\[([-.\w*\\$]+)(?:=(?:"([^"]*)"|'([^']*)'|([^\]]*)))?\])|(\))|(\s*,\s*)"#)
        .expect("valid selector pattern")
});

/// Match groups in the selector regex
#[derive(Debug, Clone, Copy)]
enum SelectorRegexp {
    Not = 1,
    Tag = 2,
    Prefix = 3,
    Attribute = 4,
    AttributeValueDouble = 5,
    AttributeValueSingle = 6,
    AttributeValueUnquoted = 7,
    NotEnd = 8,
    Separator = 9,
}

/// One compound selector (`div.a[b=c]:not(.d)`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CssSelector {
    pub element: Option<String>,
    pub class_names: Vec<String>,
    /// (name, value) pairs; an empty value matches any value
    pub attrs: Vec<(String, String)>,
    pub not_selectors: Vec<CssSelector>,
}

impl CssSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma separated selector list
    pub fn parse(selector: &str) -> Result<Vec<CssSelector>, String> {
        if selector.trim().is_empty() {
            return Err("Empty selector".to_string());
        }

        let mut results = Vec::new();
        let mut css_selector = CssSelector::new();
        let mut in_not = false;
        let mut consumed = 0;

        for cap in SELECTOR_REGEXP.captures_iter(selector) {
            if let Some(whole) = cap.get(0) {
                let skipped = &selector[consumed..whole.start()];
                if !skipped.trim().is_empty() {
                    return Err(format!("Unexpected '{}' in selector", skipped.trim()));
                }
                consumed = whole.end();
            }

            if cap.get(SelectorRegexp::Not as usize).is_some() {
                if in_not {
                    return Err("Nesting :not in a selector is not allowed".to_string());
                }
                in_not = true;
                css_selector.not_selectors.push(CssSelector::new());
            }

            let current = if in_not {
                match css_selector.not_selectors.last_mut() {
                    Some(not) => not,
                    None => return Err("Unbalanced :not in selector".to_string()),
                }
            } else {
                &mut css_selector
            };

            if let Some(tag_match) = cap.get(SelectorRegexp::Tag as usize) {
                let tag = tag_match.as_str();
                let prefix = cap
                    .get(SelectorRegexp::Prefix as usize)
                    .map(|m| m.as_str())
                    .unwrap_or("");

                match prefix {
                    "#" => current.add_attribute("id", &tag[1..]),
                    "." => current.add_class_name(&tag[1..]),
                    _ => current.set_element(tag),
                }
            }

            if let Some(attr_match) = cap.get(SelectorRegexp::Attribute as usize) {
                let value = [
                    SelectorRegexp::AttributeValueDouble,
                    SelectorRegexp::AttributeValueSingle,
                    SelectorRegexp::AttributeValueUnquoted,
                ]
                .iter()
                .find_map(|group| cap.get(*group as usize))
                .map(|m| m.as_str())
                .unwrap_or("");
                current.add_attribute(&attr_match.as_str().replace('\\', ""), value);
            }

            if cap.get(SelectorRegexp::NotEnd as usize).is_some() {
                if !in_not {
                    return Err("Unbalanced ')' in selector".to_string());
                }
                in_not = false;
            }

            if cap.get(SelectorRegexp::Separator as usize).is_some() {
                if in_not {
                    return Err("Multiple selectors in :not are not supported".to_string());
                }
                Self::add_result(&mut results, css_selector);
                css_selector = CssSelector::new();
            }
        }

        if !selector[consumed..].trim().is_empty() {
            return Err(format!(
                "Unexpected '{}' in selector",
                selector[consumed..].trim()
            ));
        }
        if in_not {
            return Err("Unterminated :not in selector".to_string());
        }

        Self::add_result(&mut results, css_selector);
        Ok(results)
    }

    fn add_result(results: &mut Vec<CssSelector>, mut css_sel: CssSelector) {
        if !css_sel.not_selectors.is_empty()
            && css_sel.element.is_none()
            && css_sel.class_names.is_empty()
            && css_sel.attrs.is_empty()
        {
            css_sel.element = Some("*".to_string());
        }
        results.push(css_sel);
    }

    pub fn set_element(&mut self, element: &str) {
        self.element = Some(element.to_ascii_lowercase());
    }

    pub fn add_attribute(&mut self, name: &str, value: &str) {
        self.attrs.push((name.to_string(), value.to_lowercase()));
    }

    pub fn add_class_name(&mut self, name: &str) {
        self.class_names.push(name.to_lowercase());
    }

    /// Whether `node` satisfies this selector
    pub fn matches(&self, dom: &dyn Dom, node: NodeId) -> bool {
        if dom.node_kind(node) != Some(NodeKind::Element) {
            return false;
        }
        let attributes = matchable_attributes(dom, node);
        self.matches_with(dom, node, &attributes)
    }

    fn matches_with(&self, dom: &dyn Dom, node: NodeId, attributes: &[(String, String)]) -> bool {
        if let Some(element) = &self.element {
            if element != "*" && dom.tag_name(node).as_deref() != Some(element.as_str()) {
                return false;
            }
        }

        let classes: Vec<String> = attributes
            .iter()
            .find(|(name, _)| name == "class")
            .map(|(_, value)| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        if !self.class_names.iter().all(|c| classes.contains(c)) {
            return false;
        }

        let attrs_match = self.attrs.iter().all(|(name, value)| {
            attributes
                .iter()
                .any(|(attr, attr_value)| attr == name && (value.is_empty() || attr_value == value))
        });
        if !attrs_match {
            return false;
        }

        !self
            .not_selectors
            .iter()
            .any(|not| not.matches_with(dom, node, attributes))
    }
}

impl std::fmt::Display for CssSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(element) = &self.element {
            write!(f, "{}", element)?;
        }
        for class in &self.class_names {
            write!(f, ".{}", class)?;
        }
        for (name, value) in &self.attrs {
            if value.is_empty() {
                write!(f, "[{}]", name)?;
            } else {
                write!(f, "[{}={}]", name, value)?;
            }
        }
        for not in &self.not_selectors {
            write!(f, ":not({})", not)?;
        }
        Ok(())
    }
}

/// Attribute names as seen by selectors: `[name]` property bindings count as
/// `name` with no value, `(event)` bindings are ignored. Values lowercased.
fn matchable_attributes(dom: &dyn Dom, node: NodeId) -> Vec<(String, String)> {
    dom.attributes(node)
        .into_iter()
        .filter_map(|(name, value)| {
            if name.starts_with('(') {
                None
            } else if let Some(inner) = name.strip_prefix('[').and_then(|n| n.strip_suffix(']')) {
                Some((inner.to_string(), String::new()))
            } else {
                Some((name, value.to_lowercase()))
            }
        })
        .collect()
}

/// Whether any selector of a list matches `node`
pub fn matches_any(selectors: &[CssSelector], dom: &dyn Dom, node: NodeId) -> bool {
    selectors.iter().any(|s| s.matches(dom, node))
}

/// Descendants of `root` matched by `selectors`, in document order
pub fn query_selector_all(dom: &dyn Dom, root: NodeId, selectors: &[CssSelector]) -> Vec<NodeId> {
    dom.descendants(root)
        .into_iter()
        .filter(|node| matches_any(selectors, dom, *node))
        .collect()
}

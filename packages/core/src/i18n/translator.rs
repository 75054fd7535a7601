use super::plural::PluralRules;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value as Json;
use tracing::trace;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_.\-]*)%").expect("valid placeholder pattern"));

/// Something that owns translation trees, such as a template
pub trait TranslationSource {
    /// Translation stored under the dotted `key` for `locale`
    fn find_translation(&self, locale: &str, key: &str) -> Option<Json>;
}

/// Leaf of a translation tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Text(String),
    /// Plural forms, indexed by the locale's plural rule
    Plural(Vec<String>),
}

impl Translation {
    /// `None` for objects and null, which are not leaves
    pub fn from_json(value: &Json) -> Option<Self> {
        match value {
            Json::String(s) => Some(Translation::Text(s.clone())),
            Json::Number(n) => Some(Translation::Text(n.to_string())),
            Json::Bool(b) => Some(Translation::Text(b.to_string())),
            Json::Array(forms) => Some(Translation::Plural(
                forms
                    .iter()
                    .map(|f| match f {
                        Json::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Json::Null | Json::Object(_) => None,
        }
    }
}

/// Resolve a dotted key (`menu.file.open`) in a nested translation tree.
/// A key present verbatim at some level wins over descending into it.
pub fn find_in_tree<'a>(tree: &'a Json, key: &str) -> Option<&'a Json> {
    let map = tree.as_object()?;
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let mut rest = key;
    while let Some(dot) = rest.find('.') {
        let (head, tail) = (&key[..key.len() - rest.len() + dot], &rest[dot + 1..]);
        if let Some(subtree) = map.get(head) {
            if let Some(found) = find_in_tree(subtree, tail) {
                return Some(found);
            }
        }
        rest = tail;
    }
    None
}

#[derive(Debug, Clone, Default)]
pub struct Translator {
    plural_rules: PluralRules,
}

impl Translator {
    pub fn new(plural_rules: PluralRules) -> Self {
        Translator { plural_rules }
    }

    pub fn plural_rules(&self) -> &PluralRules {
        &self.plural_rules
    }

    /// Translate `message` for `locale`.
    ///
    /// A missing translation yields the message itself. Plural forms are
    /// picked by `count` (first form without a count). `%name%` placeholders
    /// are replaced from `params`, `%count%` from `count`; unknown
    /// placeholders are left alone.
    pub fn translate(
        &self,
        source: &dyn TranslationSource,
        locale: &str,
        message: &str,
        count: Option<i64>,
        params: &IndexMap<String, String>,
    ) -> String {
        let translation = source
            .find_translation(locale, message)
            .as_ref()
            .and_then(Translation::from_json);

        let text = match translation {
            Some(Translation::Text(text)) => text,
            Some(Translation::Plural(forms)) if !forms.is_empty() => {
                let index = match count {
                    Some(n) => self.plural_rules.select(locale, n).min(forms.len() - 1),
                    None => 0,
                };
                forms[index].clone()
            }
            _ => {
                trace!(locale, key = message, "no translation found");
                message.to_string()
            }
        };

        substitute(&text, count, params)
    }
}

fn substitute(text: &str, count: Option<i64>, params: &IndexMap<String, String>) -> String {
    if !text.contains('%') {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            match params.get(name) {
                Some(value) => value.clone(),
                None if name == "count" => match count {
                    Some(n) => n.to_string(),
                    None => caps[0].to_string(),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

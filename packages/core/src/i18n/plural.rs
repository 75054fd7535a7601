use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Maps a count to the index of a plural form
pub type PluralRule = Rc<dyn Fn(i64) -> usize>;

/// Plural selectors keyed by locale.
///
/// A locale without its own rule falls back to its language (`pt-BR` to
/// `pt`), then to the two-form rule `n == 1 ? 0 : 1`.
#[derive(Clone, Default)]
pub struct PluralRules {
    rules: IndexMap<String, PluralRule>,
}

impl PluralRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, locale: &str, rule: F)
    where
        F: Fn(i64) -> usize + 'static,
    {
        self.rules.insert(locale.to_ascii_lowercase(), Rc::new(rule));
    }

    pub fn with<F>(mut self, locale: &str, rule: F) -> Self
    where
        F: Fn(i64) -> usize + 'static,
    {
        self.register(locale, rule);
        self
    }

    pub fn has(&self, locale: &str) -> bool {
        self.find(locale).is_some()
    }

    pub fn select(&self, locale: &str, count: i64) -> usize {
        match self.find(locale) {
            Some(rule) => rule(count),
            None => default_rule(count),
        }
    }

    fn find(&self, locale: &str) -> Option<&PluralRule> {
        let locale = locale.to_ascii_lowercase();
        if let Some(rule) = self.rules.get(&locale) {
            return Some(rule);
        }
        let language = locale.split(['-', '_']).next()?;
        self.rules.get(language)
    }
}

fn default_rule(count: i64) -> usize {
    if count == 1 {
        0
    } else {
        1
    }
}

impl fmt::Debug for PluralRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.rules.keys()).finish()
    }
}

//! Translation lookup and pluralization

mod plural;
mod translator;

pub use plural::{PluralRule, PluralRules};
pub use translator::{find_in_tree, Translation, TranslationSource, Translator};

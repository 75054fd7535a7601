//! Framework and expression-parser configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Rewriting rule for free variable roots (`a.b` -> `scope.a.b`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableProviderConfig {
    /// Replacement for a root identifier; `%name` is the identifier
    pub template: String,
    /// Read each distinct root once into a local alias
    pub hoist: bool,
    /// Identifiers matching this pattern are left untouched
    pub exclude: Option<String>,
}

impl Default for VariableProviderConfig {
    fn default() -> Self {
        VariableProviderConfig {
            template: "%name".to_string(),
            hoist: false,
            exclude: None,
        }
    }
}

/// Expression parser options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Provider-call form of a filter pipe, with `%value`, `%filter` and `%args`
    pub filter_provider: Option<String>,
    pub variable_provider: Option<VariableProviderConfig>,
    /// Emit the compiled form as a single `return` statement
    pub auto_wrap: bool,
}

impl ParserConfig {
    pub fn with_filter_provider(mut self, template: impl Into<String>) -> Self {
        self.filter_provider = Some(template.into());
        self
    }

    pub fn with_variable_provider(mut self, provider: VariableProviderConfig) -> Self {
        self.variable_provider = Some(provider);
        self
    }

    pub fn with_auto_wrap(mut self, auto_wrap: bool) -> Self {
        self.auto_wrap = auto_wrap;
        self
    }
}

/// Application-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Initial locale for translations and plural rules
    pub locale: String,
    /// Name under which event handlers see the dispatched event
    pub event_local: String,
    pub parser: ParserConfig,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        FrameworkConfig {
            locale: "en".to_string(),
            event_local: "$event".to_string(),
            parser: ParserConfig::default(),
        }
    }
}

impl FrameworkConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

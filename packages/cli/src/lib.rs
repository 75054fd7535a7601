#![deny(clippy::all)]

/**
 * Trellis CLI
 *
 * Command implementations behind the `trellis` binary: compiling binding
 * expressions and rendering templates against a JSON scope.
 */
pub use trellis_core as core;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info};
use trellis_core::config::{FrameworkConfig, ParserConfig, VariableProviderConfig};
use trellis_core::dom::{Dom, MemoryDom};
use trellis_core::expression_parser::ExpressionParser;
use trellis_core::i18n::PluralRules;
use trellis_core::template::Application;
use trellis_core::Value;

/// Parser settings as given on the command line
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    pub filter_provider: Option<String>,
    pub variable_provider: Option<String>,
    pub hoist: bool,
    pub exclude: Option<String>,
    pub auto_wrap: bool,
}

impl ParserOptions {
    pub fn to_config(&self) -> ParserConfig {
        let mut config = ParserConfig::default().with_auto_wrap(self.auto_wrap);
        if let Some(template) = &self.filter_provider {
            config = config.with_filter_provider(template.clone());
        }
        if self.variable_provider.is_some() || self.hoist || self.exclude.is_some() {
            let mut provider = VariableProviderConfig::default();
            if let Some(template) = &self.variable_provider {
                provider.template = template.clone();
            }
            provider.hoist = self.hoist;
            provider.exclude = self.exclude.clone();
            config = config.with_variable_provider(provider);
        }
        config
    }
}

pub fn parse_expression(config: ParserConfig, source: &str) -> Result<String> {
    let parser = ExpressionParser::new(config)?;
    Ok(parser.parse(source)?)
}

/// Outcome of compiling one line of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchEntry {
    pub line: usize,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Compile every non-blank line of `input` in parallel. Entries come back
/// in input order.
pub fn compile_batch(config: ParserConfig, input: &str) -> Result<Vec<BatchEntry>> {
    let parser = ExpressionParser::new(config)?;
    let lines: Vec<(usize, &str)> = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .collect();

    debug!(expressions = lines.len(), "compiling batch");
    let entries = lines
        .par_iter()
        .map(|&(line, source)| match parser.parse(source) {
            Ok(output) => BatchEntry {
                line,
                source: source.to_string(),
                output: Some(output),
                error: None,
            },
            Err(e) => BatchEntry {
                line,
                source: source.to_string(),
                output: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Ok(entries)
}

/// Inputs of the `render` command
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub template: String,
    /// JSON object whose entries become root scope variables
    pub scope: Option<String>,
    pub config: Option<String>,
    /// JSON object mapping locale to translation tree
    pub translations: Option<String>,
    pub locale: Option<String>,
}

/// Compile `request.template` under a fresh application and return the
/// rendered HTML.
pub fn render_template(request: &RenderRequest) -> Result<String> {
    let config = match &request.config {
        Some(json) => FrameworkConfig::from_json(json).context("invalid framework config")?,
        None => FrameworkConfig::default(),
    };

    let dom = Rc::new(MemoryDom::new());
    let mut builder = Application::builder(dom.clone())
        .config(config)
        .plural_rules(PluralRules::new());
    if let Some(json) = &request.translations {
        let trees: serde_json::Value =
            serde_json::from_str(json).context("invalid translations")?;
        let Some(trees) = trees.as_object() else {
            bail!("translations must be a JSON object keyed by locale");
        };
        for (locale, tree) in trees {
            builder = builder.translations(locale, tree.clone());
        }
    }
    let app = builder.build()?;
    if let Some(locale) = &request.locale {
        app.context().set_locale(locale);
    }

    if let Some(json) = &request.scope {
        let scope: serde_json::Value = serde_json::from_str(json).context("invalid scope")?;
        let Some(entries) = scope.as_object() else {
            bail!("scope must be a JSON object");
        };
        for (name, value) in entries {
            app.scope().set(name.clone(), Value::from_json(value));
        }
    }

    let host = dom.create_element("main");
    app.compile_fragment(host, &request.template)?;
    let html = dom.inner_html(host);
    info!(bytes = html.len(), "template rendered");
    app.destroy();
    Ok(html)
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

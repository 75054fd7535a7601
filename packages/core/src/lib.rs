#![deny(clippy::all)]

/**
 * Trellis
 *
 * Client-side component framework core: binding expressions, scopes,
 * dirty-checking change detection and a template compiler driving a DOM
 * capability set.
 */

// Expression pipeline
pub mod chars;
pub mod expression;
pub mod expression_parser;

// Runtime state
pub mod change_detection;
pub mod scope;

// Views
pub mod directive_matching;
pub mod dom;
pub mod metadata;
pub mod template;

// Collaborators
pub mod di;
pub mod extensions;
pub mod i18n;

pub mod config;
pub mod error;

pub use change_detection::{ChangeDetectionStrategy, ChangeDetector};
pub use config::{FrameworkConfig, ParserConfig, VariableProviderConfig};
pub use error::{
    ConfigError, DefinitionError, DiError, EvalError, EvalResult, FrameworkError, MarkupError,
    ParseError, ParseResult, Result as FrameworkResult,
};
pub use expression::{EvalContext, Expression, Value};
pub use expression_parser::ExpressionParser;
pub use scope::Scope;
pub use template::{Application, ApplicationBuilder, Directive, DirectiveContext, Template};

//! Error taxonomy
//!
//! Every failure in the core is a `Result::Err`: definition errors and parse errors
//! surface at compile time, lookup and evaluation errors at the point of use.

use thiserror::Error;

/// Malformed expression syntax.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Parse error: {message} at column {position} in [{input}]")]
pub struct ParseError {
    pub message: String,
    /// Offending token text, or `end of expression`
    pub token: String,
    /// The construct the parser was looking for
    pub expected: String,
    /// The full expression source
    pub input: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        token: impl Into<String>,
        expected: impl Into<String>,
        input: impl Into<String>,
        position: usize,
    ) -> Self {
        ParseError {
            message: message.into(),
            token: token.into(),
            expected: expected.into(),
            input: input.into(),
            position,
        }
    }
}

/// Failures while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Unknown filter '{name}'")]
    UnknownFilter { name: String },

    #[error("'{callee}' is not a function")]
    NotCallable { callee: String },

    #[error("Cannot read property '{property}' of {receiver}")]
    PropertyOfNullish { property: String, receiver: String },

    #[error("Invalid operand for '{operator}': {details}")]
    InvalidOperand { operator: String, details: String },

    #[error("Filter '{name}' failed: {message}")]
    Filter { name: String, message: String },

    #[error("Function call failed: {message}")]
    Function { message: String },

    #[error("Evaluation context of '{expression}' is gone")]
    Detached { expression: String },

    #[error("Listener failed: {message}")]
    Listener { message: String },
}

/// Mistakes in directive, component or template authoring.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("No directive or component annotation on '{class}'")]
    MissingAnnotation { class: String },

    #[error("Directive '{class}' does not declare a selector")]
    MissingSelector { class: String },

    #[error("Invalid selector '{selector}' on '{class}': {message}")]
    InvalidSelector {
        class: String,
        selector: String,
        message: String,
    },

    #[error("Required input '{input}' on '{class}' has no matching input declaration")]
    RequiredInputNotDeclared { class: String, input: String },

    #[error("Invalid property binding path '{path}': {reason}")]
    InvalidPropertyPath { path: String, reason: String },

    #[error("Required input '{input}' of '{class}' is not bound on <{element}>")]
    MissingRequiredInput {
        class: String,
        input: String,
        element: String,
    },

    #[error("Element <{element}> matches two components: '{first}' and '{second}'")]
    MultipleComponents {
        element: String,
        first: String,
        second: String,
    },

    #[error("Component '{class}' does not declare a template")]
    MissingTemplate { class: String },
}

/// Dependency-injection lookup and construction failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiError {
    #[error("No provider for service '{service}'")]
    ServiceNotFound { service: String },

    #[error("Circular dependency while creating '{service}'")]
    CircularDependency { service: String },

    #[error("Failed to construct '{service}': {message}")]
    Construction { service: String, message: String },
}

/// Malformed template markup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkupError {
    #[error("Unterminated {construct} at offset {position}")]
    Unterminated { construct: String, position: usize },

    #[error("Unexpected closing tag </{tag}> at offset {position}")]
    UnexpectedClosingTag { tag: String, position: usize },

    #[error("Element <{tag}> is never closed")]
    UnclosedElement { tag: String },
}

/// Invalid framework or parser configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Aggregate error returned by the template compiler and the application.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Di(#[from] DiError),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
pub type EvalResult<T> = std::result::Result<T, EvalError>;
pub type Result<T> = std::result::Result<T, FrameworkError>;

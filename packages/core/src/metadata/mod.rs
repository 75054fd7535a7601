//! Directive and component metadata
//!
//! Classes declare annotation tables; [`DirectiveParser`] resolves them into
//! shared, immutable [`DirectiveDefinition`]s consumed by the template compiler.

pub mod annotations;
pub mod definition;
pub mod parser;

pub use annotations::{
    Annotation, AnnotationKind, AnnotationRegistry, ComponentAnnotation, DirectiveClass,
    DirectiveFactory, DirectiveType,
};
pub use definition::{
    ComponentDefinition, DirectiveDefinition, DirectiveKind, HostListenerDefinition,
    InputDefinition, InputFlags,
};
pub use parser::DirectiveParser;

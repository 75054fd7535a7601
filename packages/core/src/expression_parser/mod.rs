/**
 * Expression Parser Module
 *
 * Lexer, parser and code generator for the binding expression language
 */
pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use codegen::{normalize, ExpressionParser};
pub use lexer::Lexer;
pub use parser::{Parser, PropertyPath};

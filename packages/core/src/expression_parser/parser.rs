/**
 * Binding Expression Parser
 *
 * Recursive descent parser for binding expressions, text interpolations and
 * property-binding paths
 */
use super::ast::*;
use super::lexer::{Lexer, Token, TokenType};
use crate::chars;
use crate::error::{ParseError, ParseResult};
use smallvec::SmallVec;

const END_OF_EXPRESSION: &str = "end of expression";

/// Interpolation piece (part of interpolation)
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationPiece {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Split interpolation result
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInterpolation {
    pub strings: SmallVec<[InterpolationPiece; 4]>,
    pub expressions: SmallVec<[InterpolationPiece; 4]>,
}

/// Target of a property binding (`[value]`, `[class.active]`, `[style.width]`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    pub root: String,
    pub member: Option<String>,
}

/// Roots that accept one level of nesting in a property binding
const NESTED_PROPERTY_ROOTS: &[&str] = &["style", "class", "attr"];

/// Parser for binding expressions
#[derive(Debug, Default, Clone)]
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            lexer: Lexer::new(),
        }
    }

    /// Parse a binding expression (property binding, text binding, event handler)
    pub fn parse_binding(&self, input: &str) -> ParseResult<Ast> {
        self.parse_piece(input, input, 0)
    }

    fn parse_piece(&self, text: &str, source: &str, offset: usize) -> ParseResult<Ast> {
        let tokens = self.lexer.tokenize(text);
        let mut parse_ast = ParseAST::new(text, source, offset, tokens);
        parse_ast.check_lexer_errors()?;
        if parse_ast.tokens.is_empty() {
            return Err(parse_ast.unexpected("expression"));
        }
        let ast = parse_ast.parse_pipe()?;

        if parse_ast.index < parse_ast.tokens.len() {
            return Err(parse_ast.unexpected(END_OF_EXPRESSION));
        }
        Ok(ast)
    }

    /// Parse interpolation string (e.g., "Hello {{name}}!").
    ///
    /// Returns `None` when the text contains no interpolation.
    pub fn parse_interpolation(&self, input: &str) -> ParseResult<Option<Interpolation>> {
        let parts = self.split_interpolation(input)?;
        if parts.expressions.is_empty() {
            return Ok(None);
        }

        let mut expressions = Vec::with_capacity(parts.expressions.len());
        for piece in &parts.expressions {
            expressions.push(self.parse_piece(&piece.text, input, piece.start)?);
        }

        Ok(Some(Interpolation {
            span: ParseSpan::new(0, input.len()),
            strings: parts.strings.into_iter().map(|p| p.text).collect(),
            expressions,
        }))
    }

    /// Split interpolation string into strings and expressions
    pub fn split_interpolation(&self, input: &str) -> ParseResult<SplitInterpolation> {
        let mut strings = SmallVec::new();
        let mut expressions = SmallVec::new();
        let mut current_pos = 0;
        let mut i = 0;

        while let Some(open) = input[i..].find("{{").map(|p| p + i) {
            let expr_start = open + 2;
            // An open quote can hide the real `}}`; the lexer then reports it
            let close = match find_interpolation_end(input, expr_start) {
                Some(close) => close,
                None => match input[expr_start..].find("}}") {
                    Some(raw) => expr_start + raw,
                    // Unclosed interpolation, the rest is plain text
                    None => break,
                },
            };

            let expr_text = &input[expr_start..close];
            if expr_text.trim().is_empty() {
                return Err(ParseError::new(
                    "Blank expressions are not allowed in interpolated strings",
                    "}}",
                    "expression",
                    input,
                    close,
                ));
            }

            strings.push(InterpolationPiece {
                text: input[current_pos..open].to_string(),
                start: current_pos,
                end: open,
            });
            expressions.push(InterpolationPiece {
                text: expr_text.to_string(),
                start: expr_start,
                end: close,
            });
            i = close + 2;
            current_pos = i;
        }

        strings.push(InterpolationPiece {
            text: input[current_pos..].to_string(),
            start: current_pos,
            end: input.len(),
        });

        Ok(SplitInterpolation {
            strings,
            expressions,
        })
    }

    /// Parse and validate a property binding path: zero levels (`value`) or one
    /// level under `style`, `class` or `attr` (`style.width`).
    pub fn parse_property_path(&self, input: &str) -> ParseResult<PropertyPath> {
        let segments: Vec<&str> = input.split(chars::PERIOD).collect();
        let invalid = |message: String, token: &str, position: usize| {
            ParseError::new(message, token, "property binding path", input, position)
        };

        let mut position = 0;
        for segment in &segments {
            let valid = !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| chars::is_identifier_part(c) || c == chars::MINUS);
            if !valid {
                return Err(invalid(
                    format!("invalid property name '{}'", segment),
                    segment,
                    position,
                ));
            }
            position += segment.len() + 1;
        }

        match segments.as_slice() {
            [root] => Ok(PropertyPath {
                root: root.to_string(),
                member: None,
            }),
            [root, member] if NESTED_PROPERTY_ROOTS.contains(root) => Ok(PropertyPath {
                root: root.to_string(),
                member: Some(member.to_string()),
            }),
            [root, _] => Err(invalid(
                format!(
                    "only {} accept a nested property, got '{}'",
                    NESTED_PROPERTY_ROOTS.join(", "),
                    root
                ),
                root,
                0,
            )),
            _ => Err(invalid(
                "property binding paths support at most one level".to_string(),
                segments[2],
                segments[0].len() + segments[1].len() + 2,
            )),
        }
    }
}

/// Finds the `}}` closing an interpolation, skipping quoted strings.
fn find_interpolation_end(input: &str, from: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => {
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                } else if b == b'}' && bytes.get(i + 1) == Some(&b'}') {
                    return Some(i);
                }
            }
        }
        i += 1;
    }
    None
}

/// Internal parser state
struct ParseAST<'a> {
    input: &'a str,
    source: &'a str,
    offset: usize,
    tokens: Vec<Token>,
    index: usize,
}

impl<'a> ParseAST<'a> {
    fn new(input: &'a str, source: &'a str, offset: usize, tokens: Vec<Token>) -> Self {
        ParseAST {
            input,
            source,
            offset,
            tokens,
            index: 0,
        }
    }

    fn check_lexer_errors(&self) -> ParseResult<()> {
        match self.tokens.iter().find(|t| t.is_error()) {
            Some(token) => Err(ParseError::new(
                token.str_value.clone(),
                &self.input[token.index..token.end],
                "valid token",
                self.source,
                self.offset + token.index,
            )),
            None => Ok(()),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn input_index(&self) -> usize {
        self.current().map(|t| t.index).unwrap_or(self.input.len())
    }

    /// Span from `start` to the end of the last consumed token
    fn span(&self, start: usize) -> ParseSpan {
        let end = if self.index > 0 {
            self.tokens[self.index - 1].end
        } else {
            start
        };
        ParseSpan::new(start, end)
    }

    fn current_text(&self) -> (String, usize) {
        match self.current() {
            Some(token) => (token.display_text(), token.index),
            None => (END_OF_EXPRESSION.to_string(), self.input.len()),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let (token, position) = self.current_text();
        let message = if self.current().is_some() {
            format!("{} expected, got '{}'", expected, token)
        } else {
            format!("{} expected, got {}", expected, token)
        };
        ParseError::new(message, token, expected, self.source, self.offset + position)
    }

    fn unexpected_after(&self, expected: &str, after: &str) -> ParseError {
        let (token, position) = self.current_text();
        let message = if self.current().is_some() {
            format!("{} expected after '{}', got '{}'", expected, after, token)
        } else {
            format!("{} expected after '{}', got {}", expected, after, token)
        };
        ParseError::new(message, token, expected, self.source, self.offset + position)
    }

    fn consume_optional_character(&mut self, code: char) -> bool {
        if self.current().map_or(false, |t| t.is_character(code)) {
            self.advance();
            return true;
        }
        false
    }

    fn consume_optional_operator(&mut self, op: &str) -> bool {
        if self.current().map_or(false, |t| t.is_operator(op)) {
            self.advance();
            return true;
        }
        false
    }

    fn expect_character(&mut self, code: char) -> ParseResult<()> {
        if self.consume_optional_character(code) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", code)))
        }
    }

    /// Parse filter pipes (e.g. `value | name : arg`), left-associative
    fn parse_pipe(&mut self) -> ParseResult<Ast> {
        let start = self.input_index();
        let mut result = self.parse_conditional()?;

        while self.consume_optional_operator("|") {
            let name_start = self.input_index();
            let name = match self.current() {
                Some(token) if token.is_identifier() => token.str_value.clone(),
                _ => return Err(self.unexpected_after("filter name", "|")),
            };
            self.advance();
            let name_span = self.span(name_start);

            let mut args = Vec::new();
            while self.consume_optional_character(':') {
                if self.current().is_none() {
                    return Err(self.unexpected_after("filter argument", ":"));
                }
                args.push(self.parse_conditional()?);
            }

            result = Ast::BindingPipe(BindingPipe {
                span: self.span(start),
                name_span,
                exp: Box::new(result),
                name,
                args,
            });
        }

        Ok(result)
    }

    /// Parse conditional/ternary expression (e.g. `a ? b : c`)
    fn parse_conditional(&mut self) -> ParseResult<Ast> {
        let start = self.input_index();
        let result = self.parse_logical_or()?;

        if self.consume_optional_operator("?") {
            let true_exp = self.parse_conditional()?;
            if !self.consume_optional_character(':') {
                return Err(self.unexpected("':' in conditional expression"));
            }
            let false_exp = self.parse_conditional()?;
            return Ok(Ast::Conditional(Conditional {
                span: self.span(start),
                condition: Box::new(result),
                true_exp: Box::new(true_exp),
                false_exp: Box::new(false_exp),
            }));
        }

        Ok(result)
    }

    /// One left-associative binary precedence level
    fn parse_binary_level(
        &mut self,
        operators: &[&str],
        next: fn(&mut Self) -> ParseResult<Ast>,
    ) -> ParseResult<Ast> {
        let start = self.input_index();
        let mut result = next(self)?;

        loop {
            let operation = match self.current() {
                Some(token)
                    if token.token_type == TokenType::Operator
                        && operators.contains(&token.str_value.as_str()) =>
                {
                    BinaryOperator::from_str(&token.str_value)
                }
                _ => None,
            };
            let Some(operation) = operation else {
                break;
            };
            self.advance();
            if self.current().is_none() {
                return Err(self.unexpected_after("operand", operation.as_str()));
            }
            let right = next(self)?;
            result = Ast::Binary(Binary {
                span: self.span(start),
                operation,
                left: Box::new(result),
                right: Box::new(right),
            });
        }

        Ok(result)
    }

    fn parse_logical_or(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["||"], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["&&"], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["==", "!=", "===", "!=="], Self::parse_relational)
    }

    fn parse_relational(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["<", ">", "<=", ">="], Self::parse_additive)
    }

    fn parse_additive(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["+", "-"], Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Ast> {
        self.parse_binary_level(&["*", "/", "%"], Self::parse_prefix)
    }

    /// Parse prefix operators (!, -, +)
    fn parse_prefix(&mut self) -> ParseResult<Ast> {
        let start = self.input_index();

        if self.consume_optional_operator("!") {
            let expression = self.parse_prefix()?;
            return Ok(Ast::PrefixNot(PrefixNot {
                span: self.span(start),
                expression: Box::new(expression),
            }));
        }

        for operator in [UnaryOperator::Minus, UnaryOperator::Plus] {
            if self.consume_optional_operator(operator.as_str()) {
                let expr = self.parse_prefix()?;
                return Ok(Ast::Unary(Unary {
                    span: self.span(start),
                    operator,
                    expr: Box::new(expr),
                }));
            }
        }

        self.parse_call_chain()
    }

    /// Parse call chain (member access, keyed access, calls)
    fn parse_call_chain(&mut self) -> ParseResult<Ast> {
        let start = self.input_index();
        let mut result = self.parse_primary()?;

        loop {
            if self.consume_optional_character('.') {
                let name = match self.current() {
                    Some(token) if token.is_identifier() || token.is_keyword() => {
                        token.str_value.clone()
                    }
                    _ => return Err(self.unexpected_after("property name", ".")),
                };
                self.advance();
                result = Ast::PropertyRead(PropertyRead {
                    span: self.span(start),
                    receiver: Box::new(result),
                    name,
                });
            } else if self.consume_optional_character('[') {
                let key = self.parse_pipe()?;
                self.expect_character(']')?;
                result = Ast::KeyedRead(KeyedRead {
                    span: self.span(start),
                    receiver: Box::new(result),
                    key: Box::new(key),
                });
            } else if self.consume_optional_character('(') {
                let args = self.parse_expression_list(')')?;
                result = Ast::Call(Call {
                    span: self.span(start),
                    receiver: Box::new(result),
                    args,
                });
            } else {
                break;
            }
        }

        Ok(result)
    }

    /// Comma separated expressions up to (and including) `terminator`
    fn parse_expression_list(&mut self, terminator: char) -> ParseResult<Vec<Ast>> {
        let mut expressions = Vec::new();
        if self.consume_optional_character(terminator) {
            return Ok(expressions);
        }
        loop {
            expressions.push(self.parse_conditional()?);
            if !self.consume_optional_character(',') {
                break;
            }
        }
        self.expect_character(terminator)?;
        Ok(expressions)
    }

    /// Parse primary expression (literals, identifiers, parentheses, arrays, objects)
    fn parse_primary(&mut self) -> ParseResult<Ast> {
        let start = self.input_index();
        let Some(token) = self.current().cloned() else {
            return Err(self.unexpected("expression"));
        };

        if token.is_character('(') {
            self.advance();
            let expression = self.parse_pipe()?;
            self.expect_character(')')?;
            return Ok(Ast::ParenthesizedExpression(ParenthesizedExpression {
                span: self.span(start),
                expression: Box::new(expression),
            }));
        }

        if token.is_character('[') {
            self.advance();
            let expressions = self.parse_expression_list(']')?;
            return Ok(Ast::LiteralArray(LiteralArray {
                span: self.span(start),
                expressions,
            }));
        }

        if token.is_character('{') {
            self.advance();
            return self.parse_literal_map(start);
        }

        let value = match token.token_type {
            TokenType::Keyword => match token.str_value.as_str() {
                "null" => LiteralValue::Null,
                "undefined" => LiteralValue::Undefined,
                "true" => LiteralValue::Boolean(true),
                _ => LiteralValue::Boolean(false),
            },
            TokenType::Number => LiteralValue::Number(token.num_value),
            TokenType::String => LiteralValue::String(token.str_value.clone()),
            TokenType::Identifier => {
                self.advance();
                return Ok(Ast::VariableRead(VariableRead {
                    span: self.span(start),
                    name: token.str_value,
                }));
            }
            _ => return Err(self.unexpected("expression")),
        };

        self.advance();
        Ok(Ast::LiteralPrimitive(LiteralPrimitive {
            span: self.span(start),
            value,
        }))
    }

    /// Parse literal map (e.g. `{a: 1, 'b': 2}`), opening brace already consumed
    fn parse_literal_map(&mut self, start: usize) -> ParseResult<Ast> {
        let mut keys = Vec::new();
        let mut values = Vec::new();

        if !self.consume_optional_character('}') {
            loop {
                let key = match self.current() {
                    Some(token) if token.is_identifier() || token.is_keyword() => {
                        LiteralMapKey {
                            key: token.str_value.clone(),
                            quoted: false,
                        }
                    }
                    Some(token) if token.is_string() => LiteralMapKey {
                        key: token.str_value.clone(),
                        quoted: true,
                    },
                    Some(token) if token.is_number() => LiteralMapKey {
                        key: token.str_value.clone(),
                        quoted: true,
                    },
                    _ => return Err(self.unexpected("object key")),
                };
                self.advance();
                if !self.consume_optional_character(':') {
                    return Err(self.unexpected_after("':'", &key.key));
                }
                keys.push(key);
                values.push(self.parse_conditional()?);
                if !self.consume_optional_character(',') {
                    break;
                }
            }
            self.expect_character('}')?;
        }

        Ok(Ast::LiteralMap(LiteralMap {
            span: self.span(start),
            keys,
            values,
        }))
    }
}

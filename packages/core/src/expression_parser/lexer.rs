/**
 * Binding Expression Lexer
 *
 * Tokenizes binding expressions into tokens for parsing
 */
use crate::chars;
use serde::{Deserialize, Serialize};

/// Token types in binding expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenType {
    Character = 0,
    Identifier = 1,
    Keyword = 2,
    String = 3,
    Operator = 4,
    Number = 5,
    Error = 6,
}

/// Token representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub index: usize,
    pub end: usize,
    pub token_type: TokenType,
    pub num_value: f64,
    pub str_value: String,
}

impl Token {
    pub fn new(
        index: usize,
        end: usize,
        token_type: TokenType,
        num_value: f64,
        str_value: String,
    ) -> Self {
        Token {
            index,
            end,
            token_type,
            num_value,
            str_value,
        }
    }

    pub fn operator(index: usize, end: usize, str_value: &str) -> Self {
        Token::new(index, end, TokenType::Operator, 0.0, str_value.to_string())
    }

    pub fn is_character(&self, code: char) -> bool {
        self.token_type == TokenType::Character && self.str_value.chars().next() == Some(code)
    }

    pub fn is_number(&self) -> bool {
        self.token_type == TokenType::Number
    }

    pub fn is_string(&self) -> bool {
        self.token_type == TokenType::String
    }

    pub fn is_identifier(&self) -> bool {
        self.token_type == TokenType::Identifier
    }

    pub fn is_keyword(&self) -> bool {
        self.token_type == TokenType::Keyword
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.token_type == TokenType::Operator && self.str_value == operator
    }

    pub fn is_error(&self) -> bool {
        self.token_type == TokenType::Error
    }

    /// Text used when the token is quoted in a diagnostic
    pub fn display_text(&self) -> String {
        match self.token_type {
            TokenType::String => format!("\"{}\"", self.str_value),
            _ => self.str_value.clone(),
        }
    }
}

/// Binding expression lexer
#[derive(Debug, Default, Clone, Copy)]
pub struct Lexer;

impl Lexer {
    pub fn new() -> Self {
        Lexer
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        Scanner::new(text).scan()
    }
}

const KEYWORDS: &[&str] = &["null", "undefined", "true", "false"];

/// Scanner for tokenizing input
struct Scanner<'a> {
    input: &'a str,
    length: usize,
    index: usize,
    peek: char,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        let peek = input.chars().next().unwrap_or(chars::EOF);
        Scanner {
            input,
            length: input.len(),
            index: 0,
            peek,
        }
    }

    fn scan(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.scan_token() {
            let stop = token.is_error();
            tokens.push(token);
            // Nothing after a lexer error can be trusted
            if stop {
                break;
            }
        }
        tokens
    }

    fn advance(&mut self) {
        self.index += self.peek.len_utf8();
        self.peek = if self.index < self.length {
            self.input[self.index..].chars().next().unwrap_or(chars::EOF)
        } else {
            chars::EOF
        };
    }

    fn scan_token(&mut self) -> Option<Token> {
        while self.index < self.length && chars::is_whitespace(self.peek) {
            self.advance();
        }

        if self.index >= self.length {
            return None;
        }

        let start = self.index;
        let ch = self.peek;

        if chars::is_identifier_start(ch) {
            return Some(self.scan_identifier());
        }

        if chars::is_digit(ch) {
            return Some(self.scan_number(start));
        }

        let token = match ch {
            chars::PERIOD => {
                self.advance();
                if chars::is_digit(self.peek) {
                    return Some(self.scan_number(start));
                }
                Token::new(
                    start,
                    self.index,
                    TokenType::Character,
                    0.0,
                    chars::PERIOD.to_string(),
                )
            }
            chars::LPAREN
            | chars::RPAREN
            | chars::LBRACKET
            | chars::RBRACKET
            | chars::LBRACE
            | chars::RBRACE
            | chars::COMMA
            | chars::COLON
            | chars::SEMICOLON => self.scan_character(start, ch),
            chars::SQ | chars::DQ => self.scan_string(ch),
            chars::PLUS | chars::MINUS | chars::STAR | chars::SLASH | chars::PERCENT
            | chars::QUESTION => self.scan_operator(start, ch),
            chars::LT | chars::GT => self.scan_complex_operator(start, ch, chars::EQ),
            chars::AMPERSAND => {
                self.advance();
                if self.peek == chars::AMPERSAND {
                    self.advance();
                    Token::operator(start, self.index, "&&")
                } else {
                    self.error(start, "Unexpected character [&], did you mean [&&]?")
                }
            }
            chars::BAR => {
                self.advance();
                if self.peek == chars::BAR {
                    self.advance();
                    Token::operator(start, self.index, "||")
                } else {
                    Token::operator(start, self.index, "|")
                }
            }
            chars::BANG | chars::EQ => {
                self.advance();
                let mut op = ch.to_string();
                if self.peek == chars::EQ {
                    self.advance();
                    op.push(chars::EQ);
                    if self.peek == chars::EQ {
                        self.advance();
                        op.push(chars::EQ);
                    }
                }
                if op == "=" {
                    self.error(start, "Assignments are not supported in bindings")
                } else {
                    Token::operator(start, self.index, &op)
                }
            }
            _ => {
                self.advance();
                self.error(start, &format!("Invalid character [{}]", ch))
            }
        };
        Some(token)
    }

    fn error(&self, start: usize, message: &str) -> Token {
        Token::new(
            start,
            self.index,
            TokenType::Error,
            0.0,
            format!(
                "Lexer Error: {} at column {} in expression [{}]",
                message, start, self.input
            ),
        )
    }

    fn scan_character(&mut self, start: usize, ch: char) -> Token {
        self.advance();
        Token::new(start, self.index, TokenType::Character, 0.0, ch.to_string())
    }

    fn scan_operator(&mut self, start: usize, ch: char) -> Token {
        self.advance();
        Token::operator(start, self.index, &ch.to_string())
    }

    fn scan_complex_operator(&mut self, start: usize, ch: char, two: char) -> Token {
        self.advance();
        if self.peek == two {
            self.advance();
            Token::operator(start, self.index, &format!("{}{}", ch, two))
        } else {
            Token::operator(start, self.index, &ch.to_string())
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.index;
        self.advance();

        while self.index < self.length && chars::is_identifier_part(self.peek) {
            self.advance();
        }

        let str_value = self.input[start..self.index].to_string();
        let token_type = if KEYWORDS.contains(&str_value.as_str()) {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };

        Token::new(start, self.index, token_type, 0.0, str_value)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        while self.index < self.length {
            if chars::is_digit(self.peek) || self.peek == chars::PERIOD {
                self.advance();
            } else if self.peek == 'e' || self.peek == 'E' {
                self.advance();
                if self.peek == chars::PLUS || self.peek == chars::MINUS {
                    self.advance();
                }
                if !chars::is_digit(self.peek) {
                    return self.error(self.index, "Invalid exponent");
                }
            } else {
                break;
            }
        }

        let str_value = &self.input[start..self.index];
        match str_value.parse::<f64>() {
            Ok(num_value) => Token::new(
                start,
                self.index,
                TokenType::Number,
                num_value,
                str_value.to_string(),
            ),
            Err(_) => self.error(start, &format!("Invalid number [{}]", str_value)),
        }
    }

    fn scan_string(&mut self, quote: char) -> Token {
        let start = self.index;
        self.advance();

        let mut buffer = String::new();

        while self.index < self.length {
            let ch = self.peek;

            if ch == chars::BACKSLASH {
                self.advance();
                if self.peek == 'u' {
                    self.advance();
                    let hex_start = self.index;
                    for _ in 0..4 {
                        if !chars::is_ascii_hex_digit(self.peek) {
                            return self.error(hex_start, "Invalid unicode escape");
                        }
                        self.advance();
                    }
                    let hex = &self.input[hex_start..self.index];
                    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                        Some(c) => buffer.push(c),
                        None => {
                            return self.error(
                                hex_start,
                                &format!("Invalid unicode escape [\\u{}]", hex),
                            )
                        }
                    }
                    continue;
                }
                if self.index >= self.length {
                    break;
                }
                buffer.push(match self.peek {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'b' => '\x08',
                    'f' => '\x0c',
                    'v' => '\x0b',
                    other => other,
                });
                self.advance();
            } else if ch == quote {
                self.advance();
                return Token::new(start, self.index, TokenType::String, 0.0, buffer);
            } else {
                buffer.push(ch);
                self.advance();
            }
        }

        self.error(start, "Unterminated quote")
    }
}

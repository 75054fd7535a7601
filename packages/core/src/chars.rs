//! Character constants shared by the expression lexer and the markup parser

pub const EOF: char = '\0';
pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const CR: char = '\r';
pub const SPACE: char = ' ';
pub const NBSP: char = '\u{00A0}';

// Punctuation
pub const BANG: char = '!';
pub const DQ: char = '"';
pub const HASH: char = '#';
pub const DOLLAR: char = '$';
pub const PERCENT: char = '%';
pub const AMPERSAND: char = '&';
pub const SQ: char = '\'';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const COMMA: char = ',';
pub const MINUS: char = '-';
pub const PERIOD: char = '.';
pub const SLASH: char = '/';
pub const COLON: char = ':';
pub const SEMICOLON: char = ';';
pub const LT: char = '<';
pub const EQ: char = '=';
pub const GT: char = '>';
pub const QUESTION: char = '?';

// Brackets
pub const LBRACKET: char = '[';
pub const BACKSLASH: char = '\\';
pub const RBRACKET: char = ']';
pub const UNDERSCORE: char = '_';

// Braces
pub const LBRACE: char = '{';
pub const BAR: char = '|';
pub const RBRACE: char = '}';

pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == LF || ch == CR || (ch != EOF && ch < ' ') || ch == NBSP
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

pub fn is_ascii_hex_digit(ch: char) -> bool {
    ch.is_ascii_hexdigit()
}

/// Check if character can start an identifier
pub fn is_identifier_start(ch: char) -> bool {
    is_ascii_letter(ch) || ch == UNDERSCORE || ch == DOLLAR
}

/// Check if character can be part of an identifier
pub fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || is_digit(ch)
}

/// Whether a whole string is a plain identifier (usable as a bare object key)
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_identifier_start(first) => chars.all(is_identifier_part),
        _ => false,
    }
}

/// Characters allowed inside markup tag and attribute names
pub fn is_name_part(ch: char) -> bool {
    !is_whitespace(ch) && !matches!(ch, EOF | GT | SLASH | EQ | DQ | SQ | LT)
}

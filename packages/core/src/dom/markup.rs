/**
 * Markup Parser
 *
 * Parses an HTML fragment straight into a [`Dom`]: elements, attributes,
 * text (interpolations kept intact), comments skipped, void and self-closing
 * elements, and the common character entities.
 */
use super::memory::VOID_ELEMENTS;
use super::{Dom, NodeId};
use crate::chars;
use crate::error::MarkupError;

/// Parse `markup` and append the resulting nodes to `parent`. Returns the
/// top-level nodes created.
pub fn parse_fragment(
    dom: &dyn Dom,
    parent: NodeId,
    markup: &str,
) -> Result<Vec<NodeId>, MarkupError> {
    let mut tokenizer = Tokenizer::new(markup);
    let mut stack: Vec<(String, NodeId)> = Vec::new();
    let mut top_level = Vec::new();

    let mut append = |dom: &dyn Dom, stack: &[(String, NodeId)], node: NodeId| {
        match stack.last() {
            Some((_, open)) => dom.append_child(*open, node),
            None => {
                dom.append_child(parent, node);
                top_level.push(node);
            }
        }
    };

    while let Some(token) = tokenizer.next_token()? {
        match token {
            MarkupToken::Text(text) => {
                let node = dom.create_text(&decode_entities(&text));
                append(dom, &stack, node);
            }
            MarkupToken::TagOpen {
                name,
                attributes,
                self_closing,
            } => {
                let element = dom.create_element(&name);
                for (attr_name, value) in &attributes {
                    dom.set_attribute(element, attr_name, &decode_entities(value));
                }
                append(dom, &stack, element);
                if !self_closing && !VOID_ELEMENTS.contains(&name.as_str()) {
                    stack.push((name, element));
                }
            }
            MarkupToken::TagClose { name, position } => match stack.last() {
                Some((open, _)) if *open == name => {
                    stack.pop();
                }
                // `</br>` and friends are tolerated
                _ if VOID_ELEMENTS.contains(&name.as_str()) => {}
                _ => return Err(MarkupError::UnexpectedClosingTag { tag: name, position }),
            },
        }
    }

    if let Some((tag, _)) = stack.pop() {
        return Err(MarkupError::UnclosedElement { tag });
    }
    Ok(top_level)
}

#[derive(Debug, PartialEq)]
enum MarkupToken {
    Text(String),
    TagOpen {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    TagClose {
        name: String,
        position: usize,
    },
}

struct Tokenizer<'a> {
    input: &'a str,
    index: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer { input, index: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.index..]
    }

    fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or(chars::EOF)
    }

    fn advance(&mut self) {
        self.index += self.peek().len_utf8().max(1);
        self.index = self.index.min(self.input.len());
    }

    fn at_end(&self) -> bool {
        self.index >= self.input.len()
    }

    fn attempt_str(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.index += s.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.at_end() && chars::is_whitespace(self.peek()) {
            self.advance();
        }
    }

    fn unterminated(&self, construct: &str, position: usize) -> MarkupError {
        MarkupError::Unterminated {
            construct: construct.to_string(),
            position,
        }
    }

    fn next_token(&mut self) -> Result<Option<MarkupToken>, MarkupError> {
        loop {
            if self.at_end() {
                return Ok(None);
            }
            let start = self.index;

            if self.attempt_str("<!--") {
                match self.rest().find("-->") {
                    Some(end) => {
                        self.index += end + 3;
                        continue;
                    }
                    None => return Err(self.unterminated("comment", start)),
                }
            }

            if self.rest().starts_with("</") {
                self.index += 2;
                let name = self.consume_name().to_ascii_lowercase();
                self.skip_whitespace();
                if !self.attempt_str(">") {
                    return Err(self.unterminated("closing tag", start));
                }
                return Ok(Some(MarkupToken::TagClose {
                    name,
                    position: start,
                }));
            }

            let mut after_lt = self.rest().chars().skip(1);
            if self.peek() == chars::LT && after_lt.next().map_or(false, chars::is_ascii_letter) {
                self.advance();
                return self.consume_tag_open(start).map(Some);
            }

            return Ok(Some(MarkupToken::Text(self.consume_text())));
        }
    }

    /// Text up to the next tag; `<` inside `{{ }}` does not end the text
    fn consume_text(&mut self) -> String {
        let start = self.index;
        let mut first = true;
        while !self.at_end() {
            if self.rest().starts_with("{{") {
                match self.rest()[2..].find("}}") {
                    Some(end) => {
                        self.index += 2 + end + 2;
                        first = false;
                        continue;
                    }
                    None => {
                        self.index = self.input.len();
                        break;
                    }
                }
            }
            if self.peek() == chars::LT && !first {
                let next = self.rest().chars().nth(1).unwrap_or(chars::EOF);
                if chars::is_ascii_letter(next) || next == chars::SLASH || next == chars::BANG {
                    break;
                }
            }
            first = false;
            self.advance();
        }
        self.input[start..self.index].to_string()
    }

    fn consume_name(&mut self) -> &'a str {
        let start = self.index;
        while !self.at_end() && chars::is_name_part(self.peek()) {
            self.advance();
        }
        &self.input[start..self.index]
    }

    fn consume_tag_open(&mut self, start: usize) -> Result<MarkupToken, MarkupError> {
        let name = self.consume_name().to_ascii_lowercase();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Err(self.unterminated("tag", start));
            }
            if self.attempt_str("/>") {
                return Ok(MarkupToken::TagOpen {
                    name,
                    attributes,
                    self_closing: true,
                });
            }
            if self.attempt_str(">") {
                return Ok(MarkupToken::TagOpen {
                    name,
                    attributes,
                    self_closing: false,
                });
            }

            let attr_start = self.index;
            let attr_name = self.consume_name().to_string();
            if attr_name.is_empty() {
                // Stray character such as a lone `/`
                self.advance();
                continue;
            }
            self.skip_whitespace();
            let value = if self.attempt_str("=") {
                self.skip_whitespace();
                self.consume_attribute_value(attr_start)?
            } else {
                String::new()
            };
            attributes.push((attr_name, value));
        }
    }

    fn consume_attribute_value(&mut self, attr_start: usize) -> Result<String, MarkupError> {
        let quote = self.peek();
        if quote == chars::DQ || quote == chars::SQ {
            self.advance();
            let value_start = self.index;
            match self.rest().find(quote) {
                Some(end) => {
                    self.index += end + 1;
                    Ok(self.input[value_start..value_start + end].to_string())
                }
                None => Err(self.unterminated("attribute value", attr_start)),
            }
        } else {
            let value_start = self.index;
            while !self.at_end() && !chars::is_whitespace(self.peek()) && self.peek() != chars::GT
            {
                self.advance();
            }
            Ok(self.input[value_start..self.index].to_string())
        }
    }
}

/// Decode named and numeric character references
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(chars::NBSP),
                _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                    u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
                }
                _ if entity.starts_with('#') => {
                    entity[1..].parse::<u32>().ok().and_then(char::from_u32)
                }
                _ => None,
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

//! Parser and renderer for the dynamic-language literals embedded in text
//! wire values.
//!
//! Session servers stringify nested payloads with their native literal
//! syntax: `{'k': 'v', 'ok': True, 'pair': ('a', 1), 'none': None}`. This
//! module reads that subset directly into a [`Value`] tree instead of
//! rewriting quotes and keywords into JSON, so string contents are never
//! touched.
//!
//! Accepted grammar:
//!
//! ```text
//! value  := string | number | keyword | list | tuple | dict
//! string := '\'' chars '\'' | '"' chars '"'      (backslash escapes)
//! number := [+-] digits [ '.' digits ] [ (e|E) [+-] digits ]
//! keyword:= True | False | None | true | false | null
//! list   := '[' [ value (',' value)* [','] ] ']'
//! tuple  := '(' [ value (',' value)* [','] ] ')'
//! dict   := '{' [ value ':' value (',' value ':' value)* [','] ] '}'
//! ```

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::value::Value;

const MAX_DEPTH: usize = 128;

/// Parses one literal; trailing non-whitespace input is an error.
pub fn parse(input: &str) -> Result<Value> {
    let mut parser = Parser { src: input, pos: 0 };
    let value = parser.value(0)?;
    parser.skip_ws();
    if parser.pos != input.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(value)
}

/// Renders `value` in the same literal syntax [`parse`] accepts.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Float(f) if !f.is_finite() => out.push_str("None"),
        Value::Float(f) => {
            let text = f.to_string();
            out.push_str(&text);
            if !text.contains(['.', 'e', 'E']) {
                out.push_str(".0");
            }
        }
        Value::String(s) => render_string(s, out),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(item, out);
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_string(key, out);
                out.push_str(": ");
                render_into(item, out);
            }
            out.push('}');
        }
    }
}

fn render_string(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::Literal {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }

        self.skip_ws();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                self.string(quote).map(Value::String)
            }
            Some('[') => {
                self.bump();
                self.sequence(']', depth).map(Value::List)
            }
            Some('(') => {
                self.bump();
                self.sequence(')', depth).map(Value::List)
            }
            Some('{') => {
                self.bump();
                self.dict(depth).map(Value::Map)
            }
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() => self.keyword(),
            Some(c) => Err(self.error(format!("unexpected character `{c}`"))),
        }
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('x') => self.hex_escape(2),
            Some('u') => self.hex_escape(4),
            Some('U') => self.hex_escape(8),
            Some(c @ ('\\' | '\'' | '"' | '/')) => Ok(c),
            Some(c) => Err(self.error(format!("unknown escape `\\{c}`"))),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn hex_escape(&mut self, digits: usize) -> Result<char> {
        let end = self.pos + digits;
        let hex = self
            .src
            .get(self.pos..end)
            .ok_or_else(|| self.error("truncated escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| self.error("escape is not a valid character"))
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        let mut is_float = false;

        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.bump();
                    }
                    continue;
                }
                _ => break,
            }
            self.bump();
        }

        let text: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Integer(i));
            }
        }
        text.parse::<f64>().map(Value::Float).map_err(|_| Error::Literal {
            position: start,
            reason: format!("invalid number `{text}`"),
        })
    }

    fn keyword(&mut self) -> Result<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            word => Err(Error::Literal {
                position: start,
                reason: format!("unknown keyword `{word}`"),
            }),
        }
    }

    fn sequence(&mut self, close: char, depth: usize) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value(depth + 1)?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(self.error(format!("expected `,` or `{close}`")));
        }
    }

    fn dict(&mut self, depth: usize) -> Result<BTreeMap<String, Value>> {
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Ok(map);
            }
            let key = match self.value(depth + 1)? {
                Value::String(s) => s,
                Value::Integer(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Bool(b) => render(&Value::Bool(b)),
                other => {
                    return Err(self.error(format!("unsupported dict key of kind {}", other.kind())))
                }
            };
            self.skip_ws();
            if !self.eat(':') {
                return Err(self.error("expected `:` after dict key"));
            }
            let value = self.value(depth + 1)?;
            map.insert(key, value);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat('}') {
                return Ok(map);
            }
            return Err(self.error("expected `,` or `}`"));
        }
    }
}

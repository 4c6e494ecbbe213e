//! Decoder for textual sub-document encodings.
//!
//! Raw catalog dumps carry nested values either as JSON or as the Python
//! literal rendering of the same structure (single-quoted strings,
//! `True`/`False`/`None`, tuples). Both decode to a [`serde_json::Value`].

use serde_json::{Map, Number, Value};
use thiserror::Error;

const MAX_DEPTH: usize = 64;

/// A decode failure with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at byte {position}")]
pub struct LiteralError {
    pub position: usize,
    pub message: String,
}

/// Decode a JSON or Python-literal encoded value.
///
/// # Example
///
/// ```rust,ignore
/// let value = decode_literal("[{'id': 28, 'name': 'Action'}]")?;
/// assert_eq!(value[0]["name"], "Action");
/// ```
pub fn decode_literal(text: &str) -> Result<Value, LiteralError> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    let mut parser = LiteralParser { src: text, pos: 0 };
    let value = parser.parse_value(0)?;
    parser.skip_whitespace();
    if parser.pos < text.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl LiteralParser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> LiteralError {
        LiteralError {
            position: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value, LiteralError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.skip_whitespace();
        match self.peek() {
            Some('{') => self.parse_dict(depth),
            Some('[') => self.parse_sequence(']', depth),
            Some('(') => self.parse_sequence(')', depth),
            Some(quote @ ('\'' | '"')) => self.parse_string(quote).map(Value::String),
            Some(c) if c.is_ascii_digit() || matches!(c, '-' | '+' | '.') => self.parse_number(),
            Some(c) if c.is_alphabetic() => self.parse_keyword(),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_sequence(&mut self, close: char, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => break,
                _ => return Err(self.error(format!("expected ',' or '{close}'"))),
            }
        }
        Ok(Value::Array(items))
    }

    fn parse_dict(&mut self, depth: usize) -> Result<Value, LiteralError> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }
            let key = match self.parse_value(depth + 1)? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => if b { "True" } else { "False" }.to_string(),
                Value::Null => "None".to_string(),
                _ => return Err(self.error("unhashable dictionary key")),
            };
            self.skip_whitespace();
            if self.bump() != Some(':') {
                return Err(self.error("expected ':'"));
            }
            let value = self.parse_value(depth + 1)?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
        Ok(Value::Object(map))
    }

    fn parse_string(&mut self, quote: char) -> Result<String, LiteralError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => self.parse_escape(&mut out)?,
                Some(c) => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<(), LiteralError> {
        match self.bump() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('x') => out.push(self.parse_hex(2)?),
            Some('u') => out.push(self.parse_hex(4)?),
            Some('U') => out.push(self.parse_hex(8)?),
            Some('\n') => {}
            Some(c @ ('\\' | '\'' | '"' | '/')) => out.push(c),
            Some(c) => {
                out.push('\\');
                out.push(c);
            }
            None => return Err(self.error("unterminated escape")),
        }
        Ok(())
    }

    fn parse_hex(&mut self, digits: usize) -> Result<char, LiteralError> {
        let start = self.pos;
        for _ in 0..digits {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => {}
                _ => return Err(self.error("invalid hex escape")),
            }
        }
        u32::from_str_radix(&self.src[start..self.pos], 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid code point"))
    }

    fn parse_number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
        {
            self.bump();
        }
        let text: String = self.src[start..self.pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(Number::from(int)));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| LiteralError {
                position: start,
                message: format!("invalid number {text:?}"),
            })
    }

    fn parse_keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            other => Err(LiteralError {
                position: start,
                message: format!("unknown identifier {other:?}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_json() {
        let value = decode_literal(r#"[{"id": 28, "name": "Action"}]"#).unwrap();
        assert_eq!(value, json!([{"id": 28, "name": "Action"}]));
    }

    #[test]
    fn test_decodes_python_literal() {
        let value =
            decode_literal("[{'id': 12, 'name': 'Adventure'}, {'id': 878, 'name': \"Sci'Fi\"}]")
                .unwrap();
        assert_eq!(
            value,
            json!([{"id": 12, "name": "Adventure"}, {"id": 878, "name": "Sci'Fi"}])
        );
    }

    #[test]
    fn test_python_keywords_and_numbers() {
        let value = decode_literal("{'a': True, 'b': None, 'c': -1.5, 'd': 1_000, 'e': (1, 2,)}")
            .unwrap();
        assert_eq!(
            value,
            json!({"a": true, "b": null, "c": -1.5, "d": 1000, "e": [1, 2]})
        );
    }

    #[test]
    fn test_escapes() {
        let value = decode_literal(r"{'name': 'It\'s\x20a é test'}").unwrap();
        assert_eq!(value["name"], "It's a é test");
    }

    #[test]
    fn test_trailing_comma() {
        let value = decode_literal("[{'name': 'A'},]").unwrap();
        assert_eq!(value, json!([{"name": "A"}]));
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(decode_literal("[{'name': 'A'}").is_err());
        assert!(decode_literal("{'name' 'A'}").is_err());
        assert!(decode_literal("{'name': 'A'} extra").is_err());
        assert!(decode_literal("{'name': undefined}").is_err());
        assert!(decode_literal("'unterminated").is_err());
        assert!(decode_literal("{['a']: 1}").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}{}", "[".repeat(200), "]".repeat(200));
        let err = decode_literal(&deep).unwrap_err();
        assert!(err.message.contains("nesting"));
    }
}

//! Raw extension option payloads attached to schema elements.
//!
//! The engine never sees compiled extension descriptors. A loader hands over each custom
//! option as a name plus an untyped [`OptionValue`], the same information protoc keeps in an
//! `UninterpretedOption`. Aggregate values (`{ name: "x" required: true }`) arrive as protobuf
//! text format and are parsed here.

use std::fmt;

/// An untyped option value, as written in the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i128),
    Float(f64),
    String(String),
    /// A bare identifier, usually an enum value name.
    Ident(String),
    /// A message literal; keys keep declaration order and may repeat.
    Aggregate(Vec<(String, OptionValue)>),
    List(Vec<OptionValue>),
}

impl OptionValue {
    pub fn aggregate<K: Into<String>>(entries: impl IntoIterator<Item = (K, OptionValue)>) -> Self {
        OptionValue::Aggregate(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        OptionValue::String(value.into())
    }

    pub fn ident(value: impl Into<String>) -> Self {
        OptionValue::Ident(value.into())
    }

    /// Returns the first value stored under `key` in an aggregate.
    pub fn get<'a>(&'a self, key: &'a str) -> Option<&'a OptionValue> {
        self.get_all(key).next()
    }

    /// Returns every value stored under `key` in an aggregate, flattening list literals.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a OptionValue> + 'a {
        let entries = match self {
            OptionValue::Aggregate(entries) => entries.as_slice(),
            _ => &[],
        };
        entries
            .iter()
            .filter(move |(k, _)| k == key)
            .flat_map(|(_, v)| match v {
                OptionValue::List(items) => items.iter().collect::<Vec<_>>(),
                other => vec![other],
            })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Ident(ident) if ident == "true" => Some(true),
            OptionValue::Ident(ident) if ident == "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The kind of literal, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "integer",
            OptionValue::Float(_) => "float",
            OptionValue::String(_) => "string",
            OptionValue::Ident(_) => "identifier",
            OptionValue::Aggregate(_) => "message",
            OptionValue::List(_) => "list",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::String(s) => write!(f, "{:?}", s),
            OptionValue::Ident(ident) => f.write_str(ident),
            OptionValue::Aggregate(entries) => {
                f.write_str("{")?;
                for (key, value) in entries {
                    write!(f, " {}: {}", key, value)?;
                }
                f.write_str(" }")
            }
            OptionValue::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A single custom option: the fully-qualified extension name and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOption {
    /// Extension name without parentheses or leading dot, e.g. `sebuf.http.unwrap`.
    pub name: String,
    pub value: OptionValue,
}

/// The custom options declared on one schema element, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions {
    entries: Vec<RawOption>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: OptionValue) {
        let name = name.into();
        let name = name.trim_start_matches('.').to_string();
        self.entries.push(RawOption { name, value });
    }

    /// Sets a sub-field of an aggregate extension, creating the aggregate on first use.
    ///
    /// This is how `option (ext).path = "/x";` style declarations are folded together.
    pub fn push_nested(&mut self, name: &str, path: &[String], value: OptionValue) {
        let name = name.trim_start_matches('.');
        let existing = self
            .entries
            .iter_mut()
            .find(|entry| entry.name == name && matches!(entry.value, OptionValue::Aggregate(_)));
        match existing {
            Some(entry) => insert_path(&mut entry.value, path, value),
            None => {
                let mut aggregate = OptionValue::Aggregate(Vec::new());
                insert_path(&mut aggregate, path, value);
                self.push(name, aggregate);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawOption> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn insert_path(target: &mut OptionValue, path: &[String], value: OptionValue) {
    let entries = match target {
        OptionValue::Aggregate(entries) => entries,
        _ => return,
    };
    match path {
        [] => {}
        [last] => entries.push((last.clone(), value)),
        [head, rest @ ..] => {
            let position = entries
                .iter()
                .position(|(k, v)| k == head && matches!(v, OptionValue::Aggregate(_)));
            let idx = match position {
                Some(idx) => idx,
                None => {
                    entries.push((head.clone(), OptionValue::Aggregate(Vec::new())));
                    entries.len() - 1
                }
            };
            insert_path(&mut entries[idx].1, rest, value);
        }
    }
}

/// An error produced while parsing a text-format aggregate value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid aggregate option value at offset {offset}: {message}")]
pub struct TextFormatError {
    pub offset: usize,
    pub message: String,
}

/// Parses the body of a text-format message literal, e.g. `path: "/a" method: HTTP_METHOD_GET`.
///
/// Surrounding braces are accepted but not required.
pub fn parse_aggregate(input: &str) -> Result<OptionValue, TextFormatError> {
    let mut parser = TextParser { input, pos: 0 };
    parser.skip_whitespace();
    let braced = parser.eat('{');
    let closing = if braced { Some('}') } else { None };
    let entries = parser.parse_fields(closing)?;
    if braced && !parser.eat('}') {
        return Err(parser.error("expected '}'"));
    }
    parser.skip_whitespace();
    if parser.pos != input.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(OptionValue::Aggregate(entries))
}

struct TextParser<'a> {
    input: &'a str,
    pos: usize,
}

impl TextParser<'_> {
    fn error(&self, message: impl Into<String>) -> TextFormatError {
        TextFormatError {
            offset: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn parse_fields(
        &mut self,
        closing: Option<char>,
    ) -> Result<Vec<(String, OptionValue)>, TextFormatError> {
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None if closing.is_none() => return Ok(entries),
                None => return Err(self.error("unexpected end of input")),
                Some(c) if Some(c) == closing => return Ok(entries),
                _ => {}
            }

            let key = self.parse_ident()?;
            let has_colon = self.eat(':');
            self.skip_whitespace();
            let value = match self.peek() {
                Some('{') | Some('<') => self.parse_message()?,
                _ if !has_colon => return Err(self.error(format!("expected ':' after '{}'", key))),
                _ => self.parse_value()?,
            };
            entries.push((key, value));

            // Field separators are optional.
            if !self.eat(',') {
                self.eat(';');
            }
        }
    }

    fn parse_message(&mut self) -> Result<OptionValue, TextFormatError> {
        let close = match self.bump() {
            Some('{') => '}',
            Some('<') => '>',
            _ => return Err(self.error("expected message literal")),
        };
        let entries = self.parse_fields(Some(close))?;
        if !self.eat(close) {
            return Err(self.error(format!("expected '{}'", close)));
        }
        Ok(OptionValue::Aggregate(entries))
    }

    fn parse_value(&mut self) -> Result<OptionValue, TextFormatError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    if self.eat(']') {
                        return Ok(OptionValue::List(items));
                    }
                    self.skip_whitespace();
                    let item = match self.peek() {
                        Some('{') | Some('<') => self.parse_message()?,
                        _ => self.parse_value()?,
                    };
                    items.push(item);
                    if !self.eat(',') && !self.eat(']') {
                        return Err(self.error("expected ',' or ']'"));
                    } else if self.input[..self.pos].ends_with(']') {
                        return Ok(OptionValue::List(items));
                    }
                }
            }
            Some('"') | Some('\'') => {
                let mut value = self.parse_string()?;
                // Adjacent string literals concatenate.
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some('"') | Some('\'') => value.push_str(&self.parse_string()?),
                        _ => break,
                    }
                }
                Ok(OptionValue::String(value))
            }
            Some(c) if c == '-' || c == '.' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.parse_ident()?;
                Ok(match ident.as_str() {
                    "true" | "True" | "t" => OptionValue::Bool(true),
                    "false" | "False" | "f" => OptionValue::Bool(false),
                    _ => OptionValue::Ident(ident),
                })
            }
            _ => Err(self.error("expected a value")),
        }
    }

    fn parse_ident(&mut self) -> Result<String, TextFormatError> {
        self.skip_whitespace();
        let start = self.pos;
        // Extension field names inside aggregates are written as `[pkg.ext]`.
        if self.peek() == Some('[') {
            self.bump();
            while let Some(c) = self.bump() {
                if c == ']' {
                    return Ok(self.input[start + 1..self.pos - 1].trim().to_string());
                }
            }
            return Err(self.error("unterminated extension name"));
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_number(&mut self) -> Result<OptionValue, TextFormatError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '+' || c == '.' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.pos];
        if let Ok(int) = literal.parse::<i128>() {
            return Ok(OptionValue::Int(int));
        }
        if let Some(hex) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
            if let Ok(int) = i128::from_str_radix(hex, 16) {
                return Ok(OptionValue::Int(int));
            }
        }
        let float_literal = literal.trim_end_matches(|c: char| c == 'f' || c == 'F');
        float_literal
            .parse::<f64>()
            .map(OptionValue::Float)
            .map_err(|_| self.error(format!("invalid number '{}'", literal)))
    }

    fn parse_string(&mut self) -> Result<String, TextFormatError> {
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error("expected string literal")),
        };
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some(c @ ('\\' | '\'' | '"' | '?')) => value.push(c),
                    Some(other) => {
                        return Err(self.error(format!("unsupported escape '\\{}'", other)))
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => value.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_flat_aggregate() {
        let value = parse_aggregate(r#"path: "/users/{id}" method: HTTP_METHOD_GET"#).unwrap();
        assert_eq!(
            value,
            OptionValue::aggregate([
                ("path", OptionValue::string("/users/{id}")),
                ("method", OptionValue::ident("HTTP_METHOD_GET")),
            ])
        );
    }

    #[test]
    fn test_parse_nested_and_repeated() {
        let value = parse_aggregate(
            r#"
            required_headers { name: "X-Api-Key" required: true format: 'uuid' }
            required_headers < name: "X-Trace" >
            "#,
        )
        .unwrap();
        let headers = value.get_all("required_headers").collect::<Vec<_>>();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].get("name"), Some(&OptionValue::string("X-Api-Key")));
        assert_eq!(headers[0].get("required").and_then(OptionValue::as_bool), Some(true));
        assert_eq!(headers[1].get("name"), Some(&OptionValue::string("X-Trace")));
    }

    #[test]
    fn test_parse_lists_numbers_and_separators() {
        let value =
            parse_aggregate("{ values: [\"1\", \"2\"], limit: -3; ratio: 0.5, big: 9007199254740993 }")
                .unwrap();
        assert_eq!(
            value.get_all("values").collect::<Vec<_>>(),
            vec![&OptionValue::string("1"), &OptionValue::string("2")]
        );
        assert_eq!(value.get("limit"), Some(&OptionValue::Int(-3)));
        assert_eq!(value.get("ratio"), Some(&OptionValue::Float(0.5)));
        assert_eq!(value.get("big"), Some(&OptionValue::Int(9_007_199_254_740_993)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_aggregate("path \"/a\"").is_err());
        assert!(parse_aggregate("path: \"unterminated").is_err());
        assert!(parse_aggregate("{ path: \"/a\"").is_err());
    }

    #[test]
    fn test_push_nested_merges_sub_fields() {
        let mut options = RawOptions::new();
        options.push_nested("sebuf.http.config", &["path".to_string()], OptionValue::string("/a"));
        options.push_nested(
            "sebuf.http.config",
            &["method".to_string()],
            OptionValue::ident("HTTP_METHOD_GET"),
        );
        let config = options.get("sebuf.http.config").unwrap();
        assert_eq!(config.get("path"), Some(&OptionValue::string("/a")));
        assert_eq!(config.get("method"), Some(&OptionValue::ident("HTTP_METHOD_GET")));
    }
}

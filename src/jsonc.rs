//! Tolerant JSON-with-comments parser used for schema documents.
//!
//! Accepts `//` line comments, `/* */` block comments and trailing commas.
//! The parser never stops at the first defect: it records a diagnostic,
//! resynchronizes on the next separator and keeps going, so one run reports
//! every syntax problem in the document. A document with any diagnostic is
//! rejected as a whole.

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::error::ParseDiagnostic;

const MAX_CONTAINER_DEPTH: usize = 64;

/// Parses JSONC text into a JSON value, or returns every detected defect.
pub fn parse(input: &str) -> Result<JsonValue, Vec<ParseDiagnostic>> {
    let (tokens, mut diagnostics, end) = tokenize(input);
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        diagnostics: Vec::new(),
    };
    let value = parser.parse_document();
    diagnostics.append(&mut parser.diagnostics);

    if diagnostics.is_empty() {
        Ok(value)
    } else {
        diagnostics.sort_by_key(|d| (d.line, d.column));
        Err(diagnostics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Punct {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Colon,
    Comma,
}

#[derive(Debug, Clone)]
enum TokenKind {
    Punct(Punct),
    String(String),
    Number(JsonNumber),
    Bool(bool),
    Null,
    /// Lexically broken value; already reported by the scanner.
    Invalid,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

impl Token {
    fn punct(&self) -> Option<Punct> {
        match self.kind {
            TokenKind::Punct(p) => Some(p),
            _ => None,
        }
    }

    fn starts_value(&self) -> bool {
        !matches!(
            self.kind,
            TokenKind::Punct(Punct::CloseBrace | Punct::CloseBracket | Punct::Colon | Punct::Comma)
        )
    }
}

fn diagnostic(line: usize, column: usize, message: impl Into<String>) -> ParseDiagnostic {
    ParseDiagnostic {
        line,
        column,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

struct Cursor {
    chars: Vec<char>,
    idx: usize,
    line: usize,
    column: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self {
            chars: input.chars().collect(),
            idx: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.idx + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.idx += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }
}

fn tokenize(input: &str) -> (Vec<Token>, Vec<ParseDiagnostic>, (usize, usize)) {
    let mut cursor = Cursor::new(input);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(ch) = cursor.peek() {
        let (line, column) = (cursor.line, cursor.column);

        if ch.is_whitespace() {
            cursor.bump();
            continue;
        }

        if ch == '/' {
            match cursor.peek_next() {
                Some('/') => {
                    while let Some(c) = cursor.peek() {
                        if c == '\n' {
                            break;
                        }
                        cursor.bump();
                    }
                    continue;
                }
                Some('*') => {
                    cursor.bump();
                    cursor.bump();
                    let mut closed = false;
                    while let Some(c) = cursor.bump() {
                        if c == '*' && cursor.peek() == Some('/') {
                            cursor.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        diagnostics.push(diagnostic(line, column, "unterminated block comment"));
                    }
                    continue;
                }
                _ => {}
            }
        }

        let kind = match ch {
            '{' => Some(TokenKind::Punct(Punct::OpenBrace)),
            '}' => Some(TokenKind::Punct(Punct::CloseBrace)),
            '[' => Some(TokenKind::Punct(Punct::OpenBracket)),
            ']' => Some(TokenKind::Punct(Punct::CloseBracket)),
            ':' => Some(TokenKind::Punct(Punct::Colon)),
            ',' => Some(TokenKind::Punct(Punct::Comma)),
            _ => None,
        };
        if let Some(kind) = kind {
            cursor.bump();
            tokens.push(Token { kind, line, column });
            continue;
        }

        let kind = if ch == '"' {
            scan_string(&mut cursor, &mut diagnostics)
        } else if ch == '-' || ch.is_ascii_digit() {
            scan_number(&mut cursor, &mut diagnostics)
        } else if ch.is_alphanumeric() || ch == '_' {
            scan_word(&mut cursor, &mut diagnostics)
        } else {
            cursor.bump();
            diagnostics.push(diagnostic(line, column, format!("invalid symbol '{ch}'")));
            TokenKind::Invalid
        };
        tokens.push(Token { kind, line, column });
    }

    (tokens, diagnostics, (cursor.line, cursor.column))
}

fn scan_string(cursor: &mut Cursor, diagnostics: &mut Vec<ParseDiagnostic>) -> TokenKind {
    let (line, column) = (cursor.line, cursor.column);
    cursor.bump();
    let mut out = String::new();

    loop {
        let Some(ch) = cursor.peek() else {
            diagnostics.push(diagnostic(line, column, "unterminated string"));
            return TokenKind::String(out);
        };

        match ch {
            '"' => {
                cursor.bump();
                return TokenKind::String(out);
            }
            '\n' | '\r' => {
                diagnostics.push(diagnostic(line, column, "unterminated string"));
                return TokenKind::String(out);
            }
            '\\' => {
                let (esc_line, esc_column) = (cursor.line, cursor.column);
                cursor.bump();
                match cursor.bump() {
                    Some('"') => out.push('"'),
                    Some('\\') => out.push('\\'),
                    Some('/') => out.push('/'),
                    Some('b') => out.push('\u{8}'),
                    Some('f') => out.push('\u{c}'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => match scan_unicode_escape(cursor) {
                        Some(decoded) => out.push(decoded),
                        None => diagnostics.push(diagnostic(
                            esc_line,
                            esc_column,
                            "invalid unicode escape sequence",
                        )),
                    },
                    Some(other) => diagnostics.push(diagnostic(
                        esc_line,
                        esc_column,
                        format!("invalid escape character '\\{other}'"),
                    )),
                    None => {
                        diagnostics.push(diagnostic(line, column, "unterminated string"));
                        return TokenKind::String(out);
                    }
                }
            }
            c if (c as u32) < 0x20 => {
                diagnostics.push(diagnostic(
                    cursor.line,
                    cursor.column,
                    "invalid control character in string",
                ));
                cursor.bump();
            }
            c => {
                out.push(c);
                cursor.bump();
            }
        }
    }
}

fn scan_hex4(cursor: &mut Cursor) -> Option<u32> {
    let mut value = 0u32;
    for _ in 0..4 {
        let digit = cursor.peek()?.to_digit(16)?;
        cursor.bump();
        value = value * 16 + digit;
    }
    Some(value)
}

fn scan_unicode_escape(cursor: &mut Cursor) -> Option<char> {
    let high = scan_hex4(cursor)?;
    if (0xD800..0xDC00).contains(&high) {
        if cursor.peek() != Some('\\') || cursor.peek_next() != Some('u') {
            return None;
        }
        cursor.bump();
        cursor.bump();
        let low = scan_hex4(cursor)?;
        if !(0xDC00..0xE000).contains(&low) {
            return None;
        }
        return char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00));
    }
    char::from_u32(high)
}

fn scan_number(cursor: &mut Cursor, diagnostics: &mut Vec<ParseDiagnostic>) -> TokenKind {
    let (line, column) = (cursor.line, cursor.column);
    let mut raw = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.') {
            raw.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    match parse_number(&raw) {
        Some(number) => TokenKind::Number(number),
        None => {
            diagnostics.push(diagnostic(line, column, format!("invalid number '{raw}'")));
            TokenKind::Invalid
        }
    }
}

fn parse_number(raw: &str) -> Option<JsonNumber> {
    if !is_json_number(raw) {
        return None;
    }

    let is_integer = !raw.contains(['.', 'e', 'E']);
    if is_integer {
        if let Ok(v) = raw.parse::<i64>() {
            return Some(JsonNumber::from(v));
        }
        if let Ok(v) = raw.parse::<u64>() {
            return Some(JsonNumber::from(v));
        }
    }
    raw.parse::<f64>().ok().and_then(JsonNumber::from_f64)
}

fn is_json_number(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let mut i = 0usize;

    if bytes.get(i) == Some(&b'-') {
        i += 1;
    }

    match bytes.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while bytes.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }

    if bytes.get(i) == Some(&b'.') {
        i += 1;
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }

    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return false;
        }
    }

    i == bytes.len()
}

fn scan_word(cursor: &mut Cursor, diagnostics: &mut Vec<ParseDiagnostic>) -> TokenKind {
    let (line, column) = (cursor.line, cursor.column);
    let mut word = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            cursor.bump();
        } else {
            break;
        }
    }

    match word.as_str() {
        "true" => TokenKind::Bool(true),
        "false" => TokenKind::Bool(false),
        "null" => TokenKind::Null,
        _ => {
            diagnostics.push(diagnostic(line, column, format!("invalid symbol '{word}'")));
            TokenKind::Invalid
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: (usize, usize),
    diagnostics: Vec<ParseDiagnostic>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self) -> Option<Punct> {
        self.peek().and_then(Token::punct)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn report_here(&mut self, message: impl Into<String>) {
        let (line, column) = match self.peek() {
            Some(token) => (token.line, token.column),
            None => self.end,
        };
        self.diagnostics.push(diagnostic(line, column, message));
    }

    fn parse_document(&mut self) -> JsonValue {
        if self.peek().is_none() {
            self.report_here("value expected");
            return JsonValue::Null;
        }

        let start = self.pos;
        let value = self.parse_value(0);
        if self.pos == start {
            return value;
        }

        if self.peek().is_some() {
            self.report_here("end of file expected");
        }
        value
    }

    fn parse_value(&mut self, depth: usize) -> JsonValue {
        let Some(token) = self.peek() else {
            self.report_here("value expected");
            return JsonValue::Null;
        };

        let value = match &token.kind {
            TokenKind::Punct(Punct::OpenBrace) => return self.parse_object(depth + 1),
            TokenKind::Punct(Punct::OpenBracket) => return self.parse_array(depth + 1),
            TokenKind::Punct(_) => {
                self.report_here("value expected");
                return JsonValue::Null;
            }
            TokenKind::String(s) => JsonValue::String(s.clone()),
            TokenKind::Number(n) => JsonValue::Number(n.clone()),
            TokenKind::Bool(b) => JsonValue::Bool(*b),
            TokenKind::Null | TokenKind::Invalid => JsonValue::Null,
        };
        self.advance();
        value
    }

    fn parse_object(&mut self, depth: usize) -> JsonValue {
        if depth > MAX_CONTAINER_DEPTH {
            self.report_here(format!(
                "maximum nesting depth exceeded ({MAX_CONTAINER_DEPTH})"
            ));
            self.skip_container();
            return JsonValue::Null;
        }

        self.advance();
        let mut map = JsonMap::new();

        loop {
            let Some(token) = self.peek() else {
                self.report_here("closing brace expected");
                break;
            };

            let key = match &token.kind {
                TokenKind::Punct(Punct::CloseBrace) => {
                    self.advance();
                    break;
                }
                TokenKind::String(key) => {
                    let key = (key.clone(), token.line, token.column);
                    self.advance();
                    Some(key)
                }
                _ => {
                    self.report_here("property name expected");
                    self.skip_until(&[Punct::Colon, Punct::Comma, Punct::CloseBrace]);
                    None
                }
            };

            if self.peek_punct() == Some(Punct::Colon) {
                self.advance();
                let value = self.parse_value(depth);
                if let Some((key, line, column)) = key {
                    if map.contains_key(&key) {
                        self.diagnostics
                            .push(diagnostic(line, column, format!("duplicate key '{key}'")));
                    } else {
                        map.insert(key, value);
                    }
                }
            } else if key.is_some() {
                self.report_here("colon expected");
                if self.peek().is_some_and(Token::starts_value) {
                    self.parse_value(depth);
                }
            }

            if !self.after_member(Punct::CloseBrace, "closing brace expected", |t| {
                matches!(t.kind, TokenKind::String(_))
            }) {
                break;
            }
        }

        JsonValue::Object(map)
    }

    fn parse_array(&mut self, depth: usize) -> JsonValue {
        if depth > MAX_CONTAINER_DEPTH {
            self.report_here(format!(
                "maximum nesting depth exceeded ({MAX_CONTAINER_DEPTH})"
            ));
            self.skip_container();
            return JsonValue::Null;
        }

        self.advance();
        let mut items = Vec::new();

        loop {
            match self.peek_punct() {
                _ if self.peek().is_none() => {
                    self.report_here("closing bracket expected");
                    break;
                }
                Some(Punct::CloseBracket) => {
                    self.advance();
                    break;
                }
                Some(Punct::Comma) => self.report_here("value expected"),
                _ => items.push(self.parse_value(depth)),
            }

            if !self.after_member(Punct::CloseBracket, "closing bracket expected", |t| {
                t.starts_value()
            }) {
                break;
            }
        }

        JsonValue::Array(items)
    }

    /// Consumes the separator after a container member.
    ///
    /// Returns `true` when another member follows and `false` once the
    /// container is closed (or the input ended).
    fn after_member(
        &mut self,
        close: Punct,
        close_message: &str,
        starts_member: fn(&Token) -> bool,
    ) -> bool {
        loop {
            let Some(token) = self.peek() else {
                self.report_here(close_message);
                return false;
            };

            match token.punct() {
                Some(Punct::Comma) => {
                    self.advance();
                    if self.peek_punct() == Some(close) {
                        self.advance();
                        return false;
                    }
                    return true;
                }
                Some(p) if p == close => {
                    self.advance();
                    return false;
                }
                _ => {
                    let missing_comma = starts_member(token);
                    self.report_here("comma expected");
                    if missing_comma {
                        return true;
                    }
                    self.skip_until(&[Punct::Comma, close]);
                }
            }
        }
    }

    /// Skips tokens (and whole nested containers) until one of `stops` is
    /// the next token at the current nesting level.
    fn skip_until(&mut self, stops: &[Punct]) {
        let mut nesting = 0usize;
        while let Some(token) = self.peek() {
            let punct = token.punct();
            if nesting == 0 && punct.is_some_and(|p| stops.contains(&p)) {
                return;
            }
            match punct {
                Some(Punct::OpenBrace | Punct::OpenBracket) => nesting += 1,
                Some(Punct::CloseBrace | Punct::CloseBracket) => nesting = nesting.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    fn skip_container(&mut self) {
        let mut nesting = 0usize;
        while let Some(token) = self.peek() {
            match token.punct() {
                Some(Punct::OpenBrace | Punct::OpenBracket) => nesting += 1,
                Some(Punct::CloseBrace | Punct::CloseBracket) => {
                    nesting = nesting.saturating_sub(1);
                    if nesting == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse;

    #[test]
    fn parses_comments_and_trailing_commas() {
        let input = r#"
// leading comment
{
    /* block
       comment */
    "metrics": [
        { "name": "lambda_delete", "unit": "none", }, // trailing
    ],
    "count": -1.5e2,
    "flag": true,
    "nothing": null,
}
"#;
        let value = parse(input).unwrap();
        assert_eq!(
            value,
            json!({
                "metrics": [{"name": "lambda_delete", "unit": "none"}],
                "count": -150.0,
                "flag": true,
                "nothing": null
            })
        );
    }

    #[test]
    fn decodes_string_escapes() {
        let value = parse(r#"["a\"b", "tab\there", "é", "😀"]"#).unwrap();
        assert_eq!(value, json!(["a\"b", "tab\there", "é", "😀"]));
    }

    #[test]
    fn collects_every_defect_instead_of_stopping() {
        let input = "{\n  \"a\": 1\n  \"b\": ,\n  \"c\" 3,\n}";
        let errors = parse(input).unwrap_err();
        let messages: Vec<&str> = errors.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["comma expected", "value expected", "colon expected"]
        );
        assert_eq!((errors[0].line, errors[0].column), (3, 3));
        assert_eq!((errors[1].line, errors[1].column), (3, 8));
        assert_eq!((errors[2].line, errors[2].column), (4, 7));
    }

    #[test]
    fn reports_lexical_errors_with_positions() {
        let input = "{\"a\": undefined, \"b\": 01, \"c\": 'x'}";
        let errors = parse(input).unwrap_err();
        let messages: Vec<&str> = errors.iter().map(|d| d.message.as_str()).collect();
        assert!(messages.contains(&"invalid symbol 'undefined'"));
        assert!(messages.contains(&"invalid number '01'"));
        assert!(messages.contains(&"invalid symbol '''"));
    }

    #[test]
    fn reports_unterminated_constructs() {
        let errors = parse("{\"a\": \"open").unwrap_err();
        assert!(errors.iter().any(|d| d.message == "unterminated string"));
        assert!(errors.iter().any(|d| d.message == "closing brace expected"));

        let errors = parse("[1, 2 /* never closed").unwrap_err();
        assert!(errors.iter().any(|d| d.message == "unterminated block comment"));
        assert!(errors.iter().any(|d| d.message == "closing bracket expected"));
    }

    #[test]
    fn rejects_empty_documents_and_trailing_content() {
        let errors = parse("   // only a comment\n").unwrap_err();
        assert_eq!(errors[0].message, "value expected");

        let errors = parse("{} {}").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "end of file expected");
    }

    #[test]
    fn reports_duplicate_keys() {
        let errors = parse(r#"{"a": 1, "a": 2}"#).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "duplicate key 'a'");
    }

    #[test]
    fn limits_nesting_depth() {
        let input = format!("{}{}", "[".repeat(80), "]".repeat(80));
        let errors = parse(&input).unwrap_err();
        assert!(errors
            .iter()
            .any(|d| d.message.starts_with("maximum nesting depth exceeded")));
    }
}

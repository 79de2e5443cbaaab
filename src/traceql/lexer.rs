//! TraceQL tokenizer.
//!
//! Splits a query into [`Token`]s that reference byte ranges of the source, so
//! later stages can reproduce matcher text exactly as the user wrote it.

use crate::domain::error::{Result, TracelensError};

/// Units accepted after a numeric literal to form a duration. Both the micro
/// sign (U+00B5) and the Greek mu (U+03BC) spell microseconds.
const DURATION_UNITS: [&str; 8] = ["ns", "us", "µs", "μs", "ms", "s", "m", "h"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `!`
    Not,
    /// `=`
    Eq,
    /// `!=`
    Neq,
    /// `=~`
    Regex,
    /// `!~`
    NotRegex,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>>`
    Descendant,
    /// `<<`
    Ancestor,
    /// `~`
    Sibling,
    /// `|`
    Pipe,
    /// Double-quoted or backtick-quoted string.
    String,
    Number,
    Duration,
    /// Attribute path, intrinsic or keyword.
    Identifier,
}

/// A token and the byte range it covers in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// The source text covered by this token.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Tokenizes a TraceQL query.
///
/// # Errors
///
/// Returns [`TracelensError::Query`] for unterminated strings, unknown
/// characters, and numbers with an unknown duration unit.
///
/// # Example
///
/// ```
/// use tracelens::traceql::lexer::{tokenize, TokenKind};
///
/// let tokens = tokenize(r#"{ name = "GET" }"#)?;
/// let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
/// assert_eq!(
///     kinds,
///     vec![
///         TokenKind::OpenBrace,
///         TokenKind::Identifier,
///         TokenKind::Eq,
///         TokenKind::String,
///         TokenKind::CloseBrace,
///     ]
/// );
/// # Ok::<(), tracelens::TracelensError>(())
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer { source, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.eat_while(char::is_whitespace);

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let kind = match c {
            '{' => self.single(TokenKind::OpenBrace),
            '}' => self.single(TokenKind::CloseBrace),
            '(' => self.single(TokenKind::OpenParen),
            ')' => self.single(TokenKind::CloseParen),
            '~' => self.single(TokenKind::Sibling),
            '&' => {
                if self.peek_second() == Some('&') {
                    self.pair(TokenKind::And)
                } else {
                    return Err(TracelensError::query(start, "expected `&&`"));
                }
            }
            '|' => {
                if self.peek_second() == Some('|') {
                    self.pair(TokenKind::Or)
                } else {
                    self.single(TokenKind::Pipe)
                }
            }
            '!' => match self.peek_second() {
                Some('=') => self.pair(TokenKind::Neq),
                Some('~') => self.pair(TokenKind::NotRegex),
                _ => self.single(TokenKind::Not),
            },
            '=' => match self.peek_second() {
                Some('~') => self.pair(TokenKind::Regex),
                _ => self.single(TokenKind::Eq),
            },
            '>' => match self.peek_second() {
                Some('=') => self.pair(TokenKind::Gte),
                Some('>') => self.pair(TokenKind::Descendant),
                _ => self.single(TokenKind::Gt),
            },
            '<' => match self.peek_second() {
                Some('=') => self.pair(TokenKind::Lte),
                Some('<') => self.pair(TokenKind::Ancestor),
                _ => self.single(TokenKind::Lt),
            },
            '"' | '`' => {
                self.string()?;
                TokenKind::String
            }
            '-' if self.peek_second().is_some_and(|n| n.is_ascii_digit()) => {
                self.bump();
                self.number()?
            }
            c if c.is_ascii_digit() => self.number()?,
            c if is_identifier_start(c) => {
                self.identifier()?;
                TokenKind::Identifier
            }
            other => {
                return Err(TracelensError::query(
                    start,
                    format!("unexpected character `{other}`"),
                ))
            }
        };

        Ok(Some(Token {
            kind,
            start,
            end: self.pos,
        }))
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        kind
    }

    fn pair(&mut self, kind: TokenKind) -> TokenKind {
        self.bump();
        self.bump();
        kind
    }

    /// Consumes a quoted string, including both quotes.
    fn string(&mut self) -> Result<()> {
        let start = self.pos;
        let Some(quote) = self.bump() else {
            return Err(TracelensError::query(start, "expected string"));
        };

        while let Some(c) = self.bump() {
            if c == quote {
                return Ok(());
            }
            // backtick strings are raw
            if c == '\\' && quote == '"' {
                self.bump();
            }
        }

        Err(TracelensError::query(start, "unterminated string"))
    }

    /// Consumes a number or a duration such as `1.5ms` or `1h30m`.
    fn number(&mut self) -> Result<TokenKind> {
        let mut kind = TokenKind::Number;
        loop {
            self.eat_while(|c| c.is_ascii_digit());
            if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
                self.eat_while(|c| c.is_ascii_digit());
            }

            let unit_start = self.pos;
            self.eat_while(|c| c.is_alphabetic());
            if unit_start == self.pos {
                return Ok(kind);
            }

            let unit = &self.source[unit_start..self.pos];
            if !DURATION_UNITS.contains(&unit) {
                return Err(TracelensError::query(
                    unit_start,
                    format!("unknown duration unit `{unit}`"),
                ));
            }
            kind = TokenKind::Duration;

            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Ok(kind);
            }
        }
    }

    /// Consumes an identifier. Attribute names may contain quoted segments,
    /// as in `span."http method"`.
    fn identifier(&mut self) -> Result<()> {
        loop {
            self.eat_while(is_identifier_continue);
            if self.source[..self.pos].ends_with('.') && self.peek() == Some('"') {
                self.string()?;
            } else {
                return Ok(());
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '.'
}

/// Attribute names may contain dashes, as in `span.http.request.header.content-type`.
fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '/' | '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<&str> {
        tokenize(source)
            .unwrap()
            .iter()
            .map(|t| t.text(source))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   \n\t").unwrap().is_empty());
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        assert_eq!(
            kinds("= =~ != !~ > >= < <= >> << ~ ! && || |"),
            vec![
                TokenKind::Eq,
                TokenKind::Regex,
                TokenKind::Neq,
                TokenKind::NotRegex,
                TokenKind::Gt,
                TokenKind::Gte,
                TokenKind::Lt,
                TokenKind::Lte,
                TokenKind::Descendant,
                TokenKind::Ancestor,
                TokenKind::Sibling,
                TokenKind::Not,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Pipe,
            ]
        );
    }

    #[test]
    fn test_unspaced_matcher() {
        assert_eq!(
            texts("span.http.status_code>=200"),
            vec!["span.http.status_code", ">=", "200"]
        );
    }

    #[test]
    fn test_string_keeps_escapes_in_text() {
        let source = r#"name = "span\"name""#;
        assert_eq!(texts(source), vec!["name", "=", r#""span\"name""#]);
    }

    #[test]
    fn test_backtick_string_is_raw() {
        let source = r"name = `a\`";
        assert_eq!(texts(source), vec!["name", "=", r"`a\`"]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize(r#"{ name = "abc }"#).unwrap_err();
        assert!(matches!(err, TracelensError::Query { offset: 9, .. }));
    }

    #[test]
    fn test_durations() {
        assert_eq!(
            kinds("100ms 1.5s 1h30m 250µs 5μs 42 -3"),
            vec![
                TokenKind::Duration,
                TokenKind::Duration,
                TokenKind::Duration,
                TokenKind::Duration,
                TokenKind::Duration,
                TokenKind::Number,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_unknown_duration_unit() {
        let err = tokenize("duration > 10parsecs").unwrap_err();
        assert!(matches!(err, TracelensError::Query { offset: 13, .. }));
    }

    #[test]
    fn test_scoped_identifiers() {
        assert_eq!(
            texts(r#"event:name="test" .foo span."http method""#),
            vec!["event:name", "=", r#""test""#, ".foo", r#"span."http method""#]
        );
    }

    #[test]
    fn test_identifiers_with_dashes() {
        assert_eq!(
            texts(r#"span.http.request.header.content-type="json" && span.x-request-id!=`a`"#),
            vec![
                "span.http.request.header.content-type",
                "=",
                r#""json""#,
                "&&",
                "span.x-request-id",
                "!=",
                "`a`",
            ]
        );
    }

    #[test]
    fn test_negative_number_after_operator() {
        assert_eq!(texts("span.retries-left>-1"), vec!["span.retries-left", ">", "-1"]);
        assert_eq!(
            kinds("span.a = -1"),
            vec![TokenKind::Identifier, TokenKind::Eq, TokenKind::Number]
        );
    }

    #[test]
    fn test_single_ampersand_is_rejected() {
        assert!(tokenize("{ a & b }").is_err());
    }
}

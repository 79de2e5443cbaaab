//! TraceQL syntax tree and recursive-descent parser.
//!
//! Only the part of the language the toolbar filter maps to is modelled:
//! spanset filters (`{ ... }`) combined by spanset operators, and inside them
//! field expressions built from comparisons, `&&`, `||`, `!` and parentheses.
//! Pipelines (`| count() > 1`) and arithmetic are rejected.
//! Nesting of groups, negations and chained operators is limited, so a
//! hostile query is rejected instead of exhausting the stack.
//!
//! Every leaf borrows its text from the query, so a matcher can be reproduced
//! byte-for-byte.
//!
//! ```text
//! query        := spanset (spanset_op spanset)*
//! spanset      := "{" field_or? "}" | "(" query ")"
//! field_or     := field_and ("||" field_and)*
//! field_and    := comparison ("&&" comparison)*
//! comparison   := unary (cmp_op unary)?
//! unary        := "!" unary | primary
//! primary      := "(" field_or ")" | identifier | string | number | duration
//! ```

use super::lexer::{tokenize, Token, TokenKind};
use crate::domain::error::{Result, TracelensError};

/// Intrinsic fields addressable without a scope.
const INTRINSICS: [&str; 13] = [
    "name",
    "status",
    "statusMessage",
    "kind",
    "duration",
    "traceDuration",
    "rootName",
    "rootServiceName",
    "childCount",
    "nestedSetLeft",
    "nestedSetRight",
    "nestedSetParent",
    "parent",
];

/// Scopes allowed before `:` in scoped intrinsics such as `span:name`.
const INTRINSIC_SCOPES: [&str; 5] = ["span", "trace", "event", "link", "instrumentation"];

/// Scopes allowed before `.` in attribute paths such as `resource.service.name`.
const ATTRIBUTE_SCOPES: [&str; 6] = ["span.", "resource.", "event.", "link.", "instrumentation.", "parent."];

/// Deepest nesting of groups, negations and chained operators a query may use.
const MAX_DEPTH: usize = 256;

/// Keywords that are static values rather than fields.
const KEYWORDS: [&str; 12] = [
    "true",
    "false",
    "nil",
    "ok",
    "error",
    "unset",
    "unspecified",
    "internal",
    "server",
    "client",
    "producer",
    "consumer",
];

/// A parsed query: spanset filters joined by spanset operators.
#[derive(Debug, Clone, PartialEq)]
pub enum SpansetExpr<'a> {
    Filter(SpansetFilter<'a>),
    Binary {
        lhs: Box<SpansetExpr<'a>>,
        op: SpansetOp,
        rhs: Box<SpansetExpr<'a>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpansetOp {
    And,
    Or,
    Descendant,
    Ancestor,
    Child,
    Parent,
    Sibling,
}

/// A single `{ ... }` block. `{}` has no expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SpansetFilter<'a> {
    pub expr: Option<FieldExpr<'a>>,
}

/// An expression inside a spanset filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldExpr<'a> {
    Comparison {
        lhs: Box<FieldExpr<'a>>,
        op: FieldOp<'a>,
        rhs: Box<FieldExpr<'a>>,
    },
    Logical {
        lhs: Box<FieldExpr<'a>>,
        op: LogicalOp,
        rhs: Box<FieldExpr<'a>>,
    },
    Not(Box<FieldExpr<'a>>),
    Group(Box<FieldExpr<'a>>),
    Field(Field<'a>),
    Static(Static<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A comparison operator and its source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOp<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// User-defined attribute, e.g. `resource.service.name` or `.foo`.
    Attribute,
    /// Built-in field, e.g. `status` or `event:name`.
    Intrinsic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub kind: FieldKind,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticKind {
    String,
    Number,
    Duration,
    Keyword,
}

/// A literal value. `text` includes quotes for strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Static<'a> {
    pub kind: StaticKind,
    pub text: &'a str,
}

/// Parses a TraceQL query into a syntax tree.
///
/// # Errors
///
/// Returns [`TracelensError::Query`] if the query is not valid in the
/// supported subset, or nests deeper than the parser accepts.
///
/// # Example
///
/// ```
/// use tracelens::traceql::syntax::{parse, SpansetExpr};
///
/// let query = parse("{ status = error } >> { name = \"db\" }")?;
/// assert!(matches!(query, SpansetExpr::Binary { .. }));
/// # Ok::<(), tracelens::TracelensError>(())
/// ```
pub fn parse(source: &str) -> Result<SpansetExpr<'_>> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };

    let expr = parser.spanset_expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) if token.kind == TokenKind::Pipe => Err(TracelensError::query(
            token.start,
            "pipeline stages are not supported",
        )),
        Some(token) => Err(TracelensError::query(
            token.start,
            format!("unexpected `{}`", token.text(source)),
        )),
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    /// Nesting level of the node being parsed; bounds the recursion.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    /// Byte offset used in errors when input ends early.
    fn offset(&self) -> usize {
        self.peek().map_or(self.source.len(), |t| t.start)
    }

    /// Enters one more level of nesting. Callers restore `depth` on return.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(TracelensError::query(
                self.offset(),
                "expression nested too deeply",
            ));
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(TracelensError::query(
                token.start,
                format!("expected {what}, found `{}`", token.text(self.source)),
            )),
            None => Err(TracelensError::query(
                self.source.len(),
                format!("expected {what}, found end of query"),
            )),
        }
    }

    fn spanset_expr(&mut self) -> Result<SpansetExpr<'a>> {
        let depth = self.depth;
        let mut lhs = self.spanset_primary()?;
        while let Some(op) = self.peek_kind().and_then(spanset_op) {
            self.advance();
            self.descend()?;
            let rhs = self.spanset_primary()?;
            lhs = SpansetExpr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn spanset_primary(&mut self) -> Result<SpansetExpr<'a>> {
        match self.peek_kind() {
            Some(TokenKind::OpenParen) => {
                self.advance();
                self.descend()?;
                let expr = self.spanset_expr()?;
                self.depth -= 1;
                self.expect(TokenKind::CloseParen, "`)`")?;
                Ok(expr)
            }
            Some(TokenKind::OpenBrace) => {
                self.advance();
                let expr = if self.peek_kind() == Some(TokenKind::CloseBrace) {
                    None
                } else {
                    Some(self.field_or()?)
                };
                self.expect(TokenKind::CloseBrace, "`}`")?;
                Ok(SpansetExpr::Filter(SpansetFilter { expr }))
            }
            _ => Err(TracelensError::query(self.offset(), "expected `{`")),
        }
    }

    fn field_or(&mut self) -> Result<FieldExpr<'a>> {
        let depth = self.depth;
        let mut lhs = self.field_and()?;
        while self.peek_kind() == Some(TokenKind::Or) {
            self.advance();
            self.descend()?;
            let rhs = self.field_and()?;
            lhs = FieldExpr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::Or,
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn field_and(&mut self) -> Result<FieldExpr<'a>> {
        let depth = self.depth;
        let mut lhs = self.comparison()?;
        while self.peek_kind() == Some(TokenKind::And) {
            self.advance();
            self.descend()?;
            let rhs = self.comparison()?;
            lhs = FieldExpr::Logical {
                lhs: Box::new(lhs),
                op: LogicalOp::And,
                rhs: Box::new(rhs),
            };
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<FieldExpr<'a>> {
        let lhs = self.unary()?;
        let Some(token) = self.peek().filter(|t| is_comparison(t.kind)) else {
            return Ok(lhs);
        };
        self.advance();
        let rhs = self.unary()?;
        Ok(FieldExpr::Comparison {
            lhs: Box::new(lhs),
            op: FieldOp {
                kind: token.kind,
                text: token.text(self.source),
            },
            rhs: Box::new(rhs),
        })
    }

    fn unary(&mut self) -> Result<FieldExpr<'a>> {
        if self.peek_kind() == Some(TokenKind::Not) {
            self.advance();
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(FieldExpr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<FieldExpr<'a>> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(TracelensError::query(offset, "expected expression, found end of query"));
        };
        let text = token.text(self.source);

        let static_of = |kind| FieldExpr::Static(Static { kind, text });
        match token.kind {
            TokenKind::OpenParen => {
                self.descend()?;
                let inner = self.field_or()?;
                self.depth -= 1;
                self.expect(TokenKind::CloseParen, "`)`")?;
                Ok(FieldExpr::Group(Box::new(inner)))
            }
            TokenKind::String => Ok(static_of(StaticKind::String)),
            TokenKind::Number => Ok(static_of(StaticKind::Number)),
            TokenKind::Duration => Ok(static_of(StaticKind::Duration)),
            TokenKind::Identifier => classify_identifier(text)
                .ok_or_else(|| TracelensError::query(token.start, format!("unknown identifier `{text}`"))),
            _ => Err(TracelensError::query(
                token.start,
                format!("expected expression, found `{text}`"),
            )),
        }
    }
}

fn spanset_op(kind: TokenKind) -> Option<SpansetOp> {
    match kind {
        TokenKind::And => Some(SpansetOp::And),
        TokenKind::Or => Some(SpansetOp::Or),
        TokenKind::Descendant => Some(SpansetOp::Descendant),
        TokenKind::Ancestor => Some(SpansetOp::Ancestor),
        TokenKind::Gt => Some(SpansetOp::Child),
        TokenKind::Lt => Some(SpansetOp::Parent),
        TokenKind::Sibling => Some(SpansetOp::Sibling),
        _ => None,
    }
}

const fn is_comparison(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eq
            | TokenKind::Neq
            | TokenKind::Regex
            | TokenKind::NotRegex
            | TokenKind::Gt
            | TokenKind::Gte
            | TokenKind::Lt
            | TokenKind::Lte
    )
}

fn classify_identifier(text: &str) -> Option<FieldExpr<'_>> {
    if KEYWORDS.contains(&text) {
        return Some(FieldExpr::Static(Static {
            kind: StaticKind::Keyword,
            text,
        }));
    }

    let kind = if INTRINSICS.contains(&text) {
        FieldKind::Intrinsic
    } else if let Some((scope, name)) = text.split_once(':') {
        if !INTRINSIC_SCOPES.contains(&scope) || name.is_empty() {
            return None;
        }
        FieldKind::Intrinsic
    } else if (text.len() > 1 && text.starts_with('.'))
        || ATTRIBUTE_SCOPES
            .iter()
            .any(|scope| text.len() > scope.len() && text.starts_with(scope))
    {
        FieldKind::Attribute
    } else {
        return None;
    };

    Some(FieldExpr::Field(Field { kind, text }))
}

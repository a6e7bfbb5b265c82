//! Token types for the PlanOut lexer.
//!
//! Defines [`TokenKind`] covering every lexeme in the language and
//! [`Token`], which pairs a kind with the 1-based source line it started on.

use serde_json::Value;
use std::fmt;

/// A single token produced by the PlanOut lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// 1-based source line, used in error reporting.
    pub line: u32,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, line: u32) -> Self {
        Self { kind, line }
    }
}

/// Every token kind in the PlanOut language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Identifier: `my_var`, `event.type` (dots are legal inside).
    Ident(String),
    /// Numeric literal, kept as raw text; the parser decides int vs float.
    Number(String),
    /// String literal (quotes stripped, no escapes).
    Str(String),
    /// Pre-parsed payload of an `@…` JSON literal.
    Json(Value),

    // ── Keywords ──────────────────────────────────────────────

    /// `if`
    If,
    /// `else`
    Else,
    /// `return`
    Return,
    /// `switch`
    Switch,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,

    // ── Operators ─────────────────────────────────────────────

    /// `=`
    Assign,
    /// `<-` (alternate assignment, identical to `=`)
    Arrow,
    /// `=>` (switch-case arrow)
    Then,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `!`
    Not,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `??`
    Coalesce,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,

    // ── Punctuation ───────────────────────────────────────────

    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,

    // ── Special ───────────────────────────────────────────────

    /// A lexing failure; terminal. Carries the message.
    Error(String),
    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up a reserved word. Returns `None` for ordinary identifiers.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "return" => TokenKind::Return,
            "switch" => TokenKind::Switch,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(s) => f.write_str(s),
            TokenKind::Number(s) => f.write_str(s),
            TokenKind::Str(s) => write!(f, "\"{s}\""),
            TokenKind::Json(v) => write!(f, "@{v}"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::Return => f.write_str("return"),
            TokenKind::Switch => f.write_str("switch"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Null => f.write_str("null"),
            TokenKind::Assign => f.write_str("="),
            TokenKind::Arrow => f.write_str("<-"),
            TokenKind::Then => f.write_str("=>"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::NotEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Not => f.write_str("!"),
            TokenKind::Or => f.write_str("||"),
            TokenKind::And => f.write_str("&&"),
            TokenKind::Coalesce => f.write_str("??"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Error(msg) => f.write_str(msg),
            TokenKind::Eof => f.write_str("end of file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_keyword_recognises_all() {
        for kw in ["if", "else", "return", "switch", "true", "false", "null"] {
            assert!(
                TokenKind::from_keyword(kw).is_some(),
                "from_keyword should recognise '{kw}'"
            );
        }
    }

    #[test]
    fn test_from_keyword_returns_none_for_identifiers() {
        for name in ["foo", "returning", "If", "TRUE", "nul", "switch_on"] {
            assert!(
                TokenKind::from_keyword(name).is_none(),
                "from_keyword should not recognise '{name}'"
            );
        }
    }

    #[test]
    fn test_display_matches_source_text() {
        assert_eq!(TokenKind::Arrow.to_string(), "<-");
        assert_eq!(TokenKind::Then.to_string(), "=>");
        assert_eq!(TokenKind::Coalesce.to_string(), "??");
        assert_eq!(TokenKind::NotEq.to_string(), "!=");
        assert_eq!(TokenKind::Ident("event.type".into()).to_string(), "event.type");
    }
}

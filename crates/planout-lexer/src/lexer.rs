//! Core PlanOut lexer: converts source text to a token stream.
//!
//! Features:
//! - Pull-based: callers request one token at a time via [`Lexer::next_token`]
//! - `#` comments stripped to end of line
//! - Single- or double-quoted strings with no escape sequences
//! - `@…` JSON literals consumed by a strict streaming JSON parser
//! - Errors are delivered as a terminal [`TokenKind::Error`] token carrying
//!   the line number; after one error every further pull returns `Eof`

use serde_json::Value;

use crate::token::{Token, TokenKind};

/// The PlanOut lexer.
///
/// Scans an in-memory source string and emits tokens on demand. A lexer is
/// restartable only by constructing a new one.
pub struct Lexer<'src> {
    /// The full source text.
    source: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Set once an error token has been emitted; the stream is then exhausted.
    failed: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given script source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            failed: false,
        }
    }

    /// Produce the next token.
    ///
    /// Callers should stop iterating when they receive an `Error` or `Eof`
    /// token; after an error the lexer only returns `Eof`.
    pub fn next_token(&mut self) -> Token {
        if self.failed {
            return Token::new(TokenKind::Eof, self.line);
        }

        self.skip_whitespace_and_comments();

        let line = self.line;
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::Eof, line),
        };

        match ch {
            'A'..='Z' | 'a'..='z' => self.scan_identifier(line),
            '0'..='9' => self.scan_number(line),
            '\'' | '"' => {
                self.advance();
                self.scan_string(ch, line)
            }
            '@' => {
                self.advance();
                self.scan_json(line)
            }
            '=' => {
                self.advance();
                if self.eat('=') {
                    Token::new(TokenKind::EqEq, line)
                } else if self.eat('>') {
                    Token::new(TokenKind::Then, line)
                } else {
                    Token::new(TokenKind::Assign, line)
                }
            }
            '<' => {
                self.advance();
                if self.eat('=') {
                    Token::new(TokenKind::LessEq, line)
                } else if self.eat('-') {
                    Token::new(TokenKind::Arrow, line)
                } else {
                    Token::new(TokenKind::Less, line)
                }
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    Token::new(TokenKind::GreaterEq, line)
                } else {
                    Token::new(TokenKind::Greater, line)
                }
            }
            '!' => {
                self.advance();
                if self.eat('=') {
                    Token::new(TokenKind::NotEq, line)
                } else {
                    Token::new(TokenKind::Not, line)
                }
            }
            '|' => {
                self.advance();
                if self.eat('|') {
                    Token::new(TokenKind::Or, line)
                } else {
                    self.error(line, "invalid token: \"|\" (use \"||\" for OR)")
                }
            }
            '&' => {
                self.advance();
                if self.eat('&') {
                    Token::new(TokenKind::And, line)
                } else {
                    self.error(line, "invalid token: \"&\" (use \"&&\" for AND)")
                }
            }
            '?' => {
                self.advance();
                if self.eat('?') {
                    Token::new(TokenKind::Coalesce, line)
                } else {
                    self.error(line, "invalid token: \"?\" (use \"??\" for COALESCE)")
                }
            }
            '+' => self.single(TokenKind::Plus, line),
            '-' => self.single(TokenKind::Minus, line),
            '*' => self.single(TokenKind::Star, line),
            '/' => self.single(TokenKind::Slash, line),
            '%' => self.single(TokenKind::Percent, line),
            ':' => self.single(TokenKind::Colon, line),
            ',' => self.single(TokenKind::Comma, line),
            ';' => self.single(TokenKind::Semicolon, line),
            '[' => self.single(TokenKind::LBracket, line),
            ']' => self.single(TokenKind::RBracket, line),
            '(' => self.single(TokenKind::LParen, line),
            ')' => self.single(TokenKind::RParen, line),
            '{' => self.single(TokenKind::LBrace, line),
            '}' => self.single(TokenKind::RBrace, line),
            other => {
                self.advance();
                self.error(line, format!("unexpected character: '{other}'"))
            }
        }
    }

    /// Collect every remaining token, including the terminal `Eof`.
    pub fn lex(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Consume the next character if it matches.
    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn single(&mut self, kind: TokenKind, line: u32) -> Token {
        self.advance();
        Token::new(kind, line)
    }

    fn error(&mut self, line: u32, message: impl Into<String>) -> Token {
        self.failed = true;
        Token::new(TokenKind::Error(message.into()), line)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                '#' => {
                    // Comment runs to end of line; the newline itself is
                    // consumed by the whitespace arm on the next iteration.
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanners
    // ─────────────────────────────────────────────────────────────

    /// Identifiers start with a letter and continue with letters, digits,
    /// underscores, or dots. Reserved words are reclassified.
    fn scan_identifier(&mut self, line: u32) -> Token {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = &self.source[start..self.pos];
        match TokenKind::from_keyword(lexeme) {
            Some(kind) => Token::new(kind, line),
            None => Token::new(TokenKind::Ident(lexeme.to_string()), line),
        }
    }

    /// Numbers: digits, optional fraction, optional exponent. A trailing
    /// alphanumeric or underscore makes the whole lexeme invalid.
    fn scan_number(&mut self, line: u32) -> Token {
        let start = self.pos;
        self.accept_digits();
        if self.eat('.') {
            self.accept_digits();
        }
        if self.peek() == Some('e') || self.peek() == Some('E') {
            self.advance();
            if self.peek() == Some('+') || self.peek() == Some('-') {
                self.advance();
            }
            self.accept_digits();
        }

        if matches!(self.peek(), Some(ch) if ch.is_ascii_alphanumeric() || ch == '_') {
            self.advance();
            let lexeme = &self.source[start..self.pos];
            return self.error(line, format!("bad number syntax: \"{lexeme}\""));
        }

        Token::new(TokenKind::Number(self.source[start..self.pos].to_string()), line)
    }

    fn accept_digits(&mut self) {
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.advance();
        }
    }

    /// Strings run to the matching close quote on the same line. There are
    /// no escape sequences.
    fn scan_string(&mut self, close_quote: char, line: u32) -> Token {
        let start = self.pos;
        loop {
            match self.peek() {
                None => return self.error(line, "EOF while scanning string"),
                Some('\n') | Some('\r') => {
                    return self.error(line, "new line while scanning string")
                }
                Some(ch) if ch == close_quote => {
                    let lexeme = self.source[start..self.pos].to_string();
                    self.advance();
                    return Token::new(TokenKind::Str(lexeme), line);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    /// `@` literals hand the rest of the input to a streaming JSON parser,
    /// which consumes exactly one balanced value and reports how many bytes
    /// it read.
    fn scan_json(&mut self, line: u32) -> Token {
        let rest = &self.source[self.pos..];
        let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                self.line += rest[..consumed].matches('\n').count() as u32;
                self.pos += consumed;
                Token::new(TokenKind::Json(value), line)
            }
            Some(Err(err)) => self.error(line, format!("failed to parse JSON literal: {err}")),
            None => self.error(line, "failed to parse JSON literal: unexpected end of input"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).lex().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_two_char_before_one_char() {
        assert_eq!(
            kinds("= == => < <= <- > >= ! != || && ??"),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::Then,
                TokenKind::Less,
                TokenKind::LessEq,
                TokenKind::Arrow,
                TokenKind::Greater,
                TokenKind::GreaterEq,
                TokenKind::Not,
                TokenKind::NotEq,
                TokenKind::Or,
                TokenKind::And,
                TokenKind::Coalesce,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifier_with_dot() {
        assert_eq!(
            kinds("event.type"),
            vec![TokenKind::Ident("event.type".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_bad_number_syntax() {
        let tokens = Lexer::new("x = 12e4x").lex();
        assert_eq!(
            tokens[2].kind,
            TokenKind::Error("bad number syntax: \"12e4x\"".into())
        );
        // terminal: next pull is Eof
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("x = 'abc").lex();
        assert_eq!(
            tokens[2].kind,
            TokenKind::Error("EOF while scanning string".into())
        );
    }

    #[test]
    fn test_string_with_newline() {
        let tokens = Lexer::new("x = \"ab\ncd\"").lex();
        assert_eq!(
            tokens[2].kind,
            TokenKind::Error("new line while scanning string".into())
        );
    }

    #[test]
    fn test_lone_pipe_ampersand_question() {
        assert!(matches!(kinds("a | b")[1], TokenKind::Error(_)));
        assert!(matches!(kinds("a & b")[1], TokenKind::Error(_)));
        assert!(matches!(kinds("a ? b")[1], TokenKind::Error(_)));
    }

    #[test]
    fn test_comment_and_line_numbers() {
        let tokens = Lexer::new("# heading\nx = 1;\ny = 2;").lex();
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".into()));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[4].kind, TokenKind::Ident("y".into()));
        assert_eq!(tokens[4].line, 3);
    }

    #[test]
    fn test_json_literal_object() {
        let tokens = Lexer::new("x = @{\"a\": 1};").lex();
        assert_eq!(tokens[2].kind, TokenKind::Json(json!({"a": 1})));
        assert_eq!(tokens[3].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_json_literal_scalar_and_array() {
        let tokens = Lexer::new("x = @[1, 2, 3]; y = @3.5;").lex();
        assert_eq!(tokens[2].kind, TokenKind::Json(json!([1, 2, 3])));
        assert_eq!(tokens[6].kind, TokenKind::Json(json!(3.5)));
    }

    #[test]
    fn test_json_literal_bad_payload() {
        let tokens = Lexer::new("x = @{oops};").lex();
        assert!(matches!(tokens[2].kind, TokenKind::Error(_)));
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(
            kinds("1 3.14 3.14E-9 10e4"),
            vec![
                TokenKind::Number("1".into()),
                TokenKind::Number("3.14".into()),
                TokenKind::Number("3.14E-9".into()),
                TokenKind::Number("10e4".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_reclassified() {
        assert_eq!(
            kinds("if else return switch true false null ifx"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Return,
                TokenKind::Switch,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Ident("ifx".into()),
                TokenKind::Eof,
            ]
        );
    }
}

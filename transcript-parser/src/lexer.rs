// transcript-parser - Lexer for TranScript
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for TranScript source code.
//!
//! Converts a source string into a stream of tokens. Token kinds follow the
//! surface grammar: C-style comments, double-quoted strings with backslash
//! escapes, identifiers, operator runs, integers and floats. Every token
//! carries the source file name and line for error annotation.

use std::fmt;
use std::rc::Rc;

/// The lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input.
    Eof,
    /// String literal, raw text including the quotes.
    Str,
    /// Integer literal.
    Int,
    /// Float literal.
    Float,
    /// Identifier or keyword.
    Ident,
    /// Run of operator characters (`! $ % ^ & * - = + ~ ? @ < > |`).
    Op,
    /// Single-character punctuation: `[ ] ( ) { } ; : , .`
    Punct,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub file: Rc<str>,
    pub line: u32,
}

impl Token {
    /// True if this token is the given identifier or punctuation text.
    #[inline]
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "{}", self.text),
        }
    }
}

/// Lexer error with position information.
#[derive(Debug, Clone)]
pub struct LexError {
    pub message: String,
    pub file: Rc<str>,
    pub line: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}): {}", self.file, self.line, self.message)
    }
}

impl std::error::Error for LexError {}

const OP_CHARS: &str = "!$%^&*-=+~?@<>|";

/// The lexer converts source code into tokens, with one token of lookahead.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    file: Rc<str>,
    pending: Option<Token>,
}

impl Lexer {
    /// Create a new lexer for the given source code.
    pub fn new(source: &str, file: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            file: Rc::from(file),
            pending: None,
        }
    }

    /// Consume and return the next token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        match self.pending.take() {
            Some(t) => Ok(t),
            None => self.scan(),
        }
    }

    /// Return the next token without consuming it.
    pub fn lookahead(&mut self) -> Result<&Token, LexError> {
        if self.pending.is_none() {
            self.pending = Some(self.scan()?);
        }
        Ok(self.pending.as_ref().unwrap())
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn token(&self, kind: TokenKind, text: String, line: u32) -> Token {
        Token {
            kind,
            text,
            file: Rc::clone(&self.file),
            line,
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            message: message.into(),
            file: Rc::clone(&self.file),
            line: self.line,
        }
    }

    fn scan(&mut self) -> Result<Token, LexError> {
        loop {
            let line = self.line;
            let c = match self.advance() {
                Some(c) => c,
                None => return Ok(self.token(TokenKind::Eof, String::new(), line)),
            };
            match c {
                ' ' | '\t' | '\r' | '\n' => continue,
                '[' | ']' | '(' | ')' | '{' | '}' | ';' | ':' | ',' | '.' => {
                    return Ok(self.token(TokenKind::Punct, c.to_string(), line));
                }
                '/' => match self.peek() {
                    Some('/') => {
                        self.skip_line_comment();
                        continue;
                    }
                    Some('*') => {
                        self.advance();
                        self.skip_block_comment()?;
                        continue;
                    }
                    _ => return Ok(self.token(TokenKind::Op, "/".into(), line)),
                },
                '"' => return self.scan_string(line),
                _ if OP_CHARS.contains(c) => return Ok(self.scan_op(c, line)),
                _ if c == '_' || c.is_alphabetic() => return Ok(self.scan_ident(c, line)),
                _ if c.is_ascii_digit() => return self.scan_number(c, line),
                _ => return Err(self.error(format!("illegal character: {c:?}"))),
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.advance() {
            if c == '\n' {
                break;
            }
        }
    }

    // Block comments do not nest.
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        loop {
            match self.advance() {
                None => return Err(self.error("unexpected end of input in comment")),
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    fn scan_string(&mut self, line: u32) -> Result<Token, LexError> {
        let mut text = String::from('"');
        loop {
            match self.advance() {
                None => return Err(self.error("unexpected end of input in string")),
                Some('"') => {
                    text.push('"');
                    return Ok(self.token(TokenKind::Str, text, line));
                }
                Some('\\') => {
                    text.push('\\');
                    match self.advance() {
                        None => return Err(self.error("unexpected end of input in string")),
                        Some(c) => text.push(c),
                    }
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn scan_op(&mut self, first: char, line: u32) -> Token {
        let mut text = first.to_string();
        while let Some(c) = self.peek() {
            if !OP_CHARS.contains(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.token(TokenKind::Op, text, line)
    }

    fn scan_ident(&mut self, first: char, line: u32) -> Token {
        let mut text = first.to_string();
        while let Some(c) = self.peek() {
            if c != '_' && !c.is_alphabetic() && !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }
        self.token(TokenKind::Ident, text, line)
    }

    // A "." only starts the fractional part if a digit follows; otherwise it
    // is left for the member-access operator.
    fn scan_number(&mut self, first: char, line: u32) -> Result<Token, LexError> {
        let mut text = first.to_string();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            text.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return Ok(self.token(TokenKind::Float, text, line));
        }
        Ok(self.token(TokenKind::Int, text, line))
    }

    fn peek_second(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut l = Lexer::new(src, "test");
        let mut out = Vec::new();
        loop {
            let t = l.next_token().expect("lex error");
            if t.kind == TokenKind::Eof {
                return out;
            }
            out.push(t.kind);
        }
    }

    fn texts(src: &str) -> Vec<String> {
        let mut l = Lexer::new(src, "test");
        let mut out = Vec::new();
        loop {
            let t = l.next_token().expect("lex error");
            if t.kind == TokenKind::Eof {
                return out;
            }
            out.push(t.text);
        }
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("[](){};:,."),
            vec![TokenKind::Punct; 10],
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("0 150 14.72"), vec![TokenKind::Int, TokenKind::Int, TokenKind::Float]);
        // a trailing dot is member access, not a float
        assert_eq!(
            kinds("1.toString"),
            vec![TokenKind::Int, TokenKind::Punct, TokenKind::Ident]
        );
    }

    #[test]
    fn test_operators_run_together() {
        assert_eq!(texts("a<=b"), vec!["a", "<=", "b"]);
        assert_eq!(texts("x==-1"), vec!["x", "==-", "1"]);
    }

    #[test]
    fn test_strings_keep_quotes() {
        assert_eq!(texts(r#""hi\n""#), vec![r#""hi\n""#]);
    }

    #[test]
    fn test_comments() {
        assert_eq!(texts("a // comment\nb"), vec!["a", "b"]);
        assert_eq!(texts("a /* x\ny */ b"), vec!["a", "b"]);
        // a lone slash is division
        assert_eq!(texts("a / b"), vec!["a", "/", "b"]);
    }

    #[test]
    fn test_lines_tracked() {
        let mut l = Lexer::new("a\nb", "test");
        assert_eq!(l.next_token().unwrap().line, 1);
        assert_eq!(l.next_token().unwrap().line, 2);
    }

    #[test]
    fn test_illegal_character() {
        let mut l = Lexer::new("#", "test");
        assert!(l.next_token().is_err());
    }
}

//! Lexer for module scripts.
//!
//! Wraps the logos-generated tokenizer and attaches line/column information
//! to every token.

use crate::script::token::{Span, Token};
use logos::Logos;
use thiserror::Error;

/// Lexer error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("Unexpected character '{char}' at {}:{}", span.line, span.column)]
    UnexpectedCharacter { char: char, span: Span },

    #[error("Unterminated string literal at {}:{}", span.line, span.column)]
    UnterminatedString { span: Span },

    #[error("Invalid number '{text}' at {}:{}", span.line, span.column)]
    InvalidNumber { text: String, span: Span },
}

impl LexError {
    /// Get the span of this error
    pub fn span(&self) -> &Span {
        match self {
            LexError::UnexpectedCharacter { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::InvalidNumber { span, .. } => span,
        }
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the whole source. The returned stream always ends with
    /// [`Token::Eof`]. All errors are collected before returning.
    pub fn tokenize(self) -> Result<Vec<(Token, Span)>, Vec<LexError>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();
        let mut cursor = LineCursor::new(self.source);
        let mut lexer = Token::lexer(self.source);

        while let Some(result) = lexer.next() {
            let range = lexer.span();
            let (line, column) = cursor.position(range.start);
            let span = Span::new(range.start, range.end, line, column);

            match result {
                Ok(token) => tokens.push((token, span)),
                Err(()) => errors.push(self.classify_error(span)),
            }
        }

        let (line, column) = cursor.position(self.source.len());
        tokens.push((
            Token::Eof,
            Span::new(self.source.len(), self.source.len(), line, column),
        ));

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    fn classify_error(&self, span: Span) -> LexError {
        let text = span.slice(self.source);
        let first = text.chars().next().unwrap_or('\0');
        match first {
            '"' | '\'' => LexError::UnterminatedString { span },
            c if c.is_ascii_digit() => LexError::InvalidNumber {
                text: text.to_string(),
                span,
            },
            char => LexError::UnexpectedCharacter { char, span },
        }
    }

    /// Format all errors, one per line
    pub fn format_errors(errors: &[LexError]) -> String {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Incrementally maps byte offsets to 1-based line/column pairs.
///
/// Offsets must be requested in non-decreasing order, which is how logos
/// yields tokens.
struct LineCursor<'a> {
    source: &'a str,
    offset: usize,
    line: u32,
    column: u32,
}

impl<'a> LineCursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&mut self, target: usize) -> (u32, u32) {
        for c in self.source[self.offset..target].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = target;
        (self.line, self.column)
    }
}

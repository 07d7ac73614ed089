//! Recursive-descent parser for module scripts.

mod expr;
mod stmt;

use crate::script::ast::Program;
use crate::script::lexer::{LexError, Lexer};
use crate::script::token::{Span, Token};
use thiserror::Error;

/// Maximum nesting depth of statements and expressions.
///
/// Each nesting level costs a dozen stack frames in the expression
/// precedence chain, so the limit stays low enough for debug builds running
/// on test threads.
pub const MAX_PARSE_DEPTH: usize = 48;

/// Category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedToken,
    InvalidAssignmentTarget,
    ReservedWord,
    IllegalStatement,
    LimitExceeded,
}

/// Parser error with the location of the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {}:{}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn parser_limit_exceeded(message: impl Into<String>, span: Span) -> Self {
        Self::new(ParseErrorKind::LimitExceeded, message, span)
    }
}

/// Any failure turning source text into a [`Program`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("{}", Lexer::format_errors(.0))]
    Lex(Vec<LexError>),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Parse a complete script body.
pub fn parse(source: &str) -> Result<Program, SyntaxError> {
    let parser = Parser::new(source)?;
    Ok(parser.parse()?)
}

/// Token-stream parser. Construct with [`Parser::new`], consume with
/// [`Parser::parse`].
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    pub(crate) depth: usize,
    loop_depth: usize,
}

impl Parser {
    /// Lex `source` and prepare to parse it.
    pub fn new(source: &str) -> Result<Self, SyntaxError> {
        let tokens = Lexer::new(source).tokenize().map_err(SyntaxError::Lex)?;
        Ok(Self {
            tokens,
            pos: 0,
            depth: 0,
            loop_depth: 0,
        })
    }

    /// Parse statements until end of input.
    pub fn parse(mut self) -> Result<Program, ParseError> {
        let start = self.current_span();
        let mut statements = Vec::new();
        while !self.at_end() {
            statements.push(stmt::parse_statement(&mut self)?);
        }
        let span = start.merge(&self.current_span());
        Ok(Program { statements, span })
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(t, _)| t)
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    /// Move past the current token, returning its span.
    pub(crate) fn advance(&mut self) -> Span {
        let span = self.current_span();
        if !self.at_end() {
            self.pos += 1;
        }
        span
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    /// Consume `token` if it is current.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, token: Token) -> Result<Span, ParseError> {
        if self.check(&token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected_token(&[token]))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<(String, Span), ParseError> {
        match self.current().clone() {
            Token::Identifier(name) => {
                let span = self.advance();
                Ok((name, span))
            }
            Token::New => Err(self.reserved_word("new")),
            _ => Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("Expected identifier, found {}", self.current()),
                self.current_span(),
            )),
        }
    }

    pub(crate) fn unexpected_token(&self, expected: &[Token]) -> ParseError {
        let expected = expected
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        ParseError::new(
            ParseErrorKind::UnexpectedToken,
            format!("Expected {}, found {}", expected, self.current()),
            self.current_span(),
        )
    }

    pub(crate) fn reserved_word(&self, word: &str) -> ParseError {
        ParseError::new(
            ParseErrorKind::ReservedWord,
            format!("'{}' is a reserved word", word),
            self.current_span(),
        )
    }

    pub(crate) fn combine_spans(&self, start: &Span, end: &Span) -> Span {
        start.merge(end)
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_PARSE_DEPTH`].
    pub(crate) fn nested<T>(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            self.depth -= 1;
            return Err(ParseError::parser_limit_exceeded(
                format!("Maximum nesting depth ({}) exceeded in {}", MAX_PARSE_DEPTH, what),
                self.current_span(),
            ));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    pub(crate) fn in_loop<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.loop_depth += 1;
        let result = f(self);
        self.loop_depth -= 1;
        result
    }

    /// Function bodies reset the loop context: `break` cannot cross them.
    pub(crate) fn in_function<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let saved = std::mem::replace(&mut self.loop_depth, 0);
        let result = f(self);
        self.loop_depth = saved;
        result
    }

    pub(crate) fn inside_loop(&self) -> bool {
        self.loop_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::*;

    #[test]
    fn test_parse_empty_program() {
        let program = parse("  // nothing here\n").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn test_lex_errors_are_syntax_errors() {
        let err = parse("let a = @").unwrap_err();
        assert!(matches!(err, SyntaxError::Lex(_)));
    }

    #[test]
    fn test_parse_error_reports_position() {
        let err = parse("let = 1").unwrap_err();
        match err {
            SyntaxError::Parse(e) => {
                assert_eq!(e.kind, ParseErrorKind::UnexpectedToken);
                assert_eq!((e.span.line, e.span.column), (1, 5));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let source = format!("x = {}1{};", "(".repeat(200), ")".repeat(200));
        let err = parse(&source).unwrap_err();
        match err {
            SyntaxError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::LimitExceeded),
            other => panic!("Expected limit error, got {:?}", other),
        }
    }

    #[test]
    fn test_module_pattern() {
        let program = parse(
            "const dep = require('./dep');\n\
             exports.name = 'a';\n\
             module.exports.count = dep.count + 1;",
        )
        .unwrap();
        assert_eq!(program.len(), 3);
        assert!(matches!(
            program.statements[0],
            Statement::Variable {
                kind: VariableKind::Const,
                ..
            }
        ));
    }
}

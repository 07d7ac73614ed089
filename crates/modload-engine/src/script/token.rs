//! Token definitions for module scripts.
//!
//! Scripts are a small JavaScript subset: enough to write CommonJS-style
//! modules that mutate `exports`, reassign `module.exports` and call
//! `require`.

use logos::Logos;
use std::fmt;

/// Source location of a token or syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (self.line, self.column) <= (other.line, other.column) {
            (self.line, self.column)
        } else {
            (other.line, other.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

/// A token of the script language.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[regex(r"[ \t\r\n\f]+", logos::skip)]
    Whitespace,

    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[token("/*", lex_block_comment)]
    BlockComment,

    // Keywords
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("var")]
    Var,
    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("throw")]
    Throw,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("typeof")]
    Typeof,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    /// Reserved; rejected by the parser.
    #[token("new")]
    New,

    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"0[xX][0-9a-fA-F]+", parse_hex)]
    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", parse_decimal)]
    Number(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#, parse_string)]
    #[regex(r"'([^'\\\n]|\\.)*'", parse_string)]
    String(String),

    // Operators (longest first)
    #[token("===")]
    EqualEqualEqual,
    #[token("!==")]
    BangEqualEqual,
    #[token("==")]
    EqualEqual,
    #[token("!=")]
    BangEqual,
    #[token("<=")]
    LessEqual,
    #[token(">=")]
    GreaterEqual,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("??")]
    QuestionQuestion,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEqual,
    #[token("-=")]
    MinusEqual,
    #[token("*=")]
    StarEqual,
    #[token("/=")]
    SlashEqual,
    #[token("%=")]
    PercentEqual,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Equal,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,

    /// End of input; appended by the lexer, never produced by logos.
    Eof,
}

fn lex_block_comment(lex: &mut logos::Lexer<Token>) -> logos::Skip {
    let remainder = lex.remainder();
    match remainder.find("*/") {
        Some(end) => lex.bump(end + 2),
        // Unterminated comment runs to the end of input
        None => lex.bump(remainder.len()),
    }
    logos::Skip
}

fn parse_hex(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    u64::from_str_radix(&lex.slice()[2..], 16).ok().map(|n| n as f64)
}

fn parse_decimal(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn parse_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let s = lex.slice();
    unescape_string(&s[1..s.len() - 1])
}

/// Resolve backslash escapes. Returns `None` for a malformed `\u`/`\x`.
pub(crate) fn unescape_string(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            '0' => result.push('\0'),
            'b' => result.push('\u{8}'),
            'f' => result.push('\u{c}'),
            'v' => result.push('\u{b}'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let code = u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 2)?;
                result.push(char::from_u32(code)?);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 4)?;
                result.push(char::from_u32(code)?);
            }
            other => result.push(other),
        }
    }

    Some(result)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Whitespace => "whitespace",
            Token::LineComment | Token::BlockComment => "comment",
            Token::Let => "let",
            Token::Const => "const",
            Token::Var => "var",
            Token::Function => "function",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Return => "return",
            Token::Throw => "throw",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::Typeof => "typeof",
            Token::This => "this",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            Token::New => "new",
            Token::Identifier(name) => return write!(f, "identifier '{}'", name),
            Token::Number(n) => return write!(f, "number {}", n),
            Token::String(s) => return write!(f, "string {:?}", s),
            Token::EqualEqualEqual => "===",
            Token::BangEqualEqual => "!==",
            Token::EqualEqual => "==",
            Token::BangEqual => "!=",
            Token::LessEqual => "<=",
            Token::GreaterEqual => ">=",
            Token::AmpAmp => "&&",
            Token::PipePipe => "||",
            Token::QuestionQuestion => "??",
            Token::PlusPlus => "++",
            Token::MinusMinus => "--",
            Token::PlusEqual => "+=",
            Token::MinusEqual => "-=",
            Token::StarEqual => "*=",
            Token::SlashEqual => "/=",
            Token::PercentEqual => "%=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Bang => "!",
            Token::Less => "<",
            Token::Greater => ">",
            Token::Equal => "=",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::LeftParen => "(",
            Token::RightParen => ")",
            Token::LeftBrace => "{",
            Token::RightBrace => "}",
            Token::LeftBracket => "[",
            Token::RightBracket => "]",
            Token::Eof => "end of input",
        };
        if text.len() <= 3 && !text.chars().all(char::is_alphabetic) {
            write!(f, "'{}'", text)
        } else {
            f.write_str(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_common_sequences() {
        assert_eq!(unescape_string(r"a\nb\tc").as_deref(), Some("a\nb\tc"));
        assert_eq!(unescape_string(r#"\"q\""#).as_deref(), Some("\"q\""));
        assert_eq!(unescape_string(r"A\x42").as_deref(), Some("AB"));
    }

    #[test]
    fn test_unescape_rejects_short_unicode() {
        assert_eq!(unescape_string(r"\u00"), None);
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(5, 9, 1, 6);
        let merged = a.merge(&b);
        assert_eq!((merged.start, merged.end), (0, 9));
        assert_eq!((merged.line, merged.column), (1, 1));
    }
}

//! Statement parsing

use super::expr::{parse_expression, parse_function_literal};
use super::{ParseError, ParseErrorKind, Parser};
use crate::script::ast::*;
use crate::script::token::{Span, Token};

/// Parse a statement.
pub fn parse_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    parser.nested("statement", parse_statement_inner)
}

fn parse_statement_inner(parser: &mut Parser) -> Result<Statement, ParseError> {
    match parser.current() {
        Token::Let | Token::Const | Token::Var => {
            let statement = parse_variable_declaration(parser)?;
            end_statement(parser);
            Ok(statement)
        }
        Token::Function => {
            let func = parse_function_literal(parser, true)?;
            Ok(Statement::Function(func))
        }
        Token::If => parse_if_statement(parser),
        Token::While => parse_while_statement(parser),
        Token::For => parse_for_statement(parser),
        Token::Try => parse_try_statement(parser),
        Token::LeftBrace => {
            let (body, span) = parse_block(parser)?;
            Ok(Statement::Block(body, span))
        }
        Token::Return => {
            let start = parser.advance();
            let value = if starts_expression(parser.current()) {
                Some(parse_expression(parser)?)
            } else {
                None
            };
            let span = value
                .as_ref()
                .map_or(start, |v| parser.combine_spans(&start, &v.span()));
            end_statement(parser);
            Ok(Statement::Return(value, span))
        }
        Token::Throw => {
            let start = parser.advance();
            let value = parse_expression(parser)?;
            let span = parser.combine_spans(&start, &value.span());
            end_statement(parser);
            Ok(Statement::Throw(value, span))
        }
        Token::Break | Token::Continue => {
            let is_break = parser.check(&Token::Break);
            if !parser.inside_loop() {
                return Err(ParseError::new(
                    ParseErrorKind::IllegalStatement,
                    format!("Illegal {} statement outside of a loop", parser.current()),
                    parser.current_span(),
                ));
            }
            let span = parser.advance();
            end_statement(parser);
            Ok(if is_break {
                Statement::Break(span)
            } else {
                Statement::Continue(span)
            })
        }
        Token::Semicolon => {
            let span = parser.advance();
            Ok(Statement::Empty(span))
        }
        Token::New => Err(parser.reserved_word("new")),
        _ => {
            let expression = parse_expression(parser)?;
            end_statement(parser);
            Ok(Statement::Expression(expression))
        }
    }
}

/// Optional semicolon after a simple statement.
fn end_statement(parser: &mut Parser) {
    parser.eat(&Token::Semicolon);
}

fn starts_expression(token: &Token) -> bool {
    !matches!(
        token,
        Token::Semicolon | Token::RightBrace | Token::Eof
    )
}

/// Parse `{ ... }` and return the statements and the full span.
pub(crate) fn parse_block(parser: &mut Parser) -> Result<(Vec<Statement>, Span), ParseError> {
    let start = parser.expect(Token::LeftBrace)?;
    let mut body = Vec::new();
    while !parser.check(&Token::RightBrace) {
        if parser.at_end() {
            return Err(parser.unexpected_token(&[Token::RightBrace]));
        }
        body.push(parse_statement(parser)?);
    }
    let end = parser.advance();
    Ok((body, parser.combine_spans(&start, &end)))
}

// ============================================================================
// Variable Declarations
// ============================================================================

/// Parse `let a = 1, b;` without the trailing semicolon.
fn parse_variable_declaration(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.current_span();
    let kind = match parser.current() {
        Token::Let => VariableKind::Let,
        Token::Const => VariableKind::Const,
        Token::Var => VariableKind::Var,
        _ => unreachable!(),
    };
    parser.advance();

    let mut declarations = Vec::new();
    let mut end;
    loop {
        let (name, name_span) = parser.expect_identifier()?;
        end = name_span;
        let init = if parser.eat(&Token::Equal) {
            let value = parse_expression(parser)?;
            end = value.span();
            Some(value)
        } else if kind == VariableKind::Const {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedToken,
                format!("Missing initializer in const declaration of '{}'", name),
                name_span,
            ));
        } else {
            None
        };
        declarations.push((name, init));
        if !parser.eat(&Token::Comma) {
            break;
        }
    }

    Ok(Statement::Variable {
        kind,
        declarations,
        span: parser.combine_spans(&start, &end),
    })
}

// ============================================================================
// Control Flow
// ============================================================================

fn parse_parenthesized(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.expect(Token::LeftParen)?;
    let expression = parse_expression(parser)?;
    parser.expect(Token::RightParen)?;
    Ok(expression)
}

fn parse_if_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.advance();
    let condition = parse_parenthesized(parser)?;
    let then_branch = Box::new(parse_statement(parser)?);
    let else_branch = if parser.eat(&Token::Else) {
        Some(Box::new(parse_statement(parser)?))
    } else {
        None
    };
    let end = else_branch
        .as_ref()
        .map_or_else(|| then_branch.span(), |b| b.span());
    Ok(Statement::If {
        condition,
        then_branch,
        else_branch,
        span: parser.combine_spans(&start, &end),
    })
}

fn parse_while_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.advance();
    let condition = parse_parenthesized(parser)?;
    let body = Box::new(parser.in_loop(parse_statement)?);
    let span = parser.combine_spans(&start, &body.span());
    Ok(Statement::While {
        condition,
        body,
        span,
    })
}

/// `for (init; condition; update) body`
fn parse_for_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.advance();
    parser.expect(Token::LeftParen)?;

    let init = match parser.current() {
        Token::Semicolon => None,
        Token::Let | Token::Const | Token::Var => {
            Some(Box::new(parse_variable_declaration(parser)?))
        }
        _ => Some(Box::new(Statement::Expression(parse_expression(parser)?))),
    };
    parser.expect(Token::Semicolon)?;

    let condition = if parser.check(&Token::Semicolon) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.expect(Token::Semicolon)?;

    let update = if parser.check(&Token::RightParen) {
        None
    } else {
        Some(parse_expression(parser)?)
    };
    parser.expect(Token::RightParen)?;

    let body = Box::new(parser.in_loop(parse_statement)?);
    let span = parser.combine_spans(&start, &body.span());
    Ok(Statement::For {
        init,
        condition,
        update,
        body,
        span,
    })
}

/// `try { } catch (e) { } finally { }`; at least one of catch/finally.
fn parse_try_statement(parser: &mut Parser) -> Result<Statement, ParseError> {
    let start = parser.advance();
    let (block, mut end) = parse_block(parser)?;

    let mut param = None;
    let mut handler = None;
    if parser.eat(&Token::Catch) {
        if parser.eat(&Token::LeftParen) {
            param = Some(parser.expect_identifier()?.0);
            parser.expect(Token::RightParen)?;
        }
        let (body, span) = parse_block(parser)?;
        handler = Some(body);
        end = span;
    }

    let mut finalizer = None;
    if parser.eat(&Token::Finally) {
        let (body, span) = parse_block(parser)?;
        finalizer = Some(body);
        end = span;
    }

    if handler.is_none() && finalizer.is_none() {
        return Err(parser.unexpected_token(&[Token::Catch, Token::Finally]));
    }

    Ok(Statement::Try {
        block,
        param,
        handler,
        finalizer,
        span: parser.combine_spans(&start, &end),
    })
}

#[cfg(test)]
mod tests {
    use crate::script::ast::*;
    use crate::script::parser::{parse, ParseErrorKind, SyntaxError};

    fn parse_one(source: &str) -> Statement {
        let mut program = parse(source).unwrap();
        assert_eq!(program.len(), 1, "expected a single statement");
        program.statements.remove(0)
    }

    #[test]
    fn test_multiple_declarators() {
        match parse_one("let a = 1, b;") {
            Statement::Variable { declarations, .. } => {
                assert_eq!(declarations.len(), 2);
                assert_eq!(declarations[0].0, "a");
                assert!(declarations[1].1.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_const_requires_initializer() {
        assert!(parse("const a;").is_err());
    }

    #[test]
    fn test_if_else_chain() {
        match parse_one("if (a) b = 1; else if (c) b = 2; else { b = 3 }") {
            Statement::If { else_branch, .. } => {
                assert!(matches!(
                    else_branch.as_deref(),
                    Some(Statement::If { .. })
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_for_loop_parts_are_optional() {
        match parse_one("for (;;) { break; }") {
            Statement::For {
                init,
                condition,
                update,
                ..
            } => {
                assert!(init.is_none() && condition.is_none() && update.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_break_outside_loop_is_rejected() {
        match parse("break;").unwrap_err() {
            SyntaxError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::IllegalStatement),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_break_does_not_cross_function_boundary() {
        assert!(parse("while (true) { function f() { break; } }").is_err());
    }

    #[test]
    fn test_try_catch_finally() {
        match parse_one("try { a() } catch (e) { b(e) } finally { c() }") {
            Statement::Try {
                param,
                handler,
                finalizer,
                ..
            } => {
                assert_eq!(param.as_deref(), Some("e"));
                assert!(handler.is_some());
                assert!(finalizer.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_try_without_handler_is_rejected() {
        assert!(parse("try { a() }").is_err());
    }

    #[test]
    fn test_top_level_return() {
        assert!(matches!(
            parse_one("return module.exports"),
            Statement::Return(Some(_), _)
        ));
    }
}

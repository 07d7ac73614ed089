//! Expression parsing (precedence climbing)
//!
//! Precedence, lowest first: assignment, conditional, `||`/`??`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix, call and
//! member access, primary.

use super::stmt::parse_block;
use super::{ParseError, ParseErrorKind, Parser};
use crate::script::ast::*;
use crate::script::token::Token;
use std::rc::Rc;

/// Parse a full expression, including assignments.
pub fn parse_expression(parser: &mut Parser) -> Result<Expression, ParseError> {
    parser.nested("expression", parse_assignment)
}

fn parse_assignment(parser: &mut Parser) -> Result<Expression, ParseError> {
    let target = parse_conditional(parser)?;

    let operator = match parser.current() {
        Token::Equal => AssignOperator::Assign,
        Token::PlusEqual => AssignOperator::Compound(BinaryOperator::Add),
        Token::MinusEqual => AssignOperator::Compound(BinaryOperator::Subtract),
        Token::StarEqual => AssignOperator::Compound(BinaryOperator::Multiply),
        Token::SlashEqual => AssignOperator::Compound(BinaryOperator::Divide),
        Token::PercentEqual => AssignOperator::Compound(BinaryOperator::Modulo),
        _ => return Ok(target),
    };

    if !target.is_assignment_target() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidAssignmentTarget,
            "Invalid left-hand side in assignment",
            target.span(),
        ));
    }
    parser.advance();

    // Right-associative: a = b = c
    let value = parse_expression(parser)?;
    let span = parser.combine_spans(&target.span(), &value.span());
    Ok(Expression::Assignment {
        operator,
        target: Box::new(target),
        value: Box::new(value),
        span,
    })
}

fn parse_conditional(parser: &mut Parser) -> Result<Expression, ParseError> {
    let test = parse_logical_or(parser)?;
    if !parser.eat(&Token::Question) {
        return Ok(test);
    }
    let consequent = parse_expression(parser)?;
    parser.expect(Token::Colon)?;
    let alternate = parse_expression(parser)?;
    let span = parser.combine_spans(&test.span(), &alternate.span());
    Ok(Expression::Conditional {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
        span,
    })
}

fn parse_logical_or(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_logical_and(parser)?;
    loop {
        let operator = match parser.current() {
            Token::PipePipe => LogicalOperator::Or,
            Token::QuestionQuestion => LogicalOperator::Nullish,
            _ => return Ok(left),
        };
        parser.advance();
        let right = parse_logical_and(parser)?;
        left = logical(parser, operator, left, right);
    }
}

fn parse_logical_and(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut left = parse_equality(parser)?;
    while parser.eat(&Token::AmpAmp) {
        let right = parse_equality(parser)?;
        left = logical(parser, LogicalOperator::And, left, right);
    }
    Ok(left)
}

fn logical(
    parser: &Parser,
    operator: LogicalOperator,
    left: Expression,
    right: Expression,
) -> Expression {
    let span = parser.combine_spans(&left.span(), &right.span());
    Expression::Logical {
        operator,
        left: Box::new(left),
        right: Box::new(right),
        span,
    }
}

/// One left-associative binary precedence level.
fn parse_binary_level(
    parser: &mut Parser,
    operand: fn(&mut Parser) -> Result<Expression, ParseError>,
    operator_for: fn(&Token) -> Option<BinaryOperator>,
) -> Result<Expression, ParseError> {
    let mut left = operand(parser)?;
    while let Some(operator) = operator_for(parser.current()) {
        parser.advance();
        let right = operand(parser)?;
        let span = parser.combine_spans(&left.span(), &right.span());
        left = Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span,
        };
    }
    Ok(left)
}

fn parse_equality(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_relational, |token| match token {
        Token::EqualEqual => Some(BinaryOperator::Equal),
        Token::BangEqual => Some(BinaryOperator::NotEqual),
        Token::EqualEqualEqual => Some(BinaryOperator::StrictEqual),
        Token::BangEqualEqual => Some(BinaryOperator::StrictNotEqual),
        _ => None,
    })
}

fn parse_relational(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_additive, |token| match token {
        Token::Less => Some(BinaryOperator::Less),
        Token::LessEqual => Some(BinaryOperator::LessEqual),
        Token::Greater => Some(BinaryOperator::Greater),
        Token::GreaterEqual => Some(BinaryOperator::GreaterEqual),
        _ => None,
    })
}

fn parse_additive(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_multiplicative, |token| match token {
        Token::Plus => Some(BinaryOperator::Add),
        Token::Minus => Some(BinaryOperator::Subtract),
        _ => None,
    })
}

fn parse_multiplicative(parser: &mut Parser) -> Result<Expression, ParseError> {
    parse_binary_level(parser, parse_unary, |token| match token {
        Token::Star => Some(BinaryOperator::Multiply),
        Token::Slash => Some(BinaryOperator::Divide),
        Token::Percent => Some(BinaryOperator::Modulo),
        _ => None,
    })
}

fn parse_unary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let operator = match parser.current() {
        Token::Bang => UnaryOperator::Not,
        Token::Minus => UnaryOperator::Negate,
        Token::Plus => UnaryOperator::Plus,
        Token::Typeof => UnaryOperator::Typeof,
        Token::PlusPlus | Token::MinusMinus => return parse_prefix_update(parser),
        _ => return parse_postfix(parser),
    };
    let start = parser.advance();
    let operand = parser.nested("unary expression", parse_unary)?;
    let span = parser.combine_spans(&start, &operand.span());
    Ok(Expression::Unary {
        operator,
        operand: Box::new(operand),
        span,
    })
}

fn parse_prefix_update(parser: &mut Parser) -> Result<Expression, ParseError> {
    let delta = if parser.check(&Token::PlusPlus) { 1.0 } else { -1.0 };
    let start = parser.advance();
    let target = parser.nested("unary expression", parse_unary)?;
    update(parser, delta, true, target, start)
}

fn parse_postfix(parser: &mut Parser) -> Result<Expression, ParseError> {
    let expression = parse_call_member(parser)?;
    let delta = match parser.current() {
        Token::PlusPlus => 1.0,
        Token::MinusMinus => -1.0,
        _ => return Ok(expression),
    };
    let end = parser.advance();
    let start = expression.span();
    update(parser, delta, false, expression, start.merge(&end))
}

fn update(
    parser: &Parser,
    delta: f64,
    prefix: bool,
    target: Expression,
    start: crate::script::token::Span,
) -> Result<Expression, ParseError> {
    if !target.is_assignment_target() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidAssignmentTarget,
            "Invalid operand for increment or decrement",
            target.span(),
        ));
    }
    let span = parser.combine_spans(&start, &target.span());
    Ok(Expression::Update {
        delta,
        prefix,
        target: Box::new(target),
        span,
    })
}

fn parse_call_member(parser: &mut Parser) -> Result<Expression, ParseError> {
    let mut expression = parse_primary(parser)?;
    loop {
        match parser.current() {
            Token::Dot => {
                parser.advance();
                let (property, end) = match property_name(parser.current()) {
                    Some(name) => (name, parser.advance()),
                    None => {
                        return Err(ParseError::new(
                            ParseErrorKind::UnexpectedToken,
                            format!("Expected property name, found {}", parser.current()),
                            parser.current_span(),
                        ))
                    }
                };
                let span = parser.combine_spans(&expression.span(), &end);
                expression = Expression::Member {
                    object: Box::new(expression),
                    property,
                    span,
                };
            }
            Token::LeftBracket => {
                parser.advance();
                let index = parse_expression(parser)?;
                let end = parser.expect(Token::RightBracket)?;
                let span = parser.combine_spans(&expression.span(), &end);
                expression = Expression::Index {
                    object: Box::new(expression),
                    index: Box::new(index),
                    span,
                };
            }
            Token::LeftParen => {
                parser.advance();
                let arguments = parse_list(parser, Token::RightParen, parse_expression)?;
                let end = parser.expect(Token::RightParen)?;
                let span = parser.combine_spans(&expression.span(), &end);
                expression = Expression::Call {
                    callee: Box::new(expression),
                    arguments,
                    span,
                };
            }
            _ => return Ok(expression),
        }
    }
}

/// Comma-separated items up to (not including) `close`; trailing comma allowed.
fn parse_list<T>(
    parser: &mut Parser,
    close: Token,
    mut item: impl FnMut(&mut Parser) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError> {
    let mut items = Vec::new();
    while !parser.check(&close) {
        items.push(item(parser)?);
        if !parser.eat(&Token::Comma) {
            break;
        }
    }
    Ok(items)
}

/// Names allowed after `.` and as object keys: identifiers and keywords.
fn property_name(token: &Token) -> Option<String> {
    let name = match token {
        Token::Identifier(name) => return Some(name.clone()),
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
        _ => return None,
    };
    Some(name.to_string())
}

fn parse_primary(parser: &mut Parser) -> Result<Expression, ParseError> {
    let span = parser.current_span();
    match parser.current().clone() {
        Token::Number(n) => {
            parser.advance();
            Ok(Expression::Number(n, span))
        }
        Token::String(s) => {
            parser.advance();
            Ok(Expression::String(s, span))
        }
        Token::True | Token::False => {
            let value = parser.check(&Token::True);
            parser.advance();
            Ok(Expression::Boolean(value, span))
        }
        Token::Null => {
            parser.advance();
            Ok(Expression::Null(span))
        }
        Token::This => {
            parser.advance();
            Ok(Expression::This(span))
        }
        Token::Identifier(name) => {
            parser.advance();
            Ok(Expression::Identifier(name, span))
        }
        Token::LeftParen => {
            parser.advance();
            let inner = parse_expression(parser)?;
            parser.expect(Token::RightParen)?;
            Ok(inner)
        }
        Token::LeftBracket => {
            parser.advance();
            let elements = parse_list(parser, Token::RightBracket, parse_expression)?;
            let end = parser.expect(Token::RightBracket)?;
            Ok(Expression::Array(elements, span.merge(&end)))
        }
        Token::LeftBrace => parse_object_literal(parser),
        Token::Function => Ok(Expression::Function(parse_function_literal(parser, false)?)),
        Token::New => Err(parser.reserved_word("new")),
        _ => Err(ParseError::new(
            ParseErrorKind::UnexpectedToken,
            format!("Expected expression, found {}", parser.current()),
            span,
        )),
    }
}

/// `{ a: 1, "b": 2, 3: x, c }`
fn parse_object_literal(parser: &mut Parser) -> Result<Expression, ParseError> {
    let start = parser.expect(Token::LeftBrace)?;
    let properties = parse_list(parser, Token::RightBrace, |parser| {
        let key_span = parser.current_span();
        let (key, shorthand) = match parser.current().clone() {
            Token::String(s) => (s, false),
            Token::Number(n) => (crate::script::value::number_to_string(n), false),
            Token::Identifier(name) => (name, true),
            other => match property_name(&other) {
                Some(name) => (name, false),
                None => {
                    return Err(ParseError::new(
                        ParseErrorKind::UnexpectedToken,
                        format!("Expected property name, found {}", other),
                        key_span,
                    ))
                }
            },
        };
        parser.advance();

        if shorthand && matches!(parser.current(), Token::Comma | Token::RightBrace) {
            let value = Expression::Identifier(key.clone(), key_span);
            return Ok(Property { key, value });
        }

        parser.expect(Token::Colon)?;
        let value = parse_expression(parser)?;
        Ok(Property { key, value })
    })?;
    let end = parser.expect(Token::RightBrace)?;
    Ok(Expression::Object(properties, start.merge(&end)))
}

/// `function name?(a, b) { ... }`. Declarations require a name.
pub(crate) fn parse_function_literal(
    parser: &mut Parser,
    is_declaration: bool,
) -> Result<Rc<FunctionLiteral>, ParseError> {
    let start = parser.expect(Token::Function)?;

    let name = if matches!(parser.current(), Token::Identifier(_)) || is_declaration {
        Some(parser.expect_identifier()?.0)
    } else {
        None
    };

    parser.expect(Token::LeftParen)?;
    let params = parse_list(parser, Token::RightParen, |parser| {
        parser.expect_identifier().map(|(name, _)| name)
    })?;
    parser.expect(Token::RightParen)?;

    let (body, end) = parser.in_function(parse_block)?;
    Ok(Rc::new(FunctionLiteral {
        name,
        params,
        body: Rc::new(body),
        span: start.merge(&end),
    }))
}

#[cfg(test)]
mod tests {
    use crate::script::ast::*;
    use crate::script::parser::{parse, ParseErrorKind, SyntaxError};

    fn parse_expr(source: &str) -> Expression {
        let mut program = parse(source).unwrap();
        match program.statements.remove(0) {
            Statement::Expression(expr) => expr,
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match parse_expr("1 + 2 * 3") {
            Expression::Binary {
                operator: BinaryOperator::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expression::Binary {
                    operator: BinaryOperator::Multiply,
                    ..
                }
            )),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assignment_is_right_associative() {
        match parse_expr("a = b = 1") {
            Expression::Assignment { value, .. } => {
                assert!(matches!(*value, Expression::Assignment { .. }))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_member_assignment() {
        match parse_expr("module.exports = 'hello'") {
            Expression::Assignment { target, .. } => match *target {
                Expression::Member { property, .. } => assert_eq!(property, "exports"),
                other => panic!("unexpected target {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        match parse("f() = 1").unwrap_err() {
            SyntaxError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::InvalidAssignmentTarget),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_call_chain() {
        match parse_expr("require('./a').items[0].push(1, 2,)") {
            Expression::Call {
                callee, arguments, ..
            } => {
                assert_eq!(arguments.len(), 2);
                assert!(matches!(*callee, Expression::Member { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_keys() {
        match parse_expr("x = { a: 1, 'b-c': 2, 3: 3, default: 4, d }") {
            Expression::Assignment { value, .. } => match *value {
                Expression::Object(props, _) => {
                    let keys: Vec<_> = props.iter().map(|p| p.key.as_str()).collect();
                    assert_eq!(keys, vec!["a", "b-c", "3", "default", "d"]);
                    assert!(matches!(props[4].value, Expression::Identifier(..)));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_keyword_property_access() {
        assert!(matches!(
            parse_expr("exports.new = exports.default"),
            Expression::Assignment { .. }
        ));
    }

    #[test]
    fn test_function_expression() {
        match parse_expr("exports.add = function (a, b) { return a + b }") {
            Expression::Assignment { value, .. } => match *value {
                Expression::Function(func) => {
                    assert!(func.name.is_none());
                    assert_eq!(func.params, vec!["a", "b"]);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conditional_and_nullish() {
        assert!(matches!(
            parse_expr("a ?? b ? c : d"),
            Expression::Conditional { .. }
        ));
    }

    #[test]
    fn test_postfix_update() {
        assert!(matches!(
            parse_expr("global.runs++"),
            Expression::Update { prefix: false, .. }
        ));
    }

    #[test]
    fn test_new_is_reserved() {
        match parse("x = new Thing()").unwrap_err() {
            SyntaxError::Parse(e) => assert_eq!(e.kind, ParseErrorKind::ReservedWord),
            other => panic!("unexpected {:?}", other),
        }
    }
}

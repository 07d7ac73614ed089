//! Abstract syntax tree for module scripts.
//!
//! Every statement and expression node carries a [`Span`] so runtime errors
//! can point back into the source.

use crate::script::token::Span;
use std::rc::Rc;

/// Root node: a parsed script body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// Declaration keyword of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

/// A function literal shared between declarations and expressions.
///
/// Bodies are reference-counted so closures created from the same literal
/// share one copy of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Vec<Statement>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let x = 1;`, `const y = 2;`
    Variable {
        kind: VariableKind,
        declarations: Vec<(String, Option<Expression>)>,
        span: Span,
    },

    /// `function f(a, b) { ... }` (hoisted)
    Function(Rc<FunctionLiteral>),

    Expression(Expression),

    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
        span: Span,
    },

    While {
        condition: Expression,
        body: Box<Statement>,
        span: Span,
    },

    For {
        init: Option<Box<Statement>>,
        condition: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
        span: Span,
    },

    Block(Vec<Statement>, Span),

    Return(Option<Expression>, Span),
    Throw(Expression, Span),
    Break(Span),
    Continue(Span),

    Try {
        block: Vec<Statement>,
        param: Option<String>,
        handler: Option<Vec<Statement>>,
        finalizer: Option<Vec<Statement>>,
        span: Span,
    },

    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Variable { span, .. }
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::For { span, .. }
            | Statement::Try { span, .. }
            | Statement::Block(_, span)
            | Statement::Return(_, span)
            | Statement::Throw(_, span)
            | Statement::Break(span)
            | Statement::Continue(span)
            | Statement::Empty(span) => *span,
            Statement::Function(func) => func.span,
            Statement::Expression(expr) => expr.span(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
    Typeof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    StrictEqual,
    StrictNotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Nullish,
}

/// `=` or a compound assignment carrying its arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
    Assign,
    Compound(BinaryOperator),
}

/// Object literal key.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(f64, Span),
    String(String, Span),
    Boolean(bool, Span),
    Null(Span),
    Identifier(String, Span),
    This(Span),
    Array(Vec<Expression>, Span),
    Object(Vec<Property>, Span),
    Function(Rc<FunctionLiteral>),

    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        span: Span,
    },

    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },

    Logical {
        operator: LogicalOperator,
        left: Box<Expression>,
        right: Box<Expression>,
        span: Span,
    },

    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
        span: Span,
    },

    /// Target is always an identifier, member or index expression.
    Assignment {
        operator: AssignOperator,
        target: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },

    /// `x++`, `--x`: `delta` is +1 or -1.
    Update {
        delta: f64,
        prefix: bool,
        target: Box<Expression>,
        span: Span,
    },

    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
        span: Span,
    },

    Member {
        object: Box<Expression>,
        property: String,
        span: Span,
    },

    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Number(_, span)
            | Expression::String(_, span)
            | Expression::Boolean(_, span)
            | Expression::Null(span)
            | Expression::Identifier(_, span)
            | Expression::This(span)
            | Expression::Array(_, span)
            | Expression::Object(_, span)
            | Expression::Unary { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Logical { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::Assignment { span, .. }
            | Expression::Update { span, .. }
            | Expression::Call { span, .. }
            | Expression::Member { span, .. }
            | Expression::Index { span, .. } => *span,
            Expression::Function(func) => func.span,
        }
    }

    /// Whether this expression may appear on the left of `=`.
    pub fn is_assignment_target(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(..) | Expression::Member { .. } | Expression::Index { .. }
        )
    }
}

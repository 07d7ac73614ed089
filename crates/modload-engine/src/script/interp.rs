//! Tree-walking evaluator for module scripts.
//!
//! Scopes form a parent-linked chain; a function closes over the scope it
//! was created in. Every unit's wrapper function is created in the realm's
//! global scope, so units share globals and nothing else.

use crate::error::LoadError;
use crate::script::ast::*;
use crate::script::builtins::Realm;
use crate::script::value::{number_to_string, ArrayRef, Closure, ObjectRef, Value};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Largest gap allowed when writing past the end of an array.
const MAX_ARRAY_GROWTH: usize = 1 << 20;

// ============================================================================
// Exceptions
// ============================================================================

/// Abrupt completion that unwinds script frames.
#[derive(Debug)]
pub enum Exception {
    /// A value thrown by `throw` or by a failing built-in operation.
    Thrown(Value),
    /// A nested `require` failed. Kept intact so the outermost load reports
    /// the original error unless a script catches it first.
    Load(Box<LoadError>),
    /// A value thrown out of the top level of the unit at `path`. Requiring
    /// units that catch it receive `value` itself.
    Uncaught { path: PathBuf, value: Value },
}

impl Exception {
    /// An `Error`-like object `{ name, message }` wrapped as a throw.
    pub fn error(name: &str, message: impl AsRef<str>) -> Self {
        Exception::Thrown(error_object(name, message.as_ref()))
    }

    pub fn type_error(message: impl AsRef<str>) -> Self {
        Self::error("TypeError", message)
    }

    pub fn reference_error(message: impl AsRef<str>) -> Self {
        Self::error("ReferenceError", message)
    }

    pub fn range_error(message: impl AsRef<str>) -> Self {
        Self::error("RangeError", message)
    }

    /// The value a `catch` clause binds.
    pub fn into_value(self) -> Value {
        match self {
            Exception::Thrown(value) | Exception::Uncaught { value, .. } => value,
            Exception::Load(err) => {
                let obj = ObjectRef::new();
                obj.set("name", Value::string("Error"));
                obj.set("message", Value::string(err.to_string()));
                obj.set("code", Value::string(err.code()));
                Value::Object(obj)
            }
        }
    }

    /// Convert an exception that reached the host into a load error. A bare
    /// throw is attributed to `fallback`.
    pub fn into_load_error(self, fallback: &Path) -> LoadError {
        match self {
            Exception::Load(err) => *err,
            Exception::Uncaught { path, value } => LoadError::Uncaught {
                path,
                message: describe_thrown(&value),
            },
            Exception::Thrown(value) => LoadError::Uncaught {
                path: fallback.to_path_buf(),
                message: describe_thrown(&value),
            },
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exception::Thrown(value) | Exception::Uncaught { value, .. } => {
                f.write_str(&describe_thrown(value))
            }
            Exception::Load(err) => write!(f, "{}", err),
        }
    }
}

impl From<LoadError> for Exception {
    fn from(err: LoadError) -> Self {
        Exception::Load(Box::new(err))
    }
}

/// Build `{ name, message }`.
pub fn error_object(name: &str, message: &str) -> Value {
    let obj = ObjectRef::new();
    obj.set("name", Value::string(name));
    obj.set("message", Value::string(message));
    Value::Object(obj)
}

/// One-line rendering of a thrown value: `Name: message` for error-like
/// objects, the inspected value otherwise.
pub fn describe_thrown(value: &Value) -> String {
    if let Value::Object(obj) = value {
        if let Some(Value::String(message)) = obj.get("message") {
            let name = obj
                .get("name")
                .and_then(|n| n.as_str().map(str::to_string))
                .unwrap_or_else(|| "Error".to_string());
            return format!("{}: {}", name, message);
        }
    }
    value.inspect()
}

// ============================================================================
// Scopes
// ============================================================================

struct Binding {
    value: Value,
    mutable: bool,
}

struct ScopeData {
    bindings: RefCell<FxHashMap<String, Binding>>,
    parent: Option<Scope>,
}

/// A lexical environment.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignError {
    Undeclared,
    Constant,
}

impl Scope {
    pub fn root() -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(FxHashMap::default()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Scope(Rc::new(ScopeData {
            bindings: RefCell::new(FxHashMap::default()),
            parent: Some(self.clone()),
        }))
    }

    /// Declare (or redeclare) `name` in this scope.
    pub fn declare(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.0.bindings.borrow().get(name) {
                return Some(binding.value.clone());
            }
            match &scope.0.parent {
                Some(parent) => scope = parent,
                None => return None,
            }
        }
    }

    fn assign(&self, name: &str, value: Value) -> Result<(), AssignError> {
        let mut scope = self;
        loop {
            if let Some(binding) = scope.0.bindings.borrow_mut().get_mut(name) {
                if !binding.mutable {
                    return Err(AssignError::Constant);
                }
                binding.value = value;
                return Ok(());
            }
            match &scope.0.parent {
                Some(parent) => scope = parent,
                None => return Err(AssignError::Undeclared),
            }
        }
    }
}

// ============================================================================
// Interpreter
// ============================================================================

/// How a statement finished.
enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Assignable location.
enum Reference {
    Variable(String),
    Property(Value, String),
}

/// Evaluates scripts against a [`Realm`], bounding script call depth.
pub struct Interpreter {
    realm: Realm,
    depth: usize,
    max_depth: usize,
}

impl Interpreter {
    pub fn new(realm: Realm, max_depth: usize) -> Self {
        Self {
            realm,
            depth: 0,
            max_depth,
        }
    }

    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Current number of active script frames.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Run a program's statements directly in `scope`, returning the value of
    /// a top-level `return` or `undefined`.
    pub fn run(&mut self, program: &Program, scope: &Scope) -> Result<Value, Exception> {
        match self.exec_statements(&program.statements, scope)? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    /// Call any callable value.
    pub fn call(&mut self, callee: &Value, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
        match callee {
            Value::Function(closure) => {
                if self.depth >= self.max_depth {
                    return Err(Exception::range_error("Maximum call stack size exceeded"));
                }
                self.depth += 1;
                let result = self.call_closure(closure, this, args);
                self.depth -= 1;
                result
            }
            Value::Native(native) => native.call(self, this, args),
            other => Err(Exception::type_error(format!(
                "{} is not a function",
                other.type_of()
            ))),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        let scope = closure.scope.child();
        scope.declare("this", this, false);
        let mut args = args.into_iter();
        for param in &closure.literal.params {
            scope.declare(param.clone(), args.next().unwrap_or_default(), true);
        }
        match self.exec_statements(&closure.literal.body, &scope)? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    fn make_closure(&self, literal: &Rc<FunctionLiteral>, scope: &Scope) -> Value {
        Value::Function(Rc::new(Closure {
            literal: literal.clone(),
            scope: scope.clone(),
        }))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_statements(&mut self, statements: &[Statement], scope: &Scope) -> Result<Completion, Exception> {
        // Function declarations are visible to the whole block
        for statement in statements {
            if let Statement::Function(literal) = statement {
                if let Some(name) = &literal.name {
                    scope.declare(name.clone(), self.make_closure(literal, scope), true);
                }
            }
        }

        for statement in statements {
            match self.exec_statement(statement, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_statement(&mut self, statement: &Statement, scope: &Scope) -> Result<Completion, Exception> {
        match statement {
            Statement::Variable {
                kind, declarations, ..
            } => {
                for (name, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr, scope)?,
                        None => Value::Undefined,
                    };
                    scope.declare(name.clone(), value, *kind != VariableKind::Const);
                }
                Ok(Completion::Normal)
            }

            Statement::Function(_) | Statement::Empty(_) => Ok(Completion::Normal),

            Statement::Expression(expr) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }

            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.eval(condition, scope)?.truthy() {
                    self.exec_statement(then_branch, scope)
                } else if let Some(else_branch) = else_branch {
                    self.exec_statement(else_branch, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Statement::While {
                condition, body, ..
            } => {
                while self.eval(condition, scope)?.truthy() {
                    match self.exec_statement(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }

            Statement::For {
                init,
                condition,
                update,
                body,
                ..
            } => {
                let loop_scope = scope.child();
                if let Some(init) = init {
                    self.exec_statement(init, &loop_scope)?;
                }
                loop {
                    if let Some(condition) = condition {
                        if !self.eval(condition, &loop_scope)?.truthy() {
                            break;
                        }
                    }
                    match self.exec_statement(body, &loop_scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }

            Statement::Block(body, _) => self.exec_statements(body, &scope.child()),

            Statement::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }

            Statement::Throw(expr, _) => Err(Exception::Thrown(self.eval(expr, scope)?)),

            Statement::Break(_) => Ok(Completion::Break),
            Statement::Continue(_) => Ok(Completion::Continue),

            Statement::Try {
                block,
                param,
                handler,
                finalizer,
                ..
            } => {
                let outcome = match (self.exec_statements(block, &scope.child()), handler) {
                    (Err(exception), Some(handler)) => {
                        let catch_scope = scope.child();
                        if let Some(param) = param {
                            catch_scope.declare(param.clone(), exception.into_value(), true);
                        }
                        self.exec_statements(handler, &catch_scope)
                    }
                    (outcome, _) => outcome,
                };

                if let Some(finalizer) = finalizer {
                    match self.exec_statements(finalizer, &scope.child())? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                outcome
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&mut self, expr: &Expression, scope: &Scope) -> Result<Value, Exception> {
        match expr {
            Expression::Number(n, _) => Ok(Value::Number(*n)),
            Expression::String(s, _) => Ok(Value::string(s)),
            Expression::Boolean(b, _) => Ok(Value::Bool(*b)),
            Expression::Null(_) => Ok(Value::Null),
            Expression::Identifier(name, _) => scope
                .lookup(name)
                .ok_or_else(|| Exception::reference_error(format!("{} is not defined", name))),
            Expression::This(_) => Ok(scope.lookup("this").unwrap_or_default()),

            Expression::Array(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, scope)?);
                }
                Ok(Value::Array(ArrayRef::new(values)))
            }

            Expression::Object(properties, _) => {
                let obj = ObjectRef::new();
                for property in properties {
                    let value = self.eval(&property.value, scope)?;
                    obj.set(property.key.clone(), value);
                }
                Ok(Value::Object(obj))
            }

            Expression::Function(literal) => match &literal.name {
                // A named function expression sees its own name
                Some(name) => {
                    let own_scope = scope.child();
                    let function = self.make_closure(literal, &own_scope);
                    own_scope.declare(name.clone(), function.clone(), false);
                    Ok(function)
                }
                None => Ok(self.make_closure(literal, scope)),
            },

            Expression::Unary {
                operator, operand, ..
            } => {
                if *operator == UnaryOperator::Typeof {
                    if let Expression::Identifier(name, _) = operand.as_ref() {
                        if scope.lookup(name).is_none() {
                            return Ok(Value::string("undefined"));
                        }
                    }
                }
                let value = self.eval(operand, scope)?;
                Ok(match operator {
                    UnaryOperator::Not => Value::Bool(!value.truthy()),
                    UnaryOperator::Negate => Value::Number(-value.to_number()),
                    UnaryOperator::Plus => Value::Number(value.to_number()),
                    UnaryOperator::Typeof => Value::string(value.type_of()),
                })
            }

            Expression::Binary {
                operator,
                left,
                right,
                ..
            } => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                Ok(binary_op(*operator, &left, &right))
            }

            Expression::Logical {
                operator,
                left,
                right,
                ..
            } => {
                let left = self.eval(left, scope)?;
                let short_circuit = match operator {
                    LogicalOperator::And => !left.truthy(),
                    LogicalOperator::Or => left.truthy(),
                    LogicalOperator::Nullish => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }

            Expression::Conditional {
                test,
                consequent,
                alternate,
                ..
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }

            Expression::Assignment {
                operator,
                target,
                value,
                ..
            } => {
                let reference = self.reference(target, scope)?;
                let value = match operator {
                    AssignOperator::Assign => self.eval(value, scope)?,
                    AssignOperator::Compound(op) => {
                        let current = self.get_reference(&reference, scope)?;
                        let rhs = self.eval(value, scope)?;
                        binary_op(*op, &current, &rhs)
                    }
                };
                self.put_reference(reference, value.clone(), scope)?;
                Ok(value)
            }

            Expression::Update {
                delta,
                prefix,
                target,
                ..
            } => {
                let reference = self.reference(target, scope)?;
                let old = self.get_reference(&reference, scope)?.to_number();
                let new = old + delta;
                self.put_reference(reference, Value::Number(new), scope)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }

            Expression::Call {
                callee, arguments, ..
            } => {
                let (function, this) = match callee.as_ref() {
                    Expression::Member {
                        object, property, ..
                    } => {
                        let object = self.eval(object, scope)?;
                        (self.get_property(&object, property)?, object)
                    }
                    Expression::Index { object, index, .. } => {
                        let object = self.eval(object, scope)?;
                        let key = property_key(&self.eval(index, scope)?);
                        (self.get_property(&object, &key)?, object)
                    }
                    other => (self.eval(other, scope)?, Value::Undefined),
                };

                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.eval(argument, scope)?);
                }

                if !function.is_callable() {
                    return Err(Exception::type_error(format!(
                        "{} is not a function",
                        callee_name(callee)
                    )));
                }
                self.call(&function, this, args)
            }

            Expression::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                self.get_property(&object, property)
            }

            Expression::Index { object, index, .. } => {
                let object = self.eval(object, scope)?;
                let key = property_key(&self.eval(index, scope)?);
                self.get_property(&object, &key)
            }
        }
    }

    fn reference(&mut self, target: &Expression, scope: &Scope) -> Result<Reference, Exception> {
        match target {
            Expression::Identifier(name, _) => Ok(Reference::Variable(name.clone())),
            Expression::Member {
                object, property, ..
            } => Ok(Reference::Property(self.eval(object, scope)?, property.clone())),
            Expression::Index { object, index, .. } => {
                let object = self.eval(object, scope)?;
                let key = property_key(&self.eval(index, scope)?);
                Ok(Reference::Property(object, key))
            }
            _ => Err(Exception::error(
                "SyntaxError",
                "Invalid left-hand side in assignment",
            )),
        }
    }

    fn get_reference(&mut self, reference: &Reference, scope: &Scope) -> Result<Value, Exception> {
        match reference {
            Reference::Variable(name) => scope
                .lookup(name)
                .ok_or_else(|| Exception::reference_error(format!("{} is not defined", name))),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn put_reference(&mut self, reference: Reference, value: Value, scope: &Scope) -> Result<(), Exception> {
        match reference {
            Reference::Variable(name) => scope.assign(&name, value).map_err(|err| match err {
                AssignError::Undeclared => {
                    Exception::reference_error(format!("{} is not defined", name))
                }
                AssignError::Constant => {
                    Exception::type_error("Assignment to constant variable.")
                }
            }),
            Reference::Property(object, key) => set_property(&object, &key, value),
        }
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Read `target[key]`.
    pub fn get_property(&self, target: &Value, key: &str) -> Result<Value, Exception> {
        Ok(match target {
            Value::Undefined | Value::Null => {
                return Err(Exception::type_error(format!(
                    "Cannot read properties of {} (reading '{}')",
                    target.to_display_string(),
                    key
                )))
            }
            Value::Object(obj) => obj.get(key).unwrap_or_default(),
            Value::Array(arr) => match key {
                "length" => Value::Number(arr.len() as f64),
                _ => match key.parse::<usize>() {
                    Ok(index) => arr.get(index).unwrap_or_default(),
                    Err(_) => self.realm.array_method(key).unwrap_or_default(),
                },
            },
            Value::String(s) => match key {
                "length" => Value::Number(s.encode_utf16().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| s.chars().nth(index))
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or_default(),
            },
            Value::Function(f) => match key {
                "name" => Value::string(f.literal.name.as_deref().unwrap_or("")),
                "length" => Value::Number(f.literal.params.len() as f64),
                _ => Value::Undefined,
            },
            Value::Native(f) => match key {
                "name" => Value::string(&f.name),
                _ => Value::Undefined,
            },
            Value::Bool(_) | Value::Number(_) => Value::Undefined,
        })
    }
}

/// Write `target[key] = value`. Writes to primitives are ignored.
pub fn set_property(target: &Value, key: &str, value: Value) -> Result<(), Exception> {
    match target {
        Value::Undefined | Value::Null => Err(Exception::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            target.to_display_string(),
            key
        ))),
        Value::Object(obj) => {
            obj.set(key, value);
            Ok(())
        }
        Value::Array(arr) => {
            if let Ok(index) = key.parse::<usize>() {
                if index > arr.len() + MAX_ARRAY_GROWTH {
                    return Err(Exception::range_error("Invalid array length"));
                }
                arr.set(index, value);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Property key for `object[index]`.
pub fn property_key(index: &Value) -> String {
    match index {
        Value::String(s) => s.to_string(),
        Value::Number(n) => number_to_string(*n),
        other => other.to_display_string(),
    }
}

fn callee_name(callee: &Expression) -> String {
    match callee {
        Expression::Identifier(name, _) => name.clone(),
        Expression::Member {
            object, property, ..
        } => format!("{}.{}", callee_name(object), property),
        Expression::This(_) => "this".to_string(),
        _ => "expression".to_string(),
    }
}

fn binary_op(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    use BinaryOperator::*;
    match operator {
        Add => {
            if concatenates(left) || concatenates(right) {
                Value::string(format!(
                    "{}{}",
                    left.to_display_string(),
                    right.to_display_string()
                ))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        Subtract => Value::Number(left.to_number() - right.to_number()),
        Multiply => Value::Number(left.to_number() * right.to_number()),
        Divide => Value::Number(left.to_number() / right.to_number()),
        Modulo => Value::Number(left.to_number() % right.to_number()),
        Equal => Value::Bool(left.loose_equals(right)),
        NotEqual => Value::Bool(!left.loose_equals(right)),
        StrictEqual => Value::Bool(left.strict_equals(right)),
        StrictNotEqual => Value::Bool(!left.strict_equals(right)),
        Less => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        LessEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        Greater => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        GreaterEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

fn concatenates(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Native(_)
    )
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::builtins::Realm;
    use crate::script::parser::parse;

    fn run_with_depth(source: &str, max_depth: usize) -> Result<Value, Exception> {
        let realm = Realm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        let scope = realm.globals().child();
        let program = parse(source).unwrap();
        Interpreter::new(realm, max_depth).run(&program, &scope)
    }

    fn run(source: &str) -> Value {
        run_with_depth(source, 64).unwrap()
    }

    fn run_err(source: &str) -> String {
        match run_with_depth(source, 64) {
            Err(Exception::Thrown(value)) => describe_thrown(&value),
            Err(other) => panic!("unexpected {:?}", other),
            Ok(value) => panic!("expected a throw, got {:?}", value),
        }
    }

    #[test]
    fn test_arithmetic_and_concatenation() {
        assert_eq!(run("return 1 + 2 * 3 - 4 / 2").as_number(), Some(5.0));
        assert_eq!(run("return 7 % 4").as_number(), Some(3.0));
        assert_eq!(run("return 'a' + 1 + 2").as_str(), Some("a12"));
        assert_eq!(run("return 1 + 2 + 'a'").as_str(), Some("3a"));
    }

    #[test]
    fn test_closures_keep_their_scope() {
        let source = "
            function counter() {
                let n = 0;
                return function () { n += 1; return n; };
            }
            const next = counter();
            next(); next();
            return next();
        ";
        assert_eq!(run(source).as_number(), Some(3.0));
    }

    #[test]
    fn test_hoisted_recursion() {
        let source = "
            return fib(10);
            function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }
        ";
        assert_eq!(run(source).as_number(), Some(55.0));
    }

    #[test]
    fn test_named_function_expression_sees_itself() {
        let source = "
            const fact = function f(n) { return n <= 1 ? 1 : n * f(n - 1); };
            return fact(5);
        ";
        assert_eq!(run(source).as_number(), Some(120.0));
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        let source = "
            let total = 0;
            for (let i = 0; i < 10; i++) {
                if (i % 2 === 0) continue;
                if (i > 7) break;
                total += i;
            }
            let j = 0;
            while (true) { j++; if (j === 3) break; }
            return total * 10 + j;
        ";
        assert_eq!(run(source).as_number(), Some(163.0));
    }

    #[test]
    fn test_try_catch_finally_order() {
        let source = "
            const log = [];
            try {
                log.push('try');
                throw { name: 'Oops', message: 'bad' };
            } catch (e) {
                log.push(e.message);
            } finally {
                log.push('finally');
            }
            return log.join(',');
        ";
        assert_eq!(run(source).as_str(), Some("try,bad,finally"));
    }

    #[test]
    fn test_finally_return_overrides() {
        let source = "
            function f() { try { return 1; } finally { return 2; } }
            return f();
        ";
        assert_eq!(run(source).as_number(), Some(2.0));
    }

    #[test]
    fn test_method_calls_bind_this() {
        let source = "
            const counter = { n: 41, bump: function () { this.n++; return this.n; } };
            return counter.bump();
        ";
        assert_eq!(run(source).as_number(), Some(42.0));
    }

    #[test]
    fn test_arrays() {
        let source = "
            const xs = [1, 2];
            xs.push(3);
            xs[4] = 5;
            return xs.length + ':' + xs.join('-');
        ";
        assert_eq!(run(source).as_str(), Some("5:1-2-3--5"));
    }

    #[test]
    fn test_typeof() {
        assert_eq!(run("return typeof missing").as_str(), Some("undefined"));
        assert_eq!(run("return typeof null").as_str(), Some("object"));
        assert_eq!(run("return typeof function () {}").as_str(), Some("function"));
    }

    #[test]
    fn test_logical_operators_return_operands() {
        assert_eq!(run("return 0 || 'x'").as_str(), Some("x"));
        assert_eq!(run("return 0 ?? 'x'").as_number(), Some(0.0));
        assert_eq!(run("return null ?? 'x'").as_str(), Some("x"));
        assert_eq!(run("return '' && 'x'").as_str(), Some(""));
    }

    #[test]
    fn test_const_assignment_throws() {
        assert_eq!(
            run_err("const a = 1; a = 2;"),
            "TypeError: Assignment to constant variable."
        );
    }

    #[test]
    fn test_undeclared_assignment_throws() {
        assert_eq!(run_err("leaked = 1;"), "ReferenceError: leaked is not defined");
    }

    #[test]
    fn test_property_of_undefined_throws() {
        assert_eq!(
            run_err("let a; a.b;"),
            "TypeError: Cannot read properties of undefined (reading 'b')"
        );
    }

    #[test]
    fn test_calling_non_function_throws() {
        assert_eq!(
            run_err("const o = {}; o.go();"),
            "TypeError: o.go is not a function"
        );
    }

    #[test]
    fn test_runaway_recursion_is_a_range_error() {
        let err = run_with_depth("function f() { return f(); } f();", 16).unwrap_err();
        match err {
            Exception::Thrown(value) => assert_eq!(
                describe_thrown(&value),
                "RangeError: Maximum call stack size exceeded"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_range_error_is_catchable() {
        let source = "
            function f() { return f(); }
            try { f(); } catch (e) { return e.name; }
        ";
        assert_eq!(
            run_with_depth(source, 16).unwrap().as_str(),
            Some("RangeError")
        );
    }

    #[test]
    fn test_block_scoping() {
        let source = "
            let a = 1;
            { let a = 2; }
            return a;
        ";
        assert_eq!(run(source).as_number(), Some(1.0));
    }
}

//! Execution sandbox
//!
//! Wraps a unit's source in a function of exactly five parameters and
//! invokes it once. The function is created in the realm's global scope, so
//! a unit sees its parameters, its own declarations and the shared globals.

use crate::script::ast::FunctionLiteral;
use crate::script::builtins::Realm;
use crate::script::interp::{Exception, Interpreter};
use crate::script::parser::{parse, SyntaxError};
use crate::script::value::{Closure, Value};
use std::rc::Rc;

/// Parameter names, in binding order.
pub const WRAPPER_PARAMS: [&str; 5] = ["exports", "require", "module", "__filename", "__dirname"];

/// Values bound to the wrapper's parameters.
pub struct Bindings {
    pub exports: Value,
    pub require: Value,
    pub module: Value,
    pub filename: String,
    pub dirname: String,
}

impl Bindings {
    fn into_args(self) -> Vec<Value> {
        vec![
            self.exports,
            self.require,
            self.module,
            Value::string(self.filename),
            Value::string(self.dirname),
        ]
    }
}

/// A compiled unit body, ready to be invoked.
pub struct CompiledUnit {
    function: Value,
}

impl CompiledUnit {
    /// Parse `source` into the wrapper function.
    pub fn compile(source: &str, realm: &Realm) -> Result<Self, SyntaxError> {
        let program = parse(strip_hashbang(source))?;
        let literal = FunctionLiteral {
            name: None,
            params: WRAPPER_PARAMS.iter().map(|p| p.to_string()).collect(),
            body: Rc::new(program.statements),
            span: program.span,
        };
        let function = Value::Function(Rc::new(Closure {
            literal: Rc::new(literal),
            scope: realm.globals().clone(),
        }));
        Ok(Self { function })
    }

    /// Invoke the body with `this` bound to the exports object.
    pub fn invoke(&self, interp: &mut Interpreter, bindings: Bindings) -> Result<Value, Exception> {
        let this = bindings.exports.clone();
        interp.call(&self.function, this, bindings.into_args())
    }
}

/// Blank out a leading `#!` line, keeping line numbers intact.
fn strip_hashbang(source: &str) -> &str {
    if source.starts_with("#!") {
        match source.find('\n') {
            Some(end) => &source[end..],
            None => "",
        }
    } else {
        source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::value::ObjectRef;
    use std::cell::RefCell;

    fn realm() -> Realm {
        Realm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())))
    }

    fn bindings(exports: &ObjectRef, module: &ObjectRef) -> Bindings {
        Bindings {
            exports: Value::Object(exports.clone()),
            require: Value::Undefined,
            module: Value::Object(module.clone()),
            filename: "/app/a.js".to_string(),
            dirname: "/app".to_string(),
        }
    }

    #[test]
    fn test_parameters_are_bound_in_order() {
        let realm = realm();
        let unit = CompiledUnit::compile(
            "exports.file = __filename; exports.dir = __dirname; this.same = this === exports;",
            &realm,
        )
        .unwrap();
        let exports = ObjectRef::new();
        let module = ObjectRef::new();
        unit.invoke(&mut Interpreter::new(realm, 8), bindings(&exports, &module))
            .unwrap();

        assert_eq!(exports.get("file").unwrap().as_str(), Some("/app/a.js"));
        assert_eq!(exports.get("dir").unwrap().as_str(), Some("/app"));
        assert!(exports.get("same").unwrap().truthy());
    }

    #[test]
    fn test_top_level_declarations_stay_local() {
        let realm = realm();
        let unit = CompiledUnit::compile("let secret = 1; function helper() {}", &realm).unwrap();
        let exports = ObjectRef::new();
        let module = ObjectRef::new();
        unit.invoke(&mut Interpreter::new(realm.clone(), 8), bindings(&exports, &module))
            .unwrap();

        assert!(realm.globals().lookup("secret").is_none());
        assert!(realm.globals().lookup("helper").is_none());
    }

    #[test]
    fn test_top_level_return() {
        let realm = realm();
        let unit = CompiledUnit::compile("return 42; exports.never = true;", &realm).unwrap();
        let exports = ObjectRef::new();
        let module = ObjectRef::new();
        let result = unit
            .invoke(&mut Interpreter::new(realm, 8), bindings(&exports, &module))
            .unwrap();
        assert_eq!(result.as_number(), Some(42.0));
        assert!(!exports.contains("never"));
    }

    #[test]
    fn test_hashbang_is_ignored() {
        let realm = realm();
        assert!(CompiledUnit::compile("#!/usr/bin/env modload\nexports.a = 1;", &realm).is_ok());
        assert!(CompiledUnit::compile("#!only a hashbang", &realm).is_ok());
    }
}

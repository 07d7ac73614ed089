//! Global bindings shared by every unit of one loader.

use crate::script::interp::{error_object, Exception, Interpreter, Scope};
use crate::script::value::{ArrayRef, ObjectRef, ToJsonError, Value};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Destination of `print` and `console.log`.
pub type Output = Rc<RefCell<dyn Write>>;

/// The global environment of one loader: the global scope, the `global`
/// object and the shared built-in functions.
#[derive(Clone)]
pub struct Realm {
    globals: Scope,
    global_object: ObjectRef,
    array_push: Value,
    array_join: Value,
}

impl Realm {
    /// A realm whose `print` writes to standard output.
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(std::io::stdout())))
    }

    pub fn with_output(output: Output) -> Self {
        let globals = Scope::root();
        let global_object = ObjectRef::new();

        let print = print_function("print", output.clone());
        let console = ObjectRef::new();
        console.set("log", print_function("log", output.clone()));
        console.set("error", print_function("error", output));

        let json = ObjectRef::new();
        json.set("stringify", Value::native("stringify", json_stringify));
        json.set("parse", Value::native("parse", json_parse));

        let object = ObjectRef::new();
        object.set("keys", Value::native("keys", object_keys));

        let bindings = [
            ("global", Value::Object(global_object.clone())),
            ("globalThis", Value::Object(global_object.clone())),
            ("print", print),
            ("console", Value::Object(console)),
            ("JSON", Value::Object(json)),
            ("Object", Value::Object(object)),
            ("undefined", Value::Undefined),
            ("NaN", Value::Number(f64::NAN)),
            ("Infinity", Value::Number(f64::INFINITY)),
        ];
        for (name, value) in bindings {
            globals.declare(name, value, false);
        }

        Self {
            globals,
            global_object,
            array_push: Value::native("push", array_push),
            array_join: Value::native("join", array_join),
        }
    }

    /// The scope every unit's wrapper function closes over.
    pub fn globals(&self) -> &Scope {
        &self.globals
    }

    /// The object bound to `global`.
    pub fn global_object(&self) -> &ObjectRef {
        &self.global_object
    }

    pub(crate) fn array_method(&self, name: &str) -> Option<Value> {
        match name {
            "push" => Some(self.array_push.clone()),
            "join" => Some(self.array_join.clone()),
            _ => None,
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Natives
// ============================================================================

fn print_function(name: &str, output: Output) -> Value {
    Value::native(name, move |_, _, args| {
        let line = args
            .iter()
            .map(Value::inspect)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(output.borrow_mut(), "{}", line)
            .map_err(|e| Exception::error("Error", format!("write failed: {}", e)))?;
        Ok(Value::Undefined)
    })
}

fn json_stringify(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let value = args.first().cloned().unwrap_or_default();
    let pretty = args.get(2).is_some_and(Value::truthy);
    let json = value.to_json().map_err(|e| match e {
        ToJsonError::Circular => Exception::type_error(e.to_string()),
        ToJsonError::TooDeep => Exception::range_error(e.to_string()),
    })?;
    let Some(json) = json else {
        return Ok(Value::Undefined);
    };
    let text = if pretty {
        serde_json::to_string_pretty(&json)
    } else {
        serde_json::to_string(&json)
    }
    .map_err(|e| Exception::type_error(e.to_string()))?;
    Ok(Value::string(text))
}

fn json_parse(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let text = args
        .first()
        .map(Value::to_display_string)
        .unwrap_or_else(|| "undefined".to_string());
    serde_json::from_str::<serde_json::Value>(&text)
        .map(|json| Value::from_json(&json))
        .map_err(|e| Exception::Thrown(error_object("SyntaxError", &e.to_string())))
}

fn object_keys(_: &mut Interpreter, _: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let keys = match args.first() {
        Some(Value::Object(obj)) => obj.keys().into_iter().map(Value::string).collect(),
        Some(Value::Array(arr)) => (0..arr.len()).map(|i| Value::string(i.to_string())).collect(),
        Some(value) if value.is_nullish() => {
            return Err(Exception::type_error(
                "Cannot convert undefined or null to object",
            ))
        }
        _ => Vec::new(),
    };
    Ok(Value::Array(ArrayRef::new(keys)))
}

fn array_push(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let arr = this
        .as_array()
        .ok_or_else(|| Exception::type_error("push called on a non-array"))?;
    let mut len = arr.len();
    for arg in args {
        len = arr.push(arg);
    }
    Ok(Value::Number(len as f64))
}

fn array_join(_: &mut Interpreter, this: Value, args: Vec<Value>) -> Result<Value, Exception> {
    let arr = this
        .as_array()
        .ok_or_else(|| Exception::type_error("join called on a non-array"))?;
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => sep.to_display_string(),
    };
    let joined = arr
        .to_vec()
        .iter()
        .map(|v| {
            if v.is_nullish() {
                String::new()
            } else {
                v.to_display_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator);
    Ok(Value::string(joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::parser::parse;

    fn run_capturing(source: &str) -> (Value, String) {
        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let realm = Realm::with_output(output.clone());
        let scope = realm.globals().child();
        let program = parse(source).unwrap();
        let value = Interpreter::new(realm, 32).run(&program, &scope).unwrap();
        let text = String::from_utf8(output.borrow().clone()).unwrap();
        (value, text)
    }

    #[test]
    fn test_print_and_console_log() {
        let (_, out) = run_capturing("print('a', 1, { b: [true] }); console.log('c');");
        assert_eq!(out, "a 1 { b: [ true ] }\nc\n");
    }

    #[test]
    fn test_json_round_trip_in_scripts() {
        let (value, _) = run_capturing(
            "const o = JSON.parse('{\"b\":1,\"a\":[2]}'); o.c = 'x'; return JSON.stringify(o);",
        );
        assert_eq!(value.as_str(), Some(r#"{"b":1,"a":[2],"c":"x"}"#));
    }

    #[test]
    fn test_json_parse_error_is_catchable() {
        let (value, _) = run_capturing(
            "try { JSON.parse('{oops'); } catch (e) { return e.name; }",
        );
        assert_eq!(value.as_str(), Some("SyntaxError"));
    }

    #[test]
    fn test_global_object_is_shared_binding() {
        let (value, _) = run_capturing("global.x = 5; return globalThis.x;");
        assert_eq!(value.as_number(), Some(5.0));
    }

    #[test]
    fn test_object_keys_in_insertion_order() {
        let (value, _) = run_capturing("return Object.keys({ z: 1, a: 2 }).join();");
        assert_eq!(value.as_str(), Some("z,a"));
    }

    #[test]
    fn test_global_constants() {
        let (value, _) = run_capturing("return typeof undefined + (NaN === NaN) + Infinity;");
        assert_eq!(value.as_str(), Some("undefinedfalseInfinity"));
    }

    #[test]
    fn test_globals_cannot_be_rebound() {
        let realm = Realm::with_output(Rc::new(RefCell::new(Vec::<u8>::new())));
        let scope = realm.globals().child();
        let program = parse("undefined = 1;").unwrap();
        assert!(Interpreter::new(realm, 8).run(&program, &scope).is_err());
    }
}

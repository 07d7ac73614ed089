//! Runtime values of module scripts.
//!
//! Objects and arrays are shared, mutable and compared by identity, the way
//! `exports` must be: every requester of a unit receives the same object.

use crate::script::ast::FunctionLiteral;
use crate::script::interp::{Exception, Interpreter, Scope};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Deepest array/object nesting that JSON conversion, display and
/// inspection will descend into.
pub const MAX_VALUE_DEPTH: usize = 256;

/// Signature of host functions callable from scripts.
///
/// Arguments: the running interpreter, the `this` value and the call
/// arguments.
pub type NativeFn = dyn Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, Exception>;

/// A script value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Closure>),
    Native(Rc<NativeFunction>),
}

/// A script function together with the scope it closes over.
pub struct Closure {
    pub literal: Rc<FunctionLiteral>,
    pub scope: Scope,
}

/// A host function exposed to scripts.
pub struct NativeFunction {
    pub name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, Exception> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    pub fn call(
        &self,
        interp: &mut Interpreter,
        this: Value,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        (self.func)(interp, this, args)
    }
}

// ============================================================================
// Objects and arrays
// ============================================================================

/// Shared handle to an insertion-ordered property map.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<IndexMap<String, Value>>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Snapshot of the entries; safe to iterate while scripts mutate the object.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Move the properties into `pending` when this is the last handle.
    fn release_into(&self, pending: &mut Vec<Value>) {
        if Rc::strong_count(&self.0) == 1 {
            if let Ok(mut map) = self.0.try_borrow_mut() {
                pending.extend(map.drain(..).map(|(_, value)| value));
            }
        }
    }
}

impl Drop for ObjectRef {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.release_into(&mut pending);
        release_all(pending);
    }
}

/// Shared handle to a growable array.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(values: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(values)))
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Store at `index`, padding with `undefined` when writing past the end.
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
    }

    pub fn push(&self, value: Value) -> usize {
        let mut items = self.0.borrow_mut();
        items.push(value);
        items.len()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Move the elements into `pending` when this is the last handle.
    fn release_into(&self, pending: &mut Vec<Value>) {
        if Rc::strong_count(&self.0) == 1 {
            if let Ok(mut items) = self.0.try_borrow_mut() {
                pending.append(&mut items);
            }
        }
    }
}

impl Drop for ArrayRef {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.release_into(&mut pending);
        release_all(pending);
    }
}

/// Drop values with a work list instead of recursion, so long chains of
/// nested arrays and objects do not exhaust the native stack.
fn release_all(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match &value {
            Value::Array(arr) => arr.release_into(&mut pending),
            Value::Object(obj) => obj.release_into(&mut pending),
            _ => {}
        }
    }
}

// ============================================================================
// Conversions and predicates
// ============================================================================

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn native(
        name: impl Into<String>,
        func: impl Fn(&mut Interpreter, Value, Vec<Value>) -> Result<Value, Exception> + 'static,
    ) -> Self {
        Value::Native(Rc::new(NativeFunction::new(name, func)))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    /// JavaScript truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Function(_) | Value::Native(_) => "function",
        }
    }

    /// Numeric conversion used by arithmetic and relational operators.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    /// String conversion used by `+` and property keys. Arrays already being
    /// joined, and arrays nested past [`MAX_VALUE_DEPTH`], render empty.
    pub fn to_display_string(&self) -> String {
        let mut seen = Vec::new();
        self.display_into(&mut seen)
    }

    fn display_into(&self, seen: &mut Vec<usize>) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.to_string(),
            Value::Array(arr) => {
                if seen.len() >= MAX_VALUE_DEPTH || seen.contains(&arr.addr()) {
                    return String::new();
                }
                seen.push(arr.addr());
                let joined = arr
                    .to_vec()
                    .iter()
                    .map(|v| {
                        if v.is_nullish() {
                            String::new()
                        } else {
                            v.display_into(seen)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(",");
                seen.pop();
                joined
            }
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(f) => format!(
                "function {}() {{ [code] }}",
                f.literal.name.as_deref().unwrap_or("")
            ),
            Value::Native(f) => format!("function {}() {{ [native code] }}", f.name),
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`: strict equality, except that `null` and `undefined` are equal.
    pub fn loose_equals(&self, other: &Value) -> bool {
        (self.is_nullish() && other.is_nullish()) || self.strict_equals(other)
    }
}

/// 2^53: integral magnitudes below this convert to `i64` exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Format a number the way scripts print it: integral values have no
/// fractional part.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < MAX_SAFE_INTEGER {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// JSON bridge
// ============================================================================

/// Failure converting a script value to JSON.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToJsonError {
    #[error("Converting circular structure to JSON")]
    Circular,
    #[error("Maximum nesting depth ({}) exceeded converting to JSON", MAX_VALUE_DEPTH)]
    TooDeep,
}

impl Value {
    /// Build a script value from parsed JSON. Objects keep document order.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::Array(ArrayRef::new(items.iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(map) => Value::Object(ObjectRef::from_entries(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))),
            )),
        }
    }

    /// Convert to JSON with `JSON.stringify` rules: `None` for values JSON
    /// cannot represent (`undefined`, functions), which are dropped from
    /// objects and become `null` inside arrays. Non-finite numbers become
    /// `null`.
    pub fn to_json(&self) -> Result<Option<serde_json::Value>, ToJsonError> {
        let mut seen = Vec::new();
        self.to_json_inner(&mut seen)
    }

    fn to_json_inner(
        &self,
        seen: &mut Vec<usize>,
    ) -> Result<Option<serde_json::Value>, ToJsonError> {
        let json = match self {
            Value::Undefined | Value::Function(_) | Value::Native(_) => return Ok(None),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => json_number(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                enter(seen, arr.addr())?;
                let mut items = Vec::with_capacity(arr.len());
                for item in arr.to_vec() {
                    items.push(item.to_json_inner(seen)?.unwrap_or(serde_json::Value::Null));
                }
                seen.pop();
                serde_json::Value::Array(items)
            }
            Value::Object(obj) => {
                enter(seen, obj.addr())?;
                let mut map = serde_json::Map::new();
                for (key, value) in obj.entries() {
                    if let Some(json) = value.to_json_inner(seen)? {
                        map.insert(key, json);
                    }
                }
                seen.pop();
                serde_json::Value::Object(map)
            }
        };
        Ok(Some(json))
    }
}

fn enter(seen: &mut Vec<usize>, addr: usize) -> Result<(), ToJsonError> {
    if seen.contains(&addr) {
        return Err(ToJsonError::Circular);
    }
    if seen.len() >= MAX_VALUE_DEPTH {
        return Err(ToJsonError::TooDeep);
    }
    seen.push(addr);
    Ok(())
}

fn json_number(n: f64) -> serde_json::Value {
    if n.is_finite() && n == n.trunc() && n.abs() < MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

// ============================================================================
// Display
// ============================================================================

impl Value {
    /// Human-readable rendering used by `print` and error messages. Strings
    /// are quoted only when nested inside arrays or objects; containers
    /// nested past [`MAX_VALUE_DEPTH`] render as `[Array]` or `[Object]`.
    pub fn inspect(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.inspect_into(&mut out, &mut seen, true);
        out
    }

    fn inspect_into(&self, out: &mut String, seen: &mut Vec<usize>, top: bool) {
        match self {
            Value::String(s) if !top => {
                out.push('\'');
                out.push_str(&s.replace('\'', "\\'"));
                out.push('\'');
            }
            Value::Array(arr) => {
                if seen.contains(&arr.addr()) {
                    out.push_str("[Circular]");
                    return;
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    out.push_str("[Array]");
                    return;
                }
                let items = arr.to_vec();
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                seen.push(arr.addr());
                out.push_str("[ ");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.inspect_into(out, seen, false);
                }
                out.push_str(" ]");
                seen.pop();
            }
            Value::Object(obj) => {
                if seen.contains(&obj.addr()) {
                    out.push_str("[Circular]");
                    return;
                }
                if seen.len() >= MAX_VALUE_DEPTH {
                    out.push_str("[Object]");
                    return;
                }
                let entries = obj.entries();
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                seen.push(obj.addr());
                out.push_str("{ ");
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    if is_plain_key(key) {
                        out.push_str(key);
                    } else {
                        out.push_str(&format!("'{}'", key));
                    }
                    out.push_str(": ");
                    value.inspect_into(out, seen, false);
                }
                out.push_str(" }");
                seen.pop();
            }
            Value::Function(f) => match &f.literal.name {
                Some(name) => out.push_str(&format!("[Function: {}]", name)),
                None => out.push_str("[Function (anonymous)]"),
            },
            Value::Native(f) => out.push_str(&format!("[Function: {}]", f.name)),
            other => out.push_str(&other.to_display_string()),
        }
    }
}

fn is_plain_key(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inspect())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => f.write_str(&other.inspect()),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&Value::Object(self.clone()), f)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_large_integral_numbers() {
        assert_eq!(number_to_string(1e20), "100000000000000000000");
        assert_eq!(number_to_string(-1e20), "-100000000000000000000");
        assert_eq!(number_to_string(9007199254740991.0), "9007199254740991");
        assert_eq!(Value::Number(1e20).to_display_string(), "100000000000000000000");
    }

    fn nested_arrays(levels: usize) -> Value {
        let mut value = Value::Array(ArrayRef::new(vec![]));
        for _ in 0..levels {
            value = Value::Array(ArrayRef::new(vec![value]));
        }
        value
    }

    #[test]
    fn test_json_depth_limit() {
        assert!(nested_arrays(MAX_VALUE_DEPTH - 1).to_json().is_ok());
        assert_eq!(
            nested_arrays(MAX_VALUE_DEPTH).to_json(),
            Err(ToJsonError::TooDeep)
        );
    }

    #[test]
    fn test_deep_nesting_renders_without_recursing_forever() {
        let deep = nested_arrays(MAX_VALUE_DEPTH + 10);
        assert!(deep.inspect().contains("[Array]"));
        assert_eq!(deep.to_display_string(), "");

        let arr = ArrayRef::new(vec![Value::Number(1.0)]);
        arr.push(Value::Array(arr.clone()));
        assert_eq!(Value::Array(arr.clone()).to_display_string(), "1,");
        arr.set(1, Value::Null);
    }

    #[test]
    fn test_dropping_long_chain() {
        let mut value = Value::Object(ObjectRef::new());
        for i in 0..200_000 {
            value = if i % 2 == 0 {
                Value::Array(ArrayRef::new(vec![value]))
            } else {
                Value::Object(ObjectRef::from_entries([("next".to_string(), value)]))
            };
        }
        drop(value);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::string("").truthy());
        assert!(Value::string("0").truthy());
        assert!(Value::Object(ObjectRef::new()).truthy());
    }

    #[test]
    fn test_equality() {
        let obj = ObjectRef::new();
        let a = Value::Object(obj.clone());
        let b = Value::Object(obj);
        assert!(a.strict_equals(&b));
        assert!(!a.strict_equals(&Value::Object(ObjectRef::new())));
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(!Value::Null.strict_equals(&Value::Undefined));
        assert!(!Value::Number(1.0).loose_equals(&Value::string("1")));
    }

    #[test]
    fn test_json_preserves_key_order() {
        let parsed: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":[true,null],"m":"x"}"#).unwrap();
        let value = Value::from_json(&parsed);
        assert_eq!(value.as_object().unwrap().keys(), vec!["z", "a", "m"]);
        assert_eq!(value.to_json().unwrap(), Some(parsed));
    }

    #[test]
    fn test_json_drops_unrepresentable_values() {
        let obj = ObjectRef::new();
        obj.set("a", Value::Undefined);
        obj.set("b", Value::native("f", |_, _, _| Ok(Value::Undefined)));
        obj.set("c", Value::Array(ArrayRef::new(vec![Value::Undefined, Value::Number(f64::NAN)])));
        assert_eq!(Value::Object(obj).to_json().unwrap(), Some(json!({"c": [null, null]})));
        assert_eq!(Value::Undefined.to_json().unwrap(), None);
    }

    #[test]
    fn test_json_rejects_cycles() {
        let obj = ObjectRef::new();
        obj.set("self", Value::Object(obj.clone()));
        assert_eq!(Value::Object(obj.clone()).to_json(), Err(ToJsonError::Circular));
        // Break the cycle so the test does not leak
        obj.set("self", Value::Null);
    }

    #[test]
    fn test_inspect() {
        let obj = ObjectRef::new();
        obj.set("a", Value::Number(1.0));
        obj.set("b-c", Value::string("x"));
        obj.set("list", Value::Array(ArrayRef::new(vec![Value::Bool(true)])));
        assert_eq!(Value::Object(obj).inspect(), "{ a: 1, 'b-c': 'x', list: [ true ] }");
        assert_eq!(Value::string("top").inspect(), "top");
        assert_eq!(Value::Object(ObjectRef::new()).inspect(), "{}");
    }

    #[test]
    fn test_array_set_pads_with_undefined() {
        let arr = ArrayRef::new(vec![]);
        arr.set(2, Value::Number(3.0));
        assert_eq!(arr.len(), 3);
        assert!(matches!(arr.get(0), Some(Value::Undefined)));
    }

    #[test]
    fn test_display_string_of_array() {
        let arr = ArrayRef::new(vec![Value::Number(1.0), Value::Null, Value::string("x")]);
        assert_eq!(Value::Array(arr).to_display_string(), "1,,x");
    }
}

//! Embedded script runtime
//!
//! A small JavaScript subset, enough for CommonJS-style modules: a `logos`
//! lexer, a recursive-descent parser and a tree-walking interpreter.

pub mod ast;
pub mod builtins;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

pub use builtins::{Output, Realm};
pub use interp::{Exception, Interpreter, Scope};
pub use parser::{parse, ParseError, SyntaxError};
pub use value::{ArrayRef, ObjectRef, ToJsonError, Value, MAX_VALUE_DEPTH};

//! Loading strategies, keyed by file suffix.

use super::sandbox::{Bindings, CompiledUnit};
use super::unit::Unit;
use super::Loader;
use crate::error::LoadError;
use crate::script::interp::{Exception, Interpreter};
use crate::script::value::Value;
use indexmap::IndexMap;
use std::path::Path;
use std::rc::Rc;

/// Fills a freshly registered unit's exposed value.
///
/// Strategies run with no loader borrow held, so they may load other units
/// through `loader`. A [`LoadError`] converts into the returned
/// [`Exception`] with `?`; a value thrown by script code is returned as is
/// and the loader attributes it to `unit`.
pub trait LoadStrategy {
    /// Short name for logs
    fn name(&self) -> &str;

    fn load(&self, loader: &Loader, interp: &mut Interpreter, unit: &Unit) -> Result<(), Exception>;
}

/// `.json`: the parsed document replaces the exposed value.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStrategy;

impl LoadStrategy for JsonStrategy {
    fn name(&self) -> &str {
        "json"
    }

    fn load(&self, _loader: &Loader, _interp: &mut Interpreter, unit: &Unit) -> Result<(), Exception> {
        let source = read_source(unit.id())?;
        let json: serde_json::Value =
            serde_json::from_str(&source).map_err(|source| LoadError::Json {
                path: unit.id().to_path_buf(),
                source,
            })?;
        unit.set_exposed(Value::from_json(&json));
        Ok(())
    }
}

/// `.js`: compile through the sandbox and run once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptStrategy;

impl LoadStrategy for ScriptStrategy {
    fn name(&self) -> &str {
        "script"
    }

    fn load(&self, loader: &Loader, interp: &mut Interpreter, unit: &Unit) -> Result<(), Exception> {
        let source = read_source(unit.id())?;
        let compiled = CompiledUnit::compile(&source, interp.realm()).map_err(|source| {
            LoadError::Syntax {
                path: unit.id().to_path_buf(),
                source,
            }
        })?;

        let bindings = Bindings {
            exports: unit.exposed(),
            require: loader.require_function(unit.dir()),
            module: Value::Object(unit.module_object().clone()),
            filename: unit.id().to_string_lossy().into_owned(),
            dirname: unit.dir().to_string_lossy().into_owned(),
        };
        compiled.invoke(interp, bindings)?;
        Ok(())
    }
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match source.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => source,
    })
}

/// Built-in strategy for a suffix, if there is one.
pub fn builtin_strategy(suffix: &str) -> Option<Rc<dyn LoadStrategy>> {
    match suffix {
        ".js" => Some(Rc::new(ScriptStrategy)),
        ".json" => Some(Rc::new(JsonStrategy)),
        _ => None,
    }
}

// ============================================================================
// Strategy table
// ============================================================================

/// Ordered suffix → strategy map. Registration order is probe order.
#[derive(Default, Clone)]
pub struct StrategyTable {
    strategies: IndexMap<String, Rc<dyn LoadStrategy>>,
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for `suffix`. A suffix without a leading dot gets
    /// one. Re-registering replaces the strategy and keeps the position.
    pub fn register(&mut self, suffix: &str, strategy: Rc<dyn LoadStrategy>) {
        let suffix = if suffix.starts_with('.') {
            suffix.to_string()
        } else {
            format!(".{}", suffix)
        };
        self.strategies.insert(suffix, strategy);
    }

    pub fn get(&self, suffix: &str) -> Option<Rc<dyn LoadStrategy>> {
        self.strategies.get(suffix).cloned()
    }

    /// Strategy for a file: the longest registered suffix that `file_name`
    /// ends with and is not all of.
    pub fn dispatch(&self, file_name: &str) -> Option<(&str, Rc<dyn LoadStrategy>)> {
        self.strategies
            .iter()
            .filter(|(suffix, _)| file_name.len() > suffix.len() && file_name.ends_with(suffix.as_str()))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(suffix, strategy)| (suffix.as_str(), strategy.clone()))
    }

    pub fn suffixes(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

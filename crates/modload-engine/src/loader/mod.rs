//! The module loader
//!
//! A [`Loader`] resolves references, keeps one [`Unit`] per resolved file
//! and dispatches loading to the strategy registered for the file's suffix:
//!
//! ```text
//! load(reference, dir)
//!   → resolve            (exact path, then each suffix in order)
//!   → registry lookup    (hit: return current exposed value)
//!   → register new unit  (before loading, so cycles see the partial value)
//!   → strategy.load      (longest registered suffix of the file name)
//!   → exposed value
//! ```

mod registry;
mod resolver;
mod sandbox;
mod strategy;
mod unit;

pub use registry::{CacheStats, Lookup, UnitRegistry};
pub use resolver::{absolute, normalize, resolve};
pub use sandbox::{Bindings, CompiledUnit, WRAPPER_PARAMS};
pub use strategy::{builtin_strategy, JsonStrategy, LoadStrategy, ScriptStrategy, StrategyTable};
pub use unit::{Unit, UnitState};

use crate::config::{LoaderOptions, MAX_CALL_DEPTH};
use crate::error::LoadError;
use crate::script::builtins::Realm;
use crate::script::interp::{Exception, Interpreter};
use crate::script::value::{ObjectRef, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

struct LoaderState {
    base_dir: PathBuf,
    max_call_depth: usize,
    registry: RefCell<UnitRegistry>,
    strategies: RefCell<StrategyTable>,
    realm: Realm,
}

/// Handle to one loader: its registry, strategy table and global scope.
///
/// Cloning the handle shares the loader. Loaders are single-threaded.
#[derive(Clone)]
pub struct Loader {
    state: Rc<LoaderState>,
}

impl Loader {
    /// A loader with default options and `print` writing to stdout.
    pub fn new() -> Self {
        Self::with_options(LoaderOptions::default())
    }

    /// Build a loader, registering the built-in strategy of every listed
    /// extension in order. Extensions without a built-in strategy are skipped.
    pub fn with_options(options: LoaderOptions) -> Self {
        Self::with_realm(options, Realm::new())
    }

    /// Like [`Loader::with_options`], with a caller-provided global scope
    /// (for example one whose `print` writes into a buffer). The call depth is
    /// clamped to `1..=MAX_CALL_DEPTH`.
    pub fn with_realm(options: LoaderOptions, realm: Realm) -> Self {
        let max_call_depth = options.max_call_depth.clamp(1, MAX_CALL_DEPTH);
        if max_call_depth != options.max_call_depth {
            warn!(
                requested = options.max_call_depth,
                used = max_call_depth,
                "max call depth out of range, clamping"
            );
        }
        let mut strategies = StrategyTable::new();
        for ext in &options.extensions {
            match builtin_strategy(ext) {
                Some(strategy) => strategies.register(ext, strategy),
                None => warn!(extension = %ext, "no built-in loader for extension, skipping"),
            }
        }
        Self {
            state: Rc::new(LoaderState {
                base_dir: absolute(&options.base_dir),
                max_call_depth,
                registry: RefCell::new(UnitRegistry::new()),
                strategies: RefCell::new(strategies),
                realm,
            }),
        }
    }

    /// Register (or replace) the strategy for `suffix`. Suffixes may span
    /// several dots (`.tpl.txt`); dispatch picks the longest one a resolved
    /// file name ends with.
    pub fn register_strategy(&self, suffix: &str, strategy: impl LoadStrategy + 'static) {
        self.state
            .strategies
            .borrow_mut()
            .register(suffix, Rc::new(strategy));
    }

    /// Registered suffixes, in probe order.
    pub fn extensions(&self) -> Vec<String> {
        self.state
            .strategies
            .borrow()
            .suffixes()
            .map(str::to_string)
            .collect()
    }

    pub fn base_dir(&self) -> &Path {
        &self.state.base_dir
    }

    /// Bound on nested script calls for every load.
    pub fn max_call_depth(&self) -> usize {
        self.state.max_call_depth
    }

    /// The object bound to `global` in every unit.
    pub fn global(&self) -> ObjectRef {
        self.state.realm.global_object().clone()
    }

    /// Resolve `reference` against `dir` without loading.
    pub fn resolve(&self, reference: &str, dir: &Path) -> Result<PathBuf, LoadError> {
        let suffixes = self.extensions();
        resolve(reference, dir, suffixes.iter().map(String::as_str))
    }

    /// Load `reference` relative to the loader's base directory.
    pub fn load(&self, reference: &str) -> Result<Value, LoadError> {
        let dir = self.state.base_dir.clone();
        self.load_from(reference, &dir)
    }

    /// Load `reference` as if required from a unit in `dir`.
    pub fn load_from(&self, reference: &str, dir: &Path) -> Result<Value, LoadError> {
        let mut interp = Interpreter::new(self.state.realm.clone(), self.state.max_call_depth);
        self.load_with(&mut interp, reference, dir)
            .map_err(|exception| exception.into_load_error(dir))
    }

    /// The registered unit for an identifier.
    pub fn unit(&self, id: &Path) -> Option<Rc<Unit>> {
        self.state.registry.borrow().get(id)
    }

    /// Registered identifiers, in load order.
    pub fn loaded(&self) -> Vec<PathBuf> {
        self.state.registry.borrow().identifiers()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.state.registry.borrow().stats()
    }

    /// Load on behalf of `interp`. Failures stay [`Exception`]s so that a
    /// value thrown by a nested unit reaches a catching requirer unchanged.
    fn load_with(&self, interp: &mut Interpreter, reference: &str, dir: &Path) -> Result<Value, Exception> {
        let id = self.resolve(reference, dir)?;

        let lookup = self.state.registry.borrow_mut().lookup_or_register(id);
        let unit = match lookup {
            Lookup::Hit(unit) => {
                debug!(id = %unit.id().display(), state = ?unit.state(), "registry hit");
                return Ok(unit.exposed());
            }
            Lookup::Registered(unit) => unit,
        };
        debug!(id = %unit.id().display(), "registry miss");

        let file_name = unit
            .id()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let strategy = self
            .state
            .strategies
            .borrow()
            .dispatch(&file_name)
            .map(|(_, strategy)| strategy);
        let Some(strategy) = strategy else {
            unit.mark_failed();
            return Err(LoadError::UnknownExtension {
                path: unit.id().to_path_buf(),
                extension: unit.extension().unwrap_or_default(),
            }
            .into());
        };

        debug!(id = %unit.id().display(), strategy = strategy.name(), "loading unit");
        match strategy.load(self, interp, &unit) {
            Ok(()) => {
                unit.mark_loaded();
                Ok(unit.exposed())
            }
            Err(exception) => {
                unit.mark_failed();
                debug!(id = %unit.id().display(), error = %exception, "unit failed to load");
                Err(match exception {
                    Exception::Thrown(value) => Exception::Uncaught {
                        path: unit.id().to_path_buf(),
                        value,
                    },
                    other => other,
                })
            }
        }
    }

    /// The `require` function handed to units in `dir`.
    ///
    /// It holds the loader weakly: units must not keep their loader alive.
    pub(crate) fn require_function(&self, dir: &Path) -> Value {
        let loader: Weak<LoaderState> = Rc::downgrade(&self.state);
        let dir = dir.to_path_buf();
        Value::native("require", move |interp, _this, args| {
            let reference = match args.first() {
                Some(Value::String(reference)) => reference.to_string(),
                _ => {
                    return Err(Exception::type_error(
                        "The \"id\" argument must be of type string",
                    ))
                }
            };
            let state = loader
                .upgrade()
                .ok_or_else(|| Exception::error("Error", "module loader has been dropped"))?;
            Loader { state }.load_with(interp, &reference, &dir)
        })
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("base_dir", &self.state.base_dir)
            .field("extensions", &self.extensions())
            .field("units", &self.state.registry.borrow().len())
            .finish()
    }
}

//! Modload engine
//!
//! A dynamic module loader: resolves a reference to a file, loads the file
//! once through the strategy registered for its suffix and hands every
//! requester the same exposed value.
//!
//! ```text
//! let loader = Loader::with_options(LoaderOptions::default().with_base_dir("app"));
//! let exports = loader.load("./main")?;
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod script;

pub use config::{
    LoaderOptions, Manifest, ManifestError, DEFAULT_MAX_CALL_DEPTH, MANIFEST_FILE, MAX_CALL_DEPTH,
};
pub use error::LoadError;
pub use loader::{CacheStats, JsonStrategy, LoadStrategy, Loader, ScriptStrategy, Unit, UnitState};
pub use script::{Exception, Interpreter, ObjectRef, Realm, Value};

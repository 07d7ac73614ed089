//! Loaded units

use crate::script::value::{ObjectRef, Value};
use std::cell::Cell;
use std::path::{Path, PathBuf};

/// Progress of a unit's single load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Registered, strategy still running (or re-entered through a cycle)
    Loading,
    Loaded,
    /// The strategy failed; the unit keeps whatever it exposed so far
    Failed,
}

/// One source file known to the loader.
///
/// The exposed value lives on the script-visible `module` object as
/// `module.exports`, so reassignment from inside the unit is what requesters
/// observe.
pub struct Unit {
    id: PathBuf,
    dir: PathBuf,
    module: ObjectRef,
    state: Cell<UnitState>,
}

impl Unit {
    /// Create a unit for an absolute identifier. The exposed value starts as
    /// an empty object.
    pub fn new(id: PathBuf) -> Self {
        let dir = id.parent().map(Path::to_path_buf).unwrap_or_else(|| id.clone());
        let module = ObjectRef::new();
        module.set("id", Value::string(id.to_string_lossy()));
        module.set("exports", Value::Object(ObjectRef::new()));
        module.set("filename", Value::string(id.to_string_lossy()));
        module.set("path", Value::string(dir.to_string_lossy()));
        module.set("loaded", Value::Bool(false));
        Self {
            id,
            dir,
            module,
            state: Cell::new(UnitState::Loading),
        }
    }

    pub fn id(&self) -> &Path {
        &self.id
    }

    /// Containing directory; nested references resolve against it.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The object bound to `module` inside the unit.
    pub fn module_object(&self) -> &ObjectRef {
        &self.module
    }

    /// Current value of `module.exports`.
    pub fn exposed(&self) -> Value {
        self.module.get("exports").unwrap_or_default()
    }

    /// Replace the exposed value wholesale.
    pub fn set_exposed(&self, value: Value) {
        self.module.set("exports", value);
    }

    pub fn state(&self) -> UnitState {
        self.state.get()
    }

    /// `.` followed by the last file extension.
    pub fn extension(&self) -> Option<String> {
        self.id
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }

    pub(crate) fn mark_loaded(&self) {
        self.state.set(UnitState::Loaded);
        self.module.set("loaded", Value::Bool(true));
    }

    pub(crate) fn mark_failed(&self) {
        self.state.set(UnitState::Failed);
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("id", &self.id)
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_exposes_empty_object() {
        let unit = Unit::new(PathBuf::from("/app/lib/util.js"));
        assert_eq!(unit.dir(), Path::new("/app/lib"));
        assert_eq!(unit.state(), UnitState::Loading);
        assert!(unit.exposed().as_object().unwrap().is_empty());
        assert_eq!(
            unit.module_object().get("filename").unwrap().as_str(),
            Some("/app/lib/util.js")
        );
    }

    #[test]
    fn test_extension() {
        assert_eq!(Unit::new(PathBuf::from("/a/b.json")).extension().as_deref(), Some(".json"));
        assert_eq!(Unit::new(PathBuf::from("/a/b.min.js")).extension().as_deref(), Some(".js"));
        assert_eq!(Unit::new(PathBuf::from("/a/Makefile")).extension(), None);
    }

    #[test]
    fn test_set_exposed_replaces_value() {
        let unit = Unit::new(PathBuf::from("/a.json"));
        unit.set_exposed(Value::Number(3.0));
        assert_eq!(unit.exposed().as_number(), Some(3.0));
        unit.mark_loaded();
        assert_eq!(unit.state(), UnitState::Loaded);
        assert!(unit.module_object().get("loaded").unwrap().truthy());
    }
}

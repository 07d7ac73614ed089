//! Reference resolution
//!
//! Turns a reference such as `./lib/util` into the absolute path of an
//! existing regular file.

use crate::error::LoadError;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::trace;

/// Resolve `reference` against `base_dir`.
///
/// # Resolution Order
/// For `require("./util")` with suffixes `[".js", ".json"]`:
/// 1. Try `./util` exactly
/// 2. Try `./util.js`
/// 3. Try `./util.json`
///
/// Suffixes are appended to the path string, so `./util.min` probes
/// `./util.min.js` rather than replacing `.min`.
pub fn resolve<'a>(
    reference: &str,
    base_dir: &Path,
    suffixes: impl IntoIterator<Item = &'a str>,
) -> Result<PathBuf, LoadError> {
    let base = absolute(base_dir);
    let path = normalize(&base.join(reference));
    let mut tried = Vec::new();

    trace!(candidate = %path.display(), "probing exact path");
    if path.is_file() {
        return Ok(path);
    }
    tried.push(path.clone());

    for suffix in suffixes {
        let candidate = with_suffix(&path, suffix);
        trace!(candidate = %candidate.display(), "probing suffix");
        if candidate.is_file() {
            return Ok(candidate);
        }
        tried.push(candidate);
    }

    Err(LoadError::NotFound {
        reference: reference.to_string(),
        base,
        tried,
    })
}

/// Make `path` absolute against the working directory, without touching the
/// filesystem.
pub fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => path.to_path_buf(),
        }
    };
    normalize(&joined)
}

/// Lexically remove `.` and `..` components. `..` never climbs above the
/// root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut candidate = OsString::from(path.as_os_str());
    candidate.push(suffix);
    PathBuf::from(candidate)
}

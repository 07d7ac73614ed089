//! Loader configuration and the `modload.toml` manifest.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name looked up by the CLI.
pub const MANIFEST_FILE: &str = "modload.toml";

/// Suffixes with a built-in loading strategy, in default registration order.
pub const DEFAULT_EXTENSIONS: [&str; 2] = [".js", ".json"];

/// Default bound on nested script calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 128;

/// Largest accepted call depth. Deeper script recursion would exhaust the
/// native stack before the interpreter could raise `RangeError`.
pub const MAX_CALL_DEPTH: usize = 512;

/// Errors that can occur while reading configuration
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),
}

/// Options for constructing a [`Loader`](crate::Loader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Directory that top-level references are resolved against.
    pub base_dir: PathBuf,
    /// Suffixes to register, in probe order.
    pub extensions: Vec<String>,
    /// Maximum depth of nested script calls.
    pub max_call_depth: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl LoaderOptions {
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Check that every extension has a built-in strategy and the call depth
    /// is usable.
    pub fn validate(&self) -> Result<(), ManifestError> {
        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(ManifestError::ValidationError(format!(
                    "extension '{}' must start with '.'",
                    ext
                )));
            }
            if !DEFAULT_EXTENSIONS.contains(&ext.as_str()) {
                return Err(ManifestError::ValidationError(format!(
                    "no built-in loader for extension '{}'",
                    ext
                )));
            }
        }
        if self.max_call_depth == 0 {
            return Err(ManifestError::ValidationError(
                "max-call-depth must be at least 1".to_string(),
            ));
        }
        if self.max_call_depth > MAX_CALL_DEPTH {
            return Err(ManifestError::ValidationError(format!(
                "max-call-depth must be at most {}",
                MAX_CALL_DEPTH
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Project manifest (modload.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Package metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageInfo>,

    /// Loader settings
    #[serde(default)]
    pub loader: LoaderSection,
}

/// Package information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageInfo {
    pub name: String,

    /// Entry reference loaded by `modload run` without arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
}

/// `[loader]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LoaderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,
}

impl Manifest {
    /// Load and validate a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate manifest text
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if let Some(package) = &self.package {
            if package.name.trim().is_empty() {
                return Err(ManifestError::ValidationError(
                    "package name cannot be empty".to_string(),
                ));
            }
        }
        self.loader_options(PathBuf::from(".")).validate()
    }

    /// Entry reference from `[package] main`.
    pub fn main(&self) -> Option<&str> {
        self.package.as_ref().and_then(|p| p.main.as_deref())
    }

    /// Build loader options rooted at `base_dir`, filling unset fields with
    /// defaults.
    pub fn loader_options(&self, base_dir: impl Into<PathBuf>) -> LoaderOptions {
        let mut options = LoaderOptions::default().with_base_dir(base_dir);
        if let Some(extensions) = &self.loader.extensions {
            options.extensions = extensions.clone();
        }
        if let Some(depth) = self.loader.max_call_depth {
            options.max_call_depth = depth;
        }
        options
    }
}

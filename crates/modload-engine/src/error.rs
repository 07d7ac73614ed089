//! Loader error types

use crate::script::parser::SyntaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a unit
#[derive(Debug, Error)]
pub enum LoadError {
    /// No regular file matched the reference
    #[error("Cannot find module '{reference}' from '{}' (tried: {tried:?})", base.display())]
    NotFound {
        reference: String,
        base: PathBuf,
        tried: Vec<PathBuf>,
    },

    /// The resolved file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Structured data failed to parse
    #[error("Invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Script source failed to lex or parse
    #[error("Syntax error in {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    /// A value thrown by script code escaped the unit
    #[error("Uncaught {message} in {}", path.display())]
    Uncaught { path: PathBuf, message: String },

    /// No strategy is registered for the unit's suffix
    #[error("No loader registered for extension '{extension}' ({})", path.display())]
    UnknownExtension { path: PathBuf, extension: String },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }

    /// Stable code exposed to scripts that catch a failed `require`.
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "MODULE_NOT_FOUND",
            LoadError::Read { .. } => "ERR_READ",
            LoadError::Json { .. } => "ERR_INVALID_JSON",
            LoadError::Syntax { .. } => "ERR_SYNTAX",
            LoadError::Uncaught { .. } => "ERR_UNCAUGHT",
            LoadError::UnknownExtension { .. } => "ERR_UNKNOWN_EXTENSION",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_reference() {
        let err = LoadError::NotFound {
            reference: "./missing".to_string(),
            base: PathBuf::from("/app"),
            tried: vec![PathBuf::from("/app/missing")],
        };
        assert!(err.is_not_found());
        assert_eq!(err.code(), "MODULE_NOT_FOUND");
        assert!(err.to_string().starts_with("Cannot find module './missing' from '/app'"));
    }

    #[test]
    fn test_load_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LoadError>();
    }
}

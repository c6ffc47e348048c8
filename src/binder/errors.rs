//! Error taxonomy for a binding session
//!
//! Only [`BindError::Io`] aborts a header load. Declaration errors are
//! isolated to their span and collected, resolution errors are warning-class
//! and surfaced through the load report, and call errors are returned from
//! the lookup surface without touching the tables.

use crate::preprocessor::PreprocessError;
use std::fmt;
use std::path::PathBuf;

/// All error kinds a binding session can produce.
#[derive(Debug)]
pub enum BindError {
    /// Missing include file or missing native binary. Fatal for the load.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A declaration span outside the supported grammar subset. The
    /// offending span is reported and skipped; the load continues.
    Declaration { decl: String, message: String },

    /// Aggregates referenced but never declared by the end of a load.
    /// Warning-class: opaque-by-design types are a legitimate outcome.
    Resolution { names: Vec<String> },

    /// Lookup of a function name absent from the function table.
    Call { function: String },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::Io { path, source } => {
                write!(f, "I/O error on '{}': {}", path.display(), source)
            }
            BindError::Declaration { decl, message } => {
                write!(f, "cannot parse declaration '{}': {}", decl.trim(), message)
            }
            BindError::Resolution { names } => {
                write!(f, "unresolved aggregate types: {}", names.join(", "))
            }
            BindError::Call { function } => {
                write!(f, "no such bound function: '{}'", function)
            }
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PreprocessError> for BindError {
    fn from(err: PreprocessError) -> Self {
        match err {
            PreprocessError::Include { path, source } => BindError::Io { path, source },
        }
    }
}

//! Load errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the class-file boundary.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No classpath entry provides the class.
    #[error("class not found: {class}")]
    NotFound { class: String },

    /// Malformed classpath specification.
    #[error("bad classpath '{spec}': {reason}")]
    Classpath { spec: String, reason: String },

    /// A classpath entry could not be read.
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A class definition document failed to parse.
    #[error("malformed class definition for {class}: {source}")]
    Parse {
        class: String,
        #[source]
        source: serde_json::Error,
    },

    /// A definition used a modifier this toolchain does not know.
    #[error("unknown modifier '{modifier}' in {context}")]
    UnknownModifier { modifier: String, context: String },

    /// A definition carried an ill-formed internal class name.
    #[error("invalid class name: '{0}'")]
    BadName(String),
}

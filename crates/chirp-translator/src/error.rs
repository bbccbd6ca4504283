//! Translation errors
//!
//! Nothing here is retried: an unresolved symbol or a verification
//! failure aborts the enclosing `close` call, and the class that
//! triggered it is left in the terminal `Error` state.

use crate::verifier::VerifyError;
use chirp_suite::StateError;
use thiserror::Error;

pub type TranslateResult<T> = Result<T, TranslateError>;

#[derive(Debug, Error)]
pub enum TranslateError {
    /// A referenced class could not be located on the classpath. Carries
    /// the conversion path for diagnostics.
    #[error("class not found: {class}{}", format_path(.path))]
    ClassNotFound { class: String, path: Vec<String> },

    /// A referenced method does not exist on the target class.
    #[error("no such method: {class}.{method}")]
    NoSuchMethod { class: String, method: String },

    /// A referenced field does not exist on the target class.
    #[error("no such field: {class}.{field}")]
    NoSuchField { class: String, field: String },

    /// Classpath, definition or hierarchy problem discovered while
    /// linking.
    #[error("linkage error: {0}")]
    Linkage(String),

    /// An emitted method body failed post-compaction verification.
    #[error("verification of {class}.{method} failed: {source}")]
    Verify {
        class: String,
        method: String,
        #[source]
        source: VerifyError,
    },

    /// Lifecycle ordering violated; a pipeline bug, not bad input.
    #[error(transparent)]
    State(#[from] StateError),
}

fn format_path(path: &[String]) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" (while converting: {})", path.join(" -> "))
    }
}

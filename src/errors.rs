use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors reported while loading a network or running inference on it.
#[derive(Debug, Error)]
pub enum MrfError {
    /// The network file could not be opened or read.
    #[error("cannot access network file {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The network file does not follow the MARKOV format.
    #[error("malformed network file at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// An algebra call that has no defined result (e.g. the product of no factors).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A value table does not fit the scope it is attached to.
    #[error("value table mismatch: expected {expected} entries, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// A variable was declared with an empty domain.
    #[error("variable {variable} has invalid domain size {domain_size}")]
    InvalidDomain { variable: usize, domain_size: usize },

    /// The joint table over these variables has more entries than can be addressed.
    #[error("table over variables {variables:?} is too large")]
    TableTooLarge { variables: Vec<usize> },
}

pub type Result<T> = std::result::Result<T, MrfError>;

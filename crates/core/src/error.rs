//! Error types for rft-core
//!
//! Every fallible operation in the core returns [`Result`]. Errors raised for a
//! specific remote entry are wrapped in [`Error::Entry`] so that callers can
//! report a per-item failure instead of an opaque batch failure.

use thiserror::Error;

/// Result type alias for rft-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every protocol
#[derive(Error, Debug)]
pub enum Error {
    /// Remote entry or local source does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Interactive credential prompt was dismissed
    #[error("Login canceled")]
    LoginCanceled,

    /// Backend replied with a fault that has no better classification
    #[error("Protocol error: {message}")]
    Protocol {
        message: String,
        /// Raw status or reply code, when the backend returned one
        status: Option<u32>,
    },

    /// A single listing line could not be parsed
    #[error("Failed to parse listing line '{line}': {reason}")]
    Parse { line: String, reason: String },

    /// Cooperative cancellation was observed
    #[error("Operation canceled")]
    Canceled,

    /// Permission denied by the backend
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Conflicting state on the backend (e.g. container not empty)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport level failure or transient server error
    #[error("Network error: {0}")]
    Network(String),

    /// The active protocol has no implementation for this operation
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure tied to a specific remote entry
    #[error("{action} {path}: {source}")]
    Entry {
        action: String,
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the entry path and the attempted action to this error
    pub fn for_entry(self, action: impl Into<String>, path: impl Into<String>) -> Self {
        Error::Entry {
            action: action.into(),
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping entry enrichment
    pub fn root(&self) -> &Error {
        match self {
            Error::Entry { source, .. } => source.root(),
            other => other,
        }
    }

    /// Path of the entry this error concerns, if it was enriched
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Entry { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Error::NotFound(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.root(), Error::Canceled | Error::LoginCanceled)
    }
}

/// A best-effort step that failed without failing the operation
#[derive(Debug)]
pub struct Degradation {
    /// Path of the entry the step was applied to
    pub path: String,
    /// Short name of the step (e.g. "permission", "segment")
    pub step: &'static str,
    pub error: Error,
}

impl Degradation {
    pub fn new(path: impl Into<String>, step: &'static str, error: Error) -> Self {
        Self {
            path: path.into(),
            step,
            error,
        }
    }
}

/// Outcome of an operation that contains best-effort steps
#[derive(Debug, Default)]
pub enum Completion {
    /// Every step succeeded
    #[default]
    Full,
    /// The operation succeeded but some best-effort steps failed
    Degraded(Vec<Degradation>),
}

impl Completion {
    /// Build a completion from collected best-effort failures
    pub fn from_degradations(degradations: Vec<Degradation>) -> Self {
        if degradations.is_empty() {
            Completion::Full
        } else {
            Completion::Degraded(degradations)
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Completion::Degraded(_))
    }

    pub fn degradations(&self) -> &[Degradation] {
        match self {
            Completion::Full => &[],
            Completion::Degraded(items) => items,
        }
    }

    /// Combine two completions, keeping all degradations
    pub fn merge(self, other: Completion) -> Completion {
        match (self, other) {
            (Completion::Full, Completion::Full) => Completion::Full,
            (Completion::Full, degraded) | (degraded, Completion::Full) => degraded,
            (Completion::Degraded(mut a), Completion::Degraded(b)) => {
                a.extend(b);
                Completion::Degraded(a)
            }
        }
    }
}

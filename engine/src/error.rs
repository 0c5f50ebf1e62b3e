//! Error types for the memverse engine.

use crate::EntityKind;
use thiserror::Error;

/// All possible errors from the memverse engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid {kind}: {reason}")]
    InvalidRecord { kind: EntityKind, reason: String },

    #[error("malformed cutoff '{0}': expected YYYY-MM-DD")]
    MalformedCutoff(String),

    // Merge errors
    #[error("collection name already in use: {0}")]
    DuplicateName(String),

    #[error("{kind} '{id}' references missing {target} '{target_id}'")]
    DanglingReference {
        kind: EntityKind,
        id: String,
        target: EntityKind,
        target_id: String,
    },
}

impl Error {
    pub(crate) fn invalid(kind: EntityKind, reason: impl Into<String>) -> Self {
        Error::InvalidRecord {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

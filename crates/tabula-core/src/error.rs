//! Error types and result aliases for Tabula.
//!
//! These are the shared errors for core primitives. Reconciliation-specific
//! failures (ownership violations, catalog store errors) are defined in
//! `tabula-reconciler`.

/// The result type used throughout Tabula core.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Invalid input was provided (configuration, environment variables).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lease provider operation failed.
    ///
    /// Note that failing to acquire a held lease is not an error; providers
    /// signal that case with `Ok(None)`.
    #[error("lease error: {message}")]
    Lease {
        /// Description of the lease failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new lease error with the given message.
    #[must_use]
    pub fn lease(message: impl Into<String>) -> Self {
        Self::Lease {
            message: message.into(),
        }
    }

    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

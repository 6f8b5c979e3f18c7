//! Error types for reconciliation operations.

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that can occur during a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The live store's permission model refused a metadata update because
    /// the acting principal does not own the relation.
    ///
    /// Recovered per-entry during the rename phase; never aborts a pass.
    #[error("ownership violation on '{table}': {message}")]
    OwnershipViolation {
        /// The table whose rename was refused.
        table: String,
        /// Description from the underlying store.
        message: String,
    },

    /// A catalog store mutation or read failed.
    #[error("catalog store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Schema introspection against the live store failed.
    #[error("schema introspection error: {message}")]
    Introspection {
        /// Description of the introspection failure.
        message: String,
    },

    /// The lease provider failed (distinct from the lease being held,
    /// which is a silent no-op).
    #[error("lease error: {message}")]
    Lease {
        /// Description of the lease failure.
        message: String,
    },
}

impl ReconcileError {
    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new introspection error with the given message.
    #[must_use]
    pub fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection {
            message: message.into(),
        }
    }

    /// Returns true when this error is a recoverable ownership violation.
    #[must_use]
    pub fn is_ownership_violation(&self) -> bool {
        matches!(self, Self::OwnershipViolation { .. })
    }
}

impl From<tabula_core::Error> for ReconcileError {
    fn from(err: tabula_core::Error) -> Self {
        Self::Lease {
            message: err.to_string(),
        }
    }
}

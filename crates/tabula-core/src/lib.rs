//! # tabula-core
//!
//! Core abstractions shared across Tabula components.
//!
//! Tabula keeps a tenant-scoped metadata catalog consistent with the live
//! schema of an external relational database that can change out-of-band.
//! This crate provides the foundational types used by the reconciliation
//! engine and any future components:
//!
//! - **Tenant Context**: Validated tenant identifiers and role derivation
//! - **Identifiers**: The opaque stable identifier assigned by the live store
//! - **Leases**: Time-bounded distributed mutual exclusion, provider-agnostic
//! - **Error Types**: Shared error definitions and result types
//! - **Observability**: Structured logging bootstrap and span helpers
//!
//! ## Crate Boundary
//!
//! `tabula-core` is the only crate allowed to define shared primitives.
//! Collaborator interfaces specific to reconciliation live in
//! `tabula-reconciler`.
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::prelude::*;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! assert_eq!(tenant.database_role(), "tenant_acme_corp");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod lease;
pub mod observability;
pub mod tenant;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use tabula_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::TableId;
    pub use crate::lease::{Lease, LeaseInfo, LeaseProvider, MemoryLeaseProvider};
    pub use crate::tenant::TenantId;
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::TableId;
pub use lease::{Lease, LeaseInfo, LeaseProvider, MemoryLeaseProvider, DEFAULT_LEASE_TTL};
pub use observability::{init_logging, LogFormat};
pub use tenant::TenantId;

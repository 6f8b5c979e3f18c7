//! # tabula-reconciler
//!
//! Background reconciliation keeping a tenant-scoped metadata catalog
//! consistent with the live schema of an external relational database that
//! can change out-of-band ("ghost tables").
//!
//! The engine runs one pass per invocation, guarded by a tenant lease:
//!
//! - **Rename detection**: catalog entries follow live tables renamed
//!   underneath them, matched by stable identifier.
//! - **Deletion detection**: catalog entries whose live table is gone are
//!   dropped, unless their name is an active sync target.
//! - **Creation detection**: catalog-worthy live tables (full required
//!   column set plus the row-quota trigger, owned by the tenant role) are
//!   auto-registered.
//!
//! Persistence is abstracted behind the [`store`] traits; nothing in this
//! crate embeds a persistence framework. Scheduling is external: an
//! invoker calls [`Reconciler::run`] periodically or on demand and reacts
//! to the returned [`RunOutcome`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use tabula_reconciler::prelude::*;
//!
//! let reconciler = Reconciler::new(leases, catalog, introspector, config);
//! match reconciler.run(&tenant).await? {
//!     RunOutcome::Skipped => {} // lease held elsewhere, try again later
//!     RunOutcome::Completed(report) => {
//!         tracing::info!(changed = report.has_changes(), "pass done");
//!     }
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod store;
pub mod telemetry;

// Re-export main types at crate root
pub use classifier::WorthinessRule;
pub use config::ReconcilerConfig;
pub use engine::{drift_detected, ReconcileReport, Reconciler, RunOutcome};
pub use error::{ReconcileError, Result};
pub use model::{CatalogEntry, LiveTable, TableSchema};
pub use store::{CatalogStore, SchemaIntrospector};
pub use telemetry::{LogSink, NullSink, TelemetrySink};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::classifier::WorthinessRule;
    pub use crate::config::ReconcilerConfig;
    pub use crate::engine::{ReconcileReport, Reconciler, RunOutcome};
    pub use crate::error::{ReconcileError, Result};
    pub use crate::model::{CatalogEntry, LiveTable, TableSchema};
    pub use crate::store::{CatalogStore, SchemaIntrospector};
    pub use crate::telemetry::TelemetrySink;
}

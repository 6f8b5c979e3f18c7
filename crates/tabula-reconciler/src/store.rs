//! Collaborator interfaces for the reconciliation engine.
//!
//! The engine never touches persistence frameworks directly: the catalog's
//! storage and the live store's schema catalog sit behind these traits, so
//! any backend (relational, object storage, in-memory) can be plugged in.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tabula_core::{TableId, TenantId};

use crate::error::Result;
use crate::model::{CatalogEntry, LiveTable};

/// Read access to the live store's schema catalog.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync + 'static {
    /// Reports the live set of tables for a tenant (stable identifier plus
    /// current name and owner).
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the pass.
    async fn list_live_tables(&self, tenant: &TenantId) -> Result<Vec<LiveTable>>;

    /// Reports the names of live tables satisfying the catalog-worthiness
    /// predicate, excluding tables already known to the catalog by name and
    /// restricted to tables owned by the tenant's role.
    ///
    /// Implementations evaluate the predicate server-side with a
    /// parameterized set query; see
    /// [`WorthinessRule::schema_query`](crate::classifier::WorthinessRule::schema_query).
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the pass.
    async fn list_catalog_worthy_tables(
        &self,
        tenant: &TenantId,
        excluded_names: &BTreeSet<String>,
    ) -> Result<Vec<String>>;
}

/// Read and mutation access to the tenant catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Lists the catalog entries for a tenant.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the pass.
    async fn list_entries(&self, tenant: &TenantId) -> Result<Vec<CatalogEntry>>;

    /// Lists the names currently excluded from deletion: tables that are
    /// active targets of an out-of-band sync job and must survive even when
    /// they appear orphaned.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the pass.
    async fn list_excluded_names(&self, tenant: &TenantId) -> Result<BTreeSet<String>>;

    /// Renames a catalog entry to the live table's current name.
    ///
    /// # Errors
    ///
    /// May fail with [`ReconcileError::OwnershipViolation`] when the acting
    /// principal does not own the relation; the engine recovers from that
    /// per-entry. Any other error aborts the rename phase.
    ///
    /// [`ReconcileError::OwnershipViolation`]: crate::error::ReconcileError::OwnershipViolation
    async fn rename(&self, tenant: &TenantId, entry: &CatalogEntry, new_name: &str) -> Result<()>;

    /// Deletes a catalog entry (the record only, never the live table).
    ///
    /// # Errors
    ///
    /// Returns a store error on failure; the engine isolates failures
    /// per-entry.
    async fn delete(&self, tenant: &TenantId, entry: &CatalogEntry) -> Result<()>;

    /// Creates a catalog entry for a newly observed live table, copying its
    /// stable identifier.
    ///
    /// # Errors
    ///
    /// Returns a store error on failure; the engine isolates failures
    /// per-entry.
    async fn create(&self, tenant: &TenantId, name: &str, id: TableId) -> Result<()>;
}

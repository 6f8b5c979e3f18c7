//! In-memory collaborators for tests and local development.
//!
//! `MemoryCatalog` and `MemoryIntrospector` implement the collaborator
//! traits over mutex-guarded maps. Both record their reads and mutations
//! and support injecting per-entry failures, so tests can verify the
//! engine's isolation and no-op guarantees. Not suitable for production.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tabula_core::{TableId, TenantId};

use crate::classifier::WorthinessRule;
use crate::error::{ReconcileError, Result};
use crate::model::{CatalogEntry, LiveTable, TableSchema};
use crate::store::{CatalogStore, SchemaIntrospector};

/// A catalog mutation recorded by [`MemoryCatalog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// An entry was renamed.
    Renamed {
        /// Previous catalog name.
        from: String,
        /// New catalog name.
        to: String,
    },
    /// An entry was deleted.
    Deleted {
        /// Name of the deleted entry.
        name: String,
    },
    /// An entry was created.
    Created {
        /// Name of the created entry.
        name: String,
        /// Stable identifier copied from the live table.
        id: TableId,
    },
}

/// In-memory catalog store with a mutation journal and failure injection.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<HashMap<String, Vec<CatalogEntry>>>,
    excluded: RwLock<HashMap<String, BTreeSet<String>>>,
    fail_rename_ownership: RwLock<HashSet<String>>,
    fail_rename_store: RwLock<HashSet<String>>,
    fail_delete: RwLock<HashSet<String>>,
    fail_create: RwLock<HashSet<String>>,
    fail_reads: AtomicBool,
    reads: AtomicUsize,
    journal: RwLock<Vec<Mutation>>,
}

impl MemoryCatalog {
    /// Creates a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an entry for a tenant.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn seed(&self, tenant: &TenantId, entry: CatalogEntry) {
        self.entries
            .write()
            .expect("catalog lock poisoned")
            .entry(tenant.as_str().to_string())
            .or_default()
            .push(entry);
    }

    /// Marks a name as an active out-of-band sync target, protecting it
    /// from deletion.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn exclude(&self, tenant: &TenantId, name: impl Into<String>) {
        self.excluded
            .write()
            .expect("catalog lock poisoned")
            .entry(tenant.as_str().to_string())
            .or_default()
            .insert(name.into());
    }

    /// Makes renames of the entry currently named `name` fail with an
    /// ownership violation.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_rename_with_ownership_violation(&self, name: impl Into<String>) {
        self.fail_rename_ownership
            .write()
            .expect("catalog lock poisoned")
            .insert(name.into());
    }

    /// Makes renames of the entry currently named `name` fail with a
    /// generic store error.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_rename_with_store_error(&self, name: impl Into<String>) {
        self.fail_rename_store
            .write()
            .expect("catalog lock poisoned")
            .insert(name.into());
    }

    /// Makes deletions of the entry named `name` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_delete(&self, name: impl Into<String>) {
        self.fail_delete
            .write()
            .expect("catalog lock poisoned")
            .insert(name.into());
    }

    /// Makes creations of the table named `name` fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_create(&self, name: impl Into<String>) {
        self.fail_create
            .write()
            .expect("catalog lock poisoned")
            .insert(name.into());
    }

    /// Makes all reads fail (simulates catalog outage).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Returns how many read calls this store has served or refused.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Returns a snapshot of the mutation journal.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn mutations(&self) -> Vec<Mutation> {
        self.journal.read().expect("catalog lock poisoned").clone()
    }

    /// Returns a snapshot of a tenant's entries.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn snapshot(&self, tenant: &TenantId) -> Vec<CatalogEntry> {
        self.entries
            .read()
            .expect("catalog lock poisoned")
            .get(tenant.as_str())
            .cloned()
            .unwrap_or_default()
    }

    fn check_reads(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ReconcileError::store("injected catalog read failure"));
        }
        Ok(())
    }

    fn contains<F>(set: &RwLock<HashSet<String>>, name: &str, map_err: F) -> Result<()>
    where
        F: FnOnce() -> ReconcileError,
    {
        let set = set
            .read()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?;
        if set.contains(name) {
            return Err(map_err());
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn list_entries(&self, tenant: &TenantId) -> Result<Vec<CatalogEntry>> {
        self.check_reads()?;
        Ok(self.snapshot(tenant))
    }

    async fn list_excluded_names(&self, tenant: &TenantId) -> Result<BTreeSet<String>> {
        self.check_reads()?;
        let excluded = self
            .excluded
            .read()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?;
        Ok(excluded.get(tenant.as_str()).cloned().unwrap_or_default())
    }

    async fn rename(&self, tenant: &TenantId, entry: &CatalogEntry, new_name: &str) -> Result<()> {
        Self::contains(&self.fail_rename_ownership, &entry.name, || {
            ReconcileError::OwnershipViolation {
                table: entry.name.clone(),
                message: "must be owner of relation".to_string(),
            }
        })?;
        Self::contains(&self.fail_rename_store, &entry.name, || {
            ReconcileError::store("injected rename failure")
        })?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?;
        let tenant_entries = entries
            .get_mut(tenant.as_str())
            .ok_or_else(|| ReconcileError::store("no entries for tenant"))?;
        let target = tenant_entries
            .iter_mut()
            .find(|e| e.id == entry.id && e.name == entry.name)
            .ok_or_else(|| ReconcileError::store(format!("no such entry '{}'", entry.name)))?;

        let from = std::mem::replace(&mut target.name, new_name.to_string());
        self.journal
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?
            .push(Mutation::Renamed {
                from,
                to: new_name.to_string(),
            });
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, entry: &CatalogEntry) -> Result<()> {
        Self::contains(&self.fail_delete, &entry.name, || {
            ReconcileError::store("injected delete failure")
        })?;

        let mut entries = self
            .entries
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?;
        let tenant_entries = entries
            .get_mut(tenant.as_str())
            .ok_or_else(|| ReconcileError::store("no entries for tenant"))?;
        let before = tenant_entries.len();
        tenant_entries.retain(|e| !(e.id == entry.id && e.name == entry.name));
        if tenant_entries.len() == before {
            return Err(ReconcileError::store(format!(
                "no such entry '{}'",
                entry.name
            )));
        }

        self.journal
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?
            .push(Mutation::Deleted {
                name: entry.name.clone(),
            });
        Ok(())
    }

    async fn create(&self, tenant: &TenantId, name: &str, id: TableId) -> Result<()> {
        Self::contains(&self.fail_create, name, || {
            ReconcileError::store("injected create failure")
        })?;

        self.entries
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?
            .entry(tenant.as_str().to_string())
            .or_default()
            .push(CatalogEntry::new(id, name));

        self.journal
            .write()
            .map_err(|_| ReconcileError::store("catalog lock poisoned"))?
            .push(Mutation::Created {
                name: name.to_string(),
                id,
            });
        Ok(())
    }
}

/// In-memory schema introspector evaluating the worthiness rule in-process.
#[derive(Debug)]
pub struct MemoryIntrospector {
    tables: RwLock<HashMap<String, Vec<(TableId, TableSchema)>>>,
    rule: WorthinessRule,
    fail_reads: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryIntrospector {
    /// Creates an introspector applying the given worthiness rule.
    #[must_use]
    pub fn new(rule: WorthinessRule) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            rule,
            fail_reads: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    /// Seeds a live table with its introspected shape.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn seed(&self, tenant: &TenantId, id: TableId, schema: TableSchema) {
        self.tables
            .write()
            .expect("introspector lock poisoned")
            .entry(tenant.as_str().to_string())
            .or_default()
            .push((id, schema));
    }

    /// Removes all live tables for a tenant.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear(&self, tenant: &TenantId) {
        self.tables
            .write()
            .expect("introspector lock poisoned")
            .remove(tenant.as_str());
    }

    /// Makes all reads fail (simulates live-store outage).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Returns how many read calls this introspector has served or refused.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_reads(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ReconcileError::introspection(
                "injected introspection failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl SchemaIntrospector for MemoryIntrospector {
    async fn list_live_tables(&self, tenant: &TenantId) -> Result<Vec<LiveTable>> {
        self.check_reads()?;
        let tables = self
            .tables
            .read()
            .map_err(|_| ReconcileError::introspection("introspector lock poisoned"))?;
        Ok(tables
            .get(tenant.as_str())
            .map(|seeded| {
                seeded
                    .iter()
                    .map(|(id, schema)| LiveTable::new(*id, &schema.name, &schema.owner))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn list_catalog_worthy_tables(
        &self,
        tenant: &TenantId,
        excluded_names: &BTreeSet<String>,
    ) -> Result<Vec<String>> {
        self.check_reads()?;
        let role = tenant.database_role();
        let tables = self
            .tables
            .read()
            .map_err(|_| ReconcileError::introspection("introspector lock poisoned"))?;
        Ok(tables
            .get(tenant.as_str())
            .map(|seeded| {
                seeded
                    .iter()
                    .filter(|(_, schema)| {
                        !excluded_names.contains(&schema.name)
                            && self.rule.is_worthy(schema, &role)
                    })
                    .map(|(_, schema)| schema.name.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

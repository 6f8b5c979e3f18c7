//! The ghost-table reconciliation engine.
//!
//! A pass keeps a tenant's catalog records consistent with the live schema
//! by running three detection phases under a tenant-scoped lease:
//!
//! 1. **Rename**: entries whose identifier is live under a different name
//!    are renamed to follow the live table.
//! 2. **Deletion**: entries whose identifier no longer exists live (or
//!    that never had one and match no live name) are dropped from the
//!    catalog, unless their name is an active sync target.
//! 3. **Creation**: catalog-worthy live tables unknown to the catalog are
//!    registered with their stable identifier.
//!
//! The engine only reconciles catalog records; it never creates or drops
//! tables in the live store. Exclusivity across passes, including passes in
//! other processes, comes solely from the lease: a pass that cannot acquire
//! it performs no reads or writes and returns [`RunOutcome::Skipped`].
//! Within a pass everything runs sequentially to completion.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use tabula_core::{LeaseProvider, TenantId};

use crate::config::ReconcilerConfig;
use crate::error::Result;
use crate::metrics;
use crate::model::{CatalogEntry, LiveTable};
use crate::store::{CatalogStore, SchemaIntrospector};
use crate::telemetry::{kinds, LogSink, TelemetrySink};

/// Outcome of invoking [`Reconciler::run`].
#[derive(Debug)]
pub enum RunOutcome {
    /// The tenant lease was held elsewhere; nothing was read or written.
    Skipped,

    /// A full pass ran to completion.
    Completed(ReconcileReport),
}

impl RunOutcome {
    /// Returns the pass report, if one was produced.
    #[must_use]
    pub fn report(&self) -> Option<&ReconcileReport> {
        match self {
            Self::Skipped => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Summary of one completed reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Tenant that was reconciled.
    pub tenant: String,

    /// When the pass started (after lease acquisition).
    pub started_at: DateTime<Utc>,

    /// When the pass finished.
    pub finished_at: DateTime<Utc>,

    /// Entries renamed to follow their live table.
    pub renamed: u64,

    /// Orphaned entries deleted.
    pub deleted: u64,

    /// Live tables registered.
    pub created: u64,

    /// Renames skipped on ownership violations.
    pub renames_skipped: u64,

    /// Deletions that failed and were isolated.
    pub delete_failures: u64,

    /// Creations that failed and were isolated.
    pub create_failures: u64,
}

impl ReconcileReport {
    fn new(tenant: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            tenant: tenant.to_string(),
            started_at,
            finished_at: started_at,
            renamed: 0,
            deleted: 0,
            created: 0,
            renames_skipped: 0,
            delete_failures: 0,
            create_failures: 0,
        }
    }

    /// Returns true if the pass mutated the catalog.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.renamed + self.deleted + self.created > 0
    }

    /// Returns the pass duration.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Returns whether the live and catalog name sets have drifted apart.
///
/// A cheap pre-check for schedulers: when this is false a full pass would
/// at most resolve identifier-level drift, so callers polling frequently
/// can use it to skip invocations.
#[must_use]
pub fn drift_detected(live: &[LiveTable], entries: &[CatalogEntry]) -> bool {
    let live_names: BTreeSet<&str> = live.iter().map(|t| t.name.as_str()).collect();
    let catalog_names: BTreeSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    live_names != catalog_names
}

/// The reconciliation orchestrator.
///
/// Holds the collaborators behind trait objects; construction wires a
/// tenant-agnostic engine that [`run`](Self::run) scopes per invocation.
pub struct Reconciler {
    leases: Arc<dyn LeaseProvider>,
    catalog: Arc<dyn CatalogStore>,
    introspector: Arc<dyn SchemaIntrospector>,
    telemetry: Arc<dyn TelemetrySink>,
    config: ReconcilerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler over the given collaborators.
    ///
    /// Telemetry defaults to [`LogSink`]; override with
    /// [`with_telemetry`](Self::with_telemetry).
    #[must_use]
    pub fn new(
        leases: Arc<dyn LeaseProvider>,
        catalog: Arc<dyn CatalogStore>,
        introspector: Arc<dyn SchemaIntrospector>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            leases,
            catalog,
            introspector,
            telemetry: Arc::new(LogSink),
            config,
        }
    }

    /// Replaces the telemetry sink.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Runs one reconciliation pass for a tenant.
    ///
    /// Acquires the tenant lease, runs the detection phases in order, and
    /// releases the lease (TTL expiry reclaims it if release fails). When
    /// the lease is already held the pass is a silent no-op.
    ///
    /// # Errors
    ///
    /// Returns an error when a read step fails, when a rename fails with
    /// anything other than an ownership violation, or on lease provider
    /// failure. Per-entry deletion and creation failures are isolated and
    /// reported, never returned.
    pub async fn run(&self, tenant: &TenantId) -> Result<RunOutcome> {
        let key = self.lease_key(tenant);
        let Some(lease) = self
            .leases
            .try_acquire(&key, self.config.lease_ttl())
            .await?
        else {
            metrics::record_lease_busy(tenant.as_str());
            tracing::debug!(tenant = %tenant, "reconcile lease held elsewhere, skipping pass");
            return Ok(RunOutcome::Skipped);
        };

        let result = self.run_locked(tenant).await;

        if let Err(e) = self.leases.release(&lease).await {
            tracing::warn!(
                tenant = %tenant,
                error = %e,
                "failed to release reconcile lease; TTL expiry will reclaim it"
            );
        }

        result.map(RunOutcome::Completed)
    }

    fn lease_key(&self, tenant: &TenantId) -> String {
        format!("{}/tenant={tenant}", self.config.lease_key_prefix)
    }

    async fn run_locked(&self, tenant: &TenantId) -> Result<ReconcileReport> {
        let started = Utc::now();
        tracing::info!(tenant = %tenant, "starting reconciliation pass");

        let live = self.introspector.list_live_tables(tenant).await?;
        let entries = self.catalog.list_entries(tenant).await?;
        let mut report = ReconcileReport::new(tenant.as_str(), started);

        // An empty live store means there is nothing to reconcile forward;
        // only deletion proceeds.
        let renames = if live.is_empty() {
            HashMap::new()
        } else {
            self.link_renamed(tenant, &live, &entries, &mut report)
                .await?
        };

        let deleted = self
            .link_deleted(tenant, &live, &entries, &mut report)
            .await?;

        if !live.is_empty() {
            // Catalog names as they stand after the earlier phases, without
            // a second fetch: renames applied, deleted names removed.
            let mut known: BTreeSet<String> = entries.iter().map(|e| e.name.clone()).collect();
            for (old, new) in &renames {
                known.remove(old);
                known.insert(new.clone());
            }
            for name in &deleted {
                known.remove(name);
            }
            self.link_created(tenant, &live, &known, &mut report)
                .await?;
        }

        report.finished_at = Utc::now();
        #[allow(clippy::cast_precision_loss)]
        let duration_secs = report.duration().num_milliseconds() as f64 / 1000.0;
        metrics::record_pass(
            tenant.as_str(),
            report.renamed,
            report.deleted,
            report.created,
            duration_secs,
        );
        tracing::info!(
            tenant = %tenant,
            renamed = report.renamed,
            deleted = report.deleted,
            created = report.created,
            renames_skipped = report.renames_skipped,
            delete_failures = report.delete_failures,
            create_failures = report.create_failures,
            "reconciliation pass complete"
        );

        Ok(report)
    }

    /// Rename detection: catalog entries whose identifier is live under a
    /// different name follow the live table. Returns the applied renames
    /// (old name to new name).
    async fn link_renamed(
        &self,
        tenant: &TenantId,
        live: &[LiveTable],
        entries: &[CatalogEntry],
        report: &mut ReconcileReport,
    ) -> Result<HashMap<String, String>> {
        let live_names: HashSet<&str> = live.iter().map(|t| t.name.as_str()).collect();
        let mut by_id: HashMap<_, Vec<&LiveTable>> = HashMap::new();
        for table in live {
            by_id.entry(table.id).or_default().push(table);
        }

        let mut renames = HashMap::new();
        for entry in entries {
            let Some(id) = entry.id else { continue };
            if live_names.contains(entry.name.as_str()) {
                continue;
            }
            // The identifier must match exactly one live table.
            let Some([target]) = by_id.get(&id).map(Vec::as_slice) else {
                continue;
            };

            match self.catalog.rename(tenant, entry, &target.name).await {
                Ok(()) => {
                    report.renamed += 1;
                    renames.insert(entry.name.clone(), target.name.clone());
                    self.telemetry.report(
                        kinds::RENAME,
                        json!({
                            "tenant": tenant.as_str(),
                            "table": target.name,
                            "previous": entry.name,
                        }),
                    );
                    tracing::info!(
                        tenant = %tenant,
                        from = %entry.name,
                        to = %target.name,
                        "relinked renamed table"
                    );
                }
                Err(e) if e.is_ownership_violation() => {
                    report.renames_skipped += 1;
                    metrics::record_phase_error("rename");
                    tracing::warn!(
                        tenant = %tenant,
                        table = %entry.name,
                        error = %e,
                        "rename refused by live-store permissions, skipping entry"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(renames)
    }

    /// Deletion detection: drops catalog entries whose live table is gone.
    ///
    /// Two sub-cases, applied additively: entries with an identifier no
    /// longer present live, and entries that never had an identifier and
    /// match no live name. Names on the exclusion list survive both.
    /// Mutation failures are isolated per entry; failing to fetch the
    /// exclusion list is a read failure and aborts the pass (deleting
    /// without it would race the out-of-band syncs). Returns the deleted
    /// names.
    async fn link_deleted(
        &self,
        tenant: &TenantId,
        live: &[LiveTable],
        entries: &[CatalogEntry],
        report: &mut ReconcileReport,
    ) -> Result<HashSet<String>> {
        let mut deleted = HashSet::new();

        let excluded = self.catalog.list_excluded_names(tenant).await?;

        let live_ids: HashSet<_> = live.iter().map(|t| t.id).collect();
        let live_names: HashSet<&str> = live.iter().map(|t| t.name.as_str()).collect();

        for entry in entries {
            let orphaned = match entry.id {
                Some(id) => !live_ids.contains(&id),
                None => !live_names.contains(entry.name.as_str()),
            };
            if !orphaned || excluded.contains(&entry.name) {
                continue;
            }

            match self.catalog.delete(tenant, entry).await {
                Ok(()) => {
                    report.deleted += 1;
                    deleted.insert(entry.name.clone());
                    self.telemetry.report(
                        kinds::DROP,
                        json!({
                            "tenant": tenant.as_str(),
                            "table": entry.name,
                        }),
                    );
                    tracing::info!(tenant = %tenant, table = %entry.name, "dropped orphaned entry");
                }
                Err(e) => {
                    report.delete_failures += 1;
                    metrics::record_phase_error("delete");
                    self.telemetry.report(
                        kinds::PHASE_ERROR,
                        json!({
                            "tenant": tenant.as_str(),
                            "phase": "delete",
                            "table": entry.name,
                            "error": e.to_string(),
                        }),
                    );
                    tracing::error!(
                        tenant = %tenant,
                        table = %entry.name,
                        error = %e,
                        "failed to drop orphaned entry, continuing"
                    );
                }
            }
        }

        Ok(deleted)
    }

    /// Creation detection: registers catalog-worthy live tables that the
    /// catalog does not know by name. Failures are isolated per entry and
    /// routed to telemetry.
    async fn link_created(
        &self,
        tenant: &TenantId,
        live: &[LiveTable],
        known_names: &BTreeSet<String>,
        report: &mut ReconcileReport,
    ) -> Result<()> {
        let worthy: HashSet<String> = self
            .introspector
            .list_catalog_worthy_tables(tenant, known_names)
            .await?
            .into_iter()
            .collect();

        for table in live {
            if known_names.contains(&table.name) || !worthy.contains(&table.name) {
                continue;
            }

            match self.catalog.create(tenant, &table.name, table.id).await {
                Ok(()) => {
                    report.created += 1;
                    self.telemetry.report(
                        kinds::REGISTER,
                        json!({
                            "tenant": tenant.as_str(),
                            "table": table.name,
                            "id": table.id,
                        }),
                    );
                    tracing::info!(tenant = %tenant, table = %table.name, "registered live table");
                }
                Err(e) => {
                    report.create_failures += 1;
                    metrics::record_phase_error("create");
                    self.telemetry.report(
                        kinds::PHASE_ERROR,
                        json!({
                            "tenant": tenant.as_str(),
                            "phase": "create",
                            "table": table.name,
                            "error": e.to_string(),
                        }),
                    );
                    tracing::error!(
                        tenant = %tenant,
                        table = %table.name,
                        error = %e,
                        "failed to register live table, continuing"
                    );
                }
            }
        }

        Ok(())
    }
}

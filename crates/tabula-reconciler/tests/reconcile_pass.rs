//! End-to-end reconciliation pass tests over the in-memory collaborators.
//!
//! Each test seeds a live/catalog snapshot, runs a pass, and checks the
//! resulting catalog state plus the pass report. Covered here:
//!
//! - Rename, deletion, and creation detection, each in isolation
//! - Exclusion-list protection for out-of-band sync targets
//! - Null-identifier cleanup
//! - Lease-based exclusion (zero reads, zero writes when busy)
//! - Empty live set (deletion still proceeds, nothing else does)
//! - Idempotence across consecutive passes

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use tabula_core::{LeaseProvider, MemoryLeaseProvider, TableId, TenantId};
use tabula_reconciler::memory::{MemoryCatalog, MemoryIntrospector};
use tabula_reconciler::{
    CatalogEntry, ReconcileReport, Reconciler, ReconcilerConfig, RunOutcome, TableSchema,
    WorthinessRule,
};

struct Harness {
    leases: Arc<MemoryLeaseProvider>,
    catalog: Arc<MemoryCatalog>,
    introspector: Arc<MemoryIntrospector>,
    reconciler: Reconciler,
    tenant: TenantId,
}

fn harness() -> Harness {
    let leases = Arc::new(MemoryLeaseProvider::new());
    let catalog = Arc::new(MemoryCatalog::new());
    let introspector = Arc::new(MemoryIntrospector::new(WorthinessRule::default()));
    let reconciler = Reconciler::new(
        leases.clone(),
        catalog.clone(),
        introspector.clone(),
        ReconcilerConfig::default(),
    );

    Harness {
        leases,
        catalog,
        introspector,
        reconciler,
        tenant: TenantId::new("acme").unwrap(),
    }
}

/// A live table shape satisfying the default worthiness rule.
fn worthy_schema(name: &str) -> TableSchema {
    TableSchema::new(
        name,
        "tenant_acme",
        ["record_id", "geom", "geom_webmercator"],
        ["enforce_row_quota"],
    )
}

/// A live table shape that exists but is not catalog-worthy.
fn bare_schema(name: &str) -> TableSchema {
    TableSchema::new(name, "tenant_acme", ["record_id"], Vec::<String>::new())
}

async fn run_completed(h: &Harness) -> ReconcileReport {
    match h.reconciler.run(&h.tenant).await.expect("pass") {
        RunOutcome::Completed(report) => report,
        RunOutcome::Skipped => panic!("pass unexpectedly skipped"),
    }
}

#[tokio::test]
async fn rename_follows_live_table() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "foo"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("bar"));

    let report = run_completed(&h).await;

    assert_eq!(report.renamed, 1);
    assert_eq!(
        h.catalog.snapshot(&h.tenant),
        vec![CatalogEntry::new(TableId::new(1), "bar")]
    );
}

#[tokio::test]
async fn deletion_by_missing_identifier() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "b"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));

    let report = run_completed(&h).await;

    assert_eq!(report.deleted, 1);
    assert_eq!(
        h.catalog.snapshot(&h.tenant),
        vec![CatalogEntry::new(TableId::new(1), "a")]
    );
}

#[tokio::test]
async fn exclusion_protects_sync_targets_from_deletion() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "b"));
    h.catalog.exclude(&h.tenant, "b");
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));

    let report = run_completed(&h).await;

    assert_eq!(report.deleted, 0);
    assert_eq!(h.catalog.snapshot(&h.tenant).len(), 2);
}

#[tokio::test]
async fn null_identifier_entries_are_cleaned_up() {
    let h = harness();
    h.catalog.seed(&h.tenant, CatalogEntry::unlinked("ghost"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "gone"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));

    let report = run_completed(&h).await;

    assert_eq!(report.deleted, 2);
    assert_eq!(
        h.catalog.snapshot(&h.tenant),
        vec![CatalogEntry::new(TableId::new(1), "a")]
    );
}

#[tokio::test]
async fn null_identifier_cleanup_runs_without_other_orphans() {
    // Unlike the identifier-based sub-case in some older systems, cleanup
    // of unlinked entries does not require other orphans to exist.
    let h = harness();
    h.catalog.seed(&h.tenant, CatalogEntry::unlinked("ghost"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));

    let report = run_completed(&h).await;

    assert_eq!(report.deleted, 1);
    assert_eq!(h.catalog.snapshot(&h.tenant).len(), 1);
}

#[tokio::test]
async fn null_identifier_entry_with_live_name_survives() {
    let h = harness();
    h.catalog.seed(&h.tenant, CatalogEntry::unlinked("pending"));
    h.introspector
        .seed(&h.tenant, TableId::new(5), bare_schema("pending"));

    let report = run_completed(&h).await;

    assert_eq!(report.deleted, 0);
    assert_eq!(h.catalog.snapshot(&h.tenant).len(), 1);
}

#[tokio::test]
async fn worthy_live_table_is_registered() {
    let h = harness();
    h.introspector
        .seed(&h.tenant, TableId::new(7), worthy_schema("new_t"));

    let report = run_completed(&h).await;

    assert_eq!(report.created, 1);
    assert_eq!(
        h.catalog.snapshot(&h.tenant),
        vec![CatalogEntry::new(TableId::new(7), "new_t")]
    );
}

#[tokio::test]
async fn table_missing_a_required_column_is_never_registered() {
    let h = harness();
    let mut almost = worthy_schema("almost_t");
    almost.columns.remove("geom");
    h.introspector.seed(&h.tenant, TableId::new(8), almost);

    let report = run_completed(&h).await;

    assert_eq!(report.created, 0);
    assert!(h.catalog.snapshot(&h.tenant).is_empty());
}

#[tokio::test]
async fn held_lease_skips_pass_without_reads_or_writes() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "stale"));

    // Hold the tenant lease, as a concurrent pass would.
    let _held = h
        .leases
        .try_acquire("locks/ghost-tables/tenant=acme", Duration::from_secs(30))
        .await
        .expect("acquire")
        .expect("lease granted");

    let outcome = h.reconciler.run(&h.tenant).await.expect("run");

    assert!(matches!(outcome, RunOutcome::Skipped));
    assert_eq!(h.catalog.read_count(), 0);
    assert_eq!(h.introspector.read_count(), 0);
    assert!(h.catalog.mutations().is_empty());
    assert_eq!(h.catalog.snapshot(&h.tenant).len(), 1);
}

#[tokio::test]
async fn empty_live_set_still_deletes_orphans() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.catalog.seed(&h.tenant, CatalogEntry::unlinked("ghost"));

    let report = run_completed(&h).await;

    assert_eq!(report.renamed, 0);
    assert_eq!(report.created, 0);
    assert_eq!(report.deleted, 2);
    assert!(h.catalog.snapshot(&h.tenant).is_empty());

    // The worthiness query is never issued on an empty live set; only the
    // live-table listing hits the introspector.
    assert_eq!(h.introspector.read_count(), 1);
}

#[tokio::test]
async fn second_pass_over_settled_state_is_a_no_op() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "foo"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "stale"));
    h.catalog.seed(&h.tenant, CatalogEntry::unlinked("ghost"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("bar"));
    h.introspector
        .seed(&h.tenant, TableId::new(7), worthy_schema("new_t"));

    let first = run_completed(&h).await;
    assert!(first.has_changes());
    assert_eq!(first.renamed, 1);
    assert_eq!(first.deleted, 2);
    assert_eq!(first.created, 1);

    let mutations_after_first = h.catalog.mutations().len();
    let state_after_first = h.catalog.snapshot(&h.tenant);

    let second = run_completed(&h).await;
    assert!(!second.has_changes());
    assert_eq!(h.catalog.mutations().len(), mutations_after_first);
    assert_eq!(h.catalog.snapshot(&h.tenant), state_after_first);
}

//! Failure-handling tests: which errors abort a pass, which are isolated
//! per entry, and how failures are surfaced through telemetry. The lease
//! must be released on every exit path.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::{Arc, Mutex};

use serde_json::Value;
use tabula_core::{MemoryLeaseProvider, TableId, TenantId};
use tabula_reconciler::memory::{MemoryCatalog, MemoryIntrospector};
use tabula_reconciler::telemetry::kinds;
use tabula_reconciler::{
    CatalogEntry, Reconciler, ReconcilerConfig, RunOutcome, TableSchema, TelemetrySink,
    WorthinessRule,
};

/// Telemetry sink that records every event for later assertions.
#[derive(Debug, Default)]
struct CapturingSink {
    events: Mutex<Vec<(String, Value)>>,
}

impl CapturingSink {
    fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().unwrap().clone()
    }
}

impl TelemetrySink for CapturingSink {
    fn report(&self, kind: &str, payload: Value) {
        self.events.lock().unwrap().push((kind.to_string(), payload));
    }
}

struct Harness {
    catalog: Arc<MemoryCatalog>,
    introspector: Arc<MemoryIntrospector>,
    telemetry: Arc<CapturingSink>,
    reconciler: Reconciler,
    tenant: TenantId,
}

fn harness() -> Harness {
    let leases = Arc::new(MemoryLeaseProvider::new());
    let catalog = Arc::new(MemoryCatalog::new());
    let introspector = Arc::new(MemoryIntrospector::new(WorthinessRule::default()));
    let telemetry = Arc::new(CapturingSink::default());
    let reconciler = Reconciler::new(
        leases,
        catalog.clone(),
        introspector.clone(),
        ReconcilerConfig::default(),
    )
    .with_telemetry(telemetry.clone());

    Harness {
        catalog,
        introspector,
        telemetry,
        reconciler,
        tenant: TenantId::new("acme").unwrap(),
    }
}

fn worthy_schema(name: &str) -> TableSchema {
    TableSchema::new(
        name,
        "tenant_acme",
        ["record_id", "geom", "geom_webmercator"],
        ["enforce_row_quota"],
    )
}

fn bare_schema(name: &str) -> TableSchema {
    TableSchema::new(name, "tenant_acme", ["record_id"], Vec::<String>::new())
}

#[tokio::test]
async fn ownership_violation_skips_entry_and_continues() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "foo"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "baz"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("bar"));
    h.introspector
        .seed(&h.tenant, TableId::new(2), bare_schema("qux"));
    h.catalog.fail_rename_with_ownership_violation("foo");

    let outcome = h.reconciler.run(&h.tenant).await.expect("pass survives");
    let report = outcome.report().expect("completed");

    assert_eq!(report.renamed, 1);
    assert_eq!(report.renames_skipped, 1);

    let names: Vec<_> = h
        .catalog
        .snapshot(&h.tenant)
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"foo".to_string()));
    assert!(names.contains(&"qux".to_string()));
}

#[tokio::test]
async fn generic_rename_error_aborts_pass_but_releases_lease() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "foo"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("bar"));
    h.catalog.fail_rename_with_store_error("foo");

    h.reconciler
        .run(&h.tenant)
        .await
        .expect_err("store error propagates");

    // The second run re-acquires the lease and hits the same error. A
    // leaked lease would have produced Ok(Skipped) instead.
    h.reconciler
        .run(&h.tenant)
        .await
        .expect_err("lease was released, error repeats");
}

#[tokio::test]
async fn delete_failure_is_isolated_per_entry() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(2), "b"));
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(3), "c"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));
    h.catalog.fail_delete("b");

    let outcome = h.reconciler.run(&h.tenant).await.expect("pass survives");
    let report = outcome.report().expect("completed");

    assert_eq!(report.deleted, 1);
    assert_eq!(report.delete_failures, 1);

    let names: Vec<_> = h
        .catalog
        .snapshot(&h.tenant)
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn create_failure_is_isolated_and_reported() {
    let h = harness();
    h.introspector
        .seed(&h.tenant, TableId::new(1), worthy_schema("t1"));
    h.introspector
        .seed(&h.tenant, TableId::new(2), worthy_schema("t2"));
    h.catalog.fail_create("t1");

    let outcome = h.reconciler.run(&h.tenant).await.expect("pass survives");
    let report = outcome.report().expect("completed");

    assert_eq!(report.created, 1);
    assert_eq!(report.create_failures, 1);
    assert_eq!(h.catalog.snapshot(&h.tenant).len(), 1);

    let events = h.telemetry.events();
    assert!(events.iter().any(|(kind, payload)| {
        kind == kinds::PHASE_ERROR
            && payload["phase"] == "create"
            && payload["table"] == "t1"
    }));
    assert!(events
        .iter()
        .any(|(kind, payload)| kind == kinds::REGISTER && payload["table"] == "t2"));
}

#[tokio::test]
async fn read_failure_aborts_pass_and_releases_lease() {
    let h = harness();
    h.catalog
        .seed(&h.tenant, CatalogEntry::new(TableId::new(1), "a"));
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));
    h.introspector.fail_reads(true);

    h.reconciler
        .run(&h.tenant)
        .await
        .expect_err("read failure is fatal");
    assert!(h.catalog.mutations().is_empty());

    // Once the live store recovers, the next run proceeds: the lease from
    // the failed pass did not leak.
    h.introspector.fail_reads(false);
    let outcome = h.reconciler.run(&h.tenant).await.expect("recovered");
    assert!(matches!(outcome, RunOutcome::Completed(_)));
}

#[tokio::test]
async fn catalog_read_failure_is_fatal() {
    let h = harness();
    h.introspector
        .seed(&h.tenant, TableId::new(1), bare_schema("a"));
    h.catalog.fail_reads(true);

    h.reconciler
        .run(&h.tenant)
        .await
        .expect_err("catalog outage is fatal");
    assert!(h.catalog.mutations().is_empty());
}

//! Reconciliation metrics.
//!
//! Counters and histograms for pass outcomes. These complement the
//! structured logging and telemetry events; they carry aggregates only.

use metrics::{counter, describe_counter, describe_histogram, histogram};

/// Catalog entries renamed to follow their live table.
pub const TABLES_RENAMED: &str = "tabula_tables_renamed_total";

/// Orphaned catalog entries deleted.
pub const TABLES_DELETED: &str = "tabula_tables_deleted_total";

/// Live tables registered in the catalog.
pub const TABLES_CREATED: &str = "tabula_tables_created_total";

/// Per-entry failures isolated during a phase.
pub const PHASE_ERRORS: &str = "tabula_phase_errors_total";

/// Passes skipped because the tenant lease was held.
pub const LEASE_BUSY: &str = "tabula_lease_busy_total";

/// Duration of completed passes in seconds.
pub const PASS_DURATION: &str = "tabula_reconcile_duration_seconds";

/// Registers all reconciler metric descriptions.
///
/// Call once at application startup after installing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(TABLES_RENAMED, "Catalog entries renamed to follow live tables");
    describe_counter!(TABLES_DELETED, "Orphaned catalog entries deleted");
    describe_counter!(TABLES_CREATED, "Live tables registered in the catalog");
    describe_counter!(PHASE_ERRORS, "Per-entry failures isolated during a phase");
    describe_counter!(LEASE_BUSY, "Passes skipped because the tenant lease was held");
    describe_histogram!(PASS_DURATION, "Duration of completed passes in seconds");
}

/// Records the aggregate outcome of one completed pass.
pub fn record_pass(tenant: &str, renamed: u64, deleted: u64, created: u64, duration_secs: f64) {
    let labels = [("tenant", tenant.to_string())];

    counter!(TABLES_RENAMED, &labels).increment(renamed);
    counter!(TABLES_DELETED, &labels).increment(deleted);
    counter!(TABLES_CREATED, &labels).increment(created);
    histogram!(PASS_DURATION, &labels).record(duration_secs);
}

/// Records one isolated per-entry failure.
pub fn record_phase_error(phase: &str) {
    counter!(PHASE_ERRORS, "phase" => phase.to_string()).increment(1);
}

/// Records a pass skipped on lease contention.
pub fn record_lease_busy(tenant: &str) {
    counter!(LEASE_BUSY, "tenant" => tenant.to_string()).increment(1);
}

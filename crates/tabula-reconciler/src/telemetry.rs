//! Telemetry sink for reconciliation outcomes.
//!
//! The engine reports every catalog mutation (and every isolated per-entry
//! failure) through a [`TelemetrySink`]. The contract is fire-and-forget:
//! implementations must never fail or block the reconciliation pass.

use serde_json::Value;

/// Well-known event kinds emitted by the engine.
pub mod kinds {
    /// A catalog entry was renamed to follow its live table.
    pub const RENAME: &str = "rename";

    /// An orphaned catalog entry was dropped.
    pub const DROP: &str = "drop";

    /// A catalog-worthy live table was registered.
    pub const REGISTER: &str = "register";

    /// A per-entry failure was isolated and skipped.
    pub const PHASE_ERROR: &str = "phase_error";
}

/// A fire-and-forget sink for reconciliation events.
///
/// Implementations must be infallible and non-blocking from the caller's
/// perspective; buffering or dropping under pressure is the sink's problem,
/// not the engine's.
pub trait TelemetrySink: Send + Sync + 'static {
    /// Reports a single event with a structured payload.
    fn report(&self, kind: &str, payload: Value);
}

/// A sink that routes events to structured logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn report(&self, kind: &str, payload: Value) {
        tracing::debug!(kind, %payload, "reconcile event");
    }
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn report(&self, _kind: &str, _payload: Value) {}
}

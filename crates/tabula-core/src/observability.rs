//! Observability infrastructure for Tabula.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors used across components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `tabula_reconciler=debug`)
///
/// # Example
///
/// ```rust
/// use tabula_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for reconciliation operations with standard fields.
///
/// # Example
///
/// ```rust
/// use tabula_core::observability::reconcile_span;
///
/// let span = reconcile_span("run", "acme-corp");
/// let _guard = span.enter();
/// // ... do reconciliation work
/// ```
#[must_use]
pub fn reconcile_span(operation: &str, tenant: &str) -> Span {
    tracing::info_span!("reconcile", op = operation, tenant = tenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_reentrant() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn span_helper_creates_span() {
        let span = reconcile_span("run", "acme");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }
}

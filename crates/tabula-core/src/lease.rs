//! Lease-based distributed mutual exclusion.
//!
//! A lease is a time-bounded exclusion token keyed by an arbitrary string
//! (in practice, a tenant-scoped key). The provider behind the
//! [`LeaseProvider`] trait can be any store with expiry semantics: a
//! consensus-backed service, a key-value store with TTLs, or the in-process
//! [`MemoryLeaseProvider`] for tests and single-node deployments.
//!
//! # Semantics
//!
//! - `try_acquire` is a single attempt: it returns `Ok(None)` when the
//!   lease is held by someone else. No retry or backoff is performed here;
//!   callers that want another attempt schedule one later.
//! - A lease becomes invalid once its TTL elapses even if `release` is
//!   never called, bounding the blast radius of a crashed holder.
//! - An expired lease may be taken over by the next acquirer.
//! - `release` is idempotent and safe to call after expiry.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};

/// Default lease TTL (5 seconds).
///
/// Must comfortably exceed the worst-case duration of one reconciliation
/// pass; a pass that overruns its TTL loses exclusivity.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(5);

/// Lease contents, as persisted by providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    /// Unique lease holder ID.
    pub holder_id: String,

    /// When the lease was acquired.
    pub acquired_at: DateTime<Utc>,

    /// When the lease expires.
    pub expires_at: DateTime<Utc>,
}

impl LeaseInfo {
    /// Creates a new lease info with a fresh holder ID and the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            holder_id: Ulid::new().to_string(),
            acquired_at: now,
            expires_at: now
                + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(5)),
        }
    }

    /// Returns whether this lease has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns the remaining TTL, or zero if expired.
    #[must_use]
    pub fn remaining_ttl(&self) -> Duration {
        let remaining = self.expires_at - Utc::now();
        let millis = remaining.num_milliseconds();
        if millis <= 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
        }
    }
}

/// A held lease, returned by [`LeaseProvider::try_acquire`].
///
/// Pass it back to [`LeaseProvider::release`] when the critical section
/// ends; if the holder crashes first, TTL expiry releases it instead.
#[derive(Debug, Clone)]
pub struct Lease {
    /// The key this lease guards.
    pub key: String,

    /// Holder identity and expiry.
    pub info: LeaseInfo,
}

/// A provider of time-bounded exclusive leases.
#[async_trait]
pub trait LeaseProvider: Send + Sync + 'static {
    /// Attempts to acquire the lease for `key` with the given TTL.
    ///
    /// Returns `Ok(None)` when the lease is currently held and unexpired.
    /// An expired lease is taken over.
    ///
    /// # Errors
    ///
    /// Returns an error only on provider failure, never on contention.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<Lease>>;

    /// Releases a held lease.
    ///
    /// Idempotent: releasing an expired or already-released lease is a
    /// no-op. A lease taken over by another holder is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only on provider failure.
    async fn release(&self, lease: &Lease) -> Result<()>;
}

/// In-process lease provider backed by a mutex-guarded map.
///
/// Suitable for tests and single-node deployments. Cross-process
/// exclusivity requires an external provider.
#[derive(Debug, Default)]
pub struct MemoryLeaseProvider {
    leases: Mutex<HashMap<String, LeaseInfo>>,
}

impl MemoryLeaseProvider {
    /// Creates a new empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `key` is currently leased (and unexpired).
    ///
    /// # Errors
    ///
    /// Returns an error if the internal lock is poisoned.
    pub fn is_held(&self, key: &str) -> Result<bool> {
        let leases = self
            .leases
            .lock()
            .map_err(|_| Error::internal("lease map lock poisoned"))?;
        Ok(leases.get(key).is_some_and(|info| !info.is_expired()))
    }
}

#[async_trait]
impl LeaseProvider for MemoryLeaseProvider {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<Option<Lease>> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| Error::internal("lease map lock poisoned"))?;

        if let Some(existing) = leases.get(key) {
            if !existing.is_expired() {
                return Ok(None);
            }
        }

        let info = LeaseInfo::new(ttl);
        leases.insert(key.to_string(), info.clone());

        Ok(Some(Lease {
            key: key.to_string(),
            info,
        }))
    }

    async fn release(&self, lease: &Lease) -> Result<()> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|_| Error::internal("lease map lock poisoned"))?;

        // Only remove the entry if we still own it; a takeover after our
        // expiry must not be clobbered.
        if leases
            .get(&lease.key)
            .is_some_and(|info| info.holder_id == lease.info.holder_id)
        {
            leases.remove(&lease.key);
        }

        Ok(())
    }
}

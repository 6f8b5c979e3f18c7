//! Domain model for catalog reconciliation.
//!
//! All of these are recomputed fresh at the start of every pass; nothing
//! here is cached across passes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tabula_core::TableId;

/// A catalog record describing a tenant table.
///
/// Owned by the catalog store; the engine only reads entries and requests
/// mutations. The identifier is nullable: entries registered before the
/// live table materialized (or whose table was never introspected) carry
/// `None` and are matched by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stable live-store identifier, when known.
    pub id: Option<TableId>,

    /// Current catalog name of the table.
    pub name: String,
}

impl CatalogEntry {
    /// Creates an entry with a known identifier.
    #[must_use]
    pub fn new(id: TableId, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// Creates an entry with no identifier.
    #[must_use]
    pub fn unlinked(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

/// A table observed in the live store during introspection.
///
/// Ephemeral: recomputed each run, never persisted by this system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTable {
    /// Stable live-store identifier.
    pub id: TableId,

    /// Current name in the live store.
    pub name: String,

    /// Database role that owns the table.
    pub owner: String,
}

impl LiveTable {
    /// Creates a live table observation.
    #[must_use]
    pub fn new(id: TableId, name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: owner.into(),
        }
    }
}

/// The introspected shape of a live table, as seen by the classifier.
///
/// Only names are carried: the catalog-worthiness predicate is type-blind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,

    /// Owning database role.
    pub owner: String,

    /// Column names present on the table.
    pub columns: BTreeSet<String>,

    /// Trigger names attached to the table.
    pub triggers: BTreeSet<String>,
}

impl TableSchema {
    /// Creates a schema observation from iterators of column and trigger names.
    pub fn new<C, T>(
        name: impl Into<String>,
        owner: impl Into<String>,
        columns: C,
        triggers: T,
    ) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            name: name.into(),
            owner: owner.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            triggers: triggers.into_iter().map(Into::into).collect(),
        }
    }
}

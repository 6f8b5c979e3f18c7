//! Strongly-typed identifiers for Tabula entities.
//!
//! The live store assigns each table a stable numeric identifier that
//! survives renames (in PostgreSQL terms, the relation OID). Tabula treats
//! it as opaque: identifiers are never generated by this system, only
//! observed during introspection and copied into catalog entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The stable identifier of a live table, assigned by the live store.
///
/// Identity matching across renames relies entirely on this value: a
/// catalog entry and a live table describe the same relation iff their
/// identifiers are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(u64);

impl TableId {
    /// Wraps a raw identifier observed from the live store.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TableId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<u64>().map(Self).map_err(|e| Error::InvalidId {
            message: format!("invalid table ID '{s}': {e}"),
        })
    }
}

//! Multi-tenant isolation primitives.
//!
//! Every reconciliation pass is scoped to a single tenant:
//! - **Lease scope**: The mutual-exclusion lease is keyed per tenant
//! - **Catalog scope**: Catalog reads and mutations are tenant-filtered
//! - **Live-store scope**: Introspection is restricted to the tenant's
//!   designated database role
//!
//! # Example
//!
//! ```rust
//! use tabula_core::tenant::TenantId;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! assert_eq!(tenant.database_role(), "tenant_acme_corp");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// A unique identifier for a tenant.
///
/// Tenant IDs must be:
/// - Non-empty
/// - Lowercase alphanumeric with hyphens
/// - Between 3 and 63 characters (compatible with DNS/role naming)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a new tenant ID after validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant ID is invalid.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Creates a tenant ID without validation.
    ///
    /// The caller must ensure the ID is valid. This is intended for
    /// IDs that have already been validated (e.g., read back from storage).
    #[must_use]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the database role that owns this tenant's live tables.
    ///
    /// Live tables are only considered for auto-registration when owned by
    /// this role. Hyphens are mapped to underscores to stay within SQL
    /// identifier rules.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tabula_core::TenantId;
    ///
    /// let tenant = TenantId::new("acme-corp").unwrap();
    /// assert_eq!(tenant.database_role(), "tenant_acme_corp");
    /// ```
    #[must_use]
    pub fn database_role(&self) -> String {
        format!("tenant_{}", self.0.replace('-', "_"))
    }

    /// Returns the tenant ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validates a tenant ID string.
    fn validate(id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::InvalidId {
                message: "tenant ID cannot be empty".to_string(),
            });
        }

        if id.len() < 3 {
            return Err(Error::InvalidId {
                message: format!("tenant ID '{id}' is too short (minimum 3 characters)"),
            });
        }

        if id.len() > 63 {
            return Err(Error::InvalidId {
                message: format!("tenant ID '{id}' is too long (maximum 63 characters)"),
            });
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::InvalidId {
                message: format!(
                    "tenant ID '{id}' contains invalid characters (only lowercase letters, digits, and hyphens allowed)"
                ),
            });
        }

        if id.starts_with('-') || id.ends_with('-') {
            return Err(Error::InvalidId {
                message: format!("tenant ID '{id}' cannot start or end with a hyphen"),
            });
        }

        Ok(())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//! Catalog-worthiness classification.
//!
//! A live table is eligible for auto-registration iff it carries the full
//! required column set (a configured list plus one designated
//! geometry-support column), has the designated row-quota enforcement
//! trigger attached, and is owned by the tenant's database role. Column
//! types are not checked, only name presence.
//!
//! The predicate exists in two forms that must agree:
//! - [`WorthinessRule::is_worthy`], evaluated in-process against an
//!   introspected [`TableSchema`] (used by the in-memory introspector and
//!   by tests);
//! - [`WorthinessRule::schema_query`], a parameterized set-based query
//!   evaluated server-side against the live store's schema catalog.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::model::TableSchema;

/// The rule deciding whether a live table is catalog-worthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorthinessRule {
    /// Column names every catalog-worthy table must carry.
    pub required_columns: Vec<String>,

    /// The designated geometry-support column, required in addition to
    /// `required_columns`.
    pub geometry_column: String,

    /// Name of the row-quota enforcement trigger that must be attached.
    pub quota_trigger: String,
}

impl Default for WorthinessRule {
    fn default() -> Self {
        Self {
            required_columns: vec!["record_id".to_string(), "geom".to_string()],
            geometry_column: "geom_webmercator".to_string(),
            quota_trigger: "enforce_row_quota".to_string(),
        }
    }
}

impl WorthinessRule {
    /// Returns the full required column set, geometry column included.
    #[must_use]
    pub fn required_set(&self) -> BTreeSet<&str> {
        self.required_columns
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.geometry_column.as_str()))
            .collect()
    }

    /// Evaluates the predicate against an introspected table shape.
    #[must_use]
    pub fn is_worthy(&self, schema: &TableSchema, owner_role: &str) -> bool {
        schema.owner == owner_role
            && schema.triggers.contains(&self.quota_trigger)
            && self
                .required_set()
                .iter()
                .all(|col| schema.columns.contains(*col))
    }

    /// Builds the server-side form of the predicate as a parameterized
    /// query against the live store's schema catalog.
    ///
    /// Returns the SQL text with numbered placeholders and the bind
    /// parameters in order. No identifier or value is ever interpolated
    /// into the text, so the query is safe to hand to any driver and the
    /// predicate stays testable in isolation from the store.
    ///
    /// Parameters, in order: schema name, owner role, trigger name, the
    /// required column names, then any catalog-known table names to exclude.
    #[must_use]
    pub fn schema_query(
        &self,
        schema_name: &str,
        owner_role: &str,
        known_names: &BTreeSet<String>,
    ) -> (String, Vec<String>) {
        let required = self.required_set();

        let mut params: Vec<String> = vec![
            schema_name.to_string(),
            owner_role.to_string(),
            self.quota_trigger.clone(),
        ];

        let column_list = placeholders(params.len() + 1, required.len());
        params.extend(required.iter().map(ToString::to_string));

        let mut sql = String::from(
            "SELECT c.table_name\n\
             FROM information_schema.columns c\n\
             JOIN pg_tables t\n\
             \x20 ON t.tablename = c.table_name AND t.schemaname = c.table_schema\n\
             JOIN pg_trigger tg\n\
             \x20 ON tg.tgrelid = (quote_ident(t.schemaname) || '.' || quote_ident(t.tablename))::regclass::oid\n\
             WHERE c.table_schema = $1\n\
             \x20 AND t.tableowner = $2\n\
             \x20 AND tg.tgname = $3\n",
        );
        let _ = writeln!(sql, "  AND c.column_name IN ({column_list})");

        if !known_names.is_empty() {
            let exclusion_list = placeholders(params.len() + 1, known_names.len());
            params.extend(known_names.iter().cloned());
            let _ = writeln!(sql, "  AND c.table_name NOT IN ({exclusion_list})");
        }

        sql.push_str("GROUP BY c.table_name\n");
        // The match count is derived from the rule itself, never from
        // caller-supplied data.
        let _ = writeln!(
            sql,
            "HAVING count(DISTINCT c.column_name) = {}",
            required.len()
        );

        (sql, params)
    }
}

/// Renders `count` numbered placeholders starting at `start` ($5, $6, ...).
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

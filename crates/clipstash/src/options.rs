//! Reader configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Options consumed by [`SchemaReader`](crate::SchemaReader).
///
/// Deserializes from a partial table, e.g.:
///
/// ```toml
/// enable_caching = true
/// ignored_tables = ["clip_fts"]
///
/// [ignored_columns]
/// clip = ["thumbnail"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaOptions {
    /// Memoize the first snapshot and return it on later reads.
    pub enable_caching: bool,
    /// Tables skipped entirely (case-insensitive).
    pub ignored_tables: BTreeSet<String>,
    /// Per-table columns skipped during introspection (case-insensitive).
    pub ignored_columns: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }

    pub fn ignore_table(mut self, table: impl Into<String>) -> Self {
        self.ignored_tables.insert(table.into());
        self
    }

    pub fn ignore_column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.ignored_columns
            .entry(table.into())
            .or_default()
            .insert(column.into());
        self
    }

    pub fn is_table_ignored(&self, table: &str) -> bool {
        self.ignored_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    pub fn is_column_ignored(&self, table: &str, column: &str) -> bool {
        self.ignored_columns
            .iter()
            .filter(|(t, _)| t.eq_ignore_ascii_case(table))
            .flat_map(|(_, columns)| columns)
            .any(|c| c.eq_ignore_ascii_case(column))
    }
}

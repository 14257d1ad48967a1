//! Structural validation of a schema before any migration is applied.
//!
//! Errors must block the migration; warnings are surfaced only. Each check
//! runs unconditionally, so a single pass reports every problem.
//!
//! Unrecognized column types are warnings: SQLite accepts any type name and
//! derives an affinity from it, so a strict allow-list would reject
//! legitimate declarations.

use crate::schema::{RESERVED_PREFIX, SchemaDefinition, is_known_type, is_reserved_name};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    /// Problems that must block the migration.
    pub errors: Vec<String>,
    /// Problems worth surfacing that do not block.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true when there are no errors (warnings are allowed).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert into a `Result`, keeping the warnings on success.
    pub fn into_result(self) -> Result<Vec<String>, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ValidationErrors(self.errors))
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

/// The blocking errors of a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema validation failed: {}", .0.join("; "))]
pub struct ValidationErrors(pub Vec<String>);

/// Validate a schema for structural soundness.
pub fn validate(schema: &SchemaDefinition) -> ValidationResult {
    let mut result = ValidationResult::default();

    check_table_names(schema, &mut result);
    check_column_names(schema, &mut result);
    check_foreign_key_targets(schema, &mut result);
    check_foreign_key_cycles(schema, &mut result);
    check_column_types(schema, &mut result);
    check_duplicate_names(schema, &mut result);
    check_primary_keys(schema, &mut result);

    for error in &result.errors {
        tracing::warn!(%error, "schema validation error");
    }
    tracing::debug!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "validated schema"
    );

    result
}

fn check_table_names(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        if table.name.trim().is_empty() {
            result.errors.push("table name cannot be empty".to_string());
        } else if is_reserved_name(&table.name) {
            result.errors.push(format!(
                "table '{}' uses the reserved '{}' prefix",
                table.name, RESERVED_PREFIX
            ));
        }

        if !table.name.trim().is_empty() && table.columns.is_empty() {
            result
                .errors
                .push(format!("table '{}' has no columns", table.name));
        }
    }
}

fn check_column_names(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        for col in &table.columns {
            match col.name.chars().next() {
                None => result.errors.push(format!(
                    "table '{}' has a column with an empty name",
                    table.name
                )),
                Some(first) if !(first.is_alphabetic() || first == '_') => {
                    result.errors.push(format!(
                        "column '{}.{}' must start with a letter or underscore",
                        table.name, col.name
                    ))
                }
                Some(_) => {}
            }
        }
    }
}

fn check_foreign_key_targets(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        for fk in &table.foreign_keys {
            if !schema.contains_table(&fk.references_table) {
                result.errors.push(format!(
                    "foreign key '{}.{}' references missing table '{}'",
                    table.name, fk.column, fk.references_table
                ));
            }
        }
    }
}

/// Table → tables referenced by its foreign keys (lowercased, self-edges kept).
type ForeignKeyGraph = IndexMap<String, Vec<String>>;

fn foreign_key_graph(schema: &SchemaDefinition) -> ForeignKeyGraph {
    schema
        .tables()
        .map(|table| {
            let targets = table
                .foreign_keys
                .iter()
                .map(|fk| fk.references_table.to_lowercase())
                .collect();
            (table.name.to_lowercase(), targets)
        })
        .collect()
}

fn check_foreign_key_cycles(schema: &SchemaDefinition, result: &mut ValidationResult) {
    let graph = foreign_key_graph(schema);

    for table in schema.tables() {
        let start = table.name.to_lowercase();
        let mut visited = HashSet::new();
        if leads_back_to_start(&graph, &start, &start, &mut visited, true) {
            result.errors.push(format!(
                "circular foreign key reference involving table '{}'",
                table.name
            ));
        }
    }
}

/// Depth-first search from `current` for an edge back to `start`.
///
/// `at_start` is true only for the first call, where `current` is `start`
/// itself: an edge straight back to `start` there is a self-reference
/// (e.g. a parent pointer) and is allowed. Reaching `start` from any other
/// table is a genuine cycle.
fn leads_back_to_start<'g>(
    graph: &'g ForeignKeyGraph,
    start: &str,
    current: &str,
    visited: &mut HashSet<&'g str>,
    at_start: bool,
) -> bool {
    let Some(targets) = graph.get(current) else {
        return false;
    };

    for target in targets {
        if target == start {
            if at_start {
                continue;
            }
            return true;
        }
        if visited.insert(target.as_str())
            && leads_back_to_start(graph, start, target, visited, false)
        {
            return true;
        }
    }

    false
}

fn check_column_types(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        for col in &table.columns {
            if !is_known_type(&col.sql_type) {
                result.warnings.push(format!(
                    "column '{}.{}' has unrecognized type '{}'",
                    table.name, col.name, col.sql_type
                ));
            }
        }
    }
}

fn check_duplicate_names(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        for name in duplicates(table.columns.iter().map(|c| c.name.as_str())) {
            result.errors.push(format!(
                "duplicate column '{}' in table '{}'",
                name, table.name
            ));
        }
        for name in duplicates(table.indexes.iter().map(|i| i.name.as_str())) {
            result.errors.push(format!(
                "duplicate index '{}' in table '{}'",
                name, table.name
            ));
        }
    }
}

/// Names occurring more than once (case-insensitively), each reported once.
fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut dups = Vec::new();
    for name in names {
        let key = name.to_lowercase();
        if !seen.insert(key.clone()) && reported.insert(key) {
            dups.push(name);
        }
    }
    dups
}

fn check_primary_keys(schema: &SchemaDefinition, result: &mut ValidationResult) {
    for table in schema.tables() {
        if !table.has_primary_key() {
            result
                .warnings
                .push(format!("table '{}' has no primary key", table.name));
        }
    }
}

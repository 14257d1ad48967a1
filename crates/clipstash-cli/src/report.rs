//! Terminal rendering of schemas, diffs and validation results.

use clipstash::schema::{create_index_sql, create_table_sql};
use clipstash::{SchemaDefinition, SchemaDiff, ValidationResult};
use owo_colors::OwoColorize;

/// One creation statement per table and index, tables in snapshot order.
pub fn schema_script(schema: &SchemaDefinition) -> String {
    let mut out = String::new();
    for table in schema.tables() {
        let sql = match &table.create_sql {
            Some(sql) => sql.clone(),
            None => create_table_sql(table),
        };
        out.push_str(&format!("{};\n", sql));

        for idx in &table.indexes {
            let sql = match &idx.create_sql {
                Some(sql) => sql.clone(),
                None => create_index_sql(&table.name, idx),
            };
            out.push_str(&format!("{};\n", sql));
        }
        out.push('\n');
    }
    out
}

pub fn diff_listing(diff: &SchemaDiff, color: bool) -> String {
    if !color {
        return diff.to_string();
    }
    if diff.is_empty() {
        return format!("{}\n", "No changes detected.".green());
    }

    let mut out = String::new();
    for op in &diff.operations {
        out.push_str(&format!("{}\n", op.green()));
    }
    for warning in &diff.warnings {
        out.push_str(&format!("{} {}\n", "!".yellow().bold(), warning));
    }
    out
}

pub fn validation_listing(result: &ValidationResult, color: bool) -> String {
    if result.errors.is_empty() && result.warnings.is_empty() {
        if color {
            return format!("{}\n", "Schema is valid.".green());
        }
        return "Schema is valid.\n".to_string();
    }
    if !color {
        return result.to_string();
    }

    let mut out = String::new();
    for error in &result.errors {
        out.push_str(&format!("{} {}\n", "error:".red().bold(), error));
    }
    for warning in &result.warnings {
        out.push_str(&format!("{} {}\n", "warning:".yellow().bold(), warning));
    }
    out
}

//! SQL generation for additive migration operations.
//!
//! Identifiers are emitted verbatim: the names come from the application's
//! own data model and are plain SQLite identifiers.

pub use clipstash_db_schema::{
    AUTO_INDEX_PREFIX, ColumnDefinition, ForeignKeyDefinition, IndexDefinition, KNOWN_TYPES,
    RESERVED_PREFIX, ReferentialAction, SchemaDefinition, TableDefinition, TypeAffinity,
    base_type, is_auto_index, is_known_type, is_reserved_name, quote_ident,
};

/// Generate a single-statement CREATE TABLE, foreign keys included.
///
/// SQLite cannot add foreign keys after the fact, so they are rendered as
/// table constraints. A sole `INTEGER` primary key becomes
/// `PRIMARY KEY AUTOINCREMENT`; composite keys use a table-level
/// `PRIMARY KEY (...)` clause.
pub fn create_table_sql(table: &TableDefinition) -> String {
    let pk_columns: Vec<&str> = table
        .primary_key_columns()
        .map(|c| c.name.as_str())
        .collect();
    let use_table_pk_constraint = pk_columns.len() > 1;

    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|col| {
            let mut def = column_head(col);

            if col.primary_key && !use_table_pk_constraint {
                def.push_str(" PRIMARY KEY");
                if base_type(&col.sql_type) == "INTEGER" {
                    def.push_str(" AUTOINCREMENT");
                } else {
                    // Only INTEGER PRIMARY KEY is implicitly NOT NULL in SQLite
                    def.push_str(" NOT NULL");
                }
            } else if col.is_not_null() {
                def.push_str(" NOT NULL");
            }

            if let Some(default) = effective_default(col, !col.primary_key) {
                def.push_str(&format!(" DEFAULT {}", default));
            }

            def
        })
        .collect();

    if use_table_pk_constraint {
        parts.push(format!("PRIMARY KEY ({})", pk_columns.join(", ")));
    }

    parts.extend(table.foreign_keys.iter().map(foreign_key_clause));

    format!("CREATE TABLE {} ({})", table.name, parts.join(", "))
}

/// Generate `ALTER TABLE ... ADD COLUMN` for a column missing from `table`.
///
/// A NOT NULL column always receives a default: its declared one, or one
/// synthesized from its type affinity.
pub fn add_column_sql(table: &str, col: &ColumnDefinition) -> String {
    let mut sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column_head(col));
    if col.is_not_null() {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = effective_default(col, true) {
        sql.push_str(&format!(" DEFAULT {}", default));
    }
    sql
}

/// Generate CREATE INDEX SQL statement for a given index.
pub fn create_index_sql(table: &str, idx: &IndexDefinition) -> String {
    let unique = if idx.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        unique,
        idx.name,
        table,
        idx.columns.join(", ")
    )
}

/// Render a `FOREIGN KEY` table constraint.
///
/// The delete action defaults to `NO ACTION`; an update action is only
/// rendered when one other than the default is declared.
pub fn foreign_key_clause(fk: &ForeignKeyDefinition) -> String {
    let target = if fk.references_column.is_empty() {
        fk.references_table.clone()
    } else {
        format!("{}({})", fk.references_table, fk.references_column)
    };
    let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {} ON DELETE {}",
        fk.column,
        target,
        fk.on_delete.unwrap_or_default()
    );
    if let Some(action) = fk.on_update.filter(|a| *a != ReferentialAction::NoAction) {
        clause.push_str(&format!(" ON UPDATE {}", action));
    }
    clause
}

fn column_head(col: &ColumnDefinition) -> String {
    if col.sql_type.trim().is_empty() {
        col.name.clone()
    } else {
        format!("{} {}", col.name, col.sql_type)
    }
}

fn effective_default(col: &ColumnDefinition, synthesize: bool) -> Option<String> {
    match &col.default {
        Some(default) => Some(default.clone()),
        None if synthesize && col.is_not_null() => {
            Some(col.affinity().synthesized_default().to_string())
        }
        None => None,
    }
}

//! Schema comparison - compute the additive operations that bring the
//! database's current schema in line with the expected one.
//!
//! The policy is strictly additive:
//!
//! - missing tables are created (with their indexes),
//! - missing columns are added, with a synthesized default when they are
//!   NOT NULL and declare none,
//! - missing indexes are created.
//!
//! Nothing is ever dropped, renamed or altered. Tables and columns that exist
//! only in the database, and columns whose declared type drifted, are reported
//! as warnings. Indexes that exist only in the database are not reported at
//! all: they are treated as performance artifacts rather than structure.

use crate::schema::{
    ColumnDefinition, IndexDefinition, SchemaDefinition, TableDefinition, add_column_sql,
    create_index_sql, create_table_sql,
};
use std::fmt;

/// The closed set of operation shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CreateTable,
    AddColumn,
    CreateIndex,
}

/// A single additive migration operation, carrying the SQL to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOperation {
    /// Create a missing table (foreign keys included).
    CreateTable { table: String, sql: String },
    /// Add a missing column to an existing table.
    AddColumn {
        table: String,
        column: String,
        sql: String,
    },
    /// Create a missing index.
    CreateIndex {
        table: String,
        index: String,
        sql: String,
    },
}

impl MigrationOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            MigrationOperation::CreateTable { .. } => OperationKind::CreateTable,
            MigrationOperation::AddColumn { .. } => OperationKind::AddColumn,
            MigrationOperation::CreateIndex { .. } => OperationKind::CreateIndex,
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            MigrationOperation::CreateTable { table, .. }
            | MigrationOperation::AddColumn { table, .. }
            | MigrationOperation::CreateIndex { table, .. } => table,
        }
    }

    pub fn column_name(&self) -> Option<&str> {
        match self {
            MigrationOperation::AddColumn { column, .. } => Some(column),
            _ => None,
        }
    }

    pub fn index_name(&self) -> Option<&str> {
        match self {
            MigrationOperation::CreateIndex { index, .. } => Some(index),
            _ => None,
        }
    }

    /// The statement to execute.
    pub fn sql(&self) -> &str {
        match self {
            MigrationOperation::CreateTable { sql, .. }
            | MigrationOperation::AddColumn { sql, .. }
            | MigrationOperation::CreateIndex { sql, .. } => sql,
        }
    }

    fn create_table(table: &TableDefinition) -> Self {
        MigrationOperation::CreateTable {
            table: table.name.clone(),
            sql: create_table_sql(table),
        }
    }

    fn add_column(table: &str, col: &ColumnDefinition) -> Self {
        MigrationOperation::AddColumn {
            table: table.to_string(),
            column: col.name.clone(),
            sql: add_column_sql(table, col),
        }
    }

    /// The catalog statement wins over one rebuilt from `columns`, which
    /// cannot express expression terms or a `WHERE` clause. `None` when
    /// there is nothing to build from.
    fn create_index(table: &str, idx: &IndexDefinition) -> Option<Self> {
        let sql = match &idx.create_sql {
            Some(sql) => sql.clone(),
            None if idx.columns.is_empty() => return None,
            None => create_index_sql(table, idx),
        };
        Some(MigrationOperation::CreateIndex {
            table: table.to_string(),
            index: idx.name.clone(),
            sql,
        })
    }
}

impl fmt::Display for MigrationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOperation::CreateTable { table, .. } => write!(f, "+ table {}", table),
            MigrationOperation::AddColumn { table, column, .. } => {
                write!(f, "+ column {}.{}", table, column)
            }
            MigrationOperation::CreateIndex { table, index, .. } => {
                write!(f, "+ index {} on {}", index, table)
            }
        }
    }
}

/// The result of comparing two schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Operations, in execution order: a table is always created before
    /// anything that refers to it.
    pub operations: Vec<MigrationOperation>,
    /// Non-additive drift that was detected but not acted upon.
    pub warnings: Vec<String>,
}

impl SchemaDiff {
    /// Returns true if there are neither operations nor warnings.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.warnings.is_empty()
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    /// Generate a script with one statement per line.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        for op in &self.operations {
            sql.push_str(op.sql());
            sql.push_str(";\n");
        }
        sql
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes detected.");
        }
        for op in &self.operations {
            writeln!(f, "{}", op)?;
        }
        for warning in &self.warnings {
            writeln!(f, "! {}", warning)?;
        }
        Ok(())
    }
}

/// Compare the database's `current` schema against the `expected` one.
///
/// Never fails: every difference becomes an operation or a warning.
///
/// # Example
///
/// ```ignore
/// let current = reader.read_schema(&mut conn, &cancel).await?;
/// let diff = clipstash::compare(&current, &expected);
/// for op in &diff.operations {
///     conn.execute(op.sql()).await?;
/// }
/// ```
pub fn compare(current: &SchemaDefinition, expected: &SchemaDefinition) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    for table in current.tables() {
        if !expected.contains_table(&table.name) {
            diff.warnings.push(format!(
                "table '{}' exists in the database but not in the expected schema",
                table.name
            ));
        }
    }

    for expected_table in expected.tables() {
        match current.table(&expected_table.name) {
            None => {
                diff.operations
                    .push(MigrationOperation::create_table(expected_table));
                for idx in &expected_table.indexes {
                    push_create_index(&expected_table.name, idx, &mut diff);
                }
            }
            Some(current_table) => compare_table(current_table, expected_table, &mut diff),
        }
    }

    tracing::debug!(
        operations = diff.operations.len(),
        warnings = diff.warnings.len(),
        "compared schemas"
    );

    diff
}

/// Compare two tables with the same name.
fn compare_table(current: &TableDefinition, expected: &TableDefinition, diff: &mut SchemaDiff) {
    compare_columns(current, expected, diff);
    compare_indexes(current, expected, diff);
}

fn compare_columns(current: &TableDefinition, expected: &TableDefinition, diff: &mut SchemaDiff) {
    for col in &current.columns {
        if expected.column(&col.name).is_none() {
            diff.warnings.push(format!(
                "column '{}.{}' exists in the database but not in the expected schema",
                current.name, col.name
            ));
        }
    }

    for expected_col in &expected.columns {
        match current.column(&expected_col.name) {
            None => diff
                .operations
                .push(MigrationOperation::add_column(&current.name, expected_col)),
            Some(current_col) => {
                if !current_col
                    .sql_type
                    .trim()
                    .eq_ignore_ascii_case(expected_col.sql_type.trim())
                {
                    diff.warnings.push(format!(
                        "column '{}.{}' has type '{}' but '{}' is expected; SQLite cannot change a column type in place",
                        current.name, expected_col.name, current_col.sql_type, expected_col.sql_type
                    ));
                }
            }
        }
    }
}

fn compare_indexes(current: &TableDefinition, expected: &TableDefinition, diff: &mut SchemaDiff) {
    for idx in &expected.indexes {
        if current.index(&idx.name).is_none() {
            push_create_index(&current.name, idx, diff);
        }
    }
}

fn push_create_index(table: &str, idx: &IndexDefinition, diff: &mut SchemaDiff) {
    match MigrationOperation::create_index(table, idx) {
        Some(op) => diff.operations.push(op),
        None => diff.warnings.push(format!(
            "index '{}' on '{}' has no columns and no stored definition; it was not created",
            idx.name, table
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ForeignKeyDefinition, ReferentialAction};

    fn widgets() -> TableDefinition {
        TableDefinition::new("Widgets")
            .with_column(ColumnDefinition::new(0, "Id", "INTEGER").primary_key())
            .with_column(ColumnDefinition::new(1, "Name", "TEXT").not_null())
    }

    fn schema(tables: impl IntoIterator<Item = TableDefinition>) -> SchemaDefinition {
        tables.into_iter().collect()
    }

    #[test]
    fn test_compare_empty_schemas() {
        let diff = compare(&SchemaDefinition::new(), &SchemaDefinition::new());
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "No changes detected.\n");
    }

    #[test]
    fn test_compare_identical_schemas() {
        let s = schema([widgets().with_index(IndexDefinition::new(
            "IX_Widgets_Name",
            "Widgets",
            ["Name"],
        ))]);
        assert!(compare(&s, &s).is_empty());
    }

    #[test]
    fn test_create_missing_table() {
        let diff = compare(&SchemaDefinition::new(), &schema([widgets()]));

        assert_eq!(diff.operation_count(), 1);
        assert!(diff.warnings.is_empty());
        let op = &diff.operations[0];
        assert_eq!(op.kind(), OperationKind::CreateTable);
        assert_eq!(op.table_name(), "Widgets");
        assert!(op.sql().contains("CREATE TABLE Widgets ("));
        assert!(op.sql().contains("Name TEXT NOT NULL"));
    }

    #[test]
    fn test_create_missing_table_synthesizes_defaults() {
        let expected = schema([TableDefinition::new("T")
            .with_column(ColumnDefinition::new(0, "Id", "INTEGER").primary_key())
            .with_column(ColumnDefinition::new(1, "Qty", "INTEGER").not_null())]);

        let diff = compare(&SchemaDefinition::new(), &expected);
        assert!(diff.operations[0].sql().contains("Qty INTEGER NOT NULL DEFAULT 0"));
    }

    #[test]
    fn test_new_table_indexes_follow_create_table() {
        let expected = schema([widgets()
            .with_index(IndexDefinition::new("IX_Widgets_Name", "Widgets", ["Name"]).unique())]);

        let diff = compare(&SchemaDefinition::new(), &expected);

        let kinds: Vec<OperationKind> = diff.operations.iter().map(|op| op.kind()).collect();
        assert_eq!(kinds, vec![OperationKind::CreateTable, OperationKind::CreateIndex]);
        insta::assert_snapshot!(diff.to_sql(), @r"
        CREATE TABLE Widgets (Id INTEGER PRIMARY KEY AUTOINCREMENT, Name TEXT NOT NULL DEFAULT '');
        CREATE UNIQUE INDEX IX_Widgets_Name ON Widgets (Name);
        ");
    }

    #[test]
    fn test_add_missing_column() {
        let current = schema([widgets()]);
        let expected = schema([widgets().with_column(
            ColumnDefinition::new(2, "Price", "REAL")
                .not_null()
                .with_default("9.99"),
        )]);

        let diff = compare(&current, &expected);

        assert!(diff.warnings.is_empty());
        assert_eq!(
            diff.operations,
            vec![MigrationOperation::AddColumn {
                table: "Widgets".to_string(),
                column: "Price".to_string(),
                sql: "ALTER TABLE Widgets ADD COLUMN Price REAL NOT NULL DEFAULT 9.99".to_string(),
            }]
        );
    }

    #[test]
    fn test_unexpected_table_is_only_a_warning() {
        let current = schema([TableDefinition::new("Old")]);
        let diff = compare(&current, &SchemaDefinition::new());

        assert!(diff.operations.is_empty());
        assert_eq!(diff.warnings.len(), 1);
        assert!(diff.warnings[0].contains("Old"));
    }

    #[test]
    fn test_unexpected_column_is_only_a_warning() {
        let current = schema([widgets().with_column(ColumnDefinition::new(2, "Legacy", "TEXT"))]);
        let diff = compare(&current, &schema([widgets()]));

        assert!(diff.operations.is_empty());
        assert_eq!(diff.warnings.len(), 1);
        assert!(diff.warnings[0].contains("Widgets.Legacy"));
    }

    #[test]
    fn test_type_drift_is_only_a_warning() {
        let current = schema([widgets().with_column(ColumnDefinition::new(2, "Price", "TEXT"))]);
        let expected = schema([widgets().with_column(ColumnDefinition::new(2, "Price", "REAL"))]);

        let diff = compare(&current, &expected);

        assert!(diff.operations.is_empty());
        assert_eq!(diff.warnings.len(), 1);
        assert!(diff.warnings[0].contains("'TEXT'"));
        assert!(diff.warnings[0].contains("'REAL'"));
    }

    #[test]
    fn test_type_comparison_ignores_case() {
        let current = schema([widgets().with_column(ColumnDefinition::new(2, "Price", "real"))]);
        let expected = schema([widgets().with_column(ColumnDefinition::new(2, "Price", "REAL"))]);
        assert!(compare(&current, &expected).is_empty());
    }

    #[test]
    fn test_names_match_case_insensitively() {
        let current = schema([TableDefinition::new("widgets")
            .with_column(ColumnDefinition::new(0, "id", "INTEGER").primary_key())
            .with_column(ColumnDefinition::new(1, "name", "TEXT").not_null())]);
        assert!(compare(&current, &schema([widgets()])).is_empty());
    }

    #[test]
    fn test_add_missing_index() {
        let current = schema([widgets()]);
        let expected = schema([
            widgets().with_index(IndexDefinition::new("IX_Widgets_Name", "Widgets", ["Name"]))
        ]);

        let diff = compare(&current, &expected);

        assert_eq!(diff.operation_count(), 1);
        assert_eq!(diff.operations[0].index_name(), Some("IX_Widgets_Name"));
        assert_eq!(
            diff.operations[0].sql(),
            "CREATE INDEX IX_Widgets_Name ON Widgets (Name)"
        );
    }

    #[test]
    fn test_missing_index_uses_stored_definition() {
        let current = schema([widgets()]);
        let expected = schema([widgets().with_index(
            IndexDefinition::new("IX_Widgets_Live", "Widgets", ["Name"])
                .unique()
                .with_create_sql("CREATE UNIQUE INDEX IX_Widgets_Live ON Widgets (Name) WHERE Id > 0"),
        )]);

        let diff = compare(&current, &expected);

        assert_eq!(diff.operation_count(), 1);
        assert_eq!(
            diff.operations[0].sql(),
            "CREATE UNIQUE INDEX IX_Widgets_Live ON Widgets (Name) WHERE Id > 0"
        );
    }

    #[test]
    fn test_index_without_columns_is_skipped() {
        let current = schema([widgets()]);
        let expected = schema([widgets().with_index(IndexDefinition::new(
            "IX_Widgets_Nothing",
            "Widgets",
            Vec::<String>::new(),
        ))]);

        let diff = compare(&current, &expected);

        assert_eq!(diff.operation_count(), 0);
        insta::assert_snapshot!(diff.warnings.join("\n"), @"index 'IX_Widgets_Nothing' on 'Widgets' has no columns and no stored definition; it was not created");

        // Same outcome when the table itself is new
        let diff = compare(&SchemaDefinition::new(), &expected);
        assert_eq!(diff.operation_count(), 1);
        assert_eq!(diff.operations[0].kind(), OperationKind::CreateTable);
        assert_eq!(diff.warnings.len(), 1);
    }

    #[test]
    fn test_extra_index_is_not_reported() {
        let current = schema([
            widgets().with_index(IndexDefinition::new("IX_Widgets_Name", "Widgets", ["Name"]))
        ]);
        let diff = compare(&current, &schema([widgets()]));
        assert!(diff.is_empty());
    }

    #[test]
    fn test_operations_follow_expected_table_order() {
        let clip = TableDefinition::new("Clip")
            .with_column(ColumnDefinition::new(0, "Id", "INTEGER").primary_key());
        let note = TableDefinition::new("Note")
            .with_column(ColumnDefinition::new(0, "Id", "INTEGER").primary_key())
            .with_column(ColumnDefinition::new(1, "ClipId", "INTEGER"))
            .with_foreign_key(
                ForeignKeyDefinition::new("ClipId", "Clip", "Id")
                    .on_delete(ReferentialAction::Cascade),
            );

        let diff = compare(&SchemaDefinition::new(), &schema([clip, note]));

        let tables: Vec<&str> = diff.operations.iter().map(|op| op.table_name()).collect();
        assert_eq!(tables, vec!["Clip", "Note"]);
        assert!(diff.operations[1]
            .sql()
            .ends_with("FOREIGN KEY (ClipId) REFERENCES Clip(Id) ON DELETE CASCADE)"));
    }

    #[test]
    fn test_display_lists_changes() {
        let current = schema([widgets(), TableDefinition::new("Old")]);
        let expected = schema([
            widgets().with_column(ColumnDefinition::new(2, "Price", "REAL")),
            TableDefinition::new("Tag"),
        ]);

        let diff = compare(&current, &expected);

        insta::assert_snapshot!(diff.to_string(), @r"
        + column Widgets.Price
        + table Tag
        ! table 'Old' exists in the database but not in the expected schema
        ");
    }
}

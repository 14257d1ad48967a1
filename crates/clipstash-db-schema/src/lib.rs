//! Database schema types for clipstash.
//!
//! This crate contains the snapshot types shared between the schema reader,
//! the comparer and the validator in `clipstash`. A [`SchemaDefinition`] is
//! built once (from introspection or from the application's data model) and
//! never mutated afterwards.
//!
//! The target dialect is SQLite: names starting with [`RESERVED_PREFIX`] belong
//! to the engine, and implicit indexes backing `UNIQUE`/`PRIMARY KEY`
//! constraints are named with [`AUTO_INDEX_PREFIX`].

use indexmap::IndexMap;
use std::fmt;

/// Prefix of tables and indexes that SQLite reserves for itself.
pub const RESERVED_PREFIX: &str = "sqlite_";

/// Prefix of the implicit indexes SQLite creates for `UNIQUE` and
/// `PRIMARY KEY` constraints.
pub const AUTO_INDEX_PREFIX: &str = "sqlite_autoindex_";

/// Base types accepted by the validator, uppercased.
///
/// Covers the type names listed in SQLite's affinity documentation plus the
/// common date/boolean spellings that map to NUMERIC affinity.
pub const KNOWN_TYPES: &[&str] = &[
    "INT",
    "INTEGER",
    "TINYINT",
    "SMALLINT",
    "MEDIUMINT",
    "BIGINT",
    "UNSIGNED BIG INT",
    "INT2",
    "INT8",
    "CHARACTER",
    "VARCHAR",
    "VARYING CHARACTER",
    "NCHAR",
    "NATIVE CHARACTER",
    "NVARCHAR",
    "TEXT",
    "CLOB",
    "BLOB",
    "REAL",
    "DOUBLE",
    "DOUBLE PRECISION",
    "FLOAT",
    "NUMERIC",
    "DECIMAL",
    "BOOLEAN",
    "DATE",
    "DATETIME",
];

/// Returns true if `name` starts with the reserved `sqlite_` prefix (any case).
pub fn is_reserved_name(name: &str) -> bool {
    has_prefix_ignore_case(name, RESERVED_PREFIX)
}

/// Returns true if `name` is one of SQLite's implicit constraint indexes.
pub fn is_auto_index(name: &str) -> bool {
    has_prefix_ignore_case(name, AUTO_INDEX_PREFIX)
}

fn has_prefix_ignore_case(name: &str, prefix: &str) -> bool {
    name.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Quote an identifier for use inside an introspection command.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The portion of a declared type before any `(length, precision)` suffix,
/// uppercased with internal whitespace collapsed.
///
/// `"varchar(255)"` becomes `"VARCHAR"`, `"unsigned  big int"` becomes
/// `"UNSIGNED BIG INT"`.
pub fn base_type(declared: &str) -> String {
    let head = declared.split('(').next().unwrap_or_default();
    head.split_whitespace()
        .map(|word| word.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true if the declared type is absent or its base type is in
/// [`KNOWN_TYPES`].
pub fn is_known_type(declared: &str) -> bool {
    let base = base_type(declared);
    base.is_empty() || KNOWN_TYPES.contains(&base.as_str())
}

/// Storage class SQLite assigns to a declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeAffinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl TypeAffinity {
    /// Classify a declared type using SQLite's affinity rules, in order:
    /// `INT` → integer; `CHAR`, `CLOB`, `TEXT` → text; `BLOB` or no type →
    /// blob; `REAL`, `FLOA`, `DOUB` → real; anything else → numeric.
    pub fn of(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            TypeAffinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            TypeAffinity::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            TypeAffinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            TypeAffinity::Real
        } else {
            TypeAffinity::Numeric
        }
    }

    /// Default literal used when a NOT NULL column is added without one.
    ///
    /// SQLite refuses `ADD COLUMN ... NOT NULL` on a populated table unless a
    /// non-null default is given.
    pub fn synthesized_default(&self) -> &'static str {
        match self {
            TypeAffinity::Integer => "0",
            TypeAffinity::Real => "0.0",
            TypeAffinity::Text => "''",
            TypeAffinity::Blob => "x''",
            TypeAffinity::Numeric => "NULL",
        }
    }
}

impl fmt::Display for TypeAffinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeAffinity::Integer => write!(f, "INTEGER"),
            TypeAffinity::Text => write!(f, "TEXT"),
            TypeAffinity::Blob => write!(f, "BLOB"),
            TypeAffinity::Real => write!(f, "REAL"),
            TypeAffinity::Numeric => write!(f, "NUMERIC"),
        }
    }
}

/// A database column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    /// Declaration order (0-based)
    pub position: usize,
    /// Column name
    pub name: String,
    /// Declared type, verbatim (e.g. `TEXT`, `VARCHAR(32)`, or empty)
    pub sql_type: String,
    /// Whether the column allows NULL
    pub nullable: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Default value literal (if any)
    pub default: Option<String>,
}

impl ColumnDefinition {
    /// Create a nullable, non-key column without a default.
    pub fn new(position: usize, name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            position,
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the column as (part of) the primary key. Implies NOT NULL.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    /// Set the default value literal.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether the column rejects NULL.
    ///
    /// Primary-key columns always do, whatever the nullability flag says:
    /// `PRAGMA table_info` reports `notnull = 0` for an `INTEGER PRIMARY KEY`.
    pub fn is_not_null(&self) -> bool {
        !self.nullable || self.primary_key
    }

    pub fn affinity(&self) -> TypeAffinity {
        TypeAffinity::of(&self.sql_type)
    }
}

/// Action taken on the child row when the referenced row changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl ReferentialAction {
    /// Parse an action keyword.
    ///
    /// Accepts SQL spellings (`SET NULL`) as well as model spellings
    /// (`SetNull`, `set_null`). Unknown keywords map to [`ReferentialAction::NoAction`].
    pub fn parse(keyword: &str) -> Self {
        let normalized: String = keyword
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match normalized.as_str() {
            "CASCADE" => ReferentialAction::Cascade,
            "SETNULL" => ReferentialAction::SetNull,
            "SETDEFAULT" => ReferentialAction::SetDefault,
            "RESTRICT" => ReferentialAction::Restrict,
            _ => ReferentialAction::NoAction,
        }
    }

    /// Returns the SQL keyword(s) for this action.
    pub fn to_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Cascade => "CASCADE",
        }
    }
}

impl fmt::Display for ReferentialAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// A foreign key from one column to a column of another (or the same) table.
///
/// A composite key is a single definition whose `column` and
/// `references_column` are comma-separated lists in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDefinition {
    /// Column in this table (`a, b` for a composite key)
    pub column: String,
    /// Referenced table
    pub references_table: String,
    /// Referenced column, empty when the reference is implicit and unresolved
    pub references_column: String,
    pub on_delete: Option<ReferentialAction>,
    pub on_update: Option<ReferentialAction>,
}

impl ForeignKeyDefinition {
    pub fn new(
        column: impl Into<String>,
        references_table: impl Into<String>,
        references_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            references_table: references_table.into(),
            references_column: references_column.into(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    /// The local columns, in key order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        split_list(&self.column)
    }

    /// The referenced columns, in key order; empty when implicit.
    pub fn references_columns(&self) -> impl Iterator<Item = &str> {
        split_list(&self.references_column)
    }

    pub fn is_composite(&self) -> bool {
        self.columns().nth(1).is_some()
    }

    /// Whether this key points back at the table that declares it.
    pub fn is_self_reference(&self, table_name: &str) -> bool {
        self.references_table.eq_ignore_ascii_case(table_name)
    }
}

/// A database index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDefinition {
    /// Index name (unique within a database)
    pub name: String,
    /// Table the index belongs to
    pub table_name: String,
    /// Whether this is a unique index
    pub unique: bool,
    /// Indexed columns, in key order
    pub columns: Vec<String>,
    /// Verbatim `CREATE INDEX` statement from the catalog. Keeps expression
    /// terms and a partial index's `WHERE` clause, which `columns` cannot.
    pub create_sql: Option<String>,
}

impl IndexDefinition {
    pub fn new<I, S>(name: impl Into<String>, table_name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            unique: false,
            columns: columns.into_iter().map(Into::into).collect(),
            create_sql: None,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = Some(sql.into());
        self
    }
}

/// A database table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// Table name
    pub name: String,
    /// Columns, in declaration order
    pub columns: Vec<ColumnDefinition>,
    /// Explicit indexes (implicit constraint indexes are never listed)
    pub indexes: Vec<IndexDefinition>,
    /// Foreign keys
    pub foreign_keys: Vec<ForeignKeyDefinition>,
    /// Verbatim `CREATE TABLE` statement from the catalog (diagnostics only)
    pub create_sql: Option<String>,
}

impl TableDefinition {
    /// Create an empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            create_sql: None,
        }
    }

    /// Append a column. Its position is overwritten with the next free slot.
    pub fn with_column(mut self, mut column: ColumnDefinition) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    pub fn with_index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKeyDefinition) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = Some(sql.into());
        self
    }

    /// Find a column by name (case-insensitive, like SQLite identifiers).
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Find an index by name (case-insensitive).
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Columns that make up the primary key, in declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }
}

/// A complete schema snapshot.
///
/// Table names are unique case-insensitively; inserting a table whose name
/// differs only by case replaces the earlier one. Iteration follows insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDefinition {
    tables: IndexMap<String, TableDefinition>,
}

impl SchemaDefinition {
    /// Create a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, returning the extended schema.
    pub fn with_table(mut self, table: TableDefinition) -> Self {
        self.tables.insert(table_key(&table.name), table);
        self
    }

    /// Get a table by name (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.get(&table_key(name))
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(&table_key(name))
    }

    /// Iterate over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<TableDefinition> for SchemaDefinition {
    fn from_iter<I: IntoIterator<Item = TableDefinition>>(iter: I) -> Self {
        iter.into_iter()
            .fold(SchemaDefinition::new(), SchemaDefinition::with_table)
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|part| !part.is_empty())
}

fn table_key(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests;

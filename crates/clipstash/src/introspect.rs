//! Schema introspection: read the actual structure of a live SQLite database.
//!
//! Everything comes from the catalog (`sqlite_master`) and the introspection
//! pragmas (`table_info`, `index_list`, `index_info`, `foreign_key_list`);
//! application data is never queried.

use crate::schema::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, ReferentialAction, SchemaDefinition,
    TableDefinition, is_auto_index, is_reserved_name, quote_ident,
};
use crate::traced::TracedConn;
use crate::{Error, Result, SchemaOptions};
use sqlx::sqlite::SqliteRow;
use sqlx::{Connection, Row, SqliteConnection};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     ORDER BY name";

const TABLE_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?";

const INDEX_SQL: &str = "SELECT sql FROM sqlite_master WHERE type = 'index' AND name = ?";

/// Reads [`SchemaDefinition`] snapshots from live connections.
///
/// With [`SchemaOptions::enable_caching`] set, the first snapshot is memoized
/// and returned by every later call until [`invalidate`](Self::invalidate).
/// Two concurrent first reads may both hit the database; the last one wins
/// the cache slot.
#[derive(Debug, Default)]
pub struct SchemaReader {
    options: SchemaOptions,
    cache: Mutex<Option<Arc<SchemaDefinition>>>,
}

impl SchemaReader {
    pub fn new(options: SchemaOptions) -> Self {
        Self {
            options,
            cache: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    /// Open a connection to `url` (e.g. `sqlite://clips.db`).
    pub async fn connect(url: &str) -> Result<SqliteConnection> {
        SqliteConnection::connect(url)
            .await
            .map_err(|source| Error::Connect {
                url: url.to_string(),
                source,
            })
    }

    /// Open `url` and read its schema.
    pub async fn read_schema_from_url(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<SchemaDefinition>> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }
        let mut conn = Self::connect(url).await?;
        let schema = self.read_schema(&mut conn, cancel).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(error = %e, "closing introspection connection failed");
        }
        schema
    }

    /// Read the schema of the database behind `conn`.
    ///
    /// Every statement is raced against `cancel`; a cancelled read returns
    /// [`Error::Cancelled`] and leaves the cache untouched.
    pub async fn read_schema(
        &self,
        conn: &mut SqliteConnection,
        cancel: &CancellationToken,
    ) -> Result<Arc<SchemaDefinition>> {
        if let Some(cached) = self.cached() {
            tracing::debug!("returning cached schema snapshot");
            return Ok(cached);
        }

        let mut conn = TracedConn::new(conn, cancel);
        let schema = Arc::new(read_snapshot(&mut conn, &self.options).await?);

        if self.options.enable_caching {
            *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(schema.clone());
        }

        Ok(schema)
    }

    /// Drop the memoized snapshot, if any.
    pub fn invalidate(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn cached(&self) -> Option<Arc<SchemaDefinition>> {
        if !self.options.enable_caching {
            return None;
        }
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn read_snapshot(
    conn: &mut TracedConn<'_>,
    options: &SchemaOptions,
) -> Result<SchemaDefinition> {
    let mut names = Vec::new();
    for row in conn.query(LIST_TABLES_SQL).await? {
        let name: String = row.try_get("name")?;
        if is_reserved_name(&name) || options.is_table_ignored(&name) {
            continue;
        }
        names.push(name);
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        tables.push(read_table(conn, name, options).await?);
    }

    resolve_implicit_references(&mut tables);

    tracing::info!(tables = tables.len(), "read schema snapshot");

    Ok(tables.into_iter().collect())
}

async fn read_table(
    conn: &mut TracedConn<'_>,
    name: &str,
    options: &SchemaOptions,
) -> Result<TableDefinition> {
    let columns = read_columns(conn, name, options).await?;
    let indexes = read_indexes(conn, name).await?;
    let foreign_keys = read_foreign_keys(conn, name).await?;
    let create_sql = catalog_sql(conn, TABLE_SQL, name).await?;

    tracing::debug!(
        table = %name,
        columns = columns.len(),
        indexes = indexes.len(),
        foreign_keys = foreign_keys.len(),
        "introspected table"
    );

    Ok(TableDefinition {
        name: name.to_string(),
        columns,
        indexes,
        foreign_keys,
        create_sql,
    })
}

async fn read_columns(
    conn: &mut TracedConn<'_>,
    table: &str,
    options: &SchemaOptions,
) -> Result<Vec<ColumnDefinition>> {
    let rows = conn
        .query(&format!("PRAGMA table_info({})", quote_ident(table)))
        .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        if options.is_column_ignored(table, &name) {
            continue;
        }
        columns.push(column_from_row(&row, name)?);
    }
    Ok(columns)
}

fn column_from_row(row: &SqliteRow, name: String) -> Result<ColumnDefinition> {
    let cid: i64 = row.try_get("cid")?;
    let sql_type: Option<String> = row.try_get("type")?;
    let notnull: i64 = row.try_get("notnull")?;
    let default: Option<String> = row.try_get("dflt_value")?;
    // `pk` is the 1-based position within the primary key, 0 if not part of it
    let pk: i64 = row.try_get("pk")?;
    let primary_key = pk > 0;

    Ok(ColumnDefinition {
        position: usize::try_from(cid).unwrap_or_default(),
        name,
        sql_type: sql_type.unwrap_or_default(),
        // table_info under-reports NOT NULL for INTEGER PRIMARY KEY
        nullable: notnull == 0 && !primary_key,
        primary_key,
        default,
    })
}

async fn read_indexes(conn: &mut TracedConn<'_>, table: &str) -> Result<Vec<IndexDefinition>> {
    let rows = conn
        .query(&format!("PRAGMA index_list({})", quote_ident(table)))
        .await?;

    let mut listed = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        if is_auto_index(&name) {
            continue;
        }
        let unique: i64 = row.try_get("unique")?;
        listed.push((name, unique != 0));
    }

    let mut indexes = Vec::with_capacity(listed.len());
    for (name, unique) in listed {
        let info = conn
            .query(&format!("PRAGMA index_info({})", quote_ident(&name)))
            .await?;

        let mut keyed = Vec::with_capacity(info.len());
        for row in info {
            let seqno: i64 = row.try_get("seqno")?;
            // NULL for expression index terms
            let column: Option<String> = row.try_get("name")?;
            if let Some(column) = column {
                keyed.push((seqno, column));
            }
        }
        keyed.sort_by_key(|(seqno, _)| *seqno);

        let create_sql = catalog_sql(conn, INDEX_SQL, &name).await?;

        indexes.push(IndexDefinition {
            name,
            table_name: table.to_string(),
            unique,
            columns: keyed.into_iter().map(|(_, column)| column).collect(),
            create_sql,
        });
    }
    Ok(indexes)
}

async fn read_foreign_keys(
    conn: &mut TracedConn<'_>,
    table: &str,
) -> Result<Vec<ForeignKeyDefinition>> {
    let rows = conn
        .query(&format!("PRAGMA foreign_key_list({})", quote_ident(table)))
        .await?;

    // One row per column; the columns of a composite key share an `id`
    // and arrive in `seq` order.
    let mut foreign_keys: Vec<ForeignKeyDefinition> = Vec::with_capacity(rows.len());
    let mut last_id = None;
    for row in rows {
        let id: i64 = row.try_get("id")?;
        let column: String = row.try_get("from")?;
        // NULL when the key references the parent's primary key implicitly
        let references_column: Option<String> = row.try_get("to")?;

        if last_id == Some(id) {
            if let Some(fk) = foreign_keys.last_mut() {
                fk.column = format!("{}, {}", fk.column, column);
                if let Some(to) = references_column {
                    if !fk.references_column.is_empty() {
                        fk.references_column = format!("{}, {}", fk.references_column, to);
                    }
                }
            }
            continue;
        }
        last_id = Some(id);

        let references_table: String = row.try_get("table")?;
        let on_update: Option<String> = row.try_get("on_update")?;
        let on_delete: Option<String> = row.try_get("on_delete")?;

        foreign_keys.push(ForeignKeyDefinition {
            column,
            references_table,
            references_column: references_column.unwrap_or_default(),
            on_delete: on_delete.as_deref().map(ReferentialAction::parse),
            on_update: on_update.as_deref().map(ReferentialAction::parse),
        });
    }

    for fk in foreign_keys.iter().filter(|fk| fk.is_composite()) {
        tracing::debug!(
            table,
            columns = %fk.column,
            references = %fk.references_table,
            "composite foreign key"
        );
    }
    Ok(foreign_keys)
}

/// Look up the verbatim creation statement of a catalog object.
async fn catalog_sql(conn: &mut TracedConn<'_>, sql: &str, name: &str) -> Result<Option<String>> {
    let rows = conn.query_with(sql, name).await?;
    match rows.first() {
        Some(row) => Ok(row.try_get::<Option<String>, _>("sql")?),
        None => Ok(None),
    }
}

/// Fill in implicit `REFERENCES parent` targets with the parent's primary key.
///
/// Left empty when the parent was not read, or when either key is composite.
fn resolve_implicit_references(tables: &mut [TableDefinition]) {
    let mut resolved = Vec::new();
    for (t, table) in tables.iter().enumerate() {
        for (f, fk) in table.foreign_keys.iter().enumerate() {
            if !fk.references_column.is_empty() || fk.is_composite() {
                continue;
            }
            let parent = tables
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(&fk.references_table));
            let Some(parent) = parent else {
                continue;
            };
            let mut pk = parent.primary_key_columns();
            if let (Some(column), None) = (pk.next(), pk.next()) {
                resolved.push((t, f, column.name.clone()));
            }
        }
    }

    for (t, f, column) in resolved {
        tables[t].foreign_keys[f].references_column = column;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_implicit_references() {
        let mut tables = vec![
            TableDefinition::new("clip")
                .with_column(ColumnDefinition::new(0, "id", "INTEGER").primary_key()),
            TableDefinition::new("note")
                .with_column(ColumnDefinition::new(0, "clip_id", "INTEGER"))
                .with_foreign_key(ForeignKeyDefinition::new("clip_id", "CLIP", ""))
                .with_foreign_key(ForeignKeyDefinition::new("other_id", "missing", "")),
        ];

        resolve_implicit_references(&mut tables);

        assert_eq!(tables[1].foreign_keys[0].references_column, "id");
        assert_eq!(tables[1].foreign_keys[1].references_column, "");
    }

    #[test]
    fn test_composite_parent_stays_unresolved() {
        let mut tables = vec![
            TableDefinition::new("pair")
                .with_column(ColumnDefinition::new(0, "a", "INTEGER").primary_key())
                .with_column(ColumnDefinition::new(1, "b", "INTEGER").primary_key()),
            TableDefinition::new("child")
                .with_foreign_key(ForeignKeyDefinition::new("pair_a", "pair", "")),
        ];

        resolve_implicit_references(&mut tables);

        assert_eq!(tables[1].foreign_keys[0].references_column, "");
    }

    #[test]
    fn test_composite_child_stays_unresolved() {
        let mut tables = vec![
            TableDefinition::new("clip")
                .with_column(ColumnDefinition::new(0, "id", "INTEGER").primary_key()),
            TableDefinition::new("note")
                .with_foreign_key(ForeignKeyDefinition::new("clip_id, rev", "clip", "")),
        ];

        resolve_implicit_references(&mut tables);

        assert_eq!(tables[1].foreign_keys[0].references_column, "");
    }
}

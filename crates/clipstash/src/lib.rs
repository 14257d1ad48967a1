//! Schema introspection, comparison and validation for clipstash's SQLite store.
//!
//! The clipboard history lives in a SQLite database whose structure evolves
//! across application versions without destructive migrations. This crate
//! provides the three pieces a startup migration needs:
//!
//! - [`SchemaReader`] reads the actual structure of a live database from the
//!   catalog and the introspection pragmas.
//! - [`compare`] computes the additive operations (create table, add column,
//!   create index) that bring the current schema in line with the expected
//!   one, plus warnings about drift it will not touch.
//! - [`validate`] checks a schema for structural soundness: circular foreign
//!   keys, dangling references, duplicate or reserved names.
//!
//! ```ignore
//! let reader = SchemaReader::new(SchemaOptions::default());
//! let current = reader.read_schema(&mut conn, &cancel).await?;
//!
//! let warnings = clipstash::validate(&expected).into_result()?;
//! let diff = clipstash::compare(&current, &expected);
//! for op in &diff.operations {
//!     sqlx::query(op.sql()).execute(&mut *tx).await?;
//! }
//! ```
//!
//! Applying the operations is left to the caller, ideally inside a single
//! transaction.

mod diff;
mod error;
mod introspect;
mod options;
pub mod schema;
mod traced;
mod validate;

pub use diff::{MigrationOperation, OperationKind, SchemaDiff, compare};
pub use error::Error;
pub use introspect::SchemaReader;
pub use options::SchemaOptions;
pub use validate::{ValidationErrors, ValidationResult, validate};

pub use schema::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, ReferentialAction, SchemaDefinition,
    TableDefinition, TypeAffinity,
};

/// Re-exported so callers can build the token without depending on tokio-util.
pub use tokio_util::sync::CancellationToken;

/// Result type for clipstash operations.
pub type Result<T> = std::result::Result<T, Error>;

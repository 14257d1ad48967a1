//! Traced, cancellable connection wrapper.
//!
//! Wraps a borrowed SQLite connection so that every introspection statement is
//! logged via tracing and raced against a cancellation token.

use crate::{Error, Result};
use sqlx::SqliteConnection;
use sqlx::sqlite::SqliteRow;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// A traced connection borrowed for the duration of one schema read.
///
/// Holding the connection by `&mut` keeps a second operation from running on
/// it at the same time.
pub(crate) struct TracedConn<'c> {
    inner: &'c mut SqliteConnection,
    cancel: &'c CancellationToken,
}

impl<'c> TracedConn<'c> {
    pub(crate) fn new(inner: &'c mut SqliteConnection, cancel: &'c CancellationToken) -> Self {
        Self { inner, cancel }
    }

    /// Run a statement without parameters, returning all rows.
    pub(crate) async fn query(&mut self, sql: &str) -> Result<Vec<SqliteRow>> {
        self.run(sql, None).await
    }

    /// Run a statement with a single text parameter, returning all rows.
    pub(crate) async fn query_with(&mut self, sql: &str, param: &str) -> Result<Vec<SqliteRow>> {
        self.run(sql, Some(param)).await
    }

    async fn run(&mut self, sql: &str, param: Option<&str>) -> Result<Vec<SqliteRow>> {
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            params = usize::from(param.is_some()),
            rows = tracing::field::Empty,
        );

        let mut query = sqlx::query(sql);
        if let Some(param) = param {
            query = query.bind(param.to_owned());
        }

        let rows = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
            rows = query.fetch_all(&mut *self.inner).instrument(span.clone()) => rows?,
        };

        span.record("rows", rows.len());
        Ok(rows)
    }
}

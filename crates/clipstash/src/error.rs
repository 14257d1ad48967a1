use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open database {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),

    #[error("schema read cancelled")]
    Cancelled,
}

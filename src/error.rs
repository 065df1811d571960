use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between locating the store and writing the file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The annotation database is missing, unreadable, or not SQLite at all.
    #[error(
        "annotation database unavailable at {}: {source}\n\
         Check that Apple Books is installed and has been opened at least once,\n\
         or pass the path explicitly with --db.",
        .path.display()
    )]
    DatabaseUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The database opened fine but a query against it failed (schema drift).
    #[error("query against annotation database failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The query succeeded but matched nothing. Reported, never fatal.
    #[error("no highlights found{}", .filter.as_deref().map(|t| format!(" for book: {}", t)).unwrap_or_default())]
    EmptyResult { filter: Option<String> },

    /// Could not create or write the output file.
    #[error("failed to write {}: {source}", .path.display())]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

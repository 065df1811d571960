//! Read-only access to the Apple Books annotation store.
//!
//! Table schema (Core Data, undocumented; column names verified against
//! Books 6.x):
//! ```sql
//! ZAEANNOTATION (
//!     ZANNOTATIONSELECTEDTEXT        TEXT,   -- the highlighted passage
//!     ZANNOTATIONNOTE                TEXT,   -- user-authored note
//!     ZANNOTATIONREPRESENTATIVETEXT  TEXT,   -- surrounding context
//!     ZFUTUREPROOFING5               TEXT,   -- chapter / location label
//!     ZANNOTATIONISUNDERLINE         INTEGER,
//!     ZANNOTATIONDELETED             INTEGER,
//!     ZANNOTATIONCREATIONDATE        REAL,   -- seconds since 2001-01-01 UTC
//!     ZANNOTATIONASSETID             TEXT
//! )
//! ZBKLIBRARYASSET (ZASSETID TEXT, ZTITLE TEXT, ZAUTHOR TEXT)
//! ```

use crate::error::ExportError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;

/// Seconds between the Unix epoch and Apple's Core Data reference date
/// (2001-01-01T00:00:00Z). Stored timestamps are offsets from the latter.
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Passage-marking variant, decoded from the stored style code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Highlight,
    Underline,
}

impl Style {
    fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Style::Underline,
            _ => Style::Highlight,
        }
    }
}

/// One extracted annotation, immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub book_title: String,
    pub chapter: Option<String>,
    pub note: Option<String>,
    pub context: Option<String>,
    pub style: Style,
}

const HIGHLIGHTS_QUERY: &str = "
    SELECT
        a.ZANNOTATIONSELECTEDTEXT,
        a.ZANNOTATIONCREATIONDATE,
        a.ZANNOTATIONNOTE,
        a.ZANNOTATIONREPRESENTATIVETEXT,
        a.ZFUTUREPROOFING5,
        a.ZANNOTATIONISUNDERLINE,
        b.ZTITLE
    FROM ZAEANNOTATION a
    JOIN ZBKLIBRARYASSET b ON b.ZASSETID = a.ZANNOTATIONASSETID
    WHERE a.ZANNOTATIONDELETED = 0
      AND a.ZANNOTATIONSELECTEDTEXT IS NOT NULL
      AND a.ZANNOTATIONSELECTEDTEXT != ''
      AND b.ZTITLE IS NOT NULL";

/// A scoped read-only connection to the annotation store.
/// The connection is closed when the value is dropped, query failures included.
pub struct Extractor {
    conn: Connection,
}

impl Extractor {
    /// Open the store read-only. Fails with [`ExportError::DatabaseUnavailable`]
    /// if the file is absent or is not a SQLite database.
    pub fn open(path: &Path) -> Result<Self, ExportError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| ExportError::DatabaseUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        // Opening a garbage file succeeds lazily; the first real read exposes it.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|source| ExportError::DatabaseUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self { conn })
    }

    /// Fetch highlights, optionally filtered by a case-insensitive substring
    /// of the resolved book title. Results are ordered by book title, then
    /// creation time ascending. Rows whose asset id resolves to no library
    /// entry, or to one without a title, are skipped.
    pub fn get_highlights(
        &self,
        book_title: Option<&str>,
    ) -> Result<Vec<Highlight>, ExportError> {
        let mut sql = String::from(HIGHLIGHTS_QUERY);
        if book_title.is_some() {
            sql.push_str(" AND b.ZTITLE LIKE ?1 ESCAPE '\\'");
        }
        sql.push_str(" ORDER BY b.ZTITLE ASC, a.ZANNOTATIONCREATIONDATE ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match book_title {
            Some(title) => stmt.query(params![like_pattern(title)])?,
            None => stmt.query([])?,
        };

        let mut highlights = Vec::new();
        while let Some(row) = rows.next()? {
            highlights.push(map_row(row)?);
        }
        Ok(highlights)
    }

    /// Single-row title lookup for when the join path is unavailable.
    /// Returns `"Unknown"` if the asset id has no library entry.
    pub fn get_book_title(&self, asset_id: &str) -> Result<String, ExportError> {
        let title = self
            .conn
            .query_row(
                "SELECT ZTITLE FROM ZBKLIBRARYASSET WHERE ZASSETID = ?1",
                params![asset_id],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;
        Ok(title.flatten().unwrap_or_else(|| "Unknown".to_string()))
    }
}

fn map_row(row: &Row<'_>) -> Result<Highlight, rusqlite::Error> {
    Ok(Highlight {
        text: row.get(0)?,
        created_at: decode_timestamp(row.get(1)?),
        note: non_empty(row.get(2)?),
        context: non_empty(row.get(3)?),
        chapter: non_empty(row.get(4)?),
        style: Style::from_code(row.get(5)?),
        book_title: row.get(6)?,
    })
}

/// Decode a Core Data timestamp into UTC. A NULL stored value decodes to the
/// reference date itself, keeping repeated exports byte-identical.
fn decode_timestamp(raw: Option<f64>) -> DateTime<Utc> {
    // The f64 cast saturates for absurd stored values; keep the addition
    // saturating too so out-of-range rows fall through to the fallback.
    let secs = (raw.unwrap_or(0.0) as i64).saturating_add(APPLE_EPOCH_OFFSET);
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Empty strings in optional columns mean "absent".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Wrap the user's filter in `%...%`, escaping LIKE metacharacters so the
/// input is matched literally.
fn like_pattern(title: &str) -> String {
    let escaped: String = title
        .chars()
        .flat_map(|c| match c {
            '%' | '_' | '\\' => vec!['\\', c],
            _ => vec![c],
        })
        .collect();
    format!("%{}%", escaped)
}

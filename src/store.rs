//! Quote persistence.
//!
//! The pipeline and the freeze step only see [`QuoteStore`]. Production uses
//! [`SqliteStore`]: one connection opened per run, one table:
//!
//! ```sql
//! content_library(id, category, text_cn, text_en, image_url, status, created_at)
//! ```
//!
//! `status` is `1` for published and `0` for hidden; read paths return
//! published rows only, newest first.

use crate::types::{Category, NewQuote, QuoteRecord, Status};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

pub trait QuoteStore {
    /// Insert one record as published. Atomic: on error nothing is written.
    fn insert_published(&mut self, quote: &NewQuote) -> Result<QuoteRecord, StoreError>;

    /// Published records, newest first, optionally filtered and limited.
    fn published(
        &self,
        category: Option<Category>,
        limit: Option<usize>,
    ) -> Result<Vec<QuoteRecord>, StoreError>;

    fn find_published(&self, id: i64) -> Result<Option<QuoteRecord>, StoreError>;

    /// Ids of all published records, ascending.
    fn published_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut ids: Vec<i64> = self.published(None, None)?.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Change a record's visibility. Returns false when no row has that id.
    fn set_status(&mut self, id: i64, status: Status) -> Result<bool, StoreError>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS content_library (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    text_cn TEXT NOT NULL,
    text_en TEXT NOT NULL,
    image_url TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
)";

const SELECT_COLUMNS: &str =
    "SELECT id, category, text_en, text_cn, image_url, status, created_at FROM content_library";

/// Row as stored, before category and timestamp are parsed.
struct RawRow {
    id: i64,
    category: String,
    text_en: String,
    text_cn: String,
    image_url: String,
    status: i64,
    created_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category: row.get(1)?,
            text_en: row.get(2)?,
            text_cn: row.get(3)?,
            image_url: row.get(4)?,
            status: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<QuoteRecord, StoreError> {
        let category = self.category.parse::<Category>().map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: e.to_string(),
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt {
                id: self.id,
                reason: format!("created_at {:?}: {e}", self.created_at),
            })?
            .with_timezone(&Utc);
        Ok(QuoteRecord {
            id: self.id,
            category,
            text_en: self.text_en,
            text_cn: self.text_cn,
            image_url: self.image_url,
            status: Status::from_flag(self.status),
            created_at,
        })
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and bootstrap the table.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::bootstrap(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self, StoreError> {
        // Only takes effect on a fresh database; existing files keep their encoding.
        conn.pragma_update(None, "encoding", "UTF-8")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn query_records(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<QuoteRecord>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RawRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(RawRow::into_record).collect()
    }
}

impl QuoteStore for SqliteStore {
    fn insert_published(&mut self, quote: &NewQuote) -> Result<QuoteRecord, StoreError> {
        let created_at = Utc::now();
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO content_library (category, text_cn, text_en, image_url, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                quote.category.as_str(),
                quote.text_cn,
                quote.text_en,
                quote.image_url,
                Status::Published.as_flag(),
                created_at.to_rfc3339(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(QuoteRecord {
            id,
            category: quote.category,
            text_en: quote.text_en.clone(),
            text_cn: quote.text_cn.clone(),
            image_url: quote.image_url.clone(),
            status: Status::Published,
            created_at,
        })
    }

    fn published(
        &self,
        category: Option<Category>,
        limit: Option<usize>,
    ) -> Result<Vec<QuoteRecord>, StoreError> {
        // LIMIT -1 means no limit in SQLite
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "{SELECT_COLUMNS} WHERE status = 1 AND (?1 IS NULL OR category = ?1)
             ORDER BY id DESC LIMIT ?2"
        );
        self.query_records(&sql, params![category.map(|c| c.as_str()), limit])
    }

    fn find_published(&self, id: i64) -> Result<Option<QuoteRecord>, StoreError> {
        let sql = format!("{SELECT_COLUMNS} WHERE status = 1 AND id = ?1");
        let raw = self
            .conn
            .query_row(&sql, params![id], RawRow::from_row)
            .optional()?;
        raw.map(RawRow::into_record).transpose()
    }

    fn published_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM content_library WHERE status = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn set_status(&mut self, id: i64, status: Status) -> Result<bool, StoreError> {
        let changed = self.conn.execute(
            "UPDATE content_library SET status = ?1 WHERE id = ?2",
            params![status.as_flag(), id],
        )?;
        Ok(changed > 0)
    }
}

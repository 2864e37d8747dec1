use super::error::{CatalogError, Result};
use super::schema::{DocumentId, DocumentRecord, NewDocument};
use super::store::{MetadataStore, StoreSession};
use anyhow::Context;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

const RECORD_COLUMNS: &str =
    "id, title, author, filename, description, tags, file_size, created_date";

const MATCH_CLAUSE: &str = "instr(title, ?1) > 0
     OR instr(COALESCE(author, ''), ?1) > 0
     OR instr(COALESCE(tags, ''), ?1) > 0";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed document catalog.
///
/// Holds only the database path; every read opens a short-lived read-only
/// connection so one slow request never blocks another.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    db_path: PathBuf,
}

impl CatalogIndex {
    /// Point at an existing catalog database. Nothing is opened until the first session.
    pub fn open(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Create the database file and schema if missing, then return the index.
    pub fn bootstrap(db_path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let db_path = db_path.into();
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open {}", db_path.display()))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;",
        )?;

        Self::init_schema(&conn)?;
        Ok(Self { db_path })
    }

    fn init_schema(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS novels (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                title         TEXT NOT NULL,
                author        TEXT,
                filename      TEXT NOT NULL UNIQUE,
                description   TEXT,
                tags          TEXT,
                file_size     INTEGER NOT NULL DEFAULT 0,
                created_date  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_novels_author ON novels(author);",
        )
        .context("Failed to init catalog schema")?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a read-write handle for the importer.
    pub fn writer(&self) -> anyhow::Result<IndexWriter> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open {} for writing", self.db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(IndexWriter { conn })
    }
}

impl MetadataStore for CatalogIndex {
    type Session = IndexSession;

    fn session(&self) -> Result<IndexSession> {
        let conn = Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| CatalogError::StoreUnavailable {
            message: format!("cannot open {}: {e}", self.db_path.display()),
            source: Some(Box::new(e)),
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // One snapshot for every statement of the operation.
        conn.execute_batch("BEGIN DEFERRED")?;
        Ok(IndexSession { conn })
    }
}

/// A read-only connection inside an open read transaction.
pub struct IndexSession {
    conn: Connection,
}

impl IndexSession {
    fn page(&self, sql: &str, keyword: Option<&str>, limit: u64, offset: u64) -> Result<Vec<DocumentRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match keyword {
            Some(keyword) => stmt.query_map(
                params![keyword, to_sql_int(limit), to_sql_int(offset)],
                row_to_record,
            )?,
            None => stmt.query_map(params![to_sql_int(limit), to_sql_int(offset)], row_to_record)?,
        };
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn scalar(&self, sql: &str) -> Result<u64> {
        let value: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value.max(0) as u64)
    }
}

impl StoreSession for IndexSession {
    fn find_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {RECORD_COLUMNS} FROM novels WHERE id = ?1"),
                params![id.get()],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    fn search(&self, keyword: &str, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)> {
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM novels WHERE {MATCH_CLAUSE}"),
            params![keyword],
            |row| row.get(0),
        )?;
        let records = self.page(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM novels WHERE {MATCH_CLAUSE}
                 ORDER BY id DESC LIMIT ?2 OFFSET ?3"
            ),
            Some(keyword),
            limit,
            offset,
        )?;
        Ok((records, total.max(0) as u64))
    }

    fn list_all(&self, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)> {
        let total = self.count_all()?;
        let records = self.page(
            &format!("SELECT {RECORD_COLUMNS} FROM novels ORDER BY id DESC LIMIT ?1 OFFSET ?2"),
            None,
            limit,
            offset,
        )?;
        Ok((records, total))
    }

    fn count_all(&self) -> Result<u64> {
        self.scalar("SELECT COUNT(*) FROM novels")
    }

    fn count_distinct_authors(&self) -> Result<u64> {
        self.scalar("SELECT COUNT(DISTINCT NULLIF(author, '')) FROM novels")
    }

    fn sum_file_sizes(&self) -> Result<u64> {
        self.scalar("SELECT COALESCE(SUM(file_size), 0) FROM novels")
    }
}

impl Drop for IndexSession {
    fn drop(&mut self) {
        let _ = self.conn.execute_batch("ROLLBACK");
    }
}

/// Read-write handle used only by the importer.
pub struct IndexWriter {
    conn: Connection,
}

impl IndexWriter {
    pub fn contains_filename(&self, filename: &str) -> anyhow::Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM novels WHERE filename = ?1",
                params![filename],
                |_| Ok(()),
            )
            .optional()
            .context("Failed to look up filename")?;
        Ok(found.is_some())
    }

    /// Insert all documents in one transaction, returning their assigned ids.
    pub fn insert_all(&mut self, documents: &[NewDocument]) -> anyhow::Result<Vec<DocumentId>> {
        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(documents.len());
        {
            let mut stmt = tx.prepare(
                "INSERT INTO novels (title, author, filename, description, tags, file_size)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for doc in documents {
                stmt.execute(params![
                    doc.title,
                    doc.author,
                    doc.filename,
                    doc.description,
                    doc.tags,
                    to_sql_int(doc.file_size),
                ])
                .with_context(|| format!("Failed to insert {}", doc.filename))?;
                ids.push(DocumentId::new(tx.last_insert_rowid())?);
            }
        }
        tx.commit().context("Failed to commit import")?;
        Ok(ids)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    let id = DocumentId::new(row.get("id")?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(e)))?;
    Ok(DocumentRecord {
        id,
        title: row.get("title")?,
        author: row.get::<_, Option<String>>("author")?.unwrap_or_default(),
        filename: row.get("filename")?,
        description: row.get::<_, Option<String>>("description")?.unwrap_or_default(),
        tags: row.get::<_, Option<String>>("tags")?.unwrap_or_default(),
        file_size: row.get::<_, Option<i64>>("file_size")?.unwrap_or(0).max(0) as u64,
        created_date: row.get("created_date")?,
    })
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

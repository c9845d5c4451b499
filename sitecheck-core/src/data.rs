use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("name already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A tracked url row. Created once per distinct normalized name, never
/// updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUrl {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// One recorded fetch-and-extract attempt against a tracked url.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlCheck {
    pub id: i64,
    pub url_id: i64,
    pub status_code: Option<u16>,
    pub h1: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
}

/// One row of the overview listing: a url joined to its most recent check.
#[derive(Debug, Clone)]
pub struct UrlSummary {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub last_check_at: Option<i64>,
    pub last_status_code: Option<u16>,
}

fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Handle on the SQLite store. Cloning is cheap; every operation opens and
/// releases its own connection scope, so a handle can be shared freely
/// across request workers.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Storage {
            path: path.to_path_buf(),
        };
        let conn = storage.connect()?;
        storage.init_schema(&conn)?;
        Ok(storage)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        Ok(conn)
    }

    fn init_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            -- Tracked urls, deduplicated by normalized name
            CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

-- Check history, append-only
CREATE TABLE IF NOT EXISTS url_checks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url_id INTEGER NOT NULL,
    status_code INTEGER,
    h1 TEXT,
    title TEXT,
    description TEXT,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(url_id) REFERENCES urls(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_url_checks_url ON url_checks(url_id);
            ",
        )?;
        Ok(())
    }

    pub fn find_url_by_name(&self, name: &str) -> Result<Option<StoredUrl>> {
        debug!(name = %name, "looking up url by name");
        let conn = self.connect()?;

        let url = conn
            .query_row(
                "SELECT id, name, created_at FROM urls WHERE name = ?1",
                params![name],
                url_from_row,
            )
            .optional()?;

        Ok(url)
    }

    pub fn find_url_by_id(&self, id: i64) -> Result<Option<StoredUrl>> {
        let conn = self.connect()?;

        let url = conn
            .query_row(
                "SELECT id, name, created_at FROM urls WHERE id = ?1",
                params![id],
                url_from_row,
            )
            .optional()?;

        Ok(url)
    }

    /// Insert a url with the current timestamp.
    ///
    /// The UNIQUE constraint on `name` is the deduplication authority: an
    /// insert racing past a caller's pre-check comes back as
    /// [`StoreError::Duplicate`] rather than a generic failure.
    pub fn create_url(&self, name: &str) -> Result<StoredUrl> {
        let conn = self.connect()?;
        let created_at = current_timestamp();

        conn.execute(
            "INSERT INTO urls (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Duplicate
            }
            other => StoreError::Sqlite(other),
        })?;

        let id = conn.last_insert_rowid();
        info!(id, name = %name, "url created");

        Ok(StoredUrl {
            id,
            name: name.to_string(),
            created_at,
        })
    }

    /// Append one check row for `url_id` with the current timestamp.
    pub fn create_check(
        &self,
        url_id: i64,
        status_code: Option<u16>,
        h1: Option<&str>,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<UrlCheck> {
        let conn = self.connect()?;
        let created_at = current_timestamp();

        conn.execute(
            "INSERT INTO url_checks (url_id, status_code, h1, title, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![url_id, status_code, h1, title, description, created_at],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, url_id, "check recorded");

        Ok(UrlCheck {
            id,
            url_id,
            status_code,
            h1: h1.map(str::to_string),
            title: title.map(str::to_string),
            description: description.map(str::to_string),
            created_at,
        })
    }

    /// All checks for a url, most recent first.
    pub fn checks_for_url(&self, url_id: i64) -> Result<Vec<UrlCheck>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT id, url_id, status_code, h1, title, description, created_at
             FROM url_checks
             WHERE url_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;

        let checks = stmt
            .query_map(params![url_id], check_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(checks)
    }

    /// Every url decorated with its most recent check, newest urls first.
    pub fn urls_with_last_check(&self) -> Result<Vec<UrlSummary>> {
        let conn = self.connect()?;

        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.created_at, c.created_at, c.status_code
             FROM urls u
             LEFT JOIN url_checks c ON c.id = (
                 SELECT c2.id FROM url_checks c2
                 WHERE c2.url_id = u.id
                 ORDER BY c2.created_at DESC, c2.id DESC
                 LIMIT 1
             )
             ORDER BY u.created_at DESC, u.id DESC",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                Ok(UrlSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                    last_check_at: row.get(3)?,
                    last_status_code: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }
}

fn url_from_row(row: &Row) -> rusqlite::Result<StoredUrl> {
    Ok(StoredUrl {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn check_from_row(row: &Row) -> rusqlite::Result<UrlCheck> {
    Ok(UrlCheck {
        id: row.get(0)?,
        url_id: row.get(1)?,
        status_code: row.get(2)?,
        h1: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

//! SQLite-backed credential store.
//!
//! Schema:
//!   entries(id, service UNIQUE, username, password, url, notes,
//!           created_at, modified_at, last_used_at)
//!   tags(id, entry_id -> entries.id ON DELETE CASCADE, tag)
//!   metadata(key PRIMARY KEY, value)
//!
//! Timestamps are RFC 3339 text; the encrypted password is base64 text.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;

use crate::errors::{PsstError, Result, ResultExt};
use crate::vault::entry::{EncryptedEntry, VaultMetadata};

use super::CredentialStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS entries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    service      TEXT NOT NULL UNIQUE,
    username     TEXT,
    password     TEXT NOT NULL,
    url          TEXT,
    notes        TEXT,
    created_at   TEXT NOT NULL,
    modified_at  TEXT NOT NULL,
    last_used_at TEXT
);

CREATE TABLE IF NOT EXISTS tags (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    tag      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS metadata (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_service ON entries(service);
CREATE INDEX IF NOT EXISTS idx_tags_entry_id ON tags(entry_id);
CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);
";

const ENTRY_COLUMNS: &str =
    "id, service, username, password, url, notes, created_at, modified_at, last_used_at";

const META_MASTER_HASH: &str = "master_hash";
const META_CREATED_AT: &str = "created_at";
const META_LAST_ACCESS: &str = "last_access";
const META_VERSION: &str = "version";

/// SQLite implementation of `CredentialStore`.
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    ///
    /// Creates the parent directory if needed, enables foreign keys, and
    /// runs a trivial query so a broken file fails here rather than on
    /// first use.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_private_dir(parent).context("failed to create database directory")?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| PsstError::storage("failed to open database", e))?;

        // Owner-only access to the vault file.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("failed to restrict database permissions")?;
        }

        Self::from_connection(conn, path.to_path_buf())
    }

    /// Open a private in-memory database.  Nothing is written to disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PsstError::storage("failed to open database", e))?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| PsstError::storage("failed to enable foreign keys", e))?;

        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| PsstError::storage("failed to connect to database", e))?;

        Ok(Self { conn, path })
    }

    fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .map_err(|e| PsstError::storage("failed to inspect schema", e))?;
        Ok(count > 0)
    }

    fn tags_for(&self, entry_id: i64) -> Result<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM tags WHERE entry_id = ?1")
            .map_err(|e| PsstError::storage("failed to query tags", e))?;

        let rows = stmt
            .query_map(params![entry_id], |row| row.get::<_, String>(0))
            .map_err(|e| PsstError::storage("failed to query tags", e))?;

        let mut tags = BTreeSet::new();
        for row in rows {
            tags.insert(row.map_err(|e| PsstError::storage("failed to read tag", e))?);
        }
        Ok(tags)
    }
}

impl CredentialStore for SqliteStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| PsstError::storage("failed to initialize schema", e))
    }

    fn save_entry(&mut self, entry: &mut EncryptedEntry) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| PsstError::storage("failed to begin transaction", e))?;

        let password = BASE64.encode(&entry.password);
        let created_at = format_timestamp(&entry.created_at);
        let modified_at = format_timestamp(&entry.modified_at);
        let last_used_at = entry.last_used_at.as_ref().map(format_timestamp);

        let id = match entry.id {
            None => {
                tx.execute(
                    "INSERT INTO entries
                     (service, username, password, url, notes, created_at, modified_at, last_used_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        entry.service,
                        entry.username,
                        password,
                        entry.url,
                        entry.notes,
                        created_at,
                        modified_at,
                        last_used_at
                    ],
                )
                .map_err(|e| write_error(e, &entry.service, "failed to insert entry"))?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                let changed = tx
                    .execute(
                        "UPDATE entries SET
                         service = ?1, username = ?2, password = ?3, url = ?4, notes = ?5,
                         created_at = ?6, modified_at = ?7, last_used_at = ?8
                         WHERE id = ?9",
                        params![
                            entry.service,
                            entry.username,
                            password,
                            entry.url,
                            entry.notes,
                            created_at,
                            modified_at,
                            last_used_at,
                            id
                        ],
                    )
                    .map_err(|e| write_error(e, &entry.service, "failed to update entry"))?;
                if changed == 0 {
                    return Err(PsstError::NotFound(format!("entry #{id}")));
                }
                id
            }
        };

        tx.execute("DELETE FROM tags WHERE entry_id = ?1", params![id])
            .map_err(|e| PsstError::storage("failed to delete existing tags", e))?;

        for tag in entry.tags.iter().filter(|t| !t.trim().is_empty()) {
            tx.execute(
                "INSERT INTO tags (entry_id, tag) VALUES (?1, ?2)",
                params![id, tag],
            )
            .map_err(|e| PsstError::storage("failed to insert tag", e))?;
        }

        tx.commit()
            .map_err(|e| PsstError::storage("failed to commit entry", e))?;

        // Only after commit: a rolled-back insert must not leave an id behind.
        entry.id = Some(id);
        debug!(service = %entry.service, id, "saved entry");
        Ok(())
    }

    fn get_entry(&self, service: &str) -> Result<Option<EncryptedEntry>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE service = ?1"),
                params![service],
                EntryRow::from_row,
            )
            .optional()
            .map_err(|e| PsstError::storage("failed to get entry", e))?;

        match row {
            Some(row) => {
                let tags = self.tags_for(row.id)?;
                Ok(Some(row.into_entry(tags)?))
            }
            None => Ok(None),
        }
    }

    fn list_entries(&self) -> Result<Vec<EncryptedEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY service"
            ))
            .map_err(|e| PsstError::storage("failed to query entries", e))?;

        let rows = stmt
            .query_map([], EntryRow::from_row)
            .map_err(|e| PsstError::storage("failed to query entries", e))?;

        let mut raw = Vec::new();
        for row in rows {
            raw.push(row.map_err(|e| PsstError::storage("failed to read entry", e))?);
        }

        raw.into_iter()
            .map(|row| {
                let tags = self.tags_for(row.id)?;
                row.into_entry(tags)
            })
            .collect()
    }

    fn delete_entry(&mut self, service: &str) -> Result<bool> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| PsstError::storage("failed to begin transaction", e))?;

        let id: Option<i64> = tx
            .query_row(
                "SELECT id FROM entries WHERE service = ?1",
                params![service],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| PsstError::storage("failed to look up entry", e))?;

        let Some(id) = id else {
            return Ok(false);
        };

        tx.execute("DELETE FROM tags WHERE entry_id = ?1", params![id])
            .map_err(|e| PsstError::storage("failed to delete tags", e))?;
        tx.execute("DELETE FROM entries WHERE id = ?1", params![id])
            .map_err(|e| PsstError::storage("failed to delete entry", e))?;

        tx.commit()
            .map_err(|e| PsstError::storage("failed to commit delete", e))?;

        debug!(service, id, "deleted entry");
        Ok(true)
    }

    fn save_metadata(&mut self, metadata: &VaultMetadata) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| PsstError::storage("failed to begin transaction", e))?;

        let rows = [
            (META_MASTER_HASH, metadata.master_hash.clone()),
            (META_CREATED_AT, format_timestamp(&metadata.created_at)),
            (META_LAST_ACCESS, format_timestamp(&metadata.last_access)),
            (META_VERSION, metadata.version.clone()),
        ];

        for (key, value) in &rows {
            tx.execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| PsstError::storage("failed to save vault metadata", e))?;
        }

        tx.commit()
            .map_err(|e| PsstError::storage("failed to commit vault metadata", e))
    }

    fn get_metadata(&self) -> Result<Option<VaultMetadata>> {
        if !self.has_table("metadata")? {
            return Ok(None);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM metadata")
            .map_err(|e| PsstError::storage("failed to get vault metadata", e))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| PsstError::storage("failed to get vault metadata", e))?;

        let mut values = HashMap::new();
        for row in rows {
            let (key, value) =
                row.map_err(|e| PsstError::storage("failed to read vault metadata", e))?;
            values.insert(key, value);
        }

        if values.is_empty() {
            return Ok(None);
        }

        let mut take = |key: &str| {
            values
                .remove(key)
                .ok_or_else(|| PsstError::InvalidStoredData(format!("metadata '{key}' is missing")))
        };

        let master_hash = take(META_MASTER_HASH)?;
        let created_at = parse_timestamp(&take(META_CREATED_AT)?)?;
        let last_access = parse_timestamp(&take(META_LAST_ACCESS)?)?;
        let version = take(META_VERSION)?;

        Ok(Some(VaultMetadata {
            master_hash,
            created_at,
            last_access,
            version,
        }))
    }

    fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| PsstError::storage("failed to close database", e))
    }
}

/// One `entries` row before its text columns are decoded.
struct EntryRow {
    id: i64,
    service: String,
    username: Option<String>,
    password: String,
    url: Option<String>,
    notes: Option<String>,
    created_at: String,
    modified_at: String,
    last_used_at: Option<String>,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            service: row.get(1)?,
            username: row.get(2)?,
            password: row.get(3)?,
            url: row.get(4)?,
            notes: row.get(5)?,
            created_at: row.get(6)?,
            modified_at: row.get(7)?,
            last_used_at: row.get(8)?,
        })
    }

    fn into_entry(self, tags: BTreeSet<String>) -> Result<EncryptedEntry> {
        let password = BASE64.decode(&self.password).map_err(|_| {
            PsstError::InvalidStoredData(format!(
                "password for '{}' is not valid base64",
                self.service
            ))
        })?;

        Ok(EncryptedEntry {
            id: Some(self.id),
            service: self.service,
            username: self.username.unwrap_or_default(),
            password,
            url: self.url.unwrap_or_default(),
            notes: self.notes.unwrap_or_default(),
            tags,
            created_at: parse_timestamp(&self.created_at)?,
            modified_at: parse_timestamp(&self.modified_at)?,
            last_used_at: self.last_used_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PsstError::InvalidStoredData(format!("bad timestamp '{raw}': {e}")))
}

/// A UNIQUE violation on `service` means the entry already exists.
fn write_error(e: rusqlite::Error, service: &str, context: &'static str) -> PsstError {
    match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => PsstError::EntryAlreadyExists(service.to_string()),
        _ => PsstError::storage(context, e),
    }
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(dir)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(dir)
    }
}

//! Storage operations for content records
//!
//! Content rows are flat and path-addressed; `(owner_id, path)` is unique
//! and enforced here. Directories have no row of their own unless they
//! would otherwise be empty, in which case a sentinel placeholder row
//! keeps them visible. Queries are owner-scoped throughout, so a missing
//! path and a foreign-owned path fail identically.

use std::path::PathBuf;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use uuid::Uuid;

use crate::tags::sanitize_tags;

use super::frontmatter;
use super::models::{ContentRecord, TaggedFile, TreeNode, SENTINEL_NAME};
use super::tree::compile_tree;

#[derive(Error, Debug)]
pub enum ContentStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("content not found: {path}")]
    NotFound { path: String },

    #[error("a record already exists at {path}")]
    Conflict { path: String },

    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, ContentStoreError>;

/// Storage manager for path-addressed content records
pub struct ContentStore {
    conn: Connection,
}

impl ContentStore {
    /// Open (or create) the content store at the given path.
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open a store backed by an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS content_records (
                owner_id TEXT NOT NULL,
                path TEXT NOT NULL,
                body TEXT NOT NULL,
                is_sentinel INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (owner_id, path)
            );
            "#,
        )
    }

    // ==================== Record Operations ====================

    /// Insert a record, failing if the path is already taken.
    pub fn create_record(&self, owner_id: Uuid, path: &[String], body: &str) -> Result<ContentRecord> {
        let record = ContentRecord {
            owner_id,
            path: path.to_vec(),
            body: body.to_string(),
            is_sentinel: false,
            updated_at: Utc::now(),
        };

        let inserted = self.conn.execute(
            "INSERT INTO content_records (owner_id, path, body, is_sentinel, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![
                owner_id.to_string(),
                join_path(path),
                record.body,
                ts_to_sql(record.updated_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(ContentStoreError::Conflict { path: join_path(path) });
            }
            Err(e) => return Err(e.into()),
        }

        self.clear_ancestor_sentinels(owner_id, path)?;
        Ok(record)
    }

    /// Insert or replace the body at a path.
    pub fn upsert_record(&self, owner_id: Uuid, path: &[String], body: &str) -> Result<ContentRecord> {
        let record = ContentRecord {
            owner_id,
            path: path.to_vec(),
            body: body.to_string(),
            is_sentinel: false,
            updated_at: Utc::now(),
        };

        self.conn.execute(
            "INSERT INTO content_records (owner_id, path, body, is_sentinel, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4)
             ON CONFLICT (owner_id, path) DO UPDATE SET
                 body = excluded.body,
                 is_sentinel = 0,
                 updated_at = excluded.updated_at",
            params![
                owner_id.to_string(),
                join_path(path),
                record.body,
                ts_to_sql(record.updated_at),
            ],
        )?;

        self.clear_ancestor_sentinels(owner_id, path)?;
        Ok(record)
    }

    /// Get the record at a path.
    pub fn get_record(&self, owner_id: Uuid, path: &[String]) -> Result<ContentRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT owner_id, path, body, is_sentinel, updated_at
                 FROM content_records WHERE owner_id = ?1 AND path = ?2",
                params![owner_id.to_string(), join_path(path)],
                RecordRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => row.into_record(),
            None => Err(ContentStoreError::NotFound { path: join_path(path) }),
        }
    }

    /// Delete the record at a path.
    pub fn delete_record(&self, owner_id: Uuid, path: &[String]) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM content_records WHERE owner_id = ?1 AND path = ?2",
            params![owner_id.to_string(), join_path(path)],
        )?;
        if changed == 0 {
            return Err(ContentStoreError::NotFound { path: join_path(path) });
        }
        Ok(())
    }

    /// List every record of an owner, path-sorted. This is the input set
    /// for [`compile_tree`].
    pub fn list_records(&self, owner_id: Uuid) -> Result<Vec<ContentRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT owner_id, path, body, is_sentinel, updated_at
             FROM content_records WHERE owner_id = ?1 ORDER BY path",
        )?;
        let rows = stmt.query_map(params![owner_id.to_string()], RecordRow::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    // ==================== Folder Operations ====================

    /// Make an empty directory visible by writing its sentinel row.
    /// Creating a folder that already exists is a no-op.
    pub fn create_folder(&self, owner_id: Uuid, dir: &[String]) -> Result<()> {
        if dir.is_empty() {
            return Err(ContentStoreError::NotFound { path: String::new() });
        }

        let mut path = dir.to_vec();
        path.push(SENTINEL_NAME.to_string());

        self.conn.execute(
            "INSERT OR IGNORE INTO content_records (owner_id, path, body, is_sentinel, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![
                owner_id.to_string(),
                join_path(&path),
                "placeholder for an empty directory",
                ts_to_sql(Utc::now()),
            ],
        )?;
        Ok(())
    }

    /// Delete a directory: its sentinel and every record underneath it.
    /// Returns the number of rows removed.
    pub fn delete_folder(&self, owner_id: Uuid, dir: &[String]) -> Result<usize> {
        let mut sentinel = dir.to_vec();
        sentinel.push(SENTINEL_NAME.to_string());

        let removed = self.conn.execute(
            "DELETE FROM content_records
             WHERE owner_id = ?1 AND (path = ?2 OR path LIKE ?3)",
            params![
                owner_id.to_string(),
                join_path(&sentinel),
                format!("{}/%", join_path(dir)),
            ],
        )?;

        log::debug!("deleted folder {:?}: {} rows", join_path(dir), removed);
        Ok(removed)
    }

    /// Drop sentinel rows for every ancestor directory of a freshly
    /// created record; a directory with real content no longer needs its
    /// placeholder.
    fn clear_ancestor_sentinels(&self, owner_id: Uuid, path: &[String]) -> Result<()> {
        for depth in 1..path.len() {
            let mut sentinel = path[..depth].to_vec();
            sentinel.push(SENTINEL_NAME.to_string());
            self.conn.execute(
                "DELETE FROM content_records
                 WHERE owner_id = ?1 AND path = ?2 AND is_sentinel = 1",
                params![owner_id.to_string(), join_path(&sentinel)],
            )?;
        }
        Ok(())
    }

    // ==================== Derived Views ====================

    /// Compile the owner's full navigation forest.
    pub fn tree(&self, owner_id: Uuid) -> Result<Vec<TreeNode>> {
        let records = self.list_records(owner_id)?;
        Ok(compile_tree(&records))
    }

    /// Every distinct tag across the owner's files, sorted by name.
    pub fn list_tags(&self, owner_id: Uuid) -> Result<Vec<String>> {
        let mut tags = std::collections::BTreeSet::new();
        for record in self.list_records(owner_id)? {
            if record.is_sentinel {
                continue;
            }
            tags.extend(frontmatter::parse_meta(&record.body).tags);
        }
        Ok(tags.into_iter().collect())
    }

    /// All files carrying a tag, with their display titles. The title
    /// falls back to the filename when the metadata block has none.
    pub fn list_by_tag(&self, owner_id: Uuid, tag: &str) -> Result<Vec<TaggedFile>> {
        let wanted = sanitize_tags([tag]);
        let Some(wanted) = wanted.first() else {
            return Ok(Vec::new());
        };

        let mut files = Vec::new();
        for record in self.list_records(owner_id)? {
            if record.is_sentinel {
                continue;
            }
            let meta = frontmatter::parse_meta(&record.body);
            if !meta.tags.iter().any(|t| t == wanted) {
                continue;
            }
            let title = meta
                .title
                .or_else(|| record.path.last().cloned())
                .unwrap_or_default();
            files.push(TaggedFile { path: record.path, title });
        }
        Ok(files)
    }
}

struct RecordRow {
    owner_id: String,
    path: String,
    body: String,
    is_sentinel: bool,
    updated_at: String,
}

impl RecordRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            owner_id: row.get(0)?,
            path: row.get(1)?,
            body: row.get(2)?,
            is_sentinel: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn into_record(self) -> Result<ContentRecord> {
        Ok(ContentRecord {
            owner_id: Uuid::parse_str(&self.owner_id)
                .map_err(|_| ContentStoreError::Corrupt(format!("uuid: {}", self.owner_id)))?,
            path: split_path(&self.path),
            body: self.body,
            is_sentinel: self.is_sentinel,
            updated_at: ts_from_sql(&self.updated_at)?,
        })
    }
}

fn join_path(path: &[String]) -> String {
    path.join("/")
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/').map(|s| s.to_string()).collect()
}

fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn ts_from_sql(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| ContentStoreError::Corrupt(format!("timestamp: {s}")))
}

//! SQLite operations for media files and file actions.

use super::types::{
    ActionStatus, ActionType, DuplicateGroup, FileAction, MediaFile, NewFileAction,
};
use crate::error::StoreError;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS media_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    path TEXT NOT NULL UNIQUE,
    content_hash TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    mod_time INTEGER NOT NULL,
    taken_at TEXT,
    camera_make TEXT,
    camera_model TEXT,
    mime_type TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_media_hash ON media_files(content_hash);
CREATE INDEX IF NOT EXISTS idx_media_taken_at ON media_files(taken_at);

CREATE TABLE IF NOT EXISTS file_actions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    media_id INTEGER,
    run_id TEXT,
    source_path TEXT NOT NULL,
    target_path TEXT NOT NULL,
    action_type TEXT NOT NULL,
    status TEXT NOT NULL,
    error_msg TEXT,
    executed_at TEXT,
    content_hash TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    FOREIGN KEY(media_id) REFERENCES media_files(id)
);

CREATE INDEX IF NOT EXISTS idx_actions_status ON file_actions(status);

CREATE TRIGGER IF NOT EXISTS trg_media_updated
AFTER UPDATE ON media_files
FOR EACH ROW
BEGIN
    UPDATE media_files SET updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE id = NEW.id;
END;
";

const MEDIA_COLUMNS: &str = "id, path, content_hash, size_bytes, mod_time, taken_at, \
                             camera_make, camera_model, mime_type";

const ACTION_COLUMNS: &str = "id, media_id, run_id, source_path, target_path, action_type, \
                              status, error_msg, executed_at, content_hash, created_at";

/// SQLite has historically capped bound parameters at 999
const MAX_IN_PARAMS: usize = 900;

/// Persistent store for media rows and the action ledger
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Store {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;

        Self::bootstrap(conn, path.to_path_buf())
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::OpenFailed {
            path: PathBuf::from(":memory:"),
            reason: e.to_string(),
        })?;
        Self::bootstrap(conn, PathBuf::from(":memory:"))
    }

    fn bootstrap(conn: Connection, db_path: PathBuf) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned {
            path: self.db_path.clone(),
        })
    }

    /// Insert a media row or refresh the one already stored for its path.
    ///
    /// Returns the row id, which is stable across re-scans of the same path.
    pub fn upsert_media_file(&self, file: &MediaFile) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        let id = conn.query_row(
            "INSERT INTO media_files
             (path, content_hash, size_bytes, mod_time, taken_at, camera_make, camera_model, mime_type)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                content_hash = excluded.content_hash,
                size_bytes = excluded.size_bytes,
                mod_time = excluded.mod_time,
                taken_at = excluded.taken_at,
                camera_make = excluded.camera_make,
                camera_model = excluded.camera_model,
                mime_type = excluded.mime_type
             RETURNING id",
            params![
                path_to_sql(&file.path),
                file.content_hash,
                file.size_bytes as i64,
                file.mod_time.timestamp(),
                file.taken_at.map(format_timestamp),
                file.camera_make,
                file.camera_model,
                file.mime_type,
            ],
            |row| row.get::<_, i64>(0),
        )?;

        Ok(id)
    }

    /// Fetch one media row by path
    pub fn get_media_by_path(&self, path: &Path) -> Result<Option<MediaFile>, StoreError> {
        let conn = self.lock()?;

        let file = conn
            .query_row(
                &format!("SELECT {MEDIA_COLUMNS} FROM media_files WHERE path = ?"),
                [path_to_sql(path)],
                media_from_row,
            )
            .optional()?;

        Ok(file)
    }

    /// Fetch media rows keyed by id. Unknown ids are simply absent.
    pub fn get_media_by_ids(&self, ids: &[i64]) -> Result<HashMap<i64, MediaFile>, StoreError> {
        let mut result = HashMap::with_capacity(ids.len());
        if ids.is_empty() {
            return Ok(result);
        }

        let conn = self.lock()?;

        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let mut stmt = conn.prepare(&format!(
                "SELECT {MEDIA_COLUMNS} FROM media_files WHERE id IN ({placeholders})"
            ))?;

            let rows = stmt.query_map(params_from_iter(chunk.iter()), media_from_row)?;
            for row in rows {
                let file = row?;
                result.insert(file.id, file);
            }
        }

        Ok(result)
    }

    /// Number of media rows
    pub fn count_media(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM media_files", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(count as usize)
    }

    /// Every content hash held by two or more rows, with its members.
    ///
    /// Groups are ordered by hash, members by insertion id.
    pub fn list_duplicate_groups(&self) -> Result<Vec<DuplicateGroup>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {MEDIA_COLUMNS}
             FROM media_files
             WHERE content_hash IN (
                 SELECT content_hash FROM media_files GROUP BY content_hash HAVING COUNT(*) > 1
             )
             ORDER BY content_hash, id"
        ))?;

        let mut groups: Vec<DuplicateGroup> = Vec::new();
        for row in stmt.query_map([], media_from_row)? {
            let file = row?;
            match groups.last_mut() {
                Some(group) if group.hash == file.content_hash => group.files.push(file),
                _ => groups.push(DuplicateGroup {
                    hash: file.content_hash.clone(),
                    files: vec![file],
                }),
            }
        }

        Ok(groups)
    }

    /// Point a media row at its new location after a move
    pub fn update_media_path(&self, id: i64, new_path: &Path) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE media_files SET path = ? WHERE id = ?",
            params![path_to_sql(new_path), id],
        )?;

        if updated == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    /// Record an action as pending before the filesystem is touched
    pub fn create_action(&self, action: &NewFileAction) -> Result<i64, StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO file_actions
             (media_id, run_id, source_path, target_path, action_type, status, content_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                action.media_id,
                action.run_id,
                path_to_sql(&action.source_path),
                path_to_sql(&action.target_path),
                action.action_type.as_str(),
                ActionStatus::Pending.as_str(),
                action.content_hash,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Move a pending action to its terminal state.
    ///
    /// A row that already left `pending` is never rewritten.
    pub fn mark_action(
        &self,
        id: i64,
        status: ActionStatus,
        error_msg: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;

        let updated = conn.execute(
            "UPDATE file_actions SET status = ?, error_msg = ?, executed_at = ?
             WHERE id = ? AND status = ?",
            params![
                status.as_str(),
                error_msg,
                format_timestamp(Utc::now()),
                id,
                ActionStatus::Pending.as_str(),
            ],
        )?;

        if updated == 0 {
            return Err(StoreError::ActionNotPending { id });
        }
        Ok(())
    }

    /// Fetch one ledger row
    pub fn get_action(&self, id: i64) -> Result<Option<FileAction>, StoreError> {
        let conn = self.lock()?;

        let action = conn
            .query_row(
                &format!("SELECT {ACTION_COLUMNS} FROM file_actions WHERE id = ?"),
                [id],
                action_from_row,
            )
            .optional()?;

        Ok(action)
    }

    /// Ledger rows in recording order, with pagination
    pub fn list_actions(&self, limit: usize, offset: usize) -> Result<Vec<FileAction>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM file_actions ORDER BY id LIMIT ? OFFSET ?"
        ))?;

        let actions = stmt
            .query_map(params![limit as i64, offset as i64], action_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(actions)
    }

    /// Newest ledger rows first
    pub fn list_recent_actions(&self, limit: usize) -> Result<Vec<FileAction>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM file_actions ORDER BY id DESC LIMIT ?"
        ))?;

        let actions = stmt
            .query_map([limit as i64], action_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(actions)
    }

    /// Ledger rows that never reached a terminal state.
    ///
    /// Anything listed here belongs to a run that was interrupted between
    /// recording the action and resolving it.
    pub fn list_pending_actions(&self) -> Result<Vec<FileAction>, StoreError> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {ACTION_COLUMNS} FROM file_actions WHERE status = ? ORDER BY id"
        ))?;

        let actions = stmt
            .query_map([ActionStatus::Pending.as_str()], action_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(actions)
    }
}

fn path_to_sql(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(
    idx: usize,
    text: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    text.map(|t| parse_timestamp(idx, &t)).transpose()
}

fn media_from_row(row: &Row<'_>) -> rusqlite::Result<MediaFile> {
    let path: String = row.get(1)?;
    let size_bytes: i64 = row.get(3)?;
    let mod_secs: i64 = row.get(4)?;
    let taken_at: Option<String> = row.get(5)?;

    let mod_time = Utc.timestamp_opt(mod_secs, 0).single().ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Integer,
            format!("invalid mod_time {mod_secs}").into(),
        )
    })?;

    Ok(MediaFile {
        id: row.get(0)?,
        path: PathBuf::from(path),
        content_hash: row.get(2)?,
        size_bytes: size_bytes.max(0) as u64,
        mod_time,
        taken_at: parse_optional_timestamp(5, taken_at)?,
        camera_make: row.get(6)?,
        camera_model: row.get(7)?,
        mime_type: row.get(8)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<FileAction> {
    let action_type: String = row.get(5)?;
    let status: String = row.get(6)?;
    let executed_at: Option<String> = row.get(8)?;
    let created_at: String = row.get(10)?;

    Ok(FileAction {
        id: row.get(0)?,
        media_id: row.get(1)?,
        run_id: row.get(2)?,
        source_path: PathBuf::from(row.get::<_, String>(3)?),
        target_path: PathBuf::from(row.get::<_, String>(4)?),
        action_type: ActionType::parse(&action_type).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                format!("unknown action type {action_type}").into(),
            )
        })?,
        status: ActionStatus::parse(&status).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Text,
                format!("unknown action status {status}").into(),
            )
        })?,
        error_msg: row.get(7)?,
        executed_at: parse_optional_timestamp(8, executed_at)?,
        content_hash: row.get(9)?,
        created_at: parse_timestamp(10, &created_at)?,
    })
}

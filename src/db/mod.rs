mod schema;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite persistence for child progress and log entries.
///
/// Cloning is cheap and shares the same connection. Every mutation runs as a
/// single `BEGIN IMMEDIATE` transaction while holding the connection lock, so
/// a read-modify-write of a child's record can never interleave with another.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// A child's progress while a mutation is in flight.
///
/// Changes made here are written back only if the mutation closure returns
/// `Ok`; otherwise the transaction is rolled back and nothing is stored.
#[derive(Debug)]
pub struct PendingProgress {
    pub progress: ChildProgress,
    entries: Vec<Entry>,
}

impl PendingProgress {
    /// Queue an entry to be inserted in the same transaction.
    pub fn record_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }
}

impl Database {
    pub fn open(path: PathBuf) -> anyhow::Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> anyhow::Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        schema::run_migrations(&conn)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageUnavailable("database lock poisoned".to_string()))
    }

    // ============================================================
    // Progress operations
    // ============================================================

    /// The stored progress of a child, or `None` if the child has no record.
    pub fn get_progress(&self, child_id: &str) -> Result<Option<ChildProgress>> {
        let conn = self.conn()?;
        read_progress(&conn, child_id)
    }

    /// Atomically read, modify and write a child's progress.
    ///
    /// A child without a record starts from [`ChildProgress::new`]. Lesson ids
    /// added to `completed_lesson_ids` are stored with `at` as their completion
    /// time; entries queued with [`PendingProgress::record_entry`] are inserted
    /// alongside. If `mutate` fails, nothing is written.
    pub fn mutate_progress<T>(
        &self,
        child_id: &str,
        at: DateTime<Utc>,
        mutate: impl FnOnce(&mut PendingProgress) -> Result<T>,
    ) -> Result<(ChildProgress, T)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let before = read_progress(&tx, child_id)?.unwrap_or_else(|| ChildProgress::new(child_id));
        let mut pending = PendingProgress {
            progress: before.clone(),
            entries: Vec::new(),
        };

        let outcome = mutate(&mut pending)?;
        let PendingProgress { progress, entries } = pending;
        let now = at.to_rfc3339();

        tx.execute(
            "INSERT INTO child_progress (child_id, total_xp, current_streak_days, last_active_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(child_id) DO UPDATE SET
                total_xp = excluded.total_xp,
                current_streak_days = excluded.current_streak_days,
                last_active_date = excluded.last_active_date,
                updated_at = excluded.updated_at",
            (
                child_id,
                progress.total_xp,
                progress.current_streak_days,
                progress.last_active_date.map(format_date),
                &now,
            ),
        )?;

        for lesson_id in progress
            .completed_lesson_ids
            .difference(&before.completed_lesson_ids)
        {
            tx.execute(
                "INSERT OR IGNORE INTO lesson_completions (child_id, lesson_id, completed_at)
                 VALUES (?, ?, ?)",
                (child_id, lesson_id, &now),
            )?;
        }

        for entry in &entries {
            insert_entry(&tx, entry)?;
        }

        tx.commit()?;

        Ok((progress, outcome))
    }

    // ============================================================
    // Entry operations
    // ============================================================

    /// Most recent entries first.
    pub fn get_entries(&self, child_id: &str, limit: u32) -> Result<Vec<Entry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, child_id, kind, context, selections, total_xp, logged_at
             FROM log_entries WHERE child_id = ? ORDER BY logged_at DESC, rowid DESC LIMIT ?",
        )?;

        let rows = stmt
            .query_map((child_id, limit), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, child_id, kind, context, selections, total_xp, logged_at)| -> Result<Entry> {
                Ok(Entry {
                    id: parse_uuid(&id)?,
                    child_id,
                    kind: LogKind::from_str(&kind).ok_or_else(|| {
                        Error::StorageUnavailable(format!("unknown entry kind {:?}", kind))
                    })?,
                    context: context.map(|c| serde_json::from_str(&c)).transpose()?,
                    selections: serde_json::from_str(&selections)?,
                    total_xp,
                    logged_at: parse_datetime(&logged_at)?,
                })
            })
            .collect()
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn default_path() -> anyhow::Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "biteburst")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("biteburst.db"))
}

fn read_progress(conn: &Connection, child_id: &str) -> Result<Option<ChildProgress>> {
    let row = conn
        .query_row(
            "SELECT total_xp, current_streak_days, last_active_date
             FROM child_progress WHERE child_id = ?",
            [child_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((total_xp, current_streak_days, last_active_date)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT lesson_id FROM lesson_completions WHERE child_id = ?")?;
    let completed_lesson_ids = stmt
        .query_map([child_id], |row| row.get::<_, String>(0))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(Some(ChildProgress {
        child_id: child_id.to_string(),
        completed_lesson_ids,
        total_xp,
        current_streak_days,
        last_active_date: last_active_date.as_deref().map(parse_date).transpose()?,
    }))
}

fn insert_entry(conn: &Connection, entry: &Entry) -> Result<()> {
    conn.execute(
        "INSERT INTO log_entries (id, child_id, kind, context, selections, total_xp, logged_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        (
            entry.id.to_string(),
            &entry.child_id,
            entry.kind.as_str(),
            entry.context.map(|c| serde_json::to_string(&c)).transpose()?,
            serde_json::to_string(&entry.selections)?,
            entry.total_xp,
            entry.logged_at.to_rfc3339(),
        ),
    )?;
    Ok(())
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| corrupt("last_active_date", s, e))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| corrupt("entry id", s, e))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt("logged_at", s, e))
}

fn corrupt(column: &str, value: &str, e: impl std::fmt::Display) -> Error {
    Error::StorageUnavailable(format!("corrupt stored {} {:?}: {}", column, value, e))
}

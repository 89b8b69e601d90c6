//! Per-child progress rules on top of the database.
//!
//! The store owns the award-once and once-per-day streak rules. Each mutation
//! runs inside [`Database::mutate_progress`], so the membership check, the XP
//! award, the streak update and the write form one atomic step per child.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::*;
use crate::progression;

/// Default page size for entry history.
pub const DEFAULT_ENTRY_LIMIT: u32 = 50;

#[derive(Clone)]
pub struct ProgressStore {
    db: Database,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
}

impl ProgressStore {
    pub fn new(db: Database, catalog: Arc<Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self { db, catalog, clock }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current progress of a child. Children never seen before get zeroed
    /// defaults.
    pub fn load(&self, child_id: &str) -> Result<ChildProgress> {
        validate_child_id(child_id)?;
        Ok(self
            .db
            .get_progress(child_id)?
            .unwrap_or_else(|| ChildProgress::new(child_id)))
    }

    /// The derived lesson path for a child.
    pub fn path(&self, child_id: &str) -> Result<PathView> {
        let progress = self.load(child_id)?;
        Ok(progression::summarize(self.catalog.lessons(), &progress))
    }

    /// Mark a lesson completed.
    ///
    /// Completing the same lesson again is accepted and awards nothing, but
    /// still counts as activity for the streak.
    pub fn complete_lesson(&self, child_id: &str, lesson_id: &str) -> Result<LessonCompletion> {
        validate_child_id(child_id)?;
        let lesson = self
            .catalog
            .lesson(lesson_id)
            .map_err(|_| Error::UnknownLesson(lesson_id.to_string()))?;
        let today = self.clock.today();

        let (progress, (xp_awarded, first_completion)) =
            self.db
                .mutate_progress(child_id, self.clock.now(), |pending| {
                    let progress = &mut pending.progress;
                    let first = progress.completed_lesson_ids.insert(lesson.id.clone());
                    let awarded = if first { lesson.xp_reward } else { 0 };
                    progress.total_xp = progress.total_xp.saturating_add(i64::from(awarded));
                    advance_streak(progress, today);
                    Ok((awarded, first))
                })?;

        tracing::info!(
            child_id,
            lesson_id,
            xp_awarded,
            total_xp = progress.total_xp,
            streak = progress.current_streak_days,
            "Lesson completed"
        );

        Ok(LessonCompletion {
            progress,
            xp_awarded,
            first_completion,
        })
    }

    /// Append a committed logging entry and award its XP.
    pub fn append_entry(&self, child_id: &str, new_entry: NewEntry) -> Result<EntryReceipt> {
        validate_child_id(child_id)?;
        validate_entry(&new_entry)?;

        let today = self.clock.today();
        let entry = Entry {
            id: Uuid::new_v4(),
            child_id: child_id.to_string(),
            kind: new_entry.kind,
            context: new_entry.context,
            selections: new_entry.selections,
            total_xp: new_entry.total_xp,
            logged_at: self.clock.now(),
        };

        let (progress, ()) = self
            .db
            .mutate_progress(child_id, entry.logged_at, |pending| {
                pending.progress.total_xp = pending
                    .progress
                    .total_xp
                    .checked_add(entry.total_xp)
                    .ok_or_else(|| {
                        Error::InvalidEntry(format!(
                            "adding {} XP would overflow the child's total",
                            entry.total_xp
                        ))
                    })?;
                advance_streak(&mut pending.progress, today);
                pending.record_entry(entry.clone());
                Ok(())
            })?;

        tracing::info!(
            child_id,
            entry_id = %entry.id,
            kind = entry.kind.as_str(),
            xp = entry.total_xp,
            total_xp = progress.total_xp,
            streak = progress.current_streak_days,
            "Entry appended"
        );

        Ok(EntryReceipt { entry, progress })
    }

    /// Logged entries of a child, most recent first.
    pub fn entries(&self, child_id: &str, limit: Option<u32>) -> Result<Vec<Entry>> {
        validate_child_id(child_id)?;
        self.db
            .get_entries(child_id, limit.unwrap_or(DEFAULT_ENTRY_LIMIT))
    }
}

/// Apply the daily streak rule for activity on `today`.
///
/// Yesterday extends the streak, today leaves it alone, anything else
/// (including no previous activity or a date after `today`) restarts it at 1.
pub fn advance_streak(progress: &mut ChildProgress, today: NaiveDate) {
    match progress.last_active_date {
        Some(last) if last == today => {}
        Some(last) if last.succ_opt() == Some(today) => {
            progress.current_streak_days = progress.current_streak_days.saturating_add(1);
        }
        _ => progress.current_streak_days = 1,
    }
    progress.last_active_date = Some(today);
}

fn validate_child_id(child_id: &str) -> Result<()> {
    if child_id.trim().is_empty() {
        return Err(Error::InvalidChildId(child_id.to_string()));
    }
    Ok(())
}

fn validate_entry(entry: &NewEntry) -> Result<()> {
    if entry.total_xp < 0 {
        return Err(Error::InvalidEntry(format!(
            "total_xp must not be negative, got {}",
            entry.total_xp
        )));
    }
    if entry.selections.is_empty() {
        return Err(Error::InvalidEntry("an entry needs at least one selection".to_string()));
    }
    let expected = selections_xp(&entry.selections).ok_or_else(|| {
        Error::InvalidEntry("selection XP does not fit in a 64-bit total".to_string())
    })?;
    if expected != entry.total_xp {
        return Err(Error::InvalidEntry(format!(
            "total_xp {} does not match its selections ({})",
            entry.total_xp, expected
        )));
    }
    Ok(())
}

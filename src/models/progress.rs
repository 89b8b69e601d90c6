use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Durable progress for one child.
///
/// A record is created lazily: loading a child that was never seen returns
/// [`ChildProgress::new`] with everything zeroed. Records are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildProgress {
    pub child_id: String,
    pub completed_lesson_ids: BTreeSet<String>,
    pub total_xp: i64,
    /// Consecutive calendar days with at least one recorded activity.
    pub current_streak_days: u32,
    /// Calendar day (in the child's timezone) of the last recorded activity.
    pub last_active_date: Option<NaiveDate>,
}

impl ChildProgress {
    pub fn new(child_id: impl Into<String>) -> Self {
        Self {
            child_id: child_id.into(),
            completed_lesson_ids: BTreeSet::new(),
            total_xp: 0,
            current_streak_days: 0,
            last_active_date: None,
        }
    }

    pub fn has_completed(&self, lesson_id: &str) -> bool {
        self.completed_lesson_ids.contains(lesson_id)
    }
}

/// Result of completing a lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonCompletion {
    pub progress: ChildProgress,
    /// XP added by this call. Zero when the lesson was already completed.
    pub xp_awarded: u32,
    pub first_completion: bool,
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A lesson on the learning path.
///
/// Lessons are static content: they are loaded once with the catalog and
/// never mutated. The path sequence is defined by `order`; lessons that share
/// an `order` sit on the same tier and are sorted by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LessonDefinition {
    pub id: String,
    pub order: i32,
    pub title: String,
    pub icon: String,
    /// XP granted the first time a child completes this lesson.
    pub xp_reward: u32,
}

/// How a lesson node is shown on the path.
///
/// - `Locked`: An earlier lesson still needs to be completed
/// - `Unlocked`: Playable, on the same tier as the current lesson
/// - `Current`: The next lesson the child should play
/// - `Completed`: Already finished at least once
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LessonState {
    Locked,
    Unlocked,
    Current,
    Completed,
}

impl LessonState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Current => "current",
            Self::Completed => "completed",
        }
    }
}

/// The display state of one lesson for one child. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedLessonState {
    pub lesson_id: String,
    pub state: LessonState,
}

/// Everything the path screen needs for one child.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathView {
    pub child_id: String,
    pub lessons: Vec<DerivedLessonState>,
    /// `None` once every lesson is completed, or when there are no lessons.
    pub current_lesson_id: Option<String>,
    pub completed_count: usize,
    pub total_lessons: usize,
    pub total_xp: i64,
    pub current_streak_days: u32,
    pub last_active_date: Option<NaiveDate>,
}

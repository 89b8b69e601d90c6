//! Lesson path state, derived from progress on every read.
//!
//! Node states are never stored. Keeping them a function of
//! `completed_lesson_ids` means a stored flag can never disagree with the
//! completions that produced it.

use crate::models::*;

/// Classify every lesson of `lessons` (already in path order) for one child.
///
/// The first non-completed lesson is `Current`. Non-completed lessons on the
/// same tier (same `order`) as the current one are `Unlocked`, since every
/// lesson with a smaller order is completed. Everything else that is not
/// completed is `Locked`.
pub fn derive(lessons: &[LessonDefinition], progress: &ChildProgress) -> Vec<DerivedLessonState> {
    let mut current_tier: Option<i32> = None;

    lessons
        .iter()
        .map(|lesson| {
            let state = if progress.has_completed(&lesson.id) {
                LessonState::Completed
            } else {
                match current_tier {
                    None => {
                        current_tier = Some(lesson.order);
                        LessonState::Current
                    }
                    Some(tier) if tier == lesson.order => LessonState::Unlocked,
                    Some(_) => LessonState::Locked,
                }
            };

            DerivedLessonState {
                lesson_id: lesson.id.clone(),
                state,
            }
        })
        .collect()
}

/// Derive the path and attach the aggregate stats shown next to it.
pub fn summarize(lessons: &[LessonDefinition], progress: &ChildProgress) -> PathView {
    let states = derive(lessons, progress);

    let current_lesson_id = states
        .iter()
        .find(|s| s.state == LessonState::Current)
        .map(|s| s.lesson_id.clone());
    let completed_count = states
        .iter()
        .filter(|s| s.state == LessonState::Completed)
        .count();

    PathView {
        child_id: progress.child_id.clone(),
        total_lessons: states.len(),
        lessons: states,
        current_lesson_id,
        completed_count,
        total_xp: progress.total_xp,
        current_streak_days: progress.current_streak_days,
        last_active_date: progress.last_active_date,
    }
}

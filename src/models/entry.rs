use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{MealType, TimePeriod};
use super::progress::ChildProgress;

/// What a logging session records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Food,
    Activity,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Activity => "activity",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "food" => Some(Self::Food),
            "activity" => Some(Self::Activity),
            _ => None,
        }
    }
}

/// The answer given on the first step of a logging session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EntryContext {
    TimePeriod(TimePeriod),
    MealType(MealType),
}

/// One picked item together with how much of it.
///
/// `amount` is servings for food and minutes for activities. `xp_per_unit` is
/// captured from the catalog when the selection is made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selection {
    pub item_id: String,
    pub amount: u32,
    pub xp_per_unit: u32,
}

impl Selection {
    /// `xp_per_unit × amount`, or `None` if it does not fit in an `i64`.
    pub fn xp(&self) -> Option<i64> {
        i64::from(self.xp_per_unit).checked_mul(i64::from(self.amount))
    }
}

/// Sum of the XP of every selection, or `None` on overflow.
pub fn selections_xp(selections: &[Selection]) -> Option<i64> {
    selections
        .iter()
        .try_fold(0i64, |total, s| total.checked_add(s.xp()?))
}

/// An entry ready to be appended to a child's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEntry {
    pub kind: LogKind,
    pub context: Option<EntryContext>,
    pub selections: Vec<Selection>,
    pub total_xp: i64,
}

/// A committed logging entry. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub id: Uuid,
    pub child_id: String,
    pub kind: LogKind,
    pub context: Option<EntryContext>,
    pub selections: Vec<Selection>,
    pub total_xp: i64,
    pub logged_at: DateTime<Utc>,
}

/// Result of appending an entry: the stored entry and the updated progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReceipt {
    pub entry: Entry,
    pub progress: ChildProgress,
}

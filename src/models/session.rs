use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::content::{MealType, TimePeriod};
use super::entry::{EntryContext, LogKind, Selection};

/// One screen of the logging wizard.
///
/// Activity logs walk `TimePeriod → ActivityTypes → Duration`; food logs walk
/// `MealType → Categories → Items`. The last step of each sequence is the
/// only one a session can be committed from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogStep {
    TimePeriod,
    ActivityTypes,
    Duration,
    MealType,
    Categories,
    Items,
}

impl LogStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TimePeriod => "time_period",
            Self::ActivityTypes => "activity_types",
            Self::Duration => "duration",
            Self::MealType => "meal_type",
            Self::Categories => "categories",
            Self::Items => "items",
        }
    }
}

impl LogKind {
    /// The fixed step sequence for this kind of log.
    pub fn steps(&self) -> &'static [LogStep] {
        match self {
            Self::Activity => &[LogStep::TimePeriod, LogStep::ActivityTypes, LogStep::Duration],
            Self::Food => &[LogStep::MealType, LogStep::Categories, LogStep::Items],
        }
    }
}

/// An item id with a quantity (servings) or a duration (minutes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemAmount {
    pub item_id: String,
    pub amount: u32,
}

/// Input for a single wizard step. The `step` tag must match the session's
/// current step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepInput {
    TimePeriod { period: TimePeriod },
    ActivityTypes { activity_ids: Vec<String> },
    Duration { durations: Vec<ItemAmount> },
    MealType { meal: MealType },
    Categories { category_ids: Vec<String> },
    Items { items: Vec<ItemAmount> },
}

impl StepInput {
    pub fn step(&self) -> LogStep {
        match self {
            Self::TimePeriod { .. } => LogStep::TimePeriod,
            Self::ActivityTypes { .. } => LogStep::ActivityTypes,
            Self::Duration { .. } => LogStep::Duration,
            Self::MealType { .. } => LogStep::MealType,
            Self::Categories { .. } => LogStep::Categories,
            Self::Items { .. } => LogStep::Items,
        }
    }
}

/// Input for starting a logging session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionInput {
    pub kind: LogKind,
}

/// Snapshot of a live logging session, as shown to its owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSessionView {
    pub id: Uuid,
    pub child_id: String,
    pub kind: LogKind,
    pub step: LogStep,
    pub steps: Vec<LogStep>,
    pub context: Option<EntryContext>,
    /// Activity ids or food category ids picked on the middle step.
    pub chosen: Vec<String>,
    pub selections: Vec<Selection>,
    /// XP the session would award if committed now.
    pub pending_xp: i64,
    pub can_commit: bool,
    pub started_at: DateTime<Utc>,
}

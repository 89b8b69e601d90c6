//! The food/activity logging wizard.
//!
//! A [`LogSession`] walks a fixed step sequence (see [`LogKind::steps`]). The
//! first step records context (time of day or meal), the middle step picks
//! groups (activities or food categories) and the terminal step records the
//! amounts that earn XP. Sessions are plain values owned by one caller; the
//! [`SessionRegistry`] keeps live sessions for the HTTP API.
//!
//! Going back keeps everything already entered. A later step's answers stay
//! until that step is answered again; when the group choice changes, terminal
//! selections outside the new groups are dropped.

mod registry;

pub use registry::SessionRegistry;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::models::*;

/// Upper bound for a single amount: a day of minutes, or as many servings.
pub const MAX_AMOUNT: u32 = 24 * 60;

#[derive(Debug, Clone)]
pub struct LogSession {
    id: Uuid,
    child_id: String,
    kind: LogKind,
    step_index: usize,
    context: Option<EntryContext>,
    chosen: Vec<String>,
    selections: Vec<Selection>,
    started_at: DateTime<Utc>,
}

impl LogSession {
    pub fn new(child_id: impl Into<String>, kind: LogKind, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            child_id: child_id.into(),
            kind,
            step_index: 0,
            context: None,
            chosen: Vec::new(),
            selections: Vec::new(),
            started_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn child_id(&self) -> &str {
        &self.child_id
    }

    pub fn kind(&self) -> LogKind {
        self.kind
    }

    pub fn step(&self) -> LogStep {
        self.kind.steps()[self.step_index]
    }

    pub fn is_terminal(&self) -> bool {
        self.step_index + 1 == self.kind.steps().len()
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn pending_xp(&self) -> i64 {
        // Amounts are capped, so this only saturates on a corrupt catalog
        selections_xp(&self.selections).unwrap_or(i64::MAX)
    }

    /// Answer the current step.
    ///
    /// Non-terminal answers move the session one step forward. The terminal
    /// answer replaces the selection list and keeps the session on the
    /// terminal step, ready to commit.
    pub fn select(&mut self, input: StepInput, catalog: &Catalog) -> Result<()> {
        let expected = self.step();
        if input.step() != expected {
            return Err(Error::InvalidStep(format!(
                "expected input for {}, got {}",
                expected.as_str(),
                input.step().as_str()
            )));
        }

        match input {
            StepInput::TimePeriod { period } => {
                self.context = Some(EntryContext::TimePeriod(period));
            }
            StepInput::MealType { meal } => {
                self.context = Some(EntryContext::MealType(meal));
            }
            StepInput::ActivityTypes { activity_ids } => {
                let chosen = distinct_ids(activity_ids, "activity")?;
                for id in &chosen {
                    catalog.activity(id).map_err(|_| unknown("activity", id))?;
                }
                self.selections.retain(|s| chosen.contains(&s.item_id));
                self.chosen = chosen;
            }
            StepInput::Categories { category_ids } => {
                let chosen = distinct_ids(category_ids, "category")?;
                for id in &chosen {
                    catalog.category(id).map_err(|_| unknown("category", id))?;
                }
                self.selections.retain(|s| {
                    catalog
                        .food(&s.item_id)
                        .is_ok_and(|food| chosen.contains(&food.category_id))
                });
                self.chosen = chosen;
            }
            StepInput::Duration { durations } => {
                self.selections = self.build_selections(durations, |id| {
                    let activity = catalog.activity(id).map_err(|_| unknown("activity", id))?;
                    if !self.chosen.iter().any(|c| c == id) {
                        return Err(Error::InvalidSelection(format!(
                            "activity {} was not picked on the previous step",
                            id
                        )));
                    }
                    Ok(activity.xp_per_minute)
                })?;
            }
            StepInput::Items { items } => {
                self.selections = self.build_selections(items, |id| {
                    let food = catalog.food(id).map_err(|_| unknown("food", id))?;
                    if !self.chosen.iter().any(|c| *c == food.category_id) {
                        return Err(Error::InvalidSelection(format!(
                            "food {} is not in a picked category",
                            id
                        )));
                    }
                    Ok(food.xp_per_unit)
                })?;
            }
        }

        if !self.is_terminal() {
            self.step_index += 1;
        }
        Ok(())
    }

    /// Return to the previous step, keeping every answer given so far.
    pub fn back(&mut self) -> Result<()> {
        if self.step_index == 0 {
            return Err(Error::InvalidStep(format!(
                "{} is the first step",
                self.step().as_str()
            )));
        }
        self.step_index -= 1;
        Ok(())
    }

    /// Build the entry this session would record. Does not touch storage;
    /// the caller hands the result to the progress store.
    pub fn commit(&self) -> Result<NewEntry> {
        if !self.is_terminal() {
            return Err(Error::InvalidStep(format!(
                "cannot commit from {}",
                self.step().as_str()
            )));
        }
        if self.selections.is_empty() {
            return Err(Error::IncompleteSelections);
        }

        Ok(NewEntry {
            kind: self.kind,
            context: self.context,
            selections: self.selections.clone(),
            total_xp: self.pending_xp(),
        })
    }

    pub fn view(&self) -> LogSessionView {
        LogSessionView {
            id: self.id,
            child_id: self.child_id.clone(),
            kind: self.kind,
            step: self.step(),
            steps: self.kind.steps().to_vec(),
            context: self.context,
            chosen: self.chosen.clone(),
            selections: self.selections.clone(),
            pending_xp: self.pending_xp(),
            can_commit: self.is_terminal() && !self.selections.is_empty(),
            started_at: self.started_at,
        }
    }

    fn build_selections(
        &self,
        amounts: Vec<ItemAmount>,
        xp_per_unit: impl Fn(&str) -> Result<u32>,
    ) -> Result<Vec<Selection>> {
        let mut selections: Vec<Selection> = Vec::with_capacity(amounts.len());
        for ItemAmount { item_id, amount } in amounts {
            let xp_per_unit = xp_per_unit(&item_id)?;
            if amount == 0 || amount > MAX_AMOUNT {
                return Err(Error::InvalidSelection(format!(
                    "amount for {} must be between 1 and {}, got {}",
                    item_id, MAX_AMOUNT, amount
                )));
            }
            if selections.iter().any(|s| s.item_id == item_id) {
                return Err(Error::InvalidSelection(format!("{} was given twice", item_id)));
            }
            selections.push(Selection {
                item_id,
                amount,
                xp_per_unit,
            });
        }
        Ok(selections)
    }
}

fn distinct_ids(ids: Vec<String>, kind: &str) -> Result<Vec<String>> {
    if ids.is_empty() {
        return Err(Error::InvalidSelection(format!("pick at least one {}", kind)));
    }
    let mut distinct: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !distinct.contains(&id) {
            distinct.push(id);
        }
    }
    Ok(distinct)
}

fn unknown(kind: &str, id: &str) -> Error {
    Error::InvalidSelection(format!("unknown {} {}", kind, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn food_session() -> LogSession {
        LogSession::new("kid", LogKind::Food, Utc::now())
    }

    fn activity_session() -> LogSession {
        LogSession::new("kid", LogKind::Activity, Utc::now())
    }

    fn amount(item_id: &str, amount: u32) -> ItemAmount {
        ItemAmount {
            item_id: item_id.to_string(),
            amount,
        }
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    /// Walk a food session up to the items step with the given categories.
    fn at_items(catalog: &Catalog, categories: &[&str]) -> LogSession {
        let mut session = food_session();
        session
            .select(StepInput::MealType { meal: MealType::Lunch }, catalog)
            .unwrap();
        session
            .select(
                StepInput::Categories {
                    category_ids: ids(categories),
                },
                catalog,
            )
            .unwrap();
        session
    }

    #[test]
    fn starts_on_first_step() {
        assert_eq!(food_session().step(), LogStep::MealType);
        assert_eq!(activity_session().step(), LogStep::TimePeriod);
    }

    #[test]
    fn food_commit_sums_xp_per_unit_times_quantity() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits", "drinks"]);
        session
            .select(
                StepInput::Items {
                    items: vec![amount("apple", 2), amount("water", 1)],
                },
                &catalog,
            )
            .unwrap();

        let entry = session.commit().unwrap();
        assert_eq!(entry.total_xp, 13);
        assert_eq!(entry.kind, LogKind::Food);
        assert_eq!(entry.context, Some(EntryContext::MealType(MealType::Lunch)));
    }

    #[test]
    fn activity_commit_uses_minutes() {
        let catalog = catalog();
        let mut session = activity_session();
        session
            .select(
                StepInput::TimePeriod {
                    period: TimePeriod::Afternoon,
                },
                &catalog,
            )
            .unwrap();
        session
            .select(
                StepInput::ActivityTypes {
                    activity_ids: ids(&["soccer", "walking"]),
                },
                &catalog,
            )
            .unwrap();
        assert_eq!(session.step(), LogStep::Duration);
        session
            .select(
                StepInput::Duration {
                    durations: vec![amount("soccer", 30), amount("walking", 15)],
                },
                &catalog,
            )
            .unwrap();

        assert_eq!(session.commit().unwrap().total_xp, 30 * 2 + 15);
    }

    #[test]
    fn input_for_another_step_is_invalid_step() {
        let catalog = catalog();
        let mut session = food_session();
        let err = session
            .select(
                StepInput::Items {
                    items: vec![amount("apple", 1)],
                },
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStep(_)));
        assert_eq!(session.step(), LogStep::MealType);
    }

    #[test]
    fn unknown_catalog_id_is_invalid_selection() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits"]);
        let err = session
            .select(
                StepInput::Items {
                    items: vec![amount("dragonfruit-cake", 1)],
                },
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
    }

    #[test]
    fn food_outside_picked_categories_is_rejected() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits"]);
        let err = session
            .select(
                StepInput::Items {
                    items: vec![amount("water", 1)],
                },
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits"]);
        let err = session
            .select(
                StepInput::Items {
                    items: vec![amount("apple", 0)],
                },
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
    }

    #[test]
    fn commit_without_selections_is_incomplete() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits"]);
        session
            .select(StepInput::Items { items: vec![] }, &catalog)
            .unwrap();
        assert!(matches!(session.commit(), Err(Error::IncompleteSelections)));
    }

    #[test]
    fn commit_before_terminal_step_is_invalid_step() {
        let catalog = catalog();
        let mut session = food_session();
        session
            .select(StepInput::MealType { meal: MealType::Snack }, &catalog)
            .unwrap();
        assert!(matches!(session.commit(), Err(Error::InvalidStep(_))));
    }

    #[test]
    fn back_from_first_step_is_invalid() {
        let mut session = activity_session();
        assert!(matches!(session.back(), Err(Error::InvalidStep(_))));
    }

    #[test]
    fn back_keeps_later_selections() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits", "veggies"]);
        session
            .select(
                StepInput::Items {
                    items: vec![amount("apple", 1), amount("carrot", 2)],
                },
                &catalog,
            )
            .unwrap();

        session.back().unwrap();
        assert_eq!(session.step(), LogStep::Categories);
        assert_eq!(session.selections().len(), 2);

        // Re-answering the middle step keeps what still fits
        session
            .select(
                StepInput::Categories {
                    category_ids: ids(&["veggies"]),
                },
                &catalog,
            )
            .unwrap();
        assert_eq!(session.step(), LogStep::Items);
        assert_eq!(session.selections().len(), 1);
        assert_eq!(session.selections()[0].item_id, "carrot");
        assert_eq!(session.commit().unwrap().total_xp, 12);
    }

    #[test]
    fn changing_the_meal_keeps_items() {
        let catalog = catalog();
        let mut session = at_items(&catalog, &["fruits"]);
        session
            .select(
                StepInput::Items {
                    items: vec![amount("banana", 1)],
                },
                &catalog,
            )
            .unwrap();
        session.back().unwrap();
        session.back().unwrap();
        session
            .select(
                StepInput::MealType {
                    meal: MealType::Breakfast,
                },
                &catalog,
            )
            .unwrap();

        let view = session.view();
        assert_eq!(view.step, LogStep::Categories);
        assert_eq!(view.context, Some(EntryContext::MealType(MealType::Breakfast)));
        assert_eq!(view.pending_xp, 5);
        assert!(!view.can_commit);
    }

    #[test]
    fn empty_group_choice_is_rejected() {
        let catalog = catalog();
        let mut session = food_session();
        session
            .select(StepInput::MealType { meal: MealType::Dinner }, &catalog)
            .unwrap();
        let err = session
            .select(
                StepInput::Categories {
                    category_ids: vec![],
                },
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSelection(_)));
    }
}

//! Static lesson, food and activity content.
//!
//! The catalog is loaded once at startup (from the built-in JSON document or
//! a file) and shared read-only behind an `Arc` for the life of the process.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::*;

const BUILTIN: &str = include_str!("default.json");

/// On-disk shape of a catalog document.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSource {
    #[serde(default)]
    pub lessons: Vec<LessonDefinition>,
    #[serde(default)]
    pub categories: Vec<FoodCategory>,
    #[serde(default)]
    pub foods: Vec<FoodItem>,
    #[serde(default)]
    pub activities: Vec<ActivityDefinition>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    lessons: Vec<LessonDefinition>,
    categories: Vec<FoodCategory>,
    foods: Vec<FoodItem>,
    activities: Vec<ActivityDefinition>,
    lesson_index: HashMap<String, usize>,
    category_index: HashMap<String, usize>,
    food_index: HashMap<String, usize>,
    activity_index: HashMap<String, usize>,
}

impl Catalog {
    /// The content shipped with the binary.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_json(BUILTIN).context("Built-in catalog is invalid")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid catalog {}", path.display()))
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let source: CatalogSource = serde_json::from_str(raw)?;
        Self::from_source(source)
    }

    /// Validate and index a catalog.
    ///
    /// Lessons are sorted by `(order, id)` so the path sequence never depends
    /// on declaration order within a tier.
    pub fn from_source(source: CatalogSource) -> anyhow::Result<Self> {
        let CatalogSource {
            mut lessons,
            categories,
            foods,
            activities,
        } = source;

        lessons.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));

        let lesson_index = index_by_id("lesson", &lessons, |l| &l.id)?;
        let category_index = index_by_id("category", &categories, |c| &c.id)?;
        let food_index = index_by_id("food", &foods, |f| &f.id)?;
        let activity_index = index_by_id("activity", &activities, |a| &a.id)?;

        for food in &foods {
            if !category_index.contains_key(&food.category_id) {
                bail!(
                    "Food {} references unknown category {}",
                    food.id,
                    food.category_id
                );
            }
        }

        tracing::debug!(
            lessons = lessons.len(),
            categories = categories.len(),
            foods = foods.len(),
            activities = activities.len(),
            "Catalog loaded"
        );

        Ok(Self {
            lessons,
            categories,
            foods,
            activities,
            lesson_index,
            category_index,
            food_index,
            activity_index,
        })
    }

    pub fn with_lessons(lessons: Vec<LessonDefinition>) -> anyhow::Result<Self> {
        Self::from_source(CatalogSource {
            lessons,
            ..Default::default()
        })
    }

    // ============================================================
    // Lessons
    // ============================================================

    /// All lessons in path order.
    pub fn lessons(&self) -> &[LessonDefinition] {
        &self.lessons
    }

    pub fn lesson(&self, id: &str) -> Result<&LessonDefinition> {
        lookup(&self.lessons, &self.lesson_index, "lesson", id)
    }

    // ============================================================
    // Food
    // ============================================================

    pub fn categories(&self) -> &[FoodCategory] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Result<&FoodCategory> {
        lookup(&self.categories, &self.category_index, "category", id)
    }

    pub fn foods(&self) -> &[FoodItem] {
        &self.foods
    }

    pub fn foods_in<'a>(&'a self, category_id: &'a str) -> impl Iterator<Item = &'a FoodItem> {
        self.foods.iter().filter(move |f| f.category_id == category_id)
    }

    pub fn food(&self, id: &str) -> Result<&FoodItem> {
        lookup(&self.foods, &self.food_index, "food", id)
    }

    // ============================================================
    // Activities
    // ============================================================

    pub fn activities(&self) -> &[ActivityDefinition] {
        &self.activities
    }

    pub fn activity(&self, id: &str) -> Result<&ActivityDefinition> {
        lookup(&self.activities, &self.activity_index, "activity", id)
    }
}

fn index_by_id<T>(
    kind: &str,
    items: &[T],
    id_of: impl Fn(&T) -> &String,
) -> anyhow::Result<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let id = id_of(item);
        if id.trim().is_empty() {
            bail!("A {} has an empty id", kind);
        }
        if index.insert(id.clone(), pos).is_some() {
            bail!("Duplicate {} id: {}", kind, id);
        }
    }
    Ok(index)
}

fn lookup<'a, T>(
    items: &'a [T],
    index: &HashMap<String, usize>,
    kind: &'static str,
    id: &str,
) -> Result<&'a T> {
    index
        .get(id)
        .map(|&pos| &items[pos])
        .ok_or_else(|| Error::not_found(kind, id))
}

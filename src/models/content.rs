use serde::{Deserialize, Serialize};

/// A group of foods shown on the "categories" step of food logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoodCategory {
    pub id: String,
    pub title: String,
    pub icon: String,
}

/// A food a child can log. One unit is one serving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FoodItem {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub icon: String,
    pub xp_per_unit: u32,
}

/// A physical activity a child can log, rewarded per minute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityDefinition {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub xp_per_minute: u32,
}

/// Part of the day an activity happened in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Evening,
}

/// Which meal a food log belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

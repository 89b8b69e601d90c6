//! Domain models for BiteBurst.
//!
//! # Core Concepts
//!
//! ## Static Content
//!
//! - [`LessonDefinition`]: One node on the lesson path. Lessons are ordered by
//!   `order` and never change at runtime.
//! - [`FoodCategory`], [`FoodItem`], [`ActivityDefinition`]: The things a child
//!   can pick while logging a meal or an activity.
//!
//! ## Per-child State
//!
//! - [`ChildProgress`]: Completed lessons, XP and the daily streak. Persisted.
//! - [`Entry`]: An immutable record of a committed logging session.
//!
//! ## Derived and Ephemeral Values
//!
//! - [`DerivedLessonState`] / [`PathView`]: Computed on every read from the
//!   catalog and a [`ChildProgress`]; never stored.
//! - [`LogSessionView`]: Snapshot of an in-flight logging wizard. Sessions
//!   live only in memory and disappear on commit or abandon.

mod content;
mod entry;
mod lesson;
mod progress;
mod session;

pub use content::*;
pub use entry::*;
pub use lesson::*;
pub use progress::*;
pub use session::*;

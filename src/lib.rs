//! BiteBurst progression service.
//!
//! Lesson path state, per-child XP and streaks, and the food/activity logging
//! wizard, served over a small JSON API.

pub mod api;
pub mod catalog;
pub mod client;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod log_session;
pub mod models;
pub mod progress;
pub mod progression;

pub use error::{Error, Result};

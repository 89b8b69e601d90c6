//! Runtime configuration loaded from environment variables.
//!
//! - `BITEBURST_DB_PATH` - SQLite file (default: the platform data directory)
//! - `BITEBURST_CATALOG` - JSON catalog file (default: built-in content)
//! - `BITEBURST_UTC_OFFSET_MINUTES` - offset used for streak calendar days (default: 0)
//! - `BITEBURST_SESSION_TTL_SECS` - idle lifetime of logging sessions (default: 1800)
//!
//! API authentication is configured separately, see [`crate::api::SecurityConfig`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::api::AppState;
use crate::catalog::Catalog;
use crate::clock::SystemClock;
use crate::db::Database;

const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
    pub utc_offset_minutes: i32,
    pub session_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("BITEBURST_DB_PATH").ok().map(PathBuf::from);
        let catalog_path = std::env::var("BITEBURST_CATALOG").ok().map(PathBuf::from);

        let utc_offset_minutes = std::env::var("BITEBURST_UTC_OFFSET_MINUTES")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .unwrap_or(0);

        let session_ttl = std::env::var("BITEBURST_SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_SESSION_TTL_SECS));

        Self {
            db_path,
            catalog_path,
            utc_offset_minutes,
            session_ttl,
        }
    }

    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        match &self.catalog_path {
            Some(path) => {
                tracing::info!("Loading catalog from {}", path.display());
                Catalog::load(path)
            }
            None => Catalog::builtin(),
        }
    }

    pub fn open_database(&self) -> anyhow::Result<Database> {
        let db = match &self.db_path {
            Some(path) => Database::open(path.clone())?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open storage, load content and assemble the shared server state.
    pub fn build_state(&self) -> anyhow::Result<AppState> {
        let db = self.open_database()?;
        let catalog = self.load_catalog()?;
        let clock = SystemClock::with_offset_minutes(self.utc_offset_minutes);
        Ok(AppState::new(
            db,
            Arc::new(catalog),
            Arc::new(clock),
            self.session_ttl,
        ))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

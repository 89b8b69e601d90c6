use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use uuid::Uuid;

use super::LogSession;
use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::models::*;
use crate::progress::ProgressStore;

/// Live logging sessions, keyed by session id.
///
/// Each session belongs to the child that started it; looking it up under any
/// other child id behaves as if it did not exist. Sessions idle for longer
/// than the TTL are dropped the next time the registry is touched.
#[derive(Clone, Debug)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Tracked>>>,
    idle_ttl: Duration,
}

#[derive(Debug)]
struct Tracked {
    session: LogSession,
    touched: Instant,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            idle_ttl,
        }
    }

    // A panic inside a session update leaves the map itself consistent
    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Tracked>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self, store: &ProgressStore, child_id: &str, kind: LogKind) -> Result<LogSessionView> {
        if child_id.trim().is_empty() {
            return Err(Error::InvalidChildId(child_id.to_string()));
        }
        self.purge_expired();

        let session = LogSession::new(child_id, kind, store.now());
        let view = session.view();
        self.sessions().insert(
            session.id(),
            Tracked {
                session,
                touched: Instant::now(),
            },
        );

        tracing::debug!(child_id, session_id = %view.id, kind = kind.as_str(), "Logging session started");
        Ok(view)
    }

    pub fn get(&self, child_id: &str, id: Uuid) -> Result<LogSessionView> {
        self.with_session(child_id, id, |session| Ok(session.view()))
    }

    pub fn select(
        &self,
        catalog: &Catalog,
        child_id: &str,
        id: Uuid,
        input: StepInput,
    ) -> Result<LogSessionView> {
        self.with_session(child_id, id, |session| {
            session.select(input, catalog)?;
            Ok(session.view())
        })
    }

    pub fn back(&self, child_id: &str, id: Uuid) -> Result<LogSessionView> {
        self.with_session(child_id, id, |session| {
            session.back()?;
            Ok(session.view())
        })
    }

    /// Commit a session into the child's history.
    ///
    /// The session leaves the registry only when the entry is stored. If the
    /// session cannot be committed yet, or storage fails, it stays available
    /// unchanged.
    pub fn commit(&self, store: &ProgressStore, child_id: &str, id: Uuid) -> Result<EntryReceipt> {
        let session = self.take(child_id, id)?;

        let outcome = session
            .commit()
            .and_then(|entry| store.append_entry(child_id, entry));

        if outcome.is_err() {
            self.restore(session);
        } else {
            tracing::debug!(child_id, session_id = %id, "Logging session committed");
        }
        outcome
    }

    /// Drop a session without recording anything.
    pub fn abandon(&self, child_id: &str, id: Uuid) -> Result<()> {
        self.take(child_id, id)?;
        tracing::debug!(child_id, session_id = %id, "Logging session abandoned");
        Ok(())
    }

    /// Remove sessions idle for longer than the TTL. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions();
        evict_expired(&mut sessions, self.idle_ttl)
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_session<T>(
        &self,
        child_id: &str,
        id: Uuid,
        apply: impl FnOnce(&mut LogSession) -> Result<T>,
    ) -> Result<T> {
        let mut sessions = self.sessions();
        evict_expired(&mut sessions, self.idle_ttl);
        let tracked = sessions
            .get_mut(&id)
            .filter(|t| t.session.child_id() == child_id)
            .ok_or_else(|| Error::not_found("session", id.to_string()))?;
        tracked.touched = Instant::now();
        apply(&mut tracked.session)
    }

    fn take(&self, child_id: &str, id: Uuid) -> Result<LogSession> {
        let mut sessions = self.sessions();
        evict_expired(&mut sessions, self.idle_ttl);
        match sessions.get(&id) {
            Some(t) if t.session.child_id() == child_id => {}
            _ => return Err(Error::not_found("session", id.to_string())),
        }
        sessions
            .remove(&id)
            .map(|t| t.session)
            .ok_or_else(|| Error::not_found("session", id.to_string()))
    }

    fn restore(&self, session: LogSession) {
        self.sessions().insert(
            session.id(),
            Tracked {
                session,
                touched: Instant::now(),
            },
        );
    }
}

fn evict_expired(sessions: &mut HashMap<Uuid, Tracked>, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, tracked| tracked.touched.elapsed() <= ttl);
    let purged = before - sessions.len();
    if purged > 0 {
        tracing::debug!(purged, "Expired idle logging sessions");
    }
    purged
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::Database;

    fn store() -> ProgressStore {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        ProgressStore::new(
            db,
            Arc::new(Catalog::builtin().unwrap()),
            Arc::new(FixedClock::new(chrono::Utc::now())),
        )
    }

    #[test]
    fn session_is_invisible_to_other_children() {
        let store = store();
        let registry = SessionRegistry::default();
        let view = registry.start(&store, "ana", LogKind::Food).unwrap();

        assert!(registry.get("ana", view.id).is_ok());
        assert!(matches!(
            registry.get("ben", view.id),
            Err(Error::NotFound { kind: "session", .. })
        ));
        assert!(registry.abandon("ben", view.id).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn abandon_removes_session() {
        let store = store();
        let registry = SessionRegistry::default();
        let view = registry.start(&store, "ana", LogKind::Activity).unwrap();

        registry.abandon("ana", view.id).unwrap();
        assert!(registry.is_empty());
        assert!(registry.get("ana", view.id).is_err());
    }

    #[test]
    fn failed_commit_keeps_session() {
        let store = store();
        let registry = SessionRegistry::default();
        let view = registry.start(&store, "ana", LogKind::Food).unwrap();

        let err = registry.commit(&store, "ana", view.id).unwrap_err();
        assert!(matches!(err, Error::InvalidStep(_)));
        assert!(registry.get("ana", view.id).is_ok());
    }

    #[test]
    fn idle_sessions_expire() {
        let store = store();
        let registry = SessionRegistry::new(Duration::ZERO);
        let view = registry.start(&store, "ana", LogKind::Food).unwrap();

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.purge_expired(), 1);
        assert!(registry.get("ana", view.id).is_err());
    }

    #[test]
    fn lookups_drop_every_expired_session() {
        let store = store();
        let registry = SessionRegistry::new(Duration::from_millis(1));
        let ana = registry.start(&store, "ana", LogKind::Food).unwrap();
        registry.start(&store, "ben", LogKind::Activity).unwrap();

        std::thread::sleep(Duration::from_millis(10));
        assert!(matches!(
            registry.get("ana", ana.id),
            Err(Error::NotFound { kind: "session", .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn commit_of_expired_session_clears_it() {
        let store = store();
        let registry = SessionRegistry::new(Duration::from_millis(1));
        let view = registry.start(&store, "ana", LogKind::Food).unwrap();

        std::thread::sleep(Duration::from_millis(10));
        assert!(registry.commit(&store, "ana", view.id).is_err());
        assert!(registry.is_empty());
    }
}

use biteburst::db::Database;
use biteburst::error::Error;
use biteburst::models::*;
use chrono::{NaiveDate, TimeZone, Utc};
use speculate2::speculate;
use uuid::Uuid;

fn at(day: u32, hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn entry(child_id: &str, logged_at: chrono::DateTime<Utc>, xp_per_unit: u32) -> Entry {
    Entry {
        id: Uuid::new_v4(),
        child_id: child_id.to_string(),
        kind: LogKind::Food,
        context: Some(EntryContext::MealType(MealType::Lunch)),
        selections: vec![Selection {
            item_id: "apple".to_string(),
            amount: 1,
            xp_per_unit,
        }],
        total_xp: i64::from(xp_per_unit),
        logged_at,
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "get_progress" {
        it "returns None for a child without a record" {
            let progress = db.get_progress("nobody").expect("Query failed");
            assert!(progress.is_none());
        }
    }

    describe "mutate_progress" {
        it "creates the record on first mutation" {
            let (progress, ()) = db.mutate_progress("mia", at(1, 9), |pending| {
                pending.progress.total_xp = 25;
                pending.progress.current_streak_days = 1;
                pending.progress.last_active_date = NaiveDate::from_ymd_opt(2024, 5, 1);
                pending.progress.completed_lesson_ids.insert("L1".to_string());
                Ok(())
            }).expect("Mutation failed");

            assert_eq!(progress.total_xp, 25);

            let stored = db.get_progress("mia").expect("Query failed").expect("Record missing");
            assert_eq!(stored, progress);
        }

        it "starts from zeroed defaults" {
            let (_, seen) = db.mutate_progress("new-kid", at(1, 9), |pending| {
                Ok(pending.progress.clone())
            }).expect("Mutation failed");

            assert_eq!(seen, ChildProgress::new("new-kid"));
        }

        it "keeps earlier completions when adding new ones" {
            db.mutate_progress("mia", at(1, 9), |pending| {
                pending.progress.completed_lesson_ids.insert("L1".to_string());
                Ok(())
            }).expect("Mutation failed");
            db.mutate_progress("mia", at(2, 9), |pending| {
                pending.progress.completed_lesson_ids.insert("L2".to_string());
                Ok(())
            }).expect("Mutation failed");

            let stored = db.get_progress("mia").expect("Query failed").expect("Record missing");
            let ids: Vec<_> = stored.completed_lesson_ids.iter().cloned().collect();
            assert_eq!(ids, vec!["L1", "L2"]);
        }

        it "writes nothing when the mutation fails" {
            db.mutate_progress("mia", at(1, 9), |pending| {
                pending.progress.total_xp = 10;
                Ok(())
            }).expect("Mutation failed");

            let result: Result<(ChildProgress, ()), Error> = db.mutate_progress("mia", at(1, 10), |pending| {
                pending.progress.total_xp = 999;
                pending.progress.completed_lesson_ids.insert("L9".to_string());
                pending.record_entry(entry("mia", at(1, 10), 5));
                Err(Error::InvalidEntry("rejected".to_string()))
            });
            assert!(matches!(result, Err(Error::InvalidEntry(_))));

            let stored = db.get_progress("mia").expect("Query failed").expect("Record missing");
            assert_eq!(stored.total_xp, 10);
            assert!(stored.completed_lesson_ids.is_empty());
            assert!(db.get_entries("mia", 10).expect("Query failed").is_empty());
        }

        it "keeps children apart" {
            db.mutate_progress("ana", at(1, 9), |pending| {
                pending.progress.total_xp = 5;
                Ok(())
            }).expect("Mutation failed");

            assert!(db.get_progress("ben").expect("Query failed").is_none());
        }
    }

    describe "entries" {
        it "stores recorded entries with the mutation" {
            let logged = entry("mia", at(3, 8), 4);
            db.mutate_progress("mia", at(3, 8), |pending| {
                pending.record_entry(logged.clone());
                Ok(())
            }).expect("Mutation failed");

            let entries = db.get_entries("mia", 10).expect("Query failed");
            assert_eq!(entries, vec![logged]);
        }

        it "returns most recent first and honours the limit" {
            for (day, xp) in [(1, 1), (3, 3), (2, 2)] {
                db.mutate_progress("mia", at(day, 8), |pending| {
                    pending.record_entry(entry("mia", at(day, 8), xp));
                    Ok(())
                }).expect("Mutation failed");
            }

            let entries = db.get_entries("mia", 2).expect("Query failed");
            let xp: Vec<_> = entries.iter().map(|e| e.total_xp).collect();
            assert_eq!(xp, vec![3, 2]);
        }

        it "does not leak entries across children" {
            db.mutate_progress("ana", at(1, 8), |pending| {
                pending.record_entry(entry("ana", at(1, 8), 3));
                Ok(())
            }).expect("Mutation failed");

            assert!(db.get_entries("ben", 10).expect("Query failed").is_empty());
        }
    }
}

mod on_disk {
    use super::*;

    #[test]
    fn progress_survives_reopening() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("biteburst.db");

        {
            let db = Database::open(path.clone()).expect("Failed to open");
            db.migrate().expect("Failed to migrate");
            db.mutate_progress("mia", at(1, 9), |pending| {
                pending.progress.total_xp = 42;
                Ok(())
            })
            .expect("Mutation failed");
        }

        let db = Database::open(path).expect("Failed to reopen");
        db.migrate().expect("Failed to migrate");
        let stored = db.get_progress("mia").expect("Query failed").expect("Record missing");
        assert_eq!(stored.total_xp, 42);
    }

    /// A database with one record for "mia", then `corruption` applied to it
    /// through a separate connection.
    fn corrupted(dir: &tempfile::TempDir, corruption: &str) -> Database {
        let path = dir.path().join("biteburst.db");
        let db = Database::open(path.clone()).expect("Failed to open");
        db.migrate().expect("Failed to migrate");
        db.mutate_progress("mia", at(1, 9), |pending| {
            pending.progress.current_streak_days = 4;
            pending.progress.last_active_date = NaiveDate::from_ymd_opt(2024, 5, 1);
            pending.record_entry(entry("mia", at(1, 9), 5));
            Ok(())
        })
        .expect("Mutation failed");

        let raw = rusqlite::Connection::open(&path).expect("Failed to open raw connection");
        raw.execute_batch(corruption).expect("Failed to corrupt");
        db
    }

    #[test]
    fn corrupt_last_active_date_is_storage_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = corrupted(&dir, "UPDATE child_progress SET last_active_date = 'yesterday-ish'");

        assert!(matches!(db.get_progress("mia"), Err(Error::StorageUnavailable(_))));

        let result = db.mutate_progress("mia", at(2, 9), |pending| {
            pending.progress.current_streak_days = 1;
            Ok(())
        });
        assert!(matches!(result, Err(Error::StorageUnavailable(_))));

        let raw = rusqlite::Connection::open(dir.path().join("biteburst.db")).expect("Failed to open");
        let streak: u32 = raw
            .query_row("SELECT current_streak_days FROM child_progress", [], |row| row.get(0))
            .expect("Query failed");
        assert_eq!(streak, 4);
    }

    #[test]
    fn corrupt_entry_columns_are_storage_errors() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = corrupted(&dir, "UPDATE log_entries SET logged_at = 'soon'");
        assert!(matches!(db.get_entries("mia", 10), Err(Error::StorageUnavailable(_))));

        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db = corrupted(&dir, "UPDATE log_entries SET id = 'not-a-uuid'");
        assert!(matches!(db.get_entries("mia", 10), Err(Error::StorageUnavailable(_))));
    }
}

use lore::config::StorageConfig;
use lore::db;
use lore::knowledge::store::{get_entry, save_entry, NewEntry};
use lore::knowledge::types::MemoryType;
use std::time::Duration;
use tempfile::TempDir;

fn storage(retries: u32) -> StorageConfig {
    StorageConfig {
        connect_retries: retries,
        connect_backoff_ms: 1,
        ..Default::default()
    }
}

#[test]
fn open_creates_new_db_at_nonexistent_path() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("subdir").join("new.db");
    assert!(!db_path.exists());

    let conn = db::open_with_retry(&db_path, &storage(0)).unwrap();
    assert!(db_path.exists());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn data_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("lore.db");

    let id = {
        let mut conn = db::open_database(&db_path, Duration::from_millis(5000)).unwrap();
        save_entry(
            &mut conn,
            &NewEntry {
                topic: "deploy".into(),
                content: "Run the script".into(),
                source: "website".into(),
                tags: vec!["ops".into()],
                confidence: 1.0,
                user_id: "unknown".into(),
                memory_type: MemoryType::Pattern,
            },
        )
        .unwrap()
        .id
    };

    let conn = db::open_database(&db_path, Duration::from_millis(5000)).unwrap();
    let entry = get_entry(&conn, id).unwrap().unwrap();
    assert_eq!(entry.tags, vec!["ops"]);

    // Functions are registered on every connection, not stored in the file.
    let s: f64 = conn
        .query_row("SELECT similarity('abc', 'abc')", [], |row| row.get(0))
        .unwrap();
    assert_eq!(s, 1.0);
}

#[test]
fn busy_timeout_is_set() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("test.db");

    let conn = db::open_with_retry(&db_path, &storage(0)).unwrap();
    let timeout: i64 = conn
        .pragma_query_value(None, "busy_timeout", |row| row.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn open_gives_up_after_retries() {
    let tmp = TempDir::new().unwrap();
    // A directory where the database file should be cannot be opened.
    let db_path = tmp.path().join("occupied");
    std::fs::create_dir(&db_path).unwrap();

    let err = db::open_with_retry(&db_path, &storage(2)).unwrap_err();
    assert!(format!("{err:#}").contains("giving up after 3 attempt(s)"));
}

#[test]
fn health_check_passes_on_valid_db() {
    let tmp = TempDir::new().unwrap();
    let conn = db::open_with_retry(tmp.path().join("h.db"), &storage(0)).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::schema::SCHEMA_VERSION);
    assert!(!report.sqlite_version.is_empty());
    assert_eq!(report.entry_count, 0);
    assert_eq!(report.log_count, 0);
}

#![allow(dead_code)]

use chrono::{Duration, Utc};
use lore::db;
use lore::knowledge::store::{save_entry, NewEntry};
use lore::knowledge::types::{format_timestamp, MemoryType};
use rusqlite::{params, Connection};

/// Open a fresh in-memory database with functions and schema applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Build a save request with defaults for everything but the text fields.
pub fn new_entry(topic: &str, content: &str, source: &str, memory_type: MemoryType) -> NewEntry {
    NewEntry {
        topic: topic.into(),
        content: content.into(),
        source: source.into(),
        tags: vec![],
        confidence: 1.0,
        user_id: "unknown".into(),
        memory_type,
    }
}

/// Insert a test entry directly via the store module. Returns the entry ID.
pub fn insert_entry(
    conn: &mut Connection,
    topic: &str,
    content: &str,
    source: &str,
    tags: &[&str],
    memory_type: MemoryType,
) -> i64 {
    let mut entry = new_entry(topic, content, source, memory_type);
    entry.tags = tags.iter().map(|t| t.to_string()).collect();
    save_entry(conn, &entry).unwrap().id
}

/// Move an entry's creation (and update) time `days` into the past.
pub fn backdate(conn: &Connection, id: i64, days: i64) {
    let ts = format_timestamp(Utc::now() - Duration::days(days));
    conn.execute(
        "UPDATE entries SET created_at = ?1, updated_at = ?1 WHERE id = ?2",
        params![ts, id],
    )
    .unwrap();
}

/// Overwrite access bookkeeping, with the last access `days_ago` days back.
pub fn set_access(conn: &Connection, id: i64, count: u32, days_ago: i64) {
    let ts = format_timestamp(Utc::now() - Duration::days(days_ago));
    conn.execute(
        "UPDATE entries SET access_count = ?1, last_accessed = ?2 WHERE id = ?3",
        params![count, ts, id],
    )
    .unwrap();
}

pub fn entry_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
        .unwrap()
}

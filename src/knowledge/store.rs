//! Entry store: upsert by natural key, lookups, deletion, and audit logging.
//!
//! [`save_entry`] is a single `INSERT … ON CONFLICT DO UPDATE` statement, so two
//! concurrent saves of the same (topic, source, content) can never both insert.

use anyhow::Result;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::types::{
    entry_from_row, format_timestamp, now_timestamp, KnowledgeEntry, MemoryType, ENTRY_COLUMNS,
};

/// A validated write request.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub topic: String,
    pub content: String,
    pub source: String,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub user_id: String,
    pub memory_type: MemoryType,
}

/// Result returned from a save.
#[derive(Debug, Serialize)]
pub struct SaveResult {
    pub id: i64,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// `true` if an entry with the same natural key was updated in place.
    pub updated: bool,
}

/// One row of an entry's audit trail.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

/// Insert a new entry, or update the entry with the same (topic, source, content).
///
/// On update the id and `created_at` are preserved; tags, confidence, user id,
/// and memory type are overwritten and `updated_at` is refreshed.
pub fn save_entry(conn: &mut Connection, entry: &NewEntry) -> Result<SaveResult> {
    let tx = conn.transaction()?;
    let now = now_timestamp();
    let tags_json = serde_json::to_string(&entry.tags)?;

    let (id, created_at): (i64, String) = tx.query_row(
        "INSERT INTO entries (topic, content, source, user_id, tags, confidence, memory_type, \
                              access_count, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8) \
         ON CONFLICT(topic, source, content) DO UPDATE SET \
             user_id = excluded.user_id, \
             tags = excluded.tags, \
             confidence = excluded.confidence, \
             memory_type = excluded.memory_type, \
             updated_at = excluded.updated_at \
         RETURNING id, created_at",
        params![
            entry.topic,
            entry.content,
            entry.source,
            entry.user_id,
            tags_json,
            entry.confidence,
            entry.memory_type.as_str(),
            now,
        ],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let updated = created_at != now;
    write_audit_log(
        &tx,
        if updated { "update" } else { "create" },
        id,
        Some(&serde_json::json!({
            "source": entry.source,
            "user_id": entry.user_id,
            "type": entry.memory_type.as_str(),
        })),
    )?;
    tx.commit()?;

    Ok(SaveResult {
        id,
        memory_type: entry.memory_type,
        updated,
    })
}

/// Fetch one entry by id.
pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<KnowledgeEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1"),
            params![id],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Every entry in the store, oldest first.
pub fn all_entries(conn: &Connection) -> Result<Vec<KnowledgeEntry>> {
    let mut stmt = conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entries ORDER BY id"))?;
    let rows = stmt
        .query_map([], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete an entry by id. Returns `false` if it did not exist.
pub fn delete_entry(conn: &mut Connection, id: i64) -> Result<bool> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
    if removed == 0 {
        return Ok(false);
    }
    write_audit_log(&tx, "delete", id, None)?;
    tx.commit()?;
    Ok(true)
}

/// Entries updated within the last `hours`, newest first.
pub fn recent_changes(
    conn: &Connection,
    hours: u32,
    source: Option<&str>,
    limit: usize,
) -> Result<Vec<KnowledgeEntry>> {
    let cutoff = format_timestamp(Utc::now() - Duration::hours(hours as i64));
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries \
         WHERE updated_at >= ?1 AND (?2 IS NULL OR source = ?2) \
         ORDER BY updated_at DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt
        .query_map(params![cutoff, source, limit as i64], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Bump access_count and last_accessed once per distinct id.
pub fn record_access(conn: &Connection, ids: &[i64]) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let now = now_timestamp();
    let mut stmt = conn.prepare(
        "UPDATE entries SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
    )?;
    let mut touched = 0;
    for id in &unique {
        touched += stmt.execute(params![now, id])?;
    }
    Ok(touched)
}

/// Audit trail for one entry, oldest first.
pub fn entry_log(conn: &Connection, id: i64) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT operation, details, created_at FROM entry_log \
         WHERE entry_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![id], |row| {
            let details: Option<String> = row.get(1)?;
            Ok(LogEntry {
                operation: row.get(0)?,
                details: details.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Write an entry to the entry_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    entry_id: i64,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO entry_log (operation, entry_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, entry_id, details_json, now_timestamp()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn new_entry(topic: &str, content: &str) -> NewEntry {
        NewEntry {
            topic: topic.into(),
            content: content.into(),
            source: "website".into(),
            tags: vec!["deploy".into()],
            confidence: 0.8,
            user_id: "alice".into(),
            memory_type: MemoryType::Pattern,
        }
    }

    #[test]
    fn test_save_new_entry() {
        let mut conn = db::open_memory_database().unwrap();
        let result = save_entry(&mut conn, &new_entry("deploy-notes", "Run migrations first")).unwrap();
        assert!(!result.updated);
        assert_eq!(result.memory_type, MemoryType::Pattern);

        let entry = get_entry(&conn, result.id).unwrap().unwrap();
        assert_eq!(entry.content, "Run migrations first");
        assert_eq!(entry.tags, vec!["deploy"]);
        assert_eq!(entry.access_count, 0);
        assert!(entry.last_accessed.is_none());
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn test_upsert_by_natural_key_preserves_id() {
        let mut conn = db::open_memory_database().unwrap();
        let first = save_entry(&mut conn, &new_entry("deploy-notes", "Run migrations first")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));

        let mut again = new_entry("deploy-notes", "Run migrations first");
        again.tags = vec!["ops".into()];
        again.confidence = 0.4;
        again.user_id = "bob".into();
        again.memory_type = MemoryType::Decision;
        let second = save_entry(&mut conn, &again).unwrap();

        assert_eq!(second.id, first.id);
        assert!(second.updated);

        let entry = get_entry(&conn, first.id).unwrap().unwrap();
        assert_eq!(entry.tags, vec!["ops"]);
        assert_eq!(entry.confidence, 0.4);
        assert_eq!(entry.user_id, "bob");
        assert_eq!(entry.memory_type, MemoryType::Decision);
        assert!(entry.updated_at > entry.created_at);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_different_source_is_a_different_entry() {
        let mut conn = db::open_memory_database().unwrap();
        let a = save_entry(&mut conn, &new_entry("deploy-notes", "Same text")).unwrap();
        let mut other = new_entry("deploy-notes", "Same text");
        other.source = "stripe".into();
        let b = save_entry(&mut conn, &other).unwrap();
        assert_ne!(a.id, b.id);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_delete_reports_missing() {
        let mut conn = db::open_memory_database().unwrap();
        let id = save_entry(&mut conn, &new_entry("t", "c")).unwrap().id;
        assert!(delete_entry(&mut conn, id).unwrap());
        assert!(!delete_entry(&mut conn, id).unwrap());
        assert!(get_entry(&conn, id).unwrap().is_none());

        let ops: Vec<String> = entry_log(&conn, id)
            .unwrap()
            .into_iter()
            .map(|l| l.operation)
            .collect();
        assert_eq!(ops, vec!["create", "delete"]);
    }

    #[test]
    fn test_record_access_counts_each_id_once() {
        let mut conn = db::open_memory_database().unwrap();
        let id = save_entry(&mut conn, &new_entry("t", "c")).unwrap().id;

        assert_eq!(record_access(&conn, &[id, id, id]).unwrap(), 1);
        let entry = get_entry(&conn, id).unwrap().unwrap();
        assert_eq!(entry.access_count, 1);
        assert!(entry.last_accessed.is_some());

        // Missing ids are ignored
        assert_eq!(record_access(&conn, &[9999]).unwrap(), 0);
    }

    #[test]
    fn test_recent_changes_window_and_source() {
        let mut conn = db::open_memory_database().unwrap();
        let fresh = save_entry(&mut conn, &new_entry("fresh", "new stuff")).unwrap().id;
        let old = save_entry(&mut conn, &new_entry("old", "old stuff")).unwrap().id;
        let backdated = format_timestamp(Utc::now() - Duration::hours(48));
        conn.execute(
            "UPDATE entries SET updated_at = ?1 WHERE id = ?2",
            params![backdated, old],
        )
        .unwrap();

        let recent = recent_changes(&conn, 24, None, 50).unwrap();
        let ids: Vec<i64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![fresh]);

        assert_eq!(recent_changes(&conn, 72, None, 50).unwrap().len(), 2);
        assert!(recent_changes(&conn, 72, Some("stripe"), 50).unwrap().is_empty());
    }
}

//! SQL DDL for all lore tables.
//!
//! Defines `entries`, the `entries_fts` (FTS5) index with its sync triggers,
//! the `entry_log` audit table, and `schema_meta`. All DDL uses `IF NOT EXISTS`
//! for idempotent initialization.

use rusqlite::Connection;

/// The schema version that the current binary writes.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
-- Knowledge entries. (topic, source, content) is the natural key for upserts.
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT NOT NULL CHECK(length(topic) BETWEEN 1 AND 100),
    content TEXT NOT NULL CHECK(length(content) BETWEEN 1 AND 2000),
    source TEXT NOT NULL,
    user_id TEXT NOT NULL DEFAULT 'unknown',
    tags TEXT NOT NULL DEFAULT '[]',
    confidence REAL NOT NULL DEFAULT 1.0 CHECK(confidence >= 0.0 AND confidence <= 1.0),
    memory_type TEXT NOT NULL CHECK(memory_type IN ('core','architecture','pattern','decision')),
    access_count INTEGER NOT NULL DEFAULT 0 CHECK(access_count >= 0),
    last_accessed TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(topic, source, content)
);

CREATE INDEX IF NOT EXISTS idx_entries_source ON entries(source);
CREATE INDEX IF NOT EXISTS idx_entries_type ON entries(memory_type);
CREATE INDEX IF NOT EXISTS idx_entries_updated ON entries(updated_at);
CREATE INDEX IF NOT EXISTS idx_entries_topic ON entries(topic);

-- Full-text index over topic, content, and tags (external content).
CREATE VIRTUAL TABLE IF NOT EXISTS entries_fts USING fts5(
    topic,
    content,
    tags,
    content='entries',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS entries_fts_insert AFTER INSERT ON entries BEGIN
    INSERT INTO entries_fts(rowid, topic, content, tags)
    VALUES (new.id, new.topic, new.content, new.tags);
END;

CREATE TRIGGER IF NOT EXISTS entries_fts_delete AFTER DELETE ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, topic, content, tags)
    VALUES ('delete', old.id, old.topic, old.content, old.tags);
END;

CREATE TRIGGER IF NOT EXISTS entries_fts_update AFTER UPDATE OF topic, content, tags ON entries BEGIN
    INSERT INTO entries_fts(entries_fts, rowid, topic, content, tags)
    VALUES ('delete', old.id, old.topic, old.content, old.tags);
    INSERT INTO entries_fts(rowid, topic, content, tags)
    VALUES (new.id, new.topic, new.content, new.tags);
END;

-- Audit log. Entries are never removed without a row here.
CREATE TABLE IF NOT EXISTS entry_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    operation TEXT NOT NULL CHECK(operation IN ('create','update','merge','delete','prune')),
    entry_id INTEGER NOT NULL,
    details TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entry_log_entry ON entry_log(entry_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Read the stored schema version.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

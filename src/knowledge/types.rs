//! Core knowledge type definitions.
//!
//! Defines [`MemoryType`] (the four decay classes), [`KnowledgeEntry`] (a full
//! record of the `entries` table), and the timestamp helpers every module uses
//! so stored times sort lexically in chronological order.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Tag that exempts an entry from decay and pruning entirely.
pub const PROTECTED_TAG: &str = "protected";
/// Tag that forces the `core` decay class.
pub const CORE_TAG: &str = "core";
/// Tag that forces the `architecture` decay class.
pub const ARCHITECTURE_TAG: &str = "architecture";
/// Tag that forces the `decision` decay class.
pub const DECISION_TAG: &str = "decision";

/// Decay class of an entry. Drives how fast its retention score falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// Credentials, ids, agent rules; never decays below the core floor.
    Core,
    /// Structural knowledge about systems; slowest decay.
    Architecture,
    /// Reusable how-to knowledge; the default class.
    Pattern,
    /// Rationale records; fastest decay.
    Decision,
}

impl MemoryType {
    pub const ALL: [MemoryType; 4] = [
        MemoryType::Core,
        MemoryType::Architecture,
        MemoryType::Pattern,
        MemoryType::Decision,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Architecture => "architecture",
            Self::Pattern => "pattern",
            Self::Decision => "decision",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(Self::Core),
            "architecture" => Ok(Self::Architecture),
            "pattern" => Ok(Self::Pattern),
            "decision" => Ok(Self::Decision),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// A knowledge entry, matching the `entries` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Monotonically assigned primary key.
    pub id: i64,
    pub topic: String,
    pub content: String,
    /// Provenance tag of the project that wrote the entry.
    pub source: String,
    pub user_id: String,
    pub tags: Vec<String>,
    /// Confidence in `[0.0, 1.0]` supplied by the writer.
    pub confidence: f64,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Number of times this entry has been returned by a read.
    pub access_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl KnowledgeEntry {
    /// Whether the entry carries `tag` (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        has_tag(&self.tags, tag)
    }

    /// Core and protected entries are never scored for pruning.
    pub fn is_immune(&self) -> bool {
        self.memory_type == MemoryType::Core || self.has_tag(PROTECTED_TAG)
    }
}

/// Column list matching [`entry_from_row`], in order.
pub const ENTRY_COLUMNS: &str = "id, topic, content, source, user_id, tags, confidence, \
     memory_type, access_count, last_accessed, created_at, updated_at";

/// Map a row selected with [`ENTRY_COLUMNS`] into a [`KnowledgeEntry`].
pub fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<KnowledgeEntry> {
    let tags_json: String = row.get(5)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let memory_type: String = row.get(7)?;
    let memory_type = memory_type.parse::<MemoryType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(7, Type::Text, e.into())
    })?;

    Ok(KnowledgeEntry {
        id: row.get(0)?,
        topic: row.get(1)?,
        content: row.get(2)?,
        source: row.get(3)?,
        user_id: row.get(4)?,
        tags,
        confidence: row.get(6)?,
        memory_type,
        access_count: row.get(8)?,
        last_accessed: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub fn has_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

/// Fixed-width RFC 3339 UTC timestamp (microseconds, `Z` suffix).
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid timestamp: {s}"))
}

/// Truncate content to max_chars, appending "..." if truncated.
pub fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let end = content
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(content.len());
        format!("{}...", &content[..end])
    }
}

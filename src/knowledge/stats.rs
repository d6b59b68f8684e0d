use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::prune::{partition_candidates, PruneCandidate};
use super::retention::{score_entry, ScoreBand};
use super::store::all_entries;
use super::types::{entry_from_row, KnowledgeEntry, MemoryType, ENTRY_COLUMNS};
use crate::config::{MaintenanceConfig, RetentionConfig};

/// Number of most-accessed entries listed in the health report.
const TOP_ACCESSED: usize = 10;
/// Number of stale candidates listed in the health report.
const STALE_CANDIDATES: usize = 20;

/// Count of entries per health band.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ScoreDistribution {
    pub healthy: u64,
    pub aging: u64,
    pub stale: u64,
    pub decay: u64,
}

#[derive(Debug, Serialize)]
pub struct AccessSummary {
    pub id: i64,
    pub topic: String,
    pub source: String,
    pub access_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<String>,
}

/// Response from health_report.
///
/// Aggregates are computed independently; one that fails is left empty and
/// named in `errors` while the others are still reported.
#[derive(Debug, Default, Serialize)]
pub struct HealthReport {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_source: BTreeMap<String, u64>,
    pub score_distribution: ScoreDistribution,
    pub never_accessed: u64,
    pub top_accessed: Vec<AccessSummary>,
    pub stale_candidates: Vec<PruneCandidate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// One row of list_topics.
#[derive(Debug, Serialize)]
pub struct TopicSummary {
    pub topic: String,
    pub count: u64,
    pub last_updated: String,
    pub sources: Vec<String>,
    pub avg_retention: f64,
}

/// Compute the store health report.
pub fn health_report(
    conn: &Connection,
    retention: &RetentionConfig,
    maintenance: &MaintenanceConfig,
) -> HealthReport {
    let now = Utc::now();
    let mut errors = Vec::new();

    let total = isolate("total", &mut errors, count_entries(conn));
    let by_type = isolate("by_type", &mut errors, count_by_type(conn));
    let by_source = isolate("by_source", &mut errors, count_by_source(conn));
    let never_accessed = isolate("never_accessed", &mut errors, count_never_accessed(conn));
    let top_accessed = isolate("top_accessed", &mut errors, top_accessed(conn));

    let entries = isolate("entries", &mut errors, all_entries(conn));
    let score_distribution = isolate(
        "score_distribution",
        &mut errors,
        score_distribution(&entries, retention, now),
    );
    let stale_candidates = isolate(
        "stale_candidates",
        &mut errors,
        stale_candidates(&entries, retention, maintenance, now),
    );

    HealthReport {
        total,
        by_type,
        by_source,
        score_distribution,
        never_accessed,
        top_accessed,
        stale_candidates,
        errors,
    }
}

/// Per-topic aggregates, most recently updated topic first.
pub fn list_topics(
    conn: &Connection,
    source: Option<&str>,
    retention: &RetentionConfig,
) -> Result<Vec<TopicSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE (?1 IS NULL OR source = ?1) ORDER BY id"
    ))?;
    let entries = stmt
        .query_map(params![source], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    struct Acc {
        count: u64,
        last_updated: String,
        sources: BTreeSet<String>,
        score_sum: f64,
    }

    let now = Utc::now();
    let mut topics: HashMap<String, Acc> = HashMap::new();
    for entry in &entries {
        let score = score_entry(retention, entry, now)?;
        let acc = topics.entry(entry.topic.clone()).or_insert_with(|| Acc {
            count: 0,
            last_updated: entry.updated_at.clone(),
            sources: BTreeSet::new(),
            score_sum: 0.0,
        });
        acc.count += 1;
        acc.score_sum += score;
        acc.sources.insert(entry.source.clone());
        if entry.updated_at > acc.last_updated {
            acc.last_updated = entry.updated_at.clone();
        }
    }

    let mut summaries: Vec<TopicSummary> = topics
        .into_iter()
        .map(|(topic, acc)| TopicSummary {
            topic,
            count: acc.count,
            last_updated: acc.last_updated,
            sources: acc.sources.into_iter().collect(),
            avg_retention: round3(acc.score_sum / acc.count as f64),
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    Ok(summaries)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Keep a failed aggregate's default value and remember the failure.
fn isolate<T: Default>(name: &str, errors: &mut Vec<String>, result: Result<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(aggregate = name, error = %format!("{e:#}"), "health aggregate failed");
        errors.push(format!("{name}: {e:#}"));
        T::default()
    })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn count_entries(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn count_never_accessed(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE access_count = 0",
        [],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Count by memory type, zero-filled for all four types.
fn count_by_type(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut map: BTreeMap<String, u64> = MemoryType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    map.extend(grouped_counts(conn, "memory_type")?);
    Ok(map)
}

fn count_by_source(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    Ok(grouped_counts(conn, "source")?.into_iter().collect())
}

fn grouped_counts(conn: &Connection, column: &str) -> Result<Vec<(String, u64)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM entries GROUP BY {column}"
    ))?;
    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn top_accessed(conn: &Connection) -> Result<Vec<AccessSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, topic, source, access_count, last_accessed FROM entries \
         WHERE access_count > 0 ORDER BY access_count DESC, id ASC LIMIT ?1",
    )?;
    let rows = stmt
        .query_map(params![TOP_ACCESSED as i64], |row| {
            Ok(AccessSummary {
                id: row.get(0)?,
                topic: row.get(1)?,
                source: row.get(2)?,
                access_count: row.get(3)?,
                last_accessed: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn score_distribution(
    entries: &[KnowledgeEntry],
    retention: &RetentionConfig,
    now: DateTime<Utc>,
) -> Result<ScoreDistribution> {
    let mut dist = ScoreDistribution::default();
    for entry in entries {
        match ScoreBand::from_score(score_entry(retention, entry, now)?) {
            ScoreBand::Healthy => dist.healthy += 1,
            ScoreBand::Aging => dist.aging += 1,
            ScoreBand::Stale => dist.stale += 1,
            ScoreBand::Decay => dist.decay += 1,
        }
    }
    Ok(dist)
}

/// Lowest-scoring non-immune entries below the flag threshold.
fn stale_candidates(
    entries: &[KnowledgeEntry],
    retention: &RetentionConfig,
    maintenance: &MaintenanceConfig,
    now: DateTime<Utc>,
) -> Result<Vec<PruneCandidate>> {
    let (mut delete, flag) = partition_candidates(entries, retention, maintenance, now)?;
    delete.extend(flag);
    delete.truncate(STALE_CANDIDATES);
    Ok(delete)
}

//! Pruning sweep: delete entries whose retention has decayed away and flag the
//! ones heading there.
//!
//! Core and protected entries are excluded from the candidate set before any
//! scoring. The flag band is advisory: flagged entries are reported, never removed.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;

use super::retention::score_entry;
use super::store::{all_entries, write_audit_log};
use super::types::{truncate_preview, KnowledgeEntry, MemoryType};
use crate::config::{MaintenanceConfig, RetentionConfig};

#[derive(Debug, Clone, Serialize)]
pub struct PruneCandidate {
    pub id: i64,
    pub topic: String,
    pub source: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub score: f64,
    pub content_preview: String,
}

#[derive(Debug, Serialize)]
pub struct PruneResult {
    pub deleted: Vec<PruneCandidate>,
    pub flagged: Vec<PruneCandidate>,
    pub dry_run: bool,
}

impl PruneCandidate {
    fn new(entry: &KnowledgeEntry, score: f64) -> Self {
        Self {
            id: entry.id,
            topic: entry.topic.clone(),
            source: entry.source.clone(),
            memory_type: entry.memory_type,
            score,
            content_preview: truncate_preview(&entry.content, 80),
        }
    }
}

/// Score every non-immune entry and split into (delete, flag) bands, lowest score first.
pub fn partition_candidates(
    entries: &[KnowledgeEntry],
    retention: &RetentionConfig,
    maintenance: &MaintenanceConfig,
    now: DateTime<Utc>,
) -> Result<(Vec<PruneCandidate>, Vec<PruneCandidate>)> {
    let mut delete = Vec::new();
    let mut flag = Vec::new();

    for entry in entries.iter().filter(|e| !e.is_immune()) {
        let score = score_entry(retention, entry, now)?;
        if score < maintenance.delete_threshold {
            delete.push(PruneCandidate::new(entry, score));
        } else if score < maintenance.flag_threshold {
            flag.push(PruneCandidate::new(entry, score));
        }
    }

    let by_score = |a: &PruneCandidate, b: &PruneCandidate| a.score.total_cmp(&b.score);
    delete.sort_by(by_score);
    flag.sort_by(by_score);
    Ok((delete, flag))
}

/// Run the sweep on one connection. With `dry_run` nothing is deleted.
///
/// Scoring and deletion are separate passes and no transaction spans both.
/// Callers sharing the connection (see `KnowledgeService::prune`) release it
/// between the passes, so an entry rewritten after it was scored can still be
/// deleted on the stale score. That window is accepted.
pub fn prune(
    conn: &mut Connection,
    retention: &RetentionConfig,
    maintenance: &MaintenanceConfig,
    dry_run: bool,
) -> Result<PruneResult> {
    let entries = all_entries(conn)?;
    let (deleted, flagged) = partition_candidates(&entries, retention, maintenance, Utc::now())?;

    if !dry_run && !deleted.is_empty() {
        delete_candidates(conn, &deleted)?;
    }

    tracing::info!(
        scanned = entries.len(),
        deleted = deleted.len(),
        flagged = flagged.len(),
        dry_run,
        "prune sweep finished"
    );

    Ok(PruneResult {
        deleted,
        flagged,
        dry_run,
    })
}

/// Delete all candidates in one transaction. Ids that vanished since scoring
/// are skipped.
pub fn delete_candidates(conn: &mut Connection, candidates: &[PruneCandidate]) -> Result<()> {
    if candidates.is_empty() {
        return Ok(());
    }
    let tx = conn.transaction()?;

    let placeholders = vec!["?"; candidates.len()].join(", ");
    let removed = tx.execute(
        &format!("DELETE FROM entries WHERE id IN ({placeholders})"),
        params_from_iter(candidates.iter().map(|c| c.id)),
    )?;

    for candidate in candidates {
        write_audit_log(
            &tx,
            "prune",
            candidate.id,
            Some(&serde_json::json!({
                "score": candidate.score,
                "topic": candidate.topic,
            })),
        )?;
    }
    tx.commit()?;

    if removed != candidates.len() {
        tracing::debug!(
            expected = candidates.len(),
            removed,
            "some prune candidates vanished before deletion"
        );
    }
    Ok(())
}

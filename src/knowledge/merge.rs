//! Atomic consolidation of two entries into one.
//!
//! The kept entry receives the union of both tag sets, the sum of both access
//! counts, the higher confidence, and the later `last_accessed`; the other entry
//! is deleted. Everything happens in one transaction, and an early return drops
//! the uncommitted transaction, which rolls it back.

use anyhow::Result;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

use super::store::{get_entry, write_audit_log};
use super::types::{now_timestamp, KnowledgeEntry};

#[derive(Debug, Serialize)]
pub struct MergeResult {
    pub merged: bool,
    pub keep_id: i64,
    pub delete_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<KnowledgeEntry>,
}

/// Tag union, first spelling wins, compared case-insensitively.
fn union_tags(keep: &[String], other: &[String]) -> Vec<String> {
    let mut out: Vec<String> = keep.to_vec();
    for tag in other {
        if !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.clone());
        }
    }
    out
}

fn later(a: Option<&String>, b: Option<&String>) -> Option<String> {
    // Fixed-width timestamps compare lexically.
    match (a, b) {
        (Some(a), Some(b)) => Some(if a >= b { a.clone() } else { b.clone() }),
        (a, b) => a.or(b).cloned(),
    }
}

/// Merge `delete_id` into `keep_id`. Returns `merged: false` without touching
/// either row when one of them does not exist.
pub fn merge_entries(
    conn: &mut Connection,
    keep_id: i64,
    delete_id: i64,
    merged_content: Option<&str>,
) -> Result<MergeResult> {
    let tx = conn.transaction()?;

    let (Some(keep), Some(gone)) = (get_entry(&tx, keep_id)?, get_entry(&tx, delete_id)?)
    else {
        tracing::info!(keep_id, delete_id, "merge skipped: entry not found");
        return Ok(MergeResult {
            merged: false,
            keep_id,
            delete_id,
            entry: None,
        });
    };

    apply_merge(&tx, &keep, &gone, merged_content)?;
    let merged = get_entry(&tx, keep_id)?;
    tx.commit()?;

    Ok(MergeResult {
        merged: true,
        keep_id,
        delete_id,
        entry: merged,
    })
}

fn apply_merge(
    tx: &Transaction,
    keep: &KnowledgeEntry,
    gone: &KnowledgeEntry,
    merged_content: Option<&str>,
) -> Result<()> {
    let tags = union_tags(&keep.tags, &gone.tags);
    let access_count = keep.access_count.saturating_add(gone.access_count);
    let confidence = keep.confidence.max(gone.confidence);
    let content = merged_content.unwrap_or(&keep.content);
    let last_accessed = later(keep.last_accessed.as_ref(), gone.last_accessed.as_ref());

    tx.execute(
        "UPDATE entries SET tags = ?1, access_count = ?2, confidence = ?3, content = ?4, \
         last_accessed = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            serde_json::to_string(&tags)?,
            access_count,
            confidence,
            content,
            last_accessed,
            now_timestamp(),
            keep.id,
        ],
    )?;
    tx.execute("DELETE FROM entries WHERE id = ?1", params![gone.id])?;

    let details = serde_json::json!({
        "kept": keep.id,
        "deleted": gone.id,
        "deleted_topic": gone.topic,
        "content_replaced": merged_content.is_some(),
    });
    write_audit_log(tx, "merge", keep.id, Some(&details))?;
    write_audit_log(tx, "merge", gone.id, Some(&details))?;
    Ok(())
}

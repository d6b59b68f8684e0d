//! Near-duplicate detection over every unordered pair of entries.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

/// Maximum number of pairs returned by one scan.
pub const MAX_DUPLICATE_PAIRS: usize = 50;

/// A candidate pair, `id_a < id_b`.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicatePair {
    pub id_a: i64,
    pub topic_a: String,
    pub id_b: i64,
    pub topic_b: String,
    pub similarity: f64,
}

/// Pairs whose topic+content trigram similarity is strictly above `threshold`,
/// most similar first. Read-only.
pub fn find_duplicates(conn: &Connection, threshold: f64) -> Result<Vec<DuplicatePair>> {
    let mut stmt = conn.prepare(
        "SELECT id_a, topic_a, id_b, topic_b, sim FROM ( \
             SELECT a.id AS id_a, a.topic AS topic_a, b.id AS id_b, b.topic AS topic_b, \
                    similarity(a.topic || ' ' || a.content, b.topic || ' ' || b.content) AS sim \
             FROM entries a JOIN entries b ON a.id < b.id \
         ) WHERE sim > ?1 \
         ORDER BY sim DESC, id_a ASC, id_b ASC LIMIT ?2",
    )?;
    let pairs = stmt
        .query_map(params![threshold, MAX_DUPLICATE_PAIRS as i64], |row| {
            Ok(DuplicatePair {
                id_a: row.get(0)?,
                topic_a: row.get(1)?,
                id_b: row.get(2)?,
                topic_b: row.get(3)?,
                similarity: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(pairs)
}

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::HashSet;

use super::types::{entry_from_row, KnowledgeEntry, ENTRY_COLUMNS};

// ── Public types ──────────────────────────────────────────────────────────────

/// BM25 column weights for (topic, content, tags).
const TOPIC_WEIGHT: f64 = 10.0;
const CONTENT_WEIGHT: f64 = 4.0;
const TAGS_WEIGHT: f64 = 1.0;

/// Minimum token length for the substring fallback.
const FALLBACK_MIN_TOKEN_CHARS: usize = 3;
/// Minimum trimmed query length before the fallback is attempted.
const FALLBACK_MIN_QUERY_CHARS: usize = 2;

/// Hard predicates applied by both search tiers.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub source: Option<String>,
    /// Every listed tag must be present on the entry.
    pub tags: Vec<String>,
}

/// Which tier produced the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    FullText,
    Substring,
    None,
}

/// A single ranked result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    /// Negated BM25 for full-text hits, fraction of tokens matched for substring hits.
    pub relevance: f64,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub strategy: SearchStrategy,
}

impl SearchResponse {
    /// Ids of every returned entry, for access recording.
    pub fn ids(&self) -> Vec<i64> {
        self.results.iter().map(|h| h.entry.id).collect()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Two-tier search: prefix full-text first, substring fallback when it finds nothing.
///
/// Read-only. Callers record access for the returned ids separately.
pub fn search(
    conn: &Connection,
    query: &str,
    filter: &SearchFilter,
    limit: usize,
) -> Result<SearchResponse> {
    let primary = fts_search(conn, query, filter, limit)?;
    if !primary.is_empty() {
        return Ok(SearchResponse {
            results: primary,
            strategy: SearchStrategy::FullText,
        });
    }

    if query.trim().chars().count() < FALLBACK_MIN_QUERY_CHARS {
        return Ok(SearchResponse {
            results: Vec::new(),
            strategy: SearchStrategy::None,
        });
    }

    tracing::debug!(query, "no full-text hits, falling back to substring match");
    let fallback = substring_search(conn, query, filter, limit)?;
    let strategy = if fallback.is_empty() {
        SearchStrategy::None
    } else {
        SearchStrategy::Substring
    };
    Ok(SearchResponse {
        results: fallback,
        strategy,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Build an FTS5 query where every whitespace token must match as a prefix.
///
/// Each token is quoted so FTS5 operators in user input are treated as text.
/// Tokens without any letter or digit are dropped.
fn prefix_match_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphanumeric))
        .map(|word| format!("\"{}\"*", word.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

/// Lower-cased, de-duplicated fallback tokens of at least three characters.
fn fallback_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= FALLBACK_MIN_TOKEN_CHARS)
        .map(str::to_lowercase)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Append the source/tag predicates to `sql` and their values to `values`.
fn push_filter(sql: &mut String, values: &mut Vec<Value>, filter: &SearchFilter) {
    if let Some(source) = &filter.source {
        sql.push_str(" AND source = ?");
        values.push(Value::Text(source.clone()));
    }
    for tag in &filter.tags {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM json_each(tags) WHERE lower(json_each.value) = lower(?))",
        );
        values.push(Value::Text(tag.clone()));
    }
}

fn collect_hits(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<SearchHit>> {
    let mut stmt = conn.prepare(sql)?;
    let hits = stmt
        .query_map(params_from_iter(values.iter()), |row| {
            Ok(SearchHit {
                entry: entry_from_row(row)?,
                relevance: row.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(hits)
}

/// Weighted BM25 prefix search over topic, content, and tags.
fn fts_search(
    conn: &Connection,
    query: &str,
    filter: &SearchFilter,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let Some(match_query) = prefix_match_query(query) else {
        return Ok(Vec::new());
    };

    let mut sql = format!(
        "SELECT {ENTRY_COLUMNS}, relevance FROM entries \
         JOIN (SELECT rowid AS hit_id, \
                      -bm25(entries_fts, {TOPIC_WEIGHT:.1}, {CONTENT_WEIGHT:.1}, {TAGS_WEIGHT:.1}) AS relevance \
               FROM entries_fts WHERE entries_fts MATCH ?) hits \
           ON hits.hit_id = entries.id \
         WHERE 1 = 1"
    );
    let mut values = vec![Value::Text(match_query)];
    push_filter(&mut sql, &mut values, filter);
    sql.push_str(" ORDER BY relevance DESC, id ASC LIMIT ?");
    values.push(Value::Integer(limit as i64));

    collect_hits(conn, &sql, &values)
}

/// Case-insensitive substring match, ranked by the fraction of tokens found
/// in the topic or content.
fn substring_search(
    conn: &Connection,
    query: &str,
    filter: &SearchFilter,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let tokens = fallback_tokens(query);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut values = Vec::with_capacity(tokens.len() * 2 + filter.tags.len() + 2);
    // Tokens are already lowercased; fold_case lowers the columns the same way.
    let matches: Vec<&str> = tokens
        .iter()
        .map(|token| {
            values.push(Value::Text(token.clone()));
            values.push(Value::Text(token.clone()));
            "(CASE WHEN instr(fold_case(topic), ?) > 0 OR instr(fold_case(content), ?) > 0 \
             THEN 1 ELSE 0 END)"
        })
        .collect();

    let mut sql = format!(
        "SELECT {ENTRY_COLUMNS}, match_fraction FROM \
         (SELECT *, ({}) * 1.0 / {} AS match_fraction FROM entries) \
         WHERE match_fraction > 0",
        matches.join(" + "),
        tokens.len()
    );
    push_filter(&mut sql, &mut values, filter);
    sql.push_str(" ORDER BY match_fraction DESC, id ASC LIMIT ?");
    values.push(Value::Integer(limit as i64));

    collect_hits(conn, &sql, &values)
}

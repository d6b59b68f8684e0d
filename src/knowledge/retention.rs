//! Retention scoring: how trustworthy and relevant an entry is *right now*.
//!
//! The score is a fixed, auditable blend of three signals:
//!
//! | Signal | Formula | Weight |
//! |--------|---------|--------|
//! | importance | `confidence * exp(-rate * days_since_created)` | 0.4 |
//! | access frequency | `min(ln(access_count + 1) / ln(50), 1)` | 0.3 |
//! | recency | `max(1 - days_since_access / 180, 0)` | 0.3 |
//!
//! Protected entries always score 1.0 and core entries never drop below the
//! core floor. Scores depend on the current time, so they are recomputed on
//! every call and never stored.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::{has_tag, parse_timestamp, KnowledgeEntry, MemoryType, PROTECTED_TAG};
use crate::config::RetentionConfig;

/// Lower bound of the `healthy` band.
pub const HEALTHY_THRESHOLD: f64 = 0.7;
/// Lower bound of the `aging` band.
pub const AGING_THRESHOLD: f64 = 0.3;
/// Lower bound of the `stale` band; anything below is `decay`.
pub const STALE_THRESHOLD: f64 = 0.1;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Health bucket used by reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Healthy,
    Aging,
    Stale,
    Decay,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HEALTHY_THRESHOLD {
            Self::Healthy
        } else if score >= AGING_THRESHOLD {
            Self::Aging
        } else if score >= STALE_THRESHOLD {
            Self::Stale
        } else {
            Self::Decay
        }
    }
}

/// Per-day decay rate for a non-core class.
fn decay_rate(policy: &RetentionConfig, memory_type: MemoryType) -> f64 {
    match memory_type {
        MemoryType::Architecture => policy.architecture_decay_rate,
        MemoryType::Pattern => policy.pattern_decay_rate,
        MemoryType::Decision => policy.decision_decay_rate,
        // Handled before decay is consulted.
        MemoryType::Core => 0.0,
    }
}

/// Whole and fractional days from `then` to `now`, never negative.
fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - then).num_milliseconds() as f64 / 1000.0;
    (secs / SECONDS_PER_DAY).max(0.0)
}

/// Compute the retention score in `[0, 1]`.
///
/// `last_accessed` falls back to `created_at` when the entry was never read.
#[allow(clippy::too_many_arguments)]
pub fn retention_score(
    policy: &RetentionConfig,
    confidence: f64,
    access_count: u32,
    last_accessed: Option<DateTime<Utc>>,
    memory_type: MemoryType,
    tags: &[String],
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    if has_tag(tags, PROTECTED_TAG) {
        return 1.0;
    }

    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    if memory_type == MemoryType::Core {
        return confidence.max(policy.core_floor).clamp(0.0, 1.0);
    }

    let rate = decay_rate(policy, memory_type);
    let days_since_created = days_between(created_at, now);
    let days_since_access = days_between(last_accessed.unwrap_or(created_at), now);

    let importance = confidence * (-rate * days_since_created).exp();
    let access_frequency = ((access_count as f64 + 1.0).ln()
        / (policy.access_saturation as f64).ln())
    .min(1.0);
    let recency = (1.0 - days_since_access / policy.recency_window_days).max(0.0);

    let score = policy.importance_weight * importance
        + policy.access_weight * access_frequency
        + policy.recency_weight * recency;

    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score a stored entry, parsing its timestamps.
pub fn score_entry(
    policy: &RetentionConfig,
    entry: &KnowledgeEntry,
    now: DateTime<Utc>,
) -> Result<f64> {
    let created_at = parse_timestamp(&entry.created_at)?;
    let last_accessed = entry
        .last_accessed
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    Ok(retention_score(
        policy,
        entry.confidence,
        entry.access_count,
        last_accessed,
        entry.memory_type,
        &entry.tags,
        created_at,
        now,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> RetentionConfig {
        RetentionConfig::default()
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn score_aged(memory_type: MemoryType, confidence: f64, access: u32, age_days: i64) -> f64 {
        let now = Utc::now();
        let created = now - Duration::days(age_days);
        retention_score(&policy(), confidence, access, None, memory_type, &[], created, now)
    }

    #[test]
    fn fresh_pattern_entry_scores_importance_plus_recency() {
        // importance 1.0, access 0, recency 1.0 → 0.4 + 0 + 0.3
        let score = score_aged(MemoryType::Pattern, 1.0, 0, 0);
        assert!((score - 0.7).abs() < 1e-6, "got {score}");
    }

    #[test]
    fn protected_tag_is_always_one() {
        let now = Utc::now();
        let created = now - Duration::days(5000);
        let score = retention_score(
            &policy(),
            0.0,
            0,
            None,
            MemoryType::Decision,
            &tags(&["protected"]),
            created,
            now,
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn core_never_below_floor() {
        assert_eq!(score_aged(MemoryType::Core, 0.2, 0, 3000), 0.9);
        assert_eq!(score_aged(MemoryType::Core, 0.95, 0, 3000), 0.95);
    }

    #[test]
    fn decision_decays_faster_than_architecture() {
        let decision = score_aged(MemoryType::Decision, 1.0, 0, 90);
        let pattern = score_aged(MemoryType::Pattern, 1.0, 0, 90);
        let architecture = score_aged(MemoryType::Architecture, 1.0, 0, 90);
        assert!(decision < pattern);
        assert!(pattern < architecture);
    }

    #[test]
    fn access_frequency_saturates_at_fifty() {
        let at_49 = score_aged(MemoryType::Pattern, 1.0, 49, 0);
        let at_500 = score_aged(MemoryType::Pattern, 1.0, 500, 0);
        // ln(50)/ln(50) == 1.0, so both are fully saturated.
        assert!((at_49 - at_500).abs() < 1e-9);
        assert!((at_49 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recency_uses_last_access_when_present() {
        let now = Utc::now();
        let created = now - Duration::days(200);
        let never = retention_score(&policy(), 1.0, 0, None, MemoryType::Pattern, &[], created, now);
        let recent = retention_score(
            &policy(),
            1.0,
            0,
            Some(now - Duration::days(1)),
            MemoryType::Pattern,
            &[],
            created,
            now,
        );
        assert!(recent > never);
    }

    #[test]
    fn old_unused_entry_falls_into_decay_band() {
        let score = score_aged(MemoryType::Decision, 0.5, 0, 400);
        assert!(score < STALE_THRESHOLD, "got {score}");
        assert_eq!(ScoreBand::from_score(score), ScoreBand::Decay);
    }

    #[test]
    fn score_is_bounded_for_extreme_inputs() {
        let now = Utc::now();
        let cases = [
            (f64::NAN, 0, -10_000),
            (f64::INFINITY, u32::MAX, 0),
            (1.0, u32::MAX, 100_000),
            (-3.0, 0, 10),
        ];
        for (confidence, access, age) in cases {
            for t in MemoryType::ALL {
                let s = retention_score(
                    &policy(),
                    confidence,
                    access,
                    None,
                    t,
                    &[],
                    now - Duration::days(age),
                    now,
                );
                assert!((0.0..=1.0).contains(&s), "{t} {confidence} {access} {age} → {s}");
            }
        }
    }

    #[test]
    fn bands_match_thresholds() {
        assert_eq!(ScoreBand::from_score(0.7), ScoreBand::Healthy);
        assert_eq!(ScoreBand::from_score(0.69), ScoreBand::Aging);
        assert_eq!(ScoreBand::from_score(0.3), ScoreBand::Aging);
        assert_eq!(ScoreBand::from_score(0.1), ScoreBand::Stale);
        assert_eq!(ScoreBand::from_score(0.0999), ScoreBand::Decay);
    }
}

//! Decay-class assignment for new and updated entries.
//!
//! Rules are checked in order and the first match wins; anything unmatched is
//! reusable `pattern` knowledge.

use super::types::{has_tag, MemoryType, ARCHITECTURE_TAG, CORE_TAG, DECISION_TAG};

const CORE_TOPIC_MARKERS: &[&str] = &[
    "agent-rules",
    "sheet-ids",
    "api-key",
    "credentials",
    "deployment-id",
];

const ARCHITECTURE_TOPIC_MARKERS: &[&str] = &[
    "cms-api",
    "gas-webhook",
    "pricing",
    "stripe-api",
    "infrastructure",
    "architecture",
    "invoice-pdf",
];

/// Classify an entry from its topic and tags. Case-insensitive.
pub fn classify(topic: &str, tags: &[String]) -> MemoryType {
    let topic = topic.to_lowercase();
    let topic_has = |markers: &[&str]| markers.iter().any(|m| topic.contains(m));

    if topic_has(CORE_TOPIC_MARKERS) || has_tag(tags, CORE_TAG) {
        MemoryType::Core
    } else if topic_has(ARCHITECTURE_TOPIC_MARKERS) || has_tag(tags, ARCHITECTURE_TAG) {
        MemoryType::Architecture
    } else if has_tag(tags, DECISION_TAG) || topic.contains("decision") {
        MemoryType::Decision
    } else {
        MemoryType::Pattern
    }
}

/// Explicit caller override wins; the classifier only runs when none is given.
pub fn resolve_memory_type(explicit: Option<MemoryType>, topic: &str, tags: &[String]) -> MemoryType {
    explicit.unwrap_or_else(|| classify(topic, tags))
}

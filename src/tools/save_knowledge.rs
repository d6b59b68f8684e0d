//! MCP `save_knowledge` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::SaveRequest;

/// Parameters for the `save_knowledge` MCP tool.
///
/// Saving the same (topic, source, content) again updates the existing entry.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SaveKnowledgeParams {
    #[schemars(description = "Short topic key, e.g. 'stripe-webhooks' (max 100 chars)")]
    pub topic: String,

    #[schemars(description = "The knowledge itself (max 2000 chars)")]
    pub content: String,

    #[schemars(
        description = "Project the knowledge comes from: website, godot-pay, stripe, cms, gas, infrastructure, docs, unknown"
    )]
    pub source: String,

    #[schemars(
        description = "Up to 10 tags. 'core' and 'protected' make an entry immune to pruning."
    )]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Confidence 0.0-1.0. Defaults to 1.0.")]
    pub confidence: Option<f64>,

    #[schemars(description = "Who saved this (max 50 chars). Defaults to 'unknown'.")]
    pub user_id: Option<String>,

    #[schemars(
        description = "Memory type: 'core', 'architecture', 'pattern', 'decision'. Inferred from topic and tags when omitted."
    )]
    pub r#type: Option<String>,
}

impl From<SaveKnowledgeParams> for SaveRequest {
    fn from(p: SaveKnowledgeParams) -> Self {
        Self {
            topic: p.topic,
            content: p.content,
            source: p.source,
            tags: p.tags,
            confidence: p.confidence,
            user_id: p.user_id,
            memory_type: p.r#type,
        }
    }
}

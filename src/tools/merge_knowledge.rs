//! MCP `merge_knowledge` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `merge_knowledge` MCP tool. Merges are irreversible.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MergeKnowledgeParams {
    #[schemars(description = "ID of the entry that survives")]
    pub keep_id: i64,

    #[schemars(description = "ID of the entry folded into keep_id and then deleted")]
    pub delete_id: i64,

    #[schemars(
        description = "Replacement content for the surviving entry. Keeps its current content when omitted."
    )]
    pub merged_content: Option<String>,
}

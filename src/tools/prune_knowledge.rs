use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PruneKnowledgeParams {
    #[schemars(
        description = "If true (default), only report what would be deleted. Set false to delete entries scoring below 0.1."
    )]
    pub dry_run: Option<bool>,
}

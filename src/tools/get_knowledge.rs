use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetKnowledgeParams {
    #[schemars(description = "ID of the entry to fetch")]
    pub id: i64,
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::SearchRequest;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchKnowledgeParams {
    #[schemars(description = "Free-text query. Words match as prefixes and must all appear.")]
    pub query: String,

    #[schemars(description = "Only return entries from this source")]
    pub source: Option<String>,

    #[schemars(description = "Only return entries carrying every one of these tags")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Maximum number of results (1-50). Defaults to 10.")]
    pub limit: Option<usize>,
}

impl From<SearchKnowledgeParams> for SearchRequest {
    fn from(p: SearchKnowledgeParams) -> Self {
        Self {
            query: p.query,
            source: p.source,
            tags: p.tags,
            limit: p.limit,
        }
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecentChangesParams {
    #[schemars(description = "Look-back window in hours (1-720). Defaults to 24.")]
    pub hours: Option<u32>,

    #[schemars(description = "Only return entries from this source")]
    pub source: Option<String>,

    #[schemars(description = "Maximum number of results (1-50). Defaults to 10.")]
    pub limit: Option<usize>,
}

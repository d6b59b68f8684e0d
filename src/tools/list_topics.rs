use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListTopicsParams {
    #[schemars(description = "Only count entries from this source")]
    pub source: Option<String>,
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FindDuplicatesParams {
    #[schemars(
        description = "Similarity threshold (0.3-0.95). Pairs strictly above it are returned. Defaults to 0.6."
    )]
    pub threshold: Option<f64>,
}

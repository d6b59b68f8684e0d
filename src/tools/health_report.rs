use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `health_report` takes no arguments.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct HealthReportParams {}

pub mod delete_knowledge;
pub mod find_duplicates;
pub mod get_knowledge;
pub mod health_report;
pub mod list_topics;
pub mod merge_knowledge;
pub mod prune_knowledge;
pub mod recent_changes;
pub mod save_knowledge;
pub mod search_knowledge;

use delete_knowledge::DeleteKnowledgeParams;
use find_duplicates::FindDuplicatesParams;
use get_knowledge::GetKnowledgeParams;
use health_report::HealthReportParams;
use list_topics::ListTopicsParams;
use merge_knowledge::MergeKnowledgeParams;
use prune_knowledge::PruneKnowledgeParams;
use recent_changes::RecentChangesParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use save_knowledge::SaveKnowledgeParams;
use search_knowledge::SearchKnowledgeParams;
use serde::Serialize;

use crate::error::ServiceError;
use crate::service::KnowledgeService;

/// The Lore MCP tool handler. Wraps a [`KnowledgeService`] and exposes every
/// operation via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct LoreTools {
    tool_router: ToolRouter<Self>,
    service: KnowledgeService,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

fn describe(tool: &str, err: ServiceError) -> String {
    if err.is_retryable() {
        format!("{tool} failed (retryable): {err}")
    } else {
        format!("{tool} failed: {err}")
    }
}

#[tool_router]
impl LoreTools {
    pub fn new(service: KnowledgeService) -> Self {
        Self {
            tool_router: Self::tool_router(),
            service,
        }
    }

    /// Save a knowledge entry, updating it in place if it already exists.
    #[tool(description = "Save a knowledge entry. Saving the same topic, source and content again updates the existing entry instead of duplicating it. Types: core (rules, never decays), architecture (structure/config), pattern (how-to), decision (rationale).")]
    async fn save_knowledge(
        &self,
        Parameters(params): Parameters<SaveKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(
            topic = %params.topic,
            source = %params.source,
            content_len = params.content.len(),
            "save_knowledge called"
        );
        let result = self
            .service
            .save(params.into())
            .await
            .map_err(|e| describe("save_knowledge", e))?;
        to_json(&result)
    }

    /// Full-text search with a substring fallback.
    #[tool(description = "Search knowledge by free-text query. Ranks topic matches above content matches and falls back to partial word matching when nothing matches exactly.")]
    async fn search_knowledge(
        &self,
        Parameters(params): Parameters<SearchKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(query = %params.query, "search_knowledge called");
        let response = self
            .service
            .search(params.into())
            .await
            .map_err(|e| describe("search_knowledge", e))?;
        to_json(&response)
    }

    /// Fetch one entry with its audit history.
    #[tool(description = "Get one knowledge entry by ID, including its change history.")]
    async fn get_knowledge(
        &self,
        Parameters(params): Parameters<GetKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(id = params.id, "get_knowledge called");
        match self.service.get(params.id).await {
            Ok(Some(detail)) => to_json(&detail),
            Ok(None) => Err(format!("entry {} not found", params.id)),
            Err(e) => Err(describe("get_knowledge", e)),
        }
    }

    #[tool(description = "List entries created or updated within the last N hours, newest first.")]
    async fn recent_changes(
        &self,
        Parameters(params): Parameters<RecentChangesParams>,
    ) -> Result<String, String> {
        tracing::info!(hours = ?params.hours, "recent_changes called");
        let entries = self
            .service
            .recent_changes(params.hours, params.source, params.limit)
            .await
            .map_err(|e| describe("recent_changes", e))?;
        to_json(&serde_json::json!({ "count": entries.len(), "entries": entries }))
    }

    #[tool(description = "List topics with entry counts, sources, last update and average retention score.")]
    async fn list_topics(
        &self,
        Parameters(params): Parameters<ListTopicsParams>,
    ) -> Result<String, String> {
        tracing::info!(source = ?params.source, "list_topics called");
        let topics = self
            .service
            .list_topics(params.source)
            .await
            .map_err(|e| describe("list_topics", e))?;
        to_json(&topics)
    }

    #[tool(description = "Delete a knowledge entry permanently by ID.")]
    async fn delete_knowledge(
        &self,
        Parameters(params): Parameters<DeleteKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(id = params.id, "delete_knowledge called");
        let deleted = self
            .service
            .delete(params.id)
            .await
            .map_err(|e| describe("delete_knowledge", e))?;
        to_json(&serde_json::json!({ "id": params.id, "deleted": deleted }))
    }

    #[tool(description = "Report store health: counts by type and source, retention score distribution, most and never accessed entries, and stale candidates.")]
    async fn health_report(
        &self,
        Parameters(_params): Parameters<HealthReportParams>,
    ) -> Result<String, String> {
        tracing::info!("health_report called");
        let report = self
            .service
            .health_report()
            .await
            .map_err(|e| describe("health_report", e))?;
        to_json(&report)
    }

    #[tool(description = "Find pairs of near-duplicate entries by text similarity, most similar first (max 50 pairs). Read-only.")]
    async fn find_duplicates(
        &self,
        Parameters(params): Parameters<FindDuplicatesParams>,
    ) -> Result<String, String> {
        tracing::info!(threshold = ?params.threshold, "find_duplicates called");
        let pairs = self
            .service
            .find_duplicates(params.threshold)
            .await
            .map_err(|e| describe("find_duplicates", e))?;
        to_json(&serde_json::json!({ "count": pairs.len(), "pairs": pairs }))
    }

    #[tool(description = "Merge two entries: keep_id receives both tag sets, the summed access count and the higher confidence; delete_id is removed. Irreversible.")]
    async fn merge_knowledge(
        &self,
        Parameters(params): Parameters<MergeKnowledgeParams>,
    ) -> Result<String, String> {
        tracing::info!(
            keep_id = params.keep_id,
            delete_id = params.delete_id,
            "merge_knowledge called"
        );
        let result = self
            .service
            .merge(params.keep_id, params.delete_id, params.merged_content)
            .await
            .map_err(|e| describe("merge_knowledge", e))?;
        to_json(&result)
    }

    #[tool(description = "Prune entries whose retention score fell below 0.1 and flag those below 0.3. Core and protected entries are never touched. Dry run by default.")]
    async fn prune_knowledge(
        &self,
        Parameters(params): Parameters<PruneKnowledgeParams>,
    ) -> Result<String, String> {
        let dry_run = params.dry_run.unwrap_or(true);
        tracing::info!(dry_run, "prune_knowledge called");
        let result = self
            .service
            .prune(dry_run)
            .await
            .map_err(|e| describe("prune_knowledge", e))?;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for LoreTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Lore is a shared knowledge store. Use search_knowledge before starting work, \
                 save_knowledge to record what you learn, and health_report, find_duplicates \
                 and prune_knowledge to keep the store tidy."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}

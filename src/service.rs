//! Async handle over the knowledge engine.
//!
//! [`KnowledgeService`] owns the shared connection and config. Every operation
//! validates its input first, then runs the synchronous engine call on the
//! blocking pool under the configured request timeout. The connection lock is
//! held for one operation at a time.

use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::config::LoreConfig;
use crate::db::{self, DatabaseReport};
use crate::error::ServiceError;
use crate::knowledge::classify::resolve_memory_type;
use crate::knowledge::duplicates::{self, DuplicatePair};
use crate::knowledge::merge::{self, MergeResult};
use crate::knowledge::prune::{self, PruneResult};
use crate::knowledge::search::{self, SearchFilter, SearchResponse};
use crate::knowledge::stats::{self, HealthReport, TopicSummary};
use crate::knowledge::store::{self, LogEntry, NewEntry, SaveResult};
use crate::knowledge::types::KnowledgeEntry;
use crate::validate;

/// Caller input for [`KnowledgeService::save`].
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub topic: String,
    pub content: String,
    pub source: String,
    pub tags: Option<Vec<String>>,
    pub confidence: Option<f64>,
    pub user_id: Option<String>,
    /// Explicit memory type; inferred from topic and tags when absent.
    pub memory_type: Option<String>,
}

/// Caller input for [`KnowledgeService::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub source: Option<String>,
    pub tags: Option<Vec<String>>,
    pub limit: Option<usize>,
}

/// An entry together with its audit trail.
#[derive(Debug, Serialize)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: KnowledgeEntry,
    pub history: Vec<LogEntry>,
}

#[derive(Clone)]
pub struct KnowledgeService {
    db: Arc<Mutex<Connection>>,
    config: Arc<LoreConfig>,
}

impl KnowledgeService {
    pub fn new(conn: Connection, config: LoreConfig) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)), Arc::new(config))
    }

    pub fn from_shared(db: Arc<Mutex<Connection>>, config: Arc<LoreConfig>) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &LoreConfig {
        &self.config
    }

    /// Create or update an entry keyed by (topic, source, content).
    pub async fn save(&self, req: SaveRequest) -> Result<SaveResult, ServiceError> {
        validate::topic(&req.topic)?;
        validate::content(&req.content)?;
        validate::source(&req.source, &self.config.storage.known_sources)?;
        let tags = validate::tags(req.tags)?;
        let confidence = validate::confidence(req.confidence)?;
        let user_id = validate::user_id(req.user_id.as_deref())?;
        let explicit = validate::memory_type(req.memory_type.as_deref())?;
        let memory_type = resolve_memory_type(explicit, &req.topic, &tags);

        let entry = NewEntry {
            topic: req.topic,
            content: req.content,
            source: req.source,
            tags,
            confidence,
            user_id,
            memory_type,
        };

        let result = self
            .run("save", move |conn| store::save_entry(conn, &entry))
            .await?;
        tracing::info!(
            id = result.id,
            memory_type = %result.memory_type,
            updated = result.updated,
            "entry saved"
        );
        Ok(result)
    }

    /// Ranked search. Access is recorded for the returned entries after the
    /// response is built; a failure there is logged and never surfaces here.
    pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse, ServiceError> {
        validate::query(&req.query)?;
        if let Some(source) = &req.source {
            validate::source(source, &self.config.storage.known_sources)?;
        }
        let filter = SearchFilter {
            source: req.source,
            tags: validate::tags(req.tags)?,
        };
        let retrieval = &self.config.retrieval;
        let limit = validate::limit(req.limit, retrieval.default_limit, retrieval.max_limit)?;

        let query = req.query;
        let response = self
            .run("search", move |conn| search::search(conn, &query, &filter, limit))
            .await?;

        tracing::debug!(
            hits = response.results.len(),
            strategy = ?response.strategy,
            "search finished"
        );
        self.record_access_detached(response.ids());
        Ok(response)
    }

    /// Fetch one entry with its history. Counts as an access.
    pub async fn get(&self, id: i64) -> Result<Option<EntryDetail>, ServiceError> {
        let id = validate::id(id)?;
        let detail = self
            .run("get", move |conn| {
                let Some(entry) = store::get_entry(conn, id)? else {
                    return Ok(None);
                };
                let history = store::entry_log(conn, id)?;
                Ok(Some(EntryDetail { entry, history }))
            })
            .await?;

        if detail.is_some() {
            self.record_access_detached(vec![id]);
        }
        Ok(detail)
    }

    pub async fn recent_changes(
        &self,
        hours: Option<u32>,
        source: Option<String>,
        limit: Option<usize>,
    ) -> Result<Vec<KnowledgeEntry>, ServiceError> {
        let hours = validate::hours(hours)?;
        if let Some(source) = &source {
            validate::source(source, &self.config.storage.known_sources)?;
        }
        let retrieval = &self.config.retrieval;
        let limit = validate::limit(limit, retrieval.default_limit, retrieval.max_limit)?;

        self.run("recent_changes", move |conn| {
            store::recent_changes(conn, hours, source.as_deref(), limit)
        })
        .await
    }

    pub async fn list_topics(
        &self,
        source: Option<String>,
    ) -> Result<Vec<TopicSummary>, ServiceError> {
        if let Some(source) = &source {
            validate::source(source, &self.config.storage.known_sources)?;
        }
        let config = Arc::clone(&self.config);
        self.run("list_topics", move |conn| {
            stats::list_topics(conn, source.as_deref(), &config.retention)
        })
        .await
    }

    /// Returns `false` when no entry had that id.
    pub async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        let id = validate::id(id)?;
        let deleted = self
            .run("delete", move |conn| store::delete_entry(conn, id))
            .await?;
        tracing::info!(id, deleted, "delete requested");
        Ok(deleted)
    }

    pub async fn health_report(&self) -> Result<HealthReport, ServiceError> {
        let config = Arc::clone(&self.config);
        self.run("health_report", move |conn| {
            Ok(stats::health_report(
                conn,
                &config.retention,
                &config.maintenance,
            ))
        })
        .await
    }

    /// Threshold defaults to `retrieval.default_duplicate_threshold`.
    pub async fn find_duplicates(
        &self,
        threshold: Option<f64>,
    ) -> Result<Vec<DuplicatePair>, ServiceError> {
        let threshold = validate::duplicate_threshold(
            threshold.unwrap_or(self.config.retrieval.default_duplicate_threshold),
        )?;
        self.run("find_duplicates", move |conn| {
            duplicates::find_duplicates(conn, threshold)
        })
        .await
    }

    pub async fn merge(
        &self,
        keep_id: i64,
        delete_id: i64,
        merged_content: Option<String>,
    ) -> Result<MergeResult, ServiceError> {
        validate::merge_ids(keep_id, delete_id)?;
        if let Some(content) = &merged_content {
            validate::content(content)?;
        }

        let result = self
            .run("merge", move |conn| {
                merge::merge_entries(conn, keep_id, delete_id, merged_content.as_deref())
            })
            .await?;
        tracing::info!(keep_id, delete_id, merged = result.merged, "merge requested");
        Ok(result)
    }

    /// Prune sweep in two locked passes: load every entry, score without the
    /// lock, then delete the decayed ones. Other requests run between passes.
    pub async fn prune(&self, dry_run: bool) -> Result<PruneResult, ServiceError> {
        let entries = self.run("prune_scan", |conn| store::all_entries(conn)).await?;
        let (deleted, flagged) = prune::partition_candidates(
            &entries,
            &self.config.retention,
            &self.config.maintenance,
            Utc::now(),
        )?;

        if !dry_run && !deleted.is_empty() {
            let batch = deleted.clone();
            self.run("prune_delete", move |conn| {
                prune::delete_candidates(conn, &batch)
            })
            .await?;
        }

        tracing::info!(
            scanned = entries.len(),
            deleted = deleted.len(),
            flagged = flagged.len(),
            dry_run,
            "prune sweep finished"
        );
        Ok(PruneResult {
            deleted,
            flagged,
            dry_run,
        })
    }

    pub async fn doctor(&self) -> Result<DatabaseReport, ServiceError> {
        self.run("doctor", |conn| db::check_database_health(conn)).await
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    /// Run `f` on the blocking pool with the connection locked.
    ///
    /// On timeout the caller gets [`ServiceError::Timeout`]; the blocking task
    /// itself is not cancelled and finishes in the background.
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let timeout = self.config.server.request_timeout();

        let task = tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        });

        match tokio::time::timeout(timeout, task).await {
            Err(_) => {
                tracing::warn!(op, ?timeout, "store call timed out");
                Err(ServiceError::Timeout(timeout))
            }
            Ok(Err(e)) => Err(ServiceError::Task(e.to_string())),
            Ok(Ok(Err(e))) => {
                tracing::error!(op, error = %format!("{e:#}"), "store call failed");
                Err(ServiceError::Store(e))
            }
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }

    /// Bump access counters without making the caller wait.
    fn record_access_detached(&self, ids: Vec<i64>) {
        if ids.is_empty() {
            return;
        }
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let result = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))
                .and_then(|conn| store::record_access(&conn, &ids));
            match result {
                Ok(touched) => tracing::debug!(touched, "access recorded"),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "failed to record access"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::knowledge::search::SearchStrategy;
    use crate::knowledge::types::MemoryType;
    use std::time::Duration;

    fn service() -> KnowledgeService {
        KnowledgeService::new(db::open_memory_database().unwrap(), LoreConfig::default())
    }

    fn save_req(topic: &str, content: &str) -> SaveRequest {
        SaveRequest {
            topic: topic.into(),
            content: content.into(),
            source: "website".into(),
            ..Default::default()
        }
    }

    async fn access_count(svc: &KnowledgeService, id: i64) -> u32 {
        let db = Arc::clone(&svc.db);
        tokio::task::spawn_blocking(move || {
            let conn = db.lock().unwrap();
            store::get_entry(&conn, id).unwrap().unwrap().access_count
        })
        .await
        .unwrap()
    }

    /// Wait for detached access recording to land.
    async fn wait_for_access(svc: &KnowledgeService, id: i64, expected: u32) -> u32 {
        for _ in 0..100 {
            let count = access_count(svc, id).await;
            if count >= expected {
                return count;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        access_count(svc, id).await
    }

    #[tokio::test]
    async fn test_save_classifies_and_upserts() {
        let svc = service();
        let mut req = save_req("stripe-config", "Webhook secret lives in the vault");
        req.tags = Some(vec!["core".into()]);

        let first = svc.save(req.clone()).await.unwrap();
        assert_eq!(first.memory_type, MemoryType::Core);
        assert!(!first.updated);

        req.confidence = Some(0.4);
        let second = svc.save(req).await.unwrap();
        assert_eq!(second.id, first.id);
        assert!(second.updated);
    }

    #[tokio::test]
    async fn test_save_rejects_bad_input_before_store() {
        let svc = service();

        let mut req = save_req("deploy", "x");
        req.source = "mars".into();
        let err = svc.save(req).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::UnknownSource(_))
        ));

        let mut req = save_req("deploy", "x");
        req.confidence = Some(1.5);
        assert!(matches!(
            svc.save(req).await.unwrap_err(),
            ServiceError::Validation(ValidationError::Confidence(_))
        ));

        let req = save_req("deploy", &"x".repeat(2001));
        assert!(!svc.save(req).await.unwrap_err().is_retryable());

        assert!(svc.recent_changes(None, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_records_access_in_background() {
        let svc = service();
        let id = svc
            .save(save_req("deploy", "Deploy with the blue green script"))
            .await
            .unwrap()
            .id;

        let response = svc
            .search(SearchRequest {
                query: "blue green".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.strategy, SearchStrategy::FullText);
        assert_eq!(response.ids(), vec![id]);
        // The response reflects the state before this read was counted.
        assert_eq!(response.results[0].entry.access_count, 0);

        assert_eq!(wait_for_access(&svc, id, 1).await, 1);
    }

    #[tokio::test]
    async fn test_get_includes_history() {
        let svc = service();
        let id = svc.save(save_req("deploy", "Use the script")).await.unwrap().id;
        svc.save(save_req("deploy", "Use the script")).await.unwrap();

        let detail = svc.get(id).await.unwrap().unwrap();
        let ops: Vec<_> = detail.history.iter().map(|l| l.operation.as_str()).collect();
        assert_eq!(ops, vec!["create", "update"]);
        assert_eq!(wait_for_access(&svc, id, 1).await, 1);

        assert!(svc.get(999).await.unwrap().is_none());
        assert!(svc.get(0).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_and_merge_report_missing_ids() {
        let svc = service();
        let a = svc.save(save_req("pricing", "Plan is 20 EUR")).await.unwrap().id;
        let b = svc.save(save_req("pricing", "Plan costs 20 EUR")).await.unwrap().id;

        assert!(!svc.merge(a, 999, None).await.unwrap().merged);
        assert!(matches!(
            svc.merge(a, a, None).await.unwrap_err(),
            ServiceError::Validation(ValidationError::SelfMerge(_))
        ));
        assert!(svc.merge(a, b, None).await.unwrap().merged);

        assert!(!svc.delete(b).await.unwrap());
        assert!(svc.delete(a).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_threshold_is_bounded() {
        let svc = service();
        assert!(svc.find_duplicates(Some(0.2)).await.is_err());
        assert!(svc.find_duplicates(Some(0.96)).await.is_err());
        assert!(svc.find_duplicates(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prune_dry_run_and_reports() {
        let svc = service();
        svc.save(save_req("deploy", "Fresh note")).await.unwrap();

        let result = svc.prune(true).await.unwrap();
        assert!(result.dry_run);
        assert!(result.deleted.is_empty());

        let report = svc.health_report().await.unwrap();
        assert_eq!(report.total, 1);
        assert!(report.errors.is_empty());

        let topics = svc.list_topics(None).await.unwrap();
        assert_eq!(topics.len(), 1);

        let doctor = svc.doctor().await.unwrap();
        assert!(doctor.integrity_ok);
        assert_eq!(doctor.entry_count, 1);
    }

    #[tokio::test]
    async fn test_search_survives_failed_access_recording() {
        let svc = service();
        let id = svc.save(save_req("deploy", "Deploy steps")).await.unwrap().id;
        {
            let conn = svc.db.lock().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER no_access BEFORE UPDATE OF access_count ON entries \
                 BEGIN SELECT RAISE(ABORT, 'store is read-only'); END;",
            )
            .unwrap();
        }

        let response = svc
            .search(SearchRequest {
                query: "deploy".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.ids(), vec![id]);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(access_count(&svc, id).await, 0);
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_source_filter() {
        let svc = service();
        let err = svc
            .search(SearchRequest {
                query: "deploy".into(),
                source: Some("mars".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ValidationError::UnknownSource(_))
        ));
    }

    #[tokio::test]
    async fn test_prune_apply_deletes_between_passes() {
        let svc = service();
        let doomed = svc.save(save_req("why-redis", "Chose redis")).await.unwrap().id;
        let kept = svc.save(save_req("css-grid", "Use grid")).await.unwrap().id;
        {
            let conn = svc.db.lock().unwrap();
            let old = crate::knowledge::types::format_timestamp(
                Utc::now() - chrono::Duration::days(500),
            );
            conn.execute(
                "UPDATE entries SET created_at = ?1, memory_type = 'decision' WHERE id = ?2",
                rusqlite::params![old, doomed],
            )
            .unwrap();
        }

        let result = svc.prune(false).await.unwrap();
        assert!(!result.dry_run);
        assert_eq!(result.deleted.iter().map(|c| c.id).collect::<Vec<_>>(), vec![doomed]);
        assert!(svc.get(doomed).await.unwrap().is_none());
        assert!(svc.get(kept).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_lock_contention_times_out() {
        let mut config = LoreConfig::default();
        config.server.request_timeout_ms = 50;
        let svc = KnowledgeService::new(db::open_memory_database().unwrap(), config);

        let db = Arc::clone(&svc.db);
        let holder = std::thread::spawn(move || {
            let _guard = db.lock().unwrap();
            std::thread::sleep(Duration::from_millis(300));
        });
        std::thread::sleep(Duration::from_millis(20));

        let err = svc.health_report().await.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout(_)));
        assert!(err.is_retryable());
        holder.join().unwrap();
    }
}

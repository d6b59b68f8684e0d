//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open the
//! database, build the [`KnowledgeService`], and hand it to the MCP tool
//! handler. When `maintenance.enabled` is set, a background sweep prunes the
//! store every `maintenance.interval_hours`.

use crate::config::LoreConfig;
use crate::db;
use crate::service::KnowledgeService;
use crate::tools::LoreTools;
use anyhow::Result;
use rmcp::ServiceExt;
use std::time::Duration;

/// Shared setup: open the DB (with retries) and wrap it in a service handle.
pub fn setup_service(config: LoreConfig) -> Result<KnowledgeService> {
    let db_path = config.resolved_db_path();
    let conn = db::open_with_retry(&db_path, &config.storage)?;
    tracing::info!(db = %db_path.display(), "database ready");
    Ok(KnowledgeService::new(conn, config))
}

/// Spawn the periodic prune sweep if maintenance is enabled.
fn spawn_maintenance(service: &KnowledgeService) {
    let maintenance = &service.config().maintenance;
    if !maintenance.enabled {
        return;
    }
    let period = Duration::from_secs(maintenance.interval_hours.max(1) * 3600);
    let service = service.clone();
    tracing::info!(interval_hours = period.as_secs() / 3600, "scheduled prune enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick fires immediately; skip it so startup is not a sweep.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match service.prune(false).await {
                Ok(result) => tracing::info!(
                    deleted = result.deleted.len(),
                    flagged = result.flagged.len(),
                    "scheduled prune finished"
                ),
                Err(e) => tracing::warn!(error = %e, "scheduled prune failed"),
            }
        }
    });
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: LoreConfig) -> Result<()> {
    tracing::info!("starting Lore MCP server on stdio");

    let service = setup_service(config)?;
    spawn_maintenance(&service);

    let tools = LoreTools::new(service);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: LoreConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting Lore MCP server on HTTP");

    let service = setup_service(config)?;
    spawn_maintenance(&service);

    let http_service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(LoreTools::new(service.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", http_service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

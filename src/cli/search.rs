use anyhow::Result;

use lore::config::LoreConfig;
use lore::knowledge::search::SearchStrategy;
use lore::knowledge::types::truncate_preview;
use lore::server::setup_service;
use lore::service::SearchRequest;

/// Run a search from the terminal through the same service as the MCP tools:
/// input is validated the same way and hits count as accesses, recorded in the
/// background so a busy store never holds back the results.
pub async fn search(
    config: LoreConfig,
    query: String,
    source: Option<String>,
    tags: Vec<String>,
    limit: Option<usize>,
) -> Result<()> {
    let service = setup_service(config)?;
    let response = service
        .search(SearchRequest {
            query,
            source,
            tags: Some(tags),
            limit,
        })
        .await?;

    if response.results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    let how = match response.strategy {
        SearchStrategy::Substring => " (partial word match)",
        _ => "",
    };
    println!("Found {} result(s){how}\n", response.results.len());

    for (i, hit) in response.results.iter().enumerate() {
        let e = &hit.entry;
        println!(
            "  {}. #{} [{}] {} ({}, relevance: {:.3})",
            i + 1,
            e.id,
            e.memory_type,
            e.topic,
            e.source,
            hit.relevance,
        );
        println!("     {}", truncate_preview(&e.content, 120));
        if !e.tags.is_empty() {
            println!("     tags: {}", e.tags.join(", "));
        }
        println!();
    }

    Ok(())
}

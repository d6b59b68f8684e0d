//! Terminal commands. Each opens the configured database directly and prints
//! a human-readable report; the MCP server is not involved.

pub mod doctor;
pub mod duplicates;
pub mod health;
pub mod prune;
pub mod search;
pub mod topics;

use anyhow::Result;
use rusqlite::Connection;

use lore::config::LoreConfig;

fn open_store(config: &LoreConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    lore::db::open_with_retry(&db_path, &config.storage)
}

//! Shared knowledge store with a retention lifecycle, served over MCP.
//!
//! Several agents save short knowledge entries (a topic, a body, the project
//! they came from, and tags) into one SQLite database and search them later.
//! Every entry carries a retention score computed on demand from its
//! importance, how often it is read, and how recently. Low scorers are pruned,
//! near-duplicates can be found and merged, and a health report summarizes the
//! store.
//!
//! Entries fall into four memory types:
//!
//! | Type | Purpose | Decay per day |
//! |------|---------|---------------|
//! | **Core** | Rules every agent must follow | none (floor 0.9) |
//! | **Architecture** | Structure, configuration, schemas | 0.001 |
//! | **Pattern** | Everyday how-to notes | 0.005 |
//! | **Decision** | Why something was chosen | 0.01 |
//!
//! Entries tagged `protected` always score 1.0 and are never pruned.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with an FTS5 index kept in sync by triggers, plus a
//!   registered `similarity()` SQL function for trigram matching
//! - **Search**: prefix full-text ranking (BM25, topic weighted highest) with a
//!   substring fallback
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, SQL functions, and health checks
//! - [`error`]: Validation and service error kinds
//! - [`knowledge`]: The engine: store, classify, score, search, dedup, merge, prune
//! - [`server`]: stdio and Streamable HTTP entry points
//! - [`service`]: Async handle that validates input and runs engine calls off the runtime
//! - [`tools`]: MCP tool handler and parameter types
//! - [`validate`]: Input limits and validators

pub mod config;
pub mod db;
pub mod error;
pub mod knowledge;
pub mod server;
pub mod service;
pub mod tools;
pub mod validate;

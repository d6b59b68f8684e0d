//! Knowledge engine: the entry store and the lifecycle operations built on it.
//!
//! Everything here is synchronous and takes a borrowed [`rusqlite::Connection`];
//! [`crate::service`] owns the connection and runs these on the blocking pool.

pub mod classify;
pub mod duplicates;
pub mod merge;
pub mod prune;
pub mod retention;
pub mod search;
pub mod similarity;
pub mod stats;
pub mod store;
pub mod types;

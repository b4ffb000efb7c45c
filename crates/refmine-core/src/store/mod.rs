//! SQLite persistence for history runs: per-branch cursors and cached
//! per-commit results.

pub mod database;
pub mod schema;

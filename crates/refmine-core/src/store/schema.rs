//! SQLite schema for the history store.
//!
//! The baseline DDL only holds bookkeeping tables. Everything else is created
//! by numbered migrations, applied in order inside one transaction with a
//! savepoint per step.

use rusqlite::Connection;
use tracing::{debug, warn};

use crate::errors::{RefMineError, RefMineResult};

/// Current schema version, the version of the last entry in [`MIGRATIONS`].
pub const SCHEMA_VERSION: i32 = 2;

/// Bookkeeping DDL, safe to replay on an initialised database.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
];

pub struct Migration {
    pub version: i32,
    pub name: &'static str,
    sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "cursors and commit results",
        sql: "CREATE TABLE cursors (
            project TEXT NOT NULL,
            branch TEXT NOT NULL,
            last_commit TEXT NOT NULL,
            updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (project, branch)
        );
        CREATE TABLE commit_results (
            project TEXT NOT NULL,
            commit_id TEXT NOT NULL,
            config_fingerprint TEXT NOT NULL,
            refactoring_count INTEGER NOT NULL,
            payload TEXT NOT NULL,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (project, commit_id, config_fingerprint)
        );",
    },
    Migration {
        version: 2,
        name: "fingerprint index",
        sql: "CREATE INDEX idx_commit_results_fingerprint \
              ON commit_results(project, config_fingerprint);",
    },
];

// ---------------------------------------------------------------------------
// Migration runner
// ---------------------------------------------------------------------------

/// Apply every migration newer than the stored version. A failing step is
/// rolled back, recorded as `failed`, and returned; earlier steps stay
/// applied. A database newer than [`SCHEMA_VERSION`] is rejected.
pub fn migrate_schema(conn: &Connection) -> RefMineResult<()> {
    let stored = get_schema_version(conn);
    if stored > SCHEMA_VERSION {
        return Err(RefMineError::Store(format!(
            "schema version {stored} is newer than supported version {SCHEMA_VERSION}"
        )));
    }

    let mut tx = conn.unchecked_transaction()?;
    let mut from = stored;
    for step in MIGRATIONS.iter().filter(|m| m.version > stored) {
        let sp = tx.savepoint()?;
        match apply_step(&sp, step) {
            Ok(()) => {
                sp.commit()?;
                record_migration_step(&tx, from, step.version, "success", None)?;
                debug!(version = step.version, step = step.name, "schema migration applied");
                from = step.version;
            }
            Err(err) => {
                drop(sp);
                warn!(version = step.version, step = step.name, error = %err, "schema migration failed");
                record_migration_step(&tx, from, step.version, "failed", Some(&err.to_string()))?;
                tx.commit()?;
                return Err(err.into());
            }
        }
    }
    tx.commit()?;
    Ok(())
}

fn apply_step(conn: &Connection, step: &Migration) -> rusqlite::Result<()> {
    conn.execute_batch(step.sql)?;
    set_schema_version(conn, step.version)
}

/// Stored schema version, 0 when absent or unparseable.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT value FROM store_meta WHERE key = 'schema_version';",
        [],
        |row| row.get::<_, String>(0),
    )
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(0)
}

fn set_schema_version(conn: &Connection, version: i32) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO store_meta(key, value) VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        rusqlite::params![version.to_string()],
    )?;
    Ok(())
}

fn record_migration_step(
    conn: &Connection,
    from: i32,
    to: i32,
    status: &str,
    error: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        rusqlite::params![from, to, status, error],
    )?;
    Ok(())
}

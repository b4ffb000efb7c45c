//! History store: per-branch cursors for incremental runs and cached
//! per-commit results keyed by config fingerprint.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::diff::refactoring::RefactoringRecord;
use crate::errors::{RefMineError, RefMineResult};
use crate::history::ports::{Commit, ResultHandler};
use crate::store::schema;

/// Expand a leading `~` to `$HOME`.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if path.len() > 2 {
                expanded.push(&path[2..]);
            }
            return expanded;
        }
    }
    PathBuf::from(path)
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

pub struct HistoryStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl HistoryStore {
    /// Open (creating if needed) the store at `path`. Parent directories are
    /// created and the schema is brought up to date.
    pub fn open(path: &Path) -> RefMineResult<Self> {
        let resolved = expand_tilde(&path.to_string_lossy());
        if let Some(parent) = resolved.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&resolved)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::init(conn, Some(resolved))
    }

    pub fn open_in_memory() -> RefMineResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> RefMineResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        for stmt in schema::SCHEMA_STATEMENTS {
            conn.execute_batch(stmt)?;
        }
        schema::migrate_schema(&conn)?;
        debug!(path = ?path, "history store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Resolved on-disk path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn schema_version(&self) -> i32 {
        schema::get_schema_version(&self.conn.lock())
    }

    // -- cursors -------------------------------------------------------------

    /// Last commit processed for `(project, branch)`, if any.
    pub fn cursor(&self, project: &str, branch: &str) -> RefMineResult<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT last_commit FROM cursors WHERE project = ?1 AND branch = ?2;",
                params![project, branch],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_cursor(&self, project: &str, branch: &str, commit_id: &str) -> RefMineResult<()> {
        self.conn.lock().execute(
            "INSERT INTO cursors(project, branch, last_commit) VALUES(?1, ?2, ?3) \
             ON CONFLICT(project, branch) DO UPDATE SET \
             last_commit = excluded.last_commit, updated_at = CURRENT_TIMESTAMP;",
            params![project, branch, commit_id],
        )?;
        Ok(())
    }

    // -- commit results ------------------------------------------------------

    /// Persist one commit's records. A second save under the same
    /// fingerprint replaces the first.
    pub fn save_commit_results(
        &self,
        project: &str,
        commit_id: &str,
        fingerprint: &str,
        records: &[RefactoringRecord],
    ) -> RefMineResult<()> {
        let payload = serde_json::to_string(records)?;
        self.conn.lock().execute(
            "INSERT INTO commit_results(project, commit_id, config_fingerprint, refactoring_count, payload) \
             VALUES(?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(project, commit_id, config_fingerprint) DO UPDATE SET \
             refactoring_count = excluded.refactoring_count, payload = excluded.payload;",
            params![project, commit_id, fingerprint, records.len() as i64, payload],
        )?;
        Ok(())
    }

    /// Cached records for a commit, `None` when nothing was saved under this
    /// fingerprint.
    pub fn load_commit_results(
        &self,
        project: &str,
        commit_id: &str,
        fingerprint: &str,
    ) -> RefMineResult<Option<Vec<RefactoringRecord>>> {
        let payload: Option<String> = self
            .conn
            .lock()
            .query_row(
                "SELECT payload FROM commit_results \
                 WHERE project = ?1 AND commit_id = ?2 AND config_fingerprint = ?3;",
                params![project, commit_id, fingerprint],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(text) => {
                let records = serde_json::from_str(&text).map_err(|e| {
                    RefMineError::Store(format!("corrupt payload for {commit_id}: {e}"))
                })?;
                Ok(Some(records))
            }
            None => Ok(None),
        }
    }

    /// Distinct commits with stored results for `project`.
    pub fn commit_count(&self, project: &str) -> RefMineResult<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(DISTINCT commit_id) FROM commit_results WHERE project = ?1;",
            params![project],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

// ---------------------------------------------------------------------------
// RecordingHandler
// ---------------------------------------------------------------------------

/// Persists every delivered result, then forwards to `inner`. A failed write
/// is logged and does not stop delivery.
pub struct RecordingHandler<'a, H: ResultHandler> {
    store: &'a HistoryStore,
    project: String,
    fingerprint: String,
    inner: H,
}

impl<'a, H: ResultHandler> RecordingHandler<'a, H> {
    pub fn new(store: &'a HistoryStore, project: &str, fingerprint: &str, inner: H) -> Self {
        Self {
            store,
            project: project.to_string(),
            fingerprint: fingerprint.to_string(),
            inner,
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: ResultHandler> ResultHandler for RecordingHandler<'_, H> {
    fn skip_commit(&mut self, commit_id: &str) -> bool {
        self.inner.skip_commit(commit_id)
    }

    fn handle(&mut self, commit: &Commit, refactorings: &[RefactoringRecord]) {
        if let Err(err) =
            self.store
                .save_commit_results(&self.project, &commit.id, &self.fingerprint, refactorings)
        {
            warn!(error = %err, commit = %commit.id, "failed to persist commit results");
        }
        self.inner.handle(commit, refactorings);
    }

    fn handle_exception(&mut self, commit_id: &str, error: &RefMineError) {
        self.inner.handle_exception(commit_id, error);
    }

    fn on_finish(&mut self, refactorings_count: usize, commits_count: usize, error_commits_count: usize) {
        self.inner
            .on_finish(refactorings_count, commits_count, error_commits_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::refactoring::RefactoringType;
    use crate::history::ports::CollectingHandler;

    fn record(description: &str) -> RefactoringRecord {
        RefactoringRecord {
            refactoring_type: RefactoringType::RenameClass,
            description: description.to_string(),
            entity_before: "p.A".to_string(),
            entity_after: "p.B".to_string(),
            motivations: vec![],
        }
    }

    #[test]
    fn test_cursor_roundtrip_and_upsert() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert_eq!(store.cursor("proj", "main").unwrap(), None);
        store.set_cursor("proj", "main", "c1").unwrap();
        store.set_cursor("proj", "main", "c2").unwrap();
        store.set_cursor("proj", "dev", "d1").unwrap();
        assert_eq!(store.cursor("proj", "main").unwrap().as_deref(), Some("c2"));
        assert_eq!(store.cursor("proj", "dev").unwrap().as_deref(), Some("d1"));
        assert_eq!(store.cursor("other", "main").unwrap(), None);
    }

    #[test]
    fn test_results_keyed_by_fingerprint() {
        let store = HistoryStore::open_in_memory().unwrap();
        let records = vec![record("Rename Class p.A renamed to p.B")];
        store.save_commit_results("proj", "c1", "fp-a", &records).unwrap();

        assert_eq!(
            store.load_commit_results("proj", "c1", "fp-a").unwrap(),
            Some(records)
        );
        assert_eq!(store.load_commit_results("proj", "c1", "fp-b").unwrap(), None);
        assert_eq!(store.load_commit_results("proj", "c9", "fp-a").unwrap(), None);
    }

    #[test]
    fn test_save_replaces_and_counts_distinct_commits() {
        let store = HistoryStore::open_in_memory().unwrap();
        store.save_commit_results("proj", "c1", "fp", &[record("x")]).unwrap();
        store.save_commit_results("proj", "c1", "fp", &[]).unwrap();
        store.save_commit_results("proj", "c1", "fp2", &[]).unwrap();
        store.save_commit_results("proj", "c2", "fp", &[]).unwrap();

        assert_eq!(store.load_commit_results("proj", "c1", "fp").unwrap(), Some(vec![]));
        assert_eq!(store.commit_count("proj").unwrap(), 2);
        assert_eq!(store.commit_count("nobody").unwrap(), 0);
    }

    #[test]
    fn test_open_on_disk_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");
        {
            let store = HistoryStore::open(&path).unwrap();
            assert_eq!(store.schema_version(), schema::SCHEMA_VERSION);
            store.set_cursor("proj", "main", "abc").unwrap();
        }
        let reopened = HistoryStore::open(&path).unwrap();
        assert_eq!(reopened.path(), Some(path.as_path()));
        assert_eq!(reopened.cursor("proj", "main").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_recording_handler_persists_then_forwards() {
        let store = HistoryStore::open_in_memory().unwrap();
        let mut handler = RecordingHandler::new(&store, "proj", "fp", CollectingHandler::default());
        let commit = Commit::new("c1", &["c0"]);
        handler.handle(&commit, &[record("y")]);
        handler.on_finish(1, 1, 0);

        let inner = handler.into_inner();
        assert_eq!(inner.handled.len(), 1);
        assert_eq!(inner.finished, Some((1, 1, 0)));
        assert_eq!(
            store.load_commit_results("proj", "c1", "fp").unwrap().map(|r| r.len()),
            Some(1)
        );
    }
}

//! Sequential history walk: one detection per linear commit, delivered to a
//! [`ResultHandler`] in traversal order.
//!
//! Per-commit failures are counted and skipped, never retried and never
//! propagated. Only a failure to enumerate history aborts a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::diff::detect_records;
use crate::diff::refactoring::RefactoringRecord;
use crate::errors::RefMineResult;
use crate::history::ports::{Commit, ModelBuilder, ResultHandler, VcsAdapter};
use crate::store::database::HistoryStore;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag, checked between commits.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Idle,
    Processing,
    Delivered,
    Skipped,
    Errored,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Delivered plus errored commits.
    pub commits: usize,
    pub errors: usize,
    pub refactorings: usize,
    /// Commits the handler asked to skip.
    pub skipped: usize,
    pub merges: usize,
}

/// Per-commit result cache for one run, scoped to the detector fingerprint.
struct ResultCache<'a> {
    store: &'a HistoryStore,
    fingerprint: String,
}

// ---------------------------------------------------------------------------
// HistoryDriver
// ---------------------------------------------------------------------------

pub struct HistoryDriver<V, B> {
    project: String,
    vcs: V,
    builder: B,
    config: DetectorConfig,
    cancel: CancellationToken,
    state: DriverState,
    stats: HistoryStats,
    progress_interval: Duration,
}

impl<V: VcsAdapter, B: ModelBuilder> HistoryDriver<V, B> {
    pub fn new(project: &str, vcs: V, builder: B, config: DetectorConfig) -> Self {
        Self {
            project: project.to_string(),
            vcs,
            builder,
            config,
            cancel: CancellationToken::new(),
            state: DriverState::Idle,
            stats: HistoryStats::default(),
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn stats(&self) -> HistoryStats {
        self.stats
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Detect refactorings over every commit reachable from `branch`.
    pub fn detect_all(
        &mut self,
        branch: &str,
        handler: &mut dyn ResultHandler,
    ) -> RefMineResult<HistoryStats> {
        let commits = self.vcs.walk_history(branch)?;
        info!(project = %self.project, branch, commits = commits.len(), "walking history");
        Ok(self.run(&commits, None, handler))
    }

    /// Detect refactorings for a single commit.
    pub fn detect_at(
        &mut self,
        commit_id: &str,
        handler: &mut dyn ResultHandler,
    ) -> RefMineResult<HistoryStats> {
        let commit = self.vcs.commit(commit_id)?;
        Ok(self.run(std::slice::from_ref(&commit), None, handler))
    }

    /// Detect refactorings only for commits newer than the stored cursor,
    /// then advance the cursor to the branch head. A cancelled run leaves
    /// the cursor untouched.
    ///
    /// Results already stored for the current detector fingerprint are
    /// delivered without rebuilding models; fresh results are stored.
    pub fn detect_new(
        &mut self,
        branch: &str,
        store: &HistoryStore,
        handler: &mut dyn ResultHandler,
    ) -> RefMineResult<HistoryStats> {
        let cursor = store.cursor(&self.project, branch)?;
        let commits = self.vcs.walk_history(branch)?;
        let head = commits.first().map(|c| c.id.clone());
        let fresh: Vec<Commit> = commits
            .into_iter()
            .take_while(|c| Some(c.id.as_str()) != cursor.as_deref())
            .collect();
        info!(
            project = %self.project,
            branch,
            cursor = cursor.as_deref().unwrap_or("-"),
            commits = fresh.len(),
            "fetching new commits"
        );

        let cache = ResultCache {
            store,
            fingerprint: self.config.fingerprint(),
        };
        let stats = self.run(&fresh, Some(&cache), handler);
        if !self.cancel.is_cancelled() {
            if let Some(head) = head {
                store.set_cursor(&self.project, branch, &head)?;
            }
        }
        Ok(stats)
    }

    fn run(
        &mut self,
        commits: &[Commit],
        cache: Option<&ResultCache<'_>>,
        handler: &mut dyn ResultHandler,
    ) -> HistoryStats {
        self.stats = HistoryStats::default();
        let mut last_progress = Instant::now();

        for commit in commits {
            if self.cancel.is_cancelled() {
                info!(project = %self.project, "cancelled");
                break;
            }
            self.process(commit, cache, handler);

            if last_progress.elapsed() >= self.progress_interval {
                info!(
                    "Processing {} [Commits: {}, Errors: {}, Refactorings: {}]",
                    self.project, self.stats.commits, self.stats.errors, self.stats.refactorings
                );
                last_progress = Instant::now();
            }
        }

        self.state = DriverState::Finished;
        handler.on_finish(self.stats.refactorings, self.stats.commits, self.stats.errors);
        info!(
            "Analyzed {} [Commits: {}, Errors: {}, Refactorings: {}]",
            self.project, self.stats.commits, self.stats.errors, self.stats.refactorings
        );
        self.stats
    }

    fn process(
        &mut self,
        commit: &Commit,
        cache: Option<&ResultCache<'_>>,
        handler: &mut dyn ResultHandler,
    ) {
        if commit.is_merge() {
            debug!(commit = %commit.id, "skipping merge commit");
            self.stats.merges += 1;
            self.state = DriverState::Skipped;
            return;
        }
        if handler.skip_commit(&commit.id) {
            debug!(commit = %commit.id, "skipped by handler");
            self.stats.skipped += 1;
            self.state = DriverState::Skipped;
            return;
        }

        self.state = DriverState::Processing;
        self.stats.commits += 1;
        let detected = match cache {
            Some(cache) => self.detect_cached(commit, cache),
            None => self.detect_commit(commit),
        };
        match detected {
            Ok(records) => {
                self.stats.refactorings += records.len();
                handler.handle(commit, &records);
                self.state = DriverState::Delivered;
            }
            Err(err) => {
                self.stats.errors += 1;
                warn!(error = %err, "Ignored revision {} due to error", commit.id);
                handler.handle_exception(&commit.id, &err);
                self.state = DriverState::Errored;
            }
        }
    }

    fn detect_cached(
        &mut self,
        commit: &Commit,
        cache: &ResultCache<'_>,
    ) -> RefMineResult<Vec<RefactoringRecord>> {
        match cache
            .store
            .load_commit_results(&self.project, &commit.id, &cache.fingerprint)
        {
            Ok(Some(records)) => {
                debug!(commit = %commit.id, "using stored results");
                return Ok(records);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, commit = %commit.id, "ignoring stored results"),
        }

        let records = self.detect_commit(commit)?;
        let saved = cache
            .store
            .save_commit_results(&self.project, &commit.id, &cache.fingerprint, &records);
        if let Err(err) = saved {
            warn!(error = %err, commit = %commit.id, "failed to store results");
        }
        Ok(records)
    }

    /// Build both models for `commit` and detect. A root commit, or one whose
    /// files exist on only one side, yields nothing without building models.
    pub fn detect_commit(&mut self, commit: &Commit) -> RefMineResult<Vec<RefactoringRecord>> {
        let Some(parent) = commit.parent() else {
            return Ok(Vec::new());
        };
        let diff = self.vcs.file_tree_diff(commit)?;
        if diff.files_before.is_empty() || diff.files_current.is_empty() {
            return Ok(Vec::new());
        }

        self.vcs.checkout(parent)?;
        let before = self.builder.build(self.vcs.project_root(), &diff.files_before)?;
        self.vcs.checkout(&commit.id)?;
        let after = self.builder.build(self.vcs.project_root(), &diff.files_current)?;

        Ok(detect_records(&before, &after, &diff.rename_hints, &self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}

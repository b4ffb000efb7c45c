//! Collaborator interfaces consumed by the history driver.
//!
//! Parsing, checkout and result delivery live outside the core; these traits
//! are the seams.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::diff::matcher::RenameHints;
use crate::diff::refactoring::RefactoringRecord;
use crate::errors::{RefMineError, RefMineResult};
use crate::model::CodeModel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub id: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub message: String,
    /// Seconds since the epoch.
    #[serde(default)]
    pub timestamp: i64,
}

impl Commit {
    pub fn new(id: &str, parents: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: None,
            message: String::new(),
            timestamp: 0,
        }
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    pub fn parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Files touched by a commit, on each side, plus rename hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTreeDiff {
    pub files_before: BTreeSet<String>,
    pub files_current: BTreeSet<String>,
    #[serde(default)]
    pub rename_hints: RenameHints,
}

pub trait VcsAdapter {
    fn project_root(&self) -> &Path;

    /// Commits reachable from `branch`, newest first.
    fn walk_history(&mut self, branch: &str) -> RefMineResult<Vec<Commit>>;

    fn commit(&mut self, commit_id: &str) -> RefMineResult<Commit>;

    fn checkout(&mut self, commit_id: &str) -> RefMineResult<()>;

    fn file_tree_diff(&mut self, commit: &Commit) -> RefMineResult<FileTreeDiff>;
}

pub trait ModelBuilder {
    /// Build a model restricted to `files`, relative to `project_root`.
    fn build(&self, project_root: &Path, files: &BTreeSet<String>) -> RefMineResult<CodeModel>;
}

pub trait ResultHandler {
    fn skip_commit(&mut self, _commit_id: &str) -> bool {
        false
    }

    fn handle(&mut self, commit: &Commit, refactorings: &[RefactoringRecord]);

    fn handle_exception(&mut self, _commit_id: &str, _error: &RefMineError) {}

    fn on_finish(&mut self, _refactorings_count: usize, _commits_count: usize, _error_commits_count: usize) {}
}

/// Collects everything it is handed. Handy for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub handled: Vec<(Commit, Vec<RefactoringRecord>)>,
    pub failed: Vec<(String, String)>,
    pub finished: Option<(usize, usize, usize)>,
}

impl ResultHandler for CollectingHandler {
    fn handle(&mut self, commit: &Commit, refactorings: &[RefactoringRecord]) {
        self.handled.push((commit.clone(), refactorings.to_vec()));
    }

    fn handle_exception(&mut self, commit_id: &str, error: &RefMineError) {
        self.failed.push((commit_id.to_string(), error.to_string()));
    }

    fn on_finish(&mut self, refactorings_count: usize, commits_count: usize, error_commits_count: usize) {
        self.finished = Some((refactorings_count, commits_count, error_commits_count));
    }
}

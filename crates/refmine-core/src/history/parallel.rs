//! Bounded parallel detection over already-built model pairs.
//!
//! Detection is pure, so pairs can be classified on a rayon pool; results are
//! re-joined in input order before anything reaches a handler.

use rayon::prelude::*;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::diff::detect_records;
use crate::diff::matcher::RenameHints;
use crate::diff::refactoring::RefactoringRecord;
use crate::history::ports::{Commit, ResultHandler};
use crate::model::CodeModel;

/// One commit's models, built ahead of time.
#[derive(Debug, Clone)]
pub struct ModelPair {
    pub commit: Commit,
    pub before: CodeModel,
    pub after: CodeModel,
    pub rename_hints: RenameHints,
}

pub struct ParallelClassifier {
    config: DetectorConfig,
}

impl ParallelClassifier {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Detect every pair; output order equals input order.
    pub fn classify_pairs(&self, pairs: &[ModelPair]) -> Vec<Vec<RefactoringRecord>> {
        let refs: Vec<&ModelPair> = pairs.iter().collect();
        self.classify(&refs)
    }

    fn classify(&self, pairs: &[&ModelPair]) -> Vec<Vec<RefactoringRecord>> {
        if pairs.is_empty() {
            return vec![];
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.max(1))
            .build();
        let detect_one =
            |p: &&ModelPair| detect_records(&p.before, &p.after, &p.rename_hints, &self.config);

        match pool {
            Ok(pool) => pool.install(|| pairs.par_iter().map(detect_one).collect()),
            Err(err) => {
                debug!(error = %err, "thread pool unavailable, running sequentially");
                pairs.iter().map(detect_one).collect()
            }
        }
    }

    /// Classify in parallel, then hand results to `handler` one commit at a
    /// time in input order. Merge commits and commits the handler skips are
    /// dropped before detection. Returns the total refactoring count.
    pub fn deliver(&self, pairs: &[ModelPair], handler: &mut dyn ResultHandler) -> usize {
        let mut selected = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if pair.commit.is_merge() {
                debug!(commit = %pair.commit.id, "skipping merge commit");
                continue;
            }
            if handler.skip_commit(&pair.commit.id) {
                debug!(commit = %pair.commit.id, "skipped by handler");
                continue;
            }
            selected.push(pair);
        }

        let results = self.classify(&selected);
        let mut total = 0;
        for (pair, records) in selected.iter().zip(results) {
            total += records.len();
            handler.handle(&pair.commit, &records);
        }
        handler.on_finish(total, selected.len(), 0);
        total
    }
}

//! Single-commit detection: match, classify, then attach motivations.

pub mod classifier;
pub mod matcher;
pub mod motivation;
pub mod refactoring;

use std::collections::BTreeSet;

use crate::config::DetectorConfig;
use crate::diff::classifier::classify;
use crate::diff::matcher::{match_models, MatchResult, RenameHints};
use crate::diff::motivation::{classify_motivation, MotivationTag};
use crate::diff::refactoring::{Refactoring, RefactoringRecord};
use crate::model::CodeModel;

#[derive(Debug, Clone)]
pub struct DetectedRefactoring {
    pub refactoring: Refactoring,
    pub motivations: BTreeSet<MotivationTag>,
}

/// Everything one detection call produced. Borrows both models.
#[derive(Debug, Clone)]
pub struct Detection<'m> {
    pub matches: MatchResult<'m>,
    pub refactorings: Vec<DetectedRefactoring>,
}

impl<'m> Detection<'m> {
    /// Owned records in the same order as `refactorings`.
    pub fn records(&self) -> Vec<RefactoringRecord> {
        self.refactorings
            .iter()
            .map(|d| {
                d.refactoring
                    .to_record(self.matches.before, self.matches.after, &d.motivations)
            })
            .collect()
    }
}

/// Run the full pipeline on one before/after pair.
///
/// Output is sorted by (kind, description) so that equal inputs give equal
/// sequences.
pub fn detect<'m>(
    before: &'m CodeModel,
    after: &'m CodeModel,
    hints: &RenameHints,
    config: &DetectorConfig,
) -> Detection<'m> {
    let matches = match_models(before, after, hints, config);
    let mut keyed: Vec<(Refactoring, String)> = classify(&matches, config)
        .into_iter()
        .map(|r| {
            let description = r.description(before, after);
            (r, description)
        })
        .collect();
    keyed.sort_by(|(a, da), (b, db)| {
        a.refactoring_type()
            .cmp(&b.refactoring_type())
            .then_with(|| da.cmp(db))
    });

    let refactorings = keyed
        .into_iter()
        .map(|(refactoring, _)| {
            let motivations = if config.classify_motivations {
                classify_motivation(&refactoring, &matches)
            } else {
                BTreeSet::new()
            };
            DetectedRefactoring {
                refactoring,
                motivations,
            }
        })
        .collect();

    Detection {
        matches,
        refactorings,
    }
}

/// [`detect`] reduced to owned records.
pub fn detect_records(
    before: &CodeModel,
    after: &CodeModel,
    hints: &RenameHints,
    config: &DetectorConfig,
) -> Vec<RefactoringRecord> {
    detect(before, after, hints, config).records()
}

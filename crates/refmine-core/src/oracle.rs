//! Scoring detector output against a hand-labelled oracle.
//!
//! Sets are keyed by `project/commit/revision`; each comparison group (one
//! detector configuration, say) is scored independently.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diff::refactoring::{RefactoringRecord, RefactoringType};
use crate::errors::RefMineResult;

static PARAM_LIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());

/// Owner of a member or nested type: text before `#`, else before the last
/// `.`.
pub fn parent_of(entity: &str) -> &str {
    if let Some((owner, _)) = entity.split_once('#') {
        return owner;
    }
    match entity.rfind('.') {
        Some(pos) => &entity[..pos],
        None => "",
    }
}

// ---------------------------------------------------------------------------
// RefactoringRelationship / RefactoringSet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RefactoringRelationship {
    #[serde(rename = "type")]
    pub refactoring_type: RefactoringType,
    pub entity_before: String,
    pub entity_after: String,
}

impl RefactoringRelationship {
    pub fn new(refactoring_type: RefactoringType, entity_before: &str, entity_after: &str) -> Self {
        Self {
            refactoring_type,
            entity_before: entity_before.to_string(),
            entity_after: entity_after.to_string(),
        }
    }

    fn without_params(&self) -> Self {
        Self {
            refactoring_type: self.refactoring_type,
            entity_before: PARAM_LIST_RE.replace_all(&self.entity_before, "()").into_owned(),
            entity_after: PARAM_LIST_RE.replace_all(&self.entity_after, "()").into_owned(),
        }
    }
}

impl From<&RefactoringRecord> for RefactoringRelationship {
    fn from(record: &RefactoringRecord) -> Self {
        Self::new(record.refactoring_type, &record.entity_before, &record.entity_after)
    }
}

impl fmt::Display for RefactoringRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}",
            self.refactoring_type, self.entity_before, self.entity_after
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactoringSet {
    pub project: String,
    pub revision: String,
    #[serde(default)]
    pub relationships: BTreeSet<RefactoringRelationship>,
}

impl RefactoringSet {
    pub fn new(project: &str, revision: &str) -> Self {
        Self {
            project: project.to_string(),
            revision: revision.to_string(),
            relationships: BTreeSet::new(),
        }
    }

    pub fn add(mut self, refactoring_type: RefactoringType, before: &str, after: &str) -> Self {
        self.relationships
            .insert(RefactoringRelationship::new(refactoring_type, before, after));
        self
    }

    pub fn from_records(project: &str, revision: &str, records: &[RefactoringRecord]) -> Self {
        Self {
            project: project.to_string(),
            revision: revision.to_string(),
            relationships: records.iter().map(RefactoringRelationship::from).collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> RefMineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_json_file(&self, path: &Path) -> RefMineResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Relationships whose type is in `types`.
    pub fn only(&self, types: &BTreeSet<RefactoringType>) -> BTreeSet<RefactoringRelationship> {
        self.relationships
            .iter()
            .filter(|r| types.contains(&r.refactoring_type))
            .cloned()
            .collect()
    }

    fn key(&self) -> String {
        revision_key(&self.project, &self.revision)
    }
}

fn revision_key(project: &str, revision: &str) -> String {
    format!("{}/commit/{}", project.trim_end_matches(".git"), revision)
}

fn strip_params(
    set: BTreeSet<RefactoringRelationship>,
    enabled: bool,
) -> BTreeSet<RefactoringRelationship> {
    if enabled {
        set.iter().map(RefactoringRelationship::without_params).collect()
    } else {
        set
    }
}

// ---------------------------------------------------------------------------
// CompareResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareResult {
    pub true_positives: BTreeSet<RefactoringRelationship>,
    pub false_positives: BTreeSet<RefactoringRelationship>,
    pub false_negatives: BTreeSet<RefactoringRelationship>,
}

impl CompareResult {
    pub fn tp_count(&self) -> usize {
        self.true_positives.len()
    }

    pub fn fp_count(&self) -> usize {
        self.false_positives.len()
    }

    pub fn fn_count(&self) -> usize {
        self.false_negatives.len()
    }

    pub fn precision(&self) -> f64 {
        precision(self.tp_count(), self.fp_count())
    }

    pub fn recall(&self) -> f64 {
        recall(self.tp_count(), self.fn_count())
    }

    pub fn f1(&self) -> f64 {
        f1(self.tp_count(), self.fp_count(), self.fn_count())
    }

    /// `(tp, fp, fn)` restricted to one refactoring type.
    pub fn counts_for(&self, kind: RefactoringType) -> (usize, usize, usize) {
        let count = |set: &BTreeSet<RefactoringRelationship>| {
            set.iter().filter(|r| r.refactoring_type == kind).count()
        };
        (
            count(&self.true_positives),
            count(&self.false_positives),
            count(&self.false_negatives),
        )
    }
}

fn precision(tp: usize, fp: usize) -> f64 {
    if tp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

fn recall(tp: usize, fn_: usize) -> f64 {
    if tp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}

fn f1(tp: usize, fp: usize, fn_: usize) -> f64 {
    if tp == 0 {
        return 0.0;
    }
    let p = precision(tp, fp);
    let r = recall(tp, fn_);
    2.0 * p * r / (p + r)
}

/// One scoring line; `#` is the oracle size (TP + FN).
pub fn summary_line(tp: usize, fp: usize, fn_: usize) -> String {
    format!(
        "#: {:3}  TP: {:3}  FP: {:3}  FN: {:3}  Prec.: {:.3}  Recall: {:.3}  F1: {:.3}",
        tp + fn_,
        tp,
        fp,
        fn_,
        precision(tp, fp),
        recall(tp, fn_),
        f1(tp, fp, fn_)
    )
}

// ---------------------------------------------------------------------------
// ResultComparator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ResultComparator {
    groups: IndexSet<String>,
    expected: IndexMap<String, RefactoringSet>,
    results: HashMap<(String, String), RefactoringSet>,
    ignore_method_params: bool,
    ignore_pull_up_to_extracted_supertype: bool,
}

impl Default for ResultComparator {
    fn default() -> Self {
        Self {
            groups: IndexSet::new(),
            expected: IndexMap::new(),
            results: HashMap::new(),
            ignore_method_params: false,
            ignore_pull_up_to_extracted_supertype: true,
        }
    }
}

impl ResultComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_method_params(mut self, enabled: bool) -> Self {
        self.ignore_method_params = enabled;
        self
    }

    pub fn ignore_pull_up_to_extracted_supertype(mut self, enabled: bool) -> Self {
        self.ignore_pull_up_to_extracted_supertype = enabled;
        self
    }

    pub fn expect(&mut self, sets: impl IntoIterator<Item = RefactoringSet>) -> &mut Self {
        for set in sets {
            self.expected.insert(set.key(), set);
        }
        self
    }

    pub fn compare_with(
        &mut self,
        group: &str,
        sets: impl IntoIterator<Item = RefactoringSet>,
    ) -> &mut Self {
        self.groups.insert(group.to_string());
        for set in sets {
            self.results.insert((set.key(), group.to_string()), set);
        }
        self
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    /// Score `group` over every expected revision it has a result for,
    /// considering only `types`.
    pub fn compare_result(&self, group: &str, types: &BTreeSet<RefactoringType>) -> CompareResult {
        let mut out = CompareResult::default();

        for (key, expected) in &self.expected {
            let Some(actual) = self.results.get(&(key.clone(), group.to_string())) else {
                debug!(revision = %key, group, "no result for expected revision");
                continue;
            };
            let mut expected_set = strip_params(expected.only(types), self.ignore_method_params);
            let actual_set = strip_params(actual.only(types), self.ignore_method_params);
            let unfiltered =
                strip_params(expected.relationships.clone(), self.ignore_method_params);

            for r in actual_set {
                if expected_set.remove(&r) {
                    out.true_positives.insert(r);
                } else if !(self.ignore_pull_up_to_extracted_supertype
                    && is_pull_up_to_extracted_supertype(&r, &unfiltered))
                {
                    out.false_positives.insert(r);
                }
            }
            out.false_negatives.extend(expected_set);
        }
        out
    }

    /// Per-group report: a total line plus one line per type with any hit.
    pub fn summary(&self, types: &BTreeSet<RefactoringType>) -> String {
        let mut text = String::new();
        for group in &self.groups {
            let r = self.compare_result(group, types);
            text.push_str(&format!("# {group} #\n"));
            text.push_str(&format!(
                "Total  {}\n",
                summary_line(r.tp_count(), r.fp_count(), r.fn_count())
            ));
            for &kind in types {
                let (tp, fp, fn_) = r.counts_for(kind);
                if tp > 0 || fp > 0 || fn_ > 0 {
                    text.push_str(&format!("{:<22} {}\n", kind.display_name(), summary_line(tp, fp, fn_)));
                }
            }
            text.push('\n');
        }
        text
    }
}

fn is_pull_up_to_extracted_supertype(
    r: &RefactoringRelationship,
    expected: &BTreeSet<RefactoringRelationship>,
) -> bool {
    if !matches!(
        r.refactoring_type,
        RefactoringType::PullUpMethod | RefactoringType::PullUpAttribute
    ) {
        return false;
    }
    let from = parent_of(&r.entity_before);
    let to = parent_of(&r.entity_after);
    [RefactoringType::ExtractSuperclass, RefactoringType::ExtractInterface]
        .into_iter()
        .any(|kind| expected.contains(&RefactoringRelationship::new(kind, from, to)))
}

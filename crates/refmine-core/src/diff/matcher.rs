//! Entity matching between a before and an after [`CodeModel`].
//!
//! Phases run in a fixed order and each one only sees what earlier phases
//! left unmatched:
//!
//! 1. types: exact qualified name > rename hints > member similarity
//! 2. methods: exact local signature > changed signature > rename within a
//!    type pair > cross-type relocation (pull up > push down > move)
//! 3. extract / inline evidence from code removed from or added to matched
//!    callers
//! 4. fields: exact within a type pair > cross-type relocation
//!
//! Every greedy pass sorts its candidates by score, then by the pass's
//! tie-breaks, then by discovery order, and never reuses a consumed entity.
//! Entities nobody claims are left in the `unmatched_*` lists; that is an
//! expected outcome, not an error.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::model::body::set_similarity;
use crate::model::entities::{FieldId, FieldKey, MethodEntity, MethodId, TypeId};
use crate::model::CodeModel;

/// File-level rename hints, old path -> new path.
pub type RenameHints = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Match records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeMatchKind {
    Exact,
    Hinted,
    Similar { score: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypePair {
    pub before: TypeId,
    pub after: TypeId,
    pub kind: TypeMatchKind,
}

/// How a type moved between containers, judged on its qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChange {
    Move,
    Rename,
    MoveAndRename,
}

/// Direction of a member that changed declaring type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relocation {
    PullUp,
    PushDown,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethodMatchKind {
    Exact,
    /// Same name and type pair, different parameters. Not reported.
    SignatureChanged { score: f64 },
    Renamed { score: f64 },
    Relocated { relocation: Relocation, score: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodPair {
    pub before: MethodId,
    pub after: MethodId,
    pub kind: MethodMatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatchKind {
    Exact,
    Relocated(Relocation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPair {
    pub before: FieldId,
    pub after: FieldId,
    pub kind: FieldMatchKind,
}

/// A before method whose removed code reappears in an extracted method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginCandidate {
    pub origin: MethodId,
    /// After version of `origin`; it calls the extracted method.
    pub origin_after: MethodId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionEvidence {
    /// Unmatched after method.
    pub extracted: MethodId,
    /// Discovery order (caller order in the after model).
    pub origins: Vec<OriginCandidate>,
}

/// An after method that absorbed the body of an inlined method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DestCandidate {
    pub dest: MethodId,
    /// Before version of `dest`; it called the inlined method.
    pub dest_before: MethodId,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InliningEvidence {
    /// Unmatched before method.
    pub inlined: MethodId,
    pub destinations: Vec<DestCandidate>,
}

// ---------------------------------------------------------------------------
// MatchResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MatchResult<'m> {
    pub before: &'m CodeModel,
    pub after: &'m CodeModel,
    pub type_pairs: Vec<TypePair>,
    pub method_pairs: Vec<MethodPair>,
    pub field_pairs: Vec<FieldPair>,
    pub extractions: Vec<ExtractionEvidence>,
    pub inlinings: Vec<InliningEvidence>,
    pub unmatched_before_types: Vec<TypeId>,
    pub unmatched_after_types: Vec<TypeId>,
    pub unmatched_before_methods: Vec<MethodId>,
    pub unmatched_after_methods: Vec<MethodId>,
    pub unmatched_before_fields: Vec<FieldId>,
    pub unmatched_after_fields: Vec<FieldId>,
    type_forward: HashMap<TypeId, TypeId>,
    type_backward: HashMap<TypeId, TypeId>,
    method_forward: HashMap<MethodId, MethodId>,
    method_backward: HashMap<MethodId, MethodId>,
    field_forward: HashMap<FieldId, FieldId>,
    field_backward: HashMap<FieldId, FieldId>,
}

impl<'m> MatchResult<'m> {
    fn new(before: &'m CodeModel, after: &'m CodeModel) -> Self {
        Self {
            before,
            after,
            type_pairs: Vec::new(),
            method_pairs: Vec::new(),
            field_pairs: Vec::new(),
            extractions: Vec::new(),
            inlinings: Vec::new(),
            unmatched_before_types: Vec::new(),
            unmatched_after_types: Vec::new(),
            unmatched_before_methods: Vec::new(),
            unmatched_after_methods: Vec::new(),
            unmatched_before_fields: Vec::new(),
            unmatched_after_fields: Vec::new(),
            type_forward: HashMap::new(),
            type_backward: HashMap::new(),
            method_forward: HashMap::new(),
            method_backward: HashMap::new(),
            field_forward: HashMap::new(),
            field_backward: HashMap::new(),
        }
    }

    // -- lookups ------------------------------------------------------------

    pub fn after_of_type(&self, before: TypeId) -> Option<TypeId> {
        self.type_forward.get(&before).copied()
    }

    pub fn before_of_type(&self, after: TypeId) -> Option<TypeId> {
        self.type_backward.get(&after).copied()
    }

    pub fn after_of_method(&self, before: MethodId) -> Option<MethodId> {
        self.method_forward.get(&before).copied()
    }

    pub fn before_of_method(&self, after: MethodId) -> Option<MethodId> {
        self.method_backward.get(&after).copied()
    }

    pub fn after_of_field(&self, before: FieldId) -> Option<FieldId> {
        self.field_forward.get(&before).copied()
    }

    pub fn before_of_field(&self, after: FieldId) -> Option<FieldId> {
        self.field_backward.get(&after).copied()
    }

    pub fn types_match(&self, before: TypeId, after: TypeId) -> bool {
        self.after_of_type(before) == Some(after)
    }

    /// Whether a before type and an after type sit in corresponding
    /// containers: matched enclosing types, or equal packages for top-level
    /// types.
    pub fn containers_match(&self, before: TypeId, after: TypeId) -> bool {
        let b = self.before.type_entity(before);
        let a = self.after.type_entity(after);
        match (b.enclosing, a.enclosing) {
            (Some(outer_b), Some(outer_a)) => self.types_match(outer_b, outer_a),
            (None, None) => b.package == a.package,
            _ => false,
        }
    }

    pub fn type_change(&self, before: TypeId, after: TypeId) -> TypeChange {
        if self.before.type_entity(before).simple_name() == self.after.type_entity(after).simple_name()
        {
            TypeChange::Move
        } else if self.containers_match(before, after) {
            TypeChange::Rename
        } else {
            TypeChange::MoveAndRename
        }
    }

    /// Direction of a member moving from `before_type` to `after_type`.
    pub fn relocation(&self, before_type: TypeId, after_type: TypeId) -> Relocation {
        match self.after_of_type(before_type) {
            Some(source) if self.after.is_subtype_of(source, after_type) => Relocation::PullUp,
            Some(source) if self.after.is_subtype_of(after_type, source) => Relocation::PushDown,
            _ => Relocation::Move,
        }
    }

    // -- recording ----------------------------------------------------------

    fn record_type(&mut self, before: TypeId, after: TypeId, kind: TypeMatchKind) {
        self.type_forward.insert(before, after);
        self.type_backward.insert(after, before);
        self.type_pairs.push(TypePair { before, after, kind });
    }

    fn record_method(&mut self, before: MethodId, after: MethodId, kind: MethodMatchKind) {
        self.method_forward.insert(before, after);
        self.method_backward.insert(after, before);
        self.method_pairs.push(MethodPair { before, after, kind });
    }

    fn record_field(&mut self, before: FieldId, after: FieldId, kind: FieldMatchKind) {
        self.field_forward.insert(before, after);
        self.field_backward.insert(after, before);
        self.field_pairs.push(FieldPair { before, after, kind });
    }

    fn free_before_types(&self) -> Vec<TypeId> {
        self.before
            .types()
            .map(|t| t.id)
            .filter(|id| !self.type_forward.contains_key(id))
            .collect()
    }

    fn free_after_types(&self) -> Vec<TypeId> {
        self.after
            .types()
            .map(|t| t.id)
            .filter(|id| !self.type_backward.contains_key(id))
            .collect()
    }

    fn free_before_methods(&self) -> Vec<MethodId> {
        self.before
            .methods()
            .map(|m| m.id)
            .filter(|id| !self.method_forward.contains_key(id))
            .collect()
    }

    fn free_after_methods(&self) -> Vec<MethodId> {
        self.after
            .methods()
            .map(|m| m.id)
            .filter(|id| !self.method_backward.contains_key(id))
            .collect()
    }

    fn free_before_fields(&self) -> Vec<FieldId> {
        self.before
            .fields()
            .map(|f| f.id)
            .filter(|id| !self.field_forward.contains_key(id))
            .collect()
    }

    fn free_after_fields(&self) -> Vec<FieldId> {
        self.after
            .fields()
            .map(|f| f.id)
            .filter(|id| !self.field_backward.contains_key(id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Greedy selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Candidate<T> {
    before: T,
    after: T,
    score: f64,
    /// Lower wins on equal score.
    preference: u8,
    /// Lower wins on equal score and preference.
    distance: usize,
    seq: usize,
}

/// Sort by (score desc, preference, distance, discovery order) and keep each
/// entity at most once.
fn greedy<T: Copy + Eq + Hash>(mut candidates: Vec<Candidate<T>>) -> Vec<Candidate<T>> {
    candidates.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(Ordering::Equal)
            .then(x.preference.cmp(&y.preference))
            .then(x.distance.cmp(&y.distance))
            .then(x.seq.cmp(&y.seq))
    });
    let mut used_before: HashSet<T> = HashSet::new();
    let mut used_after: HashSet<T> = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            if used_before.contains(&c.before) || used_after.contains(&c.after) {
                return false;
            }
            used_before.insert(c.before);
            used_after.insert(c.after);
            true
        })
        .collect()
}

/// Levenshtein edit distance over chars (two-row Wagner-Fischer).
pub fn edit_distance(s1: &str, s2: &str) -> usize {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (curr_row[j - 1] + 1)
                .min(prev_row[j] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b.len()]
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum MethodCriterion {
    SignatureChanged,
    Renamed,
    Relocated(Relocation),
}

struct Matcher<'m, 'c> {
    result: MatchResult<'m>,
    config: &'c DetectorConfig,
}

/// Match `before` against `after`. Pure: equal inputs give equal results.
pub fn match_models<'m>(
    before: &'m CodeModel,
    after: &'m CodeModel,
    hints: &RenameHints,
    config: &DetectorConfig,
) -> MatchResult<'m> {
    let mut matcher = Matcher {
        result: MatchResult::new(before, after),
        config,
    };
    matcher.match_exact_types();
    matcher.match_hinted_types(hints);
    matcher.match_similar_types();
    matcher.match_exact_methods();
    matcher.run_method_criterion(MethodCriterion::SignatureChanged);
    matcher.run_method_criterion(MethodCriterion::Renamed);
    matcher.run_method_criterion(MethodCriterion::Relocated(Relocation::PullUp));
    matcher.run_method_criterion(MethodCriterion::Relocated(Relocation::PushDown));
    matcher.run_method_criterion(MethodCriterion::Relocated(Relocation::Move));
    matcher.collect_extractions();
    matcher.collect_inlinings();
    matcher.match_exact_fields();
    matcher.match_relocated_fields(Relocation::PullUp);
    matcher.match_relocated_fields(Relocation::PushDown);
    matcher.match_relocated_fields(Relocation::Move);
    matcher.finish()
}

impl<'m, 'c> Matcher<'m, 'c> {
    // -- types --------------------------------------------------------------

    fn match_exact_types(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        for t in before.types() {
            if let Some(a) = after.type_by_name(&t.qualified_name) {
                self.result.record_type(t.id, a, TypeMatchKind::Exact);
            }
        }
    }

    fn match_hinted_types(&mut self, hints: &RenameHints) {
        let before = self.result.before;
        let after = self.result.after;
        for (old_path, new_path) in hints {
            let mut olds: Vec<TypeId> = before
                .types_in_file(old_path)
                .into_iter()
                .filter(|id| self.result.after_of_type(*id).is_none())
                .collect();
            let mut news: Vec<TypeId> = after
                .types_in_file(new_path)
                .into_iter()
                .filter(|id| self.result.before_of_type(*id).is_none())
                .collect();

            let mut paired: Vec<(TypeId, TypeId)> = Vec::new();
            for &b in &olds {
                let simple = before.type_entity(b).simple_name();
                if let Some(pos) = news
                    .iter()
                    .position(|&a| after.type_entity(a).simple_name() == simple)
                {
                    paired.push((b, news.remove(pos)));
                }
            }
            olds.retain(|b| !paired.iter().any(|(pb, _)| pb == b));
            // A single leftover on each side is the file's renamed type.
            if olds.len() == 1 && news.len() == 1 {
                paired.push((olds[0], news[0]));
            }
            for (b, a) in paired {
                self.result.record_type(b, a, TypeMatchKind::Hinted);
            }
        }
    }

    fn match_similar_types(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        let free_before = self.result.free_before_types();
        let free_after = self.result.free_after_types();
        if free_before.is_empty() || free_after.is_empty() {
            return;
        }

        let after_members: Vec<(TypeId, BTreeSet<String>)> = free_after
            .iter()
            .map(|&a| (a, after.member_signatures(a)))
            .collect();

        let mut candidates = Vec::new();
        let mut seq = 0;
        for &b in &free_before {
            let members_b = before.member_signatures(b);
            let tb = before.type_entity(b);
            for (a, members_a) in &after_members {
                let a = *a;
                seq += 1;
                let score = set_similarity(&members_b, members_a);
                if score <= 0.0 {
                    continue;
                }
                let threshold = match self.result.type_change(b, a) {
                    TypeChange::Move => self.config.move_type_threshold,
                    TypeChange::Rename => self.config.rename_type_threshold,
                    TypeChange::MoveAndRename => self.config.move_and_rename_type_threshold,
                };
                if score < threshold {
                    continue;
                }
                let ta = after.type_entity(a);
                candidates.push(Candidate {
                    before: b,
                    after: a,
                    score,
                    preference: u8::from(tb.simple_name() != ta.simple_name()),
                    distance: edit_distance(&tb.qualified_name, &ta.qualified_name),
                    seq,
                });
            }
        }
        debug!(candidates = candidates.len(), "type similarity candidates");

        for c in greedy(candidates) {
            self.result
                .record_type(c.before, c.after, TypeMatchKind::Similar { score: c.score });
        }
    }

    // -- methods ------------------------------------------------------------

    fn match_exact_methods(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        let pairs = self.result.type_pairs.clone();
        for pair in pairs {
            let after_name = &after.type_entity(pair.after).qualified_name;
            for &m in &before.type_entity(pair.before).methods {
                let key = before.method(m).key.in_type(after_name);
                if let Some(a) = after.method_by_key(&key) {
                    if self.result.before_of_method(a).is_none() {
                        self.result.record_method(m, a, MethodMatchKind::Exact);
                    }
                }
            }
        }
    }

    fn method_can_match(&self, criterion: MethodCriterion, b: &MethodEntity, a: &MethodEntity) -> bool {
        if b.is_abstract || a.is_abstract {
            return false;
        }
        let same_name = b.key.name == a.key.name;
        let same_container = self.result.types_match(b.declaring_type, a.declaring_type);
        match criterion {
            MethodCriterion::SignatureChanged => same_name && same_container,
            MethodCriterion::Renamed => {
                !same_name && same_container && !b.is_constructor() && !a.is_constructor()
            }
            MethodCriterion::Relocated(wanted) => {
                same_name
                    && !same_container
                    && !b.is_constructor()
                    && !a.is_constructor()
                    && self.result.relocation(b.declaring_type, a.declaring_type) == wanted
            }
        }
    }

    fn method_threshold(&self, criterion: MethodCriterion) -> f64 {
        match criterion {
            MethodCriterion::SignatureChanged | MethodCriterion::Renamed => {
                self.config.rename_method_threshold
            }
            MethodCriterion::Relocated(Relocation::PullUp) => self.config.pull_up_method_threshold,
            MethodCriterion::Relocated(Relocation::PushDown) => {
                self.config.push_down_method_threshold
            }
            MethodCriterion::Relocated(Relocation::Move) => self.config.move_method_threshold,
        }
    }

    fn run_method_criterion(&mut self, criterion: MethodCriterion) {
        let before = self.result.before;
        let after = self.result.after;
        let threshold = self.method_threshold(criterion);
        let free_after = self.result.free_after_methods();

        let mut candidates = Vec::new();
        let mut seq = 0;
        for b in self.result.free_before_methods() {
            let mb = before.method(b);
            for &a in &free_after {
                seq += 1;
                let ma = after.method(a);
                if !self.method_can_match(criterion, mb, ma) {
                    continue;
                }
                let score = mb.body.similarity(&ma.body);
                if score < threshold {
                    continue;
                }
                candidates.push(Candidate {
                    before: b,
                    after: a,
                    score,
                    preference: 0,
                    distance: 0,
                    seq,
                });
            }
        }
        debug!(?criterion, candidates = candidates.len(), "method candidates");

        for c in greedy(candidates) {
            let kind = match criterion {
                MethodCriterion::SignatureChanged => {
                    MethodMatchKind::SignatureChanged { score: c.score }
                }
                MethodCriterion::Renamed => MethodMatchKind::Renamed { score: c.score },
                MethodCriterion::Relocated(relocation) => MethodMatchKind::Relocated {
                    relocation,
                    score: c.score,
                },
            };
            self.result.record_method(c.before, c.after, kind);
        }
    }

    // -- extract / inline evidence -------------------------------------------

    fn collect_extractions(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        let threshold = self.config.extract_method_threshold;
        let mut evidence: IndexMap<MethodId, Vec<OriginCandidate>> = IndexMap::new();

        for extracted in self.result.free_after_methods() {
            let m = after.method(extracted);
            if m.is_abstract {
                continue;
            }
            for &caller in &m.callers {
                if caller == extracted {
                    continue;
                }
                let Some(origin) = self.result.before_of_method(caller) else {
                    continue;
                };
                let removed = before.method(origin).body.minus(&after.method(caller).body);
                let score = m.body.partial_similarity(&removed);
                if score >= threshold {
                    evidence.entry(extracted).or_default().push(OriginCandidate {
                        origin,
                        origin_after: caller,
                        score,
                    });
                }
            }
        }

        self.result.extractions = evidence
            .into_iter()
            .map(|(extracted, origins)| ExtractionEvidence { extracted, origins })
            .collect();
    }

    fn collect_inlinings(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        let threshold = self.config.inline_method_threshold;
        let mut evidence: IndexMap<MethodId, Vec<DestCandidate>> = IndexMap::new();

        for inlined in self.result.free_before_methods() {
            let m = before.method(inlined);
            if m.is_abstract {
                continue;
            }
            for &caller in &m.callers {
                if caller == inlined {
                    continue;
                }
                let Some(dest) = self.result.after_of_method(caller) else {
                    continue;
                };
                let added = after.method(dest).body.minus(&before.method(caller).body);
                let score = m.body.partial_similarity(&added);
                if score >= threshold {
                    evidence.entry(inlined).or_default().push(DestCandidate {
                        dest,
                        dest_before: caller,
                        score,
                    });
                }
            }
        }

        self.result.inlinings = evidence
            .into_iter()
            .map(|(inlined, destinations)| InliningEvidence { inlined, destinations })
            .collect();
    }

    // -- fields -------------------------------------------------------------

    fn match_exact_fields(&mut self) {
        let before = self.result.before;
        let after = self.result.after;
        let pairs = self.result.type_pairs.clone();
        for pair in pairs {
            let after_name = &after.type_entity(pair.after).qualified_name;
            for &f in &before.type_entity(pair.before).fields {
                let key = FieldKey::new(after_name, before.field(f).name());
                if let Some(a) = after.field_by_key(&key) {
                    if self.result.before_of_field(a).is_none() {
                        self.result.record_field(f, a, FieldMatchKind::Exact);
                    }
                }
            }
        }
    }

    fn match_relocated_fields(&mut self, wanted: Relocation) {
        let before = self.result.before;
        let after = self.result.after;
        let free_after = self.result.free_after_fields();

        let mut candidates = Vec::new();
        let mut seq = 0;
        for b in self.result.free_before_fields() {
            let fb = before.field(b);
            for &a in &free_after {
                seq += 1;
                let fa = after.field(a);
                if fb.name() != fa.name() || fb.type_name != fa.type_name {
                    continue;
                }
                if self.result.types_match(fb.declaring_type, fa.declaring_type) {
                    continue;
                }
                if self.result.relocation(fb.declaring_type, fa.declaring_type) != wanted {
                    continue;
                }
                candidates.push(Candidate {
                    before: b,
                    after: a,
                    score: 1.0,
                    preference: 0,
                    distance: 0,
                    seq,
                });
            }
        }

        for c in greedy(candidates) {
            self.result
                .record_field(c.before, c.after, FieldMatchKind::Relocated(wanted));
        }
    }

    fn finish(mut self) -> MatchResult<'m> {
        self.result.unmatched_before_types = self.result.free_before_types();
        self.result.unmatched_after_types = self.result.free_after_types();
        self.result.unmatched_before_methods = self.result.free_before_methods();
        self.result.unmatched_after_methods = self.result.free_after_methods();
        self.result.unmatched_before_fields = self.result.free_before_fields();
        self.result.unmatched_after_fields = self.result.free_after_fields();
        debug!(
            types = self.result.type_pairs.len(),
            methods = self.result.method_pairs.len(),
            fields = self.result.field_pairs.len(),
            extractions = self.result.extractions.len(),
            inlinings = self.result.inlinings.len(),
            "matching finished"
        );
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::draft::{MethodSpec, ModelDraft, TypeSpec};
    use crate::model::entities::MethodKey;

    fn config() -> DetectorConfig {
        DetectorConfig::default()
    }

    fn worker(qualified_name: &str) -> TypeSpec {
        TypeSpec::class(qualified_name)
            .method(MethodSpec::new("start").body(["running = true;", "notifyAll();"]))
            .method(MethodSpec::new("stop").body(["running = false;"]))
            .field("running", "boolean")
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn test_identical_models_match_exactly() {
        let before = ModelDraft::new().with_type(worker("app.Worker")).freeze().unwrap();
        let after = ModelDraft::new().with_type(worker("app.Worker")).freeze().unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(result.type_pairs.len(), 1);
        assert_eq!(result.type_pairs[0].kind, TypeMatchKind::Exact);
        assert_eq!(result.method_pairs.len(), 2);
        assert!(result.method_pairs.iter().all(|p| p.kind == MethodMatchKind::Exact));
        assert_eq!(result.field_pairs.len(), 1);
        assert!(result.unmatched_before_methods.is_empty());
        assert!(result.unmatched_after_types.is_empty());
        assert!(result.extractions.is_empty());
    }

    #[test]
    fn test_renamed_type_matched_by_members() {
        let before = ModelDraft::new().with_type(worker("app.Worker")).freeze().unwrap();
        let after = ModelDraft::new().with_type(worker("app.Runner")).freeze().unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(result.type_pairs.len(), 1);
        assert!(matches!(result.type_pairs[0].kind, TypeMatchKind::Similar { score } if score == 1.0));
        let pair = result.type_pairs[0];
        assert_eq!(result.type_change(pair.before, pair.after), TypeChange::Rename);
        assert_eq!(result.method_pairs.len(), 2);
    }

    #[test]
    fn test_similarity_prefers_same_simple_name() {
        let before = ModelDraft::new().with_type(worker("old.Worker")).freeze().unwrap();
        let after = ModelDraft::new()
            .with_type(worker("fresh.Runner"))
            .with_type(worker("fresh.Worker"))
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        let pair = result.type_pairs[0];
        assert_eq!(after.type_entity(pair.after).qualified_name, "fresh.Worker");
        assert_eq!(result.type_change(pair.before, pair.after), TypeChange::Move);
        assert_eq!(result.unmatched_after_types.len(), 1);
    }

    #[test]
    fn test_similarity_tie_breaks_on_edit_distance() {
        let before = ModelDraft::new().with_type(worker("app.Worker")).freeze().unwrap();
        let after = ModelDraft::new()
            .with_type(worker("zzz.Something"))
            .with_type(worker("app.Workers"))
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        let pair = result.type_pairs[0];
        assert_eq!(after.type_entity(pair.after).qualified_name, "app.Workers");
    }

    #[test]
    fn test_memberless_types_never_match_by_similarity() {
        let before = ModelDraft::new().with_type(TypeSpec::class("a.Empty")).freeze().unwrap();
        let after = ModelDraft::new().with_type(TypeSpec::class("a.Blank")).freeze().unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert!(result.type_pairs.is_empty());
        assert_eq!(result.unmatched_before_types.len(), 1);
        assert_eq!(result.unmatched_after_types.len(), 1);
    }

    #[test]
    fn test_rename_hint_pairs_single_types() {
        let before = ModelDraft::new()
            .with_type(TypeSpec::class("a.Legacy").in_file("src/a/Legacy.java"))
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(TypeSpec::class("a.Modern").in_file("src/a/Modern.java"))
            .freeze()
            .unwrap();
        let mut hints = RenameHints::new();
        hints.insert("src/a/Legacy.java".to_string(), "src/a/Modern.java".to_string());
        let result = match_models(&before, &after, &hints, &config());
        assert_eq!(result.type_pairs.len(), 1);
        assert_eq!(result.type_pairs[0].kind, TypeMatchKind::Hinted);
    }

    #[test]
    fn test_method_rename_within_pair() {
        let before = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Calc")
                    .method(MethodSpec::new("sum").body(["int s = a + b;", "log(s);", "return s;"])),
            )
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Calc")
                    .method(MethodSpec::new("add").body(["int s = a + b;", "log(s);", "return s;"])),
            )
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(result.method_pairs.len(), 1);
        assert!(matches!(result.method_pairs[0].kind, MethodMatchKind::Renamed { .. }));
    }

    #[test]
    fn test_signature_change_is_silent_match() {
        let before = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Calc")
                    .method(MethodSpec::new("sum").param("a", "int").body(["return a + b;"])),
            )
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Calc")
                    .method(MethodSpec::new("sum").param("a", "long").body(["return a + b;"])),
            )
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert!(matches!(
            result.method_pairs[0].kind,
            MethodMatchKind::SignatureChanged { .. }
        ));
    }

    #[test]
    fn test_method_pulled_up() {
        let body = ["validate(x);", "store(x);", "audit(x);"];
        let before = ModelDraft::new()
            .with_type(TypeSpec::class("a.Base").method(MethodSpec::new("keep").body(["k();"])))
            .with_type(
                TypeSpec::class("a.Impl")
                    .extends("a.Base")
                    .method(MethodSpec::new("save").param("x", "Item").body(body)),
            )
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Base")
                    .method(MethodSpec::new("keep").body(["k();"]))
                    .method(MethodSpec::new("save").param("x", "Item").body(body)),
            )
            .with_type(TypeSpec::class("a.Impl").extends("a.Base"))
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        let save = before
            .method_by_key(&MethodKey::new("a.Impl", "save", &["Item"]))
            .unwrap();
        let pair = result.method_pairs.iter().find(|p| p.before == save).unwrap();
        assert!(matches!(
            pair.kind,
            MethodMatchKind::Relocated { relocation: Relocation::PullUp, .. }
        ));
    }

    #[test]
    fn test_abstract_methods_not_relocated() {
        let before = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.X")
                    .method(MethodSpec::new("f").abstract_method())
                    .field("x", "int"),
            )
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(TypeSpec::class("a.X").field("x", "int"))
            .with_type(TypeSpec::class("b.Y").method(MethodSpec::new("f").abstract_method()))
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert!(result.method_pairs.is_empty());
        assert_eq!(result.unmatched_before_methods.len(), 1);
    }

    #[test]
    fn test_extraction_evidence_in_discovery_order() {
        let before = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Report")
                    .method(MethodSpec::new("render").body([
                        "header();",
                        "String s = fmt(data);",
                        "out.write(s);",
                        "footer();",
                    ])),
            )
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(
                TypeSpec::class("a.Report")
                    .method(
                        MethodSpec::new("render")
                            .body(["header();", "emit();", "footer();"])
                            .call("a.Report", "emit", &[]),
                    )
                    .method(MethodSpec::new("emit").body(["String s = fmt(data);", "out.write(s);"])),
            )
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(result.extractions.len(), 1);
        let evidence = &result.extractions[0];
        assert_eq!(after.method(evidence.extracted).name, "emit");
        assert_eq!(evidence.origins.len(), 1);
        assert_eq!(before.method(evidence.origins[0].origin).name, "render");
        assert_eq!(evidence.origins[0].score, 1.0);
    }

    #[test]
    fn test_fields_relocated_by_name_and_type() {
        let before = ModelDraft::new()
            .with_type(TypeSpec::class("a.A").field("limit", "int").field("name", "String"))
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(TypeSpec::class("a.A").field("name", "String"))
            .with_type(TypeSpec::class("a.Limits").field("limit", "int"))
            .freeze()
            .unwrap();
        let result = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(result.field_pairs.len(), 2);
        assert!(result
            .field_pairs
            .iter()
            .any(|p| p.kind == FieldMatchKind::Relocated(Relocation::Move)));
    }

    #[test]
    fn test_matching_is_deterministic() {
        let before = ModelDraft::new()
            .with_type(worker("p.One"))
            .with_type(worker("p.Two"))
            .freeze()
            .unwrap();
        let after = ModelDraft::new()
            .with_type(worker("q.Uno"))
            .with_type(worker("q.Dos"))
            .freeze()
            .unwrap();
        let first = match_models(&before, &after, &RenameHints::new(), &config());
        let second = match_models(&before, &after, &RenameHints::new(), &config());
        assert_eq!(first.type_pairs, second.type_pairs);
        assert_eq!(first.method_pairs, second.method_pairs);
    }
}

//! Turns a [`MatchResult`] into typed [`Refactoring`] events.

use std::collections::HashSet;

use tracing::debug;

use crate::config::DetectorConfig;
use crate::diff::matcher::{
    FieldMatchKind, MatchResult, MethodMatchKind, Relocation, TypeChange,
};
use crate::diff::refactoring::Refactoring;
use crate::model::body::set_partial_similarity;
use crate::model::entities::{MethodId, TypeId};

/// Classify every match and leftover. Deterministic for equal inputs; the
/// order follows the match result and is normalized later by the pipeline.
pub fn classify(matches: &MatchResult<'_>, config: &DetectorConfig) -> Vec<Refactoring> {
    let mut refactorings = Vec::new();

    classify_types(matches, &mut refactorings);
    let extracted_supertypes = classify_extracted_supertypes(matches, config, &mut refactorings);
    classify_methods(matches, &extracted_supertypes, &mut refactorings);
    classify_extractions(matches, &mut refactorings);
    classify_inlinings(matches, &mut refactorings);
    classify_fields(matches, &extracted_supertypes, &mut refactorings);

    refactorings.retain(|r| config.reports(r.refactoring_type()));
    debug!(count = refactorings.len(), "classified refactorings");
    refactorings
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn classify_types(matches: &MatchResult<'_>, out: &mut Vec<Refactoring>) {
    for pair in &matches.type_pairs {
        let before_name = &matches.before.type_entity(pair.before).qualified_name;
        let after_name = &matches.after.type_entity(pair.after).qualified_name;
        if before_name == after_name {
            continue;
        }
        let (before, after) = (pair.before, pair.after);
        out.push(match matches.type_change(before, after) {
            TypeChange::Move => Refactoring::MoveClass { before, after },
            TypeChange::Rename => Refactoring::RenameClass { before, after },
            TypeChange::MoveAndRename => Refactoring::MoveAndRenameClass { before, after },
        });
    }
}

/// Emits Extract Superclass/Interface and returns the `(subtype before,
/// extracted supertype)` relationships used to silence the matching pull-ups.
fn classify_extracted_supertypes(
    matches: &MatchResult<'_>,
    config: &DetectorConfig,
    out: &mut Vec<Refactoring>,
) -> HashSet<(TypeId, TypeId)> {
    let mut relationships = HashSet::new();
    for &extracted in &matches.unmatched_after_types {
        let supertype_members = matches.after.member_signatures(extracted);
        for &subtype in matches.after.direct_subtypes(extracted) {
            let Some(subtype_before) = matches.before_of_type(subtype) else {
                continue;
            };
            let members_before = matches.before.member_signatures(subtype_before);
            let score = set_partial_similarity(&supertype_members, &members_before);
            if score > 0.0 && score >= config.extract_supertype_threshold {
                relationships.insert((subtype_before, extracted));
                out.push(Refactoring::ExtractSuperType {
                    extracted,
                    origin_after: subtype,
                    kind: matches.after.type_entity(extracted).kind,
                });
            }
        }
    }
    relationships
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

fn classify_methods(
    matches: &MatchResult<'_>,
    extracted_supertypes: &HashSet<(TypeId, TypeId)>,
    out: &mut Vec<Refactoring>,
) {
    for pair in &matches.method_pairs {
        let (before, after) = (pair.before, pair.after);
        match pair.kind {
            MethodMatchKind::Exact | MethodMatchKind::SignatureChanged { .. } => {}
            MethodMatchKind::Renamed { .. } => out.push(Refactoring::RenameMethod { before, after }),
            MethodMatchKind::Relocated { relocation, .. } => match relocation {
                Relocation::PullUp => {
                    let source = matches.before.method(before).declaring_type;
                    let target = matches.after.method(after).declaring_type;
                    if !extracted_supertypes.contains(&(source, target)) {
                        out.push(Refactoring::PullUpMethod { before, after });
                    }
                }
                Relocation::PushDown => out.push(Refactoring::PushDownMethod { before, after }),
                Relocation::Move => out.push(Refactoring::MoveMethod { before, after }),
            },
        }
    }
}

/// Whether a before-side method and an after-side method are declared in
/// the same type (matched pair or same qualified name).
fn declared_in_same_type(matches: &MatchResult<'_>, before: MethodId, after: MethodId) -> bool {
    let before_type = matches.before.method(before).declaring_type;
    let after_type = matches.after.method(after).declaring_type;
    matches.types_match(before_type, after_type)
        || matches.before.type_entity(before_type).qualified_name
            == matches.after.type_entity(after_type).qualified_name
}

fn classify_extractions(matches: &MatchResult<'_>, out: &mut Vec<Refactoring>) {
    for evidence in &matches.extractions {
        let extracted = evidence.extracted;
        let method = matches.after.method(extracted);
        if method.is_getter() || method.is_setter() {
            continue;
        }

        let mut from: Vec<MethodId> = Vec::with_capacity(evidence.origins.len());
        for candidate in &evidence.origins {
            if !from.contains(&candidate.origin) {
                from.push(candidate.origin);
            }
        }
        // Same-type origin first, else the first one discovered.
        let origin = from
            .iter()
            .copied()
            .find(|&o| declared_in_same_type(matches, o, extracted))
            .or_else(|| from.first().copied());
        if let Some(origin) = origin {
            out.push(Refactoring::ExtractMethod {
                extracted,
                origin,
                from,
            });
        }
    }
}

fn classify_inlinings(matches: &MatchResult<'_>, out: &mut Vec<Refactoring>) {
    for evidence in &matches.inlinings {
        let inlined = evidence.inlined;
        let dest = evidence
            .destinations
            .iter()
            .map(|d| d.dest)
            .find(|&d| declared_in_same_type(matches, inlined, d))
            .or_else(|| evidence.destinations.first().map(|d| d.dest));
        if let Some(dest) = dest {
            out.push(Refactoring::InlineMethod { inlined, dest });
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

fn classify_fields(
    matches: &MatchResult<'_>,
    extracted_supertypes: &HashSet<(TypeId, TypeId)>,
    out: &mut Vec<Refactoring>,
) {
    for pair in &matches.field_pairs {
        let (before, after) = (pair.before, pair.after);
        match pair.kind {
            FieldMatchKind::Exact => {}
            FieldMatchKind::Relocated(Relocation::PullUp) => {
                let source = matches.before.field(before).declaring_type;
                let target = matches.after.field(after).declaring_type;
                if !extracted_supertypes.contains(&(source, target)) {
                    out.push(Refactoring::PullUpAttribute { before, after });
                }
            }
            FieldMatchKind::Relocated(Relocation::PushDown) => {
                out.push(Refactoring::PushDownAttribute { before, after })
            }
            FieldMatchKind::Relocated(Relocation::Move) => {
                out.push(Refactoring::MoveAttribute { before, after })
            }
        }
    }
}

//! Motivation tags for Extract Method refactorings.
//!
//! Pure set algebra over the after model's call graph; the refactoring itself
//! is never touched.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::matcher::MatchResult;
use crate::diff::refactoring::Refactoring;
use crate::model::entities::MethodId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MotivationTag {
    Reuse,
    IntroduceAlternativeSignature,
    RemoveDuplication,
    PreserveBackwardCompatibility,
    ImproveTestability,
    EnableOverriding,
    EnableRecursion,
}

impl MotivationTag {
    pub fn label(self) -> &'static str {
        match self {
            MotivationTag::Reuse => "EM: Extract reusable method",
            MotivationTag::IntroduceAlternativeSignature => {
                "EM: Introduce alternative method signature"
            }
            MotivationTag::RemoveDuplication => "EM: Remove duplication",
            MotivationTag::PreserveBackwardCompatibility => {
                "EM: Replace method keeping backward compatibility"
            }
            MotivationTag::ImproveTestability => "EM: Improve testability",
            MotivationTag::EnableOverriding => "EM: Enable overriding",
            MotivationTag::EnableRecursion => "EM: Enable recursion",
        }
    }
}

impl fmt::Display for MotivationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tags explaining an Extract Method. Every other kind gets an empty set.
pub fn classify_motivation(
    refactoring: &Refactoring,
    matches: &MatchResult<'_>,
) -> BTreeSet<MotivationTag> {
    let mut tags = BTreeSet::new();
    let Refactoring::ExtractMethod { extracted, from, .. } = refactoring else {
        return tags;
    };
    let after = matches.after;
    let extracted_entity = after.method(*extracted);

    // `from` lives in the before model; its after versions are the callers
    // that now delegate to the extracted method.
    let from_after: HashSet<MethodId> = from
        .iter()
        .filter_map(|&origin| matches.after_of_method(origin))
        .collect();

    if from.len() == 1 {
        if let Some(origin_after) = from_after.iter().next().copied() {
            if delegates_to(matches, origin_after, *extracted) {
                if after.method(origin_after).is_deprecated {
                    tags.insert(MotivationTag::PreserveBackwardCompatibility);
                } else {
                    tags.insert(MotivationTag::IntroduceAlternativeSignature);
                }
            }
        }
    } else if from.len() > 1 {
        tags.insert(MotivationTag::RemoveDuplication);
    }

    let other_callers: Vec<MethodId> = extracted_entity
        .callers
        .iter()
        .copied()
        .filter(|c| *c != *extracted && !from_after.contains(c))
        .collect();

    if !tags.contains(&MotivationTag::PreserveBackwardCompatibility)
        && other_callers
            .iter()
            .any(|&c| after.method(c).is_test_code == extracted_entity.is_test_code)
    {
        tags.insert(MotivationTag::Reuse);
    }

    if !extracted_entity.is_test_code
        && other_callers.iter().any(|&c| after.method(c).is_test_code)
    {
        tags.insert(MotivationTag::ImproveTestability);
    }

    if extracted_entity.is_overridden {
        tags.insert(MotivationTag::EnableOverriding);
    }
    if extracted_entity.is_recursive {
        tags.insert(MotivationTag::EnableRecursion);
    }
    tags
}

/// A single statement whose only resolved call is `target` and which
/// forwards every parameter of `method`.
fn delegates_to(matches: &MatchResult<'_>, method: MethodId, target: MethodId) -> bool {
    let m = matches.after.method(method);
    if m.statement_count != 1 || m.calls.as_slice() != [target] {
        return false;
    }
    let Some(statement) = m.body.statements().next() else {
        // Statement count came from the builder without a body; trust the call set.
        return true;
    };
    m.parameters
        .iter()
        .all(|p| mentions_identifier(statement, &p.name))
}

fn mentions_identifier(statement: &str, name: &str) -> bool {
    statement
        .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .any(|token| token == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(MotivationTag::Reuse.to_string(), "EM: Extract reusable method");
        assert_eq!(
            MotivationTag::PreserveBackwardCompatibility.label(),
            "EM: Replace method keeping backward compatibility"
        );
    }

    #[test]
    fn test_mentions_identifier() {
        assert!(mentions_identifier("return load(path, true);", "path"));
        assert!(!mentions_identifier("return load(pathName);", "path"));
        assert!(mentions_identifier("this.run($x);", "$x"));
    }
}

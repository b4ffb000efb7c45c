//! Statement-multiset and member-set representations used for similarity
//! scoring.

use std::collections::{BTreeMap, BTreeSet};

/// Collapse runs of whitespace so formatting changes do not affect matching.
pub fn normalize_statement(stmt: &str) -> String {
    stmt.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// BodyRepr
// ---------------------------------------------------------------------------

/// Multiset of normalized statements making up a method body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyRepr {
    counts: BTreeMap<String, usize>,
    total: usize,
}

impl BodyRepr {
    pub fn from_statements<I, S>(statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut body = BodyRepr::default();
        for stmt in statements {
            let normalized = normalize_statement(stmt.as_ref());
            if normalized.is_empty() {
                continue;
            }
            *body.counts.entry(normalized).or_insert(0) += 1;
            body.total += 1;
        }
        body
    }

    /// Number of statements, counting repeats.
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn count(&self, stmt: &str) -> usize {
        self.counts.get(stmt).copied().unwrap_or(0)
    }

    /// Distinct statements in lexical order.
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Multiset difference `self - other`.
    pub fn minus(&self, other: &BodyRepr) -> BodyRepr {
        let mut counts = BTreeMap::new();
        let mut total = 0;
        for (stmt, n) in &self.counts {
            let left = n.saturating_sub(other.count(stmt));
            if left > 0 {
                counts.insert(stmt.clone(), left);
                total += left;
            }
        }
        BodyRepr { counts, total }
    }

    pub fn intersection_len(&self, other: &BodyRepr) -> usize {
        self.counts
            .iter()
            .map(|(stmt, n)| (*n).min(other.count(stmt)))
            .sum()
    }

    /// Multiset Jaccard, zero when both bodies are empty.
    pub fn similarity(&self, other: &BodyRepr) -> f64 {
        let common = self.intersection_len(other);
        let union = self.total + other.total - common;
        if union == 0 {
            return 0.0;
        }
        common as f64 / union as f64
    }

    /// Share of `self` that also appears in `other`. An empty body is never
    /// contained anywhere.
    pub fn partial_similarity(&self, other: &BodyRepr) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.intersection_len(other) as f64 / self.total as f64
    }
}

// ---------------------------------------------------------------------------
// Member sets
// ---------------------------------------------------------------------------

/// `|a ∩ b| / |a ∪ b|`, zero when both are empty.
pub fn set_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let common = a.intersection(b).count();
    let union = a.len() + b.len() - common;
    if union == 0 {
        return 0.0;
    }
    common as f64 / union as f64
}

/// `|a ∩ b| / |a|`, zero when `a` is empty.
pub fn set_partial_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    a.intersection(b).count() as f64 / a.len() as f64
}

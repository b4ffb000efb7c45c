//! Detector configuration: similarity thresholds, reported refactoring kinds
//! and pool sizing.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::diff::refactoring::RefactoringType;
use crate::errors::{RefMineError, RefMineResult};

// ---------------------------------------------------------------------------
// Environment toggles
// ---------------------------------------------------------------------------

/// Motivation classification is on unless `REFMINE_MOTIVATION` is set to a
/// falsy value.
pub fn motivation_enabled() -> bool {
    match std::env::var("REFMINE_MOTIVATION") {
        Ok(val) => {
            let v = val.trim().to_lowercase();
            !matches!(v.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

/// Worker count requested through `REFMINE_WORKERS`, if it parses.
pub fn workers_override() -> Option<usize> {
    std::env::var("REFMINE_WORKERS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}

// ---------------------------------------------------------------------------
// DetectorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub move_type_threshold: f64,
    pub rename_type_threshold: f64,
    pub move_and_rename_type_threshold: f64,
    pub extract_supertype_threshold: f64,
    pub rename_method_threshold: f64,
    pub move_method_threshold: f64,
    pub pull_up_method_threshold: f64,
    pub push_down_method_threshold: f64,
    pub extract_method_threshold: f64,
    pub inline_method_threshold: f64,
    /// Kinds to report. `None` reports every kind.
    pub refactoring_types: Option<BTreeSet<RefactoringType>>,
    pub classify_motivations: bool,
    pub workers: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            move_type_threshold: 0.4,
            rename_type_threshold: 0.4,
            move_and_rename_type_threshold: 0.5,
            extract_supertype_threshold: 0.5,
            rename_method_threshold: 0.5,
            move_method_threshold: 0.5,
            pull_up_method_threshold: 0.5,
            push_down_method_threshold: 0.5,
            extract_method_threshold: 0.5,
            inline_method_threshold: 0.5,
            refactoring_types: None,
            classify_motivations: true,
            workers: 4,
        }
    }
}

impl DetectorConfig {
    /// Parse and validate a config from JSON text.
    pub fn from_json_str(text: &str) -> RefMineResult<Self> {
        let config: DetectorConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config file.
    pub fn from_json_file(path: &Path) -> RefMineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Apply `REFMINE_MOTIVATION` / `REFMINE_WORKERS` on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        if !motivation_enabled() {
            self.classify_motivations = false;
        }
        if let Some(workers) = workers_override() {
            self.workers = workers;
        }
        self
    }

    /// Restrict reporting to the given kinds.
    pub fn only(mut self, types: impl IntoIterator<Item = RefactoringType>) -> Self {
        self.refactoring_types = Some(types.into_iter().collect());
        self
    }

    pub fn validate(&self) -> RefMineResult<()> {
        let thresholds = [
            ("move_type_threshold", self.move_type_threshold),
            ("rename_type_threshold", self.rename_type_threshold),
            ("move_and_rename_type_threshold", self.move_and_rename_type_threshold),
            ("extract_supertype_threshold", self.extract_supertype_threshold),
            ("rename_method_threshold", self.rename_method_threshold),
            ("move_method_threshold", self.move_method_threshold),
            ("pull_up_method_threshold", self.pull_up_method_threshold),
            ("push_down_method_threshold", self.push_down_method_threshold),
            ("extract_method_threshold", self.extract_method_threshold),
            ("inline_method_threshold", self.inline_method_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(RefMineError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(RefMineError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Whether refactorings of `kind` should be reported.
    pub fn reports(&self, kind: RefactoringType) -> bool {
        self.refactoring_types
            .as_ref()
            .map_or(true, |types| types.contains(&kind))
    }

    /// Short stable digest (first 16 hex chars of SHA-256) of the canonical
    /// JSON form. Cached results are keyed by it.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config = DetectorConfig::from_json_str("{}").unwrap();
        assert_eq!(config, DetectorConfig::default());
        assert_eq!(config.move_type_threshold, 0.4);
        assert_eq!(config.move_and_rename_type_threshold, 0.5);
        assert!(config.classify_motivations);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config =
            DetectorConfig::from_json_str(r#"{"rename_method_threshold": 0.8, "workers": 2}"#)
                .unwrap();
        assert_eq!(config.rename_method_threshold, 0.8);
        assert_eq!(config.workers, 2);
        assert_eq!(config.move_method_threshold, 0.5);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let err = DetectorConfig::from_json_str(r#"{"move_type_threshold": 1.5}"#).unwrap_err();
        assert!(matches!(err, RefMineError::Config(_)));
        assert!(err.to_string().contains("move_type_threshold"));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = DetectorConfig::from_json_str(r#"{"workers": 0}"#).unwrap_err();
        assert!(matches!(err, RefMineError::Config(_)));
    }

    #[test]
    fn test_type_filter() {
        let config = DetectorConfig::from_json_str(r#"{"refactoring_types": ["Rename Class"]}"#)
            .unwrap();
        assert!(config.reports(RefactoringType::RenameClass));
        assert!(!config.reports(RefactoringType::MoveClass));
        assert!(DetectorConfig::default().reports(RefactoringType::InlineMethod));
    }

    #[test]
    fn test_fingerprint_stable_and_sensitive() {
        let a = DetectorConfig::default();
        let b = DetectorConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);

        let c = DetectorConfig {
            extract_method_threshold: 0.7,
            ..DetectorConfig::default()
        };
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refmine.json");
        std::fs::write(&path, r#"{"classify_motivations": false}"#).unwrap();
        let config = DetectorConfig::from_json_file(&path).unwrap();
        assert!(!config.classify_motivations);
    }
}

//! Python bindings, built with the `python` feature.

use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::config::DetectorConfig;
use crate::diff::detect_records;
use crate::diff::matcher::RenameHints;
use crate::errors::RefMineError;
use crate::model::CodeModel;
use crate::oracle;

/// Detect refactorings between two JSON models. Returns the records as a
/// JSON array.
#[pyfunction]
#[pyo3(signature = (before_json, after_json, hints_json=None, config_json=None))]
pub fn detect_refactorings(
    before_json: &str,
    after_json: &str,
    hints_json: Option<&str>,
    config_json: Option<&str>,
) -> PyResult<String> {
    let before = CodeModel::from_json(before_json)?;
    let after = CodeModel::from_json(after_json)?;
    let hints: RenameHints = match hints_json {
        Some(text) => serde_json::from_str(text).map_err(RefMineError::from)?,
        None => RenameHints::new(),
    };
    let config = match config_json {
        Some(text) => DetectorConfig::from_json_str(text)?,
        None => DetectorConfig::default(),
    }
    .with_env_overrides();

    let records = detect_records(&before, &after, &hints, &config);
    let json = serde_json::to_string(&records).map_err(RefMineError::from)?;
    Ok(json)
}

#[pyfunction]
pub fn summary_line(tp: usize, fp: usize, fn_count: usize) -> String {
    oracle::summary_line(tp, fp, fn_count)
}

#[pymodule]
fn refmine_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(detect_refactorings, m)?)?;
    m.add_function(wrap_pyfunction!(summary_line, m)?)?;
    m.add("SCHEMA_VERSION", crate::store::schema::SCHEMA_VERSION)?;
    Ok(())
}

//! Error types for the refmine core library.

#[cfg(feature = "python")]
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;

/// Top-level error enum for the refmine core library.
///
/// Entity-level non-matches are never errors; they stay in
/// [`crate::diff::matcher::MatchResult`] as leftovers.
#[derive(Debug, thiserror::Error)]
pub enum RefMineError {
    #[error("Model build error: {0}")]
    ModelBuild(String),

    #[error("VCS error: {0}")]
    Vcs(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<RefMineError> for PyErr {
    fn from(err: RefMineError) -> PyErr {
        match &err {
            RefMineError::Vcs(_) | RefMineError::Store(_) | RefMineError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            RefMineError::ModelBuild(_) | RefMineError::Config(_) => {
                PyValueError::new_err(err.to_string())
            }
            RefMineError::Io(_) => PyIOError::new_err(err.to_string()),
            RefMineError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type RefMineResult<T> = Result<T, RefMineError>;

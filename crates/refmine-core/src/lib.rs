//! refmine core library: commit-level refactoring detection.
//!
//! Given code models of a project before and after a commit, the [`diff`]
//! pipeline matches types, methods and fields across the two versions and
//! reports the refactorings that explain the differences. [`history`] walks a
//! repository through pluggable VCS and parser ports, [`store`] keeps cursors
//! and cached results in SQLite, and [`oracle`] scores output against a
//! labelled set. With the `python` feature the crate also builds as a Python
//! extension module.

pub mod config;
pub mod diff;
pub mod errors;
pub mod history;
pub mod model;
pub mod oracle;
pub mod store;

#[cfg(feature = "python")]
mod python;

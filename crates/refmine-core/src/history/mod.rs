//! History mining: the commit-walking driver, its collaborator ports and the
//! parallel executor for pre-built model pairs.

pub mod driver;
pub mod parallel;
pub mod ports;

//! Matchers selecting source units and candidate declarations.

pub mod file;
pub mod pattern;

pub use file::FileMatcher;
pub use pattern::{Candidate, PatternMatcher, Variant};

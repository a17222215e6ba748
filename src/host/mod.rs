//! External collaborators the migration core talks to.
//!
//! The core never touches storage directly. A [`Host`] lists the units in
//! scope, parses them, and persists each successfully migrated tree.
//!
//! - [`FsHost`] works on a directory tree and can run dry.
//! - [`MemoryHost`] keeps sources in memory, for tests and embedders.

mod fs;
mod memory;

pub use fs::{FileChange, FsHost};
pub use memory::MemoryHost;

use crate::error::Result;
use crate::syntax::SyntaxTree;
use std::path::{Path, PathBuf};

/// Storage and parsing collaborator.
pub trait Host {
    /// Units in scope, in a stable order.
    fn list_candidate_files(&self) -> Result<Vec<PathBuf>>;

    /// Produces the tree of one unit.
    fn parse(&self, path: &Path) -> Result<SyntaxTree>;

    /// Persists a migrated tree. Called once per applied plan.
    fn commit_edits(&self, path: &Path, tree: &SyntaxTree) -> Result<()>;
}

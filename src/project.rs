//! The whole-program set of parsed units.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MigrationError, Result};
use crate::host::Host;
use crate::syntax::SyntaxTree;

/// Parsed units keyed by path. Iteration order is the sorted path order.
#[derive(Debug, Clone, Default)]
pub struct Project {
    units: BTreeMap<PathBuf, SyntaxTree>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every unit the host lists. Units that fail to parse are skipped.
    pub fn load(host: &dyn Host) -> Result<Self> {
        let mut project = Self::new();
        for path in host.list_candidate_files()? {
            match host.parse(&path) {
                Ok(tree) => {
                    debug!(unit = %path.display(), nodes = tree.len(), "parsed unit");
                    project.insert(tree);
                }
                Err(e) => warn!(unit = %path.display(), "skipping unit: {e}"),
            }
        }
        Ok(project)
    }

    /// Adds or replaces a unit, returning the previous tree for its path.
    pub fn insert(&mut self, tree: SyntaxTree) -> Option<SyntaxTree> {
        self.units.insert(tree.path().to_path_buf(), tree)
    }

    pub fn get(&self, path: &Path) -> Option<&SyntaxTree> {
        self.units.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &Path) -> Result<&mut SyntaxTree> {
        self.units
            .get_mut(path)
            .ok_or_else(|| MigrationError::UnknownUnit(path.to_path_buf()))
    }

    /// Looks up a unit or reports it as unknown.
    pub fn require(&self, path: &Path) -> Result<&SyntaxTree> {
        self.get(path)
            .ok_or_else(|| MigrationError::UnknownUnit(path.to_path_buf()))
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.units.keys().cloned().collect()
    }

    pub fn units(&self) -> impl Iterator<Item = &SyntaxTree> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    #[test]
    fn test_load_skips_unparseable_units_and_sorts() {
        let host = MemoryHost::new()
            .with_file("b/B.java", "class B {}")
            .with_file("a/A.java", "class A {}")
            .with_file("notes.txt", "not java");

        let project = Project::load(&host).unwrap();
        assert_eq!(
            project.paths(),
            vec![PathBuf::from("a/A.java"), PathBuf::from("b/B.java")]
        );
        assert!(project.require(Path::new("c/C.java")).is_err());
    }
}

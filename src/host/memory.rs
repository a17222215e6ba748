//! In-memory host.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::Host;
use crate::error::{MigrationError, Result};
use crate::lang::LanguageRegistry;
use crate::syntax::{SyntaxTree, parse, print_tree};

/// Sources keyed by path. Committed trees replace their source text.
pub struct MemoryHost {
    files: RefCell<BTreeMap<PathBuf, String>>,
    languages: LanguageRegistry,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            files: RefCell::new(BTreeMap::new()),
            languages: LanguageRegistry::new(),
        }
    }

    pub fn with_file(self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.files.borrow_mut().insert(path.into(), source.into());
        self
    }

    /// Current text of a unit.
    pub fn source(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.borrow().get(path.as_ref()).cloned()
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn list_candidate_files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.files.borrow().keys().cloned().collect())
    }

    fn parse(&self, path: &Path) -> Result<SyntaxTree> {
        self.languages.require(path)?;
        let source = self
            .source(path)
            .ok_or_else(|| MigrationError::UnknownUnit(path.to_path_buf()))?;
        parse(path, &source)
    }

    fn commit_edits(&self, path: &Path, tree: &SyntaxTree) -> Result<()> {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), print_tree(tree));
        Ok(())
    }
}

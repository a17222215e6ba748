//! Filesystem host.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Host;
use crate::config::MigrationConfig;
use crate::diff::{DiffSummary, colorized_diff, unified_diff};
use crate::error::Result;
use crate::lang::LanguageRegistry;
use crate::matcher::FileMatcher;
use crate::syntax::{SyntaxTree, parse, print_tree};

/// A pending or written change to one file.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: PathBuf,
    pub original: String,
    pub transformed: String,
}

impl FileChange {
    /// Returns true if the content was modified.
    pub fn is_modified(&self) -> bool {
        self.original != self.transformed
    }

    pub fn diff(&self) -> String {
        unified_diff(&self.original, &self.transformed, &self.path)
    }

    pub fn colorized_diff(&self) -> String {
        colorized_diff(&self.original, &self.transformed, &self.path)
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary::from_diff(&self.original, &self.transformed)
    }
}

/// Host over the Java sources below a root directory.
pub struct FsHost {
    root: PathBuf,
    matcher: FileMatcher,
    languages: LanguageRegistry,
    dry_run: bool,
    originals: RefCell<BTreeMap<PathBuf, String>>,
    changes: RefCell<BTreeMap<PathBuf, FileChange>>,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>, config: &MigrationConfig) -> Self {
        Self {
            root: root.into(),
            matcher: FileMatcher::from_config(config),
            languages: LanguageRegistry::new(),
            dry_run: false,
            originals: RefCell::new(BTreeMap::new()),
            changes: RefCell::new(BTreeMap::new()),
        }
    }

    /// Records changes instead of writing them.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every committed change, one per file, sorted by path.
    pub fn changes(&self) -> Vec<FileChange> {
        self.changes.borrow().values().cloned().collect()
    }

    /// Line counts over every committed change.
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for change in self.changes.borrow().values() {
            summary.merge(&change.summary());
        }
        summary
    }
}

impl Host for FsHost {
    fn list_candidate_files(&self) -> Result<Vec<PathBuf>> {
        self.matcher.collect(&self.root)
    }

    fn parse(&self, path: &Path) -> Result<SyntaxTree> {
        self.languages.require(path)?;
        let source = fs::read_to_string(path)?;
        let tree = parse(path, &source)?;
        self.originals
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_insert(source);
        Ok(tree)
    }

    fn commit_edits(&self, path: &Path, tree: &SyntaxTree) -> Result<()> {
        let transformed = print_tree(tree);
        let original = match self.originals.borrow().get(path) {
            Some(original) => original.clone(),
            None => fs::read_to_string(path)?,
        };
        if !self.dry_run {
            fs::write(path, &transformed)?;
            info!(unit = %path.display(), "wrote migrated unit");
        } else {
            debug!(unit = %path.display(), "dry run, change recorded");
        }
        self.changes.borrow_mut().insert(
            path.to_path_buf(),
            FileChange {
                path: path.to_path_buf(),
                original,
                transformed,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dry_run_records_without_writing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.java");
        fs::write(&path, "class A {  }\n").unwrap();
        let host = FsHost::new(dir.path(), &MigrationConfig::default()).dry_run();

        let files = host.list_candidate_files().unwrap();
        assert_eq!(files, vec![path.clone()]);
        let tree = host.parse(&path).unwrap();
        host.commit_edits(&path, &tree).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "class A {  }\n");
        let changes = host.changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].transformed, print_tree(&tree));
    }

    #[test]
    fn test_commit_writes_printed_tree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("A.java");
        fs::write(&path, "class A {\n  void f() {}\n}\n").unwrap();
        let host = FsHost::new(dir.path(), &MigrationConfig::default());

        let tree = host.parse(&path).unwrap();
        host.commit_edits(&path, &tree).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "class A {\n    void f() {}\n}\n"
        );
        assert_eq!(host.summary().files_changed, 1);
    }
}

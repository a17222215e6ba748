//! Source file enumeration for a migration run.

use crate::config::MigrationConfig;
use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Predicates selecting the source units a run considers.
#[derive(Debug, Default, Clone)]
pub struct FileMatcher {
    extensions: Vec<String>,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
}

impl FileMatcher {
    /// Creates a matcher that accepts every file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the matcher a configuration asks for: its extensions and
    /// exclusions. Units that never mention the marker are still listed;
    /// their references count for safety.
    pub fn from_config(config: &MigrationConfig) -> Self {
        let mut matcher = Self::new().extensions(config.extensions.iter().cloned());
        for pattern in &config.exclude_patterns {
            matcher = matcher.exclude(pattern.clone());
        }
        matcher
    }

    /// Matches files with the given extension (without dot).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.extensions.push(ext.into());
        self
    }

    /// Matches files with any of the given extensions.
    pub fn extensions(mut self, exts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions.extend(exts.into_iter().map(Into::into));
        self
    }

    /// Includes only files matching the glob pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_globs.push(pattern.into());
        self
    }

    /// Excludes files matching the glob pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_globs.push(pattern.into());
        self
    }

    /// Collects matching files under `root`, sorted by path.
    pub fn collect(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let include_set = build_glob_set(&self.include_globs)?;
        let exclude_set = build_glob_set(&self.exclude_globs)?;

        let mut matched = Vec::new();
        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches_extension(path) {
                continue;
            }

            let rel_path = path.strip_prefix(root).unwrap_or(path);
            if !self.include_globs.is_empty() && !include_set.is_match(rel_path) {
                continue;
            }
            if exclude_set.is_match(rel_path) {
                continue;
            }

            matched.push(path.to_path_buf());
        }

        matched.sort();
        Ok(matched)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

//! The migration driver.
//!
//! [`Migrator`] walks every unit the host lists and runs each discovered
//! candidate through discovery, safety analysis, planning and editing, one
//! candidate at a time. Each candidate either migrates completely and is
//! committed, or leaves its unit exactly as it was.
//!
//! # Example
//!
//! ```rust,no_run
//! use rxify::prelude::*;
//!
//! let config = MigrationConfig::default();
//! let host = FsHost::new("app/src", &config).dry_run();
//! let resolver = NameResolver::new();
//!
//! let report = Migrator::new(&config, &host, &resolver).run()?;
//! println!("{}", report.summary);
//! for change in host.changes() {
//!     println!("{}", change.diff());
//! }
//! # Ok::<(), rxify::error::MigrationError>(())
//! ```

mod report;

pub use report::{CandidateReport, MigrationReport, MigrationSummary, Outcome, ScanEntry};

use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::analyzer::{SafetyAnalyzer, Verdict};
use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};
use crate::host::Host;
use crate::matcher::{Candidate, PatternMatcher, Variant};
use crate::project::Project;
use crate::refactor::{Editor, MigrationPlanner, PlanError, Promoter};
use crate::scope::ReferenceFinder;
use crate::syntax::NodeId;

/// Drives the whole pipeline over the units of one host.
pub struct Migrator<'a> {
    config: &'a MigrationConfig,
    host: &'a dyn Host,
    finder: &'a dyn ReferenceFinder,
    editor: Editor,
}

impl<'a> Migrator<'a> {
    pub fn new(config: &'a MigrationConfig, host: &'a dyn Host, finder: &'a dyn ReferenceFinder) -> Self {
        Self {
            config,
            host,
            finder,
            editor: Editor::new(),
        }
    }

    /// Reports every candidate with its safety verdict. Nothing is committed.
    pub fn scan(&self) -> Result<Vec<ScanEntry>> {
        let project = Project::load(self.host)?;
        let matcher = PatternMatcher::new(self.config);
        let analyzer = SafetyAnalyzer::new(self.config, self.finder);

        let mut entries = Vec::new();
        for tree in project.units() {
            for candidate in matcher.discover(tree) {
                let assessed = match candidate.variant {
                    Variant::Standalone => Err("standalone declarations are not migrated".to_string()),
                    Variant::Nested => analyzer
                        .assess(&project, &candidate)
                        .map_err(|e| e.to_string()),
                    Variant::Anonymous => {
                        let mut scratch = project.clone();
                        self.promoted(&mut scratch, &candidate)
                            .and_then(|promoted| analyzer.assess(&scratch, &promoted))
                            .map_err(|e| e.to_string())
                    }
                };
                let (verdict, note) = match assessed {
                    Ok(verdict) => (Some(verdict), None),
                    Err(note) => (None, Some(note)),
                };
                entries.push(ScanEntry {
                    unit: candidate.unit.clone(),
                    name: candidate.name.clone(),
                    variant: candidate.variant,
                    task_name: candidate.task_name.clone(),
                    verdict,
                    note,
                });
            }
        }
        Ok(entries)
    }

    /// Migrates every safe candidate and commits each migrated unit.
    pub fn run(&self) -> Result<MigrationReport> {
        let mut project = Project::load(self.host)?;
        let matcher = PatternMatcher::new(self.config);
        let mut report = MigrationReport::default();
        let mut migrated: HashSet<(PathBuf, NodeId)> = HashSet::new();

        for path in project.paths() {
            let (_, errors) = matcher.scan(project.require(&path)?);
            for error in errors {
                warn!("{error}");
                report.discovery_errors.push(error.to_string());
            }

            // Candidates go stale once their unit is edited.
            let mut attempted: HashSet<NodeId> = HashSet::new();
            loop {
                let (candidates, _) = matcher.scan(project.require(&path)?);
                let next = candidates
                    .into_iter()
                    .find(|c| !attempted.contains(&c.decl));
                let Some(candidate) = next else {
                    break;
                };
                attempted.insert(candidate.decl);

                let outcome = self.process(&mut project, &candidate, &mut migrated);
                match &outcome {
                    Outcome::Migrated { .. } => {
                        info!(unit = %path.display(), candidate = %candidate.name, "migrated")
                    }
                    Outcome::NotActionable => {
                        debug!(unit = %path.display(), candidate = %candidate.name, "not actionable")
                    }
                    Outcome::Rejected { .. } => {}
                    other => warn!(unit = %path.display(), candidate = %candidate.name, "{other}"),
                }
                report.push(CandidateReport::new(&candidate, outcome));
            }
        }

        info!("{}", report.summary);
        Ok(report)
    }

    fn process(
        &self,
        project: &mut Project,
        candidate: &Candidate,
        migrated: &mut HashSet<(PathBuf, NodeId)>,
    ) -> Outcome {
        if !candidate.is_actionable() {
            return Outcome::NotActionable;
        }
        let Some(enclosing) = candidate.enclosing else {
            return Outcome::Skipped {
                error: PlanError::MissingEnclosing,
            };
        };
        let key = (candidate.unit.clone(), enclosing);
        if migrated.contains(&key) {
            let enclosing = project
                .get(&candidate.unit)
                .and_then(|tree| tree.class(enclosing))
                .and_then(|class| class.name.clone())
                .unwrap_or_default();
            return Outcome::Skipped {
                error: PlanError::EnclosingAlreadyMigrated { enclosing },
            };
        }

        let snapshot = match project.require(&candidate.unit) {
            Ok(tree) => tree.clone(),
            Err(e) => return outcome_of(e),
        };
        let outcome = self
            .migrate(project, candidate)
            .unwrap_or_else(outcome_of);
        if matches!(outcome, Outcome::Migrated { .. }) {
            migrated.insert(key);
        } else {
            project.insert(snapshot);
        }
        outcome
    }

    fn migrate(&self, project: &mut Project, candidate: &Candidate) -> Result<Outcome> {
        let candidate = self.promoted(project, candidate)?;
        let verdict = SafetyAnalyzer::new(self.config, self.finder).assess(project, &candidate)?;
        if let Verdict::Reject(reason) = verdict {
            return Ok(Outcome::Rejected { reason });
        }

        let enclosing = candidate.enclosing.ok_or(PlanError::MissingEnclosing)?;
        let plan = MigrationPlanner::new(self.config, self.finder).plan(project, enclosing, &candidate)?;
        debug!(candidate = %candidate.name, edits = plan.len(), "planned");

        let tree = project.get_mut(&candidate.unit)?;
        self.editor.apply(tree, &plan)?;
        self.host.commit_edits(&candidate.unit, tree)?;
        Ok(Outcome::Migrated {
            notices: plan.notices,
        })
    }

    /// Promotes an anonymous candidate in place and returns it in nested form.
    fn promoted(&self, project: &mut Project, candidate: &Candidate) -> Result<Candidate> {
        if candidate.variant != Variant::Anonymous {
            return Ok(candidate.clone());
        }
        let tree = project.get_mut(&candidate.unit)?;
        let decl = Promoter::new(self.config).promote(tree, candidate)?;
        PatternMatcher::new(self.config)
            .discover(tree)
            .into_iter()
            .find(|c| c.decl == decl)
            .ok_or_else(|| MigrationError::Discovery {
                unit: candidate.unit.clone(),
                message: format!("promoted {} is no longer a candidate", candidate.name),
            })
    }
}

fn outcome_of(error: MigrationError) -> Outcome {
    match error {
        MigrationError::Plan(error) => Outcome::Skipped { error },
        MigrationError::Edit(error) => Outcome::Failed { error },
        other => Outcome::Error {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::scope::NameResolver;

    const LOADER: &str = r#"package app;

import android.os.AsyncTask;

public class Loader {
    void load(String url) {
        Download task = new Download();
        task.execute(url);
    }

    private class Download extends AsyncTask<String, Integer, String> {
        private int attempts = 0;

        @Override
        protected String doInBackground(String... urls) {
            attempts++;
            publishProgress(attempts);
            return urls[0];
        }

        @Override
        protected void onProgressUpdate(Integer... values) {
            System.out.println(values[0]);
        }

        @Override
        protected void onPostExecute(String result) {
            System.out.println(result);
        }
    }
}
"#;

    #[test]
    fn test_run_migrates_nested_candidate() {
        let config = MigrationConfig::default();
        let host = MemoryHost::new().with_file("app/Loader.java", LOADER);
        let resolver = NameResolver::new();

        let report = Migrator::new(&config, &host, &resolver).run().unwrap();
        assert_eq!(report.summary.migrated, 1, "{:?}", report.candidates);

        let migrated = host.source("app/Loader.java").unwrap();
        assert!(!migrated.contains("extends AsyncTask"));
        assert!(!migrated.contains("import android.os.AsyncTask;"));
        assert!(migrated.contains("doDownload(progressEmitter, url)"));
        assert!(migrated.contains("compositeDisposable.add(downloadDisposable);"));
    }

    #[test]
    fn test_second_run_finds_nothing() {
        let config = MigrationConfig::default();
        let host = MemoryHost::new().with_file("app/Loader.java", LOADER);
        let resolver = NameResolver::new();
        let migrator = Migrator::new(&config, &host, &resolver);

        migrator.run().unwrap();
        let once = host.source("app/Loader.java").unwrap();
        let report = migrator.run().unwrap();

        assert_eq!(report.summary.candidates, 0);
        assert_eq!(host.source("app/Loader.java").unwrap(), once);
    }

    #[test]
    fn test_scan_reports_without_committing() {
        let config = MigrationConfig::default();
        let host = MemoryHost::new().with_file("app/Loader.java", LOADER);
        let resolver = NameResolver::new();

        let entries = Migrator::new(&config, &host, &resolver).scan().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].task_name, "download");
        assert_eq!(entries[0].verdict, Some(Verdict::Accept));
        assert_eq!(host.source("app/Loader.java").unwrap(), LOADER);
    }
}

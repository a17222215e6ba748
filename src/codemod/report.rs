//! Per-candidate results of a migration run.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::analyzer::{RejectReason, Verdict};
use crate::matcher::{Candidate, Variant};
use crate::refactor::{EditError, Notice, PlanError};

/// What happened to one discovered candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Migrated and committed.
    Migrated { notices: Vec<Notice> },
    /// Standalone declaration; reported only.
    NotActionable,
    /// The safety analysis rejected it.
    Rejected { reason: RejectReason },
    /// A planning precondition failed.
    Skipped { error: PlanError },
    /// An edit failed; the unit was left as it was.
    Failed { error: EditError },
    /// Any other error, e.g. an I/O failure while committing.
    Error { message: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Migrated { notices } if notices.is_empty() => write!(f, "migrated"),
            Outcome::Migrated { notices } => {
                let notices: Vec<String> = notices.iter().map(ToString::to_string).collect();
                write!(f, "migrated ({})", notices.join("; "))
            }
            Outcome::NotActionable => write!(f, "not actionable"),
            Outcome::Rejected { reason } => write!(f, "rejected: {reason}"),
            Outcome::Skipped { error } => write!(f, "skipped: {error}"),
            Outcome::Failed { error } => write!(f, "failed: {error}"),
            Outcome::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// Report line for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub unit: PathBuf,
    pub name: String,
    pub variant: Variant,
    pub task_name: String,
    pub outcome: Outcome,
}

impl CandidateReport {
    pub fn new(candidate: &Candidate, outcome: Outcome) -> Self {
        Self {
            unit: candidate.unit.clone(),
            name: candidate.name.clone(),
            variant: candidate.variant,
            task_name: candidate.task_name.clone(),
            outcome,
        }
    }
}

/// Outcome counts of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub candidates: usize,
    pub migrated: usize,
    pub not_actionable: usize,
    pub rejected: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: usize,
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} candidate(s): {} migrated, {} rejected, {} skipped, {} failed, {} not actionable",
            self.candidates,
            self.migrated,
            self.rejected,
            self.skipped,
            self.failed + self.errors,
            self.not_actionable
        )
    }
}

/// Everything a run did.
#[derive(Debug, Default, Clone, Serialize)]
pub struct MigrationReport {
    pub candidates: Vec<CandidateReport>,
    /// Malformed declarations skipped during discovery.
    pub discovery_errors: Vec<String>,
    pub summary: MigrationSummary,
}

impl MigrationReport {
    pub fn push(&mut self, report: CandidateReport) {
        let summary = &mut self.summary;
        summary.candidates += 1;
        match report.outcome {
            Outcome::Migrated { .. } => summary.migrated += 1,
            Outcome::NotActionable => summary.not_actionable += 1,
            Outcome::Rejected { .. } => summary.rejected += 1,
            Outcome::Skipped { .. } => summary.skipped += 1,
            Outcome::Failed { .. } => summary.failed += 1,
            Outcome::Error { .. } => summary.errors += 1,
        }
        self.candidates.push(report);
    }

    /// Reports of the candidates that were migrated.
    pub fn migrated(&self) -> impl Iterator<Item = &CandidateReport> {
        self.candidates
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Migrated { .. }))
    }
}

/// One candidate as seen by a scan, without touching any unit.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    pub unit: PathBuf,
    pub name: String,
    pub variant: Variant,
    pub task_name: String,
    /// Absent for standalone declarations and failed promotions.
    pub verdict: Option<Verdict>,
    /// Why no verdict could be computed.
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: Outcome) -> CandidateReport {
        CandidateReport {
            unit: PathBuf::from("Loader.java"),
            name: "Download".to_string(),
            variant: Variant::Nested,
            task_name: "download".to_string(),
            outcome,
        }
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut run = MigrationReport::default();
        run.push(report(Outcome::Migrated { notices: vec![] }));
        run.push(report(Outcome::Rejected {
            reason: RejectReason::ConstructorWithParameters,
        }));
        run.push(report(Outcome::Skipped {
            error: PlanError::PublishWithoutProgressHook,
        }));

        assert_eq!(run.summary.candidates, 3);
        assert_eq!(run.summary.migrated, 1);
        assert_eq!(run.summary.rejected, 1);
        assert_eq!(run.summary.skipped, 1);
        assert_eq!(run.migrated().count(), 1);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(Outcome::Rejected {
            reason: RejectReason::StoredInField {
                field: "task".to_string(),
            },
        })
        .unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["reason"]["reason"], "stored_in_field");
        assert_eq!(json["reason"]["field"], "task");
    }
}

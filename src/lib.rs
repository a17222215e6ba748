//! # rxify
//!
//! Structural migration of Android `AsyncTask` subclasses to RxJava pipelines.
//!
//! This crate provides:
//! - Discovery of task declarations (nested, anonymous and standalone)
//! - A project-wide safety analysis deciding which tasks can be rewritten
//! - Planning of the rewrite as an ordered list of tree edits
//! - Transactional application of those edits, all or nothing per task
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rxify::prelude::*;
//!
//! let config = MigrationConfig::default();
//! let host = FsHost::new("./app/src/main/java", &config).dry_run();
//! let resolver = NameResolver::new();
//!
//! let report = Migrator::new(&config, &host, &resolver).run()?;
//! for change in host.changes() {
//!     println!("{}", change.diff());
//! }
//! println!("{}", report.summary);
//! # Ok::<(), rxify::error::MigrationError>(())
//! ```
//!
//! ## Checking a Single Task
//!
//! ```rust,no_run
//! use rxify::prelude::*;
//!
//! let config = MigrationConfig::default();
//! let host = MemoryHost::new().with_file("Loader.java", "class Loader {}");
//! let project = Project::load(&host)?;
//! let resolver = NameResolver::new();
//!
//! let analyzer = SafetyAnalyzer::new(&config, &resolver);
//! for tree in project.units() {
//!     for candidate in PatternMatcher::new(&config).discover(tree) {
//!         println!("{}: {:?}", candidate.name, analyzer.assess(&project, &candidate)?);
//!     }
//! }
//! # Ok::<(), rxify::error::MigrationError>(())
//! ```

pub mod analyzer;
pub mod codemod;
pub mod config;
pub mod diff;
pub mod error;
pub mod host;
pub mod lang;
pub mod matcher;
pub mod naming;
pub mod project;
pub mod refactor;
pub mod scope;
pub mod syntax;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::analyzer::{RejectReason, SafetyAnalyzer, Verdict};
    pub use crate::codemod::{
        CandidateReport, MigrationReport, MigrationSummary, Migrator, Outcome, ScanEntry,
    };
    pub use crate::config::{LifecycleHooks, MigrationConfig, ReactiveImports};
    pub use crate::diff::DiffSummary;
    pub use crate::error::{MigrationError, Result};
    pub use crate::host::{FileChange, FsHost, Host, MemoryHost};
    pub use crate::lang::{Java, Language, LanguageRegistry};
    pub use crate::matcher::{Candidate, FileMatcher, PatternMatcher, Variant};
    pub use crate::naming::NameCodec;
    pub use crate::project::Project;
    pub use crate::refactor::{
        Edit, EditError, Editor, MigrationPlan, MigrationPlanner, Notice, PlanError, Promoter,
    };
    pub use crate::scope::{NameResolver, Reference, ReferenceFinder, ReferenceKind};
    pub use crate::syntax::{NodeId, SyntaxTree, parse};
}

pub use prelude::*;

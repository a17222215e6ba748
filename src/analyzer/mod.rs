//! Safety analysis of discovered candidates.
//!
//! A candidate is migrated only when the rewrite cannot change what the
//! program does. [`SafetyAnalyzer::assess`] returns [`Verdict::Reject`] with
//! the first [`RejectReason`] found, which keeps "unsafe" apart from "not a
//! candidate" in logs and reports.
//!
//! # Example
//!
//! ```rust,no_run
//! use rxify::analyzer::SafetyAnalyzer;
//! use rxify::config::MigrationConfig;
//! use rxify::host::FsHost;
//! use rxify::matcher::PatternMatcher;
//! use rxify::project::Project;
//! use rxify::scope::NameResolver;
//!
//! let config = MigrationConfig::default();
//! let host = FsHost::new("./app/src", &config);
//! let project = Project::load(&host)?;
//! let analyzer = SafetyAnalyzer::new(&config, &NameResolver);
//!
//! for tree in project.units() {
//!     for candidate in PatternMatcher::new(&config).discover(tree) {
//!         println!("{}: {:?}", candidate.name, analyzer.assess(&project, &candidate)?);
//!     }
//! }
//! # Ok::<(), rxify::error::MigrationError>(())
//! ```

mod safety;

pub use safety::{RejectReason, SafetyAnalyzer, Verdict};

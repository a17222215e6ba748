//! Planning and applying migrations.
//!
//! ## Pipeline
//!
//! - [`Promoter`] - Turns an anonymous candidate into a named nested class
//! - [`MigrationPlanner`] - Computes the ordered [`Edit`] list for a nested candidate
//! - [`Editor`] - Applies a [`MigrationPlan`] all-or-nothing
//!
//! Generated Java comes from [`Codegen`]; imports are normalized by the last
//! edit of every plan.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rxify::config::MigrationConfig;
//! use rxify::matcher::PatternMatcher;
//! use rxify::project::Project;
//! use rxify::refactor::{Editor, MigrationPlanner};
//! use rxify::scope::NameResolver;
//! use rxify::syntax::parse;
//! use std::path::Path;
//!
//! let config = MigrationConfig::default();
//! let source = std::fs::read_to_string("Loader.java")?;
//! let mut project = Project::new();
//! project.insert(parse(Path::new("Loader.java"), &source)?);
//!
//! let tree = project.require(Path::new("Loader.java"))?;
//! let candidate = PatternMatcher::new(&config).discover(tree).remove(0);
//! let enclosing = candidate.enclosing.expect("nested candidate");
//! let plan = MigrationPlanner::new(&config, &NameResolver).plan(&project, enclosing, &candidate)?;
//!
//! let mut tree = tree.clone();
//! Editor::new().apply(&mut tree, &plan)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod codegen;
mod editor;
mod imports;
mod plan;
mod planner;
mod promote;

pub use codegen::{Codegen, Pipeline};
pub use editor::{Editor, Transaction};
pub use plan::{Edit, EditError, EditErrorKind, Fragment, MigrationPlan, Notice, PlanError};
pub use planner::MigrationPlanner;
pub use promote::Promoter;

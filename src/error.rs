//! Error types for the migration engine.

use std::path::PathBuf;
use thiserror::Error;

use crate::refactor::{EditError, PlanError};

/// The main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Tree-sitter parse error for {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Language not supported: {0}")]
    UnsupportedLanguage(String),

    #[error("Malformed declaration in {unit}: {message}")]
    Discovery { unit: PathBuf, message: String },

    #[error("Unit not loaded: {0}")]
    UnknownUnit(PathBuf),

    #[error("Planning precondition failed: {0}")]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

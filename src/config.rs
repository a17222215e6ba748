//! Serializable configuration for the migration engine.
//!
//! Every name the engine matches or generates comes from here, so the same
//! pipeline can target a differently named legacy base class or a different
//! reactive library package.
//!
//! # Example YAML
//!
//! ```yaml
//! marker_type: AsyncTask
//! required_hook: doInBackground
//! trigger_method: execute
//! forbidden_call_suffixes:
//!   - isCancelled
//!   - getStatus
//! imports:
//!   single: io.reactivex.rxjava3.core.Single
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MigrationError, Result};
use crate::lang::Java;

/// Names of the optional lifecycle hooks of the legacy pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleHooks {
    pub progress_update: String,
    pub pre_start: String,
    pub post_result: String,
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self {
            progress_update: "onProgressUpdate".to_string(),
            pre_start: "onPreExecute".to_string(),
            post_result: "onPostExecute".to_string(),
        }
    }
}

impl LifecycleHooks {
    /// All hook names in a fixed order.
    pub fn names(&self) -> [&str; 3] {
        [&self.progress_update, &self.pre_start, &self.post_result]
    }
}

/// Fully qualified names of the reactive library types the generated code uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactiveImports {
    pub single: String,
    pub completable: String,
    pub observer: String,
    pub schedulers: String,
    pub main_thread_schedulers: String,
    pub composite_disposable: String,
    pub disposable: String,
    pub subject: String,
}

impl Default for ReactiveImports {
    fn default() -> Self {
        Self {
            single: "io.reactivex.rxjava3.core.Single".to_string(),
            completable: "io.reactivex.rxjava3.core.Completable".to_string(),
            observer: "io.reactivex.rxjava3.core.Observer".to_string(),
            schedulers: "io.reactivex.rxjava3.schedulers.Schedulers".to_string(),
            main_thread_schedulers: "io.reactivex.rxjava3.android.schedulers.AndroidSchedulers"
                .to_string(),
            composite_disposable: "io.reactivex.rxjava3.disposables.CompositeDisposable"
                .to_string(),
            disposable: "io.reactivex.rxjava3.disposables.Disposable".to_string(),
            subject: "io.reactivex.rxjava3.subjects.PublishSubject".to_string(),
        }
    }
}

/// Returns the simple name of a fully qualified type name.
pub fn simple_name(fqn: &str) -> &str {
    fqn.rsplit('.').next().unwrap_or(fqn)
}

/// Static configuration injected into every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Supertype that marks a class as an instance of the legacy pattern.
    pub marker_type: String,

    /// Import of the marker type, dropped once nothing mentions it.
    pub marker_import: String,

    /// Hook every candidate must override.
    pub required_hook: String,

    /// Optional lifecycle hooks.
    pub hooks: LifecycleHooks,

    /// Method that starts the background operation.
    pub trigger_method: String,

    /// Method the work hook calls to report progress.
    pub progress_publish: String,

    /// Calls with no equivalent in the generated pipeline.
    pub forbidden_call_suffixes: Vec<String>,

    /// Supertype substring identifying hosts with a teardown lifecycle.
    pub host_lifecycle_marker: String,

    /// Teardown method of the host lifecycle.
    pub teardown_method: String,

    /// Type of the disposal aggregate field.
    pub aggregate_type: String,

    /// Name given to a newly created disposal aggregate field.
    pub aggregate_field: String,

    /// Scheduler expression the work runs on.
    pub background_scheduler: String,

    /// Scheduler expression results are delivered on.
    pub result_scheduler: String,

    /// Reactive library imports.
    pub imports: ReactiveImports,

    /// File extensions to scan.
    pub extensions: Vec<String>,

    /// Glob patterns to exclude from scanning.
    pub exclude_patterns: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            marker_type: "AsyncTask".to_string(),
            marker_import: "android.os.AsyncTask".to_string(),
            required_hook: "doInBackground".to_string(),
            hooks: LifecycleHooks::default(),
            trigger_method: "execute".to_string(),
            progress_publish: "publishProgress".to_string(),
            forbidden_call_suffixes: vec!["isCancelled".to_string(), "getStatus".to_string()],
            host_lifecycle_marker: "Activity".to_string(),
            teardown_method: "onDestroy".to_string(),
            aggregate_type: "CompositeDisposable".to_string(),
            aggregate_field: "compositeDisposable".to_string(),
            background_scheduler: "Schedulers.io()".to_string(),
            result_scheduler: "AndroidSchedulers.mainThread()".to_string(),
            imports: ReactiveImports::default(),
            extensions: vec!["java".to_string()],
            exclude_patterns: vec![
                "**/build/**".to_string(),
                "**/.git/**".to_string(),
                "**/.gradle/**".to_string(),
            ],
        }
    }
}

impl MigrationConfig {
    /// Checks that every configured name is usable.
    pub fn validate(&self) -> Result<()> {
        let identifiers = [
            ("marker_type", &self.marker_type),
            ("required_hook", &self.required_hook),
            ("trigger_method", &self.trigger_method),
            ("progress_publish", &self.progress_publish),
            ("teardown_method", &self.teardown_method),
            ("aggregate_type", &self.aggregate_type),
            ("aggregate_field", &self.aggregate_field),
        ];
        let identifier = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$")?;
        for (field, value) in identifiers {
            if value.trim().is_empty() {
                return Err(MigrationError::InvalidConfig(format!(
                    "{field} must not be empty"
                )));
            }
            if !identifier.is_match(value) || Java::is_reserved(value) {
                return Err(MigrationError::InvalidConfig(format!(
                    "{field} '{value}' is not a Java identifier"
                )));
            }
        }

        for hook in self.hooks.names() {
            if hook.chars().count() <= 2 {
                return Err(MigrationError::InvalidConfig(format!(
                    "hook name '{hook}' is too short to carry a two-letter verb prefix"
                )));
            }
        }

        if self.forbidden_call_suffixes.iter().any(|s| s.is_empty()) {
            return Err(MigrationError::InvalidConfig(
                "forbidden call suffixes must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns true when `name` is one of the forbidden calls.
    pub fn is_forbidden_call(&self, name: &str) -> bool {
        self.forbidden_call_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
    }

    /// Load config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MigrationError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file: {}", e),
            ))
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            MigrationError::InvalidConfig(format!("Failed to parse YAML config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            MigrationError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file: {}", e),
            ))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            MigrationError::InvalidConfig(format!("Failed to parse JSON config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load config choosing the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(path),
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            other => Err(MigrationError::InvalidConfig(format!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Serialize the config as YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize the config as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save config to a YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_yaml_string()?)?;
        Ok(())
    }

    /// Save config to a JSON file.
    pub fn to_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        MigrationConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_yaml_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rxify.yaml");
        std::fs::write(&path, "marker_type: LegacyTask\ntrigger_method: start\n").unwrap();

        let config = MigrationConfig::load(&path).unwrap();
        assert_eq!(config.marker_type, "LegacyTask");
        assert_eq!(config.trigger_method, "start");
        assert_eq!(config.required_hook, "doInBackground");
        assert_eq!(config.hooks.post_result, "onPostExecute");
    }

    #[test]
    fn test_json_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rxify.json");
        let mut config = MigrationConfig::default();
        config.teardown_method = "onDestroyView".to_string();
        config.to_json(&path).unwrap();

        let loaded = MigrationConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_short_hook_name() {
        let mut config = MigrationConfig::default();
        config.hooks.pre_start = "on".to_string();
        assert!(matches!(
            config.validate(),
            Err(MigrationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_non_identifier_names() {
        let config = MigrationConfig {
            aggregate_field: "composite disposable".to_string(),
            ..MigrationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MigrationError::InvalidConfig(_))
        ));

        let config = MigrationConfig {
            trigger_method: "new".to_string(),
            ..MigrationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forbidden_call_matching_uses_suffix() {
        let config = MigrationConfig::default();
        assert!(config.is_forbidden_call("isCancelled"));
        assert!(config.is_forbidden_call("getStatus"));
        assert!(!config.is_forbidden_call("cancel"));
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(simple_name("io.reactivex.rxjava3.core.Single"), "Single");
        assert_eq!(simple_name("Single"), "Single");
    }
}

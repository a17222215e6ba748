//! Derivation of task names and migrated member names.

use crate::config::MigrationConfig;

/// Name of the progress emitter parameter and local.
pub const PROGRESS_EMITTER: &str = "progressEmitter";

/// Uppercases the first character.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first character.
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns `base`, or `base` with the smallest numeric suffix from 2 up that
/// `taken` does not report.
pub fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Deterministic naming rules for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct NameCodec<'c> {
    config: &'c MigrationConfig,
}

impl<'c> NameCodec<'c> {
    pub fn new(config: &'c MigrationConfig) -> Self {
        Self { config }
    }

    /// Task name for a declaration, preferring the name of a holding variable.
    pub fn task_name(&self, decl_name: &str, holding_var: Option<&str>) -> String {
        match holding_var {
            Some(var) if !var.is_empty() => var.to_string(),
            _ => decapitalize(decl_name),
        }
    }

    /// Name of the migrated work method.
    pub fn work_method(&self, task: &str) -> String {
        format!("do{}", capitalize(task))
    }

    /// Name a candidate method receives once moved into the enclosing class.
    pub fn migrated_method(&self, task: &str, original: &str) -> String {
        if original == self.config.required_hook {
            return self.work_method(task);
        }
        if self.config.hooks.names().contains(&original) {
            let suffix: String = original.chars().skip(2).collect();
            return format!("{task}{suffix}");
        }
        format!("rx{}", capitalize(original))
    }

    /// Name of the local that holds a generated subscription handle.
    pub fn disposable_local(&self, task: &str) -> String {
        format!("{task}Disposable")
    }

    /// Base name for a class promoted from an anonymous body.
    pub fn promoted_class(&self, holding_var: Option<&str>, method: Option<&str>) -> String {
        match (holding_var, method) {
            (Some(var), _) if !var.is_empty() => capitalize(var),
            (_, Some(method)) if !method.is_empty() => format!("{}Task", capitalize(method)),
            _ => format!("Rx{}", self.config.marker_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_name_prefers_holding_variable() {
        let config = MigrationConfig::default();
        let codec = NameCodec::new(&config);
        assert_eq!(codec.task_name("Download", None), "download");
        assert_eq!(codec.task_name("Download", Some("task")), "task");
    }

    #[test]
    fn test_migrated_method_names() {
        let config = MigrationConfig::default();
        let codec = NameCodec::new(&config);
        assert_eq!(codec.migrated_method("download", "doInBackground"), "doDownload");
        assert_eq!(
            codec.migrated_method("download", "onProgressUpdate"),
            "downloadProgressUpdate"
        );
        assert_eq!(codec.migrated_method("download", "onPreExecute"), "downloadPreExecute");
        assert_eq!(codec.migrated_method("download", "onPostExecute"), "downloadPostExecute");
        assert_eq!(codec.migrated_method("download", "parse"), "rxParse");
        assert_eq!(codec.migrated_method("download", "doinbackground"), "rxDoinbackground");
    }

    #[test]
    fn test_promoted_class_names() {
        let config = MigrationConfig::default();
        let codec = NameCodec::new(&config);
        assert_eq!(codec.promoted_class(Some("fetch"), Some("start")), "Fetch");
        assert_eq!(codec.promoted_class(None, Some("start")), "StartTask");
        assert_eq!(codec.promoted_class(None, None), "RxAsyncTask");
    }

    #[test]
    fn test_unique_name_appends_suffix() {
        let taken = ["progressEmitter", "progressEmitter2"];
        assert_eq!(
            unique_name("progressEmitter", |n| taken.contains(&n)),
            "progressEmitter3"
        );
        assert_eq!(unique_name("fresh", |n| taken.contains(&n)), "fresh");
    }
}

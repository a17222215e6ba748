//! Discovery of legacy async task declarations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::config::MigrationConfig;
use crate::error::MigrationError;
use crate::naming::NameCodec;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

/// How a candidate declaration is placed in its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Top-level or local declaration; reported but never migrated.
    Standalone,
    /// Member class of a named enclosing class.
    Nested,
    /// Body of an inline `new Marker<..>() { .. }` instantiation.
    Anonymous,
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Variant::Standalone => "standalone",
            Variant::Nested => "nested",
            Variant::Anonymous => "anonymous",
        };
        f.write_str(name)
    }
}

/// A declaration recognized as an instance of the legacy pattern.
///
/// Ids refer to the tree the candidate was discovered in and are only valid
/// until that tree is edited.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub unit: PathBuf,
    pub decl: NodeId,
    /// Class name, or the instantiated type for anonymous bodies.
    pub name: String,
    pub variant: Variant,
    /// Nearest named class around the declaration.
    pub enclosing: Option<NodeId>,
    /// The `new` expression owning an anonymous body.
    pub instantiation: Option<NodeId>,
    /// Local variable the instance is stored in, if any.
    pub holding_var: Option<String>,
    pub task_name: String,
    pub has_progress_hook: bool,
    pub has_pre_start_hook: bool,
    pub has_post_result_hook: bool,
    pub required_hook: NodeId,
    pub params_type: String,
    pub progress_type: String,
    pub result_type: String,
}

impl Candidate {
    /// Returns true when the planner accepts this shape, directly or after promotion.
    pub fn is_actionable(&self) -> bool {
        self.variant != Variant::Standalone
    }

    /// Returns true when the result type carries no value.
    pub fn returns_void(&self) -> bool {
        self.result_type == "Void"
    }
}

/// Finds candidates in one syntax tree.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'c> {
    config: &'c MigrationConfig,
}

impl<'c> PatternMatcher<'c> {
    pub fn new(config: &'c MigrationConfig) -> Self {
        Self { config }
    }

    /// Returns the candidates of a tree, logging and skipping malformed ones.
    pub fn discover(&self, tree: &SyntaxTree) -> Vec<Candidate> {
        let (candidates, errors) = self.scan(tree);
        for error in errors {
            warn!("{error}");
        }
        candidates
    }

    /// Returns the candidates of a tree along with discovery errors.
    pub fn scan(&self, tree: &SyntaxTree) -> (Vec<Candidate>, Vec<MigrationError>) {
        let mut candidates = Vec::new();
        let mut errors = Vec::new();

        for class_id in tree.classes() {
            let Some(class) = tree.class(class_id) else {
                continue;
            };
            if !self.declares_marker(tree, class_id) {
                continue;
            }
            if class.malformed {
                errors.push(MigrationError::Discovery {
                    unit: tree.path().to_path_buf(),
                    message: format!(
                        "declaration of {} could not be parsed cleanly",
                        class.name.as_deref().unwrap_or(&self.config.marker_type)
                    ),
                });
                continue;
            }
            if let Some(candidate) = self.candidate(tree, class_id) {
                debug!(
                    unit = %tree.path().display(),
                    name = %candidate.name,
                    variant = %candidate.variant,
                    task = %candidate.task_name,
                    "found candidate"
                );
                candidates.push(candidate);
            }
        }

        (candidates, errors)
    }

    fn declares_marker(&self, tree: &SyntaxTree, class_id: NodeId) -> bool {
        let Some(class) = tree.class(class_id) else {
            return false;
        };
        if class.is_anonymous() {
            return tree
                .parent(class_id)
                .and_then(|p| tree.new_expr(p))
                .is_some_and(|new| new.ty.is(&self.config.marker_type));
        }
        class
            .supertype
            .as_ref()
            .is_some_and(|sup| sup.is(&self.config.marker_type))
    }

    fn candidate(&self, tree: &SyntaxTree, class_id: NodeId) -> Option<Candidate> {
        let class = tree.class(class_id)?;
        let methods = tree.methods_of(class_id);
        let has_method = |name: &str| {
            methods.iter().any(|m| {
                tree.method(*m)
                    .is_some_and(|d| !d.is_constructor() && d.name == name)
            })
        };

        let required_hook = methods.iter().copied().find(|m| {
            tree.method(*m).is_some_and(|d| {
                !d.is_constructor() && d.name.eq_ignore_ascii_case(&self.config.required_hook)
            })
        })?;

        let parent = tree.parent(class_id)?;
        let (variant, enclosing, instantiation) = match tree.kind(parent)? {
            NodeKind::Class(outer) if !outer.is_anonymous() => {
                (Variant::Nested, Some(parent), None)
            }
            NodeKind::New(_) => (
                Variant::Anonymous,
                tree.enclosing_named_class(parent),
                Some(parent),
            ),
            _ => (Variant::Standalone, tree.enclosing_named_class(class_id), None),
        };

        let name = match &class.name {
            Some(name) => name.clone(),
            None => class
                .supertype
                .as_ref()
                .map(|s| s.simple_name().to_string())
                .unwrap_or_else(|| self.config.marker_type.clone()),
        };
        let holding_var = match instantiation {
            Some(new) => holding_variable(tree, new),
            None => class
                .name
                .as_deref()
                .and_then(|n| first_holding_variable(tree, n)),
        };

        let args = class.supertype.as_ref().map(|s| s.args()).unwrap_or_default();
        let arg = |i: usize| args.get(i).cloned().unwrap_or_else(|| "Object".to_string());

        let codec = NameCodec::new(self.config);
        let task_name = match variant {
            Variant::Anonymous => {
                let method = instantiation
                    .and_then(|new| tree.enclosing_method(new))
                    .and_then(|m| tree.method(m))
                    .map(|m| m.name.as_str());
                let base = codec.promoted_class(holding_var.as_deref(), method);
                codec.task_name(&base, holding_var.as_deref())
            }
            _ => codec.task_name(&name, None),
        };

        Some(Candidate {
            unit: tree.path().to_path_buf(),
            decl: class_id,
            name,
            variant,
            enclosing,
            instantiation,
            holding_var,
            task_name,
            has_progress_hook: has_method(&self.config.hooks.progress_update),
            has_pre_start_hook: has_method(&self.config.hooks.pre_start),
            has_post_result_hook: has_method(&self.config.hooks.post_result),
            required_hook,
            params_type: arg(0),
            progress_type: arg(1),
            result_type: arg(2),
        })
    }
}

/// Name of the local variable a `new` expression initializes.
pub fn holding_variable(tree: &SyntaxTree, new: NodeId) -> Option<String> {
    let parent = tree.parent(new)?;
    tree.var_decl(parent)
        .filter(|v| v.init == Some(new))
        .map(|v| v.name.clone())
}

fn first_holding_variable(tree: &SyntaxTree, class_name: &str) -> Option<String> {
    tree.preorder().into_iter().find_map(|id| {
        tree.new_expr(id)
            .filter(|n| n.body.is_none() && n.ty.is(class_name))
            .and_then(|_| holding_variable(tree, id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use std::path::Path;

    fn discover(source: &str) -> Vec<Candidate> {
        let config = MigrationConfig::default();
        let tree = parse(Path::new("Loader.java"), source).unwrap();
        PatternMatcher::new(&config).discover(&tree)
    }

    #[test]
    fn test_finds_nested_candidate_with_hooks() {
        let candidates = discover(
            r#"
class Loader {
    void start(String url) {
        Download task = new Download();
        task.execute(url);
    }

    class Download extends AsyncTask<String, Integer, Long> {
        protected Long doInBackground(String... urls) { return 1L; }
        protected void onProgressUpdate(Integer... values) {}
    }
}
"#,
        );
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.name, "Download");
        assert_eq!(c.variant, Variant::Nested);
        assert_eq!(c.holding_var.as_deref(), Some("task"));
        assert_eq!(c.task_name, "download");
        assert!(c.has_progress_hook);
        assert!(!c.has_pre_start_hook);
        assert_eq!(
            (c.params_type.as_str(), c.progress_type.as_str(), c.result_type.as_str()),
            ("String", "Integer", "Long")
        );
        assert!(c.is_actionable());
    }

    #[test]
    fn test_ignores_classes_without_marker_supertype() {
        let candidates = discover(
            "class A { class B extends Thread { void doInBackground() {} } }",
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_ignores_marker_subclass_without_required_hook() {
        let candidates = discover(
            "class A { class B extends AsyncTask<Void, Void, Void> { void onPreExecute() {} } }",
        );
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_required_hook_matches_case_insensitively() {
        let candidates = discover(
            "class A { class B extends AsyncTask<Void, Void, Void> { Void DoInBackground(Void... v) { return null; } } }",
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].task_name, "b");
    }

    #[test]
    fn test_top_level_candidate_is_standalone() {
        let candidates = discover(
            "class Fetch extends AsyncTask<Void, Void, Void> { protected Void doInBackground(Void... v) { return null; } }",
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].variant, Variant::Standalone);
        assert!(!candidates[0].is_actionable());
    }

    #[test]
    fn test_anonymous_candidate() {
        let candidates = discover(
            r#"
class Loader {
    void start() {
        new AsyncTask<Void, Void, String>() {
            protected String doInBackground(Void... v) { return "x"; }
        }.execute();
    }
}
"#,
        );
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.variant, Variant::Anonymous);
        assert!(c.instantiation.is_some());
        assert!(c.enclosing.is_some());
        assert_eq!(c.result_type, "String");
        assert_eq!(c.task_name, "startTask");
    }

    #[test]
    fn test_raw_supertype_defaults_to_object() {
        let candidates = discover(
            "class A { class B extends AsyncTask { Object doInBackground(Object... o) { return null; } } }",
        );
        assert_eq!(candidates[0].result_type, "Object");
        assert!(!candidates[0].returns_void());
    }

    #[test]
    fn test_malformed_candidate_is_reported() {
        let config = MigrationConfig::default();
        let tree = parse(
            Path::new("Broken.java"),
            "class A { class B extends AsyncTask<Void, Void, Void> { Void doInBackground(Void... v) { int x = ; return null; } } }",
        )
        .unwrap();
        let (candidates, errors) = PatternMatcher::new(&config).scan(&tree);
        assert!(candidates.is_empty());
        assert!(matches!(errors.as_slice(), [MigrationError::Discovery { .. }]));
    }
}

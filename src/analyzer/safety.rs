//! Accept/reject decision for a discovered candidate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::info;

use crate::config::MigrationConfig;
use crate::error::Result;
use crate::matcher::Candidate;
use crate::project::Project;
use crate::scope::{DeclRef, Reference, ReferenceFinder, ReferenceKind, SearchScope};
use crate::syntax::{NodeId, NodeKind, Piece, SyntaxTree};

/// Why a candidate must not be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    ConstructorWithParameters,
    ConstructorWithBody,
    UnsupportedMember { kind: String },
    CrossUnitReference { unit: PathBuf },
    StoredInField { field: String },
    Subclassed { by: String },
    ForbiddenCall { call: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ConstructorWithParameters => {
                write!(f, "declares a constructor with parameters")
            }
            RejectReason::ConstructorWithBody => {
                write!(f, "declares a constructor with a non-empty body")
            }
            RejectReason::UnsupportedMember { kind } => {
                write!(f, "declares an unsupported member ({kind})")
            }
            RejectReason::CrossUnitReference { unit } => {
                write!(f, "is referenced from {}", unit.display())
            }
            RejectReason::StoredInField { field } => write!(f, "is stored in field '{field}'"),
            RejectReason::Subclassed { by } => write!(f, "is extended by {by}"),
            RejectReason::ForbiddenCall { call } => write!(f, "is used with '{call}'"),
        }
    }
}

/// Outcome of the safety analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Decides whether a candidate can be migrated without changing behavior.
///
/// The analysis reads the project and never mutates it. Checks run in a
/// fixed order and the first disqualifier ends the scan.
pub struct SafetyAnalyzer<'a> {
    config: &'a MigrationConfig,
    finder: &'a dyn ReferenceFinder,
}

impl<'a> SafetyAnalyzer<'a> {
    pub fn new(config: &'a MigrationConfig, finder: &'a dyn ReferenceFinder) -> Self {
        Self { config, finder }
    }

    /// Returns true when the candidate is accepted.
    pub fn is_safe(&self, project: &Project, candidate: &Candidate) -> Result<bool> {
        Ok(self.assess(project, candidate)?.is_accept())
    }

    /// Runs every check and returns the verdict.
    pub fn assess(&self, project: &Project, candidate: &Candidate) -> Result<Verdict> {
        let tree = project.require(&candidate.unit)?;
        let verdict = match self.first_disqualifier(project, tree, candidate)? {
            Some(reason) => Verdict::Reject(reason),
            None => Verdict::Accept,
        };
        match &verdict {
            Verdict::Accept => info!(candidate = %candidate.name, "accept"),
            Verdict::Reject(reason) => info!(candidate = %candidate.name, "reject: {reason}"),
        }
        Ok(verdict)
    }

    fn first_disqualifier(
        &self,
        project: &Project,
        tree: &SyntaxTree,
        candidate: &Candidate,
    ) -> Result<Option<RejectReason>> {
        if let Some(reason) = self.check_members(tree, candidate.decl) {
            return Ok(Some(reason));
        }

        let target = DeclRef::new(&candidate.unit, candidate.decl);
        let references = self
            .finder
            .find_references(project, &target, &SearchScope::Project)?;
        for reference in &references {
            if let Some(reason) = self.check_reference(project, tree, reference)? {
                return Ok(Some(reason));
            }
        }

        Ok(self.check_own_calls(tree, candidate.decl))
    }

    fn check_members(&self, tree: &SyntaxTree, decl: NodeId) -> Option<RejectReason> {
        for member in tree.members(decl) {
            match tree.kind(*member)? {
                NodeKind::Method(method) if method.is_constructor() => {
                    if !method.params.is_empty() {
                        return Some(RejectReason::ConstructorWithParameters);
                    }
                    let has_body = method
                        .body
                        .and_then(|b| tree.block(b))
                        .is_some_and(|b| {
                            b.statements.iter().any(|s| !is_bare_super_call(tree, *s))
                        });
                    if has_body {
                        return Some(RejectReason::ConstructorWithBody);
                    }
                }
                NodeKind::Method(_) | NodeKind::Field(_) => {}
                NodeKind::Opaque(opaque) if is_comment(opaque.pieces.as_slice()) => {}
                other => {
                    return Some(RejectReason::UnsupportedMember {
                        kind: other.label().to_string(),
                    });
                }
            }
        }
        None
    }

    fn check_reference(
        &self,
        project: &Project,
        tree: &SyntaxTree,
        reference: &Reference,
    ) -> Result<Option<RejectReason>> {
        if reference.is_cross_unit() {
            return Ok(Some(RejectReason::CrossUnitReference {
                unit: reference.unit.clone(),
            }));
        }

        let element = reference.element;
        let field = std::iter::once(element)
            .chain(tree.ancestors(element))
            .find_map(|id| tree.field(id));
        if let Some(field) = field {
            return Ok(Some(RejectReason::StoredInField {
                field: field.name.clone(),
            }));
        }

        if reference.kind == ReferenceKind::Inheritance {
            let by = tree
                .class(element)
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| "an anonymous class".to_string());
            return Ok(Some(RejectReason::Subclassed { by }));
        }

        if let Some(call) = self.forbidden_enclosing_call(tree, element) {
            return Ok(Some(RejectReason::ForbiddenCall { call }));
        }

        // Calls made through the variable holding the instance.
        let holder = tree
            .parent(element)
            .filter(|p| tree.var_decl(*p).is_some_and(|v| v.init == Some(element)));
        if let Some(holder) = holder {
            let target = DeclRef::new(tree.path(), holder);
            let uses = self.finder.find_references(
                project,
                &target,
                &SearchScope::Unit(tree.path().to_path_buf()),
            )?;
            for use_site in uses {
                if let Some(call) = self.forbidden_enclosing_call(tree, use_site.element) {
                    return Ok(Some(RejectReason::ForbiddenCall { call }));
                }
            }
        }

        Ok(None)
    }

    /// Name of the nearest call around `element` when it is forbidden.
    fn forbidden_enclosing_call(&self, tree: &SyntaxTree, element: NodeId) -> Option<String> {
        tree.ancestors(element)
            .find_map(|id| tree.call(id))
            .filter(|call| self.config.is_forbidden_call(&call.name))
            .map(|call| call.name.clone())
    }

    /// Forbidden calls the candidate makes on itself, e.g. `if (isCancelled())`.
    fn check_own_calls(&self, tree: &SyntaxTree, decl: NodeId) -> Option<RejectReason> {
        tree.descendants(decl)
            .into_iter()
            .filter_map(|id| tree.call(id))
            .find(|call| {
                let on_self = match call.receiver {
                    None => true,
                    Some(receiver) => is_this(tree, receiver),
                };
                on_self && self.config.is_forbidden_call(&call.name)
            })
            .map(|call| RejectReason::ForbiddenCall {
                call: call.name.clone(),
            })
    }
}

fn is_comment(pieces: &[Piece]) -> bool {
    match pieces {
        [Piece::Text(text)] => {
            let text = text.trim_start();
            text.starts_with("//") || text.starts_with("/*")
        }
        _ => false,
    }
}

fn is_this(tree: &SyntaxTree, id: NodeId) -> bool {
    matches!(tree.opaque(id).map(|o| o.pieces.as_slice()), Some([Piece::Text(t)]) if t == "this")
}

fn is_bare_super_call(tree: &SyntaxTree, statement: NodeId) -> bool {
    crate::syntax::print_node(tree, statement).replace(' ', "") == "super();"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::PatternMatcher;
    use crate::scope::NameResolver;
    use crate::syntax::parse;
    use std::path::Path;

    fn verdict(units: &[(&str, &str)]) -> Verdict {
        let config = MigrationConfig::default();
        let mut project = Project::new();
        for (path, source) in units {
            project.insert(parse(Path::new(path), source).unwrap());
        }
        let tree = project.get(Path::new(units[0].0)).unwrap();
        let candidate = PatternMatcher::new(&config)
            .discover(tree)
            .into_iter()
            .next()
            .unwrap();
        SafetyAnalyzer::new(&config, &NameResolver)
            .assess(&project, &candidate)
            .unwrap()
    }

    fn loader(task_body: &str, start_body: &str) -> String {
        format!(
            "package app;\nclass Loader {{\n    void start(String url) {{\n{start_body}\n    }}\n    class Download extends AsyncTask<String, Integer, String> {{\n        protected String doInBackground(String... urls) {{ return urls[0]; }}\n{task_body}\n    }}\n}}\n"
        )
    }

    #[test]
    fn test_accepts_plain_nested_task() {
        let source = loader("", "Download task = new Download();\ntask.execute(url);");
        assert_eq!(verdict(&[("Loader.java", &source)]), Verdict::Accept);
    }

    #[test]
    fn test_rejects_constructor_with_parameter() {
        let source = loader(
            "Download(int retries) {}",
            "new Download(3).execute(url);",
        );
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::ConstructorWithParameters)
        );
    }

    #[test]
    fn test_allows_empty_and_super_only_constructors() {
        let source = loader("Download() { super(); }", "new Download().execute(url);");
        assert_eq!(verdict(&[("Loader.java", &source)]), Verdict::Accept);
    }

    #[test]
    fn test_rejects_constructor_with_body() {
        let source = loader("Download() { count = 1; }\nint count;", "new Download().execute(url);");
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::ConstructorWithBody)
        );
    }

    #[test]
    fn test_rejects_cross_unit_reference() {
        let source = loader("", "new Download().execute(url);");
        let other = "package app;\nclass Other { void f() { new Loader().new Download(); Loader.Download d = null; } }\n";
        assert_eq!(
            verdict(&[("Loader.java", &source), ("Other.java", other)]),
            Verdict::Reject(RejectReason::CrossUnitReference {
                unit: PathBuf::from("Other.java")
            })
        );
    }

    #[test]
    fn test_rejects_fully_qualified_reference_from_other_package() {
        let source = loader("", "new Download().execute(url);")
            .replace("package app;", "package com.example;")
            .replace("    class Download", "    public static class Download");
        let other = "package org.other;\nclass Far {\n    void f() {\n        com.example.Loader.Download d = null;\n    }\n}\n";
        assert_eq!(
            verdict(&[("com/example/Loader.java", &source), ("org/other/Far.java", other)]),
            Verdict::Reject(RejectReason::CrossUnitReference {
                unit: PathBuf::from("org/other/Far.java")
            })
        );
    }

    #[test]
    fn test_unrelated_package_without_qualified_name_is_ignored() {
        let source = loader("", "new Download().execute(url);").replace("package app;", "package com.example;");
        let other = "package org.other;\nclass Far {\n    void f() {\n        Download d = null;\n    }\n    class Download {}\n}\n";
        assert_eq!(
            verdict(&[("com/example/Loader.java", &source), ("org/other/Far.java", other)]),
            Verdict::Accept
        );
    }

    #[test]
    fn test_rejects_instance_stored_in_field() {
        let source = loader("", "new Download().execute(url);")
            .replace("class Loader {", "class Loader {\n    private Download pending;");
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::StoredInField {
                field: "pending".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_forbidden_call_on_holding_variable() {
        let source = loader(
            "",
            "Download task = new Download();\ntask.execute(url);\nif (task.isCancelled()) { return; }",
        );
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::ForbiddenCall {
                call: "isCancelled".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_forbidden_call_inside_task() {
        let source = loader(
            "protected void onPostExecute(String s) { if (isCancelled()) return; }",
            "new Download().execute(url);",
        );
        assert!(matches!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::ForbiddenCall { .. })
        ));
    }

    #[test]
    fn test_rejects_nested_type_member() {
        let source = loader("class Inner {}", "new Download().execute(url);");
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::UnsupportedMember {
                kind: "class".to_string()
            })
        );
    }

    #[test]
    fn test_rejects_subclassed_task() {
        let source = loader("", "new Download().execute(url);")
            .replace("class Loader {", "class Loader {\n    class Retry extends Download {}");
        assert_eq!(
            verdict(&[("Loader.java", &source)]),
            Verdict::Reject(RejectReason::Subclassed {
                by: "Retry".to_string()
            })
        );
    }

    #[test]
    fn test_assessment_is_repeatable() {
        let config = MigrationConfig::default();
        let source = loader("", "new Download().execute(url);");
        let mut project = Project::new();
        project.insert(parse(Path::new("Loader.java"), &source).unwrap());
        let tree = project.get(Path::new("Loader.java")).unwrap();
        let candidate = PatternMatcher::new(&config).discover(tree).remove(0);
        let analyzer = SafetyAnalyzer::new(&config, &NameResolver);

        let first = analyzer.assess(&project, &candidate).unwrap();
        let second = analyzer.assess(&project, &candidate).unwrap();

        assert_eq!(first, Verdict::Accept);
        assert_eq!(first, second);
        assert!(analyzer.is_safe(&project, &candidate).unwrap());
    }
}

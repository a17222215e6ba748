//! Promotion of anonymous candidates to named nested classes.
//!
//! `new AsyncTask<A, B, C>() { ... }` inside a method of `Loader` becomes a
//! private member class of `Loader` declared right after that method, and the
//! expression becomes `new Name()`. The class body node keeps its id, so a
//! candidate discovered before promotion can be found again afterwards.

use std::collections::HashSet;
use tracing::info;

use super::editor::Editor;
use super::plan::{Edit, Fragment, PlanError};
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::matcher::{Candidate, Variant};
use crate::naming::{NameCodec, unique_name};
use crate::syntax::{NodeId, Placement, SyntaxTree};

pub struct Promoter<'c> {
    config: &'c MigrationConfig,
}

impl<'c> Promoter<'c> {
    pub fn new(config: &'c MigrationConfig) -> Self {
        Self { config }
    }

    /// Rewrites an anonymous candidate into nested form and returns the id
    /// of the promoted declaration. Other variants are returned unchanged.
    pub fn promote(&self, tree: &mut SyntaxTree, candidate: &Candidate) -> Result<NodeId> {
        if candidate.variant != Variant::Anonymous {
            return Ok(candidate.decl);
        }
        let edits = self.edits(tree, candidate)?;
        Editor::new().apply_edits(tree, &edits)?;
        info!(
            unit = %tree.path().display(),
            class = tree.class(candidate.decl).and_then(|c| c.name.as_deref()).unwrap_or_default(),
            "promoted anonymous declaration"
        );
        Ok(candidate.decl)
    }

    fn edits(&self, tree: &SyntaxTree, candidate: &Candidate) -> Result<Vec<Edit>> {
        let body = candidate.decl;
        let (new, enclosing) = candidate
            .instantiation
            .zip(candidate.enclosing)
            .ok_or(PlanError::MissingEnclosing)?;
        let new_expr = tree.new_expr(new).ok_or(PlanError::MissingEnclosing)?;
        if !new_expr.args.is_empty() || new_expr.ty.text.contains("<>") {
            return Err(unsupported(tree, new).into());
        }

        let member = std::iter::once(new)
            .chain(tree.ancestors(new))
            .find(|id| tree.parent(*id) == Some(enclosing))
            .ok_or(PlanError::MissingEnclosing)?;
        if let Some(name) = captured_local(tree, member, body) {
            return Err(PlanError::CapturedLocal { name }.into());
        }

        let codec = NameCodec::new(self.config);
        let method = tree.enclosing_method(new).and_then(|m| tree.method(m));
        let base = codec.promoted_class(
            candidate.holding_var.as_deref(),
            method.map(|m| m.name.as_str()),
        );
        let name = unique_name(&base, |n| tree.find_class(n).is_some());

        Ok(vec![
            Edit::RenameMember {
                member: body,
                name: name.clone(),
            },
            Edit::StripModifier {
                member: body,
                replacement: Some("private".to_string()),
            },
            Edit::MoveMember {
                member: body,
                to: Placement::After(member),
            },
            Edit::ReplaceNode {
                target: new,
                with: Fragment::expression(format!("new {name}()")),
            },
        ])
    }
}

/// First local of `member` that the anonymous `body` reads without
/// declaring it itself.
fn captured_local(tree: &SyntaxTree, member: NodeId, body: NodeId) -> Option<String> {
    let mut outer: HashSet<String> = tree
        .method(member)
        .map(|m| m.params.iter().map(|p| p.name.clone()).collect())
        .unwrap_or_default();
    for id in tree.descendants(member) {
        if tree.is_within(id, body) {
            continue;
        }
        if let Some(var) = tree.var_decl(id) {
            outer.insert(var.name.clone());
        }
    }

    let mut inner = HashSet::new();
    for id in tree.descendants(body) {
        match tree.kind(id) {
            Some(crate::syntax::NodeKind::VarDecl(v)) => {
                inner.insert(v.name.clone());
            }
            Some(crate::syntax::NodeKind::Field(f)) => {
                inner.insert(f.name.clone());
            }
            Some(crate::syntax::NodeKind::Method(m)) => {
                inner.extend(m.params.iter().map(|p| p.name.clone()));
            }
            _ => {}
        }
    }

    tree.descendants(body)
        .into_iter()
        .filter_map(|id| tree.name_ref(id))
        .filter(|r| !r.qualified && outer.contains(&r.name) && !inner.contains(&r.name))
        .map(|r| r.name.clone())
        .next()
}

fn unsupported(tree: &SyntaxTree, node: NodeId) -> PlanError {
    let context = tree.enclosing_statement(node).unwrap_or(node);
    PlanError::UnsupportedUse {
        context: crate::syntax::print_node(tree, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use crate::matcher::PatternMatcher;
    use crate::syntax::{parse, print_tree};
    use std::path::Path;

    fn setup(source: &str) -> (MigrationConfig, SyntaxTree, Candidate) {
        let config = MigrationConfig::default();
        let tree = parse(Path::new("Loader.java"), source).unwrap();
        let candidate = PatternMatcher::new(&config).discover(&tree).remove(0);
        (config, tree, candidate)
    }

    #[test]
    fn test_promotes_anonymous_body_after_its_method() {
        let (config, mut tree, candidate) = setup(
            r#"
class Loader {
    void start() {
        new AsyncTask<Void, Void, String>() {
            @Override
            protected String doInBackground(Void... v) { return "x"; }
        }.execute();
    }

    void stop() {}
}
"#,
        );

        let id = Promoter::new(&config).promote(&mut tree, &candidate).unwrap();

        let loader = tree.find_class("Loader").unwrap();
        assert_eq!(tree.members(loader)[1], id);
        let promoted = tree.class(id).unwrap();
        assert_eq!(promoted.name.as_deref(), Some("StartTask"));
        assert_eq!(promoted.modifiers, vec!["private".to_string()]);
        let printed = print_tree(&tree);
        assert!(printed.contains("new StartTask().execute();"));
        assert!(printed.contains("private class StartTask extends AsyncTask<Void, Void, String> {"));

        let rediscovered = PatternMatcher::new(&config).discover(&tree);
        assert_eq!(rediscovered.len(), 1);
        assert_eq!(rediscovered[0].decl, id);
        assert_eq!(rediscovered[0].variant, Variant::Nested);
    }

    #[test]
    fn test_rejects_captured_local() {
        let (config, mut tree, candidate) = setup(
            r#"
class Loader {
    void start(String url) {
        new AsyncTask<Void, Void, String>() {
            protected String doInBackground(Void... v) { return url; }
        }.execute();
    }
}
"#,
        );
        let before = print_tree(&tree);

        let err = Promoter::new(&config).promote(&mut tree, &candidate).unwrap_err();

        assert!(matches!(
            err,
            MigrationError::Plan(PlanError::CapturedLocal { ref name }) if name == "url"
        ));
        assert_eq!(print_tree(&tree), before);
    }

    #[test]
    fn test_uses_holding_variable_for_name() {
        let (config, mut tree, candidate) = setup(
            r#"
class Loader {
    void start() {
        AsyncTask<Void, Void, Void> refresh = new AsyncTask<Void, Void, Void>() {
            protected Void doInBackground(Void... v) { return null; }
        };
        refresh.execute();
    }
}
"#,
        );

        let id = Promoter::new(&config).promote(&mut tree, &candidate).unwrap();

        assert_eq!(tree.class(id).unwrap().name.as_deref(), Some("Refresh"));
        assert!(print_tree(&tree).contains("refresh = new Refresh();"));
    }
}

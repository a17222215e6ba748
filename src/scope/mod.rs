//! Reference search over a [`Project`].
//!
//! The migration core never indexes references itself. It asks a
//! [`ReferenceFinder`] every time it needs them, because any applied edit
//! invalidates node identities.
//!
//! [`NameResolver`] is the built-in finder. It resolves by name:
//!
//! - **Classes**: `new` expressions, name occurrences, declared types of
//!   fields, locals, parameters and return values, and supertype clauses.
//!   Units other than the declaring one only count when they can see the
//!   class through their package or imports.
//! - **Local variables**: unqualified name occurrences after the
//!   declaration inside the declaring block.

mod reference;

pub use reference::{DeclRef, Reference, ReferenceKind, SearchScope};

use crate::error::Result;
use crate::project::Project;
use crate::syntax::types::{mentions, mentions_qualified};
use crate::syntax::{NodeId, NodeKind, Piece, SyntaxTree};

/// The reference search collaborator.
pub trait ReferenceFinder {
    /// Returns every use of `target` within `scope`, in a stable order.
    fn find_references(
        &self,
        project: &Project,
        target: &DeclRef,
        scope: &SearchScope,
    ) -> Result<Vec<Reference>>;
}

/// Name-based reference finder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NameResolver;

impl NameResolver {
    pub fn new() -> Self {
        Self
    }

    fn class_references(
        &self,
        project: &Project,
        target: &DeclRef,
        declaring: &SyntaxTree,
        scope: &SearchScope,
    ) -> Vec<Reference> {
        let Some(name) = declaring
            .class(target.node)
            .and_then(|c| c.name.clone())
        else {
            return Vec::new();
        };
        let qualifiers = class_qualifiers(declaring, target.node);
        let qualified = qualifiers.qualified_name();

        let mut found = Vec::new();
        for unit in project.units() {
            if !scope.includes(unit.path()) {
                continue;
            }
            let same_unit = unit.path() == target.unit;
            let visible = same_unit || sees_class(unit, &qualifiers);
            if !visible && qualified.is_none() {
                continue;
            }
            for id in unit.preorder() {
                if same_unit && unit.is_within(id, target.node) {
                    continue;
                }
                let kind = if visible {
                    class_mention(unit, id, &name)
                } else {
                    qualified
                        .as_deref()
                        .and_then(|qualified| qualified_mention(unit, id, qualified))
                };
                if let Some(kind) = kind {
                    found.push(Reference {
                        unit: unit.path().to_path_buf(),
                        element: id,
                        target: target.clone(),
                        kind,
                    });
                }
            }
        }
        found
    }

    fn variable_references(&self, tree: &SyntaxTree, target: &DeclRef) -> Vec<Reference> {
        let Some(name) = tree.var_decl(target.node).map(|v| v.name.clone()) else {
            return Vec::new();
        };
        let Some(block) = tree.parent(target.node).and_then(|b| tree.block(b)) else {
            return Vec::new();
        };
        let Some(position) = block.statements.iter().position(|s| *s == target.node) else {
            return Vec::new();
        };

        block.statements[position + 1..]
            .iter()
            .flat_map(|statement| tree.descendants(*statement))
            .filter(|id| {
                tree.name_ref(*id)
                    .is_some_and(|r| !r.qualified && r.name == name)
            })
            .map(|element| Reference {
                unit: tree.path().to_path_buf(),
                element,
                target: target.clone(),
                kind: ReferenceKind::Read,
            })
            .collect()
    }
}

impl ReferenceFinder for NameResolver {
    fn find_references(
        &self,
        project: &Project,
        target: &DeclRef,
        scope: &SearchScope,
    ) -> Result<Vec<Reference>> {
        let declaring = project.require(&target.unit)?;
        let references = match declaring.kind(target.node) {
            Some(NodeKind::Class(_)) => self.class_references(project, target, declaring, scope),
            Some(NodeKind::VarDecl(_)) if scope.includes(&target.unit) => {
                self.variable_references(declaring, target)
            }
            _ => Vec::new(),
        };
        Ok(references)
    }
}

/// Names by which another unit may import a class: its package and the
/// names of the class and its enclosing classes.
struct Qualifiers {
    package: Option<String>,
    names: Vec<String>,
}

impl Qualifiers {
    /// Fully qualified name, e.g. `com.example.Loader.Download`. None in the
    /// default package, which other packages cannot name.
    fn qualified_name(&self) -> Option<String> {
        let package = self.package.as_ref()?;
        let mut parts = vec![package.as_str()];
        parts.extend(self.names.iter().rev().map(String::as_str));
        Some(parts.join("."))
    }
}

fn class_qualifiers(tree: &SyntaxTree, class: NodeId) -> Qualifiers {
    let names = std::iter::once(class)
        .chain(tree.ancestors(class))
        .filter_map(|id| tree.class(id).and_then(|c| c.name.clone()))
        .collect();
    Qualifiers {
        package: tree.unit().package.clone(),
        names,
    }
}

fn sees_class(unit: &SyntaxTree, qualifiers: &Qualifiers) -> bool {
    if unit.unit().package == qualifiers.package {
        return true;
    }
    let Some(package) = &qualifiers.package else {
        return false;
    };
    unit.unit()
        .imports
        .iter()
        .filter_map(|id| unit.import(*id))
        .filter(|import| !import.is_static)
        .any(|import| {
            let from_package =
                import.path == *package || import.path.starts_with(&format!("{package}."));
            from_package
                && (qualifiers.names.iter().any(|n| mentions(&import.path, n))
                    || (import.on_demand && import.path == *package))
        })
}

fn class_mention(tree: &SyntaxTree, id: NodeId, name: &str) -> Option<ReferenceKind> {
    match tree.kind(id)? {
        NodeKind::New(new) if new.ty.is(name) => Some(ReferenceKind::Instantiation),
        NodeKind::Reference(r) if r.name == name => Some(ReferenceKind::Read),
        NodeKind::Field(f) if mentions(&f.ty, name) => Some(ReferenceKind::Type),
        NodeKind::VarDecl(v) if mentions(&v.ty, name) => Some(ReferenceKind::Type),
        NodeKind::Method(m)
            if m.return_type.as_deref().is_some_and(|t| mentions(t, name))
                || m.params.iter().any(|p| mentions(&p.ty, name)) =>
        {
            Some(ReferenceKind::Type)
        }
        NodeKind::Class(c)
            if c.supertype.as_ref().is_some_and(|s| mentions(&s.text, name))
                || c.interfaces.as_deref().is_some_and(|i| mentions(i, name)) =>
        {
            Some(ReferenceKind::Inheritance)
        }
        _ => None,
    }
}

/// A mention spelled with the full package path, visible without imports.
fn qualified_mention(tree: &SyntaxTree, id: NodeId, qualified: &str) -> Option<ReferenceKind> {
    let named = |text: &str| mentions_qualified(text, qualified);
    match tree.kind(id)? {
        NodeKind::New(new) if named(&new.ty.text) => Some(ReferenceKind::Instantiation),
        NodeKind::Field(f) if named(&f.ty) => Some(ReferenceKind::Type),
        NodeKind::VarDecl(v) if named(&v.ty) => Some(ReferenceKind::Type),
        NodeKind::Method(m)
            if m.return_type.as_deref().is_some_and(named)
                || m.params.iter().any(|p| named(&p.ty)) =>
        {
            Some(ReferenceKind::Type)
        }
        NodeKind::Class(c)
            if c.supertype.as_ref().is_some_and(|s| named(&s.text))
                || c.interfaces.as_deref().is_some_and(named) =>
        {
            Some(ReferenceKind::Inheritance)
        }
        NodeKind::Opaque(opaque)
            if opaque
                .pieces
                .iter()
                .any(|p| matches!(p, Piece::Text(text) if named(text))) =>
        {
            Some(ReferenceKind::Read)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use std::path::Path;

    const LOADER: &str = r#"
package com.example;

class Loader {
    void start(String url) {
        Download task = new Download();
        task.execute(url);
        task.getStatus();
    }

    class Download extends AsyncTask<String, Void, String> {
        Download self() { return this; }
        protected String doInBackground(String... urls) { return urls[0]; }
    }
}
"#;

    fn project(units: &[(&str, &str)]) -> Project {
        let mut project = Project::new();
        for (path, source) in units {
            project.insert(parse(Path::new(path), source).unwrap());
        }
        project
    }

    fn download(project: &Project) -> DeclRef {
        let tree = project.get(Path::new("Loader.java")).unwrap();
        DeclRef::new("Loader.java", tree.find_class("Download").unwrap())
    }

    #[test]
    fn test_class_references_in_declaring_unit() {
        let project = project(&[("Loader.java", LOADER)]);
        let target = download(&project);
        let refs = NameResolver
            .find_references(&project, &target, &SearchScope::Project)
            .unwrap();

        let kinds: Vec<_> = refs.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ReferenceKind::Type, ReferenceKind::Instantiation]);
        assert!(refs.iter().all(|r| !r.is_cross_unit()));
    }

    #[test]
    fn test_cross_unit_reference_requires_visibility() {
        let same_package = "package com.example;\nclass Other { Loader.Download d; }\n";
        let elsewhere = "package org.other;\nclass Far { Download d; }\n";
        let imported = "package org.other;\nimport com.example.Loader;\nclass Near { Object f() { return new Loader.Download(); } }\n";
        let project = project(&[
            ("Loader.java", LOADER),
            ("Other.java", same_package),
            ("Far.java", elsewhere),
            ("Near.java", imported),
        ]);
        let target = download(&project);
        let refs = NameResolver
            .find_references(&project, &target, &SearchScope::Project)
            .unwrap();

        let cross: Vec<_> = refs
            .iter()
            .filter(|r| r.is_cross_unit())
            .map(|r| r.unit.to_string_lossy().into_owned())
            .collect();
        assert_eq!(cross, vec!["Near.java", "Other.java"]);
    }

    #[test]
    fn test_unit_scope_limits_search() {
        let other = "package com.example;\nclass Other { Download d; }\n";
        let project = project(&[("Loader.java", LOADER), ("Other.java", other)]);
        let target = download(&project);
        let refs = NameResolver
            .find_references(
                &project,
                &target,
                &SearchScope::Unit("Loader.java".into()),
            )
            .unwrap();
        assert!(refs.iter().all(|r| r.is_in(Path::new("Loader.java"))));
    }

    #[test]
    fn test_variable_references_follow_declaration() {
        let project = project(&[("Loader.java", LOADER)]);
        let tree = project.get(Path::new("Loader.java")).unwrap();
        let var = tree
            .preorder()
            .into_iter()
            .find(|id| tree.var_decl(*id).is_some())
            .unwrap();
        let refs = NameResolver
            .find_references(
                &project,
                &DeclRef::new("Loader.java", var),
                &SearchScope::Project,
            )
            .unwrap();

        assert_eq!(refs.len(), 2);
        let receivers: Vec<_> = refs
            .iter()
            .map(|r| tree.call(tree.parent(r.element).unwrap()).unwrap().name.as_str())
            .collect();
        assert_eq!(receivers, vec!["execute", "getStatus"]);
    }
}

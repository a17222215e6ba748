//! Import normalization for an edited unit.

use tracing::debug;

use crate::config::simple_name;
use crate::syntax::types::mentions;
use crate::syntax::{Import, NodeKind, SyntaxTree, print_node};

/// Adds imports for `add` that the unit does not see yet and removes the
/// single-type imports in `drop_unused` whose simple name no longer appears
/// in any type declaration.
pub(crate) fn normalize(tree: &mut SyntaxTree, add: &[String], drop_unused: &[String]) {
    let body: String = tree
        .unit()
        .types
        .iter()
        .map(|id| print_node(tree, *id))
        .collect::<Vec<_>>()
        .join("\n");

    let stale: Vec<_> = tree
        .unit()
        .imports
        .iter()
        .copied()
        .filter(|id| {
            tree.import(*id).is_some_and(|import| {
                !import.is_static
                    && !import.on_demand
                    && drop_unused.contains(&import.path)
                    && !mentions(&body, simple_name(&import.path))
            })
        })
        .collect();
    for id in stale {
        debug!(unit = %tree.path().display(), "dropping unused import");
        tree.detach(id);
    }

    for fqn in add {
        if visible(tree, fqn) {
            continue;
        }
        let root = tree.root();
        let import = Import {
            path: fqn.clone(),
            is_static: false,
            on_demand: false,
        };
        let id = tree.alloc(NodeKind::Import(import), None, None);
        let index = tree.unit().imports.len();
        tree.insert_child(root, index, id);
    }
}

fn visible(tree: &SyntaxTree, fqn: &str) -> bool {
    let same_package = fqn
        .rsplit_once('.')
        .is_some_and(|(package, _)| tree.unit().package.as_deref() == Some(package));
    same_package
        || tree
            .unit()
            .imports
            .iter()
            .filter_map(|id| tree.import(*id))
            .any(|import| import.covers(fqn))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse, print_tree};
    use std::path::Path;

    #[test]
    fn test_adds_missing_and_drops_unused() {
        let mut tree = parse(
            Path::new("A.java"),
            "package app;\n\nimport android.os.AsyncTask;\nimport io.reactivex.rxjava3.core.*;\n\nclass A {}\n",
        )
        .unwrap();

        normalize(
            &mut tree,
            &[
                "io.reactivex.rxjava3.core.Single".to_string(),
                "io.reactivex.rxjava3.disposables.Disposable".to_string(),
            ],
            &["android.os.AsyncTask".to_string()],
        );

        let printed = print_tree(&tree);
        assert!(!printed.contains("import android.os.AsyncTask;"));
        assert!(!printed.contains("import io.reactivex.rxjava3.core.Single;"));
        assert!(printed.contains("import io.reactivex.rxjava3.disposables.Disposable;"));
    }

    #[test]
    fn test_keeps_import_still_mentioned() {
        let mut tree = parse(
            Path::new("A.java"),
            "import android.os.AsyncTask;\n\nclass A { AsyncTask<?, ?, ?> held; }\n",
        )
        .unwrap();

        normalize(&mut tree, &[], &["android.os.AsyncTask".to_string()]);

        assert!(print_tree(&tree).contains("import android.os.AsyncTask;"));
    }
}

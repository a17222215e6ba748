//! Applies a [`MigrationPlan`] atomically.
//!
//! Edits run against a scratch copy of the tree. The copy replaces the tree
//! only when every edit succeeded; a failing edit drops the copy, so callers
//! never observe a half-migrated unit.

use tracing::{debug, warn};

use super::imports;
use super::plan::{Edit, EditError, EditErrorKind, Fragment, MigrationPlan};
use crate::syntax::{NodeId, NodeKind, Placement, SyntaxTree, parse_fragment};

type EditResult<T> = std::result::Result<T, EditErrorKind>;

/// Stateless applier of migration plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct Editor;

impl Editor {
    pub fn new() -> Self {
        Self
    }

    /// Applies every edit of `plan` in order, or none of them.
    pub fn apply(&self, tree: &mut SyntaxTree, plan: &MigrationPlan) -> Result<(), EditError> {
        self.apply_edits(tree, &plan.edits)?;
        debug!(
            unit = %plan.unit.display(),
            candidate = %plan.candidate,
            edits = plan.len(),
            "applied migration plan"
        );
        Ok(())
    }

    /// Applies a bare edit list with the same all-or-nothing guarantee.
    pub fn apply_edits(&self, tree: &mut SyntaxTree, edits: &[Edit]) -> Result<(), EditError> {
        let unit = tree.path().to_path_buf();
        let mut transaction = Transaction::begin(tree);
        for (step, edit) in edits.iter().enumerate() {
            if let Err(kind) = transaction.apply(edit) {
                let error = EditError {
                    step,
                    edit: edit.label().to_string(),
                    kind,
                };
                warn!(unit = %unit.display(), "{error}");
                return Err(error);
            }
        }
        transaction.commit();
        Ok(())
    }
}

/// An open edit session over a copy of one tree.
pub struct Transaction<'t> {
    target: &'t mut SyntaxTree,
    scratch: SyntaxTree,
}

impl<'t> Transaction<'t> {
    pub fn begin(target: &'t mut SyntaxTree) -> Self {
        let scratch = target.clone();
        Self { target, scratch }
    }

    /// Publishes the edited copy. Dropping the transaction instead abandons it.
    pub fn commit(self) {
        *self.target = self.scratch;
    }

    pub fn apply(&mut self, edit: &Edit) -> EditResult<()> {
        match edit {
            Edit::MoveMember { member, to } => self.move_member(*member, *to),
            Edit::RenameMember { member, name } => self.rename_member(*member, name),
            Edit::StripModifier {
                member,
                replacement,
            } => self.strip_modifier(*member, replacement.as_deref()),
            Edit::RemoveAnnotation { member, name } => self.remove_annotation(*member, name),
            Edit::AddParameter {
                method,
                index,
                param,
            } => {
                self.require(*method)?;
                let decl = self
                    .scratch
                    .method_mut(*method)
                    .ok_or_else(|| invalid(*method, "not a method"))?;
                if decl.params.iter().any(|p| p.name == param.name) {
                    return Err(EditErrorKind::Collision {
                        name: param.name.clone(),
                    });
                }
                if *index > decl.params.len() {
                    return Err(invalid(*method, "parameter index out of range"));
                }
                decl.params.insert(*index, param.clone());
                Ok(())
            }
            Edit::RenameCall { call, name } => {
                self.require(*call)?;
                let call_expr = self
                    .scratch
                    .call_mut(*call)
                    .ok_or_else(|| invalid(*call, "not a call"))?;
                call_expr.name = name.clone();
                Ok(())
            }
            Edit::ReplaceNode { target, with } => self.replace_node(*target, with),
            Edit::Insert { at, fragment } => self.insert(*at, fragment),
            Edit::DeleteNode { target } => {
                self.require(*target)?;
                if *target == self.scratch.root() || !self.scratch.detach(*target) {
                    return Err(invalid(*target, "cannot be detached"));
                }
                Ok(())
            }
            Edit::NormalizeImports { add, drop_unused } => {
                imports::normalize(&mut self.scratch, add, drop_unused);
                Ok(())
            }
        }
    }

    fn require(&self, id: NodeId) -> EditResult<()> {
        if self.scratch.is_attached(id) {
            Ok(())
        } else {
            Err(EditErrorKind::MissingNode { node: id })
        }
    }

    fn require_placement(&self, at: Placement) -> EditResult<()> {
        match at {
            Placement::Before(id) | Placement::After(id) | Placement::Start(id) | Placement::End(id) => {
                self.require(id)
            }
        }
    }

    fn move_member(&mut self, member: NodeId, to: Placement) -> EditResult<()> {
        self.require(member)?;
        self.require_placement(to)?;
        let tree = &mut self.scratch;
        if let Some((container, _)) = tree.resolve_placement(to, false) {
            check_collision(tree, container, member, None)?;
        }
        tree.detach(member);
        let (container, index) = tree
            .resolve_placement(to, false)
            .ok_or_else(|| invalid(member, "placement has no member list"))?;
        if !tree.insert_child(container, index, member) {
            return Err(invalid(container, "cannot hold members"));
        }
        Ok(())
    }

    fn rename_member(&mut self, member: NodeId, name: &str) -> EditResult<()> {
        self.require(member)?;
        let tree = &mut self.scratch;
        if let Some(class) = tree.parent(member).filter(|p| tree.class(*p).is_some()) {
            check_collision(tree, class, member, Some(name))?;
        }
        match tree.kind_mut(member) {
            Some(NodeKind::Class(class)) => class.name = Some(name.to_string()),
            Some(NodeKind::Method(method)) => method.name = name.to_string(),
            Some(NodeKind::Field(field)) => field.name = name.to_string(),
            _ => return Err(invalid(member, "not a declaration")),
        }
        Ok(())
    }

    fn strip_modifier(&mut self, member: NodeId, replacement: Option<&str>) -> EditResult<()> {
        self.require(member)?;
        let modifiers = match self.scratch.kind_mut(member) {
            Some(NodeKind::Class(class)) => &mut class.modifiers,
            Some(NodeKind::Method(method)) => &mut method.modifiers,
            Some(NodeKind::Field(field)) => &mut field.modifiers,
            _ => return Err(invalid(member, "not a declaration")),
        };
        modifiers.retain(|m| !matches!(m.as_str(), "public" | "protected" | "private"));
        if let Some(replacement) = replacement {
            modifiers.insert(0, replacement.to_string());
        }
        Ok(())
    }

    fn remove_annotation(&mut self, member: NodeId, name: &str) -> EditResult<()> {
        self.require(member)?;
        let annotations = match self.scratch.kind_mut(member) {
            Some(NodeKind::Class(class)) => &mut class.annotations,
            Some(NodeKind::Method(method)) => &mut method.annotations,
            Some(NodeKind::Field(field)) => &mut field.annotations,
            _ => return Err(invalid(member, "not a declaration")),
        };
        annotations.retain(|a| crate::syntax::annotation_name(a) != name);
        Ok(())
    }

    /// Parses a fragment and copies its roots into the scratch arena.
    fn graft(&mut self, fragment: &Fragment) -> EditResult<Vec<NodeId>> {
        let (source, roots) = parse_fragment(fragment.kind, &fragment.text).ok_or_else(|| {
            EditErrorKind::InvalidFragment {
                text: fragment.text.clone(),
            }
        })?;
        let grafted: Option<Vec<NodeId>> = roots
            .into_iter()
            .map(|root| self.scratch.graft(&source, root))
            .collect();
        match grafted {
            Some(ids) if !ids.is_empty() => Ok(ids),
            _ => Err(EditErrorKind::InvalidFragment {
                text: fragment.text.clone(),
            }),
        }
    }

    fn replace_node(&mut self, target: NodeId, with: &Fragment) -> EditResult<()> {
        self.require(target)?;
        let roots = self.graft(with)?;
        let [replacement] = roots.as_slice() else {
            return Err(EditErrorKind::InvalidFragment {
                text: with.text.clone(),
            });
        };
        self.scratch
            .replace_with(target, *replacement)
            .ok_or_else(|| invalid(target, "cannot be replaced"))?;
        Ok(())
    }

    fn insert(&mut self, at: Placement, fragment: &Fragment) -> EditResult<()> {
        self.require_placement(at)?;
        let roots = self.graft(fragment)?;
        let tree = &mut self.scratch;
        let (container, index) = tree
            .resolve_placement(at, false)
            .ok_or_else(|| invalid(anchor(at), "placement has no member list"))?;
        for (offset, root) in roots.into_iter().enumerate() {
            check_collision(tree, container, root, None)?;
            if !tree.insert_child(container, index + offset, root) {
                return Err(invalid(container, "cannot hold inserted code"));
            }
        }
        Ok(())
    }
}

fn anchor(at: Placement) -> NodeId {
    match at {
        Placement::Before(id) | Placement::After(id) | Placement::Start(id) | Placement::End(id) => id,
    }
}

fn invalid(node: NodeId, reason: &str) -> EditErrorKind {
    EditErrorKind::InvalidTarget {
        node,
        reason: reason.to_string(),
    }
}

/// Rejects a member whose name (or `rename`) is already declared in
/// `container` by a member of the same kind. Methods also compare arity.
fn check_collision(
    tree: &SyntaxTree,
    container: NodeId,
    member: NodeId,
    rename: Option<&str>,
) -> EditResult<()> {
    if tree.class(container).is_none() {
        return Ok(());
    }
    let Some(kind) = tree.kind(member) else {
        return Ok(());
    };
    let Some(name) = rename.or_else(|| kind.declared_name()) else {
        return Ok(());
    };

    let clash = tree.members(container).iter().any(|other| {
        if *other == member {
            return false;
        }
        match (kind, tree.kind(*other)) {
            (NodeKind::Field(_), Some(NodeKind::Field(f))) => f.name == name,
            (NodeKind::Class(_), Some(NodeKind::Class(c))) => c.name.as_deref() == Some(name),
            (NodeKind::Method(m), Some(NodeKind::Method(o))) => {
                !m.is_constructor() && o.name == name && o.params.len() == m.params.len()
            }
            _ => false,
        }
    });
    if clash {
        Err(EditErrorKind::Collision {
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

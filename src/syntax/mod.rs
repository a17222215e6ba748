//! Arena-backed syntax tree for one Java compilation unit.
//!
//! Nodes live in a flat arena and are addressed by [`NodeId`]. Parent links
//! are navigational only; ownership is expressed by the child lists held in
//! each [`NodeKind`]. Ids are never reused, so an id taken before an edit
//! either still names the same node or names a detached one, which
//! [`SyntaxTree::is_attached`] reports.
//!
//! Only the parts of Java the migration reasons about get structure:
//! classes, methods, fields, blocks, local variables, calls, instantiations
//! and name references. Everything else is kept as [`Opaque`] source text
//! interleaved with the structured children found inside it, so printing a
//! tree loses nothing but insignificant whitespace.

mod lower;
mod print;
pub mod types;

pub use lower::{FragmentKind, parse, parse_fragment};
pub use print::{Printer, print_node, print_tree};
pub use types::TypeRef;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Handle of a node inside one [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range of a node in the source it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A run of verbatim source text or a structured child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Node(NodeId),
}

/// Root of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    /// Comments before the package declaration (license headers).
    pub header: Vec<String>,
    pub package: Option<String>,
    pub imports: Vec<NodeId>,
    pub types: Vec<NodeId>,
}

/// An import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
    pub on_demand: bool,
}

impl Import {
    /// Returns true when this import makes `fqn` visible by its simple name.
    pub fn covers(&self, fqn: &str) -> bool {
        if self.is_static {
            return false;
        }
        if self.on_demand {
            return fqn
                .rsplit_once('.')
                .is_some_and(|(package, _)| package == self.path);
        }
        self.path == fqn
    }
}

/// A class declaration, named or anonymous.
#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    /// `None` for the body of an anonymous instantiation.
    pub name: Option<String>,
    pub leading: Vec<String>,
    pub annotations: Vec<String>,
    pub modifiers: Vec<String>,
    pub type_params: Option<String>,
    pub supertype: Option<TypeRef>,
    /// Verbatim `implements ...` clause.
    pub interfaces: Option<String>,
    pub members: Vec<NodeId>,
    /// Set when the parser recovered from a syntax error inside the declaration.
    pub malformed: bool,
}

impl ClassDecl {
    /// Returns true for anonymous class bodies.
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: String,
    pub name: String,
    /// Verbatim text including modifiers and annotations.
    pub text: String,
}

impl Param {
    /// Creates a parameter from a type and a name.
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        let ty = ty.into();
        let name = name.into();
        let text = format!("{ty} {name}");
        Self { ty, name, text }
    }
}

/// A method or constructor declaration.
#[derive(Debug, Clone, Default)]
pub struct MethodDecl {
    pub leading: Vec<String>,
    pub annotations: Vec<String>,
    pub modifiers: Vec<String>,
    pub type_params: Option<String>,
    /// `None` for constructors.
    pub return_type: Option<String>,
    pub name: String,
    pub params: Vec<Param>,
    pub throws: Option<String>,
    pub body: Option<NodeId>,
}

impl MethodDecl {
    /// Returns true for constructors.
    pub fn is_constructor(&self) -> bool {
        self.return_type.is_none()
    }

    /// Returns true when the method carries the given annotation.
    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| annotation_name(a) == name)
    }
}

/// Returns the simple name of an annotation written as `@Name(...)`.
pub fn annotation_name(annotation: &str) -> &str {
    let name = annotation.trim_start_matches('@');
    let name = name.split('(').next().unwrap_or(name).trim();
    name.rsplit('.').next().unwrap_or(name)
}

/// A field declaration with a single declarator.
#[derive(Debug, Clone, Default)]
pub struct FieldDecl {
    pub leading: Vec<String>,
    pub annotations: Vec<String>,
    pub modifiers: Vec<String>,
    pub ty: String,
    pub name: String,
    pub init: Option<NodeId>,
}

/// A braced statement list.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub statements: Vec<NodeId>,
}

/// A local variable declaration statement with a single declarator.
#[derive(Debug, Clone, Default)]
pub struct VarDecl {
    pub modifiers: Vec<String>,
    pub ty: String,
    pub name: String,
    pub init: Option<NodeId>,
}

/// A method invocation.
#[derive(Debug, Clone, Default)]
pub struct CallExpr {
    pub receiver: Option<NodeId>,
    pub name: String,
    pub args: Vec<NodeId>,
}

/// An instantiation expression, optionally with an anonymous class body.
#[derive(Debug, Clone)]
pub struct NewExpr {
    pub ty: TypeRef,
    pub args: Vec<NodeId>,
    pub body: Option<NodeId>,
}

/// An occurrence of a simple name in expression or type position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef {
    pub name: String,
    /// True when the name is selected from another expression (`a.name`).
    pub qualified: bool,
}

/// Source text the model does not structure, with structured children inline.
#[derive(Debug, Clone, Default)]
pub struct Opaque {
    /// Comments attached when the node stands for a class member.
    pub leading: Vec<String>,
    pub pieces: Vec<Piece>,
}

impl Opaque {
    /// Creates an opaque node holding only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            leading: Vec::new(),
            pieces: vec![Piece::Text(text.into())],
        }
    }

    /// Child nodes in source order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pieces.iter().filter_map(|p| match p {
            Piece::Node(id) => Some(*id),
            Piece::Text(_) => None,
        })
    }
}

/// Variant-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Unit(Unit),
    Import(Import),
    Class(ClassDecl),
    Method(MethodDecl),
    Field(FieldDecl),
    Block(Block),
    VarDecl(VarDecl),
    Call(CallExpr),
    New(NewExpr),
    Reference(NameRef),
    Opaque(Opaque),
}

impl NodeKind {
    /// Short name of the variant, used in logs and errors.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Unit(_) => "unit",
            NodeKind::Import(_) => "import",
            NodeKind::Class(_) => "class",
            NodeKind::Method(_) => "method",
            NodeKind::Field(_) => "field",
            NodeKind::Block(_) => "block",
            NodeKind::VarDecl(_) => "variable",
            NodeKind::Call(_) => "call",
            NodeKind::New(_) => "new",
            NodeKind::Reference(_) => "reference",
            NodeKind::Opaque(_) => "opaque",
        }
    }

    /// Name introduced by a declaration node.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            NodeKind::Class(c) => c.name.as_deref(),
            NodeKind::Method(m) => Some(&m.name),
            NodeKind::Field(f) => Some(&f.name),
            NodeKind::VarDecl(v) => Some(&v.name),
            _ => None,
        }
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Unit(u) => u.imports.iter().chain(&u.types).copied().collect(),
            NodeKind::Import(_) | NodeKind::Reference(_) => Vec::new(),
            NodeKind::Class(c) => c.members.clone(),
            NodeKind::Method(m) => m.body.into_iter().collect(),
            NodeKind::Field(f) => f.init.into_iter().collect(),
            NodeKind::Block(b) => b.statements.clone(),
            NodeKind::VarDecl(v) => v.init.into_iter().collect(),
            NodeKind::Call(c) => c.receiver.into_iter().chain(c.args.iter().copied()).collect(),
            NodeKind::New(n) => n.args.iter().copied().chain(n.body).collect(),
            NodeKind::Opaque(o) => o.nodes().collect(),
        }
    }

    fn for_each_child_mut(&mut self, f: &mut dyn FnMut(&mut NodeId)) {
        match self {
            NodeKind::Unit(u) => u.imports.iter_mut().chain(u.types.iter_mut()).for_each(f),
            NodeKind::Import(_) | NodeKind::Reference(_) => {}
            NodeKind::Class(c) => c.members.iter_mut().for_each(f),
            NodeKind::Method(m) => m.body.iter_mut().for_each(f),
            NodeKind::Field(fd) => fd.init.iter_mut().for_each(f),
            NodeKind::Block(b) => b.statements.iter_mut().for_each(f),
            NodeKind::VarDecl(v) => v.init.iter_mut().for_each(f),
            NodeKind::Call(c) => c.receiver.iter_mut().chain(c.args.iter_mut()).for_each(f),
            NodeKind::New(n) => n.args.iter_mut().chain(n.body.iter_mut()).for_each(f),
            NodeKind::Opaque(o) => o
                .pieces
                .iter_mut()
                .filter_map(|p| match p {
                    Piece::Node(id) => Some(id),
                    Piece::Text(_) => None,
                })
                .for_each(f),
        }
    }

    /// Removes `child` from whichever slot holds it.
    fn remove_child(&mut self, child: NodeId) -> bool {
        fn remove_from(list: &mut Vec<NodeId>, child: NodeId) -> bool {
            let before = list.len();
            list.retain(|id| *id != child);
            list.len() != before
        }
        fn clear(slot: &mut Option<NodeId>, child: NodeId) -> bool {
            if *slot == Some(child) {
                *slot = None;
                true
            } else {
                false
            }
        }

        match self {
            NodeKind::Unit(u) => remove_from(&mut u.imports, child) || remove_from(&mut u.types, child),
            NodeKind::Class(c) => remove_from(&mut c.members, child),
            NodeKind::Method(m) => clear(&mut m.body, child),
            NodeKind::Field(f) => clear(&mut f.init, child),
            NodeKind::Block(b) => remove_from(&mut b.statements, child),
            NodeKind::VarDecl(v) => clear(&mut v.init, child),
            NodeKind::Call(c) => clear(&mut c.receiver, child) || remove_from(&mut c.args, child),
            NodeKind::New(n) => remove_from(&mut n.args, child) || clear(&mut n.body, child),
            NodeKind::Opaque(o) => {
                let before = o.pieces.len();
                o.pieces.retain(|p| *p != Piece::Node(child));
                o.pieces.len() != before
            }
            NodeKind::Import(_) | NodeKind::Reference(_) => false,
        }
    }
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Source range; `None` for synthesized nodes.
    pub span: Option<Span>,
}

/// Where a node goes relative to an existing node or container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Before(NodeId),
    After(NodeId),
    /// First position of a class, block, method body or unit.
    Start(NodeId),
    /// Last position of a class, block, method body or unit.
    End(NodeId),
}

/// The syntax tree of one source unit.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: PathBuf,
    nodes: Vec<Node>,
    root: NodeId,
}

macro_rules! typed_accessors {
    ($($get:ident $(, $get_mut:ident)?: $variant:ident => $ty:ty;)*) => {
        $(
            /// Returns the node's payload if it has this variant.
            pub fn $get(&self, id: NodeId) -> Option<&$ty> {
                match &self.node(id)?.kind {
                    NodeKind::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            $(
                pub(crate) fn $get_mut(&mut self, id: NodeId) -> Option<&mut $ty> {
                    match &mut self.nodes.get_mut(id.index())?.kind {
                        NodeKind::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )?
        )*
    };
}

impl SyntaxTree {
    /// Creates an empty tree for the given unit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            nodes: vec![Node {
                kind: NodeKind::Unit(Unit::default()),
                parent: None,
                span: None,
            }],
            root: NodeId(0),
        }
    }

    /// Path of the source unit.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The unit root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true when the arena only holds the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Looks up a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Looks up a node's payload.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    /// Navigational parent link.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// The unit payload of the root.
    pub fn unit(&self) -> &Unit {
        match &self.nodes[self.root.index()].kind {
            NodeKind::Unit(u) => u,
            _ => unreachable!("root is always a unit"),
        }
    }

    pub(crate) fn unit_mut(&mut self) -> &mut Unit {
        match &mut self.nodes[self.root.index()].kind {
            NodeKind::Unit(u) => u,
            _ => unreachable!("root is always a unit"),
        }
    }

    typed_accessors! {
        class, class_mut: Class => ClassDecl;
        method, method_mut: Method => MethodDecl;
        field, field_mut: Field => FieldDecl;
        block, block_mut: Block => Block;
        var_decl, var_decl_mut: VarDecl => VarDecl;
        call, call_mut: Call => CallExpr;
        new_expr, new_expr_mut: New => NewExpr;
        name_ref: Reference => NameRef;
        opaque, opaque_mut: Opaque => Opaque;
        import: Import => Import;
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>, span: Option<Span>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, parent, span });
        id
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> Option<&mut NodeKind> {
        self.nodes.get_mut(id.index()).map(|n| &mut n.kind)
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(id.index()) {
            node.parent = parent;
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// Returns true when the node is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while current != self.root {
            let Some(parent) = self.parent(current) else {
                return false;
            };
            let owned = self
                .kind(parent)
                .is_some_and(|k| k.children().contains(&current));
            if !owned {
                return false;
            }
            current = parent;
        }
        true
    }

    /// Returns true when `ancestor` is `id` or one of its ancestors.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Nodes of the subtree rooted at `id`, in preorder.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(kind) = self.kind(current) {
                stack.extend(kind.children().into_iter().rev());
            }
        }
        out
    }

    /// Every attached node, in preorder.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.descendants(self.root)
    }

    /// Nearest class declaration strictly above `id`.
    pub fn enclosing_class(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.class(*a).is_some())
    }

    /// Nearest named class declaration strictly above `id`.
    pub fn enclosing_named_class(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| self.class(*a).is_some_and(|c| !c.is_anonymous()))
    }

    /// Nearest method declaration strictly above `id`.
    pub fn enclosing_method(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.method(*a).is_some())
    }

    /// The class member (`id` itself or an ancestor) whose parent is a class.
    pub fn enclosing_member(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.parent(*n).is_some_and(|p| self.class(p).is_some()))
    }

    /// The statement (`id` itself or an ancestor) whose parent is a block.
    pub fn enclosing_statement(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.parent(*n).is_some_and(|p| self.block(p).is_some()))
    }

    /// All attached class declarations, including anonymous bodies, in preorder.
    pub fn classes(&self) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.class(*id).is_some())
            .collect()
    }

    /// Members of a class, or an empty slice for other nodes.
    pub fn members(&self, class: NodeId) -> &[NodeId] {
        self.class(class).map(|c| c.members.as_slice()).unwrap_or(&[])
    }

    /// Methods and constructors declared directly in a class.
    pub fn methods_of(&self, class: NodeId) -> Vec<NodeId> {
        self.members(class)
            .iter()
            .copied()
            .filter(|m| self.method(*m).is_some())
            .collect()
    }

    /// Fields declared directly in a class.
    pub fn fields_of(&self, class: NodeId) -> Vec<NodeId> {
        self.members(class)
            .iter()
            .copied()
            .filter(|m| self.field(*m).is_some())
            .collect()
    }

    /// First attached named class with the given name.
    pub fn find_class(&self, name: &str) -> Option<NodeId> {
        self.classes()
            .into_iter()
            .find(|id| self.class(*id).and_then(|c| c.name.as_deref()) == Some(name))
    }

    /// First method of `class` with the given name.
    pub fn find_method(&self, class: NodeId, name: &str) -> Option<NodeId> {
        self.methods_of(class)
            .into_iter()
            .find(|m| self.method(*m).is_some_and(|d| d.name == name))
    }

    /// Removes a node from its parent. Returns false if it had none.
    pub(crate) fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        let removed = self
            .kind_mut(parent)
            .is_some_and(|kind| kind.remove_child(id));
        self.set_parent(id, None);
        removed
    }

    /// Replaces the payload of `id`, keeping its identity and position.
    ///
    /// The previous payload is moved to a fresh detached node whose id is
    /// returned, so its children stay addressable.
    pub(crate) fn replace_kind(&mut self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        let node = self.nodes.get_mut(id.index())?;
        let old = std::mem::replace(&mut node.kind, kind);
        let span = node.span.take();
        let children = old.children();
        let retired = self.alloc(old, None, span);
        for child in children {
            self.set_parent(child, Some(retired));
        }
        Some(retired)
    }

    /// Resolves a placement to the owning list container and an index.
    ///
    /// Methods resolve to their body block. Imports go to the unit's import
    /// list, every other node placed in a unit goes to its type list.
    pub(crate) fn resolve_placement(&self, at: Placement, inserting_import: bool) -> Option<(NodeId, usize)> {
        let (container, index) = match at {
            Placement::Before(anchor) | Placement::After(anchor) => {
                let parent = self.parent(anchor)?;
                let list = self.list_of(parent, inserting_import)?;
                let position = list.iter().position(|id| *id == anchor)?;
                let index = if matches!(at, Placement::After(_)) {
                    position + 1
                } else {
                    position
                };
                (parent, index)
            }
            Placement::Start(container) => {
                let container = self.list_container(container)?;
                (container, 0)
            }
            Placement::End(container) => {
                let container = self.list_container(container)?;
                let len = self.list_of(container, inserting_import)?.len();
                (container, len)
            }
        };
        Some((container, index))
    }

    fn list_container(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id)? {
            NodeKind::Method(m) => m.body,
            NodeKind::Class(_) | NodeKind::Block(_) | NodeKind::Unit(_) => Some(id),
            _ => None,
        }
    }

    fn list_of(&self, container: NodeId, imports: bool) -> Option<&Vec<NodeId>> {
        match self.kind(container)? {
            NodeKind::Class(c) => Some(&c.members),
            NodeKind::Block(b) => Some(&b.statements),
            NodeKind::Unit(u) if imports => Some(&u.imports),
            NodeKind::Unit(u) => Some(&u.types),
            _ => None,
        }
    }

    /// Deep-copies the subtree at `node` of `source` into this arena as a
    /// detached subtree and returns its new root.
    pub(crate) fn graft(&mut self, source: &SyntaxTree, node: NodeId) -> Option<NodeId> {
        let mut kind = source.kind(node)?.clone();
        let id = self.alloc(NodeKind::Opaque(Opaque::default()), None, None);
        let mut copied = Vec::new();
        for child in kind.children() {
            let new_child = self.graft(source, child)?;
            self.set_parent(new_child, Some(id));
            copied.push((child, new_child));
        }
        kind.for_each_child_mut(&mut |slot| {
            if let Some((_, new)) = copied.iter().find(|(old, _)| old == slot) {
                *slot = *new;
            }
        });
        *self.kind_mut(id)? = kind;
        Some(id)
    }

    /// Moves the payload of the detached node `replacement` into `target`.
    ///
    /// `target` keeps its id and position; its previous payload is retired
    /// to a detached node.
    pub(crate) fn replace_with(&mut self, target: NodeId, replacement: NodeId) -> Option<NodeId> {
        let placeholder = NodeKind::Opaque(Opaque::default());
        let kind = std::mem::replace(self.kind_mut(replacement)?, placeholder);
        let children = kind.children();
        let retired = self.replace_kind(target, kind)?;
        for child in children {
            self.set_parent(child, Some(target));
        }
        Some(retired)
    }

    /// Inserts a detached node into a list container at `index`.
    pub(crate) fn insert_child(&mut self, container: NodeId, index: usize, child: NodeId) -> bool {
        let is_import = self.import(child).is_some();
        let list = match self.kind_mut(container) {
            Some(NodeKind::Class(c)) => &mut c.members,
            Some(NodeKind::Block(b)) => &mut b.statements,
            Some(NodeKind::Unit(u)) if is_import => &mut u.imports,
            Some(NodeKind::Unit(u)) => &mut u.types,
            _ => return false,
        };
        if index > list.len() {
            return false;
        }
        list.insert(index, child);
        self.set_parent(child, Some(container));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
package com.example;

import android.os.AsyncTask;

public class Loader {
    private int count;

    void start() {
        Download task = new Download();
        task.execute("a");
    }

    class Download extends AsyncTask<String, Integer, String> {
        @Override
        protected String doInBackground(String... urls) {
            return urls[0];
        }
    }
}
"#;

    fn tree() -> SyntaxTree {
        parse(Path::new("Loader.java"), SOURCE).unwrap()
    }

    #[test]
    fn test_navigation_helpers() {
        let tree = tree();
        let loader = tree.find_class("Loader").unwrap();
        let download = tree.find_class("Download").unwrap();

        assert_eq!(tree.enclosing_class(download), Some(loader));
        assert_eq!(tree.fields_of(loader).len(), 1);
        assert!(tree.find_method(loader, "start").is_some());
        assert!(tree.find_method(download, "doInBackground").is_some());
        assert!(tree.is_within(download, loader));
        assert!(tree.is_attached(download));
    }

    #[test]
    fn test_read_only_accessors() {
        let tree = tree();
        let import = tree.unit().imports[0];
        assert_eq!(tree.import(import).map(|i| i.path.as_str()), Some("android.os.AsyncTask"));

        let task = tree
            .preorder()
            .into_iter()
            .filter_map(|id| tree.name_ref(id))
            .find(|r| r.name == "task");
        assert!(task.is_some());
        assert!(tree.name_ref(import).is_none());
    }

    #[test]
    fn test_detach_makes_node_unreachable() {
        let mut tree = tree();
        let download = tree.find_class("Download").unwrap();
        let hook = tree.find_method(download, "doInBackground").unwrap();

        assert!(tree.detach(download));
        assert!(!tree.is_attached(download));
        assert!(!tree.is_attached(hook));
        assert!(tree.find_class("Download").is_none());
    }

    #[test]
    fn test_replace_kind_keeps_identity() {
        let mut tree = tree();
        let loader = tree.find_class("Loader").unwrap();
        let start = tree.find_method(loader, "start").unwrap();
        let body = tree.method(start).unwrap().body.unwrap();
        let statement = tree.block(body).unwrap().statements[1];

        let retired = tree
            .replace_kind(statement, NodeKind::Opaque(Opaque::text("run();")))
            .unwrap();

        assert!(tree.is_attached(statement));
        assert!(!tree.is_attached(retired));
        assert_eq!(print_node(&tree, statement), "run();");
    }

    #[test]
    fn test_resolve_placement_for_method_start() {
        let tree = tree();
        let loader = tree.find_class("Loader").unwrap();
        let start = tree.find_method(loader, "start").unwrap();
        let body = tree.method(start).unwrap().body.unwrap();

        assert_eq!(
            tree.resolve_placement(Placement::Start(start), false),
            Some((body, 0))
        );
        assert_eq!(
            tree.resolve_placement(Placement::End(loader), false),
            Some((loader, 3))
        );
    }

    #[test]
    fn test_import_covers() {
        let single = Import {
            path: "android.os.AsyncTask".to_string(),
            is_static: false,
            on_demand: false,
        };
        let star = Import {
            path: "android.os".to_string(),
            is_static: false,
            on_demand: true,
        };
        assert!(single.covers("android.os.AsyncTask"));
        assert!(star.covers("android.os.AsyncTask"));
        assert!(!star.covers("android.os.sub.Thing"));
    }

    #[test]
    fn test_annotation_name() {
        assert_eq!(annotation_name("@Override"), "Override");
        assert_eq!(annotation_name("@SuppressWarnings(\"unchecked\")"), "SuppressWarnings");
        assert_eq!(annotation_name("@java.lang.Override"), "Override");
    }
}

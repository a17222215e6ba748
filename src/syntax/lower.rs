//! Lowering from the tree-sitter concrete syntax tree into the arena.

use std::path::Path;
use tree_sitter::Node as TsNode;

use super::{
    Block, CallExpr, ClassDecl, FieldDecl, Import, MethodDecl, NameRef, NewExpr, NodeId, NodeKind,
    Opaque, Param, Piece, Span, SyntaxTree, TypeRef, VarDecl,
};
use crate::error::Result;
use crate::lang::{Java, Language};

/// Parses Java source into a [`SyntaxTree`].
pub fn parse(path: &Path, source: &str) -> Result<SyntaxTree> {
    let ts_tree = Java.parse(path, source)?;
    let mut lowerer = Lowerer {
        src: source,
        tree: SyntaxTree::new(path),
    };
    lowerer.unit(ts_tree.root_node());
    Ok(lowerer.tree)
}

/// Syntactic position a generated fragment is parsed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Member,
    Statement,
    Expression,
}

/// Parses generated source in a scratch class and returns the scratch tree
/// with the fragment's root nodes, or `None` when the text does not parse
/// cleanly in that position.
pub fn parse_fragment(kind: FragmentKind, text: &str) -> Option<(SyntaxTree, Vec<NodeId>)> {
    let source = match kind {
        FragmentKind::Member => format!("class __Fragment {{\n{text}\n}}\n"),
        FragmentKind::Statement => {
            format!("class __Fragment {{\nvoid __fragment() {{\n{text}\n}}\n}}\n")
        }
        FragmentKind::Expression => format!(
            "class __Fragment {{\nvoid __fragment() {{\nObject __fragment = {text};\n}}\n}}\n"
        ),
    };
    let tree = parse(Path::new("<fragment>"), &source).ok()?;
    let class_id = tree.unit().types.first().copied()?;
    let class = tree.class(class_id)?;
    if class.malformed {
        return None;
    }
    if kind == FragmentKind::Member {
        let members = class.members.clone();
        return Some((tree, members));
    }

    let method = tree.method(*class.members.first()?)?;
    let statements = tree.block(method.body?)?.statements.clone();
    let roots = match kind {
        FragmentKind::Expression => {
            let init = tree.var_decl(*statements.first()?)?.init?;
            vec![init]
        }
        _ => statements,
    };
    Some((tree, roots))
}

fn is_comment(node: &TsNode) -> bool {
    matches!(node.kind(), "line_comment" | "block_comment")
}

fn span(node: &TsNode) -> Option<Span> {
    Some(Span {
        start: node.start_byte(),
        end: node.end_byte(),
    })
}

fn named_children<'t>(node: &TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn all_children<'t>(node: &TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

struct Lowerer<'s> {
    src: &'s str,
    tree: SyntaxTree,
}

impl<'s> Lowerer<'s> {
    fn text(&self, node: &TsNode) -> &'s str {
        &self.src[node.start_byte()..node.end_byte()]
    }

    fn field_text(&self, node: &TsNode, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| self.text(&n).to_string())
    }

    fn unit(&mut self, root: TsNode) {
        let unit_id = self.tree.root();
        let mut pending: Vec<String> = Vec::new();

        for child in named_children(&root) {
            match child.kind() {
                "line_comment" | "block_comment" => pending.push(self.text(&child).to_string()),
                "package_declaration" => {
                    let name = named_children(&child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| self.text(&n).to_string());
                    let unit = self.tree.unit_mut();
                    unit.header.append(&mut pending);
                    unit.package = name;
                }
                "import_declaration" => {
                    if self.tree.unit().imports.is_empty() && self.tree.unit().package.is_none() {
                        self.tree.unit_mut().header.append(&mut pending);
                    }
                    let id = self.import(&child, unit_id);
                    self.tree.unit_mut().imports.push(id);
                }
                "class_declaration" => {
                    let leading = std::mem::take(&mut pending);
                    let id = self.class(&child, unit_id, leading);
                    self.tree.unit_mut().types.push(id);
                }
                ";" => {}
                _ => {
                    let leading = std::mem::take(&mut pending);
                    let id = self.opaque(&child, unit_id);
                    if let Some(o) = self.tree.opaque_mut(id) {
                        o.leading = leading;
                    }
                    self.tree.unit_mut().types.push(id);
                }
            }
        }

        for comment in pending {
            let id = self
                .tree
                .alloc(NodeKind::Opaque(Opaque::text(comment)), Some(unit_id), None);
            self.tree.unit_mut().types.push(id);
        }
    }

    fn import(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        let children = all_children(node);
        let is_static = children.iter().any(|c| c.kind() == "static");
        let on_demand = children.iter().any(|c| c.kind() == "asterisk");
        let path = children
            .iter()
            .find(|c| matches!(c.kind(), "scoped_identifier" | "identifier"))
            .map(|c| self.text(c).to_string())
            .unwrap_or_default();
        self.tree.alloc(
            NodeKind::Import(Import {
                path,
                is_static,
                on_demand,
            }),
            Some(parent),
            span(node),
        )
    }

    /// Splits a `modifiers` node into annotations and keywords.
    fn modifiers(&self, node: &TsNode) -> (Vec<String>, Vec<String>) {
        let mut annotations = Vec::new();
        let mut keywords = Vec::new();
        let Some(modifiers) = all_children(node)
            .into_iter()
            .find(|c| c.kind() == "modifiers")
        else {
            return (annotations, keywords);
        };
        for child in all_children(&modifiers) {
            match child.kind() {
                "annotation" | "marker_annotation" => {
                    annotations.push(self.text(&child).to_string())
                }
                "line_comment" | "block_comment" => {}
                _ => keywords.push(self.text(&child).to_string()),
            }
        }
        (annotations, keywords)
    }

    fn class(&mut self, node: &TsNode, parent: NodeId, leading: Vec<String>) -> NodeId {
        let (annotations, modifiers) = self.modifiers(node);
        let supertype = node.child_by_field_name("superclass").and_then(|sup| {
            named_children(&sup)
                .into_iter()
                .find(|c| !is_comment(c))
                .map(|ty| TypeRef::new(self.text(&ty)))
        });
        let decl = ClassDecl {
            name: self.field_text(node, "name"),
            leading,
            annotations,
            modifiers,
            type_params: self.field_text(node, "type_parameters"),
            supertype,
            interfaces: self.field_text(node, "interfaces"),
            members: Vec::new(),
            malformed: node.has_error(),
        };
        let id = self
            .tree
            .alloc(NodeKind::Class(decl), Some(parent), span(node));
        if let Some(body) = node.child_by_field_name("body") {
            let members = self.class_body(&body, id);
            if let Some(class) = self.tree.class_mut(id) {
                class.members = members;
            }
        }
        id
    }

    fn anonymous_class(&mut self, body: &TsNode, parent: NodeId, ty: TypeRef) -> NodeId {
        let decl = ClassDecl {
            supertype: Some(ty),
            malformed: body.has_error(),
            ..ClassDecl::default()
        };
        let id = self
            .tree
            .alloc(NodeKind::Class(decl), Some(parent), span(body));
        let members = self.class_body(body, id);
        if let Some(class) = self.tree.class_mut(id) {
            class.members = members;
        }
        id
    }

    fn class_body(&mut self, body: &TsNode, class: NodeId) -> Vec<NodeId> {
        let mut members = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for child in named_children(body) {
            match child.kind() {
                "line_comment" | "block_comment" => pending.push(self.text(&child).to_string()),
                "field_declaration" => {
                    let leading = std::mem::take(&mut pending);
                    members.extend(self.fields(&child, class, leading));
                }
                "method_declaration" | "constructor_declaration" => {
                    let leading = std::mem::take(&mut pending);
                    members.push(self.method(&child, class, leading));
                }
                "class_declaration" => {
                    let leading = std::mem::take(&mut pending);
                    members.push(self.class(&child, class, leading));
                }
                _ => {
                    let leading = std::mem::take(&mut pending);
                    let id = self.opaque(&child, class);
                    if let Some(o) = self.tree.opaque_mut(id) {
                        o.leading = leading;
                    }
                    members.push(id);
                }
            }
        }

        for comment in pending {
            members.push(
                self.tree
                    .alloc(NodeKind::Opaque(Opaque::text(comment)), Some(class), None),
            );
        }
        members
    }

    fn fields(&mut self, node: &TsNode, class: NodeId, leading: Vec<String>) -> Vec<NodeId> {
        let (annotations, modifiers) = self.modifiers(node);
        let ty = self.field_text(node, "type").unwrap_or_default();
        let mut leading = Some(leading);
        let mut ids = Vec::new();

        for declarator in named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
        {
            let dims = self.field_text(&declarator, "dimensions").unwrap_or_default();
            let decl = FieldDecl {
                leading: leading.take().unwrap_or_default(),
                annotations: annotations.clone(),
                modifiers: modifiers.clone(),
                ty: format!("{ty}{dims}"),
                name: self.field_text(&declarator, "name").unwrap_or_default(),
                init: None,
            };
            let id = self
                .tree
                .alloc(NodeKind::Field(decl), Some(class), span(&declarator));
            if let Some(value) = declarator.child_by_field_name("value") {
                let init = self.expr(&value, id);
                if let Some(field) = self.tree.field_mut(id) {
                    field.init = Some(init);
                }
            }
            ids.push(id);
        }
        ids
    }

    fn param(&self, node: &TsNode) -> Param {
        let name_node = match node.kind() {
            "spread_parameter" => named_children(node)
                .into_iter()
                .find(|c| c.kind() == "variable_declarator")
                .and_then(|d| d.child_by_field_name("name")),
            _ => node.child_by_field_name("name"),
        };
        let text = self.text(node).to_string();
        let type_start = all_children(node)
            .into_iter()
            .find(|c| c.kind() == "modifiers")
            .map_or(node.start_byte(), |m| m.end_byte());
        match name_node {
            Some(name) => Param {
                ty: self.src[type_start..name.start_byte()].trim().to_string(),
                name: self.text(&name).to_string(),
                text,
            },
            None => Param {
                ty: text.clone(),
                name: "this".to_string(),
                text,
            },
        }
    }

    fn method(&mut self, node: &TsNode, class: NodeId, leading: Vec<String>) -> NodeId {
        let (annotations, modifiers) = self.modifiers(node);
        let params = node
            .child_by_field_name("parameters")
            .map(|p| {
                named_children(&p)
                    .into_iter()
                    .filter(|c| !is_comment(c))
                    .map(|c| self.param(&c))
                    .collect()
            })
            .unwrap_or_default();
        let throws = all_children(node)
            .into_iter()
            .find(|c| c.kind() == "throws")
            .map(|t| self.text(&t).to_string());
        let return_type = match node.kind() {
            "constructor_declaration" => None,
            _ => {
                let ty = self.field_text(node, "type").unwrap_or_default();
                let dims = self.field_text(node, "dimensions").unwrap_or_default();
                Some(format!("{ty}{dims}"))
            }
        };

        let decl = MethodDecl {
            leading,
            annotations,
            modifiers,
            type_params: self.field_text(node, "type_parameters"),
            return_type,
            name: self.field_text(node, "name").unwrap_or_default(),
            params,
            throws,
            body: None,
        };
        let id = self
            .tree
            .alloc(NodeKind::Method(decl), Some(class), span(node));
        if let Some(body) = node.child_by_field_name("body") {
            let block = self.block(&body, id);
            if let Some(method) = self.tree.method_mut(id) {
                method.body = Some(block);
            }
        }
        id
    }

    /// Lowers `block` and `constructor_body` nodes.
    fn block(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        let id = self
            .tree
            .alloc(NodeKind::Block(Block::default()), Some(parent), span(node));
        let statements = named_children(node)
            .into_iter()
            .map(|child| self.statement(&child, id))
            .collect();
        if let Some(block) = self.tree.block_mut(id) {
            block.statements = statements;
        }
        id
    }

    fn statement(&mut self, node: &TsNode, block: NodeId) -> NodeId {
        match node.kind() {
            "local_variable_declaration" => {
                let declarators: Vec<_> = named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "variable_declarator")
                    .collect();
                match declarators.as_slice() {
                    [declarator] => self.var_decl(node, declarator, block),
                    _ => self.opaque(node, block),
                }
            }
            "class_declaration" => self.class(node, block, Vec::new()),
            _ => self.opaque(node, block),
        }
    }

    fn var_decl(&mut self, node: &TsNode, declarator: &TsNode, block: NodeId) -> NodeId {
        let (annotations, keywords) = self.modifiers(node);
        let ty = self.field_text(node, "type").unwrap_or_default();
        let dims = self.field_text(declarator, "dimensions").unwrap_or_default();
        let decl = VarDecl {
            modifiers: annotations.into_iter().chain(keywords).collect(),
            ty: format!("{ty}{dims}"),
            name: self.field_text(declarator, "name").unwrap_or_default(),
            init: None,
        };
        let id = self
            .tree
            .alloc(NodeKind::VarDecl(decl), Some(block), span(node));
        if let Some(value) = declarator.child_by_field_name("value") {
            let init = self.expr(&value, id);
            if let Some(var) = self.tree.var_decl_mut(id) {
                var.init = Some(init);
            }
        }
        id
    }

    /// Lowers a node in expression position.
    fn expr(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        match node.kind() {
            "method_invocation" => self.call(node, parent),
            "object_creation_expression" if is_plain_new(node) => self.new_expr(node, parent),
            "block" => self.block(node, parent),
            "identifier" | "type_identifier" => self.name_ref(node, parent, false),
            "class_declaration" => self.class(node, parent, Vec::new()),
            _ => self.opaque(node, parent),
        }
    }

    fn name_ref(&mut self, node: &TsNode, parent: NodeId, qualified: bool) -> NodeId {
        let name = NameRef {
            name: self.text(node).to_string(),
            qualified,
        };
        self.tree
            .alloc(NodeKind::Reference(name), Some(parent), span(node))
    }

    fn arguments(&mut self, node: &TsNode, parent: NodeId) -> Vec<NodeId> {
        let Some(args) = node.child_by_field_name("arguments") else {
            return Vec::new();
        };
        named_children(&args)
            .into_iter()
            .filter(|c| !is_comment(c))
            .map(|c| self.expr(&c, parent))
            .collect()
    }

    fn call(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        let id = self.tree.alloc(
            NodeKind::Call(CallExpr::default()),
            Some(parent),
            span(node),
        );
        let receiver = node
            .child_by_field_name("object")
            .map(|obj| self.expr(&obj, id));
        let name = self.field_text(node, "name").unwrap_or_default();
        let args = self.arguments(node, id);
        if let Some(call) = self.tree.call_mut(id) {
            *call = CallExpr {
                receiver,
                name,
                args,
            };
        }
        id
    }

    fn new_expr(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        let ty = TypeRef::new(self.field_text(node, "type").unwrap_or_default());
        let id = self.tree.alloc(
            NodeKind::New(NewExpr {
                ty: ty.clone(),
                args: Vec::new(),
                body: None,
            }),
            Some(parent),
            span(node),
        );
        let args = self.arguments(node, id);
        let body = all_children(node)
            .into_iter()
            .find(|c| c.kind() == "class_body")
            .map(|b| self.anonymous_class(&b, id, ty));
        if let Some(new) = self.tree.new_expr_mut(id) {
            new.args = args;
            new.body = body;
        }
        id
    }

    /// Lowers a node as verbatim text with structured children inline.
    fn opaque(&mut self, node: &TsNode, parent: NodeId) -> NodeId {
        let id = self.tree.alloc(
            NodeKind::Opaque(Opaque::default()),
            Some(parent),
            span(node),
        );
        let mut pieces = Vec::new();
        let mut pos = node.start_byte();
        self.collect(node, id, &mut pieces, &mut pos);
        if pos < node.end_byte() {
            pieces.push(Piece::Text(self.src[pos..node.end_byte()].to_string()));
        }
        if let Some(opaque) = self.tree.opaque_mut(id) {
            opaque.pieces = pieces;
        }
        id
    }

    fn collect(&mut self, node: &TsNode, owner: NodeId, pieces: &mut Vec<Piece>, pos: &mut usize) {
        let children = all_children(node);
        for (index, child) in children.iter().enumerate() {
            let structured = match child.kind() {
                "method_invocation" | "block" | "class_declaration" => true,
                "object_creation_expression" => is_plain_new(child),
                "identifier" | "type_identifier" => true,
                _ => false,
            };
            if !structured {
                if child.child_count() > 0 {
                    self.collect(child, owner, pieces, pos);
                }
                continue;
            }

            if child.start_byte() > *pos {
                pieces.push(Piece::Text(
                    self.src[*pos..child.start_byte()].to_string(),
                ));
            }
            let id = match child.kind() {
                "identifier" | "type_identifier" => {
                    let qualified = is_qualified(node, child, index);
                    self.name_ref(child, owner, qualified)
                }
                _ => self.expr(child, owner),
            };
            pieces.push(Piece::Node(id));
            *pos = child.end_byte();
        }
    }
}

/// True for `new T(..)`; false for qualified `outer.new T(..)` forms.
fn is_plain_new(node: &TsNode) -> bool {
    node.child(0).is_some_and(|c| c.kind() == "new")
}

fn is_qualified(parent: &TsNode, child: &TsNode, index: usize) -> bool {
    match parent.kind() {
        "field_access" => parent
            .child_by_field_name("field")
            .is_some_and(|f| f.id() == child.id()),
        "scoped_identifier" => parent
            .child_by_field_name("name")
            .is_some_and(|n| n.id() == child.id()),
        "scoped_type_identifier" | "method_reference" => index > 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::print_tree;

    fn lower(source: &str) -> SyntaxTree {
        parse(Path::new("Test.java"), source).unwrap()
    }

    #[test]
    fn test_lowers_unit_header() {
        let tree = lower(
            "// License\npackage com.example;\n\nimport java.util.*;\nimport static java.lang.Math.max;\n\nclass A {}\n",
        );
        let unit = tree.unit();
        assert_eq!(unit.header, vec!["// License"]);
        assert_eq!(unit.package.as_deref(), Some("com.example"));
        assert_eq!(unit.imports.len(), 2);

        let star = tree.import(unit.imports[0]).unwrap();
        assert_eq!(star.path, "java.util");
        assert!(star.on_demand);
        let stat = tree.import(unit.imports[1]).unwrap();
        assert!(stat.is_static);
        assert_eq!(stat.path, "java.lang.Math.max");
    }

    #[test]
    fn test_lowers_class_structure() {
        let tree = lower(
            r#"
class Loader extends Base<String> implements Runnable {
    // counter
    private int a, b = 2;

    @Override
    public void run() {
        int x = compute(a);
        helper();
    }

    Loader() { super(); }
}
"#,
        );
        let loader = tree.find_class("Loader").unwrap();
        let class = tree.class(loader).unwrap();
        assert_eq!(class.supertype.as_ref().unwrap().text, "Base<String>");
        assert_eq!(class.interfaces.as_deref(), Some("implements Runnable"));
        assert!(!class.malformed);

        let fields = tree.fields_of(loader);
        assert_eq!(fields.len(), 2);
        let a = tree.field(fields[0]).unwrap();
        assert_eq!(a.leading, vec!["// counter"]);
        assert_eq!(a.modifiers, vec!["private"]);
        let b = tree.field(fields[1]).unwrap();
        assert_eq!(b.name, "b");
        assert!(b.init.is_some());

        let run = tree.method(tree.find_method(loader, "run").unwrap()).unwrap();
        assert!(run.has_annotation("Override"));
        assert_eq!(run.return_type.as_deref(), Some("void"));
        let body = tree.block(run.body.unwrap()).unwrap();
        assert_eq!(body.statements.len(), 2);
        let x = tree.var_decl(body.statements[0]).unwrap();
        assert_eq!((x.ty.as_str(), x.name.as_str()), ("int", "x"));
        let init = tree.call(x.init.unwrap()).unwrap();
        assert_eq!(init.name, "compute");
        assert_eq!(init.args.len(), 1);

        let ctor = tree.method(tree.find_method(loader, "Loader").unwrap()).unwrap();
        assert!(ctor.is_constructor());
    }

    #[test]
    fn test_lowers_varargs_parameter() {
        let tree = lower("class A { String f(final String... urls) { return urls[0]; } }");
        let a = tree.find_class("A").unwrap();
        let f = tree.method(tree.find_method(a, "f").unwrap()).unwrap();
        assert_eq!(f.params.len(), 1);
        assert_eq!(f.params[0].name, "urls");
        assert_eq!(f.params[0].ty, "String...");
        assert_eq!(f.params[0].text, "final String... urls");
    }

    #[test]
    fn test_lowers_anonymous_class_under_new() {
        let tree = lower(
            "class A { void f() { new Task<String>() { void g() {} }.execute(\"x\"); } }",
        );
        let anonymous: Vec<_> = tree
            .classes()
            .into_iter()
            .filter(|c| tree.class(*c).unwrap().is_anonymous())
            .collect();
        assert_eq!(anonymous.len(), 1);
        let parent = tree.parent(anonymous[0]).unwrap();
        let new = tree.new_expr(parent).unwrap();
        assert_eq!(new.ty.simple_name(), "Task");
        assert_eq!(
            tree.class(anonymous[0]).unwrap().supertype.as_ref().unwrap().text,
            "Task<String>"
        );
        let call = tree.call(tree.parent(parent).unwrap()).unwrap();
        assert_eq!(call.name, "execute");
    }

    #[test]
    fn test_qualified_names_are_flagged() {
        let tree = lower("class A { void f() { int n = this.count + other.count + count; } }");
        let refs: Vec<_> = tree
            .preorder()
            .into_iter()
            .filter_map(|id| tree.name_ref(id))
            .filter(|r| r.name == "count")
            .map(|r| r.qualified)
            .collect();
        assert_eq!(refs, vec![true, true, false]);
    }

    #[test]
    fn test_flags_malformed_class() {
        let tree = lower("class A extends B { void f() { int x = ; } }");
        let a = tree.find_class("A").unwrap();
        assert!(tree.class(a).unwrap().malformed);
        let ok = lower("class A extends B { void f() { int x = 1; } }");
        assert!(!ok.class(ok.find_class("A").unwrap()).unwrap().malformed);
    }

    #[test]
    fn test_parse_fragment_positions() {
        let (tree, roots) = parse_fragment(FragmentKind::Statement, "a();\nint b = 2;").unwrap();
        assert_eq!(roots.len(), 2);
        assert!(tree.var_decl(roots[1]).is_some());

        let (tree, roots) = parse_fragment(FragmentKind::Expression, "emitter.onNext(x)").unwrap();
        assert_eq!(tree.call(roots[0]).unwrap().name, "onNext");

        let (tree, roots) =
            parse_fragment(FragmentKind::Member, "private int count = 0;").unwrap();
        assert_eq!(tree.field(roots[0]).unwrap().name, "count");

        assert!(parse_fragment(FragmentKind::Statement, "if (").is_none());
    }

    #[test]
    fn test_print_round_trip_keeps_code() {
        let source = "class A {\n    void f() {\n        if (ready) {\n            go(1);\n        } else {\n            stop();\n        }\n    }\n}\n";
        let tree = lower(source);
        assert_eq!(print_tree(&tree), source);
    }
}

//! Renders a syntax tree back to Java source.

use super::{NodeId, NodeKind, Piece, SyntaxTree};

const INDENT: &str = "    ";

/// Prints a whole unit.
pub fn print_tree(tree: &SyntaxTree) -> String {
    let mut printer = Printer::new(tree);
    printer.unit();
    printer.finish()
}

/// Prints one node at indentation level zero.
pub fn print_node(tree: &SyntaxTree, id: NodeId) -> String {
    let mut printer = Printer::new(tree);
    printer.node(id);
    printer.finish()
}

/// Java pretty printer over the arena.
pub struct Printer<'t> {
    tree: &'t SyntaxTree,
    out: String,
    level: usize,
}

impl<'t> Printer<'t> {
    pub fn new(tree: &'t SyntaxTree) -> Self {
        Self {
            tree,
            out: String::new(),
            level: 0,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.level {
            self.out.push_str(INDENT);
        }
    }

    fn lines(&mut self, lines: &[String]) {
        for line in lines {
            self.out.push_str(line);
            self.newline();
        }
    }

    fn words(&mut self, words: &[String]) {
        for word in words {
            self.out.push_str(word);
            self.out.push(' ');
        }
    }

    fn unit(&mut self) {
        let tree = self.tree;
        let unit = tree.unit();
        for line in &unit.header {
            self.out.push_str(line);
            self.out.push('\n');
        }
        if let Some(package) = &unit.package {
            self.out.push_str(&format!("package {package};\n\n"));
        }
        let imports: Vec<_> = unit.imports.clone();
        for import in &imports {
            self.node(*import);
            self.out.push('\n');
        }
        if !imports.is_empty() {
            self.out.push('\n');
        }
        let types = unit.types.clone();
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.node(*ty);
            self.out.push('\n');
        }
    }

    fn node(&mut self, id: NodeId) {
        let tree = self.tree;
        let Some(kind) = tree.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Unit(_) => self.unit(),
            NodeKind::Import(import) => {
                self.out.push_str("import ");
                if import.is_static {
                    self.out.push_str("static ");
                }
                self.out.push_str(&import.path);
                if import.on_demand {
                    self.out.push_str(".*");
                }
                self.out.push(';');
            }
            NodeKind::Class(class) => {
                if let Some(name) = &class.name {
                    self.lines(&class.leading);
                    self.lines(&class.annotations);
                    self.words(&class.modifiers);
                    self.out.push_str("class ");
                    self.out.push_str(name);
                    if let Some(tp) = &class.type_params {
                        self.out.push_str(tp);
                    }
                    if let Some(sup) = &class.supertype {
                        self.out.push_str(" extends ");
                        self.out.push_str(&sup.text);
                    }
                    if let Some(interfaces) = &class.interfaces {
                        self.out.push(' ');
                        self.out.push_str(interfaces);
                    }
                    self.out.push(' ');
                }
                let members = class.members.clone();
                self.class_body(&members);
            }
            NodeKind::Method(method) => {
                self.lines(&method.leading);
                self.lines(&method.annotations);
                self.words(&method.modifiers);
                if let Some(tp) = &method.type_params {
                    self.out.push_str(tp);
                    self.out.push(' ');
                }
                if let Some(ret) = &method.return_type {
                    self.out.push_str(ret);
                    self.out.push(' ');
                }
                self.out.push_str(&method.name);
                self.out.push('(');
                let params: Vec<&str> = method.params.iter().map(|p| p.text.as_str()).collect();
                self.out.push_str(&params.join(", "));
                self.out.push(')');
                if let Some(throws) = &method.throws {
                    self.out.push(' ');
                    self.out.push_str(throws);
                }
                match method.body {
                    Some(body) => {
                        self.out.push(' ');
                        self.node(body);
                    }
                    None => self.out.push(';'),
                }
            }
            NodeKind::Field(field) => {
                self.lines(&field.leading);
                self.lines(&field.annotations);
                self.words(&field.modifiers);
                self.out.push_str(&field.ty);
                self.out.push(' ');
                self.out.push_str(&field.name);
                if let Some(init) = field.init {
                    self.out.push_str(" = ");
                    self.node(init);
                }
                self.out.push(';');
            }
            NodeKind::Block(block) => {
                if block.statements.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                let statements = block.statements.clone();
                self.out.push('{');
                self.level += 1;
                for statement in statements {
                    self.newline();
                    self.node(statement);
                }
                self.level -= 1;
                self.newline();
                self.out.push('}');
            }
            NodeKind::VarDecl(var) => {
                self.words(&var.modifiers);
                self.out.push_str(&var.ty);
                self.out.push(' ');
                self.out.push_str(&var.name);
                if let Some(init) = var.init {
                    self.out.push_str(" = ");
                    self.node(init);
                }
                self.out.push(';');
            }
            NodeKind::Call(call) => {
                if let Some(receiver) = call.receiver {
                    self.node(receiver);
                    self.out.push('.');
                }
                self.out.push_str(&call.name);
                let args = call.args.clone();
                self.arguments(&args);
            }
            NodeKind::New(new) => {
                self.out.push_str("new ");
                self.out.push_str(&new.ty.text);
                let args = new.args.clone();
                let body = new.body;
                self.arguments(&args);
                if let Some(body) = body {
                    self.out.push(' ');
                    self.node(body);
                }
            }
            NodeKind::Reference(name) => self.out.push_str(&name.name),
            NodeKind::Opaque(opaque) => {
                self.lines(&opaque.leading);
                for piece in &opaque.pieces {
                    match piece {
                        Piece::Text(text) => self.out.push_str(text),
                        Piece::Node(child) => self.node(*child),
                    }
                }
            }
        }
    }

    fn arguments(&mut self, args: &[NodeId]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.node(*arg);
        }
        self.out.push(')');
    }

    fn class_body(&mut self, members: &[NodeId]) {
        self.out.push('{');
        self.level += 1;
        let mut previous_field = false;
        for (i, member) in members.iter().enumerate() {
            let is_field = self.tree.field(*member).is_some();
            if i > 0 && !(is_field && previous_field) {
                self.out.push('\n');
            }
            self.newline();
            self.node(*member);
            previous_field = is_field;
        }
        self.level -= 1;
        self.newline();
        self.out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use std::path::Path;

    #[test]
    fn test_prints_normalized_class() {
        let source = r#"package a;
import java.util.List;
public class A extends B implements C {
  private int x;
  private int y = 1;
  @Override
  public   void f(int n) throws Exception { g(n); }
  A() {}
}"#;
        let tree = parse(Path::new("A.java"), source).unwrap();
        let expected = "package a;\n\nimport java.util.List;\n\npublic class A extends B implements C {\n    private int x;\n    private int y = 1;\n\n    @Override\n    public void f(int n) throws Exception {\n        g(n);\n    }\n\n    A() {}\n}\n";
        assert_eq!(print_tree(&tree), expected);
    }

    #[test]
    fn test_prints_anonymous_body_inline() {
        let source = "class A {\n    void f() {\n        run(new R() {\n            void g() {}\n        });\n    }\n}\n";
        let tree = parse(Path::new("A.java"), source).unwrap();
        assert_eq!(print_tree(&tree), source);
    }
}

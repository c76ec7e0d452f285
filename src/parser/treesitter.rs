use std::cell::RefCell;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use crate::graph::node::{Location, PROP_EXTENDS, PROP_IMPLEMENTS, Symbol, SymbolKind};

use super::SymbolExtractor;
use super::symbols::LexicalExtractor;

// Thread-local Parser instances, one per rayon worker thread.
thread_local! {
    static PARSER_TS: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .expect("typescript grammar");
        p
    });
    static PARSER_TSX: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .expect("tsx grammar");
        p
    });
    static PARSER_JS: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_javascript::LANGUAGE.into())
            .expect("javascript grammar");
        p
    });
}

/// Syntax-tree extractor for TypeScript and JavaScript.
///
/// Other languages, and files the grammar cannot parse at all, go through
/// [`LexicalExtractor`] so the strategy is usable on mixed repositories.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterExtractor;

impl SymbolExtractor for TreeSitterExtractor {
    fn extract_symbols(&self, text: &str, path: &Path) -> Vec<Symbol> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let source = text.as_bytes();
        let tree = match ext {
            "ts" | "mts" | "cts" => PARSER_TS.with(|p| p.borrow_mut().parse(source, None)),
            "tsx" => PARSER_TSX.with(|p| p.borrow_mut().parse(source, None)),
            "js" | "jsx" | "mjs" | "cjs" => PARSER_JS.with(|p| p.borrow_mut().parse(source, None)),
            _ => return LexicalExtractor.extract_symbols(text, path),
        };
        match tree {
            Some(tree) => collect(&tree, source, path),
            None => {
                debug!("tree-sitter returned None for {}", path.display());
                LexicalExtractor.extract_symbols(text, path)
            }
        }
    }
}

fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

fn is_function_value(node: Node) -> bool {
    matches!(
        node.kind(),
        "arrow_function" | "function" | "function_expression" | "generator_function"
    )
}

fn heritage_regexes() -> &'static (Regex, Regex) {
    static RE: OnceLock<(Regex, Regex)> = OnceLock::new();
    RE.get_or_init(|| {
        (
            Regex::new(r"\bextends\s+(?P<t>[A-Za-z_$][\w$.]*)").expect("invalid extends regex"),
            Regex::new(r"\bimplements\s+(?P<t>[^{]+)").expect("invalid implements regex"),
        )
    })
}

struct Collector<'a> {
    source: &'a [u8],
    path: &'a Path,
    symbols: Vec<Symbol>,
}

fn collect(tree: &Tree, source: &[u8], path: &Path) -> Vec<Symbol> {
    let mut collector = Collector {
        source,
        path,
        symbols: Vec::new(),
    };
    collector.visit(tree.root_node(), None, true);
    collector.symbols
}

impl Collector<'_> {
    fn push(&mut self, name_node: Node, kind: SymbolKind) -> usize {
        let pos = name_node.start_position();
        self.symbols.push(Symbol::new(
            node_text(name_node, self.source),
            kind,
            self.path,
            Location::new(pos.row + 1, pos.column + 1),
        ));
        self.symbols.len() - 1
    }

    fn push_member(&mut self, name_node: Node, class: usize) {
        let idx = self.push(name_node, SymbolKind::Method);
        let parent = self.symbols[class].name.clone();
        let name = self.symbols[idx].name.clone();
        self.symbols[idx].parent = Some(parent);
        self.symbols[class].children.push(name);
    }

    fn visit_children(&mut self, node: Node, class: Option<usize>, top_level: bool) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child, class, top_level);
        }
    }

    /// `class` is the enclosing class symbol while walking a `class_body`;
    /// `top_level` holds while still at module (or namespace) scope.
    fn visit(&mut self, node: Node, class: Option<usize>, top_level: bool) {
        match node.kind() {
            "program" => self.visit_children(node, None, true),
            "export_statement" | "lexical_declaration" | "variable_declaration"
            | "expression_statement" | "ambient_declaration" => {
                self.visit_children(node, None, top_level)
            }
            "function_declaration" | "generator_function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push(name, SymbolKind::Function);
                }
                self.visit_children(node, None, false);
            }
            "class_declaration" | "abstract_class_declaration" | "class" => {
                let Some(name) = node.child_by_field_name("name") else {
                    self.visit_children(node, None, false);
                    return;
                };
                let idx = self.push(name, SymbolKind::Class);
                let mut cursor = node.walk();
                let heritage = node
                    .children(&mut cursor)
                    .find(|c| c.kind() == "class_heritage")
                    .map(|c| node_text(c, self.source).to_owned());
                if let Some(heritage) = heritage {
                    let (extends_re, implements_re) = heritage_regexes();
                    if let Some(caps) = extends_re.captures(&heritage) {
                        self.symbols[idx]
                            .properties
                            .insert(PROP_EXTENDS.to_owned(), caps["t"].to_owned());
                    }
                    if let Some(caps) = implements_re.captures(&heritage) {
                        self.symbols[idx]
                            .properties
                            .insert(PROP_IMPLEMENTS.to_owned(), caps["t"].trim().to_owned());
                    }
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, Some(idx), false);
                }
            }
            "interface_declaration" => {
                let Some(name) = node.child_by_field_name("name") else {
                    return;
                };
                let idx = self.push(name, SymbolKind::Interface);
                let mut cursor = node.walk();
                let extends = node
                    .children(&mut cursor)
                    .find(|c| c.kind() == "extends_type_clause")
                    .map(|c| {
                        node_text(c, self.source)
                            .trim_start_matches("extends")
                            .trim()
                            .to_owned()
                    });
                if let Some(extends) = extends.filter(|e| !e.is_empty()) {
                    self.symbols[idx]
                        .properties
                        .insert(PROP_EXTENDS.to_owned(), extends);
                }
            }
            "enum_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push(name, SymbolKind::Enum);
                }
            }
            "internal_module" | "module" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.push(name, SymbolKind::Module);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_children(body, None, true);
                }
            }
            "method_definition" => {
                if let (Some(class), Some(name)) = (class, node.child_by_field_name("name")) {
                    self.push_member(name, class);
                }
                self.visit_children(node, None, false);
            }
            "public_field_definition" | "field_definition" => {
                let value = node
                    .child_by_field_name("value")
                    .or_else(|| node.child_by_field_name("property"));
                let name = node
                    .child_by_field_name("name")
                    .or_else(|| node.child_by_field_name("property"));
                if let (Some(class), Some(name), Some(value)) = (class, name, value)
                    && is_function_value(value)
                {
                    self.push_member(name, class);
                }
                self.visit_children(node, None, false);
            }
            "variable_declarator" => {
                let name = node
                    .child_by_field_name("name")
                    .filter(|n| n.kind() == "identifier");
                let value = node.child_by_field_name("value");
                if let Some(name) = name {
                    match value {
                        Some(v) if is_function_value(v) => {
                            self.push(name, SymbolKind::Function);
                        }
                        _ if top_level => {
                            self.push(name, SymbolKind::Variable);
                        }
                        _ => {}
                    }
                }
                if let Some(value) = value {
                    self.visit(value, None, false);
                }
            }
            "class_body" => self.visit_children(node, class, false),
            _ => self.visit_children(node, None, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(path: &str, text: &str) -> Vec<Symbol> {
        TreeSitterExtractor.extract_symbols(text, Path::new(path))
    }

    fn find<'a>(symbols: &'a [Symbol], name: &str) -> &'a Symbol {
        symbols
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("symbol {name} not found in {symbols:#?}"))
    }

    #[test]
    fn test_typescript_class_with_heritage_and_methods() {
        let text = "\
export class Dog extends Animal implements Pet {
  bark(): void {
    helper();
  }
  run = () => {};
}
";
        let symbols = extract("dog.ts", text);
        let dog = find(&symbols, "Dog");
        assert_eq!(dog.kind, SymbolKind::Class);
        assert_eq!(dog.location, Location::new(1, 14));
        assert_eq!(dog.properties.get(PROP_EXTENDS).map(String::as_str), Some("Animal"));
        assert_eq!(dog.properties.get(PROP_IMPLEMENTS).map(String::as_str), Some("Pet"));
        assert_eq!(dog.children, vec!["bark", "run"]);

        let bark = find(&symbols, "bark");
        assert_eq!(bark.kind, SymbolKind::Method);
        assert_eq!(bark.parent.as_deref(), Some("Dog"));
    }

    #[test]
    fn test_functions_arrows_and_top_level_variables() {
        let text = "\
function foo() {
  const local = 1;
}
const bar = (x) => x + 1;
let count = 0;
";
        let symbols = extract("mod.js", text);
        assert_eq!(find(&symbols, "foo").kind, SymbolKind::Function);
        assert_eq!(find(&symbols, "bar").kind, SymbolKind::Function);
        assert_eq!(find(&symbols, "count").kind, SymbolKind::Variable);
        assert!(!symbols.iter().any(|s| s.name == "local"));
    }

    #[test]
    fn test_interface_and_enum() {
        let symbols = extract("types.ts", "interface Shape extends Base {}\nenum Color { Red }\n");
        let shape = find(&symbols, "Shape");
        assert_eq!(shape.kind, SymbolKind::Interface);
        assert_eq!(shape.properties.get(PROP_EXTENDS).map(String::as_str), Some("Base"));
        assert_eq!(find(&symbols, "Color").kind, SymbolKind::Enum);
    }

    #[test]
    fn test_other_languages_use_lexical_extraction() {
        let symbols = extract("app.py", "def main():\n    pass\n");
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "main");
        assert_eq!(symbols[0].kind, SymbolKind::Function);
    }
}

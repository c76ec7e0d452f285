use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::graph::node::{Location, PROP_EXTENDS, PROP_IMPLEMENTS, Symbol, SymbolKind};
use crate::language::LanguageKind;

use super::SymbolExtractor;
use super::lexer::{SanitizedLine, brace_counts, indent_width, sanitize};

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// What a matching pattern declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Class or struct; opens a member scope.
    Class,
    /// Interface or trait; opens a member scope.
    Interface,
    Enum,
    /// Ruby `module`; opens a member scope in indentation-scoped languages.
    Module,
    /// Brace-delimited namespace whose body counts as top level.
    Namespace,
    /// Function; becomes a method when found inside a member scope.
    Function,
    /// Bare `name(...) {` member declaration, only valid directly inside a class body.
    Method,
    /// Module-scope variable.
    Variable,
    /// Rust `impl` block: a member scope without a symbol of its own.
    ImplBlock,
}

struct Pattern {
    regex: Regex,
    rule: Rule,
}

struct PatternSet {
    patterns: Vec<Pattern>,
    /// Functions only count at top level or directly in a class body.
    strict_scopes: bool,
}

fn compile(specs: &[(&str, Rule)], strict_scopes: bool) -> PatternSet {
    PatternSet {
        patterns: specs
            .iter()
            .map(|(re, rule)| Pattern {
                regex: Regex::new(re).expect("invalid symbol pattern"),
                rule: *rule,
            })
            .collect(),
        strict_scopes,
    }
}

const JS_PATTERNS: &[(&str, Rule)] = &[
    (
        r"\bclass\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+(?P<extends>[A-Za-z_$][\w$.]*)(?:\s*<[^>{]*>)?)?(?:\s+implements\s+(?P<implements>[^{]+))?",
        Rule::Class,
    ),
    (
        r"\binterface\s+(?P<name>[A-Za-z_$][\w$]*)(?:\s*<[^>{]*>)?(?:\s+extends\s+(?P<extends>[^{]+))?",
        Rule::Interface,
    ),
    (r"\benum\s+(?P<name>[A-Za-z_$][\w$]*)", Rule::Enum),
    (
        r"^\s*(?:export\s+)?(?:declare\s+)?(?:namespace|module)\s+(?P<name>[A-Za-z_$][\w$.]*)\s*\{",
        Rule::Namespace,
    ),
    (
        r"\bfunction\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(",
        Rule::Function,
    ),
    (
        r"\b(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>)",
        Rule::Function,
    ),
    (
        r"^\s*(?:(?:public|private|protected|static|readonly)\s+)*(?P<name>[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*(?::[^=]+)?=>",
        Rule::Method,
    ),
    (
        r"^\s*(?:(?:public|private|protected|static|async|override|readonly|abstract|get|set)\s+)*\*?(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>()]*>)?\s*\(",
        Rule::Method,
    ),
    (
        r"^\s*(?:export\s+)?(?:const|let|var)\s+(?P<name>[A-Za-z_$][\w$]*)",
        Rule::Variable,
    ),
];

const PYTHON_PATTERNS: &[(&str, Rule)] = &[
    (
        r"^\s*class\s+(?P<name>[A-Za-z_]\w*)\s*(?:\((?P<extends>[^)]*)\))?\s*:",
        Rule::Class,
    ),
    (
        r"^\s*(?:async\s+)?def\s+(?P<name>[A-Za-z_]\w*)\s*\(",
        Rule::Function,
    ),
    (r"^(?P<name>[A-Za-z_]\w*)\s*(?::[^=]+)?=[^=]", Rule::Variable),
];

const RUBY_PATTERNS: &[(&str, Rule)] = &[
    (
        r"^\s*class\s+(?P<name>[A-Z]\w*(?:::[A-Z]\w*)*)(?:\s*<\s*(?P<extends>[A-Z][\w:]*))?",
        Rule::Class,
    ),
    (r"^\s*module\s+(?P<name>[A-Z][\w:]*)", Rule::Module),
    (
        r"^\s*def\s+(?:self\.)?(?P<name>[A-Za-z_]\w*[?!=]?)",
        Rule::Function,
    ),
    (r"^(?P<name>[A-Z][A-Z0-9_]*)\s*=[^=]", Rule::Variable),
];

const JAVA_PATTERNS: &[(&str, Rule)] = &[
    (
        r"\b(?:class|record)\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>{]*>)?(?:\s*\([^)]*\))?(?:\s+extends\s+(?P<extends>[A-Za-z_][\w.]*)(?:\s*<[^>{]*>)?)?(?:\s+implements\s+(?P<implements>[^{]+))?",
        Rule::Class,
    ),
    (
        r"\binterface\s+(?P<name>[A-Za-z_]\w*)(?:\s*<[^>{]*>)?(?:\s+extends\s+(?P<extends>[^{]+))?",
        Rule::Interface,
    ),
    (r"\benum\s+(?P<name>[A-Za-z_]\w*)", Rule::Enum),
    (
        r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default|strictfp)\s+)*(?:<[^>]+>\s+)?(?:[\w.$]+(?:<[^()]*>)?(?:\[\])*\s+)?(?P<name>[A-Za-z_$][\w$]*)\s*\(",
        Rule::Method,
    ),
];

const C_PATTERNS: &[(&str, Rule)] = &[
    (
        r"^\s*(?:typedef\s+)?(?:class|struct|union)\s+(?P<name>[A-Za-z_]\w*)\s*(?:final\s*)?(?::\s*(?:(?:public|protected|private|virtual)\s+)*(?P<extends>[\w:]+)(?:<[^>{]*>)?(?:\s*,[^{]*)?)?\s*\{?\s*$",
        Rule::Class,
    ),
    (
        r"^\s*(?:typedef\s+)?enum\s+(?:class\s+|struct\s+)?(?P<name>[A-Za-z_]\w*)",
        Rule::Enum,
    ),
    (
        r"^\s*namespace\s+(?P<name>[A-Za-z_][\w:]*)\s*\{",
        Rule::Namespace,
    ),
    (
        r"^\s*(?:(?:static|inline|extern|virtual|explicit|constexpr|friend|unsigned|signed|const|struct)\s+)*(?:[A-Za-z_][\w:]*(?:<[^()]*>)?[\s*&]+)*(?P<name>~?[A-Za-z_][\w:~]*)\s*\(",
        Rule::Function,
    ),
];

const GO_PATTERNS: &[(&str, Rule)] = &[
    (
        r"^func\s+\(\s*(?:[A-Za-z_]\w*\s+)?\*?(?P<parent>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s*\)\s*(?P<name>[A-Za-z_]\w*)\s*[\[(]",
        Rule::Function,
    ),
    (r"^func\s+(?P<name>[A-Za-z_]\w*)\s*[\[(]", Rule::Function),
    (
        r"^type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s+struct\b",
        Rule::Class,
    ),
    (
        r"^type\s+(?P<name>[A-Za-z_]\w*)(?:\[[^\]]*\])?\s+interface\b",
        Rule::Interface,
    ),
    (r"^(?:var|const)\s+(?P<name>[A-Za-z_]\w*)", Rule::Variable),
];

const RUST_PATTERNS: &[(&str, Rule)] = &[
    (
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+(?P<name>[A-Za-z_]\w*)"#,
        Rule::Function,
    ),
    (
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(?P<name>[A-Za-z_]\w*)",
        Rule::Class,
    ),
    (
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(?P<name>[A-Za-z_]\w*)",
        Rule::Enum,
    ),
    (
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?trait\s+(?P<name>[A-Za-z_]\w*)(?:<[^>]*>)?(?:\s*:\s*(?P<extends>[^{]+))?",
        Rule::Interface,
    ),
    (
        r"^\s*(?:unsafe\s+)?impl(?:<[^>]*>)?\s+(?:(?P<implements>[\w:]+)(?:<[^>]*>)?\s+for\s+)?(?P<name>[A-Za-z_][\w:]*)",
        Rule::ImplBlock,
    ),
    (
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<name>[A-Za-z_]\w*)\s*\{",
        Rule::Namespace,
    ),
    (
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:static|const)\s+(?:mut\s+)?(?P<name>[A-Z_][A-Z0-9_]*)\s*:",
        Rule::Variable,
    ),
];

static JS_SET: OnceLock<PatternSet> = OnceLock::new();
static PYTHON_SET: OnceLock<PatternSet> = OnceLock::new();
static RUBY_SET: OnceLock<PatternSet> = OnceLock::new();
static JAVA_SET: OnceLock<PatternSet> = OnceLock::new();
static C_SET: OnceLock<PatternSet> = OnceLock::new();
static GO_SET: OnceLock<PatternSet> = OnceLock::new();
static RUST_SET: OnceLock<PatternSet> = OnceLock::new();

fn pattern_set(language: LanguageKind) -> &'static PatternSet {
    match language {
        LanguageKind::TypeScript | LanguageKind::JavaScript | LanguageKind::Unknown => {
            JS_SET.get_or_init(|| compile(JS_PATTERNS, false))
        }
        LanguageKind::Python => PYTHON_SET.get_or_init(|| compile(PYTHON_PATTERNS, false)),
        LanguageKind::Ruby => RUBY_SET.get_or_init(|| compile(RUBY_PATTERNS, false)),
        LanguageKind::Java => JAVA_SET.get_or_init(|| compile(JAVA_PATTERNS, true)),
        LanguageKind::C | LanguageKind::Cpp => C_SET.get_or_init(|| compile(C_PATTERNS, true)),
        LanguageKind::Go => GO_SET.get_or_init(|| compile(GO_PATTERNS, true)),
        LanguageKind::Rust => RUST_SET.get_or_init(|| compile(RUST_PATTERNS, true)),
    }
}

/// Words that look like `name(` but never name a declaration.
const NON_DECLARATION_WORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "else", "do", "try", "new",
    "typeof", "delete", "throw", "case", "in", "of", "await", "yield", "super", "this", "sizeof",
    "elif", "with", "not", "and", "or", "def", "class", "import", "from", "export", "const",
    "let", "var", "match", "loop", "extends", "implements", "foreach", "using", "defer", "go",
];

fn is_non_declaration(name: &str) -> bool {
    NON_DECLARATION_WORDS.contains(&name)
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Regex-based extractor that works for every supported language.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalExtractor;

impl SymbolExtractor for LexicalExtractor {
    fn extract_symbols(&self, text: &str, path: &Path) -> Vec<Symbol> {
        let language = LanguageKind::from_path(path);
        let lines = sanitize(text, language);
        let set = pattern_set(language);
        if language.is_indent_scoped() {
            scan_indented(&lines, path, set)
        } else {
            scan_braced(&lines, path, set)
        }
    }
}

/// An open class/interface/impl body.
struct MemberScope {
    name: String,
    /// Index into the output of the symbol that opened the scope, if any.
    symbol: Option<usize>,
    /// Brace depth (or indentation) of the declaring line.
    level: usize,
    opened: bool,
    /// Indentation of the first body line (indentation-scoped languages only).
    body_indent: Option<usize>,
}

/// A match resolved to its name, position and captured extras.
struct Found<'c> {
    rule: Rule,
    name: String,
    column: usize,
    caps: Captures<'c>,
}

/// Apply every pattern of `set` to one line, dropping repeated names on the line.
fn matches_on_line<'c>(set: &PatternSet, code: &'c str) -> Vec<Found<'c>> {
    let mut found: Vec<Found<'c>> = Vec::new();
    for pattern in &set.patterns {
        for caps in pattern.regex.captures_iter(code) {
            let Some(name_m) = caps.name("name") else {
                continue;
            };
            let name = name_m.as_str().to_owned();
            if is_non_declaration(&name) || found.iter().any(|f| f.name == name) {
                continue;
            }
            found.push(Found {
                rule: pattern.rule,
                column: name_m.start() + 1,
                name,
                caps,
            });
        }
    }
    found
}

fn capture(caps: &Captures, group: &str) -> Option<String> {
    caps.name(group)
        .map(|m| m.as_str().trim().trim_end_matches('{').trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn declared(found: &Found, kind: SymbolKind, path: &Path, line: usize) -> Symbol {
    let mut symbol = Symbol::new(found.name.clone(), kind, path, Location::new(line, found.column));
    if let Some(extends) = capture(&found.caps, "extends") {
        symbol = symbol.with_property(PROP_EXTENDS, extends);
    }
    if matches!(found.rule, Rule::Class | Rule::Interface)
        && let Some(implements) = capture(&found.caps, "implements")
    {
        symbol = symbol.with_property(PROP_IMPLEMENTS, implements);
    }
    symbol
}

/// Member declarations must look like a signature, not a call statement.
fn looks_like_member_signature(code: &str, found: &Found) -> bool {
    let trimmed = code.trim_end();
    if trimmed.ends_with(';') {
        return false;
    }
    let prefix = &code[..found.column - 1];
    !prefix
        .split_whitespace()
        .any(|w| matches!(w, "new" | "return" | "throw" | "else" | "await" | "case"))
}

fn add_child(symbols: &mut [Symbol], scopes: &[MemberScope], child: &str) {
    if let Some(idx) = scopes.last().and_then(|s| s.symbol) {
        symbols[idx].children.push(child.to_owned());
    }
}

/// Scan a brace-delimited language, tracking brace depth for scopes.
fn scan_braced(lines: &[SanitizedLine], path: &Path, set: &PatternSet) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut depth = 0usize;
    let mut scopes: Vec<MemberScope> = Vec::new();
    // (depth of the declaring line, opened)
    let mut namespaces: Vec<(usize, bool)> = Vec::new();

    for line in lines {
        if line.is_blank_code() {
            continue;
        }

        while scopes.last().is_some_and(|s| s.opened && depth <= s.level) {
            scopes.pop();
        }
        while namespaces
            .last()
            .is_some_and(|&(level, opened)| opened && depth <= level)
        {
            namespaces.pop();
        }

        let depth_before = depth;
        let top_level = namespaces.len();
        let current = scopes.last().filter(|s| depth_before > s.level);
        let in_body = current.is_some_and(|s| depth_before == s.level + 1);
        let current_name = current.map(|s| s.name.clone());

        for found in matches_on_line(set, &line.code) {
            match found.rule {
                Rule::Class | Rule::Interface => {
                    let kind = if found.rule == Rule::Class {
                        SymbolKind::Class
                    } else {
                        SymbolKind::Interface
                    };
                    let mut symbol = declared(&found, kind, path, line.number);
                    if let Some(outer) = &current_name {
                        symbol = symbol.with_parent(outer.clone());
                        add_child(&mut symbols, &scopes, &found.name);
                    }
                    symbols.push(symbol);
                    scopes.push(MemberScope {
                        name: found.name.clone(),
                        symbol: Some(symbols.len() - 1),
                        level: depth_before,
                        opened: false,
                        body_indent: None,
                    });
                }
                Rule::ImplBlock => {
                    let type_name = found
                        .name
                        .rsplit("::")
                        .next()
                        .unwrap_or(&found.name)
                        .to_owned();
                    if let Some(trait_name) = capture(&found.caps, "implements")
                        && let Some(target) = symbols
                            .iter_mut()
                            .rev()
                            .find(|s| s.name == type_name && s.parent.is_none())
                    {
                        let merged = match target.properties.get(PROP_IMPLEMENTS) {
                            Some(existing) => format!("{existing}, {trait_name}"),
                            None => trait_name,
                        };
                        target.properties.insert(PROP_IMPLEMENTS.to_owned(), merged);
                    }
                    scopes.push(MemberScope {
                        name: type_name,
                        symbol: None,
                        level: depth_before,
                        opened: false,
                        body_indent: None,
                    });
                }
                Rule::Enum => {
                    let mut symbol = declared(&found, SymbolKind::Enum, path, line.number);
                    if let Some(outer) = &current_name {
                        symbol = symbol.with_parent(outer.clone());
                        add_child(&mut symbols, &scopes, &found.name);
                    }
                    symbols.push(symbol);
                }
                Rule::Namespace | Rule::Module => {
                    symbols.push(declared(&found, SymbolKind::Module, path, line.number));
                    namespaces.push((depth_before, false));
                }
                Rule::Function => {
                    if let Some(parent) = capture(&found.caps, "parent") {
                        symbols.push(
                            declared(&found, SymbolKind::Method, path, line.number)
                                .with_parent(parent),
                        );
                    } else if let Some((parent, method)) = found.name.rsplit_once("::") {
                        if set.strict_scopes && depth_before != top_level {
                            continue;
                        }
                        let mut symbol = declared(&found, SymbolKind::Method, path, line.number)
                            .with_parent(parent.rsplit("::").next().unwrap_or(parent));
                        symbol.location.column += parent.len() + 2;
                        symbol.name = method.to_owned();
                        symbols.push(symbol);
                    } else if let Some(parent) = &current_name {
                        if set.strict_scopes && !in_body {
                            continue;
                        }
                        symbols.push(
                            declared(&found, SymbolKind::Method, path, line.number)
                                .with_parent(parent.clone()),
                        );
                        add_child(&mut symbols, &scopes, &found.name);
                    } else {
                        if set.strict_scopes && depth_before != top_level {
                            continue;
                        }
                        symbols.push(declared(&found, SymbolKind::Function, path, line.number));
                    }
                }
                Rule::Method => {
                    let Some(parent) = &current_name else {
                        continue;
                    };
                    if !in_body || !looks_like_member_signature(&line.code, &found) {
                        continue;
                    }
                    symbols.push(
                        declared(&found, SymbolKind::Method, path, line.number)
                            .with_parent(parent.clone()),
                    );
                    add_child(&mut symbols, &scopes, &found.name);
                }
                Rule::Variable => {
                    if current_name.is_some() || depth_before != top_level {
                        continue;
                    }
                    symbols.push(declared(&found, SymbolKind::Variable, path, line.number));
                }
            }
        }

        let (open, close) = brace_counts(&line.code);
        depth = (depth + open).saturating_sub(close);

        let ends_statement = line.code.trim_end().ends_with(';');
        for scope in scopes.iter_mut().filter(|s| !s.opened) {
            if open > 0 || depth > scope.level {
                scope.opened = true;
            }
        }
        // A declaration that ends in `;` without a body (forward declaration) has no scope.
        while scopes.last().is_some_and(|s| !s.opened && ends_statement) {
            scopes.pop();
        }
        for ns in namespaces.iter_mut().filter(|(_, opened)| !opened) {
            if open > 0 || depth > ns.0 {
                ns.1 = true;
            }
        }
    }

    symbols
}

/// Scan an indentation-scoped language (Python, Ruby).
fn scan_indented(lines: &[SanitizedLine], path: &Path, set: &PatternSet) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut scopes: Vec<MemberScope> = Vec::new();

    for line in lines {
        if line.is_blank_code() {
            continue;
        }
        let indent = indent_width(&line.code);

        while scopes.last().is_some_and(|s| indent <= s.level) {
            scopes.pop();
        }
        if let Some(scope) = scopes.last_mut()
            && scope.body_indent.is_none()
        {
            scope.body_indent = Some(indent);
        }
        let current_name = scopes.last().map(|s| s.name.clone());
        let in_body = scopes
            .last()
            .is_some_and(|s| s.body_indent == Some(indent));

        for found in matches_on_line(set, &line.code) {
            match found.rule {
                Rule::Class | Rule::Interface | Rule::Module => {
                    let kind = match found.rule {
                        Rule::Class => SymbolKind::Class,
                        Rule::Interface => SymbolKind::Interface,
                        _ => SymbolKind::Module,
                    };
                    let mut symbol = declared(&found, kind, path, line.number);
                    if let Some(outer) = &current_name {
                        symbol = symbol.with_parent(outer.clone());
                        add_child(&mut symbols, &scopes, &found.name);
                    }
                    symbols.push(symbol);
                    scopes.push(MemberScope {
                        name: found.name.clone(),
                        symbol: Some(symbols.len() - 1),
                        level: indent,
                        opened: true,
                        body_indent: None,
                    });
                }
                Rule::Function => match &current_name {
                    Some(parent) if in_body => {
                        symbols.push(
                            declared(&found, SymbolKind::Method, path, line.number)
                                .with_parent(parent.clone()),
                        );
                        add_child(&mut symbols, &scopes, &found.name);
                    }
                    _ => symbols.push(declared(&found, SymbolKind::Function, path, line.number)),
                },
                Rule::Variable => {
                    if indent == 0 && current_name.is_none() {
                        symbols.push(declared(&found, SymbolKind::Variable, path, line.number));
                    }
                }
                Rule::Enum => symbols.push(declared(&found, SymbolKind::Enum, path, line.number)),
                Rule::Namespace | Rule::Method | Rule::ImplBlock => {}
            }
        }
    }

    symbols
}

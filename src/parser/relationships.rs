use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::graph::SymbolTable;
use crate::graph::edge::{CallEdge, InheritanceEdge, InheritanceKind};
use crate::graph::node::{Location, PROP_EXTENDS, PROP_IMPLEMENTS};
use crate::source::SourceFile;

use super::lexer::sanitize;

/// Words followed by `(` that are control flow, not calls.
const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "elif", "foreach", "with",
    "sizeof", "typeof", "await",
];

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?P<name>[A-Za-z_$][\w$]*)\s*\(").expect("invalid call regex"))
}

/// Find `identifier(` call sites in one file and resolve them against `table`.
///
/// The caller is the nearest symbol of the same file declared at or before the
/// call line. Identifiers unknown to the table, declaration sites, and
/// self-calls are skipped.
pub fn extract_calls(file: &SourceFile, table: &SymbolTable) -> Vec<CallEdge> {
    let Some(text) = file.text.as_deref() else {
        return Vec::new();
    };

    let declared: HashSet<(usize, usize)> = table
        .in_file(&file.path)
        .iter()
        .map(|&id| {
            let loc = table.get(id).location;
            (loc.line, loc.column)
        })
        .collect();

    let mut edges = Vec::new();
    for line in sanitize(text, file.language) {
        for caps in call_regex().captures_iter(&line.code) {
            let Some(m) = caps.name("name") else {
                continue;
            };
            let name = m.as_str();
            let column = m.start() + 1;
            if CONTROL_KEYWORDS.contains(&name) || !table.contains_name(name) {
                continue;
            }
            if declared.contains(&(line.number, column)) {
                continue;
            }
            let Some(caller_id) = table.enclosing_at(&file.path, line.number) else {
                continue;
            };
            let caller = table.get(caller_id);
            if caller.name == name {
                continue;
            }
            let Some(callee_id) = table.resolve(name, &file.path) else {
                continue;
            };
            edges.push(CallEdge {
                caller: caller.name.clone(),
                callee: name.to_owned(),
                caller_id,
                callee_id,
                file_path: file.path.clone(),
                callee_file: table.get(callee_id).file_path.clone(),
                location: Location::new(line.number, column),
            });
        }
    }
    edges
}

/// Emit one edge per `extends`/`implements` target recorded on a symbol.
pub fn extract_inheritance(table: &SymbolTable) -> Vec<InheritanceEdge> {
    let mut edges = Vec::new();
    for (child_id, symbol) in table.iter() {
        for (key, kind) in [
            (PROP_EXTENDS, InheritanceKind::Extends),
            (PROP_IMPLEMENTS, InheritanceKind::Implements),
        ] {
            let Some(list) = symbol.properties.get(key) else {
                continue;
            };
            for target in split_type_list(list) {
                let parent_id = table.resolve(&target, &symbol.file_path).or_else(|| {
                    let short = last_segment(&target);
                    (short != target)
                        .then(|| table.resolve(short, &symbol.file_path))
                        .flatten()
                });
                edges.push(InheritanceEdge {
                    child: symbol.name.clone(),
                    parent: target,
                    kind,
                    child_file: symbol.file_path.clone(),
                    child_id,
                    parent_id,
                    parent_file: parent_id.map(|id| table.get(id).file_path.clone()),
                });
            }
        }
    }
    edges
}

/// Split a heritage list on top-level `,` and `+`, dropping generic arguments.
///
/// Keyword arguments (`metaclass=Meta`) and Python's implicit `object` base are
/// not types and are dropped.
pub fn split_type_list(list: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in list.chars() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth = depth.saturating_sub(1),
            ',' | '+' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }
    parts.push(current);

    parts
        .into_iter()
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty() && !p.contains('=') && p != "object")
        .collect()
}

fn last_segment(name: &str) -> &str {
    name.rsplit(['.', ':']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{Symbol, SymbolKind};
    use crate::parser::{LexicalExtractor, SymbolExtractor};
    use std::path::Path;

    fn table_for(files: &[SourceFile]) -> SymbolTable {
        SymbolTable::from_symbols(
            files
                .iter()
                .flat_map(|f| LexicalExtractor.extract_symbols(f.text(), &f.path)),
        )
    }

    #[test]
    fn test_cross_file_call() {
        let files = vec![
            SourceFile::from_text("a.ts", "function foo(){ bar(); }"),
            SourceFile::from_text("b.ts", "function bar(){}"),
        ];
        let table = table_for(&files);
        let calls = extract_calls(&files[0], &table);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].caller, "foo");
        assert_eq!(calls[0].callee, "bar");
        assert_eq!(calls[0].callee_file, Path::new("b.ts"));
        assert_eq!(calls[0].location, Location::new(1, 17));
        assert!(extract_calls(&files[1], &table).is_empty());
    }

    #[test]
    fn test_skips_keywords_unknown_names_and_self_calls() {
        let text = "\
function countdown(n) {
  if (n > 0) { countdown(n - 1); }
  console.log(n);
  while (false) {}
}
";
        let files = vec![SourceFile::from_text("r.js", text)];
        let table = table_for(&files);
        assert!(extract_calls(&files[0], &table).is_empty());
    }

    #[test]
    fn test_calls_in_comments_and_strings_are_ignored() {
        let text = "function a() {}\nfunction b() {\n  // a();\n  log('a()');\n}\n";
        let files = vec![SourceFile::from_text("c.ts", text)];
        let table = table_for(&files);
        assert!(extract_calls(&files[0], &table).is_empty());
    }

    #[test]
    fn test_unreadable_file_has_no_calls() {
        let table = SymbolTable::new();
        assert!(extract_calls(&SourceFile::unreadable("x.ts"), &table).is_empty());
    }

    #[test]
    fn test_inheritance_edges_resolve_targets() {
        let table = SymbolTable::from_symbols([
            Symbol::new("Animal", SymbolKind::Class, "animal.ts", Location::new(1, 7)),
            Symbol::new("Dog", SymbolKind::Class, "dog.ts", Location::new(1, 7))
                .with_property(PROP_EXTENDS, "Animal")
                .with_property(PROP_IMPLEMENTS, "Pet, Named<string>"),
        ]);
        let edges = extract_inheritance(&table);
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[0].parent, "Animal");
        assert_eq!(edges[0].kind, InheritanceKind::Extends);
        assert_eq!(edges[0].parent_file.as_deref(), Some(Path::new("animal.ts")));
        assert_eq!(edges[1].parent, "Pet");
        assert_eq!(edges[2].parent, "Named");
        assert!(edges[2].parent_file.is_none());
    }

    #[test]
    fn test_split_type_list() {
        assert_eq!(
            split_type_list("Base, metaclass=Meta"),
            vec!["Base".to_string()]
        );
        assert_eq!(
            split_type_list("Map<K, V>, Debug + Clone"),
            vec!["Map", "Debug", "Clone"]
        );
        assert!(split_type_list("object").is_empty());
    }
}

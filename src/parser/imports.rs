use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::AnalysisError;
use crate::graph::edge::DependencyKind;
use crate::language::LanguageKind;

use super::lexer::sanitize;

/// One import-like statement as written, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// Target as it will be resolved: relative forms start with `./` or `../`.
    pub specifier: String,
    pub kind: DependencyKind,
    /// 1-based line of the statement.
    pub line: usize,
}

struct ImportRegexes {
    js_from: Regex,
    js_side_effect: Regex,
    js_require: Regex,
    js_dynamic: Regex,
    py_from: Regex,
    py_import: Regex,
    java: Regex,
    c_include: Regex,
    rb_require_relative: Regex,
    rb_require: Regex,
    go_single: Regex,
    go_block_open: Regex,
    go_block_entry: Regex,
    rust_mod: Regex,
}

fn regexes() -> &'static ImportRegexes {
    static RE: OnceLock<ImportRegexes> = OnceLock::new();
    RE.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("invalid import regex");
        ImportRegexes {
            js_from: re(r#"\bfrom\s*['"](?P<s>[^'"]*)['"]"#),
            js_side_effect: re(r#"^\s*import\s*['"](?P<s>[^'"]*)['"]"#),
            js_require: re(r#"\brequire\s*\(\s*['"](?P<s>[^'"]*)['"]\s*\)"#),
            js_dynamic: re(r#"\bimport\s*\(\s*['"](?P<s>[^'"]*)['"]\s*\)"#),
            py_from: re(r"^\s*from\s+(?P<s>\.*[\w.]*)\s+import\b"),
            py_import: re(
                r"^\s*import\s+(?P<list>[\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)",
            ),
            java: re(r"^\s*import\s+(?:static\s+)?(?P<s>[\w.]+(?:\.\*)?)\s*;"),
            c_include: re(r#"^\s*#\s*include\s*(?:"(?P<q>[^"]*)"|<(?P<a>[^>]*)>)"#),
            rb_require_relative: re(r#"^\s*require_relative\s*\(?\s*['"](?P<s>[^'"]*)['"]"#),
            rb_require: re(r#"^\s*require\s*\(?\s*['"](?P<s>[^'"]*)['"]"#),
            go_single: re(r#"^\s*import\s+(?:[\w.]+\s+)?"(?P<s>[^"]*)""#),
            go_block_open: re(r"^\s*import\s*\(\s*$"),
            go_block_entry: re(r#"^\s*(?:[\w.]+\s+)?"(?P<s>[^"]*)""#),
            rust_mod: re(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<s>[A-Za-z_]\w*)\s*;"),
        }
    })
}

/// Scan `text` for import/require/include statements.
///
/// Matching runs on the raw line (string contents are the targets), but lines
/// that are entirely comment are skipped. Empty targets are logged and dropped.
pub fn extract_imports(text: &str, language: LanguageKind, path: &Path) -> Vec<RawImport> {
    let re = regexes();
    let mut out = Vec::new();
    let mut in_go_block = false;

    for line in sanitize(text, language) {
        if line.is_blank_code() {
            continue;
        }
        let raw = line.raw;
        let mut push = |specifier: String, kind: DependencyKind| {
            if specifier.trim().is_empty() {
                let err = AnalysisError::MalformedImportTarget {
                    path: path.to_path_buf(),
                    target: specifier,
                };
                debug!("{err} (line {})", line.number);
                return;
            }
            out.push(RawImport {
                specifier,
                kind,
                line: line.number,
            });
        };

        match language {
            LanguageKind::TypeScript | LanguageKind::JavaScript | LanguageKind::Unknown => {
                for caps in re.js_from.captures_iter(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Import);
                }
                if let Some(caps) = re.js_side_effect.captures(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Import);
                }
                for caps in re.js_require.captures_iter(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Require);
                }
                for caps in re.js_dynamic.captures_iter(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Import);
                }
            }
            LanguageKind::Python => {
                if let Some(caps) = re.py_from.captures(raw) {
                    push(python_module_path(&caps["s"]), DependencyKind::Import);
                } else if let Some(caps) = re.py_import.captures(raw) {
                    for module in caps["list"].split(',') {
                        let name = module.split_whitespace().next().unwrap_or("");
                        push(name.to_owned(), DependencyKind::Import);
                    }
                }
            }
            LanguageKind::Java => {
                if let Some(caps) = re.java.captures(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Import);
                }
            }
            LanguageKind::C | LanguageKind::Cpp => {
                if let Some(caps) = re.c_include.captures(raw) {
                    if let Some(quoted) = caps.name("q") {
                        push(relative(quoted.as_str()), DependencyKind::Include);
                    } else if let Some(angled) = caps.name("a") {
                        push(angled.as_str().to_owned(), DependencyKind::Include);
                    }
                }
            }
            LanguageKind::Ruby => {
                if let Some(caps) = re.rb_require_relative.captures(raw) {
                    push(relative(&caps["s"]), DependencyKind::Require);
                } else if let Some(caps) = re.rb_require.captures(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Require);
                }
            }
            LanguageKind::Go => {
                if in_go_block {
                    if raw.trim_start().starts_with(')') {
                        in_go_block = false;
                    } else if let Some(caps) = re.go_block_entry.captures(raw) {
                        push(caps["s"].to_owned(), DependencyKind::Import);
                    }
                } else if re.go_block_open.is_match(raw) {
                    in_go_block = true;
                } else if let Some(caps) = re.go_single.captures(raw) {
                    push(caps["s"].to_owned(), DependencyKind::Import);
                }
            }
            LanguageKind::Rust => {
                if let Some(caps) = re.rust_mod.captures(raw) {
                    push(format!("./{}", &caps["s"]), DependencyKind::Import);
                }
            }
        }
    }

    out
}

/// Prefix a bare path with `./` so it resolves against the importing file.
fn relative(target: &str) -> String {
    if target.is_empty() || target.starts_with('.') || target.starts_with('/') {
        target.to_owned()
    } else {
        format!("./{target}")
    }
}

/// Rewrite a Python module reference to a path-like specifier.
///
/// `pkg.mod` stays dotted (absolute, external by the leading-dot rule);
/// `.mod` becomes `./mod` and `..pkg.mod` becomes `../pkg/mod`.
fn python_module_path(module: &str) -> String {
    let dots = module.chars().take_while(|&c| c == '.').count();
    if dots == 0 {
        return module.to_owned();
    }
    let rest = module[dots..].replace('.', "/");
    let prefix = if dots == 1 {
        "./".to_owned()
    } else {
        "../".repeat(dots - 1)
    };
    format!("{prefix}{rest}")
}

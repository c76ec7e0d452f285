use std::path::PathBuf;

use serde::Serialize;

use crate::graph::node::Symbol;
use crate::language::LanguageKind;
use crate::parser::lexer::{SanitizedLine, indent_width, sanitize};
use crate::parser::{LexicalExtractor, SymbolExtractor};
use crate::source::SourceFile;

/// Lines a declaration may span before its body must have opened.
const MAX_SIGNATURE_LINES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongFunction {
    pub file_path: PathBuf,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    /// `end_line - start_line + 1`.
    pub length: usize,
}

/// Functions and methods of `file` spanning more than `threshold` lines.
pub fn find_long_functions(file: &SourceFile, threshold: usize) -> Vec<LongFunction> {
    let Some(text) = file.text.as_deref() else {
        return Vec::new();
    };
    let lines = sanitize(text, file.language);
    LexicalExtractor
        .extract_symbols(text, &file.path)
        .into_iter()
        .filter(|s| s.kind.is_callable())
        .filter_map(|s| {
            let end_line = if file.language.is_indent_scoped() {
                indented_end(&lines, &s, file.language)
            } else {
                braced_end(&lines, &s)?
            };
            Some(LongFunction {
                file_path: file.path.clone(),
                length: end_line - s.location.line + 1,
                start_line: s.location.line,
                end_line,
                name: s.name,
            })
        })
        .filter(|f| f.length > threshold)
        .collect()
}

/// Line on which the body opened at the declaration returns to balance.
///
/// `None` for bodiless declarations (a `;` before any `{`, or no `{` within a
/// few lines) and for bodies that never close.
fn braced_end(lines: &[SanitizedLine], symbol: &Symbol) -> Option<usize> {
    let start = symbol.location.line;
    let mut depth = 0usize;
    let mut opened = false;
    for line in lines.iter().skip(start.saturating_sub(1)) {
        let code = if line.number == start {
            line.code.get(symbol.location.column.saturating_sub(1)..).unwrap_or("")
        } else {
            line.code.as_str()
        };
        for c in code.chars() {
            match c {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if opened => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(line.number);
                    }
                }
                ';' if !opened => return None,
                _ => {}
            }
        }
        if !opened && line.number + 1 - start >= MAX_SIGNATURE_LINES {
            return None;
        }
    }
    None
}

/// Last line indented deeper than the declaration (Ruby's closing `end` included).
fn indented_end(lines: &[SanitizedLine], symbol: &Symbol, language: LanguageKind) -> usize {
    let start = symbol.location.line;
    let Some(decl) = lines.get(start - 1) else {
        return start;
    };
    let base = indent_width(decl.raw);
    let mut end = start;
    for line in lines.iter().skip(start) {
        if line.is_blank_code() {
            continue;
        }
        let indent = indent_width(line.raw);
        if indent > base {
            end = line.number;
            continue;
        }
        if language == LanguageKind::Ruby && indent == base && line.code.trim() == "end" {
            end = line.number;
        }
        break;
    }
    end
}

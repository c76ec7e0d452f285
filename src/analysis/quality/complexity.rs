use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::parser::lexer::sanitize;
use crate::source::SourceFile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileComplexity {
    pub file_path: PathBuf,
    pub complexity: usize,
}

/// Branching constructs, each adding one point per occurrence.
fn branch_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\bif\b",
            r"\belse\s+if\b",
            r"\bfor\b",
            r"\bforeach\b",
            r"\bwhile\b",
            r"\bdo\b",
            r"\bswitch\b",
            r"\bcase\b",
            r"\bcatch\b",
            r"\breturn\b",
            r"\belif\b",
            r"\s\?\s",
            r"\|\|",
            r"&&",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid complexity pattern"))
        .collect()
    })
}

/// Base 1 plus one per branching construct in code (comments and strings excluded).
///
/// Unreadable files score the base value.
pub fn file_complexity(file: &SourceFile) -> FileComplexity {
    let mut complexity = 1;
    if let Some(text) = file.text.as_deref() {
        for line in sanitize(text, file.language) {
            if line.is_blank_code() {
                continue;
            }
            complexity += branch_patterns()
                .iter()
                .map(|re| re.find_iter(&line.code).count())
                .sum::<usize>();
        }
    }
    FileComplexity {
        file_path: file.path.clone(),
        complexity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(path: &str, text: &str) -> usize {
        file_complexity(&SourceFile::from_text(path, text)).complexity
    }

    #[test]
    fn test_empty_file_is_one() {
        assert_eq!(score("a.ts", ""), 1);
        assert_eq!(file_complexity(&SourceFile::unreadable("b.ts")).complexity, 1);
    }

    #[test]
    fn test_counts_branches() {
        let text = "\
function f(a, b) {
  if (a && b) { return 1; }
  for (const x of a) {}
  return a ? b : 0;
}
";
        // if, &&, return, for, return, ternary
        assert_eq!(score("f.ts", text), 7);
    }

    #[test]
    fn test_ignores_comments_and_strings() {
        let text = "// if while for\nconst s = 'if && ||';\n/* return */\n";
        assert_eq!(score("c.ts", text), 1);
    }

    #[test]
    fn test_python_elif() {
        let text = "def f(x):\n    if x:\n        pass\n    elif x or y:\n        return 1\n";
        // if, elif, return
        assert_eq!(score("m.py", text), 4);
    }
}

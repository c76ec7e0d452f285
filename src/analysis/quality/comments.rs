use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::source::SourceFile;

const EXCESSIVE_RATIO: f64 = 0.5;
const EXCESSIVE_MIN_LINES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRatio {
    pub file_path: PathBuf,
    pub comment_lines: usize,
    pub code_lines: usize,
    /// `comment_lines / (comment_lines + code_lines)`, 0 for an empty file.
    pub ratio: f64,
}

impl CommentRatio {
    pub fn is_excessive(&self) -> bool {
        self.ratio >= EXCESSIVE_RATIO && self.comment_lines > EXCESSIVE_MIN_LINES
    }
}

/// A comment line that looks like disabled source code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentedOutCode {
    pub file_path: PathBuf,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct CommentReport {
    pub ratio: Option<CommentRatio>,
    pub commented_out: Vec<CommentedOutCode>,
}

fn code_like() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^(?:function|class|const|let|var|def|import|export|return|public|private)\b.*[;{}()=:]\s*$",
            r"^(?:if|for|while|switch|catch)\s*\(.*\)\s*\{?\s*$",
            r"^[\w.$]+\s*\([^)]*\)\s*;\s*$",
            r"^[\w.$\[\]]+\s*[-+*/]?=\s*[^=].*;\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("invalid commented-out code pattern"))
        .collect()
    })
}

/// Classify each line as comment, code or blank and collect commented-out code.
///
/// Lines are classified by their leading token only: a line starting with code
/// and ending in a trailing comment counts as code. Unreadable files yield no
/// ratio.
pub fn analyze_comments(file: &SourceFile) -> CommentReport {
    let Some(text) = file.text.as_deref() else {
        return CommentReport::default();
    };
    let c_style = file.language.c_style_comments();
    let hash = file.language.hash_comments();

    let mut comment_lines = 0;
    let mut code_lines = 0;
    let mut commented_out = Vec::new();
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let body = if in_block {
            if line.contains("*/") {
                in_block = false;
            }
            Some(line)
        } else if c_style && line.starts_with("/*") {
            in_block = !line[2..].contains("*/");
            Some(&line[2..])
        } else if c_style && line.starts_with("//") {
            Some(&line[2..])
        } else if hash && line.starts_with('#') && !line.starts_with("#!") {
            Some(&line[1..])
        } else {
            None
        };

        match body {
            Some(body) => {
                comment_lines += 1;
                let body = body
                    .trim_start_matches(['/', '*', '#'])
                    .trim_end_matches("*/")
                    .trim();
                if code_like().iter().any(|re| re.is_match(body)) {
                    commented_out.push(CommentedOutCode {
                        file_path: file.path.clone(),
                        line: idx + 1,
                        text: body.to_owned(),
                    });
                }
            }
            None if line.is_empty() => {}
            None => code_lines += 1,
        }
    }

    let total = comment_lines + code_lines;
    CommentReport {
        ratio: Some(CommentRatio {
            file_path: file.path.clone(),
            comment_lines,
            code_lines,
            ratio: if total == 0 {
                0.0
            } else {
                comment_lines as f64 / total as f64
            },
        }),
        commented_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(path: &str, text: &str) -> CommentRatio {
        analyze_comments(&SourceFile::from_text(path, text)).ratio.unwrap()
    }

    #[test]
    fn test_line_and_block_comments() {
        let text = "\
// header
/*
 * block
 */
const a = 1;

const b = 2; // trailing
";
        let r = ratio("a.ts", text);
        assert_eq!(r.comment_lines, 4);
        assert_eq!(r.code_lines, 2);
        assert!((r.ratio - 4.0 / 6.0).abs() < 1e-9);
        assert!(!r.is_excessive());
    }

    #[test]
    fn test_excessive_comments() {
        let mut text: String = (0..12).map(|i| format!("# note {i}\n")).collect();
        text.push_str("x = 1\n");
        assert!(ratio("m.py", &text).is_excessive());
    }

    #[test]
    fn test_empty_file_has_zero_ratio() {
        let r = ratio("e.ts", "");
        assert_eq!(r.ratio, 0.0);
        assert!(analyze_comments(&SourceFile::unreadable("u.ts")).ratio.is_none());
    }

    #[test]
    fn test_commented_out_code() {
        let text = "\
// const old = compute(1);
// explains the return value
// doWork();
# not a python comment in js
/* if (ready) { */
";
        let report = analyze_comments(&SourceFile::from_text("c.js", text));
        let lines: Vec<usize> = report.commented_out.iter().map(|c| c.line).collect();
        assert_eq!(lines, vec![1, 3, 5]);
        assert_eq!(report.commented_out[0].text, "const old = compute(1);");
    }

    #[test]
    fn test_python_shebang_is_code() {
        let r = ratio("s.py", "#!/usr/bin/env python\n# comment\nprint(1)\n");
        assert_eq!(r.comment_lines, 1);
        assert_eq!(r.code_lines, 2);
    }
}

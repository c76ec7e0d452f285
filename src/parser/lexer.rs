use crate::language::LanguageKind;

/// One source line with comments and string-literal contents blanked out.
///
/// `code` has exactly the same byte length as `raw`: every removed character is
/// replaced by as many spaces as it occupied, so byte columns line up and regex
/// offsets taken on `code` are valid on `raw`.
#[derive(Debug, Clone)]
pub struct SanitizedLine<'a> {
    /// 1-based line number.
    pub number: usize,
    pub raw: &'a str,
    pub code: String,
}

impl SanitizedLine<'_> {
    /// True when the line has nothing but comments or whitespace.
    pub fn is_blank_code(&self) -> bool {
        self.code.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    BlockComment,
    Str(char),
    TripleStr(char),
    Template,
}

/// Split `text` into lines and blank out comments and string contents.
///
/// Quote delimiters are kept so `"..."` still reads as a string-shaped token.
/// Block comments, backtick templates and Python triple-quoted strings may span
/// lines; ordinary quoted strings end at the line break.
pub fn sanitize(text: &str, language: LanguageKind) -> Vec<SanitizedLine<'_>> {
    let c_style = language.c_style_comments();
    let hash = language.hash_comments();
    let mut state = State::Code;
    let mut out = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        if matches!(state, State::Str(_)) {
            state = State::Code;
        }
        let chars: Vec<char> = raw.chars().collect();
        let mut code = String::with_capacity(raw.len());
        let mut j = 0;

        while j < chars.len() {
            let c = chars[j];
            let next = chars.get(j + 1).copied();
            match state {
                State::BlockComment => {
                    if c == '*' && next == Some('/') {
                        code.push_str("  ");
                        j += 2;
                        state = State::Code;
                        continue;
                    }
                    blank(&mut code, c);
                }
                State::Str(q) => {
                    if c == '\\' {
                        blank(&mut code, c);
                        if let Some(n) = next {
                            blank(&mut code, n);
                        }
                        j += 2;
                        continue;
                    }
                    if c == q {
                        code.push(c);
                        state = State::Code;
                    } else {
                        blank(&mut code, c);
                    }
                }
                State::Template => {
                    if c == '\\' {
                        blank(&mut code, c);
                        if let Some(n) = next {
                            blank(&mut code, n);
                        }
                        j += 2;
                        continue;
                    }
                    if c == '`' {
                        code.push(c);
                        state = State::Code;
                    } else {
                        blank(&mut code, c);
                    }
                }
                State::TripleStr(q) => {
                    if c == q && next == Some(q) && chars.get(j + 2) == Some(&q) {
                        code.extend([q, q, q]);
                        j += 3;
                        state = State::Code;
                        continue;
                    }
                    blank(&mut code, c);
                }
                State::Code => {
                    if c_style && c == '/' && next == Some('/') {
                        for &rest in &chars[j..] {
                            blank(&mut code, rest);
                        }
                        break;
                    }
                    if c_style && c == '/' && next == Some('*') {
                        code.push_str("  ");
                        j += 2;
                        state = State::BlockComment;
                        continue;
                    }
                    if hash && c == '#' {
                        for &rest in &chars[j..] {
                            blank(&mut code, rest);
                        }
                        break;
                    }
                    if c == '"' || c == '\'' {
                        if language == LanguageKind::Python
                            && next == Some(c)
                            && chars.get(j + 2) == Some(&c)
                        {
                            code.extend([c, c, c]);
                            j += 3;
                            state = State::TripleStr(c);
                            continue;
                        }
                        if c == '\'' && !starts_char_literal(language, &chars[j..]) {
                            code.push(c);
                        } else {
                            code.push(c);
                            state = State::Str(c);
                        }
                    } else if c == '`'
                        && matches!(
                            language,
                            LanguageKind::TypeScript | LanguageKind::JavaScript | LanguageKind::Go
                        )
                    {
                        code.push(c);
                        state = State::Template;
                    } else {
                        code.push(c);
                    }
                }
            }
            j += 1;
        }

        out.push(SanitizedLine {
            number: idx + 1,
            raw,
            code,
        });
    }

    out
}

/// In Rust a `'` is a lifetime unless it opens a char literal like `'a'` or `'\n'`.
fn starts_char_literal(language: LanguageKind, rest: &[char]) -> bool {
    if language != LanguageKind::Rust {
        return true;
    }
    matches!(rest, [_, '\\', ..] | [_, _, '\'', ..])
}

fn blank(code: &mut String, c: char) {
    for _ in 0..c.len_utf8() {
        code.push(' ');
    }
}

/// Count `{` and `}` in already-sanitized code.
pub fn brace_counts(code: &str) -> (usize, usize) {
    code.chars().fold((0, 0), |(open, close), c| match c {
        '{' => (open + 1, close),
        '}' => (open, close + 1),
        _ => (open, close),
    })
}

/// Leading whitespace width, with tabs counted as four columns.
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(text: &str, lang: LanguageKind) -> Vec<String> {
        sanitize(text, lang).into_iter().map(|l| l.code).collect()
    }

    #[test]
    fn test_line_comment_blanked_and_length_kept() {
        let out = codes("foo(); // bar()", LanguageKind::TypeScript);
        assert_eq!(out[0].trim_end(), "foo();");
        assert_eq!(out[0].len(), "foo(); // bar()".len());
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let out = codes("a /* x\n still comment\n end */ b()", LanguageKind::JavaScript);
        assert_eq!(out[0].trim(), "a");
        assert!(out[1].trim().is_empty());
        assert_eq!(out[2].trim(), "b()");
    }

    #[test]
    fn test_string_contents_blanked() {
        let out = codes(r#"call("foo(1)", 'x{')"#, LanguageKind::JavaScript);
        assert!(!out[0].contains("foo"));
        assert!(!out[0].contains('{'));
        assert!(out[0].starts_with("call(\""));
    }

    #[test]
    fn test_python_hash_and_triple_quotes() {
        let text = "def f():  # trailing\n    \"\"\"doc\n    if x: pass\n    \"\"\"\n    return 1";
        let out = codes(text, LanguageKind::Python);
        assert_eq!(out[0].trim_end(), "def f():");
        assert!(!out[2].contains("if"), "docstring body must be blanked");
        assert_eq!(out[4].trim(), "return 1");
    }

    #[test]
    fn test_rust_lifetime_is_not_a_string() {
        let out = codes("fn get<'a>(x: &'a str) -> &'a str { x }", LanguageKind::Rust);
        assert!(out[0].contains("x: &'a str"));
        let out = codes("let c = '{';", LanguageKind::Rust);
        assert!(!out[0].contains('{'));
    }

    #[test]
    fn test_brace_counts_and_indent() {
        assert_eq!(brace_counts("{ a { } "), (2, 1));
        assert_eq!(indent_width("\t  x"), 6);
    }
}

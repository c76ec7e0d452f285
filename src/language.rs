use std::path::Path;

use serde::{Deserialize, Serialize};

/// Represents a language family handled by the lexical extractors.
///
/// Uses a plain enum (not trait objects). Cheap to copy and pattern-matched
/// wherever token patterns or comment syntax differ per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageKind {
    TypeScript,
    JavaScript,
    Python,
    Java,
    C,
    Cpp,
    Ruby,
    Go,
    Rust,
    Unknown,
}

/// File extensions the walker discovers.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py", "java", "c", "h", "cc", "cpp",
    "cxx", "hpp", "hh", "rb", "go", "rs",
];

impl LanguageKind {
    /// Map a file extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> LanguageKind {
        match ext {
            "ts" | "tsx" | "mts" | "cts" => LanguageKind::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => LanguageKind::JavaScript,
            "py" => LanguageKind::Python,
            "java" => LanguageKind::Java,
            "c" | "h" => LanguageKind::C,
            "cc" | "cpp" | "cxx" | "hpp" | "hh" => LanguageKind::Cpp,
            "rb" => LanguageKind::Ruby,
            "go" => LanguageKind::Go,
            "rs" => LanguageKind::Rust,
            _ => LanguageKind::Unknown,
        }
    }

    /// Detect the language of `path` by its extension.
    pub fn from_path(path: &Path) -> LanguageKind {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    /// Block scope is delimited by indentation rather than braces.
    pub fn is_indent_scoped(&self) -> bool {
        matches!(self, LanguageKind::Python | LanguageKind::Ruby)
    }

    /// `#` starts a line comment.
    pub fn hash_comments(&self) -> bool {
        matches!(self, LanguageKind::Python | LanguageKind::Ruby)
    }

    /// `//` and `/* */` comments.
    pub fn c_style_comments(&self) -> bool {
        !self.hash_comments()
    }
}

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::warn;

use crate::error::AnalysisError;
use crate::language::LanguageKind;

/// Number of leading bytes inspected for NUL when sniffing binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// A file handed to the pipeline, with its text if it could be read.
///
/// `text == None` marks an unreadable or binary file: it stays in the file set
/// (so it is counted and reported) but contributes no symbols or edges.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: LanguageKind,
    pub text: Option<String>,
}

impl SourceFile {
    /// Build a file from in-memory text (used by callers that already hold content).
    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            language: LanguageKind::from_path(&path),
            path,
            text: Some(text.into()),
        }
    }

    /// A file known to be unreadable.
    pub fn unreadable(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            language: LanguageKind::from_path(&path),
            path,
            text: None,
        }
    }

    /// Read `path` from disk, degrading to an unreadable file on any failure.
    pub fn load(path: &Path) -> Self {
        match read_text(path) {
            Ok(text) => Self {
                path: path.to_path_buf(),
                language: LanguageKind::from_path(path),
                text: Some(text),
            },
            Err(err) => {
                warn!("{err}");
                Self::unreadable(path)
            }
        }
    }

    pub fn is_readable(&self) -> bool {
        self.text.is_some()
    }

    /// The file text, or the empty string for unreadable files.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Read every path in parallel. Output order matches input order.
pub fn load_files(paths: &[PathBuf]) -> Vec<SourceFile> {
    paths.par_iter().map(|p| SourceFile::load(p)).collect()
}

/// Read a file as UTF-8 text, rejecting binary content.
fn read_text(path: &Path) -> Result<String, AnalysisError> {
    let bytes = std::fs::read(path).map_err(|e| AnalysisError::FileUnreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return Err(AnalysisError::FileUnreadable {
            path: path.to_path_buf(),
            reason: "binary content".into(),
        });
    }

    String::from_utf8(bytes).map_err(|_| AnalysisError::FileUnreadable {
        path: path.to_path_buf(),
        reason: "not valid UTF-8".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_text_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.ts");
        fs::write(&path, "function foo() {}").unwrap();

        let file = SourceFile::load(&path);
        assert!(file.is_readable());
        assert_eq!(file.language, LanguageKind::TypeScript);
        assert_eq!(file.text(), "function foo() {}");
    }

    #[test]
    fn test_binary_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blob.js");
        fs::write(&path, [0x66u8, 0x00, 0xff, 0xfe]).unwrap();

        let file = SourceFile::load(&path);
        assert!(!file.is_readable());
        assert_eq!(file.text(), "");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SourceFile::load(&dir.path().join("gone.py"));
        assert!(!file.is_readable());
        assert_eq!(file.language, LanguageKind::Python);
    }

    #[test]
    fn test_load_files_preserves_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths: Vec<PathBuf> = (0..20)
            .map(|i| {
                let p = dir.path().join(format!("f{i:02}.js"));
                fs::write(&p, format!("const v{i} = {i};")).unwrap();
                p
            })
            .collect();

        let files = load_files(&paths);
        let loaded: Vec<&PathBuf> = files.iter().map(|f| &f.path).collect();
        assert_eq!(loaded, paths.iter().collect::<Vec<_>>());
    }
}

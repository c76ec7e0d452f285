use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::CodescopeConfig;
use crate::error::{AnalysisError, Result};
use crate::language::SOURCE_EXTENSIONS;

/// Directory names that are never descended into, regardless of `.gitignore`.
const HARD_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "target", "dist", "__pycache__"];

/// Walk a project directory and collect source files.
///
/// Respects `.gitignore` rules, always excludes `node_modules` and friends, and
/// applies any additional exclusions from `config.exclude`.
///
/// The returned list is sorted lexicographically so every downstream stage sees
/// the same file order on every run.
///
/// # Errors
/// [`AnalysisError::RepositoryRootMissing`] when `root` is not an existing directory.
pub fn walk_project(root: &Path, config: &CodescopeConfig) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(AnalysisError::RepositoryRootMissing(root.to_path_buf()));
    }

    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(true)
        // Read .gitignore files even when the directory is not inside a git repository.
        .require_git(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };

        let path = entry.path();

        if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
            continue;
        }

        if path_contains_excluded_dir(path) {
            continue;
        }

        if is_excluded_by_config(path, config) {
            continue;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !SOURCE_EXTENSIONS.contains(&ext) {
            continue;
        }

        debug!("discovered {}", path.display());
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

/// Returns true if any component of `path` is a hard-excluded directory.
fn path_contains_excluded_dir(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| HARD_EXCLUDED_DIRS.contains(&s))
            .unwrap_or(false)
    })
}

/// Returns true if `path` matches any exclusion pattern from config.
fn is_excluded_by_config(path: &Path, config: &CodescopeConfig) -> bool {
    let patterns = match &config.exclude {
        Some(p) => p,
        None => return false,
    };

    let path_str = path.to_string_lossy();

    for pattern in patterns {
        let Ok(matcher) = glob::Pattern::new(pattern) else {
            continue;
        };
        if matcher.matches(&path_str) {
            return true;
        }
        // Also check if any single component matches the pattern directly.
        if path
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|s| matcher.matches(s))
        {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tmp();
        let missing = dir.path().join("does-not-exist");
        let err = walk_project(&missing, &CodescopeConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::RepositoryRootMissing(_)));
    }

    #[test]
    fn test_returns_only_source_files_sorted() {
        let dir = tmp();
        fs::write(dir.path().join("zeta.ts"), "export {}").unwrap();
        fs::write(dir.path().join("alpha.py"), "x = 1").unwrap();
        fs::write(dir.path().join("README.md"), "# Hello").unwrap();

        let files = walk_project(dir.path(), &CodescopeConfig::default()).unwrap();
        assert_eq!(names(&files), vec!["alpha.py", "zeta.ts"]);
    }

    #[test]
    fn test_excludes_node_modules() {
        let dir = tmp();
        let nm = dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(&nm).unwrap();
        fs::write(nm.join("index.js"), "module.exports = {}").unwrap();
        fs::write(dir.path().join("app.js"), "require('pkg')").unwrap();

        let files = walk_project(dir.path(), &CodescopeConfig::default()).unwrap();
        assert!(
            !files
                .iter()
                .any(|f| f.to_string_lossy().contains("node_modules")),
            "node_modules must be skipped"
        );
        assert_eq!(names(&files), vec!["app.js"]);
    }

    #[test]
    fn test_respects_exclude_patterns() {
        let dir = tmp();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor").join("lib.js"), "").unwrap();
        fs::write(dir.path().join("main.js"), "").unwrap();

        let config = CodescopeConfig {
            exclude: Some(vec!["vendor".to_string()]),
            ..CodescopeConfig::default()
        };
        let files = walk_project(dir.path(), &config).unwrap();
        assert_eq!(names(&files), vec!["main.js"]);
    }
}

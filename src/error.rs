use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fallible analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Failure taxonomy for the analysis pipeline.
///
/// Only [`AnalysisError::RepositoryRootMissing`] and [`AnalysisError::Config`] ever
/// escape the pipeline. The per-file variants are logged and the file contributes
/// nothing, so a single bad file never cancels a run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The project root does not exist or is not a directory.
    #[error("repository root does not exist: {}", .0.display())]
    RepositoryRootMissing(PathBuf),

    /// A file could not be read or holds binary content.
    #[error("unreadable file {}: {reason}", path.display())]
    FileUnreadable { path: PathBuf, reason: String },

    /// An import statement whose target could not be turned into a path.
    #[error("malformed import target {target:?} in {}", path.display())]
    MalformedImportTarget { path: PathBuf, target: String },

    /// Invalid configuration (bad stage name, out-of-range threshold, ...).
    #[error("invalid configuration: {0}")]
    Config(String),
}

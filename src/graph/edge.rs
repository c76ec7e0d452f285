use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::node::{Location, SymbolId};

/// A call from one symbol to another, observed at `location` in `file_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
    pub caller_id: SymbolId,
    pub callee_id: SymbolId,
    /// File containing the call site (and the caller's declaration).
    pub file_path: PathBuf,
    /// File of the declaration the callee name resolved to.
    pub callee_file: PathBuf,
    pub location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InheritanceKind {
    Extends,
    Implements,
}

/// `child` extends or implements `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceEdge {
    pub child: String,
    pub parent: String,
    pub kind: InheritanceKind,
    pub child_file: PathBuf,
    pub child_id: SymbolId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SymbolId>,
    /// `None` when the parent is not declared in the analyzed files (e.g. a library base class).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_file: Option<PathBuf>,
}

/// The statement form an import was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Require,
    Include,
}

/// One import/require/include statement.
///
/// `target` is the resolved file path for internal dependencies that matched an
/// analyzed file, the normalised path for unresolved internal ones, and the raw
/// specifier for external ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDependency {
    pub source: PathBuf,
    pub target: String,
    pub kind: DependencyKind,
    pub is_external: bool,
    /// True when `target` names one of the analyzed files.
    pub resolved: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    Call,
    Inheritance,
    Import,
    Assignment,
    Access,
    Declaration,
}

/// The unified edge consumed by the cross-reference indexer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReference {
    pub source_symbol: String,
    pub target_symbol: String,
    pub kind: ReferenceKind,
    pub source_file: PathBuf,
    /// File of the resolved target declaration, when it resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_file: Option<PathBuf>,
    pub location: Location,
}

/// A closed loop in the file dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyCycle {
    /// Files along the loop; the first file is repeated at the end.
    pub paths: Vec<PathBuf>,
    /// Number of distinct files in the loop.
    pub length: usize,
}

impl DependencyCycle {
    /// Build a cycle from its distinct members in traversal order.
    pub fn closed(mut members: Vec<PathBuf>) -> Self {
        let length = members.len();
        if let Some(first) = members.first().cloned() {
            members.push(first);
        }
        Self {
            paths: members,
            length,
        }
    }

    pub fn contains(&self, path: &std::path::Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    /// Distinct member files (without the closing repeat).
    pub fn members(&self) -> &[PathBuf] {
        &self.paths[..self.length]
    }
}

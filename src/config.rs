use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AnalysisError, Result};

/// Name of the per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "codescope.toml";

/// Configuration loaded from `codescope.toml` at the project root.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CodescopeConfig {
    /// Additional path patterns to exclude from discovery (beyond .gitignore and node_modules).
    pub exclude: Option<Vec<String>>,
    /// Pipeline tuning; every field has a default.
    pub analysis: AnalysisOptions,
}

impl CodescopeConfig {
    /// Load configuration from `codescope.toml` in the given root directory.
    ///
    /// Returns a default configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE_NAME}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE_NAME}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

/// A pipeline stage that can be switched on or off.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Symbol and relation extraction (always runs when any graph stage runs).
    Symbols,
    /// File-level import graph and cycle detection.
    Dependencies,
    /// Usage counts, hotspots, unused symbols.
    CrossReferences,
    /// Call graph, data flows, entry points, execution paths.
    Flows,
    /// Change-impact prediction per file.
    Impact,
    /// Complexity, long functions, duplication, comments.
    Quality,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Symbols,
        Stage::Dependencies,
        Stage::CrossReferences,
        Stage::Flows,
        Stage::Impact,
        Stage::Quality,
    ];

    /// Stages whose output this stage consumes.
    pub fn requires(&self) -> &'static [Stage] {
        match self {
            Stage::Symbols | Stage::Dependencies | Stage::Quality => &[],
            Stage::CrossReferences | Stage::Flows => &[Stage::Symbols],
            Stage::Impact => &[
                Stage::Symbols,
                Stage::Dependencies,
                Stage::CrossReferences,
                Stage::Flows,
            ],
        }
    }
}

/// Close a requested stage set over its prerequisites.
pub fn resolve_stages(requested: &BTreeSet<Stage>) -> BTreeSet<Stage> {
    let mut resolved = requested.clone();
    for stage in requested {
        resolved.extend(stage.requires().iter().copied());
    }
    resolved
}

/// Which `SymbolExtractor` implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// Regex token patterns for every language (default).
    #[default]
    Lexical,
    /// tree-sitter grammars for TypeScript/JavaScript, lexical elsewhere.
    TreeSitter,
}

/// Weights and thresholds of the change-impact score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactWeights {
    pub direct: f64,
    pub transitive: f64,
    /// Multiplier applied to the weighted sum before clamping to 100.
    pub scale: f64,
    /// A file with more direct dependents than this is flagged as high fan-in.
    pub fan_in_threshold: usize,
    /// Bidirectional edge count above which a pair of files is flagged as tightly coupled.
    pub coupling_threshold: usize,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        Self {
            direct: 0.7,
            transitive: 0.3,
            scale: 5.0,
            fan_in_threshold: 10,
            coupling_threshold: 5,
        }
    }
}

/// Weights, ideal values and linear penalties of the code-quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub complexity: f64,
    pub long_functions: f64,
    pub duplication: f64,
    pub comments: f64,
    pub ideal_complexity: f64,
    pub ideal_comment_ratio: f64,
    /// Points lost per unit of average complexity above the ideal.
    pub complexity_penalty: f64,
    /// Points lost per long function.
    pub long_function_penalty: f64,
    /// Points lost per reported duplicated block.
    pub duplication_penalty: f64,
    /// Points lost per unit of comment-ratio deviation from the ideal.
    pub comment_penalty: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            complexity: 0.4,
            long_functions: 0.2,
            duplication: 0.3,
            comments: 0.1,
            ideal_complexity: 5.0,
            ideal_comment_ratio: 0.2,
            complexity_penalty: 2.0,
            long_function_penalty: 10.0,
            duplication_penalty: 2.0,
            comment_penalty: 200.0,
        }
    }
}

/// Options accepted by [`crate::pipeline::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Stages to run; prerequisites are added automatically.
    pub stages: BTreeSet<Stage>,
    pub extractor: ExtractorKind,
    /// Minimum fraction of matching lines for two chunks to count as duplicates.
    pub similarity_threshold: f64,
    /// Number of cleaned lines compared per duplication chunk.
    pub chunk_size: usize,
    /// Functions longer than this many lines are reported.
    pub long_function_threshold: usize,
    /// When set, only dependency cycles through this file are recorded.
    pub cycle_scope: Option<PathBuf>,
    pub max_entry_points: usize,
    pub max_path_depth: usize,
    /// Ceiling on recorded execution paths.
    pub max_paths: usize,
    /// Ceiling on call-graph nodes visited while enumerating execution paths.
    pub max_path_steps: usize,
    /// Ceiling on recorded dependency cycles.
    pub max_cycles: usize,
    pub hotspot_limit: usize,
    pub top_files_limit: usize,
    /// Suffixes tried when an internal import target is not itself a known file.
    pub resolve_extensions: Vec<String>,
    pub impact: ImpactWeights,
    pub quality: QualityWeights,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            stages: Stage::ALL.into_iter().collect(),
            extractor: ExtractorKind::default(),
            similarity_threshold: 0.8,
            chunk_size: 10,
            long_function_threshold: 30,
            cycle_scope: None,
            max_entry_points: 10,
            max_path_depth: 10,
            max_paths: 1000,
            max_path_steps: 100_000,
            max_cycles: 1000,
            hotspot_limit: 10,
            top_files_limit: 10,
            resolve_extensions: [".js", ".ts", ".jsx", ".tsx", ".mjs", ".cjs", ".py", ".rb"]
                .into_iter()
                .map(String::from)
                .collect(),
            impact: ImpactWeights::default(),
            quality: QualityWeights::default(),
        }
    }
}

impl AnalysisOptions {
    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AnalysisError::Config(format!(
                "similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.chunk_size == 0 {
            return Err(AnalysisError::Config("chunk_size must be at least 1".into()));
        }
        if self.long_function_threshold == 0 {
            return Err(AnalysisError::Config(
                "long_function_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The requested stages closed over their prerequisites.
    pub fn effective_stages(&self) -> BTreeSet<Stage> {
        resolve_stages(&self.stages)
    }
}

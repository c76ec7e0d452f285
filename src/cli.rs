use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{AnalysisOptions, ExtractorKind, Stage};

/// Lexical static analysis for polyglot codebases.
///
/// codescope extracts symbols, imports, calls and inheritance from source text
/// and reports dependency cycles, hotspots, change impact and code quality.
#[derive(Parser, Debug)]
#[command(
    name = "codescope",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results.
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact one-line-per-result format (default).
    #[default]
    Compact,
    /// Pretty-printed JSON suitable for programmatic consumption.
    Json,
}

/// Arguments shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to the project root to analyze.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Compact)]
    pub format: OutputFormat,

    /// Symbol extractor (overrides codescope.toml).
    #[arg(long, value_enum)]
    pub extractor: Option<ExtractorKind>,

    /// Minimum similarity for duplicated chunks, in [0, 1].
    #[arg(long)]
    pub similarity: Option<f64>,

    /// Cleaned lines per duplication chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Report functions longer than this many lines.
    #[arg(long)]
    pub long_function_lines: Option<usize>,

    /// Only record dependency cycles through this file (relative to the root).
    #[arg(long)]
    pub cycle_scope: Option<PathBuf>,

    /// Log stage progress to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Layer command-line values over the configured options.
    pub fn apply(&self, options: &mut AnalysisOptions) {
        if let Some(extractor) = self.extractor {
            options.extractor = extractor;
        }
        if let Some(similarity) = self.similarity {
            options.similarity_threshold = similarity;
        }
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if let Some(lines) = self.long_function_lines {
            options.long_function_threshold = lines;
        }
        if let Some(scope) = &self.cycle_scope {
            options.cycle_scope = Some(scope.clone());
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and print a summary with every section.
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Stages to run (comma-separated); prerequisites are added automatically.
        #[arg(long, value_enum, value_delimiter = ',')]
        stages: Vec<Stage>,
    },

    /// Detect circular dependencies in the file import graph.
    Circular {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Most-referenced symbols and symbols nothing refers to.
    Hotspots {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Predict which files a change would affect.
    ///
    /// Without --file, prints the most and least impactful files.
    Impact {
        #[command(flatten)]
        common: CommonArgs,

        /// Show the full prediction for one file (relative to the root).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Complexity, long functions, duplication and comment metrics.
    Quality {
        #[command(flatten)]
        common: CommonArgs,
    },
}

impl Commands {
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Analyze { common, .. }
            | Commands::Circular { common }
            | Commands::Hotspots { common }
            | Commands::Impact { common, .. }
            | Commands::Quality { common } => common,
        }
    }

    /// Stages this command needs; `None` keeps the configured set.
    pub fn stages(&self) -> Option<BTreeSet<Stage>> {
        match self {
            Commands::Analyze { stages, .. } if stages.is_empty() => None,
            Commands::Analyze { stages, .. } => Some(stages.iter().copied().collect()),
            Commands::Circular { .. } => Some(BTreeSet::from([Stage::Dependencies])),
            Commands::Hotspots { .. } => Some(BTreeSet::from([Stage::CrossReferences])),
            Commands::Impact { .. } => Some(BTreeSet::from([Stage::Impact])),
            Commands::Quality { .. } => Some(BTreeSet::from([Stage::Quality])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_with_overrides() {
        let cli = Cli::try_parse_from([
            "codescope",
            "analyze",
            "proj",
            "--format",
            "json",
            "--stages",
            "dependencies,quality",
            "--similarity",
            "0.9",
            "--cycle-scope",
            "src/a.ts",
        ])
        .unwrap();
        let common = cli.command.common();
        assert_eq!(common.format, OutputFormat::Json);
        assert_eq!(
            cli.command.stages(),
            Some(BTreeSet::from([Stage::Dependencies, Stage::Quality]))
        );

        let mut options = AnalysisOptions::default();
        common.apply(&mut options);
        assert!((options.similarity_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(options.cycle_scope, Some(PathBuf::from("src/a.ts")));
        assert_eq!(options.chunk_size, 10);
    }

    #[test]
    fn test_subcommands_pick_their_stage() {
        let cli = Cli::try_parse_from(["codescope", "circular", "."]).unwrap();
        assert_eq!(cli.command.stages(), Some(BTreeSet::from([Stage::Dependencies])));
        let cli = Cli::try_parse_from(["codescope", "analyze", "."]).unwrap();
        assert_eq!(cli.command.stages(), None);
    }

    #[test]
    fn test_stage_names_are_kebab_case() {
        let cli =
            Cli::try_parse_from(["codescope", "analyze", ".", "--stages", "cross-references"]).unwrap();
        assert_eq!(
            cli.command.stages(),
            Some(BTreeSet::from([Stage::CrossReferences]))
        );
    }
}

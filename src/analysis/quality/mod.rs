pub mod comments;
pub mod complexity;
pub mod duplication;
pub mod long_functions;

use rayon::prelude::*;
use serde::Serialize;

use crate::config::{AnalysisOptions, QualityWeights};
use crate::source::SourceFile;

pub use comments::{CommentRatio, CommentedOutCode};
pub use complexity::FileComplexity;
pub use duplication::Duplication;
pub use long_functions::LongFunction;

/// Sub-scores in `[0, 100]`, higher is better.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityScores {
    pub complexity: f64,
    pub long_functions: f64,
    pub duplication: f64,
    pub comments: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeQualityAnalysis {
    pub complexity: Vec<FileComplexity>,
    pub long_functions: Vec<LongFunction>,
    pub duplications: Vec<Duplication>,
    pub comment_ratios: Vec<CommentRatio>,
    /// Files whose comment ratio is flagged as excessive.
    pub excessive_comments: Vec<CommentRatio>,
    pub commented_out_code: Vec<CommentedOutCode>,
    pub scores: QualityScores,
    /// Weighted sum of the sub-scores, rounded and clamped to `[0, 100]`.
    pub overall_score: u32,
}

struct FileMetrics {
    complexity: FileComplexity,
    long_functions: Vec<LongFunction>,
    comments: comments::CommentReport,
}

/// Run every quality metric over the raw file text.
pub fn analyze_code_quality(files: &[SourceFile], options: &AnalysisOptions) -> CodeQualityAnalysis {
    let per_file: Vec<FileMetrics> = files
        .par_iter()
        .map(|file| FileMetrics {
            complexity: complexity::file_complexity(file),
            long_functions: long_functions::find_long_functions(file, options.long_function_threshold),
            comments: comments::analyze_comments(file),
        })
        .collect();
    let duplications =
        duplication::find_duplications(files, options.chunk_size, options.similarity_threshold);

    let mut result = CodeQualityAnalysis {
        duplications,
        ..CodeQualityAnalysis::default()
    };
    for metrics in per_file {
        result.complexity.push(metrics.complexity);
        result.long_functions.extend(metrics.long_functions);
        result.commented_out_code.extend(metrics.comments.commented_out);
        if let Some(ratio) = metrics.comments.ratio {
            if ratio.is_excessive() {
                result.excessive_comments.push(ratio.clone());
            }
            result.comment_ratios.push(ratio);
        }
    }

    result.scores = score(&result, &options.quality);
    result.overall_score = overall(&result.scores, &options.quality);
    result
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 100.0) }
}

fn score(result: &CodeQualityAnalysis, weights: &QualityWeights) -> QualityScores {
    let complexity = if result.complexity.is_empty() {
        100.0
    } else {
        let total: usize = result.complexity.iter().map(|c| c.complexity).sum();
        let average = total as f64 / result.complexity.len() as f64;
        100.0 - (average - weights.ideal_complexity).max(0.0) * weights.complexity_penalty
    };

    let long_functions = 100.0 - result.long_functions.len() as f64 * weights.long_function_penalty;
    let duplication = 100.0 - result.duplications.len() as f64 * weights.duplication_penalty;

    let comments = if result.comment_ratios.is_empty() {
        100.0
    } else {
        let average = result.comment_ratios.iter().map(|c| c.ratio).sum::<f64>()
            / result.comment_ratios.len() as f64;
        100.0 - (average - weights.ideal_comment_ratio).abs() * weights.comment_penalty
    };

    QualityScores {
        complexity: clamp_score(complexity),
        long_functions: clamp_score(long_functions),
        duplication: clamp_score(duplication),
        comments: clamp_score(comments),
    }
}

fn overall(scores: &QualityScores, weights: &QualityWeights) -> u32 {
    let weighted = scores.complexity * weights.complexity
        + scores.long_functions * weights.long_functions
        + scores.duplication * weights.duplication
        + scores.comments * weights.comments;
    clamp_score(weighted).round() as u32
}

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalysisOptions;
use crate::graph::SymbolTable;
use crate::graph::edge::ReferenceKind;
use crate::source::SourceFile;

use super::dependencies::DependencyAnalysis;
use super::flow::FlowAnalysis;
use super::xref::CrossReferenceAnalysis;

const CYCLE_RISK: u32 = 90;
const FAN_IN_RISK: u32 = 80;
const COUPLING_RISK: u32 = 70;

const HIGH_SCORE_TIER: f64 = 70.0;
const MODERATE_SCORE_TIER: f64 = 40.0;
const MANY_SYMBOLS: usize = 20;
const MANY_OUTBOUND: usize = 15;
const MANY_INBOUND: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskyArea {
    pub path: PathBuf,
    pub risk: u32,
    pub reason: String,
}

/// Predicted blast radius of changing one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactPrediction {
    pub file_path: PathBuf,
    /// In `[0, 100]`.
    pub impact_score: f64,
    pub direct_impact: BTreeSet<PathBuf>,
    pub transitive_impact: BTreeSet<PathBuf>,
    pub total_impact_count: usize,
    pub risky_areas: Vec<RiskyArea>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileImpactScore {
    pub file_path: PathBuf,
    pub impact_score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeImpactAnalysis {
    pub impact_by_file: BTreeMap<PathBuf, ImpactPrediction>,
    pub most_impactful_files: Vec<FileImpactScore>,
    pub least_impactful_files: Vec<FileImpactScore>,
    pub isolated_files: Vec<PathBuf>,
    pub risk_factors: BTreeMap<PathBuf, Vec<String>>,
}

/// Everything the predictor reads, borrowed from earlier stages.
pub struct ImpactInputs<'a> {
    pub files: &'a [SourceFile],
    pub table: &'a SymbolTable,
    pub dependencies: &'a DependencyAnalysis,
    pub flows: &'a FlowAnalysis,
    pub cross_references: &'a CrossReferenceAnalysis,
}

/// Predict direct and transitive impact, risky areas and risk factors per file.
pub fn analyze_change_impact(inputs: &ImpactInputs, options: &AnalysisOptions) -> ChangeImpactAnalysis {
    let graph = &inputs.dependencies.graph;
    let groups = graph.cycle_groups();
    let group_of: HashMap<NodeIndex, &[NodeIndex]> = groups
        .iter()
        .flat_map(|g| g.iter().map(move |&n| (n, g.as_slice())))
        .collect();

    let per_file: Vec<(ImpactPrediction, usize)> = inputs
        .files
        .par_iter()
        .filter_map(|f| graph.node(&f.path).map(|idx| (f, idx)))
        .map(|(f, idx)| {
            let group = group_of.get(&idx).copied().unwrap_or_default();
            (predict(&f.path, idx, group, inputs, options), group.len())
        })
        .collect();

    let mut impacted_by_others: BTreeSet<&Path> = BTreeSet::new();
    for (prediction, _) in &per_file {
        impacted_by_others.extend(prediction.direct_impact.iter().map(PathBuf::as_path));
    }
    let isolated_files: Vec<PathBuf> = per_file
        .iter()
        .filter(|(p, _)| {
            p.direct_impact.is_empty() && !impacted_by_others.contains(p.file_path.as_path())
        })
        .map(|(p, _)| p.file_path.clone())
        .collect();

    let mut scores: Vec<FileImpactScore> = per_file
        .iter()
        .map(|(p, _)| FileImpactScore {
            file_path: p.file_path.clone(),
            impact_score: p.impact_score,
        })
        .collect();
    scores.sort_by(|a, b| {
        b.impact_score
            .total_cmp(&a.impact_score)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    let most_impactful_files: Vec<FileImpactScore> =
        scores.iter().take(options.top_files_limit).cloned().collect();
    scores.sort_by(|a, b| {
        a.impact_score
            .total_cmp(&b.impact_score)
            .then_with(|| a.file_path.cmp(&b.file_path))
    });
    let least_impactful_files: Vec<FileImpactScore> =
        scores.into_iter().take(options.top_files_limit).collect();

    let mut impact_by_file = BTreeMap::new();
    let mut risk_factors = BTreeMap::new();
    for (prediction, group_size) in per_file {
        let factors = risk_factors_for(&prediction, group_size, inputs);
        risk_factors.insert(prediction.file_path.clone(), factors);
        impact_by_file.insert(prediction.file_path.clone(), prediction);
    }

    ChangeImpactAnalysis {
        impact_by_file,
        most_impactful_files,
        least_impactful_files,
        isolated_files,
        risk_factors,
    }
}

/// Build the prediction for one file.
///
/// `cycle_group` is the strongly connected component holding `file` (empty when
/// the file is on no cycle); every member lies on a cycle through `file`.
fn predict(
    file: &Path,
    idx: NodeIndex,
    cycle_group: &[NodeIndex],
    inputs: &ImpactInputs,
    options: &AnalysisOptions,
) -> ImpactPrediction {
    let graph = &inputs.dependencies.graph;
    let weights = &options.impact;

    let mut direct: BTreeSet<PathBuf> = graph
        .dependents(idx)
        .into_iter()
        .map(|d| graph.path(d).to_path_buf())
        .collect();
    direct.extend(
        inputs
            .cross_references
            .references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Call)
            .filter(|r| r.target_file.as_deref() == Some(file) && r.source_file != file)
            .map(|r| r.source_file.clone()),
    );
    direct.extend(
        inputs
            .flows
            .data_flows
            .iter()
            .filter(|f| f.source_file == file)
            .map(|f| f.target_file.clone()),
    );
    direct.remove(file);

    // Breadth-first over reverse dependency edges, starting from the direct set.
    let mut transitive: BTreeSet<PathBuf> = BTreeSet::new();
    let mut visited: BTreeSet<NodeIndex> = direct.iter().filter_map(|p| graph.node(p)).collect();
    visited.insert(idx);
    let mut queue: VecDeque<NodeIndex> = visited.iter().copied().filter(|&n| n != idx).collect();
    while let Some(current) = queue.pop_front() {
        for dependent in graph.dependents(current) {
            if visited.insert(dependent) {
                transitive.insert(graph.path(dependent).to_path_buf());
                queue.push_back(dependent);
            }
        }
    }

    let raw = direct.len() as f64 * weights.direct + transitive.len() as f64 * weights.transitive;
    let impact_score = (raw * weights.scale).clamp(0.0, 100.0);

    let mut risky_areas: Vec<RiskyArea> = Vec::new();
    let mut flag = |path: &Path, risk: u32, reason: String| {
        if !risky_areas.iter().any(|r| r.path == path && r.risk == risk) {
            risky_areas.push(RiskyArea {
                path: path.to_path_buf(),
                risk,
                reason,
            });
        }
    };

    for &member in cycle_group {
        flag(graph.path(member), CYCLE_RISK, "circular dependency".to_owned());
    }
    if direct.len() > weights.fan_in_threshold {
        flag(
            file,
            FAN_IN_RISK,
            format!("high fan-in: {} directly impacted files", direct.len()),
        );
    }
    for other in direct.iter().chain(transitive.iter()) {
        let Some(other_idx) = graph.node(other) else {
            continue;
        };
        let coupling = graph.edge_weight(idx, other_idx) + graph.edge_weight(other_idx, idx);
        if coupling > weights.coupling_threshold {
            flag(
                other,
                COUPLING_RISK,
                format!("tight coupling: {coupling} import statements in both directions"),
            );
        }
    }

    ImpactPrediction {
        file_path: file.to_path_buf(),
        impact_score,
        total_impact_count: direct.len() + transitive.len(),
        direct_impact: direct,
        transitive_impact: transitive,
        risky_areas,
    }
}

fn risk_factors_for(
    prediction: &ImpactPrediction,
    cycle_group_size: usize,
    inputs: &ImpactInputs,
) -> Vec<String> {
    let mut factors = Vec::new();
    let file = prediction.file_path.as_path();

    if prediction.impact_score >= HIGH_SCORE_TIER {
        factors.push(format!("high impact score ({:.0})", prediction.impact_score));
    } else if prediction.impact_score >= MODERATE_SCORE_TIER {
        factors.push(format!("moderate impact score ({:.0})", prediction.impact_score));
    }

    let symbols = inputs.table.in_file(file).len();
    if symbols > MANY_SYMBOLS {
        factors.push(format!("many symbols ({symbols})"));
    }

    if let Some(count) = inputs.dependencies.dependency_counts.get(file) {
        if count.outbound > MANY_OUTBOUND {
            factors.push(format!("many outgoing dependencies ({})", count.outbound));
        }
        if count.inbound > MANY_INBOUND {
            factors.push(format!("many incoming dependencies ({})", count.inbound));
        }
    }

    if cycle_group_size > 0 {
        factors.push(format!(
            "part of a circular dependency group of {cycle_group_size} files"
        ));
    }
    if !prediction.risky_areas.is_empty() {
        factors.push(format!("{} risky areas", prediction.risky_areas.len()));
    }
    factors
}

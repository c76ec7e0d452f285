use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::analysis::{
    ChangeImpactAnalysis, CodeQualityAnalysis, CrossReferenceAnalysis, DependencyAnalysis,
    FlowAnalysis, ImpactInputs, analyze_change_impact, analyze_code_quality,
    analyze_cross_references, analyze_dependencies, analyze_flows,
};
use crate::config::{AnalysisOptions, CodescopeConfig, Stage};
use crate::error::Result;
use crate::graph::SymbolTable;
use crate::graph::edge::{CallEdge, InheritanceEdge};
use crate::graph::node::{Symbol, SymbolKind};
use crate::parser::extractor_for;
use crate::parser::relationships::{extract_calls, extract_inheritance};
use crate::source::{SourceFile, load_files};
use crate::walker::walk_project;

/// Aggregate statistics of one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisSummary {
    pub file_count: usize,
    /// Files that could not be read and contributed nothing.
    pub unreadable_count: usize,
    pub symbol_count: usize,
    pub symbols_by_kind: BTreeMap<SymbolKind, usize>,
    pub call_edges: usize,
    pub inheritance_edges: usize,
    /// Resolved internal edges between analyzed files.
    pub dependency_edges: usize,
    pub external_dependencies: usize,
    pub cycle_count: usize,
    pub overall_quality: Option<u32>,
}

/// Everything one run produced. Stages that did not run are `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub files: Vec<PathBuf>,
    pub unreadable_files: Vec<PathBuf>,
    pub symbols: Vec<Symbol>,
    pub calls: Vec<CallEdge>,
    pub inheritance: Vec<InheritanceEdge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_references: Option<CrossReferenceAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<FlowAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<ChangeImpactAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<CodeQualityAnalysis>,
    pub summary: AnalysisSummary,
}

/// Run the selected stages over `files`.
///
/// Files are processed in path order regardless of input order, so two runs
/// over the same set produce identical results. Unreadable files are carried
/// through and contribute nothing.
///
/// # Errors
/// [`crate::error::AnalysisError::Config`] when `options` fail validation.
pub fn analyze(files: &[SourceFile], options: &AnalysisOptions) -> Result<AnalysisResult> {
    options.validate()?;
    let stages = options.effective_stages();
    let started = Instant::now();

    let mut files = files.to_vec();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut result = AnalysisResult {
        files: files.iter().map(|f| f.path.clone()).collect(),
        unreadable_files: files
            .iter()
            .filter(|f| !f.is_readable())
            .map(|f| f.path.clone())
            .collect(),
        ..AnalysisResult::default()
    };

    let table = if stages.contains(&Stage::Symbols) {
        let extractor = extractor_for(options.extractor);
        let per_file: Vec<Vec<Symbol>> = files
            .par_iter()
            .map(|f| match f.text.as_deref() {
                Some(text) => extractor.extract_symbols(text, &f.path),
                None => Vec::new(),
            })
            .collect();
        let table = SymbolTable::from_symbols(per_file.into_iter().flatten());

        let calls: Vec<Vec<CallEdge>> = files.par_iter().map(|f| extract_calls(f, &table)).collect();
        result.calls = calls.into_iter().flatten().collect();
        result.inheritance = extract_inheritance(&table);
        info!(
            "extracted {} symbols, {} calls, {} inheritance edges",
            table.len(),
            result.calls.len(),
            result.inheritance.len()
        );
        table
    } else {
        SymbolTable::new()
    };

    if stages.contains(&Stage::Dependencies) {
        let deps = analyze_dependencies(&files, options);
        info!(
            "dependency graph: {} files, {} edges, {} cycles",
            deps.graph.node_count(),
            deps.graph.edge_count(),
            deps.cycles.len()
        );
        result.dependencies = Some(deps);
    }
    if stages.contains(&Stage::CrossReferences) {
        result.cross_references = Some(analyze_cross_references(
            &table,
            &result.calls,
            &result.inheritance,
            options,
        ));
        info!("cross references indexed");
    }
    if stages.contains(&Stage::Flows) {
        let flows = analyze_flows(&table, &result.calls, options);
        info!(
            "flows: {} data flows, {} execution paths",
            flows.data_flows.len(),
            flows.execution_paths.len()
        );
        result.flows = Some(flows);
    }
    if stages.contains(&Stage::Impact)
        && let (Some(dependencies), Some(cross_references), Some(flows)) =
            (&result.dependencies, &result.cross_references, &result.flows)
    {
        let inputs = ImpactInputs {
            files: &files,
            table: &table,
            dependencies,
            flows,
            cross_references,
        };
        result.impact = Some(analyze_change_impact(&inputs, options));
        info!("impact predicted for {} files", files.len());
    }
    if stages.contains(&Stage::Quality) {
        let quality = analyze_code_quality(&files, options);
        info!("quality score {}", quality.overall_score);
        result.quality = Some(quality);
    }

    result.summary = summarize(&result, &table);
    result.symbols = table.symbols().to_vec();
    info!(
        "analyzed {} files in {:.2}s",
        result.files.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(result)
}

fn summarize(result: &AnalysisResult, table: &SymbolTable) -> AnalysisSummary {
    AnalysisSummary {
        file_count: result.files.len(),
        unreadable_count: result.unreadable_files.len(),
        symbol_count: table.len(),
        symbols_by_kind: table.counts_by_kind().into_iter().collect(),
        call_edges: result.calls.len(),
        inheritance_edges: result.inheritance.len(),
        dependency_edges: result
            .dependencies
            .as_ref()
            .map_or(0, |d| d.graph.edge_count()),
        external_dependencies: result
            .dependencies
            .as_ref()
            .map_or(0, |d| d.external_dependencies.len()),
        cycle_count: result.dependencies.as_ref().map_or(0, |d| d.cycles.len()),
        overall_quality: result.quality.as_ref().map(|q| q.overall_score),
    }
}

/// Discover, load and analyze every source file under `root`.
///
/// Paths in the result are relative to `root`.
///
/// # Errors
/// [`crate::error::AnalysisError::RepositoryRootMissing`] when `root` is not a
/// directory, or a configuration error from [`analyze`].
pub fn analyze_project(root: &Path, config: &CodescopeConfig) -> Result<AnalysisResult> {
    let paths = walk_project(root, config)?;
    info!("discovered {} source files under {}", paths.len(), root.display());
    let files: Vec<SourceFile> = load_files(&paths)
        .into_iter()
        .map(|mut f| {
            if let Ok(rel) = f.path.strip_prefix(root) {
                f.path = rel.to_path_buf();
            }
            f
        })
        .collect();
    analyze(&files, &config.analysis)
}

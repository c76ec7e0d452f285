use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::config::AnalysisOptions;
use crate::graph::SymbolTable;
use crate::graph::edge::{CallEdge, InheritanceEdge, ReferenceKind, SymbolReference};
use crate::graph::node::{SymbolId, SymbolKind};

/// How one declared symbol is used across the analyzed files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolUsage {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: PathBuf,
    /// Incoming call and inheritance references; the declaration itself is not counted.
    pub reference_count: usize,
    /// Distinct caller names, in first-seen order.
    pub callers: Vec<String>,
    /// Distinct callee names, in first-seen order.
    pub callees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSymbolCount {
    pub file_path: PathBuf,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CrossReferenceAnalysis {
    pub references: Vec<SymbolReference>,
    /// One entry per symbol, in symbol-table order.
    pub symbol_usage: Vec<SymbolUsage>,
    pub hotspots: Vec<SymbolUsage>,
    pub unused: Vec<SymbolUsage>,
    pub files_with_most_symbols: Vec<FileSymbolCount>,
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_owned());
    }
}

/// Index declarations, calls and inheritance into per-symbol usage.
///
/// Hotspots are the most-referenced symbols (only symbols with at least one
/// reference), ordered by count descending with ties in symbol-table order.
pub fn analyze_cross_references(
    table: &SymbolTable,
    calls: &[CallEdge],
    inheritance: &[InheritanceEdge],
    options: &AnalysisOptions,
) -> CrossReferenceAnalysis {
    let mut references = Vec::with_capacity(table.len() + calls.len() + inheritance.len());
    let mut usage: Vec<SymbolUsage> = table
        .iter()
        .map(|(id, symbol)| SymbolUsage {
            id,
            name: symbol.name.clone(),
            kind: symbol.kind,
            file_path: symbol.file_path.clone(),
            reference_count: 0,
            callers: Vec::new(),
            callees: Vec::new(),
        })
        .collect();

    for (_, symbol) in table.iter() {
        references.push(SymbolReference {
            source_symbol: symbol.name.clone(),
            target_symbol: symbol.name.clone(),
            kind: ReferenceKind::Declaration,
            source_file: symbol.file_path.clone(),
            target_file: Some(symbol.file_path.clone()),
            location: symbol.location,
        });
    }

    for call in calls {
        references.push(SymbolReference {
            source_symbol: call.caller.clone(),
            target_symbol: call.callee.clone(),
            kind: ReferenceKind::Call,
            source_file: call.file_path.clone(),
            target_file: Some(call.callee_file.clone()),
            location: call.location,
        });
        let callee = &mut usage[call.callee_id.0];
        callee.reference_count += 1;
        push_unique(&mut callee.callers, &call.caller);
        push_unique(&mut usage[call.caller_id.0].callees, &call.callee);
    }

    for edge in inheritance {
        references.push(SymbolReference {
            source_symbol: edge.child.clone(),
            target_symbol: edge.parent.clone(),
            kind: ReferenceKind::Inheritance,
            source_file: edge.child_file.clone(),
            target_file: edge.parent_file.clone(),
            location: table.get(edge.child_id).location,
        });
        if let Some(parent_id) = edge.parent_id {
            usage[parent_id.0].reference_count += 1;
        }
    }

    // Unreferenced symbols pad the list when fewer than `hotspot_limit` are used.
    // Stable sort keeps symbol-table order among equal counts.
    let mut ranked: Vec<&SymbolUsage> = usage.iter().collect();
    ranked.sort_by(|a, b| b.reference_count.cmp(&a.reference_count));
    let hotspots = ranked
        .into_iter()
        .take(options.hotspot_limit)
        .cloned()
        .collect();

    let unused = usage
        .iter()
        .filter(|u| u.reference_count == 0)
        .cloned()
        .collect();

    let mut per_file: BTreeMap<&PathBuf, usize> = BTreeMap::new();
    for symbol in table.symbols() {
        *per_file.entry(&symbol.file_path).or_insert(0) += 1;
    }
    let mut files: Vec<FileSymbolCount> = per_file
        .into_iter()
        .map(|(path, count)| FileSymbolCount {
            file_path: path.clone(),
            count,
        })
        .collect();
    files.sort_by(|a, b| b.count.cmp(&a.count));
    files.truncate(options.top_files_limit);

    CrossReferenceAnalysis {
        references,
        symbol_usage: usage,
        hotspots,
        unused,
        files_with_most_symbols: files,
    }
}

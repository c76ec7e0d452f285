use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use crate::config::AnalysisOptions;
use crate::graph::SymbolTable;
use crate::graph::edge::CallEdge;
use crate::graph::node::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataFlowKind {
    /// Arguments flow from a caller into a function of another component.
    ParameterToFunction,
    /// A return value flows from the callee back to the calling component.
    FunctionToReturn,
}

/// Value movement between two components (files) implied by a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DataFlow {
    pub source: String,
    pub target: String,
    pub source_file: PathBuf,
    pub target_file: PathBuf,
    pub kind: DataFlowKind,
}

/// Symbols of one file called from, or calling into, other files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentIo {
    pub inputs: BTreeSet<String>,
    pub outputs: BTreeSet<String>,
}

/// A callable symbol identified by name and declaring file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowNode {
    pub name: String,
    pub file_path: PathBuf,
}

/// A call chain from an entry point to a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPath {
    pub symbols: Vec<String>,
    /// Distinct files touched, in first-visit order.
    pub files: Vec<PathBuf>,
}

impl ExecutionPath {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlowAnalysis {
    pub data_flows: Vec<DataFlow>,
    pub execution_paths: Vec<ExecutionPath>,
    pub component_io: BTreeMap<PathBuf, ComponentIo>,
    pub entry_points: Vec<FlowNode>,
    pub sinks: Vec<FlowNode>,
    /// True when path enumeration stopped at `max_paths` or `max_path_steps`.
    pub truncated: bool,
}

/// Derive data flows, component I/O, entry points, sinks and execution paths.
pub fn analyze_flows(
    table: &SymbolTable,
    calls: &[CallEdge],
    options: &AnalysisOptions,
) -> FlowAnalysis {
    let mut call_graph: HashMap<SymbolId, Vec<SymbolId>> = HashMap::new();
    let mut called: HashSet<SymbolId> = HashSet::new();
    for call in calls {
        let callees = call_graph.entry(call.caller_id).or_default();
        if !callees.contains(&call.callee_id) {
            callees.push(call.callee_id);
        }
        called.insert(call.callee_id);
    }

    let mut component_io: BTreeMap<PathBuf, ComponentIo> = table
        .symbols()
        .iter()
        .map(|s| (s.file_path.clone(), ComponentIo::default()))
        .collect();

    let mut data_flows = Vec::new();
    let mut seen: HashSet<DataFlow> = HashSet::new();
    for call in calls.iter().filter(|c| c.file_path != c.callee_file) {
        let inbound = DataFlow {
            source: call.caller.clone(),
            target: call.callee.clone(),
            source_file: call.file_path.clone(),
            target_file: call.callee_file.clone(),
            kind: DataFlowKind::ParameterToFunction,
        };
        let outbound = DataFlow {
            source: call.callee.clone(),
            target: call.caller.clone(),
            source_file: call.callee_file.clone(),
            target_file: call.file_path.clone(),
            kind: DataFlowKind::FunctionToReturn,
        };
        component_io
            .entry(call.callee_file.clone())
            .or_default()
            .inputs
            .insert(call.callee.clone());
        component_io
            .entry(call.file_path.clone())
            .or_default()
            .outputs
            .insert(call.caller.clone());
        for flow in [inbound, outbound] {
            if seen.insert(flow.clone()) {
                data_flows.push(flow);
            }
        }
    }

    let node = |id: SymbolId| {
        let s = table.get(id);
        FlowNode {
            name: s.name.clone(),
            file_path: s.file_path.clone(),
        }
    };
    let callables: Vec<SymbolId> = table
        .iter()
        .filter(|(_, s)| s.kind.is_callable())
        .map(|(id, _)| id)
        .collect();
    let entry_ids: Vec<SymbolId> = callables
        .iter()
        .copied()
        .filter(|id| !called.contains(id))
        .collect();
    let sinks: Vec<FlowNode> = callables
        .iter()
        .copied()
        .filter(|id| !call_graph.contains_key(id))
        .map(node)
        .collect();

    let mut walker = PathWalker {
        table,
        call_graph: &call_graph,
        max_depth: options.max_path_depth,
        max_paths: options.max_paths,
        max_steps: options.max_path_steps,
        steps: 0,
        paths: Vec::new(),
        truncated: false,
    };
    for &entry in entry_ids.iter().take(options.max_entry_points) {
        let mut path = Vec::new();
        walker.explore(entry, &mut path, HashSet::from([entry]));
        if walker.truncated {
            info!(
                "execution path enumeration stopped at {} paths after {} steps",
                walker.paths.len(),
                walker.steps
            );
            break;
        }
    }

    FlowAnalysis {
        data_flows,
        execution_paths: walker.paths,
        truncated: walker.truncated,
        component_io,
        entry_points: entry_ids.into_iter().map(node).collect(),
        sinks,
    }
}

struct PathWalker<'a> {
    table: &'a SymbolTable,
    call_graph: &'a HashMap<SymbolId, Vec<SymbolId>>,
    max_depth: usize,
    max_paths: usize,
    /// Ceiling on `explore` calls across all entry points.
    max_steps: usize,
    steps: usize,
    paths: Vec<ExecutionPath>,
    truncated: bool,
}

impl PathWalker<'_> {
    /// Depth-first walk; `visited` is copied per branch so sibling branches may
    /// revisit a node while a single path never repeats one.
    fn explore(&mut self, id: SymbolId, path: &mut Vec<SymbolId>, visited: HashSet<SymbolId>) {
        if self.truncated {
            return;
        }
        self.steps += 1;
        if self.steps > self.max_steps {
            self.truncated = true;
            return;
        }
        path.push(id);
        let call_graph = self.call_graph;
        match call_graph.get(&id) {
            None => {
                if path.len() >= 2 && self.table.get(id).kind.is_callable() {
                    self.record(path);
                }
            }
            Some(callees) if path.len() < self.max_depth => {
                for &next in callees {
                    if visited.contains(&next) {
                        continue;
                    }
                    let mut branch = visited.clone();
                    branch.insert(next);
                    self.explore(next, path, branch);
                }
            }
            Some(_) => {}
        }
        path.pop();
    }

    fn record(&mut self, path: &[SymbolId]) {
        if self.paths.len() >= self.max_paths {
            self.truncated = true;
            return;
        }
        let mut files: Vec<PathBuf> = Vec::new();
        let mut symbols = Vec::with_capacity(path.len());
        for &id in path {
            let symbol = self.table.get(id);
            symbols.push(symbol.name.clone());
            if !files.contains(&symbol.file_path) {
                files.push(symbol.file_path.clone());
            }
        }
        self.paths.push(ExecutionPath { symbols, files });
    }
}

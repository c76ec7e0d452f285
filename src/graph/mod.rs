pub mod edge;
pub mod node;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use node::{Symbol, SymbolId, SymbolKind};

/// Every extracted symbol, stored once per declaration, with lookup indexes.
///
/// The canonical key is `(file, name)`; `by_name` lets call resolution search
/// across files without one file's `init` overwriting another's.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_key: HashMap<(PathBuf, String), SymbolId>,
    by_name: HashMap<String, Vec<SymbolId>>,
    /// Symbols of each file in declaration order.
    by_file: HashMap<PathBuf, Vec<SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from per-file symbol lists. Files must already be in a stable order.
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut table = Self::new();
        for symbol in symbols {
            table.insert(symbol);
        }
        table
    }

    /// Add a symbol. A later declaration of the same `(file, name)` becomes the canonical one.
    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.by_key
            .insert((symbol.file_path.clone(), symbol.name.clone()), id);
        self.by_name.entry(symbol.name.clone()).or_default().push(id);
        self.by_file
            .entry(symbol.file_path.clone())
            .or_default()
            .push(id);
        self.symbols.push(symbol);
        id
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter().enumerate().map(|(i, s)| (SymbolId(i), s))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Canonical declaration of `name` in `file`.
    pub fn lookup(&self, file: &Path, name: &str) -> Option<SymbolId> {
        self.by_key
            .get(&(file.to_path_buf(), name.to_owned()))
            .copied()
    }

    /// All declarations named `name`, across files.
    pub fn by_name(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Symbols declared in `file`, in declaration order.
    pub fn in_file(&self, file: &Path) -> &[SymbolId] {
        self.by_file.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolve a referenced name as seen from `from_file`.
    ///
    /// A declaration in the same file wins. Otherwise the declaration in the
    /// lexicographically greatest file is chosen, which reproduces last-write-wins
    /// over a sorted file list while keeping every declaration in the table.
    pub fn resolve(&self, name: &str, from_file: &Path) -> Option<SymbolId> {
        if let Some(id) = self.lookup(from_file, name) {
            return Some(id);
        }
        self.by_name(name)
            .iter()
            .copied()
            .max_by(|a, b| {
                self.get(*a)
                    .file_path
                    .cmp(&self.get(*b).file_path)
                    .then(a.cmp(b))
            })
    }

    /// Nearest symbol of `file` declared at or before `line`.
    ///
    /// Among several symbols on the same line the last declared wins.
    pub fn enclosing_at(&self, file: &Path, line: usize) -> Option<SymbolId> {
        self.in_file(file)
            .iter()
            .copied()
            .filter(|&id| self.get(id).location.line <= line)
            .max_by(|a, b| {
                self.get(*a)
                    .location
                    .line
                    .cmp(&self.get(*b).location.line)
                    .then(a.cmp(b))
            })
    }

    /// Count of symbols per kind.
    pub fn counts_by_kind(&self) -> HashMap<SymbolKind, usize> {
        let mut map: HashMap<SymbolKind, usize> = HashMap::new();
        for symbol in &self.symbols {
            *map.entry(symbol.kind).or_insert(0) += 1;
        }
        map
    }
}

/// File-level dependency graph over integer node IDs.
///
/// Nodes are analyzed files; a directed edge `a -> b` means `a` imports `b`.
/// The edge weight counts how many import statements produced it.
#[derive(Debug, Default, Clone)]
pub struct DepGraph {
    graph: DiGraph<PathBuf, usize>,
    index: HashMap<PathBuf, NodeIndex>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file node, returning the existing index if already present.
    pub fn add_file(&mut self, path: &Path) -> NodeIndex {
        if let Some(&idx) = self.index.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.to_path_buf());
        self.index.insert(path.to_path_buf(), idx);
        idx
    }

    /// Add (or strengthen) the edge `from -> to`.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex) {
        match self.graph.find_edge(from, to) {
            Some(e) => self.graph[e] += 1,
            None => {
                self.graph.add_edge(from, to, 1);
            }
        }
    }

    /// Number of import statements producing the edge `from -> to` (0 if absent).
    pub fn edge_weight(&self, from: NodeIndex, to: NodeIndex) -> usize {
        self.graph
            .find_edge(from, to)
            .map(|e| self.graph[e])
            .unwrap_or(0)
    }

    pub fn node(&self, path: &Path) -> Option<NodeIndex> {
        self.index.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    pub fn path(&self, idx: NodeIndex) -> &Path {
        &self.graph[idx]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node indices in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Files imported by `idx`, sorted by node index for stable traversal.
    pub fn dependencies(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Outgoing)
    }

    /// Files importing `idx`, sorted by node index for stable traversal.
    pub fn dependents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.neighbors(idx, Direction::Incoming)
    }

    /// Strongly connected components with more than one file, each sorted by
    /// node index. Every file of a group lies on some cycle through every other.
    pub fn cycle_groups(&self) -> Vec<Vec<NodeIndex>> {
        let mut groups: Vec<Vec<NodeIndex>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|mut scc| {
                scc.sort();
                scc
            })
            .collect();
        groups.sort();
        groups
    }

    fn neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node::Location;

    fn sym(name: &str, file: &str, line: usize) -> Symbol {
        Symbol::new(name, SymbolKind::Function, file, Location::new(line, 1))
    }

    #[test]
    fn test_same_name_in_two_files_keeps_both() {
        let table = SymbolTable::from_symbols([sym("init", "a.ts", 1), sym("init", "b.ts", 3)]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_name("init").len(), 2);
        let a = table.lookup(Path::new("a.ts"), "init").unwrap();
        let b = table.lookup(Path::new("b.ts"), "init").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_resolve_prefers_same_file_then_last_file() {
        let table = SymbolTable::from_symbols([
            sym("init", "a.ts", 1),
            sym("init", "c.ts", 1),
            sym("main", "b.ts", 1),
        ]);
        let from_a = table.resolve("init", Path::new("a.ts")).unwrap();
        assert_eq!(table.get(from_a).file_path, PathBuf::from("a.ts"));
        let from_b = table.resolve("init", Path::new("b.ts")).unwrap();
        assert_eq!(table.get(from_b).file_path, PathBuf::from("c.ts"));
        assert!(table.resolve("missing", Path::new("a.ts")).is_none());
    }

    #[test]
    fn test_enclosing_at_picks_nearest_preceding() {
        let table = SymbolTable::from_symbols([
            sym("first", "a.ts", 1),
            sym("second", "a.ts", 5),
            sym("other", "b.ts", 3),
        ]);
        let at = |line| {
            table
                .enclosing_at(Path::new("a.ts"), line)
                .map(|id| table.get(id).name.clone())
        };
        assert_eq!(at(3), Some("first".to_string()));
        assert_eq!(at(5), Some("second".to_string()));
        assert_eq!(at(100), Some("second".to_string()));
        assert_eq!(table.enclosing_at(Path::new("b.ts"), 2), None);
    }

    #[test]
    fn test_dep_graph_dedupes_edges_and_counts_weight() {
        let mut graph = DepGraph::new();
        let a = graph.add_file(Path::new("a.ts"));
        let b = graph.add_file(Path::new("b.ts"));
        assert_eq!(graph.add_file(Path::new("a.ts")), a);
        graph.add_edge(a, b);
        graph.add_edge(a, b);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_weight(a, b), 2);
        assert_eq!(graph.edge_weight(b, a), 0);
        assert_eq!(graph.dependencies(a), vec![b]);
        assert_eq!(graph.dependents(b), vec![a]);
        assert!(graph.dependents(a).is_empty());
    }

    #[test]
    fn test_cycle_groups_include_files_reached_through_finished_nodes() {
        let mut graph = DepGraph::new();
        let a = graph.add_file(Path::new("a.ts"));
        let b = graph.add_file(Path::new("b.ts"));
        let c = graph.add_file(Path::new("c.ts"));
        let d = graph.add_file(Path::new("d.ts"));
        // a -> b -> a and a -> c -> b; d only imports a
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, a);
        graph.add_edge(c, b);
        graph.add_edge(d, a);
        assert_eq!(graph.cycle_groups(), vec![vec![a, b, c]]);
    }
}

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AnalysisOptions;
use crate::graph::DepGraph;
use crate::graph::edge::{DependencyCycle, FileDependency};
use crate::parser::imports::{RawImport, extract_imports};
use crate::source::SourceFile;

/// Inbound and outbound import-edge tallies for one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DependencyCount {
    /// Resolved imports of this file by other analyzed files.
    pub inbound: usize,
    /// Every import statement in this file, internal or external.
    pub outbound: usize,
}

/// Output of the dependency graph builder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DependencyAnalysis {
    pub dependencies: Vec<FileDependency>,
    pub dependency_counts: BTreeMap<PathBuf, DependencyCount>,
    pub cycles: Vec<DependencyCycle>,
    pub external_dependencies: BTreeSet<String>,
    /// True when cycle recording stopped at `max_cycles`.
    pub truncated: bool,
    /// Internal edges only, one node per analyzed file.
    #[serde(skip)]
    pub graph: DepGraph,
}

/// Scan every file for imports, build the internal file graph and find cycles.
///
/// Import scanning runs in parallel; resolution and graph building run in file
/// order so node indices and edge order are stable.
pub fn analyze_dependencies(files: &[SourceFile], options: &AnalysisOptions) -> DependencyAnalysis {
    let mut graph = DepGraph::new();
    let mut counts: BTreeMap<PathBuf, DependencyCount> = BTreeMap::new();
    let mut known: HashMap<PathBuf, PathBuf> = HashMap::new();
    for file in files {
        graph.add_file(&file.path);
        counts.insert(file.path.clone(), DependencyCount::default());
        known.insert(normalize_path(&file.path), file.path.clone());
    }

    let scanned: Vec<Vec<RawImport>> = files
        .par_iter()
        .map(|f| match f.text.as_deref() {
            Some(text) => extract_imports(text, f.language, &f.path),
            None => Vec::new(),
        })
        .collect();

    let mut dependencies = Vec::new();
    let mut external = BTreeSet::new();

    for (file, imports) in files.iter().zip(scanned) {
        let Some(source_idx) = graph.node(&file.path) else {
            continue;
        };
        for import in imports {
            if let Some(count) = counts.get_mut(&file.path) {
                count.outbound += 1;
            }

            if is_external(&import.specifier) {
                external.insert(import.specifier.clone());
                dependencies.push(FileDependency {
                    source: file.path.clone(),
                    target: import.specifier,
                    kind: import.kind,
                    is_external: true,
                    resolved: false,
                });
                continue;
            }

            let (resolved, candidate) = resolve_target(
                &file.path,
                &import.specifier,
                &known,
                &options.resolve_extensions,
            );
            let target = match resolved {
                Some(target) => {
                    if target != file.path
                        && let Some(target_idx) = graph.node(&target)
                    {
                        graph.add_edge(source_idx, target_idx);
                        if let Some(count) = counts.get_mut(&target) {
                            count.inbound += 1;
                        }
                    }
                    Some(target)
                }
                None => {
                    debug!(
                        "unresolved import {:?} in {}:{}",
                        import.specifier,
                        file.path.display(),
                        import.line
                    );
                    None
                }
            };

            dependencies.push(FileDependency {
                source: file.path.clone(),
                resolved: target.is_some(),
                target: target.unwrap_or(candidate).display().to_string(),
                kind: import.kind,
                is_external: false,
            });
        }
    }

    let scope = options.cycle_scope.as_deref().and_then(|scope| {
        let found = files
            .iter()
            .find(|f| f.path == scope || f.path.ends_with(scope))
            .and_then(|f| graph.node(&f.path));
        if found.is_none() {
            warn!(
                "cycle scope {} is not an analyzed file; no cycles reported",
                scope.display()
            );
        }
        Some(found)
    });

    let (cycles, truncated) = match scope {
        Some(None) => (Vec::new(), false),
        Some(Some(idx)) => find_cycles(&graph, Some(idx), options.max_cycles),
        None => find_cycles(&graph, None, options.max_cycles),
    };
    if truncated {
        info!("cycle search stopped after {} cycles", options.max_cycles);
    }

    info!(
        "dependency scan: {} statements, {} internal edges, {} cycles",
        dependencies.len(),
        graph.edge_count(),
        cycles.len()
    );

    DependencyAnalysis {
        dependencies,
        dependency_counts: counts,
        cycles,
        external_dependencies: external,
        truncated,
        graph,
    }
}

/// External targets are bare specifiers: no leading `.` or `/`, and no `:`.
pub fn is_external(target: &str) -> bool {
    !target.starts_with('.') && !target.starts_with('/') && !target.contains(':')
}

/// Lexically resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Resolve a relative import against the importing file.
///
/// Returns the matching analyzed file, if any, and the normalized candidate
/// path used for unresolved targets.
fn resolve_target(
    source: &Path,
    specifier: &str,
    known: &HashMap<PathBuf, PathBuf>,
    extensions: &[String],
) -> (Option<PathBuf>, PathBuf) {
    let base = source.parent().unwrap_or_else(|| Path::new(""));
    let candidate = normalize_path(&base.join(specifier));

    let own_ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"));
    let mut suffixes: Vec<&str> = extensions.iter().map(String::as_str).collect();
    if let Some(own) = own_ext.as_deref()
        && !suffixes.contains(&own)
    {
        suffixes.push(own);
    }

    let mut tries: Vec<PathBuf> = vec![candidate.clone()];
    tries.extend(suffixes.iter().map(|ext| with_suffix(&candidate, ext)));
    if let Some(ext) = candidate.extension().and_then(|e| e.to_str())
        && matches!(ext, "js" | "jsx" | "mjs" | "cjs")
    {
        tries.push(candidate.with_extension("ts"));
        tries.push(candidate.with_extension("tsx"));
    }
    for index in ["index", "__init__", "mod"] {
        let stem = candidate.join(index);
        tries.extend(suffixes.iter().map(|ext| with_suffix(&stem, ext)));
    }

    let resolved = tries.iter().find_map(|p| known.get(p).cloned());
    (resolved, candidate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Depth-first cycle search over the integer-indexed file graph.
///
/// Gray nodes are on the current path; reaching one closes a cycle made of the
/// path slice from that node's position. With `scope`, the search starts only
/// at that node and keeps only cycles containing it. Returns the cycles and
/// whether recording stopped at `max_cycles`.
pub fn find_cycles(
    graph: &DepGraph,
    scope: Option<NodeIndex>,
    max_cycles: usize,
) -> (Vec<DependencyCycle>, bool) {
    let n = graph.node_count();
    let mut color = vec![Color::White; n];
    let mut position: Vec<Option<usize>> = vec![None; n];
    let mut cycles = Vec::new();
    let mut truncated = false;

    let starts: Vec<NodeIndex> = match scope {
        Some(idx) => vec![idx],
        None => graph.nodes().collect(),
    };

    'search: for start in starts {
        if color[start.index()] != Color::White {
            continue;
        }
        let mut path: Vec<NodeIndex> = vec![start];
        let mut frames: Vec<(NodeIndex, Vec<NodeIndex>, usize)> =
            vec![(start, graph.dependencies(start), 0)];
        color[start.index()] = Color::Gray;
        position[start.index()] = Some(0);

        while let Some((node, next_nodes, cursor)) = frames.last_mut() {
            let Some(&next) = next_nodes.get(*cursor) else {
                let node = *node;
                frames.pop();
                path.pop();
                color[node.index()] = Color::Black;
                position[node.index()] = None;
                continue;
            };
            *cursor += 1;

            match color[next.index()] {
                Color::White => {
                    color[next.index()] = Color::Gray;
                    position[next.index()] = Some(path.len());
                    path.push(next);
                    frames.push((next, graph.dependencies(next), 0));
                }
                Color::Gray => {
                    let Some(at) = position[next.index()] else {
                        continue;
                    };
                    let members = &path[at..];
                    if scope.is_some_and(|s| !members.contains(&s)) {
                        continue;
                    }
                    if cycles.len() >= max_cycles {
                        truncated = true;
                        break 'search;
                    }
                    cycles.push(DependencyCycle::closed(
                        members
                            .iter()
                            .map(|&idx| graph.path(idx).to_path_buf())
                            .collect(),
                    ));
                }
                Color::Black => {}
            }
        }
    }

    (cycles, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::DependencyKind;

    fn analyze(files: &[(&str, &str)]) -> DependencyAnalysis {
        let files: Vec<SourceFile> = files
            .iter()
            .map(|(p, t)| SourceFile::from_text(*p, *t))
            .collect();
        analyze_dependencies(&files, &AnalysisOptions::default())
    }

    #[test]
    fn test_two_file_cycle_and_unrelated_file() {
        let result = analyze(&[
            ("src/a.ts", "import { b } from './b';"),
            ("src/b.ts", "import { a } from './a';"),
            ("src/c.ts", "export const c = 1;"),
        ]);
        assert_eq!(result.cycles.len(), 1);
        let cycle = &result.cycles[0];
        assert_eq!(cycle.length, 2);
        assert_eq!(cycle.paths.first(), cycle.paths.last());
        assert!(cycle.contains(Path::new("src/a.ts")));
        assert!(cycle.contains(Path::new("src/b.ts")));

        let c = Path::new("src/c.ts");
        assert_eq!(result.dependency_counts[c], DependencyCount::default());
        assert!(
            !result
                .dependencies
                .iter()
                .any(|d| d.source == c || d.target == "src/c.ts")
        );
    }

    #[test]
    fn test_three_file_cycle() {
        let result = analyze(&[
            ("a.js", "require('./b')"),
            ("b.js", "require('./c')"),
            ("c.js", "require('./a')"),
        ]);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].length, 3);
        assert_eq!(result.cycles[0].paths.len(), 4);
    }

    #[test]
    fn test_external_and_counts() {
        let result = analyze(&[
            ("app/main.ts", "import fs from 'fs';\nimport { x } from './util';\nimport y from 'node:path';"),
            ("app/util.ts", "export const x = 1;"),
        ]);
        assert!(result.external_dependencies.contains("fs"));
        assert!(!result.external_dependencies.contains("node:path"));
        let main = &result.dependency_counts[Path::new("app/main.ts")];
        assert_eq!(main.outbound, 3);
        assert_eq!(main.inbound, 0);
        assert_eq!(result.dependency_counts[Path::new("app/util.ts")].inbound, 1);

        let internal: Vec<&FileDependency> =
            result.dependencies.iter().filter(|d| d.resolved).collect();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].target, "app/util.ts");
        assert_eq!(internal[0].kind, DependencyKind::Import);
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn test_resolution_fallbacks() {
        let result = analyze(&[
            ("web/app.ts", "import a from './lib/helper.js';\nimport b from './components';"),
            ("web/lib/helper.ts", ""),
            ("web/components/index.tsx", ""),
            ("py/pkg/api.py", "from .models import User\nfrom . import views"),
            ("py/pkg/models.py", ""),
            ("py/pkg/__init__.py", ""),
            ("c/main.c", "#include \"util.h\""),
            ("c/util.h", ""),
        ]);
        let targets: BTreeSet<&str> = result
            .dependencies
            .iter()
            .filter(|d| d.resolved)
            .map(|d| d.target.as_str())
            .collect();
        assert!(targets.contains("web/lib/helper.ts"));
        assert!(targets.contains("web/components/index.tsx"));
        assert!(targets.contains("py/pkg/models.py"));
        assert!(targets.contains("py/pkg/__init__.py"));
        assert!(targets.contains("c/util.h"));
    }

    #[test]
    fn test_unresolved_internal_keeps_normalized_target() {
        let result = analyze(&[("src/x/a.ts", "import m from '../missing';")]);
        assert_eq!(result.dependencies.len(), 1);
        assert!(!result.dependencies[0].resolved);
        assert!(!result.dependencies[0].is_external);
        assert_eq!(result.dependencies[0].target, "src/missing");
        assert_eq!(result.graph.edge_count(), 0);
    }

    #[test]
    fn test_cycle_scope_filters_membership() {
        let files: Vec<SourceFile> = [
            ("a.ts", "import './b';"),
            ("b.ts", "import './a';"),
            ("c.ts", "import './d';"),
            ("d.ts", "import './c';"),
        ]
        .iter()
        .map(|(p, t)| SourceFile::from_text(*p, *t))
        .collect();

        let all = analyze_dependencies(&files, &AnalysisOptions::default());
        assert_eq!(all.cycles.len(), 2);

        let options = AnalysisOptions {
            cycle_scope: Some(PathBuf::from("c.ts")),
            ..AnalysisOptions::default()
        };
        let scoped = analyze_dependencies(&files, &options);
        assert_eq!(scoped.cycles.len(), 1);
        assert!(scoped.cycles[0].contains(Path::new("c.ts")));
    }

    #[test]
    fn test_max_cycles_truncates() {
        let mut graph = DepGraph::new();
        let a = graph.add_file(Path::new("a"));
        let b = graph.add_file(Path::new("b"));
        let c = graph.add_file(Path::new("c"));
        graph.add_edge(a, b);
        graph.add_edge(b, a);
        graph.add_edge(b, c);
        graph.add_edge(c, b);
        let (cycles, truncated) = find_cycles(&graph, None, 1);
        assert_eq!(cycles.len(), 1);
        assert!(truncated);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_path(Path::new("/r/../s")), PathBuf::from("/s"));
    }
}

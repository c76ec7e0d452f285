/// Integration tests: the library pipeline on tempfile fixture trees, and the
/// compiled `codescope` binary driven through subprocesses.
///
/// `CARGO_BIN_EXE_codescope` is set by Cargo during `cargo test` to the binary
/// built for the current profile.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use codescope::config::{AnalysisOptions, CodescopeConfig, Stage};
use codescope::pipeline::{analyze, analyze_project};
use codescope::source::SourceFile;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_codescope"))
}

/// Create a temp project from `(relative path, contents)` pairs.
fn fixture(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

/// Run a codescope command and assert it exits successfully. Returns stdout.
fn run_success(args: &[&str]) -> String {
    let out = Command::new(binary())
        .args(args)
        .output()
        .expect("failed to invoke codescope binary");
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert!(
        out.status.success(),
        "command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
        args,
        out.status,
        stdout,
        stderr
    );
    stdout
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let stdout = run_success(args);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("invalid JSON ({e}):\n{stdout}"))
}

fn two_file_scenario() -> Vec<SourceFile> {
    vec![
        SourceFile::from_text("a.ts", "function foo(){ bar(); }"),
        SourceFile::from_text("b.ts", "function bar(){}"),
    ]
}

// ---------------------------------------------------------------------------
// Library pipeline
// ---------------------------------------------------------------------------

#[test]
fn test_two_file_call_scenario() {
    let result = analyze(&two_file_scenario(), &AnalysisOptions::default()).unwrap();

    assert_eq!(result.symbols.len(), 2);
    assert_eq!(result.calls.len(), 1);
    let call = &result.calls[0];
    assert_eq!((call.caller.as_str(), call.callee.as_str()), ("foo", "bar"));
    assert_eq!(call.file_path, Path::new("a.ts"));
    assert_eq!((call.location.line, call.location.column), (1, 17));

    let xref = result.cross_references.as_ref().unwrap();
    let bar = xref.symbol_usage.iter().find(|u| u.name == "bar").unwrap();
    assert_eq!(bar.reference_count, 1);
    let foo = xref.symbol_usage.iter().find(|u| u.name == "foo").unwrap();
    assert_eq!(foo.reference_count, 0);

    let flows = result.flows.as_ref().unwrap();
    let entries: Vec<&str> = flows.entry_points.iter().map(|n| n.name.as_str()).collect();
    let sinks: Vec<&str> = flows.sinks.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(entries, vec!["foo"]);
    assert_eq!(sinks, vec!["bar"]);
    assert_eq!(flows.execution_paths.len(), 1);
    assert_eq!(flows.execution_paths[0].symbols, vec!["foo", "bar"]);
    assert_eq!(
        flows.execution_paths[0].files,
        vec![PathBuf::from("a.ts"), PathBuf::from("b.ts")]
    );
}

#[test]
fn test_analysis_is_deterministic_and_order_independent() {
    let files = vec![
        SourceFile::from_text("src/util.ts", "export function helper() { return 1; }"),
        SourceFile::from_text(
            "src/main.ts",
            "import { helper } from './util';\nfunction main() { helper(); }\n",
        ),
        SourceFile::from_text("src/model.ts", "class Base {}\nclass User extends Base {}\n"),
    ];
    let mut reversed = files.clone();
    reversed.reverse();

    let first = analyze(&files, &AnalysisOptions::default()).unwrap();
    let second = analyze(&reversed, &AnalysisOptions::default()).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_two_cycle_with_unrelated_file() {
    let files = vec![
        SourceFile::from_text("a.ts", "import { b } from './b';"),
        SourceFile::from_text("b.ts", "import { a } from './a';"),
        SourceFile::from_text("c.ts", "import fs from 'fs';"),
    ];
    let result = analyze(&files, &AnalysisOptions::default()).unwrap();
    let deps = result.dependencies.unwrap();

    assert_eq!(deps.cycles.len(), 1);
    let cycle = &deps.cycles[0];
    assert_eq!(cycle.length, 2);
    assert!(cycle.contains(Path::new("a.ts")));
    assert!(cycle.contains(Path::new("b.ts")));
    assert!(!cycle.contains(Path::new("c.ts")));
    assert_eq!(cycle.paths.first(), cycle.paths.last());
    assert!(deps.external_dependencies.contains("fs"));
}

#[test]
fn test_impact_is_monotonic_in_importers() {
    let base = vec![
        SourceFile::from_text("core.ts", "export function core() {}"),
        SourceFile::from_text("one.ts", "import { core } from './core';"),
    ];
    let mut grown = base.clone();
    grown.push(SourceFile::from_text("two.ts", "import { core } from './core';"));

    let before = analyze(&base, &AnalysisOptions::default()).unwrap();
    let after = analyze(&grown, &AnalysisOptions::default()).unwrap();
    let core = Path::new("core.ts");
    let b = &before.impact.as_ref().unwrap().impact_by_file[core];
    let a = &after.impact.as_ref().unwrap().impact_by_file[core];
    assert!(a.direct_impact.len() >= b.direct_impact.len() + 1);
    assert!(a.impact_score >= b.impact_score);
}

#[test]
fn test_hotspots_are_bounded_and_sorted() {
    let mut lib = String::new();
    let mut main = String::from("function main() {\n");
    for i in 0..15 {
        lib.push_str(&format!("function f{i:02}() {{}}\n"));
        for _ in 0..=(i % 3) {
            main.push_str(&format!("  f{i:02}();\n"));
        }
    }
    main.push_str("}\n");
    let files = vec![
        SourceFile::from_text("lib.ts", lib),
        SourceFile::from_text("main.ts", main),
    ];
    let result = analyze(&files, &AnalysisOptions::default()).unwrap();
    let hotspots = &result.cross_references.as_ref().unwrap().hotspots;
    assert!(hotspots.len() <= 10);
    assert!(
        hotspots
            .windows(2)
            .all(|w| w[0].reference_count >= w[1].reference_count)
    );
    assert_eq!(hotspots[0].reference_count, 3);
}

#[test]
fn test_quality_scores_are_bounded() {
    let noisy: String = (0..120)
        .map(|i| format!("if (x{i} && y || z) {{ return w ? 1 : 2; }}\n"))
        .collect();
    let files = vec![
        SourceFile::from_text("noisy.ts", noisy.clone()),
        SourceFile::from_text("copy.ts", noisy),
    ];
    let result = analyze(&files, &AnalysisOptions::default()).unwrap();
    let quality = result.quality.unwrap();
    assert!(quality.overall_score <= 100);
    for s in [
        quality.scores.complexity,
        quality.scores.long_functions,
        quality.scores.duplication,
        quality.scores.comments,
    ] {
        assert!((0.0..=100.0).contains(&s), "sub-score {s} out of range");
    }
    assert!(!quality.duplications.is_empty());
}

#[test]
fn test_project_with_binary_file() {
    let dir = fixture(&[
        ("src/a.ts", "import { bar } from './b';\nfunction foo(){ bar(); }\n"),
        ("src/b.ts", "export function bar(){}\n"),
        ("node_modules/dep/index.js", "function ignored() {}\n"),
    ]);
    fs::write(dir.path().join("src/blob.ts"), [0u8, 159, 146, 150, 0, 1]).unwrap();

    let result = analyze_project(dir.path(), &CodescopeConfig::default()).unwrap();
    assert_eq!(
        result.files,
        vec![
            PathBuf::from("src/a.ts"),
            PathBuf::from("src/b.ts"),
            PathBuf::from("src/blob.ts"),
        ]
    );
    assert_eq!(result.unreadable_files, vec![PathBuf::from("src/blob.ts")]);
    let blob = Path::new("src/blob.ts");
    assert!(result.symbols.iter().all(|s| s.file_path != blob));

    let deps = result.dependencies.as_ref().unwrap();
    assert!(deps.dependencies.iter().all(|d| d.source != blob));
    assert_eq!(deps.dependency_counts[blob].outbound, 0);

    let quality = result.quality.as_ref().unwrap();
    let complexity = quality.complexity.iter().find(|c| c.file_path == blob).unwrap();
    assert_eq!(complexity.complexity, 1);
}

#[test]
fn test_stage_subset_skips_graph_work() {
    let options = AnalysisOptions {
        stages: BTreeSet::from([Stage::Dependencies]),
        ..AnalysisOptions::default()
    };
    let result = analyze(&two_file_scenario(), &options).unwrap();
    assert!(result.dependencies.is_some());
    assert!(result.symbols.is_empty());
    assert!(result.flows.is_none());
    assert!(result.quality.is_none());
}

// ---------------------------------------------------------------------------
// Binary
// ---------------------------------------------------------------------------

#[test]
fn test_analyze_json_output() {
    let dir = fixture(&[
        ("a.ts", "function foo(){ bar(); }"),
        ("b.ts", "function bar(){}"),
    ]);
    let path = dir.path().to_str().unwrap();
    let json = run_json(&["analyze", path, "--format", "json"]);

    assert_eq!(json["summary"]["file_count"], 2);
    assert_eq!(json["summary"]["call_edges"], 1);
    assert_eq!(json["calls"][0]["caller"], "foo");
    assert_eq!(json["calls"][0]["file_path"], "a.ts");
    assert!(json["quality"]["overall_score"].as_u64().unwrap() <= 100);
}

#[test]
fn test_circular_command() {
    let dir = fixture(&[
        ("a.ts", "import './b';"),
        ("b.ts", "import './a';"),
        ("c.ts", "export const c = 1;"),
    ]);
    let path = dir.path().to_str().unwrap();

    let json = run_json(&["circular", path, "--format", "json"]);
    let cycles = json["cycles"].as_array().unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0]["length"], 2);

    let compact = run_success(&["circular", path]);
    assert!(compact.contains("a.ts -> b.ts -> a.ts"), "output was {compact}");
    assert!(compact.contains("1 cycles found"));
}

#[test]
fn test_impact_command_for_one_file() {
    let dir = fixture(&[
        ("core.ts", "export function core() {}"),
        ("one.ts", "import { core } from './core';"),
        ("two.ts", "import { core } from './one';"),
    ]);
    let path = dir.path().to_str().unwrap();
    let json = run_json(&["impact", path, "--file", "core.ts", "--format", "json"]);
    let prediction = &json["prediction"];
    assert_eq!(prediction["direct_impact"][0], "one.ts");
    assert_eq!(prediction["transitive_impact"][0], "two.ts");
    assert_eq!(prediction["total_impact_count"], 2);
}

#[test]
fn test_quality_command_with_threshold_override() {
    let body: String = (0..12).map(|i| format!("  let v{i} = {i};\n")).collect();
    let source = format!("function medium() {{\n{body}}}\n");
    let dir = fixture(&[("m.ts", source.as_str())]);
    let path = dir.path().to_str().unwrap();

    let default_run = run_json(&["quality", path, "--format", "json"]);
    assert!(default_run["long_functions"].as_array().unwrap().is_empty());

    let strict = run_json(&["quality", path, "--format", "json", "--long-function-lines", "5"]);
    let long = strict["long_functions"].as_array().unwrap();
    assert_eq!(long.len(), 1);
    assert_eq!(long[0]["name"], "medium");
    assert_eq!(long[0]["length"], 14);
}

#[test]
fn test_config_file_is_honored() {
    let dir = fixture(&[
        ("codescope.toml", "[analysis]\nhotspot_limit = 1\n"),
        ("a.ts", "function a() { b(); c(); c(); }"),
        ("b.ts", "function b() {}"),
        ("c.ts", "function c() {}"),
    ]);
    let path = dir.path().to_str().unwrap();
    let json = run_json(&["hotspots", path, "--format", "json"]);
    let hotspots = json["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["name"], "c");
}

#[test]
fn test_missing_root_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope");
    let out = Command::new(binary())
        .args(["analyze", missing.to_str().unwrap()])
        .output()
        .expect("failed to invoke codescope binary");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("repository root does not exist"), "stderr was {stderr}");
}

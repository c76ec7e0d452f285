use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::analysis::impact::ImpactPrediction;
use crate::cli::OutputFormat;
use crate::pipeline::AnalysisResult;

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(s) => s,
        Err(e) => format!("{{\"error\": {:?}}}", e.to_string()),
    }
}

/// Summary line block shared by `analyze` and the other views.
fn write_summary(out: &mut String, result: &AnalysisResult) {
    let s = &result.summary;
    let _ = writeln!(
        out,
        "analyzed {} files ({} unreadable)",
        s.file_count, s.unreadable_count
    );
    let kinds: Vec<String> = s
        .symbols_by_kind
        .iter()
        .map(|(kind, n)| format!("{n} {}", kind.as_str()))
        .collect();
    let _ = writeln!(
        out,
        "  {} symbols{}",
        s.symbol_count,
        if kinds.is_empty() {
            String::new()
        } else {
            format!(" ({})", kinds.join(", "))
        }
    );
    let _ = writeln!(
        out,
        "  {} calls, {} inheritance, {} dependency edges, {} external packages",
        s.call_edges, s.inheritance_edges, s.dependency_edges, s.external_dependencies
    );
    let _ = writeln!(out, "  {} cycles", s.cycle_count);
    if let Some(score) = s.overall_quality {
        let _ = writeln!(out, "  quality score {score}/100");
    }
}

fn write_cycles(out: &mut String, result: &AnalysisResult) {
    let Some(deps) = &result.dependencies else {
        return;
    };
    for cycle in &deps.cycles {
        let chain: Vec<String> = cycle.paths.iter().map(|p| p.display().to_string()).collect();
        let _ = writeln!(out, "cycle {} {}", cycle.length, chain.join(" -> "));
    }
    let _ = writeln!(out, "{} cycles found", deps.cycles.len());
    if deps.truncated {
        let _ = writeln!(out, "cycle search stopped early; raise max_cycles to see more");
    }
}

fn write_hotspots(out: &mut String, result: &AnalysisResult) {
    let Some(xref) = &result.cross_references else {
        return;
    };
    for usage in &xref.hotspots {
        let _ = writeln!(
            out,
            "hot {} {} {} refs={}",
            usage.name,
            usage.file_path.display(),
            usage.kind.as_str(),
            usage.reference_count
        );
    }
    for usage in &xref.unused {
        let _ = writeln!(
            out,
            "unused {} {} {}",
            usage.name,
            usage.file_path.display(),
            usage.kind.as_str()
        );
    }
    let _ = writeln!(
        out,
        "{} hotspots, {} unused symbols",
        xref.hotspots.len(),
        xref.unused.len()
    );
}

fn write_impact_ranking(out: &mut String, result: &AnalysisResult) {
    let Some(impact) = &result.impact else {
        return;
    };
    for f in &impact.most_impactful_files {
        let _ = writeln!(out, "most {} {:.1}", f.file_path.display(), f.impact_score);
    }
    for f in &impact.least_impactful_files {
        let _ = writeln!(out, "least {} {:.1}", f.file_path.display(), f.impact_score);
    }
    for f in &impact.isolated_files {
        let _ = writeln!(out, "isolated {}", f.display());
    }
}

fn write_prediction(out: &mut String, prediction: &ImpactPrediction, factors: &[String]) {
    let _ = writeln!(
        out,
        "impact {} score={:.1} total={}",
        prediction.file_path.display(),
        prediction.impact_score,
        prediction.total_impact_count
    );
    for p in &prediction.direct_impact {
        let _ = writeln!(out, "direct {}", p.display());
    }
    for p in &prediction.transitive_impact {
        let _ = writeln!(out, "transitive {}", p.display());
    }
    for area in &prediction.risky_areas {
        let _ = writeln!(out, "risk {} {} {}", area.risk, area.path.display(), area.reason);
    }
    for factor in factors {
        let _ = writeln!(out, "factor {factor}");
    }
}

fn write_quality(out: &mut String, result: &AnalysisResult) {
    let Some(quality) = &result.quality else {
        return;
    };
    for f in &quality.long_functions {
        let _ = writeln!(
            out,
            "long {} {}:{}-{} lines={}",
            f.name,
            f.file_path.display(),
            f.start_line,
            f.end_line,
            f.length
        );
    }
    for d in &quality.duplications {
        let _ = writeln!(
            out,
            "dup {}:{}-{} {}:{}-{} lines={} sim={:.2}",
            d.file_a.display(),
            d.start_a,
            d.end_a,
            d.file_b.display(),
            d.start_b,
            d.end_b,
            d.lines,
            d.similarity
        );
    }
    for c in &quality.excessive_comments {
        let _ = writeln!(
            out,
            "comments {} ratio={:.2} lines={}",
            c.file_path.display(),
            c.ratio,
            c.comment_lines
        );
    }
    for c in &quality.commented_out_code {
        let _ = writeln!(out, "dead {}:{} {}", c.file_path.display(), c.line, c.text);
    }
    let s = &quality.scores;
    let _ = writeln!(
        out,
        "score {} (complexity {:.0}, long functions {:.0}, duplication {:.0}, comments {:.0})",
        quality.overall_score, s.complexity, s.long_functions, s.duplication, s.comments
    );
}

/// Full report: summary followed by every section that ran.
pub fn render_analysis(result: &AnalysisResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(result);
    }
    let mut out = String::new();
    write_summary(&mut out, result);
    write_cycles(&mut out, result);
    write_hotspots(&mut out, result);
    write_impact_ranking(&mut out, result);
    write_quality(&mut out, result);
    out
}

pub fn render_circular(result: &AnalysisResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let value = result.dependencies.as_ref().map(|d| {
            serde_json::json!({
                "cycles": d.cycles,
                "truncated": d.truncated,
            })
        });
        return to_json(&value);
    }
    let mut out = String::new();
    write_cycles(&mut out, result);
    out
}

pub fn render_hotspots(result: &AnalysisResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        let value = result.cross_references.as_ref().map(|x| {
            serde_json::json!({
                "hotspots": x.hotspots,
                "unused": x.unused,
                "files_with_most_symbols": x.files_with_most_symbols,
            })
        });
        return to_json(&value);
    }
    let mut out = String::new();
    write_hotspots(&mut out, result);
    out
}

/// One file's prediction when `file` is given, else the impact ranking.
pub fn render_impact(result: &AnalysisResult, file: Option<&Path>, format: OutputFormat) -> String {
    let Some(impact) = &result.impact else {
        return String::new();
    };
    match file {
        Some(file) => {
            let Some(prediction) = impact.impact_by_file.get(file) else {
                return match format {
                    OutputFormat::Json => "null".to_owned(),
                    OutputFormat::Compact => format!("no analyzed file {}\n", file.display()),
                };
            };
            let factors = impact
                .risk_factors
                .get(file)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if format == OutputFormat::Json {
                return to_json(&serde_json::json!({
                    "prediction": prediction,
                    "risk_factors": factors,
                }));
            }
            let mut out = String::new();
            write_prediction(&mut out, prediction, factors);
            out
        }
        None => {
            if format == OutputFormat::Json {
                return to_json(&serde_json::json!({
                    "most_impactful_files": impact.most_impactful_files,
                    "least_impactful_files": impact.least_impactful_files,
                    "isolated_files": impact.isolated_files,
                }));
            }
            let mut out = String::new();
            write_impact_ranking(&mut out, result);
            out
        }
    }
}

pub fn render_quality(result: &AnalysisResult, format: OutputFormat) -> String {
    if format == OutputFormat::Json {
        return to_json(&result.quality);
    }
    let mut out = String::new();
    write_quality(&mut out, result);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisOptions;
    use crate::pipeline::analyze;
    use crate::source::SourceFile;

    fn result() -> AnalysisResult {
        let files = vec![
            SourceFile::from_text("a.ts", "import './b';\nfunction foo(){ bar(); }"),
            SourceFile::from_text("b.ts", "import './a';\nfunction bar(){}"),
        ];
        analyze(&files, &AnalysisOptions::default()).unwrap()
    }

    #[test]
    fn test_compact_analysis_mentions_sections() {
        let text = render_analysis(&result(), OutputFormat::Compact);
        assert!(text.starts_with("analyzed 2 files (0 unreadable)"));
        assert!(text.contains("cycle 2 a.ts -> b.ts -> a.ts"));
        assert!(text.contains("hot bar b.ts function refs=1"));
        assert!(text.contains("score "));
    }

    #[test]
    fn test_json_views_parse() {
        let r = result();
        for text in [
            render_analysis(&r, OutputFormat::Json),
            render_circular(&r, OutputFormat::Json),
            render_hotspots(&r, OutputFormat::Json),
            render_impact(&r, None, OutputFormat::Json),
            render_impact(&r, Some(Path::new("b.ts")), OutputFormat::Json),
            render_quality(&r, OutputFormat::Json),
        ] {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert!(!value.is_null());
        }
    }

    #[test]
    fn test_impact_for_unknown_file() {
        let text = render_impact(&result(), Some(Path::new("zzz.ts")), OutputFormat::Compact);
        assert_eq!(text, "no analyzed file zzz.ts\n");
    }
}

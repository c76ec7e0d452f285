use std::collections::HashSet;
use std::path::PathBuf;

use rayon::prelude::*;
use serde::Serialize;

use crate::parser::lexer::sanitize;
use crate::source::SourceFile;

/// Cleaned lines shorter than this carry no signal (`}`, `end`, `else`).
const MIN_LINE_LEN: usize = 5;

/// A run of matching lines shared by two files.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Duplication {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub start_a: usize,
    pub end_a: usize,
    pub start_b: usize,
    pub end_b: usize,
    /// Cleaned lines in the reported run.
    pub lines: usize,
    /// Fraction of matching lines in the chunk that triggered the report.
    pub similarity: f64,
}

struct CleanLine {
    number: usize,
    text: String,
}

struct Cleaned<'a> {
    path: &'a PathBuf,
    lines: &'a [CleanLine],
    distinct: HashSet<&'a str>,
}

/// Trim each line, strip comments and drop short lines, keeping line numbers.
fn clean(file: &SourceFile) -> Vec<CleanLine> {
    let Some(text) = file.text.as_deref() else {
        return Vec::new();
    };
    sanitize(text, file.language)
        .into_iter()
        .filter_map(|line| {
            let end = line.code.trim_end().len();
            let kept = line.raw.get(..end).unwrap_or(line.raw).trim();
            (kept.len() >= MIN_LINE_LEN).then(|| CleanLine {
                number: line.number,
                text: kept.to_owned(),
            })
        })
        .collect()
}

/// Compare every pair of files chunk by chunk.
///
/// A chunk of `chunk_size` cleaned lines in file A matches a window of file B
/// when the fraction of positionally equal lines reaches `threshold`. The match
/// is then extended while lines keep matching, and scanning resumes after it in
/// both files.
pub fn find_duplications(files: &[SourceFile], chunk_size: usize, threshold: f64) -> Vec<Duplication> {
    let cleaned_lines: Vec<Vec<CleanLine>> = files.par_iter().map(clean).collect();
    let cleaned: Vec<Cleaned> = files
        .iter()
        .zip(&cleaned_lines)
        .filter(|(_, lines)| lines.len() >= chunk_size)
        .map(|(file, lines)| Cleaned {
            path: &file.path,
            distinct: lines.iter().map(|l| l.text.as_str()).collect(),
            lines,
        })
        .collect();

    let pairs: Vec<(usize, usize)> = (0..cleaned.len())
        .flat_map(|a| (a + 1..cleaned.len()).map(move |b| (a, b)))
        .collect();

    let found: Vec<Vec<Duplication>> = pairs
        .par_iter()
        .map(|&(a, b)| compare(&cleaned[a], &cleaned[b], chunk_size, threshold))
        .collect();
    found.into_iter().flatten().collect()
}

fn compare(a: &Cleaned, b: &Cleaned, chunk: usize, threshold: f64) -> Vec<Duplication> {
    let needed = (threshold * chunk as f64).ceil() as usize;
    let mut out = Vec::new();
    let mut i = 0;
    let mut j_floor = 0;

    while i + chunk <= a.lines.len() {
        let window = &a.lines[i..i + chunk];
        let shared = window
            .iter()
            .filter(|l| b.distinct.contains(l.text.as_str()))
            .count();
        if shared < needed {
            i += 1;
            continue;
        }

        let mut matched = false;
        let mut j = j_floor;
        while j + chunk <= b.lines.len() {
            let equal = window
                .iter()
                .zip(&b.lines[j..j + chunk])
                .filter(|(x, y)| x.text == y.text)
                .count();
            let similarity = equal as f64 / chunk as f64;
            if similarity >= threshold {
                let mut len = chunk;
                while i + len < a.lines.len()
                    && j + len < b.lines.len()
                    && a.lines[i + len].text == b.lines[j + len].text
                {
                    len += 1;
                }
                out.push(Duplication {
                    file_a: a.path.clone(),
                    file_b: b.path.clone(),
                    start_a: a.lines[i].number,
                    end_a: a.lines[i + len - 1].number,
                    start_b: b.lines[j].number,
                    end_b: b.lines[j + len - 1].number,
                    lines: len,
                    similarity,
                });
                i += len;
                j_floor = j + len;
                matched = true;
                break;
            }
            j += 1;
        }
        if !matched {
            i += 1;
        }
    }
    out
}

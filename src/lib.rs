//! Lexical static analysis for polyglot codebases.
//!
//! [`pipeline::analyze`] turns a set of [`source::SourceFile`]s into a symbol
//! table, a file dependency graph with cycles, cross references, call flows,
//! change-impact predictions and code-quality scores.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod language;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod walker;

pub use error::{AnalysisError, Result};
pub use pipeline::{AnalysisResult, analyze, analyze_project};

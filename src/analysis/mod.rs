//! Graph and metric stages run on top of the extracted symbols and relations.

pub mod dependencies;
pub mod flow;
pub mod impact;
pub mod quality;
pub mod xref;

pub use dependencies::{DependencyAnalysis, analyze_dependencies};
pub use flow::{FlowAnalysis, analyze_flows};
pub use impact::{ChangeImpactAnalysis, ImpactInputs, analyze_change_impact};
pub use quality::{CodeQualityAnalysis, analyze_code_quality};
pub use xref::{CrossReferenceAnalysis, analyze_cross_references};

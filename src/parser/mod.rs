pub mod imports;
pub mod lexer;
pub mod relationships;
pub mod symbols;
pub mod treesitter;

use std::path::Path;

use crate::config::ExtractorKind;
use crate::graph::node::Symbol;

pub use symbols::LexicalExtractor;
pub use treesitter::TreeSitterExtractor;

/// Strategy for turning one file's text into its declared symbols.
///
/// Implementations must be pure: the same `(text, path)` always yields the same
/// symbols in the same order, so extraction can fan out across rayon workers.
pub trait SymbolExtractor: Send + Sync {
    fn extract_symbols(&self, text: &str, path: &Path) -> Vec<Symbol>;
}

/// The extractor selected by configuration.
pub fn extractor_for(kind: ExtractorKind) -> Box<dyn SymbolExtractor> {
    match kind {
        ExtractorKind::Lexical => Box::new(LexicalExtractor),
        ExtractorKind::TreeSitter => Box::new(TreeSitterExtractor),
    }
}

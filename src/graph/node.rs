use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Index of a symbol inside a [`super::SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub usize);

/// The kind of symbol extracted from source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A function declaration or a variable bound to an arrow function.
    Function,
    /// A class (or struct) declaration.
    Class,
    /// An interface, protocol or trait declaration.
    Interface,
    /// A module-scope variable that is not bound to a function.
    Variable,
    /// A function declared inside a class body.
    Method,
    Property,
    Enum,
    /// A Ruby `module` or similar namespace.
    Module,
    Unknown,
}

impl SymbolKind {
    /// Functions and methods are the nodes of execution paths.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Method)
    }

    /// Lowercase label used in compact output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Variable => "variable",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Enum => "enum",
            SymbolKind::Module => "module",
            SymbolKind::Unknown => "unknown",
        }
    }
}

/// 1-based position of a declaration or reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Property key holding the `extends` target of a class or interface.
pub const PROP_EXTENDS: &str = "extends";
/// Property key holding a comma-separated `implements` list.
pub const PROP_IMPLEMENTS: &str = "implements";

/// A named code entity with its declaration site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: PathBuf,
    pub location: Location,
    /// Name of the enclosing class for methods.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Names of members declared inside this symbol, in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub properties: BTreeMap<String, String>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        file_path: impl Into<PathBuf>,
        location: Location,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            file_path: file_path.into(),
            location,
            parent: None,
            children: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_owned(), value.into());
        self
    }
}

use std::path::Path;

use clang_ast::SourceLocation;

use crate::error::ParseFailure;
use crate::frontend::clang_nodes::{Node, deserialize_root};
use crate::frontend::diagnostics::Diagnostic;
use crate::semantic::decl_table::DeclTable;
use crate::semantic::locations::LocationMap;

/// A successfully parsed translation unit: the AST root plus the tables
/// the visitors consult.
#[derive(Debug)]
pub struct ParsedUnit {
    id: u64,
    root: Node,
    decls: DeclTable,
    locations: LocationMap,
    diagnostics: Vec<Diagnostic>,
}

impl ParsedUnit {
    /// Deserialize a clang JSON AST dump of `primary`.
    pub fn from_json(
        id: u64,
        json: &str,
        primary: &Path,
        working_directory: &Path,
    ) -> Result<Self, ParseFailure> {
        let root = deserialize_root(json)?;
        Ok(Self::from_root(id, root, primary, working_directory))
    }

    pub fn from_root(
        id: u64,
        root: Node,
        primary: &Path,
        working_directory: &Path,
    ) -> Self {
        let mut locations = LocationMap::new(primary, working_directory);
        let decls = DeclTable::build(&root, &mut locations);
        Self {
            id,
            root,
            decls,
            locations,
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn with_diagnostics(
        mut self,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Sequence number of the parse that produced this unit.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn decls(&self) -> &DeclTable {
        &self.decls
    }

    pub fn locations(&self) -> &LocationMap {
        &self.locations
    }

    /// Canonical path of the main file.
    pub fn primary(&self) -> &str {
        self.locations.primary()
    }

    /// Non-fatal diagnostics reported while parsing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Render a front-end location as `file:line:column`.
    pub fn print_location(
        &self,
        loc: &SourceLocation,
    ) -> Option<String> {
        let mut resolved = self.locations.resolve(loc)?;
        if resolved.file.is_empty() {
            resolved.file = self.primary().to_owned();
        }
        Some(resolved.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/src/frontend/parsed_tests.rs"]
mod tests;

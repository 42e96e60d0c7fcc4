use clang_ast::SourceLocation;
use tracing::trace;

use crate::frontend::clang_nodes::resolve_loc;
use crate::semantic::locations::LocationMap;

/// Preprocessor events observed while a translation unit is walked.
pub trait PreprocessorCallbacks {
    /// The current file changed. `None` marks a synthetic buffer boundary.
    fn file_changed(
        &mut self,
        file: Option<&str>,
    );

    /// `includer` pulled in `included`.
    fn inclusion_directive(
        &mut self,
        _includer: &str,
        _included: &str,
    ) {
    }
}

/// Knows which physical file is current at each point of the walk.
///
/// The AST dump carries no live preprocessor stream, so file changes are
/// derived from the locations of the nodes as they are visited: a
/// location in a different file than the current one is a file change, and
/// a location that records where its file was included from also reports
/// the inclusion. Events are forwarded to an optional downstream observer.
#[derive(Default)]
pub struct FileTracker<'a> {
    current: Option<String>,
    downstream: Option<Box<dyn PreprocessorCallbacks + Send + 'a>>,
}

impl std::fmt::Debug for FileTracker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTracker")
            .field("current", &self.current)
            .field("downstream", &self.downstream.is_some())
            .finish()
    }
}

impl<'a> FileTracker<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_downstream(downstream: Box<dyn PreprocessorCallbacks + Send + 'a>) -> Self {
        Self {
            current: None,
            downstream: Some(downstream),
        }
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Update the current file from a node location.
    pub fn observe(
        &mut self,
        loc: &SourceLocation,
        locations: &LocationMap,
    ) {
        let Some(bare) = resolve_loc(loc) else {
            return;
        };
        if bare.file.is_empty() {
            return;
        }
        let file = locations.canonical_file(&bare.file);
        if self.current.as_deref() == Some(file.as_str()) {
            return;
        }
        if let Some(from) = &bare.included_from
            && !from.file.is_empty()
        {
            let includer = locations.canonical_file(&from.file);
            self.inclusion_directive(&includer, &file);
        }
        self.file_changed(Some(&file));
    }
}

impl PreprocessorCallbacks for FileTracker<'_> {
    fn file_changed(
        &mut self,
        file: Option<&str>,
    ) {
        let file = file.filter(|f| !f.is_empty());
        trace!("[file-tracker] current file: {}", file.unwrap_or("<none>"));
        self.current = file.map(str::to_owned);
        if let Some(downstream) = self.downstream.as_mut() {
            downstream.file_changed(file);
        }
    }

    fn inclusion_directive(
        &mut self,
        includer: &str,
        included: &str,
    ) {
        if let Some(downstream) = self.downstream.as_mut() {
            downstream.inclusion_directive(includer, included);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/src/index/file_tracker_tests.rs"]
mod tests;

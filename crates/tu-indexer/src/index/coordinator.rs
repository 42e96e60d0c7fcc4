use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clang_ast::{Id, SourceLocation};
use tracing::debug;

use crate::frontend::clang_nodes::{Clang, Node, with_stack};
use crate::frontend::parsed::ParsedUnit;
use crate::index::facts::{Fact, FactSink, FileLocation, Reference, ReferenceKind, Target};
use crate::index::file_tracker::{FileTracker, PreprocessorCallbacks};
use crate::index::options::IndexOptions;
use crate::index::type_resolver::TypeResolver;
use crate::semantic::decl_table::{DeclClass, DeclTable, pattern_index};
use crate::semantic::locations::is_physical_file;

/// Cooperative cancellation flag shared between a traversal and whoever
/// may want to stop it.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Counters of one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub declarations: usize,
    pub symbols: usize,
    pub references: usize,
    pub aborted: bool,
}

/// Drives the declaration and statement visitors over one parsed unit.
pub struct TraversalCoordinator<'u> {
    unit: &'u ParsedUnit,
    options: IndexOptions,
    abort: AbortHandle,
    tracker: FileTracker<'u>,
}

impl<'u> TraversalCoordinator<'u> {
    pub fn new(
        unit: &'u ParsedUnit,
        options: IndexOptions,
    ) -> Self {
        Self {
            unit,
            options,
            abort: AbortHandle::new(),
            tracker: FileTracker::new(),
        }
    }

    /// Share an existing abort flag instead of a fresh one.
    pub fn with_abort_handle(
        mut self,
        abort: AbortHandle,
    ) -> Self {
        self.abort = abort;
        self
    }

    /// Forward preprocessor events to `callbacks`.
    pub fn with_callbacks(
        mut self,
        callbacks: Box<dyn PreprocessorCallbacks + Send + 'u>,
    ) -> Self {
        self.tracker = FileTracker::with_downstream(callbacks);
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Walk the translation unit, emitting facts into `sink`.
    ///
    /// Returns normally when aborted; facts already emitted stay emitted.
    pub fn run<S: FactSink>(
        self,
        sink: S,
    ) -> TraversalStats {
        let unit = self.unit;
        let mut walker = Walker {
            unit,
            decls: unit.decls(),
            resolver: TypeResolver::new(unit.decls(), self.options.max_type_depth),
            tracker: self.tracker,
            options: self.options,
            abort: self.abort,
            sink,
            visited: HashSet::new(),
            stats: TraversalStats::default(),
        };
        // The main file is current before any node is seen.
        walker.tracker.file_changed(Some(unit.primary()));
        walker.traverse_decl(unit.root());

        let mut stats = walker.stats;
        stats.aborted = walker.abort.is_aborted();
        debug!(
            "[traversal {}] {} declarations, {} symbols, {} references{}",
            unit.id(),
            stats.declarations,
            stats.symbols,
            stats.references,
            if stats.aborted { " (aborted)" } else { "" }
        );
        stats
    }
}

/// State of one walk, shared by the declaration and statement visitors.
pub(super) struct Walker<'u, S> {
    pub(super) unit: &'u ParsedUnit,
    pub(super) decls: &'u DeclTable,
    pub(super) resolver: TypeResolver<'u>,
    pub(super) tracker: FileTracker<'u>,
    pub(super) options: IndexOptions,
    pub(super) abort: AbortHandle,
    pub(super) sink: S,
    pub(super) visited: HashSet<Id>,
    pub(super) stats: TraversalStats,
}

impl<S: FactSink> Walker<'_, S> {
    pub(super) fn aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Shared entry point for declarations, from the generic walk and from
    /// declaration statements alike. Each declaration is visited once.
    pub(super) fn traverse_decl(
        &mut self,
        node: &Node,
    ) {
        with_stack(|| self.enter_decl(node));
    }

    fn enter_decl(
        &mut self,
        node: &Node,
    ) {
        if self.aborted() {
            return;
        }
        let is_root = matches!(node.kind, Clang::TranslationUnitDecl(_));
        if !is_root && node.kind.decl_data().is_some_and(|d| d.is_implicit()) {
            return;
        }
        if !self.visited.insert(node.id) {
            return;
        }
        if let Some(loc) = node.kind.loc() {
            self.tracker.observe(loc, self.unit.locations());
        }
        self.stats.declarations += 1;
        self.visit_decl(node);
        self.traverse_decl_children(node);
    }

    /// Recurse into the declarations nested in a declaration context.
    fn traverse_decl_children(
        &mut self,
        node: &Node,
    ) {
        let children: &[Node] = match &node.kind {
            Clang::TranslationUnitDecl(_)
            | Clang::NamespaceDecl(_)
            | Clang::LinkageSpecDecl(_)
            | Clang::RecordDecl(_)
            | Clang::CXXRecordDecl(_)
            | Clang::ClassTemplateSpecializationDecl(_)
            | Clang::ClassTemplatePartialSpecializationDecl(_)
            | Clang::EnumDecl(_)
            | Clang::FriendDecl(_)
            | Clang::Other { .. } => &node.inner,
            kind if kind.is_function() => &node.inner,
            kind if kind.is_template() => match pattern_index(node) {
                Some(pattern) => &node.inner[..=pattern],
                None => &node.inner,
            },
            _ => &[],
        };
        let is_function = node.kind.is_function();
        for child in children {
            if self.aborted() {
                return;
            }
            if !child.kind.is_decl() {
                continue;
            }
            // Only parameters are walked generically inside a function; its
            // body reaches nested declarations through statements.
            if is_function && !matches!(child.kind, Clang::ParmVarDecl(_)) {
                continue;
            }
            self.traverse_decl(child);
        }
    }

    /// Resolve the position of a fact. A location without a file is in the
    /// tracker's current file; pseudo files yield nothing.
    pub(super) fn site_location(
        &self,
        loc: Option<&SourceLocation>,
    ) -> Option<FileLocation> {
        let mut resolved = self.unit.locations().resolve(loc?)?;
        if resolved.file.is_empty() {
            resolved.file = self.tracker.current_file()?.to_owned();
        }
        is_physical_file(&resolved.file).then_some(resolved)
    }

    /// Describe the declaration a reference resolves to, applying the
    /// variable-definition rule. Implicit declarations are not targets.
    pub(super) fn target_for(
        &self,
        id: Id,
    ) -> Option<Target> {
        let info = self.decls.get(self.decls.definition_of(id))?;
        if info.is_implicit {
            return None;
        }
        let location = info.location.clone()?;
        Some(Target {
            qualified_name: info.qualified_name.clone(),
            kind: info.kind.clone(),
            location,
        })
    }

    /// Whether references to `id` are indexed at all.
    pub(super) fn is_indexable_target(
        &self,
        id: Id,
    ) -> bool {
        match self.decls.get(id) {
            Some(info) => !info.is_implicit && (!info.is_local || self.options.index_locals),
            None => false,
        }
    }

    pub(super) fn is_function_decl(
        &self,
        id: Id,
    ) -> bool {
        self.decls.get(id).is_some_and(|info| info.class == DeclClass::Function && !info.is_implicit)
    }

    pub(super) fn emit_reference(
        &mut self,
        kind: ReferenceKind,
        site: FileLocation,
        target: Option<Target>,
    ) {
        self.emit(Fact::Reference(Reference { kind, site, target }));
    }

    pub(super) fn emit(
        &mut self,
        fact: Fact,
    ) {
        if self.aborted() {
            return;
        }
        match &fact {
            Fact::Symbol(_) => self.stats.symbols += 1,
            Fact::Reference(_) => self.stats.references += 1,
        }
        self.sink.emit(fact);
    }
}

#[cfg(test)]
#[path = "../../tests/src/index/coordinator_tests.rs"]
mod tests;

//! Symbol and reference extraction over a parsed translation unit.
//!
//! [`TraversalCoordinator`] walks the AST from its root. Declarations and
//! statements are handled by two cooperating visitors sharing one walker:
//! declaration statements re-enter the declaration walk, and declarations
//! hand their bodies and initializers to the statement walk.

pub mod coordinator;
mod decl_visitor;
pub mod facts;
pub mod file_tracker;
pub mod options;
mod stmt_visitor;
pub mod type_resolver;

pub use coordinator::{AbortHandle, TraversalCoordinator, TraversalStats};
pub use facts::{Fact, FactSink, FileLocation, JsonLinesSink, Reference, ReferenceKind, Symbol, SymbolKind, Target};
pub use file_tracker::{FileTracker, PreprocessorCallbacks};
pub use options::IndexOptions;
pub use type_resolver::{DEFAULT_MAX_TYPE_DEPTH, TypeResolver};

pub mod config;
pub mod error;
pub mod frontend;
pub mod index;
pub mod semantic;
pub mod session;

pub use config::Settings;
pub use error::{ConfigError, DescriptorError, IndexError, ParseFailure};
pub use frontend::{CompilationUnit, FrontEnd, ParsedUnit};
pub use index::{
    AbortHandle, Fact, FactSink, FileLocation, IndexOptions, JsonLinesSink, Reference, ReferenceKind, Symbol,
    SymbolKind, Target, TraversalCoordinator, TraversalStats,
};
pub use session::{IndexOutcome, index_parsed, index_unit};

#[cfg(test)]
#[path = "../tests/src/support.rs"]
pub(crate) mod test_support;

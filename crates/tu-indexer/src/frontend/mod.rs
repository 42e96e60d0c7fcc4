//! Boundary with the external C/C++ front-end: describing a compilation,
//! running clang and deserializing its AST.

pub mod clang_nodes;
pub mod database;
pub mod diagnostics;
pub mod driver;
pub mod parsed;
pub mod unit;

pub use database::{CompilationDatabase, CompileCommand};
pub use diagnostics::{Diagnostic, Severity};
pub use driver::{DEFAULT_CLANG, FrontEnd};
pub use parsed::ParsedUnit;
pub use unit::CompilationUnit;

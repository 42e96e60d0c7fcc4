//! Tables derived from the front-end AST before traversal: declarations,
//! canonical file names and types.

pub mod decl_table;
pub mod locations;
pub mod type_parser;
pub mod types;

pub use decl_table::{DeclClass, DeclInfo, DeclTable, TagKind};
pub use locations::{LocationMap, is_physical_file};
pub use types::{QualifiedType, Qualifiers, Type, TypeId, TypeTable};

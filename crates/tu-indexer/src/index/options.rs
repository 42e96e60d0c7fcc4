use crate::index::type_resolver::DEFAULT_MAX_TYPE_DEPTH;

/// Knobs of one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Emit parameters and function-local variables, and references to them.
    pub index_locals: bool,
    /// Emit `TypeUse` references for explicit casts and `sizeof`/`alignof`
    /// type operands.
    pub type_uses: bool,
    /// Recursion cap of the type resolver.
    pub max_type_depth: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            index_locals: false,
            type_uses: false,
            max_type_depth: DEFAULT_MAX_TYPE_DEPTH,
        }
    }
}

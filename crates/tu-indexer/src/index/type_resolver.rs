use std::collections::HashSet;

use clang_ast::Id;
use tracing::trace;

use crate::frontend::clang_nodes;
use crate::index::facts::FileLocation;
use crate::semantic::decl_table::DeclTable;
use crate::semantic::types::{QualifiedType, TypeId, TypeTable};

pub const DEFAULT_MAX_TYPE_DEPTH: usize = 32;

/// Finds the declaration that canonically defines a type.
///
/// Unwrap rules, first match wins:
/// 1. structure or union type: its declaration;
/// 2. C++ class type, directly or as a pointer's pointee: its declaration;
/// 3. pointer: recurse on the canonical pointee;
/// 4. template specialization: the named template's declaration;
/// 5. reference: recurse on the canonical referenced type;
/// 6. otherwise recurse on the canonical unqualified type.
///
/// Rules 3, 5 and 6 only recurse when the next type differs from the
/// current one, no type is visited twice in one resolution, and recursion
/// stops at `max_depth`.
pub struct TypeResolver<'d> {
    types: TypeTable<'d>,
    decls: &'d DeclTable,
    max_depth: usize,
}

impl<'d> TypeResolver<'d> {
    pub fn new(
        decls: &'d DeclTable,
        max_depth: usize,
    ) -> Self {
        Self {
            types: TypeTable::new(decls),
            decls,
            max_depth,
        }
    }

    pub fn types(&self) -> &TypeTable<'d> {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeTable<'d> {
        &mut self.types
    }

    /// Declaration defining the type clang attached to a node.
    pub fn resolve_clang(
        &mut self,
        qual_type: &clang_nodes::QualType,
    ) -> Option<Id> {
        let ty = self.types.from_clang(qual_type);
        self.resolve(ty)
    }

    pub fn resolve(
        &mut self,
        ty: QualifiedType,
    ) -> Option<Id> {
        let mut visited = HashSet::new();
        let resolved = self.step(ty, &mut visited, 0);
        trace!("[type-resolver] {:?} -> {:?} ({} steps)", ty.ty, resolved, visited.len());
        resolved
    }

    /// Location of the declaration defining `ty`.
    pub fn resolve_location(
        &mut self,
        ty: QualifiedType,
    ) -> Option<FileLocation> {
        let decl = self.resolve(ty)?;
        self.decls.get(decl)?.location.clone()
    }

    fn step(
        &mut self,
        ty: QualifiedType,
        visited: &mut HashSet<TypeId>,
        depth: usize,
    ) -> Option<Id> {
        if depth >= self.max_depth || !visited.insert(ty.ty) {
            return None;
        }
        let types = &mut self.types;

        if let Some(decl) = types.as_structure(ty).or_else(|| types.as_union(ty)) {
            return Some(decl);
        }
        if let Some(decl) = types.as_cxx_record(ty).or_else(|| types.pointee_cxx_record(ty)) {
            return Some(decl);
        }
        if types.is_pointer(ty) {
            let pointee = types.pointee(ty)?;
            let next = types.canonical(pointee);
            return self.recurse_if_changed(ty, next, visited, depth);
        }
        if let Some(template) = types.as_template_specialization(ty) {
            return template;
        }
        if types.is_reference(ty) {
            let referenced = types.non_reference(ty);
            let next = types.canonical(referenced);
            return self.recurse_if_changed(ty, next, visited, depth);
        }
        let next = types.canonical_unqualified(ty);
        self.recurse_if_changed(ty, next, visited, depth)
    }

    fn recurse_if_changed(
        &mut self,
        current: QualifiedType,
        next: QualifiedType,
        visited: &mut HashSet<TypeId>,
        depth: usize,
    ) -> Option<Id> {
        if next.ty == current.ty {
            return None;
        }
        self.step(next, visited, depth + 1)
    }
}

#[cfg(test)]
#[path = "../../tests/src/index/type_resolver_tests.rs"]
mod tests;

use clang_ast::Id;

use crate::frontend::clang_nodes::{Clang, CtorInitData, DeclData, Node, QualType};
use crate::index::coordinator::Walker;
use crate::index::facts::{Fact, FactSink, FileLocation, ReferenceKind, Symbol, SymbolKind};
use crate::semantic::decl_table::DeclClass;

impl<S: FactSink> Walker<'_, S> {
    /// Emit the facts of one declaration and visit the statements it owns
    /// (bodies, initializers). Nested declarations are left to the generic
    /// walk.
    pub(super) fn visit_decl(
        &mut self,
        node: &Node,
    ) {
        use Clang::*;
        let Some(data) = node.kind.decl_data() else {
            return;
        };
        match &node.kind {
            kind if kind.is_function() => {
                self.emit_symbol(node, data, SymbolKind::Function);
                for child in &node.inner {
                    if self.aborted() {
                        return;
                    }
                    match &child.kind {
                        CXXCtorInitializer(init) => self.visit_ctor_initializer(node, child, init),
                        kind if kind.is_decl() => {},
                        _ => self.visit_stmt(child),
                    }
                }
            },
            ParmVarDecl(_) => {
                if self.options.index_locals {
                    self.emit_symbol(node, data, SymbolKind::Parameter);
                }
                self.visit_statement_children(node);
            },
            VarDecl(_) | VarTemplateSpecializationDecl(_) | VarTemplatePartialSpecializationDecl(_) => {
                let local = self.decls.get(node.id).is_some_and(|info| info.is_local);
                if !local || self.options.index_locals {
                    self.emit_symbol(node, data, SymbolKind::Variable);
                }
                self.visit_statement_children(node);
            },
            FieldDecl(_) | IndirectFieldDecl(_) => {
                self.emit_symbol(node, data, SymbolKind::Field);
                self.visit_statement_children(node);
            },
            EnumConstantDecl(_) => {
                self.emit_symbol(node, data, SymbolKind::EnumConstant);
                self.visit_statement_children(node);
            },
            RecordDecl(_)
            | CXXRecordDecl(_)
            | ClassTemplateSpecializationDecl(_)
            | ClassTemplatePartialSpecializationDecl(_) => self.emit_symbol(node, data, SymbolKind::Record),
            EnumDecl(_) => self.emit_symbol(node, data, SymbolKind::Enum),
            NamespaceDecl(_) => self.emit_symbol(node, data, SymbolKind::Namespace),
            NamespaceAliasDecl(_) => self.emit_symbol(node, data, SymbolKind::NamespaceAlias),
            TypedefDecl(_) | TypeAliasDecl(_) => self.emit_symbol(node, data, SymbolKind::Typedef),
            kind if kind.is_template() => self.emit_symbol(node, data, SymbolKind::Template),
            // Both operands are expressions.
            StaticAssertDecl(_) => self.visit_statement_children(node),
            _ => {},
        }
    }

    /// Visit the non-declaration children of `node` as statements.
    fn visit_statement_children(
        &mut self,
        node: &Node,
    ) {
        for child in &node.inner {
            if !child.kind.is_decl() {
                self.visit_stmt(child);
            }
        }
    }

    fn emit_symbol(
        &mut self,
        node: &Node,
        data: &DeclData,
        kind: SymbolKind,
    ) {
        if self.aborted() {
            return;
        }
        let decls = self.decls;
        let Some(info) = decls.get(node.id) else {
            return;
        };
        if info.name.is_none() {
            return;
        }
        let Some(location) = self.site_location(data.loc.as_ref()) else {
            return;
        };

        let definition = match info.class {
            DeclClass::Variable => {
                let def = decls.definition_of(node.id);
                if def == node.id {
                    None
                } else {
                    decls.get(def).and_then(|d| d.location.clone())
                }
            },
            _ => None,
        };
        let type_location = match info.class {
            DeclClass::Variable | DeclClass::Field | DeclClass::Parameter => {
                data.ty.as_ref().and_then(|ty| self.resolve_type_location(ty))
            },
            _ => None,
        };

        let symbol = Symbol {
            qualified_name: info.qualified_name.clone(),
            kind,
            location,
            is_definition: info.is_definition,
            definition,
            type_location,
        };
        self.emit(Fact::Symbol(symbol));
    }

    fn resolve_type_location(
        &mut self,
        ty: &QualType,
    ) -> Option<FileLocation> {
        let decl = self.resolver.resolve_clang(ty)?;
        self.decls.get(decl)?.location.clone()
    }

    /// Member initializers reference the member; base and delegating
    /// initializers reference the class they construct. The initializer
    /// expression is visited either way.
    fn visit_ctor_initializer(
        &mut self,
        ctor: &Node,
        node: &Node,
        init: &CtorInitData,
    ) {
        let site_loc = node
            .inner
            .first()
            .and_then(|expr| expr.kind.range())
            .map(|range| &range.begin)
            .or_else(|| ctor.kind.loc());
        let site = self.site_location(site_loc);

        if let Some(member) = &init.any_init {
            if let Some(site) = site
                && self.is_indexable_target(member.id)
            {
                let target = self.target_for(member.id);
                self.emit_reference(ReferenceKind::MemberAccess, site, target);
            }
        } else if let Some(ty) = init.base_init.as_ref().or(init.delegating_init.as_ref()) {
            if let Some(site) = site {
                let target = self.resolver.resolve_clang(ty).and_then(|decl: Id| self.target_for(decl));
                self.emit_reference(ReferenceKind::TypeUse, site, target);
            }
        }

        for child in &node.inner {
            self.visit_stmt(child);
        }
    }
}

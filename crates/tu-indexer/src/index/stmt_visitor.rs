use clang_ast::{Id, SourceLocation};

use crate::frontend::clang_nodes::{Clang, ExprData, Node, QualType, RefExprData, with_stack};
use crate::index::coordinator::Walker;
use crate::index::facts::{FactSink, ReferenceKind};

/// Depth at which a callee search through wrapper expressions gives up.
const MAX_CALLEE_DEPTH: usize = 32;

impl<S: FactSink> Walker<'_, S> {
    /// Visit a statement or expression pre-order: the node's own facts
    /// first, then its children.
    pub(super) fn visit_stmt(
        &mut self,
        node: &Node,
    ) {
        with_stack(|| self.dispatch_stmt(node));
    }

    fn dispatch_stmt(
        &mut self,
        node: &Node,
    ) {
        use Clang::*;
        if self.aborted() {
            return;
        }
        match &node.kind {
            DeclStmt(_) => {
                for child in &node.inner {
                    if child.kind.is_decl() {
                        self.traverse_decl(child);
                    } else {
                        self.visit_stmt(child);
                    }
                }
                return;
            },
            CallExpr(data) | CXXMemberCallExpr(data) | CXXOperatorCallExpr(data) => {
                self.visit_call(node, data);
                return;
            },
            DeclRefExpr(data) => {
                if let Some(decl) = &data.referenced_decl {
                    self.reference(ReferenceKind::VariableRead, ref_site(&node.kind, data), decl.id);
                }
            },
            MemberExpr(data) => {
                if let Some(member) = member_target(data) {
                    self.reference(ReferenceKind::MemberAccess, ref_site(&node.kind, data), member);
                }
            },
            CStyleCastExpr(data)
            | CXXStaticCastExpr(data)
            | CXXDynamicCastExpr(data)
            | CXXReinterpretCastExpr(data)
            | CXXConstCastExpr(data)
            | CXXFunctionalCastExpr(data) => {
                if self.options.type_uses {
                    self.type_use(data, data.ty.as_ref());
                }
            },
            UnaryExprOrTypeTraitExpr(data) => {
                if self.options.type_uses {
                    self.type_use(data, data.arg_type.as_ref().or(data.type_arg.as_ref()));
                }
            },
            kind if kind.is_decl() => {
                // Declarations inside expressions (lambda closure classes are
                // implicit and skipped by the declaration walk).
                self.traverse_decl(node);
                return;
            },
            _ => {},
        }
        for child in &node.inner {
            self.visit_stmt(child);
        }
    }

    /// A call reports its callee once as a `Call`, then visits the rest of
    /// the callee expression and every argument.
    fn visit_call(
        &mut self,
        node: &Node,
        data: &ExprData,
    ) {
        let mut children = node.inner.iter();
        let callee_expr = children.next();
        let callee = callee_expr.and_then(|expr| find_callee(expr, 0));
        let callee_decl = callee.and_then(|c| match &c.kind {
            Clang::DeclRefExpr(r) => r.referenced_decl.as_ref().map(|d| d.id),
            Clang::MemberExpr(r) => member_target(r),
            _ => None,
        });
        let is_function = callee_decl.is_some_and(|id| self.is_function_decl(id));

        let site_loc = callee
            .and_then(|c| match &c.kind {
                Clang::DeclRefExpr(r) | Clang::MemberExpr(r) => ref_site(&c.kind, r),
                _ => None,
            })
            .or_else(|| data.range.as_ref().map(|r| &r.begin));
        if let Some(site) = self.site_location(site_loc) {
            let target = callee_decl.filter(|_| is_function).and_then(|id| self.target_for(id));
            self.emit_reference(ReferenceKind::Call, site, target);
        }

        if let Some(expr) = callee_expr {
            match callee {
                Some(name) if is_function => self.visit_callee(expr, name.id, 0),
                _ => self.visit_stmt(expr),
            }
        }
        for arg in children {
            if self.aborted() {
                return;
            }
            self.visit_stmt(arg);
        }
    }

    /// Walk a callee expression without reporting the callee name again.
    fn visit_callee(
        &mut self,
        node: &Node,
        name: Id,
        depth: usize,
    ) {
        if node.id != name && depth < MAX_CALLEE_DEPTH && is_callee_wrapper(&node.kind) {
            for child in &node.inner {
                self.visit_callee(child, name, depth + 1);
            }
            return;
        }
        if node.id == name {
            // The object expression of a member call still gets visited.
            for child in &node.inner {
                self.visit_stmt(child);
            }
            return;
        }
        self.visit_stmt(node);
    }

    /// Report a name or member reference when its target is indexable.
    fn reference(
        &mut self,
        kind: ReferenceKind,
        site_loc: Option<&SourceLocation>,
        target: Id,
    ) {
        if !self.is_indexable_target(target) {
            return;
        }
        let Some(target) = self.target_for(target) else {
            return;
        };
        if let Some(site) = self.site_location(site_loc) {
            self.emit_reference(kind, site, Some(target));
        }
    }

    /// Report a type named in an expression, when it names a declaration.
    fn type_use(
        &mut self,
        data: &ExprData,
        ty: Option<&QualType>,
    ) {
        let Some(ty) = ty else {
            return;
        };
        let Some(decl) = self.resolver.resolve_clang(ty) else {
            return;
        };
        let site_loc = data.loc.as_ref().or_else(|| data.range.as_ref().map(|r| &r.begin));
        if let (Some(site), Some(target)) = (self.site_location(site_loc), self.target_for(decl)) {
            self.emit_reference(ReferenceKind::TypeUse, site, Some(target));
        }
    }
}

/// Where a name or member reference is spelled: the node's own location,
/// else the start of a name reference or the member name at the end of a
/// member access.
fn ref_site<'n>(
    kind: &Clang,
    data: &'n RefExprData,
) -> Option<&'n SourceLocation> {
    if let Some(loc) = &data.loc {
        return Some(loc);
    }
    let range = data.range.as_ref()?;
    match kind {
        Clang::MemberExpr(_) => Some(&range.end),
        _ => Some(&range.begin),
    }
}

fn member_target(data: &RefExprData) -> Option<Id> {
    data.referenced_member_decl.or_else(|| data.referenced_decl.as_ref().map(|d| d.id))
}

fn is_callee_wrapper(kind: &Clang) -> bool {
    matches!(
        kind,
        Clang::ImplicitCastExpr(_)
            | Clang::ParenExpr(_)
            | Clang::MaterializeTemporaryExpr(_)
            | Clang::CXXBindTemporaryExpr(_)
            | Clang::ExprWithCleanups(_)
    )
}

/// The name or member reference a call's callee expression boils down to.
fn find_callee(
    node: &Node,
    depth: usize,
) -> Option<&Node> {
    match &node.kind {
        Clang::DeclRefExpr(_) | Clang::MemberExpr(_) => Some(node),
        kind if is_callee_wrapper(kind) && depth < MAX_CALLEE_DEPTH => {
            node.inner.first().and_then(|child| find_callee(child, depth + 1))
        },
        _ => None,
    }
}

use std::collections::{HashMap, HashSet};
use std::path::Path;

use clang_ast::Id;

use crate::frontend::clang_nodes;
use crate::semantic::decl_table::{DeclClass, DeclTable, TagKind};
use crate::semantic::type_parser::{BaseSyntax, DeclaratorOp, TypeSyntax, parse_type};

/// Sugar chains and canonicalization deeper than this give up.
const MAX_DESUGAR_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
    pub is_restrict: bool,
}

impl Qualifiers {
    /// Record `word` if it is a qualifier keyword. Nullability annotations
    /// are accepted and dropped.
    pub fn absorb(
        &mut self,
        word: &str,
    ) -> bool {
        match word {
            "const" => self.is_const = true,
            "volatile" => self.is_volatile = true,
            "restrict" | "__restrict" | "__restrict__" => self.is_restrict = true,
            "_Nonnull" | "_Nullable" | "_Null_unspecified" | "__unaligned" => {},
            _ => return false,
        }
        true
    }

    pub fn is_empty(self) -> bool {
        self == Self::default()
    }

    pub fn union(
        self,
        other: Self,
    ) -> Self {
        Self {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
            is_restrict: self.is_restrict || other.is_restrict,
        }
    }
}

/// Index of an interned [`Type`] in a [`TypeTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

/// A type together with its top-level qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualifiedType {
    pub ty: TypeId,
    pub quals: Qualifiers,
}

impl QualifiedType {
    pub fn unqualified(ty: TypeId) -> Self {
        Self {
            ty,
            quals: Qualifiers::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Builtin(String),
    Record {
        decl: Id,
        tag: Option<TagKind>,
        cxx: bool,
    },
    Enum {
        decl: Id,
    },
    Typedef {
        decl: Id,
        underlying: QualifiedType,
    },
    /// `struct S` as written; sugar over the named type.
    Elaborated {
        tag: TagKind,
        named: QualifiedType,
    },
    Pointer(QualifiedType),
    LValueReference(QualifiedType),
    RValueReference(QualifiedType),
    Array {
        element: QualifiedType,
        size: Option<u64>,
    },
    TemplateSpecialization {
        template: Option<Id>,
        spelling: String,
        /// Target of an alias template specialization.
        aliased: Option<QualifiedType>,
    },
    TemplateTypeParm(String),
    Function {
        result: QualifiedType,
        params: Vec<QualifiedType>,
        variadic: bool,
    },
    Unresolved(String),
}

impl Type {
    fn is_sugar(&self) -> bool {
        matches!(
            self,
            Type::Typedef { .. } | Type::Elaborated { .. } | Type::TemplateSpecialization { aliased: Some(_), .. }
        )
    }
}

/// Interning arena of the types of one translation unit.
///
/// Structurally equal types share one [`TypeId`], so "did canonicalization
/// change this type" is an id comparison.
pub struct TypeTable<'d> {
    decls: &'d DeclTable,
    types: Vec<Type>,
    interned: HashMap<Type, TypeId>,
    spellings: HashMap<clang_nodes::QualType, QualifiedType>,
    canonical: HashMap<QualifiedType, QualifiedType>,
    /// Typedefs whose underlying type is being built, to break cycles.
    expanding: HashSet<Id>,
}

impl<'d> TypeTable<'d> {
    pub fn new(decls: &'d DeclTable) -> Self {
        Self {
            decls,
            types: Vec::new(),
            interned: HashMap::new(),
            spellings: HashMap::new(),
            canonical: HashMap::new(),
            expanding: HashSet::new(),
        }
    }

    pub fn get(
        &self,
        id: TypeId,
    ) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn intern(
        &mut self,
        ty: Type,
    ) -> TypeId {
        if let Some(id) = self.interned.get(&ty) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.interned.insert(ty, id);
        id
    }

    /// Build the type clang attached to a node (`"type": {"qualType": ...}`).
    pub fn from_clang(
        &mut self,
        qual_type: &clang_nodes::QualType,
    ) -> QualifiedType {
        if let Some(cached) = self.spellings.get(qual_type) {
            return *cached;
        }
        let built = self.build_clang(qual_type);
        self.spellings.insert(qual_type.clone(), built);
        built
    }

    fn build_clang(
        &mut self,
        qual_type: &clang_nodes::QualType,
    ) -> QualifiedType {
        let spelling = qual_type.spelling().unwrap_or_default();
        let desugared = qual_type.desugared_qual_type.as_deref().filter(|s| !s.is_empty());
        let syntax = parse_type(spelling);

        // Sugar through an alias clang identified for us.
        let decls = self.decls;
        if let Some(alias) = qual_type.type_alias_decl_id
            && let Some(info) = decls.get(alias)
            && info.class == DeclClass::Typedef
            && syntax.as_ref().is_some_and(|s| s.ops.is_empty())
        {
            let quals = syntax.as_ref().map(|s| s.quals).unwrap_or_default();
            let underlying = match desugared {
                Some(d) => self.from_spelling(d),
                None => self.typedef_underlying(alias),
            };
            let ty = self.intern(Type::Typedef {
                decl: alias,
                underlying,
            });
            return QualifiedType { ty, quals };
        }

        // An unqualified name shared by several scopes; clang's desugared
        // spelling is fully qualified.
        if let (Some(s), Some(d)) = (&syntax, desugared)
            && self.is_ambiguous(&s.base)
        {
            return self.from_spelling(d);
        }

        let mut built = match &syntax {
            Some(s) => self.from_syntax(s, 0),
            None => QualifiedType::unqualified(self.intern(Type::Unresolved(spelling.to_owned()))),
        };

        if let Some(d) = desugared {
            match self.get(built.ty).clone() {
                Type::Unresolved(_) => built = self.from_spelling(d),
                Type::TemplateSpecialization {
                    template,
                    spelling,
                    aliased: None,
                } if template.is_some_and(|t| self.is_alias_template(t)) => {
                    let aliased = self.from_spelling(d);
                    let ty = self.intern(Type::TemplateSpecialization {
                        template,
                        spelling,
                        aliased: Some(aliased),
                    });
                    built = QualifiedType { ty, quals: built.quals };
                },
                _ => {},
            }
        }
        built
    }

    /// Build a type from a bare spelling.
    pub fn from_spelling(
        &mut self,
        spelling: &str,
    ) -> QualifiedType {
        match parse_type(spelling) {
            Some(syntax) => self.from_syntax(&syntax, 0),
            None => QualifiedType::unqualified(self.intern(Type::Unresolved(spelling.to_owned()))),
        }
    }

    fn from_syntax(
        &mut self,
        syntax: &TypeSyntax,
        depth: usize,
    ) -> QualifiedType {
        let base = self.base_type(&syntax.base, depth);
        let mut current = QualifiedType {
            ty: base.ty,
            quals: base.quals.union(syntax.quals),
        };
        for op in &syntax.ops {
            current = match op {
                DeclaratorOp::Pointer(quals) => QualifiedType {
                    ty: self.intern(Type::Pointer(current)),
                    quals: *quals,
                },
                DeclaratorOp::LValueReference => QualifiedType::unqualified(self.intern(Type::LValueReference(current))),
                DeclaratorOp::RValueReference => QualifiedType::unqualified(self.intern(Type::RValueReference(current))),
                DeclaratorOp::Array(size) => QualifiedType::unqualified(self.intern(Type::Array {
                    element: current,
                    size: *size,
                })),
                DeclaratorOp::Function { params, variadic } => {
                    let params = params.iter().map(|p| self.from_syntax(p, depth + 1)).collect();
                    QualifiedType::unqualified(self.intern(Type::Function {
                        result: current,
                        params,
                        variadic: *variadic,
                    }))
                },
            };
        }
        current
    }

    fn base_type(
        &mut self,
        base: &BaseSyntax,
        depth: usize,
    ) -> QualifiedType {
        let ty = match base {
            BaseSyntax::Builtin(name) => Type::Builtin(name.clone()),
            BaseSyntax::TemplateParm(name) => Type::TemplateTypeParm(name.clone()),
            BaseSyntax::Opaque(text) => Type::Unresolved(text.clone()),
            BaseSyntax::Anonymous { text, .. } => match self.anonymous_decl(text) {
                Some(ty) => ty,
                None => Type::Unresolved(text.clone()),
            },
            BaseSyntax::Named { tag, path } => {
                let name = base.qualified_name().unwrap_or_default();
                if let Some(last) = path.last()
                    && let Some(args) = &last.args
                {
                    Type::TemplateSpecialization {
                        template: self.decls.lookup_template(&name),
                        spelling: format!("{name}<{}>", args.join(", ")),
                        aliased: None,
                    }
                } else {
                    match self.decls.lookup_type(&name, *tag) {
                        Some(decl) => {
                            let named = self.decl_type(decl, depth);
                            match tag {
                                Some(tag) => Type::Elaborated { tag: *tag, named },
                                None => return named,
                            }
                        },
                        None => Type::Unresolved(name),
                    }
                }
            },
        };
        QualifiedType::unqualified(self.intern(ty))
    }

    /// The type a record, enum or typedef declaration introduces.
    pub fn decl_type(
        &mut self,
        decl: Id,
        depth: usize,
    ) -> QualifiedType {
        let decls = self.decls;
        let Some(info) = decls.get(decl) else {
            return QualifiedType::unqualified(self.intern(Type::Unresolved(String::new())));
        };
        let ty = match info.class {
            DeclClass::Record => Type::Record {
                decl,
                tag: info.tag,
                cxx: info.cxx,
            },
            DeclClass::Enum => Type::Enum { decl },
            DeclClass::Typedef if depth < MAX_DESUGAR_DEPTH => {
                let underlying = self.typedef_underlying(decl);
                Type::Typedef { decl, underlying }
            },
            _ => Type::Unresolved(info.qualified_name.clone()),
        };
        QualifiedType::unqualified(self.intern(ty))
    }

    fn typedef_underlying(
        &mut self,
        decl: Id,
    ) -> QualifiedType {
        let spelling = self.decls.get(decl).and_then(|info| info.ty.clone());
        let Some(spelling) = spelling else {
            return QualifiedType::unqualified(self.intern(Type::Unresolved(String::new())));
        };
        if !self.expanding.insert(decl) {
            let text = spelling.spelling().unwrap_or_default().to_owned();
            return QualifiedType::unqualified(self.intern(Type::Unresolved(text)));
        }
        let underlying = self.from_clang(&spelling);
        self.expanding.remove(&decl);
        underlying
    }

    /// Find the unnamed record or enum clang printed as
    /// `(unnamed struct at /path/file.c:3:9)`.
    fn anonymous_decl(
        &self,
        text: &str,
    ) -> Option<Type> {
        let (_, position) = text.trim_start_matches('(').trim_end_matches(')').rsplit_once(" at ")?;
        let mut parts = position.rsplitn(3, ':');
        let column: u32 = parts.next()?.parse().ok()?;
        let line: u32 = parts.next()?.parse().ok()?;
        let file = parts.next()?;
        let file_name = Path::new(file).file_name()?.to_str()?;
        let info = self.decls.iter().find(|info| {
            matches!(info.class, DeclClass::Record | DeclClass::Enum)
                && info.location.as_ref().is_some_and(|loc| {
                    loc.line == line && loc.column == column && Path::new(&loc.file).ends_with(file_name)
                })
        })?;
        Some(match info.class {
            DeclClass::Enum => Type::Enum { decl: info.id },
            _ => Type::Record {
                decl: info.id,
                tag: info.tag,
                cxx: info.cxx,
            },
        })
    }

    fn is_ambiguous(
        &self,
        base: &BaseSyntax,
    ) -> bool {
        match base {
            BaseSyntax::Named { .. } => {
                base.qualified_name().is_some_and(|name| self.decls.is_ambiguous_type_name(&name))
            },
            _ => false,
        }
    }

    fn is_alias_template(
        &self,
        template: Id,
    ) -> bool {
        self.decls.get(template).is_some_and(|t| t.kind == "TypeAliasTemplateDecl")
    }

    /// Remove one layer of sugar.
    pub fn desugar(
        &self,
        qt: QualifiedType,
    ) -> QualifiedType {
        match self.get(qt.ty) {
            Type::Typedef { underlying, .. } => QualifiedType {
                ty: underlying.ty,
                quals: underlying.quals.union(qt.quals),
            },
            Type::Elaborated { named, .. } => QualifiedType {
                ty: named.ty,
                quals: named.quals.union(qt.quals),
            },
            Type::TemplateSpecialization {
                aliased: Some(aliased), ..
            } => QualifiedType {
                ty: aliased.ty,
                quals: aliased.quals.union(qt.quals),
            },
            _ => qt,
        }
    }

    /// Remove all top-level sugar.
    pub fn strip_sugar(
        &self,
        qt: QualifiedType,
    ) -> QualifiedType {
        let mut current = qt;
        for _ in 0..MAX_DESUGAR_DEPTH {
            if !self.get(current.ty).is_sugar() {
                break;
            }
            current = self.desugar(current);
        }
        current
    }

    /// Canonical type: all sugar removed at every level.
    pub fn canonical(
        &mut self,
        qt: QualifiedType,
    ) -> QualifiedType {
        self.canonical_at(qt, 0)
    }

    fn canonical_at(
        &mut self,
        qt: QualifiedType,
        depth: usize,
    ) -> QualifiedType {
        if let Some(cached) = self.canonical.get(&qt) {
            return *cached;
        }
        if depth > MAX_DESUGAR_DEPTH {
            let ty = self.intern(Type::Unresolved(String::new()));
            return QualifiedType::unqualified(ty);
        }
        let stripped = self.strip_sugar(qt);
        let rebuilt = match self.get(stripped.ty).clone() {
            Type::Pointer(p) => Some(Type::Pointer(self.canonical_at(p, depth + 1))),
            Type::LValueReference(p) => Some(Type::LValueReference(self.canonical_at(p, depth + 1))),
            Type::RValueReference(p) => Some(Type::RValueReference(self.canonical_at(p, depth + 1))),
            Type::Array { element, size } => Some(Type::Array {
                element: self.canonical_at(element, depth + 1),
                size,
            }),
            Type::Function {
                result,
                params,
                variadic,
            } => {
                let result = self.canonical_at(result, depth + 1);
                let params = params.into_iter().map(|p| self.canonical_at(p, depth + 1)).collect();
                Some(Type::Function {
                    result,
                    params,
                    variadic,
                })
            },
            _ => None,
        };
        let canonical = match rebuilt {
            Some(ty) => QualifiedType {
                ty: self.intern(ty),
                quals: stripped.quals,
            },
            None => stripped,
        };
        self.canonical.insert(qt, canonical);
        canonical
    }

    pub fn canonical_unqualified(
        &mut self,
        qt: QualifiedType,
    ) -> QualifiedType {
        QualifiedType::unqualified(self.canonical(qt).ty)
    }

    /// Referenced type of a reference type, or the type itself.
    pub fn non_reference(
        &self,
        qt: QualifiedType,
    ) -> QualifiedType {
        match self.get(self.strip_sugar(qt).ty) {
            Type::LValueReference(inner) | Type::RValueReference(inner) => *inner,
            _ => qt,
        }
    }

    pub fn is_pointer(
        &self,
        qt: QualifiedType,
    ) -> bool {
        matches!(self.get(self.strip_sugar(qt).ty), Type::Pointer(_))
    }

    pub fn is_reference(
        &self,
        qt: QualifiedType,
    ) -> bool {
        matches!(
            self.get(self.strip_sugar(qt).ty),
            Type::LValueReference(_) | Type::RValueReference(_)
        )
    }

    /// Pointee of a pointer or reference type.
    pub fn pointee(
        &self,
        qt: QualifiedType,
    ) -> Option<QualifiedType> {
        match self.get(self.strip_sugar(qt).ty) {
            Type::Pointer(inner) | Type::LValueReference(inner) | Type::RValueReference(inner) => Some(*inner),
            _ => None,
        }
    }

    fn as_record(
        &self,
        qt: QualifiedType,
    ) -> Option<(Id, Option<TagKind>, bool)> {
        match self.get(self.strip_sugar(qt).ty) {
            Type::Record { decl, tag, cxx } => Some((*decl, *tag, *cxx)),
            _ => None,
        }
    }

    /// Declaration of a `struct` (or `__interface`) type.
    pub fn as_structure(
        &self,
        qt: QualifiedType,
    ) -> Option<Id> {
        self.as_record(qt)
            .filter(|(_, tag, _)| matches!(tag, Some(TagKind::Struct) | None))
            .map(|(decl, ..)| decl)
    }

    pub fn as_union(
        &self,
        qt: QualifiedType,
    ) -> Option<Id> {
        self.as_record(qt).filter(|(_, tag, _)| *tag == Some(TagKind::Union)).map(|(decl, ..)| decl)
    }

    /// Declaration of a C++ class type of any tag.
    pub fn as_cxx_record(
        &self,
        qt: QualifiedType,
    ) -> Option<Id> {
        self.as_record(qt).filter(|(.., cxx)| *cxx).map(|(decl, ..)| decl)
    }

    pub fn pointee_cxx_record(
        &self,
        qt: QualifiedType,
    ) -> Option<Id> {
        self.pointee(qt).and_then(|p| self.as_cxx_record(p))
    }

    /// The template named by a template specialization type, looking
    /// through non-template sugar. The outer option is whether the type is
    /// a specialization at all.
    pub fn as_template_specialization(
        &self,
        qt: QualifiedType,
    ) -> Option<Option<Id>> {
        let mut current = qt;
        for _ in 0..MAX_DESUGAR_DEPTH {
            match self.get(current.ty) {
                Type::TemplateSpecialization { template, .. } => return Some(*template),
                ty if ty.is_sugar() => current = self.desugar(current),
                _ => return None,
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/src/semantic/types_tests.rs"]
mod tests;

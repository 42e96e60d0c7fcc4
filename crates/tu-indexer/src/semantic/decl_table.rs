use std::collections::{HashMap, HashSet};

use clang_ast::Id;
use tracing::debug;

use crate::frontend::clang_nodes::{Clang, DeclData, Node, QualType, with_stack};
use crate::index::facts::FileLocation;
use crate::semantic::locations::LocationMap;

/// Redeclaration chains and parent links longer than this are treated as
/// malformed and cut off.
const MAX_CHAIN: usize = 256;

/// Broad classification of a declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclClass {
    Function,
    Variable,
    Parameter,
    Field,
    Record,
    Enum,
    EnumConstant,
    Namespace,
    NamespaceAlias,
    Typedef,
    Template,
    TemplateParm,
    /// Contexts that never contribute to qualified names (translation unit,
    /// linkage specifications).
    Transparent,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Struct,
    Class,
    Union,
    Enum,
}

impl TagKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "struct" | "__interface" => Some(Self::Struct),
            "class" => Some(Self::Class),
            "union" => Some(Self::Union),
            "enum" => Some(Self::Enum),
            _ => None,
        }
    }
}

/// Everything the visitors need to know about one declaration node.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    pub id: Id,
    /// Front-end kind name (`FunctionDecl`, `FieldDecl`, ...).
    pub kind: String,
    pub class: DeclClass,
    pub name: Option<String>,
    pub qualified_name: String,
    /// Semantic parent.
    pub parent: Option<Id>,
    pub location: Option<FileLocation>,
    pub is_definition: bool,
    /// Variable without initializer or `extern` (`int x;`). Defines its
    /// chain only when no redeclaration carries an initializer.
    pub is_tentative: bool,
    pub is_implicit: bool,
    /// Parameters, template parameters and function-scope variables.
    pub is_local: bool,
    /// Member of an implicit template instantiation.
    pub is_instantiation: bool,
    pub previous: Option<Id>,
    pub ty: Option<QualType>,
    pub tag: Option<TagKind>,
    /// Declared as a C++ class (`CXXRecordDecl` and specializations).
    pub cxx: bool,
    pub scoped: bool,
    /// Templated declaration of a template.
    pub pattern: Option<Id>,
}

/// Declarations of one translation unit, keyed by front-end node id.
#[derive(Debug, Default)]
pub struct DeclTable {
    decls: HashMap<Id, DeclInfo>,
    /// Ids in tree order.
    order: Vec<Id>,
    type_names: HashMap<String, Vec<Id>>,
    var_definitions: HashMap<Id, Id>,
}

#[derive(Clone, Copy)]
struct Scope {
    parent: Option<Id>,
    in_function: bool,
    in_instantiation: bool,
}

impl DeclTable {
    /// Build the table from a translation unit root, recording every file
    /// name seen into `locations` along the way.
    pub fn build(
        root: &Node,
        locations: &mut LocationMap,
    ) -> Self {
        let mut table = Self::default();
        let scope = Scope {
            parent: None,
            in_function: false,
            in_instantiation: false,
        };
        table.collect(root, scope, locations);
        table.finish();
        debug!("[decl-table] {} declarations, {} type names", table.decls.len(), table.type_names.len());
        table
    }

    pub fn get(
        &self,
        id: Id,
    ) -> Option<&DeclInfo> {
        self.decls.get(&id)
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Declarations in tree order.
    pub fn iter(&self) -> impl Iterator<Item = &DeclInfo> {
        self.order.iter().filter_map(|id| self.decls.get(id))
    }

    /// Apply the variable-definition rule: a variable declaration resolves to
    /// the defining declaration of its redeclaration chain, when there is one.
    /// Every other declaration resolves to itself.
    pub fn definition_of(
        &self,
        id: Id,
    ) -> Id {
        match self.decls.get(&id) {
            Some(info) if info.class == DeclClass::Variable => {
                self.var_definitions.get(&self.chain_root(id)).copied().unwrap_or(id)
            },
            _ => id,
        }
    }

    /// Look up a type-naming declaration (record, enum, typedef) by the name
    /// clang printed in a type spelling.
    ///
    /// With a `tag`, only records or enums of that tag are considered;
    /// without one, typedefs win over records of the same name.
    pub fn lookup_type(
        &self,
        name: &str,
        tag: Option<TagKind>,
    ) -> Option<Id> {
        let candidates = self.candidates(name);
        let accept = |info: &DeclInfo| match tag {
            Some(TagKind::Enum) => info.class == DeclClass::Enum,
            Some(t) => info.class == DeclClass::Record && (info.tag == Some(t) || tag_compatible(info.tag, t)),
            None => matches!(info.class, DeclClass::Record | DeclClass::Enum | DeclClass::Typedef),
        };
        let rank = |info: &DeclInfo| -> u8 {
            match (info.class, info.is_definition) {
                (DeclClass::Typedef, _) => 0,
                (_, true) => 1,
                (_, false) => 2,
            }
        };
        candidates.filter(|info| accept(info)).min_by_key(|info| rank(info)).map(|info| info.id)
    }

    /// Whether `name` could mean more than one type-naming declaration,
    /// e.g. `S` with both `a::S` and `b::S` in the unit.
    pub fn is_ambiguous_type_name(
        &self,
        name: &str,
    ) -> bool {
        let mut seen: Option<&str> = None;
        for info in self.candidates(name) {
            if !matches!(info.class, DeclClass::Record | DeclClass::Enum | DeclClass::Typedef | DeclClass::Template) {
                continue;
            }
            match seen {
                Some(first) if first != info.qualified_name => return true,
                Some(_) => {},
                None => seen = Some(&info.qualified_name),
            }
        }
        false
    }

    /// Look up a class or alias template by name.
    pub fn lookup_template(
        &self,
        name: &str,
    ) -> Option<Id> {
        self.candidates(name)
            .filter(|info| info.class == DeclClass::Template)
            .find(|info| matches!(info.kind.as_str(), "ClassTemplateDecl" | "TypeAliasTemplateDecl"))
            .map(|info| info.id)
    }

    fn candidates<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a DeclInfo> + 'a {
        let name = name.trim_start_matches("::");
        let exact = self.type_names.get(name);
        let simple = match name.rsplit_once("::") {
            Some((_, last)) if exact.is_none() => self.type_names.get(last),
            _ => None,
        };
        exact.or(simple).into_iter().flatten().filter_map(|id| self.decls.get(id))
    }

    fn chain_root(
        &self,
        id: Id,
    ) -> Id {
        let mut current = id;
        for _ in 0..MAX_CHAIN {
            match self.decls.get(&current).and_then(|d| d.previous) {
                Some(prev) if prev != current && self.decls.contains_key(&prev) => current = prev,
                _ => break,
            }
        }
        current
    }

    fn collect(
        &mut self,
        node: &Node,
        scope: Scope,
        locations: &mut LocationMap,
    ) {
        if let Some(loc) = node.kind.loc() {
            locations.record(loc);
        }
        if let Some(range) = node.kind.range() {
            locations.record_range(range);
        }

        let mut child_scope = scope;
        if let Some(data) = node.kind.decl_data() {
            let info = self.describe(node, data, scope, locations);
            child_scope.parent = Some(node.id);
            if node.kind.is_function() {
                child_scope.in_function = true;
            }
            // Templates list explicit specializations again as bare id/kind
            // references; never let one of those shadow the full node.
            let shadowed = info.location.is_none() && self.decls.get(&node.id).is_some_and(|d| d.location.is_some());
            if !shadowed && self.decls.insert(node.id, info).is_none() {
                self.order.push(node.id);
            }
        } else if !node.kind.is_decl() {
            // Declarations nested anywhere below a statement are function-local.
            if !matches!(node.kind, Clang::CXXCtorInitializer(_)) {
                child_scope.in_function = true;
            }
        }

        let pattern_index = node.kind.is_template().then(|| pattern_index(node)).flatten();
        for (i, child) in node.inner.iter().enumerate() {
            let mut scope = child_scope;
            if let Some(p) = pattern_index
                && i > p
                && child.kind.is_decl()
            {
                scope.in_instantiation = true;
            }
            with_stack(|| self.collect(child, scope, locations));
        }

        if let Some(p) = pattern_index {
            let pattern = node.inner[p].id;
            let pattern_def = self.decls.get(&pattern).is_some_and(|d| d.is_definition);
            if let Some(info) = self.decls.get_mut(&node.id) {
                info.pattern = Some(pattern);
                info.is_definition = pattern_def;
            }
        }
    }

    fn describe(
        &self,
        node: &Node,
        data: &DeclData,
        scope: Scope,
        locations: &LocationMap,
    ) -> DeclInfo {
        let class = classify(&node.kind);
        let in_record = scope
            .parent
            .and_then(|p| self.decls.get(&p))
            .is_some_and(|p| p.class == DeclClass::Record);
        let is_definition = match class {
            DeclClass::Function => {
                has_body(node) || data.explicitly_defaulted.is_some() || data.explicitly_deleted.unwrap_or(false)
            },
            DeclClass::Record => data.complete_definition.unwrap_or(false),
            DeclClass::Enum => {
                data.complete_definition.unwrap_or(false)
                    || node.inner.iter().any(|c| matches!(c.kind, Clang::EnumConstantDecl(_)))
            },
            DeclClass::Variable => data.has_init() || (!data.is_extern() && !in_record),
            DeclClass::Parameter
            | DeclClass::Field
            | DeclClass::EnumConstant
            | DeclClass::Namespace
            | DeclClass::NamespaceAlias
            | DeclClass::Typedef => true,
            _ => false,
        };
        let is_tentative = class == DeclClass::Variable && is_definition && !data.has_init();
        let is_local = match class {
            DeclClass::Parameter | DeclClass::TemplateParm => true,
            DeclClass::Variable => scope.in_function,
            _ => false,
        };
        let tag = match &node.kind {
            Clang::EnumDecl(_) => Some(TagKind::Enum),
            _ => data.tag_used.as_deref().and_then(TagKind::from_keyword),
        };

        DeclInfo {
            id: node.id,
            kind: node.kind.kind_name().to_owned(),
            class,
            name: data.name().map(str::to_owned),
            qualified_name: String::new(),
            parent: data.parent_decl_context_id.or(scope.parent),
            location: data.loc.as_ref().and_then(|l| locations.resolve(l)),
            is_definition,
            is_tentative,
            is_implicit: data.is_implicit(),
            is_local,
            is_instantiation: scope.in_instantiation,
            previous: data.previous_decl,
            ty: data.ty.clone(),
            tag,
            cxx: matches!(
                node.kind,
                Clang::CXXRecordDecl(_)
                    | Clang::ClassTemplateSpecializationDecl(_)
                    | Clang::ClassTemplatePartialSpecializationDecl(_)
            ),
            scoped: data.scoped_enum_tag.is_some(),
            pattern: None,
        }
    }

    fn finish(&mut self) {
        let ids = self.order.clone();
        for id in &ids {
            let qualified = self.compute_qualified_name(*id);
            if let Some(info) = self.decls.get_mut(id) {
                info.qualified_name = qualified;
            }
        }

        self.link_variable_definitions(&ids);

        for id in &ids {
            let Some(info) = self.decls.get(id) else {
                continue;
            };
            let indexable = !info.is_implicit
                && !info.is_instantiation
                && (matches!(info.class, DeclClass::Record | DeclClass::Enum | DeclClass::Typedef)
                    || matches!(info.kind.as_str(), "ClassTemplateDecl" | "TypeAliasTemplateDecl"));
            if !indexable {
                continue;
            }
            let Some(name) = info.name.clone() else {
                continue;
            };
            let qualified = info.qualified_name.clone();
            self.type_names.entry(name.clone()).or_default().push(*id);
            if qualified != name {
                self.type_names.entry(qualified).or_default().push(*id);
            }
        }
    }

    /// An initialized declaration defines its chain. Tentative declarations
    /// define it only when nothing in the chain is initialized, and stop
    /// counting as definitions otherwise.
    fn link_variable_definitions(
        &mut self,
        ids: &[Id],
    ) {
        let mut initialized = HashSet::new();
        for id in ids {
            let Some(info) = self.decls.get(id) else {
                continue;
            };
            if info.class == DeclClass::Variable && info.is_definition && !info.is_tentative {
                let root = self.chain_root(*id);
                initialized.insert(root);
                self.var_definitions.entry(root).or_insert(*id);
            }
        }
        for id in ids {
            if !self.decls.get(id).is_some_and(|info| info.is_tentative) {
                continue;
            }
            let root = self.chain_root(*id);
            if initialized.contains(&root) {
                if let Some(info) = self.decls.get_mut(id) {
                    info.is_definition = false;
                }
            } else {
                self.var_definitions.entry(root).or_insert(*id);
            }
        }
    }

    fn compute_qualified_name(
        &self,
        id: Id,
    ) -> String {
        let Some(info) = self.decls.get(&id) else {
            return String::new();
        };
        let mut parts = vec![info.name.clone().unwrap_or_else(|| "(anonymous)".to_owned())];
        let mut current = info.parent;
        for _ in 0..MAX_CHAIN {
            let Some(parent) = current.and_then(|p| self.decls.get(&p)) else {
                break;
            };
            match parent.class {
                DeclClass::Namespace => {
                    parts.push(parent.name.clone().unwrap_or_else(|| "(anonymous namespace)".to_owned()));
                },
                DeclClass::Record | DeclClass::Function => {
                    parts.push(parent.name.clone().unwrap_or_else(|| "(anonymous)".to_owned()));
                },
                DeclClass::Enum if parent.scoped => {
                    parts.push(parent.name.clone().unwrap_or_default());
                },
                _ => {},
            }
            current = parent.parent;
        }
        parts.reverse();
        parts.join("::")
    }
}

/// Whether an elaborated `class X` may name a record declared `struct X`.
fn tag_compatible(
    declared: Option<TagKind>,
    written: TagKind,
) -> bool {
    matches!(
        (declared, written),
        (Some(TagKind::Struct), TagKind::Class) | (Some(TagKind::Class), TagKind::Struct)
    )
}

pub(crate) fn classify(kind: &Clang) -> DeclClass {
    use Clang::*;
    match kind {
        FunctionDecl(_) | CXXMethodDecl(_) | CXXConstructorDecl(_) | CXXDestructorDecl(_) | CXXConversionDecl(_)
        | CXXDeductionGuideDecl(_) => DeclClass::Function,
        VarDecl(_) | VarTemplateSpecializationDecl(_) | VarTemplatePartialSpecializationDecl(_) => {
            DeclClass::Variable
        },
        ParmVarDecl(_) => DeclClass::Parameter,
        FieldDecl(_) | IndirectFieldDecl(_) => DeclClass::Field,
        RecordDecl(_)
        | CXXRecordDecl(_)
        | ClassTemplateSpecializationDecl(_)
        | ClassTemplatePartialSpecializationDecl(_) => DeclClass::Record,
        EnumDecl(_) => DeclClass::Enum,
        EnumConstantDecl(_) => DeclClass::EnumConstant,
        NamespaceDecl(_) => DeclClass::Namespace,
        NamespaceAliasDecl(_) => DeclClass::NamespaceAlias,
        TypedefDecl(_) | TypeAliasDecl(_) => DeclClass::Typedef,
        ClassTemplateDecl(_) | FunctionTemplateDecl(_) | VarTemplateDecl(_) | TypeAliasTemplateDecl(_) => {
            DeclClass::Template
        },
        TemplateTypeParmDecl(_) | NonTypeTemplateParmDecl(_) | TemplateTemplateParmDecl(_) => DeclClass::TemplateParm,
        TranslationUnitDecl(_) | LinkageSpecDecl(_) | ExternCContextDecl(_) => DeclClass::Transparent,
        _ => DeclClass::Other,
    }
}

/// Index of the templated declaration among a template's children: the
/// first declaration that is not a template parameter. Later declarations
/// are instantiations.
pub(crate) fn pattern_index(template: &Node) -> Option<usize> {
    template.inner.iter().position(|c| c.kind.is_decl() && !c.kind.is_template_parm())
}

/// Whether a function declaration node carries a body.
pub(crate) fn has_body(node: &Node) -> bool {
    node.inner.iter().any(|c| {
        matches!(
            &c.kind,
            Clang::Other { kind: Some(k), .. } if k == "CompoundStmt" || k == "CXXTryStmt"
        )
    })
}

#[cfg(test)]
#[path = "../../tests/src/semantic/decl_table_tests.rs"]
mod tests;

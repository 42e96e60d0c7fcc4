use clang_ast::{BareSourceLocation, Id, SourceLocation, SourceRange};
use serde::Deserialize;

pub type Node = clang_ast::Node<Clang>;

/// Typed representation of the Clang AST node kinds the indexer dispatches on.
///
/// Each variant corresponds to a Clang AST node `"kind"` value. Everything
/// else lands in [`Clang::Other`] and is walked generically.
#[derive(Deserialize, Debug)]
pub enum Clang {
    // --- Declaration contexts ---
    TranslationUnitDecl(DeclData),
    NamespaceDecl(DeclData),
    NamespaceAliasDecl(DeclData),
    LinkageSpecDecl(DeclData),
    ExternCContextDecl(DeclData),

    // --- Records / enums / typedefs ---
    RecordDecl(DeclData),
    CXXRecordDecl(DeclData),
    EnumDecl(DeclData),
    EnumConstantDecl(DeclData),
    TypedefDecl(DeclData),
    TypeAliasDecl(DeclData),

    // --- Templates ---
    ClassTemplateDecl(DeclData),
    ClassTemplateSpecializationDecl(DeclData),
    ClassTemplatePartialSpecializationDecl(DeclData),
    FunctionTemplateDecl(DeclData),
    VarTemplateDecl(DeclData),
    VarTemplateSpecializationDecl(DeclData),
    VarTemplatePartialSpecializationDecl(DeclData),
    TypeAliasTemplateDecl(DeclData),
    TemplateTypeParmDecl(DeclData),
    NonTypeTemplateParmDecl(DeclData),
    TemplateTemplateParmDecl(DeclData),

    // --- Functions ---
    FunctionDecl(DeclData),
    CXXMethodDecl(DeclData),
    CXXConstructorDecl(DeclData),
    CXXDestructorDecl(DeclData),
    CXXConversionDecl(DeclData),
    CXXDeductionGuideDecl(DeclData),
    CXXCtorInitializer(CtorInitData),

    // --- Variables ---
    VarDecl(DeclData),
    ParmVarDecl(DeclData),
    FieldDecl(DeclData),
    IndirectFieldDecl(DeclData),

    // --- Structural declarations (traversed, never emitted) ---
    UsingDecl(DeclData),
    UsingDirectiveDecl(DeclData),
    UsingShadowDecl(DeclData),
    UnresolvedUsingTypenameDecl(DeclData),
    UnresolvedUsingValueDecl(DeclData),
    AccessSpecDecl(DeclData),
    FriendDecl(DeclData),
    StaticAssertDecl(DeclData),
    LabelDecl(DeclData),
    FileScopeAsmDecl(DeclData),
    ImportDecl(DeclData),

    // --- Statements with special handling ---
    DeclStmt(ExprData),
    CallExpr(ExprData),
    CXXMemberCallExpr(ExprData),
    CXXOperatorCallExpr(ExprData),
    DeclRefExpr(RefExprData),
    MemberExpr(RefExprData),

    // --- Transparent wrappers around a callee ---
    ImplicitCastExpr(ExprData),
    ParenExpr(ExprData),
    MaterializeTemporaryExpr(ExprData),
    CXXBindTemporaryExpr(ExprData),
    ExprWithCleanups(ExprData),

    // --- Explicitly typed expressions ---
    CStyleCastExpr(ExprData),
    CXXStaticCastExpr(ExprData),
    CXXDynamicCastExpr(ExprData),
    CXXReinterpretCastExpr(ExprData),
    CXXConstCastExpr(ExprData),
    CXXFunctionalCastExpr(ExprData),
    UnaryExprOrTypeTraitExpr(ExprData),

    // --- Catch-all ---
    // `loc` and `range` MUST be deserialized even for unrecognized node
    // kinds: `clang-ast` tracks the current file across the deserialization
    // stream, and skipping a location that switches files would leave every
    // later node attributed to the wrong file.
    Other {
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        loc: Option<SourceLocation>,
        #[serde(default)]
        range: Option<SourceRange>,
    },
}

/// Common data for all declaration nodes.
#[derive(Deserialize, Debug, Default)]
pub struct DeclData {
    pub name: Option<String>,
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    #[serde(rename = "previousDecl")]
    pub previous_decl: Option<Id>,
    /// Semantic parent of an out-of-line declaration (`void S::f() {}`).
    #[serde(rename = "parentDeclContextId")]
    pub parent_decl_context_id: Option<Id>,
    #[serde(rename = "storageClass")]
    pub storage_class: Option<String>,
    /// Initialization style of a variable (`"c"`, `"call"`, `"list"`).
    pub init: Option<String>,
    #[serde(rename = "completeDefinition")]
    pub complete_definition: Option<bool>,
    #[serde(rename = "tagUsed")]
    pub tag_used: Option<String>,
    #[serde(rename = "scopedEnumTag")]
    pub scoped_enum_tag: Option<String>,
    #[serde(rename = "explicitlyDefaulted")]
    pub explicitly_defaulted: Option<String>,
    #[serde(rename = "explicitlyDeleted")]
    pub explicitly_deleted: Option<bool>,
}

/// Data for statements and expressions that only need their position and type.
#[derive(Deserialize, Debug, Default)]
pub struct ExprData {
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
    /// Type operand of `sizeof(T)` / `alignof(T)`.
    #[serde(rename = "argType")]
    pub arg_type: Option<QualType>,
    #[serde(rename = "typeArg")]
    pub type_arg: Option<QualType>,
}

/// Reference expression data (DeclRefExpr, MemberExpr).
#[derive(Deserialize, Debug, Default)]
pub struct RefExprData {
    pub loc: Option<SourceLocation>,
    pub range: Option<SourceRange>,
    /// Set on `DeclRefExpr`.
    #[serde(rename = "referencedDecl")]
    pub referenced_decl: Option<BareDecl>,
    /// Set on `MemberExpr`.
    #[serde(rename = "referencedMemberDecl")]
    pub referenced_member_decl: Option<Id>,
    pub name: Option<String>,
    #[serde(rename = "isImplicit")]
    pub is_implicit: Option<bool>,
}

/// Constructor initializer (`CXXCtorInitializer`). Exactly one of the three
/// fields is present; the initializer expression is the node's only child.
#[derive(Deserialize, Debug, Default)]
pub struct CtorInitData {
    #[serde(rename = "anyInit")]
    pub any_init: Option<BareDecl>,
    #[serde(rename = "baseInit")]
    pub base_init: Option<QualType>,
    #[serde(rename = "delegatingInit")]
    pub delegating_init: Option<QualType>,
}

/// Inline summary of a declaration referenced from another node.
#[derive(Deserialize, Debug, Clone)]
pub struct BareDecl {
    pub id: Id,
    pub kind: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: Option<QualType>,
}

/// Clang's qualified type representation.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QualType {
    #[serde(rename = "qualType")]
    pub qual_type: Option<String>,
    #[serde(rename = "desugaredQualType")]
    pub desugared_qual_type: Option<String>,
    #[serde(rename = "typeAliasDeclId")]
    pub type_alias_decl_id: Option<Id>,
}

impl DeclData {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }
    pub fn is_implicit(&self) -> bool {
        self.is_implicit.unwrap_or(false)
    }
    pub fn is_extern(&self) -> bool {
        self.storage_class.as_deref() == Some("extern")
    }
    pub fn has_init(&self) -> bool {
        self.init.is_some()
    }
}

impl QualType {
    pub fn spelling(&self) -> Option<&str> {
        self.qual_type.as_deref().filter(|s| !s.is_empty())
    }
}

impl Clang {
    /// Front-end kind name of this node, as printed in the AST dump.
    pub fn kind_name(&self) -> &str {
        macro_rules! names {
            ($($variant:ident),* $(,)?) => {
                match self {
                    $(Clang::$variant(..) => stringify!($variant),)*
                    Clang::Other { kind, .. } => kind.as_deref().unwrap_or("Other"),
                }
            };
        }
        names!(
            TranslationUnitDecl, NamespaceDecl, NamespaceAliasDecl, LinkageSpecDecl, ExternCContextDecl,
            RecordDecl, CXXRecordDecl, EnumDecl, EnumConstantDecl, TypedefDecl, TypeAliasDecl,
            ClassTemplateDecl, ClassTemplateSpecializationDecl, ClassTemplatePartialSpecializationDecl,
            FunctionTemplateDecl, VarTemplateDecl, VarTemplateSpecializationDecl,
            VarTemplatePartialSpecializationDecl, TypeAliasTemplateDecl, TemplateTypeParmDecl,
            NonTypeTemplateParmDecl, TemplateTemplateParmDecl, FunctionDecl, CXXMethodDecl,
            CXXConstructorDecl, CXXDestructorDecl, CXXConversionDecl, CXXDeductionGuideDecl,
            CXXCtorInitializer, VarDecl, ParmVarDecl, FieldDecl, IndirectFieldDecl, UsingDecl,
            UsingDirectiveDecl, UsingShadowDecl, UnresolvedUsingTypenameDecl, UnresolvedUsingValueDecl,
            AccessSpecDecl, FriendDecl, StaticAssertDecl, LabelDecl, FileScopeAsmDecl, ImportDecl,
            DeclStmt, CallExpr, CXXMemberCallExpr, CXXOperatorCallExpr, DeclRefExpr, MemberExpr,
            ImplicitCastExpr, ParenExpr, MaterializeTemporaryExpr, CXXBindTemporaryExpr,
            ExprWithCleanups, CStyleCastExpr, CXXStaticCastExpr, CXXDynamicCastExpr,
            CXXReinterpretCastExpr, CXXConstCastExpr, CXXFunctionalCastExpr, UnaryExprOrTypeTraitExpr,
        )
    }

    /// Declaration payload, for every declaration variant.
    pub fn decl_data(&self) -> Option<&DeclData> {
        use Clang::*;
        match self {
            TranslationUnitDecl(d) | NamespaceDecl(d) | NamespaceAliasDecl(d) | LinkageSpecDecl(d)
            | ExternCContextDecl(d) | RecordDecl(d) | CXXRecordDecl(d) | EnumDecl(d) | EnumConstantDecl(d)
            | TypedefDecl(d) | TypeAliasDecl(d) | ClassTemplateDecl(d) | ClassTemplateSpecializationDecl(d)
            | ClassTemplatePartialSpecializationDecl(d) | FunctionTemplateDecl(d) | VarTemplateDecl(d)
            | VarTemplateSpecializationDecl(d) | VarTemplatePartialSpecializationDecl(d)
            | TypeAliasTemplateDecl(d) | TemplateTypeParmDecl(d) | NonTypeTemplateParmDecl(d)
            | TemplateTemplateParmDecl(d) | FunctionDecl(d) | CXXMethodDecl(d) | CXXConstructorDecl(d)
            | CXXDestructorDecl(d) | CXXConversionDecl(d) | CXXDeductionGuideDecl(d) | VarDecl(d)
            | ParmVarDecl(d) | FieldDecl(d) | IndirectFieldDecl(d) | UsingDecl(d) | UsingDirectiveDecl(d)
            | UsingShadowDecl(d) | UnresolvedUsingTypenameDecl(d) | UnresolvedUsingValueDecl(d)
            | AccessSpecDecl(d) | FriendDecl(d) | StaticAssertDecl(d) | LabelDecl(d) | FileScopeAsmDecl(d)
            | ImportDecl(d) => Some(d),
            _ => None,
        }
    }

    /// Whether this node is a declaration, including kinds this crate does
    /// not model yet (`ExportDecl`, `ConceptDecl`, ...).
    pub fn is_decl(&self) -> bool {
        match self {
            Clang::Other { kind, .. } => kind.as_deref().is_some_and(|k| k.ends_with("Decl")),
            other => other.decl_data().is_some(),
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(
            self,
            Clang::FunctionDecl(_)
                | Clang::CXXMethodDecl(_)
                | Clang::CXXConstructorDecl(_)
                | Clang::CXXDestructorDecl(_)
                | Clang::CXXConversionDecl(_)
                | Clang::CXXDeductionGuideDecl(_)
        )
    }

    pub fn is_template(&self) -> bool {
        matches!(
            self,
            Clang::ClassTemplateDecl(_)
                | Clang::FunctionTemplateDecl(_)
                | Clang::VarTemplateDecl(_)
                | Clang::TypeAliasTemplateDecl(_)
        )
    }

    pub fn is_template_parm(&self) -> bool {
        matches!(
            self,
            Clang::TemplateTypeParmDecl(_) | Clang::NonTypeTemplateParmDecl(_) | Clang::TemplateTemplateParmDecl(_)
        )
    }

    /// Location of the node's name (declarations) or the node itself.
    pub fn loc(&self) -> Option<&SourceLocation> {
        match self {
            Clang::DeclRefExpr(d) | Clang::MemberExpr(d) => d.loc.as_ref(),
            Clang::Other { loc, .. } => loc.as_ref(),
            other => match other.decl_data() {
                Some(d) => d.loc.as_ref(),
                None => other.expr_data().and_then(|e| e.loc.as_ref()),
            },
        }
    }

    pub fn range(&self) -> Option<&SourceRange> {
        match self {
            Clang::DeclRefExpr(d) | Clang::MemberExpr(d) => d.range.as_ref(),
            Clang::Other { range, .. } => range.as_ref(),
            Clang::CXXCtorInitializer(_) => None,
            other => match other.decl_data() {
                Some(d) => d.range.as_ref(),
                None => other.expr_data().and_then(|e| e.range.as_ref()),
            },
        }
    }

    fn expr_data(&self) -> Option<&ExprData> {
        use Clang::*;
        match self {
            DeclStmt(e) | CallExpr(e) | CXXMemberCallExpr(e) | CXXOperatorCallExpr(e) | ImplicitCastExpr(e)
            | ParenExpr(e) | MaterializeTemporaryExpr(e) | CXXBindTemporaryExpr(e) | ExprWithCleanups(e)
            | CStyleCastExpr(e) | CXXStaticCastExpr(e) | CXXDynamicCastExpr(e) | CXXReinterpretCastExpr(e)
            | CXXConstCastExpr(e) | CXXFunctionalCastExpr(e) | UnaryExprOrTypeTraitExpr(e) => Some(e),
            _ => None,
        }
    }
}

/// Extract the best concrete source location from a [`SourceLocation`].
///
/// Prefers the expansion location (where a macro was invoked, the position
/// the user sees in their source file) over the spelling location (inside the
/// macro definition).
pub fn resolve_loc(loc: &SourceLocation) -> Option<&BareSourceLocation> {
    loc.expansion_loc.as_ref().or(loc.spelling_loc.as_ref())
}

/// Stack left free before a recursive walk switches to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_SEGMENT: usize = 2 * 1024 * 1024;

/// Deserialize a clang JSON AST dump.
///
/// Expression trees nest far deeper than serde_json's default limit, so the
/// limit is lifted and the stack grows on demand instead.
pub fn deserialize_root(json: &str) -> Result<Node, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(json);
    de.disable_recursion_limit();
    let root = <Node as Deserialize>::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(root)
}

/// Run one step of a recursive AST walk, growing the stack when it runs low.
pub(crate) fn with_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, f)
}

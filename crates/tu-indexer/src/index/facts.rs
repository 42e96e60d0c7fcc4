use std::fmt;
use std::io::Write;

use serde::{Deserialize, Serialize};

/// A concrete, canonicalized position in a physical file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileLocation {
    /// Canonical absolute path of the file.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    /// Byte offset from the start of the file.
    pub offset: u32,
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
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
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Parameter => "parameter",
            Self::Field => "field",
            Self::Record => "record",
            Self::Enum => "enum",
            Self::EnumConstant => "enum_constant",
            Self::Namespace => "namespace",
            Self::NamespaceAlias => "namespace_alias",
            Self::Typedef => "typedef",
            Self::Template => "template",
        }
    }
}

/// A declaration found in the translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Where this declaration names the symbol.
    pub location: FileLocation,
    /// Whether this node is itself the defining occurrence.
    pub is_definition: bool,
    /// Defining declaration elsewhere (variables declared here, defined out of line).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub definition: Option<FileLocation>,
    /// Declaration of the variable's or field's type, for "go to type definition".
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_location: Option<FileLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Call,
    MemberAccess,
    VariableRead,
    TypeUse,
}

impl ReferenceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::MemberAccess => "member_access",
            Self::VariableRead => "variable_read",
            Self::TypeUse => "type_use",
        }
    }
}

/// The declaration a reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub qualified_name: String,
    /// Front-end declaration kind (e.g. `FunctionDecl`, `FieldDecl`).
    pub kind: String,
    pub location: FileLocation,
}

/// A use site of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub site: FileLocation,
    /// `None` when the front-end could not resolve the reference.
    pub target: Option<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fact", rename_all = "snake_case")]
pub enum Fact {
    Symbol(Symbol),
    Reference(Reference),
}

impl Fact {
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Fact::Symbol(s) => Some(s),
            Fact::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Fact::Reference(r) => Some(r),
            Fact::Symbol(_) => None,
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Symbol(s) => {
                write!(f, "symbol {} {} @ {}", s.kind.as_str(), s.qualified_name, s.location)?;
                if s.is_definition {
                    write!(f, " [def]")?;
                }
                if let Some(def) = &s.definition {
                    write!(f, " def={def}")?;
                }
                if let Some(ty) = &s.type_location {
                    write!(f, " type={ty}")?;
                }
                Ok(())
            },
            Fact::Reference(r) => {
                write!(f, "ref {} @ {} -> ", r.kind.as_str(), r.site)?;
                match &r.target {
                    Some(t) => write!(f, "{} ({}) @ {}", t.qualified_name, t.kind, t.location),
                    None => write!(f, "<unresolved>"),
                }
            },
        }
    }
}

/// Receiver of the fact stream produced by one traversal.
pub trait FactSink {
    fn emit(
        &mut self,
        fact: Fact,
    );
}

impl FactSink for Vec<Fact> {
    fn emit(
        &mut self,
        fact: Fact,
    ) {
        self.push(fact);
    }
}

impl<S: FactSink + ?Sized> FactSink for &mut S {
    fn emit(
        &mut self,
        fact: Fact,
    ) {
        (**self).emit(fact);
    }
}

/// Writes one JSON object per fact per line.
///
/// The first write error is kept and every later fact is dropped; call
/// [`finish`](Self::finish) to flush and surface it.
pub struct JsonLinesSink<W: Write> {
    writer: W,
    error: Option<std::io::Error>,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> std::io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> FactSink for JsonLinesSink<W> {
    fn emit(
        &mut self,
        fact: Fact,
    ) {
        if self.error.is_some() {
            return;
        }
        let result = serde_json::to_writer(&mut self.writer, &fact)
            .map_err(std::io::Error::from)
            .and_then(|()| self.writer.write_all(b"\n"));
        match result {
            Ok(()) => self.written += 1,
            Err(e) => self.error = Some(e),
        }
    }
}

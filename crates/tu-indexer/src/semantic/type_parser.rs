//! Parser for the type spellings clang prints in `qualType` strings.
//!
//! The grammar covered is the subset clang's type printer emits:
//! declaration specifiers (qualifiers, an optional tag keyword, builtin
//! words or a possibly-qualified, possibly-templated name) followed by an
//! abstract declarator (`*`, `&`, `&&`, `[N]`, `(params)` and parenthesized
//! nesting). Anything else parses to [`BaseSyntax::Opaque`] or fails.

use std::ops::Range;

use logos::Logos;

use crate::semantic::decl_table::TagKind;
use crate::semantic::types::Qualifiers;

/// Deeper nesting than this is rejected instead of risking the stack.
const MAX_PARSE_DEPTH: usize = 64;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
#[logos(error = ())]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum TypeToken {
    #[regex(r"type-parameter-[0-9]+-[0-9]+")]
    TemplateParm,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    #[regex(r"[0-9][0-9A-Za-z_.']*")]
    Number,

    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("*")]
    Star,
    #[token("&&")]
    AmpAmp,
    #[token("&")]
    Amp,
    #[token("^")]
    Caret,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,

    /// Any character the grammar has no use for.
    #[regex(r"[^ \t\n\r\f]", priority = 0)]
    Unknown,
}

/// One step of an abstract declarator, applied innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaratorOp {
    Pointer(Qualifiers),
    LValueReference,
    RValueReference,
    Array(Option<u64>),
    Function { params: Vec<TypeSyntax>, variadic: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    /// Template argument spellings, when the segment is a template-id.
    pub args: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseSyntax {
    /// Builtin type words in source order (`unsigned long`).
    Builtin(String),
    Named { tag: Option<TagKind>, path: Vec<PathSegment> },
    /// Canonical template parameter (`type-parameter-0-1`).
    TemplateParm(String),
    /// Unnamed record or lambda: `(unnamed struct at f.c:3:1)`.
    Anonymous { tag: Option<TagKind>, text: String },
    /// A spelling that names no declaration (`decltype(...)`, `<dependent type>`).
    Opaque(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSyntax {
    pub base: BaseSyntax,
    pub quals: Qualifiers,
    pub ops: Vec<DeclaratorOp>,
}

impl PathSegment {
    fn plain(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            args: None,
        }
    }
}

impl BaseSyntax {
    /// `a::b::c` without template arguments.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            BaseSyntax::Named { path, .. } => {
                Some(path.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join("::"))
            },
            _ => None,
        }
    }
}

/// Parse a clang type spelling. Returns `None` for spellings outside the
/// supported grammar.
pub fn parse_type(spelling: &str) -> Option<TypeSyntax> {
    let mut parser = Parser::new(spelling);
    let ty = parser.type_syntax(0)?;
    parser.at_end().then_some(ty)
}

const BUILTIN_WORDS: &[&str] = &[
    "void", "bool", "_Bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "signed", "unsigned", "float", "double", "__int128", "__int128_t", "__uint128_t", "_Complex", "__fp16",
    "_Float16", "__bf16", "_Float128", "__float128", "auto", "nullptr_t", "__builtin_va_list", "_Float32",
    "_Float64",
];

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(TypeToken, &'a str, Range<usize>)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = TypeToken::lexer(input);
        let mut tokens = Vec::new();
        while let Some(token) = lexer.next() {
            tokens.push((token.unwrap_or(TypeToken::Unknown), lexer.slice(), lexer.span()));
        }
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<TypeToken> {
        self.tokens.get(self.pos).map(|(t, ..)| *t)
    }

    fn peek_nth(
        &self,
        n: usize,
    ) -> Option<TypeToken> {
        self.tokens.get(self.pos + n).map(|(t, ..)| *t)
    }

    fn peek_text(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(|(_, s, _)| *s)
    }

    fn bump(&mut self) -> Option<(TypeToken, &'a str)> {
        let (kind, text, _) = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some((*kind, *text))
    }

    /// Byte offset where the next token starts.
    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.input.len(), |(_, _, span)| span.start)
    }

    /// Byte offset where the previous token ended.
    fn last_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or(0, |(_, _, span)| span.end)
    }

    fn eat(
        &mut self,
        kind: TypeToken,
    ) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn type_syntax(
        &mut self,
        depth: usize,
    ) -> Option<TypeSyntax> {
        if depth > MAX_PARSE_DEPTH {
            return None;
        }
        let (base, quals) = self.specifiers(depth)?;
        let ops = self.abstract_declarator(depth + 1)?;
        Some(TypeSyntax { base, quals, ops })
    }

    fn specifiers(
        &mut self,
        depth: usize,
    ) -> Option<(BaseSyntax, Qualifiers)> {
        let mut quals = Qualifiers::default();
        let mut tag = None;
        let mut builtin: Vec<&str> = Vec::new();
        let mut base = None;

        loop {
            match self.peek() {
                Some(TypeToken::Ident) => {
                    let text = self.peek_text().unwrap_or_default();
                    if quals.absorb(text) {
                        self.pos += 1;
                    } else if let Some(t) = TagKind::from_keyword(text) {
                        self.pos += 1;
                        tag = Some(t);
                    } else if matches!(text, "decltype" | "typeof" | "__typeof__" | "_Atomic" | "__underlying_type") {
                        self.pos += 1;
                        let inner = self.balanced_parens()?;
                        base = Some(BaseSyntax::Opaque(format!("{text}({inner})")));
                    } else if text == "__attribute__" {
                        self.pos += 1;
                        self.balanced_parens()?;
                    } else if BUILTIN_WORDS.contains(&text) && base.is_none() {
                        self.pos += 1;
                        builtin.push(text);
                    } else if base.is_none() && builtin.is_empty() {
                        base = Some(self.named(tag, depth)?);
                    } else {
                        break;
                    }
                },
                Some(TypeToken::ColonColon) if base.is_none() && builtin.is_empty() => {
                    self.pos += 1;
                    base = Some(self.named(tag, depth)?);
                },
                Some(TypeToken::TemplateParm) if base.is_none() => {
                    let (_, text) = self.bump()?;
                    base = Some(BaseSyntax::TemplateParm(text.to_owned()));
                },
                Some(TypeToken::LParen) if base.is_none() && builtin.is_empty() && self.anonymous_ahead() => {
                    self.pos += 1;
                    let text = self.balanced_until_close()?;
                    base = Some(BaseSyntax::Anonymous {
                        tag,
                        text: format!("({text})"),
                    });
                    // `(anonymous namespace)::X` continues as a qualified name.
                    if self.peek() == Some(TypeToken::ColonColon) {
                        self.pos += 1;
                        let BaseSyntax::Named { tag, mut path } = self.named(tag, depth)? else {
                            return None;
                        };
                        path.insert(0, PathSegment::plain(&format!("({text})")));
                        base = Some(BaseSyntax::Named { tag, path });
                    }
                },
                Some(TypeToken::Less) if base.is_none() && builtin.is_empty() => {
                    // `<dependent type>`, `<overloaded function type>`
                    let start = self.offset();
                    while let Some((kind, _)) = self.bump() {
                        if kind == TypeToken::Greater {
                            break;
                        }
                    }
                    base = Some(BaseSyntax::Opaque(self.input[start..self.last_end()].to_owned()));
                },
                _ => break,
            }
        }

        let base = match base {
            Some(b) => b,
            None if !builtin.is_empty() => BaseSyntax::Builtin(builtin.join(" ")),
            None => return None,
        };
        Some((base, quals))
    }

    fn anonymous_ahead(&self) -> bool {
        self.peek_nth(1) == Some(TypeToken::Ident)
            && self
                .tokens
                .get(self.pos + 1)
                .is_some_and(|(_, s, _)| matches!(*s, "anonymous" | "unnamed" | "lambda"))
    }

    fn named(
        &mut self,
        tag: Option<TagKind>,
        depth: usize,
    ) -> Option<BaseSyntax> {
        let mut path = Vec::new();
        loop {
            let (kind, name) = self.bump()?;
            if kind != TypeToken::Ident {
                return None;
            }
            // `typename T::type` and `template X<..>` keywords carry no name.
            if matches!(name, "typename" | "template") {
                continue;
            }
            let args = if self.peek() == Some(TypeToken::Less) {
                self.pos += 1;
                Some(self.template_args(depth + 1)?)
            } else {
                None
            };
            path.push(PathSegment {
                name: name.to_owned(),
                args,
            });
            if self.peek() == Some(TypeToken::ColonColon) && self.peek_nth(1) == Some(TypeToken::Ident) {
                self.pos += 1;
                continue;
            }
            break;
        }
        Some(BaseSyntax::Named { tag, path })
    }

    /// Template argument spellings up to and including the closing `>`.
    fn template_args(
        &mut self,
        depth: usize,
    ) -> Option<Vec<String>> {
        if depth > MAX_PARSE_DEPTH {
            return None;
        }
        let mut args = Vec::new();
        let mut start = self.offset();
        let mut angle = 0usize;
        let mut paren = 0usize;
        loop {
            let end = self.offset();
            let (kind, _) = self.bump()?;
            match kind {
                TypeToken::Greater if angle == 0 && paren == 0 => {
                    let arg = self.input[start..end].trim();
                    if !arg.is_empty() {
                        args.push(arg.to_owned());
                    }
                    return Some(args);
                },
                TypeToken::Comma if angle == 0 && paren == 0 => {
                    args.push(self.input[start..end].trim().to_owned());
                    start = self.offset();
                },
                TypeToken::Less => angle += 1,
                TypeToken::Greater => angle = angle.saturating_sub(1),
                TypeToken::LParen | TypeToken::LBracket => paren += 1,
                TypeToken::RParen | TypeToken::RBracket => paren = paren.saturating_sub(1),
                _ => {},
            }
        }
    }

    fn balanced_parens(&mut self) -> Option<&'a str> {
        if !self.eat(TypeToken::LParen) {
            return None;
        }
        self.balanced_until_close()
    }

    /// Raw text up to the `)` matching an already consumed `(`.
    fn balanced_until_close(&mut self) -> Option<&'a str> {
        let start = self.last_end();
        let mut depth = 0usize;
        loop {
            let end = self.offset();
            let (kind, _) = self.bump()?;
            match kind {
                TypeToken::LParen => depth += 1,
                TypeToken::RParen if depth == 0 => return Some(self.input[start..end].trim()),
                TypeToken::RParen => depth -= 1,
                _ => {},
            }
        }
    }

    /// Parse an abstract declarator into the order its operations apply to
    /// the base type.
    fn abstract_declarator(
        &mut self,
        depth: usize,
    ) -> Option<Vec<DeclaratorOp>> {
        if depth > MAX_PARSE_DEPTH {
            return None;
        }
        let mut ops = Vec::new();
        loop {
            match self.peek() {
                Some(TypeToken::Star) | Some(TypeToken::Caret) => {
                    self.pos += 1;
                    let mut quals = Qualifiers::default();
                    while let Some(text) = self.peek_text()
                        && self.peek() == Some(TypeToken::Ident)
                        && quals.absorb(text)
                    {
                        self.pos += 1;
                    }
                    ops.push(DeclaratorOp::Pointer(quals));
                },
                Some(TypeToken::Amp) => {
                    self.pos += 1;
                    ops.push(DeclaratorOp::LValueReference);
                },
                Some(TypeToken::AmpAmp) => {
                    self.pos += 1;
                    ops.push(DeclaratorOp::RValueReference);
                },
                _ => break,
            }
        }

        let nested = if self.peek() == Some(TypeToken::LParen)
            && matches!(
                self.peek_nth(1),
                Some(TypeToken::Star) | Some(TypeToken::Caret) | Some(TypeToken::Amp) | Some(TypeToken::AmpAmp)
            ) {
            self.pos += 1;
            let inner = self.abstract_declarator(depth + 1)?;
            if !self.eat(TypeToken::RParen) {
                return None;
            }
            Some(inner)
        } else {
            None
        };

        let mut suffixes = Vec::new();
        loop {
            match self.peek() {
                Some(TypeToken::LBracket) => {
                    self.pos += 1;
                    let size = match self.peek() {
                        Some(TypeToken::Number) => {
                            let text = self.bump().map(|(_, s)| s).unwrap_or_default();
                            text.parse::<u64>().ok()
                        },
                        _ => None,
                    };
                    while !self.eat(TypeToken::RBracket) {
                        self.bump()?;
                    }
                    suffixes.push(DeclaratorOp::Array(size));
                },
                Some(TypeToken::LParen) => {
                    self.pos += 1;
                    suffixes.push(self.parameters(depth + 1)?);
                },
                _ => break,
            }
        }

        ops.extend(suffixes.into_iter().rev());
        if let Some(inner) = nested {
            ops.extend(inner);
        }
        Some(ops)
    }

    fn parameters(
        &mut self,
        depth: usize,
    ) -> Option<DeclaratorOp> {
        let mut params = Vec::new();
        let mut variadic = false;
        if !self.eat(TypeToken::RParen) {
            loop {
                if self.eat(TypeToken::Ellipsis) {
                    variadic = true;
                } else {
                    params.push(self.type_syntax(depth + 1)?);
                }
                if self.eat(TypeToken::Comma) {
                    continue;
                }
                if self.eat(TypeToken::RParen) {
                    break;
                }
                return None;
            }
        }
        // Trailing qualifiers and ref-qualifiers of member function types.
        while let Some(text) = self.peek_text()
            && (matches!(text, "const" | "volatile" | "&" | "&&" | "noexcept" | "__attribute__"))
        {
            self.pos += 1;
            if matches!(text, "noexcept" | "__attribute__") && self.peek() == Some(TypeToken::LParen) {
                self.balanced_parens()?;
            }
        }
        // `(void)` is the C spelling of an empty parameter list.
        if params.len() == 1
            && params[0].ops.is_empty()
            && params[0].base == BaseSyntax::Builtin("void".to_owned())
        {
            params.clear();
        }
        Some(DeclaratorOp::Function { params, variadic })
    }
}

#[cfg(test)]
#[path = "../../tests/src/semantic/type_parser_tests.rs"]
mod tests;

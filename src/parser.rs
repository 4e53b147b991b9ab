//! Parser for interface description files.
//!
//! The grammar is a small C-flavoured declaration language: typedefs,
//! `config { ... }` blocks, single-level namespaces, annotated function
//! declarations and `gen_type` directives. Types use the C declarator
//! syntax, including function pointers and functions returning function
//! pointers. Typedef names are resolved while parsing, so every type in
//! the produced AST is already canonical.

use crate::diagnostics::Diagnostic;
use crate::lexer::{self, Token, TokenKind};
use crate::types::{CType, FunctionSig, QualType, TypeCatalogue};

#[derive(Debug)]
pub struct InterfaceAst {
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub enum Item {
    Config(ConfigBlock),
    Namespace(NamespaceBlock),
    Function(FunctionDecl),
    GenType(GenTypeDecl),
}

/// The namespace-descriptor declaration of the enclosing scope.
#[derive(Debug)]
pub struct ConfigBlock {
    pub entries: Vec<ConfigEntry>,
    pub loc: usize,
}

#[derive(Debug)]
pub struct ConfigEntry {
    pub name: String,
    pub value: ConfigValue,
    pub loc: usize,
}

#[derive(Debug)]
pub enum ConfigValue {
    Flag,
    Int(u64),
    Str(String),
}

#[derive(Debug)]
pub struct NamespaceBlock {
    pub name: String,
    pub loc: usize,
    pub items: Vec<Item>,
}

/// One entry of a `[[ ... ]]` annotation list. Recognition of the
/// vocabulary happens in the analysis pass; the parser only carries the
/// spelling, the optional type argument, and the location.
#[derive(Debug)]
pub struct Annotation {
    pub name: String,
    pub arg: Option<QualType>,
    pub loc: usize,
}

#[derive(Debug)]
pub struct FunctionDecl {
    pub name: String,
    pub return_type: QualType,
    pub params: Vec<QualType>,
    pub variadic: bool,
    pub annotations: Vec<Annotation>,
    pub loc: usize,
}

#[derive(Debug)]
pub struct GenTypeDecl {
    pub ty: QualType,
    pub loc: usize,
}

/// Tokenize and parse a full interface description.
pub fn parse_interface(source: &str) -> Result<InterfaceAst, Diagnostic> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(&tokens);
    parser.parse_file()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    catalogue: TypeCatalogue,
}

/// Intermediate declarator shape, converted inside-out into a type.
enum DeclNode {
    Name(Option<(String, usize)>),
    Pointer {
        is_const: bool,
        is_volatile: bool,
        inner: Box<DeclNode>,
    },
    Function {
        inner: Box<DeclNode>,
        params: Vec<QualType>,
        variadic: bool,
    },
}

fn apply_declarator(node: DeclNode, base: QualType) -> (Option<(String, usize)>, QualType) {
    match node {
        DeclNode::Name(name) => (name, base),
        DeclNode::Pointer {
            is_const,
            is_volatile,
            inner,
        } => apply_declarator(
            *inner,
            QualType {
                is_const,
                is_volatile,
                ty: CType::Pointer(Box::new(base)),
            },
        ),
        DeclNode::Function {
            inner,
            params,
            variadic,
        } => apply_declarator(
            *inner,
            QualType::unqualified(CType::Function(Box::new(FunctionSig {
                return_type: base,
                params,
                variadic,
            }))),
        ),
    }
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser {
            tokens,
            pos: 0,
            catalogue: TypeCatalogue::new(),
        }
    }

    fn peek(&self) -> &'a Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, offset: usize) -> &'a Token {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &'a Token {
        let tok = self.peek();
        if !matches!(tok.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn loc(&self) -> usize {
        self.peek().span.start
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<&'a Token, Diagnostic> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(Diagnostic::new(format!("expected {}", what), self.loc()))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(String, usize), Diagnostic> {
        match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let loc = self.loc();
                self.advance();
                Ok((name, loc))
            }
            _ => Err(Diagnostic::new(format!("expected {}", what), self.loc())),
        }
    }

    fn parse_file(&mut self) -> Result<InterfaceAst, Diagnostic> {
        let items = self.parse_items(false)?;
        self.expect(&TokenKind::Eof, "a declaration")?;
        Ok(InterfaceAst { items })
    }

    /// Parse items until end of file (global scope) or a closing brace
    /// (namespace scope).
    fn parse_items(&mut self, in_namespace: bool) -> Result<Vec<Item>, Diagnostic> {
        let mut items = Vec::new();
        loop {
            match &self.peek().kind {
                TokenKind::Eof => break,
                TokenKind::RightBrace if in_namespace => break,
                TokenKind::Typedef => {
                    self.parse_typedef()?;
                }
                TokenKind::Config => items.push(Item::Config(self.parse_config_block()?)),
                TokenKind::Namespace => {
                    if in_namespace {
                        return Err(Diagnostic::new("namespaces do not nest", self.loc()));
                    }
                    items.push(Item::Namespace(self.parse_namespace()?));
                }
                TokenKind::GenType => items.push(Item::GenType(self.parse_gen_type()?)),
                _ => items.push(Item::Function(self.parse_function_decl()?)),
            }
        }
        Ok(items)
    }

    /// `typedef <specifiers> <declarator> ;` is consumed into the
    /// catalogue; no AST node.
    fn parse_typedef(&mut self) -> Result<(), Diagnostic> {
        let kw = self.expect(&TokenKind::Typedef, "`typedef`")?;
        let kw_loc = kw.span.start;
        let base = self.parse_decl_specifiers()?;
        let node = self.parse_decl_node()?;
        match apply_declarator(node, base) {
            (Some((name, name_loc)), ty) => {
                self.catalogue.define_typedef(&name, ty, name_loc)?;
            }
            (None, _) => return Err(Diagnostic::new("typedef requires a name", kw_loc)),
        }
        self.expect(&TokenKind::Semicolon, "`;` after typedef")?;
        Ok(())
    }

    fn parse_config_block(&mut self) -> Result<ConfigBlock, Diagnostic> {
        let kw = self.expect(&TokenKind::Config, "`config`")?;
        let loc = kw.span.start;
        self.expect(&TokenKind::LeftBrace, "`{` after `config`")?;
        let mut entries = Vec::new();
        while !matches!(self.peek().kind, TokenKind::RightBrace | TokenKind::Eof) {
            let (name, entry_loc) = self.expect_ident("a config entry name")?;
            let value = if self.eat(&TokenKind::Eq) {
                match &self.peek().kind {
                    TokenKind::Integer(v) => {
                        let v = *v;
                        self.advance();
                        ConfigValue::Int(v)
                    }
                    TokenKind::Str(s) => {
                        let s = s.clone();
                        self.advance();
                        ConfigValue::Str(s)
                    }
                    _ => {
                        return Err(Diagnostic::new(
                            "expected a string or integer literal",
                            self.loc(),
                        ));
                    }
                }
            } else {
                ConfigValue::Flag
            };
            self.expect(&TokenKind::Semicolon, "`;` after the config entry")?;
            entries.push(ConfigEntry {
                name,
                value,
                loc: entry_loc,
            });
        }
        self.expect(&TokenKind::RightBrace, "`}` closing the config block")?;
        Ok(ConfigBlock { entries, loc })
    }

    fn parse_namespace(&mut self) -> Result<NamespaceBlock, Diagnostic> {
        let kw = self.expect(&TokenKind::Namespace, "`namespace`")?;
        let loc = kw.span.start;
        let (name, _) = self.expect_ident("a namespace name")?;
        self.expect(&TokenKind::LeftBrace, "`{` after the namespace name")?;
        let items = self.parse_items(true)?;
        self.expect(&TokenKind::RightBrace, "`}` closing the namespace")?;
        Ok(NamespaceBlock { name, loc, items })
    }

    /// `gen_type <abstract type> ;`
    fn parse_gen_type(&mut self) -> Result<GenTypeDecl, Diagnostic> {
        let kw = self.expect(&TokenKind::GenType, "`gen_type`")?;
        let loc = kw.span.start;
        let base = self.parse_decl_specifiers()?;
        let node = self.parse_decl_node()?;
        let (name, ty) = apply_declarator(node, base);
        if let Some((_, name_loc)) = name {
            return Err(Diagnostic::new(
                "gen_type does not declare a name",
                name_loc,
            ));
        }
        self.expect(&TokenKind::Semicolon, "`;` after gen_type")?;
        Ok(GenTypeDecl { ty, loc })
    }

    fn parse_function_decl(&mut self) -> Result<FunctionDecl, Diagnostic> {
        let mut annotations = Vec::new();
        while matches!(self.peek().kind, TokenKind::DoubleLeftBracket) {
            self.parse_annotation_list(&mut annotations)?;
        }

        let decl_loc = self.loc();
        let base = self.parse_decl_specifiers()?;
        let node = self.parse_decl_node()?;
        let (name, ty) = apply_declarator(node, base);
        let (name, name_loc) = match name {
            Some(n) => n,
            None => {
                return Err(Diagnostic::new(
                    "expected a named function declaration",
                    decl_loc,
                ));
            }
        };
        let sig = match ty.ty {
            CType::Function(sig) => *sig,
            _ => {
                return Err(Diagnostic::new(
                    format!("`{}` is not a function declaration", name),
                    name_loc,
                ));
            }
        };
        self.expect(&TokenKind::Semicolon, "`;` after the declaration")?;
        Ok(FunctionDecl {
            name,
            return_type: sig.return_type,
            params: sig.params,
            variadic: sig.variadic,
            annotations,
            loc: name_loc,
        })
    }

    fn parse_annotation_list(&mut self, out: &mut Vec<Annotation>) -> Result<(), Diagnostic> {
        self.expect(&TokenKind::DoubleLeftBracket, "`[[`")?;
        loop {
            let (name, loc) = self.expect_ident("an annotation name")?;
            let arg = if self.eat(&TokenKind::LeftParen) {
                let base = self.parse_decl_specifiers()?;
                let node = self.parse_decl_node()?;
                let (arg_name, ty) = apply_declarator(node, base);
                if let Some((_, name_loc)) = arg_name {
                    return Err(Diagnostic::new(
                        "annotation arguments are abstract types",
                        name_loc,
                    ));
                }
                self.expect(&TokenKind::RightParen, "`)` closing the annotation argument")?;
                Some(ty)
            } else {
                None
            };
            out.push(Annotation { name, arg, loc });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::DoubleRightBracket, "`]]`")?;
        Ok(())
    }

    /// Declaration specifiers: qualifiers, sign, and a base type, which
    /// may be a builtin, `struct Tag`, or a typedef name.
    fn parse_decl_specifiers(&mut self) -> Result<QualType, Diagnostic> {
        let start_loc = self.loc();
        let mut is_const = false;
        let mut is_volatile = false;
        let mut signedness: Option<bool> = None; // Some(true) = signed
        let mut long_count = 0u32;
        let mut is_short = false;

        enum Base {
            Void,
            Bool,
            Char,
            Int,
            Float,
            Double,
            Record(String),
            Alias(QualType),
        }
        let mut base: Option<Base> = None;

        loop {
            match &self.peek().kind {
                TokenKind::Const => {
                    is_const = true;
                    self.advance();
                }
                TokenKind::Volatile => {
                    is_volatile = true;
                    self.advance();
                }
                TokenKind::Signed | TokenKind::Unsigned => {
                    if signedness.is_some() {
                        return Err(Diagnostic::new("duplicate sign specifier", self.loc()));
                    }
                    signedness = Some(matches!(self.peek().kind, TokenKind::Signed));
                    self.advance();
                }
                TokenKind::Short => {
                    if is_short {
                        return Err(Diagnostic::new("duplicate `short`", self.loc()));
                    }
                    is_short = true;
                    self.advance();
                }
                TokenKind::Long => {
                    long_count += 1;
                    if long_count > 2 {
                        return Err(Diagnostic::new("too many `long` specifiers", self.loc()));
                    }
                    self.advance();
                }
                TokenKind::Void
                | TokenKind::Bool
                | TokenKind::Char
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Double => {
                    if base.is_some() {
                        return Err(Diagnostic::new("multiple type specifiers", self.loc()));
                    }
                    base = Some(match self.peek().kind {
                        TokenKind::Void => Base::Void,
                        TokenKind::Bool => Base::Bool,
                        TokenKind::Char => Base::Char,
                        TokenKind::Int => Base::Int,
                        TokenKind::Float => Base::Float,
                        _ => Base::Double,
                    });
                    self.advance();
                }
                TokenKind::Struct => {
                    if base.is_some() {
                        return Err(Diagnostic::new("multiple type specifiers", self.loc()));
                    }
                    self.advance();
                    let (tag, _) = self.expect_ident("a struct tag")?;
                    base = Some(Base::Record(tag));
                }
                TokenKind::Ident(name) => {
                    // A typedef name is only a specifier when no other
                    // base has been seen; otherwise it is the declarator
                    // name and ends the specifier list.
                    if base.is_none() && signedness.is_none() && !is_short && long_count == 0 {
                        let resolved = match self.catalogue.lookup(name) {
                            Some(ty) => ty.clone(),
                            None => {
                                return Err(Diagnostic::new(
                                    format!("unknown type name `{}`", name),
                                    self.loc(),
                                ));
                            }
                        };
                        self.advance();
                        base = Some(Base::Alias(resolved));
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }

        let modifier_used = signedness.is_some() || is_short || long_count > 0;
        let no_base = base.is_none();
        let ty = match base {
            Some(Base::Alias(aliased)) => {
                if modifier_used {
                    return Err(Diagnostic::new(
                        "sign and length specifiers cannot modify a typedef name",
                        start_loc,
                    ));
                }
                return Ok(QualType {
                    is_const: aliased.is_const || is_const,
                    is_volatile: aliased.is_volatile || is_volatile,
                    ty: aliased.ty,
                });
            }
            Some(Base::Record(tag)) => {
                if modifier_used {
                    return Err(Diagnostic::new(
                        "sign and length specifiers cannot modify a struct type",
                        start_loc,
                    ));
                }
                CType::Record(tag)
            }
            Some(Base::Void) | Some(Base::Bool) if modifier_used => {
                return Err(Diagnostic::new(
                    "invalid type specifier combination",
                    start_loc,
                ));
            }
            Some(Base::Void) => CType::Void,
            Some(Base::Bool) => CType::Bool,
            Some(Base::Char) => {
                if is_short || long_count > 0 {
                    return Err(Diagnostic::new(
                        "invalid type specifier combination",
                        start_loc,
                    ));
                }
                match signedness {
                    Some(true) => CType::SChar,
                    Some(false) => CType::UChar,
                    None => CType::Char,
                }
            }
            Some(Base::Float) => {
                if modifier_used {
                    return Err(Diagnostic::new(
                        "invalid type specifier combination",
                        start_loc,
                    ));
                }
                CType::Float
            }
            Some(Base::Double) => {
                if signedness.is_some() || is_short || long_count > 1 {
                    return Err(Diagnostic::new(
                        "invalid type specifier combination",
                        start_loc,
                    ));
                }
                if long_count == 1 {
                    CType::LongDouble
                } else {
                    CType::Double
                }
            }
            Some(Base::Int) | None => {
                if no_base && !modifier_used {
                    return Err(Diagnostic::new("expected a type specifier", start_loc));
                }
                if is_short && long_count > 0 {
                    return Err(Diagnostic::new(
                        "invalid type specifier combination",
                        start_loc,
                    ));
                }
                let unsigned = signedness == Some(false);
                match (is_short, long_count) {
                    (true, _) => {
                        if unsigned {
                            CType::UShort
                        } else {
                            CType::Short
                        }
                    }
                    (false, 0) => {
                        if unsigned {
                            CType::UInt
                        } else {
                            CType::Int
                        }
                    }
                    (false, 1) => {
                        if unsigned {
                            CType::ULong
                        } else {
                            CType::Long
                        }
                    }
                    _ => {
                        if unsigned {
                            CType::ULongLong
                        } else {
                            CType::LongLong
                        }
                    }
                }
            }
        };

        Ok(QualType {
            is_const,
            is_volatile,
            ty,
        })
    }

    /// C declarator: pointer prefixes, a name or a parenthesised group,
    /// then parameter-list suffixes.
    fn parse_decl_node(&mut self) -> Result<DeclNode, Diagnostic> {
        if self.eat(&TokenKind::Star) {
            let mut is_const = false;
            let mut is_volatile = false;
            loop {
                match self.peek().kind {
                    TokenKind::Const => {
                        is_const = true;
                        self.advance();
                    }
                    TokenKind::Volatile => {
                        is_volatile = true;
                        self.advance();
                    }
                    _ => break,
                }
            }
            return Ok(DeclNode::Pointer {
                is_const,
                is_volatile,
                inner: Box::new(self.parse_decl_node()?),
            });
        }

        let mut node = match &self.peek().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let loc = self.loc();
                self.advance();
                DeclNode::Name(Some((name, loc)))
            }
            // `(` opens a grouped declarator only when a `*` follows;
            // otherwise it is a parameter list of an abstract function
            // type.
            TokenKind::LeftParen if matches!(self.peek_at(1).kind, TokenKind::Star) => {
                self.advance();
                let inner = self.parse_decl_node()?;
                self.expect(&TokenKind::RightParen, "`)` closing the declarator")?;
                inner
            }
            _ => DeclNode::Name(None),
        };

        while matches!(self.peek().kind, TokenKind::LeftParen) {
            let (params, variadic) = self.parse_params()?;
            node = DeclNode::Function {
                inner: Box::new(node),
                params,
                variadic,
            };
        }
        Ok(node)
    }

    fn parse_params(&mut self) -> Result<(Vec<QualType>, bool), Diagnostic> {
        self.expect(&TokenKind::LeftParen, "`(`")?;

        if self.eat(&TokenKind::RightParen) {
            return Ok((Vec::new(), false));
        }
        // `(void)` is the C spelling of an empty parameter list
        if matches!(self.peek().kind, TokenKind::Void)
            && matches!(self.peek_at(1).kind, TokenKind::RightParen)
        {
            self.advance();
            self.advance();
            return Ok((Vec::new(), false));
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.eat(&TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            let base = self.parse_decl_specifiers()?;
            let node = self.parse_decl_node()?;
            let (_, mut ty) = apply_declarator(node, base);
            // bare function types decay to pointers, as in C
            if matches!(ty.ty, CType::Function(_)) {
                ty = QualType::pointer_to(ty);
            }
            params.push(ty);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "`)` closing the parameter list")?;
        Ok((params, variadic))
    }
}

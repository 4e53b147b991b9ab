//! The type catalogue: canonical C types and their rendered spellings.
//!
//! All types flowing through the interface model are canonical: typedef
//! chains are resolved away while parsing, integer widths are pinned to
//! the LP64 data model, and qualifiers keep one fixed spelling order.
//! Two typedef chains naming the same function-pointer signature
//! therefore compare equal and collapse to a single callback entry,
//! which keeps the guest and host digests in agreement.

use crate::diagnostics::Diagnostic;
use std::collections::HashMap;

/// A canonical C type, without qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    /// An opaque `struct Tag`. Only ever passed around behind pointers.
    Record(String),
    Pointer(Box<QualType>),
    /// A bare function type. In the model this only occurs behind a
    /// `Pointer` or as a `gen_type` argument.
    Function(Box<FunctionSig>),
}

/// A canonical type together with its cv-qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualType {
    pub is_const: bool,
    pub is_volatile: bool,
    pub ty: CType,
}

impl QualType {
    pub fn unqualified(ty: CType) -> QualType {
        QualType {
            is_const: false,
            is_volatile: false,
            ty,
        }
    }

    pub fn pointer_to(pointee: QualType) -> QualType {
        QualType::unqualified(CType::Pointer(Box::new(pointee)))
    }

    /// Same type with the top-level qualifiers stripped, as used for
    /// packed-args struct members.
    pub fn strip_qualifiers(&self) -> QualType {
        QualType {
            is_const: false,
            is_volatile: false,
            ty: self.ty.clone(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.ty, CType::Void)
    }

    /// The signature behind a pointer-to-function type, if this is one.
    pub fn function_pointee(&self) -> Option<&FunctionSig> {
        match &self.ty {
            CType::Pointer(inner) => match &inner.ty {
                CType::Function(sig) => Some(sig),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A canonical function signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    pub return_type: QualType,
    pub params: Vec<QualType>,
    pub variadic: bool,
}

impl FunctionSig {
    /// Rendered function-type spelling, e.g. `void (int, char)`. This
    /// string is what callback digests are computed over, so it must be
    /// stable for a given canonical signature.
    pub fn render(&self) -> String {
        render_declaration(
            &QualType::unqualified(CType::Function(Box::new(self.clone()))),
            "",
        )
    }
}

fn base_spelling(ty: &CType) -> String {
    match ty {
        CType::Void => "void".to_string(),
        CType::Bool => "bool".to_string(),
        CType::Char => "char".to_string(),
        CType::SChar => "signed char".to_string(),
        CType::UChar => "unsigned char".to_string(),
        CType::Short => "short".to_string(),
        CType::UShort => "unsigned short".to_string(),
        CType::Int => "int".to_string(),
        CType::UInt => "unsigned int".to_string(),
        CType::Long => "long".to_string(),
        CType::ULong => "unsigned long".to_string(),
        CType::LongLong => "long long".to_string(),
        CType::ULongLong => "unsigned long long".to_string(),
        CType::Float => "float".to_string(),
        CType::Double => "double".to_string(),
        CType::LongDouble => "long double".to_string(),
        CType::Record(tag) => format!("struct {}", tag),
        CType::Pointer(_) | CType::Function(_) => unreachable!("handled by the declarator walk"),
    }
}

/// Render `ty` declaring `name`, using the C inside-out declarator
/// rules: `const char *name`, `void (*name)(int)`, `int name`. Pass an
/// empty name for the abstract spelling (`void (*)(int)`).
pub fn render_declaration(ty: &QualType, name: &str) -> String {
    let mut qt = ty;
    let mut declarator = name.to_string();

    loop {
        match &qt.ty {
            CType::Pointer(inner) => {
                let mut quals = String::new();
                if qt.is_const {
                    quals.push_str("const");
                }
                if qt.is_volatile {
                    if !quals.is_empty() {
                        quals.push(' ');
                    }
                    quals.push_str("volatile");
                }
                let sep = if !quals.is_empty() && !declarator.is_empty() {
                    " "
                } else {
                    ""
                };
                declarator = format!("*{}{}{}", quals, sep, declarator);
                // A pointer to a function needs the grouping parens
                if matches!(inner.ty, CType::Function(_)) {
                    declarator = format!("({})", declarator);
                }
                qt = inner.as_ref();
            }
            CType::Function(sig) => {
                let mut params: Vec<String> = sig.params.iter().map(render_type).collect();
                if sig.variadic {
                    params.push("...".to_string());
                }
                declarator = format!("{}({})", declarator, params.join(", "));
                qt = &sig.return_type;
            }
            _ => break,
        }
    }

    let mut out = String::new();
    if qt.is_const {
        out.push_str("const ");
    }
    if qt.is_volatile {
        out.push_str("volatile ");
    }
    out.push_str(&base_spelling(&qt.ty));
    if !declarator.is_empty() {
        out.push(' ');
        out.push_str(&declarator);
    }
    out
}

/// Abstract spelling of a type, e.g. `unsigned int`, `const char *`,
/// `void (*)(int, ...)`.
pub fn render_type(ty: &QualType) -> String {
    render_declaration(ty, "")
}

/// Typedef resolution table. Prepopulated with the fixed-width and
/// pointer-sized aliases of the LP64 data model so interface headers
/// can use them without declaring anything.
pub struct TypeCatalogue {
    typedefs: HashMap<String, QualType>,
}

impl Default for TypeCatalogue {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeCatalogue {
    pub fn new() -> Self {
        let mut typedefs = HashMap::new();
        let builtin = [
            ("int8_t", CType::SChar),
            ("uint8_t", CType::UChar),
            ("int16_t", CType::Short),
            ("uint16_t", CType::UShort),
            ("int32_t", CType::Int),
            ("uint32_t", CType::UInt),
            ("int64_t", CType::Long),
            ("uint64_t", CType::ULong),
            ("size_t", CType::ULong),
            ("ssize_t", CType::Long),
            ("ptrdiff_t", CType::Long),
            ("intptr_t", CType::Long),
            ("uintptr_t", CType::ULong),
        ];
        for (name, ty) in builtin {
            typedefs.insert(name.to_string(), QualType::unqualified(ty));
        }
        TypeCatalogue { typedefs }
    }

    /// Register a user typedef. The aliased type is already canonical,
    /// so chains of typedefs resolve transitively for free. Redefining
    /// a name to a different type is an error; an identical
    /// redefinition is tolerated, matching C.
    pub fn define_typedef(
        &mut self,
        name: &str,
        ty: QualType,
        loc: usize,
    ) -> Result<(), Diagnostic> {
        if let Some(existing) = self.typedefs.get(name) {
            if *existing != ty {
                return Err(Diagnostic::new(
                    format!("typedef `{}` redefined with a different type", name),
                    loc,
                ));
            }
            return Ok(());
        }
        self.typedefs.insert(name.to_string(), ty);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&QualType> {
        self.typedefs.get(name)
    }
}

/// Insertion-order-preserving set of canonical function signatures.
///
/// Membership means the generated code must be able to invoke host
/// function pointers of that signature from guest code. Insertion order
/// is the `callback_<N>` index, so it must be stable across runs.
#[derive(Debug, Default)]
pub struct FuncPtrTypeSet {
    sigs: Vec<FunctionSig>,
    index: HashMap<FunctionSig, usize>,
}

impl FuncPtrTypeSet {
    pub fn insert(&mut self, sig: &FunctionSig) {
        if !self.index.contains_key(sig) {
            self.index.insert(sig.clone(), self.sigs.len());
            self.sigs.push(sig.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionSig> {
        self.sigs.iter()
    }

    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }
}

//! Definitions: binders, functions, classes, sorts, type aliases.
//!
//! All definitions are immutable values; passes build new ones rather than
//! mutating in place. Display names ride on the definitions (ids stay
//! opaque).

use bitflags::bitflags;

use crate::{Expr, Id, Span, Type};

/// A typed binder: parameter, let binding, or field.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ValDef {
    pub id: Id,
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

impl ValDef {
    pub fn new(id: Id, name: impl Into<String>, ty: Type) -> Self {
        ValDef {
            id,
            name: name.into(),
            ty,
            span: Span::DUMMY,
        }
    }

    /// Same binder with a different type.
    #[must_use]
    pub fn with_ty(&self, ty: Type) -> Self {
        ValDef {
            id: self.id,
            name: self.name.clone(),
            ty,
            span: self.span,
        }
    }
}

/// A type parameter declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeParamDef {
    pub id: Id,
    pub name: String,
}

bitflags! {
    /// Class-level flags set by the frontend.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct ClassFlags: u8 {
        /// The root marker class whose descendants are heap-resident.
        const ANY_HEAP_REF = 1 << 0;
    }
}

bitflags! {
    /// Function-level flags.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct FunFlags: u8 {
        /// Compiler-synthesized; not user source.
        const SYNTHETIC = 1 << 0;
        /// No verification conditions are generated from this body.
        const DROP_VCS = 1 << 1;
        /// The downstream inliner expands exactly one level of this call.
        const INLINE_ONCE = 1 << 2;
        /// The body is the built-in reference equality; the definition is
        /// deleted from the elaboration output.
        const REF_EQ = 1 << 3;
    }
}

/// Extractor metadata on synthesized `unapply` functions: the option
/// helpers the pattern compiler tests emptiness and projects values with.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct UnapplyInfo {
    pub is_empty: Id,
    pub get: Id,
}

/// The postcondition: a predicate over the result binder.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Ensures {
    pub binder: ValDef,
    pub pred: Expr,
}

/// Specification clauses of a function. Clauses are fields, not body
/// wrappers; a rewritten clause is self-contained and re-binds any
/// translated frame set it mentions.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct FunSpec {
    pub reads: Option<Expr>,
    pub modifies: Option<Expr>,
    pub requires: Vec<Expr>,
    pub ensures: Option<Ensures>,
    pub decreases: Option<Expr>,
}

impl FunSpec {
    /// A spec with no clauses at all.
    pub fn pure() -> Self {
        FunSpec::default()
    }
}

/// A function definition.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunDef {
    pub id: Id,
    pub name: String,
    pub tparams: Vec<TypeParamDef>,
    pub params: Vec<ValDef>,
    pub return_ty: Type,
    pub body: Expr,
    pub spec: FunSpec,
    pub flags: FunFlags,
    pub unapply_info: Option<UnapplyInfo>,
    pub span: Span,
}

/// A class definition. Parents are class references with type arguments.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ClassDef {
    pub id: Id,
    pub name: String,
    pub tparams: Vec<TypeParamDef>,
    pub parents: Vec<(Id, Vec<Type>)>,
    pub fields: Vec<ValDef>,
    pub flags: ClassFlags,
    pub span: Span,
}

/// One constructor of an ADT sort.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ConstructorDef {
    pub id: Id,
    pub name: String,
    pub fields: Vec<ValDef>,
}

/// An ADT sort definition.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SortDef {
    pub id: Id,
    pub name: String,
    pub tparams: Vec<TypeParamDef>,
    pub constructors: Vec<ConstructorDef>,
}

/// A type alias definition.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypeAliasDef {
    pub id: Id,
    pub name: String,
    pub tparams: Vec<TypeParamDef>,
    pub aliased: Type,
}

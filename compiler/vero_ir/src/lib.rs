//! Typed tree IR for the Vero verifier.
//!
//! This crate defines the data the verifier's middle passes exchange:
//!
//! - [`Span`] — compact source positions.
//! - [`Id`] — opaque definition identifiers with pre-reserved builtins.
//! - [`Type`] — the type universe, including the heap forms the
//!   elaboration pass introduces.
//! - [`Expr`] / [`Pattern`] — the typed expression and pattern trees.
//! - [`FunDef`], [`ClassDef`], [`SortDef`], [`TypeAliasDef`] — immutable
//!   definitions with specification clauses and flags.
//! - [`Symbols`] — the id-keyed definition tables passes consume and
//!   produce.
//!
//! # Design
//!
//! Expression kinds form a closed enum; passes match exhaustively and
//! thread an explicit environment instead of inheriting from a transformer
//! hierarchy. Trees are boxed: the heap elaboration synthesizes deeply
//! nested binding/assertion chains, which tree nodes express directly.

mod defs;
mod expr;
mod id;
mod pattern;
mod span;
mod symbols;
mod types;

pub use defs::{
    ClassDef, ClassFlags, ConstructorDef, Ensures, FunDef, FunFlags, FunSpec, SortDef,
    TypeAliasDef, TypeParamDef, UnapplyInfo, ValDef,
};
pub use expr::{AssertKind, BinOpKind, Expr, ExprKind, MatchCase};
pub use id::{Id, IdGen};
pub use pattern::{LitValue, Pattern, PatternKind};
pub use span::Span;
pub use symbols::Symbols;
pub use types::Type;

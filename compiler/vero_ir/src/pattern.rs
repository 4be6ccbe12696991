//! Match patterns.
//!
//! The unapply form carries *record arguments* — plain expressions (the
//! current heap and a reads-domain option) threaded to the extractor call
//! ahead of the scrutinee. Only the heap elaboration produces it.

use crate::{Expr, Id, Span, Type, ValDef};

/// Literal pattern values.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LitValue {
    Int(i64),
    Bool(bool),
    Unit,
}

/// A pattern with an optional binder for the matched value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Pattern {
    pub binder: Option<ValDef>,
    pub kind: PatternKind,
    pub span: Span,
}

/// Pattern variants.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum PatternKind {
    /// Matches anything.
    Wildcard,
    /// Matches a literal value.
    Literal(LitValue),
    /// Class (or sort constructor) pattern with sub-patterns per field.
    Class {
        class_id: Id,
        tps: Vec<Type>,
        subs: Vec<Pattern>,
    },
    /// Tuple pattern.
    Tuple(Vec<Pattern>),
    /// Extractor pattern: `f(recs…)(scrutinee)` matching when the call
    /// returns a non-empty option, then matching `sub` against its value.
    Unapply {
        recs: Vec<Expr>,
        id: Id,
        tps: Vec<Type>,
        sub: Box<Pattern>,
    },
}

impl Pattern {
    /// Anonymous wildcard.
    pub fn wildcard(span: Span) -> Pattern {
        Pattern {
            binder: None,
            kind: PatternKind::Wildcard,
            span,
        }
    }

    /// Wildcard binding the scrutinee.
    pub fn binding(vd: ValDef) -> Pattern {
        let span = vd.span;
        Pattern {
            binder: Some(vd),
            kind: PatternKind::Wildcard,
            span,
        }
    }

    /// All record-argument expressions in this pattern and its
    /// sub-patterns, outermost first.
    pub fn record_args(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_record_args(&mut out);
        out
    }

    fn collect_record_args<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match &self.kind {
            PatternKind::Wildcard | PatternKind::Literal(_) => {}
            PatternKind::Class { subs, .. } | PatternKind::Tuple(subs) => {
                for sub in subs {
                    sub.collect_record_args(out);
                }
            }
            PatternKind::Unapply { recs, sub, .. } => {
                out.extend(recs.iter());
                sub.collect_record_args(out);
            }
        }
    }
}

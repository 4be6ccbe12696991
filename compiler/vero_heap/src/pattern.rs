//! Pattern rewriting and unapply synthesis.
//!
//! A class pattern against a heap class cannot match the scrutinee
//! directly any more — the scrutinee is a ref. It becomes an extractor
//! pattern calling the class's synthesized `unapply` function with the
//! current heap and a reads-domain option as record arguments; the
//! extractor dereferences the heap and yields the class value for the
//! original pattern to match.

use vero_ir::{
    ClassDef, Expr, ExprKind, FunDef, FunFlags, FunSpec, Id, Pattern, PatternKind, Span, Type,
    UnapplyInfo, ValDef,
};

use crate::ctx::ElabCtx;
use crate::env::RewriteEnv;
use crate::oracle::is_heap_class;
use crate::rewrite::Rewriter;

impl Rewriter<'_> {
    /// Rewrite one pattern under `env`.
    pub fn rewrite_pattern(&self, pat: &Pattern, env: &RewriteEnv) -> Pattern {
        match &pat.kind {
            PatternKind::Class {
                class_id,
                tps,
                subs,
            } if is_heap_class(self.ctx, *class_id) => {
                let reads = self.expect_reads(env, "pattern-match on a heap object", pat.span);
                let heap = self.heap_binding(env);
                let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();

                // none when reads are unrestricted, some(reads) otherwise.
                let reads_dom = match reads.bound() {
                    Some(set) => Expr::new(
                        ExprKind::Adt {
                            ctor: Id::OPTION_SOME,
                            tps: vec![Type::ref_set()],
                            args: vec![Expr::var(set)],
                        },
                        Type::option(Type::ref_set()),
                        pat.span,
                    ),
                    None => Expr::new(
                        ExprKind::Adt {
                            ctor: Id::OPTION_NONE,
                            tps: vec![Type::ref_set()],
                            args: Vec::new(),
                        },
                        Type::option(Type::ref_set()),
                        pat.span,
                    ),
                };

                let inner = Pattern {
                    binder: None,
                    kind: PatternKind::Class {
                        class_id: *class_id,
                        tps: tps.clone(),
                        subs: subs
                            .iter()
                            .map(|sub| self.rewrite_pattern(sub, env))
                            .collect(),
                    },
                    span: pat.span,
                };
                Pattern {
                    binder: pat
                        .binder
                        .as_ref()
                        .map(|b| b.with_ty(Type::heap_ref())),
                    kind: PatternKind::Unapply {
                        recs: vec![Expr::var(&heap), reads_dom],
                        id: self.ctx.unapply_of(*class_id),
                        tps,
                        sub: Box::new(inner),
                    },
                    span: pat.span,
                }
            }

            PatternKind::Class {
                class_id,
                tps,
                subs,
            } => Pattern {
                binder: self.rewrite_binder(pat),
                kind: PatternKind::Class {
                    class_id: *class_id,
                    tps: tps.iter().map(|t| self.ty(t)).collect(),
                    subs: subs
                        .iter()
                        .map(|sub| self.rewrite_pattern(sub, env))
                        .collect(),
                },
                span: pat.span,
            },

            PatternKind::Tuple(subs) => Pattern {
                binder: self.rewrite_binder(pat),
                kind: PatternKind::Tuple(
                    subs.iter()
                        .map(|sub| self.rewrite_pattern(sub, env))
                        .collect(),
                ),
                span: pat.span,
            },

            PatternKind::Unapply {
                recs,
                id,
                tps,
                sub,
            } => Pattern {
                binder: self.rewrite_binder(pat),
                kind: PatternKind::Unapply {
                    recs: recs.iter().map(|rec| self.rewrite(rec, env)).collect(),
                    id: *id,
                    tps: tps.iter().map(|t| self.ty(t)).collect(),
                    sub: Box::new(self.rewrite_pattern(sub, env)),
                },
                span: pat.span,
            },

            PatternKind::Wildcard | PatternKind::Literal(_) => Pattern {
                binder: self.rewrite_binder(pat),
                kind: pat.kind.clone(),
                span: pat.span,
            },
        }
    }

    fn rewrite_binder(&self, pat: &Pattern) -> Option<ValDef> {
        pat.binder.as_ref().map(|b| b.with_ty(self.ty(&b.ty)))
    }
}

/// Synthesize the extractor for a heap class:
///
/// ```text
/// unapply_C[T…](heap: Heap, readsDom: Option<HeapRefSet>, x: HeapRef): Option<C[T…]>
///   requires readsDom.isEmpty || x ∈ readsDom.get
///   = if (heap(x) is C) some(heap(x) as C) else none
/// ```
pub fn synth_unapply(ctx: &ElabCtx<'_>, class: &ClassDef) -> FunDef {
    let targs: Vec<Type> = class
        .tparams
        .iter()
        .map(|tp| Type::TypeParam(tp.id))
        .collect();
    let class_ty = Type::Class(class.id, targs.clone());
    let option_ty = Type::option(class_ty.clone());

    let heap = ValDef::new(Id::local(0), "heap", Type::Heap);
    let reads_dom = ValDef::new(Id::local(1), "readsDom", Type::option(Type::ref_set()));
    let x = ValDef::new(Id::local(2), "x", Type::heap_ref());

    let loaded = |span| {
        Expr::new(
            ExprKind::HeapGet {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&x)),
            },
            Type::Dyn,
            span,
        )
    };

    let is_empty = Expr::new(
        ExprKind::FunCall {
            id: Id::OPTION_IS_EMPTY,
            tps: vec![Type::ref_set()],
            args: vec![Expr::var(&reads_dom)],
        },
        Type::Bool,
        Span::DUMMY,
    );
    let get = Expr::new(
        ExprKind::FunCall {
            id: Id::OPTION_GET,
            tps: vec![Type::ref_set()],
            args: vec![Expr::var(&reads_dom)],
        },
        Type::ref_set(),
        Span::DUMMY,
    );
    let requires = Expr::new(
        ExprKind::BinOp {
            op: vero_ir::BinOpKind::Or,
            lhs: Box::new(is_empty),
            rhs: Box::new(Expr::element_of(Expr::var(&x), get)),
        },
        Type::Bool,
        Span::DUMMY,
    );

    let test = Expr::new(
        ExprKind::IsInstance {
            expr: Box::new(loaded(Span::DUMMY)),
            class_id: class.id,
            tps: targs.clone(),
        },
        Type::Bool,
        Span::DUMMY,
    );
    let cast = Expr::new(
        ExprKind::AsInstance {
            expr: Box::new(loaded(Span::DUMMY)),
            class_id: class.id,
            tps: targs,
        },
        class_ty.clone(),
        Span::DUMMY,
    );
    let some = Expr::new(
        ExprKind::Adt {
            ctor: Id::OPTION_SOME,
            tps: vec![class_ty.clone()],
            args: vec![cast],
        },
        option_ty.clone(),
        Span::DUMMY,
    );
    let none = Expr::new(
        ExprKind::Adt {
            ctor: Id::OPTION_NONE,
            tps: vec![class_ty],
            args: Vec::new(),
        },
        option_ty.clone(),
        Span::DUMMY,
    );
    let body = Expr::new(
        ExprKind::IfExpr {
            cond: Box::new(test),
            then_branch: Box::new(some),
            else_branch: Box::new(none),
        },
        option_ty.clone(),
        Span::DUMMY,
    );

    FunDef {
        id: ctx.unapply_of(class.id),
        name: format!("unapply_{}", class.name),
        tparams: class.tparams.clone(),
        params: vec![heap, reads_dom, x],
        return_ty: option_ty,
        body,
        spec: FunSpec {
            requires: vec![requires],
            ..FunSpec::pure()
        },
        flags: FunFlags::SYNTHETIC | FunFlags::DROP_VCS,
        unapply_info: Some(UnapplyInfo {
            is_empty: Id::OPTION_IS_EMPTY,
            get: Id::OPTION_GET,
        }),
        span: Span::DUMMY,
    }
}

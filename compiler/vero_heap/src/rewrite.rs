//! The expression rewriter.
//!
//! Compiles every heap-facing expression form into explicit map
//! operations on the current heap variable, inserting frame-condition
//! assertions as it goes. The environment decides what is allowed: no
//! heap binding means heap usage is a user error, a restricted frame
//! means membership assertions, an unrestricted frame means none.
//!
//! Error sites report through the reporter and fall back to a dummy
//! binding (or an empty frame set) so one run surfaces every error.
//!
//! Every rewrite preserves the source position of the form it replaces;
//! only synthesized assertions carry [`Span::DUMMY`].

use std::cell::Cell;

use rustc_hash::FxHashMap;

use vero_diagnostic::Diagnostic;
use vero_ir::{
    AssertKind, Expr, ExprKind, Id, MatchCase, Span, Type, ValDef,
};

use crate::ctx::ElabCtx;
use crate::effects::effect_level;
use crate::env::{dummy_heap_binding, Frame, RewriteEnv};
use crate::oracle::is_heap_class;
use crate::type_rewrite::rewrite_type;

/// Expression (and pattern) rewriter for one function extraction.
///
/// Holds the pass context plus a per-extraction counter for local binder
/// ids, so synthesized binders are deterministic per function regardless
/// of how functions are scheduled across workers.
pub struct Rewriter<'a> {
    pub(crate) ctx: &'a ElabCtx<'a>,
    next_local: Cell<u32>,
}

impl<'a> Rewriter<'a> {
    pub fn new(ctx: &'a ElabCtx<'a>) -> Self {
        Rewriter {
            ctx,
            next_local: Cell::new(0),
        }
    }

    /// Fresh local binder, unique within this extraction.
    pub(crate) fn fresh_local(&self, name: &str, ty: Type) -> ValDef {
        let n = self.next_local.get();
        self.next_local.set(n + 1);
        ValDef::new(Id::local(n), name, ty)
    }

    pub(crate) fn ty(&self, ty: &Type) -> Type {
        rewrite_type(self.ctx, ty)
    }

    /// The current heap binding, or the dummy placeholder after an error
    /// has already been reported for this site.
    pub(crate) fn heap_binding(&self, env: &RewriteEnv) -> ValDef {
        env.heap.clone().unwrap_or_else(dummy_heap_binding)
    }

    /// The reads frame, reporting if reading is forbidden here.
    pub(crate) fn expect_reads(&self, env: &RewriteEnv, usage: &str, span: Span) -> Frame {
        if env.reads.allows() {
            env.reads.clone()
        } else {
            self.ctx
                .reporter
                .report(Diagnostic::missing_reads_clause(usage, span));
            Frame::Unrestricted
        }
    }

    /// The modifies frame, reporting if writing is forbidden here. A
    /// read-only context gets the read-only message; a context with no
    /// frames at all gets the missing-clause message.
    pub(crate) fn expect_modifies(&self, env: &RewriteEnv, usage: &str, span: Span) -> Frame {
        if env.modifies.allows() {
            env.modifies.clone()
        } else {
            let diagnostic = if env.reads.allows() {
                Diagnostic::modify_in_read_only_context(span)
            } else {
                Diagnostic::missing_modifies_clause(usage, span)
            };
            self.ctx.reporter.report(diagnostic);
            Frame::Unrestricted
        }
    }

    /// The frame set as an expression: the bound variable, or the empty
    /// set when unrestricted.
    pub(crate) fn frame_set(&self, frame: &Frame, span: Span) -> Expr {
        match frame.bound() {
            Some(vd) => Expr::var(vd),
            None => Expr::empty_ref_set(span),
        }
    }

    /// Wrap `body` in a membership assertion against a restricted frame;
    /// pass `body` through untouched otherwise, or when frame checking is
    /// disabled.
    fn member_check(&self, frame: &Frame, kind: AssertKind, r: &ValDef, body: Expr) -> Expr {
        match frame.bound() {
            Some(set) if self.ctx.config.check_heap_contracts => Expr::assert(
                kind,
                Expr::element_of(Expr::var(r), Expr::var(set)),
                body,
            ),
            _ => body,
        }
    }

    fn is_heap_obj(&self, e: &Expr) -> bool {
        matches!(&e.ty, Type::Class(id, _) if is_heap_class(self.ctx, *id))
    }

    /// Class id and type arguments of a heap-resident receiver.
    ///
    /// The oracle only answers true for class types, so anything else
    /// here is a broken internal invariant.
    fn class_of(&self, obj: &Expr) -> (Id, Vec<Type>) {
        match &obj.ty {
            Type::Class(id, tps) => (*id, tps.clone()),
            other => panic!("heap elaboration: heap-resident receiver with non-class type {other:?}"),
        }
    }

    /// Rewrite one expression under `env`.
    pub fn rewrite(&self, e: &Expr, env: &RewriteEnv) -> Expr {
        match &e.kind {
            // Reference equality becomes plain equality on the refs.
            ExprKind::RefEq(a, b) => Expr::new(
                ExprKind::Equals(
                    Box::new(self.rewrite(a, env)),
                    Box::new(self.rewrite(b, env)),
                ),
                Type::Bool,
                e.span,
            ),

            // The object's identity is the ref's identity field.
            ExprKind::ObjectIdentity(obj) => Expr::new(
                ExprKind::AdtSelect {
                    expr: Box::new(self.rewrite(obj, env)),
                    ctor: Id::HEAP_REF_CTOR,
                    field: Id::REF_ID_FIELD,
                },
                Type::Int,
                e.span,
            ),

            ExprKind::ClassCons {
                class_id,
                tps,
                args,
            } if is_heap_class(self.ctx, *class_id) => {
                self.rewrite_alloc(e, *class_id, tps, args, env)
            }

            ExprKind::FieldGet { obj, field } if self.is_heap_obj(obj) => {
                self.rewrite_field_get(e, obj, *field, env)
            }

            ExprKind::FieldSet { obj, field, value } if self.is_heap_obj(obj) => {
                self.rewrite_field_set(e, obj, *field, value, env)
            }

            ExprKind::IsInstance {
                expr,
                class_id,
                tps,
            } if is_heap_class(self.ctx, *class_id) => {
                self.rewrite_is_instance(e, expr, *class_id, tps, env)
            }

            // A heap-class cast is a no-op on the ref; the dynamic-type
            // assumption re-enters at each field access.
            ExprKind::AsInstance { expr, class_id, .. }
                if is_heap_class(self.ctx, *class_id) =>
            {
                let mut rewritten = self.rewrite(expr, env);
                rewritten.span = e.span;
                rewritten
            }

            // Inside a postcondition, `old(e)` evaluates in the input
            // heap. Anywhere else it is a user error.
            ExprKind::Old(inner) => match &env.old_heap {
                Some(h0) => {
                    let mut pre_env = env.clone();
                    pre_env.heap = Some(h0.clone());
                    pre_env.old_heap = None;
                    self.rewrite(inner, &pre_env)
                }
                None => {
                    self.ctx
                        .reporter
                        .report(Diagnostic::cannot_use_heap_construct("old", e.span));
                    self.rewrite(inner, env)
                }
            },

            ExprKind::FunCall { id, tps, args } => self.rewrite_call(e, *id, tps, args, env),

            ExprKind::Match { scrutinee, cases } => {
                let cases = cases
                    .iter()
                    .map(|case| MatchCase {
                        pattern: self.rewrite_pattern(&case.pattern, env),
                        guard: case.guard.as_ref().map(|g| self.rewrite(g, env)),
                        rhs: self.rewrite(&case.rhs, env),
                    })
                    .collect();
                Expr::new(
                    ExprKind::Match {
                        scrutinee: Box::new(self.rewrite(scrutinee, env)),
                        cases,
                    },
                    self.ty(&e.ty),
                    e.span,
                )
            }

            // Everything else is structural recursion.
            _ => self.rewrite_structural(e, env),
        }
    }

    /// `new C(args)`: choose a fresh ref, store the constructed value,
    /// evaluate to the ref. Aliasing with existing refs is deliberately
    /// not ruled out here.
    fn rewrite_alloc(
        &self,
        e: &Expr,
        class_id: Id,
        tps: &[Type],
        args: &[Expr],
        env: &RewriteEnv,
    ) -> Expr {
        let _ = self.expect_modifies(env, "allocate a heap object", e.span);
        let heap = self.heap_binding(env);
        let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();
        let args: Vec<Expr> = args.iter().map(|a| self.rewrite(a, env)).collect();

        let fresh = self.fresh_local("ref", Type::heap_ref());
        let chosen = Expr::new(
            ExprKind::Choose {
                binder: self.fresh_local("ref", Type::heap_ref()),
                pred: Box::new(Expr::bool_lit(true, e.span)),
            },
            Type::heap_ref(),
            e.span,
        );
        let value = Expr::new(
            ExprKind::ClassCons {
                class_id,
                tps: tps.clone(),
                args,
            },
            Type::Class(class_id, tps),
            e.span,
        );
        let update = Expr::new(
            ExprKind::HeapUpdated {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&fresh)),
                value: Box::new(value),
            },
            Type::Heap,
            e.span,
        );
        let assign = Expr::new(
            ExprKind::Assign {
                target: heap.id,
                value: Box::new(update),
            },
            Type::Unit,
            e.span,
        );
        let body = Expr::new(
            ExprKind::Block(vec![assign, Expr::var(&fresh)]),
            Type::heap_ref(),
            e.span,
        );
        let mut out = Expr::let_in(fresh, chosen, body);
        out.span = e.span;
        out
    }

    /// `obj.f`: load from the heap, assume the stored value's class,
    /// project the field. Restricted reads assert membership first.
    fn rewrite_field_get(&self, e: &Expr, obj: &Expr, field: Id, env: &RewriteEnv) -> Expr {
        let reads = self.expect_reads(env, "read from heap object", e.span);
        let heap = self.heap_binding(env);
        let (class_id, tps) = self.class_of(obj);
        let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();

        let r = self.fresh_local("x", Type::heap_ref());
        let loaded = Expr::new(
            ExprKind::HeapGet {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&r)),
            },
            Type::Dyn,
            e.span,
        );
        let cast = Expr::new(
            ExprKind::AsInstance {
                expr: Box::new(loaded),
                class_id,
                tps: tps.clone(),
            },
            Type::Class(class_id, tps),
            e.span,
        );
        let select = Expr::new(
            ExprKind::FieldGet {
                obj: Box::new(cast),
                field,
            },
            self.ty(&e.ty),
            e.span,
        );
        let checked = self.member_check(&reads, AssertKind::RefInReads, &r, select);
        let mut out = Expr::let_in(r, self.rewrite(obj, env), checked);
        out.span = e.span;
        out
    }

    /// `obj.f = v`: rebuild the object with the field replaced and store
    /// it back. The membership assertion runs *after* the state update,
    /// so the effect is visible even when the assertion fails.
    fn rewrite_field_set(
        &self,
        e: &Expr,
        obj: &Expr,
        field: Id,
        value: &Expr,
        env: &RewriteEnv,
    ) -> Expr {
        let modifies = self.expect_modifies(env, "write to heap object", e.span);
        let heap = self.heap_binding(env);
        let (class_id, tps) = self.class_of(obj);
        let Some(class) = self.ctx.symbols.class(class_id) else {
            panic!("heap elaboration: write to unknown class {class_id:?}")
        };
        let subst: FxHashMap<Id, Type> = class
            .tparams
            .iter()
            .map(|tp| tp.id)
            .zip(tps.iter().cloned())
            .collect();
        let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();

        let r = self.fresh_local("x", Type::heap_ref());
        let v = self.fresh_local("v", self.ty(&value.ty));
        let cur = self.fresh_local("cur", Type::Class(class_id, tps.clone()));

        let rebuilt_args: Vec<Expr> = class
            .fields
            .iter()
            .map(|fld| {
                if fld.id == field {
                    Expr::var(&v)
                } else {
                    Expr::new(
                        ExprKind::FieldGet {
                            obj: Box::new(Expr::var(&cur)),
                            field: fld.id,
                        },
                        self.ty(&fld.ty.substituted(&subst)),
                        e.span,
                    )
                }
            })
            .collect();
        let rebuilt = Expr::new(
            ExprKind::ClassCons {
                class_id,
                tps: tps.clone(),
                args: rebuilt_args,
            },
            Type::Class(class_id, tps.clone()),
            e.span,
        );
        let update = Expr::new(
            ExprKind::HeapUpdated {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&r)),
                value: Box::new(rebuilt),
            },
            Type::Heap,
            e.span,
        );
        let assign = Expr::new(
            ExprKind::Assign {
                target: heap.id,
                value: Box::new(update),
            },
            Type::Unit,
            e.span,
        );
        let checked_unit = self.member_check(&modifies, AssertKind::RefInModifies, &r, Expr::unit());
        let seq = Expr::new(ExprKind::Block(vec![assign, checked_unit]), Type::Unit, e.span);

        let loaded = Expr::new(
            ExprKind::HeapGet {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&r)),
            },
            Type::Dyn,
            e.span,
        );
        let cur_value = Expr::new(
            ExprKind::AsInstance {
                expr: Box::new(loaded),
                class_id,
                tps,
            },
            cur.ty.clone(),
            e.span,
        );
        let mut out = Expr::let_in(
            r,
            self.rewrite(obj, env),
            Expr::let_in(v, self.rewrite(value, env), Expr::let_in(cur, cur_value, seq)),
        );
        out.span = e.span;
        out
    }

    /// `obj is C`: test the dynamic class of the stored value.
    fn rewrite_is_instance(
        &self,
        e: &Expr,
        obj: &Expr,
        class_id: Id,
        tps: &[Type],
        env: &RewriteEnv,
    ) -> Expr {
        let reads = self.expect_reads(env, "test the type of a heap object", e.span);
        let heap = self.heap_binding(env);
        let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();

        let r = self.fresh_local("x", Type::heap_ref());
        let loaded = Expr::new(
            ExprKind::HeapGet {
                heap: Box::new(Expr::var(&heap)),
                reference: Box::new(Expr::var(&r)),
            },
            Type::Dyn,
            e.span,
        );
        let test = Expr::new(
            ExprKind::IsInstance {
                expr: Box::new(loaded),
                class_id,
                tps,
            },
            Type::Bool,
            e.span,
        );
        let checked = self.member_check(&reads, AssertKind::RefInReads, &r, test);
        let mut out = Expr::let_in(r, self.rewrite(obj, env), checked);
        out.span = e.span;
        out
    }

    /// Calls: pure callees keep their target; effectful callees go
    /// through the shim with the heap and current frame sets prepended.
    fn rewrite_call(
        &self,
        e: &Expr,
        id: Id,
        tps: &[Type],
        args: &[Expr],
        env: &RewriteEnv,
    ) -> Expr {
        let level = effect_level(self.ctx, id);
        let tps: Vec<Type> = tps.iter().map(|t| self.ty(t)).collect();
        let args: Vec<Expr> = args.iter().map(|a| self.rewrite(a, env)).collect();
        let ret_ty = self.ty(&e.ty);

        if !level.is_effectful() {
            return Expr::new(ExprKind::FunCall { id, tps, args }, ret_ty, e.span);
        }

        let reads = self.expect_reads(env, "call a heap-reading function", e.span);
        let heap = self.heap_binding(env);
        let shim = self.ctx.shim_of(id);

        let mut full_args = vec![Expr::var(&heap), self.frame_set(&reads, e.span)];
        if level.writes() {
            let modifies = self.expect_modifies(env, "call a heap-modifying function", e.span);
            full_args.push(self.frame_set(&modifies, e.span));
        }
        full_args.extend(args);

        if !level.writes() {
            return Expr::new(
                ExprKind::FunCall {
                    id: shim,
                    tps,
                    args: full_args,
                },
                ret_ty,
                e.span,
            );
        }

        // Writing callee: bind the (result, heap') pair, thread the new
        // heap into the local heap variable, evaluate to the result.
        let res = self.fresh_local("res", ret_ty.clone().with_heap());
        let call = Expr::new(
            ExprKind::FunCall {
                id: shim,
                tps,
                args: full_args,
            },
            res.ty.clone(),
            e.span,
        );
        let assign = Expr::new(
            ExprKind::Assign {
                target: heap.id,
                value: Box::new(Expr::tuple_select(Expr::var(&res), 2, Type::Heap)),
            },
            Type::Unit,
            e.span,
        );
        let value = Expr::tuple_select(Expr::var(&res), 1, ret_ty.clone());
        let body = Expr::new(ExprKind::Block(vec![assign, value]), ret_ty, e.span);
        let mut out = Expr::let_in(res, call, body);
        out.span = e.span;
        out
    }

    /// Default: rewrite every child and every embedded type.
    fn rewrite_structural(&self, e: &Expr, env: &RewriteEnv) -> Expr {
        let ty = self.ty(&e.ty);
        let kind = match &e.kind {
            ExprKind::IntLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::UnitLit
            | ExprKind::Var(_)
            | ExprKind::Error => e.kind.clone(),

            ExprKind::Let {
                binder,
                value,
                body,
            } => ExprKind::Let {
                binder: binder.with_ty(self.ty(&binder.ty)),
                value: Box::new(self.rewrite(value, env)),
                body: Box::new(self.rewrite(body, env)),
            },
            ExprKind::LetVar {
                binder,
                value,
                body,
            } => ExprKind::LetVar {
                binder: binder.with_ty(self.ty(&binder.ty)),
                value: Box::new(self.rewrite(value, env)),
                body: Box::new(self.rewrite(body, env)),
            },
            ExprKind::Assign { target, value } => ExprKind::Assign {
                target: *target,
                value: Box::new(self.rewrite(value, env)),
            },
            ExprKind::Block(exprs) => {
                ExprKind::Block(exprs.iter().map(|x| self.rewrite(x, env)).collect())
            }
            ExprKind::IfExpr {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::IfExpr {
                cond: Box::new(self.rewrite(cond, env)),
                then_branch: Box::new(self.rewrite(then_branch, env)),
                else_branch: Box::new(self.rewrite(else_branch, env)),
            },
            ExprKind::BinOp { op, lhs, rhs } => ExprKind::BinOp {
                op: *op,
                lhs: Box::new(self.rewrite(lhs, env)),
                rhs: Box::new(self.rewrite(rhs, env)),
            },
            ExprKind::Not(inner) => ExprKind::Not(Box::new(self.rewrite(inner, env))),
            ExprKind::Equals(lhs, rhs) => ExprKind::Equals(
                Box::new(self.rewrite(lhs, env)),
                Box::new(self.rewrite(rhs, env)),
            ),
            ExprKind::ClassCons {
                class_id,
                tps,
                args,
            } => ExprKind::ClassCons {
                class_id: *class_id,
                tps: tps.iter().map(|t| self.ty(t)).collect(),
                args: args.iter().map(|a| self.rewrite(a, env)).collect(),
            },
            ExprKind::FieldGet { obj, field } => ExprKind::FieldGet {
                obj: Box::new(self.rewrite(obj, env)),
                field: *field,
            },
            ExprKind::FieldSet { obj, field, value } => ExprKind::FieldSet {
                obj: Box::new(self.rewrite(obj, env)),
                field: *field,
                value: Box::new(self.rewrite(value, env)),
            },
            ExprKind::IsInstance {
                expr,
                class_id,
                tps,
            } => ExprKind::IsInstance {
                expr: Box::new(self.rewrite(expr, env)),
                class_id: *class_id,
                tps: tps.iter().map(|t| self.ty(t)).collect(),
            },
            ExprKind::AsInstance {
                expr,
                class_id,
                tps,
            } => ExprKind::AsInstance {
                expr: Box::new(self.rewrite(expr, env)),
                class_id: *class_id,
                tps: tps.iter().map(|t| self.ty(t)).collect(),
            },
            ExprKind::Tuple(elems) => {
                ExprKind::Tuple(elems.iter().map(|x| self.rewrite(x, env)).collect())
            }
            ExprKind::TupleSelect { tuple, index } => ExprKind::TupleSelect {
                tuple: Box::new(self.rewrite(tuple, env)),
                index: *index,
            },
            ExprKind::FiniteSet { elems, elem_ty } => ExprKind::FiniteSet {
                elems: elems.iter().map(|x| self.rewrite(x, env)).collect(),
                elem_ty: self.ty(elem_ty),
            },
            ExprKind::ElementOf { elem, set } => ExprKind::ElementOf {
                elem: Box::new(self.rewrite(elem, env)),
                set: Box::new(self.rewrite(set, env)),
            },
            ExprKind::SubsetOf { lhs, rhs } => ExprKind::SubsetOf {
                lhs: Box::new(self.rewrite(lhs, env)),
                rhs: Box::new(self.rewrite(rhs, env)),
            },
            ExprKind::Adt { ctor, tps, args } => ExprKind::Adt {
                ctor: *ctor,
                tps: tps.iter().map(|t| self.ty(t)).collect(),
                args: args.iter().map(|a| self.rewrite(a, env)).collect(),
            },
            ExprKind::AdtSelect { expr, ctor, field } => ExprKind::AdtSelect {
                expr: Box::new(self.rewrite(expr, env)),
                ctor: *ctor,
                field: *field,
            },
            ExprKind::Assert { kind, pred, body } => ExprKind::Assert {
                kind: *kind,
                pred: Box::new(self.rewrite(pred, env)),
                body: Box::new(self.rewrite(body, env)),
            },
            ExprKind::Assume { pred, body } => ExprKind::Assume {
                pred: Box::new(self.rewrite(pred, env)),
                body: Box::new(self.rewrite(body, env)),
            },
            ExprKind::Choose { binder, pred } => ExprKind::Choose {
                binder: binder.with_ty(self.ty(&binder.ty)),
                pred: Box::new(self.rewrite(pred, env)),
            },
            ExprKind::HeapGet { heap, reference } => ExprKind::HeapGet {
                heap: Box::new(self.rewrite(heap, env)),
                reference: Box::new(self.rewrite(reference, env)),
            },
            ExprKind::HeapUpdated {
                heap,
                reference,
                value,
            } => ExprKind::HeapUpdated {
                heap: Box::new(self.rewrite(heap, env)),
                reference: Box::new(self.rewrite(reference, env)),
                value: Box::new(self.rewrite(value, env)),
            },
            ExprKind::HeapMerge { mask, lhs, rhs } => ExprKind::HeapMerge {
                mask: Box::new(self.rewrite(mask, env)),
                lhs: Box::new(self.rewrite(lhs, env)),
                rhs: Box::new(self.rewrite(rhs, env)),
            },

            // Handled before structural recursion.
            ExprKind::RefEq(..)
            | ExprKind::ObjectIdentity(_)
            | ExprKind::Old(_)
            | ExprKind::FunCall { .. }
            | ExprKind::Match { .. } => {
                panic!("heap elaboration: non-structural form reached structural recursion")
            }
        };
        Expr::new(kind, ty, e.span)
    }
}

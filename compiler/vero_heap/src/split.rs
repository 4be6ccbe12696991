//! Function splitting.
//!
//! Every effectful function becomes two output functions:
//!
//! - the **inner**, which takes the heap as an explicit leading parameter
//!   (and returns a `(result, heap)` pair if it writes), with the
//!   translated frame sets let-bound around its rewritten body; and
//! - the **shim**, the externally visible entry, which checks the
//!   callee's frames against the caller-supplied domains, runs the inner
//!   on the heap restricted to the reads set, and merges written
//!   locations back into the caller's heap.
//!
//! Pure functions pass through with types and body rewritten.

use vero_ir::{
    AssertKind, Ensures, Expr, ExprKind, FunDef, FunFlags, FunSpec, Id, Span, Type, ValDef,
};

use crate::ctx::ElabCtx;
use crate::effects::{effect_level, EffectLevel};
use crate::env::{Frame, RewriteEnv};
use crate::rewrite::Rewriter;
use crate::type_rewrite::{rewrite_type, rewrite_valdef};

/// Produce the output function(s) for `f`: one for pure functions, the
/// inner/shim pair for effectful ones. Reference-equality builtins
/// produce nothing.
pub fn extract_function(ctx: &ElabCtx<'_>, f: &FunDef) -> Vec<FunDef> {
    if f.flags.contains(FunFlags::REF_EQ) {
        return Vec::new();
    }
    let level = effect_level(ctx, f.id);
    tracing::trace!(function = %f.name, ?level, "extracting function");
    match level {
        EffectLevel::Pure => vec![extract_pure(ctx, f)],
        EffectLevel::Reads | EffectLevel::ReadsWrites => {
            let splitter = Splitter::new(ctx, f, level.writes());
            vec![splitter.inner(), splitter.shim()]
        }
    }
}

fn extract_pure(ctx: &ElabCtx<'_>, f: &FunDef) -> FunDef {
    let rw = Rewriter::new(ctx);
    let env = RewriteEnv::pure();
    FunDef {
        id: f.id,
        name: f.name.clone(),
        tparams: f.tparams.clone(),
        params: f.params.iter().map(|p| rewrite_valdef(ctx, p)).collect(),
        return_ty: rewrite_type(ctx, &f.return_ty),
        body: rw.rewrite(&f.body, &env),
        spec: FunSpec {
            reads: None,
            modifies: None,
            requires: f.spec.requires.iter().map(|r| rw.rewrite(r, &env)).collect(),
            ensures: f.spec.ensures.as_ref().map(|ens| Ensures {
                binder: rewrite_valdef(ctx, &ens.binder),
                pred: rw.rewrite(&ens.pred, &env),
            }),
            decreases: f.spec.decreases.as_ref().map(|d| rw.rewrite(d, &env)),
        },
        flags: f.flags,
        unapply_info: f.unapply_info.clone(),
        span: f.span,
    }
}

/// Shared state for building one inner/shim pair.
struct Splitter<'a> {
    ctx: &'a ElabCtx<'a>,
    f: &'a FunDef,
    writes: bool,
    rw: Rewriter<'a>,
    /// The inner's heap parameter (the pre-state heap).
    heap0: ValDef,
    /// The let-bound translated reads set.
    reads: ValDef,
    /// The let-bound translated modifies set (writes only).
    modifies: ValDef,
    /// Rewritten result type of the original function.
    result_ty: Type,
}

impl<'a> Splitter<'a> {
    fn new(ctx: &'a ElabCtx<'a>, f: &'a FunDef, writes: bool) -> Self {
        let rw = Rewriter::new(ctx);
        let heap0 = rw.fresh_local("heap0", Type::Heap);
        let reads = rw.fresh_local("reads", Type::ref_set());
        let modifies = rw.fresh_local("modifies", Type::ref_set());
        let result_ty = rewrite_type(ctx, &f.return_ty);
        Splitter {
            ctx,
            f,
            writes,
            rw,
            heap0,
            reads,
            modifies,
            result_ty,
        }
    }

    fn real_params(&self) -> Vec<ValDef> {
        self.f
            .params
            .iter()
            .map(|p| rewrite_valdef(self.ctx, p))
            .collect()
    }

    /// The reads clause translated with all reads allowed, in `heap`.
    /// Translating the clause under its own restriction would bootstrap;
    /// the restricted copy is inserted separately for VC purposes.
    fn reads_clause_in(&self, heap: &ValDef) -> Expr {
        match &self.f.spec.reads {
            Some(r) => self
                .rw
                .rewrite(r, &RewriteEnv::allow_all_reads(heap.clone())),
            // A modifies clause without a reads clause: the empty reads
            // set makes the `modifies ⊆ reads` assertion surface the
            // inconsistency downstream.
            None => Expr::empty_ref_set(self.f.span),
        }
    }

    fn modifies_clause_in(&self, env: &RewriteEnv) -> Expr {
        match &self.f.spec.modifies {
            Some(m) => self.rw.rewrite(m, env),
            None => Expr::empty_ref_set(self.f.span),
        }
    }

    /// Specification environment of the inner: pre-state heap, reads
    /// restricted to the bound set, no modifies visible.
    fn spec_env(&self) -> RewriteEnv {
        RewriteEnv::spec(self.heap0.clone(), Frame::Bound(self.reads.clone()))
    }

    /// Bind the translated reads set around a rewritten clause so the
    /// clause is self-contained.
    fn self_contained(&self, clause: Expr) -> Expr {
        Expr::let_in(self.reads.clone(), self.reads_clause_in(&self.heap0), clause)
    }

    fn assert_if_checked(&self, kind: AssertKind, pred: Expr, body: Expr) -> Expr {
        if self.ctx.config.check_heap_contracts {
            Expr::assert(kind, pred, body)
        } else {
            body
        }
    }

    /// Build the inner function.
    fn inner(&self) -> FunDef {
        let spec_env = self.spec_env();

        let mut params = vec![self.heap0.clone()];
        params.extend(self.real_params());

        let return_ty = if self.writes {
            self.result_ty.clone().with_heap()
        } else {
            self.result_ty.clone()
        };

        let core = if self.writes {
            // let var heap = heap0 in (body, heap)
            let heap = self.rw.fresh_local("heap", Type::Heap);
            let env = RewriteEnv::body(
                heap.clone(),
                Frame::Bound(self.reads.clone()),
                Frame::Bound(self.modifies.clone()),
            );
            let body = self.rw.rewrite(&self.f.body, &env);
            let span = body.span;
            let pair = Expr::tuple(vec![body, Expr::var(&heap)], span);
            let with_heap = Expr::let_var_in(heap, Expr::var(&self.heap0), pair);
            self.assert_if_checked(
                AssertKind::ModifiesInReads,
                Expr::subset_of(Expr::var(&self.modifies), Expr::var(&self.reads)),
                with_heap,
            )
        } else {
            let env = RewriteEnv::body(
                self.heap0.clone(),
                Frame::Bound(self.reads.clone()),
                Frame::Forbidden,
            );
            self.rw.rewrite(&self.f.body, &env)
        };

        // A second, restricted copy of the reads expression goes into the
        // body so the clause itself is subject to the shim's
        // `reads ⊆ readsDom` check.
        let core = match &self.f.spec.reads {
            Some(r) => {
                let reads_check = self.rw.fresh_local("readsCheck", Type::ref_set());
                Expr::let_in(reads_check, self.rw.rewrite(r, &spec_env), core)
            }
            None => core,
        };

        let body = if self.writes {
            let with_modifies = Expr::let_in(
                self.modifies.clone(),
                self.modifies_clause_in(&spec_env),
                core,
            );
            self.self_contained(with_modifies)
        } else {
            self.self_contained(core)
        };

        FunDef {
            id: self.f.id,
            name: self.f.name.clone(),
            tparams: self.f.tparams.clone(),
            params,
            return_ty,
            body,
            spec: self.inner_spec(),
            flags: self.f.flags,
            unapply_info: self.f.unapply_info.clone(),
            span: self.f.span,
        }
    }

    /// Rewritten specification of the inner. The frame clauses are
    /// consumed (they live on as let-bound sets); `requires` and
    /// `decreases` translate under the spec environment; the
    /// postcondition splits pre- and post-state heaps.
    fn inner_spec(&self) -> FunSpec {
        let spec_env = self.spec_env();
        let requires = self
            .f
            .spec
            .requires
            .iter()
            .map(|r| self.self_contained(self.rw.rewrite(r, &spec_env)))
            .collect();
        let decreases = self
            .f
            .spec
            .decreases
            .as_ref()
            .map(|d| self.self_contained(self.rw.rewrite(d, &spec_env)));
        let ensures = self.f.spec.ensures.as_ref().map(|ens| self.inner_ensures(ens));
        FunSpec {
            reads: None,
            modifies: None,
            requires,
            ensures,
            decreases,
        }
    }

    /// The rewritten postcondition. `old(e)` sub-expressions evaluate in
    /// the input heap; everything else in the output heap (which is the
    /// input heap again for read-only functions).
    fn inner_ensures(&self, ens: &Ensures) -> Ensures {
        if !self.writes {
            let env = self.spec_env().with_old_heap(self.heap0.clone());
            let binder = rewrite_valdef(self.ctx, &ens.binder);
            return Ensures {
                binder,
                pred: self.self_contained(self.rw.rewrite(&ens.pred, &env)),
            };
        }

        // Writing function: the result binder becomes the (value, heap)
        // pair; the original binder is re-bound to the value component
        // and a fresh binder to the post-state heap.
        let pair = self
            .rw
            .fresh_local("res", self.result_ty.clone().with_heap());
        let heap1 = self.rw.fresh_local("heap1", Type::Heap);
        let value_binder = rewrite_valdef(self.ctx, &ens.binder);

        let env = RewriteEnv::spec(heap1.clone(), Frame::Bound(self.reads.clone()))
            .with_old_heap(self.heap0.clone());
        let rewritten = self.self_contained(self.rw.rewrite(&ens.pred, &env));

        let pred = Expr::let_in(
            value_binder,
            Expr::tuple_select(Expr::var(&pair), 1, self.result_ty.clone()),
            Expr::let_in(
                heap1,
                Expr::tuple_select(Expr::var(&pair), 2, Type::Heap),
                rewritten,
            ),
        );
        Ensures { binder: pair, pred }
    }

    /// Build the shim.
    fn shim(&self) -> FunDef {
        let heap = self.rw.fresh_local("heap", Type::Heap);
        let reads_dom = self.rw.fresh_local("readsDom", Type::ref_set());
        let modifies_dom = self.rw.fresh_local("modifiesDom", Type::ref_set());
        let real_params = self.real_params();

        let mut params = vec![heap.clone(), reads_dom.clone()];
        if self.writes {
            params.push(modifies_dom.clone());
        }
        params.extend(real_params.iter().cloned());

        let return_ty = if self.writes {
            self.result_ty.clone().with_heap()
        } else {
            self.result_ty.clone()
        };

        let targs: Vec<Type> = self
            .f
            .tparams
            .iter()
            .map(|tp| Type::TypeParam(tp.id))
            .collect();
        let dummy_heap = Expr::new(
            ExprKind::FunCall {
                id: Id::DUMMY_HEAP,
                tps: Vec::new(),
                args: Vec::new(),
            },
            Type::Heap,
            Span::DUMMY,
        );

        // let heapIn = mapMerge(reads, heap, dummyHeap)
        let heap_in = self.rw.fresh_local("heapIn", Type::Heap);
        let restricted = Expr::new(
            ExprKind::HeapMerge {
                mask: Box::new(Expr::var(&self.reads)),
                lhs: Box::new(Expr::var(&heap)),
                rhs: Box::new(dummy_heap),
            },
            Type::Heap,
            Span::DUMMY,
        );

        // The inner call carries no position; the inliner stamps the
        // call site later.
        let mut inner_args = vec![Expr::var(&heap_in)];
        inner_args.extend(real_params.iter().map(Expr::var));
        let inner_ret = if self.writes {
            self.result_ty.clone().with_heap()
        } else {
            self.result_ty.clone()
        };
        let inner_call = Expr::new(
            ExprKind::FunCall {
                id: self.f.id,
                tps: targs,
                args: inner_args,
            },
            inner_ret,
            Span::DUMMY,
        );

        let core = if self.writes {
            let res = self
                .rw
                .fresh_local("res", self.result_ty.clone().with_heap());
            let merged_out = Expr::new(
                ExprKind::HeapMerge {
                    mask: Box::new(Expr::var(&self.modifies)),
                    lhs: Box::new(Expr::tuple_select(Expr::var(&res), 2, Type::Heap)),
                    rhs: Box::new(Expr::var(&heap)),
                },
                Type::Heap,
                Span::DUMMY,
            );
            let pair = Expr::tuple(
                vec![
                    Expr::tuple_select(Expr::var(&res), 1, self.result_ty.clone()),
                    merged_out,
                ],
                Span::DUMMY,
            );
            Expr::let_in(res, inner_call, pair)
        } else {
            inner_call
        };
        let core = Expr::let_in(heap_in, restricted, core);

        let core = if self.writes {
            self.assert_if_checked(
                AssertKind::ModifiesInDomain,
                Expr::subset_of(Expr::var(&self.modifies), Expr::var(&modifies_dom)),
                core,
            )
        } else {
            core
        };
        let core = self.assert_if_checked(
            AssertKind::ReadsInDomain,
            Expr::subset_of(Expr::var(&self.reads), Expr::var(&reads_dom)),
            core,
        );

        let shim_env = RewriteEnv::allow_all_reads(heap.clone());
        let body = if self.writes {
            let with_modifies = Expr::let_in(
                self.modifies.clone(),
                self.modifies_clause_in(&shim_env),
                core,
            );
            Expr::let_in(
                self.reads.clone(),
                self.reads_clause_in(&heap),
                with_modifies,
            )
        } else {
            Expr::let_in(self.reads.clone(), self.reads_clause_in(&heap), core)
        };

        FunDef {
            id: self.ctx.shim_of(self.f.id),
            name: format!("{}__shim", self.f.name),
            tparams: self.f.tparams.clone(),
            params,
            return_ty,
            body,
            spec: FunSpec::pure(),
            flags: FunFlags::SYNTHETIC
                | FunFlags::DROP_VCS
                | FunFlags::INLINE_ONCE
                | self.f.flags,
            unapply_info: None,
            span: Span::DUMMY,
        }
    }
}

#[cfg(test)]
mod tests;

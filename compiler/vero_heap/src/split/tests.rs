use pretty_assertions::assert_eq;

use vero_ir::{
    AssertKind, Ensures, Expr, ExprKind, FunDef, FunFlags, FunSpec, Id, Span, Type, ValDef,
};

use crate::test_helpers::{
    any_expr, any_type, bump_fun, class_c_symbols, fun, get_v, peek_fun, uid, Fixture,
};
use crate::ElabConfig;

use super::extract_function;

fn id_fun() -> FunDef {
    let x = ValDef::new(uid(21), "x", Type::Int);
    fun(20, "id", vec![x.clone()], Type::Int, Expr::var(&x), FunSpec::pure())
}

/// `bump` with `ensuring(res => c.v == old(c.v) + 1)`.
fn bump_with_ensures() -> FunDef {
    let mut f = bump_fun(20);
    let c = f.params[0].clone();
    let post_read = get_v(&c);
    let pre_read = Expr::new(
        ExprKind::Old(Box::new(get_v(&c))),
        Type::Int,
        Span::DUMMY,
    );
    let incremented = Expr::new(
        ExprKind::BinOp {
            op: vero_ir::BinOpKind::Add,
            lhs: Box::new(pre_read),
            rhs: Box::new(Expr::int_lit(1, Span::DUMMY)),
        },
        Type::Int,
        Span::DUMMY,
    );
    let pred = Expr::new(
        ExprKind::Equals(Box::new(post_read), Box::new(incremented)),
        Type::Bool,
        Span::DUMMY,
    );
    f.spec.ensures = Some(Ensures {
        binder: ValDef::new(uid(12), "res", Type::Unit),
        pred,
    });
    f
}

// ── Pure functions ──────────────────────────────────────────────

#[test]
fn pure_functions_pass_through_unsplit() {
    let f = id_fun();
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, f.id);
    assert_eq!(out[0].params.len(), 1);
    assert_eq!(out[0].params[0].ty, Type::Int);
    assert!(!any_type(&out[0], |t| t.is_heap_ref()));
    assert!(!any_type(&out[0], |t| *t == Type::Heap));
}

#[test]
fn ref_eq_builtins_are_dropped() {
    let mut f = id_fun();
    f.flags |= FunFlags::REF_EQ;
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    assert!(extract_function(&ctx, &f).is_empty());
}

// ── Read-only functions ─────────────────────────────────────────

#[test]
fn reads_function_splits_into_inner_and_shim() {
    let f = peek_fun(20);
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    assert_eq!(out.len(), 2);

    let inner = &out[0];
    assert_eq!(inner.id, f.id);
    assert_eq!(inner.name, "peek");
    // One extra leading Heap parameter; the real parameter is now a ref.
    assert_eq!(inner.params.len(), 2);
    assert_eq!(inner.params[0].ty, Type::Heap);
    assert_eq!(inner.params[1].ty, Type::heap_ref());
    assert_eq!(inner.return_ty, Type::Int);
    // The frame clauses are consumed.
    assert!(inner.spec.reads.is_none());
    assert!(inner.spec.modifies.is_none());

    let shim = &out[1];
    assert_eq!(shim.name, "peek__shim");
    assert!(shim.id != inner.id);
    assert_eq!(shim.params.len(), 3);
    assert_eq!(shim.params[0].ty, Type::Heap);
    assert_eq!(shim.params[1].ty, Type::ref_set());
    assert_eq!(shim.params[2].ty, Type::heap_ref());
    assert_eq!(shim.return_ty, Type::Int);
    assert!(shim
        .flags
        .contains(FunFlags::SYNTHETIC | FunFlags::DROP_VCS | FunFlags::INLINE_ONCE));
}

#[test]
fn inner_body_reads_through_the_heap_parameter() {
    let f = peek_fun(20);
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let inner = &out[0];
    let heap0 = inner.params[0].id;

    // let reads = Set(c) in let readsCheck = ... in <body>
    let ExprKind::Let { binder, body, .. } = &inner.body.kind else {
        panic!("expected reads binding, got {:?}", inner.body.kind)
    };
    assert_eq!(binder.name, "reads");
    assert!(matches!(&body.kind, ExprKind::Let { binder, .. } if binder.name == "readsCheck"));

    // The field read loads from heap0 and asserts membership.
    assert!(any_expr(inner, |e| {
        matches!(&e.kind, ExprKind::HeapGet { heap, .. }
            if matches!(&heap.kind, ExprKind::Var(v) if *v == heap0))
    }));
    assert!(any_expr(inner, |e| {
        matches!(
            &e.kind,
            ExprKind::Assert {
                kind: AssertKind::RefInReads,
                ..
            }
        )
    }));
}

#[test]
fn shim_checks_the_reads_domain_and_restricts_the_heap() {
    let f = peek_fun(20);
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let shim = &out[1];
    let reads_dom = shim.params[1].id;

    // assert reads ⊆ readsDom
    assert!(any_expr(shim, |e| {
        if let ExprKind::Assert {
            kind: AssertKind::ReadsInDomain,
            pred,
            ..
        } = &e.kind
        {
            matches!(&pred.kind, ExprKind::SubsetOf { rhs, .. }
                if matches!(&rhs.kind, ExprKind::Var(v) if *v == reads_dom))
        } else {
            false
        }
    }));

    // let heapIn = mapMerge(reads, heap, dummyHeap()) in peek(heapIn, c)
    assert!(any_expr(shim, |e| {
        if let ExprKind::HeapMerge { rhs, .. } = &e.kind {
            matches!(&rhs.kind, ExprKind::FunCall { id, .. } if *id == Id::DUMMY_HEAP)
        } else {
            false
        }
    }));
    assert!(any_expr(shim, |e| {
        matches!(&e.kind, ExprKind::FunCall { id, .. } if *id == f.id)
    }));
}

// ── Writing functions ───────────────────────────────────────────

#[test]
fn writing_function_returns_the_result_heap_pair() {
    let f = bump_fun(20);
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let inner = &out[0];
    assert_eq!(inner.params.len(), 2);
    assert_eq!(inner.params[0].ty, Type::Heap);
    assert_eq!(inner.return_ty, Type::Tuple(vec![Type::Unit, Type::Heap]));

    // A locally mutable heap seeded from the heap parameter.
    assert!(any_expr(inner, |e| {
        matches!(&e.kind, ExprKind::LetVar { binder, value, .. }
            if binder.name == "heap"
                && matches!(&value.kind, ExprKind::Var(v) if *v == inner.params[0].id))
    }));
    // modifies ⊆ reads at body entry.
    assert!(any_expr(inner, |e| {
        matches!(
            &e.kind,
            ExprKind::Assert {
                kind: AssertKind::ModifiesInReads,
                ..
            }
        )
    }));

    let shim = &out[1];
    assert_eq!(shim.name, "bump__shim");
    // heap, readsDom, modifiesDom, then the real parameter.
    assert_eq!(shim.params.len(), 4);
    assert_eq!(shim.params[1].ty, Type::ref_set());
    assert_eq!(shim.params[2].ty, Type::ref_set());
    assert_eq!(shim.return_ty, Type::Tuple(vec![Type::Unit, Type::Heap]));

    assert!(any_expr(shim, |e| {
        matches!(
            &e.kind,
            ExprKind::Assert {
                kind: AssertKind::ModifiesInDomain,
                ..
            }
        )
    }));
    // Output heap: mapMerge(modifies, heapOut, heap) in the result pair.
    assert!(any_expr(shim, |e| {
        if let ExprKind::Tuple(elems) = &e.kind {
            elems.len() == 2 && matches!(&elems[1].kind, ExprKind::HeapMerge { .. })
        } else {
            false
        }
    }));
}

// ── Postconditions ──────────────────────────────────────────────

#[test]
fn postcondition_splits_pre_and_post_state() {
    let f = bump_with_ensures();
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let inner = &out[0];
    let heap0 = inner.params[0].id;

    let Some(ens) = &inner.spec.ensures else {
        panic!("postcondition must survive")
    };
    // The binder now carries the (value, heap) pair.
    assert_eq!(ens.binder.ty, Type::Tuple(vec![Type::Unit, Type::Heap]));

    // The pred re-binds the value component and a post-state heap.
    let ExprKind::Let { binder, body, .. } = &ens.pred.kind else {
        panic!("expected value binding, got {:?}", ens.pred.kind)
    };
    assert_eq!(binder.ty, Type::Unit);
    let ExprKind::Let { binder: heap1, .. } = &body.kind else {
        panic!("expected heap1 binding, got {:?}", body.kind)
    };
    assert_eq!(heap1.ty, Type::Heap);
    assert_eq!(heap1.name, "heap1");

    // One load from the pre-state heap (the old(...) operand), one from
    // the post-state heap.
    let mut pre = 0;
    let mut post = 0;
    ens.pred.walk(&mut |e| {
        if let ExprKind::HeapGet { heap, .. } = &e.kind {
            match &heap.kind {
                ExprKind::Var(v) if *v == heap0 => pre += 1,
                ExprKind::Var(v) if *v == heap1.id => post += 1,
                _ => {}
            }
        }
    });
    assert_eq!((pre, post), (1, 1));
}

#[test]
fn read_only_postcondition_keeps_both_states_in_the_input_heap() {
    let mut f = peek_fun(20);
    let c = f.params[0].clone();
    f.spec.ensures = Some(Ensures {
        binder: ValDef::new(uid(12), "res", Type::Int),
        pred: Expr::new(
            ExprKind::Equals(
                Box::new(get_v(&c)),
                Box::new(Expr::new(
                    ExprKind::Old(Box::new(get_v(&c))),
                    Type::Int,
                    Span::DUMMY,
                )),
            ),
            Type::Bool,
            Span::DUMMY,
        ),
    });
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let inner = &out[0];
    let heap0 = inner.params[0].id;
    let Some(ens) = &inner.spec.ensures else {
        panic!("postcondition must survive")
    };
    assert_eq!(ens.binder.ty, Type::Int);

    let mut loads_from_heap0 = 0;
    ens.pred.walk(&mut |e| {
        if let ExprKind::HeapGet { heap, .. } = &e.kind {
            if matches!(&heap.kind, ExprKind::Var(v) if *v == heap0) {
                loads_from_heap0 += 1;
            }
        }
    });
    assert_eq!(loads_from_heap0, 2);
}

// ── Specs and configuration ─────────────────────────────────────

#[test]
fn requires_clauses_are_self_contained() {
    let mut f = peek_fun(20);
    let c = f.params[0].clone();
    f.spec.requires = vec![Expr::new(
        ExprKind::Equals(Box::new(get_v(&c)), Box::new(Expr::int_lit(0, Span::DUMMY))),
        Type::Bool,
        Span::DUMMY,
    )];
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let inner = &out[0];
    assert_eq!(inner.spec.requires.len(), 1);
    // Each clause re-binds the translated reads set it mentions.
    assert!(matches!(
        &inner.spec.requires[0].kind,
        ExprKind::Let { binder, .. } if binder.name == "reads"
    ));
}

#[test]
fn disabled_contracts_drop_every_assertion() {
    let f = bump_with_ensures();
    let fixture = Fixture::with_config(
        class_c_symbols().with_function(f.clone()),
        ElabConfig {
            check_heap_contracts: false,
        },
    );
    let ctx = fixture.ctx();

    for def in extract_function(&ctx, &f) {
        assert!(
            !any_expr(&def, |e| matches!(e.kind, ExprKind::Assert { .. })),
            "no assertions expected in {}",
            def.name
        );
    }
}

#[test]
fn shims_carry_no_spec_clauses() {
    let f = bump_with_ensures();
    let fixture = Fixture::new(class_c_symbols().with_function(f.clone()));
    let ctx = fixture.ctx();

    let out = extract_function(&ctx, &f);
    let shim = &out[1];
    assert_eq!(shim.spec, FunSpec::pure());
    assert_eq!(shim.span, Span::DUMMY);
}

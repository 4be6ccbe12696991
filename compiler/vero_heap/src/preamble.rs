//! Preamble injection and output-table finalization.
//!
//! Strips the definitions the elaboration consumes (the heap-marker
//! class and reference-equality builtins) and adds the shared support
//! definitions its output refers to: the `HeapRef` sort, the `dummyHeap`
//! constant, and the `Option` sort with its helper functions.

use vero_ir::{
    ClassFlags, ConstructorDef, Expr, ExprKind, FunDef, FunFlags, FunSpec, Id, MatchCase,
    Pattern, PatternKind, SortDef, Span, Symbols, Type, TypeParamDef, ValDef,
};

/// Finalize the output table: drop marker/ref-eq definitions, inject the
/// support preamble.
pub fn finalize(mut symbols: Symbols) -> Symbols {
    symbols
        .classes
        .retain(|_, c| !c.flags.contains(ClassFlags::ANY_HEAP_REF));
    symbols
        .functions
        .retain(|_, f| !f.flags.contains(FunFlags::REF_EQ));

    symbols.sorts.insert(Id::HEAP_REF, heap_ref_sort());
    symbols.sorts.insert(Id::OPTION, option_sort());
    symbols.functions.insert(Id::DUMMY_HEAP, dummy_heap());
    symbols.functions.insert(Id::OPTION_IS_EMPTY, option_is_empty());
    symbols.functions.insert(Id::OPTION_GET, option_get());
    symbols
}

/// The opaque reference sort: a single constructor with one identity
/// field.
fn heap_ref_sort() -> SortDef {
    SortDef {
        id: Id::HEAP_REF,
        name: "HeapRef".to_string(),
        tparams: Vec::new(),
        constructors: vec![ConstructorDef {
            id: Id::HEAP_REF_CTOR,
            name: "HeapRef".to_string(),
            fields: vec![ValDef::new(Id::REF_ID_FIELD, "id", Type::Int)],
        }],
    }
}

/// `dummyHeap`: an arbitrary but fixed heap, used by shims to blank out
/// everything outside the reads set.
fn dummy_heap() -> FunDef {
    let binder = ValDef::new(Id::local(0), "h", Type::Heap);
    let body = Expr::new(
        ExprKind::Choose {
            binder,
            pred: Box::new(Expr::bool_lit(true, Span::DUMMY)),
        },
        Type::Heap,
        Span::DUMMY,
    );
    FunDef {
        id: Id::DUMMY_HEAP,
        name: "dummyHeap".to_string(),
        tparams: Vec::new(),
        params: Vec::new(),
        return_ty: Type::Heap,
        body,
        spec: FunSpec::pure(),
        flags: FunFlags::SYNTHETIC | FunFlags::DROP_VCS,
        unapply_info: None,
        span: Span::DUMMY,
    }
}

fn option_tparam() -> TypeParamDef {
    TypeParamDef {
        id: Id::OPTION_TPARAM,
        name: "T".to_string(),
    }
}

fn option_sort() -> SortDef {
    SortDef {
        id: Id::OPTION,
        name: "Option".to_string(),
        tparams: vec![option_tparam()],
        constructors: vec![
            ConstructorDef {
                id: Id::OPTION_NONE,
                name: "none".to_string(),
                fields: Vec::new(),
            },
            ConstructorDef {
                id: Id::OPTION_SOME,
                name: "some".to_string(),
                fields: vec![ValDef::new(
                    Id::OPTION_VALUE_FIELD,
                    "value",
                    Type::TypeParam(Id::OPTION_TPARAM),
                )],
            },
        ],
    }
}

fn option_param() -> ValDef {
    ValDef::new(
        Id::local(0),
        "opt",
        Type::option(Type::TypeParam(Id::OPTION_TPARAM)),
    )
}

/// `isEmpty[T](opt: Option<T>): Bool`.
fn option_is_empty() -> FunDef {
    let opt = option_param();
    let none_case = MatchCase {
        pattern: Pattern {
            binder: None,
            kind: PatternKind::Class {
                class_id: Id::OPTION_NONE,
                tps: vec![Type::TypeParam(Id::OPTION_TPARAM)],
                subs: Vec::new(),
            },
            span: Span::DUMMY,
        },
        guard: None,
        rhs: Expr::bool_lit(true, Span::DUMMY),
    };
    let some_case = MatchCase {
        pattern: Pattern::wildcard(Span::DUMMY),
        guard: None,
        rhs: Expr::bool_lit(false, Span::DUMMY),
    };
    let body = Expr::new(
        ExprKind::Match {
            scrutinee: Box::new(Expr::var(&opt)),
            cases: vec![none_case, some_case],
        },
        Type::Bool,
        Span::DUMMY,
    );
    FunDef {
        id: Id::OPTION_IS_EMPTY,
        name: "isEmpty".to_string(),
        tparams: vec![option_tparam()],
        params: vec![opt],
        return_ty: Type::Bool,
        body,
        spec: FunSpec::pure(),
        flags: FunFlags::SYNTHETIC | FunFlags::DROP_VCS,
        unapply_info: None,
        span: Span::DUMMY,
    }
}

/// `get[T](opt: Option<T>): T`, defined where `opt` is non-empty.
fn option_get() -> FunDef {
    let opt = option_param();
    let requires = Expr::new(
        ExprKind::Not(Box::new(Expr::new(
            ExprKind::FunCall {
                id: Id::OPTION_IS_EMPTY,
                tps: vec![Type::TypeParam(Id::OPTION_TPARAM)],
                args: vec![Expr::var(&opt)],
            },
            Type::Bool,
            Span::DUMMY,
        ))),
        Type::Bool,
        Span::DUMMY,
    );
    let body = Expr::new(
        ExprKind::AdtSelect {
            expr: Box::new(Expr::var(&opt)),
            ctor: Id::OPTION_SOME,
            field: Id::OPTION_VALUE_FIELD,
        },
        Type::TypeParam(Id::OPTION_TPARAM),
        Span::DUMMY,
    );
    FunDef {
        id: Id::OPTION_GET,
        name: "get".to_string(),
        tparams: vec![option_tparam()],
        params: vec![opt],
        return_ty: Type::TypeParam(Id::OPTION_TPARAM),
        body,
        spec: FunSpec {
            requires: vec![requires],
            ..FunSpec::pure()
        },
        flags: FunFlags::SYNTHETIC | FunFlags::DROP_VCS,
        unapply_info: None,
        span: Span::DUMMY,
    }
}

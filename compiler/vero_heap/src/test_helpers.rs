//! Shared test utilities for the elaboration pass.
//!
//! Factory functions for the little programs the component tests run
//! on: a heap-marker class, a heap class `C { v: Int }`, and functions
//! over it with various effect clauses. Only compiled in test builds.

use vero_diagnostic::Reporter;
use vero_ir::{
    ClassDef, ClassFlags, Expr, ExprKind, FunDef, FunFlags, FunSpec, Id, Span, Symbols, Type,
    ValDef,
};

use crate::ctx::ElabCtx;
use crate::ElabConfig;

/// Shorthand for the `n`-th user id.
pub(crate) fn uid(n: u32) -> Id {
    Id::from_raw(Id::FIRST_USER.raw() + n)
}

/// Well-known test ids.
pub(crate) const MARKER: u32 = 0;
pub(crate) const CLASS_C: u32 = 1;
pub(crate) const FIELD_V: u32 = 2;

/// The type of class `C`.
pub(crate) fn c_ty() -> Type {
    Type::Class(uid(CLASS_C), Vec::new())
}

/// The heap-marker class `AnyHeapRef`.
pub(crate) fn marker_class() -> ClassDef {
    ClassDef {
        id: uid(MARKER),
        name: "AnyHeapRef".to_string(),
        tparams: Vec::new(),
        parents: Vec::new(),
        fields: Vec::new(),
        flags: ClassFlags::ANY_HEAP_REF,
        span: Span::DUMMY,
    }
}

/// A class extending the marker, with the given fields.
pub(crate) fn heap_class(id: u32, name: &str, fields: Vec<ValDef>) -> ClassDef {
    ClassDef {
        id: uid(id),
        name: name.to_string(),
        tparams: Vec::new(),
        parents: vec![(uid(MARKER), Vec::new())],
        fields,
        flags: ClassFlags::empty(),
        span: Span::DUMMY,
    }
}

/// A plain value class with no parents.
pub(crate) fn value_class(id: u32, name: &str, fields: Vec<ValDef>) -> ClassDef {
    ClassDef {
        id: uid(id),
        name: name.to_string(),
        tparams: Vec::new(),
        parents: Vec::new(),
        fields,
        flags: ClassFlags::empty(),
        span: Span::DUMMY,
    }
}

/// The base table: marker plus `C extends AnyHeapRef { val v: Int }`.
pub(crate) fn class_c_symbols() -> Symbols {
    Symbols::new()
        .with_class(marker_class())
        .with_class(heap_class(
            CLASS_C,
            "C",
            vec![ValDef::new(uid(FIELD_V), "v", Type::Int)],
        ))
}

/// A function definition with the given pieces and no flags.
pub(crate) fn fun(
    id: u32,
    name: &str,
    params: Vec<ValDef>,
    return_ty: Type,
    body: Expr,
    spec: FunSpec,
) -> FunDef {
    FunDef {
        id: uid(id),
        name: name.to_string(),
        tparams: Vec::new(),
        params,
        return_ty,
        body,
        spec,
        flags: FunFlags::empty(),
        unapply_info: None,
        span: Span::DUMMY,
    }
}

/// `Set(args…)` over class-`C` references.
pub(crate) fn ref_set_of(vds: &[&ValDef]) -> Expr {
    Expr::new(
        ExprKind::FiniteSet {
            elems: vds.iter().map(|vd| Expr::var(vd)).collect(),
            elem_ty: c_ty(),
        },
        Type::Set(Box::new(c_ty())),
        Span::DUMMY,
    )
}

/// `obj.v` for class `C`.
pub(crate) fn get_v(obj: &ValDef) -> Expr {
    Expr::new(
        ExprKind::FieldGet {
            obj: Box::new(Expr::var(obj)),
            field: uid(FIELD_V),
        },
        Type::Int,
        Span::new(40, 43),
    )
}

/// `obj.v = value` for class `C`.
pub(crate) fn set_v(obj: &ValDef, value: Expr) -> Expr {
    Expr::new(
        ExprKind::FieldSet {
            obj: Box::new(Expr::var(obj)),
            field: uid(FIELD_V),
            value: Box::new(value),
        },
        Type::Unit,
        Span::new(50, 60),
    )
}

/// Scenario S2: `def peek(c: C): Int = { reads(Set(c)); c.v }`.
pub(crate) fn peek_fun(id: u32) -> FunDef {
    let c = ValDef::new(uid(10), "c", c_ty());
    let spec = FunSpec {
        reads: Some(ref_set_of(&[&c])),
        ..FunSpec::pure()
    };
    fun(id, "peek", vec![c.clone()], Type::Int, get_v(&c), spec)
}

/// Scenario S3: `def bump(c: C): Unit = { reads(Set(c)); modifies(Set(c)); c.v = c.v + 1 }`.
pub(crate) fn bump_fun(id: u32) -> FunDef {
    let c = ValDef::new(uid(11), "c", c_ty());
    let incremented = Expr::new(
        ExprKind::BinOp {
            op: vero_ir::BinOpKind::Add,
            lhs: Box::new(get_v(&c)),
            rhs: Box::new(Expr::int_lit(1, Span::DUMMY)),
        },
        Type::Int,
        Span::DUMMY,
    );
    let spec = FunSpec {
        reads: Some(ref_set_of(&[&c])),
        modifies: Some(ref_set_of(&[&c])),
        ..FunSpec::pure()
    };
    fun(id, "bump", vec![c.clone()], Type::Unit, set_v(&c, incremented), spec)
}

/// Test fixture owning everything an [`ElabCtx`] borrows.
pub(crate) struct Fixture {
    pub symbols: Symbols,
    pub config: ElabConfig,
    pub reporter: Reporter,
}

impl Fixture {
    pub(crate) fn new(symbols: Symbols) -> Self {
        Fixture {
            symbols,
            config: ElabConfig::default(),
            reporter: Reporter::new(),
        }
    }

    pub(crate) fn with_config(symbols: Symbols, config: ElabConfig) -> Self {
        Fixture {
            symbols,
            config,
            reporter: Reporter::new(),
        }
    }

    pub(crate) fn ctx(&self) -> ElabCtx<'_> {
        ElabCtx::new(&self.symbols, &self.config, &self.reporter)
    }
}

/// Find an output function by display name.
pub(crate) fn find_fun<'a>(symbols: &'a Symbols, name: &str) -> &'a FunDef {
    match symbols.functions.values().find(|f| f.name == name) {
        Some(f) => f,
        None => panic!("no function named {name} in output table"),
    }
}

/// Whether any node in the function (body, requires, ensures, decreases)
/// satisfies the predicate.
pub(crate) fn any_expr(f: &FunDef, mut pred: impl FnMut(&Expr) -> bool) -> bool {
    let mut found = false;
    let mut check = |e: &Expr| {
        if pred(e) {
            found = true;
        }
    };
    f.body.walk(&mut check);
    for r in &f.spec.requires {
        r.walk(&mut check);
    }
    if let Some(ens) = &f.spec.ensures {
        ens.pred.walk(&mut check);
    }
    if let Some(d) = &f.spec.decreases {
        d.walk(&mut check);
    }
    found
}

/// Whether any type mentioned anywhere in the function satisfies the
/// predicate (signature and every expression node).
pub(crate) fn any_type(f: &FunDef, pred: impl Fn(&Type) -> bool) -> bool {
    fn type_mentions(ty: &Type, pred: &impl Fn(&Type) -> bool) -> bool {
        if pred(ty) {
            return true;
        }
        match ty {
            Type::Class(_, args) | Type::Sort(_, args) | Type::Tuple(args) => {
                args.iter().any(|a| type_mentions(a, pred))
            }
            Type::Set(elem) => type_mentions(elem, pred),
            Type::Function(params, ret) => {
                params.iter().any(|p| type_mentions(p, pred)) || type_mentions(ret, pred)
            }
            _ => false,
        }
    }

    if f.params.iter().any(|p| type_mentions(&p.ty, &pred))
        || type_mentions(&f.return_ty, &pred)
    {
        return true;
    }
    any_expr(f, |e| type_mentions(&e.ty, &pred))
}

//! Typed expression tree.
//!
//! Every node carries its type and source span; the frontend delivers a
//! fully typed tree and the elaboration pass keeps it typed. `ExprKind` is
//! a closed enum — transformation passes match on it exhaustively instead
//! of dispatching through a visitor hierarchy.
//!
//! The heap-facing source forms (`ClassCons`, `FieldGet`, `FieldSet`,
//! `IsInstance`, `RefEq`, `ObjectIdentity`, `Old`) are compiled away by the
//! heap elaboration; the heap map forms (`HeapGet`, `HeapUpdated`,
//! `HeapMerge`) and the verification forms (`Assert`, `Assume`, `Choose`)
//! only appear in its output.

use crate::{Id, Pattern, Span, Type, ValDef};

/// Expression node: kind + type + source position.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

/// One arm of a pattern match.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MatchCase {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub rhs: Expr,
}

/// Binary operators on values and propositions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinOpKind {
    Add,
    Sub,
    And,
    Or,
    Implies,
}

/// What a synthesized assertion checks.
///
/// Carried on every [`ExprKind::Assert`] the pass emits, one variant per
/// frame condition.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AssertKind {
    /// `x ∈ reads` on a heap read.
    RefInReads,
    /// `x ∈ modifies` on a heap write.
    RefInModifies,
    /// `reads ⊆ readsDom` at a shim entry.
    ReadsInDomain,
    /// `modifies ⊆ modifiesDom` at a shim entry.
    ModifiesInDomain,
    /// `modifies ⊆ reads` at an inner body entry.
    ModifiesInReads,
}

impl AssertKind {
    /// Human-readable label for the verification-condition generator.
    pub fn label(self) -> &'static str {
        match self {
            AssertKind::RefInReads => "reference is in the reads set",
            AssertKind::RefInModifies => "reference is in the modifies set",
            AssertKind::ReadsInDomain => "reads set is within the reads domain",
            AssertKind::ModifiesInDomain => "modifies set is within the modifies domain",
            AssertKind::ModifiesInReads => "modifies set is within the reads set",
        }
    }
}

/// Expression variants.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Integer literal.
    IntLit(i64),
    /// Boolean literal.
    BoolLit(bool),
    /// Unit literal.
    UnitLit,
    /// Variable reference.
    Var(Id),

    /// Immutable binding.
    Let {
        binder: ValDef,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Locally mutable binding (assignment target).
    LetVar {
        binder: ValDef,
        value: Box<Expr>,
        body: Box<Expr>,
    },
    /// Assignment to a `LetVar` binder; evaluates to unit.
    Assign { target: Id, value: Box<Expr> },
    /// Statement sequence; the value is the last expression's.
    Block(Vec<Expr>),
    /// Conditional.
    IfExpr {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Binary operation.
    BinOp {
        op: BinOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// Value equality.
    Equals(Box<Expr>, Box<Expr>),

    /// Class construction: `new C(args)` for heap classes, plain record
    /// construction for value classes.
    ClassCons {
        class_id: Id,
        tps: Vec<Type>,
        args: Vec<Expr>,
    },
    /// Field read.
    FieldGet { obj: Box<Expr>, field: Id },
    /// Field write; evaluates to unit.
    FieldSet {
        obj: Box<Expr>,
        field: Id,
        value: Box<Expr>,
    },
    /// Runtime type test: `obj is C`.
    IsInstance {
        expr: Box<Expr>,
        class_id: Id,
        tps: Vec<Type>,
    },
    /// Checked downcast; downstream stages treat it as an assumption.
    AsInstance {
        expr: Box<Expr>,
        class_id: Id,
        tps: Vec<Type>,
    },
    /// Reference equality on heap objects.
    RefEq(Box<Expr>, Box<Expr>),
    /// The identity of a heap object.
    ObjectIdentity(Box<Expr>),
    /// Pre-state value inside a postcondition.
    Old(Box<Expr>),

    /// Function invocation.
    FunCall {
        id: Id,
        tps: Vec<Type>,
        args: Vec<Expr>,
    },

    /// Pattern match.
    Match {
        scrutinee: Box<Expr>,
        cases: Vec<MatchCase>,
    },

    /// Tuple construction.
    Tuple(Vec<Expr>),
    /// Tuple projection, 1-based like the surface language.
    TupleSelect { tuple: Box<Expr>, index: u32 },

    /// Finite set literal; `elem_ty` disambiguates the empty set.
    FiniteSet { elems: Vec<Expr>, elem_ty: Type },
    /// Set membership.
    ElementOf { elem: Box<Expr>, set: Box<Expr> },
    /// Set inclusion.
    SubsetOf { lhs: Box<Expr>, rhs: Box<Expr> },

    /// ADT construction (`HeapRef`, `Option`, user sorts).
    Adt {
        ctor: Id,
        tps: Vec<Type>,
        args: Vec<Expr>,
    },
    /// ADT field projection.
    AdtSelect {
        expr: Box<Expr>,
        ctor: Id,
        field: Id,
    },

    /// Assertion with continuation: check `pred`, then evaluate `body`.
    Assert {
        kind: AssertKind,
        pred: Box<Expr>,
        body: Box<Expr>,
    },
    /// Assumption with continuation.
    Assume { pred: Box<Expr>, body: Box<Expr> },
    /// Non-deterministic choice of a value satisfying `pred`.
    Choose { binder: ValDef, pred: Box<Expr> },

    /// Heap lookup: `heap(ref)`.
    HeapGet {
        heap: Box<Expr>,
        reference: Box<Expr>,
    },
    /// Functional heap update: `heap` with `ref` mapped to `value`.
    HeapUpdated {
        heap: Box<Expr>,
        reference: Box<Expr>,
        value: Box<Expr>,
    },
    /// `mapMerge(mask, lhs, rhs)`: `lhs` on keys in `mask`, `rhs` elsewhere.
    HeapMerge {
        mask: Box<Expr>,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Placeholder produced during error recovery.
    Error,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Self {
        Expr { kind, ty, span }
    }

    /// Unit literal with a dummy position.
    pub fn unit() -> Expr {
        Expr::new(ExprKind::UnitLit, Type::Unit, Span::DUMMY)
    }

    /// Boolean literal.
    pub fn bool_lit(value: bool, span: Span) -> Expr {
        Expr::new(ExprKind::BoolLit(value), Type::Bool, span)
    }

    /// Integer literal.
    pub fn int_lit(value: i64, span: Span) -> Expr {
        Expr::new(ExprKind::IntLit(value), Type::Int, span)
    }

    /// Reference to a binder.
    pub fn var(vd: &ValDef) -> Expr {
        Expr::new(ExprKind::Var(vd.id), vd.ty.clone(), vd.span)
    }

    /// `let binder = value in body`, typed as the body.
    pub fn let_in(binder: ValDef, value: Expr, body: Expr) -> Expr {
        let ty = body.ty.clone();
        let span = body.span;
        Expr::new(
            ExprKind::Let {
                binder,
                value: Box::new(value),
                body: Box::new(body),
            },
            ty,
            span,
        )
    }

    /// `let var binder = value in body`, typed as the body.
    pub fn let_var_in(binder: ValDef, value: Expr, body: Expr) -> Expr {
        let ty = body.ty.clone();
        let span = body.span;
        Expr::new(
            ExprKind::LetVar {
                binder,
                value: Box::new(value),
                body: Box::new(body),
            },
            ty,
            span,
        )
    }

    /// Assertion with continuation, typed as the continuation. Carries a
    /// dummy position so a later inliner can stamp the call site.
    pub fn assert(kind: AssertKind, pred: Expr, body: Expr) -> Expr {
        let ty = body.ty.clone();
        Expr::new(
            ExprKind::Assert {
                kind,
                pred: Box::new(pred),
                body: Box::new(body),
            },
            ty,
            Span::DUMMY,
        )
    }

    /// Tuple construction.
    pub fn tuple(elems: Vec<Expr>, span: Span) -> Expr {
        let ty = Type::Tuple(elems.iter().map(|e| e.ty.clone()).collect());
        Expr::new(ExprKind::Tuple(elems), ty, span)
    }

    /// 1-based tuple projection; the type must be supplied by the caller.
    pub fn tuple_select(tuple: Expr, index: u32, ty: Type) -> Expr {
        let span = tuple.span;
        Expr::new(
            ExprKind::TupleSelect {
                tuple: Box::new(tuple),
                index,
            },
            ty,
            span,
        )
    }

    /// The empty `HeapRefSet`.
    pub fn empty_ref_set(span: Span) -> Expr {
        Expr::new(
            ExprKind::FiniteSet {
                elems: Vec::new(),
                elem_ty: Type::heap_ref(),
            },
            Type::ref_set(),
            span,
        )
    }

    /// `elem ∈ set`.
    pub fn element_of(elem: Expr, set: Expr) -> Expr {
        let span = elem.span;
        Expr::new(
            ExprKind::ElementOf {
                elem: Box::new(elem),
                set: Box::new(set),
            },
            Type::Bool,
            span,
        )
    }

    /// `lhs ⊆ rhs`.
    pub fn subset_of(lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span;
        Expr::new(
            ExprKind::SubsetOf {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Type::Bool,
            span,
        )
    }

    /// Walk the tree pre-order, visiting every sub-expression including
    /// those inside patterns' record arguments and match guards.
    pub fn walk(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match &self.kind {
            ExprKind::IntLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::UnitLit
            | ExprKind::Var(_)
            | ExprKind::Error => {}
            ExprKind::Let { value, body, .. } | ExprKind::LetVar { value, body, .. } => {
                value.walk(f);
                body.walk(f);
            }
            ExprKind::Assign { value, .. } => value.walk(f),
            ExprKind::Block(exprs) | ExprKind::Tuple(exprs) => {
                for e in exprs {
                    e.walk(f);
                }
            }
            ExprKind::IfExpr {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk(f);
                then_branch.walk(f);
                else_branch.walk(f);
            }
            ExprKind::BinOp { lhs, rhs, .. }
            | ExprKind::Equals(lhs, rhs)
            | ExprKind::RefEq(lhs, rhs) => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Not(e)
            | ExprKind::ObjectIdentity(e)
            | ExprKind::Old(e)
            | ExprKind::TupleSelect { tuple: e, .. }
            | ExprKind::AdtSelect { expr: e, .. }
            | ExprKind::IsInstance { expr: e, .. }
            | ExprKind::AsInstance { expr: e, .. }
            | ExprKind::FieldGet { obj: e, .. } => e.walk(f),
            ExprKind::FieldSet { obj, value, .. } => {
                obj.walk(f);
                value.walk(f);
            }
            ExprKind::ClassCons { args, .. }
            | ExprKind::FunCall { args, .. }
            | ExprKind::Adt { args, .. } => {
                for a in args {
                    a.walk(f);
                }
            }
            ExprKind::Match { scrutinee, cases } => {
                scrutinee.walk(f);
                for case in cases {
                    for rec in case.pattern.record_args() {
                        rec.walk(f);
                    }
                    if let Some(guard) = &case.guard {
                        guard.walk(f);
                    }
                    case.rhs.walk(f);
                }
            }
            ExprKind::FiniteSet { elems, .. } => {
                for e in elems {
                    e.walk(f);
                }
            }
            ExprKind::ElementOf { elem, set } => {
                elem.walk(f);
                set.walk(f);
            }
            ExprKind::SubsetOf { lhs, rhs } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            ExprKind::Assert { pred, body, .. } | ExprKind::Assume { pred, body } => {
                pred.walk(f);
                body.walk(f);
            }
            ExprKind::Choose { pred, .. } => pred.walk(f),
            ExprKind::HeapGet { heap, reference } => {
                heap.walk(f);
                reference.walk(f);
            }
            ExprKind::HeapUpdated {
                heap,
                reference,
                value,
            } => {
                heap.walk(f);
                reference.walk(f);
                value.walk(f);
            }
            ExprKind::HeapMerge { mask, lhs, rhs } => {
                mask.walk(f);
                lhs.walk(f);
                rhs.walk(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{Expr, ExprKind, Id, Span, Type, ValDef};

    #[test]
    fn let_in_takes_the_body_type() {
        let x = ValDef::new(Id::from_raw(70), "x", Type::Int);
        let e = Expr::let_in(x.clone(), Expr::int_lit(1, Span::DUMMY), Expr::var(&x));
        assert_eq!(e.ty, Type::Int);
    }

    #[test]
    fn tuple_type_follows_its_elements() {
        let e = Expr::tuple(
            vec![Expr::int_lit(1, Span::DUMMY), Expr::unit()],
            Span::DUMMY,
        );
        assert_eq!(e.ty, Type::Tuple(vec![Type::Int, Type::Unit]));
    }

    #[test]
    fn walk_visits_every_node_once() {
        let x = ValDef::new(Id::from_raw(70), "x", Type::Int);
        let e = Expr::let_in(
            x.clone(),
            Expr::int_lit(1, Span::DUMMY),
            Expr::element_of(Expr::var(&x), Expr::empty_ref_set(Span::DUMMY)),
        );
        let mut count = 0;
        e.walk(&mut |_| count += 1);
        // let, literal, element-of, var, finite-set.
        assert_eq!(count, 5);
    }

    #[test]
    fn assert_builder_carries_no_position() {
        let e = Expr::assert(
            crate::AssertKind::RefInReads,
            Expr::bool_lit(true, Span::new(3, 4)),
            Expr::unit(),
        );
        assert_eq!(e.span, Span::DUMMY);
        assert!(matches!(e.kind, ExprKind::Assert { .. }));
    }
}

//! Type rewriting.
//!
//! Replaces every heap-class type with the opaque `HeapRef` sort and
//! recursively rewrites everything else in place. Idempotent: a second
//! application leaves the tree unchanged (`HeapRef` is a sort, never a
//! class).

use vero_ir::{ClassDef, ClassFlags, ConstructorDef, SortDef, Type, TypeAliasDef, ValDef};

use crate::ctx::ElabCtx;
use crate::oracle::is_heap_class;

/// Rewrite one type.
pub fn rewrite_type(ctx: &ElabCtx<'_>, ty: &Type) -> Type {
    match ty {
        Type::Class(id, _) if is_heap_class(ctx, *id) => Type::heap_ref(),
        Type::Class(id, args) => Type::Class(*id, rewrite_all(ctx, args)),
        Type::Sort(id, args) => Type::Sort(*id, rewrite_all(ctx, args)),
        Type::Tuple(elems) => Type::Tuple(rewrite_all(ctx, elems)),
        Type::Set(elem) => Type::Set(Box::new(rewrite_type(ctx, elem))),
        Type::Function(params, ret) => Type::Function(
            rewrite_all(ctx, params),
            Box::new(rewrite_type(ctx, ret)),
        ),
        Type::Int | Type::Bool | Type::Unit | Type::Dyn | Type::Heap | Type::TypeParam(_) => {
            ty.clone()
        }
    }
}

fn rewrite_all(ctx: &ElabCtx<'_>, tys: &[Type]) -> Vec<Type> {
    tys.iter().map(|t| rewrite_type(ctx, t)).collect()
}

/// Rewrite a binder's type.
pub fn rewrite_valdef(ctx: &ElabCtx<'_>, vd: &ValDef) -> ValDef {
    vd.with_ty(rewrite_type(ctx, &vd.ty))
}

/// Rewrite a class definition: drop the heap-marker parent, rewrite all
/// remaining parent type arguments and field types.
pub fn rewrite_class(ctx: &ElabCtx<'_>, class: &ClassDef) -> ClassDef {
    let parents = class
        .parents
        .iter()
        .filter(|(parent, _)| {
            ctx.symbols
                .class(*parent)
                .is_none_or(|p| !p.flags.contains(ClassFlags::ANY_HEAP_REF))
        })
        .map(|(parent, args)| (*parent, rewrite_all(ctx, args)))
        .collect();
    ClassDef {
        id: class.id,
        name: class.name.clone(),
        tparams: class.tparams.clone(),
        parents,
        fields: class.fields.iter().map(|f| rewrite_valdef(ctx, f)).collect(),
        flags: class.flags,
        span: class.span,
    }
}

/// Rewrite a sort definition.
pub fn rewrite_sort(ctx: &ElabCtx<'_>, sort: &SortDef) -> SortDef {
    SortDef {
        id: sort.id,
        name: sort.name.clone(),
        tparams: sort.tparams.clone(),
        constructors: sort
            .constructors
            .iter()
            .map(|c| ConstructorDef {
                id: c.id,
                name: c.name.clone(),
                fields: c.fields.iter().map(|f| rewrite_valdef(ctx, f)).collect(),
            })
            .collect(),
    }
}

/// Rewrite a type alias definition.
pub fn rewrite_alias(ctx: &ElabCtx<'_>, alias: &TypeAliasDef) -> TypeAliasDef {
    TypeAliasDef {
        id: alias.id,
        name: alias.name.clone(),
        tparams: alias.tparams.clone(),
        aliased: rewrite_type(ctx, &alias.aliased),
    }
}

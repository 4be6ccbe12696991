//! Heap-class oracle.
//!
//! Decides whether a type lives in the heap: a class is heap-resident iff
//! it is the marker class itself or some transitive parent carries the
//! marker flag. Every other type shape (functions, tuples, primitives,
//! sorts) is a value type.
//!
//! Results are memoized in the pass context so each class is inspected at
//! most once per invocation. The frontend rules out parent cycles, but a
//! cycle is reported rather than looped on.

use rustc_hash::FxHashSet;

use vero_diagnostic::Diagnostic;
use vero_ir::{ClassFlags, Id, Type};

use crate::ctx::ElabCtx;

/// Whether values of `ty` are heap-resident.
pub fn is_heap_type(ctx: &ElabCtx<'_>, ty: &Type) -> bool {
    match ty {
        Type::Class(id, _) => is_heap_class(ctx, *id),
        _ => false,
    }
}

/// Whether the class itself is heap-resident.
pub fn is_heap_class(ctx: &ElabCtx<'_>, class: Id) -> bool {
    let mut visiting = FxHashSet::default();
    walk(ctx, class, &mut visiting)
}

fn walk(ctx: &ElabCtx<'_>, class: Id, visiting: &mut FxHashSet<Id>) -> bool {
    if let Some(cached) = ctx.heap_cache.get(&class) {
        return *cached;
    }
    if !visiting.insert(class) {
        // Parent cycle. Report once per offending class and answer
        // "not heap-resident" instead of diverging.
        if let Some(c) = ctx.symbols.class(class) {
            ctx.reporter
                .report(Diagnostic::class_hierarchy_cycle(&c.name, c.span));
        }
        return false;
    }

    let result = match ctx.symbols.class(class) {
        Some(c) => {
            if c.flags.contains(ClassFlags::ANY_HEAP_REF) {
                true
            } else {
                let mut found = false;
                for (parent, _) in &c.parents {
                    if walk(ctx, *parent, visiting) {
                        found = true;
                        break;
                    }
                }
                found
            }
        }
        // Unresolved class reference; the frontend resolves these, so an
        // unknown id can only mean a value-class from another unit.
        None => false,
    };

    visiting.remove(&class);
    ctx.heap_cache.insert(class, result);
    result
}

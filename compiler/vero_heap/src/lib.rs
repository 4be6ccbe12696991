//! Heap/effect elaboration for the Vero verifier.
//!
//! This pass compiles away heap-manipulating object operations —
//! allocation, field access, runtime type tests, reference equality,
//! `reads`/`modifies` contracts — into pure-functional form by threading
//! an explicit heap value through every function that touches the heap.
//!
//! # Pipeline Position
//!
//! ```text
//! Frontend → Type Check → **Heap Elaboration** → VC Generation
//! ```
//!
//! # What Happens During Elaboration
//!
//! 1. **Classification**: every type is heap-resident or a value type
//!    ([`is_heap_type`]); every function is `Pure`, `Reads`, or
//!    `ReadsWrites` ([`effect_level`]).
//! 2. **Type rewriting**: heap-class types become the opaque `HeapRef`
//!    sort ([`rewrite_type`]).
//! 3. **Expression rewriting**: heap dereferences become explicit map
//!    operations on the current heap variable, with frame-condition
//!    assertions ([`Rewriter`]).
//! 4. **Pattern rewriting**: heap-class patterns become calls to
//!    synthesized `unapply` extractors.
//! 5. **Function splitting**: each effectful function yields an *inner*
//!    (heap as a parameter) and a *shim* (frame checks + heap merging);
//!    every call site targets the shim ([`extract_function`]).
//! 6. **Preamble**: the output table gains the `HeapRef` sort,
//!    `dummyHeap`, and `Option` support, and loses the marker and
//!    reference-equality definitions.
//!
//! The pass is a pure input-to-output transformation; independent
//! definitions are processed in parallel and the result is invariant
//! under processing order. User errors go through the reporter and leave
//! well-typed placeholders behind so one run reports everything.

mod ctx;
mod effects;
mod env;
mod oracle;
mod pattern;
mod preamble;
mod rewrite;
mod split;
mod type_rewrite;

#[cfg(test)]
mod test_helpers;

use rayon::prelude::*;

use vero_diagnostic::{Diagnostic, Reporter};
use vero_ir::{ClassDef, ClassFlags, FunDef, SortDef, Symbols, Type};

pub use ctx::ElabCtx;
pub use effects::{effect_level, EffectLevel};
pub use env::{Frame, RewriteEnv};
pub use oracle::{is_heap_class, is_heap_type};
pub use pattern::synth_unapply;
pub use preamble::finalize;
pub use rewrite::Rewriter;
pub use split::extract_function;
pub use type_rewrite::rewrite_type;

/// Pass configuration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ElabConfig {
    /// Insert the frame-condition assertions (`x ∈ reads` on reads,
    /// `x ∈ modifies` on writes, `reads ⊆ readsDom` and
    /// `modifies ⊆ modifiesDom` in shims). When disabled, each assertion
    /// collapses to its continuation.
    pub check_heap_contracts: bool,
}

impl Default for ElabConfig {
    fn default() -> Self {
        ElabConfig {
            check_heap_contracts: true,
        }
    }
}

/// Run the pass over a full symbol table.
///
/// Produces a new table; the input is never mutated. Consult the
/// reporter's error count afterwards to decide whether to proceed.
pub fn run(symbols: &Symbols, config: &ElabConfig, reporter: &Reporter) -> Symbols {
    let ctx = ElabCtx::new(symbols, config, reporter);
    ctx.seed_fresh_ids();
    tracing::debug!(
        functions = symbols.functions.len(),
        classes = symbols.classes.len(),
        "running heap elaboration"
    );

    let functions: Vec<FunDef> = symbols
        .functions_ordered()
        .into_par_iter()
        .flat_map_iter(|f| extract_function(&ctx, f))
        .collect();
    let classes: Vec<(ClassDef, Option<FunDef>)> = symbols
        .classes_ordered()
        .into_par_iter()
        .filter(|c| !c.flags.contains(ClassFlags::ANY_HEAP_REF))
        .map(|c| extract_class(&ctx, c))
        .collect();
    let sorts: Vec<SortDef> = symbols
        .sorts_ordered()
        .into_par_iter()
        .map(|s| extract_sort(&ctx, s))
        .collect();
    let aliases: Vec<_> = symbols
        .aliases_ordered()
        .into_par_iter()
        .map(|a| type_rewrite::rewrite_alias(&ctx, a))
        .collect();

    let mut out = Symbols::new();
    for f in functions {
        out.functions.insert(f.id, f);
    }
    for (class, unapply) in classes {
        out.classes.insert(class.id, class);
        if let Some(u) = unapply {
            out.functions.insert(u.id, u);
        }
    }
    for s in sorts {
        out.sorts.insert(s.id, s);
    }
    for a in aliases {
        out.aliases.insert(a.id, a);
    }
    preamble::finalize(out)
}

/// Rewrite one class; heap classes additionally yield their synthesized
/// `unapply` extractor. Function-valued fields on heap classes are
/// rejected — the encoding cannot thread the heap through first-class
/// functions.
pub fn extract_class(ctx: &ElabCtx<'_>, class: &ClassDef) -> (ClassDef, Option<FunDef>) {
    let rewritten = type_rewrite::rewrite_class(ctx, class);
    if class.flags.contains(ClassFlags::ANY_HEAP_REF) || !is_heap_class(ctx, class.id) {
        return (rewritten, None);
    }
    for field in &class.fields {
        if mentions_function(&field.ty) {
            ctx.reporter.report(Diagnostic::function_valued_field(
                &class.name,
                &field.name,
                field.span,
            ));
        }
    }
    let unapply = synth_unapply(ctx, class);
    (rewritten, Some(unapply))
}

/// Rewrite one sort definition.
pub fn extract_sort(ctx: &ElabCtx<'_>, sort: &SortDef) -> SortDef {
    type_rewrite::rewrite_sort(ctx, sort)
}

fn mentions_function(ty: &Type) -> bool {
    match ty {
        Type::Function(..) => true,
        Type::Class(_, args) | Type::Sort(_, args) | Type::Tuple(args) => {
            args.iter().any(mentions_function)
        }
        Type::Set(elem) => mentions_function(elem),
        Type::Int | Type::Bool | Type::Unit | Type::Dyn | Type::Heap | Type::TypeParam(_) => false,
    }
}

//! Effect classification.
//!
//! A function's effect level is derived once from the presence of its
//! `reads` and `modifies` clauses and cached for the rest of the pass.

use vero_ir::Id;

use crate::ctx::ElabCtx;

/// How a function interacts with the heap.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum EffectLevel {
    /// Neither `reads` nor `modifies`.
    Pure,
    /// A `reads` clause but no `modifies`.
    Reads,
    /// A `modifies` clause (which implies reads).
    ReadsWrites,
}

impl EffectLevel {
    /// Whether the function touches the heap at all.
    #[inline]
    pub fn is_effectful(self) -> bool {
        self != EffectLevel::Pure
    }

    /// Whether the function may write the heap.
    #[inline]
    pub fn writes(self) -> bool {
        self == EffectLevel::ReadsWrites
    }
}

/// The effect level of the function `id`. Unknown ids (support-library
/// helpers injected later) are pure.
pub fn effect_level(ctx: &ElabCtx<'_>, id: Id) -> EffectLevel {
    if let Some(cached) = ctx.effect_cache.get(&id) {
        return *cached;
    }
    let level = match ctx.symbols.function(id) {
        Some(f) => match (&f.spec.reads, &f.spec.modifies) {
            (_, Some(_)) => EffectLevel::ReadsWrites,
            (Some(_), None) => EffectLevel::Reads,
            (None, None) => EffectLevel::Pure,
        },
        None => EffectLevel::Pure,
    };
    ctx.effect_cache.insert(id, level);
    level
}

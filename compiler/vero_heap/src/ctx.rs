//! The elaboration context.
//!
//! One [`ElabCtx`] lives for one pass invocation and owns the four
//! memoization caches: heap-type answers, effect levels, and the fresh
//! ids chosen for shims and unapply functions. All caches are set-once
//! maps shared across rayon workers; concurrent writers for the same key
//! always agree because the computations are deterministic.

use dashmap::DashMap;
use parking_lot::Mutex;

use vero_diagnostic::Reporter;
use vero_ir::{ClassFlags, FunFlags, Id, IdGen, Symbols};

use crate::effects::{effect_level, EffectLevel};
use crate::oracle::is_heap_class;
use crate::ElabConfig;

/// Per-invocation state of the elaboration pass.
pub struct ElabCtx<'a> {
    pub symbols: &'a Symbols,
    pub config: &'a ElabConfig,
    pub reporter: &'a Reporter,
    /// C1 cache: class id → heap-resident?
    pub(crate) heap_cache: DashMap<Id, bool>,
    /// C3 cache: function id → effect level.
    pub(crate) effect_cache: DashMap<Id, EffectLevel>,
    /// Fresh shim id per effectful function.
    pub(crate) shim_ids: DashMap<Id, Id>,
    /// Fresh unapply id per heap class.
    pub(crate) unapply_ids: DashMap<Id, Id>,
    /// Fresh-id source for the two maps above. Only touched by the
    /// seeding phase and the on-demand fallback for standalone
    /// extraction calls.
    fresh: Mutex<IdGen>,
}

impl<'a> ElabCtx<'a> {
    pub fn new(symbols: &'a Symbols, config: &'a ElabConfig, reporter: &'a Reporter) -> Self {
        ElabCtx {
            symbols,
            config,
            reporter,
            heap_cache: DashMap::new(),
            effect_cache: DashMap::new(),
            shim_ids: DashMap::new(),
            unapply_ids: DashMap::new(),
            fresh: Mutex::new(IdGen::above(symbols.max_id())),
        }
    }

    /// Allocate every shim and unapply id up front, in ascending-id order
    /// of the input definitions.
    ///
    /// Runs before any parallel work so the chosen ids are a pure
    /// function of the input table, independent of worker scheduling.
    pub(crate) fn seed_fresh_ids(&self) {
        let mut gen = self.fresh.lock();
        for f in self.symbols.functions_ordered() {
            if f.flags.contains(FunFlags::REF_EQ) {
                continue;
            }
            if effect_level(self, f.id).is_effectful() {
                self.shim_ids.insert(f.id, gen.fresh());
            }
        }
        for c in self.symbols.classes_ordered() {
            if c.flags.contains(ClassFlags::ANY_HEAP_REF) {
                continue;
            }
            if is_heap_class(self, c.id) {
                self.unapply_ids.insert(c.id, gen.fresh());
            }
        }
    }

    /// The shim id for an effectful function.
    pub fn shim_of(&self, fun: Id) -> Id {
        *self
            .shim_ids
            .entry(fun)
            .or_insert_with(|| self.fresh.lock().fresh())
    }

    /// The unapply id for a heap class.
    pub fn unapply_of(&self, class: Id) -> Id {
        *self
            .unapply_ids
            .entry(class)
            .or_insert_with(|| self.fresh.lock().fresh())
    }
}

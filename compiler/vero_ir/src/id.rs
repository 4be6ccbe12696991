//! Definition identifiers.
//!
//! A 32-bit opaque identifier keying every definition (function, class,
//! sort, alias) and every binder. The low range is reserved for the
//! support-library definitions the elaboration pass injects; user ids
//! handed out by the frontend start at [`Id::FIRST_USER`].
//!
//! Ids in the high bit-tagged range ([`Id::local`]) are scoped to a single
//! synthesized function body and never collide with frontend ids.

use std::fmt;

/// Opaque definition identifier.
///
/// Equality and ordering are by raw index; display names live on the
/// definitions themselves.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Id(u32);

impl Id {
    /// The `HeapRef` sort: opaque handle to a heap-resident object.
    pub const HEAP_REF: Id = Id(1);
    /// The single constructor of `HeapRef`.
    pub const HEAP_REF_CTOR: Id = Id(2);
    /// The identity field of the `HeapRef` constructor.
    pub const REF_ID_FIELD: Id = Id(3);
    /// The `dummyHeap` nullary constant.
    pub const DUMMY_HEAP: Id = Id(4);
    /// The `Option` sort.
    pub const OPTION: Id = Id(5);
    /// `Option`'s `none` constructor.
    pub const OPTION_NONE: Id = Id(6);
    /// `Option`'s `some` constructor.
    pub const OPTION_SOME: Id = Id(7);
    /// The payload field of `some`.
    pub const OPTION_VALUE_FIELD: Id = Id(8);
    /// `Option.isEmpty` helper function.
    pub const OPTION_IS_EMPTY: Id = Id(9);
    /// `Option.get` helper function.
    pub const OPTION_GET: Id = Id(10);
    /// The type parameter of the `Option` sort and its helpers.
    pub const OPTION_TPARAM: Id = Id(11);

    /// First id available to the frontend.
    pub const FIRST_USER: Id = Id(64);

    /// Tag bit for function-local synthesized binders.
    const LOCAL_BIT: u32 = 1 << 31;

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Id(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The `n`-th local binder id of a synthesized body.
    ///
    /// Local ids are only ever compared against binders in the same
    /// function scope, so per-function counters may restart at zero.
    #[inline]
    pub const fn local(n: u32) -> Self {
        Id(n | Self::LOCAL_BIT)
    }

    /// Whether this id lives in the function-local range.
    #[inline]
    pub const fn is_local(self) -> bool {
        self.0 & Self::LOCAL_BIT != 0
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "Id(local {})", self.0 & !Self::LOCAL_BIT)
        } else {
            write!(f, "Id({})", self.0)
        }
    }
}

/// Deterministic allocator for fresh top-level ids (shims, unapply
/// functions).
///
/// Seeded from the maximum id present in the input table; allocation order
/// is fixed by the seeding phase, before any parallel work starts, so the
/// chosen ids are a pure function of the input.
#[derive(Debug)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    /// Start allocating above `max_seen`.
    pub fn above(max_seen: Id) -> Self {
        IdGen {
            next: max_seen.raw().max(Id::FIRST_USER.raw()) + 1,
        }
    }

    /// Hand out the next fresh id.
    pub fn fresh(&mut self) -> Id {
        let id = Id(self.next);
        self.next += 1;
        id
    }
}

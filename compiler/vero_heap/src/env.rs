//! The rewrite environment.
//!
//! Carries the three optional bindings the expression rewriter consults:
//! the current heap variable, the reads frame, and the modifies frame.
//! Frames are tri-state: absent (the effect is forbidden here),
//! unrestricted (allowed without a frame check), or bound to the variable
//! holding the frame set.
//!
//! `old_heap` is set only while rewriting a postcondition; it names the
//! input heap that `old(...)` sub-expressions evaluate in.

use vero_ir::{Id, Type, ValDef};

/// One frame binding (reads or modifies).
#[derive(Clone, Debug)]
pub enum Frame {
    /// The effect is not allowed in this context.
    Forbidden,
    /// The effect is allowed without any frame-condition check.
    Unrestricted,
    /// The effect is restricted to the set held by this variable.
    Bound(ValDef),
}

impl Frame {
    /// The frame variable, if restricted.
    pub fn bound(&self) -> Option<&ValDef> {
        match self {
            Frame::Bound(vd) => Some(vd),
            _ => None,
        }
    }

    /// Whether the effect is allowed at all.
    pub fn allows(&self) -> bool {
        !matches!(self, Frame::Forbidden)
    }
}

/// Environment threaded through the expression rewriter.
#[derive(Clone, Debug)]
pub struct RewriteEnv {
    /// The current heap variable; absent means heap usage is an error.
    pub heap: Option<ValDef>,
    /// The reads frame.
    pub reads: Frame,
    /// The modifies frame.
    pub modifies: Frame,
    /// The pre-state heap, inside postconditions only.
    pub old_heap: Option<ValDef>,
}

impl RewriteEnv {
    /// No heap access of any kind: the environment of pure functions.
    pub fn pure() -> Self {
        RewriteEnv {
            heap: None,
            reads: Frame::Forbidden,
            modifies: Frame::Forbidden,
            old_heap: None,
        }
    }

    /// Body environment of an effectful function.
    pub fn body(heap: ValDef, reads: Frame, modifies: Frame) -> Self {
        RewriteEnv {
            heap: Some(heap),
            reads,
            modifies,
            old_heap: None,
        }
    }

    /// Specification environment: reads visible, no modifies.
    pub fn spec(heap: ValDef, reads: Frame) -> Self {
        RewriteEnv {
            heap: Some(heap),
            reads,
            modifies: Frame::Forbidden,
            old_heap: None,
        }
    }

    /// All reads allowed, nothing else: used to translate the `reads`
    /// clause itself without bootstrapping through its own frame check.
    pub fn allow_all_reads(heap: ValDef) -> Self {
        RewriteEnv {
            heap: Some(heap),
            reads: Frame::Unrestricted,
            modifies: Frame::Forbidden,
            old_heap: None,
        }
    }

    /// Same environment with the pre-state heap bound for `old(...)`.
    #[must_use]
    pub fn with_old_heap(mut self, old_heap: ValDef) -> Self {
        self.old_heap = Some(old_heap);
        self
    }
}

/// The placeholder heap binding substituted at error sites so rewriting
/// can continue and further errors be reported in the same run.
pub fn dummy_heap_binding() -> ValDef {
    ValDef::new(Id::local(0x7FFF_FFFF), "heap", Type::Heap)
}

//! The type universe.
//!
//! Types are the frontend's, extended with the three forms the heap
//! elaboration introduces:
//!
//! - [`Type::Heap`] — the abstract map from `HeapRef` to the dynamic class
//!   value. Opaque: it is only read and written through the dedicated heap
//!   expression forms ([`HeapGet`](crate::ExprKind::HeapGet) and friends).
//! - [`Type::Dyn`] — the dynamic class value, the heap's codomain.
//! - `HeapRef` / `HeapRefSet` — not separate variants; `HeapRef` is the
//!   builtin sort [`Id::HEAP_REF`] and the ref-set is `Set(HeapRef)`
//!   (see [`Type::heap_ref`] and [`Type::ref_set`]).

use rustc_hash::FxHashMap;

use crate::Id;

/// A type. Boxed recursive tree; the elaboration pass synthesizes types
/// freely, so tree nodes beat arena indices here.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    /// Mathematical integer.
    Int,
    /// Boolean.
    Bool,
    /// Unit.
    Unit,
    /// The dynamic class value; codomain of the heap map.
    Dyn,
    /// The abstract heap map type.
    Heap,
    /// Class type with type arguments.
    Class(Id, Vec<Type>),
    /// ADT sort reference with type arguments (`HeapRef`, `Option`, user sorts).
    Sort(Id, Vec<Type>),
    /// Type parameter reference.
    TypeParam(Id),
    /// Tuple type.
    Tuple(Vec<Type>),
    /// Finite set.
    Set(Box<Type>),
    /// Function type. Heap classes may not appear inside one that is
    /// stored in a heap-class field; the pass rejects such programs.
    Function(Vec<Type>, Box<Type>),
}

impl Type {
    /// The `HeapRef` sort type.
    #[inline]
    pub fn heap_ref() -> Type {
        Type::Sort(Id::HEAP_REF, Vec::new())
    }

    /// The `HeapRefSet` type: `Set(HeapRef)`.
    #[inline]
    pub fn ref_set() -> Type {
        Type::Set(Box::new(Type::heap_ref()))
    }

    /// `Option<t>`.
    #[inline]
    pub fn option(t: Type) -> Type {
        Type::Sort(Id::OPTION, vec![t])
    }

    /// Pair a result type with the heap, the return type of a writing
    /// inner function.
    #[inline]
    pub fn with_heap(self) -> Type {
        Type::Tuple(vec![self, Type::Heap])
    }

    /// Whether this is exactly the `HeapRef` sort.
    #[inline]
    pub fn is_heap_ref(&self) -> bool {
        matches!(self, Type::Sort(id, args) if *id == Id::HEAP_REF && args.is_empty())
    }

    /// The class id if this is a class type.
    #[inline]
    pub fn class_id(&self) -> Option<Id> {
        match self {
            Type::Class(id, _) => Some(*id),
            _ => None,
        }
    }

    /// Replace type-parameter references according to `map`, leaving
    /// unmapped parameters alone.
    #[must_use]
    pub fn substituted(&self, map: &FxHashMap<Id, Type>) -> Type {
        match self {
            Type::TypeParam(id) => map.get(id).cloned().unwrap_or_else(|| self.clone()),
            Type::Class(id, args) => {
                Type::Class(*id, args.iter().map(|a| a.substituted(map)).collect())
            }
            Type::Sort(id, args) => {
                Type::Sort(*id, args.iter().map(|a| a.substituted(map)).collect())
            }
            Type::Tuple(elems) => {
                Type::Tuple(elems.iter().map(|e| e.substituted(map)).collect())
            }
            Type::Set(elem) => Type::Set(Box::new(elem.substituted(map))),
            Type::Function(params, ret) => Type::Function(
                params.iter().map(|p| p.substituted(map)).collect(),
                Box::new(ret.substituted(map)),
            ),
            Type::Int | Type::Bool | Type::Unit | Type::Dyn | Type::Heap => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::Type;
    use crate::Id;

    #[test]
    fn ref_set_is_set_of_heap_ref() {
        let Type::Set(elem) = Type::ref_set() else {
            panic!("ref_set must be a Set type");
        };
        assert!(elem.is_heap_ref());
    }

    #[test]
    fn class_id_projection() {
        let c = Type::Class(Id::from_raw(70), vec![Type::Int]);
        assert_eq!(c.class_id(), Some(Id::from_raw(70)));
        assert_eq!(Type::Int.class_id(), None);
    }
}

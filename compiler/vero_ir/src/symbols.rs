//! Symbol tables.
//!
//! Id-keyed definition maps. Tables are immutable from a pass's viewpoint:
//! the elaboration consumes one table and produces a fresh one. Iteration
//! helpers hand definitions out in ascending-id order so processing order
//! and printed output are deterministic regardless of hash-map layout.

use rustc_hash::FxHashMap;

use crate::{ClassDef, ClassFlags, FunDef, Id, SortDef, TypeAliasDef};

/// The full definition environment of a program.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Symbols {
    pub functions: FxHashMap<Id, FunDef>,
    pub classes: FxHashMap<Id, ClassDef>,
    pub sorts: FxHashMap<Id, SortDef>,
    pub aliases: FxHashMap<Id, TypeAliasDef>,
}

impl Symbols {
    pub fn new() -> Self {
        Symbols::default()
    }

    /// Look up a function.
    pub fn function(&self, id: Id) -> Option<&FunDef> {
        self.functions.get(&id)
    }

    /// Look up a class.
    pub fn class(&self, id: Id) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    /// Look up a sort.
    pub fn sort(&self, id: Id) -> Option<&SortDef> {
        self.sorts.get(&id)
    }

    /// Look up a type alias.
    pub fn alias(&self, id: Id) -> Option<&TypeAliasDef> {
        self.aliases.get(&id)
    }

    /// Insert a function (builder style).
    #[must_use]
    pub fn with_function(mut self, f: FunDef) -> Self {
        self.functions.insert(f.id, f);
        self
    }

    /// Insert a class (builder style).
    #[must_use]
    pub fn with_class(mut self, c: ClassDef) -> Self {
        self.classes.insert(c.id, c);
        self
    }

    /// Insert a sort (builder style).
    #[must_use]
    pub fn with_sort(mut self, s: SortDef) -> Self {
        self.sorts.insert(s.id, s);
        self
    }

    /// Insert a type alias (builder style).
    #[must_use]
    pub fn with_alias(mut self, a: TypeAliasDef) -> Self {
        self.aliases.insert(a.id, a);
        self
    }

    /// Function definitions in ascending-id order.
    pub fn functions_ordered(&self) -> Vec<&FunDef> {
        let mut fns: Vec<&FunDef> = self.functions.values().collect();
        fns.sort_by_key(|f| f.id);
        fns
    }

    /// Class definitions in ascending-id order.
    pub fn classes_ordered(&self) -> Vec<&ClassDef> {
        let mut classes: Vec<&ClassDef> = self.classes.values().collect();
        classes.sort_by_key(|c| c.id);
        classes
    }

    /// Sort definitions in ascending-id order.
    pub fn sorts_ordered(&self) -> Vec<&SortDef> {
        let mut sorts: Vec<&SortDef> = self.sorts.values().collect();
        sorts.sort_by_key(|s| s.id);
        sorts
    }

    /// Type aliases in ascending-id order.
    pub fn aliases_ordered(&self) -> Vec<&TypeAliasDef> {
        let mut aliases: Vec<&TypeAliasDef> = self.aliases.values().collect();
        aliases.sort_by_key(|a| a.id);
        aliases
    }

    /// The largest id of any definition, for seeding fresh-id allocation.
    pub fn max_id(&self) -> Id {
        self.functions
            .keys()
            .chain(self.classes.keys())
            .chain(self.sorts.keys())
            .chain(self.aliases.keys())
            .copied()
            .max()
            .unwrap_or(Id::FIRST_USER)
    }

    /// The id of the class flagged as the heap-reference marker, if any.
    pub fn heap_marker(&self) -> Option<Id> {
        self.classes
            .values()
            .find(|c| c.flags.contains(ClassFlags::ANY_HEAP_REF))
            .map(|c| c.id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{ClassDef, ClassFlags, Span, Symbols};

    fn class(id: u32, flags: ClassFlags) -> ClassDef {
        ClassDef {
            id: crate::Id::from_raw(id),
            name: format!("C{id}"),
            tparams: Vec::new(),
            parents: Vec::new(),
            fields: Vec::new(),
            flags,
            span: Span::DUMMY,
        }
    }

    #[test]
    fn ordered_iteration_is_ascending_by_id() {
        let symbols = Symbols::new()
            .with_class(class(90, ClassFlags::empty()))
            .with_class(class(70, ClassFlags::empty()))
            .with_class(class(80, ClassFlags::empty()));
        let ids: Vec<u32> = symbols.classes_ordered().iter().map(|c| c.id.raw()).collect();
        assert_eq!(ids, vec![70, 80, 90]);
    }

    #[test]
    fn max_id_spans_all_tables() {
        let symbols = Symbols::new().with_class(class(95, ClassFlags::empty()));
        assert_eq!(symbols.max_id().raw(), 95);
        // Empty tables still report the reserved floor.
        assert_eq!(Symbols::new().max_id(), crate::Id::FIRST_USER);
    }

    #[test]
    fn heap_marker_finds_the_flagged_class() {
        let symbols = Symbols::new()
            .with_class(class(70, ClassFlags::empty()))
            .with_class(class(71, ClassFlags::ANY_HEAP_REF));
        assert_eq!(symbols.heap_marker(), Some(crate::Id::from_raw(71)));
    }
}

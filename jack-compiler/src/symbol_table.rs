//! Scoped identifier resolution for the Jack compiler.
//!
//! Two flat scopes, not a chain: class scope holds statics and fields
//! for the whole class; subroutine scope holds arguments and locals and
//! is reset on every subroutine. Lookups try the subroutine scope first,
//! so locals shadow class members. Indices count per kind, which is
//! exactly the index the variable gets in its VM segment.

use std::collections::HashMap;

use crate::vm_writer::Segment;

/// The four identifier kinds the compiler tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Static,
    Field,
    Arg,
    Var,
}

impl Kind {
    /// The VM segment this kind of identifier lives in at runtime.
    #[must_use]
    pub fn segment(self) -> Segment {
        match self {
            Self::Static => Segment::Static,
            Self::Field => Segment::This,
            Self::Arg => Segment::Argument,
            Self::Var => Segment::Local,
        }
    }

    fn counter_slot(self) -> usize {
        match self {
            Self::Static => 0,
            Self::Field => 1,
            Self::Arg => 2,
            Self::Var => 3,
        }
    }

    fn is_class_scope(self) -> bool {
        matches!(self, Self::Static | Self::Field)
    }
}

/// One declared identifier: its type name, kind, and per-kind index.
#[derive(Debug, Clone)]
pub struct Entry {
    pub type_name: String,
    pub kind: Kind,
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Entry>,
    subroutine_scope: HashMap<String, Entry>,
    counters: [u16; 4],
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the subroutine scope for the next subroutine. Class-scope
    /// entries and counters survive.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters[Kind::Arg.counter_slot()] = 0;
        self.counters[Kind::Var.counter_slot()] = 0;
    }

    /// Declares an identifier, assigning it the next index of its kind.
    pub fn define(&mut self, name: &str, type_name: &str, kind: Kind) {
        let slot = kind.counter_slot();
        let entry = Entry {
            type_name: type_name.to_string(),
            kind,
            index: self.counters[slot],
        };
        self.counters[slot] += 1;

        if kind.is_class_scope() {
            self.class_scope.insert(name.to_string(), entry);
        } else {
            self.subroutine_scope.insert(name.to_string(), entry);
        }
    }

    /// Number of identifiers of `kind` defined in the current scope pair.
    #[must_use]
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.counters[kind.counter_slot()]
    }

    /// Resolves a name, preferring the subroutine scope.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_count_per_kind() {
        let mut table = SymbolTable::new();
        table.define("a", "int", Kind::Static);
        table.define("b", "int", Kind::Field);
        table.define("c", "int", Kind::Field);
        table.define("d", "boolean", Kind::Var);

        assert_eq!(table.lookup("a").unwrap().index, 0);
        assert_eq!(table.lookup("b").unwrap().index, 0);
        assert_eq!(table.lookup("c").unwrap().index, 1);
        assert_eq!(table.lookup("d").unwrap().index, 0);
        assert_eq!(table.var_count(Kind::Field), 2);
    }

    #[test]
    fn subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define("x", "int", Kind::Field);
        table.define("x", "Point", Kind::Var);

        let entry = table.lookup("x").unwrap();
        assert_eq!(entry.kind, Kind::Var);
        assert_eq!(entry.type_name, "Point");
    }

    #[test]
    fn start_subroutine_resets_locals_but_not_fields() {
        let mut table = SymbolTable::new();
        table.define("size", "int", Kind::Field);
        table.define("i", "int", Kind::Var);
        table.define("this", "Square", Kind::Arg);

        table.start_subroutine();

        assert!(table.lookup("i").is_none());
        assert!(table.lookup("this").is_none());
        assert_eq!(table.var_count(Kind::Var), 0);
        assert_eq!(table.var_count(Kind::Arg), 0);

        assert_eq!(table.lookup("size").unwrap().index, 0);
        assert_eq!(table.var_count(Kind::Field), 1);
    }

    #[test]
    fn kinds_map_to_their_segments() {
        assert_eq!(Kind::Static.segment(), Segment::Static);
        assert_eq!(Kind::Field.segment(), Segment::This);
        assert_eq!(Kind::Arg.segment(), Segment::Argument);
        assert_eq!(Kind::Var.segment(), Segment::Local);
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let table = SymbolTable::new();
        assert!(table.lookup("ghost").is_none());
    }
}

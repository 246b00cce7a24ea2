use crate::location::Location;
use std::cmp::Ordering;
use std::collections::hash_map::{Entry, HashMap};
use std::fmt;

pub type Index = u32;

// https://webassembly.github.io/spec/core/text/modules.html#indices
//
// Reference to an indexable entity. The parser produces `Name` for identifiers written in source
// and the name resolver rewrites them into `Index` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Var {
    Index(Index, Location),
    Name(String, Location),
}

impl Var {
    pub fn loc(&self) -> &Location {
        match self {
            Var::Index(_, loc) | Var::Name(_, loc) => loc,
        }
    }

    pub fn index(&self) -> Option<Index> {
        match self {
            Var::Index(idx, _) => Some(*idx),
            Var::Name(..) => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Var::Index(..) => None,
            Var::Name(name, _) => Some(name),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Var::Index(..))
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Var::Name(..))
    }

    // Overwrites the reference with a numeric index keeping its location. The name is discarded.
    pub fn set_index(&mut self, idx: Index) {
        let loc = std::mem::take(self.loc_mut());
        *self = Var::Index(idx, loc);
    }

    fn loc_mut(&mut self) -> &mut Location {
        match self {
            Var::Index(_, loc) | Var::Name(_, loc) => loc,
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Index(idx, _) => write!(f, "{}", idx),
            Var::Name(name, _) => write!(f, "${}", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub index: Index,
    pub loc: Location,
}

// Two bindings of the same name in one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redefinition {
    pub name: String,
    pub first: Binding,
    pub second: Binding,
}

impl Redefinition {
    // The binding to blame: the one appearing later in source
    pub fn later(&self) -> &Binding {
        match self.first.loc.cmp_position(&self.second.loc) {
            Ordering::Greater => &self.first,
            _ => &self.second,
        }
    }

    pub fn earlier(&self) -> &Binding {
        match self.first.loc.cmp_position(&self.second.loc) {
            Ordering::Greater => &self.second,
            _ => &self.first,
        }
    }
}

// Name to index mapping for one index space. Inserting a name twice never overwrites: the first
// binding stays live for lookups and the collision is recorded so that the name resolver can
// report it later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    bindings: HashMap<String, Binding>,
    redefinitions: Vec<Redefinition>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Returns false when the name was already bound
    pub fn insert(&mut self, name: impl Into<String>, index: Index, loc: Location) -> bool {
        match self.bindings.entry(name.into()) {
            Entry::Vacant(e) => {
                e.insert(Binding { index, loc });
                true
            }
            Entry::Occupied(e) => {
                let redef = Redefinition {
                    name: e.key().clone(),
                    first: e.get().clone(),
                    second: Binding { index, loc },
                };
                self.redefinitions.push(redef);
                false
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn index_of(&self, name: &str) -> Option<Index> {
        self.bindings.get(name).map(|b| b.index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn redefinitions(&self) -> &[Redefinition] {
        &self.redefinitions
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(n, b)| (n.as_str(), b))
    }

    // Moves every binding at or above `from` so that `from` lands on `to`. Used when the params in
    // front of the locals change after the locals were bound.
    pub fn rebase_indices(&mut self, from: Index, to: Index) {
        let rebase = |index: &mut Index| {
            if *index >= from {
                *index = *index - from + to;
            }
        };
        for binding in self.bindings.values_mut() {
            rebase(&mut binding.index);
        }
        for redef in &mut self.redefinitions {
            rebase(&mut redef.first.index);
            rebase(&mut redef.second.index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(line: u32) -> Location {
        Location::new(None, line, 1, 1)
    }

    #[test]
    fn set_index_keeps_location() {
        let mut v = Var::Name("foo".to_string(), at(3));
        assert!(v.is_name());
        assert_eq!(v.to_string(), "$foo");
        v.set_index(42);
        assert_eq!(v, Var::Index(42, at(3)));
        assert_eq!(v.index(), Some(42));
        assert_eq!(v.name(), None);
    }

    #[test]
    fn first_binding_wins() {
        let mut t = BindingTable::new();
        assert!(t.insert("a", 0, at(1)));
        assert!(t.insert("b", 1, at(2)));
        assert!(!t.insert("a", 2, at(3)));
        assert_eq!(t.index_of("a"), Some(0));
        assert_eq!(t.len(), 2);

        let redefs = t.redefinitions();
        assert_eq!(redefs.len(), 1);
        assert_eq!(redefs[0].name, "a");
        assert_eq!(redefs[0].later().loc, at(3));
        assert_eq!(redefs[0].earlier().loc, at(1));
    }

    #[test]
    fn blame_is_by_position_not_insertion_order() {
        let mut t = BindingTable::new();
        t.insert("x", 5, at(10));
        t.insert("x", 6, at(2));
        let redef = &t.redefinitions()[0];
        assert_eq!(redef.later().loc, at(10));
        assert_eq!(redef.later().index, 5);
    }

    #[test]
    fn rebase_indices() {
        let mut t = BindingTable::new();
        t.insert("l0", 0, at(1));
        t.insert("l1", 1, at(1));
        t.rebase_indices(0, 2);
        assert_eq!(t.index_of("l0"), Some(2));
        assert_eq!(t.index_of("l1"), Some(3));
        assert_eq!(t.index_of("nope"), None);

        // Params below `from` stay where they are
        let mut t = BindingTable::new();
        t.insert("p0", 0, at(1));
        t.insert("p1", 1, at(1));
        t.insert("l0", 2, at(2));
        t.insert("l0", 3, at(3));
        t.rebase_indices(2, 1);
        assert_eq!(t.index_of("p0"), Some(0));
        assert_eq!(t.index_of("p1"), Some(1));
        assert_eq!(t.index_of("l0"), Some(1));
        assert_eq!(t.redefinitions()[0].second.index, 2);
    }
}

//! Interned strings.
//!
//! Names are interned once per scanner so that repeated element and
//! attribute names share one allocation and compare cheaply.

use std::{
    collections::HashSet,
    hash::{BuildHasher, DefaultHasher, Hasher},
    rc::Rc,
};

pub type Symbol = Rc<str>;

/// Hash state seeded per table, so that the bucket of a name cannot be
/// predicted from the name alone.
#[derive(Debug, Clone, Copy)]
pub struct SeededState {
    seed: u64,
}

impl SeededState {
    pub fn new() -> Self {
        Self {
            seed: rand::random(),
        }
    }
}

impl Default for SeededState {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildHasher for SeededState {
    type Hasher = DefaultHasher;

    fn build_hasher(&self) -> DefaultHasher {
        let mut hasher = DefaultHasher::new();
        hasher.write_u64(self.seed);
        hasher
    }
}

#[derive(Debug, Default)]
pub struct XmlSymbolTable {
    symbols: HashSet<Rc<str>, SeededState>,
    // lookup key for `add_chars`
    scratch: String,
}

impl XmlSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name` and return the shared symbol.
    pub fn add_symbol(&mut self, name: &str) -> Symbol {
        if let Some(symbol) = self.symbols.get(name) {
            return symbol.clone();
        }
        let symbol: Symbol = Rc::from(name);
        self.symbols.insert(symbol.clone());
        symbol
    }

    /// Intern a name held in a character buffer.
    pub fn add_chars(&mut self, chars: &[char]) -> Symbol {
        self.scratch.clear();
        self.scratch.extend(chars);
        if let Some(symbol) = self.symbols.get(self.scratch.as_str()) {
            return symbol.clone();
        }
        let symbol: Symbol = Rc::from(self.scratch.as_str());
        self.symbols.insert(symbol.clone());
        symbol
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interned_symbols_are_shared() {
        let mut table = XmlSymbolTable::new();
        let a = table.add_symbol("root");
        let b = table.add_chars(&['r', 'o', 'o', 't']);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
        assert!(table.contains("root"));
        assert!(!table.contains("other"));
    }

    #[test]
    fn known_names_reuse_the_lookup_buffer() {
        let mut table = XmlSymbolTable::new();
        let name = ['e', 'l', 'e', 'm', 'e', 'n', 't'];
        let first = table.add_chars(&name);
        let capacity = table.scratch.capacity();
        for _ in 0..100 {
            assert!(Rc::ptr_eq(&first, &table.add_chars(&name)));
        }
        assert_eq!(table.scratch.capacity(), capacity);
        assert_eq!(table.len(), 1);

        let other = table.add_chars(&['e']);
        assert_eq!(&*other, "e");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn seeded_tables_agree_on_contents() {
        let mut a = XmlSymbolTable::new();
        let mut b = XmlSymbolTable::new();
        for name in ["x", "y", "z", "x"] {
            a.add_symbol(name);
            b.add_symbol(name);
        }
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);
        assert!(["x", "y", "z"].iter().all(|name| a.contains(name) && b.contains(name)));
    }
}

//! Unit registry
//!
//! Maps identifiers to units for the life of a loader. Entries are never
//! invalidated or removed.

use super::unit::Unit;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;
use std::path::{Path, PathBuf};
use std::rc::Rc;

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Registry hit/miss statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of registered units
    pub entries: usize,
    /// Lookups that found a unit
    pub hits: usize,
    /// Lookups that found nothing
    pub misses: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, or 0.0 before any lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of [`UnitRegistry::lookup_or_register`]
pub enum Lookup {
    /// The identifier was already registered
    Hit(Rc<Unit>),
    /// A fresh unit was registered under the identifier
    Registered(Rc<Unit>),
}

/// Identifier → unit map, in insertion order
#[derive(Default)]
pub struct UnitRegistry {
    units: IndexMap<PathBuf, Rc<Unit>, FxBuildHasher>,
    hits: usize,
    misses: usize,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a unit, counting the hit or miss
    pub fn lookup(&mut self, id: &Path) -> Option<Rc<Unit>> {
        match self.units.get(id) {
            Some(unit) => {
                self.hits += 1;
                Some(unit.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Return the unit registered under `id`, or register a new one. Counts
    /// the hit or miss like [`UnitRegistry::lookup`].
    pub fn lookup_or_register(&mut self, id: PathBuf) -> Lookup {
        if let Some(unit) = self.lookup(&id) {
            return Lookup::Hit(unit);
        }
        let unit = Rc::new(Unit::new(id.clone()));
        self.units.insert(id, unit.clone());
        Lookup::Registered(unit)
    }

    /// Look up a unit without touching the statistics
    pub fn get(&self, id: &Path) -> Option<Rc<Unit>> {
        self.units.get(id).cloned()
    }

    /// Register a unit under its identifier.
    ///
    /// Returns `false` and keeps the existing unit when the identifier is
    /// already registered.
    pub fn insert(&mut self, unit: Rc<Unit>) -> bool {
        if self.units.contains_key(unit.id()) {
            return false;
        }
        self.units.insert(unit.id().to_path_buf(), unit);
        true
    }

    pub fn contains(&self, id: &Path) -> bool {
        self.units.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Registered identifiers, oldest first
    pub fn identifiers(&self) -> Vec<PathBuf> {
        self.units.keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.units.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(path: &str) -> Rc<Unit> {
        Rc::new(Unit::new(PathBuf::from(path)))
    }

    #[test]
    fn test_lookup_counts_hits_and_misses() {
        let mut registry = UnitRegistry::new();
        assert!(registry.lookup(Path::new("/a.js")).is_none());
        registry.insert(unit("/a.js"));
        assert!(registry.lookup(Path::new("/a.js")).is_some());
        assert!(registry.lookup(Path::new("/a.js")).is_some());

        let stats = registry.stats();
        assert_eq!(stats, CacheStats { entries: 1, hits: 2, misses: 1 });
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_insert_keeps_first_unit() {
        let mut registry = UnitRegistry::new();
        let first = unit("/a.js");
        assert!(registry.insert(first.clone()));
        assert!(!registry.insert(unit("/a.js")));
        assert!(Rc::ptr_eq(&registry.get(Path::new("/a.js")).unwrap(), &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_or_register() {
        let mut registry = UnitRegistry::new();
        let first = match registry.lookup_or_register(PathBuf::from("/a.js")) {
            Lookup::Registered(unit) => unit,
            Lookup::Hit(_) => panic!("empty registry reported a hit"),
        };
        match registry.lookup_or_register(PathBuf::from("/a.js")) {
            Lookup::Hit(unit) => assert!(Rc::ptr_eq(&unit, &first)),
            Lookup::Registered(_) => panic!("identifier registered twice"),
        }
        assert_eq!(registry.stats(), CacheStats { entries: 1, hits: 1, misses: 1 });
    }

    #[test]
    fn test_identifiers_in_insertion_order() {
        let mut registry = UnitRegistry::new();
        for path in ["/z.js", "/a.json", "/m.js"] {
            registry.insert(unit(path));
        }
        assert_eq!(
            registry.identifiers(),
            vec![PathBuf::from("/z.js"), PathBuf::from("/a.json"), PathBuf::from("/m.js")]
        );
        assert!(registry.contains(Path::new("/a.json")));
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_empty_stats() {
        let registry = UnitRegistry::new();
        assert_eq!(registry.stats().hit_rate(), 0.0);
        assert!(registry.is_empty());
    }
}

use crate::core::graph::element::ElementId;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::sync::atomic::{AtomicU64, Ordering};

static GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Per-element geometry keyed by element id.
///
/// Every mutating call draws a fresh, process-wide unique generation number.
/// Caches derived from a store record the generation they were computed at;
/// a cache entry is valid only while the generation is unchanged, so a
/// mutation and the invalidation of everything derived from it are the same
/// step.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStore<T> {
    entries: BTreeMap<ElementId, T>,
    generation: u64,
}

impl<T> Default for ElementStore<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            generation: next_generation(),
        }
    }
}

impl<T> ElementStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = next_generation();
    }

    pub fn get(&self, id: &ElementId) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &ElementId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in element order.
    pub fn iter(&self) -> btree_map::Iter<'_, ElementId, T> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ElementId> {
        self.entries.keys()
    }

    pub fn insert(&mut self, id: ElementId, value: T) -> Option<T> {
        self.touch();
        self.entries.insert(id, value)
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<T> {
        self.touch();
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.touch();
        self.entries.clear();
    }

    /// Applies `f` to every stored value in place.
    pub fn update_all(&mut self, mut f: impl FnMut(&ElementId, &mut T)) {
        self.touch();
        for (id, value) in self.entries.iter_mut() {
            f(id, value);
        }
    }

    /// Renames entries; ids absent from `mapping` keep their name.
    pub fn rename(&mut self, mapping: &BTreeMap<ElementId, ElementId>) {
        self.touch();
        let entries = std::mem::take(&mut self.entries);
        self.entries = entries
            .into_iter()
            .map(|(id, v)| (mapping.get(&id).copied().unwrap_or(id), v))
            .collect();
    }
}

/// The two endpoints of every element.
pub type CoordinateStore = ElementStore<(Point3<f64>, Point3<f64>)>;

/// The base-pair orientation vectors at both ends of every stem.
pub type TwistStore = ElementStore<(Vector3<f64>, Vector3<f64>)>;

/// Stored per-residue positions of single-stranded elements, in define order.
pub type VresStore = ElementStore<Vec<Point3<f64>>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mutation_draws_a_new_generation() {
        let mut store = CoordinateStore::new();
        let g0 = store.generation();
        store.insert(ElementId::stem(0), (Point3::origin(), Point3::new(0.0, 0.0, 1.0)));
        let g1 = store.generation();
        assert_ne!(g0, g1);
        store.update_all(|_, (a, _)| a.x += 1.0);
        assert_ne!(g1, store.generation());
    }

    #[test]
    fn reads_do_not_change_generation() {
        let mut store = TwistStore::new();
        store.insert(ElementId::stem(0), (Vector3::x(), Vector3::y()));
        let g = store.generation();
        let _ = store.get(&ElementId::stem(0));
        let _ = store.iter().count();
        assert_eq!(g, store.generation());
    }

    #[test]
    fn independent_stores_never_share_a_generation() {
        let a = VresStore::new();
        let b = VresStore::new();
        assert_ne!(a.generation(), b.generation());
    }
}

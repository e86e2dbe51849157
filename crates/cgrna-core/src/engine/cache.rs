use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};

/// Virtual atom positions of one residue, keyed by atom name.
pub type VirtualAtoms = BTreeMap<String, Point3<f64>>;

/// Generations of the stores a cache entry was derived from:
/// coordinates, twists, and stored loop residue positions.
pub type Stamp = (u64, u64, u64);

/// Lazily filled virtual atoms per residue.
///
/// The whole cache belongs to a single stamp. Presenting a different stamp
/// drops every entry before anything is read.
#[derive(Debug, Default, Clone)]
pub struct VirtualAtomCache {
    stamp: Option<Stamp>,
    data: HashMap<usize, VirtualAtoms>,
}

impl VirtualAtomCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the cache unless it was filled under `stamp`.
    pub fn validate(&mut self, stamp: Stamp) {
        if self.stamp != Some(stamp) {
            self.data.clear();
            self.stamp = Some(stamp);
        }
    }

    pub fn insert(&mut self, residue: usize, atoms: VirtualAtoms) {
        self.data.insert(residue, atoms);
    }

    pub fn get(&self, residue: usize) -> Option<&VirtualAtoms> {
        self.data.get(&residue)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

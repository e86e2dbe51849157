use super::cache::{Stamp, VirtualAtomCache};
use super::error::ModelError;
use super::store::{CoordinateStore, TwistStore, VresStore};
use crate::core::graph::bulge_graph::BulgeGraph;
use crate::core::graph::element::ElementId;
use crate::core::graph::error::GraphError;
use nalgebra::{Point3, Vector3};
use std::cell::{RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};

/// A coarse-grained 3D model of one RNA molecule.
///
/// Every element of the secondary-structure graph is represented by a line
/// segment (`coords`), and every stem additionally carries one orientation
/// vector per end (`twists`). Until every element has coordinates the model is
/// "under construction": graph queries work, geometric queries report
/// [`ModelError::MissingCoordinates`].
#[derive(Debug, Clone)]
pub struct CoarseGrainRna {
    graph: BulgeGraph,
    coords: CoordinateStore,
    twists: TwistStore,
    vres: VresStore,
    longrange: BTreeSet<(ElementId, ElementId)>,
    project_from: Option<Vector3<f64>>,
    sampled: BTreeMap<ElementId, Vec<String>>,
    embed_vres: bool,
    cache: RefCell<VirtualAtomCache>,
}

impl CoarseGrainRna {
    /// Wraps a graph in a model with no geometry.
    pub fn from_graph(graph: BulgeGraph) -> Self {
        Self {
            graph,
            coords: CoordinateStore::new(),
            twists: TwistStore::new(),
            vres: VresStore::new(),
            longrange: BTreeSet::new(),
            project_from: None,
            sampled: BTreeMap::new(),
            embed_vres: false,
            cache: RefCell::new(VirtualAtomCache::new()),
        }
    }

    /// A graph-only model built from dot-bracket notation.
    ///
    /// # Arguments
    ///
    /// * `dotbracket` - The secondary structure, with `&` between strands.
    /// * `seq` - Optional sequence of matching length; `N`s are used otherwise.
    pub fn from_dotbracket(dotbracket: &str, seq: Option<&str>) -> Result<Self, GraphError> {
        Ok(Self::from_graph(BulgeGraph::from_dotbracket(dotbracket, seq)?))
    }

    pub fn graph(&self) -> &BulgeGraph {
        &self.graph
    }

    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.graph.set_name(name);
    }

    pub fn seq_length(&self) -> usize {
        self.graph.seq_length()
    }

    pub fn total_length(&self) -> usize {
        self.graph.total_length()
    }

    pub fn coords(&self) -> &CoordinateStore {
        &self.coords
    }

    pub fn twists(&self) -> &TwistStore {
        &self.twists
    }

    pub fn vres(&self) -> &VresStore {
        &self.vres
    }

    pub(crate) fn coords_mut(&mut self) -> &mut CoordinateStore {
        &mut self.coords
    }

    pub(crate) fn twists_mut(&mut self) -> &mut TwistStore {
        &mut self.twists
    }

    pub(crate) fn vres_mut(&mut self) -> &mut VresStore {
        &mut self.vres
    }

    fn ensure_element(&self, id: ElementId) -> Result<(), ModelError> {
        if self.graph.contains(id) {
            Ok(())
        } else {
            Err(ModelError::UnknownElement(id))
        }
    }

    /// Sets the endpoints of an element.
    pub fn set_coords(
        &mut self,
        id: ElementId,
        start: Point3<f64>,
        end: Point3<f64>,
    ) -> Result<(), ModelError> {
        self.ensure_element(id)?;
        self.coords.insert(id, (start, end));
        Ok(())
    }

    /// Sets the twist vectors of a stem. The stem must already have
    /// coordinates.
    pub fn set_twists(
        &mut self,
        stem: ElementId,
        first: Vector3<f64>,
        last: Vector3<f64>,
    ) -> Result<(), ModelError> {
        self.ensure_element(stem)?;
        if !stem.is_stem() {
            return Err(ModelError::NotAStem(stem));
        }
        if !self.coords.contains(&stem) {
            return Err(ModelError::MissingCoordinates(stem));
        }
        self.twists.insert(stem, (first, last));
        Ok(())
    }

    /// Stores explicit virtual residue positions for a single-stranded
    /// element, one per residue in define order.
    pub fn set_loop_positions(
        &mut self,
        id: ElementId,
        positions: Vec<Point3<f64>>,
    ) -> Result<(), ModelError> {
        let expected = self.graph.define_residue_num_iterator(id)?.len();
        if id.is_stem() {
            return Err(ModelError::UnknownElement(id));
        }
        if positions.len() != expected {
            return Err(ModelError::LengthMismatch {
                expected,
                found: positions.len(),
            });
        }
        self.vres.insert(id, positions);
        Ok(())
    }

    pub fn coords_of(&self, id: ElementId) -> Result<(Point3<f64>, Point3<f64>), ModelError> {
        self.ensure_element(id)?;
        self.coords
            .get(&id)
            .copied()
            .ok_or(ModelError::MissingCoordinates(id))
    }

    pub fn twists_of(&self, stem: ElementId) -> Result<(Vector3<f64>, Vector3<f64>), ModelError> {
        self.ensure_element(stem)?;
        self.twists
            .get(&stem)
            .copied()
            .ok_or(ModelError::MissingTwist(stem))
    }

    /// Whether every element has coordinates and every stem has twists.
    pub fn is_complete(&self) -> bool {
        self.graph.elements().all(|id| {
            self.coords.contains(&id) && (!id.is_stem() || self.twists.contains(&id))
        })
    }

    /// Drops all geometry, returning the model to its graph-only state.
    pub fn clear_coords(&mut self) {
        self.coords.clear();
        self.twists.clear();
        self.vres.clear();
        self.embed_vres = false;
    }

    /// Records a tertiary contact between two elements.
    pub fn add_longrange(&mut self, a: ElementId, b: ElementId) -> Result<(), ModelError> {
        self.ensure_element(a)?;
        self.ensure_element(b)?;
        if a == b {
            return Err(ModelError::SelfInteraction(a));
        }
        self.longrange.insert((a.min(b), a.max(b)));
        Ok(())
    }

    /// Recorded tertiary contacts, each pair once with the smaller id first.
    pub fn longrange_iterator(&self) -> impl Iterator<Item = (ElementId, ElementId)> + '_ {
        self.longrange.iter().copied()
    }

    /// Viewing direction used when projecting the model onto a plane.
    pub fn project_from(&self) -> Option<Vector3<f64>> {
        self.project_from
    }

    pub fn set_project_from(&mut self, direction: Option<Vector3<f64>>) {
        self.project_from = direction;
    }

    pub(crate) fn project_from_mut(&mut self) -> &mut Option<Vector3<f64>> {
        &mut self.project_from
    }

    /// Opaque per-element sampling annotations carried through files.
    pub fn sampled(&self) -> &BTreeMap<ElementId, Vec<String>> {
        &self.sampled
    }

    pub fn set_sampled(&mut self, id: ElementId, fields: Vec<String>) -> Result<(), ModelError> {
        self.ensure_element(id)?;
        self.sampled.insert(id, fields);
        Ok(())
    }

    /// Whether serialization writes a virtual residue block.
    pub fn embeds_virtual_residues(&self) -> bool {
        self.embed_vres
    }

    pub(crate) fn set_embed_virtual_residues(&mut self, embed: bool) {
        self.embed_vres = embed;
    }

    pub(crate) fn replace_longrange(&mut self, longrange: BTreeSet<(ElementId, ElementId)>) {
        self.longrange = longrange;
    }

    pub(crate) fn replace_sampled(&mut self, sampled: BTreeMap<ElementId, Vec<String>>) {
        self.sampled = sampled;
    }

    fn stamp(&self) -> Stamp {
        (
            self.coords.generation(),
            self.twists.generation(),
            self.vres.generation(),
        )
    }

    /// The virtual atom cache, emptied first if any geometry changed since it
    /// was filled.
    pub(crate) fn cache(&self) -> RefMut<'_, VirtualAtomCache> {
        let mut cache = self.cache.borrow_mut();
        cache.validate(self.stamp());
        cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ElementId {
        s.parse().unwrap()
    }

    fn hairpin() -> CoarseGrainRna {
        CoarseGrainRna::from_dotbracket("((((....))))", Some("GGGGAAAACCCC")).unwrap()
    }

    mod geometry_state {
        use super::*;

        #[test]
        fn fresh_model_is_under_construction() {
            let cg = hairpin();
            assert!(!cg.is_complete());
            assert_eq!(
                cg.coords_of(id("s0")),
                Err(ModelError::MissingCoordinates(id("s0")))
            );
        }

        #[test]
        fn twists_require_coordinates_and_a_stem() {
            let mut cg = hairpin();
            assert_eq!(
                cg.set_twists(id("s0"), Vector3::x(), Vector3::y()),
                Err(ModelError::MissingCoordinates(id("s0")))
            );
            cg.set_coords(id("h0"), Point3::origin(), Point3::new(1.0, 0.0, 0.0))
                .unwrap();
            assert_eq!(
                cg.set_twists(id("h0"), Vector3::x(), Vector3::y()),
                Err(ModelError::NotAStem(id("h0")))
            );
        }

        #[test]
        fn complete_after_all_elements_are_placed() {
            let mut cg = hairpin();
            cg.set_coords(id("s0"), Point3::origin(), Point3::new(0.0, 0.0, 8.4))
                .unwrap();
            cg.set_twists(id("s0"), Vector3::x(), Vector3::y()).unwrap();
            assert!(!cg.is_complete());
            cg.set_coords(id("h0"), Point3::new(0.0, 0.0, 8.4), Point3::new(0.0, 0.0, 14.0))
                .unwrap();
            assert!(cg.is_complete());
            cg.clear_coords();
            assert!(cg.coords().is_empty());
            assert!(cg.twists().is_empty());
        }

        #[test]
        fn unknown_elements_are_rejected() {
            let mut cg = hairpin();
            assert_eq!(
                cg.set_coords(id("i3"), Point3::origin(), Point3::origin()),
                Err(ModelError::UnknownElement(id("i3")))
            );
        }

        #[test]
        fn loop_positions_must_match_residue_count() {
            let mut cg = hairpin();
            assert_eq!(
                cg.set_loop_positions(id("h0"), vec![Point3::origin(); 3]),
                Err(ModelError::LengthMismatch {
                    expected: 4,
                    found: 3
                })
            );
            cg.set_loop_positions(id("h0"), vec![Point3::origin(); 4])
                .unwrap();
            assert_eq!(cg.vres().get(&id("h0")).map(Vec::len), Some(4));
        }
    }

    mod longrange {
        use super::*;

        #[test]
        fn pairs_are_stored_once_in_order() {
            let mut cg = CoarseGrainRna::from_dotbracket("((..))..((..))", None).unwrap();
            cg.add_longrange(id("h1"), id("h0")).unwrap();
            cg.add_longrange(id("h0"), id("h1")).unwrap();
            let pairs: Vec<_> = cg.longrange_iterator().collect();
            assert_eq!(pairs, vec![(id("h0"), id("h1"))]);
        }

        #[test]
        fn self_interaction_is_an_error() {
            let mut cg = hairpin();
            assert_eq!(
                cg.add_longrange(id("h0"), id("h0")),
                Err(ModelError::SelfInteraction(id("h0")))
            );
        }
    }

    #[test]
    fn cache_is_emptied_by_any_geometry_change() {
        let mut cg = hairpin();
        cg.cache().insert(1, Default::default());
        assert_eq!(cg.cache().len(), 1);
        cg.set_coords(id("h0"), Point3::origin(), Point3::origin())
            .unwrap();
        assert!(cg.cache().is_empty());
    }
}

//! Reconstruction of approximate atom positions from the coarse-grained
//! representation.
//!
//! Stem residues are placed by an idealized A-form template attached to a
//! per-base-pair frame. The frame of base pair `k` sits on the helix axis,
//! interpolated between the stem endpoints, and its in-plane direction is the
//! first twist vector rotated about the axis by a proportional share of the
//! total twist between the two ends. Loop residues are either stored
//! explicitly or spread evenly along their element's segment.

use super::cache::VirtualAtoms;
use super::error::ModelError;
use super::model::CoarseGrainRna;
use crate::core::graph::element::ElementId;
use crate::core::utils::geometry::{any_perpendicular, signed_angle_about, vector_rejection};
use nalgebra::{Point3, Rotation3, Unit, Vector3};
use std::f64::consts::PI;

/// Rise per base pair along the helix axis, in Ångström.
pub const HELIX_RISE: f64 = 2.81;
/// Rotation per base pair about the helix axis, in degrees.
pub const HELIX_TWIST: f64 = 32.7;

/// Template positions for a strand-one residue in the base-pair frame,
/// given as components along (twist, axis x twist, axis). Strand-two
/// residues use the image under the base-pair dyad.
const BACKBONE_TEMPLATE: [(&str, [f64; 3]); 3] = [
    ("C1'", [C1_TWIST_OFFSET, -5.346, 0.0]),
    ("C4'", [5.2, -7.2, -0.8]),
    ("P", [3.04, -8.36, -2.0]),
];
/// Distance from the helix axis to the C1' midpoint of a base pair, along
/// the twist vector.
pub const C1_TWIST_OFFSET: f64 = 6.879;
const GLYCOSIDIC_N_TEMPLATE: [f64; 3] = [5.7, -4.4, 0.0];

/// The local frame of one base pair.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BasePairFrame {
    pub origin: Point3<f64>,
    /// Unit vector from the axis toward the C1' midpoint.
    pub twist: Vector3<f64>,
    /// Unit helix axis, pointing along strand one.
    pub axis: Vector3<f64>,
}

impl BasePairFrame {
    fn place(&self, local: &[f64; 3], second_strand: bool) -> Point3<f64> {
        let lateral = self.axis.cross(&self.twist);
        let sign = if second_strand { -1.0 } else { 1.0 };
        self.origin + self.twist * local[0] + lateral * (sign * local[1]) + self.axis * (sign * local[2])
    }

    /// Template atoms of the residue on either strand of this base pair.
    pub fn residue_atoms(&self, second_strand: bool, purine: bool) -> VirtualAtoms {
        let mut atoms: VirtualAtoms = BACKBONE_TEMPLATE
            .iter()
            .map(|(name, local)| (name.to_string(), self.place(local, second_strand)))
            .collect();
        let n_name = if purine { "N9" } else { "N1" };
        atoms.insert(
            n_name.to_string(),
            self.place(&GLYCOSIDIC_N_TEMPLATE, second_strand),
        );
        atoms
    }
}

/// Base-pair frames of a stem from its endpoints and twists.
pub(crate) struct StemFrames {
    start: Point3<f64>,
    end: Point3<f64>,
    axis: Vector3<f64>,
    first_twist: Vector3<f64>,
    total_angle: f64,
    length: usize,
}

impl StemFrames {
    pub fn new(
        (start, end): (Point3<f64>, Point3<f64>),
        (twist0, twist1): (Vector3<f64>, Vector3<f64>),
        length: usize,
    ) -> Self {
        let axis = (end - start)
            .try_normalize(1e-9)
            .unwrap_or_else(|| any_perpendicular(&twist0));
        let first_twist = vector_rejection(&twist0, &axis)
            .try_normalize(1e-9)
            .unwrap_or_else(|| any_perpendicular(&axis));
        let last_twist = vector_rejection(&twist1, &axis)
            .try_normalize(1e-9)
            .unwrap_or(first_twist);

        let total_angle = if length > 1 {
            let measured = signed_angle_about(&first_twist, &last_twist, &axis);
            let expected = ((length - 1) as f64 * HELIX_TWIST).to_radians();
            measured + 2.0 * PI * ((expected - measured) / (2.0 * PI)).round()
        } else {
            0.0
        };

        Self {
            start,
            end,
            axis,
            first_twist,
            total_angle,
            length,
        }
    }

    pub fn frame(&self, k: usize) -> BasePairFrame {
        let fraction = if self.length > 1 {
            k as f64 / (self.length - 1) as f64
        } else {
            0.5
        };
        let rotation = Rotation3::from_axis_angle(&Unit::new_unchecked(self.axis), self.total_angle * fraction);
        BasePairFrame {
            origin: self.start + (self.end - self.start) * fraction,
            twist: rotation * self.first_twist,
            axis: self.axis,
        }
    }
}

impl CoarseGrainRna {
    fn is_purine(&self, residue: usize) -> bool {
        matches!(
            self.graph().seq().as_bytes().get(residue - 1),
            Some(b'A' | b'G' | b'a' | b'g')
        )
    }

    fn compute_virtual_atoms(&self, residue: usize) -> Result<VirtualAtoms, ModelError> {
        let element = self.graph().get_node_from_residue_num(residue)?;
        if element.is_stem() {
            let define = self.graph().define(element)?;
            let length = define[1] + 1 - define[0];
            let frames = StemFrames::new(
                self.coords_of(element)?,
                self.twists_of(element)?,
                length,
            );
            let (k, second_strand) = if residue <= define[1] {
                (residue - define[0], false)
            } else {
                (define[3] - residue, true)
            };
            return Ok(frames
                .frame(k)
                .residue_atoms(second_strand, self.is_purine(residue)));
        }

        let position = self.loop_residue_position(element, residue)?;
        Ok([("C1'".to_string(), position)].into())
    }

    fn loop_residue_position(
        &self,
        element: ElementId,
        residue: usize,
    ) -> Result<Point3<f64>, ModelError> {
        let residues = self.graph().define_residue_num_iterator(element)?;
        let index = residues
            .iter()
            .position(|&r| r == residue)
            .ok_or(ModelError::ResidueOutOfRange {
                residue,
                length: self.seq_length(),
            })?;
        if let Some(stored) = self.vres().get(&element) {
            if let Some(p) = stored.get(index) {
                return Ok(*p);
            }
        }
        let (start, end) = self.coords_of(element)?;
        let fraction = (index + 1) as f64 / (residues.len() + 1) as f64;
        Ok(start + (end - start) * fraction)
    }

    /// Approximate atom positions of one residue (1-based).
    ///
    /// Stem residues get C1', C4', P and their glycosidic nitrogen; loop
    /// residues get C1' only. Results are cached until the geometry changes.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ResidueOutOfRange`] for residues outside the
    /// molecule and a missing-geometry error when the owning element has not
    /// been placed.
    pub fn virtual_atoms(&self, residue: usize) -> Result<VirtualAtoms, ModelError> {
        if residue == 0 || residue > self.seq_length() {
            return Err(ModelError::ResidueOutOfRange {
                residue,
                length: self.seq_length(),
            });
        }
        if let Some(atoms) = self.cache().get(residue) {
            return Ok(atoms.clone());
        }
        let atoms = self.compute_virtual_atoms(residue)?;
        self.cache().insert(residue, atoms.clone());
        Ok(atoms)
    }

    /// The virtual residue position (C1') of one residue.
    pub fn virtual_residue_pos(&self, residue: usize) -> Result<Point3<f64>, ModelError> {
        let atoms = self.virtual_atoms(residue)?;
        atoms
            .get("C1'")
            .copied()
            .ok_or(ModelError::ResidueOutOfRange {
                residue,
                length: self.seq_length(),
            })
    }

    /// Virtual residue positions of every residue in sequence order.
    pub fn get_ordered_virtual_residue_poss(&self) -> Result<Vec<Point3<f64>>, ModelError> {
        (1..=self.seq_length())
            .map(|r| self.virtual_residue_pos(r))
            .collect()
    }

    /// Virtual residue positions of paired residues only, in sequence order.
    pub fn stem_virtual_residue_poss(&self) -> Result<Vec<Point3<f64>>, ModelError> {
        let mut residues: Vec<usize> = Vec::new();
        for stem in self.graph().stem_iterator() {
            residues.extend(self.graph().define_residue_num_iterator(stem)?);
        }
        residues.sort_unstable();
        residues
            .into_iter()
            .map(|r| self.virtual_residue_pos(r))
            .collect()
    }

    /// Computes the virtual positions of every residue up front, fixes loop
    /// positions in the stored block, and marks the model so that they are
    /// written out when serialized.
    pub fn add_all_virtual_residues(&mut self) -> Result<(), ModelError> {
        let loops: Vec<ElementId> = self
            .graph()
            .elements()
            .filter(|e| !e.is_stem() && !self.vres().contains(e))
            .collect();
        for element in loops {
            let positions = self
                .graph()
                .define_residue_num_iterator(element)?
                .into_iter()
                .map(|r| self.loop_residue_position(element, r))
                .collect::<Result<Vec<_>, _>>()?;
            if !positions.is_empty() {
                self.vres_mut().insert(element, positions);
            }
        }
        for residue in 1..=self.seq_length() {
            self.virtual_atoms(residue)?;
        }
        self.set_embed_virtual_residues(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ElementId {
        s.parse().unwrap()
    }

    /// A four base pair hairpin along +z with an idealized twist.
    fn built_hairpin() -> CoarseGrainRna {
        let mut cg = CoarseGrainRna::from_dotbracket("((((....))))", Some("GGGAAAAAUCCC")).unwrap();
        let top = 3.0 * HELIX_RISE;
        cg.set_coords(id("s0"), Point3::origin(), Point3::new(0.0, 0.0, top))
            .unwrap();
        let last = Rotation3::from_axis_angle(&Vector3::z_axis(), (3.0 * HELIX_TWIST).to_radians())
            * Vector3::x();
        cg.set_twists(id("s0"), Vector3::x(), last).unwrap();
        cg.set_coords(id("h0"), Point3::new(0.0, 0.0, top), Point3::new(0.0, 0.0, top + 10.0))
            .unwrap();
        cg
    }

    mod stems {
        use super::*;

        #[test]
        fn paired_residues_are_a_base_pair_apart() {
            let cg = built_hairpin();
            let d = (cg.virtual_residue_pos(1).unwrap() - cg.virtual_residue_pos(12).unwrap()).norm();
            assert!(d > 8.0 && d < 25.0, "pair distance {}", d);
        }

        #[test]
        fn stacked_residues_are_closer_than_paired_ones() {
            let cg = built_hairpin();
            let stacked = (cg.virtual_residue_pos(1).unwrap() - cg.virtual_residue_pos(2).unwrap()).norm();
            let paired = (cg.virtual_residue_pos(1).unwrap() - cg.virtual_residue_pos(12).unwrap()).norm();
            assert!(stacked > 2.0 && stacked < 10.0, "stack distance {}", stacked);
            assert!((stacked - paired).abs() > 1.0);
        }

        #[test]
        fn first_pair_sits_at_the_stem_start() {
            let cg = built_hairpin();
            let p1 = cg.virtual_residue_pos(1).unwrap();
            let p12 = cg.virtual_residue_pos(12).unwrap();
            let mid = Point3::from((p1.coords + p12.coords) / 2.0);
            assert!(mid.z.abs() < 1e-9);
            assert!((mid.x - 6.879).abs() < 1e-9);
        }

        #[test]
        fn stem_residues_carry_their_glycosidic_nitrogen() {
            let cg = built_hairpin();
            assert!(cg.virtual_atoms(1).unwrap().contains_key("N9"));
            assert!(cg.virtual_atoms(12).unwrap().contains_key("N1"));
        }

        #[test]
        fn single_pair_stem_uses_its_midpoint() {
            let mut cg = CoarseGrainRna::from_dotbracket("(...)", None).unwrap();
            cg.set_coords(id("s0"), Point3::new(0.0, 0.0, -1.0), Point3::new(0.0, 0.0, 1.0))
                .unwrap();
            cg.set_twists(id("s0"), Vector3::x(), Vector3::x()).unwrap();
            let p1 = cg.virtual_residue_pos(1).unwrap();
            assert!(p1.z.abs() < 1e-9);
        }
    }

    mod loops {
        use super::*;

        #[test]
        fn loop_residues_are_spread_along_the_element() {
            let cg = built_hairpin();
            let top = 3.0 * HELIX_RISE;
            let zs: Vec<f64> = (5..=8).map(|r| cg.virtual_residue_pos(r).unwrap().z).collect();
            for (i, z) in zs.iter().enumerate() {
                assert!((z - (top + 2.0 * (i + 1) as f64)).abs() < 1e-9);
            }
        }

        #[test]
        fn stored_positions_take_precedence() {
            let mut cg = built_hairpin();
            let stored: Vec<Point3<f64>> = (0..4).map(|i| Point3::new(i as f64, 1.0, 1.0)).collect();
            cg.set_loop_positions(id("h0"), stored.clone()).unwrap();
            assert_eq!(cg.virtual_residue_pos(7).unwrap(), stored[2]);
        }
    }

    mod caching {
        use super::*;

        #[test]
        fn moving_an_element_invalidates_cached_atoms() {
            let mut cg = built_hairpin();
            let before = cg.virtual_residue_pos(6).unwrap();
            let (s, e) = cg.coords_of(id("h0")).unwrap();
            cg.set_coords(id("h0"), s, e + Vector3::new(5.0, 0.0, 0.0))
                .unwrap();
            let after = cg.virtual_residue_pos(6).unwrap();
            assert!((before - after).norm() > 1.0);
        }

        #[test]
        fn changing_stem_geometry_moves_its_residues() {
            let mut cg = built_hairpin();
            let first = cg.virtual_atoms(2).unwrap();
            assert_eq!(cg.virtual_atoms(2).unwrap(), first);

            let (t0, t1) = cg.twists_of(id("s0")).unwrap();
            let quarter = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
            cg.set_twists(id("s0"), quarter * t0, quarter * t1).unwrap();
            let twisted = cg.virtual_atoms(2).unwrap();
            assert!((twisted["C1'"] - first["C1'"]).norm() > 1.0);

            let (s, e) = cg.coords_of(id("s0")).unwrap();
            let shift = Vector3::new(0.0, 4.0, 0.0);
            cg.set_coords(id("s0"), s + shift, e + shift).unwrap();
            let moved = cg.virtual_atoms(2).unwrap();
            assert!((moved["C1'"] - (twisted["C1'"] + shift)).norm() < 1e-9);
            assert_eq!(cg.virtual_atoms(2).unwrap(), moved);
        }

        #[test]
        fn add_all_virtual_residues_fixes_loop_positions() {
            let mut cg = built_hairpin();
            let expected = cg.get_ordered_virtual_residue_poss().unwrap();
            cg.add_all_virtual_residues().unwrap();
            assert!(cg.embeds_virtual_residues());
            assert_eq!(cg.vres().get(&id("h0")).map(Vec::len), Some(4));
            assert_eq!(cg.get_ordered_virtual_residue_poss().unwrap(), expected);
        }
    }

    #[test]
    fn errors_for_missing_geometry_and_bad_residues() {
        let cg = CoarseGrainRna::from_dotbracket("((..))", None).unwrap();
        assert_eq!(
            cg.virtual_residue_pos(0),
            Err(ModelError::ResidueOutOfRange {
                residue: 0,
                length: 6
            })
        );
        assert_eq!(
            cg.virtual_residue_pos(1),
            Err(ModelError::MissingCoordinates(id("s0")))
        );
    }
}

use super::error::ModelError;
use super::model::CoarseGrainRna;
use crate::core::graph::element::{ElementId, ElementKind};
use crate::core::utils::geometry::{
    centroid, change_basis, orthonormal_basis, rotation_to_align, segment_distance,
    signed_angle_about, spherical_coordinates,
};
use nalgebra::{Point3, Rotation3, Vector3};
use std::f64::consts::PI;

/// Size reported for the missing second strand of a multiloop segment.
pub const MULTILOOP_PLACEHOLDER_DIMENSION: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RogMethod {
    /// Element endpoints only.
    #[default]
    Fast,
    /// One virtual residue per nucleotide.
    Vres,
}

/// Orientation of one stem relative to another across a junction.
///
/// Angles are in radians, distances in Ångström. `(u, v)` place the second
/// stem's direction and `(r1, u1, v1)` its attachment point in the frame of
/// the first stem; `t` is the twist of the second stem about its own axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleStat {
    pub stem1: ElementId,
    pub stem2: ElementId,
    pub bulge: ElementId,
    pub ang_type: i32,
    pub dims: (usize, usize),
    pub u: f64,
    pub v: f64,
    pub t: f64,
    pub r1: f64,
    pub u1: f64,
    pub v1: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StemStat {
    pub stem: ElementId,
    pub bp_length: usize,
    pub phys_length: f64,
    /// Rotation from the first to the last twist vector about the stem axis.
    pub twist_angle: f64,
    pub define: Vec<usize>,
}

/// Geometry of a hairpin or terminal strand relative to the stem it hangs
/// from. An element with no stem, or of zero extent, has `u = v = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStat {
    pub element: ElementId,
    pub length: usize,
    pub phys_length: f64,
    pub u: f64,
    pub v: f64,
}

type Basis = (Vector3<f64>, Vector3<f64>, Vector3<f64>);

fn end_of(coords: &(Point3<f64>, Point3<f64>), index: usize) -> Point3<f64> {
    if index == 0 { coords.0 } else { coords.1 }
}

fn twist_of(twists: &(Vector3<f64>, Vector3<f64>), index: usize) -> Vector3<f64> {
    if index == 0 { twists.0 } else { twists.1 }
}

impl CoarseGrainRna {
    /// Radius of gyration of the model.
    ///
    /// Returns `NaN` for a model without spatial extent.
    pub fn radius_of_gyration(&self, method: RogMethod) -> Result<f64, ModelError> {
        let points = match method {
            RogMethod::Fast => {
                let mut points = Vec::new();
                for id in self.graph().elements() {
                    let (a, b) = self.coords_of(id)?;
                    points.extend([a, b]);
                }
                points
            }
            RogMethod::Vres => self.get_ordered_virtual_residue_poss()?,
        };
        let Some(center) = centroid(&points) else {
            return Ok(f64::NAN);
        };
        let rog = (points.iter().map(|p| (p - center).norm_squared()).sum::<f64>()
            / points.len() as f64)
            .sqrt();
        Ok(if rog > 0.0 { rog } else { f64::NAN })
    }

    /// Shortest distance between the segments of two elements.
    pub fn element_physical_distance(&self, a: ElementId, b: ElementId) -> Result<f64, ModelError> {
        let (a0, a1) = self.coords_of(a)?;
        let (b0, b1) = self.coords_of(b)?;
        Ok(segment_distance(&a0, &a1, &b0, &b1))
    }

    /// Frame of `stem` seen from `elem`: x along the stem toward `elem`,
    /// y along the twist at that end.
    fn stem_basis(&self, stem: ElementId, elem: ElementId) -> Result<(Basis, usize), ModelError> {
        let (near, far) = self.graph().get_sides(stem, elem)?;
        let coords = self.coords_of(stem)?;
        let twists = self.twists_of(stem)?;
        let axis = end_of(&coords, near) - end_of(&coords, far);
        let basis = orthonormal_basis(&axis, &twist_of(&twists, near))
            .or_else(|| orthonormal_basis(&Vector3::x(), &twist_of(&twists, near)))
            .ok_or(ModelError::MissingCoordinates(stem))?;
        Ok((basis, near))
    }

    fn angle_stat(
        &self,
        stem1: ElementId,
        stem2: ElementId,
        bulge: ElementId,
        dims: (usize, usize),
    ) -> Result<AngleStat, ModelError> {
        let (basis, near1) = self.stem_basis(stem1, bulge)?;
        let (near2, far2) = self.graph().get_sides(stem2, bulge)?;
        let coords1 = self.coords_of(stem1)?;
        let coords2 = self.coords_of(stem2)?;
        let twists2 = self.twists_of(stem2)?;

        let stem2_vec = change_basis(&(end_of(&coords2, far2) - end_of(&coords2, near2)), &basis);
        let (_, u, v) = spherical_coordinates(&stem2_vec);

        let twist2 = change_basis(&twist_of(&twists2, near2), &basis);
        let align = rotation_to_align(&stem2_vec, &Vector3::x()).unwrap_or_else(|| {
            Rotation3::from_axis_angle(&Vector3::z_axis(), PI)
        });
        let aligned = align * twist2;
        let t = aligned.z.atan2(aligned.y);

        let bulge_vec = change_basis(&(end_of(&coords2, near2) - end_of(&coords1, near1)), &basis);
        let (r1, u1, v1) = spherical_coordinates(&bulge_vec);

        Ok(AngleStat {
            stem1,
            stem2,
            bulge,
            ang_type: self.graph().connection_type(bulge, stem1, stem2)?,
            dims,
            u,
            v,
            t,
            r1,
            u1,
            v1,
        })
    }

    fn bulge_dimensions(&self, bulge: ElementId) -> Result<(usize, usize), ModelError> {
        let segments = self.graph().segments(bulge);
        let size = |i: usize| {
            segments
                .get(i)
                .and_then(|s| Some(s.next? - s.prev? - 1))
                .unwrap_or(0)
        };
        Ok(match bulge.kind {
            ElementKind::Interior => (size(0), size(1)),
            ElementKind::Multiloop => (size(0), MULTILOOP_PLACEHOLDER_DIMENSION),
            _ => return Err(ModelError::NotAdjacent(bulge, bulge)),
        })
    }

    /// Angle statistics across a junction in both directions, forward first.
    ///
    /// Defined for every interior loop and multiloop segment joining two
    /// placed stems, including zero-length ones.
    pub fn get_bulge_angle_stats(&self, bulge: ElementId) -> Result<(AngleStat, AngleStat), ModelError> {
        let stems = self.graph().connections(bulge)?;
        let [stem1, stem2] = stems.as_slice() else {
            return Err(ModelError::NotAdjacent(bulge, stems.first().copied().unwrap_or(bulge)));
        };
        let dims = self.bulge_dimensions(bulge)?;
        Ok((
            self.angle_stat(*stem1, *stem2, bulge, dims)?,
            self.angle_stat(*stem2, *stem1, bulge, dims)?,
        ))
    }

    pub fn get_stem_stats(&self, stem: ElementId) -> Result<StemStat, ModelError> {
        if !stem.is_stem() {
            return Err(ModelError::NotAStem(stem));
        }
        let (a, b) = self.coords_of(stem)?;
        let (t0, t1) = self.twists_of(stem)?;
        Ok(StemStat {
            stem,
            bp_length: self.graph().stem_length(stem)?,
            phys_length: (b - a).norm(),
            twist_angle: signed_angle_about(&t0, &t1, &(b - a)),
            define: self.graph().define(stem)?.to_vec(),
        })
    }

    /// Statistics of a hairpin, 5' or 3' strand.
    pub fn get_loop_stat(&self, element: ElementId) -> Result<LoopStat, ModelError> {
        let (a, b) = self.coords_of(element)?;
        let length = self.graph().define_residue_num_iterator(element)?.len();
        let vector = b - a;
        let (u, v) = match self.graph().attachments(element).first() {
            Some(attachment) if vector.norm() > 0.0 => {
                let (basis, _) = self.stem_basis(attachment.stem, element)?;
                let (_, u, v) = spherical_coordinates(&change_basis(&vector, &basis));
                (u, v)
            }
            _ => (0.0, 0.0),
        };
        Ok(LoopStat {
            element,
            length,
            phys_length: vector.norm(),
            u,
            v,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::virtual_atoms::{HELIX_RISE, HELIX_TWIST};

    fn id(s: &str) -> ElementId {
        s.parse().unwrap()
    }

    fn twist_after(bp: usize) -> Vector3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), (bp as f64 * HELIX_TWIST).to_radians())
            * Vector3::x()
    }

    /// Two coaxial three base pair stems along +z joined by an interior loop.
    fn stacked_stems() -> CoarseGrainRna {
        let mut cg = CoarseGrainRna::from_dotbracket("(((..(((...)))..)))", None).unwrap();
        let len = 2.0 * HELIX_RISE;
        cg.set_coords(id("s0"), Point3::origin(), Point3::new(0.0, 0.0, len)).unwrap();
        cg.set_twists(id("s0"), Vector3::x(), twist_after(2)).unwrap();
        let s1 = Point3::new(0.0, 0.0, len + 6.0);
        cg.set_coords(id("i0"), Point3::new(0.0, 0.0, len), s1).unwrap();
        cg.set_coords(id("s1"), s1, s1 + Vector3::new(0.0, 0.0, len)).unwrap();
        cg.set_twists(id("s1"), twist_after(3), twist_after(5)).unwrap();
        cg.set_coords(id("h0"), s1 + Vector3::new(0.0, 0.0, len), s1 + Vector3::new(0.0, 0.0, len + 5.0))
            .unwrap();
        cg
    }

    mod radius_of_gyration {
        use super::*;

        #[test]
        fn zero_extent_model_is_nan() {
            let mut cg = CoarseGrainRna::from_dotbracket("...", None).unwrap();
            cg.set_coords(id("f0"), Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0))
                .unwrap();
            assert!(cg.radius_of_gyration(RogMethod::Fast).unwrap().is_nan());
            assert!(cg.radius_of_gyration(RogMethod::Vres).unwrap().is_nan());
        }

        #[test]
        fn fast_estimate_matches_endpoint_spread() {
            let mut cg = CoarseGrainRna::from_dotbracket("...", None).unwrap();
            cg.set_coords(id("f0"), Point3::new(-1.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0))
                .unwrap();
            assert!((cg.radius_of_gyration(RogMethod::Fast).unwrap() - 1.0).abs() < 1e-12);
        }

        #[test]
        fn both_estimators_are_positive_for_a_placed_model() {
            let cg = stacked_stems();
            assert!(cg.radius_of_gyration(RogMethod::Fast).unwrap() > 0.0);
            assert!(cg.radius_of_gyration(RogMethod::Vres).unwrap() > 0.0);
        }

        #[test]
        fn missing_geometry_is_an_error() {
            let cg = CoarseGrainRna::from_dotbracket("((..))", None).unwrap();
            assert!(cg.radius_of_gyration(RogMethod::Fast).is_err());
        }
    }

    mod angles {
        use super::*;

        #[test]
        fn coaxial_stack_points_straight_ahead() {
            let cg = stacked_stems();
            let (fwd, rev) = cg.get_bulge_angle_stats(id("i0")).unwrap();
            assert_eq!(fwd.stem1, id("s0"));
            assert_eq!(rev.stem1, id("s1"));
            assert_eq!(fwd.dims, (2, 2));
            assert_eq!(fwd.ang_type, 1);
            assert_eq!(rev.ang_type, -1);
            // The second stem continues along the first stem's x axis.
            assert!((fwd.u - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
            assert!(fwd.v.abs() < 1e-9);
            assert!((fwd.r1 - 6.0).abs() < 1e-9);
        }

        #[test]
        fn zero_length_junctions_have_defined_stats() {
            let mut cg = CoarseGrainRna::from_dotbracket("((..))((..))", None).unwrap();
            cg.set_coords(id("s0"), Point3::origin(), Point3::new(0.0, 0.0, 3.0)).unwrap();
            cg.set_twists(id("s0"), Vector3::x(), Vector3::y()).unwrap();
            cg.set_coords(id("s1"), Point3::new(5.0, 0.0, 0.0), Point3::new(5.0, 0.0, 3.0)).unwrap();
            cg.set_twists(id("s1"), Vector3::x(), Vector3::y()).unwrap();
            cg.set_coords(id("m0"), Point3::origin(), Point3::new(5.0, 0.0, 0.0)).unwrap();
            let (fwd, _) = cg.get_bulge_angle_stats(id("m0")).unwrap();
            assert_eq!(fwd.dims, (0, MULTILOOP_PLACEHOLDER_DIMENSION));
            assert!(fwd.u.is_finite() && fwd.v.is_finite() && fwd.t.is_finite());
            assert!((fwd.r1 - 5.0).abs() < 1e-9);
        }
    }

    mod elements {
        use super::*;

        #[test]
        fn stem_stat_reports_lengths_and_twist() {
            let cg = stacked_stems();
            let stat = cg.get_stem_stats(id("s0")).unwrap();
            assert_eq!(stat.bp_length, 3);
            assert!((stat.phys_length - 2.0 * HELIX_RISE).abs() < 1e-9);
            assert!((stat.twist_angle - (2.0 * HELIX_TWIST).to_radians()).abs() < 1e-9);
            assert_eq!(stat.define, vec![1, 3, 17, 19]);
        }

        #[test]
        fn hairpin_continuing_the_stem_has_polar_angle_half_pi() {
            let cg = stacked_stems();
            let stat = cg.get_loop_stat(id("h0")).unwrap();
            assert_eq!(stat.length, 3);
            assert!((stat.phys_length - 5.0).abs() < 1e-9);
            assert!((stat.u - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        }

        #[test]
        fn unattached_strand_has_zero_angles() {
            let mut cg = CoarseGrainRna::from_dotbracket("....", None).unwrap();
            cg.set_coords(id("f0"), Point3::origin(), Point3::new(3.0, 4.0, 0.0)).unwrap();
            let stat = cg.get_loop_stat(id("f0")).unwrap();
            assert_eq!((stat.u, stat.v), (0.0, 0.0));
            assert_eq!(stat.phys_length, 5.0);
        }

        #[test]
        fn physical_distance_between_parallel_segments() {
            let cg = stacked_stems();
            let d = cg.element_physical_distance(id("s0"), id("h0")).unwrap();
            assert!((d - (6.0 + 2.0 * HELIX_RISE)).abs() < 1e-9);
        }
    }
}

use super::error::ModelError;
use super::model::CoarseGrainRna;
use crate::core::graph::bulge_graph::side_end_index;
use crate::core::graph::element::ElementId;
use nalgebra::{Point3, Rotation3, Vector3};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

/// One tree edge of a graph traversal: `stem2` is reached from `stem1`
/// through the junction `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStep {
    pub stem1: ElementId,
    pub link: ElementId,
    pub stem2: ElementId,
}

/// Depth-first spanning forest over stems connected by junctions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOrder {
    /// First stem of every connected piece, in visiting order.
    pub roots: Vec<ElementId>,
    pub steps: Vec<BuildStep>,
}

impl CoarseGrainRna {
    /// Depth-first traversal of the stems starting from the lowest-numbered
    /// one. Junctions closing a cycle are skipped; pieces unreachable from
    /// earlier roots start a new tree.
    pub fn traverse_graph(&self) -> Result<BuildOrder, ModelError> {
        let graph = self.graph();
        let mut order = BuildOrder::default();
        let mut visited_stems = BTreeSet::new();
        let mut visited_links = BTreeSet::new();

        for root in graph.stem_iterator() {
            if !visited_stems.insert(root) {
                continue;
            }
            order.roots.push(root);
            let mut stack = vec![root];
            while let Some(stem) = stack.pop() {
                let mut next = Vec::new();
                for &link in graph.edges(stem)? {
                    if !link.kind.is_junction() || !visited_links.insert(link) {
                        continue;
                    }
                    let Some(&other) = graph.connections(link)?.iter().find(|&&s| s != stem) else {
                        continue;
                    };
                    if visited_stems.insert(other) {
                        order.steps.push(BuildStep {
                            stem1: stem,
                            link,
                            stem2: other,
                        });
                        next.push(other);
                    }
                }
                stack.extend(next.into_iter().rev());
            }
        }
        Ok(order)
    }

    /// The signed junction type of `bulge` in traversal direction.
    pub fn get_angle_type(&self, bulge: ElementId) -> Result<i32, ModelError> {
        if !self.graph().contains(bulge) {
            return Err(ModelError::UnknownElement(bulge));
        }
        let order = self.traverse_graph()?;
        let (stem1, stem2) = match order.steps.iter().find(|s| s.link == bulge) {
            Some(step) => (step.stem1, step.stem2),
            None => {
                let stems = self.graph().connections(bulge)?;
                match stems.as_slice() {
                    [a, b] => (*a, *b),
                    _ => {
                        return Err(ModelError::NotAdjacent(
                            bulge,
                            stems.first().copied().unwrap_or(bulge),
                        ))
                    }
                }
            }
        };
        Ok(self.graph().connection_type(bulge, stem1, stem2)?)
    }

    /// Rotates every coordinate, twist, and stored residue position about
    /// the origin.
    pub fn rotate(&mut self, angle: f64, axis: Axis, unit: AngleUnit) {
        let radians = match unit {
            AngleUnit::Radians => angle,
            AngleUnit::Degrees => angle.to_radians(),
        };
        let axis = match axis {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        };
        self.rotate_by(&Rotation3::from_axis_angle(&axis, radians));
    }

    pub fn rotate_by(&mut self, rotation: &Rotation3<f64>) {
        self.coords_mut().update_all(|_, (a, b)| {
            *a = rotation * *a;
            *b = rotation * *b;
        });
        self.twists_mut().update_all(|_, (a, b)| {
            *a = rotation * *a;
            *b = rotation * *b;
        });
        self.vres_mut().update_all(|_, positions| {
            for p in positions.iter_mut() {
                *p = rotation * *p;
            }
        });
        if let Some(direction) = self.project_from_mut() {
            *direction = rotation * *direction;
        }
    }

    /// Shifts every coordinate and stored residue position by `offset`.
    pub fn translate(&mut self, offset: &Vector3<f64>) {
        self.coords_mut().update_all(|_, (a, b)| {
            *a += offset;
            *b += offset;
        });
        self.vres_mut().update_all(|_, positions| {
            for p in positions.iter_mut() {
                *p += offset;
            }
        });
    }

    /// All element endpoints, start then end, in element order.
    pub fn get_coordinates_array(&self) -> Vec<Point3<f64>> {
        self.coords()
            .iter()
            .flat_map(|(_, (a, b))| [*a, *b])
            .collect()
    }

    /// Overwrites element endpoints from an array laid out like
    /// [`Self::get_coordinates_array`].
    pub fn load_coordinates_array(&mut self, points: &[Point3<f64>]) -> Result<(), ModelError> {
        let expected = self.coords().len() * 2;
        if points.len() != expected {
            return Err(ModelError::LengthMismatch {
                expected,
                found: points.len(),
            });
        }
        let mut chunks = points.chunks_exact(2);
        self.coords_mut().update_all(|_, (a, b)| {
            if let Some(pair) = chunks.next() {
                *a = pair[0];
                *b = pair[1];
            }
        });
        Ok(())
    }

    /// One `end - start` vector per element, in element order.
    pub fn coords_to_directions(&self) -> Result<Vec<Vector3<f64>>, ModelError> {
        self.graph()
            .elements()
            .map(|id| self.coords_of(id).map(|(a, b)| b - a))
            .collect()
    }

    /// Rebuilds every element's endpoints from direction vectors laid out
    /// like [`Self::coords_to_directions`].
    ///
    /// Elements are chained along [`Self::traverse_graph`]: each junction
    /// starts where the stem before it ends, and single-stranded ends start
    /// at the stem they hang from. The first root starts at the origin, so a
    /// connected model comes back shifted by a single constant offset. Later
    /// roots and unattached pieces also start at the origin.
    pub fn coords_from_directions(&mut self, directions: &[Vector3<f64>]) -> Result<(), ModelError> {
        let elements: Vec<ElementId> = self.graph().elements().collect();
        if directions.len() != elements.len() {
            return Err(ModelError::LengthMismatch {
                expected: elements.len(),
                found: directions.len(),
            });
        }
        let direction: BTreeMap<ElementId, Vector3<f64>> =
            elements.iter().copied().zip(directions.iter().copied()).collect();
        let order = self.traverse_graph()?;
        let graph = self.graph();
        let mut placed: BTreeMap<ElementId, (Point3<f64>, Point3<f64>)> = BTreeMap::new();

        let place_stem_at = |stem: ElementId, end_index: usize, at: Point3<f64>| {
            let d = direction[&stem];
            if end_index == 0 { (at, at + d) } else { (at - d, at) }
        };
        let end_point = |coords: &(Point3<f64>, Point3<f64>), index: usize| {
            if index == 0 { coords.0 } else { coords.1 }
        };

        for root in &order.roots {
            placed.insert(*root, (Point3::origin(), Point3::origin() + direction[root]));
            for step in order.steps.iter() {
                let Some(s1) = placed.get(&step.stem1).copied() else {
                    continue;
                };
                if placed.contains_key(&step.stem2) {
                    continue;
                }
                let (from, to) = graph
                    .junction_ends(step.link)
                    .ok_or(ModelError::NotAdjacent(step.link, step.stem1))?;
                let d = direction[&step.link];
                let (link_coords, far_side) = if from.stem == step.stem1 {
                    let p = end_point(&s1, from.end_index());
                    ((p, p + d), to)
                } else {
                    let p = end_point(&s1, to.end_index());
                    ((p - d, p), from)
                };
                let attach = if from.stem == step.stem1 { link_coords.1 } else { link_coords.0 };
                placed.insert(step.link, link_coords);
                placed.insert(step.stem2, place_stem_at(step.stem2, far_side.end_index(), attach));
            }
        }

        for &id in &elements {
            if placed.contains_key(&id) {
                continue;
            }
            let d = direction[&id];
            let attachments = graph.attachments(id);
            let coords = if id.kind.is_junction() {
                match graph.junction_ends(id) {
                    Some((from, to)) => match (placed.get(&from.stem), placed.get(&to.stem)) {
                        (Some(a), Some(b)) => (
                            end_point(a, from.end_index()),
                            end_point(b, to.end_index()),
                        ),
                        _ => (Point3::origin(), Point3::origin() + d),
                    },
                    None => (Point3::origin(), Point3::origin() + d),
                }
            } else {
                match attachments.first().and_then(|a| placed.get(&a.stem).map(|c| (a, c))) {
                    Some((a, c)) => {
                        let p = end_point(c, side_end_index(a.side));
                        (p, p + d)
                    }
                    None => (Point3::origin(), Point3::origin() + d),
                }
            };
            placed.insert(id, coords);
        }

        for (id, (a, b)) in placed {
            self.set_coords(id, a, b)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn id(s: &str) -> ElementId {
        s.parse().unwrap()
    }

    /// Places every element of a model consistently by chaining random-ish
    /// directions, the way a built model is laid out.
    fn chained(db: &str) -> CoarseGrainRna {
        let mut cg = CoarseGrainRna::from_dotbracket(db, None).unwrap();
        let dirs: Vec<Vector3<f64>> = (0..cg.graph().elements().count())
            .map(|i| {
                let t = i as f64 + 1.0;
                Vector3::new(t.sin() * 3.0, t.cos() * 2.0, 4.0 + t)
            })
            .collect();
        cg.coords_from_directions(&dirs).unwrap();
        cg.translate(&Vector3::new(10.0, -5.0, 2.0));
        cg
    }

    mod traversal {
        use super::*;

        #[test]
        fn every_stem_is_reached_once() {
            let cg = CoarseGrainRna::from_dotbracket("((..((..))..((..))..))", None).unwrap();
            let order = cg.traverse_graph().unwrap();
            assert_eq!(order.roots, vec![id("s0")]);
            assert_eq!(order.steps.len(), 2);
            assert!(order.steps.iter().all(|s| s.stem1 == id("s0")));
        }

        #[test]
        fn disconnected_stems_start_new_trees() {
            let cg = CoarseGrainRna::from_dotbracket("((&((&))&))", None).unwrap();
            let order = cg.traverse_graph().unwrap();
            assert_eq!(order.roots.len(), 2);
            assert!(order.steps.is_empty());
        }

        #[test]
        fn angle_type_follows_traversal_direction() {
            let cg = CoarseGrainRna::from_dotbracket("((..((..))..))", None).unwrap();
            assert_eq!(cg.get_angle_type(id("i0")).unwrap(), 1);
            let cg = CoarseGrainRna::from_dotbracket("((..))((..))", None).unwrap();
            assert_eq!(cg.get_angle_type(id("m0")).unwrap(), 3);
        }
    }

    mod directions {
        use super::*;

        #[test]
        fn round_trip_recovers_coordinates_up_to_offset() {
            for db in ["..((..((...))..((..))))..", "((..((..))..))", "((...))..((..))"] {
                let cg = chained(db);
                let before = cg.get_coordinates_array();
                let dirs = cg.coords_to_directions().unwrap();
                let mut rebuilt = cg.clone();
                rebuilt.coords_from_directions(&dirs).unwrap();
                let after = rebuilt.get_coordinates_array();
                let offset = before[0] - after[0];
                for (b, a) in before.iter().zip(&after) {
                    assert!((b - (a + offset)).norm() < 1e-9, "{}", db);
                }
            }
        }

        #[test]
        fn pseudoknotted_model_round_trips() {
            let cg = chained("..((..[[..))..]]..");
            assert_eq!(cg.graph().stem_iterator().count(), 2);
            let before = cg.get_coordinates_array();
            let mut rebuilt = cg.clone();
            rebuilt
                .coords_from_directions(&cg.coords_to_directions().unwrap())
                .unwrap();
            let after = rebuilt.get_coordinates_array();
            assert_eq!(before.len(), after.len());
            let offset = before[0] - after[0];
            for (b, a) in before.iter().zip(&after) {
                assert!((b - (a + offset)).norm() < 1e-9);
            }
        }

        #[test]
        fn wrong_length_is_rejected() {
            let mut cg = chained("((..))");
            assert_eq!(
                cg.coords_from_directions(&[Vector3::x()]),
                Err(ModelError::LengthMismatch {
                    expected: 2,
                    found: 1
                })
            );
        }
    }

    mod rigid_motion {
        use super::*;

        #[test]
        fn rotation_about_z_moves_x_to_y() {
            let mut cg = CoarseGrainRna::from_dotbracket("(.)", None).unwrap();
            cg.set_coords(id("s0"), Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0))
                .unwrap();
            cg.set_twists(id("s0"), Vector3::x(), Vector3::x()).unwrap();
            cg.rotate(90.0, Axis::Z, AngleUnit::Degrees);
            let (a, _) = cg.coords_of(id("s0")).unwrap();
            assert!((a - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-12);
            let (t, _) = cg.twists_of(id("s0")).unwrap();
            assert!((t - Vector3::y()).norm() < 1e-12);
        }

        #[test]
        fn rotation_preserves_pairwise_distances() {
            let mut cg = chained("((..((..))..))");
            let before = cg.get_coordinates_array();
            cg.rotate(FRAC_PI_2 / 3.0, Axis::X, AngleUnit::Radians);
            cg.rotate(0.7, Axis::Y, AngleUnit::Radians);
            let after = cg.get_coordinates_array();
            for i in 0..before.len() {
                for j in 0..before.len() {
                    let d0 = (before[i] - before[j]).norm();
                    let d1 = (after[i] - after[j]).norm();
                    assert!((d0 - d1).abs() < 1e-9);
                }
            }
        }

        #[test]
        fn coordinate_array_round_trips_and_checks_length() {
            let mut cg = chained("((..))..");
            let mut points = cg.get_coordinates_array();
            assert_eq!(points.len(), 6);
            points[0] = Point3::new(9.0, 9.0, 9.0);
            cg.load_coordinates_array(&points).unwrap();
            assert_eq!(cg.get_coordinates_array(), points);
            assert!(matches!(
                cg.load_coordinates_array(&points[..4]),
                Err(ModelError::LengthMismatch { expected: 6, found: 4 })
            ));
        }
    }
}

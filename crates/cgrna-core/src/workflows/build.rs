use crate::core::graph::bulge_graph::{BulgeGraph, side_end_index};
use crate::core::graph::element::{ElementId, ElementKind};
use crate::core::graph::error::GraphError;
use crate::core::graph::pairs::PairTable;
use crate::core::graph::sequence::SeqId;
use crate::core::io::{StructureFileError, read_structure};
use crate::core::models::ids::ResidueId;
use crate::core::models::system::AtomicStructure;
use crate::core::utils::geometry::{
    any_perpendicular, centroid, kabsch_rotation, project_onto_line, vector_rejection,
};
use crate::engine::annotation::{AnnotationError, BasePair, annotator_for};
use crate::engine::config::BuildConfig;
use crate::engine::error::ModelError;
use crate::engine::model::CoarseGrainRna;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::virtual_atoms::{C1_TWIST_OFFSET, HELIX_RISE};
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// O3'(i)-P(i+1) distance above which consecutive residues are not bonded.
pub const O3_P_BREAK_DISTANCE: f64 = 2.2;
/// C1'(i)-C1'(i+1) distance used when backbone atoms are missing.
pub const C1_BREAK_DISTANCE: f64 = 8.0;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to read structure: {0}")]
    Structure(#[from] StructureFileError),
    #[error("Base-pair annotation failed: {0}")]
    Annotation(#[from] AnnotationError),
    #[error("Secondary structure error: {0}")]
    Graph(#[from] GraphError),
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

impl BuildError {
    /// Whether the failure was caused by a missing annotation program, as
    /// opposed to a problem with the input.
    pub fn is_tool_unavailable(&self) -> bool {
        matches!(
            self,
            BuildError::Annotation(AnnotationError::ToolUnavailable { .. })
        )
    }
}

/// Where base pairs come from.
#[derive(Debug, Clone, Copy)]
pub enum Annotation<'a> {
    /// Run the annotator selected in the [`BuildConfig`].
    Configured,
    /// Use these pairs as given.
    Provided(&'a [BasePair]),
}

struct Site {
    residue: ResidueId,
    seq_id: SeqId,
    letter: char,
}

/// Builds coarse-grained models from a PDB or mmCIF file with no progress
/// reporting. See [`run`].
pub fn from_pdb(path: &Path, config: &BuildConfig) -> Result<Vec<CoarseGrainRna>, BuildError> {
    run(path, config, &ProgressReporter::new())
}

/// Reads a structure file and builds one model per independent molecule.
/// Models are named after the file stem.
#[instrument(skip_all, name = "build_workflow", fields(path = %path.display()))]
pub fn run(
    path: &Path,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<CoarseGrainRna>, BuildError> {
    reporter.report(Progress::PhaseStart { name: "Reading" });
    let structure = read_structure(path)?;
    reporter.report(Progress::PhaseFinish);

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());
    from_structure(&structure, &name, Annotation::Configured, config, reporter)
}

/// Builds coarse-grained models from an in-memory structure.
///
/// The pipeline detects backbone breaks, annotates base pairs, optionally
/// removes pseudoknots and isolated pairs, splits the result into molecules
/// held together by pairs, and fits stem axes and loop segments to the atoms
/// of each molecule.
///
/// # Errors
///
/// Returns [`BuildError::MalformedInput`] when no usable nucleotide is left
/// after chain selection, and [`BuildError::Annotation`] when annotation
/// fails; [`BuildError::is_tool_unavailable`] tells a missing tool apart.
#[instrument(skip_all, name = "build_from_structure", fields(model = name))]
pub fn from_structure(
    structure: &AtomicStructure,
    name: &str,
    annotation: Annotation<'_>,
    config: &BuildConfig,
    reporter: &ProgressReporter,
) -> Result<Vec<CoarseGrainRna>, BuildError> {
    let selected;
    let structure = match &config.load_chains {
        Some(chains) => {
            let mut copy = structure.clone();
            copy.retain_chains(chains);
            selected = copy;
            &selected
        }
        None => structure,
    };

    let sites = collect_sites(structure);
    if sites.is_empty() {
        return Err(BuildError::MalformedInput(
            "no nucleotide residues with backbone atoms".into(),
        ));
    }
    let breaks = detect_breaks(structure, &sites);
    debug!(residues = sites.len(), breaks = breaks.len(), "Collected nucleotides.");

    reporter.report(Progress::PhaseStart { name: "Annotation" });
    let annotated;
    let pairs: &[BasePair] = match annotation {
        Annotation::Provided(pairs) => pairs,
        Annotation::Configured => {
            annotated = annotator_for(&config.annotation_tool).annotate(structure)?;
            &annotated
        }
    };
    let mut pair_table = pair_table_from(&sites, pairs);
    if config.remove_pseudoknots {
        let removed = pair_table.remove_pseudoknots(&breaks);
        if !removed.is_empty() {
            warn!(pairs = removed.len(), "Removed pseudoknotted base pairs.");
        }
    }
    if config.dissolve_length_one_stems {
        let removed = pair_table.dissolve_length_one_stems(&breaks);
        if !removed.is_empty() {
            info!(pairs = removed.len(), "Dissolved length-one stems.");
        }
    }
    reporter.report(Progress::PhaseFinish);

    let components = split_components(sites.len(), &breaks, &pair_table);
    reporter.report(Progress::ModelsStart {
        total: components.len() as u64,
    });
    let mut models = Vec::with_capacity(components.len());
    let mut used_names: HashMap<String, usize> = HashMap::new();
    for fragments in &components {
        let residues: Vec<usize> = fragments.iter().flat_map(|&(a, b)| a..=b).collect();
        let model_name = if components.len() == 1 {
            name.to_string()
        } else {
            let mut chains: Vec<&str> = Vec::new();
            for &r in &residues {
                let chain = sites[r - 1].seq_id.chain.as_str();
                if !chains.contains(&chain) {
                    chains.push(chain);
                }
            }
            let base = format!("{}_{}", name, chains.join("-"));
            let count = used_names.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 { base } else { format!("{}_{}", base, count) }
        };

        let cg = build_component(structure, &sites, &residues, fragments, &pair_table, &model_name)?;
        reporter.report(Progress::ModelFinished {
            name: model_name.clone(),
        });
        models.push(cg);
    }
    reporter.report(Progress::ModelsFinish);
    info!(models = models.len(), "Built coarse-grained models.");
    Ok(models)
}

fn collect_sites(structure: &AtomicStructure) -> Vec<Site> {
    let mut skipped = 0usize;
    let sites: Vec<Site> = structure
        .residues_in_order()
        .filter_map(|(residue_id, residue)| {
            let base = residue.parent_base();
            let Some(base) = base.filter(|_| structure.reference_position(residue_id).is_some())
            else {
                skipped += 1;
                return None;
            };
            let chain = structure.chain(residue.chain_id)?;
            Some(Site {
                residue: residue_id,
                seq_id: SeqId::new(chain.id.clone(), residue.number, residue.insertion_code),
                letter: base.one_letter(),
            })
        })
        .collect();
    if skipped > 0 {
        debug!(skipped, "Ignored residues that are not usable nucleotides.");
    }
    sites
}

fn detect_breaks(structure: &AtomicStructure, sites: &[Site]) -> Vec<usize> {
    sites
        .windows(2)
        .enumerate()
        .filter(|(_, w)| {
            let (a, b) = (&w[0], &w[1]);
            if a.seq_id.chain != b.seq_id.chain {
                return true;
            }
            let bonded = |x: &str, y: &str, limit: f64| {
                match (
                    structure.atom_position(a.residue, x),
                    structure.atom_position(b.residue, y),
                ) {
                    (Some(p), Some(q)) => Some((p - q).norm() <= limit),
                    _ => None,
                }
            };
            match bonded("O3'", "P", O3_P_BREAK_DISTANCE)
                .or_else(|| bonded("C1'", "C1'", C1_BREAK_DISTANCE))
            {
                Some(connected) => !connected,
                None => false,
            }
        })
        .map(|(i, _)| i + 1)
        .collect()
}

fn pair_table_from(sites: &[Site], pairs: &[BasePair]) -> PairTable {
    let index: HashMap<&SeqId, usize> = sites
        .iter()
        .enumerate()
        .map(|(i, s)| (&s.seq_id, i + 1))
        .collect();
    let mut table = PairTable::unpaired(sites.len());
    for (a, b) in pairs {
        let (Some(&i), Some(&j)) = (index.get(a), index.get(b)) else {
            debug!(first = %a, second = %b, "Skipping pair with unknown residue.");
            continue;
        };
        if let Err(e) = table.add_pair(i.min(j), i.max(j)) {
            warn!(first = %a, second = %b, "Skipping conflicting base pair: {}", e);
        }
    }
    table
}

/// Groups backbone fragments that are joined by base pairs. Each group is
/// returned as its fragments' residue ranges in sequence order.
fn split_components(
    length: usize,
    breaks: &[usize],
    pair_table: &PairTable,
) -> Vec<Vec<(usize, usize)>> {
    let mut fragments = Vec::new();
    let mut start = 1;
    for &b in breaks {
        fragments.push((start, b));
        start = b + 1;
    }
    fragments.push((start, length));

    let fragment_of = |r: usize| fragments.partition_point(|&(_, end)| end < r);
    let mut parent: Vec<usize> = (0..fragments.len()).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    for (i, j) in pair_table.pairs() {
        let (a, b) = (find(&mut parent, fragment_of(i)), find(&mut parent, fragment_of(j)));
        if a != b {
            parent[a.max(b)] = a.min(b);
        }
    }

    let mut groups: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
    for (f, range) in fragments.iter().enumerate() {
        let root = find(&mut parent, f);
        groups.entry(root).or_default().push(*range);
    }
    groups.into_values().collect()
}

fn build_component(
    structure: &AtomicStructure,
    sites: &[Site],
    residues: &[usize],
    fragments: &[(usize, usize)],
    pair_table: &PairTable,
    name: &str,
) -> Result<CoarseGrainRna, BuildError> {
    let local: HashMap<usize, usize> = residues.iter().enumerate().map(|(i, &r)| (r, i + 1)).collect();
    let sub_pairs = residues.iter().filter_map(|&r| {
        let partner = pair_table.partner(r)?;
        (r < partner).then(|| (local[&r], local[&partner]))
    });
    let sub_table = PairTable::from_pairs(residues.len(), sub_pairs)?;
    let mut breaks = Vec::new();
    let mut offset = 0;
    for &(a, b) in &fragments[..fragments.len() - 1] {
        offset += b + 1 - a;
        breaks.push(offset);
    }
    let seq: String = residues.iter().map(|&r| sites[r - 1].letter).collect();
    let seq_ids: Vec<SeqId> = residues.iter().map(|&r| sites[r - 1].seq_id.clone()).collect();
    let graph = BulgeGraph::new(name, seq, seq_ids, breaks, sub_table)?;

    let atoms: Vec<ResidueId> = residues.iter().map(|&r| sites[r - 1].residue).collect();
    let mut cg = CoarseGrainRna::from_graph(graph);
    fit_geometry(&mut cg, structure, &atoms)?;
    Ok(cg)
}

/// Atom lookups for the residues of one model, by local residue number.
struct ResidueAtoms<'a> {
    structure: &'a AtomicStructure,
    residues: &'a [ResidueId],
}

impl ResidueAtoms<'_> {
    fn id(&self, residue: usize) -> ResidueId {
        self.residues[residue - 1]
    }

    fn atom(&self, residue: usize, name: &str) -> Option<Point3<f64>> {
        self.structure.atom_position(self.id(residue), name)
    }

    fn reference(&self, residue: usize) -> Option<Point3<f64>> {
        self.structure.reference_position(self.id(residue))
    }

    fn c1(&self, residue: usize) -> Option<Point3<f64>> {
        self.atom(residue, "C1'").or_else(|| self.reference(residue))
    }

    fn glycosidic_n(&self, residue: usize) -> Option<Point3<f64>> {
        self.structure
            .residue(self.id(residue))?
            .nucleotide
            .and_then(|n| self.atom(residue, n.glycosidic_nitrogen()))
            .or_else(|| self.atom(residue, "N9"))
            .or_else(|| self.atom(residue, "N1"))
    }

    /// C1', C4' and glycosidic N of both residues of a base pair.
    fn base_pair_points(&self, i: usize, j: usize) -> Option<[Point3<f64>; 6]> {
        Some([
            self.atom(i, "C1'")?,
            self.atom(i, "C4'")?,
            self.glycosidic_n(i)?,
            self.atom(j, "C1'")?,
            self.atom(j, "C4'")?,
            self.glycosidic_n(j)?,
        ])
    }

    fn c1_midpoint(&self, i: usize, j: usize) -> Option<Point3<f64>> {
        Some(nalgebra::center(&self.c1(i)?, &self.c1(j)?))
    }
}

/// The screw axis of the rigid motion taking `from` onto `to`, as a point
/// on the axis and its unit direction. `None` for a motion without rotation.
fn screw_axis(from: &[Point3<f64>], to: &[Point3<f64>]) -> Option<(Point3<f64>, Vector3<f64>)> {
    let c_from = centroid(from)?;
    let c_to = centroid(to)?;
    let centered_from: Vec<Vector3<f64>> = from.iter().map(|p| p - c_from).collect();
    let centered_to: Vec<Vector3<f64>> = to.iter().map(|p| p - c_to).collect();
    let rotation = kabsch_rotation(&centered_from, &centered_to)?;
    let translation = c_to.coords - rotation * c_from.coords;
    let (axis, angle) = rotation.axis_angle()?;
    if angle < 1e-3 {
        return None;
    }
    let n = axis.into_inner();
    let t_perp = vector_rejection(&translation, &n);
    let point = (t_perp + n.cross(&t_perp) / (angle / 2.0).tan()) / 2.0;
    Some((Point3::from(point), n))
}

/// Frame of a single base pair from its own atoms: the axis point, the
/// helix direction, and the twist vector.
fn base_pair_frame(atoms: &ResidueAtoms, i: usize, j: usize) -> Option<(Point3<f64>, Vector3<f64>, Vector3<f64>)> {
    let c1_i = atoms.c1(i)?;
    let c1_j = atoms.c1(j)?;
    let mid_c = nalgebra::center(&c1_i, &c1_j);
    let mid_n = nalgebra::center(&atoms.glycosidic_n(i)?, &atoms.glycosidic_n(j)?);
    let mut axis = (c1_j - c1_i).cross(&(mid_n - mid_c)).try_normalize(1e-9)?;
    if let (Some(c4), Some(p)) = (atoms.atom(i, "C4'"), atoms.atom(i, "P")) {
        if axis.dot(&(c4 - p)) < 0.0 {
            axis = -axis;
        }
    }
    let twist = vector_rejection(&(mid_c - mid_n), &axis).try_normalize(1e-9)?;
    Some((mid_c - twist * C1_TWIST_OFFSET, axis, twist))
}

type StemGeometry = ((Point3<f64>, Point3<f64>), (Vector3<f64>, Vector3<f64>));

fn fit_stem(atoms: &ResidueAtoms, define: &[usize]) -> Option<StemGeometry> {
    let (a, b, d) = (define[0], define[1], define[3]);
    let length = b + 1 - a;
    let pair = |k: usize| (a + k, d - k);
    let first_mid = atoms.c1_midpoint(a, d)?;
    let last_mid = atoms.c1_midpoint(b, d + a - b)?;

    let mut points = Vec::new();
    let mut direction = Vector3::zeros();
    for k in 0..length.saturating_sub(1) {
        let (i0, j0) = pair(k);
        let (i1, j1) = pair(k + 1);
        let (Some(from), Some(to)) = (
            atoms.base_pair_points(i0, j0),
            atoms.base_pair_points(i1, j1),
        ) else {
            continue;
        };
        let Some((point, n)) = screw_axis(&from, &to) else {
            continue;
        };
        let step = atoms.c1_midpoint(i1, j1)? - atoms.c1_midpoint(i0, j0)?;
        direction += if n.dot(&step) < 0.0 { -n } else { n };
        points.push(point);
    }

    if let (Some(origin), Some(axis)) = (centroid(&points), direction.try_normalize(1e-9)) {
        let start = project_onto_line(&first_mid, &origin, &axis);
        let end = project_onto_line(&last_mid, &origin, &axis);
        let twist_at = |mid: &Point3<f64>, foot: &Point3<f64>| {
            vector_rejection(&(mid - foot), &axis)
                .try_normalize(1e-9)
                .unwrap_or_else(|| any_perpendicular(&axis))
        };
        return Some((
            (start, end),
            (twist_at(&first_mid, &start), twist_at(&last_mid, &end)),
        ));
    }

    let (i_last, j_last) = pair(length - 1);
    match (base_pair_frame(atoms, a, d), base_pair_frame(atoms, i_last, j_last)) {
        (Some((center, axis, twist)), _) if length == 1 => Some((
            (center - axis * (HELIX_RISE / 2.0), center + axis * (HELIX_RISE / 2.0)),
            (twist, twist),
        )),
        (Some((c0, _, t0)), Some((c1, _, t1))) => Some(((c0, c1), (t0, t1))),
        _ => {
            warn!(residue = a, "Stem atoms are incomplete; using C1' midpoints.");
            let across = atoms.c1(d)? - atoms.c1(a)?;
            let axis = (last_mid - first_mid)
                .try_normalize(1e-9)
                .unwrap_or_else(|| any_perpendicular(&across));
            let end = if length > 1 { last_mid } else { first_mid + axis * HELIX_RISE };
            let twist = vector_rejection(&across, &axis)
                .try_normalize(1e-9)
                .unwrap_or_else(|| any_perpendicular(&axis));
            Some(((first_mid, end), (twist, twist)))
        }
    }
}

fn stem_end(cg: &CoarseGrainRna, stem: ElementId, side: usize) -> Result<Point3<f64>, ModelError> {
    let (a, b) = cg.coords_of(stem)?;
    Ok(if side_end_index(side) == 0 { a } else { b })
}

fn fit_geometry(
    cg: &mut CoarseGrainRna,
    structure: &AtomicStructure,
    residues: &[ResidueId],
) -> Result<(), BuildError> {
    let atoms = ResidueAtoms {
        structure,
        residues,
    };
    let missing = |r: usize| {
        BuildError::MalformedInput(format!("residue {} has no reference atom", r))
    };

    let stems: Vec<(ElementId, Vec<usize>)> = cg
        .graph()
        .stem_iterator()
        .map(|s| (s, cg.graph().defines()[&s].clone()))
        .collect();
    for (stem, define) in stems {
        let ((start, end), (t0, t1)) = fit_stem(&atoms, &define).ok_or_else(|| missing(define[0]))?;
        cg.set_coords(stem, start, end)?;
        cg.set_twists(stem, t0, t1)?;
    }

    let loops: Vec<ElementId> = cg.graph().elements().filter(|e| !e.is_stem()).collect();
    for element in loops {
        let residues = cg.graph().define_residue_num_iterator(element)?;
        let positions = residues
            .iter()
            .map(|&r| atoms.reference(r).ok_or_else(|| missing(r)))
            .collect::<Result<Vec<_>, _>>()?;

        let coords = match element.kind {
            ElementKind::Interior | ElementKind::Multiloop => {
                let (from, to) = cg
                    .graph()
                    .junction_ends(element)
                    .ok_or(ModelError::NotAdjacent(element, element))?;
                (stem_end(cg, from.stem, from.side)?, stem_end(cg, to.stem, to.side)?)
            }
            ElementKind::Hairpin => {
                let attachment = cg
                    .graph()
                    .attachments(element)
                    .first()
                    .copied()
                    .ok_or(ModelError::NotAdjacent(element, element))?;
                let free = match centroid(&positions) {
                    Some(c) => c,
                    None => {
                        let segment = cg.graph().segments(element).first().copied();
                        let closing = segment
                            .and_then(|s| Some((atoms.reference(s.prev?)?, atoms.reference(s.next?)?)))
                            .ok_or(ModelError::NotAdjacent(element, attachment.stem))?;
                        nalgebra::center(&closing.0, &closing.1)
                    }
                };
                (stem_end(cg, attachment.stem, attachment.side)?, free)
            }
            _ => {
                let (Some(first), Some(last)) = (positions.first(), positions.last()) else {
                    continue;
                };
                let free = if element.kind == ElementKind::Fiveprime { *first } else { *last };
                match cg.graph().attachments(element).first().copied() {
                    Some(attachment) => (stem_end(cg, attachment.stem, attachment.side)?, free),
                    None => (*first, *last),
                }
            }
        };
        cg.set_coords(element, coords.0, coords.1)?;
        if !positions.is_empty() {
            cg.set_loop_positions(element, positions)?;
        }
    }
    Ok(())
}

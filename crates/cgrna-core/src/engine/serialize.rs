//! Line-oriented text format for coarse-grained models.
//!
//! Each line starts with a directive followed by whitespace-separated fields:
//!
//! ```text
//! name 1GID_A
//! length 12
//! seq GGGGAAAACCCC
//! seq_ids A:1 A:2 ...
//! backbone_breaks_after 6
//! define s0 1 4 9 12
//! connect s0 h0
//! coord s0 x y z x y z
//! twist s0 x y z x y z
//! longrange h0 h1
//! sampled h0 ...
//! project x y z
//! vres h0 x y z x y z ...
//! ```
//!
//! Numbers are written in the shortest form that parses back to the same
//! value, so writing a parsed file reproduces it byte for byte. Unknown
//! directives are skipped.

use super::error::ModelError;
use super::model::CoarseGrainRna;
use crate::core::graph::bulge_graph::BulgeGraph;
use crate::core::graph::element::{ElementId, ParseElementIdError};
use crate::core::graph::error::GraphError;
use crate::core::graph::pairs::PairTable;
use crate::core::graph::sequence::SeqId;
use nalgebra::{Point3, Vector3};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CgError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: CgParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Error, PartialEq)]
pub enum CgParseErrorKind {
    #[error("'{directive}' needs at least {expected} fields")]
    MissingField {
        directive: String,
        expected: usize,
    },
    #[error("Invalid number '{value}' in '{directive}'")]
    InvalidNumber { directive: String, value: String },
    #[error("Invalid element id: {0}")]
    InvalidElement(#[from] ParseElementIdError),
    #[error("Invalid residue id '{0}'")]
    InvalidSeqId(String),
}

#[derive(Default)]
struct RawCg {
    name: Option<String>,
    length: Option<usize>,
    seq: Option<String>,
    seq_ids: Option<Vec<SeqId>>,
    breaks: Option<Vec<usize>>,
    defines: BTreeMap<ElementId, Vec<usize>>,
    connects: BTreeMap<ElementId, BTreeSet<ElementId>>,
    coords: BTreeMap<ElementId, (Point3<f64>, Point3<f64>)>,
    twists: BTreeMap<ElementId, (Vector3<f64>, Vector3<f64>)>,
    longrange: Vec<(ElementId, ElementId)>,
    sampled: BTreeMap<ElementId, Vec<String>>,
    project: Option<Vector3<f64>>,
    vres: BTreeMap<ElementId, Vec<Point3<f64>>>,
}

struct Line<'a> {
    number: usize,
    directive: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn error(&self, kind: CgParseErrorKind) -> CgError {
        CgError::Parse {
            line: self.number,
            kind,
        }
    }

    fn require(&self, count: usize) -> Result<(), CgError> {
        if self.fields.len() < count {
            return Err(self.error(CgParseErrorKind::MissingField {
                directive: self.directive.to_string(),
                expected: count,
            }));
        }
        Ok(())
    }

    fn element(&self, index: usize) -> Result<ElementId, CgError> {
        self.require(index + 1)?;
        self.fields[index]
            .parse()
            .map_err(|e| self.error(CgParseErrorKind::InvalidElement(e)))
    }

    fn number<T: std::str::FromStr>(&self, index: usize) -> Result<T, CgError> {
        self.require(index + 1)?;
        self.fields[index].parse().map_err(|_| {
            self.error(CgParseErrorKind::InvalidNumber {
                directive: self.directive.to_string(),
                value: self.fields[index].to_string(),
            })
        })
    }

    fn numbers<T: std::str::FromStr>(&self, from: usize) -> Result<Vec<T>, CgError> {
        (from..self.fields.len()).map(|i| self.number(i)).collect()
    }

    /// The run of numbers starting at `from`; parsing stops at the first
    /// field that is not one, so fields added after it are skipped.
    fn leading_numbers<T: std::str::FromStr>(&self, from: usize) -> Vec<T> {
        self.fields
            .iter()
            .skip(from)
            .map_while(|f| f.parse().ok())
            .collect()
    }

    fn leading_elements(&self, from: usize) -> Vec<ElementId> {
        self.fields
            .iter()
            .skip(from)
            .map_while(|f| f.parse().ok())
            .collect()
    }

    fn vector(&self, from: usize) -> Result<Vector3<f64>, CgError> {
        Ok(Vector3::new(
            self.number(from)?,
            self.number(from + 1)?,
            self.number(from + 2)?,
        ))
    }
}

fn parse_lines(text: &str) -> Result<RawCg, CgError> {
    let mut raw = RawCg::default();
    for (i, text_line) in text.lines().enumerate() {
        let mut tokens = text_line.split_whitespace();
        let Some(directive) = tokens.next() else {
            continue;
        };
        if directive.starts_with('#') {
            continue;
        }
        let line = Line {
            number: i + 1,
            directive,
            fields: tokens.collect(),
        };
        match directive {
            "name" => raw.name = Some(line.fields.join(" ")),
            "length" => raw.length = Some(line.number(0)?),
            "seq" => {
                line.require(1)?;
                raw.seq = Some(line.fields.concat());
            }
            "seq_ids" => {
                let ids = line
                    .fields
                    .iter()
                    .map(|f| {
                        f.parse::<SeqId>()
                            .map_err(|_| line.error(CgParseErrorKind::InvalidSeqId(f.to_string())))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                raw.seq_ids = Some(ids);
            }
            "backbone_breaks_after" => raw.breaks = Some(line.leading_numbers(0)),
            "define" => {
                let id = line.element(0)?;
                raw.defines.insert(id, line.leading_numbers(1));
            }
            "connect" => {
                let id = line.element(0)?;
                raw.connects
                    .entry(id)
                    .or_default()
                    .extend(line.leading_elements(1));
            }
            "coord" => {
                let id = line.element(0)?;
                raw.coords.insert(
                    id,
                    (Point3::from(line.vector(1)?), Point3::from(line.vector(4)?)),
                );
            }
            "twist" => {
                let id = line.element(0)?;
                raw.twists.insert(id, (line.vector(1)?, line.vector(4)?));
            }
            "longrange" => raw.longrange.push((line.element(0)?, line.element(1)?)),
            "sampled" => {
                let id = line.element(0)?;
                raw.sampled
                    .insert(id, line.fields[1..].iter().map(|s| s.to_string()).collect());
            }
            "project" => raw.project = Some(line.vector(0)?),
            "vres" => {
                let id = line.element(0)?;
                let values: Vec<f64> = line.numbers(1)?;
                if values.len() % 3 != 0 {
                    return Err(line.error(CgParseErrorKind::MissingField {
                        directive: directive.to_string(),
                        expected: 1 + values.len().div_ceil(3) * 3,
                    }));
                }
                let positions = values
                    .chunks_exact(3)
                    .map(|c| Point3::new(c[0], c[1], c[2]))
                    .collect();
                raw.vres.insert(id, positions);
            }
            other => debug!(line = line.number, directive = other, "Skipping unknown directive."),
        }
    }
    Ok(raw)
}

fn default_seq_ids(length: usize, breaks: &[usize]) -> Vec<SeqId> {
    let mut ids = Vec::with_capacity(length);
    let mut strand = 0usize;
    let mut number = 1;
    for residue in 1..=length {
        let chain = if strand < 26 {
            char::from(b'A' + strand as u8).to_string()
        } else {
            strand.to_string()
        };
        ids.push(SeqId::new(chain, number, None));
        number += 1;
        if breaks.contains(&residue) {
            strand += 1;
            number = 1;
        }
    }
    ids
}

/// Pairs `file` elements with `graph` elements of the same kind, by
/// identical define first and then, for empty elements, by identical stem
/// neighbors.
fn match_elements(
    graph: &BulgeGraph,
    raw: &RawCg,
) -> Result<BTreeMap<ElementId, ElementId>, CgError> {
    let mut mapping: BTreeMap<ElementId, ElementId> = BTreeMap::new();
    let mut taken: BTreeSet<ElementId> = BTreeSet::new();

    for (file_id, define) in raw.defines.iter().filter(|(_, d)| !d.is_empty()) {
        let found = graph
            .defines()
            .iter()
            .find(|(g, d)| g.kind == file_id.kind && *d == define)
            .map(|(g, _)| *g)
            .ok_or_else(|| {
                CgError::Inconsistency(format!(
                    "define of {} does not match the structure",
                    file_id
                ))
            })?;
        taken.insert(found);
        mapping.insert(found, *file_id);
    }

    let stems_of = |neighbors: &BTreeSet<ElementId>| -> BTreeSet<ElementId> {
        neighbors.iter().copied().filter(ElementId::is_stem).collect()
    };
    for file_id in raw.defines.iter().filter(|(_, d)| d.is_empty()).map(|(id, _)| *id) {
        let file_stems: BTreeSet<ElementId> = raw
            .connects
            .iter()
            .filter(|(_, n)| n.contains(&file_id))
            .map(|(s, _)| *s)
            .chain(raw.connects.get(&file_id).map(&stems_of).unwrap_or_default())
            .collect();
        let candidates: Vec<ElementId> = graph
            .elements()
            .filter(|g| g.kind == file_id.kind && !taken.contains(g))
            .filter(|g| graph.define(*g).map(|d| d.is_empty()).unwrap_or(false))
            .collect();
        let found = candidates
            .iter()
            .copied()
            .find(|g| {
                let graph_stems: BTreeSet<ElementId> = graph
                    .connections(*g)
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|s| mapping.get(s).copied())
                    .collect();
                !file_stems.is_empty() && graph_stems == file_stems
            })
            .or_else(|| candidates.contains(&file_id).then_some(file_id))
            .or_else(|| candidates.first().copied())
            .ok_or_else(|| {
                CgError::Inconsistency(format!("{} has no counterpart in the structure", file_id))
            })?;
        taken.insert(found);
        mapping.insert(found, file_id);
    }

    if let Some(missing) = graph.elements().find(|g| !mapping.contains_key(g)) {
        return Err(CgError::Inconsistency(format!(
            "element {} of the structure is not defined in the file",
            missing
        )));
    }
    Ok(mapping)
}

fn assemble(raw: RawCg) -> Result<CoarseGrainRna, CgError> {
    let seq_field = raw.seq.clone().ok_or(CgError::MissingRecord("seq"))?;
    let seq: String = seq_field.chars().filter(|&c| c != '&').collect();
    let length = raw.length.unwrap_or(seq.len());
    if length != seq.len() {
        return Err(CgError::Inconsistency(format!(
            "length {} does not match sequence length {}",
            length,
            seq.len()
        )));
    }

    let separator_breaks: Vec<usize> = seq_field
        .chars()
        .scan(0usize, |count, c| {
            if c == '&' {
                Some(Some(*count))
            } else {
                *count += 1;
                Some(None)
            }
        })
        .flatten()
        .collect();
    let breaks = match &raw.breaks {
        Some(b) if !separator_breaks.is_empty() && *b != separator_breaks => {
            return Err(CgError::Inconsistency(
                "backbone breaks disagree with sequence separators".into(),
            ));
        }
        Some(b) => b.clone(),
        None => separator_breaks,
    };

    let seq_ids = raw
        .seq_ids
        .clone()
        .unwrap_or_else(|| default_seq_ids(length, &breaks));

    let mut pair_table = PairTable::unpaired(length);
    for (id, define) in raw.defines.iter().filter(|(id, _)| id.is_stem()) {
        let [a, b, c, d] = define.as_slice() else {
            return Err(CgError::Inconsistency(format!("stem {} needs four residues", id)));
        };
        if b < a || d < c || b - a != d - c {
            return Err(CgError::Inconsistency(format!("stem {} has unequal strands", id)));
        }
        for k in 0..=(b - a) {
            pair_table.add_pair(a + k, d - k)?;
        }
    }

    let name = raw.name.clone().unwrap_or_else(|| "untitled".to_string());
    let graph = BulgeGraph::new(name, seq, seq_ids, breaks, pair_table)?;
    let mapping = match_elements(&graph, &raw)?;
    let graph = graph.relabel(&mapping)?;

    for (stem, neighbors) in &raw.connects {
        let actual = graph.edges(*stem).map_err(|_| {
            CgError::Inconsistency(format!("connect line for unknown element {}", stem))
        })?;
        if !neighbors.is_subset(actual) {
            return Err(CgError::Inconsistency(format!(
                "connections of {} do not match the defines",
                stem
            )));
        }
    }

    let mut cg = CoarseGrainRna::from_graph(graph);
    if !raw.coords.is_empty() {
        for id in cg.graph().elements().collect::<Vec<_>>() {
            let (a, b) = raw.coords.get(&id).copied().ok_or_else(|| {
                CgError::Inconsistency(format!("element {} has no coordinates", id))
            })?;
            cg.set_coords(id, a, b)?;
        }
        if let Some(orphan) = raw.coords.keys().find(|id| !cg.graph().contains(**id)) {
            return Err(ModelError::UnknownElement(*orphan).into());
        }
        for stem in cg.graph().stem_iterator().collect::<Vec<_>>() {
            let (t0, t1) = raw
                .twists
                .get(&stem)
                .copied()
                .ok_or(ModelError::MissingTwist(stem))?;
            cg.set_twists(stem, t0, t1)?;
        }
    }
    if let Some(orphan) = raw.twists.keys().find(|id| !cg.twists().contains(id)) {
        return Err(CgError::Inconsistency(format!(
            "twist for {} without stem coordinates",
            orphan
        )));
    }

    for (a, b) in raw.longrange {
        cg.add_longrange(a, b)?;
    }
    for (id, fields) in raw.sampled {
        cg.set_sampled(id, fields)?;
    }
    cg.set_project_from(raw.project);
    if !raw.vres.is_empty() {
        for (id, positions) in raw.vres {
            if !cg.graph().contains(id) {
                return Err(ModelError::UnknownElement(id).into());
            }
            if !id.is_stem() {
                cg.set_loop_positions(id, positions)?;
            }
        }
        cg.set_embed_virtual_residues(true);
    }
    Ok(cg)
}

fn write_points<'a>(
    out: &mut impl fmt::Write,
    points: impl IntoIterator<Item = &'a Vector3<f64>>,
) -> fmt::Result {
    for p in points {
        write!(out, " {} {} {}", p.x, p.y, p.z)?;
    }
    writeln!(out)
}

impl CoarseGrainRna {
    /// Parses a model from the text format.
    ///
    /// # Errors
    ///
    /// Returns [`CgError::Parse`] for malformed lines and
    /// [`CgError::Inconsistency`] when defines, connections, and geometry do
    /// not describe one consistent model.
    pub fn from_cg_str(text: &str) -> Result<Self, CgError> {
        assemble(parse_lines(text)?)
    }

    pub fn from_cg_reader(reader: &mut impl BufRead) -> Result<Self, CgError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Self::from_cg_str(&text)
    }

    pub fn from_cg_file(path: impl AsRef<Path>) -> Result<Self, CgError> {
        let file = fs::File::open(path)?;
        Self::from_cg_reader(&mut BufReader::new(file))
    }

    /// Renders the model in the text format.
    ///
    /// Stem residue positions in the `vres` block are recomputed on every
    /// write and therefore need valid stem geometry.
    pub fn to_cg_string(&self) -> Result<String, ModelError> {
        let mut out = String::new();
        self.write_records(&mut out)?;
        Ok(out)
    }

    fn write_records(&self, out: &mut impl fmt::Write) -> Result<(), ModelError> {
        let graph = self.graph();
        writeln!(out, "name {}", graph.name())?;
        writeln!(out, "length {}", graph.seq_length())?;
        writeln!(out, "seq {}", graph.seq_with_separators())?;
        let ids: Vec<String> = graph.seq_ids().iter().map(ToString::to_string).collect();
        writeln!(out, "seq_ids {}", ids.join(" "))?;
        if !graph.backbone_breaks_after().is_empty() {
            let breaks: Vec<String> = graph
                .backbone_breaks_after()
                .iter()
                .map(ToString::to_string)
                .collect();
            writeln!(out, "backbone_breaks_after {}", breaks.join(" "))?;
        }
        for (id, define) in graph.defines() {
            write!(out, "define {}", id)?;
            for r in define {
                write!(out, " {}", r)?;
            }
            writeln!(out)?;
        }
        for stem in graph.stem_iterator() {
            let neighbors = graph.edges(stem)?;
            if neighbors.is_empty() {
                continue;
            }
            write!(out, "connect {}", stem)?;
            for n in neighbors {
                write!(out, " {}", n)?;
            }
            writeln!(out)?;
        }
        for (id, (a, b)) in self.coords().iter() {
            write!(out, "coord {}", id)?;
            write_points(out, [&a.coords, &b.coords])?;
        }
        for (id, (a, b)) in self.twists().iter() {
            write!(out, "twist {}", id)?;
            write_points(out, [a, b])?;
        }
        for (a, b) in self.longrange_iterator() {
            writeln!(out, "longrange {} {}", a, b)?;
        }
        for (id, fields) in self.sampled() {
            writeln!(out, "sampled {} {}", id, fields.join(" "))?;
        }
        if let Some(p) = self.project_from() {
            write!(out, "project")?;
            write_points(out, [&p])?;
        }
        if self.embeds_virtual_residues() {
            for id in graph.elements() {
                let residues = graph.define_residue_num_iterator(id)?;
                if residues.is_empty() {
                    continue;
                }
                let positions = residues
                    .into_iter()
                    .map(|r| self.virtual_residue_pos(r).map(|p| p.coords))
                    .collect::<Result<Vec<_>, _>>()?;
                write!(out, "vres {}", id)?;
                write_points(out, positions.iter())?;
            }
        }
        Ok(())
    }

    pub fn write_cg(&self, writer: &mut impl Write) -> Result<(), CgError> {
        writer.write_all(self.to_cg_string()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    pub fn to_cg_file(&self, path: impl AsRef<Path>) -> Result<(), CgError> {
        let mut file = io::BufWriter::new(fs::File::create(path)?);
        self.write_cg(&mut file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transform::{AngleUnit, Axis};

    fn id(s: &str) -> ElementId {
        s.parse().unwrap()
    }

    fn placed(db: &str, seq: &str) -> CoarseGrainRna {
        let mut cg = CoarseGrainRna::from_dotbracket(db, Some(seq)).unwrap();
        let dirs: Vec<Vector3<f64>> = (0..cg.graph().elements().count())
            .map(|i| {
                let t = i as f64 * 0.7 + 0.3;
                Vector3::new(t.cos() * 4.1, t.sin() * 3.3, 5.0 + t)
            })
            .collect();
        cg.coords_from_directions(&dirs).unwrap();
        for stem in cg.graph().stem_iterator().collect::<Vec<_>>() {
            let (a, b) = cg.coords_of(stem).unwrap();
            let axis = b - a;
            let t0 = crate::core::utils::geometry::any_perpendicular(&axis);
            let t1 = axis.normalize().cross(&t0);
            cg.set_twists(stem, t0, t1).unwrap();
        }
        cg.rotate(0.37, Axis::X, AngleUnit::Radians);
        cg
    }

    mod round_trip {
        use super::*;

        #[test]
        fn writing_a_parsed_model_is_idempotent() {
            let mut cg = placed("..((..((...))..((..))))..", "GGAGCAGGCAACCAAGGAAUCCUAA");
            cg.set_name("three_way");
            cg.add_longrange(id("h0"), id("h1")).unwrap();
            cg.set_project_from(Some(Vector3::new(0.1, 0.2, 0.3)));
            let text = cg.to_cg_string().unwrap();
            let parsed = CoarseGrainRna::from_cg_str(&text).unwrap();
            assert_eq!(parsed.to_cg_string().unwrap(), text);
            assert_eq!(parsed.name(), "three_way");
            assert_eq!(parsed.get_coordinates_array(), cg.get_coordinates_array());
        }

        #[test]
        fn multi_strand_models_keep_their_breaks() {
            let cg = placed("((((&))))", "GGGGCCCC");
            let text = cg.to_cg_string().unwrap();
            assert!(text.contains("seq GGGG&CCCC\n"));
            assert!(text.contains("backbone_breaks_after 4\n"));
            let parsed = CoarseGrainRna::from_cg_str(&text).unwrap();
            assert_eq!(parsed.graph().backbone_breaks_after(), &[4]);
            assert_eq!(parsed.graph().seq_id(5).unwrap().chain, "B");
        }

        #[test]
        fn virtual_residue_block_survives() {
            let mut cg = placed("((((....))))", "GGGGAAAACCCC");
            cg.add_all_virtual_residues().unwrap();
            let text = cg.to_cg_string().unwrap();
            assert!(text.contains("vres h0 "));
            let parsed = CoarseGrainRna::from_cg_str(&text).unwrap();
            assert!(parsed.embeds_virtual_residues());
            assert_eq!(parsed.to_cg_string().unwrap(), text);
        }

        #[test]
        fn graph_only_model_round_trips() {
            let cg = CoarseGrainRna::from_dotbracket("((..))..", Some("GGAACCAA")).unwrap();
            let text = cg.to_cg_string().unwrap();
            assert!(!text.contains("coord"));
            let parsed = CoarseGrainRna::from_cg_str(&text).unwrap();
            assert_eq!(parsed.graph().to_dotbracket_string(), "((..))..");
        }

        #[test]
        fn writer_failures_are_reported() {
            struct Refusing;
            impl fmt::Write for Refusing {
                fn write_str(&mut self, _: &str) -> fmt::Result {
                    Err(fmt::Error)
                }
            }
            let cg = placed("((..))", "GGAACC");
            assert_eq!(
                cg.write_records(&mut Refusing),
                Err(ModelError::Render(fmt::Error))
            );
        }

        #[test]
        fn file_helpers_round_trip() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("model.cg");
            let cg = placed("((..))", "GGAACC");
            cg.to_cg_file(&path).unwrap();
            let back = CoarseGrainRna::from_cg_file(&path).unwrap();
            assert_eq!(back.to_cg_string().unwrap(), cg.to_cg_string().unwrap());
        }
    }

    mod parsing {
        use super::*;

        const MINIMAL: &str = "\
name tiny
length 6
seq GGAACC
define s0 1 2 5 6
define h0 3 4
";

        #[test]
        fn minimal_file_without_geometry() {
            let cg = CoarseGrainRna::from_cg_str(MINIMAL).unwrap();
            assert_eq!(cg.name(), "tiny");
            assert!(cg.coords().is_empty());
            assert_eq!(cg.graph().seq_id(1).unwrap().to_string(), "A:1");
        }

        #[test]
        fn unknown_directives_and_comments_are_ignored() {
            let text = format!("# comment\n{}interacting s0 h0\n", MINIMAL);
            assert!(CoarseGrainRna::from_cg_str(&text).is_ok());
        }

        #[test]
        fn trailing_fields_after_defines_and_connections_are_skipped() {
            let text = "\
length 6
seq GGAACC
backbone_breaks_after note
define s0 1 2 5 6
define h0 3 4 futurefield
connect s0 h0 weight=1
";
            let cg = CoarseGrainRna::from_cg_str(text).unwrap();
            assert_eq!(cg.graph().define(id("h0")).unwrap(), &[3, 4]);
            assert!(cg.graph().backbone_breaks_after().is_empty());
            assert_eq!(cg.graph().to_dotbracket_string(), "((..))");
        }

        #[test]
        fn file_labels_are_kept() {
            let text = "\
length 12
seq GGAACCGGAACC
define s7 1 2 5 6
define h4 3 4
define m0
define s2 7 8 11 12
define h1 9 10
connect s7 h4 m0
connect s2 m0 h1
";
            let cg = CoarseGrainRna::from_cg_str(text).unwrap();
            assert!(cg.graph().contains(id("s7")));
            assert!(cg.graph().contains(id("m0")));
            assert_eq!(cg.graph().define(id("h1")).unwrap(), &[9, 10]);
        }

        #[test]
        fn mismatched_defines_are_rejected() {
            let text = "length 6\nseq GGAACC\ndefine s0 1 2 5 6\ndefine h0 3 3\n";
            assert!(matches!(
                CoarseGrainRna::from_cg_str(text),
                Err(CgError::Inconsistency(_))
            ));
        }

        #[test]
        fn partial_coordinates_are_rejected() {
            let text = format!("{}coord s0 0 0 0 0 0 1\ntwist s0 1 0 0 1 0 0\n", MINIMAL);
            assert!(matches!(
                CoarseGrainRna::from_cg_str(&text),
                Err(CgError::Inconsistency(_))
            ));
        }

        #[test]
        fn missing_twist_is_rejected() {
            let text = format!("{}coord s0 0 0 0 0 0 1\ncoord h0 0 0 1 0 0 2\n", MINIMAL);
            assert!(matches!(
                CoarseGrainRna::from_cg_str(&text),
                Err(CgError::Model(ModelError::MissingTwist(_)))
            ));
        }

        #[test]
        fn bad_numbers_report_their_line() {
            let text = format!("{}coord s0 0 0 zero 0 0 1\n", MINIMAL);
            assert!(matches!(
                CoarseGrainRna::from_cg_str(&text),
                Err(CgError::Parse {
                    line: 6,
                    kind: CgParseErrorKind::InvalidNumber { .. }
                })
            ));
        }

        #[test]
        fn sequence_is_required() {
            assert!(matches!(
                CoarseGrainRna::from_cg_str("define s0 1 2 5 6\n"),
                Err(CgError::MissingRecord("seq"))
            ));
        }
    }
}

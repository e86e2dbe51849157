//! Base-pair annotation of atomic structures.
//!
//! Annotators report canonical (Watson-Crick and G-U wobble) base pairs as
//! pairs of author residue ids. The external MC-Annotate program runs in a
//! private scratch directory on a sanitized copy of the structure, so
//! concurrent builds never share working files.

use super::config::AnnotationTool;
use crate::core::graph::sequence::SeqId;
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::StructureFile;
use crate::core::models::residue::Nucleotide;
use crate::core::models::system::AtomicStructure;
use nalgebra::Point3;
use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Base-pair annotation tool '{tool}' was not found")]
    ToolUnavailable { tool: String },
    #[error("Annotation tool '{tool}' failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Structure has {0} chains; at most 62 can be passed to the annotation tool")]
    TooManyChains(usize),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to write the annotation input: {0}")]
    Input(#[from] PdbError),
}

pub type BasePair = (SeqId, SeqId);

pub trait BasePairAnnotator {
    fn name(&self) -> &str;

    fn annotate(&self, structure: &AtomicStructure) -> Result<Vec<BasePair>, AnnotationError>;
}

/// Creates the annotator selected by a configuration.
pub fn annotator_for(tool: &AnnotationTool) -> Box<dyn BasePairAnnotator> {
    match tool {
        AnnotationTool::McAnnotate { program } => Box::new(McAnnotate::new(program)),
        AnnotationTool::Geometric => Box::new(GeometricAnnotator::default()),
    }
}

const CHAIN_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Copies a structure, renaming chains whose ids do not fit a single PDB
/// column. Returns the copy and a map from new to original chain ids.
fn single_letter_copy(
    structure: &AtomicStructure,
) -> Result<(AtomicStructure, HashMap<String, String>), AnnotationError> {
    let chains: Vec<&str> = structure.chains_iter().map(|(_, c)| c.id.as_str()).collect();
    let mut used: BTreeSet<String> = chains
        .iter()
        .filter(|c| c.chars().count() == 1)
        .map(|c| c.to_string())
        .collect();
    let mut pool = CHAIN_LETTERS.chars().map(String::from);
    let mut renamed = HashMap::new();
    let mut letters = HashMap::new();
    for chain in &chains {
        let letter = if chain.chars().count() == 1 {
            chain.to_string()
        } else {
            let letter = pool
                .by_ref()
                .find(|l| !used.contains(l))
                .ok_or(AnnotationError::TooManyChains(chains.len()))?;
            used.insert(letter.clone());
            letter
        };
        letters.insert(chain.to_string(), letter.clone());
        renamed.insert(letter, chain.to_string());
    }

    let mut copy = AtomicStructure::new();
    for (_, chain) in structure.chains_iter() {
        let Some(new_id) = letters.get(&chain.id) else {
            continue;
        };
        let new_chain = copy.add_chain(new_id);
        for &residue_id in chain.residues() {
            let Some(residue) = structure.residue(residue_id) else {
                continue;
            };
            let Some(new_residue) =
                copy.add_residue(new_chain, residue.number, residue.insertion_code, &residue.name)
            else {
                continue;
            };
            for &atom_id in residue.atoms() {
                if let Some(atom) = structure.atom(atom_id) {
                    copy.add_atom_to_residue(new_residue, atom.clone());
                }
            }
        }
    }
    Ok((copy, renamed))
}

/// Runs the MC-Annotate program and keeps its canonical cis Watson-Crick
/// pairs.
#[derive(Debug, Clone)]
pub struct McAnnotate {
    program: String,
}

impl McAnnotate {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolves the program to an executable file, searching `PATH` for a
    /// bare name.
    pub fn locate(&self) -> Option<PathBuf> {
        let given = Path::new(&self.program);
        if given.components().count() > 1 || given.is_absolute() {
            return given.is_file().then(|| given.to_path_buf());
        }
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }
}

impl BasePairAnnotator for McAnnotate {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip_all, name = "mc_annotate")]
    fn annotate(&self, structure: &AtomicStructure) -> Result<Vec<BasePair>, AnnotationError> {
        let unavailable = || AnnotationError::ToolUnavailable {
            tool: self.program.clone(),
        };
        let executable = self.locate().ok_or_else(unavailable)?;

        let (copy, renamed) = single_letter_copy(structure)?;
        let workdir = tempfile::Builder::new().prefix("cgrna-").tempdir()?;
        let input = workdir.path().join("input.pdb");
        PdbFile::write_to_path(&copy, &input)?;

        debug!(program = %executable.display(), "Running base-pair annotation.");
        let output = Command::new(&executable)
            .arg(&input)
            .current_dir(workdir.path())
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => unavailable(),
                _ => AnnotationError::Io(e),
            })?;

        if !output.status.success() {
            return Err(AnnotationError::ToolFailed {
                tool: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pairs: Vec<BasePair> = parse_mc_annotate(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .map(|(a, b)| (restore_chain(a, &renamed), restore_chain(b, &renamed)))
            .collect();
        info!(pairs = pairs.len(), "Annotation finished.");
        Ok(pairs)
    }
}

fn restore_chain(mut id: SeqId, renamed: &HashMap<String, String>) -> SeqId {
    if let Some(original) = renamed.get(&id.chain) {
        id.chain = original.clone();
    }
    id
}

/// Parses one MC-Annotate residue token: a chain letter (or a quoted chain
/// name), the residue number, and an optional `.X` insertion code.
fn parse_mc_residue(token: &str) -> Option<SeqId> {
    let (chain, rest) = if let Some(quoted) = token.strip_prefix('\'') {
        let end = quoted.find('\'')?;
        (&quoted[..end], &quoted[end + 1..])
    } else {
        let first = token.chars().next()?;
        (&token[..first.len_utf8()], &token[first.len_utf8()..])
    };
    let (number, icode) = match rest.split_once('.') {
        Some((n, code)) => {
            let mut chars = code.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            (n, Some(c))
        }
        None => (rest, None),
    };
    Some(SeqId::new(chain, number.parse().ok()?, icode))
}

fn split_residue_pair(text: &str) -> Option<(SeqId, SeqId)> {
    text.match_indices('-').find_map(|(i, _)| {
        Some((parse_mc_residue(&text[..i])?, parse_mc_residue(&text[i + 1..])?))
    })
}

fn is_canonical_description(description: &str) -> bool {
    let mut tokens = description.split_whitespace();
    let Some(bases) = tokens.next() else {
        return false;
    };
    let canonical_bases = matches!(
        bases.to_ascii_uppercase().as_str(),
        "G-C" | "C-G" | "A-U" | "U-A" | "G-U" | "U-G"
    );
    let rest: Vec<&str> = tokens.collect();
    canonical_bases && rest.contains(&"Ww/Ww") && rest.contains(&"cis")
}

/// Extracts canonical pairs from the base-pair section of MC-Annotate
/// output.
pub fn parse_mc_annotate(output: &str) -> Vec<BasePair> {
    let mut pairs = Vec::new();
    let mut in_section = false;
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("Base-pairs") {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        let Some((ids, description)) = line.split_once(" : ") else {
            if line.ends_with("---") {
                break;
            }
            continue;
        };
        if !is_canonical_description(description) {
            continue;
        }
        match split_residue_pair(ids.trim()) {
            Some(pair) => pairs.push(pair),
            None => debug!(line, "Unrecognized residue pair."),
        }
    }
    pairs
}

pub const C1_DISTANCE_RANGE: (f64, f64) = (9.5, 11.5);
pub const WATSON_CRICK_N_DISTANCE: f64 = 3.4;

/// Detects canonical pairs from geometry alone: complementary bases whose
/// C1' atoms are a base pair apart and whose central ring nitrogens are
/// hydrogen-bonded. Conflicts resolve greedily by nitrogen distance.
#[derive(Debug, Clone)]
pub struct GeometricAnnotator {
    pub c1_distance: (f64, f64),
    pub n_distance: f64,
}

impl Default for GeometricAnnotator {
    fn default() -> Self {
        Self {
            c1_distance: C1_DISTANCE_RANGE,
            n_distance: WATSON_CRICK_N_DISTANCE,
        }
    }
}

struct BaseSite {
    id: SeqId,
    base: Nucleotide,
    c1: Point3<f64>,
    n: Point3<f64>,
}

impl BasePairAnnotator for GeometricAnnotator {
    fn name(&self) -> &str {
        "geometric"
    }

    #[instrument(skip_all, name = "geometric_annotation")]
    fn annotate(&self, structure: &AtomicStructure) -> Result<Vec<BasePair>, AnnotationError> {
        let sites: Vec<BaseSite> = structure
            .residues_in_order()
            .filter_map(|(residue_id, residue)| {
                let base = residue.nucleotide.filter(|n| *n != Nucleotide::N)?;
                let chain = structure.chain(residue.chain_id)?;
                Some(BaseSite {
                    id: SeqId::new(chain.id.clone(), residue.number, residue.insertion_code),
                    base,
                    c1: structure.atom_position(residue_id, "C1'")?,
                    n: structure.atom_position(residue_id, base.watson_crick_nitrogen())?,
                })
            })
            .collect();

        let mut candidates = Vec::new();
        for (i, a) in sites.iter().enumerate() {
            for (j, b) in sites.iter().enumerate().skip(i + 1) {
                if !a.base.pairs_canonically_with(b.base) {
                    continue;
                }
                let c1 = (a.c1 - b.c1).norm();
                if c1 < self.c1_distance.0 || c1 > self.c1_distance.1 {
                    continue;
                }
                let n = (a.n - b.n).norm();
                if n <= self.n_distance {
                    candidates.push((n, i, j));
                }
            }
        }
        candidates.sort_by(|x, y| x.0.total_cmp(&y.0));

        let mut paired = vec![false; sites.len()];
        let mut pairs = Vec::new();
        for (_, i, j) in candidates {
            if paired[i] || paired[j] {
                continue;
            }
            paired[i] = true;
            paired[j] = true;
            pairs.push((sites[i].id.clone(), sites[j].id.clone()));
        }
        pairs.sort();
        info!(pairs = pairs.len(), "Annotation finished.");
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;

    fn add_residue(s: &mut AtomicStructure, chain: &str, number: i32, name: &str, atoms: &[(&str, Point3<f64>)]) {
        let c = s.add_chain(chain);
        let r = s.add_residue(c, number, None, name).unwrap();
        for (atom, pos) in atoms {
            s.add_atom_to_residue(r, Atom::new(atom, r, *pos)).unwrap();
        }
    }

    const OUTPUT: &str = "\
Residue conformations -------------------------------------------
A1 : G C3p_endo anti
A2 : C C3p_endo anti
Adjacent stackings ----------------------------------------------
A1-A2 : adjacent_5p upward
Base-pairs ------------------------------------------------------
A1-B12 : G-C Ww/Ww pairing antiparallel cis XIX
A2-B11 : C-G Ww/Ww pairing antiparallel cis XIX
A3-B10 : G-U Ww/Ww pairing antiparallel cis XXVIII
A4-B9 : A-G Hh/Ss pairing antiparallel trans
A5-B8 : A-U Ww/Ww pairing parallel trans
'1'-3-A6.B : U-A Ww/Ww pairing antiparallel cis XX
Residue conformations again -------------------------------------
A7-B7 : G-C Ww/Ww pairing antiparallel cis XIX
";

    mod mc_annotate_output {
        use super::*;

        #[test]
        fn keeps_only_canonical_cis_pairs_in_section() {
            let pairs = parse_mc_annotate(OUTPUT);
            let text: Vec<String> = pairs.iter().map(|(a, b)| format!("{a} {b}")).collect();
            assert_eq!(
                text,
                vec!["A:1 B:12", "A:2 B:11", "A:3 B:10", "1:-3 A:6B"]
            );
        }

        #[test]
        fn residue_tokens_with_negative_numbers_and_icodes() {
            assert_eq!(parse_mc_residue("A-5"), Some(SeqId::new("A", -5, None)));
            assert_eq!(parse_mc_residue("B12.A"), Some(SeqId::new("B", 12, Some('A'))));
            assert_eq!(parse_mc_residue("'AB'7"), Some(SeqId::new("AB", 7, None)));
            assert_eq!(parse_mc_residue("A"), None);
        }
    }

    mod runner {
        use super::*;

        fn structure() -> AtomicStructure {
            let mut s = AtomicStructure::new();
            add_residue(&mut s, "A", 1, "G", &[("C1'", Point3::origin())]);
            add_residue(&mut s, "XY", 1, "C", &[("C1'", Point3::new(10.5, 0.0, 0.0))]);
            s
        }

        #[test]
        fn missing_program_is_unavailable() {
            let annotator = McAnnotate::new("definitely-not-installed-annotator");
            let err = annotator.annotate(&structure()).unwrap_err();
            assert!(matches!(err, AnnotationError::ToolUnavailable { .. }));
        }

        #[test]
        fn long_chain_ids_are_renamed_for_the_tool() {
            let (copy, renamed) = single_letter_copy(&structure()).unwrap();
            assert!(copy.find_chain_by_id("B").is_some());
            assert_eq!(renamed.get("B").map(String::as_str), Some("XY"));
            assert_eq!(copy.atom_count(), 2);
        }

        #[cfg(unix)]
        fn script(dir: &Path, body: &str) -> PathBuf {
            use std::os::unix::fs::PermissionsExt;
            let path = dir.join("fake-annotate");
            std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[cfg(unix)]
        #[test]
        fn program_output_is_mapped_back_to_original_chains() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(
                dir.path(),
                "test -f \"$1\" || exit 3\ncat <<'EOF'\nBase-pairs ---\nA1-B1 : G-C Ww/Ww pairing antiparallel cis XIX\nEOF\n",
            );
            let annotator = McAnnotate::new(program.to_string_lossy());
            let pairs = annotator.annotate(&structure()).unwrap();
            assert_eq!(
                pairs,
                vec![(SeqId::new("A", 1, None), SeqId::new("XY", 1, None))]
            );
        }

        #[cfg(unix)]
        #[test]
        fn failing_program_reports_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let program = script(dir.path(), "echo 'bad input' >&2\nexit 2\n");
            let annotator = McAnnotate::new(program.to_string_lossy());
            match annotator.annotate(&structure()).unwrap_err() {
                AnnotationError::ToolFailed { stderr, .. } => assert_eq!(stderr, "bad input"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod geometric {
        use super::*;

        #[test]
        fn closest_complementary_partner_wins() {
            let mut s = AtomicStructure::new();
            add_residue(
                &mut s,
                "A",
                1,
                "G",
                &[("C1'", Point3::origin()), ("N1", Point3::new(4.0, 0.0, 0.0))],
            );
            add_residue(
                &mut s,
                "A",
                2,
                "C",
                &[("C1'", Point3::new(10.5, 0.0, 0.0)), ("N3", Point3::new(6.9, 0.0, 0.0))],
            );
            add_residue(
                &mut s,
                "A",
                3,
                "U",
                &[("C1'", Point3::new(0.0, 10.4, 0.0)), ("N3", Point3::new(4.0, 3.2, 0.0))],
            );
            let pairs = GeometricAnnotator::default().annotate(&s).unwrap();
            assert_eq!(pairs, vec![(SeqId::new("A", 1, None), SeqId::new("A", 2, None))]);
        }

        #[test]
        fn non_complementary_bases_are_ignored() {
            let mut s = AtomicStructure::new();
            add_residue(&mut s, "A", 1, "A", &[("C1'", Point3::origin()), ("N1", Point3::new(4.0, 0.0, 0.0))]);
            add_residue(&mut s, "A", 2, "G", &[("C1'", Point3::new(10.5, 0.0, 0.0)), ("N1", Point3::new(6.9, 0.0, 0.0))]);
            assert!(GeometricAnnotator::default().annotate(&s).unwrap().is_empty());
        }
    }
}

use super::ids::{AtomId, ChainId};
use crate::core::utils::identifiers::{SUGAR_ATOMS, parent_nucleotide};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The parent base of a nucleotide residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nucleotide {
    A,
    C,
    G,
    U,
    /// A nucleotide whose parent base could not be determined.
    N,
}

impl Nucleotide {
    pub fn one_letter(self) -> char {
        match self {
            Nucleotide::A => 'A',
            Nucleotide::C => 'C',
            Nucleotide::G => 'G',
            Nucleotide::U => 'U',
            Nucleotide::N => 'N',
        }
    }

    pub fn is_purine(self) -> bool {
        matches!(self, Nucleotide::A | Nucleotide::G)
    }

    /// The base atom bonded to C1'.
    pub fn glycosidic_nitrogen(self) -> &'static str {
        if self.is_purine() { "N9" } else { "N1" }
    }

    /// The ring nitrogen that donates or accepts the central Watson-Crick
    /// hydrogen bond.
    pub fn watson_crick_nitrogen(self) -> &'static str {
        if self.is_purine() { "N1" } else { "N3" }
    }

    /// Whether the two bases form a canonical (GC, AU) or wobble (GU) pair.
    pub fn pairs_canonically_with(self, other: Nucleotide) -> bool {
        use Nucleotide::*;
        matches!(
            (self, other),
            (G, C) | (C, G) | (A, U) | (U, A) | (G, U) | (U, G)
        )
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.one_letter())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown nucleotide residue name: '{0}'")]
pub struct ParseNucleotideError(pub String);

impl FromStr for Nucleotide {
    type Err = ParseNucleotideError;

    /// Maps a residue name (standard, DNA, or a known modified nucleotide) to
    /// its parent base.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parent_nucleotide(s.trim()).ok_or_else(|| ParseNucleotideError(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub number: i32,                        // Author residue number
    pub insertion_code: Option<char>,       // Author insertion code
    pub name: String,                       // Residue name (e.g., "G", "PSU")
    pub chain_id: ChainId,                  // ID of the parent chain
    pub nucleotide: Option<Nucleotide>,     // Parent base, if the residue is a nucleotide
    pub(crate) atoms: Vec<AtomId>,          // Atoms in insertion order
    atom_name_map: HashMap<String, AtomId>, // Map from atom name to its stable ID
}

impl Residue {
    pub(crate) fn new(
        number: i32,
        insertion_code: Option<char>,
        name: &str,
        chain_id: ChainId,
    ) -> Self {
        Self {
            number,
            insertion_code,
            name: name.to_string(),
            chain_id,
            nucleotide: name.parse().ok(),
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map.insert(atom_name.to_string(), atom_id);
    }

    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    pub fn get_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).copied()
    }

    pub fn has_atom(&self, name: &str) -> bool {
        self.atom_name_map.contains_key(name)
    }

    /// The base this residue contributes to a sequence. Unrecognized residue
    /// names still count as `N` when the residue carries a ribose sugar.
    pub fn parent_base(&self) -> Option<Nucleotide> {
        self.nucleotide.or_else(|| {
            SUGAR_ATOMS
                .iter()
                .any(|name| self.has_atom(name))
                .then_some(Nucleotide::N)
        })
    }
}

use crate::core::models::residue::Nucleotide;
use phf::{Map, phf_map};
use std::cmp::Ordering;

/// Atoms tried, in order, when a single backbone position stands in for a
/// whole nucleotide.
pub const REFERENCE_ATOMS: [&str; 3] = ["C1'", "C4'", "P"];

/// Sugar atoms whose presence marks an unrecognized residue as a nucleotide.
pub const SUGAR_ATOMS: [&str; 2] = ["C1'", "C4'"];

static NUCLEOTIDE_PARENTS: Map<&'static str, Nucleotide> = phf_map! {
    "A" => Nucleotide::A, "C" => Nucleotide::C, "G" => Nucleotide::G, "U" => Nucleotide::U,
    "ADE" => Nucleotide::A, "CYT" => Nucleotide::C, "GUA" => Nucleotide::G, "URA" => Nucleotide::U, "URI" => Nucleotide::U,
    "RA" => Nucleotide::A, "RC" => Nucleotide::C, "RG" => Nucleotide::G, "RU" => Nucleotide::U,
    "DA" => Nucleotide::A, "DC" => Nucleotide::C, "DG" => Nucleotide::G, "DT" => Nucleotide::U, "DU" => Nucleotide::U,
    "1MA" => Nucleotide::A, "2MA" => Nucleotide::A, "6MA" => Nucleotide::A, "MIA" => Nucleotide::A, "A2M" => Nucleotide::A,
    "T6A" => Nucleotide::A, "AET" => Nucleotide::A, "MA6" => Nucleotide::A, "A23" => Nucleotide::A, "AMP" => Nucleotide::A,
    "5MC" => Nucleotide::C, "OMC" => Nucleotide::C, "CCC" => Nucleotide::C, "CBR" => Nucleotide::C, "4OC" => Nucleotide::C,
    "LCC" => Nucleotide::C, "CH" => Nucleotide::C,
    "2MG" => Nucleotide::G, "7MG" => Nucleotide::G, "M2G" => Nucleotide::G, "OMG" => Nucleotide::G, "1MG" => Nucleotide::G,
    "YG" => Nucleotide::G, "GTP" => Nucleotide::G, "GDP" => Nucleotide::G, "G7M" => Nucleotide::G, "QUO" => Nucleotide::G,
    "LCG" => Nucleotide::G, "GMP" => Nucleotide::G,
    "PSU" => Nucleotide::U, "H2U" => Nucleotide::U, "5MU" => Nucleotide::U, "4SU" => Nucleotide::U, "OMU" => Nucleotide::U,
    "UR3" => Nucleotide::U, "5BU" => Nucleotide::U, "S4U" => Nucleotide::U, "1MU" => Nucleotide::U, "UMP" => Nucleotide::U,
    "N" => Nucleotide::N,
};

/// Heavy-atom output order within a nucleotide: phosphate, sugar, then base.
static ATOM_ORDER_WEIGHTS: Map<&'static str, i32> = phf_map! {
    "P" => 10, "OP1" => 11, "OP2" => 12, "OP3" => 13, "O1P" => 11, "O2P" => 12, "O3P" => 13,
    "O5'" => 20, "C5'" => 21, "C4'" => 22, "O4'" => 23, "C3'" => 24, "O3'" => 25, "C2'" => 26, "O2'" => 27, "C1'" => 28,
    "N9" => 40, "C8" => 41, "N7" => 42, "C5" => 43, "C6" => 44, "O6" => 45, "N6" => 46, "N1" => 47,
    "C2" => 48, "N2" => 49, "O2" => 50, "N3" => 51, "C4" => 52, "O4" => 53, "N4" => 54,
};

/// Resolves standard, DNA, and common modified nucleotide residue names to
/// their parent base.
pub fn parent_nucleotide(residue_name: &str) -> Option<Nucleotide> {
    NUCLEOTIDE_PARENTS.get(residue_name.trim()).copied()
}

pub fn residue_atom_order(atom1_name: &str, atom2_name: &str) -> Ordering {
    let weight1 = ATOM_ORDER_WEIGHTS
        .get(atom1_name.trim())
        .unwrap_or(&i32::MAX);
    let weight2 = ATOM_ORDER_WEIGHTS
        .get(atom2_name.trim())
        .unwrap_or(&i32::MAX);
    weight1.cmp(weight2)
}

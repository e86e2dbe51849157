//! # Atomic Structure Models
//!
//! Data structures for atomic nucleic-acid structures as read from PDB and
//! mmCIF files: atoms, residues (with their parent [`residue::Nucleotide`]),
//! chains, and the owning [`system::AtomicStructure`].
//!
//! ## Overview
//!
//! These models carry exactly what the coarse-grained builder consumes:
//!
//! - **Author identity** - chain names, residue numbers, and insertion codes
//!   kept verbatim
//! - **Coordinates** - one position per atom name, the first
//!   alternate location wins
//! - **File order** - chains and residues iterate in the order they were read
//!
//! ## Usage
//!
//! ```ignore
//! use cgrna::core::models::{atom::Atom, system::AtomicStructure};
//!
//! let mut structure = AtomicStructure::new();
//! let chain_id = structure.add_chain("A");
//! let residue_id = structure.add_residue(chain_id, 1, None, "G").unwrap();
//! structure.add_atom_to_residue(residue_id, Atom::new("C1'", residue_id, Point3::origin()));
//! ```

pub mod atom;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod system;

//! Provides input/output functionality for atomic structure file formats.
//!
//! PDB and mmCIF readers share the [`traits::StructureFile`] interface;
//! [`read_structure`] picks one from the file extension.

pub mod mmcif;
pub mod pdb;
pub mod traits;

use crate::core::models::system::AtomicStructure;
use mmcif::{MmcifError, MmcifFile};
use pdb::{PdbError, PdbFile};
use std::path::Path;
use thiserror::Error;
use traits::StructureFile;

#[derive(Debug, Error)]
pub enum StructureFileError {
    #[error("PDB file error: {0}")]
    Pdb(#[from] PdbError),
    #[error("mmCIF file error: {0}")]
    Mmcif(#[from] MmcifError),
}

/// Whether a path names an mmCIF file (`.cif`, `.mmcif`, case-insensitive).
pub fn is_mmcif_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("cif") || e.eq_ignore_ascii_case("mmcif"))
}

/// Reads an atomic structure, choosing the format from the file extension.
/// Anything that is not mmCIF is read as PDB.
pub fn read_structure(path: &Path) -> Result<AtomicStructure, StructureFileError> {
    if is_mmcif_path(path) {
        Ok(MmcifFile::read_from_path(path)?)
    } else {
        Ok(PdbFile::read_from_path(path)?)
    }
}

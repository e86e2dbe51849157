use super::error::ModelError;
use super::model::CoarseGrainRna;
use crate::core::utils::geometry::{calculate_rmsd, superposed_rmsd};

/// RMSD between the paired-residue virtual positions of two models after
/// optimal superposition. Both models must have the same number of paired
/// residues; with none at all the result is `NaN`.
pub fn cg_rmsd(a: &CoarseGrainRna, b: &CoarseGrainRna) -> Result<f64, ModelError> {
    let pa = a.stem_virtual_residue_poss()?;
    let pb = b.stem_virtual_residue_poss()?;
    if pa.len() != pb.len() {
        return Err(ModelError::LengthMismatch {
            expected: pa.len(),
            found: pb.len(),
        });
    }
    Ok(superposed_rmsd(&pa, &pb).unwrap_or(f64::NAN))
}

/// RMSD between the element endpoints of two models in place, without
/// superposition.
pub fn coordinate_rmsd(a: &CoarseGrainRna, b: &CoarseGrainRna) -> Result<f64, ModelError> {
    let pa = a.get_coordinates_array();
    let pb = b.get_coordinates_array();
    if pa.len() != pb.len() {
        return Err(ModelError::LengthMismatch {
            expected: pa.len(),
            found: pb.len(),
        });
    }
    Ok(calculate_rmsd(&pa, &pb).unwrap_or(f64::NAN))
}

use super::element::{ElementId, ParseElementIdError};
use super::sequence::ParseSeqIdError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Invalid dot-bracket string at position {position}: {reason}")]
    InvalidDotBracket { position: usize, reason: String },

    #[error("Residue {residue} is paired to both {first} and {second}")]
    ConflictingPair {
        residue: usize,
        first: usize,
        second: usize,
    },

    #[error("Residue {residue} is out of range for a molecule of length {length}")]
    ResidueOutOfRange { residue: usize, length: usize },

    #[error("Backbone break after residue {position} is out of range for length {length}")]
    InvalidBreak { position: usize, length: usize },

    #[error("Sequence has length {found} but the structure has {expected} residues")]
    SequenceLength { expected: usize, found: usize },

    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("Element {0} does not touch stem {1}")]
    NotAdjacent(ElementId, ElementId),

    #[error("Invalid element relabeling: {0}")]
    InvalidRelabel(String),

    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    #[error(transparent)]
    InvalidElementId(#[from] ParseElementIdError),

    #[error(transparent)]
    InvalidSeqId(#[from] ParseSeqIdError),
}

use crate::core::graph::element::ElementId;
use crate::core::graph::error::GraphError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown element: {0}")]
    UnknownElement(ElementId),

    #[error("Element {0} has no coordinates")]
    MissingCoordinates(ElementId),

    #[error("Stem {0} has no twist vectors")]
    MissingTwist(ElementId),

    #[error("Element {0} is not a stem")]
    NotAStem(ElementId),

    #[error("Residue {residue} is out of range for a molecule of length {length}")]
    ResidueOutOfRange { residue: usize, length: usize },

    #[error("Expected {expected} values but received {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Element {0} is not adjacent to {1}")]
    NotAdjacent(ElementId, ElementId),

    #[error("A longrange interaction needs two distinct elements, got {0} twice")]
    SelfInteraction(ElementId),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Failed to render the model as text: {0}")]
    Render(#[from] std::fmt::Error),
}

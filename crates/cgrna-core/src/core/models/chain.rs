use super::ids::ResidueId;

/// A polymer chain, identified by its author chain name.
///
/// The name is a string rather than a single character: mmCIF files use
/// multi-character and purely numeric identifiers, and those must survive
/// into the coarse-grained model unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub id: String,
    pub(crate) residues: Vec<ResidueId>,
}

impl Chain {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            residues: Vec::new(),
        }
    }

    /// Residues in file order.
    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }
}

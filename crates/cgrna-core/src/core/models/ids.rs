//! Stable handles into an [`super::system::AtomicStructure`].
//!
//! Handles stay valid when other chains are removed by chain selection; a
//! handle to a removed item simply resolves to `None`.

use slotmap::new_key_type;

new_key_type! {
    /// Handle of an atom.
    pub struct AtomId;
    /// Handle of a nucleotide or other residue.
    pub struct ResidueId;
    /// Handle of a chain, distinct from its author name.
    pub struct ChainId;
}

use super::atom::Atom;
use super::chain::Chain;
use super::ids::{AtomId, ChainId, ResidueId};
use super::residue::Residue;
use crate::core::utils::identifiers::REFERENCE_ATOMS;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;

/// An atomic nucleic-acid structure: chains of residues of atoms.
///
/// Chains keep the order in which they were first seen in the source file
/// and residues keep file order within their chain; the coarse-grained
/// builder derives sequence order from these two orders alone.
#[derive(Debug, Clone, Default)]
pub struct AtomicStructure {
    /// Primary storage for atoms using a slot map for efficient ID management.
    atoms: SlotMap<AtomId, Atom>,
    /// Primary storage for residues using a slot map for efficient ID management.
    residues: SlotMap<ResidueId, Residue>,
    /// Primary storage for chains using a slot map for efficient ID management.
    chains: SlotMap<ChainId, Chain>,
    /// Chains in order of first appearance.
    chain_order: Vec<ChainId>,
    /// Lookup map for residues by chain, number, and insertion code.
    residue_id_map: HashMap<(ChainId, i32, Option<char>), ResidueId>,
    /// Lookup map for chains by their author name.
    chain_id_map: HashMap<String, ChainId>,
}

impl AtomicStructure {
    /// Creates a new, empty structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves an immutable reference to an atom by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The atom ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Atom)` if the atom exists, otherwise `None`.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Retrieves an immutable reference to a residue by its ID.
    ///
    /// # Arguments
    ///
    /// * `id` - The residue ID to look up.
    ///
    /// # Return
    ///
    /// Returns `Some(&Residue)` if the residue exists, otherwise `None`.
    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Chains in file order.
    pub fn chains_iter(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chain_order
            .iter()
            .filter_map(|&id| self.chains.get(id).map(|c| (id, c)))
    }

    /// Residues in file order, chain by chain.
    pub fn residues_in_order(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.chains_iter().flat_map(move |(_, chain)| {
            chain
                .residues
                .iter()
                .filter_map(move |&id| self.residues.get(id).map(|r| (id, r)))
        })
    }

    pub fn find_chain_by_id(&self, id: &str) -> Option<ChainId> {
        self.chain_id_map.get(id).copied()
    }

    /// Finds a residue by chain name, number, and insertion code.
    ///
    /// # Arguments
    ///
    /// * `chain` - The author chain name.
    /// * `number` - The author residue number.
    /// * `insertion_code` - The insertion code, if any.
    ///
    /// # Return
    ///
    /// Returns `Some(ResidueId)` if the residue exists, otherwise `None`.
    pub fn find_residue(
        &self,
        chain: &str,
        number: i32,
        insertion_code: Option<char>,
    ) -> Option<ResidueId> {
        let chain_id = self.find_chain_by_id(chain)?;
        self.residue_id_map
            .get(&(chain_id, number, insertion_code))
            .copied()
    }

    /// Adds a new chain to the structure or returns the existing one.
    ///
    /// This method is idempotent; if a chain with the given name already
    /// exists, it returns the existing chain ID without creating a duplicate.
    pub fn add_chain(&mut self, id: &str) -> ChainId {
        if let Some(&existing) = self.chain_id_map.get(id) {
            return existing;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_id_map.insert(id.to_string(), chain_id);
        self.chain_order.push(chain_id);
        chain_id
    }

    /// Adds a new residue to a chain or returns the existing one.
    ///
    /// # Arguments
    ///
    /// * `chain_id` - The ID of the chain to add the residue to.
    /// * `number` - The author residue number.
    /// * `insertion_code` - The insertion code, if any.
    /// * `name` - The residue name.
    ///
    /// # Return
    ///
    /// Returns `Some(ResidueId)` if successful, otherwise `None` (e.g., if the
    /// chain doesn't exist).
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        number: i32,
        insertion_code: Option<char>,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let key = (chain_id, number, insertion_code);

        let residue_id = *self.residue_id_map.entry(key).or_insert_with(|| {
            let residue = Residue::new(number, insertion_code, name, chain_id);
            self.residues.insert(residue)
        });

        if !chain.residues.contains(&residue_id) {
            chain.residues.push(residue_id);
        }

        Some(residue_id)
    }

    /// Adds an atom to a residue. An atom whose name already exists in the
    /// residue is an alternate location and is ignored; the first occurrence
    /// is kept.
    ///
    /// # Return
    ///
    /// Returns the ID of the stored atom, or `None` if the residue doesn't
    /// exist.
    pub fn add_atom_to_residue(&mut self, residue_id: ResidueId, atom: Atom) -> Option<AtomId> {
        let residue = self.residues.get(residue_id)?;

        if let Some(existing_id) = residue.get_atom_id_by_name(&atom.name) {
            return Some(existing_id);
        }

        let name = atom.name.clone();
        let atom_id = self.atoms.insert(Atom {
            residue_id,
            ..atom
        });
        self.residues.get_mut(residue_id)?.add_atom(&name, atom_id);
        Some(atom_id)
    }

    /// Position of the named atom of a residue.
    pub fn atom_position(&self, residue_id: ResidueId, name: &str) -> Option<Point3<f64>> {
        let atom_id = self.residues.get(residue_id)?.get_atom_id_by_name(name)?;
        self.atoms.get(atom_id).map(|a| a.position)
    }

    /// The first available atom of [`REFERENCE_ATOMS`] for a residue.
    pub fn reference_position(&self, residue_id: ResidueId) -> Option<Point3<f64>> {
        REFERENCE_ATOMS
            .iter()
            .find_map(|name| self.atom_position(residue_id, name))
    }

    /// Removes every chain not named in `keep`, together with its residues and
    /// atoms.
    pub fn retain_chains(&mut self, keep: &[String]) {
        let dropped: Vec<ChainId> = self
            .chain_order
            .iter()
            .copied()
            .filter(|id| {
                self.chains
                    .get(*id)
                    .is_some_and(|c| !keep.iter().any(|k| *k == c.id))
            })
            .collect();

        for chain_id in dropped {
            let Some(chain) = self.chains.remove(chain_id) else {
                continue;
            };
            self.chain_id_map.remove(&chain.id);
            for residue_id in chain.residues {
                if let Some(residue) = self.residues.remove(residue_id) {
                    self.residue_id_map
                        .remove(&(chain_id, residue.number, residue.insertion_code));
                    for atom_id in residue.atoms {
                        self.atoms.remove(atom_id);
                    }
                }
            }
        }
        self.chain_order.retain(|id| self.chains.contains_key(*id));
    }
}

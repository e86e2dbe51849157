use super::ids::ResidueId;
use nalgebra::Point3;

/// An atom of a nucleic-acid structure as read from a coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The atom name with primes normalized (e.g., "C1'", "P", "N9").
    pub name: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// The serial number from the source file, or 0 when not known.
    pub serial: usize,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// Crystallographic occupancy, carried through to written files.
    pub occupancy: f64,
    /// Element symbol, if the source file provided one.
    pub element: Option<String>,
}

impl Atom {
    /// Creates a new `Atom` with full occupancy and no serial or element.
    ///
    /// Legacy `*` primes in sugar atom names (`C1*`) are rewritten to the
    /// modern `'` form so lookups by name work regardless of file vintage.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the atom.
    /// * `residue_id` - The ID of the residue this atom belongs to.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(name: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: normalize_atom_name(name),
            residue_id,
            serial: 0,
            position,
            occupancy: 1.0,
            element: None,
        }
    }
}

pub fn normalize_atom_name(name: &str) -> String {
    name.trim().replace('*', "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let residue_id = ResidueId::default();
        let atom = Atom::new("P", residue_id, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "P");
        assert_eq!(atom.residue_id, residue_id);
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.serial, 0);
        assert_eq!(atom.occupancy, 1.0);
        assert!(atom.element.is_none());
    }

    #[test]
    fn legacy_star_primes_are_normalized() {
        let atom = Atom::new(" C1* ", ResidueId::default(), Point3::origin());
        assert_eq!(atom.name, "C1'");
    }
}

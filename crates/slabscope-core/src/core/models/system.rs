use super::atom::{Atom, Element};
use super::cell::PeriodicBox;
use super::ids::{AtomId, MoleculeId};
use super::molecule::{Molecule, MoleculeKind};
use nalgebra::{Point3, Vector3};
use slotmap::SlotMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Position count mismatch: system has {expected} atoms, frame provides {found}")]
    PositionCountMismatch { expected: usize, found: usize },
    #[error("Atom {0:?} does not exist in the system")]
    UnknownAtom(AtomId),
}

/// The atom and molecule arena for one trajectory run.
///
/// Atoms are inserted once, in trajectory order, and are never removed. Molecules
/// only hold ids into the atom arena and are dropped wholesale whenever the
/// assembler rebuilds molecular identities.
#[derive(Debug, Clone, Default)]
pub struct MolecularSystem {
    atoms: SlotMap<AtomId, Atom>,
    /// Atom ids in the order they appear in each trajectory frame.
    order: Vec<AtomId>,
    molecules: SlotMap<MoleculeId, Molecule>,
    cell: PeriodicBox,
}

impl MolecularSystem {
    pub fn new(cell: PeriodicBox) -> Self {
        Self {
            cell,
            ..Default::default()
        }
    }

    pub fn cell(&self) -> &PeriodicBox {
        &self.cell
    }

    pub fn set_cell(&mut self, cell: PeriodicBox) {
        self.cell = cell;
    }

    /// Appends an atom to the arena. Its `index` is overwritten with its position
    /// in the frame order.
    pub fn add_atom(&mut self, mut atom: Atom) -> AtomId {
        atom.index = self.order.len();
        let id = self.atoms.insert(atom);
        self.order.push(id);
        id
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Iterates over all atoms in trajectory order.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.order.iter().map(move |&id| (id, &self.atoms[id]))
    }

    pub fn atom_ids(&self) -> &[AtomId] {
        &self.order
    }

    pub fn atom_count(&self) -> usize {
        self.order.len()
    }

    pub fn atom_ids_by_element(&self, element: Element) -> Vec<AtomId> {
        self.atoms_iter()
            .filter(|(_, atom)| atom.element == element)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn position(&self, id: AtomId) -> Option<Point3<f64>> {
        self.atoms.get(id).map(|atom| atom.position)
    }

    /// Minimum-image vector from atom `from` to atom `to`.
    pub fn displacement(&self, from: AtomId, to: AtomId) -> Option<Vector3<f64>> {
        let a = self.atoms.get(from)?;
        let b = self.atoms.get(to)?;
        Some(self.cell.displacement(&a.position, &b.position))
    }

    pub fn distance(&self, a: AtomId, b: AtomId) -> Option<f64> {
        self.displacement(a, b).map(|d| d.norm())
    }

    /// Overwrites every atom position, in trajectory order.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PositionCountMismatch`] without touching any atom if the
    /// number of positions differs from the number of atoms.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), ModelError> {
        if positions.len() != self.order.len() {
            return Err(ModelError::PositionCountMismatch {
                expected: self.order.len(),
                found: positions.len(),
            });
        }
        for (&id, position) in self.order.iter().zip(positions) {
            self.atoms[id].position = *position;
        }
        Ok(())
    }

    pub fn molecule(&self, id: MoleculeId) -> Option<&Molecule> {
        self.molecules.get(id)
    }

    pub fn molecules_iter(&self) -> impl Iterator<Item = (MoleculeId, &Molecule)> {
        self.molecules.iter()
    }

    pub fn molecules_of_kind(
        &self,
        kind: MoleculeKind,
    ) -> impl Iterator<Item = (MoleculeId, &Molecule)> {
        self.molecules
            .iter()
            .filter(move |(_, molecule)| molecule.kind == kind)
    }

    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    /// Stores a molecule and points each member atom back at it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownAtom`] if any member id is not in the arena; in
    /// that case nothing is inserted.
    pub fn add_molecule(&mut self, molecule: Molecule) -> Result<MoleculeId, ModelError> {
        if let Some(&missing) = molecule
            .atoms()
            .iter()
            .find(|&&id| !self.atoms.contains_key(id))
        {
            return Err(ModelError::UnknownAtom(missing));
        }
        let residue = molecule.kind.residue_name();
        let members = molecule.atoms().to_vec();
        let molecule_id = self.molecules.insert(molecule);
        for id in members {
            let atom = &mut self.atoms[id];
            atom.molecule = Some(molecule_id);
            atom.residue = residue.to_string();
        }
        Ok(molecule_id)
    }

    /// Drops every molecule and clears the back-references on all atoms.
    pub fn clear_molecules(&mut self) {
        self.molecules.clear();
        for atom in self.atoms.values_mut() {
            atom.molecule = None;
            atom.residue.clear();
        }
    }
}
